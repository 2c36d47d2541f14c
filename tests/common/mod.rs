pub mod macros;

use formica_core::config::AppConfig;
use formica_core::pheromone::PheromoneField;
use formica_core::system::{FieldLayout, PheromoneSystem};
use formica_lib::model::forager::Forager;
use formica_lib::model::simulation::Simulation;
use std::path::PathBuf;

/// Builds small fields and systems for tests. Defaults to a unit-step grid
/// of side 41 with the default parameters otherwise.
#[allow(dead_code)]
pub struct FieldBuilder {
    config: AppConfig,
}

#[allow(dead_code)]
impl FieldBuilder {
    pub fn new() -> Self {
        let mut config = AppConfig::default();
        config.grid.environment_size = 40.0;
        config.grid.step_size = 1.0;
        config.simulation.nest_x = 20.0;
        config.simulation.nest_y = 20.0;
        config.simulation.nest_radius = 3.0;
        config.simulation.foragers = 0;
        Self { config }
    }

    pub fn with_environment(mut self, environment_size: f64, step_size: f64) -> Self {
        self.config.grid.environment_size = environment_size;
        self.config.grid.step_size = step_size;
        self
    }

    pub fn with_layout(mut self, layout: FieldLayout) -> Self {
        self.config.layout = layout;
        self
    }

    /// Sets diffusion constant and decay rate of field B, the one
    /// [`FieldBuilder::build_field`] returns.
    pub fn with_rates(mut self, diffusion_constant: f64, decay_rate: f64) -> Self {
        self.config.pheromone_b.diffusion_constant = diffusion_constant;
        self.config.pheromone_b.decay_rate = decay_rate;
        self.config.pheromone_b.decay_time = None;
        self
    }

    pub fn with_config<F>(mut self, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        modifier(&mut self.config);
        self
    }

    pub fn config(&self) -> AppConfig {
        self.config.clone()
    }

    pub fn build_field(self) -> PheromoneField {
        PheromoneField::new(
            self.config.field_context(),
            self.config.pheromone_b.effective_decay_rate(),
            self.config.pheromone_b.diffusion_constant,
        )
    }

    pub fn build_system(self) -> PheromoneSystem {
        PheromoneSystem::new(&self.config)
    }

    pub fn build_simulation(
        self,
        foragers: Vec<Box<dyn Forager>>,
        run_name: &str,
    ) -> anyhow::Result<Simulation> {
        Simulation::new(self.config, foragers, run_name)
    }
}

/// Fresh results directory below the system temp dir.
#[allow(dead_code)]
pub fn temp_results_dir(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!("formica_{}_{}", tag, uuid::Uuid::new_v4().simple()))
}
