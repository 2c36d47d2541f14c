//! Configuration management for simulation parameters.
//!
//! Strongly-typed structures that map to a `config.toml` file. Every section
//! has defaults, so a file only needs to list what it overrides.
//!
//! ## Example `config.toml`
//!
//! ```toml
//! layout = "dual"
//!
//! [grid]
//! environment_size = 300.0
//! step_size = 1.0
//!
//! [deposit]
//! mode = "gaussian"
//! gauss_sigma = 1.5
//!
//! [pheromone_b]
//! decay_time = 500.0
//!
//! [simulation]
//! steps = 2000
//! seed = 7
//! ```

use crate::gaussian::{GaussianTemplate, CUTOFF_SIGMAS};
use crate::grid::GridMapper;
use crate::path::PathSampler;
use crate::pheromone::{DepositMode, DiffusionCoefficients, FieldContext};
use crate::system::FieldLayout;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Lattice geometry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Side length of the square environment (mm).
    pub environment_size: f64,
    /// Lattice spacing (mm).
    pub step_size: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            environment_size: 300.0,
            step_size: 1.0,
        }
    }
}

impl GridConfig {
    #[must_use]
    pub fn mapper(&self) -> GridMapper {
        GridMapper::for_environment(self.environment_size, self.step_size)
    }

    /// `⌊environment_size / step_size⌋ + 1`
    #[must_use]
    pub fn array_size(&self) -> usize {
        self.mapper().side()
    }
}

/// How agents mark the field.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DepositConfig {
    pub mode: DepositMode,
    pub gauss_sigma: f64,
    /// Sample points per movement step.
    pub points_in_step: usize,
    /// Length of one movement step (mm).
    pub step_length: f64,
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            mode: DepositMode::Gaussian,
            gauss_sigma: 1.5,
            points_in_step: 4,
            step_length: 4.2,
        }
    }
}

/// Physical parameters of one pheromone type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PheromoneParams {
    /// `D` (mm²/s)
    pub diffusion_constant: f64,
    /// `k` (1/s)
    pub decay_rate: f64,
    /// Characteristic decay time (s). Overrides `decay_rate` with
    /// `2 / decay_time` when set.
    pub decay_time: Option<f64>,
}

impl PheromoneParams {
    #[must_use]
    pub fn new(diffusion_constant: f64, decay_rate: f64) -> Self {
        Self {
            diffusion_constant,
            decay_rate,
            decay_time: None,
        }
    }

    #[must_use]
    pub fn effective_decay_rate(&self) -> f64 {
        match self.decay_time {
            Some(t) => 2.0 / t,
            None => self.decay_rate,
        }
    }

    #[must_use]
    pub fn coefficients(&self, delta_t: f64, step_size: f64) -> DiffusionCoefficients {
        DiffusionCoefficients::new(
            self.effective_decay_rate(),
            self.diffusion_constant,
            delta_t,
            step_size,
        )
    }
}

impl Default for PheromoneParams {
    fn default() -> Self {
        Self::field_a()
    }
}

impl PheromoneParams {
    /// Defaults of the long-lived outbound trail.
    #[must_use]
    pub fn field_a() -> Self {
        Self::new(0.05, 0.0002)
    }

    /// Defaults of the short-lived returning trail.
    #[must_use]
    pub fn field_b() -> Self {
        Self::new(0.05, 0.005)
    }
}

/// A `[pheromone_*]` table as written; missing keys fall back to the
/// defaults of the field it configures.
#[derive(Deserialize)]
struct PheromoneTable {
    diffusion_constant: Option<f64>,
    decay_rate: Option<f64>,
    decay_time: Option<f64>,
}

impl PheromoneTable {
    fn over(self, base: PheromoneParams) -> PheromoneParams {
        PheromoneParams {
            diffusion_constant: self.diffusion_constant.unwrap_or(base.diffusion_constant),
            decay_rate: self.decay_rate.unwrap_or(base.decay_rate),
            decay_time: self.decay_time.or(base.decay_time),
        }
    }
}

fn deserialize_field_a<'de, D: Deserializer<'de>>(d: D) -> Result<PheromoneParams, D::Error> {
    PheromoneTable::deserialize(d).map(|t| t.over(PheromoneParams::field_a()))
}

fn deserialize_field_b<'de, D: Deserializer<'de>>(d: D) -> Result<PheromoneParams, D::Error> {
    PheromoneTable::deserialize(d).map(|t| t.over(PheromoneParams::field_b()))
}

/// Time discretization of the diffusion solver.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DiffusionConfig {
    /// Δt of one diffusion call (s).
    pub delta_t: f64,
    /// Diffusion calls per simulation tick.
    pub substeps: usize,
}

impl Default for DiffusionConfig {
    fn default() -> Self {
        Self {
            delta_t: 0.5,
            substeps: 1,
        }
    }
}

/// Parameters of a single run, consumed by the run driver and the demo
/// forager.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub steps: u64,
    pub foragers: usize,
    pub seed: Option<u64>,
    pub nest_x: f64,
    pub nest_y: f64,
    pub nest_radius: f64,
    /// Standard turn noise of the demo forager (radians).
    pub turn_noise: f64,
    /// Deposits per forager before it stops marking.
    pub deposit_limit: u32,
    pub outbound_amount: f64,
    pub returning_amount: f64,
    /// Field snapshots are included in every n-th step file.
    pub save_pheromones_every: u64,
    /// Upper bound on concurrently running simulations in a batch.
    pub max_concurrent: usize,
    pub results_dir: String,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 1000,
            foragers: 200,
            seed: None,
            nest_x: 150.0,
            nest_y: 150.0,
            nest_radius: 20.0,
            turn_noise: 0.3,
            deposit_limit: 160,
            outbound_amount: 0.02,
            returning_amount: 0.03,
            save_pheromones_every: 100,
            max_concurrent: 3,
            results_dir: ".".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub layout: FieldLayout,
    pub grid: GridConfig,
    pub deposit: DepositConfig,
    #[serde(deserialize_with = "deserialize_field_a")]
    pub pheromone_a: PheromoneParams,
    #[serde(deserialize_with = "deserialize_field_b")]
    pub pheromone_b: PheromoneParams,
    pub diffusion: DiffusionConfig,
    pub simulation: SimulationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            layout: FieldLayout::Dual,
            grid: GridConfig::default(),
            deposit: DepositConfig::default(),
            pheromone_a: PheromoneParams::field_a(),
            pheromone_b: PheromoneParams::field_b(),
            diffusion: DiffusionConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validates all configuration parameters.
    ///
    /// # Validation Rules
    /// - Grid geometry, step length and sigma must be positive
    /// - The Gaussian kernel radius may not exceed the grid side
    /// - At least one sample per step and one diffusion substep
    /// - Rates and constants must be non-negative
    /// - Every materialized field must satisfy the explicit-scheme stability
    ///   bound `|1 − Δt·k − 4r| + 4r ≤ 1` with `r = D·Δt/h²`
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.grid.step_size > 0.0 && self.grid.step_size.is_finite(),
            "Grid step size must be positive"
        );
        anyhow::ensure!(
            self.grid.environment_size > 0.0 && self.grid.environment_size.is_finite(),
            "Environment size must be positive"
        );
        anyhow::ensure!(
            self.grid.array_size() <= 20_000,
            "Grid too large ({} cells per side, max 20000)",
            self.grid.array_size()
        );

        anyhow::ensure!(
            self.deposit.gauss_sigma > 0.0 && self.deposit.gauss_sigma.is_finite(),
            "Gaussian sigma must be positive"
        );
        let kernel_radius = crate::grid::ceil_to_step(
            CUTOFF_SIGMAS * self.deposit.gauss_sigma,
            self.grid.step_size,
        );
        anyhow::ensure!(
            kernel_radius <= self.grid.array_size() as i64,
            "Gaussian kernel larger than the grid (radius {} cells, {} cells per side)",
            kernel_radius,
            self.grid.array_size()
        );
        anyhow::ensure!(
            self.deposit.points_in_step >= 1,
            "Points in step must be at least 1"
        );
        anyhow::ensure!(
            self.deposit.step_length > 0.0,
            "Step length must be positive"
        );

        anyhow::ensure!(
            self.diffusion.delta_t > 0.0,
            "Diffusion delta_t must be positive"
        );
        anyhow::ensure!(
            self.diffusion.substeps >= 1,
            "Diffusion substeps must be at least 1"
        );

        for (name, params) in self.materialized_fields() {
            anyhow::ensure!(
                params.diffusion_constant >= 0.0,
                "{name}: diffusion constant must be non-negative"
            );
            anyhow::ensure!(
                params.effective_decay_rate() >= 0.0,
                "{name}: decay rate must be non-negative"
            );
            if let Some(t) = params.decay_time {
                anyhow::ensure!(t > 0.0, "{name}: decay time must be positive");
            }
            let coefficients = params.coefficients(self.diffusion.delta_t, self.grid.step_size);
            anyhow::ensure!(
                coefficients.is_stable(),
                "{name}: unstable diffusion scheme (amplification {:.4} > 1); \
                 reduce delta_t or the diffusion constant",
                coefficients.amplification()
            );
        }

        anyhow::ensure!(
            self.simulation.outbound_amount >= 0.0 && self.simulation.returning_amount >= 0.0,
            "Deposit amounts must be non-negative"
        );
        anyhow::ensure!(
            self.simulation.turn_noise >= 0.0 && self.simulation.turn_noise.is_finite(),
            "Turn noise must be a non-negative angle"
        );
        anyhow::ensure!(
            self.simulation.save_pheromones_every > 0,
            "save_pheromones_every must be positive"
        );
        anyhow::ensure!(
            self.simulation.max_concurrent > 0,
            "max_concurrent must be positive"
        );

        Ok(())
    }

    /// The pheromone parameter sets the layout actually builds fields for.
    #[must_use]
    pub fn materialized_fields(&self) -> Vec<(&'static str, &PheromoneParams)> {
        let mut fields = Vec::with_capacity(2);
        if self.layout.has_field_a() {
            fields.push(("pheromone_a", &self.pheromone_a));
        }
        if self.layout.has_field_b() {
            fields.push(("pheromone_b", &self.pheromone_b));
        }
        fields
    }

    /// Parses and validates TOML configuration text.
    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config = toml::from_str::<Self>(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            let config = Self::default();
            config.validate()?;
            return Ok(config);
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Shared geometry for every field of this configuration. Builds the
    /// Gaussian template; call once and clone the result.
    #[must_use]
    pub fn field_context(&self) -> FieldContext {
        FieldContext::new(
            self.grid.mapper(),
            PathSampler::new(self.deposit.points_in_step, self.deposit.step_length),
            Arc::new(GaussianTemplate::new(
                self.deposit.gauss_sigma,
                self.grid.step_size,
            )),
            self.diffusion.delta_t,
        )
    }

    /// Digest of every parameter that influences field evolution.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(format!("{:?}", self.layout).as_bytes());
        hasher.update(format!("{:?}", self.grid).as_bytes());
        hasher.update(format!("{:?}", self.deposit).as_bytes());
        hasher.update(format!("{:?}", self.pheromone_a).as_bytes());
        hasher.update(format!("{:?}", self.pheromone_b).as_bytes());
        hasher.update(format!("{:?}", self.diffusion).as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.grid.array_size(), 301);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            layout = "shared"

            [grid]
            step_size = 0.5

            [deposit]
            mode = "nearest_grid_point"
            "#,
        )
        .expect("valid config");
        assert_eq!(config.layout, FieldLayout::Shared);
        assert_eq!(config.grid.array_size(), 601);
        assert_eq!(config.deposit.mode, DepositMode::Nearest);
        assert_eq!(config.deposit.points_in_step, 4);
    }

    #[test]
    fn test_partial_pheromone_table_keeps_field_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [pheromone_b]
            diffusion_constant = 0.04
            "#,
        )
        .expect("valid config");
        assert_eq!(config.pheromone_b.diffusion_constant, 0.04);
        assert_eq!(config.pheromone_b.decay_rate, 0.005);
        assert_eq!(config.pheromone_a, PheromoneParams::field_a());
    }

    #[test]
    fn test_unknown_deposit_mode_fails_fast() {
        let result = AppConfig::from_toml(
            r#"
            [deposit]
            mode = "splatter"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_layout_fails_fast() {
        assert!(AppConfig::from_toml(r#"layout = "triple""#).is_err());
    }

    #[test]
    fn test_decay_time_overrides_rate() {
        let params = PheromoneParams {
            decay_time: Some(500.0),
            ..PheromoneParams::default()
        };
        assert!((params.effective_decay_rate() - 0.004).abs() < 1e-15);
    }

    #[test]
    fn test_unstable_scheme_rejected() {
        let config = AppConfig {
            pheromone_a: PheromoneParams::new(2.0, 0.0),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unstable"));
    }

    #[test]
    fn test_oversized_gaussian_kernel_rejected() {
        let mut config = AppConfig::default();
        config.deposit.gauss_sigma = 1e4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Gaussian kernel larger than the grid"));

        config.deposit.gauss_sigma = f64::INFINITY;
        assert!(config.validate().is_err());

        // Radius exactly at the grid side is still accepted.
        config.deposit.gauss_sigma = config.grid.array_size() as f64 * config.grid.step_size / 4.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unstable_field_ignored_when_not_materialized() {
        let config = AppConfig {
            layout: FieldLayout::FoodOnly,
            pheromone_a: PheromoneParams::new(2.0, 0.0),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_step_size() {
        let config = AppConfig {
            grid: GridConfig {
                step_size: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_points_in_step_rejected() {
        let config = AppConfig {
            deposit: DepositConfig {
                points_in_step: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fingerprint_consistency() {
        let a = AppConfig::default();
        let mut b = AppConfig::default();
        assert_eq!(a.fingerprint(), b.fingerprint());
        b.pheromone_b.decay_rate = 0.01;
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_field_context_matches_grid() {
        let config = AppConfig::default();
        let context = config.field_context();
        assert_eq!(context.mapper.side(), 301);
        assert_eq!(context.template.radius(), 6);
        assert_eq!(context.sampler.samples_per_step(), 4);
    }
}
