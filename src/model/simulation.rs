//! Tick loop of a single run.

use crate::model::forager::{Forager, ForagerRecord};
use anyhow::Context;
use formica_core::config::AppConfig;
use formica_core::metrics::Metrics;
use formica_core::system::{PheromoneSystem, SystemSnapshot};
use formica_io::{ResultsLayout, SnapshotWriter, StepFile};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Contents of `data/results.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_name: String,
    pub fingerprint: String,
    pub steps: u64,
    pub foragers: usize,
    pub deposits: u64,
    pub mass_a: Option<f64>,
    pub mass_b: Option<f64>,
    pub max_a: Option<f64>,
    pub max_b: Option<f64>,
    pub steps_written: u64,
    pub steps_failed: u64,
    pub elapsed_ms: u64,
}

/// One isolated run: configuration, fields, foragers and metrics.
pub struct Simulation {
    config: AppConfig,
    run_name: String,
    system: PheromoneSystem,
    foragers: Vec<Box<dyn Forager>>,
    metrics: Metrics,
    tick: u64,
}

impl Simulation {
    /// Validates `config` and builds empty fields.
    pub fn new(
        config: AppConfig,
        foragers: Vec<Box<dyn Forager>>,
        run_name: &str,
    ) -> anyhow::Result<Self> {
        config.validate().context("invalid configuration")?;
        let system = PheromoneSystem::new(&config);
        tracing::info!(
            run = run_name,
            layout = %config.layout,
            mode = %config.deposit.mode,
            side = config.grid.array_size(),
            foragers = foragers.len(),
            "Simulation created"
        );
        Ok(Self {
            config,
            run_name: run_name.to_string(),
            system,
            foragers,
            metrics: Metrics::new(),
            tick: 0,
        })
    }

    /// Starts from previously exported fields instead of empty ones.
    pub fn with_initial_fields(mut self, snapshot: &SystemSnapshot) -> anyhow::Result<Self> {
        self.system = PheromoneSystem::with_snapshots(&self.config, snapshot)
            .context("restoring pheromone fields")?;
        Ok(self)
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn system(&self) -> &PheromoneSystem {
        &self.system
    }

    #[must_use]
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advances one tick: every forager moves, then every deposit is applied,
    /// then the fields diffuse. Returns the number of deposits that reached
    /// a field.
    pub fn step(&mut self) -> usize {
        let started = Instant::now();
        let Self {
            config,
            system,
            foragers,
            metrics,
            tick,
            ..
        } = self;

        metrics.time_phase("move", || {
            for forager in foragers.iter_mut() {
                forager.advance(*tick, system);
            }
        });

        let mode = config.deposit.mode;
        let deposits = metrics.time_phase("deposit", || {
            foragers
                .iter()
                .filter_map(|f| f.deposit_request())
                .filter(|request| {
                    system.deposit_for(
                        request.role,
                        request.start,
                        request.direction,
                        request.amount,
                        mode,
                    )
                })
                .count()
        });

        let substeps = config.diffusion.substeps;
        metrics.time_phase("diffuse", || system.diffuse_substeps(substeps));

        *tick += 1;
        metrics.record_deposits(deposits as u64);
        metrics.record_tick(started.elapsed(), foragers.len(), system.total_mass());
        tracing::debug!(tick = *tick, deposits = deposits, "Tick complete");
        deposits
    }

    /// Step file for the current tick; field snapshots are attached every
    /// `save_pheromones_every` ticks.
    #[must_use]
    pub fn step_file(&self) -> StepFile<ForagerRecord> {
        let pheromones = (self.tick % self.config.simulation.save_pheromones_every == 0)
            .then(|| self.system.export_snapshots());
        StepFile {
            step: self.tick,
            foragers: self.foragers.iter().map(|f| f.record()).collect(),
            pheromones,
        }
    }

    /// Runs `config.simulation.steps` ticks, writing settings, step files
    /// and the final summary below the configured results directory.
    pub fn run(mut self) -> anyhow::Result<RunSummary> {
        let layout = ResultsLayout::new(&self.config.simulation.results_dir, &self.run_name)?;
        layout
            .create()
            .with_context(|| format!("creating results for {}", self.run_name))?;
        let settings = layout.save_settings(&self.config)?;
        let writer = SnapshotWriter::new(layout.clone())?;

        tracing::info!(
            run = %self.run_name,
            steps = self.config.simulation.steps,
            dir = ?layout.run_dir(),
            "Run started"
        );

        writer.save_step(self.step_file());
        for _ in 0..self.config.simulation.steps {
            self.step();
            writer.save_step(self.step_file());
        }

        let stats = writer.finish()?;
        if stats.failed > 0 {
            tracing::warn!(
                run = %self.run_name,
                failed = stats.failed,
                "Some step files could not be written"
            );
        }

        let summary = RunSummary {
            run_name: self.run_name.clone(),
            fingerprint: settings.fingerprint,
            steps: self.tick,
            foragers: self.foragers.len(),
            deposits: self.metrics.deposit_count(),
            mass_a: self.system.field_a().map(|f| f.total()),
            mass_b: self.system.field_b().map(|f| f.total()),
            max_a: self.system.field_a().map(|f| f.max_value()),
            max_b: self.system.field_b().map(|f| f.max_value()),
            steps_written: stats.written,
            steps_failed: stats.failed,
            elapsed_ms: self.metrics.elapsed().as_millis() as u64,
        };
        layout.write_results(&summary)?;
        self.metrics.log_summary(&self.run_name);
        Ok(summary)
    }
}
