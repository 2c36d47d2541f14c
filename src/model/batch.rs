//! Bounded-concurrency execution of many independent runs.
//!
//! Every (repetition, entry) pair becomes its own [`Simulation`] with its own
//! fields and foragers; nothing mutable is shared between runs. Runs execute
//! on a dedicated rayon pool sized to `max_concurrent`, so further runs wait
//! until a worker frees up.

use crate::model::forager::Wanderer;
use crate::model::simulation::{RunSummary, Simulation};
use formica_core::config::AppConfig;
use formica_core::system::FieldLayout;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A named configuration variant.
#[derive(Debug, Clone)]
pub struct BatchEntry {
    pub name: String,
    pub config: AppConfig,
}

/// Result of one run in a batch. A failed run carries its error and does
/// not affect its siblings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub run_name: String,
    pub entry: String,
    pub repetition: usize,
    pub seed: u64,
    pub summary: Option<RunSummary>,
    pub error: Option<String>,
}

impl RunOutcome {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.summary.is_some()
    }
}

pub struct BatchRunner {
    group_name: String,
    base: AppConfig,
    entries: Vec<BatchEntry>,
    repetitions: usize,
    max_concurrent: usize,
}

impl BatchRunner {
    #[must_use]
    pub fn new(group_name: &str, base: AppConfig) -> Self {
        let max_concurrent = base.simulation.max_concurrent;
        Self {
            group_name: group_name.to_string(),
            base,
            entries: Vec::new(),
            repetitions: 1,
            max_concurrent,
        }
    }

    /// Adds a variant of the base configuration.
    #[must_use]
    pub fn with_entry<F>(mut self, name: &str, modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let mut config = self.base.clone();
        modifier(&mut config);
        self.entries.push(BatchEntry {
            name: name.to_string(),
            config,
        });
        self
    }

    /// One entry per layout, named after it.
    #[must_use]
    pub fn with_layouts(self, layouts: &[FieldLayout]) -> Self {
        layouts.iter().fold(self, |runner, &layout| {
            runner.with_entry(layout.as_str(), |config| config.layout = layout)
        })
    }

    #[must_use]
    pub fn repetitions(mut self, repetitions: usize) -> Self {
        self.repetitions = repetitions;
        self
    }

    #[must_use]
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    #[must_use]
    pub fn entries(&self) -> &[BatchEntry] {
        &self.entries
    }

    /// Forager seed of every repetition; entries of one repetition share it.
    fn repetition_seeds(&self) -> Vec<u64> {
        let base_seed = self
            .base
            .simulation
            .seed
            .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
        (0..self.repetitions as u64)
            .map(|rep| base_seed.wrapping_add(rep))
            .collect()
    }

    /// Runs every (repetition, entry) pair. Only failing to build the worker
    /// pool is an error; individual run failures land in their outcome.
    pub fn run(&self) -> anyhow::Result<Vec<RunOutcome>> {
        anyhow::ensure!(self.max_concurrent > 0, "max_concurrent must be positive");
        let entries = if self.entries.is_empty() {
            vec![BatchEntry {
                name: "base".to_string(),
                config: self.base.clone(),
            }]
        } else {
            self.entries.clone()
        };

        let jobs: Vec<(usize, u64, &BatchEntry)> = self
            .repetition_seeds()
            .into_iter()
            .enumerate()
            .flat_map(|(rep, seed)| entries.iter().map(move |entry| (rep, seed, entry)))
            .collect();

        tracing::info!(
            group = %self.group_name,
            runs = jobs.len(),
            max_concurrent = self.max_concurrent,
            "Batch started"
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_concurrent)
            .thread_name(|i| format!("batch-{}", i))
            .build()?;

        let outcomes: Vec<RunOutcome> = pool.install(|| {
            jobs.par_iter()
                .map(|&(rep, seed, entry)| self.run_one(rep, seed, entry))
                .collect()
        });

        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        tracing::info!(
            group = %self.group_name,
            runs = outcomes.len(),
            failed = failed,
            "Batch finished"
        );
        Ok(outcomes)
    }

    fn run_one(&self, repetition: usize, seed: u64, entry: &BatchEntry) -> RunOutcome {
        let run_name = format!("{}_{}_{:03}", self.group_name, entry.name, repetition);
        let mut config = entry.config.clone();
        config.simulation.seed = Some(seed);

        let result = Simulation::new(config.clone(), Wanderer::colony(&config, seed), &run_name)
            .and_then(Simulation::run);

        let (summary, error) = match result {
            Ok(summary) => (Some(summary), None),
            Err(e) => {
                let message = format!("{:#}", e);
                tracing::warn!(run = %run_name, error = %message, "Run failed");
                (None, Some(message))
            }
        };
        RunOutcome {
            run_name,
            entry: entry.name.clone(),
            repetition,
            seed,
            summary,
            error,
        }
    }
}
