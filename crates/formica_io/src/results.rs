//! On-disk layout of a run's results.
//!
//! ```text
//! <results_dir>/results/<run_name>/settings.json
//! <results_dir>/results/<run_name>/data/00000.json
//! <results_dir>/results/<run_name>/data/00001.json
//! <results_dir>/results/<run_name>/data/results.json
//! ```

use crate::error::{IoError, Result};
use crate::serialization::{read_json_file, write_json_file};
use formica_core::config::AppConfig;
use formica_core::system::SystemSnapshot;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `settings.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedSettings {
    pub run_name: String,
    pub created_at: String,
    pub fingerprint: String,
    pub config: AppConfig,
}

/// One `data/NNNNN.json` file: forager records plus, on save steps, the
/// field snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepFile<R> {
    pub step: u64,
    pub foragers: Vec<R>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pheromones: Option<SystemSnapshot>,
}

/// Paths of one run's results directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLayout {
    run_name: String,
    run_dir: PathBuf,
}

impl ResultsLayout {
    /// Layout for `run_name` below `results_dir`. The name becomes a single
    /// directory component, so separators and `..` are rejected.
    pub fn new<P: AsRef<Path>>(results_dir: P, run_name: &str) -> Result<Self> {
        let trimmed = run_name.trim();
        if trimmed.is_empty() {
            return Err(IoError::validation("Run name must not be empty"));
        }
        if trimmed == "." || trimmed == ".." || trimmed.contains(['/', '\\']) {
            return Err(IoError::validation(format!(
                "Run name {:?} is not a plain directory name",
                run_name
            )));
        }
        Ok(Self {
            run_name: trimmed.to_string(),
            run_dir: results_dir.as_ref().join("results").join(trimmed),
        })
    }

    #[must_use]
    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    #[must_use]
    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.run_dir.join("data")
    }

    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.run_dir.join("settings.json")
    }

    /// `data/{step:05}.json`
    #[must_use]
    pub fn step_path(&self, step: u64) -> PathBuf {
        self.data_dir().join(format!("{:05}.json", step))
    }

    #[must_use]
    pub fn results_path(&self) -> PathBuf {
        self.data_dir().join("results.json")
    }

    /// Creates the run and data directories.
    pub fn create(&self) -> Result<()> {
        let data_dir = self.data_dir();
        std::fs::create_dir_all(&data_dir).map_err(|e| {
            IoError::FileSystem(e).with_context(format!("creating {:?}", data_dir))
        })?;
        tracing::debug!(run = %self.run_name, dir = ?self.run_dir, "Results directory ready");
        Ok(())
    }

    /// Writes `settings.json` with the configuration and its fingerprint.
    pub fn save_settings(&self, config: &AppConfig) -> Result<SavedSettings> {
        let settings = SavedSettings {
            run_name: self.run_name.clone(),
            created_at: chrono::Utc::now().to_rfc3339(),
            fingerprint: config.fingerprint(),
            config: config.clone(),
        };
        write_json_file(&settings, self.settings_path())?;
        Ok(settings)
    }

    pub fn load_settings(&self) -> Result<SavedSettings> {
        read_json_file(self.settings_path())
    }

    /// Writes the final summary synchronously.
    pub fn write_results<T: Serialize>(&self, results: &T) -> Result<()> {
        write_json_file(results, self.results_path())
    }
}

/// Reads a step file written by [`crate::storage::SnapshotWriter`].
pub fn read_step_file<R, P>(path: P) -> Result<StepFile<R>>
where
    R: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    read_json_file(path)
}
