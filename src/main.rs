use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use formica_core::config::AppConfig;
use formica_core::metrics::init_logging;
use formica_core::pheromone::{DepositMode, PheromoneField};
use formica_core::system::{FieldLayout, PheromoneSystem, SystemSnapshot};
use formica_io::{read_step_file, SavedSettings};
use formica_lib::model::batch::BatchRunner;
use formica_lib::model::forager::Wanderer;
use formica_lib::model::simulation::Simulation;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Pheromone field simulations", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single simulation
    Run {
        /// Config file path (defaults apply when missing)
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        /// Number of ticks
        #[arg(long)]
        steps: Option<u64>,

        /// Deposit mode (nearest, spread, gaussian)
        #[arg(long)]
        mode: Option<String>,

        /// Results directory
        #[arg(short, long)]
        out: Option<String>,

        /// Run name (defaults to a timestamp)
        #[arg(short, long)]
        name: Option<String>,

        /// Forager seed
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Run repetitions of several layouts with bounded concurrency
    Batch {
        #[arg(short, long, default_value = "config.toml")]
        config: PathBuf,

        #[arg(short, long, default_value_t = 1)]
        repetitions: usize,

        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Comma-separated layouts (dual, shared, food_only)
        #[arg(long, value_delimiter = ',')]
        layouts: Vec<String>,

        /// Group name used as the run name prefix
        #[arg(long)]
        group: Option<String>,

        #[arg(short, long)]
        out: Option<String>,
    },
    /// Print field statistics of a saved step file
    Inspect {
        /// Path to a data/NNNNN.json file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            steps,
            mode,
            out,
            name,
            seed,
        } => {
            let mut config = AppConfig::load(&config)?;
            if let Some(steps) = steps {
                config.simulation.steps = steps;
            }
            if let Some(mode) = mode {
                config.deposit.mode = mode.parse::<DepositMode>()?;
            }
            if let Some(out) = out {
                config.simulation.results_dir = out;
            }
            let seed = seed
                .or(config.simulation.seed)
                .unwrap_or_else(|| ChaCha8Rng::from_entropy().gen());
            config.simulation.seed = Some(seed);
            let name = name.unwrap_or_else(|| {
                format!("run_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
            });

            let foragers = Wanderer::colony(&config, seed);
            let summary = Simulation::new(config, foragers, &name)?.run()?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::Batch {
            config,
            repetitions,
            max_concurrent,
            layouts,
            group,
            out,
        } => {
            let mut config = AppConfig::load(&config)?;
            if let Some(out) = out {
                config.simulation.results_dir = out;
            }
            let layouts = layouts
                .iter()
                .map(|l| l.parse::<FieldLayout>())
                .collect::<Result<Vec<_>>>()?;
            let group = group.unwrap_or_else(|| {
                let id = uuid::Uuid::new_v4().simple().to_string();
                format!("batch_{}", &id[..8])
            });

            let mut runner = BatchRunner::new(&group, config).repetitions(repetitions);
            if let Some(k) = max_concurrent {
                runner = runner.max_concurrent(k);
            }
            if !layouts.is_empty() {
                runner = runner.with_layouts(&layouts);
            }

            let outcomes = runner.run()?;
            for outcome in &outcomes {
                match (&outcome.summary, &outcome.error) {
                    (Some(summary), _) => println!(
                        "{:<32} ok    deposits={} mass_a={:?} mass_b={:?}",
                        outcome.run_name, summary.deposits, summary.mass_a, summary.mass_b
                    ),
                    (None, error) => println!(
                        "{:<32} FAIL  {}",
                        outcome.run_name,
                        error.as_deref().unwrap_or("unknown error")
                    ),
                }
            }
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            anyhow::ensure!(failed == 0, "{} of {} runs failed", failed, outcomes.len());
        }
        Command::Inspect { path } => inspect(&path)?,
    }

    Ok(())
}

/// Rebuilds the fields stored in a step file and prints their statistics.
/// Uses the run's `settings.json` when it sits next to the data directory.
fn inspect(path: &Path) -> Result<()> {
    let step = read_step_file::<serde_json::Value, _>(path)
        .with_context(|| format!("reading step file {:?}", path))?;
    let snapshot = step
        .pheromones
        .filter(|s| !s.is_empty())
        .with_context(|| format!("step {} carries no field snapshots", step.step))?;

    let config = match settings_for(path) {
        Some(settings) => settings.config,
        None => fallback_config(&snapshot),
    };
    let system = PheromoneSystem::with_snapshots(&config, &snapshot)?;

    println!("step {} ({} foragers)", step.step, step.foragers.len());
    let describe = |name: &str, field: Option<&PheromoneField>| {
        if let Some(field) = field {
            println!(
                "{name}: side={} total={:.6} max={:.6}",
                field.side(),
                field.total(),
                field.max_value()
            );
        }
    };
    describe("pheromone_a", system.field_a());
    describe("pheromone_b", system.field_b());
    Ok(())
}

fn settings_for(step_path: &Path) -> Option<SavedSettings> {
    let run_dir = step_path.parent()?.parent()?;
    formica_io::read_json_file(run_dir.join("settings.json")).ok()
}

/// Unit-step grid sized to the snapshot, layout matching the fields present.
fn fallback_config(snapshot: &SystemSnapshot) -> AppConfig {
    let mut config = AppConfig::default();
    config.layout = match (&snapshot.pheromone_a, &snapshot.pheromone_b) {
        (Some(_), None) => FieldLayout::Shared,
        (None, Some(_)) => FieldLayout::FoodOnly,
        _ => FieldLayout::Dual,
    };
    let side = snapshot
        .pheromone_a
        .as_ref()
        .or(snapshot.pheromone_b.as_ref())
        .map_or(1, |s| s.side());
    config.grid.step_size = 1.0;
    config.grid.environment_size = side.saturating_sub(1) as f64;
    config
}
