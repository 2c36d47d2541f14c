//! Ant colony pheromone runs built on `formica_core`.
//!
//! The [`model`] module holds the forager boundary, the per-run tick loop
//! and the batch runner used by the `formica` binary.

pub mod model;

pub use model::batch::{BatchRunner, RunOutcome};
pub use model::forager::{DepositRequest, Forager, ForagerRecord, Wanderer};
pub use model::simulation::{RunSummary, Simulation};
