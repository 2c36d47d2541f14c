pub mod batch;
pub mod forager;
pub mod simulation;

pub use formica_core::{config, grid, metrics, pheromone, system};
