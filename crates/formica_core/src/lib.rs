//! # Formica Core
//!
//! Discretized pheromone fields for ant foraging simulations.
//!
//! This crate contains the deterministic field logic:
//! - Mapping continuous positions onto a square lattice
//! - Three deposition modes (nearest grid point, bilinear spread, Gaussian)
//! - Explicit diffusion with decay and absorbing borders
//! - Role-based routing between the outbound and returning fields
//! - Configuration, metrics and structured logging
//!
//! ## Example
//!
//! ```
//! use formica_core::config::AppConfig;
//! use formica_core::grid::Position;
//! use formica_core::pheromone::DepositMode;
//! use formica_core::system::{PheromoneSystem, Role};
//!
//! let config = AppConfig::default();
//! let mut system = PheromoneSystem::new(&config);
//! system.deposit_for(
//!     Role::Returning,
//!     Some(Position::new(100.0, 100.0)),
//!     Some(0.0),
//!     1.0,
//!     DepositMode::Gaussian,
//! );
//! system.diffuse_all();
//! assert!(system.lookup_for(Role::Outbound, Position::new(102.0, 100.0)) > 0.0);
//! ```

/// Configuration management for field and run parameters
pub mod config;
/// Normalized Gaussian deposition kernel
pub mod gaussian;
/// Lattice geometry and position-to-grid mapping
pub mod grid;
/// Performance metrics collection and logging
pub mod metrics;
/// Sampling of a movement step into deposit points
pub mod path;
/// Single pheromone field: deposit, lookup, diffusion
pub mod pheromone;
/// Role-based routing over the owned fields
pub mod system;

pub use config::AppConfig;
pub use grid::{GridMapper, GridPoint, Position};
pub use metrics::{init_logging, Metrics};
pub use pheromone::{DepositMode, FieldSnapshot, PheromoneField};
pub use system::{FieldLayout, PheromoneSystem, Role, SystemSnapshot};
