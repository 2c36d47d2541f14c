//! # Formica IO
//!
//! Persistence layer for formica runs.
//!
//! This crate provides:
//! - Structured error handling with custom error types
//! - JSON serialization helpers
//! - The per-run results directory layout
//! - A background writer for step files

/// Error types and result aliases for I/O operations
pub mod error;
/// On-disk results layout, settings and step files
pub mod results;
/// Validated JSON serialization helpers
pub mod serialization;
/// Background step-file writer
pub mod storage;

pub use error::{IoError, Result};
pub use results::{read_step_file, ResultsLayout, SavedSettings, StepFile};
pub use serialization::{
    from_json, read_json_file, to_json, to_json_pretty, write_json_compact, write_json_file,
};
pub use storage::{SnapshotWriter, WriterStats};
