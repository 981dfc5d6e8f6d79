//! gridscript: a replayable dataframe step engine.
//!
//! Every user action against the spreadsheet UI is recorded as a step,
//! executed natively with polars, and transpiled into pandas source code
//! that reproduces the action when run standalone. The step history
//! supports undo/redo/replay, and a fixed-point optimizer merges, reorders,
//! and elides the generated statements so the final script stays minimal.

pub mod chunks;
pub mod cli;
pub mod codegen;
pub mod column_ids;
pub mod config;
pub mod errors;
pub mod optimizer;
pub mod params;
pub mod persistence;
pub mod sniff;
pub mod state;
pub mod step;
pub mod steps;
pub mod steps_manager;
pub mod transpile;

pub use chunks::{ChunkKind, CodeChunk};
pub use errors::{StepError, StepResult};
pub use params::StepParams;
pub use state::State;
pub use step::{ExecutionData, Step};
pub use steps_manager::StepsManager;
pub use transpile::TranspiledCode;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "gridscript";
