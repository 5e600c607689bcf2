//! Tier scheduling and fail-open dispatch.

pub mod dispatch;
pub mod engine;

pub use dispatch::{invoke, run_parallel, run_sequential};
pub use engine::{DEFAULT_MAX_WORKERS, ValidationOrchestrator};
