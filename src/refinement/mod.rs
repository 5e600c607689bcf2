//! Confidence-driven refinement: stages, loop state, termination and the
//! loop itself.

pub mod runner;
pub mod stage;
pub mod state;
pub mod termination;

pub use runner::{ProgressiveRefinementLoop, confidence_of};
pub use stage::{Stage, StageThresholds};
pub use state::{HistoryEntry, LoopState};
pub use termination::{TerminationConfig, TerminationEvaluator, TerminationReason, TerminationResult};
