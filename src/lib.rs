//! Tiergate - tiered validation gate with confidence-driven refinement
//!
//! Validators are grouped into blocker, warning and monitor tiers. A failing
//! blocker tier marks the change set blocked. Monitor-tier confidences can be
//! fused into one score that drives an iterative refinement loop.

pub mod config;
pub mod error;
pub mod fusion;
pub mod orchestrator;
pub mod refinement;
pub mod report;
pub mod validation;

pub use error::{Result, TierGateError};
pub use fusion::{DimensionScore, FusionResult, ScoreFusion};
pub use orchestrator::ValidationOrchestrator;
pub use refinement::{ProgressiveRefinementLoop, TerminationEvaluator, TerminationReason};
pub use validation::{Tier, ValidationReport, ValidationResult, Validator};
