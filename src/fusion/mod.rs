//! Confidence fusion across validation dimensions.

pub mod engine;

pub use engine::{DEFAULT_WEIGHTS, DimensionScore, FusionResult, ScoreFusion};
