//! Termination decisions for the refinement loop.
//!
//! The evaluator watches a stream of confidence observations and stops the
//! loop when one of three conditions holds, checked in fixed priority order:
//! threshold met, progress stalled, iteration budget exhausted.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TierGateError};
use crate::validation::traits::clamp_unit;

/// Why the evaluator decided what it decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    ThresholdMet,
    ProgressStalled,
    MaxIterations,
    Continue,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::ThresholdMet => "threshold_met",
            TerminationReason::ProgressStalled => "progress_stalled",
            TerminationReason::MaxIterations => "max_iterations",
            TerminationReason::Continue => "continue",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One termination decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TerminationResult {
    pub should_stop: bool,
    pub reason: TerminationReason,
    /// The (clamped) confidence that was evaluated
    pub confidence: f64,
    /// Number of observations so far
    pub iterations: usize,
    /// Snapshot of every observation so far
    pub history: Vec<f64>,
}

/// Limits for a [`TerminationEvaluator`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminationConfig {
    pub confidence_threshold: f64,
    pub max_iterations: usize,
    pub stall_epsilon: f64,
    pub stall_count_limit: usize,
}

impl Default for TerminationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            max_iterations: 10,
            stall_epsilon: 0.01,
            stall_count_limit: 3,
        }
    }
}

impl TerminationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(TierGateError::config(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.max_iterations < 1 {
            return Err(TierGateError::config("max_iterations must be >= 1"));
        }
        if !self.stall_epsilon.is_finite() || self.stall_epsilon < 0.0 {
            return Err(TierGateError::config(format!(
                "stall_epsilon must be >= 0, got {}",
                self.stall_epsilon
            )));
        }
        if self.stall_count_limit < 1 {
            return Err(TierGateError::config("stall_count_limit must be >= 1"));
        }
        Ok(())
    }
}

/// Stateful stop/continue decision over a confidence stream.
///
/// Not safe to share between concurrently running loops; call [`reset`]
/// before reusing one for an unrelated run.
///
/// [`reset`]: TerminationEvaluator::reset
#[derive(Debug, Clone)]
pub struct TerminationEvaluator {
    config: TerminationConfig,
    history: Vec<f64>,
    stall_count: usize,
}

impl TerminationEvaluator {
    /// Create an evaluator, rejecting out-of-range limits.
    pub fn new(config: TerminationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            history: Vec::new(),
            stall_count: 0,
        })
    }

    pub fn config(&self) -> &TerminationConfig {
        &self.config
    }

    pub fn history(&self) -> &[f64] {
        &self.history
    }

    pub fn stall_count(&self) -> usize {
        self.stall_count
    }

    /// Record one observation and decide.
    pub fn evaluate(&mut self, confidence: f64) -> TerminationResult {
        let confidence = clamp_unit(confidence);

        if let Some(previous) = self.history.last() {
            let delta = confidence - previous;
            // strict: a delta equal to epsilon counts as progress
            if delta < self.config.stall_epsilon {
                self.stall_count += 1;
            } else {
                self.stall_count = 0;
            }
        }
        self.history.push(confidence);

        let reason = if confidence >= self.config.confidence_threshold {
            TerminationReason::ThresholdMet
        } else if self.stall_count >= self.config.stall_count_limit {
            TerminationReason::ProgressStalled
        } else if self.history.len() >= self.config.max_iterations {
            TerminationReason::MaxIterations
        } else {
            TerminationReason::Continue
        };

        log::debug!(
            "termination: confidence={:.4} stall_count={} iterations={} -> {}",
            confidence,
            self.stall_count,
            self.history.len(),
            reason
        );

        TerminationResult {
            should_stop: reason != TerminationReason::Continue,
            reason,
            confidence,
            iterations: self.history.len(),
            history: self.history.clone(),
        }
    }

    /// Clear history and stall count.
    pub fn reset(&mut self) {
        self.history.clear();
        self.stall_count = 0;
    }
}
