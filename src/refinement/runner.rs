//! Progressive refinement loop.
//!
//! Each iteration obtains a confidence (from a validator, or supplied by the
//! caller), derives the stage, records the observation and asks the
//! [`TerminationEvaluator`] whether to keep going. There is no separate
//! timeout: `max_iterations` bounds the loop.

use std::sync::Arc;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;

use crate::error::Result;
use crate::report::{RefinementReporter, notify};
use crate::validation::{ValidationContext, ValidationResult, Validator};

use super::stage::StageThresholds;
use super::state::LoopState;
use super::termination::{TerminationConfig, TerminationEvaluator, TerminationResult};

/// Confidence carried by a validator result: explicit confidence, then
/// `details.fused_confidence`, then 1.0/0.0 from pass/fail.
pub fn confidence_of(result: &ValidationResult) -> f64 {
    result
        .confidence
        .or_else(|| result.fused_confidence())
        .unwrap_or(if result.passed { 1.0 } else { 0.0 })
}

pub struct ProgressiveRefinementLoop {
    validator: Option<Arc<dyn Validator>>,
    context: ValidationContext,
    evaluator: TerminationEvaluator,
    stages: StageThresholds,
    reporters: Vec<Arc<dyn RefinementReporter>>,
}

impl ProgressiveRefinementLoop {
    /// Create a loop with validated termination limits and stage bounds.
    pub fn new(termination: TerminationConfig, stages: StageThresholds) -> Result<Self> {
        stages.validate()?;
        Ok(Self {
            validator: None,
            context: ValidationContext::default(),
            evaluator: TerminationEvaluator::new(termination)?,
            stages,
            reporters: Vec::new(),
        })
    }

    /// Query `validator` once per iteration.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>, context: ValidationContext) -> Self {
        self.validator = Some(validator);
        self.context = context;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn RefinementReporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    pub fn evaluator(&self) -> &TerminationEvaluator {
        &self.evaluator
    }

    pub fn stages(&self) -> &StageThresholds {
        &self.stages
    }

    /// Run one iteration against the configured validator. Without a
    /// validator, or when it fails, the previous confidence is held.
    pub async fn run_iteration(&mut self, state: &LoopState) -> (LoopState, TerminationResult) {
        let confidence = match &self.validator {
            Some(validator) => {
                let call = AssertUnwindSafe(validator.validate(&self.context)).catch_unwind().await;
                match call {
                    Ok(Ok(result)) => confidence_of(&result),
                    Ok(Err(e)) => {
                        log::warn!("{}: validation failed, holding confidence: {}", validator.dimension(), e);
                        state.confidence
                    }
                    Err(_) => {
                        log::warn!("{}: validator panicked, holding confidence", validator.dimension());
                        state.confidence
                    }
                }
            }
            None => state.confidence,
        };
        self.observe(state, confidence)
    }

    /// Advance with an externally supplied confidence.
    pub fn observe(&mut self, state: &LoopState, confidence: f64) -> (LoopState, TerminationResult) {
        let result = self.evaluator.evaluate(confidence);
        let stage = self.stages.get_current_stage(result.confidence);
        let next = state.advance(result.confidence, stage);

        for reporter in &self.reporters {
            if state.iteration > 0 && state.stage != next.stage {
                notify("report_stage_transition", || {
                    reporter.report_stage_transition(state.stage, next.stage)
                });
            }
            notify("report_iteration", || reporter.report_iteration(&next, &result));
        }

        (next, result)
    }

    /// Reset the evaluator and iterate until it says stop.
    pub async fn run(&mut self, initial_state: Option<LoopState>) -> (LoopState, TerminationResult) {
        self.evaluator.reset();
        let mut state = initial_state.unwrap_or_default();

        loop {
            let (next, result) = self.run_iteration(&state).await;
            state = next;
            if result.should_stop {
                self.finish(&state, &result);
                return (state, result);
            }
        }
    }

    /// Like [`run`](Self::run) but consumes caller-supplied confidences
    /// instead of calling a validator. Stops early when the evaluator says
    /// so; when the input runs out first, the last decision is returned.
    pub fn run_with_confidences<I>(
        &mut self,
        initial_state: Option<LoopState>,
        confidences: I,
    ) -> Option<(LoopState, TerminationResult)>
    where
        I: IntoIterator<Item = f64>,
    {
        self.evaluator.reset();
        let mut state = initial_state.unwrap_or_default();
        let mut last = None;

        for confidence in confidences {
            let (next, result) = self.observe(&state, confidence);
            state = next;
            let stop = result.should_stop;
            last = Some(result);
            if stop {
                break;
            }
        }

        let result = last?;
        self.finish(&state, &result);
        Some((state, result))
    }

    fn finish(&self, state: &LoopState, result: &TerminationResult) {
        for reporter in &self.reporters {
            notify("report_final", || reporter.report_final(state, result));
        }
    }
}
