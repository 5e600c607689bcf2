//! Fusion-aware composite validator.
//!
//! Runs member validators in order and fuses their confidences into a single
//! score with [`ScoreFusion`]. Members that skip are left out so the
//! remaining weights renormalize. A member that returns an error scores 0,
//! the same as a failing check, so a crash never raises the fused score.

use crate::error::Result;
use crate::fusion::{DimensionScore, ScoreFusion};
use crate::validation::traits::{Tier, ValidationContext, ValidationResult, Validator, clamp_unit};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Default fused score required to pass.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.80;

pub struct FusedValidator {
    dimension: String,
    tier: Tier,
    validators: Vec<Arc<dyn Validator>>,
    fusion: ScoreFusion,
    pass_threshold: f64,
}

impl FusedValidator {
    /// Create an empty fused validator reporting under `dimension`
    pub fn new(dimension: impl Into<String>, fusion: ScoreFusion) -> Self {
        Self {
            dimension: dimension.into(),
            tier: Tier::Monitor,
            validators: Vec::new(),
            fusion,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
        }
    }

    /// Add a member validator (builder pattern)
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Add a shared member validator
    pub fn add_shared(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn with_tier(mut self, tier: Tier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_pass_threshold(mut self, threshold: f64) -> Self {
        self.pass_threshold = clamp_unit(threshold);
        self
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Dimensions of all members, in run order
    pub fn member_dimensions(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.dimension()).collect()
    }

    fn score_for(&self, result: &ValidationResult) -> DimensionScore {
        let value = if result.passed { result.confidence() } else { 0.0 };
        let reliability = result
            .details
            .get("reliability")
            .and_then(Value::as_f64)
            .unwrap_or(1.0);
        self.fusion.score(&result.dimension, value, reliability)
    }
}

#[async_trait]
impl Validator for FusedValidator {
    fn dimension(&self) -> &str {
        &self.dimension
    }

    fn tier(&self) -> Tier {
        self.tier
    }

    async fn validate(&self, ctx: &ValidationContext) -> Result<ValidationResult> {
        let start = Instant::now();
        let mut scores = Vec::new();
        let mut skipped = Vec::new();
        let mut errors = Vec::new();

        for validator in &self.validators {
            match validator.validate(ctx).await {
                Ok(result) if result.is_skipped() => skipped.push(Value::from(result.dimension)),
                Ok(result) => scores.push(self.score_for(&result)),
                Err(e) => {
                    log::warn!("{}: member {} failed: {}", self.dimension, validator.dimension(), e);
                    errors.push(Value::from(format!("{}: {}", validator.dimension(), e)));
                    scores.push(self.fusion.score(validator.dimension(), 0.0, 1.0));
                }
            }
        }

        let elapsed = start.elapsed().as_millis() as u64;

        if scores.is_empty() {
            return Ok(ValidationResult::skipped(&self.dimension, self.tier, "no member produced a score")
                .with_confidence(0.0)
                .with_detail("fused_confidence", 0.0)
                .with_detail("skipped_dimensions", skipped)
                .with_detail("errors", errors)
                .with_duration_ms(elapsed));
        }

        let fused = self.fusion.fuse_with_details(&scores);
        let passed = fused.fused_score >= self.pass_threshold;
        let message = format!(
            "fused confidence {:.3} ({} threshold {:.2})",
            fused.fused_score,
            if passed { "meets" } else { "below" },
            self.pass_threshold
        );

        let result = if passed {
            ValidationResult::pass(&self.dimension, self.tier, message)
        } else {
            ValidationResult::fail(&self.dimension, self.tier, message)
        };

        Ok(result
            .with_confidence(fused.fused_score)
            .with_detail("fused_confidence", fused.fused_score)
            .with_detail("contributions", serde_json::to_value(&fused.dimension_contributions)?)
            .with_detail("effective_weights", serde_json::to_value(&fused.effective_weights)?)
            .with_detail("missing_dimensions", fused.missing_dimensions)
            .with_detail("skipped_dimensions", skipped)
            .with_detail("errors", errors)
            .with_duration_ms(elapsed))
    }

    fn description(&self) -> &str {
        "fused confidence"
    }
}
