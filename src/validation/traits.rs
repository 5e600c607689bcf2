//! Core validation interfaces
//!
//! Every concrete validator (lint, type check, security scan, visual diff,
//! ...) implements [`Validator`] and produces a [`ValidationResult`]. The
//! orchestrator and the refinement loop only ever see these types.

use crate::error::{Result, TierGateError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// Severity bucket a validator runs in.
///
/// Tiers run in ascending order. A failing blocker tier blocks the release;
/// warning and monitor failures are reported but never block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Tier {
    Blocker = 1,
    Warning = 2,
    Monitor = 3,
}

impl Tier {
    /// All tiers in execution order.
    pub const ALL: [Tier; 3] = [Tier::Blocker, Tier::Warning, Tier::Monitor];

    /// Numeric tier value (1..=3).
    pub fn number(&self) -> u8 {
        *self as u8
    }

    /// Upper-case tier name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            Tier::Blocker => "BLOCKER",
            Tier::Warning => "WARNING",
            Tier::Monitor => "MONITOR",
        }
    }
}

impl TryFrom<u8> for Tier {
    type Error = TierGateError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Tier::Blocker),
            2 => Ok(Tier::Warning),
            3 => Ok(Tier::Monitor),
            other => Err(TierGateError::config(format!("tier must be 1, 2 or 3, got {}", other))),
        }
    }
}

impl From<Tier> for u8 {
    fn from(tier: Tier) -> Self {
        tier.number()
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of a single validator run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Dimension key, unique within a run
    pub dimension: String,
    /// Tier the validator ran in
    pub tier: Tier,
    /// Whether validation passed
    pub passed: bool,
    /// Human readable summary
    pub message: String,
    /// Free-form details (tool output, counts, `skipped`, `fused_confidence`, ...)
    #[serde(default)]
    pub details: Map<String, Value>,
    /// Suggested fix, if the validator knows one
    pub fix_suggestion: Option<String>,
    /// Name of a remediation capability that can act on a failure
    pub agent: Option<String>,
    /// Wall-clock duration of the validator call
    pub duration_ms: u64,
    /// Confidence in [0, 1]. `None` means the validator did not report one.
    pub confidence: Option<f64>,
}

impl ValidationResult {
    fn new(dimension: impl Into<String>, tier: Tier, passed: bool, message: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            tier,
            passed,
            message: message.into(),
            details: Map::new(),
            fix_suggestion: None,
            agent: None,
            duration_ms: 0,
            confidence: None,
        }
    }

    /// Create a passing result
    pub fn pass(dimension: impl Into<String>, tier: Tier, message: impl Into<String>) -> Self {
        Self::new(dimension, tier, true, message)
    }

    /// Create a failing result
    pub fn fail(dimension: impl Into<String>, tier: Tier, message: impl Into<String>) -> Self {
        Self::new(dimension, tier, false, message)
    }

    /// Create a passing result for a check that could not run (tool missing,
    /// nothing to check). Marked with `details.skipped = true`.
    pub fn skipped(dimension: impl Into<String>, tier: Tier, reason: impl Into<String>) -> Self {
        Self::new(dimension, tier, true, reason).with_detail("skipped", true)
    }

    /// Create the failing result that stands in for a crashed validator.
    pub fn error(dimension: impl Into<String>, tier: Tier, err: impl fmt::Display) -> Self {
        Self::new(dimension, tier, false, format!("error: {}", err)).with_detail("error", true)
    }

    /// Add a detail entry
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Set the fix suggestion
    pub fn with_fix_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.fix_suggestion = Some(suggestion.into());
        self
    }

    /// Set the remediation agent
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the confidence, clamped to [0, 1]
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(clamp_unit(confidence));
        self
    }

    /// Set the duration
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Reported confidence, defaulting to 1.0 when none was reported.
    pub fn confidence(&self) -> f64 {
        self.confidence.unwrap_or(1.0)
    }

    /// `details.fused_confidence`, when a fusion-aware validator reported one.
    pub fn fused_confidence(&self) -> Option<f64> {
        self.details.get("fused_confidence").and_then(Value::as_f64)
    }

    /// Whether the validator skipped its check.
    pub fn is_skipped(&self) -> bool {
        self.details.get("skipped").and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Clamp a value into [0, 1]; NaN maps to 0.
pub(crate) fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Input handed to every validator call.
#[derive(Debug, Clone, Default)]
pub struct ValidationContext {
    /// Root of the project under validation
    pub project_root: PathBuf,
    /// Single file being validated, for file-scoped runs
    pub file: Option<PathBuf>,
}

impl ValidationContext {
    /// Context for a whole-project run
    pub fn for_project(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            file: None,
        }
    }

    /// Context for validating one file
    pub fn for_file(project_root: impl Into<PathBuf>, file: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            file: Some(file.into()),
        }
    }
}

/// Trait for anything that can validate a change set.
///
/// `validate` must not fail for expected conditions such as a missing tool
/// or a missing file; those map to a passing, skipped result. An `Err` is
/// treated as a crash and recorded by the orchestrator as a failing result.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Dimension this validator reports under
    fn dimension(&self) -> &str;

    /// Tier this validator runs in
    fn tier(&self) -> Tier;

    /// Remediation capability that can act on failures
    fn agent(&self) -> Option<&str> {
        None
    }

    /// Whether the underlying tool can run at all
    fn is_available(&self) -> bool {
        true
    }

    /// Whether this validator knows how to check `path` on its own
    fn applies_to(&self, _path: &Path) -> bool {
        false
    }

    /// Run the check
    async fn validate(&self, ctx: &ValidationContext) -> Result<ValidationResult>;

    /// Get a description of what this validator checks
    fn description(&self) -> &str {
        self.dimension()
    }
}
