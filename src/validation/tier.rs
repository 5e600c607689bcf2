//! Aggregated validation outcomes: per tier, per run and per file.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use super::traits::{Tier, ValidationResult};

/// All results produced by one tier, in dispatch order.
#[derive(Debug, Clone, PartialEq)]
pub struct TierResult {
    pub tier: Tier,
    pub results: Vec<ValidationResult>,
}

impl TierResult {
    pub fn new(tier: Tier, results: Vec<ValidationResult>) -> Self {
        Self { tier, results }
    }

    /// True when every result passed (vacuously true for an empty tier).
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Dimensions that failed, in result order.
    pub fn failed_dimensions(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.dimension.as_str())
            .collect()
    }

    /// Look up a result by dimension.
    pub fn result(&self, dimension: &str) -> Option<&ValidationResult> {
        self.results.iter().find(|r| r.dimension == dimension)
    }

    /// Results sorted by dimension name, for presentation.
    pub fn sorted_results(&self) -> Vec<&ValidationResult> {
        let mut sorted: Vec<&ValidationResult> = self.results.iter().collect();
        sorted.sort_by(|a, b| a.dimension.cmp(&b.dimension));
        sorted
    }
}

/// Report for a full `run_all`.
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub tiers: Vec<TierResult>,
    pub execution_time_ms: u64,
}

impl ValidationReport {
    pub fn new(project: impl Into<String>, tiers: Vec<TierResult>, execution_time_ms: u64) -> Self {
        Self {
            project: project.into(),
            timestamp: Utc::now(),
            tiers,
            execution_time_ms,
        }
    }

    /// True when the blocker tier ran and failed.
    ///
    /// Advisory only: acting on it (exit code, merge gate) is the caller's job.
    pub fn blocked(&self) -> bool {
        self.tier(Tier::Blocker).is_some_and(|t| !t.passed())
    }

    /// True when every tier passed.
    pub fn overall_passed(&self) -> bool {
        self.tiers.iter().all(TierResult::passed)
    }

    pub fn tier(&self, tier: Tier) -> Option<&TierResult> {
        self.tiers.iter().find(|t| t.tier == tier)
    }

    /// Total number of validator results across tiers.
    pub fn result_count(&self) -> usize {
        self.tiers.iter().map(|t| t.results.len()).sum()
    }

    /// Every failing result across tiers, tier order first.
    pub fn failures(&self) -> Vec<&ValidationResult> {
        self.tiers
            .iter()
            .flat_map(|t| t.results.iter())
            .filter(|r| !r.passed)
            .collect()
    }

    /// Serializable view of this report.
    pub fn to_view(&self) -> ReportView {
        ReportView {
            project: self.project.clone(),
            timestamp: self.timestamp,
            execution_time_ms: self.execution_time_ms,
            blocked: self.blocked(),
            overall_passed: self.overall_passed(),
            tiers: self.tiers.iter().map(TierView::from).collect(),
        }
    }

    /// Pretty-printed JSON report.
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_view())?)
    }
}

/// External JSON shape of a [`ValidationReport`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportView {
    pub project: String,
    pub timestamp: DateTime<Utc>,
    pub execution_time_ms: u64,
    pub blocked: bool,
    pub overall_passed: bool,
    pub tiers: Vec<TierView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TierView {
    pub tier: u8,
    pub tier_name: &'static str,
    pub passed: bool,
    pub results: Vec<ResultView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultView {
    pub dimension: String,
    pub passed: bool,
    pub message: String,
    pub confidence: f64,
    pub duration_ms: u64,
    pub fix_suggestion: Option<String>,
}

impl From<&TierResult> for TierView {
    fn from(tier: &TierResult) -> Self {
        Self {
            tier: tier.tier.number(),
            tier_name: tier.tier.name(),
            passed: tier.passed(),
            results: tier
                .results
                .iter()
                .map(|r| ResultView {
                    dimension: r.dimension.clone(),
                    passed: r.passed,
                    message: r.message.clone(),
                    confidence: r.confidence(),
                    duration_ms: r.duration_ms,
                    fix_suggestion: r.fix_suggestion.clone(),
                })
                .collect(),
        }
    }
}

/// Outcome of validating a single file.
#[derive(Debug, Clone)]
pub struct FileValidationResult {
    pub path: PathBuf,
    pub tier: Tier,
    pub results: Vec<ValidationResult>,
    /// Explanation when no validator applied
    pub message: Option<String>,
}

impl FileValidationResult {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    pub fn failed_dimensions(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.dimension.as_str())
            .collect()
    }
}
