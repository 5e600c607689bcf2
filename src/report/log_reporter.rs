//! Reporter that writes progress and results to the log.

use crate::error::Result;
use crate::refinement::{LoopState, Stage, TerminationResult};
use crate::validation::ValidationReport;

use super::{RefinementReporter, ValidationSink};

/// Logs every callback at info level (failures at warn).
#[derive(Debug, Clone, Default)]
pub struct LogReporter;

impl LogReporter {
    pub fn new() -> Self {
        Self
    }
}

impl RefinementReporter for LogReporter {
    fn report_iteration(&self, state: &LoopState, result: &TerminationResult) -> Result<()> {
        log::info!(
            "iteration {}: confidence={:.3} stage={} decision={}",
            state.iteration,
            state.confidence,
            state.stage,
            result.reason
        );
        Ok(())
    }

    fn report_stage_transition(&self, from: Stage, to: Stage) -> Result<()> {
        log::info!("stage transition: {} -> {}", from, to);
        Ok(())
    }

    fn report_final(&self, state: &LoopState, result: &TerminationResult) -> Result<()> {
        log::info!(
            "refinement finished after {} iterations: {} (confidence={:.3}, stage={})",
            state.iteration,
            result.reason,
            state.confidence,
            state.stage
        );
        Ok(())
    }
}

impl ValidationSink for LogReporter {
    fn push_validation_metrics(&self, report: &ValidationReport, project: &str) -> Result<()> {
        for tier in &report.tiers {
            for r in &tier.results {
                log::info!(
                    "{} {} {}: passed={} confidence={:.3} duration_ms={}",
                    project,
                    tier.tier,
                    r.dimension,
                    r.passed,
                    r.confidence(),
                    r.duration_ms
                );
            }
        }
        Ok(())
    }

    fn inject_validation_context(&self, report: &ValidationReport) -> Result<()> {
        if report.blocked() {
            log::warn!(
                "{}: release blocked by {:?}",
                report.project,
                report
                    .tiers
                    .first()
                    .map(|t| t.failed_dimensions())
                    .unwrap_or_default()
            );
        }
        Ok(())
    }

    fn add_breadcrumb(&self, message: &str) -> Result<()> {
        log::debug!("breadcrumb: {}", message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::TerminationReason;
    use crate::validation::{Tier, TierResult, ValidationResult};

    #[test]
    fn test_log_reporter_never_fails() {
        let reporter = LogReporter::new();
        let state = LoopState::new().advance(0.5, Stage::Layout);
        let result = TerminationResult {
            should_stop: false,
            reason: TerminationReason::Continue,
            confidence: 0.5,
            iterations: 1,
            history: vec![0.5],
        };
        assert!(reporter.report_iteration(&state, &result).is_ok());
        assert!(reporter.report_stage_transition(Stage::Layout, Stage::Style).is_ok());
        assert!(reporter.report_final(&state, &result).is_ok());

        let report = ValidationReport::new(
            "demo",
            vec![TierResult::new(
                Tier::Blocker,
                vec![ValidationResult::fail("lint", Tier::Blocker, "E501")],
            )],
            1,
        );
        assert!(reporter.push_validation_metrics(&report, "demo").is_ok());
        assert!(reporter.inject_validation_context(&report).is_ok());
        assert!(reporter.add_breadcrumb("done").is_ok());
    }
}
