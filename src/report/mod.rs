//! Reporter callbacks for the refinement loop and the orchestrator.
//!
//! Reporters are side-effect-only sinks (terminal, metrics, error tracker).
//! Every call goes through [`notify`], which logs and swallows failures so
//! validation results never depend on observability being reachable.

pub mod log_reporter;
pub mod terminal;

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::error::Result;
use crate::refinement::{LoopState, Stage, TerminationResult};
use crate::validation::ValidationReport;

pub use log_reporter::LogReporter;
pub use terminal::{render_file_result, render_report};

/// Receives progress from a [`ProgressiveRefinementLoop`](crate::refinement::ProgressiveRefinementLoop).
pub trait RefinementReporter: Send + Sync {
    fn report_iteration(&self, state: &LoopState, result: &TerminationResult) -> Result<()>;

    fn report_stage_transition(&self, from: Stage, to: Stage) -> Result<()>;

    fn report_final(&self, state: &LoopState, result: &TerminationResult) -> Result<()>;
}

/// Receives finished reports from a [`ValidationOrchestrator`](crate::orchestrator::ValidationOrchestrator).
pub trait ValidationSink: Send + Sync {
    /// Push per-dimension metrics for `project`.
    fn push_validation_metrics(&self, report: &ValidationReport, project: &str) -> Result<()>;

    /// Attach the report to the error tracker's context.
    fn inject_validation_context(&self, report: &ValidationReport) -> Result<()>;

    /// Leave a breadcrumb in the error tracker.
    fn add_breadcrumb(&self, _message: &str) -> Result<()> {
        Ok(())
    }
}

/// Run one reporter call, logging and discarding errors and panics.
pub fn notify<F>(label: &str, f: F)
where
    F: FnOnce() -> Result<()>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("{} failed: {}", label, e),
        Err(_) => log::warn!("{} panicked", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TierGateError;
    use std::cell::Cell;

    #[test]
    fn test_notify_runs_callback() {
        let called = Cell::new(false);
        notify("ok", || {
            called.set(true);
            Ok(())
        });
        assert!(called.get());
    }

    #[test]
    fn test_notify_swallows_error() {
        notify("failing", || Err(TierGateError::Reporter("down".into())));
    }

    #[test]
    fn test_notify_swallows_panic() {
        notify("panicking", || panic!("sink exploded"));
    }
}
