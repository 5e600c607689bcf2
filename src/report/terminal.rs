//! Colored terminal rendering of validation results.

use colored::*;

use crate::validation::{FileValidationResult, TierResult, ValidationReport, ValidationResult};

fn status(passed: bool, skipped: bool) -> ColoredString {
    match (passed, skipped) {
        (true, true) => "SKIP".yellow(),
        (true, false) => "PASS".green(),
        (false, _) => "FAIL".red().bold(),
    }
}

fn render_result(out: &mut String, r: &ValidationResult) {
    let first_line = r.message.lines().next().unwrap_or("");
    out.push_str(&format!(
        "  [{}] {:<16} {:>6}ms  {}\n",
        status(r.passed, r.is_skipped()),
        r.dimension,
        r.duration_ms,
        first_line
    ));
    if !r.passed
        && let Some(fix) = &r.fix_suggestion
    {
        out.push_str(&format!("         {} {}\n", "fix:".cyan(), fix));
    }
}

fn render_tier(out: &mut String, tier: &TierResult) {
    let header = format!("Tier {} ({})", tier.tier.number(), tier.tier.name());
    let header = if tier.passed() { header.green() } else { header.red() };
    out.push_str(&format!("{}\n", header.bold()));
    if tier.results.is_empty() {
        out.push_str(&format!("  {}\n", "no validators".dimmed()));
    }
    for r in tier.sorted_results() {
        render_result(out, r);
    }
}

/// Multi-line summary of a full report.
pub fn render_report(report: &ValidationReport) -> String {
    let mut out = format!(
        "{} {} ({}ms)\n",
        "Validation:".bold(),
        report.project,
        report.execution_time_ms
    );
    for tier in &report.tiers {
        render_tier(&mut out, tier);
    }
    let verdict = if report.blocked() {
        "BLOCKED".red().bold()
    } else if report.overall_passed() {
        "PASSED".green().bold()
    } else {
        "PASSED WITH WARNINGS".yellow().bold()
    };
    out.push_str(&format!("Result: {}\n", verdict));
    out
}

/// Summary of a single-file validation.
pub fn render_file_result(result: &FileValidationResult) -> String {
    let mut out = format!("{} {}\n", "File:".bold(), result.path.display());
    if let Some(message) = &result.message {
        out.push_str(&format!("  {}\n", message.dimmed()));
    }
    for r in &result.results {
        render_result(&mut out, r);
    }
    out
}
