//! Tiered validation orchestrator.
//!
//! Holds the dimension registry and runs it tier by tier. Blocker and
//! warning tiers run sequentially in registration order; the monitor tier
//! runs on a bounded worker pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::GlobalConfig;
use crate::error::{Result, TierGateError};
use crate::report::{ValidationSink, notify};
use crate::validation::registry::instantiate;
use crate::validation::{
    FileValidationResult, RegisteredValidator, Tier, TierResult, ValidationContext, ValidationReport, Validator,
};

use super::dispatch::{run_parallel, run_sequential};

/// Default bound on concurrent monitor-tier validators.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Runs registered validators by tier and aggregates their results.
///
/// The registry is read-only once the orchestrator is built, so one
/// instance can serve concurrent `run_tier`/`run_all` calls.
pub struct ValidationOrchestrator {
    project: String,
    project_root: PathBuf,
    validators: Vec<RegisteredValidator>,
    sinks: Vec<Arc<dyn ValidationSink>>,
    parallel_monitor: bool,
    max_workers: usize,
}

impl ValidationOrchestrator {
    /// Empty orchestrator for `project`, rooted at `project_root`.
    pub fn new(project: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            project: project.into(),
            project_root: project_root.into(),
            validators: Vec::new(),
            sinks: Vec::new(),
            parallel_monitor: true,
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }

    /// Build from config, one validator per enabled known dimension.
    ///
    /// Invalid settings fail here rather than during a run.
    pub fn from_config(config: &GlobalConfig, project_root: impl Into<PathBuf>) -> Result<Self> {
        config.validate()?;
        let validators = instantiate(&config.dimensions)?;
        log::info!(
            "Registered {} validators for project '{}'",
            validators.len(),
            config.project_name()
        );

        let mut orchestrator = Self::new(config.project_name(), project_root)
            .with_parallel_monitor(config.orchestrator.parallel_monitor)
            .with_max_workers(config.orchestrator.max_workers)?;
        for entry in validators {
            orchestrator.insert(entry);
        }
        Ok(orchestrator)
    }

    /// Register a validator under `dimension`.
    ///
    /// Re-registering a dimension replaces the earlier validator in place.
    pub fn register(mut self, dimension: impl Into<String>, tier: Tier, validator: Arc<dyn Validator>) -> Self {
        self.insert(RegisteredValidator::new(dimension, tier, validator));
        self
    }

    /// Register a validator under its own dimension and tier.
    pub fn with_validator(self, validator: impl Validator + 'static) -> Self {
        let dimension = validator.dimension().to_string();
        let tier = validator.tier();
        self.register(dimension, tier, Arc::new(validator))
    }

    pub fn with_sink(mut self, sink: Arc<dyn ValidationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn with_parallel_monitor(mut self, parallel: bool) -> Self {
        self.parallel_monitor = parallel;
        self
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Result<Self> {
        if max_workers == 0 {
            return Err(TierGateError::config("max_workers must be >= 1"));
        }
        self.max_workers = max_workers;
        Ok(self)
    }

    fn insert(&mut self, entry: RegisteredValidator) {
        match self.validators.iter_mut().find(|v| v.dimension == entry.dimension) {
            Some(existing) => {
                log::debug!("Replacing validator for dimension '{}'", entry.dimension);
                *existing = entry;
            }
            None => self.validators.push(entry),
        }
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// All registered validators, in registration order.
    pub fn validators(&self) -> &[RegisteredValidator] {
        &self.validators
    }

    /// Validators registered at `tier`, in registration order.
    pub fn validators_for(&self, tier: Tier) -> Vec<RegisteredValidator> {
        self.validators.iter().filter(|v| v.tier == tier).cloned().collect()
    }

    async fn dispatch(&self, tier: Tier, entries: &[RegisteredValidator], ctx: &ValidationContext) -> TierResult {
        let results = if tier == Tier::Monitor && self.parallel_monitor {
            run_parallel(entries, ctx, self.max_workers).await
        } else {
            run_sequential(entries, ctx).await
        };
        TierResult::new(tier, results)
    }

    /// Run every validator registered at `tier` against the whole project.
    pub async fn run_tier(&self, tier: Tier) -> TierResult {
        let entries = self.validators_for(tier);
        let ctx = ValidationContext::for_project(&self.project_root);
        log::debug!("Running {} tier with {} validators", tier.name(), entries.len());

        let result = self.dispatch(tier, &entries, &ctx).await;
        if !result.passed() {
            log::info!("{} tier failed: {}", tier.name(), result.failed_dimensions().join(", "));
        }
        result
    }

    /// Run all three tiers in order and notify sinks.
    ///
    /// A failing blocker tier marks the report blocked but never stops the
    /// later tiers from running.
    pub async fn run_all(&self) -> ValidationReport {
        let start = Instant::now();
        let mut tiers = Vec::with_capacity(Tier::ALL.len());
        for tier in Tier::ALL {
            tiers.push(self.run_tier(tier).await);
        }

        let report = ValidationReport::new(&self.project, tiers, start.elapsed().as_millis() as u64);
        if report.blocked() {
            log::warn!("Project '{}' is blocked by the {} tier", self.project, Tier::Blocker.name());
        }
        self.notify_sinks(&report);
        report
    }

    fn notify_sinks(&self, report: &ValidationReport) {
        let breadcrumb = format!(
            "validation {} for {} ({} results, {}ms)",
            if report.blocked() { "blocked" } else { "completed" },
            report.project,
            report.result_count(),
            report.execution_time_ms
        );
        for sink in &self.sinks {
            notify("push_validation_metrics", || sink.push_validation_metrics(report, &self.project));
            notify("inject_validation_context", || sink.inject_validation_context(report));
            notify("add_breadcrumb", || sink.add_breadcrumb(&breadcrumb));
        }
    }

    /// Validate one file with the validators at `tier` that handle its type.
    ///
    /// When none apply, the result passes with an explanatory message.
    pub async fn validate_file(&self, path: impl AsRef<Path>, tier: Tier) -> FileValidationResult {
        let path = path.as_ref();
        let entries: Vec<RegisteredValidator> = self
            .validators
            .iter()
            .filter(|v| v.tier == tier && v.validator.applies_to(path))
            .cloned()
            .collect();

        if entries.is_empty() {
            let kind = match path.extension() {
                Some(ext) => format!(".{} files", ext.to_string_lossy()),
                None => "files without an extension".to_string(),
            };
            return FileValidationResult {
                path: path.to_path_buf(),
                tier,
                results: Vec::new(),
                message: Some(format!("no {} validators for {}", tier.name().to_lowercase(), kind)),
            };
        }

        let ctx = ValidationContext::for_file(&self.project_root, path);
        let result = self.dispatch(tier, &entries, &ctx).await;
        FileValidationResult {
            path: path.to_path_buf(),
            tier,
            results: result.results,
            message: None,
        }
    }
}

impl std::fmt::Debug for ValidationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationOrchestrator")
            .field("project", &self.project)
            .field("project_root", &self.project_root)
            .field("validators", &self.validators)
            .field("sinks", &self.sinks.len())
            .field("parallel_monitor", &self.parallel_monitor)
            .field("max_workers", &self.max_workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationResult;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockValidator {
        dimension: String,
        tier: Tier,
        passed: bool,
        crash: bool,
        extension: Option<&'static str>,
    }

    impl MockValidator {
        fn new(dimension: &str, tier: Tier, passed: bool) -> Self {
            Self {
                dimension: dimension.into(),
                tier,
                passed,
                crash: false,
                extension: None,
            }
        }

        fn crashing(dimension: &str, tier: Tier) -> Self {
            Self {
                crash: true,
                ..Self::new(dimension, tier, true)
            }
        }

        fn for_extension(mut self, ext: &'static str) -> Self {
            self.extension = Some(ext);
            self
        }
    }

    #[async_trait]
    impl Validator for MockValidator {
        fn dimension(&self) -> &str {
            &self.dimension
        }

        fn tier(&self) -> Tier {
            self.tier
        }

        fn applies_to(&self, path: &Path) -> bool {
            self.extension
                .is_some_and(|ext| path.extension().is_some_and(|e| e == ext))
        }

        async fn validate(&self, ctx: &ValidationContext) -> Result<ValidationResult> {
            if self.crash {
                return Err(TierGateError::Validator("segfault in tool".into()));
            }
            let message = match &ctx.file {
                Some(file) => format!("checked {}", file.display()),
                None => "checked project".to_string(),
            };
            Ok(if self.passed {
                ValidationResult::pass(&self.dimension, self.tier, message)
            } else {
                ValidationResult::fail(&self.dimension, self.tier, message)
            })
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Mutex<Vec<String>>,
    }

    impl ValidationSink for RecordingSink {
        fn push_validation_metrics(&self, report: &ValidationReport, project: &str) -> Result<()> {
            self.calls
                .lock()
                .map_err(|e| TierGateError::Reporter(e.to_string()))?
                .push(format!("metrics:{}:{}", project, report.result_count()));
            Ok(())
        }

        fn inject_validation_context(&self, _report: &ValidationReport) -> Result<()> {
            self.calls
                .lock()
                .map_err(|e| TierGateError::Reporter(e.to_string()))?
                .push("context".into());
            Ok(())
        }

        fn add_breadcrumb(&self, message: &str) -> Result<()> {
            self.calls
                .lock()
                .map_err(|e| TierGateError::Reporter(e.to_string()))?
                .push(format!("breadcrumb:{}", message));
            Ok(())
        }
    }

    struct BrokenSink;

    impl ValidationSink for BrokenSink {
        fn push_validation_metrics(&self, _report: &ValidationReport, _project: &str) -> Result<()> {
            Err(TierGateError::Reporter("pushgateway unreachable".into()))
        }

        fn inject_validation_context(&self, _report: &ValidationReport) -> Result<()> {
            panic!("error tracker not initialised")
        }
    }

    fn orchestrator() -> ValidationOrchestrator {
        ValidationOrchestrator::new("demo", "/tmp")
    }

    #[tokio::test]
    async fn test_run_tier_in_registration_order() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("zeta", Tier::Blocker, true))
            .with_validator(MockValidator::new("alpha", Tier::Blocker, true))
            .with_validator(MockValidator::new("mid", Tier::Blocker, true));

        let result = orch.run_tier(Tier::Blocker).await;
        let dims: Vec<&str> = result.results.iter().map(|r| r.dimension.as_str()).collect();
        assert_eq!(dims, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_run_tier_selects_only_that_tier() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("lint", Tier::Blocker, true))
            .with_validator(MockValidator::new("coverage", Tier::Warning, false))
            .with_validator(MockValidator::new("visual", Tier::Monitor, true));

        let warning = orch.run_tier(Tier::Warning).await;
        assert_eq!(warning.results.len(), 1);
        assert_eq!(warning.results[0].dimension, "coverage");
        assert!(!warning.passed());
    }

    #[tokio::test]
    async fn test_empty_tier_passes() {
        let result = orchestrator().run_tier(Tier::Monitor).await;
        assert!(result.results.is_empty());
        assert!(result.passed());
    }

    #[tokio::test]
    async fn test_crashing_validator_fails_open() {
        let orch = orchestrator()
            .with_validator(MockValidator::crashing("type_check", Tier::Blocker))
            .with_validator(MockValidator::new("lint", Tier::Blocker, true));

        let result = orch.run_tier(Tier::Blocker).await;
        assert_eq!(result.results.len(), 2);
        assert!(!result.results[0].passed);
        assert!(result.results[0].message.starts_with("error: "));
        assert!(result.results[0].message.contains("segfault in tool"));
        assert!(result.results[1].passed);
    }

    #[tokio::test]
    async fn test_run_all_runs_every_tier_after_blocker_failure() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("lint", Tier::Blocker, false))
            .with_validator(MockValidator::new("coverage", Tier::Warning, true))
            .with_validator(MockValidator::new("visual", Tier::Monitor, true));

        let report = orch.run_all().await;
        assert!(report.blocked());
        assert_eq!(report.tiers.len(), 3);
        let tiers: Vec<Tier> = report.tiers.iter().map(|t| t.tier).collect();
        assert_eq!(tiers, vec![Tier::Blocker, Tier::Warning, Tier::Monitor]);
        assert_eq!(report.result_count(), 3);
        assert_eq!(report.project, "demo");
    }

    #[tokio::test]
    async fn test_warning_failure_does_not_block() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("lint", Tier::Blocker, true))
            .with_validator(MockValidator::new("coverage", Tier::Warning, false));

        let report = orch.run_all().await;
        assert!(!report.blocked());
        assert!(!report.overall_passed());
    }

    #[tokio::test]
    async fn test_register_replaces_in_place() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("lint", Tier::Blocker, false))
            .with_validator(MockValidator::new("security", Tier::Blocker, true))
            .with_validator(MockValidator::new("lint", Tier::Blocker, true));

        assert_eq!(orch.validators().len(), 2);
        let result = orch.run_tier(Tier::Blocker).await;
        assert_eq!(result.results[0].dimension, "lint");
        assert!(result.passed());
    }

    #[tokio::test]
    async fn test_monitor_tier_sequential_when_disabled() {
        let orch = orchestrator()
            .with_parallel_monitor(false)
            .with_validator(MockValidator::new("visual", Tier::Monitor, true))
            .with_validator(MockValidator::crashing("performance", Tier::Monitor));

        let result = orch.run_tier(Tier::Monitor).await;
        assert_eq!(result.results.len(), 2);
        assert!(!result.passed());
    }

    #[tokio::test]
    async fn test_sinks_notified_and_failures_swallowed() {
        let recording = Arc::new(RecordingSink::default());
        let orch = orchestrator()
            .with_sink(Arc::new(BrokenSink))
            .with_sink(recording.clone())
            .with_validator(MockValidator::new("lint", Tier::Blocker, true));

        let report = orch.run_all().await;
        assert!(!report.blocked());

        let calls = recording.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], "metrics:demo:1");
        assert_eq!(calls[1], "context");
        assert!(calls[2].starts_with("breadcrumb:validation completed for demo"));
    }

    #[tokio::test]
    async fn test_validate_file_filters_by_extension() {
        let orch = orchestrator()
            .with_validator(MockValidator::new("lint", Tier::Blocker, true).for_extension("py"))
            .with_validator(MockValidator::new("api_contract", Tier::Blocker, false).for_extension("yaml"))
            .with_validator(MockValidator::new("visual", Tier::Monitor, false).for_extension("py"));

        let result = orch.validate_file("src/app.py", Tier::Blocker).await;
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].dimension, "lint");
        assert_eq!(result.results[0].message, "checked src/app.py");
        assert!(result.passed());
        assert!(result.message.is_none());
    }

    #[tokio::test]
    async fn test_validate_file_unknown_extension_passes() {
        let orch = orchestrator().with_validator(MockValidator::new("lint", Tier::Blocker, false).for_extension("py"));

        let result = orch.validate_file("README.md", Tier::Blocker).await;
        assert!(result.passed());
        assert!(result.results.is_empty());
        assert_eq!(result.message.as_deref(), Some("no blocker validators for .md files"));

        let result = orch.validate_file("Makefile", Tier::Blocker).await;
        assert_eq!(
            result.message.as_deref(),
            Some("no blocker validators for files without an extension")
        );
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(orchestrator().with_max_workers(0).is_err());
        assert!(orchestrator().with_max_workers(2).is_ok());
    }

    #[test]
    fn test_from_config_registers_enabled_dimensions() {
        let config = GlobalConfig::from_yaml_str(
            r#"
project: shop
dimensions:
  security: { tier: 1 }
  lint: { tier: 1, command: "ruff check {file}" }
  coverage: { tier: 2, enabled: false }
  unheard_of: { tier: 3 }
orchestrator:
  max_workers: 2
"#,
        )
        .unwrap();

        let orch = ValidationOrchestrator::from_config(&config, "/tmp").unwrap();
        assert_eq!(orch.project(), "shop");
        let dims: Vec<&str> = orch.validators().iter().map(|v| v.dimension.as_str()).collect();
        assert_eq!(dims, vec!["security", "lint"]);
        assert_eq!(orch.validators_for(Tier::Warning).len(), 0);
    }

    #[test]
    fn test_from_config_rejects_incomplete_dimension() {
        let config = GlobalConfig::from_yaml_str(
            r#"
dimensions:
  visual: { tier: 3 }
"#,
        )
        .unwrap();
        let err = ValidationOrchestrator::from_config(&config, "/tmp").unwrap_err();
        assert!(err.to_string().contains("visual"));
    }
}
