//! Global configuration.
//!
//! Loaded from an explicit path, ./.tiergate.yml or
//! ~/.config/tiergate/tiergate.yml. JSON files work too.

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::dimensions::{DimensionConfig, OrderedMap};
use crate::error::TierGateError;
use crate::fusion::{DEFAULT_WEIGHTS, ScoreFusion};
use crate::refinement::{StageThresholds, TerminationConfig};
use crate::validation::fused::DEFAULT_PASS_THRESHOLD;

/// Global configuration for tiergate.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Project name used in reports (defaults to the current directory name).
    pub project: Option<String>,

    /// Validation dimensions, in registration order.
    pub dimensions: OrderedMap<DimensionConfig>,

    /// Dispatch settings.
    pub orchestrator: OrchestratorConfig,

    /// Score fusion weights.
    pub fusion: FusionConfig,

    /// Refinement loop limits.
    pub refinement: RefinementConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Run monitor-tier validators in the bounded worker pool.
    pub parallel_monitor: bool,
    /// Upper bound on concurrent monitor-tier validators.
    pub max_workers: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel_monitor: true,
            max_workers: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FusionConfig {
    pub weights: OrderedMap<f64>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.iter().map(|(d, w)| (d.to_string(), *w)).collect(),
        }
    }
}

impl FusionConfig {
    pub fn build(&self) -> crate::error::Result<ScoreFusion> {
        ScoreFusion::new(self.weights.iter().map(|(d, w)| (d, *w)))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RefinementConfig {
    pub confidence_threshold: f64,
    pub max_iterations: usize,
    pub stall_epsilon: f64,
    pub stall_count_limit: usize,
    /// Fused score a fused validator needs to pass.
    pub pass_threshold: f64,
    pub stages: StageThresholds,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        let termination = TerminationConfig::default();
        Self {
            confidence_threshold: termination.confidence_threshold,
            max_iterations: termination.max_iterations,
            stall_epsilon: termination.stall_epsilon,
            stall_count_limit: termination.stall_count_limit,
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            stages: StageThresholds::default(),
        }
    }
}

impl RefinementConfig {
    pub fn termination(&self) -> TerminationConfig {
        TerminationConfig {
            confidence_threshold: self.confidence_threshold,
            max_iterations: self.max_iterations,
            stall_epsilon: self.stall_epsilon,
            stall_count_limit: self.stall_count_limit,
        }
    }
}

impl GlobalConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .tiergate.yml in current directory
    /// 3. ~/.config/tiergate/tiergate.yml
    /// 4. Defaults
    ///
    /// A config file that exists but does not load is an error; defaults are
    /// only used when no file is found.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        Self::load_with_search(config_path, Path::new("."), dirs::config_dir())
    }

    /// Fallback chain with explicit search locations.
    pub fn load_with_search(
        config_path: Option<&PathBuf>,
        project_dir: &Path,
        user_config_dir: Option<PathBuf>,
    ) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = project_dir.join(".tiergate.yml");
        if project_config.exists() {
            let config = Self::load_from_file(&project_config)
                .context(format!("Failed to load config from {}", project_config.display()))?;
            log::info!("Loaded config from {}", project_config.display());
            return Ok(config);
        }

        if let Some(config_dir) = user_config_dir {
            let user_config = config_dir.join("tiergate").join("tiergate.yml");
            if user_config.exists() {
                let config = Self::load_from_file(&user_config)
                    .context(format!("Failed to load config from {}", user_config.display()))?;
                log::info!("Loaded config from {}", user_config.display());
                return Ok(config);
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load and validate a config file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config = Self::from_yaml_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Parse and validate YAML (or JSON) text.
    pub fn from_yaml_str(content: &str) -> crate::error::Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric settings eagerly so bad values fail at startup.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.orchestrator.max_workers == 0 {
            return Err(TierGateError::config("orchestrator.max_workers must be >= 1"));
        }
        if !(0.0..=1.0).contains(&self.refinement.pass_threshold) {
            return Err(TierGateError::config("refinement.pass_threshold must be within [0, 1]"));
        }
        self.fusion.build()?;
        self.refinement.termination().validate()?;
        self.refinement.stages.validate()?;
        Ok(())
    }

    /// Project name, falling back to the current directory name.
    pub fn project_name(&self) -> String {
        self.project.clone().unwrap_or_else(|| {
            std::env::current_dir()
                .ok()
                .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "project".to_string())
        })
    }

    /// Enabled dimensions in registration order.
    pub fn enabled_dimensions(&self) -> impl Iterator<Item = (&str, &DimensionConfig)> {
        self.dimensions.iter().filter(|(_, d)| d.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::Tier;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    const SAMPLE: &str = r#"
project: storefront
dimensions:
  lint: { enabled: true, tier: 1, command: "ruff check {file}" }
  security: { tier: 1 }
  coverage: { enabled: false, tier: 2 }
  visual: { tier: 3, command: "odiff a.png b.png", reliability: 0.8 }
orchestrator:
  max_workers: 2
fusion:
  weights: { visual: 0.5, behavioral: 0.5 }
refinement:
  confidence_threshold: 0.9
  max_iterations: 5
  stages: { style: 0.7, polish: 0.85 }
"#;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert!(config.dimensions.is_empty());
        assert!(config.orchestrator.parallel_monitor);
        assert_eq!(config.orchestrator.max_workers, 4);
        assert_eq!(config.fusion.weights.get("visual"), Some(&0.35));
        assert_eq!(config.refinement.max_iterations, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_sample() {
        let config = GlobalConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.project_name(), "storefront");
        assert_eq!(config.dimensions.len(), 4);
        assert_eq!(config.orchestrator.max_workers, 2);
        assert!(config.orchestrator.parallel_monitor);
        assert_eq!(config.refinement.confidence_threshold, 0.9);
        assert_eq!(config.refinement.stall_count_limit, 3);
        assert_eq!(config.refinement.stages.style, 0.7);

        let enabled: Vec<&str> = config.enabled_dimensions().map(|(n, _)| n).collect();
        assert_eq!(enabled, vec!["lint", "security", "visual"]);
        assert_eq!(config.dimensions.get("visual").unwrap().tier, Tier::Monitor);
    }

    #[test]
    fn test_parse_json() {
        let config =
            GlobalConfig::from_yaml_str(r#"{"dimensions": {"lint": {"tier": 1}}, "orchestrator": {"parallel_monitor": false}}"#)
                .unwrap();
        assert_eq!(config.dimensions.len(), 1);
        assert!(!config.orchestrator.parallel_monitor);
    }

    #[test]
    fn test_invalid_refinement_rejected() {
        assert!(GlobalConfig::from_yaml_str("refinement: { max_iterations: 0 }").is_err());
        assert!(GlobalConfig::from_yaml_str("refinement: { confidence_threshold: 1.5 }").is_err());
        assert!(GlobalConfig::from_yaml_str("refinement: { stages: { style: 0.9, polish: 0.8 } }").is_err());
    }

    #[test]
    fn test_invalid_fusion_weight_rejected() {
        assert!(GlobalConfig::from_yaml_str("fusion: { weights: { visual: -1.0 } }").is_err());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(GlobalConfig::from_yaml_str("orchestrator: { max_workers: 0 }").is_err());
    }

    #[test]
    fn test_missing_tier_rejected() {
        assert!(GlobalConfig::from_yaml_str("dimensions: { lint: { enabled: true } }").is_err());
    }

    #[test]
    fn test_malformed_document_rejected() {
        assert!(GlobalConfig::from_yaml_str("{ dimensions: [").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = GlobalConfig::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.project.as_deref(), Some("storefront"));
    }

    fn write_file(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_malformed_project_config_fails() {
        let project = TempDir::new().unwrap();
        write_file(&project.path().join(".tiergate.yml"), "dimensions:\n  lint: { enabled: true }\n");

        let result = GlobalConfig::load_with_search(None, project.path(), None);

        let err = result.unwrap_err();
        assert!(format!("{:?}", err).contains(".tiergate.yml"));
    }

    #[test]
    fn test_load_malformed_project_config_does_not_fall_back_to_user_config() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write_file(&project.path().join(".tiergate.yml"), "{ dimensions: [");
        write_file(&user.path().join("tiergate").join("tiergate.yml"), SAMPLE);

        assert!(GlobalConfig::load_with_search(None, project.path(), Some(user.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_load_project_config_found() {
        let project = TempDir::new().unwrap();
        write_file(&project.path().join(".tiergate.yml"), SAMPLE);

        let config = GlobalConfig::load_with_search(None, project.path(), None).unwrap();
        assert_eq!(config.dimensions.len(), 4);
    }

    #[test]
    fn test_load_user_config_when_no_project_config() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write_file(&user.path().join("tiergate").join("tiergate.yml"), SAMPLE);

        let config = GlobalConfig::load_with_search(None, project.path(), Some(user.path().to_path_buf())).unwrap();
        assert_eq!(config.project.as_deref(), Some("storefront"));
    }

    #[test]
    fn test_load_malformed_user_config_fails() {
        let project = TempDir::new().unwrap();
        let user = TempDir::new().unwrap();
        write_file(&user.path().join("tiergate").join("tiergate.yml"), "refinement: { max_iterations: 0 }");

        assert!(GlobalConfig::load_with_search(None, project.path(), Some(user.path().to_path_buf())).is_err());
    }

    #[test]
    fn test_load_defaults_when_nothing_found() {
        let project = TempDir::new().unwrap();
        let config = GlobalConfig::load_with_search(None, project.path(), None).unwrap();
        assert!(config.dimensions.is_empty());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let missing = PathBuf::from("/nonexistent/tiergate.yml");
        assert!(GlobalConfig::load(Some(&missing)).is_err());
    }
}
