//! Built-in dimension registry.
//!
//! Maps known dimension names to command-backed validators. Unknown names
//! in the config are ignored.

use std::sync::Arc;

use crate::config::{DimensionConfig, OrderedMap};
use crate::error::{Result, TierGateError};
use crate::validation::command::{CommandConfig, CommandValidator};
use crate::validation::traits::{Tier, Validator};

/// A validator bound to a dimension name and tier.
#[derive(Clone)]
pub struct RegisteredValidator {
    pub dimension: String,
    pub tier: Tier,
    pub validator: Arc<dyn Validator>,
}

impl RegisteredValidator {
    pub fn new(dimension: impl Into<String>, tier: Tier, validator: Arc<dyn Validator>) -> Self {
        Self {
            dimension: dimension.into(),
            tier,
            validator,
        }
    }
}

impl std::fmt::Debug for RegisteredValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredValidator")
            .field("dimension", &self.dimension)
            .field("tier", &self.tier)
            .field("validator", &self.validator.description())
            .finish()
    }
}

/// Dimensions with a built-in constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Lint,
    TypeCheck,
    Security,
    Format,
    Coverage,
    ApiContract,
    Visual,
    Behavioral,
    Accessibility,
    Performance,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 10] = [
        DimensionKind::Lint,
        DimensionKind::TypeCheck,
        DimensionKind::Security,
        DimensionKind::Format,
        DimensionKind::Coverage,
        DimensionKind::ApiContract,
        DimensionKind::Visual,
        DimensionKind::Behavioral,
        DimensionKind::Accessibility,
        DimensionKind::Performance,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DimensionKind::Lint => "lint",
            DimensionKind::TypeCheck => "type_check",
            DimensionKind::Security => "security",
            DimensionKind::Format => "format",
            DimensionKind::Coverage => "coverage",
            DimensionKind::ApiContract => "api_contract",
            DimensionKind::Visual => "visual",
            DimensionKind::Behavioral => "behavioral",
            DimensionKind::Accessibility => "accessibility",
            DimensionKind::Performance => "performance",
        }
    }

    /// Command used when the config does not supply one.
    pub fn default_command(&self) -> Option<&'static str> {
        match self {
            DimensionKind::Lint => Some("ruff check {file}"),
            DimensionKind::TypeCheck => Some("pyright {file}"),
            DimensionKind::Security => Some("bandit -q -r {file}"),
            DimensionKind::Format => Some("ruff format --check {file}"),
            DimensionKind::Coverage => Some("coverage report --fail-under=80"),
            DimensionKind::ApiContract => Some("oasdiff breaking base.yaml head.yaml --fail-on ERR"),
            _ => None,
        }
    }

    /// File extensions checked by the default command.
    pub fn default_extensions(&self) -> &'static [&'static str] {
        match self {
            DimensionKind::Lint | DimensionKind::TypeCheck | DimensionKind::Format => &["py", "pyi"],
            DimensionKind::Security => &["py"],
            DimensionKind::ApiContract => &["yaml", "yml", "json"],
            _ => &[],
        }
    }

    fn default_fix_suggestion(&self) -> Option<&'static str> {
        match self {
            DimensionKind::Lint => Some("run `ruff check --fix`"),
            DimensionKind::Format => Some("run `ruff format`"),
            _ => None,
        }
    }

    /// Construct the validator for a configured dimension.
    pub fn build(&self, config: &DimensionConfig) -> Result<CommandValidator> {
        let name = self.name();
        let options = config.command_options(name)?;

        let command = options
            .command
            .or_else(|| self.default_command().map(str::to_string))
            .ok_or_else(|| TierGateError::config(format!("dimension '{}' requires a command", name)))?;

        let extensions: Vec<String> = options
            .extensions
            .unwrap_or_else(|| self.default_extensions().iter().map(|e| e.to_string()).collect());

        let mut command_config = CommandConfig::new(command).extensions(extensions);
        if let Some(timeout_ms) = options.timeout_ms {
            command_config = command_config.timeout_ms(timeout_ms);
        }
        for (key, value) in options.env {
            command_config = command_config.env(key, value);
        }

        let mut validator = CommandValidator::new(name, config.tier, command_config);
        if let Some(agent) = options.agent {
            validator = validator.with_agent(agent);
        }
        if let Some(fix) = options
            .fix_suggestion
            .or_else(|| self.default_fix_suggestion().map(str::to_string))
        {
            validator = validator.with_fix_suggestion(fix);
        }
        if let Some(reliability) = options.reliability {
            validator = validator.with_reliability(reliability);
        }
        Ok(validator)
    }
}

/// Instantiate one validator per enabled, known dimension, in config order.
pub fn instantiate(dimensions: &OrderedMap<DimensionConfig>) -> Result<Vec<RegisteredValidator>> {
    let mut registered = Vec::new();
    for (name, config) in dimensions.iter() {
        if !config.enabled {
            log::debug!("dimension '{}' disabled", name);
            continue;
        }
        let Some(kind) = DimensionKind::from_name(name) else {
            log::debug!("dimension '{}' has no built-in validator, ignoring", name);
            continue;
        };
        let validator = kind.build(config)?;
        registered.push(RegisteredValidator::new(name, config.tier, Arc::new(validator)));
    }
    Ok(registered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_names_round_trip() {
        for kind in DimensionKind::ALL {
            assert_eq!(DimensionKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(DimensionKind::from_name("mystery"), None);
    }

    #[test]
    fn test_build_with_defaults() {
        let validator = DimensionKind::Lint.build(&DimensionConfig::new(Tier::Blocker)).unwrap();
        assert_eq!(validator.dimension(), "lint");
        assert_eq!(validator.tier(), Tier::Blocker);
        assert_eq!(validator.command(), "ruff check {file}");
        assert!(validator.applies_to(Path::new("app.py")));
    }

    #[test]
    fn test_build_with_overrides() {
        let config = DimensionConfig::new(Tier::Warning)
            .with_option("command", "mypy {file}")
            .with_option("timeout_ms", 1000)
            .with_option("extensions", serde_json::json!(["py"]))
            .with_option("agent", "type-fixer");
        let validator = DimensionKind::TypeCheck.build(&config).unwrap();
        assert_eq!(validator.command(), "mypy {file}");
        assert_eq!(validator.config().timeout_ms, 1000);
        assert_eq!(validator.agent(), Some("type-fixer"));
        assert!(!validator.applies_to(Path::new("stub.pyi")));
    }

    #[test]
    fn test_visual_requires_command() {
        assert!(DimensionKind::Visual.build(&DimensionConfig::new(Tier::Monitor)).is_err());
        let config = DimensionConfig::new(Tier::Monitor).with_option("command", "odiff a.png b.png");
        assert!(DimensionKind::Visual.build(&config).is_ok());
    }

    #[test]
    fn test_instantiate_skips_unknown_and_disabled() {
        let mut dimensions = OrderedMap::default();
        dimensions.insert("security", DimensionConfig::new(Tier::Blocker));
        dimensions.insert("mystery", DimensionConfig::new(Tier::Blocker));
        dimensions.insert("coverage", DimensionConfig::new(Tier::Warning).disabled());
        dimensions.insert("lint", DimensionConfig::new(Tier::Blocker));

        let registered = instantiate(&dimensions).unwrap();
        let names: Vec<&str> = registered.iter().map(|r| r.dimension.as_str()).collect();
        assert_eq!(names, vec!["security", "lint"]);
    }

    #[test]
    fn test_instantiate_propagates_config_errors() {
        let mut dimensions = OrderedMap::default();
        dimensions.insert("lint", DimensionConfig::new(Tier::Blocker).with_option("timeout_ms", "never"));
        assert!(instantiate(&dimensions).is_err());
    }
}
