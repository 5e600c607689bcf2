//! Configuration system for tiergate.
//!
//! One YAML document configures everything: which dimensions run at which
//! tier, dispatch limits, fusion weights and refinement limits.

use eyre::Result;
use std::path::PathBuf;

pub use self::dimensions::{CommandOptions, DimensionConfig, OrderedMap};
pub use self::global::{FusionConfig, GlobalConfig, OrchestratorConfig, RefinementConfig};

mod dimensions;
mod global;

/// Load configuration from the standard search paths.
///
/// Search order:
/// 1. Explicit path if provided
/// 2. .tiergate.yml in current directory (project config)
/// 3. ~/.config/tiergate/tiergate.yml (user config)
/// 4. Default values
pub fn load_config(explicit_path: Option<&PathBuf>) -> Result<GlobalConfig> {
    GlobalConfig::load(explicit_path)
}
