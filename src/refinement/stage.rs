//! Refinement stages derived from confidence.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, TierGateError};

/// Pipeline stage. Always derived from the current confidence, never stored
/// independently of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Layout,
    Style,
    Polish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Layout => "layout",
            Stage::Style => "style",
            Stage::Polish => "polish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lower confidence bounds of the style and polish stages.
///
/// Layout covers `[0, style)`, style `[style, polish)`, polish `[polish, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageThresholds {
    pub style: f64,
    pub polish: f64,
}

impl Default for StageThresholds {
    fn default() -> Self {
        Self {
            style: 0.80,
            polish: 0.90,
        }
    }
}

impl StageThresholds {
    pub fn new(style: f64, polish: f64) -> Result<Self> {
        let thresholds = Self { style, polish };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.style) || !(0.0..=1.0).contains(&self.polish) {
            return Err(TierGateError::config(format!(
                "stage thresholds must be within [0, 1], got style={} polish={}",
                self.style, self.polish
            )));
        }
        if self.style >= self.polish {
            return Err(TierGateError::config(format!(
                "style threshold ({}) must be below polish threshold ({})",
                self.style, self.polish
            )));
        }
        Ok(())
    }

    /// Stage for a confidence value.
    pub fn get_current_stage(&self, confidence: f64) -> Stage {
        if confidence >= self.polish {
            Stage::Polish
        } else if confidence >= self.style {
            Stage::Style
        } else {
            Stage::Layout
        }
    }
}
