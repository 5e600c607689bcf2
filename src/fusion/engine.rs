//! Reliability-weighted score fusion.
//!
//! Combines per-dimension scores into one confidence:
//!
//! ```text
//! effective_weight(d) = weight(d) * reliability(d)
//! fused = Σ value(d) * effective_weight(d) / Σ effective_weight(d)
//! ```
//!
//! Dimensions from the base weight table that are absent from the input drop
//! out of the denominator, so a partial evaluation is renormalized instead of
//! being scored as poor quality.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{Result, TierGateError};
use crate::validation::traits::clamp_unit;

/// Default base weights for the visual refinement dimensions.
pub const DEFAULT_WEIGHTS: [(&str, f64); 4] = [
    ("visual", 0.35),
    ("behavioral", 0.25),
    ("accessibility", 0.20),
    ("performance", 0.20),
];

/// One dimension's score going into a fusion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    /// Score in [0, 1]
    pub value: f64,
    /// Non-negative base weight
    pub weight: f64,
    /// Trust in the score, in [0, 1]
    pub reliability: f64,
}

impl DimensionScore {
    /// Create a fully reliable score.
    pub fn new(dimension: impl Into<String>, value: f64, weight: f64) -> Self {
        Self::with_reliability(dimension, value, weight, 1.0)
    }

    /// Create a score with explicit reliability. Out-of-range inputs are
    /// clamped: value and reliability into [0, 1], weight to >= 0.
    pub fn with_reliability(dimension: impl Into<String>, value: f64, weight: f64, reliability: f64) -> Self {
        Self {
            dimension: dimension.into(),
            value: clamp_unit(value),
            weight: if weight.is_finite() { weight.max(0.0) } else { 0.0 },
            reliability: clamp_unit(reliability),
        }
    }

    /// weight * reliability
    pub fn effective_weight(&self) -> f64 {
        self.weight * self.reliability
    }
}

/// Detailed outcome of a fusion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusionResult {
    pub fused_score: f64,
    /// Share of the fused score per dimension; sums to `fused_score`
    pub dimension_contributions: BTreeMap<String, f64>,
    /// weight * reliability per dimension
    pub effective_weights: BTreeMap<String, f64>,
    /// Base-table dimensions absent from the input, in table order
    pub missing_dimensions: Vec<String>,
    pub details: Map<String, Value>,
}

/// Fuses dimension scores against a base weight table.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreFusion {
    weights: Vec<(String, f64)>,
}

impl Default for ScoreFusion {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.iter().map(|(d, w)| (d.to_string(), *w)).collect(),
        }
    }
}

impl ScoreFusion {
    /// Create a fusion with a custom base weight table.
    ///
    /// Every weight must be finite and non-negative.
    pub fn new<I, S>(weights: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table: Vec<(String, f64)> = Vec::new();
        for (dimension, weight) in weights {
            let dimension = dimension.into();
            if !weight.is_finite() || weight < 0.0 {
                return Err(TierGateError::config(format!(
                    "fusion weight for '{}' must be a non-negative number, got {}",
                    dimension, weight
                )));
            }
            match table.iter_mut().find(|(d, _)| *d == dimension) {
                Some(entry) => entry.1 = weight,
                None => table.push((dimension, weight)),
            }
        }
        Ok(Self { weights: table })
    }

    /// Base weight for a dimension, if it is in the table.
    pub fn weight(&self, dimension: &str) -> Option<f64> {
        self.weights.iter().find(|(d, _)| d == dimension).map(|(_, w)| *w)
    }

    /// Base weight table in declaration order.
    pub fn weights(&self) -> &[(String, f64)] {
        &self.weights
    }

    /// Build a score for `dimension` using its table weight (1.0 when the
    /// dimension is not in the table).
    pub fn score(&self, dimension: &str, value: f64, reliability: f64) -> DimensionScore {
        let weight = self.weight(dimension).unwrap_or(1.0);
        DimensionScore::with_reliability(dimension, value, weight, reliability)
    }

    /// Fused confidence only.
    pub fn fuse(&self, scores: &[DimensionScore]) -> f64 {
        self.fuse_with_details(scores).fused_score
    }

    /// Fused confidence plus per-dimension breakdown.
    pub fn fuse_with_details(&self, scores: &[DimensionScore]) -> FusionResult {
        let mut effective_weights: BTreeMap<String, f64> = BTreeMap::new();
        let mut weighted_values: BTreeMap<String, f64> = BTreeMap::new();

        for score in scores {
            let ew = score.effective_weight();
            *effective_weights.entry(score.dimension.clone()).or_insert(0.0) += ew;
            *weighted_values.entry(score.dimension.clone()).or_insert(0.0) += score.value * ew;
        }

        let total_weight: f64 = effective_weights.values().sum();
        let missing_dimensions: Vec<String> = self
            .weights
            .iter()
            .filter(|(d, _)| !effective_weights.contains_key(d))
            .map(|(d, _)| d.clone())
            .collect();

        let mut details = Map::new();
        details.insert("dimension_count".into(), Value::from(effective_weights.len()));
        details.insert("total_effective_weight".into(), Value::from(total_weight));

        if total_weight <= 0.0 {
            if !scores.is_empty() {
                details.insert("zero_total_weight".into(), Value::Bool(true));
            }
            let dimension_contributions = effective_weights.keys().map(|d| (d.clone(), 0.0)).collect();
            return FusionResult {
                fused_score: 0.0,
                dimension_contributions,
                effective_weights,
                missing_dimensions,
                details,
            };
        }

        let dimension_contributions: BTreeMap<String, f64> = weighted_values
            .iter()
            .map(|(d, wv)| (d.clone(), wv / total_weight))
            .collect();
        let fused_score = clamp_unit(dimension_contributions.values().sum());

        FusionResult {
            fused_score,
            dimension_contributions,
            effective_weights,
            missing_dimensions,
            details,
        }
    }
}
