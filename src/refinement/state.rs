//! Refinement loop state.
//!
//! A [`LoopState`] is never mutated in place by the loop: every advance
//! returns a new value so callers can compare before and after.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::stage::{Stage, StageThresholds};
use crate::validation::traits::clamp_unit;

/// One recorded iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub iteration: u32,
    pub confidence: f64,
    pub stage: Stage,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopState {
    pub iteration: u32,
    pub stage: Stage,
    /// Last fused confidence
    pub confidence: f64,
    /// Best confidence seen while in each stage
    pub stage_confidence: BTreeMap<Stage, f64>,
    pub history: Vec<HistoryEntry>,
    pub started_at: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
}

impl Default for LoopState {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopState {
    /// Fresh state at confidence 0.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            iteration: 0,
            stage: Stage::Layout,
            confidence: 0.0,
            stage_confidence: BTreeMap::new(),
            history: Vec::new(),
            started_at: now,
            last_update: now,
        }
    }

    /// Fresh state seeded with a starting confidence. The stage is derived
    /// from the confidence.
    pub fn with_confidence(confidence: f64, stages: &StageThresholds) -> Self {
        let confidence = clamp_unit(confidence);
        Self {
            confidence,
            stage: stages.get_current_stage(confidence),
            ..Self::new()
        }
    }

    /// Derive the next state from this one.
    pub fn advance(&self, confidence: f64, stage: Stage) -> LoopState {
        let now = Utc::now();
        let iteration = self.iteration + 1;

        let mut stage_confidence = self.stage_confidence.clone();
        let best = stage_confidence.entry(stage).or_insert(confidence);
        *best = best.max(confidence);

        let mut history = self.history.clone();
        history.push(HistoryEntry {
            iteration,
            confidence,
            stage,
            timestamp: now,
        });

        LoopState {
            iteration,
            stage,
            confidence,
            stage_confidence,
            history,
            started_at: self.started_at,
            last_update: now,
        }
    }

    /// Best confidence seen in `stage`, if the loop has been there.
    pub fn best_in_stage(&self, stage: Stage) -> Option<f64> {
        self.stage_confidence.get(&stage).copied()
    }

    /// Milliseconds between the first state and the latest advance.
    pub fn elapsed_ms(&self) -> i64 {
        (self.last_update - self.started_at).num_milliseconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = LoopState::new();
        assert_eq!(state.iteration, 0);
        assert_eq!(state.stage, Stage::Layout);
        assert!(state.history.is_empty());
        assert!(state.stage_confidence.is_empty());
    }

    #[test]
    fn test_advance_does_not_touch_original() {
        let state = LoopState::new();
        let next = state.advance(0.5, Stage::Layout);
        assert_eq!(state.iteration, 0);
        assert!(state.history.is_empty());
        assert_eq!(next.iteration, 1);
        assert_eq!(next.history.len(), 1);
        assert_eq!(next.history[0].iteration, 1);
        assert_eq!(next.started_at, state.started_at);
    }

    #[test]
    fn test_stage_confidence_keeps_best() {
        let state = LoopState::new()
            .advance(0.82, Stage::Style)
            .advance(0.85, Stage::Style)
            .advance(0.81, Stage::Style);
        assert_eq!(state.best_in_stage(Stage::Style), Some(0.85));
        assert_eq!(state.confidence, 0.81);
        assert_eq!(state.best_in_stage(Stage::Polish), None);
    }

    #[test]
    fn test_with_confidence() {
        let state = LoopState::with_confidence(0.7, &StageThresholds::default());
        assert_eq!(state.confidence, 0.7);
        assert_eq!(state.iteration, 0);
        assert_eq!(state.stage, Stage::Layout);
    }

    #[test]
    fn test_with_confidence_derives_stage() {
        let stages = StageThresholds::default();
        assert_eq!(LoopState::with_confidence(0.85, &stages).stage, Stage::Style);
        assert_eq!(LoopState::with_confidence(0.95, &stages).stage, Stage::Polish);
        assert_eq!(LoopState::with_confidence(1.7, &stages).confidence, 1.0);

        let custom = StageThresholds::new(0.5, 0.6).unwrap();
        assert_eq!(LoopState::with_confidence(0.55, &custom).stage, Stage::Style);
    }

    #[test]
    fn test_elapsed_ms_spans_advances() {
        let state = LoopState::new();
        assert_eq!(state.elapsed_ms(), 0);
        let next = state.advance(0.4, Stage::Layout);
        assert!(next.elapsed_ms() >= 0);
        assert_eq!(next.started_at, state.started_at);
    }

    #[test]
    fn test_serde_shape() {
        let state = LoopState::new().advance(0.9, Stage::Polish);
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["stage"], "polish");
        assert_eq!(json["stage_confidence"]["polish"], 0.9);
        assert_eq!(json["history"][0]["iteration"], 1);
    }
}
