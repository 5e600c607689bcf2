//! Per-dimension configuration.
//!
//! ```yaml
//! dimensions:
//!   lint:     { enabled: true, tier: 1, command: "ruff check {file}" }
//!   coverage: { tier: 2, timeout_ms: 300000 }
//! ```
//!
//! Dimensions keep their declaration order, which becomes registration
//! order in the orchestrator.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use crate::error::{Result, TierGateError};
use crate::validation::Tier;

/// A string-keyed map that keeps declaration order. A repeated key replaces
/// the earlier value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<V>(pub Vec<(String, V)>);

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> OrderedMap<V> {
    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for OrderedMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut map = OrderedMap::default();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut map = OrderedMap::default();
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

fn default_enabled() -> bool {
    true
}

/// One `dimensions.<name>` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Required; 1, 2 or 3
    pub tier: Tier,
    /// Validator-specific options
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl DimensionConfig {
    pub fn new(tier: Tier) -> Self {
        Self {
            enabled: true,
            tier,
            options: Map::new(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Options understood by command-backed validators.
    pub fn command_options(&self, dimension: &str) -> Result<CommandOptions> {
        serde_json::from_value(Value::Object(self.options.clone()))
            .map_err(|e| TierGateError::config(format!("dimension '{}': {}", dimension, e)))
    }
}

/// Typed view of the options a command validator reads.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandOptions {
    pub command: Option<String>,
    pub timeout_ms: Option<u64>,
    pub extensions: Option<Vec<String>>,
    pub agent: Option<String>,
    pub fix_suggestion: Option<String>,
    pub reliability: Option<f64>,
    pub env: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_defaults_enabled() {
        let dim: DimensionConfig = serde_yaml::from_str("tier: 2").unwrap();
        assert!(dim.enabled);
        assert_eq!(dim.tier, Tier::Warning);
        assert!(dim.options.is_empty());
    }

    #[test]
    fn test_dimension_requires_tier() {
        assert!(serde_yaml::from_str::<DimensionConfig>("enabled: true").is_err());
    }

    #[test]
    fn test_dimension_rejects_bad_tier() {
        assert!(serde_yaml::from_str::<DimensionConfig>("tier: 5").is_err());
    }

    #[test]
    fn test_dimension_keeps_extra_options() {
        let dim: DimensionConfig =
            serde_yaml::from_str("tier: 1\ncommand: ruff check {file}\ntimeout_ms: 500\nextensions: [py]").unwrap();
        let opts = dim.command_options("lint").unwrap();
        assert_eq!(opts.command.as_deref(), Some("ruff check {file}"));
        assert_eq!(opts.timeout_ms, Some(500));
        assert_eq!(opts.extensions, Some(vec!["py".to_string()]));
    }

    #[test]
    fn test_malformed_options_are_config_errors() {
        let dim = DimensionConfig::new(Tier::Blocker).with_option("timeout_ms", "soon");
        let err = dim.command_options("lint").unwrap_err();
        assert!(err.to_string().contains("dimension 'lint'"));
    }

    #[test]
    fn test_ordered_map_preserves_order() {
        let map: OrderedMap<DimensionConfig> =
            serde_yaml::from_str("zeta: {tier: 1}\nalpha: {tier: 3}\nmid: {tier: 2}").unwrap();
        let names: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_ordered_map_duplicate_last_write_wins() {
        let map: OrderedMap<DimensionConfig> =
            serde_json::from_str(r#"{"lint": {"tier": 1}, "security": {"tier": 1}, "lint": {"tier": 2}}"#).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.0[0].0, "lint");
        assert_eq!(map.get("lint").unwrap().tier, Tier::Warning);
    }

    #[test]
    fn test_ordered_map_serializes_in_order() {
        let map: OrderedMap<f64> = vec![("b".to_string(), 1.0), ("a".to_string(), 2.0)].into_iter().collect();
        assert_eq!(serde_json::to_string(&map).unwrap(), r#"{"b":1.0,"a":2.0}"#);
    }
}
