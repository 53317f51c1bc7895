//! The execution variable map.
//!
//! Variables follow append/overwrite semantics and never shrink implicitly:
//! the only mutation is [`Variables::apply`], which folds an update into a
//! fresh map and swaps it in. Each applied update therefore leaves the
//! previous snapshot intact wherever it was captured (the execution log
//! records the post-merge snapshot per step, keeping "variables at the time
//! of this entry" reconstructable).

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A batch of variable writes produced by one node outcome.
pub type VariableUpdate = FxHashMap<String, Value>;

/// The variable state of one execution.
///
/// Owned exclusively by its execution; never shared across executions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables(FxHashMap<String, Value>);

impl Variables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the initial map: trigger payload entries overwrite workflow
    /// defaults key by key. Non-object payloads contribute nothing.
    #[must_use]
    pub fn seeded(defaults: &FxHashMap<String, Value>, payload: &Value) -> Self {
        let mut map: FxHashMap<String, Value> = defaults.clone();
        if let Value::Object(entries) = payload {
            for (key, value) in entries {
                map.insert(key.clone(), value.clone());
            }
        }
        Self(map)
    }

    /// Applies an update: later keys overwrite earlier ones, nothing is
    /// removed. The whole inner map is rebuilt and replaced so previously
    /// captured snapshots stay untouched.
    pub fn apply(&mut self, update: VariableUpdate) {
        if update.is_empty() {
            return;
        }
        let mut next = self.0.clone();
        next.extend(update);
        self.0 = next;
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let mut update = VariableUpdate::default();
        update.insert(key.into(), value);
        self.apply(update);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Point-in-time JSON object view, used for log entries.
    #[must_use]
    pub fn snapshot(&self) -> Value {
        let mut object = Map::new();
        for (key, value) in &self.0 {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

impl From<FxHashMap<String, Value>> for Variables {
    fn from(map: FxHashMap<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_overwrites_defaults() {
        let mut defaults = FxHashMap::default();
        defaults.insert("region".to_string(), json!("eu"));
        defaults.insert("retries".to_string(), json!(3));
        let vars = Variables::seeded(&defaults, &json!({"region": "us"}));
        assert_eq!(vars.get("region"), Some(&json!("us")));
        assert_eq!(vars.get("retries"), Some(&json!(3)));
    }

    #[test]
    fn apply_never_shrinks() {
        let mut vars = Variables::new();
        vars.insert("a", json!(1));
        let snapshot = vars.snapshot();

        let mut update = VariableUpdate::default();
        update.insert("b".to_string(), json!(2));
        update.insert("a".to_string(), json!(10));
        vars.apply(update);

        assert_eq!(vars.len(), 2);
        assert_eq!(vars.get("a"), Some(&json!(10)));
        // The earlier snapshot is unaffected by the merge.
        assert_eq!(snapshot["a"], json!(1));
    }
}
