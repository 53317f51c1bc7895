//! Connection and node conditions, and their evaluation against execution
//! variables.
//!
//! A [`Condition`] is a `field / operator / value` triple. Evaluation is
//! total: a missing field, a non-comparable value, or an unusable operand
//! evaluates to `false` rather than raising an error, so a misconfigured
//! condition can never take an execution down. An absent condition on a
//! connection is treated as always-true by the traversal layer.
//!
//! # Examples
//!
//! ```rust
//! use flowloom::model::{Condition, ConditionOperator};
//! use flowloom::execution::Variables;
//! use serde_json::json;
//!
//! let mut vars = Variables::new();
//! vars.insert("amount", json!(150));
//!
//! let cond = Condition::new("amount", ConditionOperator::GreaterThan, json!(100));
//! assert!(cond.evaluate(&vars));
//!
//! // Missing fields never error, they just fail the check.
//! let cond = Condition::new("missing", ConditionOperator::Equals, json!(1));
//! assert!(!cond.evaluate(&vars));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::execution::Variables;

/// Comparison operator of a [`Condition`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    /// Substring test against the stringified field value, or membership
    /// when the field holds an array.
    Contains,
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
        };
        write!(f, "{label}")
    }
}

/// A predicate over the execution variable map.
///
/// Used both on connections (to decide whether traversal follows an edge)
/// and inside decision/condition node configs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Variable name looked up in the execution's variable map.
    pub field: String,
    pub operator: ConditionOperator,
    /// Right-hand operand, compared against the field's current value.
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluates this condition against the given variables.
    ///
    /// Deterministic for a fixed variable map: repeated evaluations always
    /// produce the same answer. Never panics and never errors.
    #[must_use]
    pub fn evaluate(&self, variables: &Variables) -> bool {
        let Some(actual) = variables.get(&self.field) else {
            return false;
        };

        match self.operator {
            ConditionOperator::Equals => loose_eq(actual, &self.value),
            ConditionOperator::NotEquals => !loose_eq(actual, &self.value),
            ConditionOperator::GreaterThan => match (as_number(actual), as_number(&self.value)) {
                (Some(a), Some(b)) => a > b,
                _ => false,
            },
            ConditionOperator::LessThan => match (as_number(actual), as_number(&self.value)) {
                (Some(a), Some(b)) => a < b,
                _ => false,
            },
            ConditionOperator::Contains => contains(actual, &self.value),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// Equality with numeric coercion so that `1`, `1.0`, and `"1"` compare
/// equal, matching how trigger payloads arrive from loosely-typed callers.
fn loose_eq(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (as_number(a), as_number(b)) {
        (Some(x), Some(y)) => x == y,
        _ => stringify(a) == stringify(b),
    }
}

fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(item, needle)),
        other => stringify(other).contains(&stringify(needle)),
    }
}

/// Numeric view of a JSON value; numeric strings coerce too.
fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Stringified form used for equality fallback and substring tests.
/// Strings render without surrounding quotes.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> Variables {
        let mut v = Variables::new();
        for (k, val) in pairs {
            v.insert(*k, val.clone());
        }
        v
    }

    #[test]
    fn equals_with_numeric_coercion() {
        let v = vars(&[("n", json!(1))]);
        assert!(Condition::new("n", ConditionOperator::Equals, json!(1.0)).evaluate(&v));
        assert!(Condition::new("n", ConditionOperator::Equals, json!("1")).evaluate(&v));
        assert!(!Condition::new("n", ConditionOperator::Equals, json!(2)).evaluate(&v));
    }

    #[test]
    fn ordering_operators() {
        let v = vars(&[("amount", json!(150))]);
        assert!(Condition::new("amount", ConditionOperator::GreaterThan, json!(100)).evaluate(&v));
        assert!(!Condition::new("amount", ConditionOperator::LessThan, json!(100)).evaluate(&v));
        // Non-numeric operands fail the check instead of erroring.
        assert!(
            !Condition::new("amount", ConditionOperator::GreaterThan, json!("abc")).evaluate(&v)
        );
    }

    #[test]
    fn contains_substring_and_membership() {
        let v = vars(&[
            ("name", json!("workflow engine")),
            ("tags", json!(["alpha", "beta"])),
        ]);
        assert!(Condition::new("name", ConditionOperator::Contains, json!("engine")).evaluate(&v));
        assert!(Condition::new("tags", ConditionOperator::Contains, json!("beta")).evaluate(&v));
        assert!(!Condition::new("tags", ConditionOperator::Contains, json!("gamma")).evaluate(&v));
    }

    #[test]
    fn missing_field_is_false_for_every_operator() {
        let v = Variables::new();
        for op in [
            ConditionOperator::Equals,
            ConditionOperator::NotEquals,
            ConditionOperator::GreaterThan,
            ConditionOperator::LessThan,
            ConditionOperator::Contains,
        ] {
            assert!(!Condition::new("ghost", op, json!(1)).evaluate(&v));
        }
    }
}
