//! Directed connections between workflow nodes.

use serde::{Deserialize, Serialize};

use super::Condition;

/// A directed edge `source -> target` with an optional gating condition.
///
/// Declaration order is meaningful: when a node finishes, its outgoing
/// connections are evaluated in the order they were declared, and the first
/// conditioned connection whose condition holds wins. If no conditioned
/// connection matches, the first unconditioned connection is followed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConnection {
    pub source: String,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl WorkflowConnection {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            condition: None,
            label: None,
        }
    }

    #[must_use]
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}
