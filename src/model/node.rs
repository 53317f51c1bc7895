//! Workflow nodes and their typed, per-kind configuration.
//!
//! Node configuration is a serde-tagged union ([`NodeConfig`]) rather than an
//! opaque map: each node kind carries exactly the fields its executor needs,
//! decoded once when the workflow definition is loaded instead of re-parsed
//! on every execution. A node's [`NodeKind`] is derived from its config
//! variant, so a kind/config mismatch cannot be represented.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::collaborators::NotificationChannel;
use crate::types::{HttpMethod, IntegrationId, NodeKind};

/// One step in a workflow graph.
///
/// The node id is unique within its workflow and is what connections
/// reference. Position is presentation-only and carried through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    pub config: NodeConfig,
}

impl WorkflowNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>, config: NodeConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Position::default(),
            config,
        }
    }

    /// The behavioral kind of this node, derived from its config variant.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.config.kind()
    }
}

/// Canvas coordinates used by graph editors. Never read by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Per-kind node configuration.
///
/// Serialized with a `"type"` tag so stored graph definitions stay
/// readable:
///
/// ```json
/// { "type": "delay", "duration_secs": 3600 }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Start,
    End,
    Task {
        operation: TaskOperation,
    },
    Decision {
        condition: super::Condition,
    },
    Condition {
        conditions: Vec<super::Condition>,
    },
    Approval {
        /// Identity of the designated approver. The executor fails fast
        /// when this is empty.
        approver_id: String,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        request_data: Value,
    },
    Notification {
        channel: NotificationChannel,
        recipients: Vec<String>,
        #[serde(default)]
        subject: Option<String>,
        /// Body template; `{{variable}}` placeholders are substituted with
        /// current execution variables before delivery.
        body: String,
    },
    Integration {
        integration_id: IntegrationId,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        path: String,
        #[serde(default)]
        headers: FxHashMap<String, String>,
        /// Payload template, substituted recursively before the call.
        #[serde(default)]
        payload: Value,
    },
    Delay {
        duration_secs: u64,
    },
    Loop,
    Parallel,
    Merge,
}

impl NodeConfig {
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Start => NodeKind::Start,
            Self::End => NodeKind::End,
            Self::Task { .. } => NodeKind::Task,
            Self::Decision { .. } => NodeKind::Decision,
            Self::Condition { .. } => NodeKind::Condition,
            Self::Approval { .. } => NodeKind::Approval,
            Self::Notification { .. } => NodeKind::Notification,
            Self::Integration { .. } => NodeKind::Integration,
            Self::Delay { .. } => NodeKind::Delay,
            Self::Loop => NodeKind::Loop,
            Self::Parallel => NodeKind::Parallel,
            Self::Merge => NodeKind::Merge,
        }
    }
}

/// Sub-operation performed by a task node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TaskOperation {
    /// Store literal values into the execution variable map.
    Set { values: FxHashMap<String, Value> },
    /// Copy existing variables under new names.
    Transform { mappings: Vec<VariableMapping> },
    /// Fetch a URL and store the response body as `task_response`.
    Http {
        url: String,
        #[serde(default)]
        method: HttpMethod,
    },
    /// Named no-op recorded in the variables; an extension point for
    /// callers that post-process the execution log.
    Custom { name: String },
}

/// One rename/copy rule of a transform task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableMapping {
    pub from: String,
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn config_tag_round_trip() {
        let node = WorkflowNode::new("wait", "Cool-down", NodeConfig::Delay { duration_secs: 60 });
        let encoded = serde_json::to_value(&node).unwrap();
        assert_eq!(encoded["config"]["type"], json!("delay"));
        let decoded: WorkflowNode = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded.kind(), crate::types::NodeKind::Delay);
        assert_eq!(decoded, node);
    }

    #[test]
    fn kind_tracks_config_variant() {
        let node = WorkflowNode::new(
            "notify",
            "Tell the team",
            NodeConfig::Notification {
                channel: NotificationChannel::Email,
                recipients: vec!["ops@example.com".into()],
                subject: Some("Done".into()),
                body: "Run {{run_id}} finished".into(),
            },
        );
        assert_eq!(node.kind(), crate::types::NodeKind::Notification);
    }
}
