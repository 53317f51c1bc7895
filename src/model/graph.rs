//! In-memory representation of a workflow's nodes and connections.
//!
//! [`GraphModel`] is pure data plus lookup helpers; structural soundness
//! lives in [`crate::validator`] and traversal lives in the execution
//! coordinator. The fluent `with_node` / `connect` builders exist mostly so
//! graphs read naturally at construction sites and in tests.
//!
//! # Examples
//!
//! ```rust
//! use flowloom::model::{GraphModel, NodeConfig};
//!
//! let graph = GraphModel::new()
//!     .with_node("start", NodeConfig::Start)
//!     .with_node("done", NodeConfig::End)
//!     .connect("start", "done");
//!
//! assert_eq!(graph.nodes.len(), 2);
//! assert!(graph.start_node().is_some());
//! ```

use serde::{Deserialize, Serialize};

use super::{Condition, NodeConfig, WorkflowConnection, WorkflowNode};
use crate::types::NodeKind;

/// Nodes plus directed connections; declaration order of both is preserved.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphModel {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub connections: Vec<WorkflowConnection>,
}

impl GraphModel {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node whose display name is its id. Use [`add_node`](Self::add_node)
    /// when a separate display name matters.
    #[must_use]
    pub fn with_node(self, id: &str, config: NodeConfig) -> Self {
        let node = WorkflowNode::new(id, id, config);
        self.add_node(node)
    }

    #[must_use]
    pub fn add_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds an unconditioned connection.
    #[must_use]
    pub fn connect(mut self, source: &str, target: &str) -> Self {
        self.connections.push(WorkflowConnection::new(source, target));
        self
    }

    /// Adds a connection gated on `condition`.
    #[must_use]
    pub fn connect_if(mut self, source: &str, target: &str, condition: Condition) -> Self {
        self.connections
            .push(WorkflowConnection::new(source, target).with_condition(condition));
        self
    }

    #[must_use]
    pub fn add_connection(mut self, connection: WorkflowConnection) -> Self {
        self.connections.push(connection);
        self
    }

    /// Looks up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// The unique start node, when there is exactly one.
    #[must_use]
    pub fn start_node(&self) -> Option<&WorkflowNode> {
        let mut starts = self.nodes.iter().filter(|n| n.kind() == NodeKind::Start);
        let first = starts.next()?;
        if starts.next().is_some() {
            return None;
        }
        Some(first)
    }

    /// Outgoing connections of `node_id` in declaration order.
    pub fn connections_from<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a WorkflowConnection> {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// Incoming connections of `node_id` in declaration order.
    pub fn connections_to<'a>(
        &'a self,
        node_id: &'a str,
    ) -> impl Iterator<Item = &'a WorkflowConnection> {
        self.connections.iter().filter(move |c| c.target == node_id)
    }
}
