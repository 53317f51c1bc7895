//! Static structural validation of workflow graphs.
//!
//! [`validate`] is pure: it reads a [`GraphModel`] and either returns `Ok`
//! or an [`InvalidGraphError`] carrying *every* issue found, so an author
//! fixes the graph in one round trip instead of playing whack-a-mole. It has
//! no side effects and is callable standalone (CI pipelines lint stored
//! graph definitions with it).
//!
//! Checks, all required before a workflow may activate:
//!
//! 1. exactly one `start` node
//! 2. at least one `end` node
//! 3. node ids are unique
//! 4. every connection references nodes that exist
//! 5. no orphaned non-start nodes (each needs an incoming connection once
//!    the graph has more than one node)
//! 6. no cycles (depth-first search with an explicit recursion stack; a
//!    back-edge to a node on the stack is a cycle)
//!
//! # Examples
//!
//! ```rust
//! use flowloom::model::{GraphModel, NodeConfig};
//! use flowloom::validator;
//!
//! let graph = GraphModel::new()
//!     .with_node("start", NodeConfig::Start)
//!     .with_node("done", NodeConfig::End)
//!     .connect("start", "done");
//! assert!(validator::validate(&graph).is_ok());
//!
//! let err = validator::validate(&GraphModel::new()).unwrap_err();
//! assert_eq!(err.issues.len(), 2); // no start, no end
//! ```

use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use thiserror::Error;

use crate::model::GraphModel;
use crate::types::NodeKind;

/// One structural complaint about a graph.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum GraphIssue {
    #[error("graph has no start node")]
    NoStartNode,
    #[error("graph has {count} start nodes, expected exactly one")]
    MultipleStartNodes { count: usize },
    #[error("graph has no end node")]
    NoEndNode,
    #[error("duplicate node id '{id}'")]
    DuplicateNodeId { id: String },
    #[error("connection references unknown source node '{id}'")]
    DanglingSource { id: String },
    #[error("connection references unknown target node '{id}'")]
    DanglingTarget { id: String },
    #[error("node '{id}' is orphaned: no incoming connection")]
    OrphanedNode { id: String },
    #[error("cycle detected through node '{id}'")]
    CycleDetected { id: String },
}

/// A graph failed validation; `issues` holds the complete list.
#[derive(Debug, Diagnostic)]
#[diagnostic(
    code(flowloom::validator::invalid_graph),
    help("Fix every listed issue; workflows only activate on a clean report.")
)]
pub struct InvalidGraphError {
    pub issues: Vec<GraphIssue>,
}

impl std::error::Error for InvalidGraphError {}

impl fmt::Display for InvalidGraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "workflow graph failed validation with {} issue(s):", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {issue}")?;
        }
        Ok(())
    }
}

impl InvalidGraphError {
    /// Human-readable issue list, one line per complaint.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Validates `graph`, collecting every structural issue.
pub fn validate(graph: &GraphModel) -> Result<(), InvalidGraphError> {
    let mut issues = Vec::new();

    let start_count = graph
        .nodes
        .iter()
        .filter(|n| n.kind() == NodeKind::Start)
        .count();
    match start_count {
        0 => issues.push(GraphIssue::NoStartNode),
        1 => {}
        count => issues.push(GraphIssue::MultipleStartNodes { count }),
    }

    if !graph.nodes.iter().any(|n| n.kind() == NodeKind::End) {
        issues.push(GraphIssue::NoEndNode);
    }

    let mut ids: FxHashSet<&str> = FxHashSet::default();
    for node in &graph.nodes {
        if !ids.insert(node.id.as_str()) {
            issues.push(GraphIssue::DuplicateNodeId {
                id: node.id.clone(),
            });
        }
    }

    for connection in &graph.connections {
        if !ids.contains(connection.source.as_str()) {
            issues.push(GraphIssue::DanglingSource {
                id: connection.source.clone(),
            });
        }
        if !ids.contains(connection.target.as_str()) {
            issues.push(GraphIssue::DanglingTarget {
                id: connection.target.clone(),
            });
        }
    }

    if graph.nodes.len() > 1 {
        for node in &graph.nodes {
            if node.kind() == NodeKind::Start {
                continue;
            }
            if graph.connections_to(&node.id).next().is_none() {
                issues.push(GraphIssue::OrphanedNode {
                    id: node.id.clone(),
                });
            }
        }
    }

    issues.extend(find_cycles(graph));

    if issues.is_empty() {
        Ok(())
    } else {
        Err(InvalidGraphError { issues })
    }
}

#[derive(Clone, Copy, PartialEq)]
enum VisitState {
    Unvisited,
    OnStack,
    Done,
}

/// DFS over the adjacency built from connections whose endpoints both
/// exist. A back-edge to a node currently on the recursion stack is
/// reported once, naming the node it re-enters.
fn find_cycles(graph: &GraphModel) -> Vec<GraphIssue> {
    let ids: FxHashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut adjacency: FxHashMap<&str, Vec<&str>> = FxHashMap::default();
    for connection in &graph.connections {
        if ids.contains(connection.source.as_str()) && ids.contains(connection.target.as_str()) {
            adjacency
                .entry(connection.source.as_str())
                .or_default()
                .push(connection.target.as_str());
        }
    }

    let mut state: FxHashMap<&str, VisitState> = graph
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), VisitState::Unvisited))
        .collect();
    let mut issues = Vec::new();

    for node in &graph.nodes {
        if state[node.id.as_str()] == VisitState::Unvisited {
            dfs(node.id.as_str(), &adjacency, &mut state, &mut issues);
        }
    }
    issues
}

fn dfs<'a>(
    node: &'a str,
    adjacency: &FxHashMap<&'a str, Vec<&'a str>>,
    state: &mut FxHashMap<&'a str, VisitState>,
    issues: &mut Vec<GraphIssue>,
) {
    state.insert(node, VisitState::OnStack);
    if let Some(targets) = adjacency.get(node) {
        for &target in targets {
            let seen = state[target];
            match seen {
                VisitState::OnStack => issues.push(GraphIssue::CycleDetected {
                    id: target.to_string(),
                }),
                VisitState::Unvisited => dfs(target, adjacency, state, issues),
                VisitState::Done => {}
            }
        }
    }
    state.insert(node, VisitState::Done);
}
