//! Core types for the flowloom workflow engine.
//!
//! This module defines the fundamental vocabulary used throughout the crate:
//! node kinds, workflow and execution statuses, trigger types, and the
//! identifier aliases shared by every component. These are the core domain
//! concepts that define what a workflow *is*.
//!
//! # Key Types
//!
//! - [`NodeKind`]: the behavioral type of a step in a workflow graph
//! - [`WorkflowStatus`] / [`ExecutionStatus`]: lifecycle state machines
//! - [`TriggerType`]: how an execution gets created
//!
//! # Examples
//!
//! ```rust
//! use flowloom::types::{ExecutionStatus, NodeKind};
//!
//! let kind = NodeKind::Approval;
//! assert!(!kind.is_start());
//! assert_eq!(kind.to_string(), "approval");
//!
//! assert!(ExecutionStatus::Completed.is_terminal());
//! assert!(!ExecutionStatus::Paused.is_terminal());
//! ```

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Identifier of a workflow definition.
pub type WorkflowId = Uuid;
/// Identifier of one run of a workflow.
pub type ExecutionId = Uuid;
/// Identifier of a pending human-decision request.
pub type ApprovalId = Uuid;
/// Identifier of an external integration descriptor.
pub type IntegrationId = Uuid;
/// Identifier of a recurring trigger definition.
pub type ScheduleId = Uuid;

/// The behavioral type of a step within a workflow graph.
///
/// A node's kind is derived from its typed config (see
/// [`NodeConfig`](crate::model::NodeConfig)), so a kind/config mismatch is
/// unrepresentable. `Loop`, `Parallel`, and `Merge` are reserved variants:
/// they deserialize and validate, but executing one fails fast instead of
/// silently behaving like a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Entry point. Exactly one per graph, validator-enforced.
    Start,
    /// Terminal step. At least one per graph.
    End,
    /// Performs a configured sub-operation (set, transform, http, custom).
    Task,
    /// Evaluates one condition and records `decision_result`.
    Decision,
    /// Evaluates a list of conditions and records the boolean results.
    Condition,
    /// Suspends the execution until a designated approver responds.
    Approval,
    /// Dispatches a message through the notification collaborator.
    Notification,
    /// Calls an external endpoint described by a `WorkflowIntegration`.
    Integration,
    /// Suspends the execution for a configured duration.
    Delay,
    /// Reserved, not executable.
    Loop,
    /// Reserved, not executable.
    Parallel,
    /// Reserved, not executable.
    Merge,
}

impl NodeKind {
    /// Returns `true` if this is the [`Start`](Self::Start) kind.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the [`End`](Self::End) kind.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }

    /// Returns `true` for the reserved kinds that have no executor behavior.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Loop | Self::Parallel | Self::Merge)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Task => "task",
            Self::Decision => "decision",
            Self::Condition => "condition",
            Self::Approval => "approval",
            Self::Notification => "notification",
            Self::Integration => "integration",
            Self::Delay => "delay",
            Self::Loop => "loop",
            Self::Parallel => "parallel",
            Self::Merge => "merge",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle state of a workflow definition.
///
/// Only `Active` workflows accept triggers. The transition into `Active`
/// is gated on graph validation (see [`crate::validator`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Archived,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Archived => "archived",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle state of one run of a workflow.
///
/// `Pending -> Running -> {Paused <-> Running} -> {Completed | Failed | Cancelled}`.
/// The three terminal states are final: the coordinator discards any outcome
/// or transition request that arrives afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Returns `true` once the execution can never change again.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// How a workflow execution gets created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Manual,
    Scheduled,
    Event,
    Webhook,
    Api,
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Manual => "manual",
            Self::Scheduled => "scheduled",
            Self::Event => "event",
            Self::Webhook => "webhook",
            Self::Api => "api",
        };
        write!(f, "{label}")
    }
}

/// Lifecycle state of a human-decision request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ApprovalStatus {
    /// Returns `true` once the request has been responded to or withdrawn.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{label}")
    }
}

/// HTTP verb used by integration-node calls and http task operations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{label}")
    }
}

/// An operation was requested against an entity in an incompatible state,
/// such as cancelling a completed execution or archiving an active workflow.
///
/// These are local, synchronous, caller-facing failures and are never
/// retried.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("invalid {entity} transition: {from} -> {to}")]
#[diagnostic(
    code(flowloom::invalid_transition),
    help("Check the entity's current status before requesting the operation.")
)]
pub struct InvalidTransitionError {
    pub entity: &'static str,
    pub from: String,
    pub to: String,
}

impl InvalidTransitionError {
    pub fn new(entity: &'static str, from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Paused.is_terminal());
    }

    #[test]
    fn node_kind_serde_round_trip() {
        let encoded = serde_json::to_string(&NodeKind::Notification).unwrap();
        assert_eq!(encoded, "\"notification\"");
        let decoded: NodeKind = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, NodeKind::Notification);
    }

    #[test]
    fn reserved_kinds() {
        for kind in [NodeKind::Loop, NodeKind::Parallel, NodeKind::Merge] {
            assert!(kind.is_reserved());
        }
        assert!(!NodeKind::Task.is_reserved());
    }
}
