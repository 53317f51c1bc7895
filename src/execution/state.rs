//! The `WorkflowExecution` record and its status state machine.
//!
//! Transition methods enforce the machine locally and return
//! [`InvalidTransitionError`] on violation; the coordinator is the only
//! component that calls them (single-writer ownership, including the
//! `current_node` pointer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::Variables;
use crate::model::Workflow;
use crate::types::{ExecutionId, ExecutionStatus, InvalidTransitionError, WorkflowId};

/// Reference to the external object an execution was triggered for, stored
/// as an explicit pair instead of a polymorphic back-reference. Resolving
/// the subject to real data stays with the caller that owns that domain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSubject {
    pub subject_type: String,
    pub subject_id: String,
}

impl TriggerSubject {
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// One run of a workflow.
///
/// Created by `ExecutionCoordinator::trigger`, mutated only by the
/// coordinator, immutable once a terminal status is reached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub triggered_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<TriggerSubject>,
    pub trigger_payload: Value,
    pub variables: Variables,
    /// The node currently dispatched or suspended on. Single-writer: only
    /// the coordinator moves this pointer, which is what makes duplicate
    /// work-item deliveries detectable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    /// Creates a pending execution seeded with the workflow's variable
    /// defaults overlaid by the trigger payload.
    pub fn new(workflow: &Workflow, triggered_by: impl Into<String>, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id: workflow.id,
            status: ExecutionStatus::Pending,
            triggered_by: triggered_by.into(),
            subject: None,
            variables: Variables::seeded(&workflow.variable_defaults, &payload),
            trigger_payload: payload,
            current_node: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall-clock duration, available once the execution is terminal.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }

    fn transition(
        &mut self,
        allowed_from: &[ExecutionStatus],
        to: ExecutionStatus,
    ) -> Result<(), InvalidTransitionError> {
        if !allowed_from.contains(&self.status) {
            return Err(InvalidTransitionError::new("execution", self.status, to));
        }
        self.status = to;
        Ok(())
    }

    /// `Pending -> Running`.
    pub fn start(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(&[ExecutionStatus::Pending], ExecutionStatus::Running)
    }

    /// `Running -> Paused`, entered when a node signals suspension.
    pub fn pause(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(&[ExecutionStatus::Running], ExecutionStatus::Paused)
    }

    /// `Paused -> Running`, entered on approval response or delay expiry.
    pub fn resume(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(&[ExecutionStatus::Paused], ExecutionStatus::Running)
    }

    /// `Running -> Completed`. Terminal.
    pub fn complete(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(&[ExecutionStatus::Running], ExecutionStatus::Completed)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `{Pending, Running, Paused} -> Failed`. Terminal; records the error.
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransitionError> {
        self.transition(
            &[
                ExecutionStatus::Pending,
                ExecutionStatus::Running,
                ExecutionStatus::Paused,
            ],
            ExecutionStatus::Failed,
        )?;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    /// `{Pending, Running, Paused} -> Cancelled`. Terminal. Cooperative:
    /// in-flight node work is not aborted, its late outcome is discarded.
    pub fn cancel(&mut self) -> Result<(), InvalidTransitionError> {
        self.transition(
            &[
                ExecutionStatus::Pending,
                ExecutionStatus::Running,
                ExecutionStatus::Paused,
            ],
            ExecutionStatus::Cancelled,
        )?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphModel, NodeConfig};
    use serde_json::json;

    fn execution() -> WorkflowExecution {
        let workflow = Workflow::new("wf", "tester").with_graph(
            GraphModel::new()
                .with_node("start", NodeConfig::Start)
                .with_node("done", NodeConfig::End)
                .connect("start", "done"),
        );
        WorkflowExecution::new(&workflow, "tester", json!({}))
    }

    #[test]
    fn happy_path_transitions() {
        let mut exec = execution();
        assert_eq!(exec.status, ExecutionStatus::Pending);
        exec.start().unwrap();
        exec.pause().unwrap();
        exec.resume().unwrap();
        exec.complete().unwrap();
        assert!(exec.is_terminal());
        assert!(exec.completed_at.is_some());
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut exec = execution();
        exec.start().unwrap();
        exec.fail("boom").unwrap();

        assert!(exec.start().is_err());
        assert!(exec.pause().is_err());
        assert!(exec.resume().is_err());
        assert!(exec.complete().is_err());
        assert!(exec.cancel().is_err());
        assert_eq!(exec.status, ExecutionStatus::Failed);
        assert_eq!(exec.error.as_deref(), Some("boom"));
    }

    #[test]
    fn cancel_from_paused() {
        let mut exec = execution();
        exec.start().unwrap();
        exec.pause().unwrap();
        exec.cancel().unwrap();
        assert_eq!(exec.status, ExecutionStatus::Cancelled);
    }
}
