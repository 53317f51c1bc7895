//! The execution coordinator: owner of the `WorkflowExecution` state
//! machine.
//!
//! The coordinator is the single writer of execution records. It creates
//! executions on trigger, consumes work items from the dispatcher, applies
//! node outcomes, and advances or halts graph traversal. Within one
//! execution nodes run strictly sequentially: the `current_node` pointer is
//! moved only here, which is also what makes at-least-once delivery safe.
//! A redelivered work item whose (execution, node, status) no longer
//! matches the pointer is absorbed as a debug-logged no-op: no duplicate
//! log entry, no double dispatch. Outcomes that arrive for a terminal
//! execution are discarded.
//!
//! Connection selection: outgoing connections are evaluated in declaration
//! order; the first conditioned connection whose condition holds wins, and
//! when none match the first unconditioned connection is followed. When
//! nothing matches at all, traversal stops where it is. The execution stays
//! `running` with a warn-level log entry naming the node, making the dead
//! end operator-visible without inventing a failure the graph never
//! declared.

use miette::Diagnostic;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

use super::log::ExecutionLogEntry;
use super::state::{TriggerSubject, WorkflowExecution};
use super::variables::VariableUpdate;
use crate::approvals::WorkflowApproval;
use crate::dispatch::{DispatchError, WorkDispatcher, WorkItem};
use crate::model::GraphModel;
use crate::nodes::{NodeExecutor, NodeOutcome};
use crate::store::{Store, StoreError};
use crate::types::{
    ApprovalStatus, ExecutionId, ExecutionStatus, InvalidTransitionError, WorkflowId,
    WorkflowStatus,
};

/// Errors raised by coordinator operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CoordinatorError {
    /// Triggering was requested for a workflow that is not active.
    #[error("workflow {workflow_id} is not active (status: {status})")]
    #[diagnostic(
        code(flowloom::coordinator::workflow_not_active),
        help("Activate the workflow before triggering it.")
    )]
    WorkflowNotActive {
        workflow_id: WorkflowId,
        status: WorkflowStatus,
    },

    /// An active workflow without a unique start node should be impossible
    /// (the validator gates activation); raised defensively if stored state
    /// was tampered with.
    #[error("workflow {workflow_id} has no unique start node")]
    #[diagnostic(code(flowloom::coordinator::missing_start))]
    MissingStartNode { workflow_id: WorkflowId },

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Owns execution state transitions and graph traversal.
pub struct ExecutionCoordinator {
    store: Arc<dyn Store>,
    dispatcher: Arc<dyn WorkDispatcher>,
    executor: NodeExecutor,
}

impl ExecutionCoordinator {
    pub fn new(
        store: Arc<dyn Store>,
        dispatcher: Arc<dyn WorkDispatcher>,
        executor: NodeExecutor,
    ) -> Self {
        Self {
            store,
            dispatcher,
            executor,
        }
    }

    /// Creates and starts a new execution of `workflow_id`.
    ///
    /// Fails with [`CoordinatorError::WorkflowNotActive`] unless the
    /// workflow is active. Variables are seeded from the workflow defaults
    /// overlaid by `payload`; the start node is dispatched through the work
    /// queue rather than run inline.
    #[instrument(skip(self, payload), err)]
    pub async fn trigger(
        &self,
        workflow_id: WorkflowId,
        triggered_by: &str,
        payload: serde_json::Value,
    ) -> Result<WorkflowExecution, CoordinatorError> {
        self.trigger_inner(workflow_id, triggered_by, None, payload)
            .await
    }

    /// Like [`trigger`](Self::trigger), but records the external object the
    /// execution runs for as an explicit `(subject_type, subject_id)` pair.
    pub async fn trigger_for_subject(
        &self,
        workflow_id: WorkflowId,
        triggered_by: &str,
        subject: TriggerSubject,
        payload: serde_json::Value,
    ) -> Result<WorkflowExecution, CoordinatorError> {
        self.trigger_inner(workflow_id, triggered_by, Some(subject), payload)
            .await
    }

    async fn trigger_inner(
        &self,
        workflow_id: WorkflowId,
        triggered_by: &str,
        subject: Option<TriggerSubject>,
        payload: serde_json::Value,
    ) -> Result<WorkflowExecution, CoordinatorError> {
        let workflow = self.store.workflow(workflow_id).await?;
        if workflow.status != WorkflowStatus::Active {
            return Err(CoordinatorError::WorkflowNotActive {
                workflow_id,
                status: workflow.status,
            });
        }
        let start_id = workflow
            .graph
            .start_node()
            .ok_or(CoordinatorError::MissingStartNode { workflow_id })?
            .id
            .clone();

        let mut execution = WorkflowExecution::new(&workflow, triggered_by, payload);
        execution.subject = subject;
        self.store.put_execution(execution.clone()).await?;
        self.store.record_trigger(workflow_id).await?;
        self.store
            .append_log(ExecutionLogEntry::debug(
                execution.id,
                None,
                "execution created",
                json!({
                    "workflow_id": workflow_id,
                    "triggered_by": triggered_by,
                    "payload": execution.trigger_payload,
                }),
            ))
            .await?;

        execution.start()?;
        self.dispatch_node(&mut execution, &start_id).await?;
        tracing::info!(
            execution = %execution.id,
            workflow = %workflow_id,
            triggered_by,
            "execution started"
        );
        Ok(execution)
    }

    /// Consumes one work item. Infrastructure errors are logged and
    /// swallowed so a worker loop survives a flaky backend; the item is
    /// redelivered by the at-least-once queue in that case anyway.
    pub async fn process(&self, item: WorkItem) {
        let result = match &item {
            WorkItem::RunNode {
                execution_id,
                node_id,
            } => self.run_node(*execution_id, node_id).await,
            WorkItem::ResumeDelay {
                execution_id,
                node_id,
            } => self.resume_delay(*execution_id, node_id).await,
        };
        if let Err(e) = result {
            tracing::error!(?item, error = %e, "work item processing failed");
        }
    }

    /// Executes one node for one execution, then advances.
    async fn run_node(
        &self,
        execution_id: ExecutionId,
        node_id: &str,
    ) -> Result<(), CoordinatorError> {
        let execution = match self.store.execution(execution_id).await {
            Ok(execution) => execution,
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(execution = %execution_id, "work item for unknown execution dropped");
                return Ok(());
            }
            Err(other) => return Err(other.into()),
        };

        if execution.is_terminal() {
            tracing::debug!(
                execution = %execution_id,
                node = node_id,
                status = %execution.status,
                "dropping delivery for terminal execution"
            );
            return Ok(());
        }
        if execution.status != ExecutionStatus::Running
            || execution.current_node.as_deref() != Some(node_id)
        {
            tracing::debug!(
                execution = %execution_id,
                node = node_id,
                status = %execution.status,
                current = execution.current_node.as_deref().unwrap_or("-"),
                "absorbing stale or duplicate delivery"
            );
            return Ok(());
        }

        let workflow = self.store.workflow(execution.workflow_id).await?;
        let Some(node) = workflow.graph.node(node_id) else {
            // The graph of an active workflow is read-only, so this only
            // happens with tampered storage.
            self.finish_failed(execution, node_id, format!("node '{node_id}' not found in graph"))
                .await?;
            return Ok(());
        };

        let outcome = match self.executor.execute(&execution, node).await {
            Ok(outcome) => outcome,
            Err(e) => NodeOutcome::failure(e.to_string()),
        };
        self.advance_after_node(execution_id, node_id, outcome).await
    }

    /// Applies a node outcome: merges variables, writes the log entry, and
    /// either fails, pauses, completes, or dispatches the next node.
    ///
    /// Idempotent with respect to `(execution_id, node_id)`: if the
    /// execution has moved on or terminated, the outcome is discarded
    /// without a log entry or dispatch.
    #[instrument(skip(self, outcome), err)]
    pub async fn advance_after_node(
        &self,
        execution_id: ExecutionId,
        node_id: &str,
        outcome: NodeOutcome,
    ) -> Result<(), CoordinatorError> {
        let mut execution = self.store.execution(execution_id).await?;
        if execution.is_terminal() {
            tracing::debug!(
                execution = %execution_id,
                node = node_id,
                "discarding outcome for terminal execution"
            );
            return Ok(());
        }
        if execution.status != ExecutionStatus::Running
            || execution.current_node.as_deref() != Some(node_id)
        {
            tracing::debug!(
                execution = %execution_id,
                node = node_id,
                "discarding outcome for stale transition"
            );
            return Ok(());
        }

        execution.variables.apply(outcome.variables.clone());

        let entry_data = json!({
            "success": outcome.success,
            "error": outcome.error,
            "variables": execution.variables.snapshot(),
        });
        let entry = if outcome.success {
            ExecutionLogEntry::info(
                execution_id,
                Some(node_id.to_string()),
                format!("node '{node_id}' executed"),
                entry_data,
            )
        } else {
            ExecutionLogEntry::error(
                execution_id,
                Some(node_id.to_string()),
                format!(
                    "node '{node_id}' failed: {}",
                    outcome.error.as_deref().unwrap_or("unknown error")
                ),
                entry_data,
            )
        };
        self.store.append_log(entry).await?;

        if !outcome.success {
            let message = outcome
                .error
                .unwrap_or_else(|| format!("node '{node_id}' failed"));
            return self.finish_failed(execution, node_id, message).await;
        }

        if outcome.pause_execution {
            execution.pause()?;
            self.store.put_execution(execution).await?;
            tracing::info!(
                execution = %execution_id,
                node = node_id,
                "execution paused awaiting external resume"
            );
            return Ok(());
        }

        if outcome.end_execution {
            return self.finish_completed(execution).await;
        }

        self.advance_past(&mut execution, node_id).await
    }

    /// Continues traversal from `node_id`'s outgoing connections. Shared by
    /// the normal advance path and the approval/delay resume paths.
    async fn advance_past(
        &self,
        execution: &mut WorkflowExecution,
        node_id: &str,
    ) -> Result<(), CoordinatorError> {
        let workflow = self.store.workflow(execution.workflow_id).await?;
        match select_next(&workflow.graph, node_id, execution) {
            Some(target) => {
                let target = target.to_string();
                self.dispatch_node(execution, &target).await
            }
            None => {
                self.store
                    .append_log(ExecutionLogEntry::warn(
                        execution.id,
                        Some(node_id.to_string()),
                        format!("traversal stalled: no outgoing connection from '{node_id}' matched"),
                        json!({ "variables": execution.variables.snapshot() }),
                    ))
                    .await?;
                tracing::warn!(
                    execution = %execution.id,
                    node = node_id,
                    "traversal stalled at dead end"
                );
                self.store.put_execution(execution.clone()).await?;
                Ok(())
            }
        }
    }

    /// Moves the current-node pointer, persists, then enqueues. Persisting
    /// first keeps the idempotency guard consistent with what the queue
    /// will deliver.
    async fn dispatch_node(
        &self,
        execution: &mut WorkflowExecution,
        node_id: &str,
    ) -> Result<(), CoordinatorError> {
        execution.current_node = Some(node_id.to_string());
        self.store.put_execution(execution.clone()).await?;
        self.dispatcher
            .enqueue(WorkItem::RunNode {
                execution_id: execution.id,
                node_id: node_id.to_string(),
            })
            .await?;
        Ok(())
    }

    /// Cancels an execution. Permitted only from pending, running, or
    /// paused; cooperative with in-flight work (a late outcome is
    /// discarded, not raced). Pending approvals of the execution are
    /// withdrawn.
    #[instrument(skip(self), err)]
    pub async fn cancel(
        &self,
        execution_id: ExecutionId,
        cancelled_by: &str,
    ) -> Result<(), CoordinatorError> {
        let mut execution = self.store.execution(execution_id).await?;
        execution.cancel()?;
        self.store.put_execution(execution.clone()).await?;
        self.store
            .append_log(ExecutionLogEntry::info(
                execution_id,
                None,
                format!("execution cancelled by '{cancelled_by}'"),
                json!({ "cancelled_by": cancelled_by }),
            ))
            .await?;

        for mut approval in self.store.approvals_for_execution(execution_id).await? {
            if approval.status == ApprovalStatus::Pending {
                approval.status = ApprovalStatus::Cancelled;
                approval.responded_at = Some(chrono::Utc::now());
                self.store.put_approval(approval).await?;
            }
        }

        self.record_terminal(&execution).await?;
        tracing::info!(execution = %execution_id, cancelled_by, "execution cancelled");
        Ok(())
    }

    /// Retries a failed execution by creating a brand-new execution with
    /// the same trigger payload, dispatched from the start node. The failed
    /// execution is left untouched apart from a log entry referencing its
    /// successor.
    #[instrument(skip(self), err)]
    pub async fn retry(
        &self,
        execution_id: ExecutionId,
    ) -> Result<WorkflowExecution, CoordinatorError> {
        let original = self.store.execution(execution_id).await?;
        if original.status != ExecutionStatus::Failed {
            return Err(InvalidTransitionError::new(
                "execution",
                original.status,
                ExecutionStatus::Pending,
            )
            .into());
        }
        let replacement = self
            .trigger_inner(
                original.workflow_id,
                &original.triggered_by,
                original.subject.clone(),
                original.trigger_payload.clone(),
            )
            .await?;
        self.store
            .append_log(ExecutionLogEntry::debug(
                execution_id,
                None,
                format!("execution retried as {}", replacement.id),
                json!({ "replacement": replacement.id }),
            ))
            .await?;
        Ok(replacement)
    }

    /// Resumes a paused execution after its approval was granted. Response
    /// data is merged into the variables before traversal continues. Stale
    /// or repeated resume events are absorbed.
    pub(crate) async fn resume_after_approval(
        &self,
        approval: &WorkflowApproval,
    ) -> Result<(), CoordinatorError> {
        let mut execution = self.store.execution(approval.execution_id).await?;
        if execution.status != ExecutionStatus::Paused
            || execution.current_node.as_deref() != Some(approval.node_id.as_str())
        {
            tracing::debug!(
                execution = %approval.execution_id,
                approval = %approval.id,
                status = %execution.status,
                "absorbing stale approval resume"
            );
            return Ok(());
        }
        execution.resume()?;
        if let serde_json::Value::Object(entries) = &approval.response_data {
            let mut update = VariableUpdate::default();
            for (key, value) in entries {
                update.insert(key.clone(), value.clone());
            }
            execution.variables.apply(update);
        }
        self.store
            .append_log(ExecutionLogEntry::info(
                execution.id,
                Some(approval.node_id.clone()),
                format!("approval granted by '{}'", approval.approver_id),
                json!({
                    "approval_id": approval.id,
                    "response": approval.response_data,
                    "comments": approval.comments,
                }),
            ))
            .await?;
        self.advance_past(&mut execution, approval.node_id.as_str())
            .await
    }

    /// Fails a paused execution after its approval was rejected. A
    /// rejection is a hard stop, not a branch.
    pub(crate) async fn fail_after_rejection(
        &self,
        approval: &WorkflowApproval,
        responder: &str,
    ) -> Result<(), CoordinatorError> {
        let execution = self.store.execution(approval.execution_id).await?;
        if execution.is_terminal() {
            tracing::debug!(
                execution = %approval.execution_id,
                approval = %approval.id,
                "ignoring rejection for terminal execution"
            );
            return Ok(());
        }
        let node_id = approval.node_id.clone();
        self.store
            .append_log(ExecutionLogEntry::error(
                execution.id,
                Some(node_id.clone()),
                format!("approval rejected by '{responder}'"),
                json!({
                    "approval_id": approval.id,
                    "comments": approval.comments,
                }),
            ))
            .await?;
        self.finish_failed(
            execution,
            &node_id,
            format!("approval rejected by '{responder}'"),
        )
        .await
    }

    /// Resumes a paused execution after a delay elapsed. Duplicate timer
    /// deliveries find the execution already running (or moved on) and are
    /// absorbed.
    async fn resume_delay(
        &self,
        execution_id: ExecutionId,
        node_id: &str,
    ) -> Result<(), CoordinatorError> {
        let mut execution = match self.store.execution(execution_id).await {
            Ok(execution) => execution,
            Err(StoreError::NotFound { .. }) => {
                tracing::warn!(execution = %execution_id, "delay continuation for unknown execution dropped");
                return Ok(());
            }
            Err(other) => return Err(other.into()),
        };
        if execution.status != ExecutionStatus::Paused
            || execution.current_node.as_deref() != Some(node_id)
        {
            tracing::debug!(
                execution = %execution_id,
                node = node_id,
                status = %execution.status,
                "absorbing duplicate or stale delay continuation"
            );
            return Ok(());
        }
        execution.resume()?;
        self.store
            .append_log(ExecutionLogEntry::debug(
                execution_id,
                Some(node_id.to_string()),
                format!("delay at '{node_id}' elapsed, resuming"),
                serde_json::Value::Null,
            ))
            .await?;
        self.advance_past(&mut execution, node_id).await
    }

    async fn finish_completed(
        &self,
        mut execution: WorkflowExecution,
    ) -> Result<(), CoordinatorError> {
        execution.complete()?;
        self.store.put_execution(execution.clone()).await?;
        self.record_terminal(&execution).await?;
        tracing::info!(execution = %execution.id, "execution completed");
        Ok(())
    }

    async fn finish_failed(
        &self,
        mut execution: WorkflowExecution,
        node_id: &str,
        message: String,
    ) -> Result<(), CoordinatorError> {
        execution.fail(message.clone())?;
        self.store.put_execution(execution.clone()).await?;
        self.record_terminal(&execution).await?;
        tracing::warn!(
            execution = %execution.id,
            node = node_id,
            error = %message,
            "execution failed"
        );
        Ok(())
    }

    async fn record_terminal(&self, execution: &WorkflowExecution) -> Result<(), CoordinatorError> {
        let duration_ms = execution
            .duration()
            .map(|d| d.num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        self.store
            .record_terminal(execution.workflow_id, execution.status, duration_ms)
            .await?;
        Ok(())
    }
}

/// Picks the next node after `node_id`: first conditioned connection (in
/// declaration order) whose condition holds, else the first unconditioned
/// connection. Deterministic for a fixed variable map.
fn select_next<'a>(
    graph: &'a GraphModel,
    node_id: &'a str,
    execution: &WorkflowExecution,
) -> Option<&'a str> {
    let mut fallback = None;
    for connection in graph.connections_from(node_id) {
        match &connection.condition {
            Some(condition) => {
                if condition.evaluate(&execution.variables) {
                    return Some(connection.target.as_str());
                }
            }
            None => {
                if fallback.is_none() {
                    fallback = Some(connection.target.as_str());
                }
            }
        }
    }
    fallback
}
