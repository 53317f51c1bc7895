//! State storage behind the engine.
//!
//! [`Store`] is the narrow async interface the coordinator persists through;
//! [`InMemoryStore`] is the bundled implementation. Persistence technology
//! beyond this seam is deliberately out of scope: the trait keeps the
//! coordinator testable in-process and swappable for a durable backend, the
//! same split the rest of the crate uses for dispatch and collaborators.

use async_trait::async_trait;
use chrono::Utc;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::approvals::WorkflowApproval;
use crate::execution::{ExecutionLogEntry, WorkflowExecution};
use crate::metrics::WorkflowMetrics;
use crate::model::{Workflow, WorkflowIntegration, WorkflowSchedule};
use crate::types::{
    ApprovalId, ExecutionId, ExecutionStatus, IntegrationId, ScheduleId, WorkflowId,
};

/// Errors surfaced by store operations.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    #[diagnostic(code(flowloom::store::not_found))]
    NotFound { entity: &'static str, id: String },

    /// Backend-specific failure (connection loss, serialization, ...).
    #[error("storage backend error: {0}")]
    #[diagnostic(code(flowloom::store::backend))]
    Backend(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Persisted state layout of the engine: workflows, executions, the
/// append-only log, approvals, integrations, schedules, and metric rollups.
#[async_trait]
pub trait Store: Send + Sync {
    async fn put_workflow(&self, workflow: Workflow) -> Result<(), StoreError>;
    async fn workflow(&self, id: WorkflowId) -> Result<Workflow, StoreError>;

    async fn put_execution(&self, execution: WorkflowExecution) -> Result<(), StoreError>;
    async fn execution(&self, id: ExecutionId) -> Result<WorkflowExecution, StoreError>;
    async fn executions_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecution>, StoreError>;

    /// Appends one log entry; entries are write-once and kept in insertion
    /// order per execution.
    async fn append_log(&self, entry: ExecutionLogEntry) -> Result<(), StoreError>;
    async fn logs(&self, execution_id: ExecutionId) -> Result<Vec<ExecutionLogEntry>, StoreError>;

    async fn put_approval(&self, approval: WorkflowApproval) -> Result<(), StoreError>;
    async fn approval(&self, id: ApprovalId) -> Result<WorkflowApproval, StoreError>;
    async fn approvals_for_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<WorkflowApproval>, StoreError>;

    async fn put_integration(&self, integration: WorkflowIntegration) -> Result<(), StoreError>;
    async fn integration(&self, id: IntegrationId) -> Result<WorkflowIntegration, StoreError>;

    async fn put_schedule(&self, schedule: WorkflowSchedule) -> Result<(), StoreError>;
    async fn schedule(&self, id: ScheduleId) -> Result<WorkflowSchedule, StoreError>;
    async fn schedules(&self) -> Result<Vec<WorkflowSchedule>, StoreError>;

    /// Bumps the trigger counter of today's rollup for `workflow_id`.
    async fn record_trigger(&self, workflow_id: WorkflowId) -> Result<(), StoreError>;
    /// Folds one terminal execution into today's rollup.
    async fn record_terminal(
        &self,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
        duration_ms: u64,
    ) -> Result<(), StoreError>;
    async fn metrics_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowMetrics>, StoreError>;
}

#[derive(Default)]
struct Inner {
    workflows: FxHashMap<WorkflowId, Workflow>,
    executions: FxHashMap<ExecutionId, WorkflowExecution>,
    logs: FxHashMap<ExecutionId, Vec<ExecutionLogEntry>>,
    approvals: FxHashMap<ApprovalId, WorkflowApproval>,
    integrations: FxHashMap<IntegrationId, WorkflowIntegration>,
    schedules: FxHashMap<ScheduleId, WorkflowSchedule>,
    metrics: FxHashMap<(WorkflowId, chrono::NaiveDate), WorkflowMetrics>,
}

/// Process-local store used in tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn put_workflow(&self, workflow: Workflow) -> Result<(), StoreError> {
        self.inner.write().await.workflows.insert(workflow.id, workflow);
        Ok(())
    }

    async fn workflow(&self, id: WorkflowId) -> Result<Workflow, StoreError> {
        self.inner
            .read()
            .await
            .workflows
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("workflow", id))
    }

    async fn put_execution(&self, execution: WorkflowExecution) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .executions
            .insert(execution.id, execution);
        Ok(())
    }

    async fn execution(&self, id: ExecutionId) -> Result<WorkflowExecution, StoreError> {
        self.inner
            .read()
            .await
            .executions
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("execution", id))
    }

    async fn executions_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<_> = inner
            .executions
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .cloned()
            .collect();
        found.sort_by_key(|e| e.started_at);
        Ok(found)
    }

    async fn append_log(&self, entry: ExecutionLogEntry) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .logs
            .entry(entry.execution_id)
            .or_default()
            .push(entry);
        Ok(())
    }

    async fn logs(&self, execution_id: ExecutionId) -> Result<Vec<ExecutionLogEntry>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .logs
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn put_approval(&self, approval: WorkflowApproval) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .approvals
            .insert(approval.id, approval);
        Ok(())
    }

    async fn approval(&self, id: ApprovalId) -> Result<WorkflowApproval, StoreError> {
        self.inner
            .read()
            .await
            .approvals
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("approval", id))
    }

    async fn approvals_for_execution(
        &self,
        execution_id: ExecutionId,
    ) -> Result<Vec<WorkflowApproval>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<_> = inner
            .approvals
            .values()
            .filter(|a| a.execution_id == execution_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.requested_at);
        Ok(found)
    }

    async fn put_integration(&self, integration: WorkflowIntegration) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .integrations
            .insert(integration.id, integration);
        Ok(())
    }

    async fn integration(&self, id: IntegrationId) -> Result<WorkflowIntegration, StoreError> {
        self.inner
            .read()
            .await
            .integrations
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("integration", id))
    }

    async fn put_schedule(&self, schedule: WorkflowSchedule) -> Result<(), StoreError> {
        self.inner
            .write()
            .await
            .schedules
            .insert(schedule.id, schedule);
        Ok(())
    }

    async fn schedule(&self, id: ScheduleId) -> Result<WorkflowSchedule, StoreError> {
        self.inner
            .read()
            .await
            .schedules
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("schedule", id))
    }

    async fn schedules(&self) -> Result<Vec<WorkflowSchedule>, StoreError> {
        Ok(self.inner.read().await.schedules.values().cloned().collect())
    }

    async fn record_trigger(&self, workflow_id: WorkflowId) -> Result<(), StoreError> {
        let day = Utc::now().date_naive();
        let mut inner = self.inner.write().await;
        inner
            .metrics
            .entry((workflow_id, day))
            .or_insert_with(|| WorkflowMetrics::new(workflow_id, day))
            .record_trigger();
        Ok(())
    }

    async fn record_terminal(
        &self,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
        duration_ms: u64,
    ) -> Result<(), StoreError> {
        let day = Utc::now().date_naive();
        let mut inner = self.inner.write().await;
        inner
            .metrics
            .entry((workflow_id, day))
            .or_insert_with(|| WorkflowMetrics::new(workflow_id, day))
            .record_terminal(status, duration_ms);
        Ok(())
    }

    async fn metrics_for_workflow(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowMetrics>, StoreError> {
        let inner = self.inner.read().await;
        let mut found: Vec<_> = inner
            .metrics
            .values()
            .filter(|m| m.workflow_id == workflow_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.day);
        Ok(found)
    }
}
