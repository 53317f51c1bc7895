//! Engine assembly: wiring of store, dispatcher, collaborators, coordinator,
//! and approval gate, plus the work-consumption loop.
//!
//! The split mirrors the rest of the crate's seams: workflow definitions
//! are data, the coordinator owns transitions, and the `Engine` owns the
//! runtime environment around them. Tests drive the queue synchronously
//! with [`Engine::run_until_idle`]; long-running deployments spawn a
//! background consumer with [`Engine::spawn_worker`].

use chrono::{DateTime, Utc};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::approvals::ApprovalGate;
use crate::collaborators::{
    HttpIntegrationClient, IntegrationClient, IntegrationError, NotificationSender,
    TracingNotificationSender,
};
use crate::config::EngineConfig;
use crate::dispatch::{QueueDispatcher, WorkDispatcher, WorkItem};
use crate::execution::{CoordinatorError, ExecutionCoordinator, WorkflowExecution};
use crate::nodes::NodeExecutor;
use crate::scheduler::DelayScheduler;
use crate::store::{InMemoryStore, Store};
use crate::types::{ExecutionId, WorkflowId};

/// A fully wired workflow engine.
pub struct Engine {
    config: EngineConfig,
    store: Arc<dyn Store>,
    coordinator: Arc<ExecutionCoordinator>,
    approvals: ApprovalGate,
    receiver: flume::Receiver<WorkItem>,
}

/// Builder for [`Engine`]; unset parts get in-process defaults
/// (in-memory store, tracing-only notifications, reqwest integration
/// client).
#[derive(Default)]
pub struct EngineBuilder {
    config: Option<EngineConfig>,
    store: Option<Arc<dyn Store>>,
    notifier: Option<Arc<dyn NotificationSender>>,
    integrations: Option<Arc<dyn IntegrationClient>>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    #[must_use]
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn notification_sender(mut self, notifier: Arc<dyn NotificationSender>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub fn integration_client(mut self, client: Arc<dyn IntegrationClient>) -> Self {
        self.integrations = Some(client);
        self
    }

    /// Wires everything together. Only fails when the default HTTP client
    /// cannot be constructed.
    pub fn build(self) -> Result<Engine, IntegrationError> {
        let config = self.config.unwrap_or_default();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(TracingNotificationSender));
        let integrations: Arc<dyn IntegrationClient> = match self.integrations {
            Some(client) => client,
            None => Arc::new(HttpIntegrationClient::new(config.http_timeout)?),
        };

        let (dispatcher, receiver) = QueueDispatcher::new();
        let dispatcher: Arc<dyn WorkDispatcher> = Arc::new(dispatcher);
        let executor = NodeExecutor::new(
            Arc::clone(&store),
            notifier,
            integrations,
            DelayScheduler::new(Arc::clone(&dispatcher)),
        );
        let coordinator = Arc::new(ExecutionCoordinator::new(
            Arc::clone(&store),
            dispatcher,
            executor,
        ));
        let approvals = ApprovalGate::new(Arc::clone(&store), Arc::clone(&coordinator));

        Ok(Engine {
            config,
            store,
            coordinator,
            approvals,
            receiver,
        })
    }
}

impl Engine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    #[must_use]
    pub fn coordinator(&self) -> &Arc<ExecutionCoordinator> {
        &self.coordinator
    }

    #[must_use]
    pub fn approvals(&self) -> &ApprovalGate {
        &self.approvals
    }

    /// Convenience passthrough to
    /// [`ExecutionCoordinator::trigger`].
    pub async fn trigger(
        &self,
        workflow_id: WorkflowId,
        triggered_by: &str,
        payload: Value,
    ) -> Result<WorkflowExecution, CoordinatorError> {
        self.coordinator.trigger(workflow_id, triggered_by, payload).await
    }

    /// Drains the work queue synchronously until it is empty.
    ///
    /// Suspended executions stay suspended: an approval response or an
    /// elapsed delay enqueues new work, after which another drain continues
    /// them. This is the in-process test mode.
    pub async fn run_until_idle(&self) {
        while let Ok(item) = self.receiver.try_recv() {
            self.coordinator.process(item).await;
        }
    }

    /// Spawns a background consumer of the work queue. The task ends when
    /// every dispatcher handle is dropped and the queue is empty.
    #[must_use]
    pub fn spawn_worker(&self) -> JoinHandle<()> {
        let receiver = self.receiver.clone();
        let coordinator = Arc::clone(&self.coordinator);
        tokio::spawn(async move {
            while let Ok(item) = receiver.recv_async().await {
                coordinator.process(item).await;
            }
            tracing::debug!("worker loop finished: queue closed");
        })
    }

    /// Triggers every due schedule once and advances its `next_run`.
    /// Returns the ids of the executions created. Intended to be called
    /// periodically (`config.schedule_poll_interval`) by the host.
    pub async fn fire_due_schedules(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ExecutionId>, CoordinatorError> {
        let mut created = Vec::new();
        for mut schedule in self.store.schedules().await? {
            if !schedule.is_due(now) {
                continue;
            }
            let triggered_by = format!("schedule:{}", schedule.id);
            match self
                .coordinator
                .trigger(schedule.workflow_id, &triggered_by, json!({}))
                .await
            {
                Ok(execution) => created.push(execution.id),
                Err(e) => {
                    // An inactive workflow leaves the schedule in place; the
                    // operator sees the warning and either reactivates the
                    // workflow or disables the schedule.
                    tracing::warn!(
                        schedule = %schedule.id,
                        workflow = %schedule.workflow_id,
                        error = %e,
                        "scheduled trigger failed"
                    );
                }
            }
            if let Err(e) = schedule.mark_ran(now) {
                tracing::warn!(schedule = %schedule.id, error = %e, "disabling broken schedule");
                schedule.active = false;
            }
            self.store.put_schedule(schedule).await?;
        }
        Ok(created)
    }
}
