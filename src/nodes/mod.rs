//! Node execution: the polymorphic unit performing one step's side effect.
//!
//! [`NodeExecutor::execute`] takes the execution and one node, performs the
//! node's side effect, and reports a [`NodeOutcome`] telling the
//! coordinator how traversal proceeds: continue, pause (approval/delay),
//! end, or fail. All node kinds except approval and delay complete
//! synchronously within the one dispatched unit of work.
//!
//! Failure semantics follow the engine contract: an expected failure of the
//! node's own operation (unreachable endpoint, missing config value)
//! returns `success = false` inside the outcome; only reserved node kinds
//! and infrastructure faults (store/queue breakage) surface as
//! [`ExecutorError`]. Either way the coordinator transitions the execution
//! to failed with the message on record.

pub mod substitute;
mod task;

use miette::Diagnostic;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::approvals::WorkflowApproval;
use crate::collaborators::{IntegrationClient, NotificationChannel, NotificationSender};
use crate::dispatch::DispatchError;
use crate::execution::{VariableUpdate, WorkflowExecution};
use crate::model::{NodeConfig, WorkflowNode};
use crate::nodes::substitute::{render, substitute};
use crate::scheduler::DelayScheduler;
use crate::store::{Store, StoreError};
use crate::types::NodeKind;

/// What one node execution reported back to the coordinator.
#[derive(Clone, Debug, Default)]
pub struct NodeOutcome {
    pub success: bool,
    /// Variables to merge into the execution map (later keys overwrite).
    pub variables: VariableUpdate,
    pub error: Option<String>,
    /// Suspend the execution; an external resume event continues it.
    pub pause_execution: bool,
    /// Terminate the execution as completed.
    pub end_execution: bool,
}

impl NodeOutcome {
    #[must_use]
    pub fn success() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_variables(mut self, variables: VariableUpdate) -> Self {
        self.variables = variables;
        self
    }

    #[must_use]
    pub fn with_var(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn pausing(mut self) -> Self {
        self.pause_execution = true;
        self
    }

    #[must_use]
    pub fn ending(mut self) -> Self {
        self.end_execution = true;
        self
    }
}

/// Infrastructure-level executor failures.
#[derive(Debug, Error, Diagnostic)]
pub enum ExecutorError {
    /// Reserved node kinds (loop, parallel, merge) fail fast instead of
    /// silently behaving like a task.
    #[error("node kind '{kind}' is reserved and has no executor")]
    #[diagnostic(
        code(flowloom::nodes::not_implemented),
        help("Remove the node or model the behavior with task/decision/condition nodes.")
    )]
    NotImplemented { kind: NodeKind },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Dispatch(#[from] DispatchError),
}

/// Executes nodes of every kind against the injected collaborators.
#[derive(Clone)]
pub struct NodeExecutor {
    store: Arc<dyn Store>,
    notifier: Arc<dyn NotificationSender>,
    integrations: Arc<dyn IntegrationClient>,
    delays: DelayScheduler,
}

impl NodeExecutor {
    pub fn new(
        store: Arc<dyn Store>,
        notifier: Arc<dyn NotificationSender>,
        integrations: Arc<dyn IntegrationClient>,
        delays: DelayScheduler,
    ) -> Self {
        Self {
            store,
            notifier,
            integrations,
            delays,
        }
    }

    /// Performs the side effect of `node` and reports the outcome.
    #[tracing::instrument(skip(self, execution, node), fields(execution = %execution.id, node = %node.id, kind = %node.kind()))]
    pub async fn execute(
        &self,
        execution: &WorkflowExecution,
        node: &WorkflowNode,
    ) -> Result<NodeOutcome, ExecutorError> {
        match &node.config {
            NodeConfig::Start => Ok(NodeOutcome::success()),
            NodeConfig::End => Ok(NodeOutcome::success().ending()),

            NodeConfig::Task { operation } => {
                Ok(task::run(operation, execution, self.integrations.as_ref()).await)
            }

            NodeConfig::Decision { condition } => {
                let result = condition.evaluate(&execution.variables);
                tracing::debug!(%condition, result, "decision evaluated");
                Ok(NodeOutcome::success().with_var("decision_result", json!(result)))
            }

            NodeConfig::Condition { conditions } => {
                let results: Vec<bool> = conditions
                    .iter()
                    .map(|c| c.evaluate(&execution.variables))
                    .collect();
                Ok(NodeOutcome::success().with_var("condition_results", json!(results)))
            }

            NodeConfig::Approval {
                approver_id,
                message,
                request_data,
            } => {
                self.execute_approval(execution, node, approver_id, message.as_deref(), request_data)
                    .await
            }

            NodeConfig::Notification {
                channel,
                recipients,
                subject,
                body,
            } => {
                let subject = subject
                    .as_deref()
                    .map(|s| render(s, &execution.variables));
                let body = render(body, &execution.variables);
                let receipt = self
                    .notifier
                    .send(*channel, recipients, subject.as_deref(), &body)
                    .await;
                if receipt.delivered {
                    Ok(NodeOutcome::success().with_var("notification_sent", json!(true)))
                } else {
                    Ok(NodeOutcome::failure(format!(
                        "notification delivery failed: {}",
                        receipt.error.unwrap_or_else(|| "unknown error".into())
                    )))
                }
            }

            NodeConfig::Integration {
                integration_id,
                method,
                path,
                headers,
                payload,
            } => {
                let integration = match self.store.integration(*integration_id).await {
                    Ok(integration) => integration,
                    Err(StoreError::NotFound { .. }) => {
                        return Ok(NodeOutcome::failure(format!(
                            "integration {integration_id} not found"
                        )));
                    }
                    Err(other) => return Err(other.into()),
                };
                let path = render(path, &execution.variables);
                let payload = substitute(payload, &execution.variables);
                match self
                    .integrations
                    .call(&integration, *method, &path, headers, &payload)
                    .await
                {
                    Ok(response) if response.is_success() => Ok(NodeOutcome::success()
                        .with_var("integration_status", json!(response.status))
                        .with_var("integration_response", response.body)),
                    Ok(response) => Ok(NodeOutcome::failure(format!(
                        "integration '{}' returned status {}",
                        integration.name, response.status
                    ))),
                    Err(e) => Ok(NodeOutcome::failure(format!(
                        "integration '{}' call failed: {e}",
                        integration.name
                    ))),
                }
            }

            NodeConfig::Delay { duration_secs } => {
                self.delays
                    .schedule_continuation(
                        execution.id,
                        &node.id,
                        std::time::Duration::from_secs(*duration_secs),
                    )
                    .await?;
                Ok(NodeOutcome::success()
                    .with_var("delay_until_secs", json!(duration_secs))
                    .pausing())
            }

            NodeConfig::Loop | NodeConfig::Parallel | NodeConfig::Merge => {
                Err(ExecutorError::NotImplemented { kind: node.kind() })
            }
        }
    }

    async fn execute_approval(
        &self,
        execution: &WorkflowExecution,
        node: &WorkflowNode,
        approver_id: &str,
        message: Option<&str>,
        request_data: &serde_json::Value,
    ) -> Result<NodeOutcome, ExecutorError> {
        if approver_id.is_empty() {
            return Ok(NodeOutcome::failure(format!(
                "approval node '{}' has no approver_id configured",
                node.id
            )));
        }

        let request_data = substitute(request_data, &execution.variables);
        let approval = WorkflowApproval::new(execution.id, &node.id, approver_id, request_data);
        self.store.put_approval(approval.clone()).await?;

        let body = message
            .map(|m| render(m, &execution.variables))
            .unwrap_or_else(|| {
                format!(
                    "Approval requested for step '{}' of execution {}",
                    node.name, execution.id
                )
            });
        let receipt = self
            .notifier
            .send(
                NotificationChannel::InApp,
                &[approver_id.to_string()],
                Some("Approval requested"),
                &body,
            )
            .await;
        if !receipt.delivered {
            tracing::warn!(
                approval = %approval.id,
                approver = approver_id,
                "approver notification failed; approval stays pending"
            );
        }

        Ok(NodeOutcome::success()
            .with_var("approval_id", json!(approval.id))
            .pausing())
    }
}
