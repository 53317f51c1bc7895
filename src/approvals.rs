//! Human-decision requests and the gate that resolves them.
//!
//! An approval node suspends its execution and creates a
//! [`WorkflowApproval`] addressed to one approver. The execution stays
//! paused until [`ApprovalGate::approve`] or [`ApprovalGate::reject`] is
//! called; only the designated approver may respond, enforced here at the
//! gate boundary (approval rows are single-writer).

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::execution::{CoordinatorError, ExecutionCoordinator};
use crate::store::{Store, StoreError};
use crate::types::{ApprovalId, ApprovalStatus, ExecutionId};

/// A pending or resolved human-decision request tied to one execution and
/// one approval node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowApproval {
    pub id: ApprovalId,
    pub execution_id: ExecutionId,
    pub node_id: String,
    pub approver_id: String,
    pub status: ApprovalStatus,
    #[serde(default)]
    pub request_data: Value,
    #[serde(default)]
    pub response_data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl WorkflowApproval {
    pub fn new(
        execution_id: ExecutionId,
        node_id: impl Into<String>,
        approver_id: impl Into<String>,
        request_data: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            execution_id,
            node_id: node_id.into(),
            approver_id: approver_id.into(),
            status: ApprovalStatus::Pending,
            request_data,
            response_data: Value::Null,
            comments: None,
            requested_at: Utc::now(),
            responded_at: None,
        }
    }
}

/// Errors raised when responding to an approval.
#[derive(Debug, Error, Diagnostic)]
pub enum ApprovalError {
    /// The responder is not the designated approver, or the approval has
    /// already been responded to or withdrawn. No state changes.
    #[error("approval {approval_id} cannot be responded to by '{responder}'")]
    #[diagnostic(
        code(flowloom::approvals::permission),
        help("Only the designated approver may respond, and only while the request is pending.")
    )]
    Permission {
        approval_id: ApprovalId,
        responder: String,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// Resolves pending approvals and hands control back to the coordinator.
#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<dyn Store>,
    coordinator: Arc<ExecutionCoordinator>,
}

impl ApprovalGate {
    pub fn new(store: Arc<dyn Store>, coordinator: Arc<ExecutionCoordinator>) -> Self {
        Self { store, coordinator }
    }

    async fn load_pending(
        &self,
        approval_id: ApprovalId,
        responder: &str,
    ) -> Result<WorkflowApproval, ApprovalError> {
        let approval = self.store.approval(approval_id).await?;
        if approval.approver_id != responder || approval.status != ApprovalStatus::Pending {
            return Err(ApprovalError::Permission {
                approval_id,
                responder: responder.to_string(),
            });
        }
        Ok(approval)
    }

    /// Approves the request and resumes traversal from the approval node's
    /// outgoing connections. `response_data` is merged into the execution's
    /// variables before traversal continues.
    pub async fn approve(
        &self,
        approval_id: ApprovalId,
        responder: &str,
        comments: Option<String>,
        response_data: Value,
    ) -> Result<WorkflowApproval, ApprovalError> {
        let mut approval = self.load_pending(approval_id, responder).await?;
        approval.status = ApprovalStatus::Approved;
        approval.comments = comments;
        approval.response_data = response_data;
        approval.responded_at = Some(Utc::now());
        self.store.put_approval(approval.clone()).await?;
        tracing::info!(
            approval = %approval.id,
            execution = %approval.execution_id,
            responder,
            "approval granted"
        );
        self.coordinator.resume_after_approval(&approval).await?;
        Ok(approval)
    }

    /// Rejects the request. An approval rejection is a hard stop: the
    /// owning execution transitions to failed, not down another branch.
    pub async fn reject(
        &self,
        approval_id: ApprovalId,
        responder: &str,
        comments: Option<String>,
    ) -> Result<WorkflowApproval, ApprovalError> {
        let mut approval = self.load_pending(approval_id, responder).await?;
        approval.status = ApprovalStatus::Rejected;
        approval.comments = comments;
        approval.responded_at = Some(Utc::now());
        self.store.put_approval(approval.clone()).await?;
        tracing::info!(
            approval = %approval.id,
            execution = %approval.execution_id,
            responder,
            "approval rejected"
        );
        self.coordinator
            .fail_after_rejection(&approval, responder)
            .await?;
        Ok(approval)
    }
}
