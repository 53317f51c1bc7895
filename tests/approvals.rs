mod common;

use common::*;
use flowloom::approvals::ApprovalError;
use flowloom::types::{ApprovalStatus, ExecutionStatus};
use serde_json::json;

// Scenario: start -> approval -> end. The execution pauses with a pending
// approval; the designated approver resumes it to completion; anyone else
// is rejected with a permission error and the execution stays paused.
#[tokio::test]
async fn approval_pauses_then_resumes_on_approve() {
    let h = harness();
    let workflow = install_active(&h.engine, approval_graph("alice")).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "subject": "Q3 payout" }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let paused = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(paused.status, ExecutionStatus::Paused);

    let approvals = h.engine.store().approvals_for_execution(execution.id).await.unwrap();
    assert_eq!(approvals.len(), 1);
    let approval = &approvals[0];
    assert_eq!(approval.status, ApprovalStatus::Pending);
    assert_eq!(approval.approver_id, "alice");
    // Request data was substituted from execution variables.
    assert_eq!(approval.request_data, json!({"subject": "Q3 payout"}));
    // The approver was notified.
    assert_eq!(h.notifier.sent_count(), 1);

    // A different user may not respond.
    let err = h
        .engine
        .approvals()
        .approve(approval.id, "mallory", None, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Permission { .. }));
    let still_paused = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(still_paused.status, ExecutionStatus::Paused);

    // The designated approver resumes traversal.
    h.engine
        .approvals()
        .approve(
            approval.id,
            "alice",
            Some("looks right".into()),
            json!({ "approved_amount": 1200 }),
        )
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let finished = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    // Response data is merged into the variables before traversal resumes.
    assert_eq!(finished.variables.get("approved_amount"), Some(&json!(1200)));

    let resolved = h.engine.store().approval(approval.id).await.unwrap();
    assert_eq!(resolved.status, ApprovalStatus::Approved);
    assert!(resolved.responded_at.is_some());
}

#[tokio::test]
async fn rejection_is_a_hard_stop() {
    let h = harness();
    let workflow = install_active(&h.engine, approval_graph("alice")).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "subject": "refund" }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let approval = h.engine.store().approvals_for_execution(execution.id).await.unwrap()[0].clone();
    h.engine
        .approvals()
        .reject(approval.id, "alice", Some("numbers are off".into()))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let failed = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(failed.status, ExecutionStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("rejected"));
}

#[tokio::test]
async fn responding_twice_is_rejected() {
    let h = harness();
    let workflow = install_active(&h.engine, approval_graph("alice")).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "subject": "x" }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let approval = h.engine.store().approvals_for_execution(execution.id).await.unwrap()[0].clone();
    h.engine
        .approvals()
        .approve(approval.id, "alice", None, json!({}))
        .await
        .unwrap();

    // The request is terminal now; even the designated approver gets a
    // permission error on a second response.
    let err = h
        .engine
        .approvals()
        .reject(approval.id, "alice", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Permission { .. }));
}

#[tokio::test]
async fn cancelling_execution_withdraws_pending_approval() {
    let h = harness();
    let workflow = install_active(&h.engine, approval_graph("alice")).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "subject": "x" }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    h.engine.coordinator().cancel(execution.id, "operator").await.unwrap();

    let approval = h.engine.store().approvals_for_execution(execution.id).await.unwrap()[0].clone();
    assert_eq!(approval.status, ApprovalStatus::Cancelled);

    // A late response hits the withdrawn approval, not the execution.
    let err = h
        .engine
        .approvals()
        .approve(approval.id, "alice", None, json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApprovalError::Permission { .. }));
    let cancelled = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
}

#[tokio::test]
async fn missing_approver_fails_fast() {
    let h = harness();
    let workflow = install_active(&h.engine, approval_graph("")).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "subject": "x" }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let failed = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(failed.status, ExecutionStatus::Failed);
    assert!(failed.error.as_deref().unwrap().contains("approver_id"));
    // No approval row was created.
    assert!(h
        .engine
        .store()
        .approvals_for_execution(execution.id)
        .await
        .unwrap()
        .is_empty());
}
