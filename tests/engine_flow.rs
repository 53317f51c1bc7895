mod common;

use common::*;
use flowloom::dispatch::WorkItem;
use flowloom::execution::{CoordinatorError, LogLevel};
use flowloom::nodes::NodeOutcome;
use flowloom::types::ExecutionStatus;
use serde_json::json;

// Scenario: start -> task -> end with no conditions completes and leaves a
// three-entry node trail in traversal order.
#[tokio::test]
async fn linear_workflow_completes() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let execution = h.engine.trigger(workflow.id, "tester", json!({})).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Running);
    h.engine.run_until_idle().await;

    let finished = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert!(finished.completed_at.is_some());

    let logs = h.engine.store().logs(execution.id).await.unwrap();
    let trail = node_trail(&logs);
    assert_eq!(
        trail,
        vec![
            ("start".to_string(), LogLevel::Info),
            ("task".to_string(), LogLevel::Info),
            ("end".to_string(), LogLevel::Info),
        ]
    );
}

#[tokio::test]
async fn trigger_requires_active_workflow() {
    let h = harness();
    let mut workflow = flowloom::model::Workflow::new("draft", "tester").with_graph(linear_graph());
    h.engine.store().put_workflow(workflow.clone()).await.unwrap();

    let err = h.engine.trigger(workflow.id, "tester", json!({})).await.unwrap_err();
    assert!(matches!(err, CoordinatorError::WorkflowNotActive { .. }));

    workflow.activate().unwrap();
    h.engine.store().put_workflow(workflow.clone()).await.unwrap();
    assert!(h.engine.trigger(workflow.id, "tester", json!({})).await.is_ok());
}

// Scenario: decision node computes decision_result=true for amount=150 and
// the conditioned connection into end is followed.
#[tokio::test]
async fn decision_branch_follows_matching_connection() {
    let h = harness();
    let workflow = install_active(&h.engine, decision_graph()).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "amount": 150 }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let finished = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert_eq!(finished.variables.get("decision_result"), Some(&json!(true)));
}

// The dead-end case: decision_result=false matches no connection, so the
// traversal stops where it is. The execution stays running and the log
// carries a warn entry naming the node.
#[tokio::test]
async fn unmatched_connections_stall_with_warning() {
    let h = harness();
    let workflow = install_active(&h.engine, decision_graph()).await;

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "amount": 50 }))
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let stalled = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(stalled.status, ExecutionStatus::Running);
    assert_eq!(stalled.variables.get("decision_result"), Some(&json!(false)));

    let logs = h.engine.store().logs(execution.id).await.unwrap();
    assert!(logs
        .iter()
        .any(|e| e.level == LogLevel::Warn && e.message.contains("stalled")));
}

// The triggering object is recorded as an explicit pair, never a
// polymorphic back-reference; resolving it stays with the caller.
#[tokio::test]
async fn subject_pair_is_recorded() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let subject = flowloom::execution::TriggerSubject::new("invoice", "inv-1042");
    let execution = h
        .engine
        .coordinator()
        .trigger_for_subject(workflow.id, "billing-svc", subject.clone(), json!({}))
        .await
        .unwrap();
    assert_eq!(execution.subject, Some(subject));
}

// Payload entries overwrite workflow defaults key by key.
#[tokio::test]
async fn variables_seed_defaults_then_payload() {
    let h = harness();
    let mut workflow = flowloom::model::Workflow::new("seeded", "tester")
        .with_graph(linear_graph())
        .with_default("region", json!("eu"))
        .with_default("retries", json!(3));
    workflow.activate().unwrap();
    h.engine.store().put_workflow(workflow.clone()).await.unwrap();

    let execution = h
        .engine
        .trigger(workflow.id, "tester", json!({ "region": "us" }))
        .await
        .unwrap();
    assert_eq!(execution.variables.get("region"), Some(&json!("us")));
    assert_eq!(execution.variables.get("retries"), Some(&json!(3)));
}

// Idempotent resume: re-delivering an already-applied work item and
// re-reporting an already-applied outcome are both absorbed without a
// duplicate log entry or a second dispatch.
#[tokio::test]
async fn duplicate_deliveries_are_absorbed() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let execution = h.engine.trigger(workflow.id, "tester", json!({})).await.unwrap();
    h.engine.run_until_idle().await;

    let logs_before = h.engine.store().logs(execution.id).await.unwrap();

    // Simulate the queue re-delivering the task node for a finished run.
    h.engine
        .coordinator()
        .process(WorkItem::RunNode {
            execution_id: execution.id,
            node_id: "task".into(),
        })
        .await;
    // And a stray outcome arriving after the fact.
    h.engine
        .coordinator()
        .advance_after_node(execution.id, "task", NodeOutcome::success())
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let logs_after = h.engine.store().logs(execution.id).await.unwrap();
    assert_eq!(logs_before.len(), logs_after.len());
    let finished = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
}

// Terminal immutability: once completed, neither cancellation nor a late
// outcome mutates the execution.
#[tokio::test]
async fn terminal_executions_are_immutable() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let execution = h.engine.trigger(workflow.id, "tester", json!({})).await.unwrap();
    h.engine.run_until_idle().await;

    let err = h
        .engine
        .coordinator()
        .cancel(execution.id, "tester")
        .await
        .unwrap_err();
    assert!(matches!(err, CoordinatorError::InvalidTransition(_)));

    h.engine
        .coordinator()
        .advance_after_node(execution.id, "end", NodeOutcome::failure("too late"))
        .await
        .unwrap();

    let finished = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(finished.status, ExecutionStatus::Completed);
    assert!(finished.error.is_none());
}

#[tokio::test]
async fn cancel_stops_future_dispatch() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let execution = h.engine.trigger(workflow.id, "operator", json!({})).await.unwrap();
    // Cancel before draining: the queued start node must be discarded.
    h.engine
        .coordinator()
        .cancel(execution.id, "operator")
        .await
        .unwrap();
    h.engine.run_until_idle().await;

    let cancelled = h.engine.store().execution(execution.id).await.unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);

    let logs = h.engine.store().logs(execution.id).await.unwrap();
    assert!(logs.iter().any(|e| e.message.contains("cancelled by 'operator'")));
    // No node ever ran.
    assert!(node_trail(&logs).is_empty());
}

#[tokio::test]
async fn metrics_roll_up_terminal_executions() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    for _ in 0..2 {
        let execution = h.engine.trigger(workflow.id, "tester", json!({})).await.unwrap();
        h.engine.run_until_idle().await;
        let finished = h.engine.store().execution(execution.id).await.unwrap();
        assert_eq!(finished.status, ExecutionStatus::Completed);
    }

    let metrics = h.engine.store().metrics_for_workflow(workflow.id).await.unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].triggered, 2);
    assert_eq!(metrics[0].completed, 2);
    assert_eq!(metrics[0].failed, 0);
}
