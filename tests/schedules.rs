mod common;

use chrono::{Duration, Utc};
use common::*;
use flowloom::model::WorkflowSchedule;
use flowloom::types::ExecutionStatus;

#[tokio::test]
async fn due_schedule_triggers_and_advances() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let mut schedule = WorkflowSchedule::new(workflow.id, "0 0 * * * * *").unwrap();
    // Force the schedule due.
    schedule.next_run = Some(Utc::now() - Duration::minutes(5));
    h.engine.store().put_schedule(schedule.clone()).await.unwrap();

    let now = Utc::now();
    let created = h.engine.fire_due_schedules(now).await.unwrap();
    assert_eq!(created.len(), 1);
    h.engine.run_until_idle().await;

    let execution = h.engine.store().execution(created[0]).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.triggered_by.starts_with("schedule:"));

    let advanced = h.engine.store().schedule(schedule.id).await.unwrap();
    assert_eq!(advanced.last_run, Some(now));
    assert!(advanced.next_run.unwrap() > now);

    // Nothing due anymore: a second sweep creates nothing.
    let created = h.engine.fire_due_schedules(Utc::now()).await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn inactive_schedule_never_fires() {
    let h = harness();
    let workflow = install_active(&h.engine, linear_graph()).await;

    let mut schedule = WorkflowSchedule::new(workflow.id, "0 0 * * * * *").unwrap();
    schedule.next_run = Some(Utc::now() - Duration::minutes(5));
    schedule.active = false;
    h.engine.store().put_schedule(schedule).await.unwrap();

    let created = h.engine.fire_due_schedules(Utc::now()).await.unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn paused_workflow_leaves_schedule_in_place() {
    let h = harness();
    let mut workflow = install_active(&h.engine, linear_graph()).await;
    workflow.pause().unwrap();
    h.engine.store().put_workflow(workflow.clone()).await.unwrap();

    let mut schedule = WorkflowSchedule::new(workflow.id, "0 0 * * * * *").unwrap();
    schedule.next_run = Some(Utc::now() - Duration::minutes(5));
    h.engine.store().put_schedule(schedule.clone()).await.unwrap();

    // The trigger is refused, the schedule itself stays active with an
    // advanced next_run.
    let created = h.engine.fire_due_schedules(Utc::now()).await.unwrap();
    assert!(created.is_empty());
    let after = h.engine.store().schedule(schedule.id).await.unwrap();
    assert!(after.active);
}
