//! Shared graph fixtures and the engine test harness.

use std::sync::Arc;

use serde_json::json;

use flowloom::collaborators::NotificationChannel;
use flowloom::engine::Engine;
use flowloom::execution::{ExecutionLogEntry, LogLevel};
use flowloom::model::{
    Condition, ConditionOperator, GraphModel, NodeConfig, TaskOperation, Workflow,
};
use flowloom::types::{HttpMethod, IntegrationId};

use super::fakes::{FakeIntegrationClient, RecordingNotificationSender};

/// An engine wired with recording fakes, ready for synchronous draining.
pub struct TestHarness {
    pub engine: Engine,
    pub notifier: Arc<RecordingNotificationSender>,
    pub integrations: Arc<FakeIntegrationClient>,
}

pub fn harness() -> TestHarness {
    let notifier = Arc::new(RecordingNotificationSender::default());
    let integrations = Arc::new(FakeIntegrationClient::default());
    let engine = Engine::builder()
        .notification_sender(notifier.clone())
        .integration_client(integrations.clone())
        .build()
        .expect("engine builds");
    TestHarness {
        engine,
        notifier,
        integrations,
    }
}

/// Activates `graph` as a fresh workflow and stores it.
pub async fn install_active(engine: &Engine, graph: GraphModel) -> Workflow {
    let mut workflow = Workflow::new("test-workflow", "tests").with_graph(graph);
    workflow.activate().expect("fixture graph validates");
    engine
        .store()
        .put_workflow(workflow.clone())
        .await
        .expect("store accepts workflow");
    workflow
}

/// `start -> task(custom) -> end`.
pub fn linear_graph() -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node(
            "task",
            NodeConfig::Task {
                operation: TaskOperation::Custom {
                    name: "noop".into(),
                },
            },
        )
        .with_node("end", NodeConfig::End)
        .connect("start", "task")
        .connect("task", "end")
}

/// `start -> decision(amount > 100) -> end` gated on `decision_result`.
pub fn decision_graph() -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node(
            "decision",
            NodeConfig::Decision {
                condition: Condition::new("amount", ConditionOperator::GreaterThan, json!(100)),
            },
        )
        .with_node("end", NodeConfig::End)
        .connect("start", "decision")
        .connect_if(
            "decision",
            "end",
            Condition::new("decision_result", ConditionOperator::Equals, json!(true)),
        )
}

/// `start -> approval -> end`.
pub fn approval_graph(approver: &str) -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node(
            "approval",
            NodeConfig::Approval {
                approver_id: approver.into(),
                message: Some("Sign off on {{subject}}".into()),
                request_data: json!({"subject": "{{subject}}"}),
            },
        )
        .with_node("end", NodeConfig::End)
        .connect("start", "approval")
        .connect("approval", "end")
}

/// `start -> delay -> end`.
pub fn delay_graph(duration_secs: u64) -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node("delay", NodeConfig::Delay { duration_secs })
        .with_node("end", NodeConfig::End)
        .connect("start", "delay")
        .connect("delay", "end")
}

/// `start -> integration -> end` posting a substituted payload.
pub fn integration_graph(integration_id: IntegrationId) -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node(
            "call",
            NodeConfig::Integration {
                integration_id,
                method: HttpMethod::Post,
                path: "/hook".into(),
                headers: Default::default(),
                payload: json!({"amount": "{{amount}}", "source": "flowloom"}),
            },
        )
        .with_node("end", NodeConfig::End)
        .connect("start", "call")
        .connect("call", "end")
}

/// `start -> notification -> end`.
pub fn notification_graph() -> GraphModel {
    GraphModel::new()
        .with_node("start", NodeConfig::Start)
        .with_node(
            "notify",
            NodeConfig::Notification {
                channel: NotificationChannel::Email,
                recipients: vec!["ops@example.com".into()],
                subject: Some("run {{run}}".into()),
                body: "amount was {{amount}}".into(),
            },
        )
        .with_node("end", NodeConfig::End)
        .connect("start", "notify")
        .connect("notify", "end")
}

/// Node-scoped entries at info or error level, in insertion order. This is
/// the per-step trail (lifecycle entries such as creation and retry are
/// debug-level and node-less).
pub fn node_trail(entries: &[ExecutionLogEntry]) -> Vec<(String, LogLevel)> {
    entries
        .iter()
        .filter(|e| e.node_id.is_some() && e.level >= LogLevel::Info)
        .map(|e| (e.node_id.clone().unwrap(), e.level))
        .collect()
}
