//! # Flowloom: Graph-driven Workflow Execution Engine
//!
//! Flowloom executes directed graphs of typed steps (tasks, decisions,
//! human approvals, notifications, external-system calls, timed delays)
//! reliably, asynchronously, and resumably. An execution can legitimately
//! pause for minutes or days awaiting a human decision or a timer; the
//! engine is built around that suspension model rather than fighting it.
//!
//! ## Core Concepts
//!
//! - **Workflow**: a validated graph of nodes and conditioned connections
//! - **Execution**: one run of a workflow, carrying its own variable state
//!   and status machine (`pending -> running -> {paused <-> running} ->
//!   {completed | failed | cancelled}`)
//! - **Node executor**: the polymorphic unit performing one step's side
//!   effect and reporting continue/pause/end
//! - **Work dispatcher**: the at-least-once queue decoupling "node N runs
//!   next" from the caller; processing is idempotent, so duplicate
//!   deliveries are absorbed
//! - **Approval gate / delay scheduler**: the two legitimate suspension
//!   points, resumed by an approver's response or an elapsed timer
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flowloom::engine::Engine;
//! use flowloom::model::{GraphModel, NodeConfig, TaskOperation, Workflow};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::builder().build()?;
//!
//! let mut workflow = Workflow::new("greeter", "docs").with_graph(
//!     GraphModel::new()
//!         .with_node("start", NodeConfig::Start)
//!         .with_node("greet", NodeConfig::Task {
//!             operation: TaskOperation::Custom { name: "greet".into() },
//!         })
//!         .with_node("done", NodeConfig::End)
//!         .connect("start", "greet")
//!         .connect("greet", "done"),
//! );
//! workflow.activate()?; // validator-gated
//! engine.store().put_workflow(workflow.clone()).await?;
//!
//! let execution = engine
//!     .trigger(workflow.id, "docs", json!({ "name": "Ada" }))
//!     .await?;
//! engine.run_until_idle().await;
//!
//! let finished = engine.store().execution(execution.id).await?;
//! println!("status: {}", finished.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Structural Validation
//!
//! A workflow only transitions to `active` when [`validator::validate`]
//! reports a clean graph: exactly one start node, at least one end node, no
//! dangling connection endpoints, no orphans, no cycles. Validation is pure
//! and callable standalone, so CI can lint stored definitions.
//!
//! ## Module Guide
//!
//! - [`model`] - graphs, nodes, connections, workflows, templates,
//!   integrations, schedules
//! - [`validator`] - static structural analysis gating activation
//! - [`execution`] - executions, variables, logs, and the coordinator
//! - [`nodes`] - per-kind node executors and template substitution
//! - [`approvals`] - human-decision requests and the approval gate
//! - [`dispatch`] / [`scheduler`] - at-least-once work queue and deferred
//!   continuations
//! - [`collaborators`] - notification and integration capability traits
//! - [`store`] - storage seam plus the in-memory implementation
//! - [`engine`] - assembly and the work-consumption loop

pub mod approvals;
pub mod collaborators;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod execution;
pub mod metrics;
pub mod model;
pub mod nodes;
pub mod scheduler;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod validator;
