//! Data model of the workflow engine: graphs, nodes, connections, and the
//! surrounding definitions (workflows, templates, integrations, schedules).
//!
//! Everything here is plain serde-serializable data. Behavior lives
//! elsewhere: structural validation in [`crate::validator`], traversal in
//! [`crate::execution`], and side effects in [`crate::nodes`].

pub mod condition;
pub mod connection;
pub mod graph;
pub mod integration;
pub mod node;
pub mod schedule;
pub mod template;
pub mod workflow;

pub use condition::{Condition, ConditionOperator};
pub use connection::WorkflowConnection;
pub use graph::GraphModel;
pub use integration::{IntegrationAuth, IntegrationType, WorkflowIntegration};
pub use node::{NodeConfig, Position, TaskOperation, VariableMapping, WorkflowNode};
pub use schedule::{InvalidScheduleError, WorkflowSchedule};
pub use template::WorkflowTemplate;
pub use workflow::{Workflow, WorkflowError, WorkflowSettings};
