//! Task node sub-operations.
//!
//! Tasks are the workhorse node kind: small configured operations over the
//! variable map or a plain HTTP fetch. Internal errors never escape as
//! `Err`; they become `success = false` outcomes so the coordinator fails
//! the execution with the message on record.

use serde_json::json;

use super::NodeOutcome;
use crate::collaborators::IntegrationClient;
use crate::execution::{VariableUpdate, WorkflowExecution};
use crate::model::TaskOperation;
use crate::nodes::substitute;

pub(super) async fn run(
    operation: &TaskOperation,
    execution: &WorkflowExecution,
    client: &dyn IntegrationClient,
) -> NodeOutcome {
    match operation {
        TaskOperation::Set { values } => {
            let mut update = VariableUpdate::default();
            for (key, value) in values {
                update.insert(
                    key.clone(),
                    substitute::substitute(value, &execution.variables),
                );
            }
            NodeOutcome::success().with_variables(update)
        }
        TaskOperation::Transform { mappings } => {
            let mut update = VariableUpdate::default();
            for mapping in mappings {
                match execution.variables.get(&mapping.from) {
                    Some(value) => {
                        update.insert(mapping.to.clone(), value.clone());
                    }
                    None => {
                        return NodeOutcome::failure(format!(
                            "transform source variable '{}' is missing",
                            mapping.from
                        ));
                    }
                }
            }
            NodeOutcome::success().with_variables(update)
        }
        TaskOperation::Http { url, method } => {
            let url = substitute::render(url, &execution.variables);
            match client.fetch(*method, &url).await {
                Ok(response) if response.is_success() => {
                    let mut update = VariableUpdate::default();
                    update.insert("task_status".into(), json!(response.status));
                    update.insert("task_response".into(), response.body);
                    NodeOutcome::success().with_variables(update)
                }
                Ok(response) => NodeOutcome::failure(format!(
                    "http task to {url} returned status {}",
                    response.status
                )),
                Err(e) => NodeOutcome::failure(format!("http task to {url} failed: {e}")),
            }
        }
        TaskOperation::Custom { name } => {
            let mut update = VariableUpdate::default();
            update.insert("task_completed".into(), json!(name));
            NodeOutcome::success().with_variables(update)
        }
    }
}
