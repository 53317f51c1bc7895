//! Reusable workflow blueprints.
//!
//! Templates are immutable once referenced: revising one produces a new
//! template with a bumped version via [`WorkflowTemplate::next_version`],
//! never an in-place edit.

use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::{GraphModel, Workflow};

/// A reusable graph blueprint that drafts are instantiated from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub version: u32,
    pub active: bool,
    pub graph: GraphModel,
    #[serde(default)]
    pub variable_defaults: FxHashMap<String, Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl WorkflowTemplate {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        graph: GraphModel,
        created_by: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category: category.into(),
            version: 1,
            active: true,
            graph,
            variable_defaults: FxHashMap::default(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Produces the superseding template: a fresh id, `version + 1`, and the
    /// revised graph. The old template is left as-is (callers typically
    /// clear its `active` flag).
    #[must_use]
    pub fn next_version(&self, graph: GraphModel, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            category: self.category.clone(),
            version: self.version + 1,
            active: true,
            graph,
            variable_defaults: self.variable_defaults.clone(),
            created_by: created_by.into(),
            created_at: Utc::now(),
        }
    }

    /// Instantiates a draft workflow from this blueprint.
    #[must_use]
    pub fn instantiate(&self, created_by: impl Into<String>) -> Workflow {
        let mut workflow =
            Workflow::new(self.name.clone(), created_by).with_graph(self.graph.clone());
        workflow.variable_defaults = self.variable_defaults.clone();
        workflow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeConfig;

    #[test]
    fn next_version_supersedes() {
        let graph = GraphModel::new()
            .with_node("start", NodeConfig::Start)
            .with_node("done", NodeConfig::End)
            .connect("start", "done");
        let original = WorkflowTemplate::new("onboarding", "hr", graph.clone(), "author");
        let revised = original.next_version(graph, "editor");
        assert_eq!(revised.version, 2);
        assert_ne!(revised.id, original.id);
        assert_eq!(revised.name, original.name);
    }
}
