//! The activatable workflow definition and its lifecycle.
//!
//! A [`Workflow`] owns a [`GraphModel`] plus trigger metadata, variable
//! defaults, and settings. The only path into [`WorkflowStatus::Active`]
//! runs through the graph validator; an active workflow's graph is treated
//! as read-only by every concurrent execution.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::GraphModel;
use crate::types::{InvalidTransitionError, TriggerType, WorkflowId, WorkflowStatus};
use crate::validator::{self, InvalidGraphError};

/// Errors raised by workflow lifecycle operations.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    /// Activation was requested for a structurally unsound graph. Carries
    /// the full list of validator complaints.
    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidGraph(#[from] InvalidGraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidTransition(#[from] InvalidTransitionError),

    /// The graph of an active workflow may not be replaced in place.
    #[error("cannot replace the graph of an active workflow")]
    #[diagnostic(
        code(flowloom::workflow::graph_locked),
        help("Pause or archive the workflow first, or supersede it with a new version.")
    )]
    GraphLocked,
}

/// Free-form operational settings carried alongside the graph.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// Soft ceiling on execution wall time, advisory for operators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_secs: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A concrete, activatable workflow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub status: WorkflowStatus,
    pub trigger: TriggerType,
    #[serde(default)]
    pub trigger_config: Value,
    pub graph: GraphModel,
    #[serde(default)]
    pub variable_defaults: FxHashMap<String, Value>,
    #[serde(default)]
    pub settings: WorkflowSettings,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Creates a draft workflow with an empty graph and a manual trigger.
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            status: WorkflowStatus::Draft,
            trigger: TriggerType::Manual,
            trigger_config: Value::Null,
            graph: GraphModel::new(),
            variable_defaults: FxHashMap::default(),
            settings: WorkflowSettings::default(),
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn with_graph(mut self, graph: GraphModel) -> Self {
        self.graph = graph;
        self
    }

    #[must_use]
    pub fn with_trigger(mut self, trigger: TriggerType, config: Value) -> Self {
        self.trigger = trigger;
        self.trigger_config = config;
        self
    }

    #[must_use]
    pub fn with_default(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variable_defaults.insert(key.into(), value);
        self
    }

    /// Transitions the workflow to `Active`.
    ///
    /// Runs the graph validator first; on failure the status is untouched
    /// and the returned error carries every structural issue found. Only
    /// draft and paused workflows may be activated.
    pub fn activate(&mut self) -> Result<(), WorkflowError> {
        match self.status {
            WorkflowStatus::Draft | WorkflowStatus::Paused => {}
            other => {
                return Err(InvalidTransitionError::new(
                    "workflow",
                    other,
                    WorkflowStatus::Active,
                )
                .into());
            }
        }
        validator::validate(&self.graph)?;
        self.status = WorkflowStatus::Active;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Pauses an active workflow; running executions are unaffected, new
    /// triggers are rejected.
    pub fn pause(&mut self) -> Result<(), WorkflowError> {
        if self.status != WorkflowStatus::Active {
            return Err(
                InvalidTransitionError::new("workflow", self.status, WorkflowStatus::Paused).into(),
            );
        }
        self.status = WorkflowStatus::Paused;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Archives the workflow. Terminal: archived workflows are never
    /// reactivated, they are superseded by new definitions.
    pub fn archive(&mut self) -> Result<(), WorkflowError> {
        if self.status == WorkflowStatus::Archived {
            return Err(InvalidTransitionError::new(
                "workflow",
                self.status,
                WorkflowStatus::Archived,
            )
            .into());
        }
        self.status = WorkflowStatus::Archived;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Atomically replaces the whole graph. Rejected while the workflow is
    /// active; pause it first.
    pub fn replace_graph(&mut self, graph: GraphModel) -> Result<(), WorkflowError> {
        if self.status == WorkflowStatus::Active {
            return Err(WorkflowError::GraphLocked);
        }
        self.graph = graph;
        self.updated_at = Utc::now();
        Ok(())
    }
}
