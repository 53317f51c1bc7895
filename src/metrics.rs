//! Per-workflow, per-day execution rollups.
//!
//! Derived, append-only data: counters are incremented by the coordinator
//! as executions are triggered and reach terminal states. Never read back
//! by the engine itself; it exists for dashboards and capacity planning.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{ExecutionStatus, WorkflowId};

/// Daily counters for one workflow.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowMetrics {
    pub workflow_id: WorkflowId,
    pub day: NaiveDate,
    pub triggered: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    /// Sum of wall-clock durations of terminal executions, for averaging.
    pub total_duration_ms: u64,
}

impl WorkflowMetrics {
    #[must_use]
    pub fn new(workflow_id: WorkflowId, day: NaiveDate) -> Self {
        Self {
            workflow_id,
            day,
            triggered: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
            total_duration_ms: 0,
        }
    }

    pub fn record_trigger(&mut self) {
        self.triggered += 1;
    }

    /// Folds one terminal execution into the rollup. Non-terminal statuses
    /// are ignored.
    pub fn record_terminal(&mut self, status: ExecutionStatus, duration_ms: u64) {
        match status {
            ExecutionStatus::Completed => self.completed += 1,
            ExecutionStatus::Failed => self.failed += 1,
            ExecutionStatus::Cancelled => self.cancelled += 1,
            _ => return,
        }
        self.total_duration_ms += duration_ms;
    }

    /// Mean duration of terminal executions recorded so far.
    #[must_use]
    pub fn average_duration_ms(&self) -> Option<u64> {
        let terminal = self.completed + self.failed + self.cancelled;
        if terminal == 0 {
            return None;
        }
        Some(self.total_duration_ms / terminal)
    }
}
