//! Recurring trigger definitions.
//!
//! A schedule binds a cron expression (with seconds field, as parsed by the
//! `cron` crate) to a workflow. Schedules only decide *when* to trigger;
//! execution state lives entirely in `WorkflowExecution`.

use chrono::{DateTime, Utc};
use cron::Schedule as CronSchedule;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::types::{ScheduleId, WorkflowId};

/// The cron expression could not be parsed.
#[derive(Debug, Error, Diagnostic)]
#[error("invalid cron expression '{expression}': {reason}")]
#[diagnostic(
    code(flowloom::schedule::invalid_expression),
    help("Expressions use the seconds-first cron syntax, e.g. '0 0 9 * * Mon-Fri *'.")
)]
pub struct InvalidScheduleError {
    pub expression: String,
    pub reason: String,
}

/// A recurring or windowed trigger bound to one workflow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSchedule {
    pub id: ScheduleId,
    pub workflow_id: WorkflowId,
    /// Seconds-first cron expression.
    pub expression: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starts_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_run: Option<DateTime<Utc>>,
}

impl WorkflowSchedule {
    /// Creates an active schedule and computes its first `next_run`.
    pub fn new(
        workflow_id: WorkflowId,
        expression: impl Into<String>,
    ) -> Result<Self, InvalidScheduleError> {
        let expression = expression.into();
        let mut schedule = Self {
            id: Uuid::new_v4(),
            workflow_id,
            expression,
            active: true,
            starts_at: None,
            ends_at: None,
            last_run: None,
            next_run: None,
        };
        schedule.next_run = Some(schedule.next_occurrence_after(Utc::now())?);
        Ok(schedule)
    }

    fn cron(&self) -> Result<CronSchedule, InvalidScheduleError> {
        CronSchedule::from_str(&self.expression).map_err(|e| InvalidScheduleError {
            expression: self.expression.clone(),
            reason: e.to_string(),
        })
    }

    /// The first firing time strictly after `after`.
    pub fn next_occurrence_after(
        &self,
        after: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, InvalidScheduleError> {
        self.cron()?
            .after(&after)
            .next()
            .ok_or_else(|| InvalidScheduleError {
                expression: self.expression.clone(),
                reason: "no future occurrence".into(),
            })
    }

    /// Whether the schedule should fire at `now`: active, inside its window,
    /// and past its computed `next_run`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        if !self.active {
            return false;
        }
        if let Some(start) = self.starts_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.ends_at {
            if now > end {
                return false;
            }
        }
        match self.next_run {
            Some(next) => next <= now,
            None => false,
        }
    }

    /// Records a firing and advances `next_run`.
    pub fn mark_ran(&mut self, now: DateTime<Utc>) -> Result<(), InvalidScheduleError> {
        self.last_run = Some(now);
        self.next_run = Some(self.next_occurrence_after(now)?);
        Ok(())
    }
}
