//! Append-only execution log.
//!
//! Every entry is write-once and ordered by timestamp; the log is the audit
//! trail operators read instead of re-deriving state from raw traces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::types::ExecutionId;

/// Severity of a log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// One write-once entry of an execution's log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    pub execution_id: ExecutionId,
    /// Set for node-scoped entries, absent for lifecycle entries such as
    /// creation or cancellation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    pub level: LogLevel,
    pub message: String,
    #[serde(default)]
    pub data: Value,
    pub at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    pub fn new(
        execution_id: ExecutionId,
        node_id: Option<String>,
        level: LogLevel,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            level,
            message: message.into(),
            data,
            at: Utc::now(),
        }
    }

    pub fn info(
        execution_id: ExecutionId,
        node_id: Option<String>,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::new(execution_id, node_id, LogLevel::Info, message, data)
    }

    pub fn warn(
        execution_id: ExecutionId,
        node_id: Option<String>,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::new(execution_id, node_id, LogLevel::Warn, message, data)
    }

    pub fn error(
        execution_id: ExecutionId,
        node_id: Option<String>,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::new(execution_id, node_id, LogLevel::Error, message, data)
    }

    pub fn debug(
        execution_id: ExecutionId,
        node_id: Option<String>,
        message: impl Into<String>,
        data: Value,
    ) -> Self {
        Self::new(execution_id, node_id, LogLevel::Debug, message, data)
    }
}
