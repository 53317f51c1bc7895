//! Work dispatch: the at-least-once queue decoupling "node N should run
//! next" from the caller.
//!
//! [`WorkDispatcher`] is an injected seam so the coordinator stays testable
//! with an in-process queue and swappable for a durable broker in
//! production. Delivery is assumed at-least-once; the coordinator's
//! processing is idempotent, so a duplicate [`WorkItem`] is absorbed as a
//! debug-logged no-op rather than a double transition.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::types::ExecutionId;

/// One discrete unit of work for the engine's consumer loop.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkItem {
    /// Execute `node_id` for `execution_id`.
    RunNode {
        execution_id: ExecutionId,
        node_id: String,
    },
    /// A delay node's timer elapsed; resume traversal past it.
    ResumeDelay {
        execution_id: ExecutionId,
        node_id: String,
    },
}

impl WorkItem {
    #[must_use]
    pub fn execution_id(&self) -> ExecutionId {
        match self {
            Self::RunNode { execution_id, .. } | Self::ResumeDelay { execution_id, .. } => {
                *execution_id
            }
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &str {
        match self {
            Self::RunNode { node_id, .. } | Self::ResumeDelay { node_id, .. } => node_id,
        }
    }
}

/// Errors raised when handing work to the queue.
#[derive(Debug, Error, Diagnostic)]
pub enum DispatchError {
    /// The consumer side of the queue is gone.
    #[error("work queue closed")]
    #[diagnostic(
        code(flowloom::dispatch::queue_closed),
        help("The engine's worker loop has shut down; no further work can be scheduled.")
    )]
    QueueClosed,
}

/// The durable, horizontally-scaled task queue, seen from the producer side.
#[async_trait]
pub trait WorkDispatcher: Send + Sync {
    /// Enqueues `item` for prompt delivery.
    async fn enqueue(&self, item: WorkItem) -> Result<(), DispatchError>;

    /// Enqueues `item` for delivery after `delay` has elapsed. Used by the
    /// delay scheduler; the item may be delivered more than once.
    async fn enqueue_after(&self, delay: Duration, item: WorkItem) -> Result<(), DispatchError>;
}

/// In-process dispatcher over an unbounded flume channel.
///
/// The receiver half is consumed by the engine's worker loop (or drained
/// synchronously in tests via `Engine::run_until_idle`). Deferred items are
/// parked on a spawned timer task until due.
#[derive(Clone)]
pub struct QueueDispatcher {
    tx: flume::Sender<WorkItem>,
}

impl QueueDispatcher {
    /// Creates the dispatcher plus the receiver half for the consumer loop.
    #[must_use]
    pub fn new() -> (Self, flume::Receiver<WorkItem>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WorkDispatcher for QueueDispatcher {
    async fn enqueue(&self, item: WorkItem) -> Result<(), DispatchError> {
        tracing::debug!(?item, "enqueueing work item");
        self.tx.send(item).map_err(|_| DispatchError::QueueClosed)
    }

    async fn enqueue_after(&self, delay: Duration, item: WorkItem) -> Result<(), DispatchError> {
        if self.tx.is_disconnected() {
            return Err(DispatchError::QueueClosed);
        }
        tracing::debug!(?item, ?delay, "scheduling deferred work item");
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if tx.send(item).is_err() {
                tracing::debug!("queue closed before deferred item became due");
            }
        });
        Ok(())
    }
}
