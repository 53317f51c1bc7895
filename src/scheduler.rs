//! Deferred continuations for delay nodes.
//!
//! A delay node must not block a worker: it asks the scheduler for a future
//! continuation and immediately reports `pause`. The scheduler hands a
//! deferred [`WorkItem::ResumeDelay`] to the dispatcher; when it is
//! delivered (possibly more than once), the coordinator resumes the paused
//! execution idempotently.

use std::sync::Arc;
use std::time::Duration;

use crate::dispatch::{DispatchError, WorkDispatcher, WorkItem};
use crate::types::ExecutionId;

/// Arranges future continuations through the work dispatcher.
#[derive(Clone)]
pub struct DelayScheduler {
    dispatcher: Arc<dyn WorkDispatcher>,
}

impl DelayScheduler {
    pub fn new(dispatcher: Arc<dyn WorkDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Schedules traversal past `node_id` once `duration` has elapsed.
    pub async fn schedule_continuation(
        &self,
        execution_id: ExecutionId,
        node_id: &str,
        duration: Duration,
    ) -> Result<(), DispatchError> {
        tracing::debug!(
            execution = %execution_id,
            node = node_id,
            ?duration,
            "scheduling delay continuation"
        );
        self.dispatcher
            .enqueue_after(
                duration,
                WorkItem::ResumeDelay {
                    execution_id,
                    node_id: node_id.to_string(),
                },
            )
            .await
    }
}
