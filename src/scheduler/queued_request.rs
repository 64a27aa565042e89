//! Queued request type for the category queues.

use std::time::Instant;

use serde_json::Value;
use uuid::Uuid;

use crate::category::Category;
use crate::error::SchedulerError;

/// Terminal outcome delivered to the submitting caller.
pub type JobResult = Result<Value, SchedulerError>;
/// Result channel type for delivering outcomes back to callers.
pub type ResultTx = tokio::sync::oneshot::Sender<JobResult>;
/// Receiver half for awaiting a job outcome.
pub type ResultRx = tokio::sync::oneshot::Receiver<JobResult>;

/// One unit of work flowing through a category queue.
///
/// Owned exclusively by whichever structure currently holds it: the queue,
/// then a worker, then either dropped (terminal) or handed back to the queue
/// (retry). The result channel resolves at most once.
pub struct QueuedRequest {
    pub id: Uuid,
    pub user_id: String,
    pub category: Category,
    /// Higher dispatched first. Bumped on every retry.
    pub priority: u32,
    /// Opaque data handed unmodified to the injected handler.
    pub payload: Value,
    pub submitted_at: Instant,
    pub retry_count: u32,
    /// Clear epoch under which this request was placed in the queue. A
    /// request whose stamp is older than the category's current epoch was
    /// overtaken by a clear and must be rejected at dispatch, not run.
    pub epoch: u64,
    result_tx: Option<ResultTx>,
}

impl std::fmt::Debug for QueuedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedRequest")
            .field("id", &self.id)
            .field("user_id", &self.user_id)
            .field("category", &self.category)
            .field("priority", &self.priority)
            .field("retry_count", &self.retry_count)
            .finish()
    }
}

impl QueuedRequest {
    /// Create a request and the receiver the caller awaits.
    pub fn new(
        user_id: String,
        category: Category,
        payload: Value,
        priority: u32,
    ) -> (Self, ResultRx) {
        let (tx, rx) = tokio::sync::oneshot::channel();
        let request = Self {
            id: Uuid::new_v4(),
            user_id,
            category,
            priority,
            payload,
            submitted_at: Instant::now(),
            retry_count: 0,
            epoch: 0,
            result_tx: Some(tx),
        };
        (request, rx)
    }

    /// Resolve the result channel with a success value. Consumes the request.
    pub fn resolve(mut self, value: Value) {
        if let Some(tx) = self.result_tx.take() {
            let _ = tx.send(Ok(value));
        }
    }

    /// Reject the result channel with a terminal error. Consumes the request.
    pub fn reject(mut self, error: SchedulerError) {
        if let Some(tx) = self.result_tx.take() {
            let _ = tx.send(Err(error));
        }
    }

    /// Time spent between submission and now.
    pub fn waited(&self) -> std::time::Duration {
        self.submitted_at.elapsed()
    }
}
