//! Scheduler error types.
//!
//! Rejections (`AdmissionRejected`, `QueueFull`) are returned synchronously
//! from `submit` before the request consumes any queue capacity. Everything
//! else reaches the caller through the job's result channel.

use thiserror::Error;

use crate::category::Category;

/// Errors surfaced to callers of the scheduler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("user {user_id} already has an in-flight {category} request")]
    AdmissionRejected { user_id: String, category: Category },

    #[error("{category} queue full: {depth}/{max} pending requests")]
    QueueFull {
        category: Category,
        depth: usize,
        max: usize,
    },

    #[error("retries exhausted after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("handler failed terminally: {0}")]
    TerminalFailure(String),

    #[error("request dropped by queue clear")]
    QueueCleared,

    #[error("no handler registered for category {0}")]
    HandlerNotRegistered(Category),

    #[error("scheduler shut down before the request resolved")]
    Shutdown,
}

impl SchedulerError {
    /// Returns true for load-shedding rejections the caller may retry later.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AdmissionRejected { .. } | Self::QueueFull { .. }
        )
    }
}
