//! Retry coordination.
//!
//! Classifies handler outcomes into the four ways a dispatch can conclude.
//! Recoverable failures below the retry ceiling go back to the queue with a
//! priority bump; everything else is terminal for the request.

use std::time::Duration;

use serde_json::Value;

use crate::handler::{HandlerError, JobHandler};

/// How a completed dispatch attempt concludes.
#[derive(Debug)]
pub enum RetryDecision {
    /// Deliver the value and release the admission slot.
    Success(Value),
    /// Re-enqueue with incremented retry count and priority. The admission
    /// slot stays occupied for the whole chain.
    Retry { error: String },
    /// Recoverable failure past the retry ceiling. Terminal.
    Exhausted { error: String },
    /// Handler classified the failure as non-retryable. Terminal.
    Terminal { error: String },
}

/// Map a handler outcome onto a decision given the request's retry budget.
pub fn decide(
    outcome: Result<Value, HandlerError>,
    retry_count: u32,
    max_retries: u32,
) -> RetryDecision {
    debug_assert!(
        retry_count <= max_retries,
        "retry count {retry_count} exceeded ceiling {max_retries} before dispatch"
    );
    match outcome {
        Ok(value) => RetryDecision::Success(value),
        Err(HandlerError::Terminal(error)) => RetryDecision::Terminal { error },
        Err(HandlerError::Recoverable(error)) => {
            if retry_count < max_retries {
                RetryDecision::Retry { error }
            } else {
                RetryDecision::Exhausted { error }
            }
        }
    }
}

/// Invoke the handler, converting a watchdog overrun into a recoverable
/// failure so a stuck upstream call takes the retry path.
pub async fn run_handler(
    handler: &dyn JobHandler,
    payload: &Value,
    watchdog: Option<Duration>,
) -> Result<Value, HandlerError> {
    match watchdog {
        None => handler.handle(payload).await,
        Some(limit) => match tokio::time::timeout(limit, handler.handle(payload)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(HandlerError::Recoverable(format!(
                "handler exceeded watchdog of {}ms",
                limit.as_millis()
            ))),
        },
    }
}
