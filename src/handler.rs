//! Injected handler interface.
//!
//! The scheduler never performs the upstream AI call itself. Each category is
//! bound to exactly one [`JobHandler`] at startup; the scheduler treats the
//! payload as opaque and only inspects whether a failure is recoverable.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Failure classification reported by a handler.
///
/// The recoverable/terminal split is the handler's to make: an upstream 5xx
/// or timeout is recoverable, malformed input is terminal.
#[derive(Debug, Clone, Error)]
pub enum HandlerError {
    #[error("recoverable: {0}")]
    Recoverable(String),

    #[error("terminal: {0}")]
    Terminal(String),
}

impl HandlerError {
    /// Whether the retry coordinator may re-attempt this failure.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}

/// Per-category work executor supplied by the surrounding application.
///
/// Implementations perform the external AI call and classify failures.
/// The payload arrives unmodified from `submit`.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, payload: &Value) -> Result<Value, HandlerError>;
}
