//! Telemetry for the scheduler.
//!
//! Structured logging via `tracing` and metrics via the `metrics` facade.
//! The domain counters callers poll live in [`crate::scheduler::stats`]; the
//! facade here feeds whatever exporter the embedding application installs.

mod logging;
mod metrics;

pub use logging::{init_logging, LogConfig, LogError, LogFormat};
pub use metrics::{
    record_admission_rejection, record_dispatch, record_dispatch_failure,
    record_dispatch_success, record_queue_depth, record_queue_full, record_retry,
    record_submission,
};
