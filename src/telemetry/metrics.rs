//! Metrics facade helpers.
//!
//! Thin wrappers over the `metrics` crate so scheduler code records
//! transitions with one call and consistent label names. The embedding
//! application installs the recorder/exporter.

use crate::category::Category;

/// A request was accepted into a category queue.
pub fn record_submission(category: Category) {
    metrics::counter!("scheduler_submissions_total", "category" => category.as_str()).increment(1);
}

/// A submission was rejected by per-user admission control.
pub fn record_admission_rejection(category: Category) {
    metrics::counter!("scheduler_admission_rejections_total", "category" => category.as_str())
        .increment(1);
}

/// A submission was rejected because the queue was at depth.
pub fn record_queue_full(category: Category) {
    metrics::counter!("scheduler_queue_full_total", "category" => category.as_str()).increment(1);
}

/// Current queue depth after an enqueue.
pub fn record_queue_depth(category: Category, depth: usize) {
    metrics::gauge!("scheduler_queue_depth", "category" => category.as_str()).set(depth as f64);
}

/// A dispatch attempt started.
pub fn record_dispatch(category: Category, retry_count: u32) {
    metrics::counter!("scheduler_dispatches_total", "category" => category.as_str()).increment(1);
    if retry_count > 0 {
        metrics::counter!("scheduler_retry_dispatches_total", "category" => category.as_str())
            .increment(1);
    }
}

/// A dispatch resolved successfully.
pub fn record_dispatch_success(category: Category, latency_ms: u64) {
    metrics::counter!("scheduler_successes_total", "category" => category.as_str()).increment(1);
    metrics::histogram!("scheduler_handler_latency_ms", "category" => category.as_str())
        .record(latency_ms as f64);
}

/// A request failed terminally.
pub fn record_dispatch_failure(category: Category, reason: &'static str) {
    metrics::counter!(
        "scheduler_failures_total",
        "category" => category.as_str(),
        "reason" => reason
    )
    .increment(1);
}

/// A recoverable failure was re-enqueued.
pub fn record_retry(category: Category) {
    metrics::counter!("scheduler_retries_total", "category" => category.as_str()).increment(1);
}
