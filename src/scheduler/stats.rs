//! Running scheduler statistics.
//!
//! Counters are plain atomics so recording never blocks dispatch. Snapshots
//! are eventually consistent with in-flight mutations but individual counters
//! never lose updates.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::category::Category;

/// Aggregated counters for the whole scheduler.
///
/// `submitted` counts requests accepted into a queue; admission and depth
/// rejections are tracked separately and never enter the conservation
/// identity `submitted == succeeded + failed + cleared + pending`.
pub struct StatsAggregator {
    submitted: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    cleared: AtomicU64,
    admission_rejected: AtomicU64,
    queue_full_rejected: AtomicU64,
    retries: AtomicU64,
    dispatches: AtomicU64,
    wait_ms_total: AtomicU64,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self {
            submitted: AtomicU64::new(0),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            cleared: AtomicU64::new(0),
            admission_rejected: AtomicU64::new(0),
            queue_full_rejected: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            wait_ms_total: AtomicU64::new(0),
        }
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dispatch start and the enqueue-to-dispatch wait.
    pub fn record_dispatch(&self, wait: std::time::Duration) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.wait_ms_total
            .fetch_add(wait.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    /// Terminal failure: handler-terminal or retries exhausted. Incremented
    /// once per request, never once per attempt.
    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleared(&self) {
        self.cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission_rejected(&self) {
        self.admission_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queue_full(&self) {
        self.queue_full_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// Current totals. Eventually consistent under concurrent mutation.
    pub fn totals(&self) -> StatsTotals {
        let submitted = self.submitted.load(Ordering::Relaxed);
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let cleared = self.cleared.load(Ordering::Relaxed);
        let dispatches = self.dispatches.load(Ordering::Relaxed);
        let wait_ms_total = self.wait_ms_total.load(Ordering::Relaxed);

        StatsTotals {
            submitted,
            succeeded,
            failed,
            cleared,
            admission_rejected: self.admission_rejected.load(Ordering::Relaxed),
            queue_full_rejected: self.queue_full_rejected.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            pending: submitted.saturating_sub(succeeded + failed + cleared),
            avg_wait_ms: if dispatches == 0 {
                0.0
            } else {
                wait_ms_total as f64 / dispatches as f64
            },
        }
    }
}

impl Default for StatsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler-wide counter totals at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsTotals {
    pub submitted: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub cleared: u64,
    pub admission_rejected: u64,
    pub queue_full_rejected: u64,
    pub retries: u64,
    /// Requests currently queued or executing.
    pub pending: u64,
    /// Simple average of enqueue-to-dispatch wait across all dispatches.
    pub avg_wait_ms: f64,
}

/// Per-category live state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryStats {
    pub category: Category,
    pub queue_length: usize,
    pub active_workers: usize,
    pub is_idle: bool,
    pub pacing_delay_ms: u64,
    pub max_queue_depth: usize,
}

/// Read-only view assembled on demand for external monitoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub totals: StatsTotals,
    pub categories: Vec<CategoryStats>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn pending_follows_conservation() {
        let stats = StatsAggregator::new();
        for _ in 0..5 {
            stats.record_submitted();
        }
        stats.record_success();
        stats.record_success();
        stats.record_failure();

        let totals = stats.totals();
        assert_eq!(totals.submitted, 5);
        assert_eq!(totals.pending, 2);
        assert_eq!(
            totals.submitted,
            totals.succeeded + totals.failed + totals.cleared + totals.pending
        );
    }

    #[test]
    fn avg_wait_is_simple_mean() {
        let stats = StatsAggregator::new();
        stats.record_dispatch(Duration::from_millis(10));
        stats.record_dispatch(Duration::from_millis(30));
        let totals = stats.totals();
        assert!((totals.avg_wait_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_aggregator_reports_zero_wait() {
        let stats = StatsAggregator::new();
        assert_eq!(stats.totals().avg_wait_ms, 0.0);
    }

    #[test]
    fn rejections_do_not_enter_conservation() {
        let stats = StatsAggregator::new();
        stats.record_admission_rejected();
        stats.record_queue_full();
        let totals = stats.totals();
        assert_eq!(totals.submitted, 0);
        assert_eq!(totals.pending, 0);
        assert_eq!(totals.admission_rejected, 1);
        assert_eq!(totals.queue_full_rejected, 1);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        use std::sync::Arc;

        let stats = Arc::new(StatsAggregator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = Arc::clone(&stats);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.record_submitted();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.totals().submitted, 8000);
    }
}
