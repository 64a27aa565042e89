//! Per-category supervisor loop and worker execution.
//!
//! One supervisor task per category: wait for work, honor the pacing window,
//! occupy a worker slot, pop the highest-priority request, and run the
//! injected handler on its own task. Categories never share any of this
//! state, so a backlog in one can not delay another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::admission::AdmissionController;
use super::queue::CategoryQueue;
use super::queued_request::QueuedRequest;
use super::retry::{self, RetryDecision};
use super::slots::{SlotGuard, WorkerSlots};
use super::stats::{CategoryStats, StatsAggregator};
use crate::category::{Category, CategoryConfig};
use crate::error::SchedulerError;
use crate::handler::JobHandler;
use crate::telemetry;

/// Shared per-category scheduling state.
pub struct CategoryRuntime {
    pub category: Category,
    pub queue: CategoryQueue,
    pub slots: WorkerSlots,
    pacing_ms: AtomicU64,
    max_retries: u32,
    dispatch_timeout: Option<Duration>,
    /// Bumped by clears. A dispatch that finishes under a stale epoch is
    /// resolved as `QueueCleared` instead of delivering or retrying.
    epoch: AtomicU64,
}

impl CategoryRuntime {
    pub fn new(category: Category, config: &CategoryConfig) -> Self {
        Self {
            category,
            queue: CategoryQueue::new(category, config.max_queue_depth),
            slots: WorkerSlots::new(config.pool_size),
            pacing_ms: AtomicU64::new(config.pacing_delay.as_millis() as u64),
            max_retries: config.max_retries,
            dispatch_timeout: config.dispatch_timeout,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_ms.load(Ordering::Acquire))
    }

    /// Applies to subsequent dispatches only.
    pub fn set_pacing_delay(&self, delay: Duration) {
        self.pacing_ms
            .store(delay.as_millis() as u64, Ordering::Release);
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Invalidate all in-flight dispatches (clear operations).
    pub fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Live state for the stats snapshot. Lock-free.
    pub fn stats(&self) -> CategoryStats {
        let queue_length = self.queue.len();
        let active_workers = self.slots.active();
        CategoryStats {
            category: self.category,
            queue_length,
            active_workers,
            is_idle: queue_length == 0 && active_workers == 0,
            pacing_delay_ms: self.pacing_ms.load(Ordering::Acquire),
            max_queue_depth: self.queue.max_depth(),
        }
    }
}

/// Everything a supervisor and its workers need.
pub struct DispatchCtx {
    pub runtime: Arc<CategoryRuntime>,
    pub handler: Arc<dyn JobHandler>,
    pub admission: Arc<AdmissionController>,
    pub stats: Arc<StatsAggregator>,
}

/// Spawn the supervisor loop for one category. Returns a handle for shutdown.
pub fn spawn_supervisor(
    ctx: Arc<DispatchCtx>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        supervisor_loop(&ctx, shutdown).await;
    })
}

async fn supervisor_loop(ctx: &Arc<DispatchCtx>, shutdown: CancellationToken) {
    let runtime = &ctx.runtime;
    let mut last_dispatch: Option<Instant> = None;

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            () = runtime.queue.wait_until_nonempty() => {}
        }

        // Both the pacing sleep and the slot wait observe shutdown, so a
        // cancel during either leaves the queue untouched.
        let slot = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            slot = pace_then_acquire(runtime, last_dispatch) => slot,
        };

        // A concurrent clear may have drained the queue while we paced.
        let Some(request) = runtime.queue.dequeue().await else {
            continue;
        };

        // Queued under an epoch a clear has since invalidated: a retry can
        // land in the queue after the clear's drain, so the stamp is checked
        // again at dispatch time.
        if request.epoch != runtime.current_epoch() {
            drop(slot);
            conclude_cleared(ctx, request);
            continue;
        }

        last_dispatch = Some(Instant::now());
        ctx.stats.record_dispatch(request.waited());
        telemetry::record_dispatch(runtime.category, request.retry_count);

        let epoch = request.epoch;
        let ctx = Arc::clone(ctx);
        tokio::spawn(async move {
            execute(&ctx, request, slot, epoch).await;
        });
    }

    tracing::info!(category = %runtime.category, "supervisor: shutdown signal received");
}

/// Sleep out the remainder of the pacing window, then wait for a worker slot.
async fn pace_then_acquire(
    runtime: &CategoryRuntime,
    last_dispatch: Option<Instant>,
) -> SlotGuard {
    // Pacing window is measured from the previous dispatch start of this
    // category, independent of slot availability.
    if let Some(prev) = last_dispatch {
        let pacing = runtime.pacing_delay();
        let elapsed = prev.elapsed();
        if elapsed < pacing {
            tokio::time::sleep(pacing - elapsed).await;
        }
    }
    runtime.slots.acquire().await
}

/// Resolve a request overtaken by a clear: free its admission slot and reject
/// it with `QueueCleared`.
fn conclude_cleared(ctx: &DispatchCtx, request: QueuedRequest) {
    ctx.admission.release(&request.user_id, request.category);
    ctx.stats.record_cleared();
    request.reject(SchedulerError::QueueCleared);
}

/// Run one dispatch attempt to its conclusion. The slot guard is held for the
/// duration of the handler call and released on return.
async fn execute(
    ctx: &DispatchCtx,
    mut request: QueuedRequest,
    _slot: SlotGuard,
    epoch_at_dispatch: u64,
) {
    let runtime = &ctx.runtime;
    let start = Instant::now();
    let outcome =
        retry::run_handler(ctx.handler.as_ref(), &request.payload, runtime.dispatch_timeout).await;
    let latency_ms = start.elapsed().as_millis() as u64;

    // A clear happened while this dispatch was in flight.
    if runtime.current_epoch() != epoch_at_dispatch {
        conclude_cleared(ctx, request);
        return;
    }

    match retry::decide(outcome, request.retry_count, runtime.max_retries) {
        RetryDecision::Success(value) => {
            telemetry::record_dispatch_success(runtime.category, latency_ms);
            ctx.admission.release(&request.user_id, request.category);
            ctx.stats.record_success();
            request.resolve(value);
        }
        RetryDecision::Retry { error } => {
            tracing::debug!(
                category = %runtime.category,
                request_id = %request.id,
                retry_count = request.retry_count,
                error,
                "recoverable failure, re-enqueueing"
            );
            telemetry::record_retry(runtime.category);
            ctx.stats.record_retry();
            request.retry_count += 1;
            request.priority = request.priority.saturating_add(1);
            // The request keeps its dispatch-time epoch stamp: if a clear
            // races this requeue, the stale stamp gets it rejected at its
            // next dequeue instead of letting it escape the clear.
            runtime.queue.requeue(request).await;
        }
        RetryDecision::Exhausted { error } => {
            tracing::warn!(
                category = %runtime.category,
                request_id = %request.id,
                attempts = request.retry_count + 1,
                error,
                "retries exhausted"
            );
            telemetry::record_dispatch_failure(runtime.category, "retries_exhausted");
            ctx.admission.release(&request.user_id, request.category);
            ctx.stats.record_failure();
            let attempts = request.retry_count + 1;
            request.reject(SchedulerError::RetriesExhausted {
                attempts,
                last_error: error,
            });
        }
        RetryDecision::Terminal { error } => {
            tracing::warn!(
                category = %runtime.category,
                request_id = %request.id,
                error,
                "terminal handler failure"
            );
            telemetry::record_dispatch_failure(runtime.category, "terminal");
            ctx.admission.release(&request.user_id, request.category);
            ctx.stats.record_failure();
            request.reject(SchedulerError::TerminalFailure(error));
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
