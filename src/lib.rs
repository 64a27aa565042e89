//! dispatch-core
//!
//! Admission and concurrency-scheduling layer between an application and a
//! rate-limited, latency-variable external AI inference service.
//!
//! # Guarantees
//!
//! - **Pool bound**: at most `pool_size` concurrent handler calls per category
//! - **Pacing**: at least `pacing_delay` between dispatch starts per category
//! - **Fairness**: at most one in-flight request per (user, category)
//! - **Backpressure**: `QueueFull` rejection past `max_queue_depth`
//! - **Resilience**: recoverable handler failures retry with elevated
//!   priority up to the category's ceiling
//!
//! Categories are scheduled independently; a plan-generation backlog never
//! delays chat. The scheduler is an explicit instance, not a global: tests
//! and embeddings may run several side by side.

pub mod category;
pub mod config;
pub mod error;
pub mod handler;
pub mod scheduler;
pub mod telemetry;

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use category::{Category, CategoryConfig};
pub use config::SchedulerConfig;
pub use error::SchedulerError;
pub use handler::{HandlerError, JobHandler};
pub use scheduler::{JobResult, StatsSnapshot, DEFAULT_PRIORITY};

use scheduler::queued_request::{QueuedRequest, ResultRx};
use scheduler::{
    spawn_supervisor, AdmissionController, CategoryRuntime, DispatchCtx, StatsAggregator,
};

/// Pending-result handle returned by `submit`.
///
/// Resolves exactly once with the terminal outcome of the request,
/// independent of which worker or retry attempt produced it.
#[derive(Debug)]
pub struct JobTicket {
    pub id: Uuid,
    rx: ResultRx,
}

impl JobTicket {
    /// Await the terminal outcome.
    pub async fn outcome(self) -> JobResult {
        match self.rx.await {
            Ok(result) => result,
            // Sender dropped without resolving: scheduler went away.
            Err(_) => Err(SchedulerError::Shutdown),
        }
    }

    /// The raw receiver, for callers integrating with `select!`.
    pub fn into_receiver(self) -> ResultRx {
        self.rx
    }
}

struct CategoryEntry {
    runtime: Arc<CategoryRuntime>,
    handler: RwLock<Option<Arc<dyn JobHandler>>>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

/// The scheduler instance.
///
/// Constructed once at process start from a [`SchedulerConfig`] and shared by
/// handle. Handlers must be registered per category before the first `submit`
/// for that category.
pub struct Scheduler {
    entries: [CategoryEntry; 3],
    admission: Arc<AdmissionController>,
    stats: Arc<StatsAggregator>,
    shutdown: CancellationToken,
}

impl Scheduler {
    /// Create a scheduler with the given per-category configuration.
    ///
    /// No supervisor runs until its category's handler is registered.
    pub fn new(config: SchedulerConfig) -> Self {
        let entries = Category::ALL.map(|cat| CategoryEntry {
            runtime: Arc::new(CategoryRuntime::new(cat, config.category(cat))),
            handler: RwLock::new(None),
            supervisor: Mutex::new(None),
        });
        Self {
            entries,
            admission: Arc::new(AdmissionController::new()),
            stats: Arc::new(StatsAggregator::new()),
            shutdown: CancellationToken::new(),
        }
    }

    fn entry(&self, category: Category) -> &CategoryEntry {
        match category {
            Category::PlanGeneration => &self.entries[0],
            Category::CoachChat => &self.entries[1],
            Category::FoodAnalysis => &self.entries[2],
        }
    }

    /// Bind the external AI-invocation handler for a category and start its
    /// supervisor. First registration wins; repeat calls are ignored.
    pub fn register_handler(&self, category: Category, handler: Arc<dyn JobHandler>) {
        let entry = self.entry(category);
        {
            let mut slot = entry.handler.write();
            if slot.is_some() {
                tracing::warn!(%category, "handler already registered, ignoring");
                return;
            }
            *slot = Some(Arc::clone(&handler));
        }

        let ctx = Arc::new(DispatchCtx {
            runtime: Arc::clone(&entry.runtime),
            handler,
            admission: Arc::clone(&self.admission),
            stats: Arc::clone(&self.stats),
        });
        let handle = spawn_supervisor(ctx, self.shutdown.child_token());
        *entry.supervisor.lock() = Some(handle);
        tracing::info!(%category, "handler registered, supervisor started");
    }

    /// Submit a request at the default (lowest) base priority.
    pub async fn submit(
        &self,
        user_id: &str,
        category: Category,
        payload: Value,
    ) -> Result<JobTicket, SchedulerError> {
        self.submit_with_priority(user_id, category, payload, DEFAULT_PRIORITY)
            .await
    }

    /// Submit a request with an explicit base priority.
    ///
    /// Returns immediately: rejections (`AdmissionRejected`, `QueueFull`,
    /// `HandlerNotRegistered`) come back as `Err` before the request consumes
    /// queue capacity; accepted requests resolve through the returned ticket.
    pub async fn submit_with_priority(
        &self,
        user_id: &str,
        category: Category,
        payload: Value,
        priority: u32,
    ) -> Result<JobTicket, SchedulerError> {
        let entry = self.entry(category);
        if entry.handler.read().is_none() {
            return Err(SchedulerError::HandlerNotRegistered(category));
        }

        if !self.admission.try_admit(user_id, category) {
            self.stats.record_admission_rejected();
            return Err(SchedulerError::AdmissionRejected {
                user_id: user_id.to_string(),
                category,
            });
        }

        let (mut request, rx) = QueuedRequest::new(user_id.to_string(), category, payload, priority);
        request.epoch = entry.runtime.current_epoch();
        let id = request.id;

        match entry.runtime.queue.enqueue(request).await {
            Ok(()) => {
                self.stats.record_submitted();
                telemetry::record_submission(category);
                Ok(JobTicket { id, rx })
            }
            Err((_rejected, exceeded)) => {
                // The request never entered the queue; free the slot we took.
                self.admission.release(user_id, category);
                self.stats.record_queue_full();
                telemetry::record_queue_full(category);
                Err(SchedulerError::QueueFull {
                    category,
                    depth: exceeded.depth,
                    max: exceeded.max,
                })
            }
        }
    }

    /// Assemble a point-in-time monitoring snapshot. Side-effect-free and
    /// lock-free; never blocks dispatch.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            totals: self.stats.totals(),
            categories: self.entries.iter().map(|e| e.runtime.stats()).collect(),
        }
    }

    /// Reject every queued and in-flight request in one category with
    /// `QueueCleared` and release their admission slots.
    pub async fn clear_category(&self, category: Category) {
        let entry = self.entry(category);
        // Invalidate in-flight dispatches first so none can deliver or retry
        // after the drain.
        entry.runtime.bump_epoch();
        let drained = entry.runtime.queue.drain().await;
        let count = drained.len();
        for request in drained {
            self.admission.release(&request.user_id, request.category);
            self.stats.record_cleared();
            request.reject(SchedulerError::QueueCleared);
        }
        tracing::info!(%category, cleared = count, "category queue cleared");
    }

    /// Reject every queued and in-flight request in all categories.
    pub async fn clear_all(&self) {
        for category in Category::ALL {
            self.clear_category(category).await;
        }
    }

    /// Change a category's pacing delay. Takes effect for subsequent
    /// dispatches only.
    pub fn set_pacing_delay(&self, category: Category, delay: std::time::Duration) {
        self.entry(category).runtime.set_pacing_delay(delay);
    }

    /// Change a category's queue depth limit. Takes effect for subsequent
    /// submissions only.
    pub fn set_max_queue_depth(&self, category: Category, max: usize) {
        self.entry(category).runtime.queue.set_max_depth(max);
    }

    /// Stop all supervisors. In-flight handler calls run to completion;
    /// requests still queued when the cancel lands stay queued and are not
    /// dispatched, including ones whose supervisor is mid-pacing or waiting
    /// for a slot.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        for entry in &self.entries {
            entry.runtime.queue.wake();
        }
        let handles: Vec<_> = self
            .entries
            .iter()
            .filter_map(|e| e.supervisor.lock().take())
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("scheduler shut down");
    }
}
