//! Request scheduling for rate-limited AI backends.
//!
//! Manages per-category admission control, bounded priority queues, paced
//! worker pools, retry coordination, and running statistics.

pub mod admission;
pub mod dispatcher;
mod priority;
pub mod queue;
pub mod queued_request;
pub mod retry;
mod slots;
pub mod stats;

pub use admission::AdmissionController;
pub use dispatcher::{spawn_supervisor, CategoryRuntime, DispatchCtx};
pub use priority::{PriorityQueue, DEFAULT_PRIORITY};
pub use queue::CategoryQueue;
pub use queued_request::{JobResult, QueuedRequest, ResultRx, ResultTx};
pub use retry::{decide, RetryDecision};
pub use slots::{SlotGuard, WorkerSlots};
pub use stats::{CategoryStats, StatsAggregator, StatsSnapshot, StatsTotals};
