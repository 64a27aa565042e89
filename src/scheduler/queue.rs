//! Bounded per-category request queue.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Mutex, Notify};

use super::priority::PriorityQueue;
use super::queued_request::QueuedRequest;
use crate::category::Category;
use crate::telemetry;

/// Enqueue rejection: the queue is at its configured depth.
#[derive(Debug)]
pub struct DepthExceeded {
    pub depth: usize,
    pub max: usize,
}

/// Priority-ordered, bounded queue for one category.
///
/// The depth limit is read at enqueue time so `set_max_depth` takes effect
/// for subsequent submissions only. `depth_gauge` mirrors the heap length so
/// stats reads never contend with dispatch for the queue lock.
pub struct CategoryQueue {
    category: Category,
    queue: Mutex<PriorityQueue<QueuedRequest>>,
    max_depth: AtomicUsize,
    depth_gauge: AtomicUsize,
    /// Notifies the supervisor when new items are enqueued.
    notify: Notify,
}

impl CategoryQueue {
    pub fn new(category: Category, max_depth: usize) -> Self {
        Self {
            category,
            queue: Mutex::new(PriorityQueue::new()),
            max_depth: AtomicUsize::new(max_depth.max(1)),
            depth_gauge: AtomicUsize::new(0),
            notify: Notify::new(),
        }
    }

    /// Enqueue a fresh submission, enforcing the depth limit.
    pub async fn enqueue(&self, request: QueuedRequest) -> Result<(), (QueuedRequest, DepthExceeded)> {
        let max = self.max_depth.load(Ordering::Acquire);
        let mut queue = self.queue.lock().await;
        let depth = queue.len();
        if depth >= max {
            return Err((request, DepthExceeded { depth, max }));
        }
        let priority = request.priority;
        queue.push(request, priority);
        let depth = queue.len();
        self.depth_gauge.store(depth, Ordering::Release);
        drop(queue);

        telemetry::record_queue_depth(self.category, depth);
        self.notify.notify_one();
        Ok(())
    }

    /// Re-enqueue a retried request. Exempt from the depth limit: the request
    /// already consumed backpressure budget at admission and must not be
    /// dropped mid-chain.
    pub async fn requeue(&self, request: QueuedRequest) {
        let mut queue = self.queue.lock().await;
        let priority = request.priority;
        queue.push(request, priority);
        let depth = queue.len();
        self.depth_gauge.store(depth, Ordering::Release);
        drop(queue);

        telemetry::record_queue_depth(self.category, depth);
        self.notify.notify_one();
    }

    /// Pop the highest-priority request, if any.
    pub async fn dequeue(&self) -> Option<QueuedRequest> {
        let mut queue = self.queue.lock().await;
        let request = queue.pop();
        let depth = queue.len();
        self.depth_gauge.store(depth, Ordering::Release);
        drop(queue);

        telemetry::record_queue_depth(self.category, depth);
        request
    }

    /// Wait for a notification then dequeue. Loops until an item is present.
    pub async fn wait_and_dequeue(&self) -> QueuedRequest {
        loop {
            if let Some(req) = self.dequeue().await {
                return req;
            }
            self.notify.notified().await;
        }
    }

    /// Wait until at least one request is queued, without popping it. The
    /// supervisor uses this so it only occupies a worker slot once there is
    /// work, and still pops the highest-priority item at dispatch time.
    pub async fn wait_until_nonempty(&self) {
        loop {
            if !self.is_empty() {
                return;
            }
            self.notify.notified().await;
        }
    }

    /// Remove every pending request, unordered.
    pub async fn drain(&self) -> Vec<QueuedRequest> {
        let mut queue = self.queue.lock().await;
        let drained = queue.drain();
        self.depth_gauge.store(0, Ordering::Release);
        drop(queue);

        telemetry::record_queue_depth(self.category, 0);
        drained
    }

    /// Wake the supervisor (used during shutdown and clears).
    pub fn wake(&self) {
        self.notify.notify_one();
    }

    /// Current queue length, lock-free (stats path).
    pub fn len(&self) -> usize {
        self.depth_gauge.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth limit applied to subsequent enqueues.
    pub fn set_max_depth(&self, max: usize) {
        self.max_depth.store(max.max(1), Ordering::Release);
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.load(Ordering::Acquire)
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
