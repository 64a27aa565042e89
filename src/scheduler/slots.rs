//! Worker-slot accounting for a category's dispatch pool.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct SlotsInner {
    max: usize,
    active: AtomicUsize,
    released: Notify,
}

/// Bounded counter of concurrently executing handler calls.
///
/// Acquisition follows the reserve-then-check discipline: the counter is
/// incremented optimistically and rolled back on overshoot, so `active`
/// never exceeds `max` even under concurrent acquirers.
#[derive(Clone)]
pub struct WorkerSlots {
    inner: Arc<SlotsInner>,
}

impl WorkerSlots {
    pub fn new(max: usize) -> Self {
        Self {
            inner: Arc::new(SlotsInner {
                max: max.max(1),
                active: AtomicUsize::new(0),
                released: Notify::new(),
            }),
        }
    }

    /// Try to occupy a slot without waiting.
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        let prev = self.inner.active.fetch_add(1, Ordering::SeqCst);
        if prev >= self.inner.max {
            self.inner.active.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(SlotGuard {
            inner: Arc::clone(&self.inner),
        })
    }

    /// Wait until a slot is free and occupy it.
    pub async fn acquire(&self) -> SlotGuard {
        loop {
            if let Some(guard) = self.try_acquire() {
                return guard;
            }
            self.inner.released.notified().await;
        }
    }

    /// Number of currently occupied slots.
    pub fn active(&self) -> usize {
        self.inner.active.load(Ordering::SeqCst)
    }

    /// Configured pool size.
    pub fn max(&self) -> usize {
        self.inner.max
    }
}

/// RAII guard for one worker slot. Releases on drop and wakes a waiter.
pub struct SlotGuard {
    inner: Arc<SlotsInner>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.inner.active.fetch_sub(1, Ordering::SeqCst);
        self.inner.released.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn try_acquire_caps_at_max() {
        let slots = WorkerSlots::new(2);
        let g1 = slots.try_acquire().unwrap();
        let g2 = slots.try_acquire().unwrap();
        assert!(slots.try_acquire().is_none());
        assert_eq!(slots.active(), 2);

        drop(g1);
        assert_eq!(slots.active(), 1);
        let _g3 = slots.try_acquire().unwrap();
        assert!(slots.try_acquire().is_none());
        drop(g2);
    }

    #[tokio::test]
    async fn acquire_waits_for_release() {
        let slots = WorkerSlots::new(1);
        let guard = slots.try_acquire().unwrap();

        let waiter = {
            let slots = slots.clone();
            tokio::spawn(async move {
                let _g = slots.acquire().await;
            })
        };

        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
            .await
            .expect("waiter must acquire after release")
            .unwrap();
    }

    #[test]
    fn zero_pool_size_is_clamped_to_one() {
        let slots = WorkerSlots::new(0);
        assert_eq!(slots.max(), 1);
        assert!(slots.try_acquire().is_some());
    }
}
