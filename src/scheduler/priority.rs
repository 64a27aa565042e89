//! Request prioritization.
//!
//! Priority is an open-ended integer rather than a fixed level set: the retry
//! coordinator bumps a request's priority on every re-enqueue, so retried work
//! is popped ahead of same-base-priority fresh arrivals.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Default base priority for caller submissions.
pub const DEFAULT_PRIORITY: u32 = 0;

/// Item with associated priority for queue ordering.
#[derive(Debug)]
struct PrioritizedItem<T> {
    priority: u32,
    sequence: u64,
    item: T,
}

impl<T> PartialEq for PrioritizedItem<T> {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl<T> Eq for PrioritizedItem<T> {}

impl<T> PartialOrd for PrioritizedItem<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for PrioritizedItem<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.priority.cmp(&other.priority) {
            Ordering::Equal => other.sequence.cmp(&self.sequence), // Lower sequence = earlier
            ord => ord,
        }
    }
}

/// Priority queue: highest priority first, FIFO within equal priority.
pub struct PriorityQueue<T> {
    heap: BinaryHeap<PrioritizedItem<T>>,
    next_sequence: u64,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    pub fn push(&mut self, item: T, priority: u32) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(PrioritizedItem { priority, sequence, item });
    }

    pub fn pop(&mut self) -> Option<T> {
        self.heap.pop().map(|p| p.item)
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.peek().map(|p| &p.item)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove and return every queued item, unordered.
    pub fn drain(&mut self) -> Vec<T> {
        self.heap.drain().map(|p| p.item).collect()
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_pops_first() {
        let mut q = PriorityQueue::new();
        q.push("low", 0);
        q.push("high", 5);
        q.push("mid", 2);
        assert_eq!(q.pop(), Some("high"));
        assert_eq!(q.pop(), Some("mid"));
        assert_eq!(q.pop(), Some("low"));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut q = PriorityQueue::new();
        q.push("a", 1);
        q.push("b", 1);
        q.push("c", 1);
        assert_eq!(q.pop(), Some("a"));
        assert_eq!(q.pop(), Some("b"));
        assert_eq!(q.pop(), Some("c"));
    }

    #[test]
    fn bumped_priority_overtakes_fresh_arrivals() {
        let mut q = PriorityQueue::new();
        q.push("fresh-1", 0);
        q.push("retried", 1);
        q.push("fresh-2", 0);
        assert_eq!(q.pop(), Some("retried"));
        assert_eq!(q.pop(), Some("fresh-1"));
        assert_eq!(q.pop(), Some("fresh-2"));
    }

    #[test]
    fn drain_empties_the_queue() {
        let mut q = PriorityQueue::new();
        q.push(1, 0);
        q.push(2, 3);
        let drained = q.drain();
        assert_eq!(drained.len(), 2);
        assert!(q.is_empty());
    }
}
