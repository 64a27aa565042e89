//! Tests for the bounded category queue.

use serde_json::json;

use super::*;
use crate::scheduler::queued_request::QueuedRequest;

fn request(user: &str, priority: u32) -> QueuedRequest {
    let (req, _rx) = QueuedRequest::new(
        user.to_string(),
        Category::CoachChat,
        json!({"message": "hi"}),
        priority,
    );
    req
}

#[tokio::test]
async fn enqueue_rejects_beyond_depth() {
    let q = CategoryQueue::new(Category::CoachChat, 2);
    q.enqueue(request("a", 0)).await.unwrap();
    q.enqueue(request("b", 0)).await.unwrap();

    let err = q.enqueue(request("c", 0)).await;
    let (_, rejection) = err.err().expect("third enqueue must be rejected");
    assert_eq!(rejection.depth, 2);
    assert_eq!(rejection.max, 2);
    assert_eq!(q.len(), 2);
}

#[tokio::test]
async fn requeue_is_exempt_from_depth() {
    let q = CategoryQueue::new(Category::CoachChat, 1);
    q.enqueue(request("a", 0)).await.unwrap();
    q.requeue(request("retried", 1)).await;
    assert_eq!(q.len(), 2);

    // Retried item comes out first.
    let first = q.dequeue().await.unwrap();
    assert_eq!(first.user_id, "retried");
}

#[tokio::test]
async fn dequeue_respects_priority_then_fifo() {
    let q = CategoryQueue::new(Category::CoachChat, 10);
    q.enqueue(request("first", 0)).await.unwrap();
    q.enqueue(request("second", 0)).await.unwrap();
    q.enqueue(request("urgent", 3)).await.unwrap();

    assert_eq!(q.dequeue().await.unwrap().user_id, "urgent");
    assert_eq!(q.dequeue().await.unwrap().user_id, "first");
    assert_eq!(q.dequeue().await.unwrap().user_id, "second");
    assert!(q.dequeue().await.is_none());
}

#[tokio::test]
async fn set_max_depth_applies_to_subsequent_enqueues() {
    let q = CategoryQueue::new(Category::CoachChat, 1);
    q.enqueue(request("a", 0)).await.unwrap();
    assert!(q.enqueue(request("b", 0)).await.is_err());

    q.set_max_depth(3);
    q.enqueue(request("b", 0)).await.unwrap();
    q.enqueue(request("c", 0)).await.unwrap();
    assert!(q.enqueue(request("d", 0)).await.is_err());
}

#[tokio::test]
async fn drain_empties_and_resets_gauge() {
    let q = CategoryQueue::new(Category::CoachChat, 10);
    q.enqueue(request("a", 0)).await.unwrap();
    q.enqueue(request("b", 2)).await.unwrap();

    let drained = q.drain().await;
    assert_eq!(drained.len(), 2);
    assert_eq!(q.len(), 0);
    assert!(q.dequeue().await.is_none());
}

#[tokio::test]
async fn len_tracks_every_mutation_path() {
    let q = CategoryQueue::new(Category::CoachChat, 10);
    q.enqueue(request("a", 0)).await.unwrap();
    assert_eq!(q.len(), 1);
    q.requeue(request("b", 1)).await;
    assert_eq!(q.len(), 2);
    q.dequeue().await.unwrap();
    assert_eq!(q.len(), 1);
    q.drain().await;
    assert_eq!(q.len(), 0);
    // Popping empty leaves the length at zero.
    assert!(q.dequeue().await.is_none());
    assert_eq!(q.len(), 0);
}

#[tokio::test]
async fn wait_and_dequeue_wakes_on_enqueue() {
    use std::sync::Arc;

    let q = Arc::new(CategoryQueue::new(Category::CoachChat, 10));
    let waiter = {
        let q = Arc::clone(&q);
        tokio::spawn(async move { q.wait_and_dequeue().await })
    };

    // Give the waiter a chance to park.
    tokio::task::yield_now().await;
    q.enqueue(request("late", 0)).await.unwrap();

    let got = tokio::time::timeout(std::time::Duration::from_secs(2), waiter)
        .await
        .expect("waiter must wake")
        .unwrap();
    assert_eq!(got.user_id, "late");
}
