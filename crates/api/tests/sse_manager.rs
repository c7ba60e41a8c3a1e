//! Unit tests for `SseManager`.
//!
//! These tests exercise the SSE connection manager directly, without any
//! HTTP transport. They verify subscribe/unsubscribe semantics, the
//! per-user connection cap, broadcast delivery, and dead-subscriber
//! pruning.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use crewdeck_api::sse::{SseManager, StreamEvent, MAX_CONNECTIONS_PER_USER};
use crewdeck_core::error::CoreError;

// ---------------------------------------------------------------------------
// Test: new manager starts with zero connections
// ---------------------------------------------------------------------------

#[tokio::test]
async fn new_manager_has_zero_connections() {
    let manager = Arc::new(SseManager::new());

    assert_eq!(manager.connection_count(1).await, 0);
    assert_eq!(manager.user_connection_count(1).await, 0);
}

// ---------------------------------------------------------------------------
// Test: subscribe() registers the queue and counts it
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribe_increments_counts() {
    let manager = Arc::new(SseManager::new());

    let (_sub, _rx) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("first subscription");

    assert_eq!(manager.connection_count(1).await, 1);
    assert_eq!(manager.user_connection_count(10).await, 1);
}

// ---------------------------------------------------------------------------
// Test: per-user cap is enforced, and a freed slot can be reused
// ---------------------------------------------------------------------------

#[tokio::test]
async fn subscribe_beyond_cap_is_rejected_until_a_slot_frees() {
    let manager = Arc::new(SseManager::new());

    let mut held = Vec::new();
    for _ in 0..MAX_CONNECTIONS_PER_USER {
        held.push(
            SseManager::subscribe(&manager, 1, 10)
                .await
                .expect("under the cap"),
        );
    }

    let rejected = SseManager::subscribe(&manager, 1, 10).await;
    assert_matches!(rejected, Err(CoreError::ResourceExhausted(_)));

    // A different user is unaffected by this user's cap.
    let (_other_sub, _other_rx) = SseManager::subscribe(&manager, 1, 99)
        .await
        .expect("other users have their own limit");

    // Free one slot explicitly; the same user can subscribe again.
    let (sub, _rx) = held.pop().expect("held subscriptions");
    manager.unsubscribe(sub.id()).await;

    let (_new_sub, _new_rx) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("freed slot is reusable");
}

// ---------------------------------------------------------------------------
// Test: unsubscribe() is idempotent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unsubscribe_twice_is_a_noop() {
    let manager = Arc::new(SseManager::new());

    let (sub_a, _rx_a) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("subscribe a");
    let (_sub_b, _rx_b) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("subscribe b");

    manager.unsubscribe(sub_a.id()).await;
    manager.unsubscribe(sub_a.id()).await;

    assert_eq!(manager.connection_count(1).await, 1);
    assert_eq!(manager.user_connection_count(10).await, 1);
}

// ---------------------------------------------------------------------------
// Test: removing the last subscriber frees the execution entry
// ---------------------------------------------------------------------------

#[tokio::test]
async fn last_unsubscribe_frees_the_execution_entry() {
    let manager = Arc::new(SseManager::new());

    let (sub, _rx) = SseManager::subscribe(&manager, 7, 10)
        .await
        .expect("subscribe");
    assert_eq!(manager.connection_count(7).await, 1);

    manager.unsubscribe(sub.id()).await;

    assert_eq!(manager.connection_count(7).await, 0);
    assert_eq!(manager.user_connection_count(10).await, 0);
}

// ---------------------------------------------------------------------------
// Test: broadcast() reaches every subscriber of the execution, only them
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_reaches_all_subscribers_of_the_execution() {
    let manager = Arc::new(SseManager::new());

    let (_sub1, mut rx1) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("subscribe 1");
    let (_sub2, mut rx2) = SseManager::subscribe(&manager, 1, 20)
        .await
        .expect("subscribe 2");
    let (_sub3, mut rx3) = SseManager::subscribe(&manager, 2, 30)
        .await
        .expect("other execution");

    manager
        .broadcast(1, "approval", serde_json::json!({ "approved": true }))
        .await;

    let event1 = rx1.recv().await.expect("rx1 should receive");
    assert_eq!(event1.event_type, "approval");
    assert_eq!(event1.data["approved"], true);

    let event2 = rx2.recv().await.expect("rx2 should receive");
    assert_eq!(event2.event_type, "approval");

    // The execution-2 subscriber must NOT see the event.
    let nothing = tokio::time::timeout(Duration::from_millis(100), rx3.recv()).await;
    assert!(nothing.is_err(), "execution 2 subscriber got a stray event");
}

// ---------------------------------------------------------------------------
// Test: broadcast() with zero subscribers is a no-op
// ---------------------------------------------------------------------------

#[tokio::test]
async fn broadcast_without_subscribers_does_not_error() {
    let manager = Arc::new(SseManager::new());

    manager
        .broadcast(42, "message", serde_json::json!({ "content": "hello" }))
        .await;

    assert_eq!(manager.connection_count(42).await, 0);
}

// ---------------------------------------------------------------------------
// Test: a dead subscriber is pruned without affecting the others
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dead_subscriber_is_pruned_on_broadcast() {
    let manager = Arc::new(SseManager::new());

    let (_sub1, mut rx1) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("subscribe 1");
    let (_sub2, rx2) = SseManager::subscribe(&manager, 1, 20)
        .await
        .expect("subscribe 2");

    // Simulate a vanished client: its receive half is gone.
    drop(rx2);

    manager
        .broadcast(1, "message", serde_json::json!({ "content": "still here" }))
        .await;

    // The live subscriber still gets the event.
    let event = rx1.recv().await.expect("live subscriber receives");
    assert_eq!(event.data["content"], "still here");

    // The dead one was removed and its user slot released.
    assert_eq!(manager.connection_count(1).await, 1);
    assert_eq!(manager.user_connection_count(20).await, 0);
}

// ---------------------------------------------------------------------------
// Test: dropping the subscription handle releases the slot
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropping_the_handle_releases_the_slot() {
    let manager = Arc::new(SseManager::new());

    let (sub, _rx) = SseManager::subscribe(&manager, 1, 10)
        .await
        .expect("subscribe");
    assert_eq!(manager.user_connection_count(10).await, 1);

    // Cleanup runs on a spawned task; poll until it lands.
    drop(sub);
    for _ in 0..20 {
        if manager.user_connection_count(10).await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert_eq!(manager.user_connection_count(10).await, 0);
    assert_eq!(manager.connection_count(1).await, 0);
}

// ---------------------------------------------------------------------------
// Test: heartbeat events carry the expected shape
// ---------------------------------------------------------------------------

#[tokio::test]
async fn heartbeat_event_has_expected_shape() {
    let event = StreamEvent::heartbeat();

    assert_eq!(event.event_type, "heartbeat");
    assert!(event.data.is_object());

    let serialized = serde_json::to_value(&event).expect("serializable");
    assert!(serialized["timestamp"].is_string());
}
