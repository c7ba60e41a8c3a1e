//! SSE connection manager.
//!
//! Tracks, per execution, the set of live subscriber queues; enforces a
//! per-user cap on concurrent subscriptions; fans events out to every
//! subscriber of an execution; and prunes subscribers whose queues are
//! gone or hopelessly backed up. Events are held only in these
//! per-connection queues -- a viewer that was not connected when an
//! event fired reads it later from the activity history instead.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, RwLock};

use crewdeck_core::error::CoreError;
use crewdeck_core::types::{DbId, Timestamp};

/// Maximum concurrent stream subscriptions per user.
pub const MAX_CONNECTIONS_PER_USER: usize = 3;

/// How long a subscriber may sit idle before a heartbeat is pushed, so
/// intermediaries do not drop the connection as dead.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Buffered events per subscriber queue. A subscriber that falls this
/// far behind is treated as dead and pruned on the next broadcast.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// A tagged event pushed to stream subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    pub event_type: String,
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

impl StreamEvent {
    /// Build an event with the current timestamp.
    pub fn new(event_type: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            timestamp: chrono::Utc::now(),
        }
    }

    /// Keepalive event pushed to idle connections.
    pub fn heartbeat() -> Self {
        Self::new("heartbeat", serde_json::json!({}))
    }
}

/// One registered subscriber queue.
#[derive(Debug)]
struct Subscriber {
    execution_id: DbId,
    user_id: DbId,
    sender: mpsc::Sender<StreamEvent>,
}

#[derive(Debug, Default)]
struct Registry {
    /// execution id -> subscription ids watching it.
    executions: HashMap<DbId, HashSet<u64>>,
    /// user id -> number of active subscriptions.
    user_counts: HashMap<DbId, usize>,
    /// subscription id -> queue entry.
    subscribers: HashMap<u64, Subscriber>,
}

impl Registry {
    /// Remove one subscription, cleaning up the execution set and user
    /// count. No-op if the id is already gone.
    fn remove(&mut self, subscription_id: u64) -> bool {
        let Some(sub) = self.subscribers.remove(&subscription_id) else {
            return false;
        };

        if let Some(ids) = self.executions.get_mut(&sub.execution_id) {
            ids.remove(&subscription_id);
            if ids.is_empty() {
                self.executions.remove(&sub.execution_id);
            }
        }

        if let Some(count) = self.user_counts.get_mut(&sub.user_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.user_counts.remove(&sub.user_id);
            }
        }

        true
    }
}

/// Manages all active stream subscriptions.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc`
/// and shared across the application.
#[derive(Debug)]
pub struct SseManager {
    next_id: AtomicU64,
    registry: RwLock<Registry>,
}

impl SseManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            registry: RwLock::new(Registry::default()),
        }
    }

    /// Register a new subscriber for an execution.
    ///
    /// Returns the receiver half of the subscriber queue plus an opaque
    /// [`SseSubscription`] handle that deregisters the queue when
    /// dropped. Fails with `ResourceExhausted` when the user already has
    /// [`MAX_CONNECTIONS_PER_USER`] active subscriptions.
    pub async fn subscribe(
        manager: &Arc<Self>,
        execution_id: DbId,
        user_id: DbId,
    ) -> Result<(SseSubscription, mpsc::Receiver<StreamEvent>), CoreError> {
        let mut registry = manager.registry.write().await;

        let active = registry.user_counts.get(&user_id).copied().unwrap_or(0);
        if active >= MAX_CONNECTIONS_PER_USER {
            tracing::warn!(
                user_id,
                active,
                "Stream connection limit reached",
            );
            return Err(CoreError::ResourceExhausted(format!(
                "Connection limit reached ({MAX_CONNECTIONS_PER_USER} max)"
            )));
        }

        let subscription_id = manager.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE_CAPACITY);

        registry
            .executions
            .entry(execution_id)
            .or_default()
            .insert(subscription_id);
        *registry.user_counts.entry(user_id).or_default() += 1;
        registry.subscribers.insert(
            subscription_id,
            Subscriber {
                execution_id,
                user_id,
                sender: tx,
            },
        );

        tracing::info!(
            execution_id,
            user_id,
            subscription_id,
            "Stream subscriber connected",
        );

        Ok((
            SseSubscription {
                id: subscription_id,
                manager: Arc::clone(manager),
            },
            rx,
        ))
    }

    /// Deregister a subscriber. Safe to call multiple times; removing
    /// the last subscriber of an execution frees that execution's entry.
    pub async fn unsubscribe(&self, subscription_id: u64) {
        let removed = self.registry.write().await.remove(subscription_id);
        if removed {
            tracing::info!(subscription_id, "Stream subscriber disconnected");
        }
    }

    /// Deliver an event to every live subscriber of an execution.
    ///
    /// A broadcast with zero subscribers is a no-op. A subscriber whose
    /// queue is closed or full is treated as disconnected: it is pruned
    /// without affecting delivery to the others.
    pub async fn broadcast(
        &self,
        execution_id: DbId,
        event_type: &str,
        data: serde_json::Value,
    ) {
        let event = StreamEvent::new(event_type, data);

        let dead: Vec<u64> = {
            let registry = self.registry.read().await;
            let Some(ids) = registry.executions.get(&execution_id) else {
                return;
            };

            ids.iter()
                .copied()
                .filter(|id| {
                    registry
                        .subscribers
                        .get(id)
                        .is_some_and(|sub| sub.sender.try_send(event.clone()).is_err())
                })
                .collect()
        };

        for subscription_id in dead {
            tracing::debug!(
                execution_id,
                subscription_id,
                "Pruning dead stream subscriber",
            );
            self.unsubscribe(subscription_id).await;
        }

        tracing::debug!(
            execution_id,
            event_type,
            "Broadcast delivered to execution subscribers",
        );
    }

    /// Number of active subscribers for an execution.
    pub async fn connection_count(&self, execution_id: DbId) -> usize {
        self.registry
            .read()
            .await
            .executions
            .get(&execution_id)
            .map_or(0, HashSet::len)
    }

    /// Number of active subscriptions held by a user.
    pub async fn user_connection_count(&self, user_id: DbId) -> usize {
        self.registry
            .read()
            .await
            .user_counts
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for SseManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Opaque handle for one stream subscription.
///
/// Deregisters the subscription when dropped, so every exit path of a
/// streaming handler -- normal completion, client disconnect, error --
/// releases the slot without explicit cleanup code.
#[derive(Debug)]
pub struct SseSubscription {
    id: u64,
    manager: Arc<SseManager>,
}

impl SseSubscription {
    /// The subscription's opaque id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for SseSubscription {
    fn drop(&mut self) {
        let manager = Arc::clone(&self.manager);
        let id = self.id;
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                manager.unsubscribe(id).await;
            });
        }
    }
}
