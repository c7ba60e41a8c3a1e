//! Server-Sent Events infrastructure.
//!
//! [`SseManager`] holds the per-execution subscriber registry and is
//! the only component that touches subscriber queues directly; handlers
//! and the orchestration layer interact with it through opaque
//! subscription handles and `broadcast`.

pub mod manager;

pub use manager::{SseManager, SseSubscription, StreamEvent};
pub use manager::{HEARTBEAT_INTERVAL, MAX_CONNECTIONS_PER_USER};
