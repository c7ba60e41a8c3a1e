//! Route definitions for inbound crew platform webhooks.
//!
//! These endpoints are called by the platform, not by the frontend, and
//! authenticate with the webhook shared secret.

use axum::routing::post;
use axum::Router;

use crate::handlers::webhooks;
use crate::state::AppState;

/// Webhook routes, nested under `/webhooks`.
///
/// ```text
/// POST   /hitl                         receive_hitl_notification
/// POST   /stream                       receive_event_stream
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/hitl", post(webhooks::receive_hitl_notification))
        .route("/stream", post(webhooks::receive_event_stream))
}
