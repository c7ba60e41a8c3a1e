pub mod checkpoints;
pub mod executions;
pub mod health;
pub mod webhooks;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /executions/start                    start execution (POST)
/// /executions/{id}/status              execution status (GET)
/// /executions/{id}/messages            paginated chat history (GET)
/// /executions/{id}/stream              SSE event stream (GET)
/// /executions/{id}                     cancel execution (DELETE)
///
/// /checkpoints/pending                 pending checkpoints (GET)
/// /checkpoints/{id}                    checkpoint detail (GET)
/// /checkpoints/{id}/approve            approve + resume crew (POST)
/// /checkpoints/{id}/reject             reject + resume crew (POST)
///
/// /webhooks/hitl                       HITL notification (POST, webhook token)
/// /webhooks/stream                     event stream batch (POST, webhook token)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/executions", executions::router())
        .nest("/checkpoints", checkpoints::router())
        .nest("/webhooks", webhooks::router())
}
