//! Route definitions for crew executions.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::executions;
use crate::state::AppState;

/// Execution routes, nested under `/executions`.
///
/// ```text
/// POST   /start                        start_execution
/// GET    /{execution_id}/status        get_execution_status
/// GET    /{execution_id}/messages      get_execution_messages
/// GET    /{execution_id}/stream        stream_execution_events
/// DELETE /{execution_id}               cancel_execution
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/start", post(executions::start_execution))
        .route(
            "/{execution_id}/status",
            get(executions::get_execution_status),
        )
        .route(
            "/{execution_id}/messages",
            get(executions::get_execution_messages),
        )
        .route(
            "/{execution_id}/stream",
            get(executions::stream_execution_events),
        )
        .route("/{execution_id}", delete(executions::cancel_execution))
}
