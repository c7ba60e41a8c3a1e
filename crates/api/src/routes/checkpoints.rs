//! Route definitions for HITL checkpoint review.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::checkpoints;
use crate::state::AppState;

/// Checkpoint routes, nested under `/checkpoints`.
///
/// ```text
/// GET    /pending                      list_pending_checkpoints
/// GET    /{checkpoint_id}              get_checkpoint
/// POST   /{checkpoint_id}/approve      approve_checkpoint
/// POST   /{checkpoint_id}/reject       reject_checkpoint
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pending", get(checkpoints::list_pending_checkpoints))
        .route("/{checkpoint_id}", get(checkpoints::get_checkpoint))
        .route(
            "/{checkpoint_id}/approve",
            post(checkpoints::approve_checkpoint),
        )
        .route(
            "/{checkpoint_id}/reject",
            post(checkpoints::reject_checkpoint),
        )
}
