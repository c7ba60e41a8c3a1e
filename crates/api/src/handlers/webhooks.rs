//! Webhook handlers for inbound crew platform notifications.
//!
//! Both endpoints authenticate with the webhook shared secret, never a
//! user token. Deliveries are at-least-once and unordered: HITL
//! notifications dedupe on the pending (execution, task) pair, stream
//! events dedupe on their event id, and one bad event never fails the
//! rest of a batch.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crewdeck_core::checkpoint::classify_checkpoint_type;
use crewdeck_core::error::CoreError;
use crewdeck_core::types::DbId;
use crewdeck_db::repositories::{ActivityRepo, CheckpointRepo, ExecutionRepo};
use crewdeck_runner::events::{
    normalize_event, sort_by_timestamp, CrewEvent, EventBatch, EventTag, HitlNotification,
};

use crate::error::{AppError, AppResult};
use crate::middleware::webhook::WebhookAuth;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// HITL notifications
// ---------------------------------------------------------------------------

/// Response body for the HITL webhook.
#[derive(Debug, Serialize)]
pub struct HitlAckView {
    pub status: &'static str,
    pub checkpoint_id: DbId,
    pub message: &'static str,
}

/// POST /api/v1/webhooks/hitl
///
/// The crew paused on a task requiring human input and stays paused
/// until our resume call. Creates the pending checkpoint, records the
/// reviewable activity, moves the execution to `awaiting_approval`, and
/// notifies stream subscribers. A duplicate notification for the same
/// (execution, task) returns the existing checkpoint unchanged.
pub async fn receive_hitl_notification(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(payload): Json<HitlNotification>,
) -> AppResult<impl IntoResponse> {
    tracing::info!(
        runner_execution_id = %payload.execution_id,
        task_id = %payload.task_id,
        "HITL notification received",
    );

    // The platform must never reference an execution we did not start.
    let execution = ExecutionRepo::find_by_runner_id(&state.pool, &payload.execution_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Execution",
            id: payload.execution_id.clone(),
        }))?;

    let checkpoint_type = classify_checkpoint_type(&payload.task_id);
    let agent_name = payload.agent_name.as_deref().unwrap_or("Agent");

    let (checkpoint, created) = CheckpointRepo::ingest(
        &state.pool,
        execution.id,
        checkpoint_type.as_str(),
        &payload.task_id,
        &payload.task_output,
        agent_name,
    )
    .await?;

    if !created {
        tracing::warn!(
            checkpoint_id = checkpoint.id,
            execution_id = execution.id,
            "Duplicate HITL notification, returning existing checkpoint",
        );
        return Ok(Json(DataResponse {
            data: HitlAckView {
                status: "received",
                checkpoint_id: checkpoint.id,
                message: "Checkpoint already exists",
            },
        }));
    }

    tracing::info!(
        checkpoint_id = checkpoint.id,
        execution_id = execution.id,
        checkpoint_type = checkpoint_type.as_str(),
        "Checkpoint created, awaiting approval",
    );

    state
        .sse_manager
        .broadcast(
            execution.id,
            "checkpoint",
            serde_json::json!({
                "checkpoint_id": checkpoint.id,
                "checkpoint_type": checkpoint.checkpoint_type,
                "task_id": checkpoint.task_id,
                "requires_approval": true,
            }),
        )
        .await;

    Ok(Json(DataResponse {
        data: HitlAckView {
            status: "received",
            checkpoint_id: checkpoint.id,
            message: "Checkpoint created",
        },
    }))
}

// ---------------------------------------------------------------------------
// Event stream
// ---------------------------------------------------------------------------

/// Aggregate counters returned to the platform after a batch.
#[derive(Debug, Serialize)]
pub struct EventIngestSummary {
    pub events_processed: usize,
    pub events_skipped: usize,
    pub events_error: usize,
    pub total_events: usize,
}

/// POST /api/v1/webhooks/stream
///
/// Batch of execution events for the audit trail and live streams.
/// Events are sorted by their embedded timestamps (delivery order is
/// not guaranteed), deduplicated on event id, and processed
/// individually: a malformed or failing event is counted and skipped
/// while the rest of the batch continues.
pub async fn receive_event_stream(
    _auth: WebhookAuth,
    State(state): State<AppState>,
    Json(payload): Json<EventBatch>,
) -> AppResult<impl IntoResponse> {
    let total_events = payload.events.len();
    tracing::info!(total_events, "Event stream batch received");

    let mut events = payload.events;
    sort_by_timestamp(&mut events);

    let mut processed = 0usize;
    let mut skipped = 0usize;
    let mut errors = 0usize;

    for event in &events {
        match ingest_event(&state, event).await {
            Ok(true) => processed += 1,
            Ok(false) => skipped += 1,
            Err(e) => {
                errors += 1;
                tracing::error!(event_id = %event.id, error = %e, "Failed to process event");
            }
        }
    }

    tracing::info!(processed, skipped, errors, "Event stream batch processed");

    Ok(Json(DataResponse {
        data: EventIngestSummary {
            events_processed: processed,
            events_skipped: skipped,
            events_error: errors,
            total_events,
        },
    }))
}

/// Process one stream event. Returns `Ok(true)` when a new activity was
/// recorded, `Ok(false)` when the event was skipped (unknown execution
/// or duplicate event id).
async fn ingest_event(state: &AppState, event: &CrewEvent) -> AppResult<bool> {
    let Some(execution) =
        ExecutionRepo::find_by_runner_id(&state.pool, &event.execution_id).await?
    else {
        tracing::warn!(
            event_id = %event.id,
            runner_execution_id = %event.execution_id,
            "Event references an unknown execution, skipping",
        );
        return Ok(false);
    };

    let normalized = normalize_event(event);
    let metadata = serde_json::json!({
        "event_id": event.id,
        "event_type": event.event_type,
        "event_data": event.data,
    });

    let Some(activity) = ActivityRepo::append_event(
        &state.pool,
        execution.id,
        &normalized.actor_name,
        normalized.kind.as_str(),
        &normalized.message,
        event.timestamp,
        &event.id,
        &metadata,
    )
    .await?
    else {
        // Already recorded: an at-least-once redelivery.
        return Ok(false);
    };

    state
        .sse_manager
        .broadcast(
            execution.id,
            "message",
            serde_json::json!({
                "message_id": activity.id,
                "sender_type": "agent",
                "sender_name": activity.actor_name,
                "content": activity.message,
                "activity_type": activity.kind,
                "timestamp": activity.occurred_at,
            }),
        )
        .await;

    // Crew lifecycle events also drive the execution status. The guarded
    // updates leave already-terminal executions untouched.
    match EventTag::from_tag(&event.event_type) {
        EventTag::CrewKickoffCompleted => {
            if ExecutionRepo::complete(&state.pool, execution.id)
                .await?
                .is_some()
            {
                state
                    .sse_manager
                    .broadcast(
                        execution.id,
                        "completed",
                        serde_json::json!({ "execution_id": execution.id }),
                    )
                    .await;
            }
        }
        EventTag::CrewKickoffFailed => {
            let error = event
                .data
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown error");
            if ExecutionRepo::mark_failed(&state.pool, execution.id, error)
                .await?
                .is_some()
            {
                state
                    .sse_manager
                    .broadcast(
                        execution.id,
                        "failed",
                        serde_json::json!({
                            "execution_id": execution.id,
                            "error": error,
                        }),
                    )
                    .await;
            }
        }
        _ => {}
    }

    Ok(true)
}
