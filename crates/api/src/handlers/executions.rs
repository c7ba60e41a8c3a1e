//! Handlers for the `/executions` resource.
//!
//! The complete execution lifecycle: start (crew kickoff), status,
//! message history, real-time SSE stream, and cancellation. All
//! endpoints require authentication and verify ownership through the
//! project and client chain; a failed ownership check is always a 404.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, Sse};
use axum::response::IntoResponse;
use axum::Json;
use futures::stream::{self, Stream};
use futures::StreamExt;
use serde::Serialize;

use crewdeck_core::error::CoreError;
use crewdeck_core::search::{clamp_limit, clamp_offset};
use crewdeck_core::types::{DbId, Timestamp};
use crewdeck_core::workflow::WorkflowMode;
use crewdeck_db::models::execution::{Execution, StartExecution};
use crewdeck_db::models::status::ExecutionStatus;
use crewdeck_db::repositories::{
    ActivityRepo, CheckpointRepo, ExecutionRepo, ProjectRepo, UserRepo,
};
use crewdeck_runner::inputs::{build_kickoff_inputs, ProjectInputs};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::sse::{SseManager, StreamEvent, HEARTBEAT_INTERVAL};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fetch an execution by ID and verify the caller owns it through the
/// project and client chain. A miss is always `NotFound`, never
/// `Forbidden`, so existence is not leaked to unauthorized callers.
async fn find_and_authorize(
    pool: &sqlx::PgPool,
    execution_id: DbId,
    auth: &AuthUser,
) -> AppResult<Execution> {
    ExecutionRepo::find_owned(pool, execution_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Execution",
            id: execution_id.to_string(),
        }))
}

/// Resolve the caller's display name for activity records.
async fn caller_name(pool: &sqlx::PgPool, auth: &AuthUser) -> AppResult<String> {
    Ok(UserRepo::find_by_id(pool, auth.user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| format!("user-{}", auth.user_id)))
}

/// Human-readable status name for a raw status id.
fn status_name(status_id: i16) -> &'static str {
    ExecutionStatus::from_id(status_id).map_or("unknown", ExecutionStatus::as_str)
}

/// Serialize a stream event as an SSE frame.
fn sse_frame(event: &StreamEvent) -> Event {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.event_type.clone()).data(payload)
}

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// Response body for `POST /api/v1/executions/start`.
#[derive(Debug, Serialize)]
pub struct StartExecutionView {
    pub execution_id: DbId,
    pub project_id: DbId,
    pub status: &'static str,
    pub runner_execution_id: Option<String>,
    pub message: String,
    pub stream_url: String,
}

/// POST /api/v1/executions/start
///
/// Start a new crew execution: validate inputs, create the execution
/// record, call the platform kickoff (with webhook callbacks attached),
/// and return the SSE stream URL. The crew runs asynchronously; progress
/// arrives via the stream or the status endpoint.
///
/// A kickoff failure leaves the execution in `failed` with the error
/// recorded; it is not retried automatically -- the caller starts a new
/// execution instead.
pub async fn start_execution(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<StartExecution>,
) -> AppResult<impl IntoResponse> {
    let mode = WorkflowMode::parse(input.workflow_mode.as_deref().unwrap_or("creation"))
        .map_err(AppError::Core)?;

    let project = ProjectRepo::find_owned(&state.pool, input.project_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: input.project_id.to_string(),
        }))?;

    // Assemble and validate kickoff inputs before anything is persisted.
    let kickoff_inputs = build_kickoff_inputs(
        &ProjectInputs {
            client_id: project.client_id,
            client_name: project.client_name.clone(),
            topic: project.topic.clone(),
            content_type: project.content_type.clone(),
            audience: project.audience.clone(),
            ai_language_code: project.ai_language_code.clone(),
        },
        mode,
        input.initial_draft.as_deref(),
        input.revision_instructions.as_deref(),
    )
    .map_err(AppError::Core)?;

    let execution =
        ExecutionRepo::create(&state.pool, project.id, mode.as_str(), auth.user_id).await?;

    tracing::info!(
        execution_id = execution.id,
        project_id = project.id,
        mode = mode.as_str(),
        user_id = auth.user_id,
        "Starting crew execution",
    );

    let kickoff = match state.runner.kickoff(&kickoff_inputs).await {
        Ok(kickoff) => kickoff,
        Err(e) => {
            tracing::error!(
                execution_id = execution.id,
                error = %e,
                "Crew kickoff failed",
            );
            let _ = ExecutionRepo::mark_failed(
                &state.pool,
                execution.id,
                &format!("Failed to start crew: {e}"),
            )
            .await?;
            return Err(AppError::Runner(e));
        }
    };

    let execution = ExecutionRepo::activate(&state.pool, execution.id, &kickoff.kickoff_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Internal(format!(
                "Execution {} already has a crew platform id",
                execution.id
            )))
        })?;

    tracing::info!(
        execution_id = execution.id,
        runner_execution_id = %kickoff.kickoff_id,
        "Crew execution running",
    );

    let stream_url = format!(
        "{}/api/v1/executions/{}/stream",
        state.config.public_base_url, execution.id
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: StartExecutionView {
                execution_id: execution.id,
                project_id: execution.project_id,
                status: status_name(execution.status_id),
                runner_execution_id: execution.runner_execution_id,
                message: "Execution started. Connect to the stream for real-time updates.".into(),
                stream_url,
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Pending checkpoint summary embedded in the status response.
#[derive(Debug, Serialize)]
pub struct PendingCheckpointView {
    pub checkpoint_id: DbId,
    pub checkpoint_type: String,
    pub task_id: String,
    pub created_at: Timestamp,
}

/// Response body for `GET /api/v1/executions/{id}/status`.
#[derive(Debug, Serialize)]
pub struct ExecutionStatusView {
    pub execution_id: DbId,
    pub project_id: DbId,
    pub status: &'static str,
    pub workflow_mode: String,
    pub started_at: Timestamp,
    pub completed_at: Option<Timestamp>,
    pub pending_checkpoint: Option<PendingCheckpointView>,
    pub error_message: Option<String>,
    pub metrics: serde_json::Value,
    pub active_connections: usize,
}

/// GET /api/v1/executions/{id}/status
///
/// Current status and progress of an execution, including the pending
/// checkpoint (when awaiting approval) and the live subscriber count.
pub async fn get_execution_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let execution = find_and_authorize(&state.pool, execution_id, &auth).await?;

    let pending_checkpoint =
        if execution.status_id == ExecutionStatus::AwaitingApproval.id() {
            CheckpointRepo::find_pending_for_execution(&state.pool, execution.id)
                .await?
                .map(|cp| PendingCheckpointView {
                    checkpoint_id: cp.id,
                    checkpoint_type: cp.checkpoint_type,
                    task_id: cp.task_id,
                    created_at: cp.created_at,
                })
        } else {
            None
        };

    let active_connections = state.sse_manager.connection_count(execution.id).await;

    Ok(Json(DataResponse {
        data: ExecutionStatusView {
            execution_id: execution.id,
            project_id: execution.project_id,
            status: status_name(execution.status_id),
            workflow_mode: execution.workflow_mode,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
            pending_checkpoint,
            error_message: execution.error_message,
            metrics: execution.metrics,
            active_connections,
        },
    }))
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// One chat message in the execution history.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub message_id: DbId,
    pub timestamp: Timestamp,
    pub sender_type: &'static str,
    pub sender_name: String,
    pub activity_type: String,
    pub content: String,
    pub metadata: serde_json::Value,
}

/// Response body for `GET /api/v1/executions/{id}/messages`.
#[derive(Debug, Serialize)]
pub struct MessagesView {
    pub execution_id: DbId,
    pub messages: Vec<MessageView>,
    pub total: i64,
    pub has_more: bool,
}

/// GET /api/v1/executions/{id}/messages
///
/// Chronological activity history as chat messages, paginated.
pub async fn get_execution_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
    Query(params): Query<PaginationParams>,
) -> AppResult<impl IntoResponse> {
    let execution = find_and_authorize(&state.pool, execution_id, &auth).await?;

    let limit = clamp_limit(params.limit, 100, 100);
    let offset = clamp_offset(params.offset);

    let total = ActivityRepo::count_for_execution(&state.pool, execution.id).await?;
    let activities =
        ActivityRepo::list_for_execution(&state.pool, execution.id, limit, offset).await?;

    let messages: Vec<MessageView> = activities
        .into_iter()
        .map(|activity| {
            let sender_type = if activity.actor_name == "System" {
                "system"
            } else if activity.metadata.get("is_human").and_then(|v| v.as_bool())
                == Some(true)
            {
                "user"
            } else {
                "agent"
            };

            MessageView {
                message_id: activity.id,
                timestamp: activity.occurred_at,
                sender_type,
                sender_name: activity.actor_name,
                activity_type: activity.kind,
                content: activity.message,
                metadata: activity.metadata,
            }
        })
        .collect();

    Ok(Json(DataResponse {
        data: MessagesView {
            execution_id: execution.id,
            has_more: offset + limit < total,
            total,
            messages,
        },
    }))
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// GET /api/v1/executions/{id}/stream
///
/// Server-Sent Events stream of execution updates. Begins with a
/// `connected` event carrying the current status, then forwards queued
/// broadcasts, emitting a `heartbeat` whenever the connection sits idle
/// for the heartbeat interval.
///
/// The subscription handle lives inside the stream state, so the slot is
/// released on every exit path -- normal close, client disconnect, or
/// error -- and never leaks.
pub async fn stream_execution_events(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let execution = find_and_authorize(&state.pool, execution_id, &auth).await?;

    let (subscription, rx) =
        SseManager::subscribe(&state.sse_manager, execution.id, auth.user_id)
            .await
            .map_err(AppError::Core)?;

    let connected = StreamEvent::new(
        "connected",
        serde_json::json!({
            "execution_id": execution.id,
            "status": status_name(execution.status_id),
            "message": "Connected to execution stream",
        }),
    );

    let initial = stream::iter([Ok::<Event, Infallible>(sse_frame(&connected))]);

    let updates = stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        match tokio::time::timeout(HEARTBEAT_INTERVAL, rx.recv()).await {
            Ok(Some(event)) => Some((Ok(sse_frame(&event)), (rx, subscription))),
            // Queue closed: the subscriber was pruned by the manager.
            Ok(None) => None,
            // Idle past the heartbeat interval.
            Err(_) => Some((
                Ok(sse_frame(&StreamEvent::heartbeat())),
                (rx, subscription),
            )),
        }
    });

    Ok(Sse::new(initial.chain(updates)))
}

// ---------------------------------------------------------------------------
// Cancel
// ---------------------------------------------------------------------------

/// Response body for `DELETE /api/v1/executions/{id}`.
#[derive(Debug, Serialize)]
pub struct CancelExecutionView {
    pub execution_id: DbId,
    pub status: &'static str,
    pub message: String,
    pub runner_cancelled: bool,
}

/// DELETE /api/v1/executions/{id}
///
/// Cancel a running execution. The platform cancel call is best-effort:
/// its failure is logged but the execution is marked cancelled locally
/// regardless. Cancelling an already-terminal execution is a 409.
pub async fn cancel_execution(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(execution_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let execution = find_and_authorize(&state.pool, execution_id, &auth).await?;

    let status = ExecutionStatus::from_id(execution.status_id);
    if status.is_some_and(ExecutionStatus::is_terminal) {
        return Err(AppError::Core(CoreError::InvalidState(format!(
            "Cannot cancel execution with status: {}",
            status_name(execution.status_id)
        ))));
    }

    let runner_cancelled = match &execution.runner_execution_id {
        Some(runner_id) => match state.runner.cancel(runner_id).await {
            Ok(cancelled) => cancelled,
            Err(e) => {
                tracing::warn!(
                    execution_id = execution.id,
                    error = %e,
                    "Crew platform cancellation failed (execution will be marked cancelled locally)",
                );
                false
            }
        },
        None => false,
    };

    let cancelled_by = caller_name(&state.pool, &auth).await?;

    let execution = ExecutionRepo::cancel(&state.pool, execution.id, &cancelled_by)
        .await?
        .ok_or(AppError::Core(CoreError::InvalidState(
            "Execution is already in a terminal state".into(),
        )))?;

    state
        .sse_manager
        .broadcast(
            execution.id,
            "cancelled",
            serde_json::json!({
                "execution_id": execution.id,
                "cancelled_by": cancelled_by,
            }),
        )
        .await;

    tracing::info!(
        execution_id = execution.id,
        user_id = auth.user_id,
        runner_cancelled,
        "Execution cancelled",
    );

    Ok(Json(DataResponse {
        data: CancelExecutionView {
            execution_id: execution.id,
            status: status_name(execution.status_id),
            message: "Execution cancelled".into(),
            runner_cancelled,
        },
    }))
}
