//! Handlers for the `/checkpoints` resource.
//!
//! Human review of HITL checkpoints: listing, detail, approve, and
//! reject. Approve and reject share one flow that commits the review
//! optimistically, calls the platform resume (re-attaching webhook
//! callbacks), and rolls the checkpoint back to pending if the resume
//! call fails -- a checkpoint must never be stuck reviewed-but-not-resumed.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crewdeck_core::checkpoint::CheckpointType;
use crewdeck_core::error::CoreError;
use crewdeck_core::search::{clamp_limit, clamp_offset};
use crewdeck_core::types::DbId;
use crewdeck_db::models::checkpoint::{Checkpoint, PendingCheckpointQuery, ReviewRequest};
use crewdeck_db::models::status::{CheckpointStatus, ExecutionStatus};
use crewdeck_db::repositories::{CheckpointRepo, ExecutionRepo, UserRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// List / detail
// ---------------------------------------------------------------------------

/// Response body for `GET /api/v1/checkpoints/pending`.
#[derive(Debug, Serialize)]
pub struct PendingCheckpointsView {
    pub checkpoints: Vec<Checkpoint>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/v1/checkpoints/pending
///
/// Pending checkpoints across all executions owned by the caller,
/// newest first. Supports `checkpoint_type` and `project_id` filters.
pub async fn list_pending_checkpoints(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PendingCheckpointQuery>,
) -> AppResult<impl IntoResponse> {
    // Reject unknown filter values instead of silently matching nothing.
    let checkpoint_type = params
        .checkpoint_type
        .as_deref()
        .map(CheckpointType::parse)
        .transpose()
        .map_err(AppError::Core)?
        .map(CheckpointType::as_str);

    let limit = clamp_limit(params.limit, 20, 100);
    let offset = clamp_offset(params.offset);

    let total = CheckpointRepo::count_pending_owned(
        &state.pool,
        auth.user_id,
        checkpoint_type,
        params.project_id,
    )
    .await?;

    let checkpoints = CheckpointRepo::list_pending_owned(
        &state.pool,
        auth.user_id,
        checkpoint_type,
        params.project_id,
        limit,
        offset,
    )
    .await?;

    Ok(Json(DataResponse {
        data: PendingCheckpointsView {
            checkpoints,
            total,
            limit,
            offset,
        },
    }))
}

/// GET /api/v1/checkpoints/{id}
///
/// Full checkpoint detail, including the content awaiting review.
pub async fn get_checkpoint(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(checkpoint_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let checkpoint = CheckpointRepo::find_owned(&state.pool, checkpoint_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Checkpoint",
            id: checkpoint_id.to_string(),
        }))?;

    Ok(Json(DataResponse { data: checkpoint }))
}

// ---------------------------------------------------------------------------
// Approve / reject
// ---------------------------------------------------------------------------

/// Response body for the approve/reject endpoints.
#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub checkpoint_id: DbId,
    pub execution_id: DbId,
    pub message: String,
    pub crew_resumed: bool,
    /// True after a rejection: the crew will retry the task with the
    /// feedback as added context and raise a fresh checkpoint.
    pub will_retry: bool,
}

/// POST /api/v1/checkpoints/{id}/approve
///
/// Approve a pending checkpoint and resume the crew.
pub async fn approve_checkpoint(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(checkpoint_id): Path<DbId>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    review_checkpoint(auth, state, checkpoint_id, input, true).await
}

/// POST /api/v1/checkpoints/{id}/reject
///
/// Reject a pending checkpoint; the crew retries the task with the
/// feedback as added context and raises a fresh checkpoint afterwards.
pub async fn reject_checkpoint(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(checkpoint_id): Path<DbId>,
    Json(input): Json<ReviewRequest>,
) -> AppResult<impl IntoResponse> {
    review_checkpoint(auth, state, checkpoint_id, input, false).await
}

/// Shared approve/reject flow.
///
/// Sequence: guard the pending state, commit the review decision plus
/// the human activity in one transaction, call the platform resume, and
/// on resume failure revert the checkpoint to pending (reviewer fields
/// cleared) in a second transaction before surfacing the error.
async fn review_checkpoint(
    auth: AuthUser,
    state: AppState,
    checkpoint_id: DbId,
    input: ReviewRequest,
    approve: bool,
) -> AppResult<Json<DataResponse<ReviewView>>> {
    let feedback = input.feedback.trim();
    if feedback.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "feedback must not be empty".into(),
        )));
    }

    let checkpoint = CheckpointRepo::find_owned(&state.pool, checkpoint_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Checkpoint",
            id: checkpoint_id.to_string(),
        }))?;

    if checkpoint.status_id != CheckpointStatus::Pending.id() {
        return Err(AppError::Core(CoreError::InvalidState(format!(
            "Checkpoint is not pending. Current status: {}",
            CheckpointStatus::from_id(checkpoint.status_id)
                .map_or("unknown", CheckpointStatus::as_str)
        ))));
    }

    let execution = ExecutionRepo::find_owned(&state.pool, checkpoint.execution_id, auth.user_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Execution",
            id: checkpoint.execution_id.to_string(),
        }))?;

    let runner_execution_id = execution.runner_execution_id.clone().ok_or_else(|| {
        AppError::Core(CoreError::Internal(format!(
            "Execution {} has no crew platform id",
            execution.id
        )))
    })?;

    let reviewer_name = UserRepo::find_by_id(&state.pool, auth.user_id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| format!("user-{}", auth.user_id));

    let (decision, activity_message) = if approve {
        (CheckpointStatus::Approved, format!("Approved: {feedback}"))
    } else {
        (
            CheckpointStatus::Rejected,
            format!("Revision requested: {feedback}"),
        )
    };

    // Optimistic local commit; the guarded update loses quietly if a
    // concurrent review got there first.
    let checkpoint = CheckpointRepo::review(
        &state.pool,
        checkpoint.id,
        decision,
        feedback,
        auth.user_id,
        &activity_message,
        &reviewer_name,
    )
    .await?
    .ok_or(AppError::Core(CoreError::InvalidState(
        "Checkpoint was already reviewed".into(),
    )))?;

    tracing::info!(
        checkpoint_id = checkpoint.id,
        execution_id = execution.id,
        approve,
        user_id = auth.user_id,
        "Checkpoint reviewed, resuming crew",
    );

    if let Err(e) = state
        .runner
        .resume(&runner_execution_id, &checkpoint.task_id, feedback, approve)
        .await
    {
        // Compensating rollback: the review decision never reached the
        // crew, so the checkpoint must become reviewable again.
        match CheckpointRepo::revert_review(&state.pool, checkpoint.id).await {
            Ok(Some(_)) => {
                tracing::warn!(
                    checkpoint_id = checkpoint.id,
                    "Resume failed; checkpoint reverted to pending",
                );
            }
            Ok(None) => {
                tracing::error!(
                    checkpoint_id = checkpoint.id,
                    "Resume failed and checkpoint was not revertible",
                );
            }
            Err(revert_err) => {
                tracing::error!(
                    checkpoint_id = checkpoint.id,
                    error = %revert_err,
                    "Resume failed and rollback also failed",
                );
            }
        }
        return Err(AppError::Runner(e));
    }

    ExecutionRepo::set_status(&state.pool, execution.id, ExecutionStatus::Running).await?;

    state
        .sse_manager
        .broadcast(
            execution.id,
            "approval",
            serde_json::json!({
                "checkpoint_id": checkpoint.id,
                "approved": approve,
                "will_retry": !approve,
                "feedback": feedback,
                "reviewer": reviewer_name,
            }),
        )
        .await;

    let message = if approve {
        "Checkpoint approved. Crew execution resumed."
    } else {
        "Checkpoint rejected. The crew will revise based on the feedback."
    };

    Ok(Json(DataResponse {
        data: ReviewView {
            checkpoint_id: checkpoint.id,
            execution_id: execution.id,
            message: message.into(),
            crew_resumed: true,
            will_retry: !approve,
        },
    }))
}
