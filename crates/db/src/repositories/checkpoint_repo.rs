//! Repository for the `checkpoints` table.
//!
//! The partial unique index `uq_checkpoints_pending_task` (one pending
//! checkpoint per (execution, task)) is the source of truth for HITL
//! idempotency; concurrent duplicate notifications race on the index,
//! not on an in-memory check.

use sqlx::PgPool;

use crewdeck_core::activity::ActivityKind;
use crewdeck_core::types::DbId;

use crate::models::checkpoint::Checkpoint;
use crate::models::status::{CheckpointStatus, ExecutionStatus};

/// Column list for checkpoints queries (unqualified).
const CHECKPOINT_COLUMNS: &str = "id, execution_id, checkpoint_type, task_id, status_id, \
    content, reviewer_feedback, reviewed_by, created_at, reviewed_at, metadata";

/// Column list for checkpoints queries qualified with the `cp.` alias.
const CHECKPOINT_COLUMNS_CP: &str = "cp.id, cp.execution_id, cp.checkpoint_type, cp.task_id, \
    cp.status_id, cp.content, cp.reviewer_feedback, cp.reviewed_by, cp.created_at, \
    cp.reviewed_at, cp.metadata";

/// Provides CRUD operations for HITL checkpoints.
pub struct CheckpointRepo;

impl CheckpointRepo {
    /// Ingest a HITL notification: create the pending checkpoint, append
    /// the reviewable activity, and move the execution to
    /// `awaiting_approval` -- all in one transaction.
    ///
    /// Idempotent: when a pending checkpoint already exists for this
    /// (execution, task) pair -- including one created concurrently by a
    /// duplicate delivery -- the existing row is returned with
    /// `created = false` and nothing else is written.
    pub async fn ingest(
        pool: &PgPool,
        execution_id: DbId,
        checkpoint_type: &str,
        task_id: &str,
        content: &str,
        agent_name: &str,
    ) -> Result<(Checkpoint, bool), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO checkpoints (execution_id, checkpoint_type, task_id, status_id, content, metadata)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (execution_id, task_id) WHERE status_id = 1 DO NOTHING
             RETURNING {CHECKPOINT_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Checkpoint>(&insert)
            .bind(execution_id)
            .bind(checkpoint_type)
            .bind(task_id)
            .bind(CheckpointStatus::Pending.id())
            .bind(content)
            .bind(serde_json::json!({ "agent_name": agent_name }))
            .fetch_optional(&mut *tx)
            .await?;

        let Some(checkpoint) = inserted else {
            // Duplicate notification: hand back the existing pending row.
            let select = format!(
                "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints
                 WHERE execution_id = $1 AND task_id = $2 AND status_id = $3"
            );
            let existing = sqlx::query_as::<_, Checkpoint>(&select)
                .bind(execution_id)
                .bind(task_id)
                .bind(CheckpointStatus::Pending.id())
                .fetch_one(&mut *tx)
                .await?;
            tx.commit().await?;
            return Ok((existing, false));
        };

        sqlx::query(
            "INSERT INTO activities (execution_id, actor_name, kind, message, metadata)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(execution_id)
        .bind(agent_name)
        .bind(ActivityKind::Message.as_str())
        .bind(format!(
            "Checkpoint reached: {}\n\n{}",
            checkpoint.checkpoint_type, content
        ))
        .bind(serde_json::json!({
            "checkpoint_id": checkpoint.id,
            "checkpoint_type": checkpoint.checkpoint_type,
            "task_id": task_id,
            "requires_approval": true,
        }))
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE executions SET status_id = $2, updated_at = NOW() WHERE id = $1")
            .bind(execution_id)
            .bind(ExecutionStatus::AwaitingApproval.id())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((checkpoint, true))
    }

    /// Find a checkpoint by ID, verifying the caller owns it through the
    /// execution, project, and client chain.
    pub async fn find_owned(
        pool: &PgPool,
        checkpoint_id: DbId,
        owner_id: DbId,
    ) -> Result<Option<Checkpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {CHECKPOINT_COLUMNS_CP}
             FROM checkpoints cp
             JOIN executions e ON e.id = cp.execution_id
             JOIN projects p ON p.id = e.project_id
             JOIN clients c ON c.id = p.client_id
             WHERE cp.id = $1 AND c.owner_id = $2"
        );
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(checkpoint_id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the pending checkpoint for an execution, if any.
    pub async fn find_pending_for_execution(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<Option<Checkpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {CHECKPOINT_COLUMNS} FROM checkpoints
             WHERE execution_id = $1 AND status_id = $2
             ORDER BY created_at DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(execution_id)
            .bind(CheckpointStatus::Pending.id())
            .fetch_optional(pool)
            .await
    }

    /// Record a review decision (approved or rejected) and append the
    /// human activity in one transaction.
    ///
    /// The guarded UPDATE matches only pending rows; returns `None` when
    /// the checkpoint was already reviewed (possibly concurrently), in
    /// which case nothing is written.
    pub async fn review(
        pool: &PgPool,
        checkpoint_id: DbId,
        decision: CheckpointStatus,
        feedback: &str,
        reviewer_id: DbId,
        activity_message: &str,
        reviewer_name: &str,
    ) -> Result<Option<Checkpoint>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let update = format!(
            "UPDATE checkpoints
             SET status_id = $2, reviewer_feedback = $3, reviewed_by = $4, reviewed_at = NOW()
             WHERE id = $1 AND status_id = $5
             RETURNING {CHECKPOINT_COLUMNS}"
        );
        let checkpoint = sqlx::query_as::<_, Checkpoint>(&update)
            .bind(checkpoint_id)
            .bind(decision.id())
            .bind(feedback)
            .bind(reviewer_id)
            .bind(CheckpointStatus::Pending.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(checkpoint) = checkpoint else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO activities (execution_id, actor_name, kind, message, metadata)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(checkpoint.execution_id)
        .bind(reviewer_name)
        .bind(ActivityKind::Message.as_str())
        .bind(activity_message)
        .bind(serde_json::json!({
            "checkpoint_id": checkpoint.id,
            "checkpoint_type": checkpoint.checkpoint_type,
            "is_human": true,
            "is_approval": decision == CheckpointStatus::Approved,
            "reviewer_id": reviewer_id,
        }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(checkpoint))
    }

    /// Compensating rollback after a failed resume call: return the
    /// checkpoint to `pending` and clear every reviewer field so it is
    /// reviewable again.
    ///
    /// Runs in its own (implicit) transaction -- the optimistic review
    /// commit has already happened by the time this is called.
    pub async fn revert_review(
        pool: &PgPool,
        checkpoint_id: DbId,
    ) -> Result<Option<Checkpoint>, sqlx::Error> {
        let query = format!(
            "UPDATE checkpoints
             SET status_id = $2, reviewer_feedback = NULL, reviewed_by = NULL, reviewed_at = NULL
             WHERE id = $1 AND status_id IN ($3, $4)
             RETURNING {CHECKPOINT_COLUMNS}"
        );
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(checkpoint_id)
            .bind(CheckpointStatus::Pending.id())
            .bind(CheckpointStatus::Approved.id())
            .bind(CheckpointStatus::Rejected.id())
            .fetch_optional(pool)
            .await
    }

    /// List pending checkpoints across all executions owned by a user,
    /// newest first, with optional type and project filters.
    pub async fn list_pending_owned(
        pool: &PgPool,
        owner_id: DbId,
        checkpoint_type: Option<&str>,
        project_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Checkpoint>, sqlx::Error> {
        let query = format!(
            "SELECT {CHECKPOINT_COLUMNS_CP}
             FROM checkpoints cp
             JOIN executions e ON e.id = cp.execution_id
             JOIN projects p ON p.id = e.project_id
             JOIN clients c ON c.id = p.client_id
             WHERE cp.status_id = $1 AND c.owner_id = $2
               AND ($3::text IS NULL OR cp.checkpoint_type = $3)
               AND ($4::bigint IS NULL OR e.project_id = $4)
             ORDER BY cp.created_at DESC
             LIMIT $5 OFFSET $6"
        );
        sqlx::query_as::<_, Checkpoint>(&query)
            .bind(CheckpointStatus::Pending.id())
            .bind(owner_id)
            .bind(checkpoint_type)
            .bind(project_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count pending checkpoints matching [`list_pending_owned`] filters.
    ///
    /// [`list_pending_owned`]: Self::list_pending_owned
    pub async fn count_pending_owned(
        pool: &PgPool,
        owner_id: DbId,
        checkpoint_type: Option<&str>,
        project_id: Option<DbId>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*)
             FROM checkpoints cp
             JOIN executions e ON e.id = cp.execution_id
             JOIN projects p ON p.id = e.project_id
             JOIN clients c ON c.id = p.client_id
             WHERE cp.status_id = $1 AND c.owner_id = $2
               AND ($3::text IS NULL OR cp.checkpoint_type = $3)
               AND ($4::bigint IS NULL OR e.project_id = $4)",
        )
        .bind(CheckpointStatus::Pending.id())
        .bind(owner_id)
        .bind(checkpoint_type)
        .bind(project_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }
}
