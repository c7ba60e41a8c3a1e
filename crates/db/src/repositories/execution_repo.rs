//! Repository for the `executions` table.

use sqlx::PgPool;

use crewdeck_core::activity::ActivityKind;
use crewdeck_core::types::DbId;

use crate::models::execution::Execution;
use crate::models::status::ExecutionStatus;

/// Column list for executions queries (unqualified).
const EXECUTION_COLUMNS: &str = "id, project_id, workflow_mode, status_id, \
    runner_execution_id, started_at, completed_at, error_message, retry_count, \
    created_by, metrics, created_at, updated_at";

/// Column list for executions queries qualified with the `e.` alias,
/// for use in JOIN queries.
const EXECUTION_COLUMNS_E: &str = "e.id, e.project_id, e.workflow_mode, e.status_id, \
    e.runner_execution_id, e.started_at, e.completed_at, e.error_message, e.retry_count, \
    e.created_by, e.metrics, e.created_at, e.updated_at";

/// Provides CRUD operations for crew executions.
pub struct ExecutionRepo;

impl ExecutionRepo {
    /// Create a new execution in `pending` status.
    pub async fn create(
        pool: &PgPool,
        project_id: DbId,
        workflow_mode: &str,
        created_by: DbId,
    ) -> Result<Execution, sqlx::Error> {
        let query = format!(
            "INSERT INTO executions (project_id, workflow_mode, status_id, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {EXECUTION_COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(project_id)
            .bind(workflow_mode)
            .bind(ExecutionStatus::Pending.id())
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Find an execution by ID, verifying the caller owns it through the
    /// project and client chain.
    pub async fn find_owned(
        pool: &PgPool,
        execution_id: DbId,
        owner_id: DbId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "SELECT {EXECUTION_COLUMNS_E}
             FROM executions e
             JOIN projects p ON p.id = e.project_id
             JOIN clients c ON c.id = p.client_id
             WHERE e.id = $1 AND c.owner_id = $2"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Find an execution by the crew platform's kickoff id.
    pub async fn find_by_runner_id(
        pool: &PgPool,
        runner_execution_id: &str,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query =
            format!("SELECT {EXECUTION_COLUMNS} FROM executions WHERE runner_execution_id = $1");
        sqlx::query_as::<_, Execution>(&query)
            .bind(runner_execution_id)
            .fetch_optional(pool)
            .await
    }

    /// Record the platform-assigned kickoff id and move the execution to
    /// `running`, appending the initial system activity in the same
    /// transaction.
    ///
    /// The kickoff id is set at most once: the guarded UPDATE matches only
    /// rows where it is still NULL. Returns `None` if the id was already
    /// set (the execution is left untouched).
    pub async fn activate(
        pool: &PgPool,
        execution_id: DbId,
        runner_execution_id: &str,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE executions
             SET runner_execution_id = $2, status_id = $3, updated_at = NOW()
             WHERE id = $1 AND runner_execution_id IS NULL
             RETURNING {EXECUTION_COLUMNS}"
        );
        let execution = sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(runner_execution_id)
            .bind(ExecutionStatus::Running.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(execution) = execution else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO activities (execution_id, actor_name, kind, message)
             VALUES ($1, 'System', $2, $3)",
        )
        .bind(execution_id)
        .bind(ActivityKind::CrewKickoff.as_str())
        .bind(format!(
            "Crew execution started in {} mode",
            execution.workflow_mode
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(execution))
    }

    /// Move the execution to `failed` and record the error text.
    ///
    /// Guarded: an already-terminal execution is left untouched and
    /// `None` is returned.
    pub async fn mark_failed(
        pool: &PgPool,
        execution_id: DbId,
        error_message: &str,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "UPDATE executions
             SET status_id = $2, error_message = $3, completed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND status_id NOT IN ($4, $5, $6)
             RETURNING {EXECUTION_COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(ExecutionStatus::Failed.id())
            .bind(error_message)
            .bind(ExecutionStatus::Completed.id())
            .bind(ExecutionStatus::Failed.id())
            .bind(ExecutionStatus::Cancelled.id())
            .fetch_optional(pool)
            .await
    }

    /// Move the execution to `completed` with a completion timestamp.
    ///
    /// Guarded: an already-terminal execution is left untouched and
    /// `None` is returned.
    pub async fn complete(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let query = format!(
            "UPDATE executions
             SET status_id = $2, completed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND status_id NOT IN ($3, $4, $5)
             RETURNING {EXECUTION_COLUMNS}"
        );
        sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(ExecutionStatus::Completed.id())
            .bind(ExecutionStatus::Completed.id())
            .bind(ExecutionStatus::Failed.id())
            .bind(ExecutionStatus::Cancelled.id())
            .fetch_optional(pool)
            .await
    }

    /// Set the execution status. Terminal executions are never updated.
    pub async fn set_status(
        pool: &PgPool,
        execution_id: DbId,
        status: ExecutionStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE executions SET status_id = $2, updated_at = NOW()
             WHERE id = $1 AND status_id NOT IN ($3, $4, $5)",
        )
        .bind(execution_id)
        .bind(status.id())
        .bind(ExecutionStatus::Completed.id())
        .bind(ExecutionStatus::Failed.id())
        .bind(ExecutionStatus::Cancelled.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Cancel an execution, appending a human cancellation activity in the
    /// same transaction.
    ///
    /// The guarded UPDATE matches only non-terminal rows; returns `None`
    /// when the execution was already completed, failed, or cancelled.
    pub async fn cancel(
        pool: &PgPool,
        execution_id: DbId,
        cancelled_by: &str,
    ) -> Result<Option<Execution>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE executions
             SET status_id = $2, completed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND status_id NOT IN ($3, $4, $5)
             RETURNING {EXECUTION_COLUMNS}"
        );
        let execution = sqlx::query_as::<_, Execution>(&query)
            .bind(execution_id)
            .bind(ExecutionStatus::Cancelled.id())
            .bind(ExecutionStatus::Completed.id())
            .bind(ExecutionStatus::Failed.id())
            .bind(ExecutionStatus::Cancelled.id())
            .fetch_optional(&mut *tx)
            .await?;

        let Some(execution) = execution else {
            return Ok(None);
        };

        sqlx::query(
            "INSERT INTO activities (execution_id, actor_name, kind, message, metadata)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(execution_id)
        .bind(cancelled_by)
        .bind(ActivityKind::Message.as_str())
        .bind(format!("Execution cancelled by {cancelled_by}"))
        .bind(serde_json::json!({ "is_human": true }))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(execution))
    }
}
