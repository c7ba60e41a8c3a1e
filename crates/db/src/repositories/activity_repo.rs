//! Repository for the append-only `activities` table.
//!
//! The partial unique index `uq_activities_origin_event` is the source
//! of truth for stream-event idempotency: a duplicate delivery loses the
//! `ON CONFLICT DO NOTHING` race and is reported as `None`.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crewdeck_core::types::DbId;

use crate::models::activity::Activity;

/// Column list for activities queries.
const ACTIVITY_COLUMNS: &str = "id, execution_id, actor_name, kind, message, occurred_at, \
    origin_event_id, metadata, created_at";

/// Provides append and read operations for execution activities.
pub struct ActivityRepo;

impl ActivityRepo {
    /// Append an activity derived from a crew platform stream event.
    ///
    /// Returns `None` when an activity with the same `origin_event_id`
    /// already exists -- the event was processed before (or concurrently)
    /// and must be counted as skipped, not re-applied.
    pub async fn append_event(
        pool: &PgPool,
        execution_id: DbId,
        actor_name: &str,
        kind: &str,
        message: &str,
        occurred_at: DateTime<Utc>,
        origin_event_id: &str,
        metadata: &serde_json::Value,
    ) -> Result<Option<Activity>, sqlx::Error> {
        let query = format!(
            "INSERT INTO activities
                (execution_id, actor_name, kind, message, occurred_at, origin_event_id, metadata)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (origin_event_id) WHERE origin_event_id IS NOT NULL DO NOTHING
             RETURNING {ACTIVITY_COLUMNS}"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(execution_id)
            .bind(actor_name)
            .bind(kind)
            .bind(message)
            .bind(occurred_at)
            .bind(origin_event_id)
            .bind(metadata)
            .fetch_optional(pool)
            .await
    }

    /// List activities for an execution in chronological order.
    pub async fn list_for_execution(
        pool: &PgPool,
        execution_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Activity>, sqlx::Error> {
        let query = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities
             WHERE execution_id = $1
             ORDER BY occurred_at ASC, id ASC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, Activity>(&query)
            .bind(execution_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Count all activities for an execution.
    pub async fn count_for_execution(
        pool: &PgPool,
        execution_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM activities WHERE execution_id = $1")
                .bind(execution_id)
                .fetch_one(pool)
                .await?;
        Ok(count)
    }
}
