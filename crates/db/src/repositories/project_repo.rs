//! Repository for the `projects` table.

use sqlx::PgPool;

use crewdeck_core::types::DbId;

use crate::models::project::ProjectWithClient;

/// Provides read operations for projects with ownership checks.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Find a project by ID, verifying the caller owns it through the
    /// client chain. Returns `None` for both "does not exist" and "not
    /// owned by this user" so callers cannot distinguish the two.
    pub async fn find_owned(
        pool: &PgPool,
        project_id: DbId,
        owner_id: DbId,
    ) -> Result<Option<ProjectWithClient>, sqlx::Error> {
        sqlx::query_as::<_, ProjectWithClient>(
            "SELECT p.id, p.client_id, p.project_name, p.topic, p.content_type,
                    p.audience, p.ai_language_code, c.client_name
             FROM projects p
             JOIN clients c ON c.id = p.client_id
             WHERE p.id = $1 AND c.owner_id = $2",
        )
        .bind(project_id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
    }
}
