//! Repository for the `users` table.

use sqlx::PgPool;

use crewdeck_core::types::DbId;

use crate::models::user::User;

/// Column list for users queries.
const USER_COLUMNS: &str = "id, email, name, role, is_active, created_at, updated_at";

/// Provides read operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Find a user by their ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}
