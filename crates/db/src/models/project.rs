//! Project entity models.

use serde::Serialize;
use sqlx::FromRow;

use crewdeck_core::types::{DbId, Timestamp};

/// A row from the `projects` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: DbId,
    pub client_id: DbId,
    pub project_name: String,
    pub topic: String,
    pub content_type: String,
    pub audience: String,
    pub ai_language_code: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A project joined with its owning client, for kickoff input assembly.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectWithClient {
    pub id: DbId,
    pub client_id: DbId,
    pub project_name: String,
    pub topic: String,
    pub content_type: String,
    pub audience: String,
    pub ai_language_code: Option<String>,
    pub client_name: String,
}
