#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The id is a string because entities are addressed both by local
    /// database ids and by the crew platform's opaque execution ids.
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The target entity exists but is not in a state that permits the
    /// requested action (e.g. approving a non-pending checkpoint).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A call to the external crew platform failed (network, timeout,
    /// or non-success status).
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// A per-caller resource limit was hit (e.g. concurrent stream cap).
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
