use std::sync::Arc;

use crewdeck_runner::RunnerClient;

use crate::config::ServerConfig;
use crate::sse::SseManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: crewdeck_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// SSE connection manager (execution stream subscribers).
    pub sse_manager: Arc<SseManager>,
    /// Crew platform client (kickoff/resume/cancel).
    pub runner: Arc<RunnerClient>,
}
