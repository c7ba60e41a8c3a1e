//! Crew platform connection configuration.

/// Configuration for the crew platform client.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base URL of the crew platform API (e.g. `https://crew.example.com/api`).
    pub api_url: String,
    /// Bearer token for authenticating against the platform.
    pub bearer_token: String,
    /// Publicly reachable base URL of THIS service; the platform calls
    /// back to `{public_base_url}/api/v1/webhooks/...`.
    pub public_base_url: String,
    /// Shared secret the platform must present on webhook deliveries.
    /// Distinct from any user session token.
    pub webhook_secret: String,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var           | Required |
    /// |-------------------|----------|
    /// | `CREW_API_URL`    | **yes**  |
    /// | `CREW_BEARER_TOKEN` | **yes** |
    /// | `PUBLIC_BASE_URL` | **yes**  |
    /// | `WEBHOOK_SECRET`  | **yes**  |
    ///
    /// # Panics
    ///
    /// Panics if any required variable is missing, so misconfiguration
    /// fails at startup rather than on the first kickoff.
    pub fn from_env() -> Self {
        let api_url = std::env::var("CREW_API_URL").expect("CREW_API_URL must be set");
        let bearer_token =
            std::env::var("CREW_BEARER_TOKEN").expect("CREW_BEARER_TOKEN must be set");
        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").expect("PUBLIC_BASE_URL must be set");
        let webhook_secret = std::env::var("WEBHOOK_SECRET").expect("WEBHOOK_SECRET must be set");

        if webhook_secret == "dev-secret" {
            tracing::warn!("Using the default webhook secret; generate a real one for production");
        }

        Self {
            api_url,
            bearer_token,
            public_base_url,
            webhook_secret,
        }
    }
}
