//! REST client for the crew platform's kickoff/resume/cancel endpoints.
//!
//! The platform does NOT persist webhook configuration between calls:
//! both the event-stream and HITL callback descriptors must be attached
//! to every kickoff AND every resume request. Omitting them on resume
//! silently stops all further notifications.

use std::time::Duration;

use serde::Deserialize;

use crate::config::RunnerConfig;

/// Request timeout for kickoff and resume calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Request timeout for cancel calls (best-effort, keep it short).
const CANCEL_TIMEOUT: Duration = Duration::from_secs(10);

/// Every event type the platform can stream to the events webhook.
///
/// The full list is attached to the stream-webhook descriptor on every
/// kickoff and resume call.
pub const ALL_EVENTS: &[&str] = &[
    // Crew events
    "crew_kickoff_started",
    "crew_kickoff_completed",
    "crew_kickoff_failed",
    // Task events
    "task_started",
    "task_completed",
    "task_failed",
    // Agent events
    "agent_execution_started",
    "agent_execution_completed",
    "agent_execution_error",
    // LLM events
    "llm_call_started",
    "llm_call_completed",
    "llm_call_failed",
    "llm_stream_chunk",
    // Tool events
    "tool_usage_started",
    "tool_usage_finished",
    "tool_usage_error",
    // Memory events
    "memory_query_started",
    "memory_query_completed",
    "memory_save_started",
    "memory_save_completed",
    // Knowledge events
    "knowledge_query_started",
    "knowledge_query_completed",
];

/// HTTP client for the crew platform.
pub struct RunnerClient {
    client: reqwest::Client,
    config: RunnerConfig,
}

/// Response returned by the platform's kickoff endpoint after accepting
/// an execution.
#[derive(Debug, Deserialize)]
pub struct KickoffResponse {
    /// The platform's identifier for the started execution. All later
    /// resume/cancel calls and inbound webhooks are keyed by this id.
    pub kickoff_id: String,
}

/// Errors from the crew platform client.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The platform returned a non-2xx status code.
    #[error("Crew platform error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for diagnostics.
        body: String,
    },
}

impl RunnerClient {
    /// Create a client from configuration.
    ///
    /// # Panics
    ///
    /// Panics if the underlying HTTP client cannot be constructed, which
    /// only happens with an unusable TLS backend -- fail at startup.
    pub fn new(config: RunnerConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client, config }
    }

    /// The webhook descriptor for the event stream.
    ///
    /// Subscribes to the complete event list, in batch mode, with the
    /// shared webhook secret as bearer credential.
    pub fn stream_webhook_config(&self) -> serde_json::Value {
        serde_json::json!({
            "events": ALL_EVENTS,
            "url": format!("{}/api/v1/webhooks/stream", self.config.public_base_url),
            "realtime": false,
            "authentication": {
                "strategy": "bearer",
                "token": self.config.webhook_secret,
            },
        })
    }

    /// The webhook descriptor for HITL checkpoint notifications.
    pub fn hitl_webhook_config(&self) -> serde_json::Value {
        serde_json::json!({
            "url": format!("{}/api/v1/webhooks/hitl", self.config.public_base_url),
            "authentication": {
                "strategy": "bearer",
                "token": self.config.webhook_secret,
            },
        })
    }

    /// Build the kickoff request body: crew inputs plus both webhook
    /// descriptors.
    pub fn kickoff_payload(&self, inputs: &serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "inputs": inputs,
            "humanInputWebhook": self.hitl_webhook_config(),
            "webhooks": self.stream_webhook_config(),
        })
    }

    /// Build the resume request body. Webhook descriptors are attached
    /// here too -- the platform does not carry them over from kickoff.
    pub fn resume_payload(
        &self,
        runner_execution_id: &str,
        task_id: &str,
        feedback: &str,
        approve: bool,
    ) -> serde_json::Value {
        serde_json::json!({
            "execution_id": runner_execution_id,
            "task_id": task_id,
            "human_feedback": feedback,
            "is_approve": approve,
            "humanInputWebhook": self.hitl_webhook_config(),
            "webhooks": self.stream_webhook_config(),
        })
    }

    /// Start a crew execution.
    ///
    /// Returns the platform's `kickoff_id` on success. No internal retry;
    /// the caller decides whether and when to try again.
    pub async fn kickoff(
        &self,
        inputs: &serde_json::Value,
    ) -> Result<KickoffResponse, RunnerError> {
        let response = self
            .client
            .post(format!("{}/kickoff", self.config.api_url))
            .bearer_auth(&self.config.bearer_token)
            .json(&self.kickoff_payload(inputs))
            .send()
            .await?;

        let result: KickoffResponse = Self::parse_response(response).await?;
        tracing::info!(kickoff_id = %result.kickoff_id, "Crew kickoff accepted");
        Ok(result)
    }

    /// Resume a paused execution after a human review decision.
    ///
    /// `approve = false` asks the crew to retry the task with the
    /// feedback as added context.
    pub async fn resume(
        &self,
        runner_execution_id: &str,
        task_id: &str,
        feedback: &str,
        approve: bool,
    ) -> Result<serde_json::Value, RunnerError> {
        let response = self
            .client
            .post(format!("{}/resume", self.config.api_url))
            .bearer_auth(&self.config.bearer_token)
            .json(&self.resume_payload(runner_execution_id, task_id, feedback, approve))
            .send()
            .await?;

        let ack = Self::parse_response(response).await?;
        tracing::info!(
            runner_execution_id,
            task_id,
            approve,
            "Crew resume accepted",
        );
        Ok(ack)
    }

    /// Cancel a running execution, best-effort.
    ///
    /// Returns `Ok(false)` -- not an error -- when the platform reports the
    /// execution unknown (404) or cancellation unsupported (405). Any
    /// other failure propagates.
    pub async fn cancel(&self, runner_execution_id: &str) -> Result<bool, RunnerError> {
        let response = self
            .client
            .post(format!(
                "{}/cancel/{}",
                self.config.api_url, runner_execution_id
            ))
            .bearer_auth(&self.config.bearer_token)
            .timeout(CANCEL_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(runner_execution_id, "Crew execution cancelled");
            return Ok(true);
        }
        if status.as_u16() == 404 || status.as_u16() == 405 {
            tracing::warn!(
                runner_execution_id,
                status = status.as_u16(),
                "Crew cancellation not possible on the platform",
            );
            return Ok(false);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        Err(RunnerError::Api {
            status: status.as_u16(),
            body,
        })
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`RunnerError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RunnerError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RunnerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, RunnerError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> RunnerClient {
        RunnerClient::new(RunnerConfig {
            api_url: "https://crew.example.com/api".to_string(),
            bearer_token: "platform-token".to_string(),
            public_base_url: "https://app.example.com".to_string(),
            webhook_secret: "hook-secret".to_string(),
        })
    }

    #[test]
    fn stream_webhook_config_carries_url_secret_and_full_event_list() {
        let config = test_client().stream_webhook_config();

        assert_eq!(
            config["url"],
            "https://app.example.com/api/v1/webhooks/stream"
        );
        assert_eq!(config["realtime"], false);
        assert_eq!(config["authentication"]["strategy"], "bearer");
        assert_eq!(config["authentication"]["token"], "hook-secret");
        assert_eq!(config["events"].as_array().unwrap().len(), ALL_EVENTS.len());
    }

    #[test]
    fn hitl_webhook_config_points_at_the_hitl_endpoint() {
        let config = test_client().hitl_webhook_config();

        assert_eq!(config["url"], "https://app.example.com/api/v1/webhooks/hitl");
        assert_eq!(config["authentication"]["token"], "hook-secret");
    }

    #[test]
    fn kickoff_payload_attaches_both_webhook_descriptors() {
        let inputs = serde_json::json!({ "topic": "spring launch" });
        let payload = test_client().kickoff_payload(&inputs);

        assert_eq!(payload["inputs"]["topic"], "spring launch");
        assert!(payload["humanInputWebhook"]["url"].is_string());
        assert!(payload["webhooks"]["url"].is_string());
    }

    #[test]
    fn resume_payload_reattaches_both_webhook_descriptors() {
        let payload = test_client().resume_payload("run-1", "final_qa", "looks good", true);

        assert_eq!(payload["execution_id"], "run-1");
        assert_eq!(payload["task_id"], "final_qa");
        assert_eq!(payload["human_feedback"], "looks good");
        assert_eq!(payload["is_approve"], true);
        // The platform forgets webhook config between calls; both
        // descriptors must be present on resume as well.
        assert!(payload["humanInputWebhook"]["url"].is_string());
        assert!(payload["webhooks"]["events"].is_array());
    }

    #[test]
    fn event_list_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for event in ALL_EVENTS {
            assert!(seen.insert(*event), "duplicate event type: {event}");
        }
    }
}
