//! Shared-secret authentication extractor for webhook endpoints.
//!
//! The crew platform authenticates its deliveries with the bearer
//! secret we handed it in the webhook descriptors. This is a service
//! credential, deliberately distinct from user JWTs: a leaked user
//! token must never allow forged webhook deliveries and vice versa.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crewdeck_core::error::CoreError;

use crate::error::AppError;
use crate::state::AppState;

/// Proof that the request carried the webhook shared secret.
///
/// Use as an extractor parameter on webhook handlers; rejection happens
/// before any payload processing.
#[derive(Debug, Clone, Copy)]
pub struct WebhookAuth;

impl FromRequestParts<AppState> for WebhookAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::Core(CoreError::Unauthorized(
                    "Missing Authorization header".into(),
                ))
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid Authorization format. Expected: Bearer <token>".into(),
            ))
        })?;

        if token != state.config.webhook_secret {
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid webhook token".into(),
            )));
        }

        Ok(WebhookAuth)
    }
}
