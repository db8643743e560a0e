//! Password gate endpoint.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::services::auth::{AuthError, AuthOutcome};
use crate::state::AppState;

/// Body of `POST /auth`.
///
/// `password` is kept as raw JSON so that non-string values are reported as
/// a missing password rather than a deserialization failure.
#[derive(Debug, Default, Deserialize)]
pub struct AuthRequest {
    #[serde(default)]
    pub password: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub message: &'static str,
}

/// Check the submitted password.
///
/// An unreadable body is treated like an empty one, so a disabled gate
/// still answers with success.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    body: std::result::Result<Json<AuthRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let password = match &request.password {
        Some(Value::String(password)) => Some(password.as_str()),
        _ => None,
    };

    let metrics = state.metrics();
    match state.auth().authenticate(password) {
        Ok(outcome) => {
            metrics.record_auth_attempt(outcome.label());
            let message = match outcome {
                AuthOutcome::Bypassed => "Authentication is disabled",
                AuthOutcome::Granted => "Access granted",
            };
            Ok(Json(AuthResponse {
                success: true,
                message,
            }))
        }
        Err(err) => {
            let label = match err {
                AuthError::MissingPassword => "invalid",
                AuthError::InvalidPassword => "denied",
            };
            metrics.record_auth_attempt(label);
            tracing::warn!(outcome = label, "Password check failed");
            Err(AppError::Auth(err))
        }
    }
}
