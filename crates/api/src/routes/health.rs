//! Health check.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::state::AppState;

/// Report process uptime and database reachability.
///
/// Returns 500 when the store does not answer its ping. The error detail
/// is only included in development.
pub async fn check(State(state): State<AppState>) -> Response {
    match state.store().ping().await {
        Ok(()) => Json(json!({
            "status": "ok",
            "database": "connected",
            "uptime": state.uptime_secs(),
        }))
        .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "Health check failed");
            let error = if state.config().environment.exposes_error_details() {
                err.to_string()
            } else {
                "database unavailable".to_string()
            };
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "status": "error", "error": error })),
            )
                .into_response()
        }
    }
}
