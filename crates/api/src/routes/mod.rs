//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! POST /auth             - Check the staff password
//! GET  /bonuses          - 100 most recently visited balance rows
//! GET  /bonuses/search   - Latest balance for a phone, tier advanced
//! GET  /guests           - 100 newest checkouts
//! POST /guests           - Record a checkout
//! GET  /config           - Client bootstrap flags
//! GET  /health           - Liveness + database probe
//! GET  /metrics          - Prometheus exposition
//! GET  /app/*            - Front-desk app bundle (when STATIC_DIR is set)
//! ```

pub mod auth;
pub mod bonuses;
pub mod config;
pub mod guests;
pub mod health;
pub mod metrics;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;

/// `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> DataResponse<T> {
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Create the API router (without state or middleware).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(auth::login))
        .route("/bonuses", get(bonuses::list))
        .route("/bonuses/search", get(bonuses::search))
        .route("/guests", get(guests::list).post(guests::create))
        .route("/config", get(config::show))
        .route("/health", get(health::check))
        .route("/metrics", get(metrics::export))
}

/// Fallback for unmatched paths.
pub async fn not_found() -> AppError {
    AppError::NotFound
}
