//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! logged and captured to Sentry before the response is built; everything
//! else maps to a client-safe `{"success": false, "message": ...}` body.

use std::time::Duration;

use axum::{
    Json,
    http::{HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use loyalty_core::{CheckoutError, PhoneError};

use crate::config::Environment;
use crate::db::RepositoryError;
use crate::metrics::MetricsError;
use crate::services::auth::AuthError;

/// Message sent with every 429.
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later.";

/// Message sent with every 403 from the origin filter.
pub const ORIGIN_REJECTED_MESSAGE: &str = "Origin not allowed by CORS";

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body or query failed validation.
    #[error("{0}")]
    Validation(String),

    /// Checkout form failed validation.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Search phone failed validation.
    #[error(transparent)]
    Phone(#[from] PhoneError),

    /// Password check failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The `Origin` header is not allowed.
    #[error("origin not allowed: {0}")]
    OriginRejected(String),

    /// The client exceeded its request budget.
    #[error("rate limited")]
    RateLimited { retry_after: Duration, limit: u32 },

    /// A store operation failed. `message` is what the client sees.
    #[error("{message}: {source}")]
    Upstream {
        message: String,
        #[source]
        source: RepositoryError,
    },

    /// Metrics could not be rendered.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// No route matched.
    #[error("not found")]
    NotFound,
}

impl AppError {
    /// Wrap a store failure.
    ///
    /// In development the client sees the underlying error; otherwise it
    /// sees `fallback`.
    pub fn upstream(environment: Environment, fallback: &str, source: RepositoryError) -> Self {
        let message = if environment.exposes_error_details() {
            source.to_string()
        } else {
            fallback.to_string()
        };
        Self::Upstream { message, source }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::Checkout(_)
            | Self::Phone(_)
            | Self::Auth(AuthError::MissingPassword) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::InvalidPassword) => StatusCode::UNAUTHORIZED,
            Self::OriginRejected(_) => StatusCode::FORBIDDEN,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } | Self::Metrics(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::Auth(AuthError::InvalidPassword) => "Invalid password".to_string(),
            Self::Auth(AuthError::MissingPassword) => "Password is required".to_string(),
            Self::OriginRejected(_) => ORIGIN_REJECTED_MESSAGE.to_string(),
            Self::RateLimited { .. } => RATE_LIMITED_MESSAGE.to_string(),
            Self::Upstream { message, .. } => message.clone(),
            Self::Metrics(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, Self::Upstream { .. } | Self::Metrics(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        if matches!(self, Self::NotFound) {
            return (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" }))).into_response();
        }

        let status = self.status();
        let body = Json(json!({
            "success": false,
            "message": self.public_message(),
        }));
        let mut response = (status, body).into_response();

        if let Self::RateLimited { retry_after, limit } = self {
            let reset_secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            let headers = response.headers_mut();
            headers.insert(RETRY_AFTER, HeaderValue::from(reset_secs));
            headers.insert(
                HeaderName::from_static("ratelimit-limit"),
                HeaderValue::from(limit),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-remaining"),
                HeaderValue::from_static("0"),
            );
            headers.insert(
                HeaderName::from_static("ratelimit-reset"),
                HeaderValue::from(reset_secs),
            );
        }

        response
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;
