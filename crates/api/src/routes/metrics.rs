//! Prometheus scrape endpoint.

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};

use crate::error::Result;
use crate::state::AppState;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let body = state.metrics().encode_text()?;
    Ok(([(CONTENT_TYPE, TEXT_FORMAT)], body))
}
