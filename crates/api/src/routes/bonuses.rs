//! Bonus balance lookups.

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use loyalty_core::CanonicalPhone;

use super::DataResponse;
use crate::db::LIST_LIMIT;
use crate::error::{AppError, Result};
use crate::models::BalanceRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub phone: Option<String>,
}

/// Find a guest's latest balance and project the tier they reach on this
/// visit.
///
/// Answers `data: null` when the phone has no balance row.
#[tracing::instrument(skip_all)]
pub async fn search(
    State(state): State<AppState>,
    params: std::result::Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<DataResponse<Option<BalanceRecord>>>> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let phone = CanonicalPhone::parse(params.phone.as_deref().unwrap_or_default())?;

    let record = state
        .store()
        .find_latest_balance(&phone)
        .await
        .map_err(|e| AppError::upstream(state.config().environment, "Failed to search guest", e))?;

    tracing::debug!(%phone, found = record.is_some(), "Guest search");
    Ok(Json(DataResponse::ok(
        record.map(BalanceRecord::with_next_tier),
    )))
}

/// Balance rows with the most recent visits first.
pub async fn list(State(state): State<AppState>) -> Result<Json<DataResponse<Vec<BalanceRecord>>>> {
    let rows = state
        .store()
        .recent_balances(LIST_LIMIT)
        .await
        .map_err(|e| {
            AppError::upstream(state.config().environment, "Failed to load bonus balances", e)
        })?;

    Ok(Json(DataResponse::ok(rows)))
}
