//! Checkout ledger endpoints.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use loyalty_core::CheckoutInput;

use super::DataResponse;
use crate::db::LIST_LIMIT;
use crate::error::{AppError, Result};
use crate::models::CheckoutRecord;
use crate::state::AppState;

/// Body of `POST /guests`.
///
/// Fields are raw JSON so the front-desk app may send numbers or numeric
/// strings interchangeably.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutRequest {
    pub guest_phone: Option<Value>,
    pub last_name: Option<Value>,
    pub first_name: Option<Value>,
    pub checkin_date: Option<Value>,
    pub loyalty_level: Option<Value>,
    pub shelter_booking_id: Option<Value>,
    pub total_amount: Option<Value>,
    pub bonus_spent: Option<Value>,
}

impl From<CheckoutRequest> for CheckoutInput {
    fn from(request: CheckoutRequest) -> Self {
        Self {
            guest_phone: text(request.guest_phone),
            last_name: text(request.last_name),
            first_name: text(request.first_name),
            checkin_date: text(request.checkin_date),
            loyalty_level: text(request.loyalty_level),
            booking_id: text(request.shelter_booking_id),
            total_amount: text(request.total_amount),
            bonus_spent: text(request.bonus_spent),
        }
    }
}

/// Strings pass through, numbers are rendered; anything else counts as
/// absent.
fn text(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub message: &'static str,
    pub data: CheckoutRecord,
}

/// Validate and record a checkout.
#[tracing::instrument(skip_all)]
pub async fn create(
    State(state): State<AppState>,
    body: std::result::Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Json<CheckoutResponse>> {
    let Json(request) = body.map_err(|e| AppError::Validation(e.body_text()))?;
    let checkout = CheckoutInput::from(request).validate()?;

    let record = state
        .store()
        .insert_checkout(&checkout)
        .await
        .map_err(|e| AppError::upstream(state.config().environment, "Failed to record checkout", e))?;

    tracing::info!(checkout_id = %record.id, "Guest checkout recorded");
    Ok(Json(CheckoutResponse {
        success: true,
        message: "Guest checkout recorded",
        data: record,
    }))
}

/// Newest checkouts first.
pub async fn list(State(state): State<AppState>) -> Result<Json<DataResponse<Vec<CheckoutRecord>>>> {
    let rows = state
        .store()
        .recent_checkouts(LIST_LIMIT)
        .await
        .map_err(|e| AppError::upstream(state.config().environment, "Failed to load guests", e))?;

    Ok(Json(DataResponse::ok(rows)))
}
