//! Client bootstrap flags.

use axum::{Json, extract::State};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub auth_disabled: bool,
}

/// Tell the front-desk app whether to show the password prompt.
pub async fn show(State(state): State<AppState>) -> Json<ClientConfig> {
    Json(ClientConfig {
        auth_disabled: state.auth().is_disabled(),
    })
}
