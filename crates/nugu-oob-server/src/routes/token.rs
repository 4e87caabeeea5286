//! Token document endpoints (`/auth`).

use axum::{
    Json,
    body::Bytes,
    extract::State,
    response::Response,
};
use nugu_oob_oauth::types::ensure_json_object;
use tracing::info;

use super::registration::{SuccessResponse, json_bytes};
use crate::error::Result;
use crate::state::AppState;

/// GET /auth - Raw token document.
pub async fn get_token_handler(State(state): State<AppState>) -> Result<Response> {
    let bytes = state.store.read_token_raw().await?;
    Ok(json_bytes(bytes))
}

/// PUT /auth - Replace the token document with the request body.
pub async fn put_token_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<SuccessResponse>> {
    ensure_json_object(&body)?;
    state.store.write_token_raw(&body).await?;
    info!("Token document replaced");
    Ok(Json(SuccessResponse { success: true }))
}
