//! Kitchen PIN API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use shared::models::PinRequest;

use crate::core::CanteenState;
use crate::utils::AppResult;

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

/// POST /api/kitchen/verify - 厨房屏解锁
pub async fn verify(
    State(state): State<CanteenState>,
    Json(payload): Json<PinRequest>,
) -> AppResult<Json<VerifyResponse>> {
    let valid = state.kitchen.verify_request(&payload).await?;
    Ok(Json(VerifyResponse { valid }))
}

/// GET /api/admin/kitchen/pins
pub async fn list(State(state): State<CanteenState>) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.kitchen.list_kitchen_pins().await?))
}

/// POST /api/admin/kitchen/pins
pub async fn add(
    State(state): State<CanteenState>,
    Json(payload): Json<PinRequest>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.kitchen.add_kitchen_pin(&payload.pin).await?))
}

/// DELETE /api/admin/kitchen/pins/:pin
pub async fn remove(
    State(state): State<CanteenState>,
    Path(pin): Path<String>,
) -> AppResult<Json<Vec<String>>> {
    Ok(Json(state.kitchen.remove_kitchen_pin(&pin).await?))
}
