//! Scan counter API 模块

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use shared::models::ScanStats;

use crate::core::CanteenState;
use crate::utils::AppResult;

pub fn router() -> Router<CanteenState> {
    Router::new().route("/api/scans/{table}", post(record))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new().route("/api/admin/scans", get(stats))
}

/// POST /api/scans/:table - 扫码落地页上报
async fn record(
    State(state): State<CanteenState>,
    Path(table): Path<u32>,
) -> AppResult<Json<ScanStats>> {
    Ok(Json(state.scans.increment_scan(table).await?))
}

/// GET /api/admin/scans
async fn stats(State(state): State<CanteenState>) -> AppResult<Json<ScanStats>> {
    Ok(Json(state.scans.get_scan_stats().await?))
}
