//! Analytics API 模块

use axum::{Json, Router, extract::State, routing::get};
use shared::models::Analytics;

use crate::core::CanteenState;
use crate::utils::AppResult;

pub fn admin_router() -> Router<CanteenState> {
    Router::new().route("/api/admin/analytics", get(get_analytics))
}

/// GET /api/admin/analytics - 今日统计
async fn get_analytics(State(state): State<CanteenState>) -> AppResult<Json<Analytics>> {
    Ok(Json(state.analytics.get_analytics().await?))
}
