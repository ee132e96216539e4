//! Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use shared::models::{Order, TableConfig, TableUpdate};

use crate::core::CanteenState;
use crate::utils::AppResult;

/// GET /api/tables - 12 张桌台的启用状态
pub async fn list(State(state): State<CanteenState>) -> AppResult<Json<Vec<TableConfig>>> {
    Ok(Json(state.tables.get_table_config().await?))
}

/// GET /api/tables/:table/order - 桌台当前进行中的订单
pub async fn current_order(
    State(state): State<CanteenState>,
    Path(table): Path<u32>,
) -> AppResult<Json<Option<Order>>> {
    Ok(Json(state.orders.current_order_for_table(table).await?))
}

/// PUT /api/admin/tables/:table - 启用/停用桌台
pub async fn set_enabled(
    State(state): State<CanteenState>,
    Path(table): Path<u32>,
    Json(payload): Json<TableUpdate>,
) -> AppResult<Json<TableConfig>> {
    let config = state.tables.set_table_enabled(table, payload.enabled).await?;
    tracing::info!(table, enabled = payload.enabled, "Table availability changed");
    Ok(Json(config))
}
