//! QR link API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/qr | GET | `?table=` 解析后的桌号和点餐链接 |
//! | /api/qr/all | GET | 全部 12 张桌台的点餐链接 |

use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::Deserialize;

use crate::core::CanteenState;
use crate::qr::{TableOrderUrl, all_order_urls, order_url, parse_table_param};

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/qr", get(resolve))
        .route("/api/qr/all", get(list))
}

#[derive(Debug, Deserialize)]
struct TableQuery {
    table: Option<String>,
}

/// GET /api/qr?table=3
async fn resolve(
    State(state): State<CanteenState>,
    Query(query): Query<TableQuery>,
) -> Json<TableOrderUrl> {
    let table_number = parse_table_param(query.table.as_deref());
    Json(TableOrderUrl {
        table_number,
        url: order_url(&state.config.public_base_url, table_number),
    })
}

/// GET /api/qr/all
async fn list(State(state): State<CanteenState>) -> Json<Vec<TableOrderUrl>> {
    Json(all_order_urls(&state.config.public_base_url))
}
