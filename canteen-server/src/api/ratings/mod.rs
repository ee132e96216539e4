//! Rating API 模块
//!
//! | 路径 | 方法 | 说明 |
//! |------|------|------|
//! | /api/orders/{id}/rating | POST | 评价已上桌订单 |
//! | /api/ratings/tags | GET | 评价页快捷标签 |
//! | /api/admin/ratings | GET | 全部评价 (管理端) |

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use shared::models::{QUICK_RATING_TAGS, Rating, RatingInput};

use crate::core::CanteenState;
use crate::utils::AppResult;

pub fn router() -> Router<CanteenState> {
    Router::new()
        .route("/api/orders/{id}/rating", post(submit))
        .route("/api/ratings/tags", get(tags))
}

pub fn admin_router() -> Router<CanteenState> {
    Router::new().route("/api/admin/ratings", get(list))
}

/// POST /api/orders/:id/rating - 评价已上桌订单
async fn submit(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
    Json(payload): Json<RatingInput>,
) -> AppResult<Json<Rating>> {
    Ok(Json(state.ratings.submit_order_rating(&id, payload).await?))
}

/// GET /api/ratings/tags - 快捷标签
async fn tags() -> Json<Vec<&'static str>> {
    Json(QUICK_RATING_TAGS.to_vec())
}

/// GET /api/admin/ratings - 全部评价
async fn list(State(state): State<CanteenState>) -> AppResult<Json<Vec<Rating>>> {
    Ok(Json(state.ratings.list_ratings().await?))
}
