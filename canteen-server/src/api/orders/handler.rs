//! Order API Handlers

use std::convert::Infallible;

use axum::{
    Json,
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use shared::models::{Order, PlaceOrderRequest, StatusUpdate};
use tokio::sync::watch;

use crate::core::CanteenState;
use crate::orders::OrderError;
use crate::utils::AppResult;

/// GET /api/orders - 全部订单
pub async fn list(State(state): State<CanteenState>) -> AppResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_orders().await?))
}

/// POST /api/orders - 下单
pub async fn place(
    State(state): State<CanteenState>,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .place_order(payload.table_number, payload.items, payload.total_amount)
        .await?;
    Ok(Json(order))
}

/// GET /api/orders/:id - 单个订单
pub async fn get_by_id(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .get_order(&id)
        .await?
        .ok_or(OrderError::OrderNotFound(id))?;
    Ok(Json(order))
}

/// PUT /api/orders/:id/status - 状态流转
pub async fn update_status(
    State(state): State<CanteenState>,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdate>,
) -> AppResult<Json<Order>> {
    Ok(Json(state.orders.update_order_status(&id, payload.status).await?))
}

/// GET /api/orders/stream - 订单列表推送
///
/// 连接建立时立即推送一次当前列表，之后每次订单变更推送完整列表。
/// 每条事件都是完整快照，客户端跟不上时只保留最新一份。
/// 连接断开时 stream 被 drop，订阅随之取消。
pub async fn stream(
    State(state): State<CanteenState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = watch::channel(Vec::<Order>::new());
    let subscription = state
        .orders
        .listen_orders(move |orders| {
            tx.send_replace(orders);
        })
        .await;

    let events = futures::stream::unfold((rx, subscription), |(mut rx, subscription)| async move {
        rx.changed().await.ok()?;
        let orders = rx.borrow_and_update().clone();
        let event = Event::default()
            .event("orders")
            .json_data(&orders)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Failed to encode order stream event");
                Event::default().comment("encode error")
            });
        Some((Ok(event), (rx, subscription)))
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
