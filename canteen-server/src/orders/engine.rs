//! Order Lifecycle Engine
//!
//! ```text
//! placed ──► preparing ──► ready ──► served
//!    │           │           │
//!    └───────────┴───────────┴──► cancelled / rejected
//! ```
//!
//! 状态迁移在写入前由 [`OrderStatus::can_transition_to`] 统一校验，
//! 写入是基于已校验快照的条件更新，并发的两个迁移只有一个生效。
//! 每桌最多一个进行中订单是应用层检查，不依赖存储锁。

use std::sync::Arc;

use chrono_tz::Tz;
use serde_json::{Map, Value};
use shared::models::{Order, OrderLine, OrderStatus, is_valid_table};
use shared::util::now_millis;

use super::error::OrderError;
use crate::message::{Subscription, spawn_listener};
use crate::store::{Collection, Document, Store, StoreError, decode_all, encode};
use crate::tables::TableRegistry;
use crate::utils::AppResult;
use crate::utils::time::date_code;

/// Daily counter name for order numbers
pub const ORDER_SEQUENCE: &str = "order_sequence";

const WATCH: &[Collection] = &[Collection::Orders];

/// 状态更新遇到并发修改时的重读次数
const STATUS_UPDATE_ATTEMPTS: usize = 5;

#[derive(Clone)]
pub struct OrderEngine {
    store: Arc<dyn Store>,
    tables: TableRegistry,
    timezone: Tz,
    estimated_minutes: u32,
}

impl std::fmt::Debug for OrderEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderEngine")
            .field("timezone", &self.timezone)
            .field("estimated_minutes", &self.estimated_minutes)
            .finish_non_exhaustive()
    }
}

impl OrderEngine {
    pub fn new(
        store: Arc<dyn Store>,
        tables: TableRegistry,
        timezone: Tz,
        estimated_minutes: u32,
    ) -> Self {
        Self {
            store,
            tables,
            timezone,
            estimated_minutes,
        }
    }

    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Place a new order for a table
    pub async fn place_order(
        &self,
        table: u32,
        items: Vec<OrderLine>,
        total_amount: u64,
    ) -> AppResult<Order> {
        self.place_order_at(table, items, total_amount, now_millis()).await
    }

    pub async fn place_order_at(
        &self,
        table: u32,
        items: Vec<OrderLine>,
        total_amount: u64,
        now: i64,
    ) -> AppResult<Order> {
        if !is_valid_table(table) {
            return Err(OrderError::TableNotFound(table).into());
        }
        if !self.tables.is_table_enabled(table).await? {
            return Err(OrderError::TableDisabled(table).into());
        }
        let items = validate_lines(items)?;

        let expected = Order::items_total(&items);
        if total_amount != expected {
            return Err(OrderError::TotalMismatch {
                submitted: total_amount,
                expected,
            }
            .into());
        }

        if let Some(active) = self.current_order_for_table(table).await? {
            return Err(OrderError::TableOccupied {
                table,
                order_number: active.order_number,
            }
            .into());
        }

        let sequence = self
            .store
            .next_daily_sequence(ORDER_SEQUENCE, date_code(now, self.timezone))
            .await?;

        let mut order = Order {
            id: String::new(),
            table_number: table,
            order_number: Order::format_number(sequence),
            status: OrderStatus::Placed,
            items,
            total_amount,
            created_at: now,
            updated_at: now,
            served_at: None,
            estimated_minutes: self.estimated_minutes,
            rating_id: None,
        };

        let mut doc = encode(&order)?;
        if let Value::Object(map) = &mut doc {
            map.remove("id");
        }
        order.id = self.store.insert(Collection::Orders, doc).await?;

        tracing::info!(
            order_id = %order.id,
            order_number = %order.order_number,
            table,
            total = order.total_amount,
            "Order placed"
        );
        Ok(order)
    }

    /// Move an order to `next`
    ///
    /// `servedAt` is stamped on →served and cleared on every other transition.
    pub async fn update_order_status(&self, order_id: &str, next: OrderStatus) -> AppResult<Order> {
        self.update_order_status_at(order_id, next, now_millis()).await
    }

    pub async fn update_order_status_at(
        &self,
        order_id: &str,
        next: OrderStatus,
        now: i64,
    ) -> AppResult<Order> {
        // 校验和写入是一次条件更新；读到的快照过期就重读重验
        for _ in 0..STATUS_UPDATE_ATTEMPTS {
            let raw = self
                .store
                .get(Collection::Orders, order_id)
                .await?
                .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;
            let mut order = Document {
                id: order_id.to_string(),
                data: raw.clone(),
            }
            .decode::<Order>()
            .map_err(StoreError::from)?;

            let from = order.status;
            if !from.can_transition_to(next) {
                tracing::warn!(order_id = %order_id, %from, to = %next, "Rejected illegal order transition");
                return Err(OrderError::IllegalTransition { from, to: next }.into());
            }

            order.status = next;
            order.updated_at = now;
            order.served_at = (next == OrderStatus::Served).then_some(now);

            let mut patch = Map::new();
            patch.insert("status".into(), Value::from(next.as_str()));
            patch.insert("updatedAt".into(), Value::from(now));
            patch.insert(
                "servedAt".into(),
                order.served_at.map(Value::from).unwrap_or(Value::Null),
            );
            let written = self
                .store
                .update_if(Collection::Orders, order_id, &raw, patch)
                .await
                .map_err(OrderError::from)?;
            if written {
                tracing::info!(order_id = %order_id, %from, to = %next, "Order status updated");
                return Ok(order);
            }
            tracing::debug!(order_id = %order_id, "Order changed concurrently, re-checking transition");
        }

        Err(OrderError::ConcurrentUpdate(order_id.to_string()).into())
    }

    /// One order by id
    pub async fn get_order(&self, order_id: &str) -> AppResult<Option<Order>> {
        let Some(data) = self.store.get(Collection::Orders, order_id).await? else {
            return Ok(None);
        };
        let doc = Document {
            id: order_id.to_string(),
            data,
        };
        let order = doc.decode::<Order>().map_err(StoreError::from)?;
        Ok(Some(order))
    }

    /// All orders, newest first
    pub async fn list_orders(&self) -> AppResult<Vec<Order>> {
        let docs = self.store.list(Collection::Orders).await?;
        let mut orders: Vec<Order> = decode_all(Collection::Orders, docs);
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.order_number.cmp(&a.order_number))
        });
        Ok(orders)
    }

    /// The active order of a table, if any
    ///
    /// 多于一个进行中订单属于数据异常：返回最新的一个并记录警告。
    pub async fn current_order_for_table(&self, table: u32) -> AppResult<Option<Order>> {
        let mut active = self
            .list_orders()
            .await?
            .into_iter()
            .filter(|o| o.table_number == table && o.status.is_active());

        let current = active.next();
        let extra = active.count();
        if extra > 0 {
            tracing::warn!(
                table,
                active_orders = extra + 1,
                "Data integrity: table has more than one active order"
            );
        }
        Ok(current)
    }

    /// Listen to the full order list (newest first)
    pub async fn listen_orders<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Vec<Order>) + Send + Sync + 'static,
    {
        let engine = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "orders",
            WATCH,
            move || {
                let engine = engine.clone();
                async move { engine.list_orders().await }
            },
            callback,
        )
        .await
    }

    /// Listen to the active order of one table
    pub async fn listen_table_current_order<C>(&self, table: u32, callback: C) -> Subscription
    where
        C: Fn(Option<Order>) + Send + Sync + 'static,
    {
        let engine = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "table_current_order",
            WATCH,
            move || {
                let engine = engine.clone();
                async move { engine.current_order_for_table(table).await }
            },
            callback,
        )
        .await
    }
}

fn validate_lines(items: Vec<OrderLine>) -> Result<Vec<OrderLine>, OrderError> {
    if items.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    items
        .into_iter()
        .map(|mut line| {
            line.id = line.id.trim().to_string();
            line.name = line.name.trim().to_string();
            if line.id.is_empty() {
                return Err(OrderError::InvalidLine("item id is required".into()));
            }
            if line.quantity == 0 {
                return Err(OrderError::ZeroQuantity(line.id));
            }
            Ok(line)
        })
        .collect()
}
