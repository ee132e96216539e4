use shared::models::OrderStatus;
use thiserror::Error;

use crate::store::StoreError;
use crate::utils::{AppError, ErrorCode};

/// Order engine errors
///
/// 所有校验错误都在写入之前返回。
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Table {0} does not exist")]
    TableNotFound(u32),

    #[error("Table {0} is not accepting orders")]
    TableDisabled(u32),

    #[error("Table {table} already has an active order ({order_number})")]
    TableOccupied { table: u32, order_number: String },

    #[error("Order has no items")]
    EmptyOrder,

    #[error("Quantity must be at least 1 for item {0}")]
    ZeroQuantity(String),

    #[error("Invalid order line: {0}")]
    InvalidLine(String),

    #[error("Total {submitted} does not match items total {expected}")]
    TotalMismatch { submitted: u64, expected: u64 },

    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} kept changing while updating its status")]
    ConcurrentUpdate(String),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let message = err.to_string();
        match err {
            OrderError::Store(StoreError::NotFound { key, .. }) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {}", key))
                    .with_detail("orderId", key)
            }
            OrderError::Store(e) => e.into(),
            OrderError::OrderNotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, message).with_detail("orderId", id)
            }
            OrderError::TableNotFound(table) => crate::tables::table_not_found(table),
            OrderError::TableDisabled(table) => {
                AppError::with_message(ErrorCode::TableDisabled, message)
                    .with_detail("tableNumber", table)
            }
            OrderError::TableOccupied { table, order_number } => {
                AppError::with_message(ErrorCode::TableOccupied, message)
                    .with_detail("tableNumber", table)
                    .with_detail("orderNumber", order_number)
            }
            OrderError::EmptyOrder => AppError::with_message(ErrorCode::OrderEmpty, message),
            OrderError::ZeroQuantity(item_id) => {
                AppError::validation(message).with_detail("itemId", item_id)
            }
            OrderError::InvalidLine(_) => AppError::validation(message),
            OrderError::TotalMismatch { submitted, expected } => {
                AppError::with_message(ErrorCode::OrderTotalMismatch, message)
                    .with_detail("submitted", submitted)
                    .with_detail("expected", expected)
            }
            OrderError::ConcurrentUpdate(id) => {
                AppError::with_message(ErrorCode::IllegalTransition, message).with_detail("orderId", id)
            }
            OrderError::IllegalTransition { from, to } => {
                AppError::with_message(ErrorCode::IllegalTransition, message)
                    .with_detail("from", from.as_str())
                    .with_detail("to", to.as_str())
            }
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;
