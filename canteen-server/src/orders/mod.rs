//! 订单模块
//!
//! - [`OrderEngine`]: 下单、状态流转、查询与订阅
//! - [`OrderError`]: 订单校验错误，转换为 [`crate::utils::AppError`]

pub mod engine;
pub mod error;

pub use engine::{ORDER_SEQUENCE, OrderEngine};
pub use error::{OrderError, OrderResult};
