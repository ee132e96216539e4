//! Rating Model

use serde::{Deserialize, Serialize};

/// Tags offered on the rating sheet
pub const QUICK_RATING_TAGS: [&str; 5] = ["Tasty", "Quick", "Worth it", "Too spicy", "Cold"];

/// Order rating (评价), immutable once written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub order_id: String,
    pub order_number: String,
    pub table_number: u32,
    /// 1..=5
    pub stars: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comment: String,
    pub created_at: i64,
}

/// Submit rating payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingInput {
    pub stars: u8,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub comment: String,
}
