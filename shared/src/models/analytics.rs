//! Analytics and scan counter models

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// QR scan counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanStats {
    pub total_scans: u64,
    /// Keyed by table number as a string
    pub scans_per_table: BTreeMap<String, u64>,
}

/// Admin dashboard numbers (统计)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub today_orders: u64,
    pub today_revenue: u64,
    pub active_orders: u64,
    pub average_rating: f64,
    pub table_leaderboard: Vec<TableLeaderboardEntry>,
    pub bestsellers: Vec<Bestseller>,
    pub hourly_sales: Vec<HourlySales>,
    pub ratings_count: u64,
    pub total_scans: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableLeaderboardEntry {
    pub table_number: u32,
    pub orders: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bestseller {
    pub name: String,
    pub sold: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlySales {
    /// `"8:00"` … `"19:00"`
    pub hour: String,
    pub orders: u64,
}
