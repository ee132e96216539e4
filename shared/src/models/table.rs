//! Dining Table Model

use serde::{Deserialize, Serialize};

/// Number of tables in the canteen
pub const TABLE_COUNT: u32 = 12;

/// Dining table entry (桌台)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    /// 1..=TABLE_COUNT
    pub table_number: u32,
    pub enabled: bool,
}

impl TableConfig {
    /// 12 enabled tables
    pub fn defaults() -> Vec<TableConfig> {
        (1..=TABLE_COUNT)
            .map(|table_number| TableConfig {
                table_number,
                enabled: true,
            })
            .collect()
    }
}

/// Is `table` a valid table number
pub fn is_valid_table(table: u32) -> bool {
    (1..=TABLE_COUNT).contains(&table)
}

/// Update table payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableUpdate {
    pub enabled: bool,
}
