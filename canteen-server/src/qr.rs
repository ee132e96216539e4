//! 扫码点餐链接
//!
//! 只生成链接文本，二维码图片由前端或打印工具生成。

use serde::Serialize;
use shared::models::TABLE_COUNT;

/// One table's order-entry link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableOrderUrl {
    pub table_number: u32,
    pub url: String,
}

/// `{base}/order?table=N`
pub fn order_url(base: &str, table: u32) -> String {
    format!("{}/order?table={}", base.trim_end_matches('/'), table)
}

/// Links for every table, for the printable set
pub fn all_order_urls(base: &str) -> Vec<TableOrderUrl> {
    (1..=TABLE_COUNT)
        .map(|table_number| TableOrderUrl {
            table_number,
            url: order_url(base, table_number),
        })
        .collect()
}

/// Table number from the `table` query value
///
/// 数字四舍五入后夹到 1..=12；缺失或非数字时为 1。
pub fn parse_table_param(raw: Option<&str>) -> u32 {
    raw.map(str::trim)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
        .map(|n| n.round().clamp(1.0, TABLE_COUNT as f64) as u32)
        .unwrap_or(1)
}
