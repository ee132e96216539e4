//! 时间工具函数 - 业务时区转换
//!
//! 存储层只保存 `i64` Unix millis；"今天"、日期码、小时桶都在业务时区下计算。

use chrono::{DateTime, NaiveDate, Timelike};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 默认业务时区
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// 解析时区名称 (IANA)
pub fn parse_timezone(name: &str) -> AppResult<Tz> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| AppError::config(format!("Unknown timezone: {}", name)))
}

/// Unix millis → 业务时区本地日期
pub fn local_date(millis: i64, tz: Tz) -> NaiveDate {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&tz)
        .date_naive()
}

/// Unix millis → 业务时区本地小时 (0..=23)
pub fn local_hour(millis: i64, tz: Tz) -> u32 {
    DateTime::from_timestamp_millis(millis)
        .unwrap_or_default()
        .with_timezone(&tz)
        .hour()
}

/// 日期码 YYYYMMDD (业务时区)
pub fn date_code(millis: i64, tz: Tz) -> u32 {
    local_date(millis, tz)
        .format("%Y%m%d")
        .to_string()
        .parse()
        .unwrap_or(0)
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    let naive = date.and_time(chrono::NaiveTime::MIN);
    naive
        .and_local_timezone(tz)
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 今天的 [start, end) 区间 (业务时区)
///
/// 返回次日零点时间戳，调用方使用 `< end` (不含) 语义。
pub fn today_range(now: i64, tz: Tz) -> (i64, i64) {
    let today = local_date(now, tz);
    let next_day = today.succ_opt().unwrap_or(today);
    (day_start_millis(today, tz), day_start_millis(next_day, tz))
}
