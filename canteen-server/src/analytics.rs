//! Analytics Aggregator - 管理端统计
//!
//! 每次变更都从全部订单、评价和扫码计数重新计算，不做增量维护。
//! "今天" 按业务时区的自然日计算。
//!
//! 计入营收的状态: placed / preparing / ready / served (已确认营收，不含取消和拒单)。

use std::collections::{BTreeMap, HashMap};

use chrono_tz::Tz;
use shared::models::{
    Analytics, Bestseller, HourlySales, Order, Rating, ScanStats, TableLeaderboardEntry,
};
use shared::util::now_millis;

use crate::message::{Subscription, spawn_listener};
use crate::orders::OrderEngine;
use crate::ratings::RatingService;
use crate::scans::ScanCounter;
use crate::store::{Collection, Store};
use crate::utils::AppResult;
use crate::utils::time::{local_hour, today_range};

/// 营业时段 (小时桶)
const FIRST_HOUR: u32 = 8;
const LAST_HOUR: u32 = 19;
const BESTSELLER_LIMIT: usize = 10;

const WATCH: &[Collection] = &[Collection::Orders, Collection::Ratings, Collection::Settings];

/// Pure aggregation over a snapshot
pub fn compute_analytics(
    orders: &[Order],
    ratings: &[Rating],
    scans: &ScanStats,
    now: i64,
    tz: Tz,
) -> Analytics {
    let (start, end) = today_range(now, tz);
    let today: Vec<&Order> = orders
        .iter()
        .filter(|o| o.created_at >= start && o.created_at < end)
        .collect();
    let committed: Vec<&Order> = today
        .iter()
        .copied()
        .filter(|o| o.status.is_revenue_bearing())
        .collect();

    let mut per_table: BTreeMap<u32, u64> = BTreeMap::new();
    let mut per_item: HashMap<&str, u64> = HashMap::new();
    for order in &committed {
        *per_table.entry(order.table_number).or_insert(0) += 1;
        for line in &order.items {
            *per_item.entry(line.name.as_str()).or_insert(0) += u64::from(line.quantity);
        }
    }

    let mut table_leaderboard: Vec<TableLeaderboardEntry> = per_table
        .into_iter()
        .map(|(table_number, orders)| TableLeaderboardEntry {
            table_number,
            orders,
        })
        .collect();
    table_leaderboard.sort_by(|a, b| {
        b.orders
            .cmp(&a.orders)
            .then(a.table_number.cmp(&b.table_number))
    });

    let mut bestsellers: Vec<Bestseller> = per_item
        .into_iter()
        .map(|(name, sold)| Bestseller {
            name: name.to_string(),
            sold,
        })
        .collect();
    bestsellers.sort_by(|a, b| b.sold.cmp(&a.sold).then_with(|| a.name.cmp(&b.name)));
    bestsellers.truncate(BESTSELLER_LIMIT);

    let hourly_sales = (FIRST_HOUR..=LAST_HOUR)
        .map(|hour| HourlySales {
            hour: format!("{}:00", hour),
            orders: committed
                .iter()
                .filter(|o| local_hour(o.created_at, tz) == hour)
                .count() as u64,
        })
        .collect();

    let rated: Vec<u64> = ratings
        .iter()
        .filter(|r| r.stars > 0)
        .map(|r| u64::from(r.stars))
        .collect();
    let average_rating = if rated.is_empty() {
        0.0
    } else {
        rated.iter().sum::<u64>() as f64 / rated.len() as f64
    };

    Analytics {
        today_orders: today.len() as u64,
        today_revenue: committed.iter().map(|o| o.total_amount).sum(),
        active_orders: orders.iter().filter(|o| o.status.is_active()).count() as u64,
        average_rating,
        table_leaderboard,
        bestsellers,
        hourly_sales,
        ratings_count: rated.len() as u64,
        total_scans: scans.total_scans,
    }
}

/// Store-backed analytics
#[derive(Clone)]
pub struct AnalyticsService {
    store: std::sync::Arc<dyn Store>,
    orders: OrderEngine,
    ratings: RatingService,
    scans: ScanCounter,
    timezone: Tz,
}

impl std::fmt::Debug for AnalyticsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsService")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}

impl AnalyticsService {
    pub fn new(
        store: std::sync::Arc<dyn Store>,
        orders: OrderEngine,
        ratings: RatingService,
        scans: ScanCounter,
        timezone: Tz,
    ) -> Self {
        Self {
            store,
            orders,
            ratings,
            scans,
            timezone,
        }
    }

    pub async fn get_analytics(&self) -> AppResult<Analytics> {
        self.get_analytics_at(now_millis()).await
    }

    pub async fn get_analytics_at(&self, now: i64) -> AppResult<Analytics> {
        let orders = self.orders.list_orders().await?;
        let ratings = self.ratings.list_ratings().await?;
        let scans = self.scans.get_scan_stats().await?;
        Ok(compute_analytics(&orders, &ratings, &scans, now, self.timezone))
    }

    /// Recompute on every order, rating or scan change
    pub async fn listen_analytics<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Analytics) + Send + Sync + 'static,
    {
        let service = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "analytics",
            WATCH,
            move || {
                let service = service.clone();
                async move { service.get_analytics().await }
            },
            callback,
        )
        .await
    }
}
