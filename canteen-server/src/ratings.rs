//! Rating Subsystem - 订单评价
//!
//! 只有已上桌 (served) 且未评价过的订单可以评价；评价写入后不可修改。

use std::sync::Arc;

use serde_json::{Map, Value};
use shared::models::{OrderStatus, Rating, RatingInput};
use shared::util::now_millis;

use crate::message::{Subscription, spawn_listener};
use crate::orders::OrderEngine;
use crate::store::{Collection, Store, decode_all, encode};
use crate::utils::{AppError, AppResult, ErrorCode};

const WATCH: &[Collection] = &[Collection::Ratings];

/// 评论最大长度 (字符)
const MAX_COMMENT_CHARS: usize = 500;

#[derive(Clone)]
pub struct RatingService {
    store: Arc<dyn Store>,
    orders: OrderEngine,
}

impl std::fmt::Debug for RatingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RatingService").finish_non_exhaustive()
    }
}

impl RatingService {
    pub fn new(store: Arc<dyn Store>, orders: OrderEngine) -> Self {
        Self { store, orders }
    }

    /// Rate a served order
    pub async fn submit_order_rating(&self, order_id: &str, input: RatingInput) -> AppResult<Rating> {
        self.submit_order_rating_at(order_id, input, now_millis()).await
    }

    pub async fn submit_order_rating_at(
        &self,
        order_id: &str,
        input: RatingInput,
        now: i64,
    ) -> AppResult<Rating> {
        let order = self.orders.get_order(order_id).await?.ok_or_else(|| {
            AppError::with_message(ErrorCode::OrderNotFound, format!("Order not found: {}", order_id))
                .with_detail("orderId", order_id)
        })?;

        if order.status != OrderStatus::Served {
            return Err(AppError::new(ErrorCode::OrderNotServed)
                .with_detail("status", order.status.as_str()));
        }
        if order.rating_id.is_some() {
            return Err(AppError::new(ErrorCode::OrderAlreadyRated));
        }
        if !(1..=5).contains(&input.stars) {
            return Err(AppError::with_message(
                ErrorCode::InvalidRating,
                "Stars must be between 1 and 5",
            )
            .with_detail("stars", input.stars));
        }

        let mut rating = Rating {
            id: String::new(),
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            table_number: order.table_number,
            stars: input.stars,
            tags: input
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            comment: input.comment.trim().chars().take(MAX_COMMENT_CHARS).collect(),
            created_at: now,
        };

        let mut doc = encode(&rating)?;
        if let Value::Object(map) = &mut doc {
            map.remove("id");
        }
        rating.id = self.store.insert(Collection::Ratings, doc).await?;

        // 回写订单的 ratingId
        let mut link = Map::new();
        link.insert("ratingId".into(), Value::String(rating.id.clone()));
        link.insert("updatedAt".into(), Value::from(now));
        self.store.update(Collection::Orders, order_id, link).await?;

        tracing::info!(
            order_id = %order_id,
            rating_id = %rating.id,
            stars = rating.stars,
            "Order rated"
        );
        Ok(rating)
    }

    /// All ratings, newest first
    pub async fn list_ratings(&self) -> AppResult<Vec<Rating>> {
        let docs = self.store.list(Collection::Ratings).await?;
        let mut ratings: Vec<Rating> = decode_all(Collection::Ratings, docs);
        ratings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(ratings)
    }

    pub async fn listen_ratings<C>(&self, callback: C) -> Subscription
    where
        C: Fn(Vec<Rating>) + Send + Sync + 'static,
    {
        let service = self.clone();
        spawn_listener(
            self.store.as_ref(),
            "ratings",
            WATCH,
            move || {
                let service = service.clone();
                async move { service.list_ratings().await }
            },
            callback,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ChangeBus;
    use crate::store::LocalStore;
    use crate::tables::TableRegistry;
    use crate::utils::time::DEFAULT_TIMEZONE;
    use shared::models::{Order, OrderLine};

    const NOON: i64 = 1_768_458_600_000;

    fn setup() -> (OrderEngine, RatingService) {
        let store: Arc<dyn Store> = Arc::new(LocalStore::open_in_memory(ChangeBus::new()).unwrap());
        let orders = OrderEngine::new(
            store.clone(),
            TableRegistry::new(store.clone()),
            DEFAULT_TIMEZONE,
            15,
        );
        (orders.clone(), RatingService::new(store, orders))
    }

    async fn order_in(orders: &OrderEngine, status: OrderStatus) -> Order {
        let order = orders
            .place_order_at(
                1,
                vec![OrderLine {
                    id: "tea".into(),
                    name: "Tea".into(),
                    price: 10,
                    quantity: 1,
                }],
                10,
                NOON,
            )
            .await
            .unwrap();
        let path: &[OrderStatus] = match status {
            OrderStatus::Placed => &[],
            OrderStatus::Preparing => &[OrderStatus::Preparing],
            _ => &[OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Served],
        };
        for next in path {
            orders.update_order_status_at(&order.id, *next, NOON + 1).await.unwrap();
        }
        orders.get_order(&order.id).await.unwrap().unwrap()
    }

    fn stars(stars: u8) -> RatingInput {
        RatingInput {
            stars,
            tags: vec!["Tasty".into(), "  ".into()],
            comment: "  good chai ".into(),
        }
    }

    #[tokio::test]
    async fn test_rating_a_served_order() {
        let (orders, ratings) = setup();
        let order = order_in(&orders, OrderStatus::Served).await;

        let rating = ratings.submit_order_rating_at(&order.id, stars(5), NOON + 2).await.unwrap();
        assert_eq!(rating.order_number, order.order_number);
        assert_eq!(rating.tags, vec!["Tasty".to_string()]);
        assert_eq!(rating.comment, "good chai");

        let order = orders.get_order(&order.id).await.unwrap().unwrap();
        assert_eq!(order.rating_id.as_deref(), Some(rating.id.as_str()));
        assert_eq!(order.updated_at, NOON + 2);

        let listed = ratings.list_ratings().await.unwrap();
        assert_eq!(listed, vec![rating]);
    }

    #[tokio::test]
    async fn test_rating_unserved_order_creates_nothing() {
        let (orders, ratings) = setup();
        let order = order_in(&orders, OrderStatus::Preparing).await;

        let err = ratings.submit_order_rating_at(&order.id, stars(4), NOON).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotServed);
        assert!(ratings.list_ratings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_rating_rejected() {
        let (orders, ratings) = setup();
        let order = order_in(&orders, OrderStatus::Served).await;
        ratings.submit_order_rating_at(&order.id, stars(4), NOON).await.unwrap();

        let err = ratings.submit_order_rating_at(&order.id, stars(1), NOON).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyRated);
        assert_eq!(ratings.list_ratings().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_star_range_and_missing_order() {
        let (orders, ratings) = setup();
        let order = order_in(&orders, OrderStatus::Served).await;

        for bad in [0, 6] {
            let err = ratings.submit_order_rating_at(&order.id, stars(bad), NOON).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidRating);
        }

        let err = ratings.submit_order_rating_at("ghost", stars(3), NOON).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderNotFound);
    }
}
