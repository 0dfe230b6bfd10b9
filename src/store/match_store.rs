//! MatchStore (spec §4.6): idempotent insert of accepted listings, and the
//! notification-tracking fields `RetryPass` and `ReactionReceiver` touch.

use sqlx::FromRow;

use crate::error::{AppError, Result};
use crate::pipeline::{gemstone::GemstoneComputed, jewelry::JewelryComputed, watch::WatchComputed};
use crate::types::{ItemType, ListingSummary, MatchCommon, MatchStatus, Task};

pub struct MatchStore {
    pool: sqlx::SqlitePool,
}

#[derive(Debug, FromRow)]
pub struct UnsentRow {
    pub id: i64,
    pub task_id: i64,
    pub ebay_title: String,
    pub ebay_url: String,
    pub listed_price: f64,
    pub shipping_cost: Option<f64>,
    pub found_at: String,
    pub item_creation_date: Option<String>,
    pub slack_channel: Option<String>,
    pub slack_channel_id: Option<String>,
    pub karat: Option<i64>,
    pub weight_g: Option<f64>,
    pub melt_value: Option<f64>,
    pub suggested_offer: Option<f64>,
    pub deal_score: Option<i64>,
    pub risk_score: Option<i64>,
    pub stone_type: Option<String>,
    pub shape: Option<String>,
    pub colour: Option<String>,
    pub clarity: Option<String>,
    pub cert_lab: Option<String>,
    pub carat: Option<f64>,
}

impl MatchStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, item_type: ItemType, task_id: i64, listing_id: &str) -> Result<bool> {
        let table = table_name(item_type);
        let sql = format!("SELECT 1 FROM {table} WHERE task_id = ? AND ebay_listing_id = ?");
        let row: Option<(i64,)> = sqlx::query_as(&sql)
            .bind(task_id)
            .bind(listing_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn insert_jewelry(
        &self,
        task: &Task,
        listing: &ListingSummary,
        computed: &JewelryComputed,
    ) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO matches_jewelry (
                task_id, user_id, ebay_listing_id, ebay_title, ebay_url, listed_price, shipping_cost,
                currency, buy_format, seller_feedback, found_at, item_creation_date, status,
                notification_sent, karat, weight_g, metal_type, melt_value, profit_scrap, break_even, suggested_offer
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&listing.item_id)
        .bind(&listing.title)
        .bind(&listing.listing_url)
        .bind(listing.price)
        .bind(listing.shipping_cost)
        .bind(&listing.currency)
        .bind(listing.listing_type.clone())
        .bind(listing.seller.feedback_score)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(listing.item_creation_date.map(|d| d.to_rfc3339()))
        .bind(MatchStatus::New.as_str())
        .bind(computed.karat as i64)
        .bind(computed.weight_g)
        .bind(&computed.metal_type)
        .bind(computed.melt_value)
        .bind(computed.profit_scrap)
        .bind(computed.break_even)
        .bind(computed.suggested_offer)
        .execute(&self.pool)
        .await;

        handle_insert_conflict(result)
    }

    pub async fn insert_gemstone(
        &self,
        task: &Task,
        listing: &ListingSummary,
        computed: &GemstoneComputed,
    ) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO matches_gemstone (
                task_id, user_id, ebay_listing_id, ebay_title, ebay_url, listed_price, shipping_cost,
                currency, buy_format, seller_feedback, found_at, item_creation_date, status,
                notification_sent, stone_type, shape, carat, colour, clarity, cert_lab, treatment,
                is_natural, deal_score, risk_score
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&listing.item_id)
        .bind(&listing.title)
        .bind(&listing.listing_url)
        .bind(listing.price)
        .bind(listing.shipping_cost)
        .bind(&listing.currency)
        .bind(listing.listing_type.clone())
        .bind(listing.seller.feedback_score)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(listing.item_creation_date.map(|d| d.to_rfc3339()))
        .bind(MatchStatus::New.as_str())
        .bind(&computed.stone_type)
        .bind(&computed.shape)
        .bind(computed.carat)
        .bind(&computed.colour)
        .bind(&computed.clarity)
        .bind(&computed.cert_lab)
        .bind(&computed.treatment)
        .bind(computed.is_natural)
        .bind(computed.deal_score as i64)
        .bind(computed.risk_score as i64)
        .execute(&self.pool)
        .await;

        handle_insert_conflict(result)
    }

    pub async fn insert_watch(
        &self,
        task: &Task,
        listing: &ListingSummary,
        computed: &WatchComputed,
    ) -> Result<Option<i64>> {
        let result = sqlx::query(
            r#"
            INSERT INTO matches_watch (
                task_id, user_id, ebay_listing_id, ebay_title, ebay_url, listed_price, shipping_cost,
                currency, buy_format, seller_feedback, found_at, item_creation_date, status,
                notification_sent, case_material, band_material, movement, dial_color, year, brand, model
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task.id)
        .bind(task.user_id)
        .bind(&listing.item_id)
        .bind(&listing.title)
        .bind(&listing.listing_url)
        .bind(listing.price)
        .bind(listing.shipping_cost)
        .bind(&listing.currency)
        .bind(listing.listing_type.clone())
        .bind(listing.seller.feedback_score)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(listing.item_creation_date.map(|d| d.to_rfc3339()))
        .bind(MatchStatus::New.as_str())
        .bind(&computed.case_material)
        .bind(&computed.band_material)
        .bind(&computed.movement)
        .bind(&computed.dial_color)
        .bind(computed.year)
        .bind(&computed.brand)
        .bind(&computed.model)
        .execute(&self.pool)
        .await;

        handle_insert_conflict(result)
    }

    pub async fn update_notification(
        &self,
        item_type: ItemType,
        id: i64,
        slack_message_ts: Option<&str>,
        slack_channel_id: Option<&str>,
    ) -> Result<()> {
        let table = table_name(item_type);
        let sql = format!(
            "UPDATE {table} SET notification_sent = 1, slack_message_ts = ?, slack_channel_id = ? WHERE id = ?"
        );
        sqlx::query(&sql)
            .bind(slack_message_ts)
            .bind(slack_channel_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_status(&self, item_type: ItemType, slack_channel_id: &str, slack_message_ts: &str, status: MatchStatus) -> Result<bool> {
        let table = table_name(item_type);
        let sql = format!(
            "UPDATE {table} SET status = ? WHERE slack_channel_id = ? AND slack_message_ts = ?"
        );
        let result = sqlx::query(&sql)
            .bind(status.as_str())
            .bind(slack_channel_id)
            .bind(slack_message_ts)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Rows with `notification_sent = false`, oldest-first reversed per spec (found_at desc), capped.
    pub async fn list_unsent(&self, item_type: ItemType, limit: i64) -> Result<Vec<UnsentRow>> {
        let sql = match item_type {
            ItemType::Jewelry => {
                r#"
                SELECT m.id, m.task_id, m.ebay_title, m.ebay_url, m.listed_price, m.shipping_cost,
                       m.found_at, m.item_creation_date, t.slack_channel, t.slack_channel_id,
                       m.karat, m.weight_g, m.melt_value, m.suggested_offer,
                       NULL as deal_score, NULL as risk_score,
                       NULL as stone_type, NULL as shape, NULL as colour, NULL as clarity, NULL as cert_lab, NULL as carat
                FROM matches_jewelry m JOIN tasks t ON t.id = m.task_id
                WHERE m.notification_sent = 0
                ORDER BY m.found_at DESC LIMIT ?
                "#
            }
            ItemType::Gemstone => {
                r#"
                SELECT m.id, m.task_id, m.ebay_title, m.ebay_url, m.listed_price, m.shipping_cost,
                       m.found_at, m.item_creation_date, t.slack_channel, t.slack_channel_id,
                       NULL as karat, NULL as weight_g, NULL as melt_value, NULL as suggested_offer,
                       m.deal_score, m.risk_score,
                       m.stone_type, m.shape, m.colour, m.clarity, m.cert_lab, m.carat
                FROM matches_gemstone m JOIN tasks t ON t.id = m.task_id
                WHERE m.notification_sent = 0
                ORDER BY m.found_at DESC LIMIT ?
                "#
            }
            ItemType::Watch => {
                return Err(AppError::DataError("watch matches are not retried for notification".to_string()));
            }
        };

        let rows = sqlx::query_as::<_, UnsentRow>(sql).bind(limit).fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

fn table_name(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Jewelry => "matches_jewelry",
        ItemType::Gemstone => "matches_gemstone",
        ItemType::Watch => "matches_watch",
    }
}

fn handle_insert_conflict(result: std::result::Result<sqlx::sqlite::SqliteQueryResult, sqlx::Error>) -> Result<Option<i64>> {
    match result {
        Ok(r) => Ok(Some(r.last_insert_rowid())),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

pub fn match_common_from_row(row: &UnsentRow) -> MatchCommon {
    MatchCommon {
        task_id: row.task_id,
        user_id: 0,
        ebay_listing_id: String::new(),
        ebay_title: row.ebay_title.clone(),
        ebay_url: row.ebay_url.clone(),
        listed_price: row.listed_price,
        shipping_cost: row.shipping_cost,
        currency: "USD".to_string(),
        buy_format: crate::types::BuyFormat::FixedPrice,
        seller_feedback: 0,
        found_at: chrono::DateTime::parse_from_rfc3339(&row.found_at)
            .map(|d| d.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        item_creation_date: row
            .item_creation_date
            .as_deref()
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&chrono::Utc)),
        status: MatchStatus::New,
        notification_sent: false,
        slack_message_ts: None,
        slack_channel_id: row.slack_channel_id.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyFormat, Condition, FilterBag, ItemType, JewelryFilters, SellerInfo, ShippingType, TaskStatus};
    use std::collections::HashSet;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        sqlx::query("INSERT INTO tasks (id, user_id, name, item_type) VALUES (1, 1, 'hunt', 'jewelry')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn task() -> Task {
        Task {
            id: 1,
            user_id: 1,
            name: "hunt".to_string(),
            item_type: ItemType::Jewelry,
            status: TaskStatus::Active,
            min_price: 0.0,
            max_price: 500.0,
            min_seller_feedback: 0,
            listing_format: HashSet::from([BuyFormat::FixedPrice]),
            exclude_keywords: HashSet::new(),
            conditions: HashSet::<Condition>::new(),
            filters: FilterBag::Jewelry(JewelryFilters::default()),
            poll_interval_secs: 60,
            min_profit_margin: -50.0,
            last_run: None,
            slack_channel: None,
            slack_channel_id: None,
        }
    }

    fn listing() -> ListingSummary {
        ListingSummary {
            item_id: "A".to_string(),
            title: "14K Gold Ring".to_string(),
            price: 100.0,
            currency: "USD".to_string(),
            shipping_cost: Some(5.0),
            shipping_type: ShippingType::Fixed,
            condition: None,
            listing_url: "https://example.com/A".to_string(),
            listing_type: "FIXED_PRICE".to_string(),
            seller: SellerInfo { name: "s".to_string(), feedback_score: 100, feedback_percentage: 99.0 },
            buying_options: vec!["FIXED_PRICE".to_string()],
            item_creation_date: None,
            category_id: None,
            returns_accepted: None,
        }
    }

    fn jewelry_computed() -> JewelryComputed {
        JewelryComputed {
            karat: 14,
            weight_g: 5.5,
            metal_type: "gold".to_string(),
            melt_value: 220.0,
            profit_scrap: 50.0,
            break_even: 213.4,
            suggested_offer: 187.0,
        }
    }

    #[tokio::test]
    async fn insert_then_exists_then_duplicate_is_none() {
        let store = MatchStore::new(test_pool().await);
        assert!(!store.exists(ItemType::Jewelry, 1, "A").await.unwrap());

        let id = store.insert_jewelry(&task(), &listing(), &jewelry_computed()).await.unwrap();
        assert!(id.is_some());
        assert!(store.exists(ItemType::Jewelry, 1, "A").await.unwrap());

        let dup = store.insert_jewelry(&task(), &listing(), &jewelry_computed()).await.unwrap();
        assert!(dup.is_none());
    }

    #[tokio::test]
    async fn list_unsent_then_update_notification_clears_it() {
        let store = MatchStore::new(test_pool().await);
        let id = store.insert_jewelry(&task(), &listing(), &jewelry_computed()).await.unwrap().unwrap();

        let unsent = store.list_unsent(ItemType::Jewelry, 10).await.unwrap();
        assert_eq!(unsent.len(), 1);
        assert_eq!(unsent[0].id, id);

        store.update_notification(ItemType::Jewelry, id, Some("123.456"), Some("C1")).await.unwrap();
        let unsent = store.list_unsent(ItemType::Jewelry, 10).await.unwrap();
        assert!(unsent.is_empty());
    }

    #[tokio::test]
    async fn update_status_by_slack_coordinates() {
        let store = MatchStore::new(test_pool().await);
        let id = store.insert_jewelry(&task(), &listing(), &jewelry_computed()).await.unwrap().unwrap();
        store.update_notification(ItemType::Jewelry, id, Some("123.456"), Some("C1")).await.unwrap();

        let updated = store
            .update_status(ItemType::Jewelry, "C1", "123.456", MatchStatus::Purchased)
            .await
            .unwrap();
        assert!(updated);
    }
}
