//! DetailCache: raw item-detail aspects keyed by listing id, TTL'd (spec §4.3).
//! Shipping cost is intentionally never cached here since it can change per
//! buyer location; callers always read it from the live `ListingSummary`.

use chrono::{Duration, Utc};

use crate::config::DETAIL_CACHE_TTL_HOURS;
use crate::error::Result;
use crate::types::ListingDetail;

pub struct DetailCache {
    pool: sqlx::SqlitePool,
}

impl DetailCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, item_id: &str) -> Result<Option<ListingDetail>> {
        let row: Option<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT item_specifics, title, description FROM ebay_item_cache WHERE ebay_item_id = ? AND expires_at > ?",
        )
        .bind(item_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;

        let Some((specifics_json, title, description)) = row else { return Ok(None) };
        let raw_aspects: Vec<(String, String)> = serde_json::from_str(&specifics_json)?;
        Ok(Some(ListingDetail { raw_aspects, title, description, category_id: None }))
    }

    pub async fn put(&self, item_id: &str, detail: &ListingDetail) -> Result<()> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(DETAIL_CACHE_TTL_HOURS);
        let specifics_json = serde_json::to_string(&detail.raw_aspects)?;
        sqlx::query(
            r#"
            INSERT INTO ebay_item_cache (ebay_item_id, item_specifics, title, description, fetched_at, expires_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(ebay_item_id) DO UPDATE SET
                item_specifics = excluded.item_specifics,
                title = excluded.title,
                description = excluded.description,
                fetched_at = excluded.fetched_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(item_id)
        .bind(specifics_json)
        .bind(&detail.title)
        .bind(&detail.description)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn sweep_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM ebay_item_cache WHERE expires_at < ?")
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    fn sample_detail() -> ListingDetail {
        ListingDetail {
            raw_aspects: vec![("Metal".to_string(), "Gold".to_string())],
            title: "14K Gold Ring".to_string(),
            description: Some("A ring".to_string()),
            category_id: Some("261995".to_string()),
        }
    }

    #[tokio::test]
    async fn miss_then_put_then_hit() {
        let cache = DetailCache::new(test_pool().await);
        assert!(cache.get("A").await.unwrap().is_none());
        cache.put("A", &sample_detail()).await.unwrap();
        let got = cache.get("A").await.unwrap().unwrap();
        assert_eq!(got.title, "14K Gold Ring");
        assert_eq!(got.raw_aspects.len(), 1);
    }

    #[tokio::test]
    async fn put_overwrites_existing_entry() {
        let cache = DetailCache::new(test_pool().await);
        cache.put("A", &sample_detail()).await.unwrap();
        let mut updated = sample_detail();
        updated.title = "18K Gold Ring".to_string();
        cache.put("A", &updated).await.unwrap();
        let got = cache.get("A").await.unwrap().unwrap();
        assert_eq!(got.title, "18K Gold Ring");
    }
}
