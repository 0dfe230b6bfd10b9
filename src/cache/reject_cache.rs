//! RejectCache: `(task_id, listing_id) -> rejection_reason` with TTL (spec §4.3).

use chrono::{Duration, Utc};
use std::collections::HashSet;

use crate::config::REJECT_CACHE_TTL_HOURS;
use crate::error::Result;

pub struct RejectCache {
    pool: sqlx::SqlitePool,
}

impl RejectCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn is_rejected(&self, task_id: i64, listing_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM rejected_items WHERE task_id = ? AND ebay_listing_id = ? AND expires_at > ?",
        )
        .bind(task_id)
        .bind(listing_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn reject(&self, task_id: i64, listing_id: &str, reason: &str) -> Result<()> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(REJECT_CACHE_TTL_HOURS);
        sqlx::query(
            r#"
            INSERT INTO rejected_items (task_id, ebay_listing_id, rejection_reason, rejected_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(task_id, ebay_listing_id) DO UPDATE SET
                rejection_reason = excluded.rejection_reason,
                rejected_at = excluded.rejected_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(task_id)
        .bind(listing_id)
        .bind(reason)
        .bind(now.to_rfc3339())
        .bind(expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Pre-loads the full skip list for a task, used once per task-poll.
    pub async fn list_rejected(&self, task_id: i64) -> Result<HashSet<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT ebay_listing_id FROM rejected_items WHERE task_id = ? AND expires_at > ?",
        )
        .bind(task_id)
        .bind(Utc::now().to_rfc3339())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Deletes expired rows; returns the number removed. Called by CleanupSweeper.
    pub async fn sweep_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM rejected_items WHERE expires_at < ?")
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

    #[tokio::test]
    async fn reject_then_is_rejected() {
        let cache = RejectCache::new(test_pool().await);
        assert!(!cache.is_rejected(1, "A").await.unwrap());
        cache.reject(1, "A", "Plated").await.unwrap();
        assert!(cache.is_rejected(1, "A").await.unwrap());
    }

    #[tokio::test]
    async fn list_rejected_returns_skip_set() {
        let cache = RejectCache::new(test_pool().await);
        cache.reject(1, "A", "Plated").await.unwrap();
        cache.reject(1, "B", "Base metal").await.unwrap();
        cache.reject(2, "C", "Other task").await.unwrap();
        let set = cache.list_rejected(1).await.unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.contains("A"));
        assert!(set.contains("B"));
    }

    #[tokio::test]
    async fn reupsert_overwrites_reason() {
        let cache = RejectCache::new(test_pool().await);
        cache.reject(1, "A", "first").await.unwrap();
        cache.reject(1, "A", "second").await.unwrap();
        let set = cache.list_rejected(1).await.unwrap();
        assert_eq!(set.len(), 1);
    }
}
