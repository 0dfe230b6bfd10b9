//! MetalPriceCache: TTL-refreshed per-gram spot prices per metal (spec §4.3, §4.5.2).
//! Prices are written by an external job into the `metal_prices` table; this
//! cache just guards against hammering that table on every listing check.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;

use crate::config::METAL_PRICE_CACHE_TTL_SECS;
use crate::error::Result;
use crate::types::MetalPrices;

struct Entry {
    prices: MetalPrices,
    fetched_at: chrono::DateTime<Utc>,
}

pub struct MetalPriceCache {
    pool: sqlx::SqlitePool,
    entries: RwLock<HashMap<String, Entry>>,
}

impl MetalPriceCache {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, metal: &str) -> Result<Option<MetalPrices>> {
        if let Some(entry) = self.entries.read().unwrap().get(metal) {
            let age = Utc::now().signed_duration_since(entry.fetched_at).num_seconds();
            if age < METAL_PRICE_CACHE_TTL_SECS {
                return Ok(Some(entry.prices.clone()));
            }
        }

        let row: Option<(f64, f64, f64, f64)> = sqlx::query_as(
            "SELECT price_gram_10k, price_gram_14k, price_gram_18k, price_gram_24k FROM metal_prices WHERE metal = ?",
        )
        .bind(metal)
        .fetch_optional(&self.pool)
        .await?;

        let Some((p10, p14, p18, p24)) = row else { return Ok(None) };
        let prices = MetalPrices {
            price_gram_10k: p10,
            price_gram_14k: p14,
            price_gram_18k: p18,
            price_gram_24k: p24,
        };
        self.entries
            .write()
            .unwrap()
            .insert(metal.to_string(), Entry { prices: prices.clone(), fetched_at: Utc::now() });
        Ok(Some(prices))
    }

    pub fn invalidate(&self, metal: &str) {
        self.entries.write().unwrap().remove(metal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        sqlx::query(
            "INSERT INTO metal_prices (metal, price_gram_10k, price_gram_14k, price_gram_18k, price_gram_24k, updated_at) VALUES ('gold', 28.0, 40.0, 52.0, 70.0, ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn get_returns_row_then_caches() {
        let cache = MetalPriceCache::new(test_pool().await);
        let prices = cache.get("gold").await.unwrap().unwrap();
        assert_eq!(prices.price_gram_14k, 40.0);
        assert!(cache.get("silver").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let cache = MetalPriceCache::new(test_pool().await);
        cache.get("gold").await.unwrap();
        cache.invalidate("gold");
        assert!(cache.entries.read().unwrap().get("gold").is_none());
    }
}
