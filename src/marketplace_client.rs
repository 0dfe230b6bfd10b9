//! MarketplaceClient (spec §6.1) and DetailFetcher (spec §4.2): fetches raw
//! item detail over HTTP with cache-first reads and one 429 retry.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use crate::cache::DetailCache;
use crate::credentials::CredentialPool;
use crate::error::Result;
use crate::types::ListingDetail;

#[async_trait]
pub trait MarketplaceClient: Send + Sync {
    async fn fetch_raw_detail(&self, item_id: &str, token: &str) -> Result<FetchOutcome>;
}

pub enum FetchOutcome {
    Found(ListingDetail),
    NotFound,
    RateLimited,
}

#[derive(Debug, Deserialize)]
struct ItemResponse {
    title: String,
    #[serde(rename = "shortDescription")]
    description: Option<String>,
    #[serde(rename = "categoryId")]
    category_id: Option<String>,
    #[serde(default)]
    #[serde(rename = "localizedAspects")]
    aspects: Vec<Aspect>,
}

#[derive(Debug, Deserialize)]
struct Aspect {
    name: String,
    value: String,
}

pub struct HttpMarketplaceClient {
    http: reqwest::Client,
    item_api_url: String,
}

impl HttpMarketplaceClient {
    pub fn new(item_api_url: String) -> Self {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(20)).build().expect("client builds");
        Self { http, item_api_url }
    }
}

#[async_trait]
impl MarketplaceClient for HttpMarketplaceClient {
    async fn fetch_raw_detail(&self, item_id: &str, token: &str) -> Result<FetchOutcome> {
        let url = format!("{}/{}", self.item_api_url, item_id);
        let resp = self.http.get(&url).bearer_auth(token).send().await?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(FetchOutcome::RateLimited);
        }
        if !resp.status().is_success() {
            return Ok(FetchOutcome::NotFound);
        }

        let parsed: ItemResponse = resp.json().await?;
        Ok(FetchOutcome::Found(ListingDetail {
            raw_aspects: parsed.aspects.into_iter().map(|a| (a.name, a.value)).collect(),
            title: parsed.title,
            description: parsed.description,
            category_id: parsed.category_id,
        }))
    }
}

pub struct DetailFetcher<C: MarketplaceClient> {
    client: C,
    credentials: std::sync::Arc<CredentialPool>,
    cache: std::sync::Arc<DetailCache>,
}

impl<C: MarketplaceClient> DetailFetcher<C> {
    pub fn new(client: C, credentials: std::sync::Arc<CredentialPool>, cache: std::sync::Arc<DetailCache>) -> Self {
        Self { client, credentials, cache }
    }

    /// When `include_shipping` is true the listing summary had no shipping
    /// cost, so the cache (which doesn't carry shipping data) is skipped and
    /// a fresh detail is fetched instead.
    pub async fn fetch(&self, item_id: &str, include_shipping: bool) -> Result<Option<ListingDetail>> {
        if !include_shipping {
            if let Some(cached) = self.cache.get(item_id).await? {
                return Ok(Some(cached));
            }
        }

        let token = self.credentials.acquire_token().await?;
        match self.client.fetch_raw_detail(item_id, &token).await? {
            FetchOutcome::Found(detail) => {
                self.cache.put(item_id, &detail).await?;
                Ok(Some(detail))
            }
            FetchOutcome::NotFound => Ok(None),
            FetchOutcome::RateLimited => {
                if let Some(label) = self.credentials.current_credential_label() {
                    self.credentials.mark_rate_limited(&label).await?;
                }
                let retry_token = self.credentials.acquire_token().await?;
                match self.client.fetch_raw_detail(item_id, &retry_token).await? {
                    FetchOutcome::Found(detail) => {
                        self.cache.put(item_id, &detail).await?;
                        Ok(Some(detail))
                    }
                    FetchOutcome::NotFound => Ok(None),
                    FetchOutcome::RateLimited => {
                        warn!(item_id, "detail fetch rate limited twice in a row, abandoning for this cycle");
                        Ok(None)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeClient {
        calls: AtomicUsize,
        outcomes: Vec<FetchOutcomeKind>,
    }

    #[derive(Clone, Copy)]
    enum FetchOutcomeKind {
        Found,
        RateLimited,
    }

    #[async_trait]
    impl MarketplaceClient for FakeClient {
        async fn fetch_raw_detail(&self, _item_id: &str, _token: &str) -> Result<FetchOutcome> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.outcomes.get(i).copied().unwrap_or(FetchOutcomeKind::Found) {
                FetchOutcomeKind::Found => Ok(FetchOutcome::Found(ListingDetail {
                    raw_aspects: vec![],
                    title: "Test Item".to_string(),
                    description: None,
                    category_id: None,
                })),
                FetchOutcomeKind::RateLimited => Ok(FetchOutcome::RateLimited),
            }
        }
    }

    async fn test_pool() -> sqlx::SqlitePool {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn cache_hit_skips_client_entirely() {
        let pool = test_pool().await;
        let cache = Arc::new(DetailCache::new(pool.clone()));
        cache
            .put(
                "A",
                &ListingDetail { raw_aspects: vec![], title: "Cached".to_string(), description: None, category_id: None },
            )
            .await
            .unwrap();
        let credentials = Arc::new(CredentialPool::load(pool, "https://example.com/oauth".to_string()).await.unwrap());
        let client = FakeClient { calls: AtomicUsize::new(0), outcomes: vec![] };
        let fetcher = DetailFetcher::new(client, credentials, cache);
        let result = fetcher.fetch("A", false).await.unwrap().unwrap();
        assert_eq!(result.title, "Cached");
        assert_eq!(fetcher.client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn include_shipping_bypasses_cache_hit() {
        let pool = test_pool().await;
        let cache = Arc::new(DetailCache::new(pool.clone()));
        cache
            .put(
                "A",
                &ListingDetail { raw_aspects: vec![], title: "Cached".to_string(), description: None, category_id: None },
            )
            .await
            .unwrap();
        let credentials = Arc::new(CredentialPool::load(pool, "https://example.com/oauth".to_string()).await.unwrap());
        let client = FakeClient { calls: AtomicUsize::new(0), outcomes: vec![FetchOutcomeKind::Found] };
        let fetcher = DetailFetcher::new(client, credentials, cache);
        let result = fetcher.fetch("A", true).await.unwrap().unwrap();
        assert_eq!(result.title, "Test Item");
        assert_eq!(fetcher.client.calls.load(Ordering::SeqCst), 1);
    }
}
