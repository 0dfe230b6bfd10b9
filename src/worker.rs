//! Worker: the long-lived container holding every piece of process-wide
//! mutable state the scheduler and webhook router share (spec §4.13).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::api::health::HealthState;
use crate::cache::{DetailCache, MetalPriceCache, RejectCache};
use crate::config::Config;
use crate::credentials::CredentialPool;
use crate::marketplace_client::{DetailFetcher, HttpMarketplaceClient};
use crate::notifier::Notifier;
use crate::pagination::PaginationCursor;
use crate::search::HttpSearchAdapter;
use crate::store::{MatchStore, TaskStore};

pub struct Worker {
    pub db: sqlx::SqlitePool,
    pub config: Config,
    pub credentials: Arc<CredentialPool>,
    pub reject_cache: RejectCache,
    pub detail_cache: Arc<DetailCache>,
    pub metal_prices: MetalPriceCache,
    pub pagination: PaginationCursor,
    pub notified_test_listings: Mutex<HashSet<String>>,
    pub health: Arc<HealthState>,
    pub task_store: TaskStore,
    pub match_store: MatchStore,
    pub search_adapter: HttpSearchAdapter,
    pub detail_fetcher: DetailFetcher<HttpMarketplaceClient>,
    pub notifier: Notifier,
}

impl Worker {
    pub async fn new(config: Config, db: sqlx::SqlitePool) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let credentials = Arc::new(CredentialPool::load(db.clone(), config.ebay_oauth_url.clone()).await?);
        let detail_cache = Arc::new(DetailCache::new(db.clone()));
        let marketplace_client = HttpMarketplaceClient::new(config.ebay_item_api_url.clone());
        let detail_fetcher = DetailFetcher::new(marketplace_client, credentials.clone(), detail_cache.clone());
        let search_adapter = HttpSearchAdapter::new(http.clone(), format!("{}/search", config.ebay_item_api_url));
        let notifier = Notifier::new(
            http.clone(),
            config.slack_api_url.clone(),
            config.slack_bot_token.clone(),
            config.slack_webhook_url.clone(),
        );

        Ok(Self {
            reject_cache: RejectCache::new(db.clone()),
            metal_prices: MetalPriceCache::new(db.clone()),
            task_store: TaskStore::new(db.clone()),
            match_store: MatchStore::new(db.clone()),
            pagination: PaginationCursor::new(),
            notified_test_listings: Mutex::new(HashSet::new()),
            health: Arc::new(HealthState::new()),
            detail_cache,
            credentials,
            search_adapter,
            detail_fetcher,
            notifier,
            config,
            db,
        })
    }

    /// TestBypass check (spec §4.5): listing seller matches the configured
    /// test identity. Suppresses duplicate notifications for the process
    /// lifetime rather than via RejectCache/MatchStore, per §9 NotifiedTestSet.
    pub fn is_test_seller(&self, seller_name: &str) -> bool {
        self.config
            .test_seller_username
            .as_deref()
            .is_some_and(|configured| configured.eq_ignore_ascii_case(seller_name))
    }

    pub fn mark_test_listing_notified(&self, listing_id: &str) -> bool {
        self.notified_test_listings.lock().unwrap().insert(listing_id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            database_url: "sqlite::memory:".to_string(),
            log_level: "info".to_string(),
            webhook_port: 3000,
            poll_interval_ms: 60_000,
            slack_bot_token: None,
            slack_webhook_url: None,
            default_slack_channel: None,
            slack_invite_users: vec![],
            test_seller_username: Some("QaTester".to_string()),
            ebay_oauth_url: "https://example.com/oauth".to_string(),
            ebay_item_api_url: "https://example.com/item".to_string(),
            slack_api_url: "https://slack.com/api".to_string(),
        }
    }

    #[tokio::test]
    async fn test_seller_match_is_case_insensitive() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let worker = Worker::new(test_config(), pool).await.unwrap();
        assert!(worker.is_test_seller("qatester"));
        assert!(!worker.is_test_seller("realseller"));
    }

    #[tokio::test]
    async fn notified_test_listings_dedupes_within_lifetime() {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();
        let worker = Worker::new(test_config(), pool).await.unwrap();
        assert!(worker.mark_test_listing_notified("A"));
        assert!(!worker.mark_test_listing_notified("A"));
    }
}
