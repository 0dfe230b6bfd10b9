use crate::error::{AppError, Result};

/// Default marketplace OAuth token endpoint.
pub const EBAY_OAUTH_URL: &str = "https://api.ebay.com/identity/v1/oauth2/token";
/// Default marketplace item-detail endpoint (item id is appended).
pub const EBAY_ITEM_API_URL: &str = "https://api.ebay.com/buy/browse/v1/item";
/// Default chat-bot API base (Slack Web API).
pub const SLACK_API_URL: &str = "https://slack.com/api";

/// Inter-task delay within a poll cycle (§4.11).
pub const INTER_TASK_DELAY_SECS: u64 = 3;
/// Inter-metal-search delay within a single jewelry task (§4.11).
pub const INTER_METAL_SEARCH_DELAY_SECS: u64 = 5;
/// Minimum spacing between successful notifier sends, global to the worker (§4.7 / §8).
pub const NOTIFIER_MIN_SPACING_MS: u64 = 1100;

/// RejectCache row TTL (§3, §4.3).
pub const REJECT_CACHE_TTL_HOURS: i64 = 48;
/// DetailCache row TTL (§3, §4.2).
pub const DETAIL_CACHE_TTL_HOURS: i64 = 24;
/// MetalPriceCache in-process refresh TTL (§2).
pub const METAL_PRICE_CACHE_TTL_SECS: i64 = 300;

/// Credential cooldown after a 429 (§4.1).
pub const CREDENTIAL_COOLDOWN_SECS: i64 = 5 * 60;
/// Safety margin subtracted from a minted token's advertised lifetime (§4.1).
pub const TOKEN_EXPIRY_SAFETY_SECS: i64 = 60;

/// Pagination page size and maximum offset before reset (§3, §4.9).
pub const PAGE_SIZE: u32 = 200;
pub const MAX_OFFSET: u32 = 800;

/// Maximum rows retried per match table, per cycle (§4.10).
pub const RETRY_PASS_LIMIT: i64 = 10;

/// CleanupSweeper tick interval and per-tick firing probability (§2, §4.14).
pub const CLEANUP_SWEEP_INTERVAL_SECS: u64 = 600;
pub const CLEANUP_SWEEP_PROBABILITY: f64 = 0.1;

/// Refining-fee discount applied to melt value to get break-even (§4.5.2-13, GLOSSARY).
pub const REFINING_FEE_FACTOR: f64 = 0.97;
/// Suggested-offer discount applied to break-even (§4.5.2-15).
pub const SUGGESTED_OFFER_FACTOR: f64 = 0.85;
/// Message-footer suggested-offer discount applied to melt value directly (§4.7).
pub const MESSAGE_OFFER_MELT_FACTOR: f64 = 0.87;
/// Default minimum profit margin floor when a task leaves it unset (§4.5.2-14).
pub const DEFAULT_MIN_PROFIT_MARGIN_PCT: f64 = -50.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub log_level: String,
    pub webhook_port: u16,
    pub poll_interval_ms: u64,
    pub slack_bot_token: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub default_slack_channel: Option<String>,
    pub slack_invite_users: Vec<String>,
    pub test_seller_username: Option<String>,
    pub ebay_oauth_url: String,
    pub ebay_item_api_url: String,
    pub slack_api_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:hunter.db".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            webhook_port: std::env::var("WEBHOOK_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("WEBHOOK_PORT must be a valid port number".to_string()))?,
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "60000".to_string())
                .parse::<u64>()
                .map_err(|_| AppError::Config("POLL_INTERVAL_MS must be a valid integer".to_string()))?,
            slack_bot_token: non_empty_env("SLACK_BOT_TOKEN"),
            slack_webhook_url: non_empty_env("SLACK_WEBHOOK_URL"),
            default_slack_channel: non_empty_env("DEFAULT_SLACK_CHANNEL"),
            slack_invite_users: std::env::var("SLACK_INVITE_USERS")
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            test_seller_username: non_empty_env("TEST_SELLER_USERNAME"),
            ebay_oauth_url: std::env::var("EBAY_OAUTH_URL")
                .unwrap_or_else(|_| EBAY_OAUTH_URL.to_string()),
            ebay_item_api_url: std::env::var("EBAY_ITEM_API_URL")
                .unwrap_or_else(|_| EBAY_ITEM_API_URL.to_string()),
            slack_api_url: std::env::var("SLACK_API_URL")
                .unwrap_or_else(|_| SLACK_API_URL.to_string()),
        })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slack_invite_users_splits_and_trims() {
        std::env::set_var("SLACK_INVITE_USERS", " U123 , U456,,U789 ");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.slack_invite_users, vec!["U123", "U456", "U789"]);
        std::env::remove_var("SLACK_INVITE_USERS");
    }

    #[test]
    fn bad_port_is_config_error() {
        std::env::set_var("WEBHOOK_PORT", "not-a-port");
        let result = Config::from_env();
        assert!(result.is_err());
        std::env::remove_var("WEBHOOK_PORT");
    }
}
