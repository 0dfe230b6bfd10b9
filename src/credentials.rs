//! CredentialPool (spec §4.1): holds the marketplace OAuth credential set,
//! mints and caches bearer tokens, and rotates/cools down on rate limiting.

use std::sync::Mutex;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{CREDENTIAL_COOLDOWN_SECS, TOKEN_EXPIRY_SAFETY_SECS};
use crate::error::{AppError, Result};
use crate::types::{CachedToken, Credential, CredentialStatus, RotationStrategy};

const SETTINGS_KEY: &str = "ebay_keys";

#[derive(Debug, Serialize, Deserialize)]
struct SettingsPayload {
    keys: Vec<Credential>,
    rotation_strategy: RotationStrategy,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct CredentialPool {
    pool: sqlx::SqlitePool,
    http: reqwest::Client,
    oauth_url: String,
    state: Mutex<PoolState>,
}

struct PoolState {
    credentials: Vec<Credential>,
    rotation_strategy: RotationStrategy,
    cached_token: Option<CachedToken>,
}

impl CredentialPool {
    pub async fn load(pool: sqlx::SqlitePool, oauth_url: String) -> Result<Self> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value_json FROM settings WHERE key = ?")
            .bind(SETTINGS_KEY)
            .fetch_optional(&pool)
            .await?;

        let payload: SettingsPayload = match row {
            Some((json,)) => serde_json::from_str(&json)?,
            None => SettingsPayload { keys: Vec::new(), rotation_strategy: RotationStrategy::default() },
        };

        let http = reqwest::Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            pool,
            http,
            oauth_url,
            state: Mutex::new(PoolState {
                credentials: payload.keys,
                rotation_strategy: payload.rotation_strategy,
                cached_token: None,
            }),
        })
    }

    async fn persist(&self, credentials: &[Credential], rotation_strategy: RotationStrategy) -> Result<()> {
        let payload = SettingsPayload { keys: credentials.to_vec(), rotation_strategy };
        let json = serde_json::to_string(&payload)?;
        sqlx::query(
            "INSERT INTO settings (key, value_json) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        )
        .bind(SETTINGS_KEY)
        .bind(json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Returns a bearer token, minting a new one only when the cached token's
    /// credential is no longer active or is within the expiry safety window.
    pub async fn acquire_token(&self) -> Result<String> {
        self.reinstate_cooled().await?;

        let label_to_mint;
        {
            let mut state = self.state.lock().unwrap();
            if let Some(cached) = &state.cached_token {
                let still_active = state
                    .credentials
                    .iter()
                    .any(|c| c.label == cached.credential_label && c.status == CredentialStatus::Active);
                let safe = (cached.expires_at - Utc::now()).num_seconds() > TOKEN_EXPIRY_SAFETY_SECS;
                if still_active && safe {
                    return Ok(cached.token.clone());
                }
            }
            label_to_mint = select_credential(&state.credentials, state.rotation_strategy)
                .ok_or(AppError::NoCredential)?
                .label
                .clone();
        }

        self.mint_for(&label_to_mint).await
    }

    async fn mint_for(&self, label: &str) -> Result<String> {
        let (app_id, cert_id) = {
            let state = self.state.lock().unwrap();
            let cred = state
                .credentials
                .iter()
                .find(|c| c.label == label)
                .ok_or(AppError::NoCredential)?;
            (cred.app_id.clone(), cred.cert_id.clone())
        };

        let auth = base64::engine::general_purpose::STANDARD.encode(format!("{app_id}:{cert_id}"));
        let resp = self
            .http
            .post(&self.oauth_url)
            .header("Authorization", format!("Basic {auth}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials&scope=https://api.ebay.com/oauth/api_scope")
            .send()
            .await
            .map_err(|e| AppError::TokenMintFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::TokenMintFailed(format!("status {}", resp.status())));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AppError::TokenMintFailed(e.to_string()))?;

        let expires_at = Utc::now() + chrono::Duration::seconds(parsed.expires_in - TOKEN_EXPIRY_SAFETY_SECS);
        let token = CachedToken {
            token: parsed.access_token.clone(),
            expires_at,
            credential_label: label.to_string(),
        };

        let (credentials, rotation_strategy) = {
            let mut state = self.state.lock().unwrap();
            if let Some(cred) = state.credentials.iter_mut().find(|c| c.label == label) {
                cred.last_used = Some(Utc::now());
                cred.calls_today += 1;
            }
            state.cached_token = Some(token);
            (state.credentials.clone(), state.rotation_strategy)
        };
        self.persist(&credentials, rotation_strategy).await?;

        Ok(parsed.access_token)
    }

    /// A 429 anywhere downstream invalidates the cached token and starts the cooldown.
    pub async fn mark_rate_limited(&self, label: &str) -> Result<()> {
        warn!(credential = label, "marking credential rate-limited");
        let (credentials, rotation_strategy) = {
            let mut state = self.state.lock().unwrap();
            if let Some(cred) = state.credentials.iter_mut().find(|c| c.label == label) {
                cred.status = CredentialStatus::RateLimited;
                cred.rate_limited_at = Some(Utc::now());
            }
            if state.cached_token.as_ref().map(|t| t.credential_label.as_str()) == Some(label) {
                state.cached_token = None;
            }
            (state.credentials.clone(), state.rotation_strategy)
        };
        self.persist(&credentials, rotation_strategy).await?;
        Ok(())
    }

    async fn reinstate_cooled(&self) -> Result<()> {
        let mut changed = false;
        let (credentials, rotation_strategy) = {
            let mut state = self.state.lock().unwrap();
            let now = Utc::now();
            for cred in state.credentials.iter_mut() {
                if cred.status == CredentialStatus::RateLimited {
                    if let Some(limited_at) = cred.rate_limited_at {
                        if (now - limited_at).num_seconds() > CREDENTIAL_COOLDOWN_SECS {
                            cred.status = CredentialStatus::Active;
                            cred.rate_limited_at = None;
                            changed = true;
                            info!(credential = cred.label.as_str(), "credential cooldown elapsed, reinstating");
                        }
                    }
                }
            }
            (state.credentials.clone(), state.rotation_strategy)
        };
        if changed {
            self.persist(&credentials, rotation_strategy).await?;
        }
        Ok(())
    }

    /// Exposed for the detail fetcher: look up which credential owns a token
    /// so a 429 can be attributed to the right label.
    pub fn current_credential_label(&self) -> Option<String> {
        self.state.lock().unwrap().cached_token.as_ref().map(|t| t.credential_label.clone())
    }
}

fn select_credential(credentials: &[Credential], strategy: RotationStrategy) -> Option<&Credential> {
    let active: Vec<&Credential> = credentials.iter().filter(|c| c.status == CredentialStatus::Active).collect();
    if !active.is_empty() {
        return Some(match strategy {
            RotationStrategy::RoundRobin => *active
                .iter()
                .min_by_key(|c| c.last_used.unwrap_or_else(|| Utc::now() - chrono::Duration::days(3650)))
                .unwrap(),
            RotationStrategy::LeastUsed => *active.iter().min_by_key(|c| c.calls_today).unwrap(),
        });
    }

    // Degenerate case: every credential is rate-limited. Pick whichever cools soonest.
    credentials
        .iter()
        .filter(|c| c.status == CredentialStatus::RateLimited)
        .min_by_key(|c| c.rate_limited_at.unwrap_or_else(Utc::now))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(label: &str, status: CredentialStatus, last_used_secs_ago: i64, calls: i64) -> Credential {
        Credential {
            label: label.to_string(),
            app_id: "app".to_string(),
            cert_id: "cert".to_string(),
            status,
            rate_limited_at: if status == CredentialStatus::RateLimited {
                Some(Utc::now() - chrono::Duration::seconds(last_used_secs_ago))
            } else {
                None
            },
            calls_today: calls,
            last_used: Some(Utc::now() - chrono::Duration::seconds(last_used_secs_ago)),
        }
    }

    #[test]
    fn round_robin_picks_least_recently_used() {
        let creds = vec![
            cred("K1", CredentialStatus::Active, 10, 5),
            cred("K2", CredentialStatus::Active, 500, 5),
        ];
        let picked = select_credential(&creds, RotationStrategy::RoundRobin).unwrap();
        assert_eq!(picked.label, "K2");
    }

    #[test]
    fn least_used_picks_fewest_calls() {
        let creds = vec![
            cred("K1", CredentialStatus::Active, 10, 50),
            cred("K2", CredentialStatus::Active, 10, 3),
        ];
        let picked = select_credential(&creds, RotationStrategy::LeastUsed).unwrap();
        assert_eq!(picked.label, "K2");
    }

    #[test]
    fn degenerate_all_rate_limited_picks_soonest_to_cool() {
        let creds = vec![
            cred("K1", CredentialStatus::RateLimited, 100, 0),
            cred("K2", CredentialStatus::RateLimited, 10, 0),
        ];
        let picked = select_credential(&creds, RotationStrategy::RoundRobin).unwrap();
        assert_eq!(picked.label, "K1");
    }

    #[test]
    fn no_credentials_returns_none() {
        assert!(select_credential(&[], RotationStrategy::RoundRobin).is_none());
    }
}
