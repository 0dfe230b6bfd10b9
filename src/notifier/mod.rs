//! Notifier (spec §4.7): formats and sends match notifications, preferring
//! the bot API and falling back to a single preconfigured webhook.

mod message;

pub use message::{format_gemstone_message, format_jewelry_message, format_test_bypass_message};

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::warn;

use crate::config::NOTIFIER_MIN_SPACING_MS;
use crate::error::Result;

pub struct SendResult {
    pub ok: bool,
    pub ts: Option<String>,
    pub channel_id: Option<String>,
}

pub struct Notifier {
    http: reqwest::Client,
    api_url: String,
    bot_token: Option<String>,
    webhook_url: Option<String>,
    last_sent: Mutex<Option<Instant>>,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    channel: Option<String>,
}

impl Notifier {
    pub fn new(http: reqwest::Client, api_url: String, bot_token: Option<String>, webhook_url: Option<String>) -> Self {
        Self { http, api_url, bot_token, webhook_url, last_sent: Mutex::new(None) }
    }

    /// Sends `text` (with optional color/attachment metadata folded into the
    /// message body by the caller) to `channel`, pacing globally at ≥1100 ms
    /// between any two successful sends from this worker.
    pub async fn send(&self, channel: Option<&str>, text: &str) -> Result<SendResult> {
        self.pace().await;

        let result = if let (Some(token), Some(channel)) = (&self.bot_token, channel) {
            self.send_via_bot(token, channel, text).await
        } else if let Some(webhook) = &self.webhook_url {
            self.send_via_webhook(webhook, text).await
        } else {
            warn!("no bot token/channel and no webhook configured, dropping notification");
            Ok(SendResult { ok: false, ts: None, channel_id: None })
        };

        if matches!(&result, Ok(r) if r.ok) {
            *self.last_sent.lock().unwrap() = Some(Instant::now());
        }
        result
    }

    async fn pace(&self) {
        let wait = {
            let last = self.last_sent.lock().unwrap();
            last.map(|t| {
                let elapsed = t.elapsed();
                let min = Duration::from_millis(NOTIFIER_MIN_SPACING_MS);
                min.saturating_sub(elapsed)
            })
        };
        if let Some(wait) = wait {
            if !wait.is_zero() {
                tokio::time::sleep(wait).await;
            }
        }
    }

    async fn send_via_bot(&self, token: &str, channel: &str, text: &str) -> Result<SendResult> {
        let resp = self
            .http
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "channel": channel, "text": text }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Ok(SendResult { ok: false, ts: None, channel_id: None });
        }
        let parsed: PostMessageResponse = resp.json().await?;
        Ok(SendResult { ok: parsed.ok, ts: parsed.ts, channel_id: parsed.channel })
    }

    async fn send_via_webhook(&self, webhook: &str, text: &str) -> Result<SendResult> {
        let resp = self.http.post(webhook).json(&serde_json::json!({ "text": text })).send().await?;
        Ok(SendResult { ok: resp.status().is_success(), ts: None, channel_id: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_bot_and_no_webhook_returns_not_ok_without_erroring() {
        let http = reqwest::Client::new();
        let notifier = Notifier::new(http, "https://slack.com/api".to_string(), None, None);
        let result = notifier.send(None, "hello").await.unwrap();
        assert!(!result.ok);
    }
}
