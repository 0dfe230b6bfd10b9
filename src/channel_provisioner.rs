//! ChannelProvisioner (spec §4.8): derives a Slack channel name from a task,
//! creates it, invites default viewers, and persists the result back.

use serde::Deserialize;
use tracing::warn;

use crate::error::Result;
use crate::store::TaskStore;
use crate::types::Task;

pub fn derive_channel_name(task_name: &str) -> String {
    let lowered = task_name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_dash = false;
    for c in lowered.chars() {
        let mapped = if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' };
        if mapped == '-' {
            if !last_was_dash {
                out.push('-');
            }
            last_was_dash = true;
        } else {
            out.push(mapped);
            last_was_dash = false;
        }
    }
    let trimmed = out.trim_matches('-');
    trimmed.chars().take(80).collect()
}

#[derive(Debug, Deserialize)]
struct CreateChannelResponse {
    ok: bool,
    #[serde(default)]
    channel: Option<ChannelRef>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelRef {
    id: String,
}

pub struct ChannelProvisioner {
    http: reqwest::Client,
    api_url: String,
    bot_token: Option<String>,
    invite_user_ids: Vec<String>,
}

impl ChannelProvisioner {
    pub fn new(http: reqwest::Client, api_url: String, bot_token: Option<String>, invite_user_ids: Vec<String>) -> Self {
        Self { http, api_url, bot_token, invite_user_ids }
    }

    /// Non-fatal: any failure leaves `task.slack_channel` unset so the caller
    /// falls back to a configured default channel or the webhook.
    pub async fn ensure(&self, task: &mut Task, task_store: &TaskStore) -> Result<()> {
        if task.slack_channel.is_some() {
            return Ok(());
        }
        let Some(token) = &self.bot_token else { return Ok(()) };

        let name = derive_channel_name(&task.name);
        let channel_id = match self.create_channel(token, &name).await {
            Some(id) => id,
            None => return Ok(()),
        };

        self.invite_default_viewers(token, &channel_id).await;

        task_store.set_slack_channel(task.id, &name, &channel_id).await?;
        task.slack_channel = Some(name);
        task.slack_channel_id = Some(channel_id);
        Ok(())
    }

    async fn create_channel(&self, token: &str, name: &str) -> Option<String> {
        let resp = self
            .http
            .post(format!("{}/conversations.create", self.api_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "name": name, "is_private": false }))
            .send()
            .await
            .ok()?;
        let parsed: CreateChannelResponse = resp.json().await.ok()?;

        if parsed.ok {
            return parsed.channel.map(|c| c.id);
        }

        if parsed.error.as_deref() == Some("name_taken") {
            return self.lookup_channel_id(token, name).await;
        }

        warn!(name, error = ?parsed.error, "channel creation failed");
        None
    }

    async fn lookup_channel_id(&self, token: &str, name: &str) -> Option<String> {
        #[derive(Debug, Deserialize)]
        struct ListResponse {
            ok: bool,
            #[serde(default)]
            channels: Vec<ChannelEntry>,
        }
        #[derive(Debug, Deserialize)]
        struct ChannelEntry {
            id: String,
            name: String,
        }

        let resp = self
            .http
            .get(format!("{}/conversations.list", self.api_url))
            .bearer_auth(token)
            .send()
            .await
            .ok()?;
        let parsed: ListResponse = resp.json().await.ok()?;
        if !parsed.ok {
            return None;
        }
        parsed.channels.into_iter().find(|c| c.name == name).map(|c| c.id)
    }

    async fn invite_default_viewers(&self, token: &str, channel_id: &str) {
        if self.invite_user_ids.is_empty() {
            return;
        }
        #[derive(Debug, Deserialize)]
        struct InviteResponse {
            ok: bool,
            #[serde(default)]
            error: Option<String>,
        }

        let resp = self
            .http
            .post(format!("{}/conversations.invite", self.api_url))
            .bearer_auth(token)
            .json(&serde_json::json!({ "channel": channel_id, "users": self.invite_user_ids.join(",") }))
            .send()
            .await;

        if let Ok(resp) = resp {
            if let Ok(parsed) = resp.json::<InviteResponse>().await {
                if !parsed.ok && parsed.error.as_deref() != Some("already_in_channel") {
                    warn!(channel_id, error = ?parsed.error, "invite failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_replaces_invalid_chars() {
        assert_eq!(derive_channel_name("Gold Hunter #1"), "gold-hunter-1");
    }

    #[test]
    fn collapses_repeated_separators() {
        assert_eq!(derive_channel_name("a   b---c"), "a-b-c");
    }

    #[test]
    fn strips_leading_and_trailing_dashes() {
        assert_eq!(derive_channel_name("  !!Gold!!  "), "gold");
    }

    #[test]
    fn truncates_to_eighty_chars() {
        let long_name = "a".repeat(200);
        assert_eq!(derive_channel_name(&long_name).len(), 80);
    }
}
