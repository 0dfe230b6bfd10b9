//! ReactionReceiver (spec §4.12): a webhook endpoint independent of the
//! polling loop, plus a /healthz probe backed by the scheduler's HealthState.

use std::sync::Arc;

use axum::{extract::State, routing::{get, post}, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::health::HealthState;
use crate::error::AppError;
use crate::store::MatchStore;
use crate::types::{ItemType, MatchStatus};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub health: Arc<HealthState>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/slack/events", post(reaction_webhook))
        .with_state(state)
}

async fn healthz(State(state): State<ApiState>) -> Json<Value> {
    Json(json!({
        "ready": state.health.is_ready(),
        "last_cycle_at_ms": state.health.last_cycle_at_ms(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SlackEvent {
    UrlVerification { challenge: String },
    EventCallback { event: InnerEvent },
}

#[derive(Debug, Deserialize)]
struct InnerEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    reaction: Option<String>,
    #[serde(default)]
    item: Option<ReactionItem>,
}

#[derive(Debug, Deserialize)]
struct ReactionItem {
    channel: String,
    ts: String,
}

fn status_for_emoji(emoji: &str) -> Option<MatchStatus> {
    match emoji {
        "+1" | "thumbsup" | "white_check_mark" | "heavy_check_mark" => Some(MatchStatus::Purchased),
        "-1" | "thumbsdown" | "x" => Some(MatchStatus::Rejected),
        "eyes" => Some(MatchStatus::Watching),
        "question" => Some(MatchStatus::Reviewing),
        _ => None,
    }
}

async fn reaction_webhook(State(state): State<ApiState>, Json(body): Json<SlackEvent>) -> Result<Json<Value>, AppError> {
    match body {
        SlackEvent::UrlVerification { challenge } => Ok(Json(json!({ "challenge": challenge }))),
        SlackEvent::EventCallback { event } => {
            if event.event_type != "reaction_added" {
                return Ok(Json(json!({ "ok": true, "ignored": "not a reaction_added event" })));
            }
            let (Some(emoji), Some(item)) = (event.reaction.as_deref(), event.item) else {
                return Ok(Json(json!({ "ok": true, "ignored": "missing reaction/item" })));
            };
            let Some(status) = status_for_emoji(emoji) else {
                return Ok(Json(json!({ "ok": true, "ignored": "unrecognized emoji" })));
            };

            let store = MatchStore::new(state.pool.clone());
            let updated = match store.update_status(ItemType::Jewelry, &item.channel, &item.ts, status).await {
                Ok(true) => true,
                Ok(false) => store.update_status(ItemType::Gemstone, &item.channel, &item.ts, status).await.unwrap_or(false),
                Err(e) => {
                    warn!(error = %e, "reaction webhook: failed to update match status");
                    false
                }
            };

            if updated {
                info!(channel = item.channel, ts = item.ts, status = status.as_str(), "match status updated via reaction");
            }
            Ok(Json(json!({ "ok": true, "updated": updated })))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_emoji() {
        assert_eq!(status_for_emoji("+1"), Some(MatchStatus::Purchased));
        assert_eq!(status_for_emoji("x"), Some(MatchStatus::Rejected));
        assert_eq!(status_for_emoji("eyes"), Some(MatchStatus::Watching));
        assert_eq!(status_for_emoji("question"), Some(MatchStatus::Reviewing));
    }

    #[test]
    fn unknown_emoji_is_none() {
        assert_eq!(status_for_emoji("tada"), None);
    }
}
