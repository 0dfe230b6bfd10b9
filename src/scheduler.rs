//! Scheduler (spec §4.11): the poll loop. One cycle processes every active
//! task sequentially, then runs the retry pass and records health metrics.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::channel_provisioner::ChannelProvisioner;
use crate::config::{INTER_METAL_SEARCH_DELAY_SECS, INTER_TASK_DELAY_SECS};
use crate::error::Result;
use crate::notifier::{format_gemstone_message, format_jewelry_message, format_test_bypass_message};
use crate::pipeline::{self, Computed};
use crate::search::SearchAdapter;
use crate::types::{ItemType, ListingSummary, MatchCommon, MetalPrices, Task};
use crate::worker::Worker;

const GOLD_KARAT_VARIANTS: [u32; 4] = [18, 14, 10, 24];

/// Expands a jewelry task's selected metals into one search keyword string
/// per SearchAdapter call (spec §4.11): a generic "<color> Gold" metal also
/// searches every karat-prefixed "Gold" variant, since sellers rarely title
/// a piece with its color qualifier and karat together.
fn expand_metal_keywords(task: &Task) -> Vec<String> {
    let Some(filters) = task.filters.as_jewelry() else { return vec![String::new()] };
    if filters.metal.is_empty() {
        return vec![String::new()];
    }

    let mut keywords: Vec<String> = Vec::new();
    for metal in &filters.metal {
        keywords.push(metal.clone());
        if metal.to_lowercase().contains("gold") {
            for karat in GOLD_KARAT_VARIANTS {
                keywords.push(format!("{karat}K Gold"));
                keywords.push(format!("{karat}kt Gold"));
            }
        }
    }
    keywords.sort();
    keywords.dedup();
    keywords
}

fn filters_query(task: &Task) -> serde_json::Value {
    serde_json::to_value(&task.filters).unwrap_or(serde_json::Value::Null)
}

struct TaskStats {
    items_found: u64,
    matches: u64,
    excluded: u64,
}

async fn process_task(worker: &Worker, task: &mut Task) -> TaskStats {
    let mut stats = TaskStats { items_found: 0, matches: 0, excluded: 0 };

    let provisioner = ChannelProvisioner::new(
        reqwest::Client::new(),
        worker.config.slack_api_url.clone(),
        worker.config.slack_bot_token.clone(),
        worker.config.slack_invite_users.clone(),
    );
    if let Err(e) = provisioner.ensure(task, &worker.task_store).await {
        warn!(task_id = task.id, error = %e, "channel provisioning failed, falling back to default channel");
    }

    let rejected = match worker.reject_cache.list_rejected(task.id).await {
        Ok(set) => set,
        Err(e) => {
            error!(task_id = task.id, error = %e, "failed to preload reject cache, aborting task");
            return stats;
        }
    };

    let metal_queries = if task.item_type == ItemType::Jewelry { expand_metal_keywords(task) } else { vec![String::new()] };

    let mut seen_ids = HashSet::new();
    let mut listings: Vec<ListingSummary> = Vec::new();

    for (i, keywords) in metal_queries.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_secs(INTER_METAL_SEARCH_DELAY_SECS)).await;
        }
        let offset = worker.pagination.current(task.id);
        match worker.search_adapter.search(task, keywords, filters_query(task), offset).await {
            Ok(page) => {
                let returned = page.len() as u32;
                worker.pagination.advance(task.id, returned);
                for item in page {
                    if seen_ids.insert(item.item_id.clone()) {
                        listings.push(item);
                    }
                }
            }
            Err(e) => {
                warn!(task_id = task.id, keywords, error = %e, "search adapter call failed");
            }
        }
    }

    stats.items_found = listings.len() as u64;

    for listing in listings {
        if rejected.contains(&listing.item_id) {
            continue;
        }
        match process_listing(worker, task, &listing).await {
            Ok(true) => stats.matches += 1,
            Ok(false) => stats.excluded += 1,
            Err(e) => {
                warn!(task_id = task.id, item_id = listing.item_id, error = %e, "listing processing failed");
            }
        }
    }

    if let Err(e) = worker.task_store.touch_last_run(task.id).await {
        warn!(task_id = task.id, error = %e, "failed to record last_run");
    }

    stats
}

/// Returns `Ok(true)` on a new accepted match, `Ok(false)` on a reject/duplicate.
async fn process_listing(worker: &Worker, task: &Task, listing: &ListingSummary) -> Result<bool> {
    let bypass = worker.is_test_seller(&listing.seller.name);

    if let Err(reason) = pipeline::pre_detail_checks(task, listing, bypass) {
        if !bypass {
            worker.reject_cache.reject(task.id, &listing.item_id, &reason).await?;
        }
        return Ok(false);
    }

    if worker.match_store.exists(task.item_type, task.id, &listing.item_id).await? {
        return Ok(false);
    }

    let Some(detail) = worker.detail_fetcher.fetch(&listing.item_id, listing.shipping_cost.is_none()).await? else {
        return Ok(false);
    };

    let mut metal_price_table: std::collections::HashMap<&'static str, MetalPrices> = std::collections::HashMap::new();
    for metal in ["gold", "platinum", "palladium", "silver"] {
        if let Ok(Some(prices)) = worker.metal_prices.get(metal).await {
            metal_price_table.insert(metal, prices);
        }
    }
    let prices_lookup = |metal: &str| -> Option<MetalPrices> { metal_price_table.get(metal).copied() };

    let computed = match pipeline::post_detail_checks(task, listing, &detail, &prices_lookup, bypass) {
        Ok(c) => c,
        Err(reason) => {
            if !bypass {
                worker.reject_cache.reject(task.id, &listing.item_id, &reason).await?;
            }
            return Ok(false);
        }
    };

    // A test-seller listing still produces a match record (§8); only the
    // notification path differs (bypass text, sent at most once per listing
    // for the worker's lifetime via `notified_test_listings`).
    let Some(id) = insert_match(worker, task, listing, &computed).await? else { return Ok(false) };

    if bypass {
        if !worker.mark_test_listing_notified(&listing.item_id) {
            return Ok(true);
        }
        let text = format_test_bypass_message(listing, &listing.seller.name);
        send_and_record(worker, task, id, &text).await?;
        return Ok(true);
    }

    let common = synthetic_common(task, listing);
    if let Some(text) = format_match_message(listing, &common, &computed) {
        send_and_record(worker, task, id, &text).await?;
    }
    Ok(true)
}

async fn insert_match(worker: &Worker, task: &Task, listing: &ListingSummary, computed: &Computed) -> Result<Option<i64>> {
    match computed {
        Computed::Jewelry(c) => worker.match_store.insert_jewelry(task, listing, c).await,
        Computed::Gemstone(c) => worker.match_store.insert_gemstone(task, listing, c).await,
        Computed::Watch(c) => worker.match_store.insert_watch(task, listing, c).await,
    }
}

fn format_match_message(listing: &ListingSummary, common: &MatchCommon, computed: &Computed) -> Option<String> {
    match computed {
        Computed::Jewelry(c) => Some(format_jewelry_message(listing, common, c)),
        Computed::Gemstone(c) => Some(format_gemstone_message(listing, common, c)),
        Computed::Watch(_) => None,
    }
}

async fn send_and_record(worker: &Worker, task: &Task, id: i64, text: &str) -> Result<()> {
    let channel = task.slack_channel.as_deref().or(worker.config.default_slack_channel.as_deref());
    let result = worker.notifier.send(channel, text).await?;
    if result.ok {
        worker
            .match_store
            .update_notification(task.item_type, id, result.ts.as_deref(), result.channel_id.as_deref())
            .await?;
    }
    Ok(())
}

fn synthetic_common(task: &Task, listing: &ListingSummary) -> MatchCommon {
    MatchCommon {
        task_id: task.id,
        user_id: task.user_id,
        ebay_listing_id: listing.item_id.clone(),
        ebay_title: listing.title.clone(),
        ebay_url: listing.listing_url.clone(),
        listed_price: listing.price,
        shipping_cost: listing.shipping_cost,
        currency: listing.currency.clone(),
        buy_format: crate::types::BuyFormat::from_ebay_label(&listing.listing_type).unwrap_or(crate::types::BuyFormat::FixedPrice),
        seller_feedback: listing.seller.feedback_score,
        found_at: chrono::Utc::now(),
        item_creation_date: listing.item_creation_date,
        status: crate::types::MatchStatus::New,
        notification_sent: false,
        slack_message_ts: None,
        slack_channel_id: task.slack_channel_id.clone(),
    }
}

pub async fn run_cycle(worker: &Worker) {
    let cycle_start = Instant::now();

    let mut tasks = match worker.task_store.list_active().await {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "failed to list active tasks, skipping cycle");
            return;
        }
    };

    let mut tasks_failed = 0u64;
    let mut total_items_found = 0u64;
    let mut total_matches = 0u64;
    let mut total_excluded = 0u64;

    for task in tasks.iter_mut() {
        let stats = process_task(worker, task).await;
        total_items_found += stats.items_found;
        total_matches += stats.matches;
        total_excluded += stats.excluded;
        if stats.items_found == 0 && stats.matches == 0 && stats.excluded == 0 {
            tasks_failed += 1;
        }
        tokio::time::sleep(Duration::from_secs(INTER_TASK_DELAY_SECS)).await;
    }

    if let Err(e) = crate::retry_pass::run(&worker.match_store, &worker.notifier).await {
        warn!(error = %e, "retry pass failed");
    }

    let duration_ms = cycle_start.elapsed().as_millis() as u64;
    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    worker.health.record_cycle(now_ms, duration_ms, tasks.len() as u64, tasks_failed);

    if let Err(e) = record_health_metric(worker, duration_ms, tasks.len() as u64, tasks_failed, total_items_found, total_matches, total_excluded).await {
        warn!(error = %e, "failed to persist worker health metric");
    }

    info!(
        tasks = tasks.len(),
        items_found = total_items_found,
        matches = total_matches,
        excluded = total_excluded,
        duration_ms,
        "poll cycle complete"
    );
}

#[allow(clippy::too_many_arguments)]
async fn record_health_metric(
    worker: &Worker,
    duration_ms: u64,
    tasks_processed: u64,
    tasks_failed: u64,
    items_found: u64,
    matches: u64,
    excluded: u64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO worker_health_metrics
            (cycle_timestamp, cycle_duration_ms, tasks_processed, tasks_failed, total_items_found, total_matches, total_excluded, memory_usage_mb)
        VALUES (?, ?, ?, ?, ?, ?, ?, NULL)
        "#,
    )
    .bind(chrono::Utc::now().to_rfc3339())
    .bind(duration_ms as i64)
    .bind(tasks_processed as i64)
    .bind(tasks_failed as i64)
    .bind(items_found as i64)
    .bind(matches as i64)
    .bind(excluded as i64)
    .execute(&worker.db)
    .await?;
    Ok(())
}

/// Runs the scheduler forever at `poll_interval_ms`, clamping the sleep to
/// never go negative when a cycle overruns its budget (spec §4.11).
pub async fn run_forever(worker: &Worker) {
    loop {
        let started = Instant::now();
        run_cycle(worker).await;
        let elapsed = started.elapsed();
        let interval = Duration::from_millis(worker.config.poll_interval_ms);
        let remaining = interval.saturating_sub(elapsed);
        tokio::time::sleep(remaining).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BuyFormat, FilterBag, JewelryFilters, TaskStatus};
    use std::collections::HashSet as StdHashSet;

    fn jewelry_task(metals: &[&str]) -> Task {
        let mut filters = JewelryFilters::default();
        for m in metals {
            filters.metal.insert(m.to_string());
        }
        Task {
            id: 1,
            user_id: 1,
            name: "t".to_string(),
            item_type: ItemType::Jewelry,
            status: TaskStatus::Active,
            min_price: 0.0,
            max_price: 500.0,
            min_seller_feedback: 0,
            listing_format: StdHashSet::from([BuyFormat::FixedPrice]),
            exclude_keywords: StdHashSet::new(),
            conditions: StdHashSet::new(),
            filters: FilterBag::Jewelry(filters),
            poll_interval_secs: 60,
            min_profit_margin: -50.0,
            last_run: None,
            slack_channel: None,
            slack_channel_id: None,
        }
    }

    #[test]
    fn single_non_gold_metal_expands_to_itself_only() {
        let task = jewelry_task(&["Platinum"]);
        let queries = expand_metal_keywords(&task);
        assert_eq!(queries, vec!["Platinum".to_string()]);
    }

    #[test]
    fn gold_metal_expands_to_karat_variants() {
        let task = jewelry_task(&["Yellow Gold"]);
        let queries = expand_metal_keywords(&task);
        assert!(queries.contains(&"Yellow Gold".to_string()));
        assert!(queries.contains(&"14K Gold".to_string()));
        assert!(queries.contains(&"18kt Gold".to_string()));
        assert_eq!(queries.len(), 1 + GOLD_KARAT_VARIANTS.len() * 2);
    }

    #[test]
    fn no_metals_selected_is_one_generic_query() {
        let task = jewelry_task(&[]);
        assert_eq!(expand_metal_keywords(&task), vec![String::new()]);
    }
}
