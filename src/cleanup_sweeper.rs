//! CleanupSweeper (spec §4.14): a background tokio task that probabilistically
//! sweeps expired rows out of the reject and detail caches.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::info;

use crate::cache::{DetailCache, RejectCache};
use crate::config::{CLEANUP_SWEEP_INTERVAL_SECS, CLEANUP_SWEEP_PROBABILITY};

pub async fn run(reject_cache: Arc<RejectCache>, detail_cache: Arc<DetailCache>) {
    let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_SWEEP_INTERVAL_SECS));
    loop {
        interval.tick().await;
        let fire = rand::thread_rng().gen_bool(CLEANUP_SWEEP_PROBABILITY);
        if !fire {
            continue;
        }
        match reject_cache.sweep_expired().await {
            Ok(n) if n > 0 => info!(rows = n, "cleanup sweep: rejected_items"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "cleanup sweep: rejected_items failed"),
        }
        match detail_cache.sweep_expired().await {
            Ok(n) if n > 0 => info!(rows = n, "cleanup sweep: ebay_item_cache"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "cleanup sweep: ebay_item_cache failed"),
        }
    }
}
