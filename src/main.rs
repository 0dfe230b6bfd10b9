mod api;
mod cache;
mod channel_provisioner;
mod cleanup_sweeper;
mod config;
mod credentials;
mod error;
mod extraction;
mod marketplace_client;
mod notifier;
mod pagination;
mod pipeline;
mod retry_pass;
mod scheduler;
mod search;
mod store;
mod types;
mod worker;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::error::Result;
use crate::worker::Worker;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = sqlx::SqlitePool::connect(&cfg.database_url).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database ready at {}", cfg.database_url);

    let webhook_port = cfg.webhook_port;

    let worker = Arc::new(Worker::new(cfg, pool.clone()).await?);
    {
        // Worker owns its own HealthState field; the API reads through the
        // same handle the scheduler writes to.
        let worker_for_loop = worker.clone();
        tokio::spawn(async move { scheduler::run_forever(&worker_for_loop).await });
    }

    {
        let reject_cache = Arc::new(crate::cache::RejectCache::new(pool.clone()));
        let detail_cache = worker.detail_cache.clone();
        tokio::spawn(async move { cleanup_sweeper::run(reject_cache, detail_cache).await });
    }

    let api_state = ApiState { pool, health: worker.health.clone() };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{webhook_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
