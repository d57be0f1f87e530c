mod aggregator;
mod api;
mod config;
mod db;
mod entitlement;
mod error;
mod state;
mod stats;
mod tier;
mod time_window;
mod types;

use std::str::FromStr;
use std::sync::Arc;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::health::HealthState;
use crate::api::routes::{router, ApiState};
use crate::config::Config;
use crate::db::TipStore;
use crate::error::Result;
use crate::state::TierStatsCache;
use crate::stats::TierStatsRefresher;

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
    // --- Database setup ---
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", cfg.db_path))?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database ready at {}", cfg.db_path);

    let store = TipStore::new(pool);
    let stats_cache = TierStatsCache::new();
    let health = Arc::new(HealthState::new());

    info!("Reference time zone: {}", cfg.reference_tz);
    if cfg.stats_augmentation {
        warn!("[STATS] STATS_AUGMENTATION is on: /stats?augment=true serves the synthetic overlay");
    }

    // Per-tier stats refresher (background, every 60s)
    let refresher = TierStatsRefresher::new(store.clone(), Arc::clone(&stats_cache), Arc::clone(&health));
    tokio::spawn(async move { refresher.run().await });

    // HTTP API server
    let api_state = ApiState {
        store,
        tz: cfg.reference_tz,
        stats_cache,
        health,
        allow_augmentation: cfg.stats_augmentation,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
