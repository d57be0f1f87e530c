use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::api::health::HealthState;
use crate::config::STATS_REFRESH_INTERVAL_SECS;
use crate::db::TipStore;
use crate::error::Result;
use crate::state::TierStatsCache;
use crate::stats::projector::tier_breakdown;

/// Background task that recomputes the per-tier breakdown every 60 seconds
/// from a fresh tip snapshot and swaps it into the shared cache.
pub struct TierStatsRefresher {
    store: TipStore,
    cache: Arc<TierStatsCache>,
    health: Arc<HealthState>,
}

impl TierStatsRefresher {
    pub fn new(store: TipStore, cache: Arc<TierStatsCache>, health: Arc<HealthState>) -> Self {
        Self {
            store,
            cache,
            health,
        }
    }

    pub async fn run(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(STATS_REFRESH_INTERVAL_SECS));

        // First tick fires immediately, so the cache is warm before the first request.
        loop {
            interval.tick().await;
            if let Err(e) = self.refresh().await {
                error!("[STATS] refresh error: {e}");
            }
        }
    }

    pub async fn refresh(&self) -> Result<()> {
        let tips = refresh_tier_stats(&self.store, &self.cache).await?;
        self.health.record_stats_refresh(Utc::now());
        info!(tips, "[STATS] tier breakdown refreshed for {tips} tips");
        Ok(())
    }
}

/// Recompute the breakdown from a fresh snapshot and swap it into `cache`.
/// Returns how many tips were read.
pub async fn refresh_tier_stats(store: &TipStore, cache: &TierStatsCache) -> Result<usize> {
    let tips = store.all_tips().await?;
    cache.replace(tier_breakdown(&tips));
    Ok(tips.len())
}
