//! Shared health state for the /health endpoint.
//! Updated by TierStatsRefresher, read by the API.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

#[derive(Default)]
pub struct HealthState {
    /// Millisecond timestamp of the last successful tier stats refresh (0 = none).
    pub last_stats_refresh_ms: AtomicU64,
    /// Successful refreshes since startup.
    pub stats_refreshes: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_stats_refresh(&self, at: DateTime<Utc>) {
        let ms = u64::try_from(at.timestamp_millis()).unwrap_or(0);
        self.last_stats_refresh_ms.store(ms, Ordering::Relaxed);
        self.stats_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn last_stats_refresh_ms(&self) -> u64 {
        self.last_stats_refresh_ms.load(Ordering::Relaxed)
    }

    pub fn stats_refreshes(&self) -> u64 {
        self.stats_refreshes.load(Ordering::Relaxed)
    }
}
