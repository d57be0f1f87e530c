use std::sync::Arc;

use dashmap::DashMap;

use crate::stats::TierStat;
use crate::tier::PricingTier;

/// Last per-tier breakdown computed by the refresher, read by the admin API.
pub struct TierStatsCache {
    /// tier → stats row
    rows: DashMap<PricingTier, TierStat>,
}

impl TierStatsCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Swap in a freshly computed breakdown. Tiers missing from `rows` are
    /// dropped so a stale row never outlives its refresh.
    pub fn replace(&self, rows: Vec<TierStat>) {
        self.rows.retain(|tier, _| rows.iter().any(|r| r.tier == *tier));
        for row in rows {
            self.rows.insert(row.tier, row);
        }
    }

    pub fn get(&self, tier: PricingTier) -> Option<TierStat> {
        self.rows.get(&tier).map(|r| r.clone())
    }

    /// Rows in tier rank order.
    pub fn snapshot(&self) -> Vec<TierStat> {
        PricingTier::ALL
            .into_iter()
            .filter_map(|tier| self.get(tier))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Default for TierStatsCache {
    fn default() -> Self {
        Self {
            rows: DashMap::new(),
        }
    }
}
