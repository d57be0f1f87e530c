pub mod tier_stats_cache;

pub use tier_stats_cache::TierStatsCache;
