pub mod projector;
pub mod refresher;

pub use projector::{project, tier_breakdown, Headline, Stats, StatsOptions, TierStat};
pub use refresher::{refresh_tier_stats, TierStatsRefresher};
