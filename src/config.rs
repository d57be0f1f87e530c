use chrono_tz::Tz;

use crate::error::{AppError, Result};

/// Separator between legs of a combined pick, e.g. `"1 | BTTS | Over 2.5"`.
pub const PICK_SEPARATOR: &str = " | ";

/// Lowest odds a bookmaker will quote for a single leg.
pub const MIN_ODDS: f64 = 1.01;

/// Flat stake assigned to every tip created through the admin surface.
pub const DEFAULT_STAKE: f64 = 10.0;

/// Stake divisor used when a stake is shown as a normalized unit count.
pub const STAKE_UNIT: f64 = 10.0;

/// Per-tier stats refresh interval (seconds).
pub const STATS_REFRESH_INTERVAL_SECS: u64 = 60;

/// How many recently settled tips the admin settle screen lists.
pub const RECENT_SETTLED_LIMIT: i64 = 10;

/// Fixed overlay blended into the public stats widget when augmentation is on.
/// Never persisted, never mixed into the settled-tip ledger.
pub mod augmentation {
    pub const SYNTHETIC_WON: u32 = 9742;
    pub const SYNTHETIC_LOST: u32 = 295;
    pub const SYNTHETIC_STAKE: f64 = 10.0;
    pub const SYNTHETIC_ODDS: f64 = 1.75;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Zone whose calendar day bounds grants and match grouping (REFERENCE_TZ)
    pub reference_tz: Tz,
    /// Allow `/stats?augment=true` to serve the synthetic overlay (STATS_AUGMENTATION)
    pub stats_augmentation: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "tips.db".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            reference_tz: std::env::var("REFERENCE_TZ")
                .unwrap_or_else(|_| "Europe/Warsaw".to_string())
                .parse::<Tz>()
                .map_err(|e| AppError::Config(format!("REFERENCE_TZ: {e}")))?,
            stats_augmentation: std::env::var("STATS_AUGMENTATION")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}
