use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::STAKE_UNIT;
use crate::error::AppError;
use crate::tier::PricingTier;

// ---------------------------------------------------------------------------
// Tip
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    /// None only for malformed rows; such tips are never grouped.
    pub match_date: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    /// May already hold several legs joined by `" | "`.
    pub pick: String,
    pub odds: f64,
    pub stake: f64,
    pub pricing_tier: PricingTier,
    pub status: TipStatus,
    pub analysis: Option<String>,
    pub is_bet_builder: bool,
    pub proof_image_url: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Tip {
    /// Stake as a count of flat betting units.
    pub fn units(&self) -> f64 {
        self.stake / STAKE_UNIT
    }

    pub fn is_settled(&self) -> bool {
        self.status.is_settled()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TipStatus {
    Pending,
    Won,
    Lost,
    Void,
}

impl TipStatus {
    pub fn is_settled(self) -> bool {
        !matches!(self, TipStatus::Pending)
    }
}

impl std::fmt::Display for TipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TipStatus::Pending => "Pending",
            TipStatus::Won => "Won",
            TipStatus::Lost => "Lost",
            TipStatus::Void => "Void",
        };
        write!(f, "{s}")
    }
}

impl FromStr for TipStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TipStatus::Pending),
            "Won" => Ok(TipStatus::Won),
            "Lost" => Ok(TipStatus::Lost),
            "Void" => Ok(TipStatus::Void),
            other => Err(AppError::UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Viewer role
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
    Anonymous,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Anonymous => "anonymous",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "anonymous" | "" => Ok(Role::Anonymous),
            other => Err(AppError::UnknownRole(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Entitlement records
// ---------------------------------------------------------------------------

/// Time-boxed access to every tip of one tier. Expired grants stay stored but
/// unlock nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierGrant {
    pub id: String,
    pub user_id: String,
    pub pricing_tier: PricingTier,
    pub expires_at: DateTime<Utc>,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<String>,
}

impl TierGrant {
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !crate::time_window::is_expired(self.expires_at, now)
    }
}

/// A row here unlocks exactly one raw tip, whatever its tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub user_id: String,
    pub tip_id: String,
    pub amount_paid: f64,
}
