//! Row types for the `tips` / `tier_grants` tables. Tier and status columns are
//! free text in SQLite; converting a row fails loudly on anything outside the
//! closed enums.
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::{DEFAULT_STAKE, MIN_ODDS, PICK_SEPARATOR};
use crate::error::{AppError, Result};
use crate::tier::PricingTier;
use crate::types::{Tip, TierGrant, TipStatus};

#[derive(Debug, sqlx::FromRow)]
pub struct TipRow {
    pub id: String,
    pub match_date: Option<DateTime<Utc>>,
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub pick: String,
    pub odds: f64,
    pub stake: f64,
    pub pricing_tier: String,
    pub status: String,
    pub analysis: Option<String>,
    pub is_bet_builder: bool,
    pub proof_image_url: Option<String>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<TipRow> for Tip {
    type Error = AppError;

    fn try_from(row: TipRow) -> Result<Self> {
        Ok(Tip {
            pricing_tier: row.pricing_tier.parse()?,
            status: row.status.parse()?,
            id: row.id,
            match_date: row.match_date,
            home_team: row.home_team,
            away_team: row.away_team,
            league: row.league,
            pick: row.pick,
            odds: row.odds,
            stake: row.stake,
            analysis: row.analysis,
            is_bet_builder: row.is_bet_builder,
            proof_image_url: row.proof_image_url,
            settled_at: row.settled_at,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct GrantRow {
    pub id: String,
    pub user_id: String,
    pub pricing_tier: String,
    pub expires_at: DateTime<Utc>,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<String>,
}

impl TryFrom<GrantRow> for TierGrant {
    type Error = AppError;

    fn try_from(row: GrantRow) -> Result<Self> {
        Ok(TierGrant {
            pricing_tier: row.pricing_tier.parse()?,
            id: row.id,
            user_id: row.user_id,
            expires_at: row.expires_at,
            granted_at: row.granted_at,
            granted_by: row.granted_by,
        })
    }
}

// ---------------------------------------------------------------------------
// Admin input
// ---------------------------------------------------------------------------

/// Tip fields an admin fills in when creating or editing.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTip {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    /// One entry per leg; joined with the leg separator on save.
    pub picks: Vec<String>,
    pub odds: f64,
    pub pricing_tier: PricingTier,
    #[serde(default)]
    pub analysis: Option<String>,
    #[serde(default)]
    pub is_bet_builder: bool,
    /// Defaults to the moment of creation.
    #[serde(default)]
    pub match_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub stake: Option<f64>,
}

impl NewTip {
    pub fn validate(&self) -> Result<()> {
        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            return Err(AppError::BadRequest("both teams are required".to_string()));
        }
        if self.league.trim().is_empty() {
            return Err(AppError::BadRequest("league is required".to_string()));
        }
        if self.joined_pick().is_empty() {
            return Err(AppError::BadRequest("at least one pick is required".to_string()));
        }
        if !self.odds.is_finite() || self.odds < MIN_ODDS {
            return Err(AppError::BadRequest(format!("odds must be at least {MIN_ODDS}")));
        }
        if let Some(stake) = self.stake {
            if !stake.is_finite() || stake <= 0.0 {
                return Err(AppError::BadRequest("stake must be positive".to_string()));
            }
        }
        Ok(())
    }

    pub fn joined_pick(&self) -> String {
        self.picks
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join(PICK_SEPARATOR)
    }

    pub fn cleaned_analysis(&self) -> Option<String> {
        self.analysis
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
    }

    /// A pending tip with a fresh id.
    pub fn into_tip(self, id: String, now: DateTime<Utc>) -> Result<Tip> {
        self.validate()?;
        Ok(Tip {
            pick: self.joined_pick(),
            analysis: self.cleaned_analysis(),
            id,
            match_date: Some(self.match_date.unwrap_or(now)),
            home_team: self.home_team.trim().to_string(),
            away_team: self.away_team.trim().to_string(),
            league: self.league.trim().to_string(),
            odds: self.odds,
            stake: self.stake.unwrap_or(DEFAULT_STAKE),
            pricing_tier: self.pricing_tier,
            status: TipStatus::Pending,
            is_bet_builder: self.is_bet_builder,
            proof_image_url: None,
            settled_at: None,
            created_at: now,
        })
    }
}
