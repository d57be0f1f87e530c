//! Tier grants. A grant always runs until the end of the calendar day it was
//! issued on, in the reference zone.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::tier::PricingTier;
use crate::time_window::{end_of_day, is_expired};
use crate::types::TierGrant;

/// Build the grant row an operator issues now. Persisting it is an upsert on
/// `(user_id, pricing_tier)`, so re-granting only moves `expires_at` and
/// `granted_by`.
pub fn issue_grant<Tz: TimeZone>(
    user_id: &str,
    tier: PricingTier,
    granted_by: Option<&str>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> Result<TierGrant> {
    if !PricingTier::PAID.contains(&tier) {
        return Err(AppError::BadRequest("Free tier needs no grant".to_string()));
    }
    if user_id.trim().is_empty() {
        return Err(AppError::BadRequest("user_id is required".to_string()));
    }
    Ok(TierGrant {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        pricing_tier: tier,
        expires_at: end_of_day(now, tz),
        granted_at: now,
        granted_by: granted_by.map(str::to_string),
    })
}

/// Tiers with a live grant at `now`. With duplicate rows for one tier the
/// latest `expires_at` decides.
pub fn active_tiers(grants: &[TierGrant], now: DateTime<Utc>) -> HashSet<PricingTier> {
    let mut latest: HashMap<PricingTier, DateTime<Utc>> = HashMap::new();
    for grant in grants {
        latest
            .entry(grant.pricing_tier)
            .and_modify(|e| *e = (*e).max(grant.expires_at))
            .or_insert(grant.expires_at);
    }
    latest
        .into_iter()
        .filter(|(_, expires_at)| !is_expired(*expires_at, now))
        .map(|(tier, _)| tier)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use chrono_tz::Europe::Warsaw;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn row(tier: PricingTier, expires_at: DateTime<Utc>) -> TierGrant {
        TierGrant {
            id: Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            pricing_tier: tier,
            expires_at,
            granted_at: at("2024-06-01T08:00:00Z"),
            granted_by: None,
        }
    }

    #[test]
    fn grant_expires_at_local_midnight_minus_one_second() {
        let now = at("2024-06-01T09:15:00Z");
        let g = issue_grant("u1", PricingTier::Tier40, Some("admin"), now, &Warsaw).unwrap();
        assert_eq!(g.expires_at, at("2024-06-01T21:59:59Z"));
        assert_eq!(g.granted_at, now);
        assert_eq!(g.granted_by.as_deref(), Some("admin"));
        assert!(g.is_active(now));
        assert!(!g.is_active(at("2024-06-01T22:00:00Z")));
    }

    #[test]
    fn late_evening_grant_is_short() {
        let now = at("2024-06-01T21:50:00Z");
        let g = issue_grant("u1", PricingTier::Tier10, None, now, &Warsaw).unwrap();
        assert_eq!(g.expires_at - now, Duration::seconds(599));
    }

    #[test]
    fn free_grant_rejected() {
        let now = at("2024-06-01T09:15:00Z");
        assert!(matches!(
            issue_grant("u1", PricingTier::Free, None, now, &Warsaw),
            Err(AppError::BadRequest(_))
        ));
        assert!(issue_grant(" ", PricingTier::Tier10, None, now, &Warsaw).is_err());
    }

    #[test]
    fn latest_duplicate_wins() {
        let now = at("2024-06-01T12:00:00Z");
        let grants = vec![
            row(PricingTier::Tier20, now - Duration::hours(5)),
            row(PricingTier::Tier20, now + Duration::hours(2)),
            row(PricingTier::Tier75, now - Duration::minutes(1)),
        ];
        let tiers = active_tiers(&grants, now);
        assert!(tiers.contains(&PricingTier::Tier20));
        assert!(!tiers.contains(&PricingTier::Tier75));
        assert_eq!(tiers.len(), 1);
    }

    #[test]
    fn expired_rows_are_inert() {
        let now = at("2024-06-01T12:00:00Z");
        let grants = vec![row(PricingTier::Tier100, now)];
        assert!(active_tiers(&grants, now).is_empty());
    }
}
