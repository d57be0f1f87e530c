use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::aggregator::MatchEntry;
use crate::entitlement::grants::active_tiers;
use crate::tier::PricingTier;
use crate::types::{Role, Tip, TierGrant};

/// Everything the resolver needs to know about who is looking. Built from a
/// pre-fetched snapshot; the resolver never queries anything itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub user_id: Option<String>,
    pub role: Role,
    pub purchases: HashSet<String>,
    /// Already filtered to grants with `expires_at > now`.
    pub active_tiers: HashSet<PricingTier>,
}

impl Viewer {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            role: Role::Anonymous,
            purchases: HashSet::new(),
            active_tiers: HashSet::new(),
        }
    }

    /// Without a user id (or as Anonymous) no purchases or grants are carried,
    /// whatever is passed. The role itself is kept, so an admin stays an admin.
    pub fn new(
        user_id: Option<String>,
        role: Role,
        purchases: HashSet<String>,
        active_tiers: HashSet<PricingTier>,
    ) -> Self {
        if role == Role::Anonymous {
            return Self::anonymous();
        }
        if user_id.is_none() {
            return Self {
                role,
                ..Self::anonymous()
            };
        }
        Self {
            user_id,
            role,
            purchases,
            active_tiers,
        }
    }

    /// Same as `new`, but filters raw grant rows against `now`.
    pub fn from_grants(
        user_id: Option<String>,
        role: Role,
        purchases: impl IntoIterator<Item = String>,
        grants: &[TierGrant],
        now: DateTime<Utc>,
    ) -> Self {
        let own: Vec<TierGrant> = grants
            .iter()
            .filter(|g| user_id.as_deref() == Some(g.user_id.as_str()) && g.is_active(now))
            .cloned()
            .collect();
        Self::new(
            user_id,
            role,
            purchases.into_iter().collect(),
            active_tiers(&own, now),
        )
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether a raw tip id/tier pair is visible in full.
    pub fn unlocks(&self, tip_id: &str, tier: PricingTier) -> bool {
        self.is_admin()
            || tier.is_free()
            || self.purchases.contains(tip_id)
            || self.active_tiers.contains(&tier)
    }
}

/// Admin, free tier, purchase, or active grant. Any one is enough.
pub fn is_unlocked(tip: &Tip, viewer: &Viewer) -> bool {
    viewer.unlocks(&tip.id, tip.pricing_tier)
}

/// A bet builder opens only when every leg it was built from is open.
pub fn is_entry_unlocked(entry: &MatchEntry, viewer: &Viewer) -> bool {
    match entry {
        MatchEntry::Single(tip) => is_unlocked(tip, viewer),
        MatchEntry::Composite(c) => c
            .constituents
            .iter()
            .all(|k| viewer.unlocks(&k.id, k.pricing_tier)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::group_by_match;
    use crate::types::TipStatus;
    use chrono::Duration;
    use chrono_tz::Europe::Warsaw;

    fn now() -> DateTime<Utc> {
        "2024-06-01T12:00:00Z".parse().unwrap()
    }

    fn tip(id: &str, tier: PricingTier) -> Tip {
        Tip {
            id: id.to_string(),
            match_date: Some(now()),
            home_team: "Lech".to_string(),
            away_team: "Legia".to_string(),
            league: "Ekstraklasa".to_string(),
            pick: "1".to_string(),
            odds: 2.1,
            stake: 10.0,
            pricing_tier: tier,
            status: TipStatus::Pending,
            analysis: Some("strong at home".to_string()),
            is_bet_builder: false,
            proof_image_url: None,
            settled_at: None,
            created_at: now(),
        }
    }

    fn grant(tier: PricingTier, expires_at: DateTime<Utc>) -> TierGrant {
        TierGrant {
            id: format!("g-{tier}"),
            user_id: "u1".to_string(),
            pricing_tier: tier,
            expires_at,
            granted_at: now() - Duration::hours(3),
            granted_by: Some("admin".to_string()),
        }
    }

    fn user(purchases: &[&str], grants: &[TierGrant]) -> Viewer {
        Viewer::from_grants(
            Some("u1".to_string()),
            Role::User,
            purchases.iter().map(|s| s.to_string()),
            grants,
            now(),
        )
    }

    #[test]
    fn admin_sees_everything() {
        let admin = Viewer::new(Some("root".to_string()), Role::Admin, HashSet::new(), HashSet::new());
        for tier in PricingTier::ALL {
            assert!(is_unlocked(&tip("x", tier), &admin));
        }
    }

    #[test]
    fn free_tier_open_to_all() {
        let free = tip("f", PricingTier::Free);
        assert!(is_unlocked(&free, &Viewer::anonymous()));
        assert!(is_unlocked(&free, &user(&[], &[])));
    }

    #[test]
    fn purchase_unlocks_single_tip() {
        let x = tip("x", PricingTier::Tier40);
        assert!(is_unlocked(&x, &user(&["x"], &[])));
        assert!(!is_unlocked(&x, &user(&[], &[])));
        assert!(!is_unlocked(&tip("y", PricingTier::Tier40), &user(&["x"], &[])));
    }

    #[test]
    fn active_grant_unlocks_whole_tier() {
        let x = tip("x", PricingTier::Tier40);
        let viewer = user(&[], &[grant(PricingTier::Tier40, now() + Duration::hours(1))]);
        assert!(is_unlocked(&x, &viewer));
        assert!(!is_unlocked(&tip("z", PricingTier::Tier75), &viewer));
    }

    #[test]
    fn grant_expiry_boundary() {
        let x = tip("x", PricingTier::Tier20);
        let expired = user(&[], &[grant(PricingTier::Tier20, now() - Duration::milliseconds(1))]);
        let live = user(&[], &[grant(PricingTier::Tier20, now() + Duration::milliseconds(1))]);
        let exact = user(&[], &[grant(PricingTier::Tier20, now())]);
        assert!(!is_unlocked(&x, &expired));
        assert!(is_unlocked(&x, &live));
        assert!(!is_unlocked(&x, &exact));
    }

    #[test]
    fn anonymous_cannot_hold_entitlements() {
        let mut purchases = HashSet::new();
        purchases.insert("x".to_string());
        let mut tiers = HashSet::new();
        tiers.insert(PricingTier::Tier10);
        let viewer = Viewer::new(None, Role::User, purchases.clone(), tiers.clone());
        assert!(viewer.purchases.is_empty());
        assert!(viewer.active_tiers.is_empty());
        assert!(!is_unlocked(&tip("x", PricingTier::Tier10), &viewer));

        let anon = Viewer::new(Some("u1".to_string()), Role::Anonymous, purchases, tiers);
        assert_eq!(anon, Viewer::anonymous());
    }

    #[test]
    fn admin_without_id_keeps_override() {
        let admin = Viewer::new(None, Role::Admin, HashSet::new(), HashSet::new());
        assert_eq!(admin.role, Role::Admin);
        assert!(is_unlocked(&tip("x", PricingTier::Tier100), &admin));
    }

    #[test]
    fn other_users_grants_are_ignored() {
        let mut foreign = grant(PricingTier::Tier10, now() + Duration::hours(2));
        foreign.user_id = "u2".to_string();
        let viewer = user(&[], &[foreign]);
        assert!(!is_unlocked(&tip("x", PricingTier::Tier10), &viewer));
    }

    #[test]
    fn resolution_is_repeatable() {
        let x = tip("x", PricingTier::Tier75);
        let viewer = user(&["x"], &[]);
        let first = is_unlocked(&x, &viewer);
        for _ in 0..10 {
            assert_eq!(is_unlocked(&x, &viewer), first);
        }
    }

    #[test]
    fn composite_needs_every_leg() {
        let mut a = tip("a", PricingTier::Tier10);
        let mut b = tip("b", PricingTier::Tier20);
        a.pick = "1".to_string();
        b.pick = "BTTS".to_string();
        let entries = group_by_match(&[a, b], &Warsaw);
        assert_eq!(entries.len(), 1);

        assert!(!is_entry_unlocked(&entries[0], &user(&["a"], &[])));
        assert!(is_entry_unlocked(&entries[0], &user(&["a", "b"], &[])));
        let mixed = user(&["b"], &[grant(PricingTier::Tier10, now() + Duration::hours(1))]);
        assert!(is_entry_unlocked(&entries[0], &mixed));
    }
}
