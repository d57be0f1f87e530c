use std::collections::HashMap;

use chrono::{NaiveDate, TimeZone};

use crate::config::PICK_SEPARATOR;
use crate::tier::PricingTier;
use crate::time_window::calendar_date;
use crate::types::Tip;

// ---------------------------------------------------------------------------
// Output shapes
// ---------------------------------------------------------------------------

/// A raw tip folded into a composite. Purchases always reference these ids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constituent {
    pub id: String,
    pub pricing_tier: PricingTier,
}

impl From<&Tip> for Constituent {
    fn from(tip: &Tip) -> Self {
        Self {
            id: tip.id.clone(),
            pricing_tier: tip.pricing_tier,
        }
    }
}

/// Bet builder assembled from every tip on one match. Built fresh per pass,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeTip {
    pub tip: Tip,
    /// In input order.
    pub constituents: Vec<Constituent>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchEntry {
    Single(Tip),
    Composite(CompositeTip),
}

impl MatchEntry {
    pub fn tip(&self) -> &Tip {
        match self {
            MatchEntry::Single(tip) => tip,
            MatchEntry::Composite(c) => &c.tip,
        }
    }

    pub fn constituents(&self) -> Vec<Constituent> {
        match self {
            MatchEntry::Single(tip) => vec![Constituent::from(tip)],
            MatchEntry::Composite(c) => c.constituents.clone(),
        }
    }

    pub fn constituent_ids(&self) -> Vec<String> {
        self.constituents().into_iter().map(|c| c.id).collect()
    }

    pub fn contains(&self, tip_id: &str) -> bool {
        match self {
            MatchEntry::Single(tip) => tip.id == tip_id,
            MatchEntry::Composite(c) => c.constituents.iter().any(|k| k.id == tip_id),
        }
    }
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Same teams on the same calendar day is the same match. Time of day is
/// ignored, so same-day double-headers collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MatchKey {
    home_team: String,
    away_team: String,
    date: NaiveDate,
}

/// None puts the tip in a group of its own.
fn match_key<Tz: TimeZone>(tip: &Tip, tz: &Tz) -> Option<MatchKey> {
    let match_date = tip.match_date?;
    if tip.home_team.trim().is_empty() || tip.away_team.trim().is_empty() {
        return None;
    }
    Some(MatchKey {
        home_team: tip.home_team.clone(),
        away_team: tip.away_team.clone(),
        date: calendar_date(match_date, tz),
    })
}

/// Collapse tips on the same match into bet builders, newest match first.
///
/// Always feed the raw snapshot. Re-grouping a list that already contains
/// composites next to their own constituents would count legs twice.
pub fn group_by_match<Tz: TimeZone>(tips: &[Tip], tz: &Tz) -> Vec<MatchEntry> {
    let mut groups: Vec<Vec<&Tip>> = Vec::new();
    let mut slot_by_key: HashMap<MatchKey, usize> = HashMap::new();

    for tip in tips {
        match match_key(tip, tz) {
            Some(key) => match slot_by_key.get(&key) {
                Some(&slot) => groups[slot].push(tip),
                None => {
                    slot_by_key.insert(key, groups.len());
                    groups.push(vec![tip]);
                }
            },
            None => groups.push(vec![tip]),
        }
    }

    let mut entries: Vec<MatchEntry> = groups
        .into_iter()
        .map(|group| match group.as_slice() {
            [only] => MatchEntry::Single((*only).clone()),
            _ => MatchEntry::Composite(merge(&group)),
        })
        .collect();

    // Stable, descending; tips without a date sink to the end.
    entries.sort_by(|a, b| b.tip().match_date.cmp(&a.tip().match_date));
    entries
}

/// Split a pick on the leg separator, dropping blank legs.
pub fn flatten_legs(pick: &str) -> impl Iterator<Item = &str> {
    pick.split(PICK_SEPARATOR)
        .map(str::trim)
        .filter(|leg| !leg.is_empty())
}

fn merge(group: &[&Tip]) -> CompositeTip {
    // Highest tier wins; first occurrence wins ties.
    let mut base = group[0];
    for tip in &group[1..] {
        if tip.pricing_tier.rank() > base.pricing_tier.rank() {
            base = tip;
        }
    }

    let legs: Vec<&str> = group.iter().flat_map(|t| flatten_legs(&t.pick)).collect();
    let odds: f64 = group.iter().map(|t| t.odds).product();
    let analyses: Vec<&str> = group
        .iter()
        .filter_map(|t| t.analysis.as_deref())
        .filter(|a| !a.trim().is_empty())
        .collect();

    let mut tip = base.clone();
    tip.pick = legs.join(PICK_SEPARATOR);
    tip.odds = odds;
    tip.is_bet_builder = true;
    tip.analysis = if analyses.is_empty() {
        None
    } else {
        Some(analyses.join(PICK_SEPARATOR))
    };

    CompositeTip {
        tip,
        constituents: group.iter().map(|t| Constituent::from(*t)).collect(),
    }
}
