//! Purchases act on what the viewer sees (a grouped entry) but are recorded
//! against raw tip ids only. A bet builder is bought leg by leg, skipping any
//! leg the viewer can already open.

use std::collections::HashSet;

use serde::Serialize;

use crate::aggregator::{Constituent, MatchEntry};
use crate::entitlement::resolver::Viewer;
use crate::error::{AppError, Result};
use crate::types::Purchase;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchasePlan {
    /// Raw tip ids that get a purchase row, with the price charged for each.
    pub to_buy: Vec<(String, u32)>,
    /// Raw tip ids skipped because the viewer can already open them.
    pub already_owned: Vec<String>,
    /// Sum of the prices in `to_buy`.
    pub amount: u32,
}

impl PurchasePlan {
    pub fn is_empty(&self) -> bool {
        self.to_buy.is_empty()
    }

    /// Purchase rows to record for `user_id`, one per leg bought.
    pub fn purchases(&self, user_id: &str) -> Vec<Purchase> {
        self.to_buy
            .iter()
            .map(|(tip_id, price)| Purchase {
                user_id: user_id.to_string(),
                tip_id: tip_id.clone(),
                amount_paid: f64::from(*price),
            })
            .collect()
    }
}

/// Map requested ids onto the entries that hold them and return every leg of
/// those entries, deduplicated, in display order. Asking for any one leg of a
/// bet builder buys the whole builder.
pub fn expand_to_entries(entries: &[MatchEntry], requested: &[String]) -> Result<Vec<Constituent>> {
    if requested.is_empty() {
        return Err(AppError::BadRequest("no tip ids given".to_string()));
    }
    if let Some(missing) = requested
        .iter()
        .find(|id| !entries.iter().any(|e| e.contains(id)))
    {
        return Err(AppError::NotFound(format!("tip {missing}")));
    }

    let mut seen = HashSet::new();
    Ok(entries
        .iter()
        .filter(|e| requested.iter().any(|id| e.contains(id)))
        .flat_map(MatchEntry::constituents)
        .filter(|k| seen.insert(k.id.clone()))
        .collect())
}

pub fn plan_purchase(legs: &[Constituent], viewer: &Viewer) -> PurchasePlan {
    let mut plan = PurchasePlan {
        to_buy: Vec::new(),
        already_owned: Vec::new(),
        amount: 0,
    };
    for leg in legs {
        if viewer.unlocks(&leg.id, leg.pricing_tier) {
            plan.already_owned.push(leg.id.clone());
        } else {
            let price = leg.pricing_tier.price();
            plan.amount += price;
            plan.to_buy.push((leg.id.clone(), price));
        }
    }
    plan
}
