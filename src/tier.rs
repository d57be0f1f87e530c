//! Pricing tier catalog. The enumeration order is the rank order, so
//! comparisons, tie-breaks and the admin breakdown all agree on one ordering.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PricingTier {
    #[serde(rename = "Free")]
    Free,
    #[serde(rename = "10 PLN")]
    Tier10,
    #[serde(rename = "20 PLN")]
    Tier20,
    #[serde(rename = "40 PLN")]
    Tier40,
    #[serde(rename = "75 PLN")]
    Tier75,
    #[serde(rename = "100 PLN")]
    Tier100,
}

impl PricingTier {
    /// Every tier, lowest rank first.
    pub const ALL: [PricingTier; 6] = [
        PricingTier::Free,
        PricingTier::Tier10,
        PricingTier::Tier20,
        PricingTier::Tier40,
        PricingTier::Tier75,
        PricingTier::Tier100,
    ];

    /// Tiers an operator can grant. Free needs no grant.
    pub const PAID: [PricingTier; 5] = [
        PricingTier::Tier10,
        PricingTier::Tier20,
        PricingTier::Tier40,
        PricingTier::Tier75,
        PricingTier::Tier100,
    ];

    pub fn rank(self) -> u8 {
        match self {
            PricingTier::Free => 0,
            PricingTier::Tier10 => 1,
            PricingTier::Tier20 => 2,
            PricingTier::Tier40 => 3,
            PricingTier::Tier75 => 4,
            PricingTier::Tier100 => 5,
        }
    }

    /// Price in whole PLN.
    pub fn price(self) -> u32 {
        match self {
            PricingTier::Free => 0,
            PricingTier::Tier10 => 10,
            PricingTier::Tier20 => 20,
            PricingTier::Tier40 => 40,
            PricingTier::Tier75 => 75,
            PricingTier::Tier100 => 100,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PricingTier::Free => "Free",
            PricingTier::Tier10 => "10 PLN",
            PricingTier::Tier20 => "20 PLN",
            PricingTier::Tier40 => "40 PLN",
            PricingTier::Tier75 => "75 PLN",
            PricingTier::Tier100 => "100 PLN",
        }
    }

    pub fn is_free(self) -> bool {
        self == PricingTier::Free
    }
}

impl std::fmt::Display for PricingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for PricingTier {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PricingTier::ALL
            .into_iter()
            .find(|tier| tier.label() == s)
            .ok_or_else(|| AppError::UnknownTier(s.to_string()))
    }
}
