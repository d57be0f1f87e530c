use serde::{Deserialize, Serialize};

use crate::config::augmentation::{SYNTHETIC_LOST, SYNTHETIC_ODDS, SYNTHETIC_STAKE, SYNTHETIC_WON};
use crate::tier::PricingTier;
use crate::types::{Tip, TipStatus};

// ---------------------------------------------------------------------------
// Options and output
// ---------------------------------------------------------------------------

/// Which figure fills the fourth stats slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Headline {
    #[default]
    Profit,
    Yield,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsOptions {
    /// Blend the fixed synthetic record in before computing rate and yield.
    /// Forces the yield headline.
    pub display_augmentation: bool,
    pub headline: Headline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum HeadlineValue {
    /// Units won or lost.
    Profit(f64),
    /// Percent of the amount staked.
    Yield(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// Percent, 0.0 when nothing is settled.
    pub win_rate: f64,
    pub won: u32,
    pub lost: u32,
    pub headline: HeadlineValue,
    pub augmented: bool,
}

impl Stats {
    /// One decimal for the ledger, two for the augmented widget.
    pub fn win_rate_label(&self) -> String {
        if self.augmented {
            format!("{:.2}%", self.win_rate)
        } else {
            format!("{:.1}%", self.win_rate)
        }
    }

    pub fn headline_label(&self) -> String {
        match self.headline {
            HeadlineValue::Profit(p) => format!("{}{:.1} u", if p >= 0.0 { "+" } else { "" }, p),
            HeadlineValue::Yield(y) => format!("{}{:.1}%", if y >= 0.0 { "+" } else { "" }, y),
        }
    }
}

/// Per-tier breakdown for the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierStat {
    pub tier: PricingTier,
    /// Includes pending tips.
    pub total: u32,
    pub won: u32,
    pub lost: u32,
    pub win_rate: f64,
    pub yield_pct: f64,
    pub profit: f64,
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Ledger {
    won: u32,
    lost: u32,
    void: u32,
    profit: f64,
    /// Won and Lost stakes only.
    staked: f64,
    void_staked: f64,
}

impl Ledger {
    /// Pending tips contribute nothing. Void counts as settled but moves no money.
    fn from_tips<'a>(tips: impl IntoIterator<Item = &'a Tip>) -> Self {
        let mut ledger = Ledger::default();
        for tip in tips {
            match tip.status {
                TipStatus::Won => {
                    ledger.won += 1;
                    ledger.profit += (tip.odds - 1.0) * tip.stake;
                    ledger.staked += tip.stake;
                }
                TipStatus::Lost => {
                    ledger.lost += 1;
                    ledger.profit -= tip.stake;
                    ledger.staked += tip.stake;
                }
                TipStatus::Void => {
                    ledger.void += 1;
                    ledger.void_staked += tip.stake;
                }
                TipStatus::Pending => {}
            }
        }
        ledger
    }

    fn synthetic() -> Self {
        Ledger {
            won: SYNTHETIC_WON,
            lost: SYNTHETIC_LOST,
            profit: f64::from(SYNTHETIC_WON) * (SYNTHETIC_ODDS - 1.0) * SYNTHETIC_STAKE
                - f64::from(SYNTHETIC_LOST) * SYNTHETIC_STAKE,
            staked: f64::from(SYNTHETIC_WON + SYNTHETIC_LOST) * SYNTHETIC_STAKE,
            ..Ledger::default()
        }
    }

    fn plus(self, other: Ledger) -> Ledger {
        Ledger {
            won: self.won + other.won,
            lost: self.lost + other.lost,
            void: self.void + other.void,
            profit: self.profit + other.profit,
            staked: self.staked + other.staked,
            void_staked: self.void_staked + other.void_staked,
        }
    }

    /// Wins over every settled tip, Void included.
    fn win_rate(&self) -> f64 {
        let settled = self.won + self.lost + self.void;
        if settled == 0 {
            0.0
        } else {
            f64::from(self.won) / f64::from(settled) * 100.0
        }
    }

    fn yield_pct(&self) -> f64 {
        percent_of(self.profit, self.staked)
    }

    /// Yield over every settled stake, Void included. Used by the tier breakdown.
    fn settled_yield_pct(&self) -> f64 {
        percent_of(self.profit, self.staked + self.void_staked)
    }
}

fn percent_of(profit: f64, staked: f64) -> f64 {
    if staked > 0.0 {
        profit / staked * 100.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// Display aggregates over a settled-tip snapshot. The augmentation overlay
/// is rebuilt on every call and never written back anywhere.
pub fn project(settled: &[Tip], options: StatsOptions) -> Stats {
    let mut ledger = Ledger::from_tips(settled);
    if options.display_augmentation {
        ledger = ledger.plus(Ledger::synthetic());
    }

    let headline = if options.display_augmentation || options.headline == Headline::Yield {
        HeadlineValue::Yield(ledger.yield_pct())
    } else {
        HeadlineValue::Profit(ledger.profit)
    };

    Stats {
        win_rate: ledger.win_rate(),
        won: ledger.won,
        lost: ledger.lost,
        headline,
        augmented: options.display_augmentation,
    }
}

/// One row per tier, lowest rank first. Never augmented.
pub fn tier_breakdown(tips: &[Tip]) -> Vec<TierStat> {
    PricingTier::ALL
        .into_iter()
        .map(|tier| {
            let in_tier: Vec<&Tip> = tips.iter().filter(|t| t.pricing_tier == tier).collect();
            let ledger = Ledger::from_tips(in_tier.iter().copied());
            TierStat {
                tier,
                total: in_tier.len() as u32,
                won: ledger.won,
                lost: ledger.lost,
                win_rate: ledger.win_rate(),
                yield_pct: ledger.settled_yield_pct(),
                profit: ledger.profit,
            }
        })
        .collect()
}
