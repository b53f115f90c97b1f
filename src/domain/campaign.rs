//! Campaign model: recurring pump/dump rounds against an already-launched
//! token, cycling through a wallet pool with a round-robin cursor.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::task::{GasOverrides, SnipeWallet};

/// Direction of a campaign: pump buys, dump sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignMode {
    Pump,
    Dump,
}

impl std::fmt::Display for CampaignMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CampaignMode::Pump => "pump",
            CampaignMode::Dump => "dump",
        })
    }
}

/// Campaign lifecycle. Campaigns start stopped, run on a timer, and may be
/// paused and resumed; `Stopped` is re-enterable until the campaign is
/// deleted by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Stopped,
    Running,
    Paused,
}

/// Predicate that halts a running campaign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum StopCondition {
    /// Stop after this many successful trades.
    Count(u64),
    /// Stop once cumulative spend (BNB) reaches this.
    Amount(f64),
    /// Stop after this many seconds of runtime.
    Time(u64),
    /// Stop when the probed price crosses the target (direction depends on
    /// mode: pump stops at >=, dump at <=).
    Price(f64),
    /// Same directional rule, against the market-cap proxy.
    MarketCap(f64),
}

impl StopCondition {
    /// Whether evaluating this condition requires an on-chain probe.
    pub fn needs_probe(&self) -> bool {
        matches!(self, StopCondition::Price(_) | StopCondition::MarketCap(_))
    }
}

/// Running statistics, mutated only by the scheduler's round step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CampaignStats {
    /// Successful trades only; failures never advance the counter.
    pub executed_count: u64,
    /// Cumulative spend in BNB across successful trades.
    pub spent_amount: f64,
    pub started_at: Option<i64>,
    pub elapsed_secs: u64,
    /// Round-robin cursor into the wallet pool.
    pub cursor: usize,
}

/// A pump/dump campaign against one token.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub mode: CampaignMode,
    pub token: Address,
    /// Trade size range in BNB; each trade draws uniformly from it.
    pub amount_min_bnb: f64,
    pub amount_max_bnb: f64,
    pub interval_secs: u64,
    /// Wallets traded per round.
    pub thread_count: usize,
    pub stop: StopCondition,
    pub wallets: Vec<SnipeWallet>,
    pub gas: GasOverrides,
    pub status: CampaignStatus,
    pub stats: CampaignStats,
}

impl Campaign {
    /// Select the next `take` wallets starting at the cursor, wrapping
    /// modulo pool size, and advance the cursor. Pools smaller than the
    /// requested count yield each wallet at most once per round. The
    /// scheduler passes `thread_count`, clamped down when a count-based
    /// stop has fewer trades remaining.
    pub fn select_round_wallets(&mut self, take: usize) -> Vec<SnipeWallet> {
        if self.wallets.is_empty() || take == 0 {
            return Vec::new();
        }
        let pool = self.wallets.len();
        let take = take.min(pool);
        let selected = (0..take)
            .map(|i| self.wallets[(self.stats.cursor + i) % pool].clone())
            .collect();
        self.stats.cursor = (self.stats.cursor + take) % pool;
        selected
    }

    /// Evaluate the stop condition against local statistics and, for
    /// price/market-cap stops, the probed on-chain value.
    pub fn stop_satisfied(&self, probed: Option<f64>) -> bool {
        match self.stop {
            StopCondition::Count(target) => self.stats.executed_count >= target,
            StopCondition::Amount(target) => self.stats.spent_amount >= target,
            StopCondition::Time(target) => self.stats.elapsed_secs >= target,
            StopCondition::Price(target) | StopCondition::MarketCap(target) => {
                let Some(value) = probed else { return false };
                match self.mode {
                    CampaignMode::Pump => value >= target,
                    CampaignMode::Dump => value <= target,
                }
            }
        }
    }
}
