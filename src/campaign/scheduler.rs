//! Campaign scheduler: recurring pump/dump rounds on a timer.
//!
//! Each round takes the next `thread_count` wallets off the round-robin
//! cursor and fires one trade per wallet through the external trade
//! executor, every trade with an independently randomized size and a small
//! staggered start so the RPC endpoint is not hit by a burst (a courtesy,
//! not a correctness requirement). Rounds settle - a single wallet's failed
//! trade is logged and never fails the round. Stop conditions are checked
//! after every round.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use rand::Rng;
use thiserror::Error;
use tokio::sync::{Notify, RwLock};

use crate::domain::campaign::{Campaign, CampaignMode, CampaignStatus, StopCondition};
use crate::domain::task::SnipeWallet;
use crate::ports::trade::{TradeExecutor, TradeRequest};

use super::marketcap::MarketCapProbe;

/// Per-wallet start stagger inside a round.
const STAGGER_STEP: Duration = Duration::from_millis(30);
const STAGGER_JITTER_MS: u64 = 10;

#[derive(Debug, Error)]
pub enum CampaignError {
    #[error("campaign has no wallets")]
    NoWallets,
    #[error("campaign is already running")]
    AlreadyRunning,
    #[error("stop condition needs a market probe but none is configured")]
    MissingProbe,
}

pub struct CampaignScheduler {
    campaign: Arc<RwLock<Campaign>>,
    trades: Arc<dyn TradeExecutor>,
    probe: Option<Arc<MarketCapProbe>>,
    tick_period: Option<Duration>,
    stop_notify: Arc<Notify>,
}

impl CampaignScheduler {
    pub fn new(campaign: Campaign, trades: Arc<dyn TradeExecutor>) -> Self {
        Self {
            campaign: Arc::new(RwLock::new(campaign)),
            trades,
            probe: None,
            tick_period: None,
            stop_notify: Arc::new(Notify::new()),
        }
    }

    /// Attach the probe price/market-cap stop conditions consult.
    pub fn with_probe(mut self, probe: Arc<MarketCapProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Override the round cadence (the campaign's `interval_secs` otherwise).
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = Some(period);
        self
    }

    /// Shared view of the campaign for status displays.
    pub fn campaign(&self) -> Arc<RwLock<Campaign>> {
        Arc::clone(&self.campaign)
    }

    /// Run until the stop condition fires or `stop()` is called. Executes
    /// one round immediately, then on every interval tick.
    pub async fn run(&self) -> Result<(), CampaignError> {
        let period = {
            let mut campaign = self.campaign.write().await;
            if campaign.wallets.is_empty() {
                return Err(CampaignError::NoWallets);
            }
            if campaign.status == CampaignStatus::Running {
                return Err(CampaignError::AlreadyRunning);
            }
            if campaign.stop.needs_probe() && self.probe.is_none() {
                return Err(CampaignError::MissingProbe);
            }
            campaign.status = CampaignStatus::Running;
            campaign.stats.started_at = Some(chrono::Utc::now().timestamp_millis());
            campaign.stats.cursor = 0;
            tracing::info!(
                "campaign '{}' started: {} every {}s across {} wallet(s)",
                campaign.name,
                campaign.mode,
                campaign.interval_secs,
                campaign.wallets.len()
            );
            self.tick_period
                .unwrap_or_else(|| Duration::from_secs(campaign.interval_secs.max(1)))
        };

        let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.stop_notify.notified() => break,
            }

            match self.campaign.read().await.status {
                CampaignStatus::Stopped => break,
                CampaignStatus::Paused => continue,
                CampaignStatus::Running => {}
            }

            self.update_elapsed().await;
            self.execute_round().await;

            if self.check_stop().await {
                break;
            }
        }

        let mut campaign = self.campaign.write().await;
        campaign.status = CampaignStatus::Stopped;
        tracing::info!(
            "campaign '{}' stopped after {} trade(s), {:.4} BNB",
            campaign.name,
            campaign.stats.executed_count,
            campaign.stats.spent_amount
        );
        Ok(())
    }

    pub async fn pause(&self) -> bool {
        let mut campaign = self.campaign.write().await;
        if campaign.status == CampaignStatus::Running {
            campaign.status = CampaignStatus::Paused;
            tracing::info!("campaign '{}' paused", campaign.name);
            true
        } else {
            false
        }
    }

    pub async fn resume(&self) -> bool {
        let mut campaign = self.campaign.write().await;
        if campaign.status == CampaignStatus::Paused {
            campaign.status = CampaignStatus::Running;
            tracing::info!("campaign '{}' resumed", campaign.name);
            true
        } else {
            false
        }
    }

    /// Stop promptly: flips the status and wakes the run loop mid-sleep.
    pub async fn stop(&self) {
        self.campaign.write().await.status = CampaignStatus::Stopped;
        self.stop_notify.notify_one();
    }

    async fn execute_round(&self) {
        let (mode, token, gas, plans) = {
            let mut campaign = self.campaign.write().await;

            // a count stop never overshoots: the last round shrinks to
            // exactly the trades still allowed
            let take = match campaign.stop {
                StopCondition::Count(target) => {
                    let remaining = target.saturating_sub(campaign.stats.executed_count);
                    campaign.thread_count.min(remaining as usize)
                }
                _ => campaign.thread_count,
            };
            let selected = campaign.select_round_wallets(take);
            if selected.is_empty() {
                return;
            }

            let mut rng = rand::thread_rng();
            let (lo, hi) = (campaign.amount_min_bnb, campaign.amount_max_bnb);
            let plans: Vec<(SnipeWallet, f64, Duration)> = selected
                .into_iter()
                .enumerate()
                .map(|(index, wallet)| {
                    let amount = if hi > lo { rng.gen_range(lo..=hi) } else { lo };
                    let delay = STAGGER_STEP * index as u32
                        + Duration::from_millis(rng.gen_range(0..=STAGGER_JITTER_MS));
                    (wallet, amount, delay)
                })
                .collect();
            (campaign.mode, campaign.token, campaign.gas, plans)
        };

        tracing::debug!("round: {} trade(s) queued", plans.len());

        let trades = plans.into_iter().map(|(wallet, amount, delay)| {
            let executor = Arc::clone(&self.trades);
            async move {
                tokio::time::sleep(delay).await;
                let address = wallet.address;
                let request = TradeRequest {
                    wallet,
                    token,
                    amount_bnb: amount,
                    sell_percent: 100,
                    gas,
                };
                let result = match mode {
                    CampaignMode::Pump => executor.buy(&request).await,
                    CampaignMode::Dump => executor.sell(&request).await,
                };
                match result {
                    Ok(outcome) if outcome.success => {
                        tracing::info!(
                            "{mode} trade ok from {address}: {:?}",
                            outcome.tx_hash
                        );
                        Some(amount)
                    }
                    Ok(outcome) => {
                        tracing::warn!(
                            "{mode} trade failed from {address}: {}",
                            outcome.error.unwrap_or_default()
                        );
                        None
                    }
                    Err(e) => {
                        tracing::warn!("{mode} trade errored from {address}: {e}");
                        None
                    }
                }
            }
        });

        // settle, don't fail the round
        let spent: Vec<f64> = join_all(trades).await.into_iter().flatten().collect();

        let mut campaign = self.campaign.write().await;
        for amount in spent {
            campaign.stats.executed_count += 1;
            campaign.stats.spent_amount += amount;
        }
    }

    async fn check_stop(&self) -> bool {
        let (stop, token) = {
            let campaign = self.campaign.read().await;
            (campaign.stop, campaign.token)
        };

        let probed = if stop.needs_probe() {
            let Some(probe) = self.probe.as_ref() else {
                return false;
            };
            let reading = match stop {
                StopCondition::Price(_) => probe.price(token).await,
                _ => probe.market_cap(token).await,
            };
            match reading {
                Ok(value) => Some(value),
                // probe failures are transient; try again after the next round
                Err(e) => {
                    tracing::debug!("market probe failed: {e}");
                    None
                }
            }
        } else {
            None
        };

        let mut campaign = self.campaign.write().await;
        if let Some(started) = campaign.stats.started_at {
            campaign.stats.elapsed_secs =
                ((chrono::Utc::now().timestamp_millis() - started) / 1000).max(0) as u64;
        }
        if campaign.stop_satisfied(probed) {
            tracing::info!(
                "campaign '{}' reached its stop condition ({:?})",
                campaign.name,
                campaign.stop
            );
            campaign.status = CampaignStatus::Stopped;
            return true;
        }
        false
    }

    async fn update_elapsed(&self) {
        let mut campaign = self.campaign.write().await;
        if let Some(started) = campaign.stats.started_at {
            campaign.stats.elapsed_secs =
                ((chrono::Utc::now().timestamp_millis() - started) / 1000).max(0) as u64;
        }
    }
}
