//! Pending-subscription channel: the fastest detection path.
//!
//! Subscribes to the node's pending-transaction hash feed, pulls the full
//! transaction for each hash, and runs the filter/predict pipeline. A
//! successful prediction emits immediately, before the creation even mines;
//! a prediction miss falls back to waiting for the receipt. The stream
//! reconnects with bounded backoff and gives up after `MAX_RECONNECTS`,
//! leaving detection to the two poll channels.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::adapters::chain::ws::PendingHashFeed;
use crate::domain::task::{DetectedLaunch, LogLevel};

use super::{
    detect_from_receipt, is_stopped, match_pending_creation, sleep_unless_stopped, ChannelContext,
    EventChannel, PendingMatch,
};

pub const CHANNEL_NAME: &str = "pending-subscription";

const MAX_RECONNECTS: u32 = 10;
const RECONNECT_BASE_DELAY_MS: u64 = 1_000;
const MAX_RECONNECT_DELAY_MS: u64 = 30_000;

pub struct PendingSubscriptionChannel {
    ctx: ChannelContext,
    wss_url: String,
}

impl PendingSubscriptionChannel {
    pub fn new(ctx: ChannelContext, wss_url: impl Into<String>) -> Self {
        Self {
            ctx,
            wss_url: wss_url.into(),
        }
    }

    /// Fetch, filter, and (maybe) emit for one pending hash. Runs detached
    /// so a slow transaction fetch never stalls the feed.
    async fn process_hash(
        ctx: ChannelContext,
        hash: alloy::primitives::B256,
        detections: mpsc::Sender<DetectedLaunch>,
        stop: watch::Receiver<bool>,
    ) {
        let tx = match ctx.rpc.transaction_by_hash(hash).await {
            Ok(Some(tx)) => tx,
            // not propagated yet or already dropped; the poll channels cover it
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("pending tx fetch failed for {hash}: {e}");
                return;
            }
        };

        let detection = match match_pending_creation(&ctx, &tx) {
            PendingMatch::NotACreation | PendingMatch::OtherCreator => return,
            PendingMatch::Predicted(token) => {
                ctx.events.log(
                    LogLevel::Success,
                    format!("[{CHANNEL_NAME}] predicted token {token} from pending {hash}"),
                );
                DetectedLaunch {
                    creator: tx.from,
                    token,
                    tx_hash: hash,
                    block_number: 0,
                    source: CHANNEL_NAME,
                }
            }
            PendingMatch::Unpredictable => {
                ctx.events.log(
                    LogLevel::Warning,
                    format!("[{CHANNEL_NAME}] prediction miss for {hash}, waiting for receipt"),
                );
                match detect_from_receipt(&ctx, hash, CHANNEL_NAME).await {
                    Some(detection) => detection,
                    None => return,
                }
            }
        };

        if is_stopped(&stop) {
            return;
        }
        let _ = detections.send(detection).await;
    }
}

#[async_trait]
impl EventChannel for PendingSubscriptionChannel {
    fn name(&self) -> &'static str {
        CHANNEL_NAME
    }

    async fn watch(&self, detections: mpsc::Sender<DetectedLaunch>, stop: watch::Receiver<bool>) {
        let mut stop_rx = stop.clone();
        let mut reconnects = 0u32;

        loop {
            if is_stopped(&stop_rx) {
                return;
            }

            match PendingHashFeed::connect(&self.wss_url).await {
                Ok(mut feed) => {
                    reconnects = 0;
                    self.ctx.events.log(
                        LogLevel::Info,
                        format!("[{CHANNEL_NAME}] subscribed at {}", self.wss_url),
                    );

                    loop {
                        tokio::select! {
                            _ = stop_rx.changed() => {
                                if *stop_rx.borrow() {
                                    return;
                                }
                            }
                            maybe_hash = feed.next_hash() => {
                                let Some(hash) = maybe_hash else {
                                    // stream closed; fall through to reconnect
                                    break;
                                };
                                if !self.ctx.seen.insert(hash) {
                                    continue;
                                }
                                tokio::spawn(Self::process_hash(
                                    self.ctx.clone(),
                                    hash,
                                    detections.clone(),
                                    stop.clone(),
                                ));
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::debug!("[{CHANNEL_NAME}] connect failed: {e}");
                }
            }

            reconnects += 1;
            if reconnects > MAX_RECONNECTS {
                self.ctx.events.log(
                    LogLevel::Error,
                    format!(
                        "[{CHANNEL_NAME}] gave up after {MAX_RECONNECTS} reconnects; \
                         poll channels remain active"
                    ),
                );
                return;
            }

            self.ctx.events.log(
                LogLevel::Warning,
                format!("[{CHANNEL_NAME}] disconnected, reconnect {reconnects}/{MAX_RECONNECTS}"),
            );
            let delay_ms = std::cmp::min(
                RECONNECT_BASE_DELAY_MS * 2u64.pow(reconnects.min(10)),
                MAX_RECONNECT_DELAY_MS,
            );
            if !sleep_unless_stopped(Duration::from_millis(delay_ms), &mut stop_rx).await {
                return;
            }
        }
    }
}
