//! Pending-poll channel: HTTP fallback for the pending pool.
//!
//! Polls the node's pending block (with transaction bodies) on a sub-second
//! interval and runs the same filter/predict pipeline as the subscription
//! channel. Exists for nodes without WebSocket push and as race insurance
//! when the subscription drops. Prediction misses are left to the
//! confirmed-log channel, which guarantees eventual detection anyway.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::task::{DetectedLaunch, LogLevel};

use super::{
    is_stopped, match_pending_creation, sleep_unless_stopped, ChannelContext, EventChannel,
    PendingMatch,
};

pub const CHANNEL_NAME: &str = "pending-poll";

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct PendingPollChannel {
    ctx: ChannelContext,
    interval: Duration,
}

impl PendingPollChannel {
    pub fn new(ctx: ChannelContext) -> Self {
        Self {
            ctx,
            interval: POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl EventChannel for PendingPollChannel {
    fn name(&self) -> &'static str {
        CHANNEL_NAME
    }

    async fn watch(&self, detections: mpsc::Sender<DetectedLaunch>, stop: watch::Receiver<bool>) {
        let mut stop_rx = stop;
        self.ctx
            .events
            .log(LogLevel::Info, format!("[{CHANNEL_NAME}] polling started"));

        loop {
            if is_stopped(&stop_rx) {
                return;
            }

            match self.ctx.rpc.pending_transactions().await {
                Ok(txs) => {
                    for tx in txs {
                        if is_stopped(&stop_rx) {
                            return;
                        }
                        if !self.ctx.seen.insert(tx.hash) {
                            continue;
                        }
                        match match_pending_creation(&self.ctx, &tx) {
                            PendingMatch::NotACreation | PendingMatch::OtherCreator => {}
                            PendingMatch::Predicted(token) => {
                                self.ctx.events.log(
                                    LogLevel::Success,
                                    format!(
                                        "[{CHANNEL_NAME}] predicted token {token} from pending {}",
                                        tx.hash
                                    ),
                                );
                                let detection = DetectedLaunch {
                                    creator: tx.from,
                                    token,
                                    tx_hash: tx.hash,
                                    block_number: 0,
                                    source: CHANNEL_NAME,
                                };
                                let _ = detections.send(detection).await;
                            }
                            PendingMatch::Unpredictable => {
                                self.ctx.events.log(
                                    LogLevel::Warning,
                                    format!(
                                        "[{CHANNEL_NAME}] prediction miss for {}; \
                                         log channel will pick it up",
                                        tx.hash
                                    ),
                                );
                            }
                        }
                    }
                }
                // transient pool errors never kill the loop
                Err(e) => tracing::debug!("[{CHANNEL_NAME}] pending block fetch failed: {e}"),
            }

            if !sleep_unless_stopped(self.interval, &mut stop_rx).await {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::EventSink;
    use crate::launchpad::abi::{CREATE_AND_BUY_SELECTOR, FOURMEME_CONTRACT};
    use crate::ports::mocks::MockChainRpc;
    use crate::ports::rpc::TxRecord;
    use alloy::primitives::{Address, B256, U256};
    use std::sync::Arc;

    fn creation_tx(creator: Address, salt_byte: u8, hash_byte: u8) -> TxRecord {
        let mut input = CREATE_AND_BUY_SELECTOR.to_vec();
        input.extend_from_slice(&[0u8; 5 * 32]);
        let mut salt = [0u8; 32];
        salt[31] = salt_byte;
        input.extend_from_slice(&salt);
        input.extend_from_slice(&[0u8; 32]);
        TxRecord {
            hash: B256::from_slice(&[hash_byte; 32]),
            from: creator,
            to: Some(FOURMEME_CONTRACT),
            input: input.into(),
            value: U256::from(1u64),
        }
    }

    fn context(rpc: Arc<MockChainRpc>, creator: Address) -> ChannelContext {
        let (events, _rx) = EventSink::new(64);
        ChannelContext {
            rpc,
            launchpad: FOURMEME_CONTRACT,
            creator,
            seen: Arc::new(crate::detect::SeenHashes::default()),
            events,
        }
    }

    #[tokio::test]
    async fn detects_watched_creation_exactly_once() {
        let creator = Address::from_slice(&[0xca; 20]);
        let rpc = Arc::new(MockChainRpc::new());
        // the same pending tx shows up on every poll; dedup must collapse it
        rpc.push_pending_tx(creation_tx(creator, 1, 0xaa));

        let ctx = context(Arc::clone(&rpc), creator);
        let channel = PendingPollChannel::new(ctx).with_interval(Duration::from_millis(5));
        let (det_tx, mut det_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { channel.watch(det_tx, stop_rx).await });

        let detection = tokio::time::timeout(Duration::from_secs(1), det_rx.recv())
            .await
            .expect("no detection")
            .expect("channel closed");
        assert_eq!(detection.creator, creator);
        assert_eq!(detection.block_number, 0);
        assert_eq!(detection.source, CHANNEL_NAME);

        // give the loop a few more polls; the dedup set must swallow them
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(det_rx.try_recv().is_err());

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn ignores_other_creators() {
        let creator = Address::from_slice(&[0xca; 20]);
        let stranger = Address::from_slice(&[0x55; 20]);
        let rpc = Arc::new(MockChainRpc::new());
        rpc.push_pending_tx(creation_tx(stranger, 1, 0xbb));

        let ctx = context(Arc::clone(&rpc), creator);
        let channel = PendingPollChannel::new(ctx).with_interval(Duration::from_millis(5));
        let (det_tx, mut det_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { channel.watch(det_tx, stop_rx).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(det_rx.try_recv().is_err());

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stops_promptly_on_signal() {
        let rpc = Arc::new(MockChainRpc::new());
        let ctx = context(rpc, Address::ZERO);
        let channel = PendingPollChannel::new(ctx).with_interval(Duration::from_millis(5));
        let (det_tx, _det_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { channel.watch(det_tx, stop_rx).await });
        stop_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("channel did not stop")
            .unwrap();
    }
}
