//! Confirmed-log poll channel: the authoritative (and slowest) path.
//!
//! Scans newly mined blocks for the launchpad's TokenCreated event and
//! filters by the watched creator. No prediction involved, so it cannot be
//! wrong - and it guarantees eventual detection even if both pending-based
//! paths miss the launch entirely.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::task::{DetectedLaunch, LogLevel};
use crate::launchpad::abi::{decode_token_created, TOKEN_CREATED_TOPIC};
use crate::ports::rpc::LogFilter;

use super::{is_stopped, sleep_unless_stopped, ChannelContext, EventChannel};

pub const CHANNEL_NAME: &str = "confirmed-log-poll";

const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Heartbeat every N polls so a silent chain doesn't look like a dead loop.
const HEARTBEAT_EVERY: u64 = 100;

pub struct LogPollChannel {
    ctx: ChannelContext,
    interval: Duration,
}

impl LogPollChannel {
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
impl EventChannel for LogPollChannel {
    fn name(&self) -> &'static str {
        CHANNEL_NAME
    }

    async fn watch(&self, detections: mpsc::Sender<DetectedLaunch>, stop: watch::Receiver<bool>) {
        let mut stop_rx = stop;
        let mut last_block = 0u64;
        let mut polls = 0u64;

        loop {
            if is_stopped(&stop_rx) {
                return;
            }

            match self.ctx.rpc.block_number().await {
                Ok(current) => {
                    if last_block == 0 {
                        last_block = current;
                        self.ctx.events.log(
                            LogLevel::Info,
                            format!("[{CHANNEL_NAME}] watching from block {current}"),
                        );
                    } else if current > last_block {
                        let filter = LogFilter {
                            address: self.ctx.launchpad,
                            topic0: Some(TOKEN_CREATED_TOPIC),
                            from_block: last_block + 1,
                            to_block: current,
                        };
                        match self.ctx.rpc.logs(&filter).await {
                            Ok(logs) => {
                                for log in logs {
                                    let Some(topic0) = log.topics.first().copied() else {
                                        continue;
                                    };
                                    let event = match decode_token_created(topic0, &log.data) {
                                        Ok(event) => event,
                                        Err(e) => {
                                            tracing::warn!(
                                                "[{CHANNEL_NAME}] undecodable TokenCreated \
                                                 in block {}: {e}",
                                                log.block_number
                                            );
                                            continue;
                                        }
                                    };
                                    if event.creator != self.ctx.creator {
                                        continue;
                                    }
                                    if is_stopped(&stop_rx) {
                                        return;
                                    }
                                    self.ctx.events.log(
                                        LogLevel::Success,
                                        format!(
                                            "[{CHANNEL_NAME}] confirmed token {} in block {}",
                                            event.token, log.block_number
                                        ),
                                    );
                                    let _ = detections
                                        .send(DetectedLaunch {
                                            creator: event.creator,
                                            token: event.token,
                                            tx_hash: log.tx_hash,
                                            block_number: log.block_number,
                                            source: CHANNEL_NAME,
                                        })
                                        .await;
                                }
                                last_block = current;
                            }
                            // range stays unconsumed; retried on the next poll
                            Err(e) => {
                                tracing::debug!("[{CHANNEL_NAME}] getLogs failed: {e}")
                            }
                        }
                    }

                    polls += 1;
                    if polls % HEARTBEAT_EVERY == 0 {
                        self.ctx.events.log(
                            LogLevel::Info,
                            format!("[{CHANNEL_NAME}] watching... current block {current}"),
                        );
                    }
                }
                Err(e) => tracing::debug!("[{CHANNEL_NAME}] blockNumber failed: {e}"),
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
    use crate::launchpad::abi::FOURMEME_CONTRACT;
    use crate::ports::mocks::MockChainRpc;
    use crate::ports::rpc::LogRecord;
    use alloy::primitives::{Address, B256};
    use std::sync::Arc;

    fn token_created_log(creator: Address, token: Address, block: u64) -> LogRecord {
        let mut data = Vec::new();
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(creator.as_slice());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(token.as_slice());
        LogRecord {
            address: FOURMEME_CONTRACT,
            topics: vec![TOKEN_CREATED_TOPIC],
            data: data.into(),
            block_number: block,
            tx_hash: B256::from_slice(&[0xcc; 32]),
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
    async fn detects_confirmed_launch_with_block_number() {
        let creator = Address::from_slice(&[0xca; 20]);
        let token = Address::from_slice(&[0x70; 20]);
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_block_number(100);

        let ctx = context(Arc::clone(&rpc), creator);
        let channel = LogPollChannel::new(ctx).with_interval(Duration::from_millis(5));
        let (det_tx, mut det_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { channel.watch(det_tx, stop_rx).await });

        // launch lands two blocks after watching began
        tokio::time::sleep(Duration::from_millis(20)).await;
        rpc.push_log(token_created_log(creator, token, 102));
        rpc.set_block_number(102);

        let detection = tokio::time::timeout(Duration::from_secs(1), det_rx.recv())
            .await
            .expect("no detection")
            .expect("channel closed");
        assert_eq!(detection.token, token);
        assert_eq!(detection.block_number, 102);
        assert_eq!(detection.source, CHANNEL_NAME);

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn filters_out_other_creators() {
        let creator = Address::from_slice(&[0xca; 20]);
        let stranger = Address::from_slice(&[0x55; 20]);
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_block_number(100);

        let ctx = context(Arc::clone(&rpc), creator);
        let channel = LogPollChannel::new(ctx).with_interval(Duration::from_millis(5));
        let (det_tx, mut det_rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move { channel.watch(det_tx, stop_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        rpc.push_log(token_created_log(
            stranger,
            Address::from_slice(&[0x70; 20]),
            101,
        ));
        rpc.set_block_number(101);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(det_rx.try_recv().is_err());

        stop_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
