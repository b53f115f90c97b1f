//! Launch detector: orchestrates the event channels for one task.
//!
//! Starts every channel concurrently, funnels their detections into one
//! queue, and lets the first one through an atomic terminal guard - the
//! guard is compare-and-set, so two channels delivering the same launch
//! near-simultaneously can never double-fire the executor. After the single
//! execution the task reaches its terminal status and all channels are told
//! to stop; anything they emit afterwards is discarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::task::{
    bnb_to_wei, DetectedLaunch, EventSink, LaunchTask, LogLevel, SnipeEvent, TaskStatus,
};
use crate::execute::{NonceSequencer, WalletExecutor};
use crate::launchpad::abi::FOURMEME_CONTRACT;
use crate::ports::rpc::ChainRpc;
use crate::ports::signer::TransactionSigner;

use super::log_poll::LogPollChannel;
use super::pending_poll::PendingPollChannel;
use super::pending_ws::PendingSubscriptionChannel;
use super::{ChannelContext, EventChannel, SeenHashes};

/// Detection event queue depth; modest because exactly one entry matters.
const DETECTION_BUFFER: usize = 16;

/// Handle for stopping a running detector from outside. Stop is idempotent.
#[derive(Clone)]
pub struct DetectorHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl DetectorHandle {
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

pub struct LaunchDetector {
    task: LaunchTask,
    rpc: Arc<dyn ChainRpc>,
    executor: WalletExecutor,
    channels: Vec<Arc<dyn EventChannel>>,
    events: EventSink,
    stop: Arc<watch::Sender<bool>>,
    stop_rx: watch::Receiver<bool>,
    terminal: Arc<AtomicBool>,
}

impl LaunchDetector {
    /// Build a detector with the standard three channels. Returns the
    /// detector plus the event stream the UI/store consumes.
    pub fn new(
        task: LaunchTask,
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
        nonces: Arc<NonceSequencer>,
        chain_id: u64,
        wss_url: Option<String>,
    ) -> (Self, mpsc::Receiver<SnipeEvent>) {
        let (events, events_rx) = EventSink::new(256);
        let seen = Arc::new(SeenHashes::default());
        let ctx = ChannelContext {
            rpc: Arc::clone(&rpc),
            launchpad: FOURMEME_CONTRACT,
            creator: task.target_creator,
            seen,
            events: events.clone(),
        };

        let mut channels: Vec<Arc<dyn EventChannel>> = Vec::with_capacity(3);
        if let Some(url) = wss_url {
            channels.push(Arc::new(PendingSubscriptionChannel::new(ctx.clone(), url)));
        }
        channels.push(Arc::new(PendingPollChannel::new(ctx.clone())));
        channels.push(Arc::new(LogPollChannel::new(ctx)));

        let executor = WalletExecutor::new(
            Arc::clone(&rpc),
            signer,
            nonces,
            chain_id,
            events.clone(),
        );

        (
            Self::with_channels(task, rpc, executor, channels, events),
            events_rx,
        )
    }

    /// Assemble from explicit channels; the unit tests inject scripted ones.
    pub fn with_channels(
        task: LaunchTask,
        rpc: Arc<dyn ChainRpc>,
        executor: WalletExecutor,
        channels: Vec<Arc<dyn EventChannel>>,
        events: EventSink,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            task,
            rpc,
            executor,
            channels,
            events,
            stop: Arc::new(stop_tx),
            stop_rx,
            terminal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn handle(&self) -> DetectorHandle {
        DetectorHandle {
            stop: Arc::clone(&self.stop),
        }
    }

    pub fn task(&self) -> &LaunchTask {
        &self.task
    }

    /// Drive the one-shot detection/execution cycle to a terminal status.
    ///
    /// Channels are always told to stop before this returns; dropping a
    /// running detector without awaiting `run` would leak them.
    pub async fn run(mut self) -> TaskStatus {
        if let Err(status) = self.check_startup().await {
            self.set_status(status).await;
            let _ = self.stop.send(true);
            return status;
        }

        self.set_status(TaskStatus::Running).await;
        self.events.log(
            LogLevel::Info,
            format!(
                "watching creator {} with {} channel(s), {} wallet(s) armed",
                self.task.target_creator,
                self.channels.len(),
                self.task.wallets.len()
            ),
        );

        let (det_tx, mut det_rx) = mpsc::channel::<DetectedLaunch>(DETECTION_BUFFER);
        for channel in &self.channels {
            let channel = Arc::clone(channel);
            let det_tx = det_tx.clone();
            let stop_rx = self.stop_rx.clone();
            tokio::spawn(async move {
                channel.watch(det_tx, stop_rx).await;
            });
        }
        drop(det_tx);

        let mut status = TaskStatus::Stopped;
        while let Some(detection) = det_rx.recv().await {
            // a detection queued before an external stop must not execute
            if *self.stop_rx.borrow() && !self.terminal.load(Ordering::Acquire) {
                tracing::debug!(
                    "discarding detection from {} after external stop",
                    detection.source
                );
                continue;
            }
            // late or racing deliveries after the winner: discard
            if self
                .terminal
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                tracing::debug!(
                    "discarding detection from {} after terminal transition",
                    detection.source
                );
                continue;
            }

            status = self.execute(detection).await;
            break;
        }

        // channels stop whether we won, were stopped, or every channel died
        let _ = self.stop.send(true);

        if !self.terminal.swap(true, Ordering::AcqRel) {
            // no detection ever arrived: external stop or channel exhaustion
            status = TaskStatus::Stopped;
        }
        self.set_status(status).await;
        status
    }

    async fn check_startup(&self) -> Result<(), TaskStatus> {
        if self.task.wallets.is_empty() {
            self.events
                .log(LogLevel::Error, "no execution wallets configured");
            return Err(TaskStatus::Failed);
        }
        if self.channels.is_empty() {
            self.events.log(LogLevel::Error, "no detection channels");
            return Err(TaskStatus::Failed);
        }
        // one cheap call proves the endpoint is usable before we arm anything
        if let Err(e) = self.rpc.block_number().await {
            self.events
                .log(LogLevel::Error, format!("rpc endpoint unusable: {e}"));
            return Err(TaskStatus::Failed);
        }
        Ok(())
    }

    async fn execute(&self, detection: DetectedLaunch) -> TaskStatus {
        self.events.log(
            LogLevel::Success,
            format!(
                "launch detected via {}: token {} (block {})",
                detection.source, detection.token, detection.block_number
            ),
        );
        self.events
            .emit(SnipeEvent::LaunchDetected(detection.clone()))
            .await;

        let _ = self.stop.send(true);

        let outcomes = self
            .executor
            .buy(
                detection.token,
                &self.task.wallets,
                bnb_to_wei(self.task.buy_amount_bnb),
                &self.task.gas,
            )
            .await;

        let any_success = outcomes.iter().any(|o| o.success);
        self.events.emit(SnipeEvent::BuyComplete(outcomes)).await;

        if any_success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        }
    }

    async fn set_status(&mut self, status: TaskStatus) {
        self.task.status = status;
        self.events.emit(SnipeEvent::StatusChange(status)).await;
    }
}
