//! Launch detection: three redundant event channels racing to spot a
//! watched creator's token launch, orchestrated by `LaunchDetector`.
//!
//! The channels share one deduplication set and one filter/predict pipeline;
//! they differ only in how they observe the chain. "First to detect wins"
//! is an explicit race - the detector's terminal guard makes sure only one
//! winner ever triggers execution.

pub mod detector;
pub mod log_poll;
pub mod pending_poll;
pub mod pending_ws;
pub mod seen;

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::domain::task::{DetectedLaunch, EventSink, LogLevel};
use crate::launchpad::abi::{self, TOKEN_CREATED_TOPIC};
use crate::launchpad::predictor::predict_token_address;
use crate::ports::rpc::{wait_for_receipt, ChainRpc, TxRecord};

pub use detector::{DetectorHandle, LaunchDetector};
pub use seen::SeenHashes;

/// How long the prediction-miss fallback waits for the creation receipt.
const RECEIPT_FALLBACK_TIMEOUT: Duration = Duration::from_secs(60);

/// One way of observing the chain for the launch event. All implementations
/// run until the stop signal flips and never emit afterwards.
#[async_trait]
pub trait EventChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn watch(&self, detections: mpsc::Sender<DetectedLaunch>, stop: watch::Receiver<bool>);
}

/// Shared dependencies every channel needs.
#[derive(Clone)]
pub struct ChannelContext {
    pub rpc: Arc<dyn ChainRpc>,
    pub launchpad: Address,
    pub creator: Address,
    pub seen: Arc<SeenHashes>,
    pub events: EventSink,
}

pub(crate) fn is_stopped(stop: &watch::Receiver<bool>) -> bool {
    *stop.borrow()
}

/// Sleep that wakes early when the stop signal flips. Returns false when the
/// channel should exit.
pub(crate) async fn sleep_unless_stopped(
    duration: Duration,
    stop: &mut watch::Receiver<bool>,
) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(duration) => true,
        _ = stop.changed() => !*stop.borrow(),
    }
}

/// The common filter/predict pipeline over one pending transaction.
///
/// Filters to launchpad creations from the watched creator, predicts the
/// token address when the calldata allows it, and otherwise returns `None` -
/// prediction misses are non-fatal, the caller decides whether to fall back
/// to the receipt.
pub(crate) fn match_pending_creation(ctx: &ChannelContext, tx: &TxRecord) -> PendingMatch {
    if tx.to != Some(ctx.launchpad) || !abi::is_create_selector(&tx.input) {
        return PendingMatch::NotACreation;
    }
    if tx.from != ctx.creator {
        return PendingMatch::OtherCreator;
    }
    match predict_token_address(&tx.input) {
        Some(token) => PendingMatch::Predicted(token),
        None => PendingMatch::Unpredictable,
    }
}

pub(crate) enum PendingMatch {
    NotACreation,
    OtherCreator,
    /// A watched creation with a computable token address.
    Predicted(Address),
    /// A watched creation whose calldata carries no usable salt; only the
    /// confirmed log can name the token.
    Unpredictable,
}

/// Prediction-miss fallback: wait (bounded) for the creation receipt and
/// take the authoritative token address from the TokenCreated log.
pub(crate) async fn detect_from_receipt(
    ctx: &ChannelContext,
    tx_hash: B256,
    source: &'static str,
) -> Option<DetectedLaunch> {
    let receipt = match wait_for_receipt(ctx.rpc.as_ref(), tx_hash, RECEIPT_FALLBACK_TIMEOUT).await
    {
        Ok(Some(receipt)) if receipt.status => receipt,
        Ok(Some(_)) => {
            ctx.events.log(
                LogLevel::Warning,
                format!("creation transaction reverted: {tx_hash}"),
            );
            return None;
        }
        Ok(None) => {
            ctx.events.log(
                LogLevel::Warning,
                format!("timed out waiting for creation receipt: {tx_hash}"),
            );
            return None;
        }
        Err(e) => {
            ctx.events
                .log(LogLevel::Error, format!("receipt fetch failed: {e}"));
            return None;
        }
    };

    let event = receipt.logs.iter().find_map(|log| {
        if log.address != ctx.launchpad {
            return None;
        }
        let topic0 = log.topics.first().copied()?;
        if topic0 != TOKEN_CREATED_TOPIC {
            return None;
        }
        abi::decode_token_created(topic0, &log.data).ok()
    })?;

    Some(DetectedLaunch {
        creator: event.creator,
        token: event.token,
        tx_hash,
        block_number: receipt.block_number,
        source,
    })
}
