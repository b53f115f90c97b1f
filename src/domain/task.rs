//! Snipe task model and the event surface exposed to the UI/store layer.
//!
//! A `LaunchTask` is one-shot: it watches a single creator wallet, fires the
//! multi-wallet buy on the first detected launch, and then reaches a terminal
//! status exactly once. The task data itself is plain state - all mutation
//! happens inside the detector that owns it.

use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Lifecycle of a launch-sniping task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Stopped,
}

impl TaskStatus {
    /// Terminal states admit no further detection activity.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Stopped
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// An execution wallet: address plus signing key material.
///
/// Never persisted by this crate - ownership of key storage belongs to the
/// external wallet store. The Debug impl redacts the key.
#[derive(Clone, Serialize, Deserialize)]
pub struct SnipeWallet {
    pub address: Address,
    pub private_key: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl std::fmt::Debug for SnipeWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnipeWallet")
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("label", &self.label)
            .finish()
    }
}

/// Gas overrides supplied by the caller; `None` means node defaults.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GasOverrides {
    /// Gas price in gwei.
    pub gas_price_gwei: Option<u64>,
    pub gas_limit: Option<u64>,
}

impl GasOverrides {
    pub fn gas_price_wei(&self) -> Option<u128> {
        self.gas_price_gwei.map(|gwei| gwei as u128 * 1_000_000_000)
    }
}

/// One launch-sniping task configuration.
#[derive(Debug, Clone)]
pub struct LaunchTask {
    pub id: String,
    /// The creator wallet being watched.
    pub target_creator: Address,
    /// Buy size per execution wallet, in BNB.
    pub buy_amount_bnb: f64,
    pub gas: GasOverrides,
    pub wallets: Vec<SnipeWallet>,
    pub status: TaskStatus,
    pub created_at: i64,
    pub custom_http_rpc: Option<String>,
    pub custom_wss_rpc: Option<String>,
}

impl LaunchTask {
    pub fn new(id: impl Into<String>, target_creator: Address, buy_amount_bnb: f64) -> Self {
        Self {
            id: id.into(),
            target_creator,
            buy_amount_bnb,
            gas: GasOverrides::default(),
            wallets: Vec::new(),
            status: TaskStatus::Pending,
            created_at: chrono::Utc::now().timestamp_millis(),
            custom_http_rpc: None,
            custom_wss_rpc: None,
        }
    }

    pub fn with_wallets(mut self, wallets: Vec<SnipeWallet>) -> Self {
        self.wallets = wallets;
        self
    }

    pub fn with_gas(mut self, gas: GasOverrides) -> Self {
        self.gas = gas;
        self
    }
}

/// A launch found by one of the event channels.
///
/// Produced at most once per task; `block_number` is zero while the creation
/// transaction is still pending (predicted address), non-zero when taken from
/// a confirmed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedLaunch {
    pub creator: Address,
    pub token: Address,
    pub tx_hash: B256,
    pub block_number: u64,
    /// Which channel won the race; diagnostic only.
    pub source: &'static str,
}

/// Per-wallet result of one executor fan-out. A full `Vec<BuyOutcome>` is the
/// atomic output of a buy invocation and is never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyOutcome {
    pub wallet: Address,
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub error: Option<String>,
}

impl BuyOutcome {
    pub fn submitted(wallet: Address, tx_hash: B256) -> Self {
        Self {
            wallet,
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
        }
    }

    pub fn failed(wallet: Address, error: impl Into<String>) -> Self {
        Self {
            wallet,
            success: false,
            tx_hash: None,
            error: Some(error.into()),
        }
    }
}

/// Convert a BNB amount to wei, flooring sub-wei precision the way the
/// launchpad UI does.
pub fn bnb_to_wei(amount_bnb: f64) -> alloy::primitives::U256 {
    alloy::primitives::U256::from((amount_bnb * 1e18).floor().max(0.0) as u128)
}

/// Severity of a structured log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Structured log entry surfaced to the UI; presentation is the UI's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: i64,
    pub level: LogLevel,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<B256>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: chrono::Utc::now().timestamp_millis(),
            level,
            message: message.into(),
            wallet: None,
            tx_hash: None,
        }
    }
}

/// Everything the excluded UI/store layer consumes from a running task.
#[derive(Debug, Clone)]
pub enum SnipeEvent {
    Log(LogEntry),
    LaunchDetected(DetectedLaunch),
    BuyComplete(Vec<BuyOutcome>),
    StatusChange(TaskStatus),
}

/// Cloneable handle the detector, channels, and executor use to publish
/// events. Log entries are mirrored to `tracing` and delivered best-effort:
/// a slow or absent consumer never blocks the hot path.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<SnipeEvent>,
}

impl EventSink {
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<SnipeEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx }, rx)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.push(LogEntry::new(level, message));
    }

    pub fn log_wallet(&self, level: LogLevel, message: impl Into<String>, wallet: Address) {
        let mut entry = LogEntry::new(level, message);
        entry.wallet = Some(wallet);
        self.push(entry);
    }

    fn push(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info | LogLevel::Success => tracing::info!("{}", entry.message),
            LogLevel::Warning => tracing::warn!("{}", entry.message),
            LogLevel::Error => tracing::error!("{}", entry.message),
        }
        let _ = self.tx.try_send(SnipeEvent::Log(entry));
    }

    /// Deliver a non-log event; these the consumer should not miss, so this
    /// one awaits channel capacity.
    pub async fn emit(&self, event: SnipeEvent) {
        let _ = self.tx.send(event).await;
    }
}
