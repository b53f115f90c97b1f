//! Chain RPC port.
//!
//! The narrow slice of an EVM JSON-RPC node this engine consumes. Every
//! method may fail transiently; poll loops are expected to log and continue
//! rather than abort, while configuration-level failures (no endpoint at
//! all) surface at task start.

use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("node error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl RpcError {
    /// Transient faults are retried/ridden out by the polling loops.
    pub fn is_transient(&self) -> bool {
        matches!(self, RpcError::Transport(_) | RpcError::Timeout(_))
    }
}

/// A transaction as seen in a block or the pending pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRecord {
    pub hash: B256,
    pub from: Address,
    /// None for contract creations.
    pub to: Option<Address>,
    pub input: Bytes,
    pub value: U256,
}

/// An event log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub tx_hash: B256,
}

/// A mined transaction receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptRecord {
    pub status: bool,
    pub block_number: u64,
    pub logs: Vec<LogRecord>,
}

/// Filter for `eth_getLogs`.
#[derive(Debug, Clone)]
pub struct LogFilter {
    pub address: Address,
    pub topic0: Option<B256>,
    pub from_block: u64,
    pub to_block: u64,
}

#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn block_number(&self) -> Result<u64, RpcError>;

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TxRecord>, RpcError>;

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptRecord>, RpcError>;

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError>;

    /// The node's pending block with full transaction bodies.
    async fn pending_transactions(&self) -> Result<Vec<TxRecord>, RpcError>;

    /// Account nonce including pool-pending transactions.
    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError>;

    async fn gas_price(&self) -> Result<u128, RpcError>;

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError>;

    /// eth_call against latest state.
    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError>;

    async fn balance(&self, address: Address) -> Result<U256, RpcError>;
}

/// Poll for a transaction receipt, bounded by `timeout`.
///
/// Returns `Ok(None)` on timeout - a recoverable condition the caller logs,
/// never a crash of the surrounding loop.
pub async fn wait_for_receipt(
    rpc: &dyn ChainRpc,
    hash: B256,
    timeout: Duration,
) -> Result<Option<ReceiptRecord>, RpcError> {
    const POLL_INTERVAL: Duration = Duration::from_millis(500);
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match rpc.transaction_receipt(hash).await {
            Ok(Some(receipt)) => return Ok(Some(receipt)),
            Ok(None) => {}
            // transient faults ride out the remaining window
            Err(e) if e.is_transient() => {
                tracing::debug!("receipt poll for {hash}: {e}");
            }
            Err(e) => return Err(e),
        }
        if tokio::time::Instant::now() + POLL_INTERVAL > deadline {
            return Ok(None);
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Map a raw node/signing error message onto the wallet-level taxonomy the
/// UI shows. Unrecognized messages pass through truncated.
pub fn classify_error(message: &str) -> String {
    let lower = message.to_lowercase();
    if lower.contains("nonce too low") || lower.contains("nonce provided") {
        return "nonce conflict: transaction already replaced or mined".into();
    }
    if lower.contains("insufficient_output_amount") || lower.contains("slippage") {
        return "slippage: price moved beyond tolerance".into();
    }
    if lower.contains("insufficient funds") || lower.contains("exceeds balance") {
        return "insufficient BNB balance for value + gas".into();
    }
    if lower.contains("transfer amount exceeds") {
        return "token balance too low".into();
    }
    if lower.contains("allowance") {
        return "token allowance too low".into();
    }
    if lower.contains("intrinsic gas too low") || lower.contains("gas required exceeds") {
        return "gas settings too low".into();
    }
    if lower.contains("reverted") || lower.contains("execution revert") {
        return "contract execution reverted (possibly slippage or liquidity)".into();
    }
    if lower.contains("timeout") || lower.contains("timed out") {
        return "rpc timeout".into();
    }
    if message.len() > 100 {
        format!("{}...", &message[..100])
    } else {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_errors() {
        assert_eq!(
            classify_error("err: nonce too low (expected 5 got 3)"),
            "nonce conflict: transaction already replaced or mined"
        );
        assert_eq!(
            classify_error("insufficient funds for gas * price + value"),
            "insufficient BNB balance for value + gas"
        );
        assert_eq!(
            classify_error("execution reverted: TokenLocked"),
            "contract execution reverted (possibly slippage or liquidity)"
        );
        assert_eq!(classify_error("request timed out"), "rpc timeout");
    }

    #[test]
    fn unknown_errors_are_truncated() {
        let long = "x".repeat(250);
        let classified = classify_error(&long);
        assert_eq!(classified.len(), 103);
        assert!(classified.ends_with("..."));

        assert_eq!(classify_error("weird"), "weird");
    }

    #[test]
    fn transient_detection() {
        assert!(RpcError::Transport("boom".into()).is_transient());
        assert!(RpcError::Timeout("receipt".into()).is_transient());
        assert!(!RpcError::Node {
            code: -32000,
            message: "nope".into()
        }
        .is_transient());
    }
}
