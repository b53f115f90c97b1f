//! Trade executor port.
//!
//! The campaign scheduler drives buys and sells through this interface and
//! stays ignorant of where the liquidity lives - the bonding-curve adapter in
//! this crate, or an external DEX-router service with its own slippage math.

use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use thiserror::Error;

use crate::domain::task::{GasOverrides, SnipeWallet};

#[derive(Debug, Error)]
pub enum TradeError {
    #[error("rpc failure: {0}")]
    Rpc(String),
    #[error("signing failure: {0}")]
    Signing(String),
    #[error("unsupported trade: {0}")]
    Unsupported(String),
}

/// One trade on behalf of one wallet.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub wallet: SnipeWallet,
    pub token: Address,
    /// Buy size in BNB; ignored for sells.
    pub amount_bnb: f64,
    /// Portion of the wallet's token balance to sell (1-100); ignored for
    /// buys.
    pub sell_percent: u8,
    pub gas: GasOverrides,
}

/// Result of one trade. `success == false` carries a taxonomy-classified
/// error string; the request itself completed without infrastructure faults.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub success: bool,
    pub tx_hash: Option<B256>,
    pub error: Option<String>,
}

impl TradeOutcome {
    pub fn ok(tx_hash: B256) -> Self {
        Self {
            success: true,
            tx_hash: Some(tx_hash),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            tx_hash: None,
            error: Some(error.into()),
        }
    }
}

#[async_trait]
pub trait TradeExecutor: Send + Sync {
    async fn buy(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError>;

    async fn sell(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError>;
}
