//! Transaction signing port.
//!
//! Signing is assumed synchronous and fast (local key material); the trait
//! takes the private key per call because execution wallets each carry their
//! own key and the engine never caches keys beyond the task that owns them.

use alloy::primitives::{Address, Bytes, U256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Parameters of one legacy transaction to sign.
#[derive(Debug, Clone)]
pub struct TxRequest {
    pub to: Address,
    pub value: U256,
    pub input: Bytes,
    pub nonce: u64,
    pub gas_limit: u64,
    /// Wei.
    pub gas_price: u128,
    pub chain_id: u64,
}

pub trait TransactionSigner: Send + Sync {
    /// Derive the account address controlled by `private_key`.
    fn address_of(&self, private_key: &str) -> Result<Address, SignerError>;

    /// Sign `tx` with `private_key` and return the raw bytes ready for
    /// `eth_sendRawTransaction`.
    fn sign(&self, private_key: &str, tx: &TxRequest) -> Result<Bytes, SignerError>;
}
