//! Local legacy-transaction signer.
//!
//! Wraps alloy's in-memory key handling behind the `TransactionSigner` port.
//! BSC still runs on legacy (pre-EIP-1559) gas pricing, so everything is
//! signed as `TxLegacy`.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, Bytes, TxKind};
use alloy::signers::local::PrivateKeySigner;

use crate::ports::signer::{SignerError, TransactionSigner, TxRequest};

/// Signs with raw private keys held by the caller's wallet store.
#[derive(Debug, Default, Clone)]
pub struct LocalSigner;

impl LocalSigner {
    pub fn new() -> Self {
        Self
    }

    fn parse_key(private_key: &str) -> Result<PrivateKeySigner, SignerError> {
        private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| SignerError::InvalidKey(e.to_string()))
    }
}

impl TransactionSigner for LocalSigner {
    fn address_of(&self, private_key: &str) -> Result<Address, SignerError> {
        Ok(Self::parse_key(private_key)?.address())
    }

    fn sign(&self, private_key: &str, tx: &TxRequest) -> Result<Bytes, SignerError> {
        let signer = Self::parse_key(private_key)?;

        let mut legacy = TxLegacy {
            chain_id: Some(tx.chain_id),
            nonce: tx.nonce,
            gas_price: tx.gas_price,
            gas_limit: tx.gas_limit,
            to: TxKind::Call(tx.to),
            value: tx.value,
            input: tx.input.clone(),
        };

        let signature = signer
            .sign_transaction_sync(&mut legacy)
            .map_err(|e| SignerError::Signing(e.to_string()))?;
        let envelope = TxEnvelope::from(legacy.into_signed(signature));
        Ok(envelope.encoded_2718().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    // well-known throwaway test key (hardhat account #0)
    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDR: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    fn request() -> TxRequest {
        TxRequest {
            to: Address::from_slice(&[0x11; 20]),
            value: U256::from(1_000_000_000_000_000u64),
            input: Bytes::from(vec![0x87, 0xf2, 0x76, 0x55]),
            nonce: 7,
            gas_limit: 300_000,
            gas_price: 3_000_000_000,
            chain_id: 56,
        }
    }

    #[test]
    fn derives_known_address() {
        let signer = LocalSigner::new();
        let address = signer.address_of(TEST_KEY).unwrap();
        assert_eq!(address, TEST_ADDR.parse::<Address>().unwrap());
    }

    #[test]
    fn rejects_garbage_keys() {
        let signer = LocalSigner::new();
        assert!(matches!(
            signer.address_of("not-a-key"),
            Err(SignerError::InvalidKey(_))
        ));
    }

    #[test]
    fn produces_raw_rlp() {
        let signer = LocalSigner::new();
        let raw = signer.sign(TEST_KEY, &request()).unwrap();
        // legacy transactions have no type byte; RLP list header leads
        assert!(!raw.is_empty());
        assert!(raw[0] >= 0xc0);
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = LocalSigner::new();
        let a = signer.sign(TEST_KEY, &request()).unwrap();
        let b = signer.sign(TEST_KEY, &request()).unwrap();
        assert_eq!(a, b);
    }
}
