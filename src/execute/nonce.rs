//! Per-wallet nonce reservation.
//!
//! Firing several transactions from one wallet in quick succession outruns
//! the node's pending-nonce view: the pool hasn't absorbed the previous
//! submission when the next one asks for a nonce. The sequencer keeps a
//! local "next nonce" per address and hands out
//! `max(chain_pending, local_next)`, so two in-flight reservations for the
//! same wallet can never collide, while distinct wallets proceed fully in
//! parallel.
//!
//! One instance is owned by the execution components for the lifetime of the
//! session - no globals, nothing persisted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use alloy::primitives::Address;

use crate::ports::rpc::{ChainRpc, RpcError};

#[derive(Default)]
pub struct NonceSequencer {
    // outer lock only guards the map; the per-address async lock is held
    // across the chain query so reservations serialize per wallet
    slots: Mutex<HashMap<Address, Arc<tokio::sync::Mutex<u64>>>>,
}

impl NonceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next nonce for `address`, reconciling against the chain's
    /// pending view. Advances the local counter past the returned value.
    pub async fn reserve(&self, rpc: &dyn ChainRpc, address: Address) -> Result<u64, RpcError> {
        let slot = {
            let mut slots = self.slots.lock().expect("nonce map poisoned");
            Arc::clone(
                slots
                    .entry(address)
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(0))),
            )
        };

        let mut next = slot.lock().await;
        let chain = rpc.pending_nonce(address).await?;
        let nonce = chain.max(*next);
        *next = nonce + 1;
        Ok(nonce)
    }

    /// Drop local tracking for `address` so the next reservation re-syncs
    /// from the chain. Called when a submission failed or was dropped.
    pub fn reset(&self, address: Address) {
        self.slots
            .lock()
            .expect("nonce map poisoned")
            .remove(&address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockChainRpc;

    fn addr(byte: u8) -> Address {
        Address::from_slice(&[byte; 20])
    }

    #[tokio::test]
    async fn reserve_starts_from_chain_nonce() {
        let rpc = MockChainRpc::new();
        rpc.set_nonce(addr(1), 41);
        let nonces = NonceSequencer::new();

        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 41);
        // chain still reports 41, local tracking carries us forward
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 42);
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 43);
    }

    #[tokio::test]
    async fn chain_ahead_of_local_wins() {
        let rpc = MockChainRpc::new();
        rpc.set_nonce(addr(1), 0);
        let nonces = NonceSequencer::new();

        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 0);
        // an external submission bumped the chain past our counter
        rpc.set_nonce(addr(1), 10);
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn reset_resyncs_from_chain() {
        let rpc = MockChainRpc::new();
        rpc.set_nonce(addr(1), 5);
        let nonces = NonceSequencer::new();

        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 5);
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 6);

        nonces.reset(addr(1));
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn addresses_are_independent() {
        let rpc = MockChainRpc::new();
        rpc.set_nonce(addr(1), 100);
        rpc.set_nonce(addr(2), 0);
        let nonces = NonceSequencer::new();

        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 100);
        assert_eq!(nonces.reserve(&rpc, addr(2)).await.unwrap(), 0);
        assert_eq!(nonces.reserve(&rpc, addr(1)).await.unwrap(), 101);
        assert_eq!(nonces.reserve(&rpc, addr(2)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn interleaved_reservations_are_strictly_increasing() {
        let rpc = Arc::new(MockChainRpc::new());
        rpc.set_nonce(addr(7), 3);
        let nonces = Arc::new(NonceSequencer::new());

        let mut handles = Vec::new();
        for _ in 0..32 {
            let rpc = Arc::clone(&rpc);
            let nonces = Arc::clone(&nonces);
            handles.push(tokio::spawn(async move {
                nonces.reserve(rpc.as_ref(), addr(7)).await.unwrap()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap());
        }
        seen.sort_unstable();

        // no repeats, no gaps
        let expected: Vec<u64> = (3..35).collect();
        assert_eq!(seen, expected);
    }
}
