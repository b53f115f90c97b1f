//! Bonding-curve trade executor.
//!
//! Implements the `TradeExecutor` port by calling the launchpad contract
//! directly: `buyTokenAMAP` for pumps, `sellToken` for dumps (with an
//! unbounded ERC-20 approval the first time a wallet sells). Campaign
//! trades are not latency-critical, so unlike the snipe path this adapter
//! waits (bounded) for the receipt and reports the mined status.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, B256, U256};
use async_trait::async_trait;

use crate::domain::task::{bnb_to_wei, GasOverrides};
use crate::execute::NonceSequencer;
use crate::launchpad::abi::{
    build_allowance_calldata, build_approve_calldata, build_balance_of_calldata,
    build_buy_calldata, build_sell_calldata, decode_u256_word, FOURMEME_CONTRACT,
};
use crate::ports::rpc::{classify_error, wait_for_receipt, ChainRpc};
use crate::ports::signer::{TransactionSigner, TxRequest};
use crate::ports::trade::{TradeError, TradeExecutor, TradeOutcome, TradeRequest};

const DEFAULT_TRADE_GAS_LIMIT: u64 = 300_000;
const APPROVE_GAS_LIMIT: u64 = 100_000;
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct LaunchpadTradeExecutor {
    rpc: Arc<dyn ChainRpc>,
    signer: Arc<dyn TransactionSigner>,
    nonces: Arc<NonceSequencer>,
    launchpad: Address,
    chain_id: u64,
}

impl LaunchpadTradeExecutor {
    pub fn new(
        rpc: Arc<dyn ChainRpc>,
        signer: Arc<dyn TransactionSigner>,
        nonces: Arc<NonceSequencer>,
        chain_id: u64,
    ) -> Self {
        Self {
            rpc,
            signer,
            nonces,
            launchpad: FOURMEME_CONTRACT,
            chain_id,
        }
    }

    async fn gas_price(&self, gas: &GasOverrides) -> Result<u128, TradeError> {
        match gas.gas_price_wei() {
            Some(wei) => Ok(wei),
            None => self
                .rpc
                .gas_price()
                .await
                .map_err(|e| TradeError::Rpc(e.to_string())),
        }
    }

    /// Sign and submit one transaction from `wallet`, then wait for it to
    /// mine. Returns (tx_hash, mined_ok).
    async fn submit_and_confirm(
        &self,
        wallet_address: Address,
        private_key: &str,
        to: Address,
        value: U256,
        input: Vec<u8>,
        gas_limit: u64,
        gas_price: u128,
    ) -> Result<(B256, bool), TradeError> {
        let nonce = self
            .nonces
            .reserve(self.rpc.as_ref(), wallet_address)
            .await
            .map_err(|e| TradeError::Rpc(e.to_string()))?;

        let request = TxRequest {
            to,
            value,
            input: input.into(),
            nonce,
            gas_limit,
            gas_price,
            chain_id: self.chain_id,
        };
        let raw = self
            .signer
            .sign(private_key, &request)
            .map_err(|e| TradeError::Signing(e.to_string()))?;

        let tx_hash = match self.rpc.send_raw_transaction(raw).await {
            Ok(hash) => hash,
            Err(e) => {
                self.nonces.reset(wallet_address);
                return Err(TradeError::Rpc(e.to_string()));
            }
        };

        match wait_for_receipt(self.rpc.as_ref(), tx_hash, RECEIPT_TIMEOUT).await {
            Ok(Some(receipt)) => Ok((tx_hash, receipt.status)),
            // still pending after the window; report the submission and let
            // the caller's accounting treat it as unconfirmed
            Ok(None) => Ok((tx_hash, false)),
            Err(e) => Err(TradeError::Rpc(e.to_string())),
        }
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, TradeError> {
        let data = self
            .rpc
            .call(token, build_balance_of_calldata(owner).into())
            .await
            .map_err(|e| TradeError::Rpc(e.to_string()))?;
        decode_u256_word(&data).ok_or_else(|| TradeError::Rpc("short balanceOf response".into()))
    }

    async fn allowance(&self, token: Address, owner: Address) -> U256 {
        match self
            .rpc
            .call(token, build_allowance_calldata(owner, self.launchpad).into())
            .await
        {
            Ok(data) => decode_u256_word(&data).unwrap_or(U256::ZERO),
            Err(_) => U256::ZERO,
        }
    }

    /// Grant the launchpad an unbounded allowance when the current one does
    /// not cover `needed`.
    async fn ensure_allowance(
        &self,
        request: &TradeRequest,
        needed: U256,
        gas_price: u128,
    ) -> Result<(), TradeError> {
        if self.allowance(request.token, request.wallet.address).await >= needed {
            return Ok(());
        }
        tracing::debug!(
            "approving launchpad to spend {} for {}",
            request.token,
            request.wallet.address
        );
        let (_, mined) = self
            .submit_and_confirm(
                request.wallet.address,
                &request.wallet.private_key,
                request.token,
                U256::ZERO,
                build_approve_calldata(self.launchpad, U256::MAX),
                APPROVE_GAS_LIMIT,
                gas_price,
            )
            .await?;
        if !mined {
            return Err(TradeError::Rpc("approval did not confirm".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl TradeExecutor for LaunchpadTradeExecutor {
    async fn buy(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError> {
        let funds = bnb_to_wei(request.amount_bnb);
        let gas_price = self.gas_price(&request.gas).await?;

        let result = self
            .submit_and_confirm(
                request.wallet.address,
                &request.wallet.private_key,
                self.launchpad,
                funds,
                build_buy_calldata(request.token, U256::ZERO, U256::ZERO),
                request.gas.gas_limit.unwrap_or(DEFAULT_TRADE_GAS_LIMIT),
                gas_price,
            )
            .await;

        Ok(match result {
            Ok((tx_hash, true)) => TradeOutcome::ok(tx_hash),
            Ok((_, false)) => TradeOutcome::failed("transaction did not confirm successfully"),
            Err(e) => TradeOutcome::failed(classify_error(&e.to_string())),
        })
    }

    async fn sell(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError> {
        let balance = self
            .token_balance(request.token, request.wallet.address)
            .await?;
        if balance.is_zero() {
            return Ok(TradeOutcome::failed("token balance is zero"));
        }

        let percent = U256::from(request.sell_percent.clamp(1, 100));
        let amount = balance * percent / U256::from(100u64);
        if amount.is_zero() {
            return Ok(TradeOutcome::failed("sell amount rounds to zero"));
        }

        let gas_price = self.gas_price(&request.gas).await?;
        if let Err(e) = self.ensure_allowance(request, amount, gas_price).await {
            return Ok(TradeOutcome::failed(classify_error(&e.to_string())));
        }

        let result = self
            .submit_and_confirm(
                request.wallet.address,
                &request.wallet.private_key,
                self.launchpad,
                U256::ZERO,
                build_sell_calldata(request.token, amount, U256::ZERO),
                request.gas.gas_limit.unwrap_or(DEFAULT_TRADE_GAS_LIMIT),
                gas_price,
            )
            .await;

        Ok(match result {
            Ok((tx_hash, true)) => TradeOutcome::ok(tx_hash),
            Ok((_, false)) => TradeOutcome::failed("transaction did not confirm successfully"),
            Err(e) => TradeOutcome::failed(classify_error(&e.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::SnipeWallet;
    use crate::launchpad::abi::{ERC20_ALLOWANCE, ERC20_BALANCE_OF, SELL_SELECTOR};
    use crate::ports::mocks::{MockChainRpc, MockSigner};
    use crate::ports::rpc::ReceiptRecord;
    use alloy::primitives::keccak256;

    fn executor(rpc: Arc<MockChainRpc>) -> (LaunchpadTradeExecutor, Arc<MockSigner>) {
        let signer = Arc::new(MockSigner::new());
        (
            LaunchpadTradeExecutor::new(
                rpc,
                Arc::clone(&signer) as Arc<dyn TransactionSigner>,
                Arc::new(NonceSequencer::new()),
                56,
            ),
            signer,
        )
    }

    fn wallet(signer: &MockSigner) -> SnipeWallet {
        let key = "0xcampaignkey".to_string();
        SnipeWallet {
            address: signer.address_of(&key).unwrap(),
            private_key: key,
            label: None,
        }
    }

    fn request(wallet: SnipeWallet) -> TradeRequest {
        TradeRequest {
            wallet,
            token: Address::from_slice(&[0x70; 20]),
            amount_bnb: 0.1,
            sell_percent: 50,
            gas: GasOverrides::default(),
        }
    }

    /// The mock derives the tx hash as keccak(raw); pre-seeding a receipt
    /// for it requires replaying the mock signer's raw layout
    /// (sender ++ nonce ++ calldata).
    fn seed_receipt_for(
        rpc: &MockChainRpc,
        wallet: &SnipeWallet,
        nonce: u64,
        input: Vec<u8>,
        status: bool,
    ) {
        let mut raw = Vec::new();
        raw.extend_from_slice(wallet.address.as_slice());
        raw.extend_from_slice(&nonce.to_be_bytes());
        raw.extend_from_slice(&input);
        rpc.insert_receipt(
            keccak256(&raw),
            ReceiptRecord {
                status,
                block_number: 10,
                logs: Vec::new(),
            },
        );
    }

    #[tokio::test]
    async fn buy_submits_and_confirms() {
        let rpc = Arc::new(MockChainRpc::new());
        let (exec, signer) = executor(Arc::clone(&rpc));
        let wallet = wallet(&signer);
        let req = request(wallet.clone());

        seed_receipt_for(
            &rpc,
            &wallet,
            0,
            build_buy_calldata(req.token, U256::ZERO, U256::ZERO),
            true,
        );

        let outcome = exec.buy(&req).await.unwrap();
        assert!(outcome.success);
        assert_eq!(rpc.sent_count(), 1);
    }

    #[tokio::test]
    async fn buy_reports_reverted_receipt() {
        let rpc = Arc::new(MockChainRpc::new());
        let (exec, signer) = executor(Arc::clone(&rpc));
        let wallet = wallet(&signer);
        let req = request(wallet.clone());

        seed_receipt_for(
            &rpc,
            &wallet,
            0,
            build_buy_calldata(req.token, U256::ZERO, U256::ZERO),
            false,
        );

        let outcome = exec.buy(&req).await.unwrap();
        assert!(!outcome.success);
    }

    #[tokio::test]
    async fn sell_with_zero_balance_fails_cleanly() {
        let rpc = Arc::new(MockChainRpc::new());
        let (exec, signer) = executor(Arc::clone(&rpc));
        let req = request(wallet(&signer));

        rpc.set_call_response(
            req.token,
            ERC20_BALANCE_OF,
            U256::ZERO.to_be_bytes::<32>().to_vec(),
        );

        let outcome = exec.sell(&req).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("token balance is zero"));
        assert_eq!(rpc.sent_count(), 0);
    }

    #[tokio::test]
    async fn sell_uses_existing_allowance() {
        let rpc = Arc::new(MockChainRpc::new());
        let (exec, signer) = executor(Arc::clone(&rpc));
        let wallet = wallet(&signer);
        let req = request(wallet.clone());

        let balance = U256::from(1_000u64);
        rpc.set_call_response(
            req.token,
            ERC20_BALANCE_OF,
            balance.to_be_bytes::<32>().to_vec(),
        );
        rpc.set_call_response(
            req.token,
            ERC20_ALLOWANCE,
            U256::MAX.to_be_bytes::<32>().to_vec(),
        );

        // 50% of 1000
        seed_receipt_for(
            &rpc,
            &wallet,
            0,
            build_sell_calldata(req.token, U256::from(500u64), U256::ZERO),
            true,
        );

        let outcome = exec.sell(&req).await.unwrap();
        assert!(outcome.success, "{:?}", outcome.error);
        // no approval transaction needed
        assert_eq!(rpc.sent_count(), 1);
        let sent = rpc.sent_transactions();
        assert_eq!(&sent[0][28..32], &SELL_SELECTOR);
    }
}
