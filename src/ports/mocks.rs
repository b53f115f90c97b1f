//! Recording mocks for the ports, with controlled responses.
//!
//! Deterministic, no-network stand-ins used across the unit and integration
//! tests: they record every call and hand back whatever the test scripted.

use std::collections::HashMap;
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;

use super::rpc::{ChainRpc, LogFilter, LogRecord, ReceiptRecord, RpcError, TxRecord};
use super::signer::{SignerError, TransactionSigner, TxRequest};
use super::trade::{TradeError, TradeExecutor, TradeOutcome, TradeRequest};

#[derive(Default)]
struct MockChainState {
    block_number: u64,
    pending: Vec<TxRecord>,
    txs: HashMap<B256, TxRecord>,
    receipts: HashMap<B256, ReceiptRecord>,
    logs: Vec<LogRecord>,
    nonces: HashMap<Address, u64>,
    gas_price: u128,
    call_responses: HashMap<(Address, [u8; 4]), Bytes>,
    sent: Vec<Bytes>,
    fail_sends: Option<String>,
    fail_block_number: Option<String>,
}

/// In-memory chain double. All mutators take `&self` so the mock can sit
/// behind an `Arc` exactly like a real client.
#[derive(Default)]
pub struct MockChainRpc {
    state: Mutex<MockChainState>,
}

impl MockChainRpc {
    pub fn new() -> Self {
        let mock = Self::default();
        mock.state.lock().unwrap().gas_price = 1_000_000_000; // 1 gwei
        mock
    }

    pub fn set_block_number(&self, n: u64) {
        self.state.lock().unwrap().block_number = n;
    }

    /// Seed a transaction into the pending pool (and the by-hash index).
    pub fn push_pending_tx(&self, tx: TxRecord) {
        let mut state = self.state.lock().unwrap();
        state.txs.insert(tx.hash, tx.clone());
        state.pending.push(tx);
    }

    pub fn insert_receipt(&self, hash: B256, receipt: ReceiptRecord) {
        self.state.lock().unwrap().receipts.insert(hash, receipt);
    }

    pub fn push_log(&self, log: LogRecord) {
        self.state.lock().unwrap().logs.push(log);
    }

    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.state.lock().unwrap().nonces.insert(address, nonce);
    }

    /// Script the return data of an `eth_call`, keyed by target + selector.
    pub fn set_call_response(&self, to: Address, selector: [u8; 4], data: impl Into<Bytes>) {
        self.state
            .lock()
            .unwrap()
            .call_responses
            .insert((to, selector), data.into());
    }

    /// Make every send_raw_transaction fail with `message`.
    pub fn fail_sends(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_sends = Some(message.into());
    }

    /// Make block_number fail - simulates an unusable endpoint at start-up.
    pub fn fail_block_number(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_block_number = Some(message.into());
    }

    pub fn sent_transactions(&self) -> Vec<Bytes> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn sent_count(&self) -> usize {
        self.state.lock().unwrap().sent.len()
    }
}

#[async_trait]
impl ChainRpc for MockChainRpc {
    async fn block_number(&self) -> Result<u64, RpcError> {
        let state = self.state.lock().unwrap();
        if let Some(ref msg) = state.fail_block_number {
            return Err(RpcError::Transport(msg.clone()));
        }
        Ok(state.block_number)
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TxRecord>, RpcError> {
        Ok(self.state.lock().unwrap().txs.get(&hash).cloned())
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptRecord>, RpcError> {
        Ok(self.state.lock().unwrap().receipts.get(&hash).cloned())
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.block_number >= filter.from_block
                    && log.block_number <= filter.to_block
                    && filter
                        .topic0
                        .map_or(true, |t| log.topics.first() == Some(&t))
            })
            .cloned()
            .collect())
    }

    async fn pending_transactions(&self) -> Result<Vec<TxRecord>, RpcError> {
        Ok(self.state.lock().unwrap().pending.clone())
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or(0))
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        Ok(self.state.lock().unwrap().gas_price)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        let mut state = self.state.lock().unwrap();
        if let Some(ref msg) = state.fail_sends {
            return Err(RpcError::Node {
                code: -32000,
                message: msg.clone(),
            });
        }
        let hash = keccak256(&raw);
        state.sent.push(raw);
        Ok(hash)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        if data.len() < 4 {
            return Err(RpcError::InvalidResponse("calldata too short".into()));
        }
        let selector = [data[0], data[1], data[2], data[3]];
        self.state
            .lock()
            .unwrap()
            .call_responses
            .get(&(to, selector))
            .cloned()
            .ok_or_else(|| RpcError::Node {
                code: -32000,
                message: "execution reverted".into(),
            })
    }

    async fn balance(&self, _address: Address) -> Result<U256, RpcError> {
        Ok(U256::ZERO)
    }
}

/// Deterministic signer double. Keys containing "bad" refuse to sign, which
/// is how tests model a wallet with corrupt key material. The "raw
/// transaction" it produces embeds the sender and nonce so tests can assert
/// on what was submitted.
#[derive(Default)]
pub struct MockSigner {
    signed: Mutex<Vec<(Address, u64)>>,
}

impl MockSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// (sender, nonce) pairs in signing order.
    pub fn signed_log(&self) -> Vec<(Address, u64)> {
        self.signed.lock().unwrap().clone()
    }
}

impl TransactionSigner for MockSigner {
    fn address_of(&self, private_key: &str) -> Result<Address, SignerError> {
        if private_key.contains("bad") {
            return Err(SignerError::InvalidKey("unparseable key".into()));
        }
        // derive a stable fake address from the key text
        let hash = keccak256(private_key.as_bytes());
        Ok(Address::from_slice(&hash[12..]))
    }

    fn sign(&self, private_key: &str, tx: &TxRequest) -> Result<Bytes, SignerError> {
        if private_key.contains("bad") {
            return Err(SignerError::InvalidKey("unparseable key".into()));
        }
        let sender = self.address_of(private_key)?;
        self.signed.lock().unwrap().push((sender, tx.nonce));

        let mut raw = Vec::with_capacity(20 + 8 + tx.input.len());
        raw.extend_from_slice(sender.as_slice());
        raw.extend_from_slice(&tx.nonce.to_be_bytes());
        raw.extend_from_slice(&tx.input);
        Ok(raw.into())
    }
}

type TradeCall = (&'static str, Address, f64);

/// Trade executor double with per-wallet scripted failures.
pub struct MockTradeExecutor {
    calls: Mutex<Vec<TradeCall>>,
    failing: Mutex<HashMap<Address, String>>,
}

impl MockTradeExecutor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashMap::new()),
        }
    }

    /// Every trade from `wallet` fails with `error`.
    pub fn fail_for(&self, wallet: Address, error: impl Into<String>) {
        self.failing.lock().unwrap().insert(wallet, error.into());
    }

    pub fn calls(&self) -> Vec<TradeCall> {
        self.calls.lock().unwrap().clone()
    }

    fn outcome(&self, side: &'static str, request: &TradeRequest) -> TradeOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((side, request.wallet.address, request.amount_bnb));
        match self.failing.lock().unwrap().get(&request.wallet.address) {
            Some(error) => TradeOutcome::failed(error.clone()),
            None => TradeOutcome::ok(keccak256(request.wallet.address.as_slice())),
        }
    }
}

impl Default for MockTradeExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradeExecutor for MockTradeExecutor {
    async fn buy(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError> {
        Ok(self.outcome("buy", request))
    }

    async fn sell(&self, request: &TradeRequest) -> Result<TradeOutcome, TradeError> {
        Ok(self.outcome("sell", request))
    }
}
