//! Ports Layer - trait definitions for the external collaborators.
//!
//! The blockchain node, the transaction signer, and the generic DEX trade
//! executor are black boxes to this engine; these traits are their
//! interfaces. Adapters implement them, tests use the recording mocks.

pub mod mocks;
pub mod rpc;
pub mod signer;
pub mod trade;

pub use rpc::{ChainRpc, LogFilter, LogRecord, ReceiptRecord, RpcError, TxRecord};
pub use signer::{SignerError, TransactionSigner, TxRequest};
pub use trade::{TradeExecutor, TradeOutcome, TradeRequest};
