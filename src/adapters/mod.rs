//! Adapters Layer - concrete implementations of the ports.
//!
//! - `chain`: BSC JSON-RPC over HTTP, the raw pending-transaction WebSocket
//!   feed, and local legacy-transaction signing
//! - `launchpad_trade`: bonding-curve trade executor driving the launchpad
//!   contract directly

pub mod chain;
pub mod launchpad_trade;

pub use chain::{HttpRpc, HttpRpcConfig, LocalSigner, PendingHashFeed};
pub use launchpad_trade::LaunchpadTradeExecutor;
