//! BSC chain adapters: HTTP JSON-RPC client, pending-transaction WebSocket
//! feed, and the local transaction signer.

pub mod http;
pub mod signer;
pub mod ws;

pub use http::{HttpRpc, HttpRpcConfig};
pub use signer::LocalSigner;
pub use ws::PendingHashFeed;
