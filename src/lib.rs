//! fourstrike - Launchpad Token Sniper for BSC
//!
//! Races to detect freshly created launchpad tokens - predicting their
//! CREATE2 address straight from the pending pool where possible - and
//! fires buys from many independently-keyed wallets in parallel. A campaign
//! scheduler then runs recurring pump/dump rounds against launched tokens.
//!
//! # Modules
//!
//! - `domain`: task/campaign state and the UI-facing event surface
//! - `launchpad`: fixed ABI layouts and CREATE2 address prediction
//! - `ports`: trait abstractions for the node, signer, and trade executor
//! - `adapters`: JSON-RPC client, pending-tx WebSocket feed, local signer,
//!   bonding-curve trade executor
//! - `detect`: the three redundant event channels and their orchestrator
//! - `execute`: per-wallet nonce sequencing and the parallel buy fan-out
//! - `campaign`: round scheduler and the on-chain market-cap probe
//! - `config`: configuration loading and validation

pub mod adapters;
pub mod campaign;
pub mod config;
pub mod detect;
pub mod domain;
pub mod execute;
pub mod launchpad;
pub mod ports;
