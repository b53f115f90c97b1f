//! Multi-wallet execution engine: per-wallet nonce sequencing and the
//! parallel buy fan-out fired on a detected launch.

pub mod executor;
pub mod nonce;

pub use executor::WalletExecutor;
pub use nonce::NonceSequencer;
