//! Launchpad Binary Contracts
//!
//! Fixed-offset ABI layouts of the four.meme launchpad: method selectors,
//! calldata encoding, the TokenCreated event, and CREATE2 token address
//! prediction. Everything in here is pure computation over byte slices.

pub mod abi;
pub mod predictor;

pub use abi::{
    build_buy_calldata, build_sell_calldata, decode_token_created, is_create_selector,
    TokenCreated,
};
pub use predictor::predict_token_address;
