//! On-chain market-cap proxy.
//!
//! Resolves the token's trading pair from a factory-style registry, reads
//! the pair reserves, and reports the base-asset side normalized by its
//! decimals. That single-sided reserve reading is a documented
//! approximation of market cap, not a price-times-supply computation - it
//! is cheap, needs no supply call, and moves monotonically with the pool,
//! which is all the stop conditions require.

use std::sync::Arc;

use alloy::primitives::{address, Address, U256};
use thiserror::Error;

use crate::launchpad::abi::{
    build_get_pair_calldata, decode_address_word, decode_u256_word, ERC20_DECIMALS,
    PAIR_GET_RESERVES, PAIR_TOKEN0,
};
use crate::ports::rpc::{ChainRpc, RpcError};

/// PancakeSwap V2 factory (BSC mainnet).
pub const DEFAULT_FACTORY: Address = address!("cA143Ce32Fe78f1f7019d7d551a6402fC5350c73");

/// Wrapped BNB (BSC mainnet), the default base asset.
pub const DEFAULT_BASE_TOKEN: Address = address!("bb4CdB9CBd36B01bD1cBaEBF2De08d9173bc095c");

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("no trading pair for token against the configured base asset")]
    NoPair,
    #[error("malformed response from pair contract: {0}")]
    BadPairData(String),
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

pub struct MarketCapProbe {
    rpc: Arc<dyn ChainRpc>,
    factory: Address,
    base_token: Address,
}

impl MarketCapProbe {
    pub fn new(rpc: Arc<dyn ChainRpc>, factory: Address, base_token: Address) -> Self {
        Self {
            rpc,
            factory,
            base_token,
        }
    }

    /// Market-cap proxy: the base-asset reserve of the token's pair,
    /// normalized by the base asset's decimals.
    pub async fn market_cap(&self, token: Address) -> Result<f64, ProbeError> {
        let (base_reserve, _) = self.reserves(token).await?;
        let decimals = self.decimals_of(self.base_token).await;
        Ok(normalize(base_reserve, decimals))
    }

    /// Spot price of the token in base-asset units, from the same reserves.
    pub async fn price(&self, token: Address) -> Result<f64, ProbeError> {
        let (base_reserve, token_reserve) = self.reserves(token).await?;
        if token_reserve.is_zero() {
            return Err(ProbeError::BadPairData("empty token reserve".into()));
        }
        let base = normalize(base_reserve, self.decimals_of(self.base_token).await);
        let tokens = normalize(token_reserve, self.decimals_of(token).await);
        Ok(base / tokens)
    }

    /// (base_reserve, token_reserve) of the token/base pair.
    async fn reserves(&self, token: Address) -> Result<(U256, U256), ProbeError> {
        let pair = self.find_pair(token).await?;

        let reserves_raw = self
            .rpc
            .call(pair, PAIR_GET_RESERVES.to_vec().into())
            .await?;
        if reserves_raw.len() < 64 {
            return Err(ProbeError::BadPairData(format!(
                "getReserves returned {} bytes",
                reserves_raw.len()
            )));
        }
        let reserve0 = decode_u256_word(&reserves_raw[..32])
            .ok_or_else(|| ProbeError::BadPairData("reserve0".into()))?;
        let reserve1 = decode_u256_word(&reserves_raw[32..64])
            .ok_or_else(|| ProbeError::BadPairData("reserve1".into()))?;

        let token0_raw = self.rpc.call(pair, PAIR_TOKEN0.to_vec().into()).await?;
        let token0 = decode_address_word(&token0_raw)
            .ok_or_else(|| ProbeError::BadPairData("token0".into()))?;

        if token0 == self.base_token {
            Ok((reserve0, reserve1))
        } else {
            Ok((reserve1, reserve0))
        }
    }

    /// getPair with both argument orders; registries disagree on ordering.
    async fn find_pair(&self, token: Address) -> Result<Address, ProbeError> {
        for (a, b) in [(token, self.base_token), (self.base_token, token)] {
            let response = self
                .rpc
                .call(self.factory, build_get_pair_calldata(a, b).into())
                .await;
            match response {
                Ok(data) => {
                    if let Some(pair) = decode_address_word(&data) {
                        if pair != Address::ZERO {
                            return Ok(pair);
                        }
                    }
                }
                Err(e) => tracing::debug!("getPair({a}, {b}) failed: {e}"),
            }
        }
        Err(ProbeError::NoPair)
    }

    async fn decimals_of(&self, token: Address) -> u8 {
        match self.rpc.call(token, ERC20_DECIMALS.to_vec().into()).await {
            Ok(data) => decode_u256_word(&data)
                .and_then(|v| u8::try_from(v).ok())
                .unwrap_or(18),
            // tokens without decimals() are treated as 18, like the chain's
            // native asset
            Err(_) => 18,
        }
    }
}

fn normalize(amount: U256, decimals: u8) -> f64 {
    let divisor = 10f64.powi(decimals as i32);
    // saturates above u128::MAX, far beyond any real reserve
    let raw: u128 = amount.try_into().unwrap_or(u128::MAX);
    raw as f64 / divisor
}
