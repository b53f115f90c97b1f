//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure, plus the separate wallets file holding key material (which
//! stays out of the main config so it can live on restricted storage).

use alloy::primitives::Address;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::domain::campaign::{CampaignMode, StopCondition};
use crate::domain::task::{GasOverrides, SnipeWallet};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub chain: ChainSection,
    #[serde(default)]
    pub snipe: Option<SnipeSection>,
    #[serde(default)]
    pub campaign: Option<CampaignSection>,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Chain and endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ChainSection {
    /// 56 = BSC mainnet, 97 = BSC testnet
    pub chain_id: u64,
    /// HTTP JSON-RPC endpoint
    pub http_rpc: String,
    /// WebSocket endpoint for the pending-transaction subscription; omit to
    /// run on the two poll channels only
    #[serde(default)]
    pub wss_rpc: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl ChainSection {
    /// HTTP endpoint with environment variable override (BSC_HTTP_RPC).
    pub fn get_http_rpc(&self) -> String {
        std::env::var("BSC_HTTP_RPC").unwrap_or_else(|_| self.http_rpc.clone())
    }

    /// WebSocket endpoint with environment variable override (BSC_WSS_RPC).
    pub fn get_wss_rpc(&self) -> Option<String> {
        std::env::var("BSC_WSS_RPC").ok().or_else(|| self.wss_rpc.clone())
    }
}

/// Launch-sniping task configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SnipeSection {
    /// Creator wallet being watched
    pub target_creator: Address,
    /// Buy size per execution wallet, in BNB
    pub buy_amount_bnb: f64,
    /// Gas price in gwei; 0 or absent = node default
    #[serde(default)]
    pub gas_price_gwei: Option<u64>,
    /// Gas limit; 0 or absent = built-in default
    #[serde(default)]
    pub gas_limit: Option<u64>,
    /// Task-specific RPC endpoints, overriding [chain] for this task only
    #[serde(default)]
    pub custom_http_rpc: Option<String>,
    #[serde(default)]
    pub custom_wss_rpc: Option<String>,
    /// Path to the wallets TOML file (supports ~)
    pub wallets_path: String,
}

impl SnipeSection {
    pub fn gas(&self) -> GasOverrides {
        GasOverrides {
            gas_price_gwei: self.gas_price_gwei.filter(|g| *g > 0),
            gas_limit: self.gas_limit.filter(|g| *g > 0),
        }
    }
}

/// Campaign configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CampaignSection {
    pub name: String,
    pub mode: CampaignMode,
    /// Token under campaign
    pub token: Address,
    pub amount_min_bnb: f64,
    pub amount_max_bnb: f64,
    /// Seconds between rounds
    pub interval_secs: u64,
    /// Wallets per round
    pub thread_count: usize,
    /// "count" | "amount" | "time" | "price" | "marketcap"
    pub stop_type: String,
    pub stop_value: f64,
    /// Pair registry for the market probe; PancakeSwap V2 factory default
    #[serde(default)]
    pub factory: Option<Address>,
    /// Base asset for the market probe; WBNB default
    #[serde(default)]
    pub base_token: Option<Address>,
    #[serde(default)]
    pub gas_price_gwei: Option<u64>,
    #[serde(default)]
    pub gas_limit: Option<u64>,
    pub wallets_path: String,
}

impl CampaignSection {
    pub fn stop_condition(&self) -> Result<StopCondition, ConfigError> {
        let value = self.stop_value;
        match self.stop_type.as_str() {
            "count" => Ok(StopCondition::Count(value as u64)),
            "amount" => Ok(StopCondition::Amount(value)),
            "time" => Ok(StopCondition::Time(value as u64)),
            "price" => Ok(StopCondition::Price(value)),
            "marketcap" => Ok(StopCondition::MarketCap(value)),
            other => Err(ConfigError::Validation(format!(
                "unknown stop_type '{other}' (expected count/amount/time/price/marketcap)"
            ))),
        }
    }

    pub fn gas(&self) -> GasOverrides {
        GasOverrides {
            gas_price_gwei: self.gas_price_gwei.filter(|g| *g > 0),
            gas_limit: self.gas_limit.filter(|g| *g > 0),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

/// Wallets file: a list of [[wallets]] entries.
#[derive(Debug, Deserialize)]
struct WalletsFile {
    wallets: Vec<SnipeWallet>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    Validation(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load execution wallets from their own TOML file; `~` expands to home.
pub fn load_wallets(path: &str) -> Result<Vec<SnipeWallet>, ConfigError> {
    let expanded = shellexpand::tilde(path).to_string();
    let content = std::fs::read_to_string(&expanded)?;
    let file: WalletsFile = toml::from_str(&content)?;
    if file.wallets.is_empty() {
        return Err(ConfigError::Validation(format!(
            "wallet file '{expanded}' contains no wallets"
        )));
    }
    for wallet in &file.wallets {
        if wallet.private_key.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "wallet {} has an empty private key",
                wallet.address
            )));
        }
    }
    Ok(file.wallets)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chain.chain_id != 56 && self.chain.chain_id != 97 {
            return Err(ConfigError::Validation(format!(
                "unsupported chain_id {} (expected 56 or 97)",
                self.chain.chain_id
            )));
        }

        if self.chain.http_rpc.is_empty() {
            return Err(ConfigError::Validation("http_rpc cannot be empty".into()));
        }

        if let Some(ref snipe) = self.snipe {
            if snipe.buy_amount_bnb <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "buy_amount_bnb must be > 0, got {}",
                    snipe.buy_amount_bnb
                )));
            }
            if snipe.wallets_path.is_empty() {
                return Err(ConfigError::Validation(
                    "snipe.wallets_path cannot be empty".into(),
                ));
            }
        }

        if let Some(ref campaign) = self.campaign {
            if campaign.thread_count == 0 {
                return Err(ConfigError::Validation(
                    "thread_count must be >= 1".into(),
                ));
            }
            if campaign.amount_min_bnb <= 0.0 || campaign.amount_max_bnb < campaign.amount_min_bnb
            {
                return Err(ConfigError::Validation(format!(
                    "invalid amount range [{}, {}]",
                    campaign.amount_min_bnb, campaign.amount_max_bnb
                )));
            }
            if campaign.interval_secs == 0 {
                return Err(ConfigError::Validation(
                    "interval_secs must be >= 1".into(),
                ));
            }
            if campaign.stop_value <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "stop_value must be > 0, got {}",
                    campaign.stop_value
                )));
            }
            // surface a bad stop_type at load time, not mid-campaign
            campaign.stop_condition()?;
            if campaign.wallets_path.is_empty() {
                return Err(ConfigError::Validation(
                    "campaign.wallets_path cannot be empty".into(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> String {
        r#"
[chain]
chain_id = 56
http_rpc = "https://bsc-dataseed.binance.org"
wss_rpc = "wss://bsc.publicnode.com"

[snipe]
target_creator = "0xcafe00000000000000000000000000000000cafe"
buy_amount_bnb = 0.05
gas_price_gwei = 3
gas_limit = 400000
wallets_path = "wallets.toml"

[campaign]
name = "pump-one"
mode = "pump"
token = "0x1111111111111111111111111111111111111111"
amount_min_bnb = 0.01
amount_max_bnb = 0.05
interval_secs = 10
thread_count = 3
stop_type = "count"
stop_value = 25
wallets_path = "wallets.toml"

[logging]
level = "info"
"#
        .to_string()
    }

    fn load_from_str(content: &str) -> Result<Config, ConfigError> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        load_config(file.path())
    }

    #[test]
    fn loads_valid_config() {
        let config = load_from_str(&create_valid_config()).unwrap();

        assert_eq!(config.chain.chain_id, 56);
        let snipe = config.snipe.unwrap();
        assert_eq!(snipe.buy_amount_bnb, 0.05);
        assert_eq!(snipe.gas().gas_price_gwei, Some(3));
        let campaign = config.campaign.unwrap();
        assert_eq!(campaign.thread_count, 3);
        assert_eq!(
            campaign.stop_condition().unwrap(),
            StopCondition::Count(25)
        );
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::Io(_)));
    }

    #[test]
    fn rejects_unknown_chain() {
        let content = create_valid_config().replace("chain_id = 56", "chain_id = 1");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn rejects_zero_buy_amount() {
        let content =
            create_valid_config().replace("buy_amount_bnb = 0.05", "buy_amount_bnb = 0.0");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn rejects_inverted_amount_range() {
        let content =
            create_valid_config().replace("amount_max_bnb = 0.05", "amount_max_bnb = 0.001");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn rejects_unknown_stop_type() {
        let content = create_valid_config().replace("stop_type = \"count\"", "stop_type = \"moon\"");
        assert!(matches!(
            load_from_str(&content).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn zero_gas_overrides_mean_node_defaults() {
        let content = create_valid_config()
            .replace("gas_price_gwei = 3", "gas_price_gwei = 0")
            .replace("gas_limit = 400000", "gas_limit = 0");
        let config = load_from_str(&content).unwrap();
        let gas = config.snipe.unwrap().gas();
        assert_eq!(gas.gas_price_gwei, None);
        assert_eq!(gas.gas_limit, None);
    }

    #[test]
    fn snipe_and_campaign_sections_are_optional() {
        let content = r#"
[chain]
chain_id = 97
http_rpc = "https://bsc-testnet.publicnode.com"
"#;
        let config = load_from_str(content).unwrap();
        assert!(config.snipe.is_none());
        assert!(config.campaign.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn loads_wallet_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
[[wallets]]
address = "0x1111111111111111111111111111111111111111"
private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
label = "w1"

[[wallets]]
address = "0x2222222222222222222222222222222222222222"
private_key = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d"
"#,
        )
        .unwrap();

        let wallets = load_wallets(file.path().to_str().unwrap()).unwrap();
        assert_eq!(wallets.len(), 2);
        assert_eq!(wallets[0].label.as_deref(), Some("w1"));
        assert_eq!(wallets[1].label, None);
    }

    #[test]
    fn rejects_empty_wallet_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"wallets = []\n").unwrap();
        assert!(matches!(
            load_wallets(file.path().to_str().unwrap()).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }
}
