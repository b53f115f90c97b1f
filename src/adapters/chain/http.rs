//! HTTP JSON-RPC client for BSC nodes.
//!
//! Implements the `ChainRpc` port over plain JSON-RPC 2.0 with bounded
//! retry on transport faults and server errors. Public BSC endpoints drop
//! requests routinely; the retry here keeps single blips away from the
//! detection loops.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::ports::rpc::{ChainRpc, LogFilter, LogRecord, ReceiptRecord, RpcError, TxRecord};

/// Default public BSC endpoints, in fallback order.
pub const DEFAULT_HTTP_NODES: [&str; 3] = [
    "https://bsc-dataseed.binance.org",
    "https://bsc.publicnode.com",
    "https://bsc-dataseed1.binance.org",
];

#[derive(Debug, Clone)]
pub struct HttpRpcConfig {
    pub url: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl Default for HttpRpcConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_HTTP_NODES[0].to_string(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }
}

/// JSON-RPC client implementing the `ChainRpc` port.
#[derive(Debug, Clone)]
pub struct HttpRpc {
    config: HttpRpcConfig,
    http: Client,
    next_id: std::sync::Arc<AtomicU64>,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_config(HttpRpcConfig {
            url: url.into(),
            ..HttpRpcConfig::default()
        })
    }

    pub fn with_config(config: HttpRpcConfig) -> Result<Self, RpcError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            config,
            http,
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let mut last_error = None;
        for attempt in 0..self.config.max_retries {
            match self.http.post(&self.config.url).json(&body).send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_error = Some(RpcError::Transport(format!(
                        "server error: {}",
                        response.status()
                    )));
                }
                Ok(response) => {
                    let envelope: RpcEnvelope = response
                        .json()
                        .await
                        .map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
                    if let Some(err) = envelope.error {
                        // node-level errors are not retryable
                        return Err(RpcError::Node {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    let result = envelope
                        .result
                        .ok_or_else(|| RpcError::InvalidResponse("missing result".into()))?;
                    return serde_json::from_value(result)
                        .map_err(|e| RpcError::InvalidResponse(format!("{method}: {e}")));
                }
                Err(e) if e.is_timeout() => {
                    last_error = Some(RpcError::Timeout(method.to_string()));
                }
                Err(e) => {
                    last_error = Some(RpcError::Transport(e.to_string()));
                }
            }
            tokio::time::sleep(Duration::from_millis(200 * (attempt as u64 + 1))).await;
        }

        Err(last_error.unwrap_or_else(|| RpcError::Transport("max retries exceeded".into())))
    }
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTx {
    hash: String,
    from: String,
    to: Option<String>,
    input: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
    #[serde(default)]
    block_number: Option<String>,
    #[serde(default)]
    transaction_hash: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    status: Option<String>,
    #[serde(default)]
    block_number: Option<String>,
    logs: Vec<RawLog>,
}

#[derive(Deserialize)]
struct RawBlock {
    #[serde(default)]
    transactions: Vec<RawTx>,
}

fn parse_u64(hex: &str) -> Result<u64, RpcError> {
    u64::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity {hex}: {e}")))
}

fn parse_u128(hex: &str) -> Result<u128, RpcError> {
    u128::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity {hex}: {e}")))
}

fn parse_u256(hex: &str) -> Result<U256, RpcError> {
    U256::from_str_radix(hex.trim_start_matches("0x"), 16)
        .map_err(|e| RpcError::InvalidResponse(format!("bad quantity {hex}: {e}")))
}

fn parse_address(hex: &str) -> Result<Address, RpcError> {
    hex.parse()
        .map_err(|e| RpcError::InvalidResponse(format!("bad address {hex}: {e}")))
}

fn parse_b256(hex: &str) -> Result<B256, RpcError> {
    hex.parse()
        .map_err(|e| RpcError::InvalidResponse(format!("bad hash {hex}: {e}")))
}

fn parse_bytes(hex: &str) -> Result<Bytes, RpcError> {
    hex.parse()
        .map_err(|e| RpcError::InvalidResponse(format!("bad bytes: {e}")))
}

fn convert_tx(raw: RawTx) -> Result<TxRecord, RpcError> {
    Ok(TxRecord {
        hash: parse_b256(&raw.hash)?,
        from: parse_address(&raw.from)?,
        to: raw.to.as_deref().map(parse_address).transpose()?,
        input: parse_bytes(&raw.input)?,
        value: raw.value.as_deref().map(parse_u256).transpose()?.unwrap_or(U256::ZERO),
    })
}

fn convert_log(raw: RawLog) -> Result<LogRecord, RpcError> {
    Ok(LogRecord {
        address: parse_address(&raw.address)?,
        topics: raw
            .topics
            .iter()
            .map(|t| parse_b256(t))
            .collect::<Result<_, _>>()?,
        data: parse_bytes(&raw.data)?,
        block_number: raw.block_number.as_deref().map(parse_u64).transpose()?.unwrap_or(0),
        tx_hash: raw
            .transaction_hash
            .as_deref()
            .map(parse_b256)
            .transpose()?
            .unwrap_or(B256::ZERO),
    })
}

#[async_trait]
impl ChainRpc for HttpRpc {
    async fn block_number(&self) -> Result<u64, RpcError> {
        let hex: String = self.request("eth_blockNumber", json!([])).await?;
        parse_u64(&hex)
    }

    async fn transaction_by_hash(&self, hash: B256) -> Result<Option<TxRecord>, RpcError> {
        let raw: Option<RawTx> = self
            .request("eth_getTransactionByHash", json!([format!("{hash}")]))
            .await?;
        raw.map(convert_tx).transpose()
    }

    async fn transaction_receipt(&self, hash: B256) -> Result<Option<ReceiptRecord>, RpcError> {
        let raw: Option<RawReceipt> = self
            .request("eth_getTransactionReceipt", json!([format!("{hash}")]))
            .await?;
        raw.map(|receipt| {
            Ok(ReceiptRecord {
                status: receipt.status.as_deref() == Some("0x1"),
                block_number: receipt
                    .block_number
                    .as_deref()
                    .map(parse_u64)
                    .transpose()?
                    .unwrap_or(0),
                logs: receipt
                    .logs
                    .into_iter()
                    .map(convert_log)
                    .collect::<Result<_, _>>()?,
            })
        })
        .transpose()
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogRecord>, RpcError> {
        let mut params = json!({
            "address": format!("{}", filter.address),
            "fromBlock": format!("0x{:x}", filter.from_block),
            "toBlock": format!("0x{:x}", filter.to_block),
        });
        if let Some(topic0) = filter.topic0 {
            params["topics"] = json!([format!("{topic0}")]);
        }
        let raw: Vec<RawLog> = self.request("eth_getLogs", json!([params])).await?;
        raw.into_iter().map(convert_log).collect()
    }

    async fn pending_transactions(&self) -> Result<Vec<TxRecord>, RpcError> {
        let block: Option<RawBlock> = self
            .request("eth_getBlockByNumber", json!(["pending", true]))
            .await?;
        block
            .map(|b| b.transactions.into_iter().map(convert_tx).collect())
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn pending_nonce(&self, address: Address) -> Result<u64, RpcError> {
        let hex: String = self
            .request(
                "eth_getTransactionCount",
                json!([format!("{address}"), "pending"]),
            )
            .await?;
        parse_u64(&hex)
    }

    async fn gas_price(&self) -> Result<u128, RpcError> {
        let hex: String = self.request("eth_gasPrice", json!([])).await?;
        parse_u128(&hex)
    }

    async fn send_raw_transaction(&self, raw: Bytes) -> Result<B256, RpcError> {
        let hex: String = self
            .request("eth_sendRawTransaction", json!([format!("{raw}")]))
            .await?;
        parse_b256(&hex)
    }

    async fn call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        let hex: String = self
            .request(
                "eth_call",
                json!([{"to": format!("{to}"), "data": format!("{data}")}, "latest"]),
            )
            .await?;
        parse_bytes(&hex)
    }

    async fn balance(&self, address: Address) -> Result<U256, RpcError> {
        let hex: String = self
            .request("eth_getBalance", json!([format!("{address}"), "latest"]))
            .await?;
        parse_u256(&hex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = HttpRpcConfig::default();
        assert_eq!(config.url, "https://bsc-dataseed.binance.org");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn client_creation() {
        assert!(HttpRpc::new("https://bsc.publicnode.com").is_ok());
    }

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_u64("0x10").unwrap(), 16);
        assert_eq!(parse_u64("0x0").unwrap(), 0);
        assert!(parse_u64("0xzz").is_err());
        assert_eq!(parse_u256("0xde0b6b3a7640000").unwrap(), U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn tx_conversion_handles_missing_fields() {
        let raw = RawTx {
            hash: format!("0x{}", "11".repeat(32)),
            from: format!("0x{}", "22".repeat(20)),
            to: None,
            input: "0x".into(),
            value: None,
        };
        let tx = convert_tx(raw).unwrap();
        assert_eq!(tx.to, None);
        assert_eq!(tx.value, U256::ZERO);
        assert!(tx.input.is_empty());
    }
}
