//! Raw pending-transaction hash feed over WebSocket.
//!
//! Thin wrapper over `eth_subscribe("newPendingTransactions")`: connect,
//! subscribe, then yield hashes until the server closes the stream.
//! Reconnect policy lives with the channel that owns the feed, not here.

use alloy::primitives::B256;
use futures_util::stream::{SplitStream, StreamExt};
use futures_util::SinkExt;
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::ports::rpc::RpcError;

/// Default public BSC WebSocket endpoints.
pub const DEFAULT_WSS_NODES: [&str; 2] =
    ["wss://bsc.publicnode.com", "wss://bsc-rpc.publicnode.com"];

const SUBSCRIBE_MSG: &str =
    r#"{"jsonrpc":"2.0","id":1,"method":"eth_subscribe","params":["newPendingTransactions"]}"#;

#[derive(Deserialize)]
struct SubscriptionMessage {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<SubscriptionParams>,
}

#[derive(Deserialize)]
struct SubscriptionParams {
    result: String,
}

/// An open pending-hash subscription.
pub struct PendingHashFeed {
    read: SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl PendingHashFeed {
    /// Connect and subscribe. Fails fast so the owning channel can apply its
    /// own backoff.
    pub async fn connect(url: &str) -> Result<Self, RpcError> {
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| RpcError::Transport(format!("websocket connect failed: {e}")))?;
        let (mut write, read) = stream.split();

        write
            .send(SUBSCRIBE_MSG.to_string().into())
            .await
            .map_err(|e| RpcError::Transport(format!("subscribe send failed: {e}")))?;

        Ok(Self { read })
    }

    /// Next pending transaction hash, or `None` once the stream closes.
    /// Non-hash frames (subscription confirmation, pings, malformed JSON)
    /// are skipped silently - the feed only cares about hashes.
    pub async fn next_hash(&mut self) -> Option<B256> {
        while let Some(message) = self.read.next().await {
            let text = match message {
                Ok(WsMessage::Text(text)) => text,
                Ok(WsMessage::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            };

            let parsed: SubscriptionMessage = match serde_json::from_str(&text) {
                Ok(parsed) => parsed,
                Err(_) => continue,
            };

            if parsed.id == Some(1) {
                if let Some(sub_id) = parsed.result {
                    tracing::debug!("pending subscription confirmed: {sub_id}");
                }
                continue;
            }

            if parsed.method.as_deref() == Some("eth_subscription") {
                if let Some(params) = parsed.params {
                    if let Ok(hash) = params.result.parse::<B256>() {
                        return Some(hash);
                    }
                }
            }
        }
        None
    }
}
