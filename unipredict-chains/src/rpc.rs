//! Minimal JSON-RPC 2.0 client shared by the chain adapters

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;
use unipredict_core::{TradingError, TradingResult};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// JSON-RPC request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: serde_json::Value,
    id: u64,
}

/// JSON-RPC response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    #[serde(default)]
    code: i64,
    message: String,
}

/// JSON-RPC client bound to one endpoint
pub struct RpcClient {
    client: reqwest::Client,
    url: url::Url,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Create a client; fails with `Connection` on a malformed URL
    pub fn new(endpoint: &str) -> TradingResult<Self> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| TradingError::connection(format!("Invalid RPC URL {}: {}", endpoint, e)))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| TradingError::connection(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Call a method whose result must be present
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: serde_json::Value) -> TradingResult<T> {
        self.call_optional(method, params)
            .await?
            .ok_or_else(|| TradingError::upstream(format!("No result in {} response", method)))
    }

    /// Call a method whose result may be `null`
    pub async fn call_optional<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> TradingResult<Option<T>> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        debug!("RPC {} -> {}", method, self.url);

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| TradingError::connection(format!("RPC request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TradingError::upstream(format!(
                "RPC endpoint error ({}): {}",
                status, body
            )));
        }

        let rpc_response: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| TradingError::decode(format!("Failed to parse RPC response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(TradingError::upstream(format!(
                "RPC error {}: {}",
                error.code, error.message
            )));
        }

        match rpc_response.result {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| TradingError::decode(format!("Unexpected {} result: {}", method, e))),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient").field("url", &self.url.as_str()).finish()
    }
}

/// Parse an Ethereum hex quantity (e.g. `"0x1a"`)
pub fn parse_quantity(hex: &str) -> TradingResult<u128> {
    let digits = hex.strip_prefix("0x").unwrap_or(hex);
    let digits = digits.trim_start_matches('0');

    if digits.is_empty() {
        return Ok(0);
    }
    if digits.len() > 32 {
        return Err(TradingError::decode(format!("Quantity exceeds 128 bits: {}", hex)));
    }

    u128::from_str_radix(digits, 16)
        .map_err(|e| TradingError::decode(format!("Failed to parse quantity {}: {}", hex, e)))
}
