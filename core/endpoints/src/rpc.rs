//! Minimal JSON-RPC client for EVM endpoints.
//!
//! Only the handful of read methods the dashboard needs: chain ID,
//! block number, and account balance. Quantities stay in their hex
//! string form until display, where [`hex_to_decimal`] and
//! [`format_ether`] convert them.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use ethervault_common::{Address, Error, Result};

/// Per-request timeout for RPC calls.
const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

/// JSON-RPC 2.0 client over HTTP.
pub struct RpcClient {
    http: reqwest::Client,
}

impl RpcClient {
    /// Create a new RPC client.
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .user_agent("EtherVault/0.1")
            .timeout(RPC_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self { http }
    }

    /// Make a JSON-RPC call and return the raw `result` value.
    ///
    /// # Errors
    /// - `Network` on transport failure, a malformed response, or an
    ///   `error` object in the response body
    pub async fn call(&self, url: &str, method: &str, params: Value) -> Result<Value> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Network(format!("RPC request failed: {}", e)))?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| Error::Network(format!("Malformed RPC response: {}", e)))?;

        if let Some(err) = envelope.error {
            return Err(Error::Network(format!(
                "rpc error {}: {}",
                err.code, err.message
            )));
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }

    /// Like [`RpcClient::call`], flattening a string result.
    ///
    /// Non-string results come back as their JSON text, which keeps
    /// unusual endpoints displayable.
    pub async fn call_string(&self, url: &str, method: &str, params: Value) -> Result<String> {
        match self.call(url, method, params).await? {
            Value::String(s) => Ok(s),
            other => Ok(other.to_string()),
        }
    }

    /// `eth_chainId` as a hex quantity string.
    pub async fn chain_id(&self, url: &str) -> Result<String> {
        self.call_string(url, "eth_chainId", serde_json::json!([]))
            .await
    }

    /// `eth_blockNumber` as a hex quantity string.
    pub async fn block_number(&self, url: &str) -> Result<String> {
        self.call_string(url, "eth_blockNumber", serde_json::json!([]))
            .await
    }

    /// `eth_getBalance` at the latest block, as a hex wei string.
    pub async fn balance_of(&self, url: &str, address: &Address) -> Result<String> {
        self.call_string(
            url,
            "eth_getBalance",
            serde_json::json!([address.as_str(), "latest"]),
        )
        .await
    }
}

impl Default for RpcClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a hex quantity string (`"0x1b4"`) to its decimal form.
///
/// Empty input and a bare `"0x"` read as zero, matching how endpoints
/// report empty quantities.
pub fn hex_to_decimal(hex: &str) -> Result<String> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if digits.is_empty() {
        return Ok("0".to_string());
    }

    let value = u128::from_str_radix(digits, 16)
        .map_err(|_| Error::Validation(format!("'{}' is not a hex quantity", trimmed)))?;
    Ok(value.to_string())
}

/// Format a hex wei quantity as an ether amount for display.
///
/// Zero renders as `"0"`, dust below a ten-thousandth as `"< 0.0001"`,
/// and anything else with four decimal places.
pub fn format_ether(wei_hex: &str) -> Result<String> {
    let trimmed = wei_hex.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let wei = if digits.is_empty() {
        0u128
    } else {
        u128::from_str_radix(digits, 16)
            .map_err(|_| Error::Validation(format!("'{}' is not a wei quantity", trimmed)))?
    };

    if wei == 0 {
        return Ok("0".to_string());
    }

    let ether = wei as f64 / 1e18;
    if ether < 0.0001 {
        Ok("< 0.0001".to_string())
    } else {
        Ok(format!("{:.4}", ether))
    }
}
