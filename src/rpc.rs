//! JSON-RPC collaborator: `eth_call` pinned to a historical block.
//!
//! The node must be an archive node for deep history; a non-archive node
//! answers recent blocks only and reverts everything older.

use std::time::Duration;

use alloy_primitives::{Address, Bytes};
use serde_json::{json, Value};
use tracing::warn;

use crate::errors::SourceError;
use crate::sources::StateReader;

const DEFAULT_MAX_RETRIES: u32 = 4;

/// Node endpoint and retry policy.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub endpoint: String,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RpcConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_secs(1),
        }
    }

    /// Read the endpoint from `ETH_RPC_URL` (a `.env` file is honored).
    pub fn from_env() -> eyre::Result<Self> {
        dotenv::dotenv().ok();
        let endpoint = std::env::var("ETH_RPC_URL")?;
        Ok(Self::new(endpoint))
    }
}

/// Blocking JSON-RPC client implementing the contract-state reader contract.
pub struct RpcStateReader {
    config: RpcConfig,
    http: reqwest::blocking::Client,
}

impl RpcStateReader {
    pub fn new(config: RpcConfig) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, http })
    }

    fn post(&self, method: &str, params: Value) -> Result<Value, SourceError> {
        let mut attempt = 0u32;
        loop {
            match self.post_once(method, &params) {
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff * 2u32.saturating_pow(attempt);
                    warn!(%err, attempt, method, "retrying rpc request");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn post_once(&self, method: &str, params: &Value) -> Result<Value, SourceError> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let body: Value = self
            .http
            .post(&self.config.endpoint)
            .json(&request)
            .send()?
            .json()?;

        if let Some(error) = body.get("error") {
            let message = error["message"].as_str().unwrap_or("unknown rpc error");
            if message.to_ascii_lowercase().contains("rate") {
                return Err(SourceError::RateLimited);
            }
            return Err(SourceError::Api(format!("{method} failed: {message}")));
        }

        Ok(body["result"].clone())
    }
}

impl StateReader for RpcStateReader {
    fn call(
        &self,
        contract: Address,
        calldata: Bytes,
        at_block: u64,
    ) -> Result<Bytes, SourceError> {
        let params = json!([
            {
                "to": format!("{contract}"),
                "data": format!("0x{}", hex::encode(&calldata)),
            },
            format!("0x{at_block:x}"),
        ]);

        let result = self.post("eth_call", params)?;
        let text = result
            .as_str()
            .ok_or_else(|| SourceError::Api("eth_call result is not a string".to_string()))?;

        let raw = hex::decode(text.strip_prefix("0x").unwrap_or(text))
            .map_err(|err| SourceError::Api(format!("bad eth_call return data: {err}")))?;
        Ok(Bytes::from(raw))
    }
}
