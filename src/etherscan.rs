//! Block-explorer collaborator: log fetching, timestamp-to-block
//! resolution and token metadata lookups over the explorer HTTP API.
//!
//! All configuration is explicit: endpoint, API key, page size and retry
//! policy live in [`ExplorerConfig`] and are passed in at construction.
//! Transient failures (network errors, rate limiting) are retried here with
//! exponential backoff; whatever still fails after the retry budget is
//! surfaced to the core unchanged.

use std::time::Duration;

use alloy_primitives::{Address, Bytes, B256};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::SourceError;
use crate::sources::{BlockResolver, Closest, LogSource, TokenMetadata};
use crate::types::RawLog;

const DEFAULT_ENDPOINT: &str = "https://api.etherscan.io/api";
const DEFAULT_PAGE_SIZE: usize = 1000;
const DEFAULT_MAX_RETRIES: u32 = 4;

/// Explorer endpoint and query policy.
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Log entries requested per page
    pub page_size: usize,
    /// Retry budget for transient failures
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub backoff: Duration,
}

impl ExplorerConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            page_size: DEFAULT_PAGE_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Duration::from_secs(1),
        }
    }

    /// Read the API key from `ETHERSCAN_API_KEY` (a `.env` file is honored).
    pub fn from_env() -> eyre::Result<Self> {
        dotenv::dotenv().ok();
        let api_key = std::env::var("ETHERSCAN_API_KEY")?;
        Ok(Self::new(api_key))
    }
}

/// Blocking explorer API client.
pub struct EtherscanClient {
    config: ExplorerConfig,
    http: reqwest::blocking::Client,
}

impl EtherscanClient {
    pub fn new(config: ExplorerConfig) -> Result<Self, SourceError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { config, http })
    }

    /// One API request with retry/backoff on transient failures.
    fn request(&self, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let mut attempt = 0u32;
        loop {
            match self.request_once(params) {
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.config.backoff * 2u32.saturating_pow(attempt);
                    warn!(%err, attempt, delay_ms = delay.as_millis() as u64, "retrying explorer request");
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn request_once(&self, params: &[(&str, String)]) -> Result<Value, SourceError> {
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&[("apikey", self.config.api_key.as_str())])
            .query(params)
            .send()?;

        let body: Value = response.json()?;

        // The API reports rate limiting inside a successful HTTP response
        let result_text = body["result"].as_str().unwrap_or_default();
        if result_text.to_ascii_lowercase().contains("rate limit") {
            return Err(SourceError::RateLimited);
        }

        Ok(body)
    }
}

impl LogSource for EtherscanClient {
    fn fetch_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, SourceError> {
        let mut logs = Vec::new();
        let mut page = 1usize;

        loop {
            let params = [
                ("module", "logs".to_string()),
                ("action", "getLogs".to_string()),
                ("address", format!("{address}")),
                ("fromBlock", from_block.to_string()),
                ("toBlock", to_block.to_string()),
                ("page", page.to_string()),
                ("offset", self.config.page_size.to_string()),
            ];
            let body = self.request(&params)?;

            let status = body["status"].as_str().unwrap_or_default();
            let message = body["message"].as_str().unwrap_or_default();
            if status != "1" {
                // An empty page past the last record is reported as an error
                // by the API; it just terminates pagination.
                if message.contains("No records found") {
                    break;
                }
                return Err(SourceError::Api(format!(
                    "getLogs failed: {message} ({})",
                    body["result"].as_str().unwrap_or_default()
                )));
            }

            let entries = body["result"]
                .as_array()
                .ok_or_else(|| SourceError::Api("getLogs result is not an array".to_string()))?;
            let page_len = entries.len();
            for entry in entries {
                logs.push(parse_log_entry(entry)?);
            }

            debug!(page, page_len, total = logs.len(), "fetched log page");
            if page_len < self.config.page_size {
                break;
            }
            page += 1;
        }

        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }
}

impl BlockResolver for EtherscanClient {
    fn block_at(&self, timestamp: u64, closest: Closest) -> Result<u64, SourceError> {
        let params = [
            ("module", "block".to_string()),
            ("action", "getblocknobytime".to_string()),
            ("timestamp", timestamp.to_string()),
            ("closest", closest.as_str().to_string()),
        ];
        let body = self.request(&params)?;

        let status = body["status"].as_str().unwrap_or_default();
        if status != "1" {
            return Err(SourceError::Api(format!(
                "no block {closest} timestamp {timestamp}: {}",
                body["result"].as_str().unwrap_or_default()
            )));
        }

        let result = body["result"]
            .as_str()
            .ok_or_else(|| SourceError::Api("block number result is not a string".to_string()))?;
        result
            .parse::<u64>()
            .map_err(|err| SourceError::Api(format!("bad block number `{result}`: {err}")))
    }
}

impl TokenMetadata for EtherscanClient {
    fn supports_balance_of(&self, token: Address) -> Result<bool, SourceError> {
        let params = [
            ("module", "contract".to_string()),
            ("action", "getabi".to_string()),
            ("address", format!("{token}")),
        ];
        let body = self.request(&params)?;

        if body["status"].as_str().unwrap_or_default() != "1" {
            // Unverified or unknown contract: the interface cannot be
            // resolved, so the balance accessor cannot be relied on.
            return Ok(false);
        }

        let abi_text = body["result"].as_str().unwrap_or_default();
        let abi: Value = serde_json::from_str(abi_text)
            .map_err(|err| SourceError::Api(format!("unparseable contract interface: {err}")))?;

        let entries = match abi.as_array() {
            Some(entries) => entries,
            None => return Ok(false),
        };
        Ok(entries.iter().any(|entry| {
            entry["type"].as_str() == Some("function")
                && entry["name"].as_str() == Some("balanceOf")
        }))
    }
}

/// Parse one explorer log entry into a [`RawLog`].
///
/// All numeric fields arrive as hex strings; a handful are reported as bare
/// `0x` when zero.
fn parse_log_entry(entry: &Value) -> Result<RawLog, SourceError> {
    let topics = entry["topics"]
        .as_array()
        .ok_or_else(|| SourceError::Api("log entry has no topics array".to_string()))?
        .iter()
        .map(|topic| {
            topic
                .as_str()
                .ok_or_else(|| SourceError::Api("topic is not a string".to_string()))
                .and_then(hex_b256)
        })
        .collect::<Result<Vec<B256>, SourceError>>()?;

    Ok(RawLog {
        address: hex_address(str_field(entry, "address")?)?,
        topics,
        data: hex_bytes(str_field(entry, "data")?)?,
        block_number: hex_u64(str_field(entry, "blockNumber")?)?,
        block_hash: match entry.get("blockHash").and_then(Value::as_str) {
            Some(text) => Some(hex_b256(text)?),
            None => None,
        },
        timestamp: hex_u64(str_field(entry, "timeStamp")?)?,
        gas_price: hex_u128(str_field(entry, "gasPrice")?)?,
        gas_used: hex_u64(str_field(entry, "gasUsed")?)?,
        log_index: hex_u64(str_field(entry, "logIndex")?)?,
        transaction_hash: hex_b256(str_field(entry, "transactionHash")?)?,
        transaction_index: hex_u64(str_field(entry, "transactionIndex")?)?,
    })
}

fn str_field<'a>(entry: &'a Value, field: &str) -> Result<&'a str, SourceError> {
    entry[field]
        .as_str()
        .ok_or_else(|| SourceError::Api(format!("log entry is missing `{field}`")))
}

fn strip_prefix(text: &str) -> &str {
    text.strip_prefix("0x").unwrap_or(text)
}

fn hex_u64(text: &str) -> Result<u64, SourceError> {
    let digits = strip_prefix(text);
    if digits.is_empty() {
        // the API encodes zero as a bare "0x" in some fields
        return Ok(0);
    }
    u64::from_str_radix(digits, 16)
        .map_err(|err| SourceError::Api(format!("bad hex quantity `{text}`: {err}")))
}

fn hex_u128(text: &str) -> Result<u128, SourceError> {
    let digits = strip_prefix(text);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|err| SourceError::Api(format!("bad hex quantity `{text}`: {err}")))
}

fn hex_bytes(text: &str) -> Result<Bytes, SourceError> {
    let raw = hex::decode(strip_prefix(text))
        .map_err(|err| SourceError::Api(format!("bad hex data `{text}`: {err}")))?;
    Ok(Bytes::from(raw))
}

fn hex_b256(text: &str) -> Result<B256, SourceError> {
    let raw = hex::decode(strip_prefix(text))
        .map_err(|err| SourceError::Api(format!("bad hex hash `{text}`: {err}")))?;
    if raw.len() != 32 {
        return Err(SourceError::Api(format!(
            "expected a 32-byte hash, got {} bytes",
            raw.len()
        )));
    }
    Ok(B256::from_slice(&raw))
}

fn hex_address(text: &str) -> Result<Address, SourceError> {
    let raw = hex::decode(strip_prefix(text))
        .map_err(|err| SourceError::Api(format!("bad hex address `{text}`: {err}")))?;
    if raw.len() != 20 {
        return Err(SourceError::Api(format!(
            "expected a 20-byte address, got {} bytes",
            raw.len()
        )));
    }
    Ok(Address::from_slice(&raw))
}
