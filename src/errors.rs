//! Error taxonomy for decoding, position derivation, collaborator calls and
//! snapshot assembly.
//!
//! Every error names the record, position or accessor that triggered it so a
//! failed batch can be re-run without guesswork.

use alloy_primitives::{Address, B256};
use thiserror::Error;

use crate::sources::Closest;
use crate::types::EventKind;

/// Failures of the ABI word codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// A 32-byte word carries bits outside the canonical range of its type
    /// (bad padding, bad sign extension, or an out-of-range boolean).
    #[error("word is not a canonical `{ty}` encoding")]
    BadPadding { ty: String },

    /// Payload length does not match the static tuple being decoded.
    #[error("payload is {found} bytes, expected {expected}")]
    Length { expected: usize, found: usize },
}

/// Failures while decoding a raw log against the signature table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("log at block {block_number} index {log_index} has no topics")]
    MissingTopics { block_number: u64, log_index: u64 },

    #[error("no known event signature for topic0 {topic0} (block {block_number}, log index {log_index})")]
    UnknownEventKind {
        topic0: B256,
        block_number: u64,
        log_index: u64,
    },

    #[error("{} log at block {block_number} index {log_index} carries {found} topics, expected {expected}", .kind.as_str())]
    TopicCount {
        kind: EventKind,
        expected: usize,
        found: usize,
        block_number: u64,
        log_index: u64,
    },

    #[error("cannot decode {} log at block {block_number} index {log_index}: {source}", .kind.as_str())]
    Payload {
        kind: EventKind,
        block_number: u64,
        log_index: u64,
        source: AbiError,
    },
}

/// Failures while deriving position keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("invalid tick range [{tick_lower}, {tick_upper}]")]
    InvalidTickRange { tick_lower: i32, tick_upper: i32 },

    #[error("{} event is missing the `{field}` argument", .kind.as_str())]
    MissingField {
        kind: EventKind,
        field: &'static str,
    },
}

/// Failures surfaced by external collaborators (log source, block resolver,
/// state reader, token metadata).
///
/// The core never retries these; transient failures are retried with backoff
/// inside the collaborator before they ever reach the core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("rate limited by data source")]
    RateLimited,

    #[error("data source error: {0}")]
    Api(String),
}

impl SourceError {
    /// Transient errors are worth retrying at the collaborator boundary.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Network(_) | SourceError::RateLimited)
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

/// Failures during snapshot assembly. All of these are fatal to the snapshot
/// request: a partially populated snapshot is never returned.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no block found {closest} timestamp {timestamp}: {source}")]
    BlockResolution {
        timestamp: u64,
        closest: Closest,
        source: SourceError,
    },

    #[error("state read `{accessor}` failed at block {block_number}: {source}")]
    StateRead {
        accessor: String,
        block_number: u64,
        source: SourceError,
    },

    #[error("malformed return data for `{accessor}` at block {block_number}: {detail}")]
    ReturnDecode {
        accessor: String,
        block_number: u64,
        detail: String,
    },

    #[error("balance of token {token} is unavailable: {reason}")]
    BalanceUnavailable { token: Address, reason: String },
}
