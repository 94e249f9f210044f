//! Collaborator contracts the core consumes.
//!
//! Each trait is a single blocking request-response against some external
//! data source (a block explorer, an archive node). The core treats every
//! call as either succeeding or failing definitively; retries and timeouts
//! belong to the implementation, not here. Any HTTP/RPC client can implement
//! these — see `etherscan` and `rpc` for the bundled ones.

use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::errors::SourceError;
use crate::types::RawLog;

/// Which side of a timestamp to resolve a block on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Closest {
    /// Nearest block strictly before the timestamp
    Before,
    /// Nearest block strictly after the timestamp
    After,
}

impl Closest {
    pub fn as_str(&self) -> &'static str {
        match self {
            Closest::Before => "before",
            Closest::After => "after",
        }
    }
}

impl std::fmt::Display for Closest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fetches raw event logs emitted by a contract over a block range.
///
/// Implementations must return logs in ascending (block number, log index)
/// order and may paginate internally.
pub trait LogSource {
    fn fetch_logs(
        &self,
        address: Address,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, SourceError>;
}

/// Maps a unix timestamp to the nearest block on the requested side.
///
/// Deterministic for a fixed chain state.
pub trait BlockResolver {
    fn block_at(&self, timestamp: u64, closest: Closest) -> Result<u64, SourceError>;
}

/// Executes a read-only contract call pinned to a historical block.
///
/// `calldata` is the full ABI calldata (selector plus encoded arguments);
/// the return value is the raw return data. Calls are expected to be
/// idempotent: the same call at the same block always yields the same bytes.
pub trait StateReader {
    fn call(
        &self,
        contract: Address,
        calldata: Bytes,
        at_block: u64,
    ) -> Result<Bytes, SourceError>;
}

/// Resolves whether a token contract exposes a readable `balanceOf`
/// accessor, typically by consulting its verified interface.
pub trait TokenMetadata {
    fn supports_balance_of(&self, token: Address) -> Result<bool, SourceError>;
}
