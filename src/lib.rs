//! Historical pool data collection for offline backtesting.
//!
//! Given a pool address and a date range, this crate fetches the pool's raw
//! event logs from a block-explorer collaborator, decodes them into typed
//! mint/burn/swap/flash/collect records, and derives the views a backtest
//! needs: per-kind gas averages and the set of liquidity positions the range
//! touched. Independently, it can snapshot the pool's complete state (global
//! accumulators, a tick window, position records, token balances) at the
//! block nearest a target time.
//!
//! All outputs are plain serde records, so they can be persisted as JSON and
//! replayed by a separate simulation engine.

pub mod abi;
pub mod aggregate;
pub mod contracts;
pub mod decoding;
pub mod errors;
pub mod etherscan;
pub mod position;
pub mod rpc;
pub mod signatures;
pub mod snapshot;
pub mod sources;
pub mod tick_math;
pub mod types;

use chrono::{NaiveDate, NaiveTime};
use eyre::{eyre, Result};
use tracing::debug;

pub use aggregate::{average_gas, relevant_positions};
pub use decoding::{decode_log, decode_logs, encode_event, DecodeMode};
pub use errors::{AbiError, DecodeError, PositionError, SnapshotError, SourceError};
pub use etherscan::{EtherscanClient, ExplorerConfig};
pub use position::{position_key, PositionKey};
pub use rpc::{RpcConfig, RpcStateReader};
pub use signatures::SignatureTable;
pub use snapshot::{snapshot, SnapshotRequest, DEFAULT_SURROUNDING_TICKS};
pub use sources::{BlockResolver, Closest, LogSource, StateReader, TokenMetadata};
pub use types::{
    DecodedEvent, EventKind, GasProfile, PoolSnapshot, PositionIdentity, RawLog, GAS_SENTINEL,
};

use alloy_primitives::Address;

/// Collect and decode a pool's events over a calendar date range.
///
/// The range start resolves to the nearest block after midnight of
/// `start_date`, the end to the nearest block before midnight of `end_date`
/// (both UTC), so the range covers `[start_date, end_date)`. Logs from event
/// kinds the signature table does not cover (the pool also emits
/// initialization and configuration events) are not part of the collected
/// dataset and are dropped up front; everything else decodes under `mode`.
///
/// # Example
/// ```no_run
/// use chrono::NaiveDate;
/// use scrape_pool_history::{collect_pool_events, DecodeMode, EtherscanClient, ExplorerConfig};
///
/// let client = EtherscanClient::new(ExplorerConfig::from_env().unwrap()).unwrap();
/// let pool = "0x8ad599c3A0ff1De082011EFDDc58f1908eb6e6D8".parse().unwrap();
///
/// let events = collect_pool_events(
///     &client,
///     &client,
///     pool,
///     NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
///     DecodeMode::Strict,
/// )
/// .unwrap();
/// println!("decoded {} events", events.len());
/// ```
pub fn collect_pool_events<S, B>(
    source: &S,
    resolver: &B,
    pool: Address,
    start_date: NaiveDate,
    end_date: NaiveDate,
    mode: DecodeMode,
) -> Result<Vec<DecodedEvent>>
where
    S: LogSource,
    B: BlockResolver,
{
    let start = date_to_timestamp(start_date)?;
    let end = date_to_timestamp(end_date)?;
    collect_pool_events_between(source, resolver, pool, start, end, mode)
}

/// Collect and decode a pool's events between two unix timestamps.
pub fn collect_pool_events_between<S, B>(
    source: &S,
    resolver: &B,
    pool: Address,
    start_time: u64,
    end_time: u64,
    mode: DecodeMode,
) -> Result<Vec<DecodedEvent>>
where
    S: LogSource,
    B: BlockResolver,
{
    if start_time >= end_time {
        return Err(eyre!(
            "start time {start_time} is not before end time {end_time}"
        ));
    }

    let start_block = resolver.block_at(start_time, Closest::After)?;
    let end_block = resolver.block_at(end_time, Closest::Before)?;
    if start_block > end_block {
        return Err(eyre!(
            "no blocks between timestamps {start_time} and {end_time}"
        ));
    }
    debug!(start_block, end_block, pool = %pool, "resolved block range");

    let logs = source.fetch_logs(pool, start_block, end_block)?;

    let table = SignatureTable::pool_events();
    let (known, foreign): (Vec<RawLog>, Vec<RawLog>) = logs.into_iter().partition(|log| {
        log.topics
            .first()
            .is_some_and(|topic0| table.lookup(*topic0).is_some())
    });
    if !foreign.is_empty() {
        debug!(
            dropped = foreign.len(),
            "dropped logs from uncollected event kinds"
        );
    }

    let events = decode_logs(&known, &table, mode)?;
    debug!(events = events.len(), "decoded event batch");
    Ok(events)
}

/// Midnight UTC of the given date as a unix timestamp.
fn date_to_timestamp(date: NaiveDate) -> Result<u64> {
    let instant = date.and_time(NaiveTime::MIN).and_utc();
    u64::try_from(instant.timestamp())
        .map_err(|_| eyre!("date {date} precedes the unix epoch"))
}
