use alloy_primitives::{Address, Bytes, B256, U256};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::abi::AbiValue;
use crate::position::PositionKey;

/// The five state-changing events a pool emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[serde(alias = "MINT")]
    Mint,
    #[serde(alias = "BURN")]
    Burn,
    #[serde(alias = "SWAP")]
    Swap,
    #[serde(alias = "FLASH")]
    Flash,
    #[serde(alias = "COLLECT")]
    Collect,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::Mint,
        EventKind::Burn,
        EventKind::Swap,
        EventKind::Flash,
        EventKind::Collect,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Mint => "mint",
            EventKind::Burn => "burn",
            EventKind::Swap => "swap",
            EventKind::Flash => "flash",
            EventKind::Collect => "collect",
        }
    }
}

/// Raw event log with associated block and transaction metadata, as returned
/// by a log source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    /// Contract that emitted the log
    pub address: Address,
    /// topic0 (signature hash) followed by the indexed argument words
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed arguments
    pub data: Bytes,
    /// Block number where this log was emitted
    pub block_number: u64,
    /// Block hash (not reported by every log source)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_hash: Option<B256>,
    /// Block timestamp in unix seconds
    pub timestamp: u64,
    /// Gas price of the emitting transaction, in wei
    pub gas_price: u128,
    /// Gas used by the emitting transaction
    pub gas_used: u64,
    /// Log index within the block
    pub log_index: u64,
    /// Transaction hash
    pub transaction_hash: B256,
    /// Transaction index within the block
    pub transaction_index: u64,
}

/// A raw log decoded against its event signature.
///
/// `args` holds every argument of the event in declaration order, indexed and
/// non-indexed alike, keyed by the argument name from the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedEvent {
    pub kind: EventKind,
    pub args: IndexMap<String, AbiValue>,
    pub block_number: u64,
    pub timestamp: u64,
    pub gas_price: u128,
    pub gas_used: u64,
    /// gas_price * gas_used, denominated in ether
    pub gas_total_eth: f64,
    pub transaction_hash: B256,
}

impl DecodedEvent {
    pub fn arg(&self, name: &str) -> Option<&AbiValue> {
        self.args.get(name)
    }
}

/// Average reported for an event kind with zero occurrences in the batch.
pub const GAS_SENTINEL: f64 = -1.0;

/// Average gas used per event kind across a batch of decoded events.
///
/// Every kind is always present; a kind that never occurred carries
/// [`GAS_SENTINEL`] so callers can tell "zero events" from "key missing".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GasProfile {
    pub mint: f64,
    pub burn: f64,
    pub swap: f64,
    pub flash: f64,
    pub collect: f64,
}

impl GasProfile {
    pub fn for_kind(&self, kind: EventKind) -> f64 {
        match kind {
            EventKind::Mint => self.mint,
            EventKind::Burn => self.burn,
            EventKind::Swap => self.swap,
            EventKind::Flash => self.flash,
            EventKind::Collect => self.collect,
        }
    }
}

impl Default for GasProfile {
    fn default() -> Self {
        Self {
            mint: GAS_SENTINEL,
            burn: GAS_SENTINEL,
            swap: GAS_SENTINEL,
            flash: GAS_SENTINEL,
            collect: GAS_SENTINEL,
        }
    }
}

/// The (owner, tick range) triple that identifies a liquidity position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionIdentity {
    pub owner: Address,
    pub tick_lower: i32,
    pub tick_upper: i32,
}

/// Pool slot0 data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Slot0 {
    pub sqrt_price_x96: U256,
    pub tick: i32,
    pub observation_index: u16,
    pub observation_cardinality: u16,
    pub observation_cardinality_next: u16,
    pub fee_protocol: u8,
    pub unlocked: bool,
}

/// A single oracle observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub block_timestamp: u32,
    pub tick_cumulative: i64,
    pub seconds_per_liquidity_cumulative_x128: U256,
    pub initialized: bool,
}

/// Tick data
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub tick: i32,
    pub liquidity_gross: u128,
    pub liquidity_net: i128,
    pub fee_growth_outside_0_x128: U256,
    pub fee_growth_outside_1_x128: U256,
    pub tick_cumulative_outside: i64,
    pub seconds_per_liquidity_outside_x128: U256,
    pub seconds_outside: u32,
    pub initialized: bool,
}

/// Position accumulators and liquidity
///
/// An all-zero record is a valid state: the position did not exist yet at the
/// queried block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub liquidity: u128,
    pub fee_growth_inside_0_last_x128: U256,
    pub fee_growth_inside_1_last_x128: U256,
    pub tokens_owed_0: u128,
    pub tokens_owed_1: u128,
}

impl PositionData {
    pub fn is_initialized(&self) -> bool {
        *self != PositionData::default()
    }
}

/// Accumulated protocol fees, one counter per token
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtocolFees {
    pub token0: u128,
    pub token1: u128,
}

/// Complete point-in-time state of a pool.
///
/// Assembled once per (pool, block) request and never merged with another
/// snapshot. `ticks` is a dense window around the active tick (uninitialized
/// ticks are present as empty records); `positions` covers exactly the keys
/// the caller asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub pool: Address,
    pub block_number: u64,
    pub token0: Address,
    pub token1: Address,
    pub tick_spacing: i32,
    pub slot0: Slot0,
    pub fee_growth_global_0_x128: U256,
    pub fee_growth_global_1_x128: U256,
    pub protocol_fees: ProtocolFees,
    pub liquidity: u128,
    pub observations: Vec<Observation>,
    pub ticks: IndexMap<i32, Tick>,
    pub positions: IndexMap<PositionKey, PositionData>,
    pub balance0: U256,
    pub balance1: U256,
}
