//! Point-in-time pool state assembly.
//!
//! Resolves a target time to a historical block, then reads the pool's
//! public accessors at that block: slot0 and the global accumulators, the
//! oracle observation array, a dense tick window around the active tick, the
//! requested position records and both token balances. Every read targets
//! the same fixed block, so issue order never affects the result; any
//! failing global read aborts the whole request rather than returning a
//! partially populated snapshot.

use alloy_primitives::{keccak256, Address, Bytes, U256};
use alloy_sol_types::SolValue;
use indexmap::IndexMap;
use tracing::debug;

use crate::abi::{self, AbiType, AbiValue};
use crate::contracts::{
    ObservationReturn, PositionInfoReturn, ProtocolFeesReturn, Slot0Return, TickInfoReturn,
};
use crate::errors::SnapshotError;
use crate::position::PositionKey;
use crate::sources::{BlockResolver, Closest, StateReader, TokenMetadata};
use crate::tick_math;
use crate::types::{Observation, PoolSnapshot, PositionData, ProtocolFees, Slot0, Tick};

/// Ticks read on either side of the active tick when the caller does not
/// override the window.
pub const DEFAULT_SURROUNDING_TICKS: u32 = 300;

/// One snapshot request: which pool, at which time, and how much of the
/// tick- and position-indexed state to capture.
#[derive(Debug, Clone)]
pub struct SnapshotRequest {
    pub pool: Address,
    /// Unix timestamp to resolve to a block
    pub target_time: u64,
    /// Which side of the timestamp to resolve on
    pub closest: Closest,
    /// Position keys to capture; keys for positions that do not exist yet at
    /// the resolved block are captured as all-zero records
    pub position_keys: Vec<PositionKey>,
    /// Initializable ticks captured on either side of the active tick
    pub surrounding_ticks: u32,
}

impl SnapshotRequest {
    pub fn new(pool: Address, target_time: u64, closest: Closest) -> Self {
        Self {
            pool,
            target_time,
            closest,
            position_keys: Vec::new(),
            surrounding_ticks: DEFAULT_SURROUNDING_TICKS,
        }
    }

    pub fn with_positions(mut self, position_keys: Vec<PositionKey>) -> Self {
        self.position_keys = position_keys;
        self
    }

    pub fn with_surrounding_ticks(mut self, surrounding_ticks: u32) -> Self {
        self.surrounding_ticks = surrounding_ticks;
        self
    }
}

/// 4-byte function selector for a canonical method signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Assemble a pool's complete state at the block nearest the requested time.
pub fn snapshot<R, B, M>(
    reader: &R,
    resolver: &B,
    metadata: &M,
    request: &SnapshotRequest,
) -> Result<PoolSnapshot, SnapshotError>
where
    R: StateReader,
    B: BlockResolver,
    M: TokenMetadata,
{
    let block_number = resolver
        .block_at(request.target_time, request.closest)
        .map_err(|source| SnapshotError::BlockResolution {
            timestamp: request.target_time,
            closest: request.closest,
            source,
        })?;
    debug!(block_number, pool = %request.pool, "resolved snapshot block");

    let pool = request.pool;

    // Global fields, each an independent read
    let token0 = read_address(reader, pool, block_number, "token0()")?;
    let token1 = read_address(reader, pool, block_number, "token1()")?;
    let tick_spacing = read_int24(reader, pool, block_number, "tickSpacing()")?;
    let slot0 = read_slot0(reader, pool, block_number)?;
    let fee_growth_global_0_x128 =
        read_uint(reader, pool, block_number, "feeGrowthGlobal0X128()")?;
    let fee_growth_global_1_x128 =
        read_uint(reader, pool, block_number, "feeGrowthGlobal1X128()")?;
    let protocol_fees = read_protocol_fees(reader, pool, block_number)?;
    let liquidity = read_uint128(reader, pool, block_number, "liquidity()")?;

    // Oracle observations, up to the currently configured cardinality
    let mut observations = Vec::with_capacity(slot0.observation_cardinality as usize);
    for index in 0..slot0.observation_cardinality {
        observations.push(read_observation(reader, pool, block_number, index)?);
    }

    // Dense tick window around the active tick. Ticks with no liquidity are
    // still recorded so the window has no gaps.
    let active_tick = tick_math::nearest_initializable_tick(slot0.tick, tick_spacing);
    let window = tick_math::tick_window(active_tick, tick_spacing, request.surrounding_ticks);
    debug!(
        active_tick,
        window_len = window.len(),
        "reading tick-indexed state"
    );

    let mut ticks = IndexMap::with_capacity(window.len());
    for tick_index in window {
        ticks.insert(tick_index, read_tick(reader, pool, block_number, tick_index)?);
    }

    // Position-indexed state for exactly the requested keys
    let mut positions = IndexMap::with_capacity(request.position_keys.len());
    for key in &request.position_keys {
        positions.insert(*key, read_position(reader, pool, block_number, *key)?);
    }

    // Token balances; unreadable is an error, not zero
    let balance0 = read_balance(reader, metadata, token0, pool, block_number)?;
    let balance1 = read_balance(reader, metadata, token1, pool, block_number)?;

    Ok(PoolSnapshot {
        pool,
        block_number,
        token0,
        token1,
        tick_spacing,
        slot0,
        fee_growth_global_0_x128,
        fee_growth_global_1_x128,
        protocol_fees,
        liquidity,
        observations,
        ticks,
        positions,
        balance0,
        balance1,
    })
}

fn accessor_label(signature: &str, args: &[AbiValue]) -> String {
    if args.is_empty() {
        signature.to_string()
    } else {
        let rendered: Vec<String> = args.iter().map(|arg| arg.to_string()).collect();
        format!("{} with ({})", signature, rendered.join(", "))
    }
}

fn return_decode(
    accessor: impl Into<String>,
    block_number: u64,
    detail: impl ToString,
) -> SnapshotError {
    SnapshotError::ReturnDecode {
        accessor: accessor.into(),
        block_number,
        detail: detail.to_string(),
    }
}

/// Issue one accessor call: selector + ABI-encoded static arguments.
fn call<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
    args: &[AbiValue],
) -> Result<Bytes, SnapshotError> {
    let mut calldata = selector(signature).to_vec();
    calldata.extend_from_slice(&abi::encode_words(args));

    reader
        .call(contract, Bytes::from(calldata), block_number)
        .map_err(|source| SnapshotError::StateRead {
            accessor: accessor_label(signature, args),
            block_number,
            source,
        })
}

/// Read an accessor returning a single word of the given type.
fn read_word<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
    ty: AbiType,
) -> Result<AbiValue, SnapshotError> {
    let data = call(reader, contract, block_number, signature, &[])?;
    let mut values = abi::decode_tuple(&[ty], &data)
        .map_err(|err| return_decode(signature, block_number, err))?;
    values
        .pop()
        .ok_or_else(|| return_decode(signature, block_number, "empty return data"))
}

fn read_address<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
) -> Result<Address, SnapshotError> {
    read_word(reader, contract, block_number, signature, AbiType::Address)?
        .as_address()
        .ok_or_else(|| return_decode(signature, block_number, "expected an address word"))
}

fn read_uint<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
) -> Result<U256, SnapshotError> {
    read_word(reader, contract, block_number, signature, AbiType::Uint(256))?
        .as_u256()
        .ok_or_else(|| return_decode(signature, block_number, "expected a uint word"))
}

fn read_uint128<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
) -> Result<u128, SnapshotError> {
    read_word(reader, contract, block_number, signature, AbiType::Uint(128))?
        .as_u128()
        .ok_or_else(|| return_decode(signature, block_number, "expected a uint128 word"))
}

fn read_int24<R: StateReader>(
    reader: &R,
    contract: Address,
    block_number: u64,
    signature: &str,
) -> Result<i32, SnapshotError> {
    read_word(reader, contract, block_number, signature, AbiType::Int(24))?
        .as_i32()
        .ok_or_else(|| return_decode(signature, block_number, "expected an int24 word"))
}

fn read_slot0<R: StateReader>(
    reader: &R,
    pool: Address,
    block_number: u64,
) -> Result<Slot0, SnapshotError> {
    let signature = "slot0()";
    let data = call(reader, pool, block_number, signature, &[])?;
    let ret = Slot0Return::abi_decode(&data)
        .map_err(|err| return_decode(signature, block_number, err))?;

    Ok(Slot0 {
        sqrt_price_x96: U256::from(ret.sqrtPriceX96),
        tick: ret.tick.as_i32(),
        observation_index: ret.observationIndex,
        observation_cardinality: ret.observationCardinality,
        observation_cardinality_next: ret.observationCardinalityNext,
        fee_protocol: ret.feeProtocol,
        unlocked: ret.unlocked,
    })
}

fn read_protocol_fees<R: StateReader>(
    reader: &R,
    pool: Address,
    block_number: u64,
) -> Result<ProtocolFees, SnapshotError> {
    let signature = "protocolFees()";
    let data = call(reader, pool, block_number, signature, &[])?;
    let ret = ProtocolFeesReturn::abi_decode(&data)
        .map_err(|err| return_decode(signature, block_number, err))?;

    Ok(ProtocolFees {
        token0: ret.token0,
        token1: ret.token1,
    })
}

fn read_observation<R: StateReader>(
    reader: &R,
    pool: Address,
    block_number: u64,
    index: u16,
) -> Result<Observation, SnapshotError> {
    let signature = "observations(uint256)";
    let args = [AbiValue::Uint(U256::from(index))];
    let data = call(reader, pool, block_number, signature, &args)?;
    let ret = ObservationReturn::abi_decode(&data)
        .map_err(|err| return_decode(accessor_label(signature, &args), block_number, err))?;

    Ok(Observation {
        block_timestamp: ret.blockTimestamp,
        tick_cumulative: ret.tickCumulative.as_i64(),
        seconds_per_liquidity_cumulative_x128: U256::from(ret.secondsPerLiquidityCumulativeX128),
        initialized: ret.initialized,
    })
}

fn read_tick<R: StateReader>(
    reader: &R,
    pool: Address,
    block_number: u64,
    tick_index: i32,
) -> Result<Tick, SnapshotError> {
    let signature = "ticks(int24)";
    let args = [AbiValue::from_i32(tick_index)];
    let data = call(reader, pool, block_number, signature, &args)?;
    let ret = TickInfoReturn::abi_decode(&data)
        .map_err(|err| return_decode(accessor_label(signature, &args), block_number, err))?;

    Ok(Tick {
        tick: tick_index,
        liquidity_gross: ret.liquidityGross,
        liquidity_net: ret.liquidityNet,
        fee_growth_outside_0_x128: ret.feeGrowthOutside0X128,
        fee_growth_outside_1_x128: ret.feeGrowthOutside1X128,
        tick_cumulative_outside: ret.tickCumulativeOutside.as_i64(),
        seconds_per_liquidity_outside_x128: U256::from(ret.secondsPerLiquidityOutsideX128),
        seconds_outside: ret.secondsOutside,
        initialized: ret.initialized,
    })
}

fn read_position<R: StateReader>(
    reader: &R,
    pool: Address,
    block_number: u64,
    key: PositionKey,
) -> Result<PositionData, SnapshotError> {
    let signature = "positions(bytes32)";
    let args = [AbiValue::Bytes(key.as_b256())];
    let data = call(reader, pool, block_number, signature, &args)?;
    let ret = PositionInfoReturn::abi_decode(&data)
        .map_err(|err| return_decode(accessor_label(signature, &args), block_number, err))?;

    Ok(PositionData {
        liquidity: ret.liquidity,
        fee_growth_inside_0_last_x128: ret.feeGrowthInside0LastX128,
        fee_growth_inside_1_last_x128: ret.feeGrowthInside1LastX128,
        tokens_owed_0: ret.tokensOwed0,
        tokens_owed_1: ret.tokensOwed1,
    })
}

/// Read the pool's balance of one token.
///
/// A zero balance is materially different from an unreadable one, so a token
/// without a resolvable `balanceOf` accessor is an error rather than a
/// silent zero.
fn read_balance<R: StateReader, M: TokenMetadata>(
    reader: &R,
    metadata: &M,
    token: Address,
    pool: Address,
    block_number: u64,
) -> Result<U256, SnapshotError> {
    match metadata.supports_balance_of(token) {
        Ok(true) => {}
        Ok(false) => {
            return Err(SnapshotError::BalanceUnavailable {
                token,
                reason: "verified interface exposes no balanceOf accessor".to_string(),
            })
        }
        Err(err) => {
            return Err(SnapshotError::BalanceUnavailable {
                token,
                reason: err.to_string(),
            })
        }
    }

    let signature = "balanceOf(address)";
    let args = [AbiValue::Address(pool)];
    let data = call(reader, token, block_number, signature, &args)?;
    let mut values = abi::decode_tuple(&[AbiType::Uint(256)], &data)
        .map_err(|err| return_decode(accessor_label(signature, &args), block_number, err))?;
    values
        .pop()
        .and_then(|value| value.as_u256())
        .ok_or_else(|| {
            return_decode(
                accessor_label(signature, &args),
                block_number,
                "expected a uint word",
            )
        })
}
