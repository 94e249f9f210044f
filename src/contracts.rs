//! Accessor return layouts using the Alloy sol! macro.
//!
//! These match the tuples returned by the getters solidity generates for the
//! pool's public state variables. All fields are static types, so a struct's
//! ABI encoding is exactly the raw return data of the corresponding call.

use alloy_sol_types::sol;

sol! {
    /// Return tuple of `slot0()`
    struct Slot0Return {
        uint160 sqrtPriceX96;
        int24 tick;
        uint16 observationIndex;
        uint16 observationCardinality;
        uint16 observationCardinalityNext;
        uint8 feeProtocol;
        bool unlocked;
    }

    /// Return tuple of `protocolFees()`
    struct ProtocolFeesReturn {
        uint128 token0;
        uint128 token1;
    }

    /// Return tuple of `observations(uint256)`
    struct ObservationReturn {
        uint32 blockTimestamp;
        int56 tickCumulative;
        uint160 secondsPerLiquidityCumulativeX128;
        bool initialized;
    }

    /// Return tuple of `ticks(int24)`
    struct TickInfoReturn {
        uint128 liquidityGross;
        int128 liquidityNet;
        uint256 feeGrowthOutside0X128;
        uint256 feeGrowthOutside1X128;
        int56 tickCumulativeOutside;
        uint160 secondsPerLiquidityOutsideX128;
        uint32 secondsOutside;
        bool initialized;
    }

    /// Return tuple of `positions(bytes32)`
    struct PositionInfoReturn {
        uint128 liquidity;
        uint256 feeGrowthInside0LastX128;
        uint256 feeGrowthInside1LastX128;
        uint128 tokensOwed0;
        uint128 tokensOwed1;
    }
}
