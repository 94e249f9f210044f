//! Position key derivation.
//!
//! A pool's position-indexed state is keyed by the keccak hash of the packed
//! (owner, tickLower, tickUpper) triple. The packing is NOT standard ABI
//! encoding: the three values are laid out back to back with no padding,
//! 20 bytes of address followed by two 3-byte big-endian two's-complement
//! ticks, 26 bytes in total. The hash must match the contract's own
//! derivation bit for bit, since it selects the storage slot the snapshot
//! assembler later reads.

use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

use crate::errors::PositionError;
use crate::tick_math::{MAX_TICK, MIN_TICK};

/// Canonical identity of a liquidity position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionKey(pub B256);

impl PositionKey {
    pub fn as_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for PositionKey {
    fn from(hash: B256) -> Self {
        PositionKey(hash)
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the storage key for a position.
///
/// Pure: identical triples always produce identical keys. Rejects ranges
/// where `tick_lower > tick_upper` and ticks outside the pool's global
/// bounds, since no on-chain position can carry either.
pub fn position_key(
    owner: Address,
    tick_lower: i32,
    tick_upper: i32,
) -> Result<PositionKey, PositionError> {
    if tick_lower > tick_upper || tick_lower < MIN_TICK || tick_upper > MAX_TICK {
        return Err(PositionError::InvalidTickRange {
            tick_lower,
            tick_upper,
        });
    }

    Ok(PositionKey(keccak256(pack(owner, tick_lower, tick_upper))))
}

/// Packed layout: owner (20 bytes) | tickLower (3 bytes) | tickUpper (3 bytes)
fn pack(owner: Address, tick_lower: i32, tick_upper: i32) -> [u8; 26] {
    let mut packed = [0u8; 26];
    packed[..20].copy_from_slice(owner.as_slice());
    packed[20..23].copy_from_slice(&int24_be(tick_lower));
    packed[23..26].copy_from_slice(&int24_be(tick_upper));
    packed
}

/// Low 3 bytes of the tick's two's-complement representation, big-endian.
fn int24_be(tick: i32) -> [u8; 3] {
    let bytes = tick.to_be_bytes();
    [bytes[1], bytes[2], bytes[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> Address {
        Address::from([0x42; 20])
    }

    #[test]
    fn test_key_is_pure() {
        let a = position_key(owner(), -60, 60).unwrap();
        let b = position_key(owner(), -60, 60).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_triples_distinct_keys() {
        let base = position_key(owner(), -60, 60).unwrap();

        assert_ne!(base, position_key(owner(), -60, 120).unwrap());
        assert_ne!(base, position_key(owner(), -120, 60).unwrap());
        assert_ne!(base, position_key(Address::from([0x43; 20]), -60, 60).unwrap());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = position_key(owner(), 60, -60).unwrap_err();
        assert!(matches!(
            err,
            PositionError::InvalidTickRange {
                tick_lower: 60,
                tick_upper: -60
            }
        ));
    }

    #[test]
    fn test_out_of_bounds_ticks_rejected() {
        assert!(position_key(owner(), MIN_TICK - 1, 0).is_err());
        assert!(position_key(owner(), 0, MAX_TICK + 1).is_err());
        assert!(position_key(owner(), MIN_TICK, MAX_TICK).is_ok());
    }

    #[test]
    fn test_packed_layout() {
        let packed = pack(owner(), -1, 60);
        assert_eq!(&packed[..20], owner().as_slice());
        // -1 as int24 is 0xffffff
        assert_eq!(&packed[20..23], &[0xff, 0xff, 0xff]);
        // 60 is 0x00003c
        assert_eq!(&packed[23..26], &[0x00, 0x00, 0x3c]);
    }

    #[test]
    fn test_int24_sign_truncation() {
        assert_eq!(int24_be(0), [0, 0, 0]);
        assert_eq!(int24_be(887272), [0x0d, 0x89, 0xe8]);
        assert_eq!(int24_be(-887272), [0xf2, 0x76, 0x18]);
    }
}
