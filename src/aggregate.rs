//! Derived views over a batch of decoded events: per-kind gas averages and
//! the set of liquidity positions the batch touched.

use indexmap::IndexMap;

use crate::abi::AbiValue;
use crate::errors::PositionError;
use crate::position::{position_key, PositionKey};
use crate::types::{DecodedEvent, EventKind, GasProfile, PositionIdentity, GAS_SENTINEL};

/// Arithmetic mean of gas used per event kind.
///
/// Kinds with no events in the batch report [`GAS_SENTINEL`] instead of
/// being omitted, so "zero events" is distinguishable from a missing key.
pub fn average_gas(events: &[DecodedEvent]) -> GasProfile {
    let mut sums = [0u64; 5];
    let mut counts = [0u64; 5];

    for event in events {
        let slot = event.kind as usize;
        sums[slot] += event.gas_used;
        counts[slot] += 1;
    }

    let average = |kind: EventKind| {
        let slot = kind as usize;
        if counts[slot] == 0 {
            GAS_SENTINEL
        } else {
            sums[slot] as f64 / counts[slot] as f64
        }
    };

    GasProfile {
        mint: average(EventKind::Mint),
        burn: average(EventKind::Burn),
        swap: average(EventKind::Swap),
        flash: average(EventKind::Flash),
        collect: average(EventKind::Collect),
    }
}

/// The distinct positions touched by the batch's mint and burn events.
///
/// Keyed by the derived position key; a later event with the same identity
/// is a no-op, since the key is a pure function of the triple. Iteration
/// order is first-occurrence insertion order, which keeps serialized output
/// reproducible across runs.
pub fn relevant_positions(
    events: &[DecodedEvent],
) -> Result<IndexMap<PositionKey, PositionIdentity>, PositionError> {
    let mut positions = IndexMap::new();

    for event in events {
        if !matches!(event.kind, EventKind::Mint | EventKind::Burn) {
            continue;
        }

        let owner = event
            .arg("owner")
            .and_then(AbiValue::as_address)
            .ok_or(PositionError::MissingField {
                kind: event.kind,
                field: "owner",
            })?;
        let tick_lower = event
            .arg("tickLower")
            .and_then(AbiValue::as_i32)
            .ok_or(PositionError::MissingField {
                kind: event.kind,
                field: "tickLower",
            })?;
        let tick_upper = event
            .arg("tickUpper")
            .and_then(AbiValue::as_i32)
            .ok_or(PositionError::MissingField {
                kind: event.kind,
                field: "tickUpper",
            })?;

        let key = position_key(owner, tick_lower, tick_upper)?;
        positions.entry(key).or_insert(PositionIdentity {
            owner,
            tick_lower,
            tick_upper,
        });
    }

    Ok(positions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{Address, B256};
    use indexmap::IndexMap as ArgMap;

    fn event(kind: EventKind, gas_used: u64) -> DecodedEvent {
        DecodedEvent {
            kind,
            args: ArgMap::new(),
            block_number: 1,
            timestamp: 0,
            gas_price: 0,
            gas_used,
            gas_total_eth: 0.0,
            transaction_hash: B256::ZERO,
        }
    }

    fn liquidity_event(
        kind: EventKind,
        owner: Address,
        tick_lower: i32,
        tick_upper: i32,
    ) -> DecodedEvent {
        let mut ev = event(kind, 100_000);
        ev.args
            .insert("owner".to_string(), AbiValue::Address(owner));
        ev.args
            .insert("tickLower".to_string(), AbiValue::from_i32(tick_lower));
        ev.args
            .insert("tickUpper".to_string(), AbiValue::from_i32(tick_upper));
        ev
    }

    #[test]
    fn test_average_gas_empty_batch() {
        let profile = average_gas(&[]);
        for kind in EventKind::ALL {
            assert_eq!(profile.for_kind(kind), GAS_SENTINEL);
        }
    }

    #[test]
    fn test_average_gas_swaps_only() {
        let events = vec![
            event(EventKind::Swap, 100),
            event(EventKind::Swap, 200),
            event(EventKind::Swap, 300),
        ];
        let profile = average_gas(&events);

        assert_eq!(profile.swap, 200.0);
        assert_eq!(profile.mint, GAS_SENTINEL);
        assert_eq!(profile.burn, GAS_SENTINEL);
        assert_eq!(profile.flash, GAS_SENTINEL);
        assert_eq!(profile.collect, GAS_SENTINEL);
    }

    #[test]
    fn test_average_gas_mixed_kinds() {
        let events = vec![
            event(EventKind::Mint, 400_000),
            event(EventKind::Mint, 200_000),
            event(EventKind::Burn, 90_000),
        ];
        let profile = average_gas(&events);

        assert_eq!(profile.mint, 300_000.0);
        assert_eq!(profile.burn, 90_000.0);
        assert_eq!(profile.swap, GAS_SENTINEL);
    }

    #[test]
    fn test_relevant_positions_deduplicates() {
        let owner = Address::from([0x42; 20]);
        let events = vec![
            liquidity_event(EventKind::Mint, owner, -60, 60),
            event(EventKind::Swap, 100),
            liquidity_event(EventKind::Burn, owner, -60, 60),
        ];

        let positions = relevant_positions(&events).unwrap();
        assert_eq!(positions.len(), 1);

        let identity = positions.values().next().unwrap();
        assert_eq!(identity.owner, owner);
        assert_eq!(identity.tick_lower, -60);
        assert_eq!(identity.tick_upper, 60);
    }

    #[test]
    fn test_relevant_positions_insertion_order() {
        let first = Address::from([0x01; 20]);
        let second = Address::from([0x02; 20]);
        let events = vec![
            liquidity_event(EventKind::Mint, first, -60, 60),
            liquidity_event(EventKind::Mint, second, -120, 120),
            liquidity_event(EventKind::Burn, first, -60, 60),
        ];

        let positions = relevant_positions(&events).unwrap();
        let owners: Vec<Address> = positions.values().map(|id| id.owner).collect();
        assert_eq!(owners, vec![first, second]);
    }

    #[test]
    fn test_relevant_positions_ignores_swaps() {
        let events = vec![event(EventKind::Swap, 100), event(EventKind::Flash, 100)];
        let positions = relevant_positions(&events).unwrap();
        assert!(positions.is_empty());
    }

    #[test]
    fn test_relevant_positions_missing_field() {
        let mut ev = event(EventKind::Mint, 100);
        ev.args.insert(
            "owner".to_string(),
            AbiValue::Address(Address::from([0x42; 20])),
        );

        let err = relevant_positions(&[ev]).unwrap_err();
        assert!(matches!(
            err,
            PositionError::MissingField {
                field: "tickLower",
                ..
            }
        ));
    }
}
