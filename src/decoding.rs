//! Raw log decoding against the event signature table.
//!
//! Classification is by topic0; indexed arguments are recovered from the
//! remaining topics, non-indexed arguments from the payload as a static
//! tuple, then merged back into declaration order. The transform is pure:
//! the same log and table always yield the same decoded event.

use alloy_primitives::{Bytes, B256};
use indexmap::IndexMap;
use tracing::warn;

use crate::abi::{self, AbiType, AbiValue};
use crate::errors::DecodeError;
use crate::signatures::{EventSignature, SignatureTable};
use crate::types::{DecodedEvent, RawLog};

/// Batch behavior when a log fails to decode.
///
/// `Strict` aborts the whole batch on the first bad log. A silently dropped
/// event corrupts every view derived from the batch (gas averages, the
/// touched-position set), so skipping is opt-in only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    #[default]
    Strict,
    SkipUndecodable,
}

/// Decode a single raw log into a typed event.
pub fn decode_log(raw: &RawLog, table: &SignatureTable) -> Result<DecodedEvent, DecodeError> {
    let topic0 = raw.topics.first().ok_or(DecodeError::MissingTopics {
        block_number: raw.block_number,
        log_index: raw.log_index,
    })?;

    let sig = table
        .lookup(*topic0)
        .ok_or(DecodeError::UnknownEventKind {
            topic0: *topic0,
            block_number: raw.block_number,
            log_index: raw.log_index,
        })?;

    let expected = sig.indexed_count() + 1;
    if raw.topics.len() != expected {
        return Err(DecodeError::TopicCount {
            kind: sig.kind,
            expected,
            found: raw.topics.len(),
            block_number: raw.block_number,
            log_index: raw.log_index,
        });
    }

    let payload_err = |source| DecodeError::Payload {
        kind: sig.kind,
        block_number: raw.block_number,
        log_index: raw.log_index,
        source,
    };

    // Indexed arguments come straight from the topics, one word each
    let mut indexed_values = Vec::with_capacity(sig.indexed_count());
    for (arg, topic) in sig.indexed().zip(&raw.topics[1..]) {
        indexed_values.push(abi::decode_word(arg.ty, topic).map_err(payload_err)?);
    }

    // Non-indexed arguments are the payload, ABI-encoded as a static tuple
    let body_types: Vec<AbiType> = sig.non_indexed().map(|arg| arg.ty).collect();
    let body_values = abi::decode_tuple(&body_types, &raw.data).map_err(payload_err)?;

    // Merge both halves back into declaration order
    let mut indexed_iter = indexed_values.into_iter();
    let mut body_iter = body_values.into_iter();
    let mut args = IndexMap::with_capacity(sig.args.len());
    for arg in &sig.args {
        let value = if arg.indexed {
            indexed_iter.next()
        } else {
            body_iter.next()
        };
        if let Some(value) = value {
            args.insert(arg.name.to_string(), value);
        }
    }

    Ok(DecodedEvent {
        kind: sig.kind,
        args,
        block_number: raw.block_number,
        timestamp: raw.timestamp,
        gas_price: raw.gas_price,
        gas_used: raw.gas_used,
        gas_total_eth: raw.gas_price as f64 * 1e-18 * raw.gas_used as f64,
        transaction_hash: raw.transaction_hash,
    })
}

/// Decode a batch of raw logs.
///
/// In [`DecodeMode::SkipUndecodable`] each failing log is logged and
/// dropped; otherwise the first failure aborts the batch.
pub fn decode_logs(
    logs: &[RawLog],
    table: &SignatureTable,
    mode: DecodeMode,
) -> Result<Vec<DecodedEvent>, DecodeError> {
    let mut events = Vec::with_capacity(logs.len());
    for raw in logs {
        match decode_log(raw, table) {
            Ok(event) => events.push(event),
            Err(err) if mode == DecodeMode::SkipUndecodable => {
                warn!(
                    block_number = raw.block_number,
                    log_index = raw.log_index,
                    %err,
                    "skipping undecodable log"
                );
            }
            Err(err) => return Err(err),
        }
    }
    Ok(events)
}

/// Re-encode an event's arguments under its signature.
///
/// Returns the full topics array (topic0 first) and the payload. Decoding a
/// log and re-encoding it reproduces the original topics and data
/// bit-for-bit. `None` when `args` is missing an argument the signature
/// declares.
pub fn encode_event(
    sig: &EventSignature,
    args: &IndexMap<String, AbiValue>,
) -> Option<(Vec<B256>, Bytes)> {
    let mut topics = vec![sig.topic0()];
    let mut payload = Vec::new();

    for arg in &sig.args {
        let word = abi::encode_word(args.get(arg.name)?);
        if arg.indexed {
            topics.push(word);
        } else {
            payload.extend_from_slice(word.as_slice());
        }
    }

    Some((topics, Bytes::from(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventKind;
    use alloy_primitives::{Address, I256, U256};

    fn swap_log(table: &SignatureTable) -> RawLog {
        let sig = table.for_kind(EventKind::Swap).unwrap();
        let sender = Address::from([0x11; 20]);
        let recipient = Address::from([0x22; 20]);

        let topics = vec![
            sig.topic0(),
            abi::encode_word(&AbiValue::Address(sender)),
            abi::encode_word(&AbiValue::Address(recipient)),
        ];
        let data = abi::encode_words(&[
            AbiValue::Int(I256::try_from(-500i64).unwrap()),
            AbiValue::Int(I256::try_from(510i64).unwrap()),
            AbiValue::Uint(U256::from(79228162514264337593543950336u128)),
            AbiValue::Uint(U256::from(1_000_000u64)),
            AbiValue::from_i32(-200),
        ]);

        RawLog {
            address: Address::from([0xcc; 20]),
            topics,
            data: Bytes::from(data),
            block_number: 17_000_000,
            block_hash: None,
            timestamp: 1_680_000_000,
            gas_price: 30_000_000_000,
            gas_used: 120_000,
            log_index: 7,
            transaction_hash: B256::from([0xab; 32]),
            transaction_index: 3,
        }
    }

    #[test]
    fn test_decode_swap_fields() {
        let table = SignatureTable::pool_events();
        let event = decode_log(&swap_log(&table), &table).unwrap();

        assert_eq!(event.kind, EventKind::Swap);
        let names: Vec<&str> = event.args.keys().map(String::as_str).collect();
        assert_eq!(
            names,
            vec![
                "sender",
                "recipient",
                "amount0",
                "amount1",
                "sqrtPriceX96",
                "liquidity",
                "tick"
            ]
        );

        assert_eq!(
            event.arg("sender").unwrap().as_address(),
            Some(Address::from([0x11; 20]))
        );
        assert_eq!(
            event.arg("amount0").unwrap().as_i256(),
            Some(I256::try_from(-500i64).unwrap())
        );
        assert_eq!(event.arg("tick").unwrap().as_i32(), Some(-200));
        assert_eq!(
            event.arg("liquidity").unwrap().as_u128(),
            Some(1_000_000u128)
        );
        assert_eq!(event.block_number, 17_000_000);
        assert_eq!(event.gas_used, 120_000);
    }

    #[test]
    fn test_decode_reencode_round_trip() {
        let table = SignatureTable::pool_events();
        let raw = swap_log(&table);
        let event = decode_log(&raw, &table).unwrap();

        let sig = table.for_kind(event.kind).unwrap();
        let (topics, data) = encode_event(sig, &event.args).unwrap();
        assert_eq!(topics, raw.topics);
        assert_eq!(data, raw.data);
    }

    #[test]
    fn test_round_trip_every_kind() {
        let table = SignatureTable::pool_events();
        for kind in EventKind::ALL {
            let sig = table.for_kind(kind).unwrap();

            // Synthetic but canonical values, one per declared argument
            let mut args = IndexMap::new();
            for (index, arg) in sig.args.iter().enumerate() {
                let value = match arg.ty {
                    AbiType::Address => AbiValue::Address(Address::from([index as u8 + 1; 20])),
                    AbiType::Uint(_) => AbiValue::Uint(U256::from(1_000 + index as u64)),
                    AbiType::Int(_) => AbiValue::from_i32(-60 * (index as i32 + 1)),
                    AbiType::Bool => AbiValue::Bool(true),
                    AbiType::FixedBytes(_) => AbiValue::Bytes(B256::from([index as u8; 32])),
                };
                args.insert(arg.name.to_string(), value);
            }

            let (topics, data) = encode_event(sig, &args).unwrap();
            let raw = RawLog {
                topics: topics.clone(),
                data: data.clone(),
                ..swap_log(&table)
            };

            let event = decode_log(&raw, &table).unwrap();
            assert_eq!(event.kind, kind);
            assert_eq!(event.args, args);

            let (topics_again, data_again) = encode_event(sig, &event.args).unwrap();
            assert_eq!(topics_again, topics);
            assert_eq!(data_again, data);
        }
    }

    #[test]
    fn test_unknown_topic0() {
        let table = SignatureTable::pool_events();
        let mut raw = swap_log(&table);
        raw.topics[0] = B256::from([0xee; 32]);

        let err = decode_log(&raw, &table).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownEventKind { .. }));
    }

    #[test]
    fn test_no_topics() {
        let table = SignatureTable::pool_events();
        let mut raw = swap_log(&table);
        raw.topics.clear();

        let err = decode_log(&raw, &table).unwrap_err();
        assert!(matches!(err, DecodeError::MissingTopics { .. }));
    }

    #[test]
    fn test_topic_count_mismatch() {
        let table = SignatureTable::pool_events();
        let mut raw = swap_log(&table);
        raw.topics.pop();

        let err = decode_log(&raw, &table).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::TopicCount {
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_payload() {
        let table = SignatureTable::pool_events();
        let mut raw = swap_log(&table);
        let mut data = raw.data.to_vec();
        data.truncate(data.len() - 1);
        raw.data = Bytes::from(data);

        let err = decode_log(&raw, &table).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::Payload {
                kind: EventKind::Swap,
                ..
            }
        ));
    }

    #[test]
    fn test_batch_strict_aborts() {
        let table = SignatureTable::pool_events();
        let good = swap_log(&table);
        let mut bad = swap_log(&table);
        bad.topics[0] = B256::from([0xee; 32]);

        let logs = vec![good.clone(), bad, good];
        assert!(decode_logs(&logs, &table, DecodeMode::Strict).is_err());
    }

    #[test]
    fn test_batch_skip_continues() {
        let table = SignatureTable::pool_events();
        let good = swap_log(&table);
        let mut bad = swap_log(&table);
        bad.topics[0] = B256::from([0xee; 32]);

        let logs = vec![good.clone(), bad, good];
        let events = decode_logs(&logs, &table, DecodeMode::SkipUndecodable).unwrap();
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|ev| ev.kind == EventKind::Swap));
    }

    #[test]
    fn test_decode_is_deterministic() {
        let table = SignatureTable::pool_events();
        let raw = swap_log(&table);
        assert_eq!(
            decode_log(&raw, &table).unwrap(),
            decode_log(&raw, &table).unwrap()
        );
    }
}
