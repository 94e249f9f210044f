//! Word-level codec for the static ABI types the pool's events and accessors
//! use.
//!
//! IMPORTANT: two encodings are in play here and they are different!
//! - ABI encoding: every value occupies a full 32-byte word, right-aligned
//!   for numbers and addresses, left-aligned for fixed bytes
//! - Packed encoding: values laid out back to back with no padding (used for
//!   position keys, see `position`)
//!
//! This module implements the word form. Decoding is strict: a word whose
//! padding or sign extension is not canonical for its declared type is
//! rejected, which is what makes decode/encode a bit-for-bit round trip.

use alloy_primitives::{Address, B256, I256, U256};
use serde::{Deserialize, Serialize};

use crate::errors::AbiError;

/// Canonical ABI type of a single static value.
///
/// Bit widths are in bits (8..=256, multiple of 8); fixed bytes widths are in
/// bytes (1..=32). Dynamic types never occur in the pool's signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
}

impl AbiType {
    /// The type name as it appears in a canonical signature string.
    pub fn canonical(&self) -> String {
        match self {
            AbiType::Address => "address".to_string(),
            AbiType::Bool => "bool".to_string(),
            AbiType::Uint(bits) => format!("uint{bits}"),
            AbiType::Int(bits) => format!("int{bits}"),
            AbiType::FixedBytes(width) => format!("bytes{width}"),
        }
    }
}

/// A decoded argument or return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiValue {
    Address(Address),
    Uint(U256),
    Int(I256),
    Bool(bool),
    /// Fixed bytes, left-aligned in the word exactly as encoded.
    Bytes(B256),
}

impl AbiValue {
    /// Wrap a tick or other small signed integer.
    pub fn from_i32(value: i32) -> Self {
        AbiValue::Int(I256::try_from(value).expect("i32 fits in int256"))
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            AbiValue::Address(addr) => Some(*addr),
            _ => None,
        }
    }

    pub fn as_u256(&self) -> Option<U256> {
        match self {
            AbiValue::Uint(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_u128(&self) -> Option<u128> {
        match self {
            AbiValue::Uint(value) => u128::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            AbiValue::Uint(value) => u64::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_i256(&self) -> Option<I256> {
        match self {
            AbiValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            AbiValue::Int(value) => i32::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AbiValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_b256(&self) -> Option<B256> {
        match self {
            AbiValue::Bytes(word) => Some(*word),
            _ => None,
        }
    }
}

impl std::fmt::Display for AbiValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbiValue::Address(addr) => write!(f, "{addr}"),
            AbiValue::Uint(value) => write!(f, "{value}"),
            AbiValue::Int(value) => write!(f, "{value}"),
            AbiValue::Bool(value) => write!(f, "{value}"),
            AbiValue::Bytes(word) => write!(f, "{word}"),
        }
    }
}

/// Decode a single 32-byte word as the given type.
///
/// Rejects non-canonical words: dirty padding bits, dirty sign extension,
/// or a boolean that is neither 0 nor 1.
pub fn decode_word(ty: AbiType, word: &B256) -> Result<AbiValue, AbiError> {
    let raw = U256::from_be_bytes(**word);

    let bad = || AbiError::BadPadding { ty: ty.canonical() };

    match ty {
        AbiType::Address => {
            // 20-byte value, right-aligned: the 12 leading bytes must be zero
            if word[..12].iter().any(|b| *b != 0) {
                return Err(bad());
            }
            Ok(AbiValue::Address(Address::from_slice(&word[12..])))
        }
        AbiType::Bool => {
            if raw == U256::ZERO {
                Ok(AbiValue::Bool(false))
            } else if raw == U256::from(1u8) {
                Ok(AbiValue::Bool(true))
            } else {
                Err(bad())
            }
        }
        AbiType::Uint(bits) => {
            if bits < 256 {
                let mask = (U256::from(1u8) << bits) - U256::from(1u8);
                if raw > mask {
                    return Err(bad());
                }
            }
            Ok(AbiValue::Uint(raw))
        }
        AbiType::Int(bits) => {
            if bits < 256 {
                // Canonical form sign-extends the value over the whole word:
                // reconstruct it from the low `bits` bits and compare.
                let mask = (U256::from(1u8) << bits) - U256::from(1u8);
                let low = raw & mask;
                let negative = (raw >> (bits - 1)) & U256::from(1u8) == U256::from(1u8);
                let expected = if negative { low | !mask } else { low };
                if raw != expected {
                    return Err(bad());
                }
            }
            Ok(AbiValue::Int(I256::from_raw(raw)))
        }
        AbiType::FixedBytes(width) => {
            // Left-aligned: the trailing bytes must be zero
            if word[width..].iter().any(|b| *b != 0) {
                return Err(bad());
            }
            Ok(AbiValue::Bytes(*word))
        }
    }
}

/// Encode a value back into its 32-byte word.
///
/// Inverse of [`decode_word`] for canonical words.
pub fn encode_word(value: &AbiValue) -> B256 {
    match value {
        AbiValue::Address(addr) => {
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(addr.as_slice());
            B256::from(word)
        }
        AbiValue::Uint(v) => B256::from(v.to_be_bytes::<32>()),
        AbiValue::Int(v) => B256::from(v.into_raw().to_be_bytes::<32>()),
        AbiValue::Bool(v) => {
            let mut word = [0u8; 32];
            word[31] = u8::from(*v);
            B256::from(word)
        }
        AbiValue::Bytes(word) => *word,
    }
}

/// Decode a payload as a tuple of static types, one word per element.
pub fn decode_tuple(types: &[AbiType], data: &[u8]) -> Result<Vec<AbiValue>, AbiError> {
    let expected = types.len() * 32;
    if data.len() != expected {
        return Err(AbiError::Length {
            expected,
            found: data.len(),
        });
    }

    types
        .iter()
        .zip(data.chunks_exact(32))
        .map(|(ty, chunk)| decode_word(*ty, &B256::from_slice(chunk)))
        .collect()
}

/// Encode a sequence of values as a concatenation of 32-byte words.
pub fn encode_words(values: &[AbiValue]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 32);
    for value in values {
        out.extend_from_slice(encode_word(value).as_slice());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_round_trip() {
        let addr = Address::from([0x42; 20]);
        let word = encode_word(&AbiValue::Address(addr));
        assert_eq!(&word[..12], &[0u8; 12]);

        let decoded = decode_word(AbiType::Address, &word).unwrap();
        assert_eq!(decoded, AbiValue::Address(addr));
    }

    #[test]
    fn test_address_rejects_dirty_padding() {
        let mut word = [0u8; 32];
        word[0] = 1;
        word[31] = 0x42;
        let err = decode_word(AbiType::Address, &B256::from(word)).unwrap_err();
        assert!(matches!(err, AbiError::BadPadding { .. }));
    }

    #[test]
    fn test_uint_width_check() {
        let word = encode_word(&AbiValue::Uint(U256::from(u128::MAX)));
        assert!(decode_word(AbiType::Uint(128), &word).is_ok());
        assert!(decode_word(AbiType::Uint(64), &word).is_err());
    }

    #[test]
    fn test_negative_int24_round_trip() {
        // -100 as int24, sign-extended over the full word
        let value = I256::try_from(-100i64).unwrap();
        let word = encode_word(&AbiValue::Int(value));
        assert_eq!(word[0], 0xff);

        let decoded = decode_word(AbiType::Int(24), &word).unwrap();
        assert_eq!(decoded.as_i32(), Some(-100));
    }

    #[test]
    fn test_int_rejects_dirty_sign_extension() {
        // -1 as int24 must be all 0xff; clearing a high byte breaks canon
        let value = I256::MINUS_ONE;
        let mut word = *encode_word(&AbiValue::Int(value));
        word[3] = 0;
        assert!(decode_word(AbiType::Int(24), &B256::from(word)).is_err());
    }

    #[test]
    fn test_int_range_limits() {
        // 2^23 - 1 is the largest int24; 2^23 is out of range
        let max = I256::try_from((1i64 << 23) - 1).unwrap();
        let word = encode_word(&AbiValue::Int(max));
        assert!(decode_word(AbiType::Int(24), &word).is_ok());

        let over = I256::try_from(1i64 << 23).unwrap();
        let word = encode_word(&AbiValue::Int(over));
        assert!(decode_word(AbiType::Int(24), &word).is_err());
    }

    #[test]
    fn test_bool_words() {
        let word = encode_word(&AbiValue::Bool(true));
        assert_eq!(decode_word(AbiType::Bool, &word).unwrap(), AbiValue::Bool(true));

        let mut dirty = [0u8; 32];
        dirty[31] = 2;
        assert!(decode_word(AbiType::Bool, &B256::from(dirty)).is_err());
    }

    #[test]
    fn test_fixed_bytes_alignment() {
        let word = B256::from([0x11; 32]);
        assert!(decode_word(AbiType::FixedBytes(32), &word).is_ok());
        // bytes4 requires 28 trailing zero bytes
        assert!(decode_word(AbiType::FixedBytes(4), &word).is_err());
    }

    #[test]
    fn test_tuple_length_mismatch() {
        let types = [AbiType::Uint(256), AbiType::Uint(256)];
        let err = decode_tuple(&types, &[0u8; 63]).unwrap_err();
        assert_eq!(
            err,
            AbiError::Length {
                expected: 64,
                found: 63
            }
        );
    }

    #[test]
    fn test_tuple_round_trip() {
        let values = vec![
            AbiValue::Address(Address::from([0xaa; 20])),
            AbiValue::Uint(U256::from(12345u64)),
            AbiValue::Int(I256::try_from(-887272i64).unwrap()),
            AbiValue::Bool(true),
        ];
        let data = encode_words(&values);

        let types = [
            AbiType::Address,
            AbiType::Uint(256),
            AbiType::Int(24),
            AbiType::Bool,
        ];
        let decoded = decode_tuple(&types, &data).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(AbiType::Uint(160).canonical(), "uint160");
        assert_eq!(AbiType::Int(24).canonical(), "int24");
        assert_eq!(AbiType::FixedBytes(32).canonical(), "bytes32");
        assert_eq!(AbiType::Address.canonical(), "address");
    }
}
