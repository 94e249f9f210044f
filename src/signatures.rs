//! Event signatures for the pool's five state-changing events.
//!
//! The first entry in a log's topics array is the keccak hash of the event's
//! canonical signature string, so the precomputed hashes here are what
//! classifies raw logs. Indexed arguments live in the remaining topics;
//! everything else is ABI-encoded into the log payload.

use alloy_primitives::{keccak256, B256};

use crate::abi::AbiType;
use crate::types::EventKind;

/// One argument of an event declaration.
#[derive(Debug, Clone, Copy)]
pub struct EventArg {
    pub name: &'static str,
    pub ty: AbiType,
    pub indexed: bool,
}

/// A full event declaration with its precomputed topic0 hash.
#[derive(Debug, Clone)]
pub struct EventSignature {
    pub kind: EventKind,
    pub name: &'static str,
    pub args: Vec<EventArg>,
    topic0: B256,
}

impl EventSignature {
    /// Build a signature and hash its canonical string.
    ///
    /// Panics if more than 3 arguments are indexed; the log format has no
    /// room for a fourth indexed topic.
    pub fn new(kind: EventKind, name: &'static str, args: Vec<EventArg>) -> Self {
        let indexed = args.iter().filter(|arg| arg.indexed).count();
        assert!(indexed <= 3, "events index at most 3 arguments");

        let mut sig = Self {
            kind,
            name,
            args,
            topic0: B256::ZERO,
        };
        sig.topic0 = keccak256(sig.canonical_signature().as_bytes());
        sig
    }

    /// `Name(type,type,...)` over all arguments in declaration order,
    /// indexed or not.
    pub fn canonical_signature(&self) -> String {
        let types: Vec<String> = self.args.iter().map(|arg| arg.ty.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn topic0(&self) -> B256 {
        self.topic0
    }

    pub fn indexed(&self) -> impl Iterator<Item = &EventArg> {
        self.args.iter().filter(|arg| arg.indexed)
    }

    pub fn non_indexed(&self) -> impl Iterator<Item = &EventArg> {
        self.args.iter().filter(|arg| !arg.indexed)
    }

    pub fn indexed_count(&self) -> usize {
        self.indexed().count()
    }
}

/// The set of event signatures a decoder recognizes.
#[derive(Debug, Clone)]
pub struct SignatureTable {
    signatures: Vec<EventSignature>,
}

impl SignatureTable {
    /// The standard table: mint, burn, swap, flash and collect as the pool
    /// contract declares them.
    pub fn pool_events() -> Self {
        let arg = |name, ty, indexed| EventArg { name, ty, indexed };
        let addr = AbiType::Address;
        let int24 = AbiType::Int(24);

        Self {
            signatures: vec![
                EventSignature::new(
                    EventKind::Mint,
                    "Mint",
                    vec![
                        arg("sender", addr, false),
                        arg("owner", addr, true),
                        arg("tickLower", int24, true),
                        arg("tickUpper", int24, true),
                        arg("amount", AbiType::Uint(128), false),
                        arg("amount0", AbiType::Uint(256), false),
                        arg("amount1", AbiType::Uint(256), false),
                    ],
                ),
                EventSignature::new(
                    EventKind::Burn,
                    "Burn",
                    vec![
                        arg("owner", addr, true),
                        arg("tickLower", int24, true),
                        arg("tickUpper", int24, true),
                        arg("amount", AbiType::Uint(128), false),
                        arg("amount0", AbiType::Uint(256), false),
                        arg("amount1", AbiType::Uint(256), false),
                    ],
                ),
                EventSignature::new(
                    EventKind::Swap,
                    "Swap",
                    vec![
                        arg("sender", addr, true),
                        arg("recipient", addr, true),
                        arg("amount0", AbiType::Int(256), false),
                        arg("amount1", AbiType::Int(256), false),
                        arg("sqrtPriceX96", AbiType::Uint(160), false),
                        arg("liquidity", AbiType::Uint(128), false),
                        arg("tick", int24, false),
                    ],
                ),
                EventSignature::new(
                    EventKind::Flash,
                    "Flash",
                    vec![
                        arg("sender", addr, true),
                        arg("recipient", addr, true),
                        arg("amount0", AbiType::Uint(256), false),
                        arg("amount1", AbiType::Uint(256), false),
                        arg("paid0", AbiType::Uint(256), false),
                        arg("paid1", AbiType::Uint(256), false),
                    ],
                ),
                EventSignature::new(
                    EventKind::Collect,
                    "Collect",
                    vec![
                        arg("owner", addr, true),
                        arg("recipient", addr, false),
                        arg("tickLower", int24, true),
                        arg("tickUpper", int24, true),
                        arg("amount0", AbiType::Uint(128), false),
                        arg("amount1", AbiType::Uint(128), false),
                    ],
                ),
            ],
        }
    }

    pub fn lookup(&self, topic0: B256) -> Option<&EventSignature> {
        self.signatures.iter().find(|sig| sig.topic0 == topic0)
    }

    pub fn for_kind(&self, kind: EventKind) -> Option<&EventSignature> {
        self.signatures.iter().find(|sig| sig.kind == kind)
    }

    pub fn signatures(&self) -> &[EventSignature] {
        &self.signatures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topic(hex_str: &str) -> B256 {
        B256::from_slice(&hex::decode(hex_str).expect("valid hex"))
    }

    #[test]
    fn test_canonical_signatures() {
        let table = SignatureTable::pool_events();

        let swap = table.for_kind(EventKind::Swap).unwrap();
        assert_eq!(
            swap.canonical_signature(),
            "Swap(address,address,int256,int256,uint160,uint128,int24)"
        );

        let mint = table.for_kind(EventKind::Mint).unwrap();
        assert_eq!(
            mint.canonical_signature(),
            "Mint(address,address,int24,int24,uint128,uint256,uint256)"
        );
    }

    #[test]
    fn test_known_topic0_hashes() {
        // On-chain topic0 values for the mainnet pool contract
        let table = SignatureTable::pool_events();

        assert_eq!(
            table.for_kind(EventKind::Swap).unwrap().topic0(),
            topic("c42079f94a6350d7e6235f29174924f928cc2ac818eb64fed8004e115fbcca67"),
        );
        assert_eq!(
            table.for_kind(EventKind::Mint).unwrap().topic0(),
            topic("7a53080ba414158be7ec69b987b5fb7d07dee101fe85488f0853ae16239d0bde"),
        );
        assert_eq!(
            table.for_kind(EventKind::Burn).unwrap().topic0(),
            topic("0c396cd989a39f4459b5fa1aed6a9a8dcdbc45908acfd67e028cd568da98982c"),
        );
    }

    #[test]
    fn test_lookup_by_topic0() {
        let table = SignatureTable::pool_events();
        for kind in EventKind::ALL {
            let sig = table.for_kind(kind).unwrap();
            let found = table.lookup(sig.topic0()).unwrap();
            assert_eq!(found.kind, kind);
        }

        assert!(table.lookup(B256::ZERO).is_none());
    }

    #[test]
    fn test_indexed_argument_counts() {
        let table = SignatureTable::pool_events();
        let counts: Vec<usize> = EventKind::ALL
            .iter()
            .map(|kind| table.for_kind(*kind).unwrap().indexed_count())
            .collect();
        // mint, burn, swap, flash, collect
        assert_eq!(counts, vec![3, 3, 2, 2, 3]);
    }

    #[test]
    fn test_topic0_hashes_are_distinct() {
        let table = SignatureTable::pool_events();
        for a in table.signatures() {
            for b in table.signatures() {
                if a.kind != b.kind {
                    assert_ne!(a.topic0(), b.topic0());
                }
            }
        }
    }
}
