//! Core data structures for a Bitcoin-style node: blocks, transactions,
//! transparent inputs/outputs, and their consensus-critical serialization.
#![allow(clippy::unit_arg)]

pub mod amount;
pub mod block;
pub mod cached;
pub mod compactint;
pub mod fmt;
pub mod parameters;
pub mod serialization;
pub mod transaction;
pub mod transparent;
pub mod work;

pub use serialization::{BitcoinDeserialize, BitcoinDeserializeInto, BitcoinSerialize, SerializationError};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// Chain state visible to property-test generators, so that generated
/// blocks and transactions respect height- and coinbase-position
/// invariants instead of being generated in a vacuum.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct LedgerState {
    /// The height of the block before the one being generated.
    pub tip_height: block::Height,
    /// Whether the generated transaction (or the block's first transaction)
    /// should be a coinbase transaction.
    pub is_coinbase: bool,
    /// Which network the generated data belongs to.
    pub network: parameters::Network,
}

impl Default for LedgerState {
    fn default() -> Self {
        LedgerState {
            tip_height: block::Height(0),
            is_coinbase: false,
            network: parameters::Network::Mainnet,
        }
    }
}
