use std::io;

use serde::{Deserialize, Serialize};

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The height of a block in the chain, counted from the genesis block at height 0.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct Height(pub u32);

impl Height {
    /// The minimum possible height: the genesis block.
    pub const MIN: Height = Height(0);

    /// The maximum height representable in a coinbase height push.
    pub const MAX: Height = Height(499_999_999);

    /// The number of confirmations a coinbase output must accumulate before
    /// it becomes spendable.
    pub const COINBASE_MATURITY: u32 = 100;
}

impl BitcoinSerialize for Height {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Height {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Height(u32::bitcoin_deserialize(reader)?))
    }
}
