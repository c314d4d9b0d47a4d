use std::io;

use chrono::{DateTime, TimeZone, Utc};

use crate::{
    block::Height,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError},
};

/// The threshold at and above which `nLockTime` is interpreted as a Unix
/// timestamp instead of a block height.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// A transaction's `nLockTime` field: either a block height or a timestamp
/// before which the transaction may not be added to a block, unless every
/// input's sequence number is the finality sentinel (`0xffffffff`).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LockTime {
    /// A block height threshold.
    Height(Height),
    /// A Unix timestamp threshold.
    Time(DateTime<Utc>),
}

impl LockTime {
    /// The raw encoded value of this `LockTime`, as it appears on the wire.
    pub fn to_u32(self) -> u32 {
        match self {
            LockTime::Height(h) => h.0,
            LockTime::Time(t) => t.timestamp() as u32,
        }
    }

    /// Returns true if a transaction with this locktime is final given the
    /// current chain `height` and adjusted network `time`, ignoring the
    /// per-input sequence-number override (callers check that separately).
    pub fn is_satisfied_by(self, height: Height, time: DateTime<Utc>) -> bool {
        match self {
            LockTime::Height(threshold) => height.0 >= threshold.0,
            LockTime::Time(threshold) => time >= threshold,
        }
    }
}

impl BitcoinSerialize for LockTime {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.to_u32().bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for LockTime {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let raw = u32::bitcoin_deserialize(reader)?;
        if raw < LOCKTIME_THRESHOLD {
            Ok(LockTime::Height(Height(raw)))
        } else {
            Ok(LockTime::Time(Utc.timestamp(raw as i64, 0)))
        }
    }
}
