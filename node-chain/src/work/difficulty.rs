//! The compact ("nBits") difficulty encoding and the expanded 256-bit target
//! it represents.

use std::{cmp::Ordering, io};

use crate::{
    block::Hash,
    serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError},
};

#[cfg(any(test, feature = "proptest-impl"))]
use proptest_derive::Arbitrary;

/// The largest target any block header's proof of work may have: `(2^256 - 1) >> 32`.
pub const POW_LIMIT: ExpandedDifficulty = ExpandedDifficulty([
    0xff, 0xff, 0xff, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0,
]);

/// An encoded proof-of-work target, in the compact "nBits" format used by
/// the Bitcoin header and its difficulty-retarget arithmetic.
///
/// The lowest 3 bytes are the mantissa, the top byte is an exponent (the
/// number of bytes of the target, counted from the most significant).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(any(test, feature = "proptest-impl"), derive(Arbitrary))]
pub struct CompactDifficulty(pub u32);

/// An expanded 256-bit difficulty target, stored big-endian.
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ExpandedDifficulty([u8; 32]);

impl std::fmt::Debug for ExpandedDifficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ExpandedDifficulty")
            .field(&hex::encode(&self.0))
            .finish()
    }
}

impl ExpandedDifficulty {
    /// Returns this target's big-endian byte representation.
    pub fn to_be_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Builds a target directly from its big-endian byte representation.
    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        ExpandedDifficulty(bytes)
    }
}

impl PartialOrd for ExpandedDifficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for ExpandedDifficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl CompactDifficulty {
    /// Expands this compact target to its 256-bit (big-endian) representation.
    ///
    /// Returns `None` if the encoded value would overflow the 256-bit target,
    /// which can happen with a malformed or adversarial `nBits` field.
    pub fn to_expanded(self) -> Option<ExpandedDifficulty> {
        let bytes = self.0.to_be_bytes();
        let exponent = bytes[0] as i32;
        let mantissa = u32::from_be_bytes([0, bytes[1], bytes[2], bytes[3]]);

        if mantissa == 0 {
            return Some(ExpandedDifficulty([0; 32]));
        }

        let mut out = [0u8; 32];
        let shift = exponent - 3;
        if shift >= 0 {
            let shift = shift as usize;
            if shift > 29 {
                return None;
            }
            let start = 32 - shift - 3;
            out[start..start + 3].copy_from_slice(&bytes[1..4]);
        } else {
            let right_shift = (-shift) as u32 * 8;
            let shifted = (mantissa >> right_shift).to_be_bytes();
            out[29..32].copy_from_slice(&shifted[1..]);
        }
        Some(ExpandedDifficulty(out))
    }

    /// Returns true if `hash`, interpreted as a 256-bit big-endian integer,
    /// is less than or equal to this target.
    pub fn is_satisfied_by(self, hash: &Hash) -> bool {
        let target = match self.to_expanded() {
            Some(target) => target,
            None => return false,
        };
        let mut be_hash = hash.0;
        be_hash.reverse();
        ExpandedDifficulty(be_hash) <= target
    }
}

impl BitcoinSerialize for CompactDifficulty {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for CompactDifficulty {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(CompactDifficulty(u32::bitcoin_deserialize(reader)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_limit_expands() {
        node_test::init();
        // 0x1d00ffff is the well-known mainnet genesis target encoding.
        let target = CompactDifficulty(0x1d00ffff).to_expanded().unwrap();
        assert!(target <= POW_LIMIT);
    }

    #[test]
    fn tighter_target_is_smaller() {
        node_test::init();
        let loose = CompactDifficulty(0x1d00ffff).to_expanded().unwrap();
        let tight = CompactDifficulty(0x1c7fff00).to_expanded().unwrap();
        assert!(tight < loose);
    }
}
