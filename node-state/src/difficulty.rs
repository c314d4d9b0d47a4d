//! Difficulty retargeting.
//!
//! Every [`INTERVAL`] blocks, the network target is recomputed from how long
//! the previous interval actually took to mine, clamped to a factor of 4
//! either way. Between retarget heights, the target a new block must meet is
//! unchanged from its parent.

use node_chain::{
    block::Height,
    work::difficulty::{CompactDifficulty, ExpandedDifficulty, POW_LIMIT},
};

/// The number of blocks between difficulty retargets.
pub const INTERVAL: u32 = 2016;

/// The intended number of seconds an `INTERVAL`-block interval should take.
pub const TARGET_TIMESPAN: i64 = 14 * 24 * 60 * 60;

/// A read-only view of past headers `next_work_required` needs: the time and
/// difficulty of the block being extended, and a way to look up an ancestor
/// by height.
pub trait AncestorTimes {
    /// Returns the timestamp (Unix seconds) of the block at `height`, if any.
    fn time_at(&self, height: Height) -> Option<i64>;
}

/// Returns the difficulty threshold a block at `height`, extending a parent
/// with `parent_time`/`parent_bits`, must satisfy.
///
/// At every multiple of [`INTERVAL`], the target is retargeted from the time
/// the previous interval took. The ancestor used to measure that time is the
/// block at `height - INTERVAL`, which is `INTERVAL - 1` blocks before the
/// parent (`height - 1`) -- not `INTERVAL` blocks before it. This off-by-one
/// is load-bearing: every retarget height since genesis was computed this
/// way, and changing it would fork the chain.
pub fn next_work_required<A: AncestorTimes>(
    ancestors: &A,
    height: Height,
    parent_time: i64,
    parent_bits: CompactDifficulty,
) -> CompactDifficulty {
    if height.0 % INTERVAL != 0 {
        return parent_bits;
    }

    let first_height = height.0.saturating_sub(INTERVAL);
    let first_time = match ancestors.time_at(Height(first_height)) {
        Some(time) => time,
        None => return parent_bits,
    };

    let actual_timespan = (parent_time - first_time)
        .max(TARGET_TIMESPAN / 4)
        .min(TARGET_TIMESPAN * 4);

    retarget(parent_bits, actual_timespan)
}

/// Computes `min(POW_LIMIT, old_target * actual_timespan / TARGET_TIMESPAN)`
/// and re-encodes it in compact form.
fn retarget(old_bits: CompactDifficulty, actual_timespan: i64) -> CompactDifficulty {
    let old_target = match old_bits.to_expanded() {
        Some(target) => target,
        None => return old_bits,
    };

    let new_target = scale_target(old_target, actual_timespan, TARGET_TIMESPAN);
    let new_target = new_target.min(POW_LIMIT);

    compact_from_expanded(new_target)
}

/// Scales a 256-bit target by `numerator / denominator`, both known to be
/// positive and small (bounded by `TARGET_TIMESPAN`'s clamp above). The
/// product can't overflow `U256`: `target` is at most [`POW_LIMIT`] (~2^224)
/// and `numerator` is at most `TARGET_TIMESPAN * 4` (~2^23), well inside 256
/// bits, but `checked_mul` guards against a malformed `target` anyway.
fn scale_target(target: ExpandedDifficulty, numerator: i64, denominator: i64) -> ExpandedDifficulty {
    use primitive_types::U256;

    let target = U256::from_big_endian(&target.to_be_bytes());
    let numerator = U256::from(numerator as u64);
    let denominator = U256::from(denominator as u64);

    let scaled = target
        .checked_mul(numerator)
        .map(|product| product / denominator)
        .unwrap_or(U256::MAX);

    let mut bytes = [0u8; 32];
    scaled.to_big_endian(&mut bytes);
    ExpandedDifficulty::from_be_bytes(bytes)
}

/// Re-encodes a 256-bit big-endian target into the compact "nBits" format.
fn compact_from_expanded(target: ExpandedDifficulty) -> CompactDifficulty {
    let bytes = target.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0);

    let first_nonzero = match first_nonzero {
        Some(index) => index,
        None => return CompactDifficulty(0),
    };

    let mut size = (32 - first_nonzero) as u32;
    let mut mantissa_bytes = [0u8; 3];

    if bytes[first_nonzero] & 0x80 != 0 {
        // A leading 1 bit would be misread as a sign bit; shift the mantissa
        // right one byte and bump the size to compensate.
        mantissa_bytes[1] = bytes[first_nonzero];
        mantissa_bytes[2] = *bytes.get(first_nonzero + 1).unwrap_or(&0);
        size += 1;
    } else {
        mantissa_bytes[0] = bytes[first_nonzero];
        mantissa_bytes[1] = *bytes.get(first_nonzero + 1).unwrap_or(&0);
        mantissa_bytes[2] = *bytes.get(first_nonzero + 2).unwrap_or(&0);
    }

    let mantissa = u32::from_be_bytes([0, mantissa_bytes[0], mantissa_bytes[1], mantissa_bytes[2]]);
    CompactDifficulty((size << 24) | mantissa)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedAncestors(i64);

    impl AncestorTimes for FixedAncestors {
        fn time_at(&self, _height: Height) -> Option<i64> {
            Some(self.0)
        }
    }

    #[test]
    fn non_retarget_height_keeps_parent_bits() {
        node_test::init();
        let bits = CompactDifficulty(0x1d00ffff);
        let ancestors = FixedAncestors(0);
        let next = next_work_required(&ancestors, Height(INTERVAL + 1), 0, bits);
        assert_eq!(next, bits);
    }

    #[test]
    fn retarget_uses_interval_minus_one_ancestor() {
        node_test::init();
        // An interval that took exactly as long as intended reproduces the
        // same target (modulo compact-encoding rounding).
        let bits = CompactDifficulty(0x1d00ffff);
        let ancestors = FixedAncestors(0);
        let next = next_work_required(&ancestors, Height(INTERVAL), TARGET_TIMESPAN, bits);
        assert_eq!(next.to_expanded(), bits.to_expanded());
    }

    #[test]
    fn faster_interval_tightens_the_target() {
        node_test::init();
        let bits = CompactDifficulty(0x1d00ffff);
        let ancestors = FixedAncestors(0);
        // The interval took a quarter of the intended time (the clamp floor).
        let next = next_work_required(&ancestors, Height(INTERVAL), TARGET_TIMESPAN / 4, bits);
        assert!(next.to_expanded().unwrap() < bits.to_expanded().unwrap());
    }

    #[test]
    fn retarget_never_loosens_past_pow_limit() {
        node_test::init();
        let bits = CompactDifficulty(0x1d00ffff);
        let ancestors = FixedAncestors(0);
        let next = next_work_required(&ancestors, Height(INTERVAL), TARGET_TIMESPAN * 8, bits);
        assert!(next.to_expanded().unwrap() <= POW_LIMIT);
    }
}
