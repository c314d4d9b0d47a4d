//! Hard-coded wire-format byte vectors for small deserialization fixtures.
//!
//! These aren't pulled from a live chain; they're minimal, hand-built
//! encodings that round-trip through `node_chain`'s `BitcoinDeserialize`
//! impls, used where a test needs *some* valid header/transaction/input/
//! output rather than a randomly generated one.

/// An 80-byte block header: version 1, zeroed previous-block-hash and
/// merkle root, zero timestamp, the well-known mainnet genesis difficulty
/// bits (`0x1d00ffff`), and a zero nonce.
pub const DUMMY_HEADER: [u8; 80] = [
    // version: 1 (LE)
    0x01, 0x00, 0x00, 0x00,
    // previous_block_hash: 32 zero bytes
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // merkle_root: 32 zero bytes
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    // time: 0 (LE)
    0x00, 0x00, 0x00, 0x00,
    // difficulty_threshold: 0x1d00ffff (LE)
    0xff, 0xff, 0x00, 0x1d,
    // nonce: 0 (LE)
    0x00, 0x00, 0x00, 0x00,
];

/// A single-input, single-output transaction: version 1, one `PrevOut`
/// input spending a non-null outpoint with an empty unlock script, one
/// output paying 0.01 coins to an empty lock script, and a zero locktime.
pub const DUMMY_TX1: [u8; 60] = [
    // version: 1 (LE)
    0x01, 0x00, 0x00, 0x00,
    // input count: 1
    0x01,
    // DUMMY_INPUT1
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x00, 0x00, 0x00, 0x00, // outpoint index: 0
    0x00, // unlock_script len: 0
    0xff, 0xff, 0xff, 0xff, // sequence: 0xffffffff
    // output count: 1
    0x01,
    // DUMMY_OUTPUT1
    0x00, 0xe1, 0xf5, 0x05, 0x00, 0x00, 0x00, 0x00, // value: 100_000_000 (LE)
    0x00, // lock_script len: 0
    // locktime: 0 (LE)
    0x00, 0x00, 0x00, 0x00,
];

/// A `PrevOut` input spending a non-null outpoint (32 bytes of `0x11`,
/// index 0) with an empty unlock script and the finality sequence number.
pub const DUMMY_INPUT1: [u8; 41] = [
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11, 0x11,
    0x00, 0x00, 0x00, 0x00, // outpoint index: 0
    0x00, // unlock_script len: 0
    0xff, 0xff, 0xff, 0xff, // sequence: 0xffffffff
];

/// An output paying one coin (`100_000_000` base units) to an empty lock
/// script.
pub const DUMMY_OUTPUT1: [u8; 9] = [
    0x00, 0xe1, 0xf5, 0x05, 0x00, 0x00, 0x00, 0x00, // value: 100_000_000 (LE)
    0x00, // lock_script len: 0
];
