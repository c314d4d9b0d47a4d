//! Constants for the block subsidy schedule.

use node_chain::{amount::COIN, block::Height};

/// The largest block subsidy, used before the first halving: 50 coins.
pub const MAX_BLOCK_SUBSIDY: u64 = (50 * COIN) as u64;

/// The subsidy halves every 210,000 blocks.
pub const HALVING_INTERVAL: Height = Height(210_000);
