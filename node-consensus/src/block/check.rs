//! Context-free block checks: everything `CheckBlock` can decide without
//! consulting the block index.

use chrono::{DateTime, Utc};

use node_chain::{
    amount::{Amount, NonNegative},
    block::{merkle, Block, Hash, Header, Height},
    compactint::CompactInt,
    transaction,
    work::difficulty::POW_LIMIT,
};

use crate::block::subsidy;
use crate::error::*;

/// The maximum serialized size of a block.
pub const MAX_BLOCK_SIZE: usize = 32 * 1024 * 1024;

/// Returns `Ok(())` if there is exactly one coinbase transaction in `block`,
/// and it is the first transaction.
pub fn coinbase_is_first(block: &Block) -> Result<(), BlockError> {
    let first = block.transactions.get(0).ok_or(BlockError::NoTransactions)?;
    let mut rest = block.transactions.iter().skip(1);

    if !first.is_coinbase() {
        return Err(TransactionError::CoinbasePosition)?;
    }
    if rest.any(|tx| tx.contains_coinbase_input()) {
        return Err(TransactionError::CoinbaseInputFound)?;
    }

    Ok(())
}

/// Returns `Ok(())` if `block`'s serialized size does not exceed
/// [`MAX_BLOCK_SIZE`].
pub fn size_is_valid(block: &Block) -> Result<(), BlockError> {
    let tx_count = block.transactions.len();
    let size = Header::len()
        + CompactInt::size(tx_count)
        + block.transactions.iter().map(|tx| tx.len()).sum::<usize>();

    if size > MAX_BLOCK_SIZE {
        return Err(BlockError::TooLarge);
    }
    Ok(())
}

/// Returns `Ok(())` if `hash` satisfies both the network's PoW limit and
/// `header`'s own difficulty threshold.
pub fn difficulty_is_valid(header: &Header, height: &Height, hash: &Hash) -> Result<(), BlockError> {
    let difficulty_threshold = header
        .difficulty_threshold
        .to_expanded()
        .ok_or(BlockError::InvalidDifficulty(*height, *hash))?;

    // This comparison is a u256 integer comparison: greater values represent
    // *less* work.
    if difficulty_threshold > POW_LIMIT {
        return Err(BlockError::TargetDifficultyLimit(
            *height,
            *hash,
            difficulty_threshold,
            POW_LIMIT,
        ));
    }

    if !header.difficulty_threshold.is_satisfied_by(hash) {
        return Err(BlockError::DifficultyFilter(
            *height,
            *hash,
            difficulty_threshold,
        ));
    }

    Ok(())
}

/// Returns `Ok(())` if the block subsidy and miner fees in `block` are valid
/// for `height`: the coinbase transaction's total output value must not
/// exceed `BlockValue(fees, height)`.
pub fn subsidy_is_valid(
    block: &Block,
    height: Height,
    fees: Amount<NonNegative>,
) -> Result<(), BlockError> {
    let coinbase = block
        .transactions
        .get(0)
        .ok_or(SubsidyError::NoCoinbase)?;

    let max_value =
        subsidy::general::block_value(fees, height).map_err(|_| SubsidyError::NoSubsidyForHeight)?;

    let coinbase_total: i64 = coinbase.outputs.iter().map(|o| o.value.to_i64()).sum();

    if coinbase_total > max_value.to_i64() {
        return Err(BlockError::BadCoinbaseAmount);
    }

    Ok(())
}

/// Returns `Ok(())` if `header.time` is no more than two hours in the future
/// according to the node's local clock (`now`).
///
/// This is a non-deterministic rule: clocks vary between nodes, and a block
/// rejected by this rule now may be accepted later.
pub fn time_is_valid_at(
    header: &Header,
    now: DateTime<Utc>,
    height: &Height,
    hash: &Hash,
) -> Result<(), node_chain::block::BlockTimeError> {
    header.time_is_valid_at(now, height, hash)
}

/// Returns `Ok(())` if `block`'s Merkle root matches its transactions, and
/// those transactions contain no duplicates.
pub fn merkle_root_validity(block: &Block) -> Result<(), BlockError> {
    let computed = merkle::Root::from_transactions(&block.transactions);

    if block.header.merkle_root != computed {
        return Err(BlockError::BadMerkleRoot {
            actual: computed,
            expected: block.header.merkle_root,
        });
    }

    // Bitcoin's transaction Merkle trees are malleable: a block with
    // duplicate transactions can share a root with a block without them.
    // Duplicate transactions imply a double-spend, so reject them directly
    // rather than relying on the unrelated malleability of the root.
    use std::collections::HashSet;
    let hashes: Vec<transaction::Hash> = block.transactions.iter().map(|tx| tx.hash()).collect();
    if hashes.len() != hashes.iter().collect::<HashSet<_>>().len() {
        return Err(BlockError::DuplicateTransaction);
    }

    Ok(())
}
