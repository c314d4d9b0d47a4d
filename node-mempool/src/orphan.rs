//! The orphan-transaction buffer: transactions relayed before the output
//! they spend has arrived, held as raw wire bytes (not parsed) so that
//! fields from a newer transaction version survive the round-trip once
//! they're retried.

use std::collections::HashMap;

use node_chain::transaction::Hash as TxHash;

/// Transactions buffered because one of their inputs spends an outpoint
/// this node hasn't seen a transaction for yet.
#[derive(Debug, Default)]
pub struct OrphanPool {
    by_hash: HashMap<TxHash, Vec<u8>>,
    by_missing_prev: HashMap<TxHash, Vec<TxHash>>,
}

impl OrphanPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Buffers `raw`, the wire bytes of the transaction hashing to `hash`,
    /// keyed on `missing_prev`, the hash of the transaction it's waiting on.
    pub fn insert(&mut self, hash: TxHash, missing_prev: TxHash, raw: Vec<u8>) {
        self.by_hash.insert(hash, raw);
        self.by_missing_prev
            .entry(missing_prev)
            .or_default()
            .push(hash);
    }

    /// Removes and returns the raw bytes of every orphan that was waiting
    /// on `hash`, for the caller to retry through `AcceptToMemoryPool`.
    pub fn take_waiting_on(&mut self, hash: &TxHash) -> Vec<Vec<u8>> {
        self.by_missing_prev
            .remove(hash)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|orphan_hash| self.by_hash.remove(&orphan_hash))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orphan_is_retried_once_its_parent_arrives() {
        node_test::init();
        let mut pool = OrphanPool::new();
        let missing_prev = TxHash([1; 32]);
        let orphan_hash = TxHash([2; 32]);
        pool.insert(orphan_hash, missing_prev, vec![0xde, 0xad]);

        assert!(pool.contains(&orphan_hash));
        assert_eq!(pool.take_waiting_on(&missing_prev), vec![vec![0xde, 0xad]]);
        assert!(!pool.contains(&orphan_hash));
    }
}
