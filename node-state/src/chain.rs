//! The non-finalized in-memory block tree: candidate blocks chained from the
//! finalized (`sled`-backed) tip that haven't accumulated enough
//! confirmations to be written to disk yet.
//!
//! Best-chain selection is by height, not cumulative work: this design's
//! retarget rule (spec.md §4.3.1) doesn't give difficulty the additive
//! "chainwork" property upstream Bitcoin relies on, so the deepest chain is
//! the only total order available.

use std::collections::HashMap;
use std::sync::Arc;

use node_chain::{
    block::{self, Block, Height},
    transaction,
    transparent::{Input, OutPoint, Output},
};
use node_consensus::{PreviousOutput, PreviousOutputLookup};

/// A block held in the non-finalized tree, with its height and parent
/// cached so walking the tree doesn't require re-deriving them.
#[derive(Debug, Clone)]
struct BlockNode {
    block: Arc<Block>,
    height: Height,
    parent: block::Hash,
}

/// An output created, but not yet finalized, by a block in the
/// non-finalized tree.
#[derive(Debug, Clone)]
struct PendingOutput {
    output: Output,
    height: Height,
    from_coinbase: bool,
    /// The block that created this output. A lookup "as of" some tip only
    /// sees this output once that block is one of the tip's ancestors.
    created_by: block::Hash,
}

/// Records that an outpoint was claimed by a transaction in a particular
/// block, so a lookup "as of" some other tip can tell whether that spend is
/// actually on the chain it cares about.
#[derive(Debug, Clone, Copy)]
struct PendingSpend {
    spender: transaction::Hash,
    spent_by: block::Hash,
}

/// The result of attempting to extend the tree with a new block.
#[derive(Debug, PartialEq, Eq)]
pub enum ExtendResult {
    /// The block was added to the tree.
    Extended { is_best_tip: bool },
    /// The block's parent isn't known to this tree; it's been buffered
    /// until its parent arrives.
    Orphan,
}

/// The in-memory block tree sitting on top of the finalized state.
#[derive(Debug, Default)]
pub struct NonFinalizedState {
    by_hash: HashMap<block::Hash, BlockNode>,
    /// The hash of the deepest block on the current best chain, if any.
    best_tip: Option<block::Hash>,
    /// Blocks buffered because their parent hasn't arrived yet, indexed by
    /// the parent hash they're waiting on.
    orphans_by_parent: HashMap<block::Hash, Vec<Arc<Block>>>,
    /// Outputs created by blocks in this tree, overlaying the finalized
    /// UTXO set for `ConnectInputs` lookups.
    utxos: HashMap<OutPoint, PendingOutput>,
    /// Outpoints claimed by a transaction in some block in this tree,
    /// whether the outpoint itself was created here or in the finalized
    /// chain beneath it.
    spends: HashMap<OutPoint, PendingSpend>,
}

impl NonFinalizedState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the height and hash of the current best tip, if this tree
    /// holds any blocks.
    pub fn best_tip(&self) -> Option<(Height, block::Hash)> {
        self.best_tip
            .map(|hash| (self.by_hash[&hash].height, hash))
    }

    pub fn get(&self, hash: &block::Hash) -> Option<&Arc<Block>> {
        self.by_hash.get(hash).map(|node| &node.block)
    }

    pub fn height(&self, hash: &block::Hash) -> Option<Height> {
        self.by_hash.get(hash).map(|node| node.height)
    }

    /// Returns up to `count` ancestor timestamps of the chain ending at
    /// `tip`, most recent first, for `GetMedianTimePast`.
    pub fn recent_times(
        &self,
        tip: block::Hash,
        count: usize,
    ) -> Vec<chrono::DateTime<chrono::Utc>> {
        let mut times = Vec::with_capacity(count);
        let mut current = Some(tip);

        while times.len() < count {
            let node = match current.and_then(|hash| self.by_hash.get(&hash)) {
                Some(node) => node,
                None => break,
            };
            times.push(node.block.header.time);
            if node.height == Height::MIN {
                break;
            }
            current = Some(node.parent);
        }

        times
    }

    /// Adds `block` to the tree. `finalized_tip` is the current finalized
    /// state's tip, used to recognize a block that extends straight off of
    /// it. If the block's parent isn't the finalized tip or a block already
    /// in this tree, it's buffered as an orphan instead.
    ///
    /// `spends` is the set of outpoints `block`'s transactions claimed,
    /// already validated by `ConnectInputs` against this same branch;
    /// callers run `CheckBlock`/`AcceptBlock`/`ConnectInputs` first and only
    /// call this once a block is known-good. Spends are recorded scoped to
    /// `block`'s own hash, so they're only visible to lookups against a tip
    /// that descends from it.
    pub fn extend(
        &mut self,
        block: Arc<Block>,
        finalized_tip: (Height, block::Hash),
        spends: Vec<(OutPoint, transaction::Hash)>,
    ) -> ExtendResult {
        let hash = block.hash();
        let parent_hash = block.header.previous_block_hash;

        let parent_height = if parent_hash == finalized_tip.1 {
            Some(finalized_tip.0)
        } else {
            self.by_hash.get(&parent_hash).map(|node| node.height)
        };

        let height = match parent_height {
            Some(height) => Height(height.0 + 1),
            None => {
                self.orphans_by_parent
                    .entry(parent_hash)
                    .or_default()
                    .push(block);
                return ExtendResult::Orphan;
            }
        };

        self.commit_utxos(&block, height, hash);
        self.record_spends(hash, spends);
        self.by_hash.insert(
            hash,
            BlockNode {
                block,
                height,
                parent: parent_hash,
            },
        );

        let is_best_tip = match self.best_tip() {
            Some((best_height, _)) => height > best_height,
            None => true,
        };
        if is_best_tip {
            self.best_tip = Some(hash);
        }

        ExtendResult::Extended { is_best_tip }
    }

    /// Returns any blocks that were buffered waiting on `hash` as their
    /// parent, for the caller to retry now that it's arrived.
    pub fn take_orphans(&mut self, hash: &block::Hash) -> Vec<Arc<Block>> {
        self.orphans_by_parent.remove(hash).unwrap_or_default()
    }

    /// Drops `hash` from the tree once it's been migrated to the finalized
    /// state. Its outputs leave the overlay too -- they're looked up via the
    /// finalized UTXO set from here on -- and so do the spends it recorded,
    /// since `FinalizedState::commit_finalized_direct` removes the same
    /// outpoints from disk as it migrates the block.
    pub fn prune(&mut self, hash: &block::Hash) {
        let node = match self.by_hash.remove(hash) {
            Some(node) => node,
            None => return,
        };
        for transaction in node.block.transactions.iter() {
            let transaction_hash = transaction.hash();
            for index in 0..transaction.outputs.len() {
                self.utxos.remove(&OutPoint {
                    hash: transaction_hash,
                    index: index as u32,
                });
            }
            for input in transaction.inputs.iter() {
                if let Input::PrevOut { outpoint, .. } = input {
                    self.spends.remove(outpoint);
                }
            }
        }
    }

    fn commit_utxos(&mut self, block: &Block, height: Height, created_by: block::Hash) {
        let coinbase_hash = block.transactions.first().map(|tx| tx.hash());

        for transaction in block.transactions.iter() {
            let transaction_hash = transaction.hash();
            for (index, output) in transaction.outputs.iter().enumerate() {
                self.utxos.insert(
                    OutPoint {
                        hash: transaction_hash,
                        index: index as u32,
                    },
                    PendingOutput {
                        output: output.clone(),
                        height,
                        from_coinbase: Some(transaction_hash) == coinbase_hash,
                        created_by,
                    },
                );
            }
        }
    }

    fn record_spends(&mut self, spent_by: block::Hash, spends: Vec<(OutPoint, transaction::Hash)>) {
        for (outpoint, spender) in spends {
            self.spends.insert(outpoint, PendingSpend { spender, spent_by });
        }
    }

    /// Walks back from `descendant` through recorded parents until it
    /// reaches `ancestor` (true, including `descendant == ancestor`) or runs
    /// off the tree without finding it (false). `ancestor` may be a hash
    /// this tree has never held -- the finalized tip below it, say -- since
    /// the equality check happens before the lookup.
    fn is_ancestor(&self, descendant: block::Hash, ancestor: block::Hash) -> bool {
        let mut hash = descendant;
        loop {
            if hash == ancestor {
                return true;
            }
            match self.by_hash.get(&hash) {
                Some(node) => hash = node.parent,
                None => return false,
            }
        }
    }

    /// Returns whether `outpoint` has been claimed by a block that is `at`
    /// or one of its ancestors, regardless of which branch created the
    /// output it refers to. Used for outpoints whose creating output lives
    /// in the finalized state, which this tree has no `PendingOutput` for.
    pub fn is_spent_at(&self, at: block::Hash, outpoint: &OutPoint) -> bool {
        self.spends
            .get(outpoint)
            .map(|spend| self.is_ancestor(at, spend.spent_by))
            .unwrap_or(false)
    }

    /// Looks up `outpoint` as seen from `at`: an output only exists if the
    /// block that created it is `at` or one of its ancestors, and it only
    /// counts as spent if the block that claimed it is too. This is what
    /// keeps a losing side branch's coins from being spendable while a
    /// different branch holds the best tip.
    pub fn find_at(&self, at: block::Hash, outpoint: &OutPoint) -> Option<PreviousOutput> {
        let pending = self.utxos.get(outpoint)?;
        if !self.is_ancestor(at, pending.created_by) {
            return None;
        }

        Some(PreviousOutput {
            output: pending.output.clone(),
            is_coinbase: pending.from_coinbase,
            height: pending.height,
            spent: self.is_spent_at(at, outpoint),
        })
    }

    /// Disconnects blocks from the best tip down to (but not including)
    /// `fork_point`, returning their blocks in reconnection order (the one
    /// nearest the fork point first) so a reorg can resurrect their
    /// transactions into the mempool on a best-effort basis.
    pub fn disconnect_to(&mut self, fork_point: block::Hash) -> Vec<Arc<Block>> {
        let mut disconnected = Vec::new();
        let mut current = self.best_tip;

        while let Some(hash) = current {
            if hash == fork_point {
                break;
            }
            let node = match self.by_hash.remove(&hash) {
                Some(node) => node,
                None => break,
            };
            for transaction in node.block.transactions.iter() {
                let transaction_hash = transaction.hash();
                for index in 0..transaction.outputs.len() {
                    self.utxos.remove(&OutPoint {
                        hash: transaction_hash,
                        index: index as u32,
                    });
                }
                for input in transaction.inputs.iter() {
                    if let Input::PrevOut { outpoint, .. } = input {
                        self.spends.remove(outpoint);
                    }
                }
            }
            current = Some(node.parent);
            disconnected.push(node.block);
        }

        self.best_tip = Some(fork_point);
        disconnected.reverse();
        disconnected
    }
}

/// The trait-level `find`/`mark_spent` scope lookups to the current best
/// tip, matching what every external caller (mempool, miner) means by
/// "the chain". Validating a specific incoming block -- which may extend a
/// side branch that isn't the best tip -- goes through [`Self::find_at`]
/// and [`Self::record_spends`] instead, scoped to that block's own parent.
impl PreviousOutputLookup for NonFinalizedState {
    fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
        let tip = self.best_tip?;
        self.find_at(tip, outpoint)
    }

    fn mark_spent(&mut self, outpoint: &OutPoint, spender: transaction::Hash) {
        if let Some(tip) = self.best_tip {
            self.record_spends(tip, vec![(*outpoint, spender)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::{
        block::{Header, Height},
        transaction::{LockTime, Transaction},
        transparent::{CoinbaseData, Input, Script},
        work::difficulty::CompactDifficulty,
        amount::{Amount, NonNegative},
    };

    fn coinbase_block(previous_block_hash: block::Hash, nonce: u32) -> Arc<Block> {
        let coinbase = Transaction::new(
            1,
            vec![Input::Coinbase {
                height: None,
                data: CoinbaseData(vec![nonce as u8, (nonce >> 8) as u8]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(50_0000_0000).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        );

        let transactions = vec![Arc::new(coinbase)];
        let merkle_root = block::merkle::Root::from_transactions(&transactions);

        Arc::new(Block {
            header: Header::new(
                1,
                previous_block_hash,
                merkle_root,
                chrono::Utc::now(),
                CompactDifficulty(0x1d00ffff),
                nonce,
            ),
            transactions,
        })
    }

    #[test]
    fn first_block_extends_the_finalized_tip() {
        node_test::init();
        let mut tree = NonFinalizedState::new();
        let genesis = block::Hash::from_bytes_exact([0; 32]);
        let block = coinbase_block(genesis, 1);

        let result = tree.extend(block.clone(), (Height(0), genesis), Vec::new());
        assert_eq!(result, ExtendResult::Extended { is_best_tip: true });
        assert_eq!(tree.best_tip(), Some((Height(1), block.hash())));
    }

    #[test]
    fn unknown_parent_is_buffered_as_an_orphan() {
        node_test::init();
        let mut tree = NonFinalizedState::new();
        let genesis = block::Hash::from_bytes_exact([0; 32]);
        let missing_parent = block::Hash::from_bytes_exact([1; 32]);
        let block = coinbase_block(missing_parent, 1);

        let result = tree.extend(block.clone(), (Height(0), genesis), Vec::new());
        assert_eq!(result, ExtendResult::Orphan);
        assert_eq!(tree.take_orphans(&missing_parent), vec![block]);
    }

    #[test]
    fn disconnect_removes_blocks_and_their_utxos() {
        node_test::init();
        let mut tree = NonFinalizedState::new();
        let genesis = block::Hash::from_bytes_exact([0; 32]);
        let block = coinbase_block(genesis, 1);
        tree.extend(block.clone(), (Height(0), genesis), Vec::new());

        let coinbase_hash = block.transactions[0].hash();
        assert!(tree
            .find(&OutPoint {
                hash: coinbase_hash,
                index: 0
            })
            .is_some());

        tree.disconnect_to(genesis);

        assert!(tree
            .find(&OutPoint {
                hash: coinbase_hash,
                index: 0
            })
            .is_none());
        assert_eq!(tree.get(&block.hash()), None);
    }

    #[test]
    fn side_branch_utxos_are_not_visible_from_the_best_tip() {
        node_test::init();
        let mut tree = NonFinalizedState::new();
        let genesis = block::Hash::from_bytes_exact([0; 32]);

        let best = coinbase_block(genesis, 1);
        let side = coinbase_block(genesis, 2);

        assert_eq!(
            tree.extend(best.clone(), (Height(0), genesis), Vec::new()),
            ExtendResult::Extended { is_best_tip: true }
        );
        assert_eq!(
            tree.extend(side.clone(), (Height(0), genesis), Vec::new()),
            ExtendResult::Extended { is_best_tip: false }
        );
        assert_eq!(tree.best_tip(), Some((Height(1), best.hash())));

        let side_outpoint = OutPoint {
            hash: side.transactions[0].hash(),
            index: 0,
        };

        // Scoped to the current best tip, the losing branch's coinbase does
        // not exist at all -- not "exists but spent", just absent.
        assert!(tree.find(&side_outpoint).is_none());
        assert!(tree.find_at(best.hash(), &side_outpoint).is_none());

        // It's visible from the branch that actually created it.
        assert!(tree.find_at(side.hash(), &side_outpoint).is_some());
    }

    #[test]
    fn mark_spent_is_scoped_to_the_block_that_claimed_it() {
        node_test::init();
        let mut tree = NonFinalizedState::new();
        let genesis = block::Hash::from_bytes_exact([0; 32]);
        let root = coinbase_block(genesis, 1);
        tree.extend(root.clone(), (Height(0), genesis), Vec::new());

        let outpoint = OutPoint {
            hash: root.transactions[0].hash(),
            index: 0,
        };

        let best = coinbase_block(root.hash(), 1);
        let side = coinbase_block(root.hash(), 2);
        tree.extend(
            best.clone(),
            (Height(0), genesis),
            vec![(outpoint, best.transactions[0].hash())],
        );
        tree.extend(side.clone(), (Height(0), genesis), Vec::new());

        // The spend only counts against a tip descending from `best`.
        assert!(tree.find_at(best.hash(), &outpoint).unwrap().spent);
        assert!(!tree.find_at(side.hash(), &outpoint).unwrap().spent);
    }
}
