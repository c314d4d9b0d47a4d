//! The primary implementation of the state service's finalized tail, built
//! upon `sled`.

use std::{collections::HashMap, convert::TryInto, sync::Arc};

use tracing::trace;

use node_chain::{
    block::{self, Block},
    parameters::{Network, GENESIS_PREVIOUS_BLOCK_HASH},
    transparent,
};

use crate::sled_format::{FromSled, SledDeserialize, SledSerialize, SledTreeExt};
use crate::{BoxError, Config, HashOrHeight, QueuedBlock, Utxo};

/// Where a committed transaction lives: the height of the block that
/// contains it, and whether it was that block's coinbase. Looked up by
/// `utxo` to fill in a `Utxo`'s chain context without scanning blocks.
#[derive(Copy, Clone, Debug)]
struct TxLocation {
    height: block::Height,
    is_coinbase: bool,
}

impl SledSerialize for TxLocation {
    fn as_sled_bytes(&self) -> Result<Vec<u8>, BoxError> {
        let mut bytes = self.height.0.to_be_bytes().to_vec();
        bytes.push(self.is_coinbase as u8);
        Ok(bytes)
    }
}

impl SledDeserialize for TxLocation {
    fn from_sled_bytes(bytes: &[u8]) -> Result<Self, BoxError> {
        let height_bytes: [u8; 4] = bytes
            .get(..4)
            .ok_or("sled tx location was too short")?
            .try_into()?;
        let is_coinbase = *bytes.get(4).ok_or("sled tx location was too short")? != 0;

        Ok(TxLocation {
            height: block::Height(u32::from_be_bytes(height_bytes)),
            is_coinbase,
        })
    }
}

/// The finalized part of the chain state, stored in sled.
///
/// This structure has two categories of methods:
///
/// - *synchronous* methods that perform writes to the sled state;
/// - *asynchronous* methods that perform reads.
///
/// For more on this distinction, see RFC5. The synchronous methods are
/// implemented as ordinary methods on the [`FinalizedState`]. The asynchronous
/// methods are not implemented using `async fn`, but using normal methods that
/// return `impl Future<Output = ...>`. This allows them to move data (e.g.,
/// clones of handles for [`sled::Tree`]s) into the futures they return.
///
/// This means that the returned futures have a `'static` lifetime and don't
/// borrow any resources from the [`FinalizedState`], and the actual database work is
/// performed asynchronously when the returned future is polled, not while it is
/// created.  This is analogous to the way [`tower::Service::call`] works.
pub struct FinalizedState {
    /// Queued blocks that arrived out of order, indexed by their parent block hash.
    queued_by_prev_hash: HashMap<block::Hash, QueuedBlock>,

    hash_by_height: sled::Tree,
    height_by_hash: sled::Tree,
    block_by_height: sled::Tree,
    tx_by_hash: sled::Tree,
    tx_location_by_hash: sled::Tree,
    utxo_by_outpoint: sled::Tree,
}

impl FinalizedState {
    pub fn new(config: &Config, network: Network) -> Self {
        let db = config.sled_config(network).open().unwrap();

        Self {
            queued_by_prev_hash: HashMap::new(),
            hash_by_height: db.open_tree(b"hash_by_height").unwrap(),
            height_by_hash: db.open_tree(b"height_by_hash").unwrap(),
            block_by_height: db.open_tree(b"block_by_height").unwrap(),
            tx_by_hash: db.open_tree(b"tx_by_hash").unwrap(),
            tx_location_by_hash: db.open_tree(b"tx_location_by_hash").unwrap(),
            utxo_by_outpoint: db.open_tree(b"utxo_by_outpoint").unwrap(),
        }
    }

    /// Queue a finalized block to be committed to the state.
    ///
    /// After queueing a finalized block, this method checks whether the newly
    /// queued block (and any of its descendants) can be committed to the state.
    pub fn queue_and_commit_finalized_blocks(&mut self, queued_block: QueuedBlock) {
        let prev_hash = queued_block.block.header.previous_block_hash;
        self.queued_by_prev_hash.insert(prev_hash, queued_block);

        while let Some(queued_block) = self.queued_by_prev_hash.remove(&self.finalized_tip_hash()) {
            let height = queued_block
                .block
                .coinbase_height()
                .expect("valid blocks must have a height");
            self.commit_finalized(queued_block);
            metrics::counter!("state.committed.block.count", 1);
            metrics::gauge!("state.committed.block.height", height.0 as _);
        }

        metrics::gauge!(
            "state.queued.block.count",
            self.queued_by_prev_hash.len() as _
        );
    }

    /// Returns the hash of the current finalized tip block.
    pub fn finalized_tip_hash(&self) -> block::Hash {
        self.tip()
            .expect("inability to look up tip is unrecoverable")
            .map(|(_, hash)| hash)
            // if the state is empty, return the genesis previous block hash
            .unwrap_or(GENESIS_PREVIOUS_BLOCK_HASH)
    }

    /// Returns the height of the current finalized tip block.
    pub fn finalized_tip_height(&self) -> Option<block::Height> {
        self.tip()
            .expect("inability to look up tip is unrecoverable")
            .map(|(height, _)| height)
    }

    /// Immediately commit `block` to the finalized state.
    ///
    /// `block` must already have passed `CheckBlock`/`AcceptBlock` and
    /// `ConnectInputs`; this method only persists it and records which
    /// outputs it created.
    pub fn commit_finalized_direct(&mut self, block: Arc<Block>) -> Result<block::Hash, BoxError> {
        let height = block
            .coinbase_height()
            .expect("finalized blocks are valid and have a coinbase height");
        let hash = block.hash();

        trace!(?height, "Finalized block");

        self.hash_by_height.zs_insert(height, hash)?;
        self.height_by_hash.zs_insert(hash, height)?;
        self.block_by_height.zs_insert(height, &*block)?;

        let coinbase_hash = block.transactions.first().map(|tx| tx.hash());

        for transaction in block.transactions.iter() {
            let transaction_hash = transaction.hash();
            self.tx_by_hash.zs_insert(transaction_hash, transaction)?;
            self.tx_location_by_hash.zs_insert(
                transaction_hash,
                TxLocation {
                    height,
                    is_coinbase: Some(transaction_hash) == coinbase_hash,
                },
            )?;

            for (index, output) in transaction.outputs.iter().enumerate() {
                let outpoint = transparent::OutPoint {
                    hash: transaction_hash,
                    index: index as _,
                };

                self.utxo_by_outpoint.zs_insert(outpoint, output)?;
            }
        }

        // Spent outputs were removed from the non-finalized overlay when
        // `ConnectInputs` ran; mirror that here so a restarted node doesn't
        // see spent coins as unspent.
        for transaction in block.transactions.iter() {
            for input in transaction.inputs.iter() {
                if let transparent::Input::PrevOut { outpoint, .. } = input {
                    self.utxo_by_outpoint.zs_remove(outpoint)?;
                }
            }
        }

        Ok(hash)
    }

    /// Commit a finalized block to the state.
    ///
    /// It's the caller's responsibility to ensure that blocks are committed in
    /// order. This function is called by [`queue_and_commit_finalized_blocks`], which
    /// ensures order. It is intentionally not exposed as part of the public API of the
    /// [`FinalizedState`].
    fn commit_finalized(&mut self, queued_block: QueuedBlock) {
        let QueuedBlock { block, rsp_tx } = queued_block;
        let result = self.commit_finalized_direct(block);
        let _ = rsp_tx.send(result.map_err(Into::into));
    }

    pub fn block_locator(&self) -> Result<Vec<block::Hash>, BoxError> {
        let (tip_height, _) = match self.tip()? {
            Some(height) => height,
            None => return Ok(Vec::new()),
        };

        let heights = crate::util::block_locator_heights(tip_height);
        let mut hashes = Vec::with_capacity(heights.len());

        for height in heights {
            if let Some(hash) = self.hash_by_height.zs_get(&height)? {
                hashes.push(hash);
            }
        }

        Ok(hashes)
    }

    pub fn tip(&self) -> Result<Option<(block::Height, block::Hash)>, BoxError> {
        if let Some((height_bytes, hash_bytes)) = self.hash_by_height.iter().rev().next().transpose()? {
            let height = block::Height::from_ivec(height_bytes)?;
            let hash = block::Hash::from_ivec(hash_bytes)?;

            Ok(Some((height, hash)))
        } else {
            Ok(None)
        }
    }

    pub fn depth(&self, hash: block::Hash) -> Result<Option<u32>, BoxError> {
        let height: block::Height = match self.height_by_hash.zs_get(&hash)? {
            Some(height) => height,
            None => return Ok(None),
        };

        let (tip_height, _) = self.tip()?.expect("tip must exist");

        Ok(Some(tip_height.0 - height.0))
    }

    pub fn block(&self, hash_or_height: HashOrHeight) -> Result<Option<Arc<Block>>, BoxError> {
        let height = match hash_or_height {
            HashOrHeight::Height(height) => height,
            HashOrHeight::Hash(hash) => match self.height_by_hash.zs_get(&hash)? {
                Some(height) => height,
                None => return Ok(None),
            },
        };

        Ok(self.block_by_height.zs_get(&height)?)
    }

    /// Returns the [`Utxo`] pointed to by the given [`transparent::OutPoint`], if
    /// it is present and unspent in the finalized state.
    pub fn utxo(&self, outpoint: &transparent::OutPoint) -> Result<Option<Utxo>, BoxError> {
        let output: Option<transparent::Output> = self.utxo_by_outpoint.zs_get(outpoint)?;
        let output = match output {
            Some(output) => output,
            None => return Ok(None),
        };

        let location: TxLocation = self
            .tx_location_by_hash
            .zs_get(&outpoint.hash)?
            .ok_or("utxo_by_outpoint entry has no matching tx_location_by_hash entry")?;

        Ok(Some(Utxo {
            output,
            height: location.height,
            from_coinbase: location.is_coinbase,
        }))
    }
}
