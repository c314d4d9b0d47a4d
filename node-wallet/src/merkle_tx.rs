//! `CMerkleTx`/`CWalletTx`, modeled by composition rather than inheritance:
//! a [`MerkleTx`] is a transaction plus an optional proof it's included in a
//! block; a [`WalletTx`] is a `MerkleTx` plus the bookkeeping only the
//! owning wallet cares about.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use node_chain::block::{self, merkle};
use node_chain::transaction::Transaction;

/// Where a transaction sits in the chain, if it's been mined at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Inclusion {
    pub block_hash: block::Hash,
    pub height: block::Height,
    pub branch: merkle::InclusionProof,
}

/// A transaction, plus the proof (if any) that it's included in a block.
#[derive(Clone, Debug)]
pub struct MerkleTx {
    pub tx: Arc<Transaction>,
    pub inclusion: Option<Inclusion>,
}

impl MerkleTx {
    pub fn new(tx: Arc<Transaction>, inclusion: Option<Inclusion>) -> Self {
        MerkleTx { tx, inclusion }
    }

    /// `GetDepthInMainChain`: 0 until mined, 1 in the tip block, and so on.
    pub fn depth(&self, tip_height: block::Height) -> u32 {
        match &self.inclusion {
            Some(inclusion) => tip_height.0.saturating_sub(inclusion.height.0) + 1,
            None => 0,
        }
    }

    /// `GetBlocksToMaturity`: remaining confirmations before a coinbase
    /// output becomes spendable; zero for non-coinbase transactions.
    pub fn blocks_to_maturity(&self, tip_height: block::Height) -> u32 {
        if !self.tx.is_coinbase() {
            return 0;
        }
        block::Height::COINBASE_MATURITY.saturating_sub(self.depth(tip_height))
    }

    /// `IsFinalTx`: whether this transaction may appear in a block built on
    /// top of `tip_height` at `adjusted_time`.
    pub fn is_final(&self, tip_height: block::Height, adjusted_time: DateTime<Utc>) -> bool {
        node_consensus::is_final(&self.tx, tip_height, adjusted_time)
    }
}

/// Bookkeeping the wallet attaches to a transaction that touches one of its
/// own keys: when it was seen, whether it originated locally, and whether
/// any of its outputs have since been spent.
#[derive(Clone, Debug)]
pub struct WalletMeta {
    pub received_time: DateTime<Utc>,
    pub from_me: bool,
    pub spent: bool,
}

/// A [`MerkleTx`] the wallet has decided is relevant to it.
#[derive(Clone, Debug)]
pub struct WalletTx {
    pub merkle: MerkleTx,
    pub wallet_meta: WalletMeta,
}

impl WalletTx {
    /// `GetCredit`: the total value of this transaction's outputs that
    /// belong to the wallet, zero while a coinbase output is still immature.
    pub fn credit<F>(&self, tip_height: block::Height, is_mine: F) -> i64
    where
        F: Fn(&node_chain::transparent::Script) -> bool,
    {
        if self.merkle.blocks_to_maturity(tip_height) > 0 {
            return 0;
        }
        self.merkle
            .tx
            .outputs
            .iter()
            .filter(|output| is_mine(&output.lock_script))
            .map(|output| output.value.to_i64())
            .sum()
    }
}
