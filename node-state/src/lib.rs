//! On-disk and in-memory chain state: the finalized (`sled`-backed) tail of
//! the best chain, the non-finalized in-memory block tree sitting on top of
//! it, and the `tower::Service` that fronts both.

use std::sync::Arc;

use tokio::sync::oneshot;

use node_chain::{block, transparent};

mod block_store;
mod chain;
mod config;
mod difficulty;
pub mod service;
mod sled_format;
mod sled_state;
mod util;

pub use block_store::BlockStore;
pub use chain::NonFinalizedState;
pub use config::Config;
pub use service::{init, Request, Response, StateService};
pub use sled_state::FinalizedState;

/// A boxed error type: the common `Error` associated type for every
/// `tower::Service` in this crate.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Identifies a block by either its hash or its height.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum HashOrHeight {
    Hash(block::Hash),
    Height(block::Height),
}

impl From<block::Hash> for HashOrHeight {
    fn from(hash: block::Hash) -> Self {
        HashOrHeight::Hash(hash)
    }
}

impl From<block::Height> for HashOrHeight {
    fn from(height: block::Height) -> Self {
        HashOrHeight::Height(height)
    }
}

/// An output ready to be fed to `node_consensus::connect_inputs`: its value
/// and locking script, plus the chain context needed to check coinbase
/// maturity and double-spends.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utxo {
    pub output: transparent::Output,
    pub height: block::Height,
    pub from_coinbase: bool,
}

/// A block queued for commitment to the finalized state, together with a
/// channel to report the result of committing it back to the caller.
pub struct QueuedBlock {
    pub block: Arc<block::Block>,
    pub rsp_tx: oneshot::Sender<Result<block::Hash, BoxError>>,
}

impl std::fmt::Debug for QueuedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedBlock")
            .field("block", &self.block)
            .finish()
    }
}
