//! Errors a miner can hit assembling or submitting a candidate block.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MinerError {
    #[error("state service request failed: {0}")]
    State(node_state::BoxError),

    #[error(transparent)]
    Amount(#[from] node_chain::amount::AmountError),
}
