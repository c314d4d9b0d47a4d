//! Errors produced while accepting a transaction into the mempool.

use thiserror::Error;

use node_consensus::TransactionError;

/// An error rejecting a transaction from the mempool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MempoolError {
    #[error("coinbase transactions cannot enter the mempool directly")]
    CoinbaseNotAllowed,

    #[error(transparent)]
    Invalid(#[from] TransactionError),

    #[error("transaction is already known to the mempool")]
    AlreadyKnown,

    #[error("conflicting input does not satisfy the first-input replacement rule")]
    ReplacementRejected,
}
