//! Errors produced while validating blocks and transactions.

use thiserror::Error;

use node_chain::{
    amount::AmountError,
    block::{BlockTimeError, Hash, Height},
    work::difficulty::ExpandedDifficulty,
};
use node_script::ScriptError;

/// An error validating a block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("block has no transactions")]
    NoTransactions,

    #[error("block {1:?} at {0:?} has difficulty threshold {2:?}, above the network's PoW limit {3:?}")]
    TargetDifficultyLimit(Height, Hash, ExpandedDifficulty, ExpandedDifficulty),

    #[error("block {1:?} at {0:?} does not reach its difficulty threshold {2:?}")]
    DifficultyFilter(Height, Hash, ExpandedDifficulty),

    #[error("block {1:?} at {0:?} has a malformed difficulty threshold")]
    InvalidDifficulty(Height, Hash),

    #[error("invalid block time: {0}")]
    Time(#[from] BlockTimeError),

    #[error("computed merkle root does not match the block header's merkle root")]
    BadMerkleRoot {
        actual: node_chain::block::merkle::Root,
        expected: node_chain::block::merkle::Root,
    },

    #[error("block contains duplicate transactions")]
    DuplicateTransaction,

    #[error("block exceeds the maximum serialized size")]
    TooLarge,

    #[error("coinbase transaction pays out more than the block subsidy plus fees")]
    BadCoinbaseAmount,

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Subsidy(#[from] SubsidyError),
}

/// An error validating a transaction, either on its own (`CheckTransaction`)
/// or against the UTXO set it spends (`ConnectInputs`).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("coinbase transaction is not in the first position")]
    CoinbasePosition,

    #[error("coinbase input found outside the first transaction")]
    CoinbaseInputFound,

    #[error("coinbase scriptSig length {0} is outside the allowed range [2, 100]")]
    BadCoinbaseScriptLength(usize),

    #[error("non-coinbase input references a null outpoint")]
    NullPrevout,

    #[error("{0}")]
    Amount(#[from] AmountError),

    #[error("sum of output values overflows or exceeds the money supply")]
    OutputsOverflow,

    #[error("input {0} spends an outpoint that isn't in the UTXO set")]
    MissingPreviousOutput(u32),

    #[error("input {0} spends a coinbase output with fewer than {1} confirmations")]
    ImmatureCoinbaseSpend(u32, u32),

    #[error("input {0} double-spends an already-spent outpoint")]
    AlreadySpent(u32),

    #[error("input {0} failed script evaluation: {1}")]
    Script(u32, ScriptError),

    #[error("transaction pays a negative fee")]
    NegativeFee,

    #[error("transaction pays a fee below the required minimum")]
    FeeTooLow,
}

/// An error computing or validating the block subsidy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubsidyError {
    #[error("block has no coinbase transaction to pay a subsidy to")]
    NoCoinbase,

    #[error("block height has no defined subsidy")]
    NoSubsidyForHeight,
}
