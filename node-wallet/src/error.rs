//! Errors produced by wallet operations.

use thiserror::Error;

/// An error from a wallet-level operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("insufficient funds to cover the requested amount")]
    InsufficientFunds,
}
