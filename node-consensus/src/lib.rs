//! Stateless block and transaction validation: `CheckBlock`, `CheckTransaction`,
//! and `ConnectInputs`, plus the subsidy schedule they both depend on.
//!
//! Everything in this crate is context-free or depends only on the small
//! amount of chain context passed in explicitly (a spending height, a
//! previous-output lookup). The block index, UTXO set, and mempool that
//! supply that context live in `node-state` and `node-mempool`; this crate
//! only describes the rules, not where the data comes from.

pub mod block;
pub mod error;
pub mod parameters;
pub mod transaction;

pub use error::{BlockError, SubsidyError, TransactionError};
pub use transaction::{check_transaction, connect_inputs, is_final, PreviousOutput, PreviousOutputLookup};
