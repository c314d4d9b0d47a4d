//! The mempool: unconfirmed transactions that have passed `CheckTransaction`
//! and `ConnectInputs` against the current UTXO set, plus the buffer of
//! transactions still waiting on a missing input.

mod error;
mod orphan;
mod pool;

pub use error::MempoolError;
pub use orphan::OrphanPool;
pub use pool::Mempool;
