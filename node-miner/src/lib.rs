//! Candidate-block assembly and the proof-of-work search: the node's
//! mining task, fed by the mempool and the wallet, submitting through the
//! same acceptance path an incoming block would use.

mod error;
mod miner;
mod state_lookup;
mod template;

pub use error::MinerError;
pub use miner::run;
pub use state_lookup::ChainLookup;
pub use template::{assemble, BlockTemplate, MAX_CANDIDATE_BYTES};
