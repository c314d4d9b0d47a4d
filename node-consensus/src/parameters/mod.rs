//! Consensus parameters that aren't part of the wire-level network parameters
//! in `node_chain::parameters`.

pub mod subsidy;
