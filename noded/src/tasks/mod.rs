//! The node's long-running tasks: socket accept loop, connection opener,
//! per-connection message handling, peer discovery, and the miner.
//!
//! Each of these is spawned once from [`crate::commands::start`] and runs
//! until the shared shutdown flag is observed.

pub mod connection;
pub mod discovery;
pub mod dispatch;
pub mod miner;
pub mod opener;
pub mod socket;
