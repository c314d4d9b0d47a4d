//! `noded`: a Bitcoin-style peer-to-peer node binary.
//!
//! This crate is the application layer on top of `node-chain`, `node-state`,
//! `node-consensus`, `node-mempool`, `node-wallet`, `node-miner`, and
//! `node-network`: it owns the long-running tasks (socket I/O, connection
//! opener, message dispatch, peer discovery, mining) and the shared [`Node`]
//! context they're spawned with.

pub mod best_chain;
pub mod commands;
pub mod config;
pub mod error;
pub mod node;
pub mod prelude;
pub mod tasks;
