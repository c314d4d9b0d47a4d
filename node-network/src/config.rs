//! On-disk configuration for the peer layer.

use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Configuration for listening, seeding, and sizing the peer set.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The address this node listens for inbound connections on.
    pub listen_addr: SocketAddr,

    /// Addresses to dial on startup, before the address book has anything
    /// of its own to offer.
    pub initial_seed_peers: Vec<SocketAddr>,

    /// The number of outbound connections this node tries to keep open.
    pub peerset_initial_target_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listen_addr: "0.0.0.0:8333".parse().unwrap(),
            initial_seed_peers: Vec::new(),
            peerset_initial_target_size: 8,
        }
    }
}
