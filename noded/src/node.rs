//! The shared context every long-running task is spawned with: a handle to
//! the buffered state service, and the mempool/wallet/peer-layer state the
//! `main`-mutex model of spec collapses into a handful of per-subsystem
//! mutexes guarded by this struct's fields.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use tower::buffer::Buffer;
use tower::ServiceExt;

use node_chain::parameters::Network;
use node_mempool::Mempool;
use node_network::peer::PeerState;
use node_network::{AddressBook, RelayCache};
use node_state::service::Request;
use node_wallet::Wallet;

use crate::config::NodeConfig;

/// Everything the socket, connection, dispatch, and miner tasks share.
pub struct Node {
    pub network: Network,
    pub config: NodeConfig,
    pub state: Buffer<node_state::StateService, Request>,
    pub mempool: Arc<Mutex<Mempool>>,
    pub wallet: Arc<Mutex<Wallet>>,
    pub address_book: Arc<Mutex<AddressBook>>,
    pub relay_cache: Arc<Mutex<RelayCache>>,
    pub peers: Arc<Mutex<HashMap<SocketAddr, PeerState>>>,
    pub shutdown: Arc<AtomicBool>,
}

impl Node {
    pub fn new(config: NodeConfig, state: Buffer<node_state::StateService, Request>) -> Arc<Node> {
        Arc::new(Node {
            network: config.network,
            mempool: Arc::new(Mutex::new(Mempool::new())),
            wallet: Arc::new(Mutex::new(Wallet::new())),
            address_book: Arc::new(Mutex::new(AddressBook::new())),
            relay_cache: Arc::new(Mutex::new(RelayCache::new())),
            peers: Arc::new(Mutex::new(HashMap::new())),
            shutdown: Arc::new(AtomicBool::new(false)),
            config,
            state,
        })
    }

    /// A fresh client handle to the state service, cheap to clone per call
    /// site (`Buffer` is itself an `Arc`-backed handle).
    pub fn state_client(&self) -> Buffer<node_state::StateService, Request> {
        self.state.clone()
    }

    pub async fn tip(&self) -> Option<(node_chain::block::Height, node_chain::block::Hash)> {
        let response = self
            .state_client()
            .oneshot(Request::Tip)
            .await
            .ok()?;
        match response {
            node_state::service::Response::Tip(tip) => tip,
            _ => None,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// An in-memory node for tests: an ephemeral sled database, testnet
    /// parameters, mining disabled.
    pub(crate) fn test_node() -> Arc<Node> {
        test_node_with(|_| {})
    }

    /// Same as [`test_node`], but lets the caller tweak the config (e.g. set
    /// `initial_seed_peers`) before the state service is built.
    pub(crate) fn test_node_with(configure: impl FnOnce(&mut NodeConfig)) -> Arc<Node> {
        let mut config = NodeConfig::default();
        config.network = Network::Testnet;
        config.state.ephemeral = true;
        configure(&mut config);
        let state = node_state::init(config.state.clone(), config.network);
        Node::new(config, state)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_node;
    use super::*;

    #[tokio::test]
    async fn fresh_node_has_no_tip() {
        node_test::init();
        let node = test_node();
        assert_eq!(node.tip().await, None);
    }
}
