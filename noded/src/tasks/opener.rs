//! The connection opener: keeps `peerset_initial_target_size` outbound
//! connections alive, dialing fresh candidates from the address book (or the
//! configured seed peers, before the address book has anything of its own)
//! whenever the outbound count drops.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::node::Node;
use crate::tasks::connection;

/// How often the opener checks whether it needs to dial another peer.
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

pub async fn run(node: Arc<Node>) {
    let mut interval = tokio::time::interval(RETRY_INTERVAL);

    loop {
        interval.tick().await;
        if node.shutdown.load(Ordering::Relaxed) {
            return;
        }

        let target = node.config.network_config.peerset_initial_target_size;
        let connected: Vec<SocketAddr> = node.peers.lock().unwrap().keys().copied().collect();
        if connected.len() >= target {
            continue;
        }

        if let Some(candidate) = next_candidate(&node, &connected) {
            let node = node.clone();
            tokio::spawn(async move {
                dial(node, candidate).await;
            });
        }
    }
}

fn next_candidate(node: &Arc<Node>, exclude: &[SocketAddr]) -> Option<SocketAddr> {
    node.address_book
        .lock()
        .unwrap()
        .next_candidate(exclude)
        .or_else(|| {
            node.config
                .network_config
                .initial_seed_peers
                .iter()
                .copied()
                .find(|addr| !exclude.contains(addr))
        })
}

async fn dial(node: Arc<Node>, addr: SocketAddr) {
    match TcpStream::connect(addr).await {
        Ok(stream) => connection::run(node, stream, addr, true).await,
        Err(error) => {
            tracing::debug!(%addr, %error, "failed to dial peer");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::{test_node, test_node_with};

    fn addr(port: u16) -> SocketAddr {
        format!("203.0.113.6:{}", port).parse().unwrap()
    }

    #[tokio::test]
    async fn falls_back_to_configured_seeds_when_the_address_book_is_empty() {
        node_test::init();
        let node = test_node_with(|config| {
            config.network_config.initial_seed_peers = vec![addr(8333)];
        });

        assert_eq!(next_candidate(&node, &[]), Some(addr(8333)));
    }

    #[tokio::test]
    async fn excludes_already_connected_addresses() {
        node_test::init();
        let node = test_node();
        node.address_book
            .lock()
            .unwrap()
            .insert(node_network::MetaAddr::new(
                addr(1),
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            ));
        node.address_book
            .lock()
            .unwrap()
            .insert(node_network::MetaAddr::new(
                addr(2),
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            ));

        assert_eq!(next_candidate(&node, &[addr(1)]), Some(addr(2)));
    }
}
