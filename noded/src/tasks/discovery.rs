//! The rendezvous/discovery task: seeds the address book on startup and
//! whenever it runs dry, from whatever [`PeerSeeder`] the binary was built
//! with.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use node_network::seed::PeerSeeder;
use node_network::MetaAddr;

use crate::node::Node;

/// How often to check whether the address book needs refilling.
const POLL_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run(node: Arc<Node>, seeder: Arc<dyn PeerSeeder>) {
    loop {
        if node.shutdown.load(Ordering::Relaxed) {
            return;
        }

        refill(&node, seeder.as_ref()).await;

        tokio::time::delay_for(POLL_INTERVAL).await;
    }
}

/// Seeds the address book if (and only if) it's currently empty.
async fn refill(node: &Arc<Node>, seeder: &dyn PeerSeeder) {
    if node.address_book.lock().unwrap().is_empty() {
        let addrs = seeder.seeds().await;
        tracing::debug!(count = addrs.len(), "seeding address book");
        let mut book = node.address_book.lock().unwrap();
        for addr in addrs {
            book.insert(MetaAddr::new(
                addr,
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node;
    use node_network::seed::StaticSeeder;

    fn addr(port: u16) -> std::net::SocketAddr {
        format!("203.0.113.6:{}", port).parse().unwrap()
    }

    #[tokio::test]
    async fn refills_an_empty_address_book_from_the_seeder() {
        node_test::init();
        let node = test_node();
        let seeder = StaticSeeder::new(vec![addr(8333), addr(8334)]);

        refill(&node, &seeder).await;

        assert_eq!(node.address_book.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn leaves_a_non_empty_address_book_alone() {
        node_test::init();
        let node = test_node();
        node.address_book
            .lock()
            .unwrap()
            .insert(MetaAddr::new(
                addr(1),
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            ));
        let seeder = StaticSeeder::new(vec![addr(8333)]);

        refill(&node, &seeder).await;

        assert_eq!(node.address_book.lock().unwrap().len(), 1);
    }
}
