//! Thin wrapper spawning the mining loop with this node's shared state.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::node::Node;

pub async fn run(node: Arc<Node>, stop_mining: Arc<AtomicBool>) {
    if !node.config.mining.enabled {
        return;
    }

    node_miner::run(
        node.state_client(),
        node.mempool.clone(),
        node.wallet.clone(),
        node.config.mining.min_fee(),
        node.shutdown.clone(),
        stop_mining,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node;

    #[tokio::test]
    async fn returns_immediately_when_mining_is_disabled() {
        node_test::init();
        let node = test_node();
        assert!(!node.config.mining.enabled);

        run(node, Arc::new(AtomicBool::new(false))).await;
    }
}
