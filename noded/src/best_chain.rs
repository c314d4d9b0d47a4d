//! Bridges `node-network`'s decoupled locator algorithm to the real state
//! service, the same way `node-miner`'s `ChainLookup` bridges
//! `PreviousOutputLookup`.

use node_chain::block;
use node_state::service::{Request, Response};
use node_state::HashOrHeight;
use tower::buffer::Buffer;
use tower::ServiceExt;

pub struct StateBestChain {
    client: Buffer<node_state::StateService, Request>,
}

impl StateBestChain {
    pub fn new(client: Buffer<node_state::StateService, Request>) -> StateBestChain {
        StateBestChain { client }
    }

    fn depth_of(&self, hash: &block::Hash) -> Option<u32> {
        let client = self.client.clone();
        let hash = *hash;
        match futures::executor::block_on(client.oneshot(Request::Depth(hash))) {
            Ok(Response::Depth(depth)) => depth,
            _ => None,
        }
    }
}

impl node_network::BestChain for StateBestChain {
    fn contains(&self, hash: &block::Hash) -> bool {
        self.depth_of(hash).is_some()
    }

    fn height_of(&self, hash: &block::Hash) -> Option<block::Height> {
        let depth = self.depth_of(hash)?;
        let tip = self.tip_height();
        tip.0.checked_sub(depth).map(block::Height)
    }

    fn hash_at(&self, height: block::Height) -> Option<block::Hash> {
        let client = self.client.clone();
        let response = futures::executor::block_on(
            client.oneshot(Request::Block(HashOrHeight::Height(height))),
        );
        match response {
            Ok(Response::Block(Some(block))) => Some(block.hash()),
            _ => None,
        }
    }

    fn tip_height(&self) -> block::Height {
        let client = self.client.clone();
        match futures::executor::block_on(client.oneshot(Request::Tip)) {
            Ok(Response::Tip(Some((height, _)))) => height,
            _ => block::Height(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node;
    use node_network::BestChain;

    #[tokio::test]
    async fn fresh_chain_has_no_blocks_and_a_zero_tip() {
        node_test::init();
        let node = test_node();
        let chain = StateBestChain::new(node.state_client());

        assert_eq!(chain.tip_height(), block::Height(0));
        assert!(!chain.contains(&block::Hash([0; 32])));
        assert_eq!(chain.height_of(&block::Hash([0; 32])), None);
        assert_eq!(chain.hash_at(block::Height(0)), None);
    }
}
