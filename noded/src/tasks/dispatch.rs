//! Turning one parsed [`Message`] from one peer into chain/mempool/wallet
//! effects.
//!
//! This is the one place in the binary that's allowed to know about every
//! subsystem at once; `node-network` only knows the wire format, and
//! `node-state`/`node-mempool`/`node-wallet` only know their own domain.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tower::ServiceExt;

use node_chain::block::Block;
use node_chain::transaction::Transaction;
use node_miner::ChainLookup;
use node_network::protocol::external::{GetBlocks, InventoryHash, Message, Version};
use node_network::resolve_locator;
use node_state::service::{Request, Response};

use crate::best_chain::StateBestChain;
use crate::node::Node;

/// What a message handler wants done in response: nothing, or further
/// messages queued back to the same peer.
pub type Outbox = Vec<Message>;

/// Handles one message from `from`, returning whatever should be sent back
/// to that peer immediately (not relay — relay fan-out to other peers is
/// driven by the caller via the node's peer map and relay cache).
pub async fn handle_message(node: &Arc<Node>, from: SocketAddr, message: Message) -> Outbox {
    match message {
        Message::Version(version) => handle_version(node, from, version).await,
        Message::Verack => Vec::new(),
        Message::Ping(nonce) => vec![Message::Pong(nonce)],
        Message::Pong(_nonce) => Vec::new(),
        Message::GetAddr => handle_get_addr(node).await,
        Message::Addr(addrs) => {
            handle_addr(node, addrs);
            Vec::new()
        }
        Message::Inv(items) => handle_inv(node, from, items).await,
        Message::GetData(items) => handle_get_data(node, items).await,
        Message::GetBlocks(request) => handle_get_blocks(node, request.block_header_hashes, request.stop_hash).await,
        Message::Tx(tx) => {
            handle_tx(node, tx).await;
            Vec::new()
        }
        Message::Block(block) => {
            handle_block(node, block).await;
            Vec::new()
        }
        Message::Mempool => handle_mempool(node),
        Message::Reject { message, reason, .. } => {
            tracing::debug!(%message, ?reason, %from, "peer rejected a message we sent");
            Vec::new()
        }
        Message::NotFound(items) => {
            tracing::debug!(count = items.len(), %from, "peer doesn't have requested inventory");
            Vec::new()
        }
        other => {
            tracing::trace!(command = ?other.command(), %from, "ignoring out-of-scope message");
            Vec::new()
        }
    }
}

async fn handle_version(node: &Arc<Node>, from: SocketAddr, version: Version) -> Outbox {
    tracing::debug!(%from, peer_version = version.version.0, user_agent = %version.user_agent, "received version");

    if let Some(peer) = node.peers.lock().unwrap().get_mut(&from) {
        peer.protocol_version = version.version;
        peer.services = version.services;
    }

    let is_first_peer = node.peers.lock().unwrap().len() == 1;
    let mut outbox = vec![Message::Verack];

    if is_first_peer {
        // Bootstrap against the first peer we complete a handshake with: ask
        // it to walk us forward from our current tip.
        if let Some((_, tip_hash)) = node.tip().await {
            outbox.push(Message::GetBlocks(GetBlocks {
                block_header_hashes: vec![tip_hash],
                stop_hash: None,
            }));
        }
    }

    outbox
}

async fn handle_get_addr(node: &Arc<Node>) -> Outbox {
    let addrs = node.address_book.lock().unwrap().recent();
    vec![Message::Addr(addrs)]
}

fn handle_addr(node: &Arc<Node>, addrs: Vec<node_network::MetaAddr>) {
    let mut book = node.address_book.lock().unwrap();
    for addr in addrs {
        book.insert(addr);
    }
}

async fn handle_inv(node: &Arc<Node>, from: SocketAddr, items: Vec<InventoryHash>) -> Outbox {
    let mut to_request = Vec::new();
    let now = Instant::now();

    for item in items {
        let known = match item {
            InventoryHash::Tx(hash) => node.mempool.lock().unwrap().contains(&hash),
            InventoryHash::Block(hash) | InventoryHash::FilteredBlock(hash) => {
                matches!(
                    node.state_client().oneshot(Request::Depth(hash)).await,
                    Ok(Response::Depth(Some(_)))
                )
            }
            InventoryHash::Error => true,
        };

        if let Some(peer) = node.peers.lock().unwrap().get_mut(&from) {
            peer.mark_known(item);
            if !known {
                peer.ask(item, now);
                to_request.push(item);
            }
        }
    }

    if to_request.is_empty() {
        Vec::new()
    } else {
        vec![Message::GetData(to_request)]
    }
}

async fn handle_get_data(node: &Arc<Node>, items: Vec<InventoryHash>) -> Outbox {
    let mut outbox = Vec::new();
    let mut missing = Vec::new();

    for item in items {
        match item {
            InventoryHash::Tx(hash) => match node.mempool.lock().unwrap().get(&hash) {
                Some(tx) => outbox.push(Message::Tx(tx)),
                None => missing.push(item),
            },
            InventoryHash::Block(hash) => {
                let response = node
                    .state_client()
                    .oneshot(Request::Block(node_state::HashOrHeight::Hash(hash)))
                    .await;
                match response {
                    Ok(Response::Block(Some(block))) => outbox.push(Message::Block(block)),
                    _ => missing.push(item),
                }
            }
            InventoryHash::FilteredBlock(_) | InventoryHash::Error => missing.push(item),
        }
    }

    if !missing.is_empty() {
        outbox.push(Message::NotFound(missing));
    }
    outbox
}

async fn handle_get_blocks(
    node: &Arc<Node>,
    locator: Vec<node_chain::block::Hash>,
    stop_hash: Option<node_chain::block::Hash>,
) -> Outbox {
    let chain = StateBestChain::new(node.state_client());
    let hashes = resolve_locator(&chain, &locator, stop_hash);
    if hashes.is_empty() {
        return Vec::new();
    }
    vec![Message::Inv(
        hashes.into_iter().map(InventoryHash::Block).collect(),
    )]
}

async fn handle_tx(node: &Arc<Node>, tx: Arc<Transaction>) {
    let hash = tx.hash();
    if node.mempool.lock().unwrap().contains(&hash) {
        return;
    }

    let tip_height = node
        .tip()
        .await
        .map(|(height, _)| height)
        .unwrap_or(node_chain::block::Height(0));
    let min_fee = node.config.mining.min_fee();
    let lookup = ChainLookup::new(node.state_client());

    let result = {
        let mut mempool = node.mempool.lock().unwrap();
        mempool.accept(tx.clone(), &lookup, tip_height, min_fee)
    };

    match result {
        Ok(fee) => {
            tracing::debug!(%hash, fee = fee.to_i64(), "accepted transaction into mempool");
        }
        Err(error) => {
            tracing::debug!(%hash, %error, "rejected transaction");
        }
    }
}

async fn handle_block(node: &Arc<Node>, block: Arc<Block>) {
    let hash = block.hash();
    let response = node.state_client().oneshot(Request::CommitBlock(block.clone())).await;

    match response {
        Ok(Response::Committed(_)) => {
            tracing::info!(%hash, "committed block");
            let confirmed: Vec<Arc<Transaction>> = block.transactions.clone();
            node.mempool.lock().unwrap().remove_confirmed(&confirmed);
        }
        Ok(_) => {}
        Err(error) => {
            tracing::debug!(%hash, %error, "rejected block");
        }
    }
}

fn handle_mempool(node: &Arc<Node>) -> Outbox {
    let items: Vec<InventoryHash> = node
        .mempool
        .lock()
        .unwrap()
        .transactions()
        .map(|tx| InventoryHash::Tx(tx.hash()))
        .collect();
    if items.is_empty() {
        Vec::new()
    } else {
        vec![Message::Inv(items)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node;

    fn peer_addr() -> SocketAddr {
        "203.0.113.6:8333".parse().unwrap()
    }

    #[tokio::test]
    async fn mempool_message_is_empty_for_an_empty_pool() {
        node_test::init();
        let node = test_node();
        assert_eq!(handle_mempool(&node), Vec::<Message>::new());
    }

    #[tokio::test]
    async fn get_addr_replies_with_whatever_the_address_book_has() {
        node_test::init();
        let node = test_node();
        node.address_book
            .lock()
            .unwrap()
            .insert(node_network::MetaAddr::new(
                peer_addr(),
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            ));

        let outbox = handle_get_addr(&node).await;
        match outbox.as_slice() {
            [Message::Addr(addrs)] => assert_eq!(addrs.len(), 1),
            other => panic!("expected a single Addr reply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn addr_message_populates_the_address_book() {
        node_test::init();
        let node = test_node();
        handle_addr(
            &node,
            vec![node_network::MetaAddr::new(
                peer_addr(),
                node_network::protocol::external::types::PeerServices::NODE_NETWORK,
            )],
        );
        assert_eq!(node.address_book.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ping_is_answered_with_a_pong_carrying_the_same_nonce() {
        node_test::init();
        let node = test_node();
        let nonce = node_network::protocol::external::types::Nonce(42);
        let outbox = handle_message(&node, peer_addr(), Message::Ping(nonce)).await;
        assert_eq!(outbox, vec![Message::Pong(nonce)]);
    }

    #[tokio::test]
    async fn get_blocks_on_an_empty_chain_with_no_locator_returns_nothing() {
        node_test::init();
        let node = test_node();
        let outbox = handle_get_blocks(&node, Vec::new(), None).await;
        assert_eq!(outbox, Vec::new());
    }
}
