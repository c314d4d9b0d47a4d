//! Per-peer bookkeeping shared between the socket task and the dispatcher.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::Instant;

use tokio::sync::oneshot;

use crate::protocol::external::types::{PeerServices, ProtocolVersion};
use crate::protocol::external::{InventoryHash, Message};

bitflags::bitflags! {
    /// Behaviors a peer has opted into beyond the baseline handshake.
    #[derive(Default)]
    pub struct Subscriptions: u8 {
        /// The peer asked to receive new-block announcements as `headers`
        /// rather than `inv` (`sendheaders`, BIP 130).
        const SEND_HEADERS = 0b0000_0001;
        /// The peer asked to receive new blocks as `cmpctblock` (`sendcmpct`,
        /// BIP 152).
        const SEND_COMPACT = 0b0000_0010;
    }
}

/// A reply a peer owes us, to be delivered to whoever asked for it.
pub struct PendingRequest {
    pub sender: oneshot::Sender<Message>,
}

/// The mutable state the dispatcher keeps for one connected peer.
///
/// One `PeerState` is created per accepted or opened connection and lives
/// until the peer disconnects; the socket, message, and miner tasks all
/// reach it through the shared [`crate::address_book::AddressBook`]-external
/// handle the connection task hands out.
pub struct PeerState {
    pub addr: SocketAddr,
    /// Zero until the `version`/`verack` handshake completes.
    pub protocol_version: ProtocolVersion,
    pub services: PeerServices,
    /// Items this peer has told us about, or that we've advertised to it:
    /// deduplicates outbound `inv`.
    known_inventory: HashSet<InventoryHash>,
    /// Items queued to advertise to this peer on the next `inv` flush.
    to_send: HashSet<InventoryHash>,
    /// Items asked of this peer, each with the time of the earliest ask, so
    /// a stalled `getdata` can be retried against another peer.
    pending_asks: HashMap<InventoryHash, Instant>,
    /// Replies this peer owes us, keyed by the hash of the expected reply
    /// payload.
    pending_requests: HashMap<[u8; 32], PendingRequest>,
    /// Set once this connection should be torn down; checked at every
    /// suspension point of the socket and message tasks.
    pub disconnect: bool,
    pub subscriptions: Subscriptions,
}

impl PeerState {
    pub fn new(addr: SocketAddr) -> PeerState {
        PeerState {
            addr,
            protocol_version: ProtocolVersion(0),
            services: PeerServices::empty(),
            known_inventory: HashSet::new(),
            to_send: HashSet::new(),
            pending_asks: HashMap::new(),
            pending_requests: HashMap::new(),
            disconnect: false,
            subscriptions: Subscriptions::empty(),
        }
    }

    /// Records that this peer already has `item`, whether because it
    /// announced it or because we already sent it.
    pub fn mark_known(&mut self, item: InventoryHash) {
        self.known_inventory.insert(item);
        self.to_send.remove(&item);
    }

    /// Queues `item` for the next outbound `inv`, unless the peer already
    /// has it.
    pub fn queue_send(&mut self, item: InventoryHash) {
        if !self.known_inventory.contains(&item) {
            self.to_send.insert(item);
        }
    }

    /// Drains every item queued for this peer, marking each as known so a
    /// later announcement of the same item doesn't repeat it.
    pub fn drain_to_send(&mut self) -> Vec<InventoryHash> {
        let items: Vec<InventoryHash> = self.to_send.drain().collect();
        self.known_inventory.extend(items.iter().copied());
        items
    }

    /// Records that `item` was asked of this peer, if it wasn't already
    /// outstanding.
    pub fn ask(&mut self, item: InventoryHash, now: Instant) {
        self.pending_asks.entry(item).or_insert(now);
    }

    /// True if `item` was asked before `deadline` and never answered, and so
    /// is a candidate for re-asking a different peer.
    pub fn is_stalled(&self, item: &InventoryHash, deadline: Instant) -> bool {
        matches!(self.pending_asks.get(item), Some(asked) if *asked < deadline)
    }

    pub fn clear_ask(&mut self, item: &InventoryHash) {
        self.pending_asks.remove(item);
    }

    /// Registers a continuation to run when this peer's reply hashing to
    /// `reply_hash` arrives.
    pub fn expect_reply(&mut self, reply_hash: [u8; 32], sender: oneshot::Sender<Message>) {
        self.pending_requests
            .insert(reply_hash, PendingRequest { sender });
    }

    /// Resolves and removes the continuation waiting on `reply_hash`, if
    /// any. Returns the message back to the caller when nobody was waiting,
    /// so it can still be handled as an unsolicited announcement.
    pub fn resolve_reply(&mut self, reply_hash: [u8; 32], message: Message) -> Option<Message> {
        match self.pending_requests.remove(&reply_hash) {
            Some(pending) => {
                let _ = pending.sender.send(message);
                None
            }
            None => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "203.0.113.6:8333".parse().unwrap()
    }

    #[test]
    fn queue_send_skips_items_already_known() {
        node_test::init();
        let mut peer = PeerState::new(addr());
        let item = InventoryHash::Tx(node_chain::transaction::Hash([1; 32]));

        peer.mark_known(item);
        peer.queue_send(item);

        assert!(peer.drain_to_send().is_empty());
    }

    #[test]
    fn drain_to_send_marks_drained_items_known() {
        node_test::init();
        let mut peer = PeerState::new(addr());
        let item = InventoryHash::Tx(node_chain::transaction::Hash([2; 32]));

        peer.queue_send(item);
        let drained = peer.drain_to_send();

        assert_eq!(drained, vec![item]);
        peer.queue_send(item);
        assert!(peer.drain_to_send().is_empty());
    }

    #[test]
    fn resolve_reply_without_a_waiter_hands_the_message_back() {
        node_test::init();
        let mut peer = PeerState::new(addr());
        let resolved = peer.resolve_reply([0; 32], Message::Verack);
        assert!(resolved.is_some());
    }

    #[test]
    fn resolve_reply_with_a_waiter_delivers_to_the_channel() {
        node_test::init();
        let mut peer = PeerState::new(addr());
        let (tx, mut rx) = oneshot::channel();
        peer.expect_reply([1; 32], tx);

        let resolved = peer.resolve_reply([1; 32], Message::Verack);
        assert!(resolved.is_none());
        assert!(matches!(rx.try_recv(), Ok(Message::Verack)));
    }
}
