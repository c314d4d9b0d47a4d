//! The per-connection task: perform the `version`/`verack` handshake, then
//! alternate between reading wire messages and handing them to the
//! dispatcher, and writing back whatever the dispatcher produces.
//!
//! One of these runs per accepted or dialed socket; it owns the socket for
//! the connection's whole lifetime and removes the peer's [`PeerState`] on
//! exit, however that exit happens.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use rand::RngCore;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use node_network::constants::{CURRENT_VERSION, MIN_ACCEPTED_PROTOCOL_VERSION, USER_AGENT};
use node_network::peer::PeerState;
use node_network::protocol::external::types::{Nonce, PeerServices};
use node_network::protocol::external::{Codec, Message, Version};

use crate::error::HandshakeError;
use crate::node::Node;
use crate::tasks::dispatch;

/// Drives one connection from handshake to disconnect.
pub async fn run(node: Arc<Node>, stream: TcpStream, addr: SocketAddr, outbound: bool) {
    node.peers
        .lock()
        .unwrap()
        .insert(addr, PeerState::new(addr));

    let mut framed = Framed::new(
        stream,
        Codec::builder().for_network(node.network).finish(),
    );

    if let Err(error) = handshake(&node, &mut framed, addr, outbound).await {
        tracing::debug!(%addr, %error, "handshake failed");
        node.peers.lock().unwrap().remove(&addr);
        return;
    }

    tracing::info!(%addr, outbound, "peer connected");

    loop {
        if node.shutdown.load(Ordering::Relaxed) {
            break;
        }

        let disconnect = node
            .peers
            .lock()
            .unwrap()
            .get(&addr)
            .map(|peer| peer.disconnect)
            .unwrap_or(true);
        if disconnect {
            break;
        }

        match framed.next().await {
            Some(Ok(message)) => {
                let outbox = dispatch::handle_message(&node, addr, message).await;
                if !send_all(&mut framed, outbox).await {
                    break;
                }
            }
            Some(Err(error)) => {
                tracing::debug!(%addr, %error, "connection read error");
                break;
            }
            None => break,
        }
    }

    node.peers.lock().unwrap().remove(&addr);
    tracing::debug!(%addr, "peer disconnected");
}

async fn send_all(framed: &mut Framed<TcpStream, Codec>, messages: Vec<Message>) -> bool {
    for message in messages {
        if let Err(error) = framed.send(message).await {
            tracing::debug!(%error, "connection write error");
            return false;
        }
    }
    true
}

/// Exchanges `version`/`verack` with the peer. Bitcoin Core doesn't mandate
/// an order between the two messages, but this node always sends `version`
/// first and waits for the peer's `version` before sending `verack`, the
/// same sequencing a fresh outbound connection uses.
async fn handshake(
    node: &Arc<Node>,
    framed: &mut Framed<TcpStream, Codec>,
    addr: SocketAddr,
    _outbound: bool,
) -> Result<(), HandshakeError> {
    let local_addr = framed
        .get_ref()
        .local_addr()
        .unwrap_or_else(|_| node.config.network_config.listen_addr);

    let nonce = Nonce(rand::thread_rng().next_u64());
    let best_block = node.tip().await.map(|(height, _)| height).unwrap_or(node_chain::block::Height(0));

    let version = Version::new(
        CURRENT_VERSION,
        addr,
        PeerServices::NODE_NETWORK,
        PeerServices::NODE_NETWORK,
        local_addr,
        nonce,
        USER_AGENT.to_owned(),
        best_block,
        true,
    );
    framed.send(Message::Version(version)).await?;

    let mut seen_version = false;
    let mut seen_verack = false;

    while !seen_version || !seen_verack {
        let message = framed
            .next()
            .await
            .ok_or(HandshakeError::ConnectionClosed)??;

        match message {
            Message::Version(their_version) => {
                if their_version.version < MIN_ACCEPTED_PROTOCOL_VERSION {
                    return Err(HandshakeError::ObsoleteVersion(their_version.version));
                }
                if their_version.nonce == nonce {
                    return Err(HandshakeError::SelfConnection);
                }
                if let Some(peer) = node.peers.lock().unwrap().get_mut(&addr) {
                    peer.protocol_version = their_version.version;
                    peer.services = their_version.services;
                }
                framed.send(Message::Verack).await?;
                seen_version = true;
            }
            Message::Verack => {
                seen_verack = true;
            }
            other => return Err(HandshakeError::UnexpectedMessage(Box::new(other))),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn handshake_succeeds_between_two_loopback_peers() {
        node_test::init();
        let node_a = test_node();
        let node_b = test_node();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let listen_addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, addr) = listener.accept().await.unwrap();
            node_a.peers.lock().unwrap().insert(addr, PeerState::new(addr));
            let mut framed = Framed::new(
                stream,
                Codec::builder().for_network(node_a.network).finish(),
            );
            handshake(&node_a, &mut framed, addr, false).await
        });

        let client_stream = TcpStream::connect(listen_addr).await.unwrap();
        node_b
            .peers
            .lock()
            .unwrap()
            .insert(listen_addr, PeerState::new(listen_addr));
        let mut client_framed = Framed::new(
            client_stream,
            Codec::builder().for_network(node_b.network).finish(),
        );
        let client_result = handshake(&node_b, &mut client_framed, listen_addr, true).await;
        let server_result = server.await.unwrap();

        assert!(client_result.is_ok(), "{:?}", client_result);
        assert!(server_result.is_ok(), "{:?}", server_result);
    }
}
