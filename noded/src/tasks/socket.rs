//! Accepts inbound connections and hands each one off to its own
//! [`connection::run`] task.

use std::sync::Arc;

use tokio::net::TcpListener;

use crate::node::Node;
use crate::tasks::connection;

pub async fn run(node: Arc<Node>) -> std::io::Result<()> {
    let listen_addr = node.config.network_config.listen_addr;
    let mut listener = TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "listening for inbound connections");

    loop {
        if node
            .shutdown
            .load(std::sync::atomic::Ordering::Relaxed)
        {
            return Ok(());
        }

        match listener.accept().await {
            Ok((stream, addr)) => {
                let node = node.clone();
                tokio::spawn(async move {
                    connection::run(node, stream, addr, false).await;
                });
            }
            Err(error) => {
                tracing::warn!(%error, "failed to accept an inbound connection");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::test_node_with;

    #[tokio::test]
    async fn run_exits_immediately_when_shutdown_is_already_set() {
        node_test::init();
        let node = test_node_with(|config| {
            config.network_config.listen_addr = "127.0.0.1:0".parse().unwrap();
        });
        node.shutdown.store(true, std::sync::atomic::Ordering::Relaxed);

        assert!(run(node).await.is_ok());
    }
}
