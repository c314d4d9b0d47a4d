//! Loads configuration, wires up the shared [`Node`] context, and spawns
//! every long-running task until a shutdown signal arrives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use node_network::seed::{PeerSeeder, StaticSeeder};

use crate::commands::Args;
use crate::config::NodeConfig;
use crate::node::Node;
use crate::prelude::*;
use crate::tasks::{discovery, miner, opener, socket};

pub async fn run(args: Args) -> Result<()> {
    let config_path = args.config();
    let mut config = if config_path.exists() {
        NodeConfig::load(&config_path)?
    } else {
        NodeConfig::default()
    };

    if args.testnet {
        config.network = node_chain::parameters::Network::Testnet;
    }
    if args.mine {
        config.mining.enabled = true;
    }

    init_tracing(&config.tracing);

    tracing::info!(network = %config.network, "starting node");

    let state = node_state::init(config.state.clone(), config.network);
    let node = Node::new(config, state);

    let seeder: Arc<dyn PeerSeeder> =
        Arc::new(StaticSeeder::new(node.config.network_config.initial_seed_peers.clone()));

    let socket_task = tokio::spawn(socket::run(node.clone()));
    let opener_task = tokio::spawn(opener::run(node.clone()));
    let discovery_task = tokio::spawn(discovery::run(node.clone(), seeder));
    let miner_stop = Arc::new(AtomicBool::new(false));
    let miner_task = tokio::spawn(miner::run(node.clone(), miner_stop));

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    node.shutdown.store(true, Ordering::Relaxed);

    let _ = socket_task.await;
    let _ = opener_task.await;
    let _ = discovery_task.await;
    let _ = miner_task.await;

    Ok(())
}

fn init_tracing(config: &crate::config::TracingConfig) {
    let filter = config
        .filter
        .clone()
        .or_else(|| std::env::var("NODE_LOG").ok())
        .unwrap_or_else(|| "info".to_string());

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
    let _ = color_eyre::install();
}
