use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use node_chain::parameters::Network;

/// On-disk configuration for the state service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// The root directory under which network-specific databases are stored.
    pub cache_dir: PathBuf,

    /// Whether to open the sled database as an ephemeral in-memory store.
    ///
    /// Used by tests so they don't leave files behind.
    pub ephemeral: bool,
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("node");

        Self {
            cache_dir,
            ephemeral: false,
        }
    }
}

impl Config {
    /// Returns the sled configuration for the finalized state database,
    /// scoped to `network`.
    pub fn sled_config(&self, network: Network) -> sled::Config {
        let net_dir = match network {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        };

        let config = sled::Config::default();

        if self.ephemeral {
            config.temporary(true)
        } else {
            config.path(self.cache_dir.join("state").join(net_dir))
        }
    }

    /// Returns the directory append-only block files are stored under,
    /// scoped to `network`.
    pub fn block_dir(&self, network: Network) -> PathBuf {
        let net_dir = match network {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        };

        self.cache_dir.join("blocks").join(net_dir)
    }
}
