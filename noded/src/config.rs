//! On-disk configuration for the node binary: which network to join, and
//! the per-subsystem config each crate already defines.

use std::path::Path;

use serde::{Deserialize, Serialize};

use node_chain::amount::{Amount, NonNegative};
use node_chain::parameters::Network;

use crate::error::NodedError;

/// Top-level configuration, loaded from a TOML file (or defaulted if none
/// is given).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct NodeConfig {
    pub network: Network,
    pub state: node_state::Config,
    pub network_config: node_network::Config,
    pub mining: MiningConfig,
    pub tracing: TracingConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            network: Network::Mainnet,
            state: node_state::Config::default(),
            network_config: node_network::Config::default(),
            mining: MiningConfig::default(),
            tracing: TracingConfig::default(),
        }
    }
}

/// Whether and how aggressively this node mines.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MiningConfig {
    pub enabled: bool,
    /// The minimum per-kilobyte fee a transaction must pay to be considered
    /// for a candidate block, in satoshis.
    pub min_relay_fee: u64,
}

impl Default for MiningConfig {
    fn default() -> Self {
        MiningConfig {
            enabled: false,
            min_relay_fee: 1_000,
        }
    }
}

impl MiningConfig {
    pub fn min_fee(&self) -> Amount<NonNegative> {
        Amount::try_from_i64(self.min_relay_fee as i64)
            .unwrap_or_else(|_| Amount::zero())
    }
}

impl NodeConfig {
    /// Loads configuration from `path`, falling back to defaults for any
    /// field the file omits (`#[serde(default)]` on every nested struct).
    pub fn load(path: &Path) -> crate::error::Result<NodeConfig> {
        let contents = std::fs::read_to_string(path).map_err(|source| NodedError::Config {
            path: path.to_owned(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }
}

/// Logging configuration, independent of any one subsystem.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TracingConfig {
    pub filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        TracingConfig { filter: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        node_test::init();
        let config = NodeConfig::default();
        let serialized = toml::to_string(&config).expect("default config should serialize");
        let parsed: NodeConfig = toml::from_str(&serialized).expect("it should parse back");
        assert_eq!(parsed.network, config.network);
        assert_eq!(parsed.mining.min_relay_fee, config.mining.min_relay_fee);
    }

    #[test]
    fn load_reads_a_partial_file_and_defaults_the_rest() {
        node_test::init();
        let dir = tempdir::TempDir::new("noded-config-test").unwrap();
        let path = dir.path().join("node.toml");
        std::fs::write(&path, "network = \"Testnet\"\n").unwrap();

        let config = NodeConfig::load(&path).expect("partial config should load");
        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.mining.min_relay_fee, MiningConfig::default().min_relay_fee);
    }

    #[test]
    fn min_fee_reflects_the_configured_relay_fee() {
        node_test::init();
        let config = MiningConfig {
            enabled: true,
            min_relay_fee: 5_000,
        };
        assert_eq!(config.min_fee().to_i64(), 5_000);
    }
}
