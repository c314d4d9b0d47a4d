//! The binary's command-line surface.

mod start;

use std::path::PathBuf;

use gumdrop::Options;

use crate::prelude::*;

/// A Bitcoin-style peer-to-peer node.
#[derive(Debug, Options)]
pub struct Args {
    #[options(help = "print this help message")]
    help: bool,

    #[options(help = "path to a TOML configuration file")]
    config: Option<PathBuf>,

    #[options(help = "join the test network instead of the value in the config file")]
    testnet: bool,

    #[options(help = "mine blocks, overriding the config file's [mining] section")]
    mine: bool,
}

impl Args {
    pub fn parse() -> Args {
        Args::parse_args_default_or_exit()
    }

    pub async fn run(self) -> Result<()> {
        start::run(self).await
    }

    fn config(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from("node.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(config: Option<PathBuf>) -> Args {
        Args {
            help: false,
            config,
            testnet: false,
            mine: false,
        }
    }

    #[test]
    fn config_defaults_to_node_toml_in_the_current_directory() {
        assert_eq!(args(None).config(), PathBuf::from("node.toml"));
    }

    #[test]
    fn config_uses_the_explicit_path_when_given() {
        assert_eq!(
            args(Some(PathBuf::from("/etc/node/custom.toml"))).config(),
            PathBuf::from("/etc/node/custom.toml")
        );
    }
}
