//! The application's top-level error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodedError {
    #[error("failed to read config file {path}")]
    Config {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, NodedError>;

/// Why a peer connection failed its handshake.
#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("connection closed before the handshake completed")]
    ConnectionClosed,

    #[error("peer sent {0:?} before completing the version/verack exchange")]
    UnexpectedMessage(Box<node_network::protocol::external::Message>),

    #[error("peer's protocol version {0:?} is below the minimum accepted version")]
    ObsoleteVersion(node_network::protocol::external::types::ProtocolVersion),

    #[error("peer's nonce matches one of our own outbound nonces: connected to self")]
    SelfConnection,

    #[error(transparent)]
    Codec(#[from] node_chain::serialization::SerializationError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
