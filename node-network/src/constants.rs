//! Protocol-level constants: wire limits and the version/user-agent this
//! node advertises during the handshake.

use crate::protocol::external::types::ProtocolVersion;

/// The wire-protocol version this node speaks. `70002` is the first version
/// that supports the `reject` message (BIP 61), which this node relies on to
/// explain why it dropped a peer's transaction or block.
pub const CURRENT_VERSION: ProtocolVersion = ProtocolVersion(70_002);

/// The minimum protocol version this node will accept from a peer during the
/// handshake. Below this, a peer can't be trusted to understand `reject` or
/// to serve the full block chain on request.
pub const MIN_ACCEPTED_PROTOCOL_VERSION: ProtocolVersion = ProtocolVersion(70_001);

/// This node's user agent string, reported in its `version` message.
pub const USER_AGENT: &str = "/node:1.0.0-alpha.1/";

/// The maximum number of addresses advertised in a single `addr` message.
pub const MAX_ADDRS_IN_MESSAGE: usize = 1000;

/// The maximum number of block hashes requested in a single `getdata`.
pub const MAX_GETDATA_HASHES: usize = 50_000;

/// How many block hashes a peer may include in one `getblocks`/`getheaders`
/// locator before we consider the request malformed.
pub const MAX_BLOCK_LOCATOR_HASHES: usize = 101;

/// The number of block hashes sent in a single `inv` reply to `getblocks`.
pub const MAX_BLOCKS_PER_GETBLOCKS_REPLY: usize = 500;

/// How long a peer's advertised address is considered fresh, for relay and
/// connection-opening purposes.
pub const ADDR_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(3 * 60 * 60);

/// How long an inventory hash is kept in a peer's relay cache (the FIFO used
/// to avoid re-announcing the same `tx`/`block` to a peer that already has
/// it).
pub const RELAY_CACHE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15 * 60);

/// The maximum number of entries the relay cache keeps before evicting the
/// oldest.
pub const RELAY_CACHE_SIZE: usize = 50_000;
