//! Wire format, per-peer bookkeeping, and discovery for the Bitcoin P2P
//! protocol.
//!
//! This crate owns everything that's true of a connection regardless of
//! what's on the other end of it: message framing, inventory, relay
//! caching, the address book, and locator resolution against the best
//! chain. Turning a parsed message into a chain/mempool/wallet effect, and
//! the socket/connection/dispatcher tasks that drive all of this, live in
//! the application crate on top.

pub mod address_book;
pub mod config;
pub mod constants;
pub mod locator;
pub mod meta_addr;
pub mod peer;
pub mod protocol;
pub mod relay_cache;
pub mod seed;

pub use address_book::AddressBook;
pub use config::Config;
pub use locator::{resolve_locator, BestChain};
pub use meta_addr::MetaAddr;
pub use peer::PeerState;
pub use relay_cache::RelayCache;
pub use seed::{PeerSeeder, StaticSeeder};
