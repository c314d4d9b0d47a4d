//! Peer discovery seams.
//!
//! IRC-rendezvous discovery is treated as an external collaborator and is
//! out of scope here; this module only defines the trait the rest of the
//! peer layer needs from whatever discovers the first peers, plus a static
//! fallback.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;

/// A source of candidate peer addresses to dial when the address book is
/// empty (first startup, or after losing every connection).
pub trait PeerSeeder: Send + Sync {
    fn seeds(&self) -> Pin<Box<dyn Future<Output = Vec<SocketAddr>> + Send + '_>>;
}

/// A fixed, configured list of addresses, used when no other discovery
/// mechanism is wired up.
pub struct StaticSeeder {
    addrs: Vec<SocketAddr>,
}

impl StaticSeeder {
    pub fn new(addrs: Vec<SocketAddr>) -> StaticSeeder {
        StaticSeeder { addrs }
    }
}

impl PeerSeeder for StaticSeeder {
    fn seeds(&self) -> Pin<Box<dyn Future<Output = Vec<SocketAddr>> + Send + '_>> {
        Box::pin(async move { self.addrs.clone() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_seeder_returns_its_configured_addresses() {
        node_test::init();
        let addrs = vec!["203.0.113.6:8333".parse().unwrap()];
        let seeder = StaticSeeder::new(addrs.clone());
        assert_eq!(seeder.seeds().await, addrs);
    }
}
