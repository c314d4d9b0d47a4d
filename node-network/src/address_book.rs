//! The address table fed by `addr` messages and consulted by `getaddr`
//! replies and the connection opener.

use std::collections::HashMap;
use std::net::SocketAddr;

use chrono::Utc;

use crate::constants::{ADDR_TIMEOUT, MAX_ADDRS_IN_MESSAGE};
use crate::meta_addr::MetaAddr;

/// Addresses this node has heard about from peers, most-recently-seen first
/// for candidate selection.
pub struct AddressBook {
    addrs: HashMap<SocketAddr, MetaAddr>,
}

impl AddressBook {
    pub fn new() -> AddressBook {
        AddressBook {
            addrs: HashMap::new(),
        }
    }

    /// Records or refreshes an address, keeping the more recent `last_seen`
    /// if we already had an entry for it.
    pub fn insert(&mut self, candidate: MetaAddr) {
        self.addrs
            .entry(candidate.addr)
            .and_modify(|existing| {
                if candidate.last_seen > existing.last_seen {
                    *existing = candidate;
                }
            })
            .or_insert(candidate);
    }

    pub fn get(&self, addr: &SocketAddr) -> Option<&MetaAddr> {
        self.addrs.get(addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Addresses seen within [`ADDR_TIMEOUT`], most recent first, truncated
    /// to [`MAX_ADDRS_IN_MESSAGE`] entries for an outbound `addr` reply.
    pub fn recent(&self) -> Vec<MetaAddr> {
        let now = Utc::now();
        let mut fresh: Vec<MetaAddr> = self
            .addrs
            .values()
            .filter(|meta| {
                now.signed_duration_since(meta.last_seen).num_seconds()
                    <= ADDR_TIMEOUT.as_secs() as i64
            })
            .copied()
            .collect();
        fresh.sort_by(|a, b| b.last_seen.cmp(&a.last_seen));
        fresh.truncate(MAX_ADDRS_IN_MESSAGE);
        fresh
    }

    /// A candidate address to dial, picked from the freshest entries that
    /// aren't already excluded (e.g. already connected, or the local
    /// listener itself).
    pub fn next_candidate(&self, exclude: &[SocketAddr]) -> Option<SocketAddr> {
        self.recent()
            .into_iter()
            .map(|meta| meta.addr)
            .find(|addr| !exclude.contains(addr))
    }
}

impl Default for AddressBook {
    fn default() -> Self {
        AddressBook::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::external::types::PeerServices;
    use chrono::Duration;

    fn addr(port: u16) -> SocketAddr {
        format!("203.0.113.6:{}", port).parse().unwrap()
    }

    #[test]
    fn insert_keeps_the_most_recently_seen_entry() {
        node_test::init();
        let mut book = AddressBook::new();
        let a = addr(8333);

        book.insert(MetaAddr {
            addr: a,
            services: PeerServices::NODE_NETWORK,
            last_seen: Utc::now() - Duration::seconds(60),
        });
        book.insert(MetaAddr {
            addr: a,
            services: PeerServices::NODE_NETWORK,
            last_seen: Utc::now(),
        });

        assert_eq!(book.len(), 1);
    }

    #[test]
    fn recent_excludes_stale_addresses() {
        node_test::init();
        let mut book = AddressBook::new();
        book.insert(MetaAddr {
            addr: addr(1),
            services: PeerServices::NODE_NETWORK,
            last_seen: Utc::now() - Duration::hours(4),
        });
        book.insert(MetaAddr {
            addr: addr(2),
            services: PeerServices::NODE_NETWORK,
            last_seen: Utc::now(),
        });

        let recent = book.recent();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].addr, addr(2));
    }

    #[test]
    fn next_candidate_skips_excluded_addresses() {
        node_test::init();
        let mut book = AddressBook::new();
        book.insert(MetaAddr::new(addr(1), PeerServices::NODE_NETWORK));
        book.insert(MetaAddr::new(addr(2), PeerServices::NODE_NETWORK));

        let candidate = book.next_candidate(&[addr(1)]);
        assert_eq!(candidate, Some(addr(2)));
    }
}
