//! The FIFO cache of recently relayed inventory, so a `getdata` for
//! something we just announced doesn't have to go back to the mempool or
//! block store.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use crate::constants::{RELAY_CACHE_SIZE, RELAY_CACHE_TIMEOUT};
use crate::protocol::external::InventoryHash;

struct Entry {
    item: InventoryHash,
    bytes: Vec<u8>,
    inserted_at: Instant,
}

/// A bounded FIFO of wire-encoded `tx`/`block` bodies, keyed by their
/// inventory hash.
///
/// Entries age out after [`RELAY_CACHE_TIMEOUT`] but are not kept alive by a
/// later re-request; expiration walks the FIFO from the front, matching the
/// deque the cache is modeled on.
pub struct RelayCache {
    order: VecDeque<Entry>,
    index: HashMap<InventoryHash, usize>,
}

impl RelayCache {
    pub fn new() -> RelayCache {
        RelayCache {
            order: VecDeque::new(),
            index: HashMap::new(),
        }
    }

    /// Inserts `bytes` under `item`, evicting the oldest entry if the cache
    /// is at capacity.
    pub fn insert(&mut self, item: InventoryHash, bytes: Vec<u8>, now: Instant) {
        if self.order.len() >= RELAY_CACHE_SIZE {
            self.evict_oldest();
        }
        self.order.push_back(Entry {
            item,
            bytes,
            inserted_at: now,
        });
        self.reindex();
    }

    /// Looks up `item`, returning `None` once it has aged past
    /// [`RELAY_CACHE_TIMEOUT`] even if it hasn't been evicted yet.
    pub fn get(&self, item: &InventoryHash, now: Instant) -> Option<&[u8]> {
        let position = *self.index.get(item)?;
        let entry = &self.order[position];
        if now.duration_since(entry.inserted_at) > RELAY_CACHE_TIMEOUT {
            return None;
        }
        Some(&entry.bytes)
    }

    /// Drops every entry older than [`RELAY_CACHE_TIMEOUT`].
    pub fn expire(&mut self, now: Instant) {
        while let Some(front) = self.order.front() {
            if now.duration_since(front.inserted_at) > RELAY_CACHE_TIMEOUT {
                self.order.pop_front();
            } else {
                break;
            }
        }
        self.reindex();
    }

    fn evict_oldest(&mut self) {
        self.order.pop_front();
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (position, entry) in self.order.iter().enumerate() {
            self.index.insert(entry.item, position);
        }
    }
}

impl Default for RelayCache {
    fn default() -> Self {
        RelayCache::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::transaction;
    use std::time::Duration;

    fn item(n: u8) -> InventoryHash {
        InventoryHash::Tx(transaction::Hash([n; 32]))
    }

    #[test]
    fn stores_and_retrieves_an_entry() {
        node_test::init();
        let mut cache = RelayCache::new();
        let now = Instant::now();
        cache.insert(item(1), vec![1, 2, 3], now);
        assert_eq!(cache.get(&item(1), now), Some(&[1u8, 2, 3][..]));
    }

    #[test]
    fn entries_expire_after_the_relay_window() {
        node_test::init();
        let mut cache = RelayCache::new();
        let inserted = Instant::now();
        cache.insert(item(2), vec![9], inserted);

        let later = inserted + RELAY_CACHE_TIMEOUT + Duration::from_secs(1);
        assert_eq!(cache.get(&item(2), later), None);

        cache.expire(later);
        assert_eq!(cache.get(&item(2), later), None);
    }

    #[test]
    fn evicts_the_oldest_entry_once_full() {
        node_test::init();
        let mut cache = RelayCache::new();
        let now = Instant::now();
        for n in 0..RELAY_CACHE_SIZE {
            cache.insert(item((n % 256) as u8), vec![n as u8], now);
        }
        let overflow_item = item(250);
        cache.insert(overflow_item, vec![255], now);
        assert_eq!(cache.order.len(), RELAY_CACHE_SIZE);
    }
}
