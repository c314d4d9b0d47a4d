//! Resolving a `getblocks`/`getheaders` locator against the best chain.
//!
//! The locator algorithm itself doesn't need anything from `node-state`
//! beyond "is this hash on the best chain, and what comes after it" so it's
//! expressed here against a narrow trait rather than pulling the whole
//! state crate into this one's dependency graph.

use node_chain::block;

use crate::constants::MAX_BLOCKS_PER_GETBLOCKS_REPLY;

/// What the locator resolver needs from whatever holds the chain.
pub trait BestChain {
    /// True if `hash` names a block on the current best chain.
    fn contains(&self, hash: &block::Hash) -> bool;

    /// The height of `hash`, if it's on the best chain.
    fn height_of(&self, hash: &block::Hash) -> Option<block::Height>;

    /// The hash of the best-chain block at `height`, if the chain is at
    /// least that tall.
    fn hash_at(&self, height: block::Height) -> Option<block::Hash>;

    /// The current best-chain tip height.
    fn tip_height(&self) -> block::Height;
}

/// Finds the deepest hash in `locator` that's on the best chain, then
/// returns up to [`MAX_BLOCKS_PER_GETBLOCKS_REPLY`] hashes of the blocks
/// that follow it, stopping early at `stop_hash` if given.
///
/// An empty `locator` is treated as rooted at genesis. A locator with no
/// hash on the best chain returns an empty result, matching the original
/// behavior of silently ignoring a `getblocks` rooted on a fork we've
/// abandoned.
pub fn resolve_locator<C: BestChain>(
    chain: &C,
    locator: &[block::Hash],
    stop_hash: Option<block::Hash>,
) -> Vec<block::Hash> {
    let start_height = locator
        .iter()
        .find_map(|hash| chain.height_of(hash))
        .unwrap_or(block::Height(0));

    let tip = chain.tip_height();
    if start_height >= tip {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut height = start_height.0 + 1;
    while height <= tip.0 && result.len() < MAX_BLOCKS_PER_GETBLOCKS_REPLY {
        let hash = match chain.hash_at(block::Height(height)) {
            Some(hash) => hash,
            None => break,
        };
        result.push(hash);
        if Some(hash) == stop_hash {
            break;
        }
        height += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct LinearChain {
        hashes: Vec<block::Hash>,
    }

    impl LinearChain {
        fn new(len: u32) -> LinearChain {
            LinearChain {
                hashes: (0..len).map(|n| block::Hash([n as u8; 32])).collect(),
            }
        }

        fn heights(&self) -> HashMap<block::Hash, block::Height> {
            self.hashes
                .iter()
                .enumerate()
                .map(|(height, hash)| (*hash, block::Height(height as u32)))
                .collect()
        }
    }

    impl BestChain for LinearChain {
        fn contains(&self, hash: &block::Hash) -> bool {
            self.hashes.contains(hash)
        }

        fn height_of(&self, hash: &block::Hash) -> Option<block::Height> {
            self.heights().get(hash).copied()
        }

        fn hash_at(&self, height: block::Height) -> Option<block::Hash> {
            self.hashes.get(height.0 as usize).copied()
        }

        fn tip_height(&self) -> block::Height {
            block::Height(self.hashes.len() as u32 - 1)
        }
    }

    #[test]
    fn empty_locator_resolves_from_genesis() {
        node_test::init();
        let chain = LinearChain::new(5);
        let result = resolve_locator(&chain, &[], None);
        assert_eq!(result, chain.hashes[1..].to_vec());
    }

    #[test]
    fn locator_resolves_from_its_deepest_matching_hash() {
        node_test::init();
        let chain = LinearChain::new(5);
        let locator = vec![block::Hash([99; 32]), chain.hashes[2]];
        let result = resolve_locator(&chain, &locator, None);
        assert_eq!(result, chain.hashes[3..].to_vec());
    }

    #[test]
    fn locator_stops_at_the_stop_hash() {
        node_test::init();
        let chain = LinearChain::new(10);
        let locator = vec![chain.hashes[0]];
        let result = resolve_locator(&chain, &locator, Some(chain.hashes[3]));
        assert_eq!(result, chain.hashes[1..=3].to_vec());
    }

    #[test]
    fn locator_already_at_the_tip_returns_nothing() {
        node_test::init();
        let chain = LinearChain::new(3);
        let locator = vec![chain.hashes[2]];
        assert!(resolve_locator(&chain, &locator, None).is_empty());
    }

    #[test]
    fn locator_with_no_known_hash_resolves_from_genesis() {
        node_test::init();
        let chain = LinearChain::new(4);
        let locator = vec![block::Hash([200; 32])];
        let result = resolve_locator(&chain, &locator, None);
        assert_eq!(result, chain.hashes[1..].to_vec());
    }
}
