//! Small helpers shared by the finalized and non-finalized state.

use node_chain::block::Height;

/// Returns the heights a `getblocks`/`getheaders` block locator should
/// include, walking back from `tip_height`.
///
/// Mirrors Bitcoin's own locator construction: the ten most recent blocks,
/// then exponentially sparser heights, always ending at the genesis block.
pub fn block_locator_heights(tip_height: Height) -> Vec<Height> {
    let mut heights = Vec::new();
    let mut step = 1u32;
    let mut height = tip_height.0;

    loop {
        heights.push(Height(height));

        if height == 0 {
            break;
        }

        if heights.len() >= 10 {
            step = step.saturating_mul(2);
        }

        height = height.saturating_sub(step);
    }

    heights
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locator_always_includes_genesis() {
        node_test::init();
        let heights = block_locator_heights(Height(1000));
        assert_eq!(*heights.last().unwrap(), Height(0));
    }

    #[test]
    fn locator_is_dense_near_the_tip() {
        node_test::init();
        let heights = block_locator_heights(Height(20));
        assert_eq!(heights[0], Height(20));
        assert_eq!(heights[1], Height(19));
    }
}
