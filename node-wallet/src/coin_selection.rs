//! `SelectCoins`/`ApproximateBestSubset`: picks a set of this wallet's
//! unspent outputs that covers a target amount, preferring an exact match,
//! then the smallest single output that covers it outright, then the best
//! subset-sum approximation found by randomized search.

use node_chain::amount::{Amount, NonNegative};
use node_chain::transparent::OutPoint;
use rand::Rng;

use crate::error::WalletError;

/// A spendable output: an outpoint this wallet owns, and its value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Coin {
    pub outpoint: OutPoint,
    pub amount: Amount<NonNegative>,
}

/// Implements the five steps of `SelectCoins` against an already-filtered
/// set of final, unspent, mature, owned `coins`.
pub fn select_coins(
    coins: &[Coin],
    target: Amount<NonNegative>,
) -> Result<Vec<Coin>, WalletError> {
    if let Some(exact) = coins.iter().find(|coin| coin.amount == target) {
        return Ok(vec![exact.clone()]);
    }

    let target_value = target.to_i64();

    let mut below: Vec<Coin> = coins
        .iter()
        .filter(|coin| coin.amount.to_i64() < target_value)
        .cloned()
        .collect();
    below.sort_by(|a, b| b.amount.cmp(&a.amount));

    let lowest_larger = coins
        .iter()
        .filter(|coin| coin.amount.to_i64() > target_value)
        .min_by_key(|coin| coin.amount.to_i64())
        .cloned();

    let below_total: i64 = below.iter().map(|coin| coin.amount.to_i64()).sum();

    if below_total < target_value {
        return lowest_larger
            .map(|coin| vec![coin])
            .ok_or(WalletError::InsufficientFunds);
    }

    let (best_sum, best_subset) = approximate_best_subset(&below, target_value, below_total);

    match lowest_larger {
        Some(larger) if larger.amount.to_i64() - target_value <= best_sum - target_value => {
            Ok(vec![larger])
        }
        _ => Ok(best_subset),
    }
}

/// 1000 iterations, each a two-pass random inclusion walk over `coins`
/// (already sorted descending): pass one flips a coin for every entry, pass
/// two includes everything pass one left out. Whichever iteration's running
/// total first reaches `target` is recorded if it beats the best total seen
/// so far. Starts from "every coin in `coins`" as the baseline subset, since
/// that's guaranteed to reach target (`below_total >= target`).
fn approximate_best_subset(coins: &[Coin], target: i64, below_total: i64) -> (i64, Vec<Coin>) {
    let mut best_sum = below_total;
    let mut best_included = vec![true; coins.len()];
    let mut rng = rand::thread_rng();

    for _ in 0..1000 {
        if best_sum == target {
            break;
        }
        let mut included = vec![false; coins.len()];
        let mut total = 0i64;
        let mut reached_target = false;

        for pass in 0..2 {
            if reached_target {
                break;
            }
            for (i, coin) in coins.iter().enumerate() {
                let take = if pass == 0 {
                    rng.gen::<bool>()
                } else {
                    !included[i]
                };
                if take {
                    total += coin.amount.to_i64();
                    included[i] = true;
                    if total >= target {
                        reached_target = true;
                        if total < best_sum {
                            best_sum = total;
                            best_included = included.clone();
                        }
                        total -= coin.amount.to_i64();
                        included[i] = false;
                    }
                }
            }
        }
    }

    let best_subset = coins
        .iter()
        .zip(best_included.iter())
        .filter(|(_, included)| **included)
        .map(|(coin, _)| coin.clone())
        .collect();
    (best_sum, best_subset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::transaction::Hash as TxHash;

    fn coin(index: u32, value: i64) -> Coin {
        Coin {
            outpoint: OutPoint {
                hash: TxHash([index as u8; 32]),
                index,
            },
            amount: Amount::<NonNegative>::try_from_i64(value).unwrap(),
        }
    }

    #[test]
    fn exact_match_is_preferred() {
        node_test::init();
        let coins = vec![coin(0, 3_000), coin(1, 5_000), coin(2, 9_000)];
        let target = Amount::<NonNegative>::try_from_i64(5_000).unwrap();
        let selected = select_coins(&coins, target).unwrap();
        assert_eq!(selected, vec![coin(1, 5_000)]);
    }

    #[test]
    fn smallest_covering_coin_used_when_smaller_coins_cant_reach_target() {
        node_test::init();
        let coins = vec![coin(0, 1_000), coin(1, 50_000), coin(2, 90_000)];
        let target = Amount::<NonNegative>::try_from_i64(40_000).unwrap();
        let selected = select_coins(&coins, target).unwrap();
        assert_eq!(selected, vec![coin(1, 50_000)]);
    }

    #[test]
    fn insufficient_funds_when_nothing_covers_target() {
        node_test::init();
        let coins = vec![coin(0, 1_000), coin(1, 2_000)];
        let target = Amount::<NonNegative>::try_from_i64(10_000).unwrap();
        assert_eq!(select_coins(&coins, target), Err(WalletError::InsufficientFunds));
    }

    #[test]
    fn subset_sum_covers_target_when_no_single_coin_fits_better() {
        node_test::init();
        let coins = vec![coin(0, 4_000), coin(1, 4_000), coin(2, 4_000)];
        let target = Amount::<NonNegative>::try_from_i64(7_000).unwrap();
        let selected = select_coins(&coins, target).unwrap();
        let total: i64 = selected.iter().map(|c| c.amount.to_i64()).sum();
        assert!(total >= 7_000);
        assert!(selected.len() <= 2);
    }
}
