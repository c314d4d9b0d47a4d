//! `BlockSubsidy(height)` and `BlockValue(fees, height)`.
//!
//! The subsidy starts at 50 coins and halves every 210,000 blocks until the
//! 64th halving, after which it is zero.

use node_chain::{
    amount::{Amount, AmountError, NonNegative},
    block::Height,
    transaction::Transaction,
    transparent,
};

use crate::parameters::subsidy::*;

/// Returns the block subsidy paid to the coinbase transaction at `height`,
/// before transaction fees.
pub fn block_subsidy(height: Height) -> Result<Amount<NonNegative>, AmountError> {
    let halvings = height.0 / HALVING_INTERVAL.0;
    if halvings >= 64 {
        return Amount::try_from_i64(0);
    }
    let subsidy = MAX_BLOCK_SUBSIDY >> halvings;
    Amount::try_from_i64(subsidy as i64)
}

/// Returns the maximum value the coinbase transaction at `height` may pay
/// out, given it also collects `fees` from the block's other transactions.
pub fn block_value(fees: Amount<NonNegative>, height: Height) -> Result<Amount<NonNegative>, AmountError> {
    let subsidy = block_subsidy(height)?;
    Amount::try_from_i64(subsidy.to_i64() + fees.to_i64())
}

/// Returns every output in `transaction` whose value equals `amount`.
pub fn find_output_with_amount(
    transaction: &Transaction,
    amount: Amount<NonNegative>,
) -> Vec<transparent::Output> {
    transaction
        .outputs
        .iter()
        .filter(|o| o.value == amount)
        .cloned()
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn block_subsidy_halves_on_schedule() {
        node_test::init();

        assert_eq!(
            block_subsidy(Height(0)),
            Amount::try_from_i64(5_000_000_000)
        );
        assert_eq!(
            block_subsidy(HALVING_INTERVAL),
            Amount::try_from_i64(2_500_000_000)
        );
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 2)),
            Amount::try_from_i64(1_250_000_000)
        );

        // after the 15th halving: 76_293 satoshis
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 15)),
            Amount::try_from_i64(76_293)
        );

        // after the 32nd halving: 1 satoshi
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 32)),
            Amount::try_from_i64(1)
        );

        // after the 33rd halving and beyond: zero, no errors
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 33)),
            Amount::try_from_i64(0)
        );
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 63)),
            Amount::try_from_i64(0)
        );
        assert_eq!(
            block_subsidy(Height(HALVING_INTERVAL.0 * 64)),
            Amount::try_from_i64(0)
        );
    }

    #[test]
    fn block_value_adds_fees_to_subsidy() {
        node_test::init();

        let fees = Amount::try_from_i64(12_345).unwrap();
        assert_eq!(
            block_value(fees, Height(0)),
            Amount::try_from_i64(5_000_012_345)
        );
    }
}
