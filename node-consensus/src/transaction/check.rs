//! `CheckTransaction`: the context-free half of transaction validation.

use chrono::{DateTime, Utc};
use node_chain::{
    amount::{Amount, NonNegative, MAX_MONEY},
    block::Height,
    transaction::Transaction,
    transparent::Input,
};

use crate::error::TransactionError;

/// The allowed length range for a coinbase input's scriptSig.
pub const COINBASE_SCRIPT_LEN: std::ops::RangeInclusive<usize> = 2..=100;

/// Checks that the transaction has at least one input and one output.
pub fn has_inputs_and_outputs(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        Err(TransactionError::NoInputs)
    } else if tx.outputs.is_empty() {
        Err(TransactionError::NoOutputs)
    } else {
        Ok(())
    }
}

/// Checks that every output amount is non-negative (guaranteed by the type,
/// here for documentation) and that the outputs don't sum past the money
/// supply cap.
pub fn outputs_are_valid(tx: &Transaction) -> Result<(), TransactionError> {
    let mut total: i64 = 0;
    for output in &tx.outputs {
        total = total
            .checked_add(output.value.to_i64())
            .ok_or(TransactionError::OutputsOverflow)?;
        if total > MAX_MONEY {
            return Err(TransactionError::OutputsOverflow);
        }
    }
    // Constructing the total as an `Amount` re-checks the same bound and
    // keeps this function's result tied to the type used everywhere else.
    Amount::<NonNegative>::try_from_i64(total)?;
    Ok(())
}

/// If `tx` is a coinbase transaction, checks its scriptSig length falls in
/// [`COINBASE_SCRIPT_LEN`].
pub fn coinbase_script_length_is_valid(tx: &Transaction) -> Result<(), TransactionError> {
    if let Some(Input::Coinbase { data, .. }) = tx.inputs.get(0) {
        if tx.is_coinbase() {
            let len = data.as_ref().len();
            if !COINBASE_SCRIPT_LEN.contains(&len) {
                return Err(TransactionError::BadCoinbaseScriptLength(len));
            }
        }
    }
    Ok(())
}

/// Checks that every non-coinbase input references a non-null outpoint: a
/// real previous transaction hash, and an index that isn't the
/// all-ones sentinel reserved for coinbase inputs.
pub fn inputs_reference_nonnull_outpoints(tx: &Transaction) -> Result<(), TransactionError> {
    if tx.is_coinbase() {
        return Ok(());
    }
    for input in &tx.inputs {
        if let Input::PrevOut { outpoint, .. } = input {
            if outpoint.hash.0 == [0u8; 32] && outpoint.index == u32::MAX {
                return Err(TransactionError::NullPrevout);
            }
        }
    }
    Ok(())
}

/// `IsFinalTx`: whether `tx` may appear in a block built on top of `height`
/// at `time`. A zero locktime is always final; otherwise `tx` is final once
/// its locktime is satisfied, or -- regardless of locktime -- once every
/// input has opted out of relative time locking via the all-ones sequence
/// number.
pub fn is_final(tx: &Transaction, height: Height, time: DateTime<Utc>) -> bool {
    if tx.locktime.to_u32() == 0 {
        return true;
    }
    if tx.locktime.is_satisfied_by(height, time) {
        return true;
    }
    tx.inputs.iter().all(|input| match input {
        Input::PrevOut { sequence, .. } => *sequence == 0xffff_ffff,
        Input::Coinbase { sequence, .. } => *sequence == 0xffff_ffff,
    })
}

/// `CheckTransaction(T)`: every context-free rule a transaction must satisfy
/// on its own, independent of the UTXO set it spends.
pub fn check_transaction(tx: &Transaction) -> Result<(), TransactionError> {
    has_inputs_and_outputs(tx)?;
    outputs_are_valid(tx)?;
    coinbase_script_length_is_valid(tx)?;
    inputs_reference_nonnull_outpoints(tx)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::block::Height;
    use node_chain::transaction::LockTime;
    use node_chain::transparent::{CoinbaseData, OutPoint, Output, Script};

    fn coinbase_tx(data_len: usize) -> Transaction {
        Transaction::new(
            1,
            vec![Input::Coinbase {
                height: None,
                data: CoinbaseData(vec![0u8; data_len]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(5_000_000_000).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        )
    }

    #[test]
    fn empty_transaction_is_rejected() {
        node_test::init();
        let tx = Transaction::new(1, vec![], vec![], LockTime::Height(Height(0)));
        assert_eq!(check_transaction(&tx), Err(TransactionError::NoInputs));
    }

    #[test]
    fn coinbase_script_length_must_be_in_range() {
        node_test::init();
        assert!(coinbase_script_length_is_valid(&coinbase_tx(10)).is_ok());
        assert_eq!(
            coinbase_script_length_is_valid(&coinbase_tx(1)),
            Err(TransactionError::BadCoinbaseScriptLength(1))
        );
        assert_eq!(
            coinbase_script_length_is_valid(&coinbase_tx(101)),
            Err(TransactionError::BadCoinbaseScriptLength(101))
        );
    }

    #[test]
    fn null_prevout_is_rejected_on_a_non_coinbase_input() {
        node_test::init();
        let tx = Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint {
                    hash: node_chain::transaction::Hash([0u8; 32]),
                    index: u32::MAX,
                },
                unlock_script: Script(vec![]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(1).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        );
        assert_eq!(
            inputs_reference_nonnull_outpoints(&tx),
            Err(TransactionError::NullPrevout)
        );
    }
}
