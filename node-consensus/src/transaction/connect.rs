//! `ConnectInputs`: validates a transaction's inputs against the outputs
//! they claim to spend, and computes the fee it pays.
//!
//! The outputs themselves -- and whether they've already been spent -- live
//! outside this crate, in whichever index is backing the current
//! connection: the persisted UTXO set (`node-state`, block context) or a
//! scratch pool (`node-mempool`, miner/mempool context). Both implement
//! [`PreviousOutputLookup`] so this function doesn't need to know which one
//! it's talking to.

use node_chain::{
    amount::{Amount, NonNegative},
    block::Height,
    transaction::{Hash as TxHash, Transaction},
    transparent::{Input, OutPoint, Output},
};
use node_script::verify_transaction_input;

use crate::error::TransactionError;

/// A previous output, together with the chain context `connect_inputs`
/// needs to enforce coinbase maturity and reject double-spends.
#[derive(Clone, Debug)]
pub struct PreviousOutput {
    /// The output itself: value and locking script.
    pub output: Output,
    /// Whether the transaction that created this output was a coinbase.
    pub is_coinbase: bool,
    /// The height of the block that created this output.
    pub height: Height,
    /// Whether this output has already been claimed by another input.
    pub spent: bool,
}

/// Supplies `connect_inputs` with the previous outputs a transaction spends.
pub trait PreviousOutputLookup {
    /// Looks up the output `outpoint` refers to, if this index has it.
    fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput>;

    /// Records that `outpoint` has been spent by `spender`.
    fn mark_spent(&mut self, outpoint: &OutPoint, spender: TxHash);
}

/// Validates every input of `tx` against `lookup`, then returns the fee
/// `tx` pays. `spending_height` is the height `tx` is being connected at
/// (the containing block's height in block context, or the height the
/// candidate block under construction would have in miner/mempool context).
///
/// Fails closed on the first invalid input: a missing previous output, an
/// immature coinbase spend, a double-spend, or a failing script. On
/// success, every spent outpoint has been marked spent in `lookup`.
pub fn connect_inputs<L: PreviousOutputLookup>(
    tx: &Transaction,
    lookup: &mut L,
    spending_height: Height,
    min_fee: Amount<NonNegative>,
) -> Result<Amount<NonNegative>, TransactionError> {
    let mut sum_in: i64 = 0;

    for (i, input) in tx.inputs.iter().enumerate() {
        let (outpoint, unlock_script) = match input {
            Input::PrevOut {
                outpoint,
                unlock_script,
                ..
            } => (outpoint, unlock_script),
            Input::Coinbase { .. } => continue,
        };

        let prev = lookup
            .find(outpoint)
            .ok_or(TransactionError::MissingPreviousOutput(i as u32))?;

        if prev.is_coinbase {
            let confirmations = spending_height.0.saturating_sub(prev.height.0);
            if confirmations < Height::COINBASE_MATURITY {
                return Err(TransactionError::ImmatureCoinbaseSpend(
                    i as u32,
                    Height::COINBASE_MATURITY,
                ));
            }
        }

        if prev.spent {
            return Err(TransactionError::AlreadySpent(i as u32));
        }

        verify_transaction_input(tx, i, unlock_script, &prev.output.lock_script)
            .map_err(|e| TransactionError::Script(i as u32, e))?;

        lookup.mark_spent(outpoint, tx.hash());

        sum_in = sum_in
            .checked_add(prev.output.value.to_i64())
            .ok_or(TransactionError::OutputsOverflow)?;
    }

    let sum_out: i64 = tx.outputs.iter().map(|o| o.value.to_i64()).sum();
    let fee = sum_in - sum_out;
    if fee < 0 {
        return Err(TransactionError::NegativeFee);
    }

    let fee = Amount::<NonNegative>::try_from_i64(fee)?;
    if fee.to_i64() < min_fee.to_i64() {
        return Err(TransactionError::FeeTooLow);
    }

    Ok(fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::transaction::LockTime;
    use node_chain::transparent::Script;
    use std::collections::HashMap;

    struct MapLookup(HashMap<OutPoint, PreviousOutput>);

    impl PreviousOutputLookup for MapLookup {
        fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
            self.0.get(outpoint).cloned()
        }
        fn mark_spent(&mut self, outpoint: &OutPoint, _spender: TxHash) {
            if let Some(entry) = self.0.get_mut(outpoint) {
                entry.spent = true;
            }
        }
    }

    fn anyone_can_spend_script() -> Script {
        Script(vec![0x51]) // OP_TRUE
    }

    fn spending_tx(outpoint: OutPoint, out_value: i64) -> Transaction {
        Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint,
                unlock_script: Script(vec![]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(out_value).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        )
    }

    #[test]
    fn rejects_missing_previous_output() {
        node_test::init();
        let mut lookup = MapLookup(HashMap::new());
        let tx = spending_tx(
            OutPoint {
                hash: TxHash([0u8; 32]),
                index: 0,
            },
            100,
        );
        assert_eq!(
            connect_inputs(&tx, &mut lookup, Height(0), Amount::zero()),
            Err(TransactionError::MissingPreviousOutput(0))
        );
    }

    #[test]
    fn rejects_double_spend() {
        node_test::init();
        let outpoint = OutPoint {
            hash: TxHash([1u8; 32]),
            index: 0,
        };
        let mut map = HashMap::new();
        map.insert(
            outpoint,
            PreviousOutput {
                output: Output {
                    value: Amount::try_from_i64(1_000).unwrap(),
                    lock_script: anyone_can_spend_script(),
                },
                is_coinbase: false,
                height: Height(0),
                spent: true,
            },
        );
        let mut lookup = MapLookup(map);
        let tx = spending_tx(outpoint, 500);
        assert_eq!(
            connect_inputs(&tx, &mut lookup, Height(1), Amount::zero()),
            Err(TransactionError::AlreadySpent(0))
        );
    }

    #[test]
    fn rejects_immature_coinbase_spend() {
        node_test::init();
        let outpoint = OutPoint {
            hash: TxHash([2u8; 32]),
            index: 0,
        };
        let mut map = HashMap::new();
        map.insert(
            outpoint,
            PreviousOutput {
                output: Output {
                    value: Amount::try_from_i64(1_000).unwrap(),
                    lock_script: anyone_can_spend_script(),
                },
                is_coinbase: true,
                height: Height(10),
                spent: false,
            },
        );
        let mut lookup = MapLookup(map);
        let tx = spending_tx(outpoint, 500);
        assert_eq!(
            connect_inputs(&tx, &mut lookup, Height(50), Amount::zero()),
            Err(TransactionError::ImmatureCoinbaseSpend(0, 100))
        );
    }

    #[test]
    fn accepts_and_computes_fee() {
        node_test::init();
        let outpoint = OutPoint {
            hash: TxHash([3u8; 32]),
            index: 0,
        };
        let mut map = HashMap::new();
        map.insert(
            outpoint,
            PreviousOutput {
                output: Output {
                    value: Amount::try_from_i64(1_000).unwrap(),
                    lock_script: anyone_can_spend_script(),
                },
                is_coinbase: false,
                height: Height(0),
                spent: false,
            },
        );
        let mut lookup = MapLookup(map);
        let tx = spending_tx(outpoint, 900);
        let fee = connect_inputs(&tx, &mut lookup, Height(1), Amount::zero()).unwrap();
        assert_eq!(fee.to_i64(), 100);
        assert!(lookup.0.get(&outpoint).unwrap().spent);
    }
}
