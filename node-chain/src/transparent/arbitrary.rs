use proptest::{collection::vec, prelude::*};

use crate::LedgerState;

use super::{CoinbaseData, Input, OutPoint, Script};

impl Arbitrary for Script {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        vec(any::<u8>(), 0..100).prop_map(Script).boxed()
    }
}

impl Arbitrary for CoinbaseData {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        vec(any::<u8>(), 0..95).prop_map(CoinbaseData).boxed()
    }
}

impl Input {
    /// A strategy for a single non-coinbase input.
    fn prevout_strategy() -> BoxedStrategy<Input> {
        (any::<OutPoint>(), any::<Script>(), any::<u32>())
            .prop_map(|(outpoint, unlock_script, sequence)| Input::PrevOut {
                outpoint,
                unlock_script,
                sequence,
            })
            .boxed()
    }

    /// A strategy for a single coinbase input.
    fn coinbase_strategy() -> BoxedStrategy<Input> {
        (any::<CoinbaseData>(), any::<u32>())
            .prop_map(|(data, sequence)| Input::Coinbase {
                height: None,
                data,
                sequence,
            })
            .boxed()
    }

    /// A strategy for a `Vec<Input>` with up to `max` entries. If
    /// `ledger_state.is_coinbase`, the first entry is always a coinbase
    /// input and no others are generated, matching the one-coinbase-per-
    /// transaction invariant.
    pub fn vec_strategy(ledger_state: LedgerState, max: usize) -> BoxedStrategy<Vec<Input>> {
        if ledger_state.is_coinbase {
            Input::coinbase_strategy().prop_map(|input| vec![input]).boxed()
        } else {
            vec(Input::prevout_strategy(), 1..max.max(2)).boxed()
        }
    }
}

impl Arbitrary for Input {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: ()) -> Self::Strategy {
        prop_oneof![Input::prevout_strategy(), Input::coinbase_strategy()].boxed()
    }
}
