//! A typed amount of the base currency unit, bounded the way consensus requires.

use std::{
    fmt, io,
    marker::PhantomData,
    ops::{Add, Sub},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serialization::{BitcoinDeserialize, BitcoinSerialize, SerializationError};

/// One coin, expressed in the base unit (satoshis).
pub const COIN: i64 = 100_000_000;

/// One hundredth of a coin.
pub const CENT: i64 = COIN / 100;

/// The maximum number of coins that will ever be created, in base units.
pub const MAX_MONEY: i64 = 21_000_000 * COIN;

/// Marker for `Amount`s that may be negative (fee deltas, for instance).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NegativeAllowed;

/// Marker for `Amount`s that must be non-negative (an output's value).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NonNegative;

/// An error converting a raw integer into a constrained [`Amount`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("amount {0} is outside the valid range for a NonNegative amount")]
    Negative(i64),
    #[error("amount {0} exceeds the maximum possible supply of {1}")]
    TooLarge(i64, i64),
}

/// A signed base-unit quantity, constrained by `C` to the range consensus allows.
///
/// Rather than scattering `value >= 0 && value <= MAX_MONEY` checks through
/// validation code, the constraint is baked into the type so an
/// `Amount<NonNegative>` can't even be constructed out of range.
#[derive(Copy, Clone, Eq, PartialEq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Amount<C = NegativeAllowed>(i64, PhantomData<C>);

impl<C> fmt::Debug for Amount<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Amount").field(&self.0).finish()
    }
}

impl Amount<NonNegative> {
    pub fn try_from_i64(value: i64) -> Result<Self, AmountError> {
        if value < 0 {
            Err(AmountError::Negative(value))
        } else if value > MAX_MONEY {
            Err(AmountError::TooLarge(value, MAX_MONEY))
        } else {
            Ok(Amount(value, PhantomData))
        }
    }
}

impl Amount<NegativeAllowed> {
    pub fn try_from_i64(value: i64) -> Result<Self, AmountError> {
        if value.abs() > MAX_MONEY {
            Err(AmountError::TooLarge(value, MAX_MONEY))
        } else {
            Ok(Amount(value, PhantomData))
        }
    }
}

impl<C> Amount<C> {
    pub fn zero() -> Self {
        Amount(0, PhantomData)
    }

    pub fn to_i64(self) -> i64 {
        self.0
    }
}

impl Amount<NonNegative> {
    pub fn constrain<C2>(self) -> Result<Amount<C2>, AmountError>
    where
        Amount<C2>: TryFromI64,
    {
        Amount::<C2>::try_from_i64(self.0)
    }
}

/// Helper so generic `constrain` calls can dispatch to the right constructor.
pub trait TryFromI64: Sized {
    fn try_from_i64(value: i64) -> Result<Self, AmountError>;
}
impl TryFromI64 for Amount<NonNegative> {
    fn try_from_i64(value: i64) -> Result<Self, AmountError> {
        Amount::<NonNegative>::try_from_i64(value)
    }
}
impl TryFromI64 for Amount<NegativeAllowed> {
    fn try_from_i64(value: i64) -> Result<Self, AmountError> {
        Amount::<NegativeAllowed>::try_from_i64(value)
    }
}

impl Add for Amount<NegativeAllowed> {
    type Output = Amount<NegativeAllowed>;
    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0, PhantomData)
    }
}
impl Sub for Amount<NegativeAllowed> {
    type Output = Amount<NegativeAllowed>;
    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0, PhantomData)
    }
}

impl<C> From<Amount<C>> for i64 {
    fn from(amount: Amount<C>) -> i64 {
        amount.0
    }
}

impl From<Amount<NonNegative>> for Amount<NegativeAllowed> {
    fn from(amount: Amount<NonNegative>) -> Self {
        Amount(amount.0, PhantomData)
    }
}

impl<C> BitcoinSerialize for Amount<C> {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Amount<NonNegative> {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let value = i64::bitcoin_deserialize(reader)?;
        Amount::try_from_i64(value).map_err(|_| SerializationError::Parse("amount out of range"))
    }
}

impl BitcoinDeserialize for Amount<NegativeAllowed> {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        let value = i64::bitcoin_deserialize(reader)?;
        Amount::try_from_i64(value).map_err(|_| SerializationError::Parse("amount out of range"))
    }
}

#[cfg(any(test, feature = "proptest-impl"))]
mod arbitrary {
    use proptest::prelude::*;

    use super::*;

    impl Arbitrary for Amount<NonNegative> {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            (0..=MAX_MONEY)
                .prop_map(|v| Amount::try_from_i64(v).expect("in range"))
                .boxed()
        }
    }

    impl Arbitrary for Amount<NegativeAllowed> {
        type Parameters = ();
        type Strategy = BoxedStrategy<Self>;

        fn arbitrary_with(_args: ()) -> Self::Strategy {
            (-MAX_MONEY..=MAX_MONEY)
                .prop_map(|v| Amount::try_from_i64(v).expect("in range"))
                .boxed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_nonnegative() {
        node_test::init();
        assert!(Amount::<NonNegative>::try_from_i64(-1).is_err());
    }

    #[test]
    fn rejects_above_max_money() {
        node_test::init();
        assert!(Amount::<NonNegative>::try_from_i64(MAX_MONEY + 1).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        node_test::init();
        assert!(Amount::<NonNegative>::try_from_i64(0).is_ok());
        assert!(Amount::<NonNegative>::try_from_i64(MAX_MONEY).is_ok());
    }
}
