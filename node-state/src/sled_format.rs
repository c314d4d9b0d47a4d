//! Bridges the node-chain consensus wire format onto `sled`'s raw byte trees.
//!
//! Most types round-trip through their existing `BitcoinSerialize`/
//! `BitcoinDeserialize` impls. `block::Height` is the exception: it's used as
//! a tree key we iterate in order (`FinalizedState::tip`), so it's encoded
//! big-endian rather than the wire format's little-endian, to make sled's
//! lexicographic byte ordering agree with numeric height ordering.

use std::{convert::TryInto, sync::Arc};

use node_chain::{
    block::{self, Block},
    transaction::{self, Transaction},
    transparent,
    BitcoinDeserialize, BitcoinSerialize,
};

use crate::BoxError;

/// Converts a value into the bytes a `sled::Tree` key or value should hold.
pub trait SledSerialize {
    fn as_sled_bytes(&self) -> Result<Vec<u8>, BoxError>;
}

/// Reconstructs a value from bytes a `sled::Tree` returned.
pub trait SledDeserialize: Sized {
    fn from_sled_bytes(bytes: &[u8]) -> Result<Self, BoxError>;
}

/// Reconstructs a value from a `sled::IVec`, for callers (e.g. tree
/// iterators) that already hold one rather than calling `zs_get`.
pub trait FromSled: Sized {
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError>;
}

impl<T: SledDeserialize> FromSled for T {
    fn from_ivec(bytes: sled::IVec) -> Result<Self, BoxError> {
        T::from_sled_bytes(&bytes)
    }
}

impl<T: SledSerialize> SledSerialize for &T {
    fn as_sled_bytes(&self) -> Result<Vec<u8>, BoxError> {
        (**self).as_sled_bytes()
    }
}

/// Delegates `SledSerialize`/`SledDeserialize` to an existing wire-format impl.
macro_rules! impl_wire_sled {
    ($ty:ty) => {
        impl SledSerialize for $ty {
            fn as_sled_bytes(&self) -> Result<Vec<u8>, BoxError> {
                let mut out = Vec::new();
                self.bitcoin_serialize(&mut out)?;
                Ok(out)
            }
        }

        impl SledDeserialize for $ty {
            fn from_sled_bytes(mut bytes: &[u8]) -> Result<Self, BoxError> {
                Ok(<$ty>::bitcoin_deserialize(&mut bytes)?)
            }
        }
    };
}

impl_wire_sled!(block::Hash);
impl_wire_sled!(transaction::Hash);
impl_wire_sled!(transparent::OutPoint);
impl_wire_sled!(transparent::Output);
impl_wire_sled!(Block);
impl_wire_sled!(Transaction);
impl_wire_sled!(Arc<Block>);
impl_wire_sled!(Arc<Transaction>);

impl SledSerialize for block::Height {
    fn as_sled_bytes(&self) -> Result<Vec<u8>, BoxError> {
        Ok(self.0.to_be_bytes().to_vec())
    }
}

impl SledDeserialize for block::Height {
    fn from_sled_bytes(bytes: &[u8]) -> Result<Self, BoxError> {
        let array: [u8; 4] = bytes
            .try_into()
            .map_err(|_| "sled height key was not 4 bytes")?;
        Ok(block::Height(u32::from_be_bytes(array)))
    }
}

/// Extension methods for reading/writing domain types on a raw `sled::Tree`.
pub trait SledTreeExt {
    fn zs_insert<K: SledSerialize, V: SledSerialize>(
        &self,
        key: K,
        value: V,
    ) -> Result<(), BoxError>;

    fn zs_get<K: SledSerialize, V: SledDeserialize>(
        &self,
        key: &K,
    ) -> Result<Option<V>, BoxError>;

    fn zs_remove<K: SledSerialize>(&self, key: &K) -> Result<(), BoxError>;
}

impl SledTreeExt for sled::Tree {
    fn zs_insert<K: SledSerialize, V: SledSerialize>(
        &self,
        key: K,
        value: V,
    ) -> Result<(), BoxError> {
        self.insert(key.as_sled_bytes()?, value.as_sled_bytes()?)?;
        Ok(())
    }

    fn zs_get<K: SledSerialize, V: SledDeserialize>(
        &self,
        key: &K,
    ) -> Result<Option<V>, BoxError> {
        match self.get(key.as_sled_bytes()?)? {
            Some(bytes) => Ok(Some(V::from_sled_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn zs_remove<K: SledSerialize>(&self, key: &K) -> Result<(), BoxError> {
        self.remove(key.as_sled_bytes()?)?;
        Ok(())
    }
}
