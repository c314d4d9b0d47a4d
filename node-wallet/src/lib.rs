//! The wallet: a key store plus the subset of the chain's transactions that
//! touch those keys, coin selection, and the supporting-transaction chain a
//! locally built transaction needs to relay without a full node on the
//! other end.

mod coin_selection;
mod error;
mod key_store;
mod merkle_tx;
mod wallet;

pub use coin_selection::Coin;
pub use error::WalletError;
pub use key_store::KeyStore;
pub use merkle_tx::{Inclusion, MerkleTx, WalletMeta, WalletTx};
pub use wallet::Wallet;
