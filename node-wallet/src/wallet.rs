//! The wallet tracker: `AddToWalletIfMine`, `AddSupportingTransactions`, and
//! `SelectCoins` brought together over a single `mapWallet`-equivalent.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use node_chain::amount::{Amount, NonNegative};
use node_chain::block;
use node_chain::transaction::{Hash as TxHash, Transaction};
use node_chain::transparent::{Input, KeyPair, OutPoint, Script};
use node_script::signer::match_template;

use crate::coin_selection::{select_coins, Coin};
use crate::error::WalletError;
use crate::key_store::KeyStore;
use crate::merkle_tx::{Inclusion, MerkleTx, WalletMeta, WalletTx};

/// How deep `AddSupportingTransactions` walks the ancestor chain.
const SUPPORTING_TX_DEPTH: usize = 3;

/// Owns a key store and every transaction relevant to those keys.
#[derive(Default)]
pub struct Wallet {
    keys: KeyStore,
    transactions: HashMap<TxHash, WalletTx>,
}

impl Wallet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_key<R: rand_core::RngCore + rand_core::CryptoRng>(
        &mut self,
        rng: &mut R,
    ) -> Vec<u8> {
        self.keys.generate_key(rng)
    }

    pub fn add_key(&mut self, key_pair: KeyPair) -> Vec<u8> {
        self.keys.add_key(key_pair)
    }

    pub fn find_key(&self, public_key: &[u8]) -> Option<&KeyPair> {
        self.keys.find(public_key)
    }

    pub fn find_key_by_hash(&self, public_key_hash: &[u8; 20]) -> Option<&KeyPair> {
        self.keys.find_by_hash(public_key_hash)
    }

    pub fn is_mine(&self, lock_script: &Script) -> bool {
        match match_template(lock_script) {
            Ok(template) => self.keys.is_mine(&template),
            Err(_) => false,
        }
    }

    pub fn get(&self, hash: &TxHash) -> Option<&WalletTx> {
        self.transactions.get(hash)
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    fn spends_our_output(&self, input: &Input) -> bool {
        let outpoint = match input {
            Input::PrevOut { outpoint, .. } => outpoint,
            Input::Coinbase { .. } => return false,
        };
        self.transactions
            .get(&outpoint.hash)
            .and_then(|prev| prev.merkle.tx.outputs.get(outpoint.index as usize))
            .map(|output| self.is_mine(&output.lock_script))
            .unwrap_or(false)
    }

    /// `AddToWalletIfMine` + `AddToWallet`'s merge step. Returns whether the
    /// transaction was relevant (and so stored or updated).
    pub fn add_transaction(
        &mut self,
        tx: Arc<Transaction>,
        inclusion: Option<Inclusion>,
        from_me: bool,
        received_time: DateTime<Utc>,
    ) -> bool {
        let hash = tx.hash();
        let is_relevant = self.transactions.contains_key(&hash)
            || tx
                .outputs
                .iter()
                .any(|output| self.is_mine(&output.lock_script))
            || tx.inputs.iter().any(|input| self.spends_our_output(input));

        if !is_relevant {
            return false;
        }

        match self.transactions.get_mut(&hash) {
            Some(existing) => {
                if inclusion.is_some() {
                    existing.merkle.inclusion = inclusion;
                }
                existing.wallet_meta.from_me |= from_me;
            }
            None => {
                self.transactions.insert(
                    hash,
                    WalletTx {
                        merkle: MerkleTx::new(tx.clone(), inclusion),
                        wallet_meta: WalletMeta {
                            received_time,
                            from_me,
                            spent: false,
                        },
                    },
                );
            }
        }

        for input in tx.inputs.iter() {
            if let Input::PrevOut { outpoint, .. } = input {
                if let Some(prev) = self.transactions.get_mut(&outpoint.hash) {
                    prev.wallet_meta.spent = true;
                }
            }
        }

        true
    }

    /// `AddSupportingTransactions`: up to [`SUPPORTING_TX_DEPTH`] levels of
    /// ancestor transactions this wallet already knows about, for `vtxPrev`.
    pub fn add_supporting_transactions(&self, tx: &Transaction) -> Vec<Arc<Transaction>> {
        let mut supporting = Vec::new();
        let mut seen: HashSet<TxHash> = HashSet::new();
        let mut frontier: Vec<TxHash> = tx
            .inputs
            .iter()
            .filter_map(|input| match input {
                Input::PrevOut { outpoint, .. } => Some(outpoint.hash),
                Input::Coinbase { .. } => None,
            })
            .collect();

        for _ in 0..SUPPORTING_TX_DEPTH {
            if frontier.is_empty() {
                break;
            }
            let mut next_frontier = Vec::new();
            for hash in frontier {
                if !seen.insert(hash) {
                    continue;
                }
                let prev = match self.transactions.get(&hash) {
                    Some(prev) => prev,
                    None => continue,
                };
                for input in prev.merkle.tx.inputs.iter() {
                    if let Input::PrevOut { outpoint, .. } = input {
                        next_frontier.push(outpoint.hash);
                    }
                }
                supporting.push(prev.merkle.tx.clone());
            }
            frontier = next_frontier;
        }

        supporting
    }

    /// Every coin this wallet considers spendable right now: final, unspent,
    /// past coinbase maturity if applicable, and belonging to a known key.
    pub fn available_coins(&self, tip_height: block::Height, adjusted_time: DateTime<Utc>) -> Vec<Coin> {
        let mut coins = Vec::new();
        for wallet_tx in self.transactions.values() {
            if wallet_tx.wallet_meta.spent {
                continue;
            }
            if !wallet_tx.merkle.is_final(tip_height, adjusted_time) {
                continue;
            }
            if wallet_tx.merkle.blocks_to_maturity(tip_height) > 0 {
                continue;
            }
            let hash = wallet_tx.merkle.tx.hash();
            for (index, output) in wallet_tx.merkle.tx.outputs.iter().enumerate() {
                if self.is_mine(&output.lock_script) {
                    coins.push(Coin {
                        outpoint: OutPoint {
                            hash,
                            index: index as u32,
                        },
                        amount: output.value,
                    });
                }
            }
        }
        coins
    }

    pub fn balance(&self, tip_height: block::Height, adjusted_time: DateTime<Utc>) -> i64 {
        self.available_coins(tip_height, adjusted_time)
            .iter()
            .map(|coin| coin.amount.to_i64())
            .sum()
    }

    /// `SelectCoins`.
    pub fn select_coins(
        &self,
        target: Amount<NonNegative>,
        tip_height: block::Height,
        adjusted_time: DateTime<Utc>,
    ) -> Result<Vec<Coin>, WalletError> {
        let coins = self.available_coins(tip_height, adjusted_time);
        select_coins(&coins, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use node_chain::amount::{Amount, NonNegative};
    use node_chain::transaction::LockTime;
    use node_chain::transparent::Output;
    use rand::rngs::OsRng;

    /// A compressed pubkey is always 33 bytes, well under the single-byte
    /// push-length range, so this doesn't need the general-purpose encoder.
    fn lock_script_for(public_key: &[u8]) -> Script {
        let mut bytes = vec![public_key.len() as u8];
        bytes.extend_from_slice(public_key);
        bytes.push(0xac); // OP_CHECKSIG
        Script(bytes)
    }

    fn now() -> DateTime<Utc> {
        Utc.ymd(2026, 1, 1).and_hms(0, 0, 0)
    }

    #[test]
    fn pay_to_self_is_tracked_and_spendable() {
        node_test::init();
        let mut wallet = Wallet::new();
        let public_key = wallet.generate_key(&mut OsRng);

        let tx = Arc::new(Transaction::new(
            1,
            vec![],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(50_000).unwrap(),
                lock_script: lock_script_for(&public_key),
            }],
            LockTime::Height(block::Height(0)),
        ));

        assert!(wallet.add_transaction(tx.clone(), None, false, now()));
        assert_eq!(wallet.len(), 1);

        let coins = wallet.available_coins(block::Height(10), now());
        assert_eq!(coins.len(), 1);
        assert_eq!(coins[0].amount.to_i64(), 50_000);
    }

    #[test]
    fn spending_an_owned_output_marks_it_spent() {
        node_test::init();
        let mut wallet = Wallet::new();
        let public_key = wallet.generate_key(&mut OsRng);

        let funding = Arc::new(Transaction::new(
            1,
            vec![],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(50_000).unwrap(),
                lock_script: lock_script_for(&public_key),
            }],
            LockTime::Height(block::Height(0)),
        ));
        wallet.add_transaction(funding.clone(), None, false, now());

        let spend = Arc::new(Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint {
                    hash: funding.hash(),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![],
            LockTime::Height(block::Height(0)),
        ));
        assert!(wallet.add_transaction(spend, None, true, now()));

        assert!(wallet.available_coins(block::Height(10), now()).is_empty());
    }

    #[test]
    fn unrelated_transaction_is_not_tracked() {
        node_test::init();
        let mut wallet = Wallet::new();
        wallet.generate_key(&mut OsRng);

        let other_key = KeyPair::generate(&mut OsRng);
        let tx = Arc::new(Transaction::new(
            1,
            vec![],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(1_000).unwrap(),
                lock_script: lock_script_for(&other_key.public_key.serialize()),
            }],
            LockTime::Height(block::Height(0)),
        ));

        assert!(!wallet.add_transaction(tx, None, false, now()));
        assert!(wallet.is_empty());
    }

    #[test]
    fn supporting_transactions_walk_known_ancestors() {
        node_test::init();
        let mut wallet = Wallet::new();
        let public_key = wallet.generate_key(&mut OsRng);

        let grandparent = Arc::new(Transaction::new(
            1,
            vec![],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(10_000).unwrap(),
                lock_script: lock_script_for(&public_key),
            }],
            LockTime::Height(block::Height(0)),
        ));
        wallet.add_transaction(grandparent.clone(), None, false, now());

        let parent = Arc::new(Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint {
                    hash: grandparent.hash(),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(9_000).unwrap(),
                lock_script: lock_script_for(&public_key),
            }],
            LockTime::Height(block::Height(0)),
        ));
        wallet.add_transaction(parent.clone(), None, false, now());

        let child = Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint {
                    hash: parent.hash(),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![],
            LockTime::Height(block::Height(0)),
        );

        let supporting = wallet.add_supporting_transactions(&child);
        assert_eq!(supporting.len(), 2);
    }
}
