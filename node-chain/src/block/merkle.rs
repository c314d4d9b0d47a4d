//! The transaction Merkle tree and inclusion proofs.
//!
//! Construction follows the Bitcoin convention: transaction ids are hashed
//! pairwise, duplicating the last id in a level when it has an odd number of
//! entries, until a single root remains (CVE-2012-2459's duplication quirk is
//! preserved deliberately, matching every other Bitcoin-derived
//! implementation rather than "fixing" it here).

use std::{io, iter::FromIterator, sync::Arc};

use crate::{
    serialization::{sha256d, BitcoinDeserialize, BitcoinSerialize, SerializationError},
    transaction::Transaction,
};

/// The root of a transaction Merkle tree.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[cfg_attr(
    any(test, feature = "proptest-impl"),
    derive(proptest_derive::Arbitrary)
)]
pub struct Root(pub [u8; 32]);

impl std::fmt::Debug for Root {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut reversed = self.0;
        reversed.reverse();
        f.debug_tuple("merkle::Root")
            .field(&hex::encode(&reversed))
            .finish()
    }
}

impl BitcoinSerialize for Root {
    fn bitcoin_serialize<W: io::Write>(&self, target: W) -> Result<(), io::Error> {
        self.0.bitcoin_serialize(target)
    }
}

impl BitcoinDeserialize for Root {
    fn bitcoin_deserialize<R: io::Read>(reader: R) -> Result<Self, SerializationError> {
        Ok(Root(<[u8; 32]>::bitcoin_deserialize(reader)?))
    }
}

fn txid_bytes(tx: &Arc<Transaction>) -> [u8; 32] {
    let mut reversed = tx.hash().0;
    reversed.reverse();
    reversed
}

fn combine(left: &[u8; 32], right: &[u8; 32]) -> [u8; 32] {
    let mut writer = sha256d::Writer::default();
    io::Write::write_all(&mut writer, left).expect("writer is infallible");
    io::Write::write_all(&mut writer, right).expect("writer is infallible");
    writer.finish()
}

impl Root {
    /// Builds the Merkle root over `transactions`, in block order.
    ///
    /// Matches `FromIterator` below; provided directly so callers that
    /// already hold a slice don't need to re-collect it into an iterator.
    pub fn from_transactions(transactions: &[Arc<Transaction>]) -> Root {
        Root::from_iter(transactions.iter().cloned())
    }
}

impl FromIterator<Transaction> for Root {
    fn from_iter<T: IntoIterator<Item = Transaction>>(iter: T) -> Self {
        Root::from_iter(iter.into_iter().map(Arc::new))
    }
}

impl FromIterator<Arc<Transaction>> for Root {
    fn from_iter<T: IntoIterator<Item = Arc<Transaction>>>(iter: T) -> Self {
        let mut level: Vec<[u8; 32]> = iter.into_iter().map(|tx| txid_bytes(&tx)).collect();

        if level.is_empty() {
            return Root([0; 32]);
        }

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                let last = *level.last().expect("checked non-empty above");
                level.push(last);
            }
            level = level
                .chunks(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
        }

        Root(level[0])
    }
}

/// A proof that a transaction with a given id is included in a block's
/// Merkle tree, as a sequence of sibling hashes from leaf to root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InclusionProof {
    /// Sibling hashes, ordered from the leaf's level up to the root.
    pub siblings: Vec<[u8; 32]>,
    /// The index of the leaf among the (possibly duplicated) leaves, used to
    /// determine whether each sibling combines on the left or the right.
    pub leaf_index: usize,
}

impl Root {
    /// Builds an inclusion proof for the transaction at `index` in `transactions`.
    pub fn prove_inclusion(transactions: &[Arc<Transaction>], index: usize) -> Option<InclusionProof> {
        if index >= transactions.len() {
            return None;
        }

        let mut level: Vec<[u8; 32]> = transactions.iter().map(txid_bytes).collect();
        let mut siblings = Vec::new();
        let mut pos = index;

        while level.len() > 1 {
            if level.len() % 2 == 1 {
                let last = *level.last().expect("non-empty");
                level.push(last);
            }
            let sibling_pos = if pos % 2 == 0 { pos + 1 } else { pos - 1 };
            siblings.push(level[sibling_pos]);
            level = level
                .chunks(2)
                .map(|pair| combine(&pair[0], &pair[1]))
                .collect();
            pos /= 2;
        }

        Some(InclusionProof {
            siblings,
            leaf_index: index,
        })
    }

    /// Verifies that `txid` (in internal byte order) is included under `self`
    /// according to `proof`.
    pub fn verify_inclusion(&self, txid: [u8; 32], proof: &InclusionProof) -> bool {
        let mut reversed = txid;
        reversed.reverse();
        let mut current = reversed;
        let mut pos = proof.leaf_index;

        for sibling in &proof.siblings {
            current = if pos % 2 == 0 {
                combine(&current, sibling)
            } else {
                combine(sibling, &current)
            };
            pos /= 2;
        }

        current == self.0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        transaction::{LockTime, Transaction},
        transparent::{self, CoinbaseData},
    };

    fn dummy_tx(nonce: u32) -> Arc<Transaction> {
        Arc::new(Transaction::new(
            1,
            vec![transparent::Input::Coinbase {
                height: None,
                data: CoinbaseData(vec![nonce as u8]),
                sequence: nonce,
            }],
            vec![],
            LockTime::Height(crate::block::Height(0)),
        ))
    }

    #[test]
    fn single_transaction_root_is_its_own_hash() {
        node_test::init();
        let tx = dummy_tx(1);
        let root = Root::from_transactions(&[tx.clone()]);
        assert_eq!(root.0, txid_bytes(&tx));
    }

    #[test]
    fn odd_count_duplicates_last() {
        node_test::init();
        let txs = vec![dummy_tx(1), dummy_tx(2), dummy_tx(3)];
        let three = Root::from_transactions(&txs);
        let four = Root::from_transactions(&[txs[0].clone(), txs[1].clone(), txs[2].clone(), txs[2].clone()]);
        assert_eq!(three, four);
    }

    #[test]
    fn inclusion_proof_round_trips() {
        node_test::init();
        let txs = vec![dummy_tx(1), dummy_tx(2), dummy_tx(3), dummy_tx(4), dummy_tx(5)];
        let root = Root::from_transactions(&txs);
        for (i, tx) in txs.iter().enumerate() {
            let proof = Root::prove_inclusion(&txs, i).expect("index in range");
            assert!(root.verify_inclusion(txid_bytes(tx), &proof));
        }
    }
}
