//! The in-memory pool of unconfirmed, individually-valid transactions.

use std::collections::HashMap;
use std::sync::Arc;

use node_chain::{
    amount::{Amount, NonNegative},
    block::Height,
    transaction::{Hash as TxHash, Transaction},
    transparent::{Input, OutPoint},
};
use node_consensus::{check_transaction, connect_inputs, PreviousOutput, PreviousOutputLookup};

use crate::error::MempoolError;

/// `byHash`/`byOutpoint`: the set of mempool transactions, and an index from
/// every outpoint they claim back to the claiming transaction.
#[derive(Debug, Default)]
pub struct Mempool {
    by_hash: HashMap<TxHash, Arc<Transaction>>,
    by_outpoint: HashMap<OutPoint, TxHash>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    pub fn contains(&self, hash: &TxHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn get(&self, hash: &TxHash) -> Option<Arc<Transaction>> {
        self.by_hash.get(hash).cloned()
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Arc<Transaction>> {
        self.by_hash.values()
    }

    /// `AcceptToMemoryPool(T)`. Validates `tx` against `chain` (the
    /// persisted UTXO set) with this pool's own unconfirmed outputs and
    /// claims layered on top, applies the first-input replacement rule
    /// against any conflicting mempool transaction, and on success inserts
    /// `tx` (evicting the transaction it replaced, if any).
    pub fn accept<L: PreviousOutputLookup>(
        &mut self,
        tx: Arc<Transaction>,
        chain: &L,
        height: Height,
        min_fee: Amount<NonNegative>,
    ) -> Result<Amount<NonNegative>, MempoolError> {
        if tx.is_coinbase() {
            return Err(MempoolError::CoinbaseNotAllowed);
        }

        check_transaction(&tx)?;

        let hash = tx.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(MempoolError::AlreadyKnown);
        }

        let evicting = self.find_replacement_target(&tx)?;

        let fee = {
            let mut scratch = ScratchLookup {
                mempool: self,
                chain,
                evicting,
                claimed: HashMap::new(),
            };
            connect_inputs(&tx, &mut scratch, height, min_fee)?
        };

        if let Some(old_hash) = evicting {
            self.remove(&old_hash);
        }

        for input in tx.inputs.iter() {
            if let Input::PrevOut { outpoint, .. } = input {
                self.by_outpoint.insert(*outpoint, hash);
            }
        }
        self.by_hash.insert(hash, tx);

        metrics::gauge!("mempool.size", self.by_hash.len() as _);

        Ok(fee)
    }

    /// Removes `hash` from the pool, if present, freeing the outpoints it
    /// had claimed.
    pub fn remove(&mut self, hash: &TxHash) -> Option<Arc<Transaction>> {
        let tx = self.by_hash.remove(hash)?;
        for input in tx.inputs.iter() {
            if let Input::PrevOut { outpoint, .. } = input {
                if self.by_outpoint.get(outpoint) == Some(hash) {
                    self.by_outpoint.remove(outpoint);
                }
            }
        }
        Some(tx)
    }

    /// Removes every transaction in `confirmed` from the pool, the way a
    /// newly connected block's transactions are dropped from it.
    pub fn remove_confirmed(&mut self, confirmed: &[Arc<Transaction>]) {
        for tx in confirmed {
            self.remove(&tx.hash());
        }
    }

    /// Checks whether `tx` conflicts with an existing mempool transaction,
    /// and if so, whether the conflict satisfies the first-input
    /// replacement rule. Returns the hash of the transaction to evict, or
    /// `None` if `tx` doesn't conflict with anything.
    fn find_replacement_target(&self, tx: &Transaction) -> Result<Option<TxHash>, MempoolError> {
        let mut conflict = None;

        for input in tx.inputs.iter() {
            if let Input::PrevOut { outpoint, .. } = input {
                if let Some(&claimant) = self.by_outpoint.get(outpoint) {
                    match conflict {
                        None => conflict = Some(claimant),
                        Some(existing) if existing == claimant => {}
                        Some(_) => return Err(MempoolError::ReplacementRejected),
                    }
                }
            }
        }

        let old_hash = match conflict {
            Some(hash) => hash,
            None => return Ok(None),
        };

        let first_outpoint = match tx.inputs.get(0) {
            Some(Input::PrevOut { outpoint, .. }) => *outpoint,
            _ => return Err(MempoolError::ReplacementRejected),
        };
        if self.by_outpoint.get(&first_outpoint) != Some(&old_hash) {
            return Err(MempoolError::ReplacementRejected);
        }

        let old = self
            .by_hash
            .get(&old_hash)
            .ok_or(MempoolError::ReplacementRejected)?;
        if !is_newer_than(tx, old) {
            return Err(MempoolError::ReplacementRejected);
        }

        for input in tx.inputs.iter() {
            if let Input::PrevOut { outpoint, .. } = input {
                if self.by_outpoint.get(outpoint) != Some(&old_hash) {
                    return Err(MempoolError::ReplacementRejected);
                }
            }
        }

        Ok(Some(old_hash))
    }
}

/// `T.IsNewerThan(T_old)`: both transactions claim the same prevouts at
/// every index, at least one of `old`'s sequence numbers is strictly lower
/// than `tx`'s at the same index, and none of `tx`'s is strictly lower than
/// `old`'s.
fn is_newer_than(tx: &Transaction, old: &Transaction) -> bool {
    if tx.inputs.len() != old.inputs.len() {
        return false;
    }

    let mut old_has_lower = false;
    for (new_input, old_input) in tx.inputs.iter().zip(old.inputs.iter()) {
        let (new_outpoint, new_sequence) = match new_input {
            Input::PrevOut {
                outpoint, sequence, ..
            } => (*outpoint, *sequence),
            Input::Coinbase { .. } => return false,
        };
        let (old_outpoint, old_sequence) = match old_input {
            Input::PrevOut {
                outpoint, sequence, ..
            } => (*outpoint, *sequence),
            Input::Coinbase { .. } => return false,
        };

        if new_outpoint != old_outpoint {
            return false;
        }
        if new_sequence < old_sequence {
            return false;
        }
        if old_sequence < new_sequence {
            old_has_lower = true;
        }
    }

    old_has_lower
}

/// The "scratch pool" `ConnectInputs` validates a would-be mempool entry
/// against: unconfirmed outputs created by transactions already in the
/// pool, layered over the persisted UTXO set. Has no side effects on
/// either; outpoints this transaction's own inputs claim are tracked only
/// in-memory, for the duration of one `accept` call.
struct ScratchLookup<'a, L> {
    mempool: &'a Mempool,
    chain: &'a L,
    /// The transaction being replaced, if any -- its claims don't count as
    /// conflicts since it's about to be evicted.
    evicting: Option<TxHash>,
    claimed: HashMap<OutPoint, TxHash>,
}

impl<'a, L: PreviousOutputLookup> ScratchLookup<'a, L> {
    fn already_claimed(&self, outpoint: &OutPoint) -> bool {
        if self.claimed.contains_key(outpoint) {
            return true;
        }
        match self.mempool.by_outpoint.get(outpoint) {
            Some(claimant) => Some(*claimant) != self.evicting,
            None => false,
        }
    }
}

impl<'a, L: PreviousOutputLookup> PreviousOutputLookup for ScratchLookup<'a, L> {
    fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
        if let Some(tx) = self.mempool.by_hash.get(&outpoint.hash) {
            let output = tx.outputs.get(outpoint.index as usize)?.clone();
            return Some(PreviousOutput {
                output,
                is_coinbase: false,
                height: Height(0),
                spent: self.already_claimed(outpoint),
            });
        }

        let mut previous = self.chain.find(outpoint)?;
        if self.already_claimed(outpoint) {
            previous.spent = true;
        }
        Some(previous)
    }

    fn mark_spent(&mut self, outpoint: &OutPoint, spender: TxHash) {
        self.claimed.insert(*outpoint, spender);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::transaction::LockTime;
    use node_chain::transparent::{Output, Script};
    use std::collections::HashMap as StdHashMap;

    struct EmptyChain;
    impl PreviousOutputLookup for EmptyChain {
        fn find(&self, _outpoint: &OutPoint) -> Option<PreviousOutput> {
            None
        }
        fn mark_spent(&mut self, _outpoint: &OutPoint, _spender: TxHash) {}
    }

    struct MapChain(StdHashMap<OutPoint, PreviousOutput>);
    impl PreviousOutputLookup for MapChain {
        fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
            self.0.get(outpoint).cloned()
        }
        fn mark_spent(&mut self, outpoint: &OutPoint, _spender: TxHash) {
            if let Some(entry) = self.0.get_mut(outpoint) {
                entry.spent = true;
            }
        }
    }

    fn anyone_can_spend() -> Script {
        Script(vec![0x51])
    }

    fn spending_tx(outpoint: OutPoint, sequence: u32, out_value: i64) -> Transaction {
        Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint,
                unlock_script: Script(vec![]),
                sequence,
            }],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(out_value).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        )
    }

    fn funded_outpoint() -> (OutPoint, MapChain) {
        let outpoint = OutPoint {
            hash: TxHash([9; 32]),
            index: 0,
        };
        let mut map = StdHashMap::new();
        map.insert(
            outpoint,
            PreviousOutput {
                output: Output {
                    value: Amount::try_from_i64(1_000).unwrap(),
                    lock_script: anyone_can_spend(),
                },
                is_coinbase: false,
                height: Height(0),
                spent: false,
            },
        );
        (outpoint, MapChain(map))
    }

    #[test]
    fn rejects_loose_coinbase() {
        node_test::init();
        let mut pool = Mempool::new();
        let coinbase = Transaction::new(
            1,
            vec![Input::Coinbase {
                height: None,
                data: node_chain::transparent::CoinbaseData(vec![0; 2]),
                sequence: 0xffff_ffff,
            }],
            vec![Output {
                value: Amount::try_from_i64(50).unwrap(),
                lock_script: Script(vec![]),
            }],
            LockTime::Height(Height(0)),
        );
        let chain = EmptyChain;
        assert_eq!(
            pool.accept(Arc::new(coinbase), &chain, Height(1), Amount::zero()),
            Err(MempoolError::CoinbaseNotAllowed)
        );
    }

    #[test]
    fn accepts_a_spendable_transaction() {
        node_test::init();
        let mut pool = Mempool::new();
        let (outpoint, chain) = funded_outpoint();
        let tx = Arc::new(spending_tx(outpoint, 0xffff_ffff, 900));

        let fee = pool
            .accept(tx.clone(), &chain, Height(1), Amount::zero())
            .unwrap();
        assert_eq!(fee.to_i64(), 100);
        assert!(pool.contains(&tx.hash()));
        assert_eq!(pool.by_outpoint.get(&outpoint), Some(&tx.hash()));
    }

    #[test]
    fn rejects_a_second_spend_of_the_same_outpoint() {
        node_test::init();
        let mut pool = Mempool::new();
        let (outpoint, chain) = funded_outpoint();
        let first = Arc::new(spending_tx(outpoint, 5, 900));
        pool.accept(first, &chain, Height(1), Amount::zero()).unwrap();

        // Same sequence number as the original: not strictly newer, so the
        // replacement rule rejects it.
        let second = Arc::new(spending_tx(outpoint, 5, 800));
        assert_eq!(
            pool.accept(second, &chain, Height(1), Amount::zero()),
            Err(MempoolError::ReplacementRejected)
        );
    }

    #[test]
    fn replaces_with_a_strictly_newer_transaction() {
        node_test::init();
        let mut pool = Mempool::new();
        let (outpoint, chain) = funded_outpoint();
        let first = Arc::new(spending_tx(outpoint, 0, 900));
        pool.accept(first.clone(), &chain, Height(1), Amount::zero())
            .unwrap();

        let second = Arc::new(spending_tx(outpoint, 1, 800));
        pool.accept(second.clone(), &chain, Height(1), Amount::zero())
            .unwrap();

        assert!(!pool.contains(&first.hash()));
        assert!(pool.contains(&second.hash()));
    }
}
