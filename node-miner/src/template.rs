//! Candidate-block assembly: a fee-ordered mempool drain against a scratch
//! pool seeded from the persisted chain, topped with a coinbase paying a
//! freshly rolled wallet key.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use node_chain::{
    amount::{Amount, NonNegative},
    block::{self, Block, Header, MAX_BLOCK_BYTES},
    transaction::{Hash as TxHash, LockTime, Transaction},
    transparent::{CoinbaseData, Input, OutPoint, Output},
    work::difficulty::CompactDifficulty,
};
use node_consensus::block::subsidy::general::block_value;
use node_consensus::{connect_inputs, is_final, PreviousOutput, PreviousOutputLookup};
use node_mempool::Mempool;
use node_script::pay_to_pubkey_script;
use node_state::service::MiningContext;

use crate::error::MinerError;

/// `MAX_SIZE / 2`: the candidate block stops growing once it reaches half
/// the network's maximum block size.
pub const MAX_CANDIDATE_BYTES: u64 = MAX_BLOCK_BYTES / 2;

/// A block ready for nonce search: everything but the header's `time` and
/// `nonce`, which the search loop fills in per round.
pub struct BlockTemplate {
    pub previous_block_hash: block::Hash,
    pub height: block::Height,
    pub bits: CompactDifficulty,
    pub median_time_past: Option<DateTime<Utc>>,
    pub transactions: Vec<Arc<Transaction>>,
}

impl BlockTemplate {
    /// Builds this template's header at `time`, nonce zeroed; the search
    /// loop is the only thing that touches `nonce` from here.
    pub fn header_at(&self, time: DateTime<Utc>) -> Header {
        Header::new(
            1,
            self.previous_block_hash,
            block::merkle::Root::from_transactions(&self.transactions),
            time,
            self.bits,
            0,
        )
    }

    pub fn into_block(self, header: Header) -> Block {
        Block {
            header,
            transactions: self.transactions,
        }
    }
}

/// Drains `mempool` into a candidate block on top of `context`, attempting
/// `ConnectInputs` for each transaction against a scratch pool that starts
/// empty and grows as each included transaction's outputs become spendable
/// by later ones in the same block (`block=false, miner=true` context).
/// Transactions that fail validation, or would push the block size past
/// [`MAX_CANDIDATE_BYTES`], are skipped rather than aborting assembly.
pub fn assemble<L: PreviousOutputLookup>(
    context: &MiningContext,
    mempool: &Mempool,
    chain: &L,
    coinbase_public_key: Vec<u8>,
    extra_nonce: u64,
    min_fee: Amount<NonNegative>,
    adjusted_time: DateTime<Utc>,
) -> Result<BlockTemplate, MinerError> {
    let mut scratch = ScratchPool {
        chain,
        block_outputs: HashMap::new(),
        claimed: HashMap::new(),
    };

    let mut included = Vec::new();
    let mut size: u64 = Header::len() as u64;
    let mut fees = Amount::<NonNegative>::zero();

    for tx in mempool.transactions() {
        if tx.is_coinbase() {
            continue;
        }
        if !is_final(tx, context.height, adjusted_time) {
            continue;
        }

        let tx_size = tx.len() as u64;
        if size + tx_size > MAX_CANDIDATE_BYTES {
            continue;
        }

        match connect_inputs(tx, &mut scratch, context.height, min_fee) {
            Ok(fee) => {
                fees = Amount::try_from_i64(fees.to_i64() + fee.to_i64())?;
                size += tx_size;
                scratch.add_block_outputs(tx);
                included.push(tx.clone());
            }
            Err(_) => continue,
        }
    }

    let coinbase_value = block_value(fees, context.height)?;
    let coinbase = build_coinbase(
        context.height,
        extra_nonce,
        coinbase_value,
        &coinbase_public_key,
    );

    let mut transactions = Vec::with_capacity(included.len() + 1);
    transactions.push(Arc::new(coinbase));
    transactions.extend(included);

    Ok(BlockTemplate {
        previous_block_hash: context.previous_block_hash,
        height: context.height,
        bits: context.bits,
        median_time_past: context.median_time_past,
        transactions,
    })
}

/// Builds the coinbase transaction: a single `Input::Coinbase` committing
/// the block height (BIP 34-style, so `Block::coinbase_height` can recover
/// it), the compact target, and an extra-nonce, paying `coinbase_value` to
/// `coinbase_public_key`.
fn build_coinbase(
    height: block::Height,
    extra_nonce: u64,
    coinbase_value: Amount<NonNegative>,
    coinbase_public_key: &[u8],
) -> Transaction {
    let mut data = Vec::new();
    data.extend_from_slice(&height.0.to_le_bytes());
    data.extend_from_slice(&extra_nonce.to_le_bytes());

    Transaction::new(
        1,
        vec![Input::Coinbase {
            height: None,
            data: CoinbaseData::new(data),
            sequence: 0xffff_ffff,
        }],
        vec![Output {
            value: coinbase_value,
            lock_script: pay_to_pubkey_script(coinbase_public_key),
        }],
        LockTime::Height(block::Height(0)),
    )
}

/// The scratch pool `ConnectInputs` validates a candidate block's
/// transactions against: outputs created earlier in the same block, layered
/// over the persisted UTXO set `chain` exposes. Nothing here is committed
/// anywhere; it lives only for the duration of one `assemble` call.
struct ScratchPool<'a, L> {
    chain: &'a L,
    block_outputs: HashMap<OutPoint, Output>,
    claimed: HashMap<OutPoint, TxHash>,
}

impl<'a, L> ScratchPool<'a, L> {
    fn add_block_outputs(&mut self, tx: &Transaction) {
        let hash = tx.hash();
        for (index, output) in tx.outputs.iter().enumerate() {
            self.block_outputs.insert(
                OutPoint {
                    hash,
                    index: index as u32,
                },
                output.clone(),
            );
        }
    }
}

impl<'a, L: PreviousOutputLookup> PreviousOutputLookup for ScratchPool<'a, L> {
    fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
        if let Some(output) = self.block_outputs.get(outpoint) {
            // Only non-coinbase mempool transactions ever land here (see
            // `add_block_outputs`); the block's own coinbase output is
            // immature until the next block, so it's never a valid input.
            return Some(PreviousOutput {
                output: output.clone(),
                is_coinbase: false,
                height: block::Height(0),
                spent: self.claimed.contains_key(outpoint),
            });
        }

        let mut previous = self.chain.find(outpoint)?;
        if self.claimed.contains_key(outpoint) {
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
    use node_chain::transparent::Script;
    use node_mempool::Mempool;
    use std::collections::HashMap as StdHashMap;

    struct MapChain(StdHashMap<OutPoint, PreviousOutput>);
    impl PreviousOutputLookup for MapChain {
        fn find(&self, outpoint: &OutPoint) -> Option<PreviousOutput> {
            self.0.get(outpoint).cloned()
        }
        fn mark_spent(&mut self, _outpoint: &OutPoint, _spender: TxHash) {}
    }

    fn anyone_can_spend() -> Script {
        Script(vec![0x51])
    }

    fn funded_chain(n: u8) -> (OutPoint, MapChain) {
        let outpoint = OutPoint {
            hash: TxHash([n; 32]),
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
                height: block::Height(0),
                spent: false,
            },
        );
        (outpoint, MapChain(map))
    }

    fn spending_tx(outpoint: OutPoint, sequence: u32, out_value: i64, locktime: LockTime) -> Transaction {
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
            locktime,
        )
    }

    fn context(height: u32) -> MiningContext {
        MiningContext {
            previous_block_hash: block::Hash([0; 32]),
            height: block::Height(height),
            bits: CompactDifficulty(0x1d00ffff),
            median_time_past: None,
        }
    }

    #[test]
    fn assembles_a_coinbase_only_template_from_an_empty_mempool() {
        node_test::init();
        let chain = MapChain(StdHashMap::new());
        let mempool = Mempool::new();
        let template = assemble(
            &context(1),
            &mempool,
            &chain,
            vec![1, 2, 3],
            0,
            Amount::zero(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(template.transactions.len(), 1);
        assert!(template.transactions[0].is_coinbase());
    }

    #[test]
    fn includes_valid_mempool_transactions_and_pays_their_fees_to_the_coinbase() {
        node_test::init();
        let (outpoint_a, chain_a) = funded_chain(1);
        let (outpoint_b, chain_b) = funded_chain(2);
        let mut chain_map = chain_a.0;
        chain_map.extend(chain_b.0);
        let chain = MapChain(chain_map);

        let tx_a = Arc::new(spending_tx(outpoint_a, 0xffff_ffff, 900, LockTime::Height(block::Height(0))));
        let tx_b = Arc::new(spending_tx(outpoint_b, 0xffff_ffff, 950, LockTime::Height(block::Height(0))));

        let mut mempool = Mempool::new();
        mempool
            .accept(tx_a.clone(), &chain, block::Height(1), Amount::zero())
            .unwrap();
        mempool
            .accept(tx_b.clone(), &chain, block::Height(1), Amount::zero())
            .unwrap();

        let template = assemble(
            &context(1),
            &mempool,
            &chain,
            vec![7, 7, 7],
            0,
            Amount::zero(),
            Utc::now(),
        )
        .unwrap();

        // Two funded inputs of 1000 each, spent down to 900 and 950: 150 in
        // total fees, on top of the height-1 subsidy.
        assert_eq!(template.transactions.len(), 3);
        let coinbase_value = template.transactions[0].outputs[0].value;
        let subsidy = block_value(Amount::zero(), block::Height(1)).unwrap();
        assert_eq!(coinbase_value.to_i64(), subsidy.to_i64() + 150);
    }

    #[test]
    fn skips_a_mempool_transaction_that_is_not_yet_final() {
        node_test::init();
        let (outpoint, chain) = funded_chain(3);
        let not_final = Arc::new(spending_tx(
            outpoint,
            0,
            900,
            LockTime::Height(block::Height(1_000_000)),
        ));

        let mut mempool = Mempool::new();
        mempool
            .accept(not_final.clone(), &chain, block::Height(1), Amount::zero())
            .unwrap();

        let template = assemble(
            &context(1),
            &mempool,
            &chain,
            vec![9],
            0,
            Amount::zero(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(template.transactions.len(), 1);
    }

    #[test]
    fn scratch_pool_serves_outputs_added_earlier_in_the_same_block() {
        node_test::init();
        let chain = MapChain(StdHashMap::new());
        let mut scratch = ScratchPool {
            chain: &chain,
            block_outputs: HashMap::new(),
            claimed: HashMap::new(),
        };

        let funding_tx = spending_tx(
            OutPoint {
                hash: TxHash([4; 32]),
                index: 0,
            },
            0xffff_ffff,
            500,
            LockTime::Height(block::Height(0)),
        );
        let spent_outpoint = OutPoint {
            hash: funding_tx.hash(),
            index: 0,
        };

        assert!(scratch.find(&spent_outpoint).is_none());
        scratch.add_block_outputs(&funding_tx);

        let found = scratch.find(&spent_outpoint).unwrap();
        assert_eq!(found.output.value.to_i64(), 500);
        assert!(!found.is_coinbase);
        assert!(!found.spent);
    }
}
