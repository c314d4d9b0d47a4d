//! The `tower::Service` fronting the finalized and non-finalized state.

mod pending_utxos;

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use chrono::{DateTime, Utc};
use tower::{buffer::Buffer, Service};

use node_chain::{
    amount::{Amount, NonNegative},
    block::{self, Block},
    parameters::{Network, GENESIS_PREVIOUS_BLOCK_HASH},
    transaction,
    transparent,
};
use node_consensus::{block::check, connect_inputs, PreviousOutput, PreviousOutputLookup};

use crate::{
    block_store::BlockStore,
    chain::{ExtendResult, NonFinalizedState},
    config::Config,
    difficulty::{self, AncestorTimes},
    sled_state::FinalizedState,
    BoxError, HashOrHeight, Utxo,
};

use pending_utxos::PendingUtxos;

/// A request to the state service.
#[derive(Debug, Clone)]
pub enum Request {
    /// Validates and commits `block` to the chain.
    CommitBlock(Arc<Block>),
    /// Returns the number of confirmations `hash` has, if it's known.
    Depth(block::Hash),
    /// Returns the current best chain tip.
    Tip,
    /// Returns a `getblocks`/`getheaders` block locator for the best chain.
    BlockLocatorHashes,
    /// Looks up a block by hash or height.
    Block(HashOrHeight),
    /// Resolves once the `Utxo` the given outpoint refers to is known,
    /// whether it's already committed or arrives in a later block.
    AwaitUtxo(transparent::OutPoint),
    /// Looks up `Utxo` immediately, returning `None` rather than waiting if
    /// it isn't committed yet. Used by `ConnectInputs` in miner/mempool
    /// context, where a missing input just means "skip this transaction".
    Utxo(transparent::OutPoint),
    /// Returns everything a miner needs to assemble a candidate block on top
    /// of the current tip: the parent hash, the next height, the difficulty
    /// target that height must satisfy, and `GetMedianTimePast`.
    MiningContext,
}

/// A response from the state service.
#[derive(Debug, Clone)]
pub enum Response {
    Committed(block::Hash),
    Depth(Option<u32>),
    Tip(Option<(block::Height, block::Hash)>),
    BlockLocatorHashes(Vec<block::Hash>),
    Block(Option<Arc<Block>>),
    Utxo(Utxo),
    MaybeUtxo(Option<Utxo>),
    MiningContext(MiningContext),
}

/// Everything [`Request::MiningContext`] hands back to a miner.
#[derive(Debug, Clone)]
pub struct MiningContext {
    pub previous_block_hash: block::Hash,
    pub height: block::Height,
    pub bits: node_chain::work::difficulty::CompactDifficulty,
    pub median_time_past: Option<DateTime<Utc>>,
}

/// Blocks this many confirmations deep move from the non-finalized tree
/// into the `sled`-backed finalized state, where they can no longer be
/// reorged away.
const FINALIZATION_DEPTH: u32 = 100;

/// The number of ancestor timestamps `GetMedianTimePast` considers.
const MEDIAN_TIME_SPAN: usize = 11;

/// The compact difficulty encoding used by the genesis block, and the
/// fallback when no ancestor bits are available yet.
const GENESIS_COMPACT_DIFFICULTY: u32 = 0x1d00ffff;

pub struct StateService {
    network: Network,
    finalized: FinalizedState,
    non_finalized: NonFinalizedState,
    block_store: BlockStore,
    pending_utxos: PendingUtxos,
}

impl StateService {
    pub fn new(config: Config, network: Network) -> Self {
        let finalized = FinalizedState::new(&config, network);
        let block_store = BlockStore::new(config.block_dir(network), network)
            .expect("block storage directory must be writable");

        Self {
            network,
            finalized,
            non_finalized: NonFinalizedState::new(),
            block_store,
            pending_utxos: PendingUtxos::default(),
        }
    }

    fn finalized_tip(&self) -> (block::Height, block::Hash) {
        self.finalized
            .tip()
            .expect("inability to look up the finalized tip is unrecoverable")
            .unwrap_or((block::Height(0), GENESIS_PREVIOUS_BLOCK_HASH))
    }

    /// Returns the best chain's current tip: the non-finalized tree's tip if
    /// it holds any blocks, otherwise the finalized tip.
    fn best_tip(&self) -> Option<(block::Height, block::Hash)> {
        self.non_finalized
            .best_tip()
            .or_else(|| self.finalized.tip().ok().flatten())
    }

    fn block_at_height(&self, height: block::Height) -> Option<Arc<Block>> {
        if let Ok(Some(block)) = self.finalized.block(HashOrHeight::Height(height)) {
            return Some(block);
        }
        self.non_finalized
            .best_tip()
            .and_then(|(_, tip)| self.block_at_height_in_tree(tip, height))
    }

    fn header_time_at(&self, height: block::Height) -> Option<DateTime<Utc>> {
        self.block_at_height(height).map(|block| block.header.time)
    }

    /// Returns the timestamps of the last [`MEDIAN_TIME_SPAN`] ancestors of
    /// `tip`, for `GetMedianTimePast`.
    fn median_time_past(&self, tip: block::Hash) -> Option<DateTime<Utc>> {
        let mut times = self.non_finalized.recent_times(tip, MEDIAN_TIME_SPAN);

        // The non-finalized tree only holds unconfirmed blocks; once it runs
        // out of ancestors, keep walking down into the finalized state.
        if times.len() < MEDIAN_TIME_SPAN {
            let (tip_height, _) = self.finalized_tip();
            let mut height = tip_height.0 as i64 - (times.len() as i64);
            while times.len() < MEDIAN_TIME_SPAN && height >= 0 {
                if let Some(time) = self.header_time_at(block::Height(height as u32)) {
                    times.push(time);
                }
                height -= 1;
            }
        }

        if times.is_empty() {
            return None;
        }

        times.sort();
        Some(times[times.len() / 2])
    }

    /// Returns `Ok(())` if `block` may be accepted at this point in the
    /// chain: context-free shape checks (`CheckBlock`), its timestamp is
    /// after `GetMedianTimePast`, its declared difficulty matches what
    /// `next_work_required` demands *and* its hash actually satisfies that
    /// target, and every transaction but the coinbase connects cleanly
    /// against the branch rooted at `block`'s parent (`ConnectInputs`).
    ///
    /// On success, returns the outpoints this block's transactions claimed,
    /// for the caller to persist once the block is actually added to the
    /// tree -- `accept_block` itself never mutates state.
    fn accept_block(
        &self,
        block: &Block,
        height: block::Height,
    ) -> Result<Vec<(transparent::OutPoint, transaction::Hash)>, BoxError> {
        let hash = block.hash();
        let parent_hash = block.header.previous_block_hash;

        check::coinbase_is_first(block)?;
        check::size_is_valid(block)?;
        check::merkle_root_validity(block)?;
        check::difficulty_is_valid(&block.header, &height, &hash)?;

        if let Some(median) = self.median_time_past(parent_hash) {
            if block.header.time <= median {
                return Err(format!(
                    "block {:?} time {:?} is not after GetMedianTimePast {:?}",
                    hash, block.header.time, median
                )
                .into());
            }
        }

        let parent_time = self
            .header_time_at(block::Height(height.0.saturating_sub(1)))
            .map(|time| time.timestamp())
            .unwrap_or_else(|| block.header.time.timestamp());

        let parent_bits = if height == block::Height(0) {
            block.header.difficulty_threshold
        } else {
            self.header_bits_at(block::Height(height.0 - 1))
                .unwrap_or(block.header.difficulty_threshold)
        };

        let ancestors = StateAncestorTimes { state: self };
        let expected = difficulty::next_work_required(&ancestors, height, parent_time, parent_bits);

        if block.header.difficulty_threshold.0 != expected.0 {
            return Err(format!(
                "block {:?} declares difficulty {:?}, expected {:?}",
                hash, block.header.difficulty_threshold, expected
            )
            .into());
        }

        let mut scratch = BlockScratch::new(self, parent_hash);
        let mut fees = Amount::<NonNegative>::zero();

        for tx in block.transactions.iter().skip(1) {
            let fee = connect_inputs(tx, &mut scratch, height, Amount::<NonNegative>::zero())?;
            fees = Amount::<NonNegative>::try_from_i64(fees.to_i64() + fee.to_i64())?;
            scratch.add_block_outputs(tx);
        }

        check::subsidy_is_valid(block, height, fees)?;

        Ok(scratch.into_spends())
    }

    /// Assembles [`Request::MiningContext`]'s response: the same
    /// parent-time/parent-bits/`next_work_required` computation
    /// [`Self::accept_block`] uses to validate an incoming block, run
    /// forwards instead to predict what the *next* block must declare.
    fn mining_context(&self) -> MiningContext {
        let (tip_height, tip_hash) = self
            .best_tip()
            .unwrap_or((block::Height(0), GENESIS_PREVIOUS_BLOCK_HASH));

        if self.best_tip().is_none() {
            return MiningContext {
                previous_block_hash: GENESIS_PREVIOUS_BLOCK_HASH,
                height: block::Height(0),
                bits: node_chain::work::difficulty::CompactDifficulty(GENESIS_COMPACT_DIFFICULTY),
                median_time_past: None,
            };
        }

        let height = block::Height(tip_height.0 + 1);
        let parent_time = self
            .header_time_at(tip_height)
            .map(|time| time.timestamp())
            .unwrap_or(0);
        let parent_bits = self.header_bits_at(tip_height).unwrap_or(
            node_chain::work::difficulty::CompactDifficulty(GENESIS_COMPACT_DIFFICULTY),
        );

        let ancestors = StateAncestorTimes { state: self };
        let bits = difficulty::next_work_required(&ancestors, height, parent_time, parent_bits);

        MiningContext {
            previous_block_hash: tip_hash,
            height,
            bits,
            median_time_past: self.median_time_past(tip_hash),
        }
    }

    fn header_bits_at(
        &self,
        height: block::Height,
    ) -> Option<node_chain::work::difficulty::CompactDifficulty> {
        self.block_at_height(height)
            .map(|block| block.header.difficulty_threshold)
    }

    fn block_at_height_in_tree(&self, mut hash: block::Hash, target: block::Height) -> Option<Arc<Block>> {
        loop {
            let block = self.non_finalized.get(&hash)?.clone();
            let height = self.non_finalized.height(&hash)?;
            if height == target {
                return Some(block);
            }
            if height.0 == 0 {
                return None;
            }
            hash = block.header.previous_block_hash;
        }
    }

    /// Runs a committed block through acceptance (`CheckBlock`/`AcceptBlock`/
    /// `ConnectInputs`), extends the non-finalized tree with it, retries any
    /// orphans now unblocked by it, and migrates deep-enough blocks into the
    /// finalized state.
    fn commit_block(&mut self, block: Arc<Block>) -> Result<block::Hash, BoxError> {
        let mut queue = vec![block];

        let mut committed_hash = None;

        while let Some(block) = queue.pop() {
            let finalized_tip = self.finalized_tip();
            let parent_hash = block.header.previous_block_hash;

            let height = if parent_hash == finalized_tip.1 {
                block::Height(finalized_tip.0 .0 + 1)
            } else if let Some(height) = self.non_finalized.height(&parent_hash) {
                block::Height(height.0 + 1)
            } else {
                // Parent unknown: let `extend` buffer it as an orphan.
                block::Height(0)
            };

            let spends = if self.non_finalized.get(&parent_hash).is_some() || parent_hash == finalized_tip.1
            {
                self.accept_block(&block, height)?
            } else {
                Vec::new()
            };

            self.block_store.append(&block)?;
            let hash = block.hash();
            let new_outputs = created_outputs(&block, height);

            match self.non_finalized.extend(block, finalized_tip, spends) {
                ExtendResult::Orphan => {}
                ExtendResult::Extended { .. } => {
                    committed_hash = Some(hash);
                    queue.extend(self.non_finalized.take_orphans(&hash));
                    self.pending_utxos.check_against(&new_outputs);
                    self.pending_utxos.prune();
                }
            }
        }

        self.finalize_deep_enough_blocks()?;

        committed_hash.ok_or_else(|| "block's parent is not yet known to this node".into())
    }

    fn finalize_deep_enough_blocks(&mut self) -> Result<(), BoxError> {
        loop {
            let (best_height, best_hash) = match self.non_finalized.best_tip() {
                Some(tip) => tip,
                None => return Ok(()),
            };
            let (finalized_height, finalized_hash) = self.finalized_tip();

            let next_hash = self.ancestor_at(best_hash, finalized_height.0 + 1);
            let next_hash = match next_hash {
                Some(hash) => hash,
                None => return Ok(()),
            };

            if best_height.0.saturating_sub(finalized_height.0) <= FINALIZATION_DEPTH {
                return Ok(());
            }

            let block = self
                .non_finalized
                .get(&next_hash)
                .cloned()
                .ok_or("finalization candidate missing from non-finalized tree")?;

            let (tx, _rx) = tokio::sync::oneshot::channel();
            self.finalized
                .queue_and_commit_finalized_blocks(crate::QueuedBlock { block, rsp_tx: tx });
            self.non_finalized.prune(&next_hash);

            debug_assert_ne!(self.finalized_tip().1, finalized_hash);
        }
    }

    fn ancestor_at(&self, mut hash: block::Hash, target_height: u32) -> Option<block::Hash> {
        loop {
            let height = self.non_finalized.height(&hash)?;
            if height.0 == target_height {
                return Some(hash);
            }
            if height.0 < target_height {
                return None;
            }
            hash = self.non_finalized.get(&hash)?.header.previous_block_hash;
        }
    }

    fn lookup_utxo(&self, outpoint: &transparent::OutPoint) -> Option<Utxo> {
        if let Some(previous) = self.non_finalized.find(outpoint) {
            return Some(Utxo {
                output: previous.output,
                height: previous.height,
                from_coinbase: previous.is_coinbase,
            });
        }
        self.finalized.utxo(outpoint).ok().flatten()
    }

    /// Looks up `outpoint` directly in the finalized state, with `spent`
    /// always `false` -- the finalized UTXO set only ever holds unspent
    /// outputs, so a finalized-origin spend has to be layered on top by the
    /// caller (see [`BlockScratch::find`]).
    fn finalized_previous_output(&self, outpoint: &transparent::OutPoint) -> Option<PreviousOutput> {
        self.finalized
            .utxo(outpoint)
            .ok()
            .flatten()
            .map(|utxo| PreviousOutput {
                output: utxo.output,
                is_coinbase: utxo.from_coinbase,
                height: utxo.height,
                spent: false,
            })
    }
}

/// The lookup an incoming block's own `ConnectInputs` pass runs against:
/// outputs created earlier in the same block, layered over the branch of
/// the non-finalized tree rooted at `at` (the block's parent), falling back
/// to the finalized UTXO set. Scoped to `at` rather than the current best
/// tip so a block extending a side branch is validated against that
/// branch's own coins, not a competing chain's.
///
/// Mirrors `node-miner`'s own candidate-block scratch pool: both validate
/// "this block's transactions, spending each other and a persisted base".
struct BlockScratch<'a> {
    state: &'a StateService,
    at: block::Hash,
    block_outputs: HashMap<transparent::OutPoint, transparent::Output>,
    claimed: HashMap<transparent::OutPoint, transaction::Hash>,
}

impl<'a> BlockScratch<'a> {
    fn new(state: &'a StateService, at: block::Hash) -> Self {
        BlockScratch {
            state,
            at,
            block_outputs: HashMap::new(),
            claimed: HashMap::new(),
        }
    }

    fn add_block_outputs(&mut self, transaction: &node_chain::transaction::Transaction) {
        let hash = transaction.hash();
        for (index, output) in transaction.outputs.iter().enumerate() {
            self.block_outputs.insert(
                transparent::OutPoint {
                    hash,
                    index: index as u32,
                },
                output.clone(),
            );
        }
    }

    fn into_spends(self) -> Vec<(transparent::OutPoint, transaction::Hash)> {
        self.claimed.into_iter().collect()
    }
}

impl<'a> PreviousOutputLookup for BlockScratch<'a> {
    fn find(&self, outpoint: &transparent::OutPoint) -> Option<PreviousOutput> {
        if let Some(output) = self.block_outputs.get(outpoint) {
            // Only non-coinbase transactions in this same block ever land
            // here; a block's own coinbase is immature until the next
            // block, so it's never a valid input within it.
            return Some(PreviousOutput {
                output: output.clone(),
                is_coinbase: false,
                height: block::Height(0),
                spent: self.claimed.contains_key(outpoint),
            });
        }

        if let Some(mut previous) = self.state.non_finalized.find_at(self.at, outpoint) {
            if self.claimed.contains_key(outpoint) {
                previous.spent = true;
            }
            return Some(previous);
        }

        let mut previous = self.state.finalized_previous_output(outpoint)?;
        if self.state.non_finalized.is_spent_at(self.at, outpoint) || self.claimed.contains_key(outpoint)
        {
            previous.spent = true;
        }
        Some(previous)
    }

    fn mark_spent(&mut self, outpoint: &transparent::OutPoint, spender: transaction::Hash) {
        self.claimed.insert(*outpoint, spender);
    }
}

/// Collects the outputs `block` creates, keyed by outpoint, so a newly
/// committed block's coins can be checked against waiting `AwaitUtxo` requests.
fn created_outputs(block: &Block, height: block::Height) -> HashMap<transparent::OutPoint, Utxo> {
    let coinbase_hash = block.transactions.first().map(|tx| tx.hash());
    let mut outputs = HashMap::new();

    for transaction in block.transactions.iter() {
        let transaction_hash = transaction.hash();
        for (index, output) in transaction.outputs.iter().enumerate() {
            outputs.insert(
                transparent::OutPoint {
                    hash: transaction_hash,
                    index: index as u32,
                },
                Utxo {
                    output: output.clone(),
                    height,
                    from_coinbase: Some(transaction_hash) == coinbase_hash,
                },
            );
        }
    }

    outputs
}

struct StateAncestorTimes<'a> {
    state: &'a StateService,
}

impl<'a> AncestorTimes for StateAncestorTimes<'a> {
    fn time_at(&self, height: block::Height) -> Option<i64> {
        self.state.header_time_at(height).map(|time| time.timestamp())
    }
}

impl PreviousOutputLookup for StateService {
    fn find(&self, outpoint: &transparent::OutPoint) -> Option<PreviousOutput> {
        if let Some(previous) = self.non_finalized.find(outpoint) {
            return Some(previous);
        }
        self.finalized_previous_output(outpoint)
    }

    fn mark_spent(&mut self, outpoint: &transparent::OutPoint, spender: transaction::Hash) {
        self.non_finalized.mark_spent(outpoint, spender);
    }
}

impl Service<Request> for StateService {
    type Response = Response;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Response, BoxError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request) -> Self::Future {
        match req {
            Request::CommitBlock(block) => {
                let result = self.commit_block(block);
                Box::pin(async move { result.map(Response::Committed) })
            }
            Request::Depth(hash) => {
                let result = self
                    .non_finalized
                    .height(&hash)
                    .map(|height| {
                        let (tip_height, _) = self.best_tip().unwrap_or((height, hash));
                        tip_height.0.saturating_sub(height.0)
                    })
                    .or_else(|| self.finalized.depth(hash).ok().flatten());
                Box::pin(async move { Ok(Response::Depth(result)) })
            }
            Request::Tip => {
                let tip = self.best_tip();
                Box::pin(async move { Ok(Response::Tip(tip)) })
            }
            Request::BlockLocatorHashes => {
                let result = self.finalized.block_locator();
                Box::pin(async move { result.map(Response::BlockLocatorHashes) })
            }
            Request::Block(hash_or_height) => {
                let result: Result<Option<Arc<Block>>, BoxError> = match hash_or_height {
                    HashOrHeight::Hash(hash) => match self.non_finalized.get(&hash) {
                        Some(block) => Ok(Some(block.clone())),
                        None => self.finalized.block(hash_or_height),
                    },
                    HashOrHeight::Height(_) => self.finalized.block(hash_or_height),
                };
                Box::pin(async move { result.map(Response::Block) })
            }
            Request::AwaitUtxo(outpoint) => {
                if let Some(utxo) = self.lookup_utxo(&outpoint) {
                    return Box::pin(async move { Ok(Response::Utxo(utxo)) });
                }
                let waiter = self.pending_utxos.queue(outpoint);
                Box::pin(waiter)
            }
            Request::Utxo(outpoint) => {
                let utxo = self.lookup_utxo(&outpoint);
                Box::pin(async move { Ok(Response::MaybeUtxo(utxo)) })
            }
            Request::MiningContext => {
                let context = self.mining_context();
                Box::pin(async move { Ok(Response::MiningContext(context)) })
            }
        }
    }
}

/// Builds a buffered, cloneable handle to a fresh [`StateService`].
pub fn init(config: Config, network: Network) -> Buffer<StateService, Request> {
    Buffer::new(StateService::new(config, network), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use node_chain::{
        block::Header,
        transaction::{LockTime, Transaction},
        transparent::{CoinbaseData, Input, Script},
        work::difficulty::CompactDifficulty,
    };

    /// A target loose enough (about half the hash space) that brute-forcing
    /// a satisfying nonce takes only a handful of attempts, the same
    /// constant Bitcoin's own regtest network uses.
    const EASY_DIFFICULTY: CompactDifficulty = CompactDifficulty(0x207fffff);

    fn anyone_can_spend_script() -> Script {
        Script(vec![0x51]) // OP_TRUE
    }

    fn test_service() -> (StateService, tempdir::TempDir) {
        let dir = tempdir::TempDir::new("node-state-service").unwrap();
        let config = Config {
            cache_dir: dir.path().to_path_buf(),
            ephemeral: true,
        };
        (StateService::new(config, Network::Testnet), dir)
    }

    fn coinbase_transaction(payload: u8, lock_script: Script) -> Transaction {
        Transaction::new(
            1,
            vec![Input::Coinbase {
                height: None,
                data: CoinbaseData(vec![payload]),
                sequence: 0xffff_ffff,
            }],
            vec![transparent::Output {
                value: Amount::<NonNegative>::try_from_i64(50_0000_0000).unwrap(),
                lock_script,
            }],
            LockTime::Height(block::Height(0)),
        )
    }

    /// Brute-forces a nonce that makes `transactions`' block satisfy
    /// [`EASY_DIFFICULTY`] under `previous_block_hash`, the same way a real
    /// miner would.
    fn mine_block(
        previous_block_hash: block::Hash,
        time: DateTime<Utc>,
        transactions: Vec<Arc<Transaction>>,
    ) -> Arc<Block> {
        let merkle_root = block::merkle::Root::from_transactions(&transactions);

        for nonce in 0..1_000_000u32 {
            let header = Header::new(
                1,
                previous_block_hash,
                merkle_root,
                time,
                EASY_DIFFICULTY,
                nonce,
            );
            if EASY_DIFFICULTY.is_satisfied_by(&block::Hash::from(&header)) {
                return Arc::new(Block {
                    header,
                    transactions,
                });
            }
        }
        panic!("failed to find a satisfying nonce");
    }

    fn genesis_block(time: DateTime<Utc>, payload: u8) -> Arc<Block> {
        let coinbase = Arc::new(coinbase_transaction(payload, anyone_can_spend_script()));
        mine_block(GENESIS_PREVIOUS_BLOCK_HASH, time, vec![coinbase])
    }

    #[test]
    fn commit_block_accepts_a_valid_genesis_block() {
        node_test::init();
        let (mut state, _dir) = test_service();
        let block = genesis_block(Utc::now(), 0);

        let hash = state.commit_block(block.clone()).unwrap();
        assert_eq!(hash, block.hash());
        assert_eq!(state.best_tip(), Some((block::Height(0), hash)));
    }

    #[test]
    fn accept_block_rejects_insufficient_proof_of_work() {
        node_test::init();
        let (state, _dir) = test_service();

        // A target of all-zero bytes: no real hash will ever satisfy it, so
        // this block fails `difficulty_is_valid`'s PoW check regardless of
        // which nonce was mined.
        let impossible_difficulty = CompactDifficulty(0x0100_0001);
        let coinbase = Arc::new(coinbase_transaction(0, anyone_can_spend_script()));
        let transactions = vec![coinbase];
        let merkle_root = block::merkle::Root::from_transactions(&transactions);
        let block = Block {
            header: Header::new(
                1,
                GENESIS_PREVIOUS_BLOCK_HASH,
                merkle_root,
                Utc::now(),
                impossible_difficulty,
                0,
            ),
            transactions,
        };

        assert!(state.accept_block(&block, block::Height(0)).is_err());
    }

    #[test]
    fn accept_block_rejects_bad_merkle_root() {
        node_test::init();
        let (state, _dir) = test_service();
        let mut block = (*genesis_block(Utc::now(), 0)).clone();

        let other = coinbase_transaction(1, anyone_can_spend_script());
        block.header.merkle_root = block::merkle::Root::from_transactions(&[Arc::new(other)]);

        assert!(state.accept_block(&block, block::Height(0)).is_err());
    }

    #[test]
    fn accept_block_rejects_duplicate_transactions() {
        node_test::init();
        let (state, _dir) = test_service();

        let coinbase = Arc::new(coinbase_transaction(0, anyone_can_spend_script()));
        let repeated = Arc::new(Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: transparent::OutPoint {
                    hash: transaction::Hash([7u8; 32]),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![transparent::Output {
                value: Amount::<NonNegative>::try_from_i64(1).unwrap(),
                lock_script: anyone_can_spend_script(),
            }],
            LockTime::Height(block::Height(0)),
        ));

        let time = Utc::now();
        let transactions = vec![coinbase, repeated.clone(), repeated];
        let block = mine_block(GENESIS_PREVIOUS_BLOCK_HASH, time, transactions);

        assert!(state.accept_block(&block, block::Height(0)).is_err());
    }

    #[test]
    fn commit_block_rejects_immature_coinbase_spend() {
        node_test::init();
        let (mut state, _dir) = test_service();

        let genesis_time = Utc::now();
        let genesis = genesis_block(genesis_time, 0);
        let genesis_hash = state.commit_block(genesis.clone()).unwrap();

        let spend = Arc::new(Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: transparent::OutPoint {
                    hash: genesis.transactions[0].hash(),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![transparent::Output {
                value: Amount::<NonNegative>::try_from_i64(1).unwrap(),
                lock_script: anyone_can_spend_script(),
            }],
            LockTime::Height(block::Height(0)),
        ));

        let coinbase = Arc::new(coinbase_transaction(1, anyone_can_spend_script()));
        let block = mine_block(
            genesis_hash,
            genesis_time + chrono::Duration::seconds(600),
            vec![coinbase, spend],
        );

        assert!(state.commit_block(block).is_err());
        // The rejected block must not have moved the tip.
        assert_eq!(state.best_tip(), Some((block::Height(0), genesis_hash)));
    }

    #[test]
    fn commit_block_rejects_double_spend_within_the_same_block() {
        node_test::init();
        let (mut state, _dir) = test_service();

        let genesis_time = Utc::now();
        let genesis = genesis_block(genesis_time, 0);
        let mut tip_hash = state.commit_block(genesis.clone()).unwrap();
        let mut time = genesis_time;

        // Mine past the coinbase maturity window so genesis's output becomes spendable.
        for payload in 1..=node_chain::block::Height::COINBASE_MATURITY {
            time = time + chrono::Duration::seconds(600);
            let coinbase = Arc::new(coinbase_transaction(payload as u8, anyone_can_spend_script()));
            let block = mine_block(tip_hash, time, vec![coinbase]);
            tip_hash = state.commit_block(block).unwrap();
        }

        let outpoint = transparent::OutPoint {
            hash: genesis.transactions[0].hash(),
            index: 0,
        };
        let double_spend = Arc::new(Transaction::new(
            1,
            vec![
                Input::PrevOut {
                    outpoint,
                    unlock_script: Script(Vec::new()),
                    sequence: 0xffff_ffff,
                },
                Input::PrevOut {
                    outpoint,
                    unlock_script: Script(Vec::new()),
                    sequence: 0xffff_fffe,
                },
            ],
            vec![transparent::Output {
                value: Amount::<NonNegative>::try_from_i64(1).unwrap(),
                lock_script: anyone_can_spend_script(),
            }],
            LockTime::Height(block::Height(0)),
        ));

        time = time + chrono::Duration::seconds(600);
        let coinbase = Arc::new(coinbase_transaction(200, anyone_can_spend_script()));
        let block = mine_block(tip_hash, time, vec![coinbase, double_spend]);

        assert!(state.commit_block(block).is_err());
        assert_eq!(state.best_tip(), Some((block::Height(100), tip_hash)));
    }
}
