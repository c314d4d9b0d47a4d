//! The mining task: snapshot tip and target, assemble a candidate block,
//! search for a satisfying nonce, submit on success.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use node_chain::amount::{Amount, NonNegative};
use node_chain::block::{Block, Header};
use node_mempool::Mempool;
use node_state::service::{MiningContext, Request, Response};
use node_wallet::Wallet;
use rand::RngCore;
use tower::buffer::Buffer;
use tower::ServiceExt;

use crate::error::MinerError;
use crate::state_lookup::ChainLookup;
use crate::template::assemble;

/// How many nonces the inner loop tries before checking for shutdown, a tip
/// change, a stale mempool snapshot, or the stop-mining flag.
const YIELD_INTERVAL: u32 = 1 << 18;

/// Refresh the mempool-derived template at least this often, even if the
/// nonce search hasn't exhausted `u32` yet.
const MEMPOOL_REFRESH: chrono::Duration = chrono::Duration::seconds(60);

/// Runs the mining loop until `shutdown` is set. `stop_mining` can be
/// flipped independently to idle the miner (e.g. while catching up with
/// peers) without tearing down the task.
pub async fn run(
    state: Buffer<node_state::StateService, Request>,
    mempool: Arc<Mutex<Mempool>>,
    wallet: Arc<Mutex<Wallet>>,
    min_fee: Amount<NonNegative>,
    shutdown: Arc<AtomicBool>,
    stop_mining: Arc<AtomicBool>,
) {
    let mut rng = rand::thread_rng();
    let mut extra_nonce: u64 = rng.next_u64();

    while !shutdown.load(Ordering::Relaxed) {
        if stop_mining.load(Ordering::Relaxed) {
            tokio::time::delay_for(std::time::Duration::from_millis(500)).await;
            continue;
        }

        extra_nonce = extra_nonce.wrapping_add(1);
        match mine_one_round(
            &state,
            &mempool,
            &wallet,
            min_fee,
            extra_nonce,
            &shutdown,
            &stop_mining,
        )
        .await
        {
            Ok(Some(block)) => {
                if let Err(error) = submit(&state, block).await {
                    tracing::warn!(?error, "mined block was rejected on submission");
                }
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(?error, "failed to assemble a candidate block");
            }
        }
    }
}

/// One full round: fetch context, assemble a template, search for a nonce
/// satisfying it before the round's deadline (tip change, mempool staleness,
/// shutdown, or stop-mining). Returns the found block, if any.
async fn mine_one_round(
    state: &Buffer<node_state::StateService, Request>,
    mempool: &Arc<Mutex<Mempool>>,
    wallet: &Arc<Mutex<Wallet>>,
    min_fee: Amount<NonNegative>,
    extra_nonce: u64,
    shutdown: &Arc<AtomicBool>,
    stop_mining: &Arc<AtomicBool>,
) -> Result<Option<Block>, MinerError> {
    let context = mining_context(state).await?;

    // Roll the coinbase key forward: this round mints (and immediately
    // keeps) a fresh key, never reusing the one from a previous round
    // whether or not that round found a block.
    let coinbase_public_key = {
        let mut wallet = wallet.lock().expect("wallet lock is never poisoned");
        let mut rng = rand::rngs::OsRng;
        wallet.generate_key(&mut rng)
    };

    let chain = ChainLookup::new(state.clone());
    let template = {
        let mempool = mempool.lock().expect("mempool lock is never poisoned");
        assemble(
            &context,
            &mempool,
            &chain,
            coinbase_public_key,
            extra_nonce,
            min_fee,
            Utc::now(),
        )?
    };

    let started_at = Utc::now();
    let mut time = round_start_time(&template, started_at);
    let mut header = template.header_at(time);

    loop {
        if let Some(header) = search_nonces(&mut header, YIELD_INTERVAL) {
            return Ok(Some(template.into_block(header)));
        }

        if shutdown.load(Ordering::Relaxed) || stop_mining.load(Ordering::Relaxed) {
            return Ok(None);
        }
        if tip_changed(state, context.previous_block_hash).await {
            return Ok(None);
        }
        if Utc::now() - started_at > MEMPOOL_REFRESH {
            return Ok(None);
        }

        time = round_start_time(&template, Utc::now());
        header.time = time;
        header.nonce = 0;
    }
}

/// `time = max(MedianTimePast(prev) + 1, AdjustedTime)`.
fn round_start_time(template: &crate::template::BlockTemplate, adjusted_time: DateTime<Utc>) -> DateTime<Utc> {
    match template.median_time_past {
        Some(median) => std::cmp::max(median + chrono::Duration::seconds(1), adjusted_time),
        None => adjusted_time,
    }
}

/// Tries up to `budget` nonces starting from `header.nonce`, returning the
/// header as soon as one satisfies the target. Mutates `header.nonce` in
/// place so the caller can resume from where this call left off.
fn search_nonces(header: &mut Header, budget: u32) -> Option<Header> {
    for _ in 0..budget {
        let hash = node_chain::block::Hash::from(&*header);
        if header.difficulty_threshold.is_satisfied_by(&hash) {
            return Some(*header);
        }
        header.nonce = header.nonce.wrapping_add(1);
        if header.nonce == 0 {
            break;
        }
    }
    None
}

async fn mining_context(
    state: &Buffer<node_state::StateService, Request>,
) -> Result<MiningContext, MinerError> {
    match state.clone().oneshot(Request::MiningContext).await {
        Ok(Response::MiningContext(context)) => Ok(context),
        Ok(_) => unreachable!("MiningContext request always returns Response::MiningContext"),
        Err(error) => Err(MinerError::State(error)),
    }
}

async fn tip_changed(state: &Buffer<node_state::StateService, Request>, previous_tip: node_chain::block::Hash) -> bool {
    match state.clone().oneshot(Request::Tip).await {
        Ok(Response::Tip(Some((_, hash)))) => hash != previous_tip,
        _ => false,
    }
}

async fn submit(
    state: &Buffer<node_state::StateService, Request>,
    block: Block,
) -> Result<(), MinerError> {
    match state.clone().oneshot(Request::CommitBlock(Arc::new(block))).await {
        Ok(Response::Committed(_)) => Ok(()),
        Ok(_) => unreachable!("CommitBlock request always returns Response::Committed"),
        Err(error) => Err(MinerError::State(error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::BlockTemplate;
    use node_chain::block;
    use node_chain::work::difficulty::CompactDifficulty;

    fn template_with_median(median: Option<DateTime<Utc>>) -> BlockTemplate {
        BlockTemplate {
            previous_block_hash: block::Hash([0; 32]),
            height: block::Height(1),
            bits: CompactDifficulty(0x1d00ffff),
            median_time_past: median,
            transactions: Vec::new(),
        }
    }

    #[test]
    fn round_start_time_is_adjusted_time_without_a_median() {
        node_test::init();
        let now = Utc::now();
        assert_eq!(round_start_time(&template_with_median(None), now), now);
    }

    #[test]
    fn round_start_time_is_median_plus_one_when_later_than_adjusted() {
        node_test::init();
        let now = Utc::now();
        let median = now + chrono::Duration::seconds(100);
        let template = template_with_median(Some(median));
        assert_eq!(
            round_start_time(&template, now),
            median + chrono::Duration::seconds(1)
        );
    }

    #[test]
    fn round_start_time_is_adjusted_time_when_later_than_median() {
        node_test::init();
        let now = Utc::now();
        let median = now - chrono::Duration::seconds(100);
        let template = template_with_median(Some(median));
        assert_eq!(round_start_time(&template, now), now);
    }

    #[test]
    fn search_nonces_finds_a_nonce_under_an_easy_target() {
        node_test::init();
        let mut header = Header::new(
            1,
            block::Hash([0; 32]),
            block::merkle::Root::from_transactions(&[]),
            Utc::now(),
            // Regtest's maximum target: roughly half of all hashes satisfy it,
            // so a handful of nonces is enough to find one deterministically
            // in practice.
            CompactDifficulty(0x207fffff),
            0,
        );
        let found = search_nonces(&mut header, 10_000);
        assert!(found.is_some());
    }

    #[test]
    fn search_nonces_gives_up_once_the_budget_is_exhausted() {
        node_test::init();
        let mut header = Header::new(
            1,
            block::Hash([0; 32]),
            block::merkle::Root::from_transactions(&[]),
            Utc::now(),
            // A mantissa of zero expands to an all-zero target: nothing but
            // a literally all-zero hash can satisfy it.
            CompactDifficulty(0),
            0,
        );
        assert_eq!(search_nonces(&mut header, 100), None);
        assert_eq!(header.nonce, 100);
    }
}
