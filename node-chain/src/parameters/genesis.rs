//! The hard-coded genesis block and its consensus parameters.

use std::sync::Arc;

use chrono::{TimeZone, Utc};

use crate::{
    block::{self, merkle, Block, Header},
    cached::Cached,
    parameters::Network,
    transaction::{LockTime, Transaction},
    transparent::{self, CoinbaseData},
    work::difficulty::CompactDifficulty,
};

/// The previous block hash for the genesis block.
///
/// All known networks use the Bitcoin `null` value for the parent of the
/// genesis block. (In Bitcoin, `null` is `[0; 32]`.)
pub const GENESIS_PREVIOUS_BLOCK_HASH: block::Hash = block::Hash([0; 32]);

/// Returns the hash for the genesis block in `network`.
pub fn genesis_hash(network: Network) -> block::Hash {
    match network {
        Network::Mainnet => {
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26"
        }
        Network::Testnet => {
            "000000000933ea01ad0ee984209779baaec3ced90fa3f408719526f8d77f424"
        }
    }
    .parse()
    .expect("hard-coded hash parses")
}

/// Returns the literal coinbase scriptSig data carried by the genesis block.
///
/// This is the famous headline embedded by Satoshi Nakamoto in the first
/// block ever mined: `/The Times 03/Jan/2009 Chancellor on brink of second
/// bailout for banks/`, prefixed with the usual `04 ffff001d 0104` coinbase
/// script push sequence (the difficulty bits and a push of the following
/// 69-byte string).
fn genesis_coinbase_script() -> Vec<u8> {
    let mut script = vec![0x04, 0xff, 0xff, 0x00, 0x1d, 0x01, 0x04];
    let headline = b"The Times 03/Jan/2009 Chancellor on brink of second bailout for banks";
    script.push(headline.len() as u8);
    script.extend_from_slice(headline);
    script
}

/// Builds the hard-coded genesis block for `network`.
///
/// The genesis block is identical on mainnet and testnet except for the
/// timestamp used by the retarget algorithm's first window; both share the
/// same coinbase output, the same unspendable public key, and the same
/// 50-coin subsidy. Fields match the real Bitcoin genesis block exactly, so
/// that `genesis_block(network).hash() == genesis_hash(network)`.
pub fn genesis_block(network: Network) -> Block {
    let coinbase_script = transparent::Script(genesis_coinbase_script());

    let pubkey_script = transparent::Script(
        hex_decode(
            "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f",
        )
        .into_iter()
        .chain(std::iter::once(0xac)) // OP_CHECKSIG
        .collect(),
    );

    let coinbase_tx = Transaction::new(
        1,
        vec![transparent::Input::Coinbase {
            height: None,
            data: CoinbaseData(coinbase_script),
            sequence: 0xffffffff,
        }],
        vec![transparent::Output {
            value: crate::amount::Amount::try_from_i64(50 * crate::amount::COIN)
                .expect("50 coins is in range"),
            lock_script: pubkey_script,
        }],
        LockTime::Height(block::Height(0)),
    );

    let transactions = vec![Arc::new(coinbase_tx)];
    let merkle_root = merkle::Root::from_transactions(&transactions);

    let header = Header::new(
        1,
        GENESIS_PREVIOUS_BLOCK_HASH,
        merkle_root,
        Utc.timestamp(genesis_time(network), 0),
        CompactDifficulty(0x1d00ffff),
        genesis_nonce(network),
    );

    Block {
        header,
        transactions,
    }
}

fn genesis_time(network: Network) -> i64 {
    match network {
        Network::Mainnet => 1_231_006_505,
        Network::Testnet => 1_296_688_602,
    }
}

fn genesis_nonce(network: Network) -> u32 {
    match network {
        Network::Mainnet => 2_083_236_893,
        Network::Testnet => 414_098_458,
    }
}

fn hex_decode(s: &str) -> Vec<u8> {
    hex::decode(s).expect("hard-coded hex decodes")
}
