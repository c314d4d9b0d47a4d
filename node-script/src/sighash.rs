//! The `SignatureHash` protocol: build the digest a `CHECKSIG`/
//! `CHECKMULTISIG` signature must cover, from a transaction, an input
//! index, the subscript in force, and a hash type byte.

use node_chain::compactint::CompactInt;
use node_chain::serialization::{sha256d, BitcoinSerialize};
use node_chain::transaction::Transaction;
use node_chain::transparent::{Input, Script};

/// The three base hash types a signature can commit to, each optionally
/// combined with `ANYONECANPAY`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BaseSigHash {
    /// Sign every output.
    All,
    /// Sign no outputs; anyone may redirect the funds.
    None,
    /// Sign only the output at the same index as this input.
    Single,
}

/// A decoded `SIGHASH_*` byte: a base type and whether `ANYONECANPAY` is set.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SigHashType {
    pub base: BaseSigHash,
    pub anyone_can_pay: bool,
}

impl SigHashType {
    pub const ALL: u8 = 0x01;
    pub const NONE: u8 = 0x02;
    pub const SINGLE: u8 = 0x03;
    pub const ANYONECANPAY: u8 = 0x80;

    pub fn from_byte(byte: u8) -> Self {
        let base = match byte & 0x1f {
            Self::NONE => BaseSigHash::None,
            Self::SINGLE => BaseSigHash::Single,
            _ => BaseSigHash::All,
        };
        SigHashType {
            base,
            anyone_can_pay: byte & Self::ANYONECANPAY != 0,
        }
    }

    pub fn to_byte(self) -> u8 {
        let base = match self.base {
            BaseSigHash::All => Self::ALL,
            BaseSigHash::None => Self::NONE,
            BaseSigHash::Single => Self::SINGLE,
        };
        base | if self.anyone_can_pay {
            Self::ANYONECANPAY
        } else {
            0
        }
    }
}

/// The historic "return 1" result for a `SIGHASH_SINGLE` whose input index
/// has no matching output. A correct implementation must reproduce this
/// exactly: treating it as an error instead changes which signatures are
/// considered valid.
const SINGLE_BUG_HASH: [u8; 32] = {
    let mut bytes = [0u8; 32];
    bytes[0] = 1;
    bytes
};

/// Computes the digest that `input_index`'s signature must cover.
///
/// `script_code` is the subscript in force: the lock script being
/// satisfied, with everything up to and including the most recent
/// `OP_CODESEPARATOR` removed.
pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &Script,
    hash_type: SigHashType,
) -> [u8; 32] {
    if matches!(hash_type.base, BaseSigHash::Single) && input_index >= tx.outputs.len() {
        return SINGLE_BUG_HASH;
    }

    // step 1: blank every input's unlock script, then splice script_code
    // in at input_index.
    let mut inputs: Vec<Input> = tx
        .inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let mut input = input.clone();
            if let Input::PrevOut { unlock_script, .. } = &mut input {
                *unlock_script = if i == input_index {
                    script_code.clone()
                } else {
                    Script(Vec::new())
                };
            }
            input
        })
        .collect();

    // step 2 / step 3 (shared): SIGHASH_NONE and SIGHASH_SINGLE both zero
    // every other input's sequence number, since neither commits to the
    // full output set those inputs might otherwise be defending.
    if !matches!(hash_type.base, BaseSigHash::All) {
        for (i, input) in inputs.iter_mut().enumerate() {
            if i != input_index {
                set_sequence(input, 0);
            }
        }
    }

    // step 4: ANYONECANPAY drops every input but this one.
    if hash_type.anyone_can_pay {
        inputs = vec![inputs[input_index].clone()];
        // re-home input_index so the output-substitution logic below still
        // finds "the input being signed" at the right position.
    }
    let signed_index = if hash_type.anyone_can_pay {
        0
    } else {
        input_index
    };

    let mut writer = sha256d::Writer::default();
    tx.version
        .bitcoin_serialize(&mut writer)
        .expect("in-memory hasher is infallible");

    CompactInt::from(inputs.len())
        .bitcoin_serialize(&mut writer)
        .expect("in-memory hasher is infallible");
    for input in &inputs {
        input
            .bitcoin_serialize(&mut writer)
            .expect("in-memory hasher is infallible");
    }

    match hash_type.base {
        BaseSigHash::All => {
            CompactInt::from(tx.outputs.len())
                .bitcoin_serialize(&mut writer)
                .expect("in-memory hasher is infallible");
            for output in &tx.outputs {
                output
                    .bitcoin_serialize(&mut writer)
                    .expect("in-memory hasher is infallible");
            }
        }
        BaseSigHash::None => {
            CompactInt::from(0usize)
                .bitcoin_serialize(&mut writer)
                .expect("in-memory hasher is infallible");
        }
        BaseSigHash::Single => {
            // outputs before signed_index become unspendable placeholders
            // (value -1, empty script) so indices still line up; the rest
            // are dropped entirely.
            CompactInt::from(signed_index + 1)
                .bitcoin_serialize(&mut writer)
                .expect("in-memory hasher is infallible");
            for _ in 0..signed_index {
                (-1i64)
                    .bitcoin_serialize(&mut writer)
                    .expect("in-memory hasher is infallible");
                CompactInt::from(0usize)
                    .bitcoin_serialize(&mut writer)
                    .expect("in-memory hasher is infallible");
            }
            tx.outputs[signed_index]
                .bitcoin_serialize(&mut writer)
                .expect("in-memory hasher is infallible");
        }
    }

    tx.locktime
        .bitcoin_serialize(&mut writer)
        .expect("in-memory hasher is infallible");
    (hash_type.to_byte() as u32)
        .bitcoin_serialize(&mut writer)
        .expect("in-memory hasher is infallible");

    writer.finish()
}

fn set_sequence(input: &mut Input, value: u32) {
    match input {
        Input::PrevOut { sequence, .. } => *sequence = value,
        Input::Coinbase { sequence, .. } => *sequence = value,
    }
}
