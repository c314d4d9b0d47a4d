//! Recognizing and satisfying the two standard locking-script templates:
//! pay-to-pubkey (`<pubkey> OP_CHECKSIG`) and pay-to-pubkey-hash
//! (`OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`).

use node_chain::transaction::Transaction;
use node_chain::transparent::{KeyPair, Script};
use secp256k1::{Message, Secp256k1};

use crate::error::ScriptError;
use crate::hashes::hash160;
use crate::opcode::Opcode;
use crate::sighash::{signature_hash, SigHashType};

/// Which standard template a lock script matched, and the data needed to
/// satisfy it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Template {
    /// `<pubkey> OP_CHECKSIG`.
    PayToPubKey { public_key: Vec<u8> },
    /// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`.
    PayToPubKeyHash { public_key_hash: [u8; 20] },
}

/// Decodes `lock_script` into its opcodes and checks them against the two
/// standard templates. Returns `NonStandardTemplate` for anything else,
/// including multisig and bare-script locks, which this node doesn't
/// attempt to sign for automatically.
pub fn match_template(lock_script: &Script) -> Result<Template, ScriptError> {
    let ops = decode_all(&lock_script.0)?;

    if let [Opcode::PushBytes(data), Opcode::CheckSig] = ops.as_slice() {
        if data.len() == 33 || data.len() == 65 {
            return Ok(Template::PayToPubKey {
                public_key: data.clone(),
            });
        }
    }

    if let [Opcode::Dup, Opcode::Hash160, Opcode::PushBytes(hash), Opcode::EqualVerify, Opcode::CheckSig] =
        ops.as_slice()
    {
        if hash.len() == 20 {
            let mut public_key_hash = [0u8; 20];
            public_key_hash.copy_from_slice(hash);
            return Ok(Template::PayToPubKeyHash { public_key_hash });
        }
    }

    Err(ScriptError::NonStandardTemplate)
}

fn decode_all(bytes: &[u8]) -> Result<Vec<Opcode>, ScriptError> {
    let mut ops = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (op, consumed) = Opcode::decode(&bytes[pos..])?;
        ops.push(op);
        pos += consumed;
    }
    Ok(ops)
}

/// Builds the unlock script that satisfies `template` for `input_index` of
/// `tx`, signing with `key_pair` under `hash_type`.
///
/// `lock_script` is the output's full lock script, used verbatim as the
/// subscript (`script_code`) since neither standard template contains an
/// `OP_CODESEPARATOR`.
pub fn sign_input(
    tx: &Transaction,
    input_index: usize,
    lock_script: &Script,
    template: &Template,
    key_pair: &KeyPair,
    hash_type: SigHashType,
) -> Result<Script, ScriptError> {
    let public_key = match template {
        Template::PayToPubKey { public_key } => public_key.clone(),
        Template::PayToPubKeyHash { public_key_hash } => {
            if hash160(&key_pair.public_key.serialize()) != *public_key_hash {
                return Err(ScriptError::NonStandardTemplate);
            }
            key_pair.public_key.serialize().to_vec()
        }
    };

    let digest = signature_hash(tx, input_index, lock_script, hash_type);
    let message = Message::from_slice(&digest)
        .map_err(|e| ScriptError::InvalidEncoding(e.to_string()))?;
    let secp = Secp256k1::signing_only();
    let signature = secp.sign(&message, &key_pair.secret_key);

    let mut sig_bytes = signature.serialize_der().to_vec();
    sig_bytes.push(hash_type.to_byte());

    let mut script_bytes = Vec::new();
    push_data(&mut script_bytes, &sig_bytes);
    if matches!(template, Template::PayToPubKeyHash { .. }) {
        push_data(&mut script_bytes, &public_key);
    }

    Ok(Script(script_bytes))
}

/// Builds a standard `<pubkey> OP_CHECKSIG` lock script paying `public_key`,
/// the template a freshly mined coinbase output uses.
pub fn pay_to_pubkey_script(public_key: &[u8]) -> Script {
    let mut bytes = Vec::new();
    push_data(&mut bytes, public_key);
    bytes.push(0xac); // OP_CHECKSIG
    Script(bytes)
}

pub(crate) fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    match data.len() {
        0..=0x4b => out.push(data.len() as u8),
        0x4c..=0xff => {
            out.push(0x4c);
            out.push(data.len() as u8);
        }
        len => {
            out.push(0x4d);
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
    }
    out.extend_from_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval_script;
    use crate::interpreter::Stack;
    use crate::sighash::BaseSigHash;
    use node_chain::amount::{Amount, NonNegative};
    use node_chain::transaction::{LockTime, Transaction};
    use node_chain::transparent::{Input, OutPoint, Output};
    use rand::rngs::OsRng;

    fn spend_one_output(lock_script: Script) -> (Transaction, usize) {
        let prev = Transaction::new(
            1,
            vec![],
            vec![Output {
                value: Amount::<NonNegative>::try_from_i64(50_000_000).unwrap(),
                lock_script,
            }],
            LockTime::Height(node_chain::block::Height(0)),
        );
        let spending = Transaction::new(
            1,
            vec![Input::PrevOut {
                outpoint: OutPoint {
                    hash: prev.hash(),
                    index: 0,
                },
                unlock_script: Script(Vec::new()),
                sequence: 0xffff_ffff,
            }],
            vec![],
            LockTime::Height(node_chain::block::Height(0)),
        );
        (spending, 0)
    }

    #[test]
    fn pay_to_pubkey_roundtrips_through_the_interpreter() {
        node_test::init();
        let mut rng = OsRng;
        let key_pair = KeyPair::generate(&mut rng);

        let mut lock_bytes = Vec::new();
        push_data(&mut lock_bytes, &key_pair.public_key.serialize());
        lock_bytes.push(0xac); // OP_CHECKSIG
        let lock_script = Script(lock_bytes);

        let template = match_template(&lock_script).unwrap();
        assert_eq!(
            template,
            Template::PayToPubKey {
                public_key: key_pair.public_key.serialize().to_vec()
            }
        );

        let (tx, input_index) = spend_one_output(lock_script.clone());
        let hash_type = SigHashType {
            base: BaseSigHash::All,
            anyone_can_pay: false,
        };
        let unlock_script =
            sign_input(&tx, input_index, &lock_script, &template, &key_pair, hash_type).unwrap();

        let checker = crate::TransactionChecker {
            tx: &tx,
            input_index,
        };
        let mut stack = Stack::new();
        eval_script(&unlock_script.0, &mut stack, &checker).unwrap();
        eval_script(&lock_script.0, &mut stack, &checker).unwrap();
        assert_eq!(stack.into_elements().last(), Some(&vec![1]));
    }

    #[test]
    fn pay_to_pubkey_hash_matches_template() {
        let mut rng = OsRng;
        let key_pair = KeyPair::generate(&mut rng);
        let hash = hash160(&key_pair.public_key.serialize());

        let mut lock_bytes = vec![0x76, 0xa9]; // OP_DUP OP_HASH160
        push_data(&mut lock_bytes, &hash);
        lock_bytes.push(0x88); // OP_EQUALVERIFY
        lock_bytes.push(0xac); // OP_CHECKSIG

        let template = match_template(&Script(lock_bytes)).unwrap();
        assert_eq!(
            template,
            Template::PayToPubKeyHash {
                public_key_hash: hash
            }
        );
    }

    #[test]
    fn non_standard_script_is_rejected() {
        let script = Script(vec![0x51, 0x51, 0x93]); // OP_1 OP_1 OP_ADD
        assert_eq!(
            match_template(&script),
            Err(ScriptError::NonStandardTemplate)
        );
    }
}
