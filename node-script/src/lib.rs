//! Script evaluation: the stack machine that decides whether a transaction
//! input is allowed to spend the output it references.
//!
//! [`verify_transaction_input`] is the entry point `node-consensus`'s
//! `ConnectInputs` calls for each input: it runs the unlock script, then the
//! lock script, against a shared stack, exactly as the original Bitcoin
//! verifier does (no P2SH nesting yet -- see Non-goals).

pub mod error;
pub mod hashes;
pub mod interpreter;
pub mod opcode;
pub mod sighash;
pub mod signer;

use node_chain::transaction::Transaction;
use node_chain::transparent::Script;

pub use error::ScriptError;
pub use interpreter::{cast_to_bool, eval_script, SignatureChecker, Stack};
pub use sighash::{signature_hash, BaseSigHash, SigHashType};
pub use signer::{match_template, pay_to_pubkey_script, sign_input, Template};

/// A `SignatureChecker` backed by a real transaction and input index, so
/// `OP_CHECKSIG`/`OP_CHECKMULTISIG` can compute the actual digest a
/// signature must cover.
pub struct TransactionChecker<'a> {
    pub tx: &'a Transaction,
    pub input_index: usize,
}

impl<'a> SignatureChecker for TransactionChecker<'a> {
    fn check_signature(
        &self,
        signature: &[u8],
        public_key: &[u8],
        script_code: &[u8],
    ) -> Result<bool, ScriptError> {
        let (der, hash_type_byte) = match signature.split_last() {
            Some((&byte, rest)) => (rest, byte),
            None => return Ok(false),
        };
        let hash_type = SigHashType::from_byte(hash_type_byte);
        let script_code = find_and_delete(script_code, signature);
        let digest = signature_hash(
            self.tx,
            self.input_index,
            &Script(script_code),
            hash_type,
        );

        let secp = secp256k1::Secp256k1::verification_only();
        let message = match secp256k1::Message::from_slice(&digest) {
            Ok(m) => m,
            Err(_) => return Ok(false),
        };
        let sig = match secp256k1::Signature::from_der(der) {
            Ok(s) => s,
            Err(_) => return Ok(false),
        };
        let key = match secp256k1::PublicKey::from_slice(public_key) {
            Ok(k) => k,
            Err(_) => return Ok(false),
        };
        Ok(secp.verify(&message, &sig, &key).is_ok())
    }
}

/// Removes every literal occurrence of `signature`, re-encoded as a data
/// push, from `script_code`. `OP_CHECKSIG`/`OP_CHECKMULTISIG` run this on
/// the subscript before hashing, so a redeem script that happens to embed
/// the signature's own bytes can't shift what the signature commits to.
fn find_and_delete(script_code: &[u8], signature: &[u8]) -> Vec<u8> {
    let mut needle = Vec::new();
    signer::push_data(&mut needle, signature);

    if needle.is_empty() || needle.len() > script_code.len() {
        return script_code.to_vec();
    }

    let mut result = Vec::with_capacity(script_code.len());
    let mut i = 0;
    while i + needle.len() <= script_code.len() {
        if script_code[i..i + needle.len()] == needle[..] {
            i += needle.len();
        } else {
            result.push(script_code[i]);
            i += 1;
        }
    }
    result.extend_from_slice(&script_code[i..]);
    result
}

/// Evaluates `unlock_script` followed by `lock_script` on a fresh stack, the
/// way the reference client concatenates scriptSig and scriptPubKey. Fails
/// closed: any interpreter error, or a final stack whose top element casts
/// to false, is a validation failure.
pub fn verify_transaction_input(
    tx: &Transaction,
    input_index: usize,
    unlock_script: &Script,
    lock_script: &Script,
) -> Result<(), ScriptError> {
    let checker = TransactionChecker { tx, input_index };
    let mut stack = Stack::new();

    eval_script(&unlock_script.0, &mut stack, &checker)?;
    eval_script(&lock_script.0, &mut stack, &checker)?;

    let elements = stack.into_elements();
    match elements.last() {
        Some(top) if cast_to_bool(top) => Ok(()),
        _ => Err(ScriptError::ScriptFailed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_and_delete_strips_the_pushed_signature() {
        let sig = vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01];
        let mut needle = Vec::new();
        signer::push_data(&mut needle, &sig);

        let mut script_code = vec![0x76, 0xa9]; // OP_DUP OP_HASH160
        script_code.extend_from_slice(&needle);
        script_code.push(0x88); // OP_EQUALVERIFY

        let stripped = find_and_delete(&script_code, &sig);
        assert_eq!(stripped, vec![0x76, 0xa9, 0x88]);
    }

    #[test]
    fn find_and_delete_is_a_no_op_when_absent() {
        let sig = vec![0x30, 0x02, 0x01, 0x01, 0x01];
        let script_code = vec![0x76, 0xa9, 0x88, 0xac];
        assert_eq!(find_and_delete(&script_code, &sig), script_code);
    }
}
