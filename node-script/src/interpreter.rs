//! The stack-machine evaluator: `eval_script` walks a decoded opcode stream
//! against a main stack and an alt stack, following the casting, flow
//! control, and failure rules a locking/unlocking script pair must obey.

use crate::error::ScriptError;
use crate::opcode::Opcode;

/// Bitcoin scripts deal in byte strings; this is the canonical cast to a
/// boolean used by `IF`/`NOTIF`/`VERIFY` and the final result check. A value
/// is falsy if it's empty, or every byte is zero except a permitted trailing
/// sign byte of `0x80` (negative zero).
pub fn cast_to_bool(value: &[u8]) -> bool {
    for (i, &byte) in value.iter().enumerate() {
        if byte != 0 {
            if i == value.len() - 1 && byte == 0x80 {
                return false;
            }
            return true;
        }
    }
    false
}

fn encode_bool(b: bool) -> Vec<u8> {
    if b {
        vec![1]
    } else {
        Vec::new()
    }
}

/// Minimal big-endian-free script-number decode: little-endian bytes with a
/// sign bit in the high bit of the last byte, up to 4 bytes wide.
fn decode_num(bytes: &[u8]) -> Result<i64, ScriptError> {
    if bytes.is_empty() {
        return Ok(0);
    }
    if bytes.len() > 4 {
        return Err(ScriptError::NumberOverflow);
    }
    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }
    let last = bytes.len() - 1;
    if bytes[last] & 0x80 != 0 {
        result &= !(0x80i64 << (8 * last));
        result = -result;
    }
    Ok(result)
}

fn encode_num(mut value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }
    let negative = value < 0;
    if negative {
        value = -value;
    }
    let mut bytes = Vec::new();
    while value > 0 {
        bytes.push((value & 0xff) as u8);
        value >>= 8;
    }
    if bytes.last().copied().unwrap_or(0) & 0x80 != 0 {
        bytes.push(if negative { 0x80 } else { 0 });
    } else if negative {
        *bytes.last_mut().unwrap() |= 0x80;
    }
    bytes
}

const MAX_STACK_ELEMENTS: usize = 1000;
const MAX_OPS: usize = 201;

/// A script evaluation's working state: the main stack, the alt stack used
/// by `OP_TOALTSTACK`/`OP_FROMALTSTACK`, and the nested-conditional flags
/// tracked while executing `IF`/`NOTIF`/`ELSE`/`ENDIF`.
pub struct Stack {
    main: Vec<Vec<u8>>,
    alt: Vec<Vec<u8>>,
}

impl Stack {
    pub fn new() -> Self {
        Stack {
            main: Vec::new(),
            alt: Vec::new(),
        }
    }

    /// The raw elements of the stack once evaluation completes, exposed for
    /// the P2SH-style "run a second pushed script" helpers.
    pub fn into_elements(self) -> Vec<Vec<u8>> {
        self.main
    }

    fn push(&mut self, item: Vec<u8>) -> Result<(), ScriptError> {
        self.main.push(item);
        if self.main.len() + self.alt.len() > MAX_STACK_ELEMENTS {
            return Err(ScriptError::StackOverflow);
        }
        Ok(())
    }

    fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.main.pop().ok_or(ScriptError::StackUnderflow)
    }

    fn peek(&self, depth_from_top: usize) -> Result<&Vec<u8>, ScriptError> {
        let len = self.main.len();
        if depth_from_top >= len {
            return Err(ScriptError::StackUnderflow);
        }
        Ok(&self.main[len - 1 - depth_from_top])
    }

    fn pop_bool(&mut self) -> Result<bool, ScriptError> {
        Ok(cast_to_bool(&self.pop()?))
    }

    fn pop_num(&mut self) -> Result<i64, ScriptError> {
        decode_num(&self.pop()?)
    }
}

/// Everything a `CHECKSIG`/`CHECKMULTISIG` opcode needs from the enclosing
/// transaction to verify a signature, abstracted so `eval_script` itself
/// stays transaction-agnostic.
pub trait SignatureChecker {
    /// Returns whether `signature` over the script being executed
    /// (truncated at the most recent `OP_CODESEPARATOR`) verifies against
    /// `public_key`.
    fn check_signature(
        &self,
        signature: &[u8],
        public_key: &[u8],
        script_code: &[u8],
    ) -> Result<bool, ScriptError>;
}

/// A checker that always fails, for evaluating scripts with no signature
/// opcodes (e.g. scripts under test in unit tests, or `scriptSig` scanning
/// that only cares about non-signature opcodes).
pub struct NullChecker;

impl SignatureChecker for NullChecker {
    fn check_signature(&self, _: &[u8], _: &[u8], _: &[u8]) -> Result<bool, ScriptError> {
        Ok(false)
    }
}

/// Executes `script_bytes` against `stack`, following the rules in effect
/// before any witness/SegWit extensions: no `OP_CHECKSEQUENCEVERIFY`, no
/// witness program recognition. Returns `Ok(())` if every opcode executed
/// without failing; the caller checks the final stack's top element
/// (`cast_to_bool`) to decide pass/fail, matching `scriptSig`+`scriptPubKey`
/// concatenated evaluation.
pub fn eval_script<C: SignatureChecker>(
    script_bytes: &[u8],
    stack: &mut Stack,
    checker: &C,
) -> Result<(), ScriptError> {
    let mut pos = 0usize;
    let mut code_separator = 0usize;
    let mut op_count = 0usize;
    // one bool per currently-open IF/NOTIF: whether its branch is active
    let mut branches: Vec<bool> = Vec::new();

    while pos < script_bytes.len() {
        let (opcode, consumed) = Opcode::decode(&script_bytes[pos..])?;
        let executing = branches.iter().all(|&b| b);

        match &opcode {
            Opcode::PushBytes(_) | Opcode::SmallInt(_) => {}
            _ => {
                op_count += 1;
                if op_count > MAX_OPS {
                    return Err(ScriptError::TooManyOperations);
                }
            }
        }

        // Flow-control opcodes are tracked even inside a dead branch, so
        // nested IF/ENDIF pairs stay balanced.
        match opcode {
            Opcode::If | Opcode::NotIf => {
                let taken = if executing {
                    let cond = stack.pop_bool()?;
                    if matches!(opcode, Opcode::NotIf) {
                        !cond
                    } else {
                        cond
                    }
                } else {
                    false
                };
                branches.push(taken);
                pos += consumed;
                continue;
            }
            Opcode::Else => {
                let top = branches
                    .last_mut()
                    .ok_or(ScriptError::UnexpectedConditional)?;
                *top = !*top;
                pos += consumed;
                continue;
            }
            Opcode::EndIf => {
                branches.pop().ok_or(ScriptError::UnexpectedConditional)?;
                pos += consumed;
                continue;
            }
            _ if !executing => {
                pos += consumed;
                continue;
            }
            _ => {}
        }

        match opcode {
            Opcode::PushBytes(data) => stack.push(data)?,
            Opcode::SmallInt(n) => stack.push(encode_num(n as i64))?,

            Opcode::Nop | Opcode::Reserved => {}

            Opcode::Verify => {
                if !stack.pop_bool()? {
                    return Err(ScriptError::VerifyFailed);
                }
            }
            Opcode::Return => return Err(ScriptError::EarlyReturn),

            Opcode::ToAltStack => {
                let v = stack.pop()?;
                stack.alt.push(v);
            }
            Opcode::FromAltStack => {
                let v = stack.alt.pop().ok_or(ScriptError::StackUnderflow)?;
                stack.push(v)?;
            }
            Opcode::IfDup => {
                let top = stack.peek(0)?.clone();
                if cast_to_bool(&top) {
                    stack.push(top)?;
                }
            }
            Opcode::Depth => {
                let len = stack.main.len() as i64;
                stack.push(encode_num(len))?;
            }
            Opcode::Drop => {
                stack.pop()?;
            }
            Opcode::Dup => {
                let top = stack.peek(0)?.clone();
                stack.push(top)?;
            }
            Opcode::Nip => {
                let top = stack.pop()?;
                stack.pop()?;
                stack.push(top)?;
            }
            Opcode::Over => {
                let v = stack.peek(1)?.clone();
                stack.push(v)?;
            }
            Opcode::Pick => {
                let n = stack.pop_num()? as usize;
                let v = stack.peek(n)?.clone();
                stack.push(v)?;
            }
            Opcode::Roll => {
                let n = stack.pop_num()? as usize;
                let len = stack.main.len();
                if n >= len {
                    return Err(ScriptError::StackUnderflow);
                }
                let v = stack.main.remove(len - 1 - n);
                stack.push(v)?;
            }
            Opcode::Rot => {
                let len = stack.main.len();
                if len < 3 {
                    return Err(ScriptError::StackUnderflow);
                }
                stack.main.swap(len - 3, len - 2);
                stack.main.swap(len - 2, len - 1);
            }
            Opcode::Swap => {
                let len = stack.main.len();
                if len < 2 {
                    return Err(ScriptError::StackUnderflow);
                }
                stack.main.swap(len - 2, len - 1);
            }
            Opcode::Tuck => {
                let top = stack.pop()?;
                let second = stack.pop()?;
                stack.push(top.clone())?;
                stack.push(second)?;
                stack.push(top)?;
            }
            Opcode::TwoDrop => {
                stack.pop()?;
                stack.pop()?;
            }
            Opcode::TwoDup => {
                let b = stack.peek(0)?.clone();
                let a = stack.peek(1)?.clone();
                stack.push(a)?;
                stack.push(b)?;
            }
            Opcode::ThreeDup => {
                let c = stack.peek(0)?.clone();
                let b = stack.peek(1)?.clone();
                let a = stack.peek(2)?.clone();
                stack.push(a)?;
                stack.push(b)?;
                stack.push(c)?;
            }
            Opcode::TwoOver => {
                let b = stack.peek(2)?.clone();
                let a = stack.peek(3)?.clone();
                stack.push(a)?;
                stack.push(b)?;
            }
            Opcode::TwoRot => {
                let len = stack.main.len();
                if len < 6 {
                    return Err(ScriptError::StackUnderflow);
                }
                // moves the third-from-top pair to the top, preserving its
                // internal order: (x1 x2 x3 x4 x5 x6 -- x3 x4 x5 x6 x1 x2)
                let x1 = stack.main.remove(len - 6);
                let x2 = stack.main.remove(len - 6);
                stack.main.push(x1);
                stack.main.push(x2);
            }
            Opcode::TwoSwap => {
                let len = stack.main.len();
                if len < 4 {
                    return Err(ScriptError::StackUnderflow);
                }
                stack.main.swap(len - 4, len - 2);
                stack.main.swap(len - 3, len - 1);
            }

            Opcode::Cat
            | Opcode::Substr
            | Opcode::Left
            | Opcode::Right
            | Opcode::Invert
            | Opcode::And
            | Opcode::Or
            | Opcode::Xor
            | Opcode::TwoMul
            | Opcode::TwoDiv
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::LShift
            | Opcode::RShift => return Err(ScriptError::DisabledOpcode),

            Opcode::Size => {
                let len = stack.peek(0)?.len() as i64;
                stack.push(encode_num(len))?;
            }

            Opcode::Equal => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                stack.push(encode_bool(a == b))?;
            }
            Opcode::EqualVerify => {
                let b = stack.pop()?;
                let a = stack.pop()?;
                if a != b {
                    return Err(ScriptError::VerifyFailed);
                }
            }

            Opcode::OneAdd => {
                let n = stack.pop_num()?;
                stack.push(encode_num(n + 1))?;
            }
            Opcode::OneSub => {
                let n = stack.pop_num()?;
                stack.push(encode_num(n - 1))?;
            }
            Opcode::Negate => {
                let n = stack.pop_num()?;
                stack.push(encode_num(-n))?;
            }
            Opcode::Abs => {
                let n = stack.pop_num()?;
                stack.push(encode_num(n.abs()))?;
            }
            Opcode::Not => {
                let n = stack.pop_num()?;
                stack.push(encode_num((n == 0) as i64))?;
            }
            Opcode::ZeroNotEqual => {
                let n = stack.pop_num()?;
                stack.push(encode_num((n != 0) as i64))?;
            }
            Opcode::Add => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num(a + b))?;
            }
            Opcode::Sub => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num(a - b))?;
            }
            Opcode::BoolAnd => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a != 0 && b != 0) as i64))?;
            }
            Opcode::BoolOr => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a != 0 || b != 0) as i64))?;
            }
            Opcode::NumEqual => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a == b) as i64))?;
            }
            Opcode::NumEqualVerify => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                if a != b {
                    return Err(ScriptError::VerifyFailed);
                }
            }
            Opcode::NumNotEqual => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a != b) as i64))?;
            }
            Opcode::LessThan => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a < b) as i64))?;
            }
            Opcode::GreaterThan => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a > b) as i64))?;
            }
            Opcode::LessThanOrEqual => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a <= b) as i64))?;
            }
            Opcode::GreaterThanOrEqual => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num((a >= b) as i64))?;
            }
            Opcode::Min => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num(a.min(b)))?;
            }
            Opcode::Max => {
                let b = stack.pop_num()?;
                let a = stack.pop_num()?;
                stack.push(encode_num(a.max(b)))?;
            }
            Opcode::Within => {
                let max = stack.pop_num()?;
                let min = stack.pop_num()?;
                let n = stack.pop_num()?;
                stack.push(encode_num((n >= min && n < max) as i64))?;
            }

            Opcode::Ripemd160 => {
                let v = stack.pop()?;
                stack.push(crate::hashes::ripemd160(&v).to_vec())?;
            }
            Opcode::Sha1 => {
                let v = stack.pop()?;
                stack.push(crate::hashes::sha1(&v).to_vec())?;
            }
            Opcode::Sha256 => {
                let v = stack.pop()?;
                stack.push(crate::hashes::sha256(&v).to_vec())?;
            }
            Opcode::Hash160 => {
                let v = stack.pop()?;
                stack.push(crate::hashes::hash160(&v).to_vec())?;
            }
            Opcode::Hash256 => {
                let v = stack.pop()?;
                stack.push(crate::hashes::hash256(&v).to_vec())?;
            }
            Opcode::CodeSeparator => {
                code_separator = pos + consumed;
            }
            Opcode::CheckSig | Opcode::CheckSigVerify => {
                let public_key = stack.pop()?;
                let signature = stack.pop()?;
                let ok =
                    checker.check_signature(&signature, &public_key, &script_bytes[code_separator..])?;
                if matches!(opcode, Opcode::CheckSigVerify) {
                    if !ok {
                        return Err(ScriptError::VerifyFailed);
                    }
                } else {
                    stack.push(encode_bool(ok))?;
                }
            }
            Opcode::CheckMultiSig | Opcode::CheckMultiSigVerify => {
                let key_count = stack.pop_num()?;
                if !(0..=20).contains(&key_count) {
                    return Err(ScriptError::InvalidMultisigCount);
                }
                let mut keys = Vec::with_capacity(key_count as usize);
                for _ in 0..key_count {
                    keys.push(stack.pop()?);
                }
                let sig_count = stack.pop_num()?;
                if sig_count < 0 || sig_count > key_count {
                    return Err(ScriptError::InvalidMultisigCount);
                }
                let mut sigs = Vec::with_capacity(sig_count as usize);
                for _ in 0..sig_count {
                    sigs.push(stack.pop()?);
                }
                // off-by-one bug in the original implementation: CHECKMULTISIG
                // pops one extra stack element that it never uses.
                stack.pop()?;

                let mut key_iter = keys.iter();
                let mut all_matched = true;
                for sig in sigs.iter() {
                    let mut matched = false;
                    for key in key_iter.by_ref() {
                        if checker.check_signature(sig, key, &script_bytes[code_separator..])? {
                            matched = true;
                            break;
                        }
                    }
                    if !matched {
                        all_matched = false;
                        break;
                    }
                }

                if matches!(opcode, Opcode::CheckMultiSigVerify) {
                    if !all_matched {
                        return Err(ScriptError::VerifyFailed);
                    }
                } else {
                    stack.push(encode_bool(all_matched))?;
                }
            }

            Opcode::If | Opcode::NotIf | Opcode::Else | Opcode::EndIf => {
                unreachable!("handled above before the executing-branch check")
            }
        }

        pos += consumed;
    }

    if !branches.is_empty() {
        return Err(ScriptError::UnbalancedConditional);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &[u8]) -> Result<Stack, ScriptError> {
        node_test::init();
        let mut stack = Stack::new();
        eval_script(script, &mut stack, &NullChecker)?;
        Ok(stack)
    }

    #[test]
    fn add_two_small_ints() {
        // OP_2 OP_3 OP_ADD OP_5 OP_EQUAL
        let script = [0x52, 0x53, 0x93, 0x55, 0x87];
        let stack = run(&script).unwrap().into_elements();
        assert_eq!(stack.last(), Some(&vec![1]));
    }

    #[test]
    fn dup_and_equalverify() {
        // <1> OP_DUP OP_EQUAL
        let script = [0x01, 0x01, 0x76, 0x87];
        let stack = run(&script).unwrap().into_elements();
        assert_eq!(stack.last(), Some(&vec![1]));
    }

    #[test]
    fn if_else_takes_the_taken_branch() {
        // <1> OP_IF <2> OP_ELSE <3> OP_ENDIF
        let script = [0x01, 0x01, 0x63, 0x01, 0x02, 0x67, 0x01, 0x03, 0x68];
        let stack = run(&script).unwrap().into_elements();
        assert_eq!(stack.last(), Some(&vec![2]));
    }

    #[test]
    fn unbalanced_if_is_rejected() {
        // <1> OP_IF <2>  (missing ENDIF)
        let script = [0x01, 0x01, 0x63, 0x01, 0x02];
        assert_eq!(run(&script), Err(ScriptError::UnbalancedConditional));
    }

    #[test]
    fn op_return_fails_immediately() {
        let script = [0x6a];
        assert_eq!(run(&script), Err(ScriptError::EarlyReturn));
    }

    #[test]
    fn disabled_opcode_is_rejected() {
        // OP_CAT
        let script = [0x7e];
        assert_eq!(run(&script), Err(ScriptError::DisabledOpcode));
    }

    #[test]
    fn cast_to_bool_rejects_negative_zero() {
        assert!(!cast_to_bool(&[0x80]));
        assert!(!cast_to_bool(&[]));
        assert!(cast_to_bool(&[1]));
    }

    #[test]
    fn stack_overflow_is_rejected() {
        let mut stack = Stack::new();
        for _ in 0..MAX_STACK_ELEMENTS {
            stack.push(vec![1]).unwrap();
        }
        assert_eq!(stack.push(vec![1]), Err(ScriptError::StackOverflow));
    }
}
