//! The opcode set as a tagged variant, not a byte-keyed function table.
//!
//! Every opcode byte decodes to exactly one `Opcode` variant up front, and
//! the interpreter's `eval_script` matches on it exhaustively. An unknown
//! byte is a decode-time error, not a silent no-op dispatched through a
//! missing table entry.

use crate::error::ScriptError;

/// A single decoded script opcode.
///
/// `PushBytes` covers every data-push opcode (`OP_0` through `OP_PUSHDATA4`):
/// the byte actually pushed is decided while decoding the script, so by the
/// time it reaches the interpreter it's already just "push these bytes."
/// `SmallInt` covers `OP_1NEGATE` and `OP_1` through `OP_16`, which push a
/// fixed number rather than bytes read from the script body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Push `data` onto the stack. Constructed from `OP_0`/`OP_FALSE`
    /// (empty), direct-length pushes (`0x01..=0x4b`), and `OP_PUSHDATA1/2/4`.
    PushBytes(Vec<u8>),
    /// `OP_1NEGATE`, `OP_1`..`OP_16`: push the constant `n`.
    SmallInt(i8),

    // -- flow control --
    Nop,
    If,
    NotIf,
    Else,
    EndIf,
    Verify,
    Return,

    // -- stack --
    ToAltStack,
    FromAltStack,
    IfDup,
    Depth,
    Drop,
    Dup,
    Nip,
    Over,
    Pick,
    Roll,
    Rot,
    Swap,
    Tuck,
    TwoDrop,
    TwoDup,
    ThreeDup,
    TwoOver,
    TwoRot,
    TwoSwap,

    // -- splice (disabled since the 2010 patch, kept so scripts still decode) --
    Cat,
    Substr,
    Left,
    Right,
    Size,

    // -- bitwise (also disabled, except Equal/EqualVerify) --
    Invert,
    And,
    Or,
    Xor,
    Equal,
    EqualVerify,

    // -- arithmetic --
    OneAdd,
    OneSub,
    TwoMul,
    TwoDiv,
    Negate,
    Abs,
    Not,
    ZeroNotEqual,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    LShift,
    RShift,
    BoolAnd,
    BoolOr,
    NumEqual,
    NumEqualVerify,
    NumNotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    Min,
    Max,
    Within,

    // -- hashing --
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
    CodeSeparator,
    CheckSig,
    CheckSigVerify,
    CheckMultiSig,
    CheckMultiSigVerify,

    /// An opcode number reserved for template-matching convenience
    /// (`OP_RESERVED`, `OP_VER`, `OP_VERIF`, `OP_VERNOTIF`, `OP_RESERVED1`,
    /// `OP_RESERVED2`) or the `OP_NOP1`/`OP_NOP4..OP_NOP10` no-op range.
    Reserved,
}

impl Opcode {
    /// Decodes the single opcode at the front of `bytes`, consuming any
    /// push-data length bytes and payload it requires. Returns the opcode
    /// and the number of script bytes it consumed.
    pub fn decode(bytes: &[u8]) -> Result<(Opcode, usize), ScriptError> {
        let tag = *bytes.first().ok_or(ScriptError::TruncatedPush)?;
        match tag {
            0x00 => Ok((Opcode::PushBytes(Vec::new()), 1)),
            0x01..=0x4b => {
                let len = tag as usize;
                let data = bytes.get(1..1 + len).ok_or(ScriptError::TruncatedPush)?;
                Ok((Opcode::PushBytes(data.to_vec()), 1 + len))
            }
            0x4c => decode_pushdata(bytes, 1),
            0x4d => decode_pushdata(bytes, 2),
            0x4e => decode_pushdata(bytes, 4),
            0x4f => Ok((Opcode::SmallInt(-1), 1)),
            0x50 => Ok((Opcode::Reserved, 1)),
            0x51..=0x60 => Ok((Opcode::SmallInt((tag - 0x50) as i8), 1)),
            0x61 => Ok((Opcode::Nop, 1)),
            0x62 => Ok((Opcode::Reserved, 1)),
            0x63 => Ok((Opcode::If, 1)),
            0x64 => Ok((Opcode::NotIf, 1)),
            0x65 | 0x66 => Ok((Opcode::Reserved, 1)),
            0x67 => Ok((Opcode::Else, 1)),
            0x68 => Ok((Opcode::EndIf, 1)),
            0x69 => Ok((Opcode::Verify, 1)),
            0x6a => Ok((Opcode::Return, 1)),
            0x6b => Ok((Opcode::ToAltStack, 1)),
            0x6c => Ok((Opcode::FromAltStack, 1)),
            0x6d => Ok((Opcode::TwoDrop, 1)),
            0x6e => Ok((Opcode::TwoDup, 1)),
            0x6f => Ok((Opcode::ThreeDup, 1)),
            0x70 => Ok((Opcode::TwoOver, 1)),
            0x71 => Ok((Opcode::TwoRot, 1)),
            0x72 => Ok((Opcode::TwoSwap, 1)),
            0x73 => Ok((Opcode::IfDup, 1)),
            0x74 => Ok((Opcode::Depth, 1)),
            0x75 => Ok((Opcode::Drop, 1)),
            0x76 => Ok((Opcode::Dup, 1)),
            0x77 => Ok((Opcode::Nip, 1)),
            0x78 => Ok((Opcode::Over, 1)),
            0x79 => Ok((Opcode::Pick, 1)),
            0x7a => Ok((Opcode::Roll, 1)),
            0x7b => Ok((Opcode::Rot, 1)),
            0x7c => Ok((Opcode::Swap, 1)),
            0x7d => Ok((Opcode::Tuck, 1)),
            0x7e => Ok((Opcode::Cat, 1)),
            0x7f => Ok((Opcode::Substr, 1)),
            0x80 => Ok((Opcode::Left, 1)),
            0x81 => Ok((Opcode::Right, 1)),
            0x82 => Ok((Opcode::Size, 1)),
            0x83 => Ok((Opcode::Invert, 1)),
            0x84 => Ok((Opcode::And, 1)),
            0x85 => Ok((Opcode::Or, 1)),
            0x86 => Ok((Opcode::Xor, 1)),
            0x87 => Ok((Opcode::Equal, 1)),
            0x88 => Ok((Opcode::EqualVerify, 1)),
            0x89 | 0x8a => Ok((Opcode::Reserved, 1)),
            0x8b => Ok((Opcode::OneAdd, 1)),
            0x8c => Ok((Opcode::OneSub, 1)),
            0x8d => Ok((Opcode::TwoMul, 1)),
            0x8e => Ok((Opcode::TwoDiv, 1)),
            0x8f => Ok((Opcode::Negate, 1)),
            0x90 => Ok((Opcode::Abs, 1)),
            0x91 => Ok((Opcode::Not, 1)),
            0x92 => Ok((Opcode::ZeroNotEqual, 1)),
            0x93 => Ok((Opcode::Add, 1)),
            0x94 => Ok((Opcode::Sub, 1)),
            0x95 => Ok((Opcode::Mul, 1)),
            0x96 => Ok((Opcode::Div, 1)),
            0x97 => Ok((Opcode::Mod, 1)),
            0x98 => Ok((Opcode::LShift, 1)),
            0x99 => Ok((Opcode::RShift, 1)),
            0x9a => Ok((Opcode::BoolAnd, 1)),
            0x9b => Ok((Opcode::BoolOr, 1)),
            0x9c => Ok((Opcode::NumEqual, 1)),
            0x9d => Ok((Opcode::NumEqualVerify, 1)),
            0x9e => Ok((Opcode::NumNotEqual, 1)),
            0x9f => Ok((Opcode::LessThan, 1)),
            0xa0 => Ok((Opcode::GreaterThan, 1)),
            0xa1 => Ok((Opcode::LessThanOrEqual, 1)),
            0xa2 => Ok((Opcode::GreaterThanOrEqual, 1)),
            0xa3 => Ok((Opcode::Min, 1)),
            0xa4 => Ok((Opcode::Max, 1)),
            0xa5 => Ok((Opcode::Within, 1)),
            0xa6 => Ok((Opcode::Ripemd160, 1)),
            0xa7 => Ok((Opcode::Sha1, 1)),
            0xa8 => Ok((Opcode::Sha256, 1)),
            0xa9 => Ok((Opcode::Hash160, 1)),
            0xaa => Ok((Opcode::Hash256, 1)),
            0xab => Ok((Opcode::CodeSeparator, 1)),
            0xac => Ok((Opcode::CheckSig, 1)),
            0xad => Ok((Opcode::CheckSigVerify, 1)),
            0xae => Ok((Opcode::CheckMultiSig, 1)),
            0xaf => Ok((Opcode::CheckMultiSigVerify, 1)),
            0xb0..=0xb9 => Ok((Opcode::Reserved, 1)),
            _ => Err(ScriptError::UnknownOpcode(tag)),
        }
    }
}

fn decode_pushdata(bytes: &[u8], len_bytes: usize) -> Result<(Opcode, usize), ScriptError> {
    let header = 1 + len_bytes;
    let len_field = bytes.get(1..header).ok_or(ScriptError::TruncatedPush)?;
    let len = match len_bytes {
        1 => len_field[0] as usize,
        2 => u16::from_le_bytes([len_field[0], len_field[1]]) as usize,
        4 => u32::from_le_bytes([len_field[0], len_field[1], len_field[2], len_field[3]]) as usize,
        _ => unreachable!("only OP_PUSHDATA1/2/4 call this helper"),
    };
    let data = bytes
        .get(header..header + len)
        .ok_or(ScriptError::TruncatedPush)?;
    Ok((Opcode::PushBytes(data.to_vec()), header + len))
}
