use thiserror::Error;

/// An error produced while evaluating or signing a script.
///
/// Mirrors `node_chain::SerializationError`'s shape: a small closed set of
/// variants, each carrying just enough context to explain the failure to a
/// caller deciding whether a transaction is valid.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// tried to pop from an empty stack
    #[error("tried to pop from an empty stack")]
    StackUnderflow,
    /// the stack held more than 1000 elements after a push
    #[error("stack exceeded 1000 elements")]
    StackOverflow,
    /// encountered an opcode byte with no known meaning
    #[error("unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),
    /// encountered a splice/bitwise/arithmetic opcode disabled since 2010
    #[error("opcode is disabled")]
    DisabledOpcode,
    /// an OP_VERIFY-family opcode found a falsy value on top of the stack
    #[error("verify opcode failed: top of stack was falsy")]
    VerifyFailed,
    /// OP_RETURN was executed
    #[error("script returned early via OP_RETURN")]
    EarlyReturn,
    /// an IF/NOTIF was not matched by a closing ENDIF
    #[error("unbalanced conditional: missing ENDIF")]
    UnbalancedConditional,
    /// ELSE or ENDIF encountered with no matching IF/NOTIF
    #[error("ELSE or ENDIF with no matching IF/NOTIF")]
    UnexpectedConditional,
    /// a push opcode asked for more bytes than remained in the script
    #[error("push opcode truncated: not enough bytes remain")]
    TruncatedPush,
    /// a number pushed to the stack used more than 4 bytes
    #[error("numeric stack value exceeded 4 bytes")]
    NumberOverflow,
    /// OP_CHECKMULTISIG's key or signature count was out of range
    #[error("CHECKMULTISIG key or signature count out of range")]
    InvalidMultisigCount,
    /// the script exceeded the maximum number of executed opcodes
    #[error("exceeded the maximum operation count")]
    TooManyOperations,
    /// the final stack was empty or its top element was falsy
    #[error("script evaluation left an empty or falsy stack")]
    ScriptFailed,
    /// the lock script didn't match a known spendable template
    #[error("lock script does not match a known template")]
    NonStandardTemplate,
    /// a signature or public key was malformed and could not be parsed
    #[error("invalid signature or key encoding: {0}")]
    InvalidEncoding(String),
}
