/// Error types for script operations.
///
/// Covers parsing errors, encoding/decoding failures and template
/// construction problems. Runtime failures of the interpreter use
/// [`crate::interpreter::InterpreterError`] instead.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// Generic invalid script error.
    #[error("invalid script: {0}")]
    InvalidScript(String),

    /// A push operand declares more bytes than remain in the script.
    #[error("malformed push at offset {offset}: need {needed} bytes, {remaining} remaining")]
    MalformedPush {
        /// Byte offset of the push opcode.
        offset: usize,
        /// Bytes the push declares.
        needed: usize,
        /// Bytes actually left in the script.
        remaining: usize,
    },

    /// Unknown token while parsing ASM.
    #[error("invalid opcode data: {0}")]
    InvalidOpcodeData(String),

    /// Attempted to append a push data opcode as a bare opcode.
    #[error("use push_data for push opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Push data exceeds maximum allowed size.
    #[error("data too big: {0} bytes")]
    DataTooBig(usize),

    /// Multisig template parameters out of range.
    #[error("invalid multisig parameters: {required} of {total}")]
    InvalidMultisig {
        /// Signatures required.
        required: usize,
        /// Keys offered.
        total: usize,
    },

    /// Hex decoding error.
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Error from primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
