use btc_script::interpreter::InterpreterError;

/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// An input index past the end of the transaction's inputs.
    #[error("input index {index} out of range (tx has {count} inputs)")]
    InputIndex { index: usize, count: usize },
    /// Caller-supplied data is structurally invalid (e.g. a redeem script
    /// that does not match the output, or an undefined sighash type).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Signing could not proceed (wrong key, invalid existing signatures).
    #[error("signing error: {0}")]
    Signing(String),
    /// An error occurred during binary/hex serialization or deserialization.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Script verification failed.
    #[error("verification failed: {0}")]
    Verification(#[from] InterpreterError),
    /// An underlying script error (forwarded from `btc-script`).
    #[error("script error: {0}")]
    Script(#[from] btc_script::ScriptError),
    /// An underlying primitives error (forwarded from `btc-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
