/// Unified error type for all primitives operations.
///
/// Covers errors from key parsing, signature encoding, EC backends and
/// binary decoding.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    #[error("invalid WIF format: {0}")]
    InvalidWif(String),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("EC backend {backend} failed: {reason}")]
    Backend { backend: &'static str, reason: String },

    #[error("varint too large")]
    VarIntTooLarge,

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("{0}")]
    Other(String),
}

impl From<hex::FromHexError> for PrimitivesError {
    fn from(e: hex::FromHexError) -> Self {
        PrimitivesError::InvalidHex(e.to_string())
    }
}

impl From<k256::ecdsa::Error> for PrimitivesError {
    fn from(e: k256::ecdsa::Error) -> Self {
        PrimitivesError::Backend {
            backend: "k256",
            reason: e.to_string(),
        }
    }
}

impl From<secp256k1::Error> for PrimitivesError {
    fn from(e: secp256k1::Error) -> Self {
        PrimitivesError::Backend {
            backend: "libsecp256k1",
            reason: e.to_string(),
        }
    }
}
