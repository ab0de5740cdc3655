//! The elliptic-curve capability used by script verification and signing.
//!
//! Callers pick a backend and pass it in explicitly; nothing in the SDK
//! holds a process-wide default. Both backends produce identical
//! RFC6979 low-S signatures, so they can be swapped freely.

mod k256_adapter;
mod secp256k1_adapter;

pub use k256_adapter::K256Adapter;
pub use secp256k1_adapter::Secp256k1Adapter;

use crate::ec::{PrivateKey, PublicKey, Signature};
use crate::PrimitivesError;

/// ECDSA over secp256k1 on 32-byte digests.
pub trait EcAdapter: Send + Sync {
    /// Short backend name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Sign `digest` with RFC6979 nonces, returning a low-S signature.
    fn sign(&self, digest: &[u8; 32], key: &PrivateKey) -> Result<Signature, PrimitivesError>;

    /// Sign `digest` and return a 65-byte compact recoverable signature.
    fn sign_compact(&self, digest: &[u8; 32], key: &PrivateKey)
        -> Result<[u8; 65], PrimitivesError>;

    /// Verify a DER signature (without sighash byte) against a SEC1 public
    /// key. Lax DER is accepted and high S is normalized before checking;
    /// encoding strictness is the caller's policy. Unparseable input
    /// yields `false`.
    fn verify(&self, digest: &[u8; 32], pub_key: &[u8], der_sig: &[u8]) -> bool;

    /// Recover the signing public key from a compact signature.
    fn recover_pub_key(
        &self,
        digest: &[u8; 32],
        compact_sig: &[u8],
    ) -> Result<PublicKey, PrimitivesError>;
}

/// The portable backend, boxed.
pub fn default_adapter() -> Box<dyn EcAdapter> {
    Box::new(K256Adapter::new())
}
