//! Portable backend built on the pure-Rust `k256` crate.

use k256::ecdsa::signature::hazmat::PrehashVerifier;
use k256::ecdsa::{RecoveryId, Signature as K256Signature, VerifyingKey};

use super::EcAdapter;
use crate::ec::{PrivateKey, PublicKey, Signature};
use crate::PrimitivesError;

/// Pure-Rust secp256k1 backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct K256Adapter;

impl K256Adapter {
    /// Create the backend. It holds no state.
    pub fn new() -> Self {
        K256Adapter
    }

    fn sign_recoverable(
        &self,
        digest: &[u8; 32],
        key: &PrivateKey,
    ) -> Result<(Signature, u8), PrimitivesError> {
        let (k256_sig, recovery_id) = key.signing_key().sign_prehash_recoverable(digest)?;
        let (r_bytes, s_bytes) = k256_sig.split_bytes();
        let sig = Signature::new(r_bytes.into(), s_bytes.into());
        Ok((sig, recovery_id.to_byte()))
    }
}

impl EcAdapter for K256Adapter {
    fn name(&self) -> &'static str {
        "k256"
    }

    fn sign(&self, digest: &[u8; 32], key: &PrivateKey) -> Result<Signature, PrimitivesError> {
        let (sig, _) = self.sign_recoverable(digest, key)?;
        Ok(sig.normalize_s())
    }

    fn sign_compact(
        &self,
        digest: &[u8; 32],
        key: &PrivateKey,
    ) -> Result<[u8; 65], PrimitivesError> {
        let (sig, recovery_id) = self.sign_recoverable(digest, key)?;
        Ok(sig.to_compact(recovery_id, key.is_compressed()))
    }

    fn verify(&self, digest: &[u8; 32], pub_key: &[u8], der_sig: &[u8]) -> bool {
        let sig = match Signature::from_der_lax(der_sig) {
            Ok(sig) => sig.normalize_s(),
            Err(_) => return false,
        };
        let k256_sig = match K256Signature::from_scalars(
            k256::FieldBytes::from(*sig.r()),
            k256::FieldBytes::from(*sig.s()),
        ) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        let key = match PublicKey::from_bytes(pub_key) {
            Ok(key) => key,
            Err(err) => {
                tracing::trace!(backend = self.name(), %err, "rejecting public key");
                return false;
            }
        };
        key.verifying_key().verify_prehash(digest, &k256_sig).is_ok()
    }

    fn recover_pub_key(
        &self,
        digest: &[u8; 32],
        compact_sig: &[u8],
    ) -> Result<PublicKey, PrimitivesError> {
        let (sig, recovery_id, compressed) = Signature::from_compact(compact_sig)?;
        let recovery_id = RecoveryId::from_byte(recovery_id)
            .ok_or_else(|| PrimitivesError::InvalidSignature("invalid recovery id".to_string()))?;
        let k256_sig = K256Signature::from_scalars(
            k256::FieldBytes::from(*sig.r()),
            k256::FieldBytes::from(*sig.s()),
        )?;
        let recovered = VerifyingKey::recover_from_prehash(digest, &k256_sig, recovery_id)?;
        Ok(PublicKey::from_k256_verifying_key(&recovered, compressed))
    }
}
