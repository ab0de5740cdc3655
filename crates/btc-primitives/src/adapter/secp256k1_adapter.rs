//! Native backend linking Bitcoin Core's libsecp256k1 through the
//! `secp256k1` crate.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature as NativeSignature};
use secp256k1::{All, Message, Secp256k1, SecretKey};

use super::EcAdapter;
use crate::ec::{PrivateKey, PublicKey, Signature};
use crate::PrimitivesError;

/// libsecp256k1-backed secp256k1 backend.
///
/// Owns a signing and verification context, so build one and share it
/// rather than creating one per operation.
pub struct Secp256k1Adapter {
    ctx: Secp256k1<All>,
}

impl Secp256k1Adapter {
    /// Allocate a full (signing + verification) context.
    pub fn new() -> Self {
        Secp256k1Adapter {
            ctx: Secp256k1::new(),
        }
    }

    fn secret_key(key: &PrivateKey) -> Result<SecretKey, PrimitivesError> {
        Ok(SecretKey::from_slice(&key.to_bytes())?)
    }
}

impl Default for Secp256k1Adapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Secp256k1Adapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secp256k1Adapter")
    }
}

impl EcAdapter for Secp256k1Adapter {
    fn name(&self) -> &'static str {
        "libsecp256k1"
    }

    fn sign(&self, digest: &[u8; 32], key: &PrivateKey) -> Result<Signature, PrimitivesError> {
        let secret = Self::secret_key(key)?;
        let sig = self.ctx.sign_ecdsa(&Message::from_digest(*digest), &secret);
        let compact = sig.serialize_compact();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&compact[..32]);
        s.copy_from_slice(&compact[32..]);
        Ok(Signature::new(r, s))
    }

    fn sign_compact(
        &self,
        digest: &[u8; 32],
        key: &PrivateKey,
    ) -> Result<[u8; 65], PrimitivesError> {
        let secret = Self::secret_key(key)?;
        let sig = self
            .ctx
            .sign_ecdsa_recoverable(&Message::from_digest(*digest), &secret);
        let (recovery_id, rs) = sig.serialize_compact();
        let mut out = [0u8; 65];
        out[0] = 27 + recovery_id.to_i32() as u8 + if key.is_compressed() { 4 } else { 0 };
        out[1..].copy_from_slice(&rs);
        Ok(out)
    }

    fn verify(&self, digest: &[u8; 32], pub_key: &[u8], der_sig: &[u8]) -> bool {
        let mut sig = match NativeSignature::from_der_lax(der_sig) {
            Ok(sig) => sig,
            Err(_) => return false,
        };
        sig.normalize_s();
        let key = match secp256k1::PublicKey::from_slice(pub_key) {
            Ok(key) => key,
            Err(err) => {
                tracing::trace!(backend = self.name(), %err, "rejecting public key");
                return false;
            }
        };
        self.ctx
            .verify_ecdsa(&Message::from_digest(*digest), &sig, &key)
            .is_ok()
    }

    fn recover_pub_key(
        &self,
        digest: &[u8; 32],
        compact_sig: &[u8],
    ) -> Result<PublicKey, PrimitivesError> {
        let (_, recovery_id, compressed) = Signature::from_compact(compact_sig)?;
        let recovery_id = RecoveryId::from_i32(recovery_id as i32)?;
        let sig = RecoverableSignature::from_compact(&compact_sig[1..], recovery_id)?;
        let key = self.ctx.recover_ecdsa(&Message::from_digest(*digest), &sig)?;
        if compressed {
            PublicKey::from_bytes(&key.serialize())
        } else {
            PublicKey::from_bytes(&key.serialize_uncompressed())
        }
    }
}
