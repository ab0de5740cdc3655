//! secp256k1 public key.
//!
//! Parses SEC1 compressed and uncompressed encodings and re-serializes in
//! the encoding it was created with, since scripts commit to exact bytes.

use k256::ecdsa::VerifyingKey;
use std::fmt;

use crate::hash::hash160;
use crate::PrimitivesError;

/// Length of a SEC1 compressed public key.
pub const COMPRESSED_LEN: usize = 33;

/// Length of a SEC1 uncompressed public key.
pub const UNCOMPRESSED_LEN: usize = 65;

/// A secp256k1 public key with its serialization preference.
#[derive(Clone, Debug)]
pub struct PublicKey {
    inner: VerifyingKey,
    compressed: bool,
}

impl PublicKey {
    /// Parse a public key from SEC1 bytes (33-byte compressed or 65-byte
    /// uncompressed). The point must lie on the curve.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let compressed = match bytes.len() {
            COMPRESSED_LEN if bytes[0] == 0x02 || bytes[0] == 0x03 => true,
            UNCOMPRESSED_LEN if bytes[0] == 0x04 => false,
            0 => {
                return Err(PrimitivesError::InvalidPublicKey(
                    "pubkey is empty".to_string(),
                ))
            }
            n => {
                return Err(PrimitivesError::InvalidPublicKey(format!(
                    "unsupported encoding: prefix 0x{:02x}, length {}",
                    bytes[0], n
                )))
            }
        };
        let inner = VerifyingKey::from_sec1_bytes(bytes)
            .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
        Ok(PublicKey { inner, compressed })
    }

    /// Parse a public key from a hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Serialize in the encoding this key carries.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner
            .to_encoded_point(self.compressed)
            .as_bytes()
            .to_vec()
    }

    /// Serialize in 33-byte compressed SEC1 form.
    pub fn to_compressed(&self) -> [u8; COMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(true);
        let mut out = [0u8; COMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Serialize in 65-byte uncompressed SEC1 form.
    pub fn to_uncompressed(&self) -> [u8; UNCOMPRESSED_LEN] {
        let point = self.inner.to_encoded_point(false);
        let mut out = [0u8; UNCOMPRESSED_LEN];
        out.copy_from_slice(point.as_bytes());
        out
    }

    /// Whether this key serializes compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Hex of [`to_bytes`](Self::to_bytes).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Hash160 of the serialized key, as committed to by P2PKH and P2WPKH.
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.to_bytes())
    }

    pub(crate) fn from_k256_verifying_key(vk: &VerifyingKey, compressed: bool) -> Self {
        PublicKey {
            inner: *vk,
            compressed,
        }
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.inner
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PublicKey {}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
