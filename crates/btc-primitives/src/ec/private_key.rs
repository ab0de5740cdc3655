//! secp256k1 private key.
//!
//! Wraps a k256 signing key, remembers whether its public key should be
//! serialized compressed, and supports hex and WIF encodings.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroize;

use crate::ec::public_key::PublicKey;
use crate::hash::sha256d;
use crate::PrimitivesError;

/// Length of a raw private key scalar in bytes.
const PRIVATE_KEY_BYTES_LEN: usize = 32;

/// WIF version byte for mainnet keys.
pub const MAINNET_WIF_PREFIX: u8 = 0x80;

/// WIF version byte for testnet and regtest keys.
pub const TESTNET_WIF_PREFIX: u8 = 0xef;

/// Trailing WIF byte marking a compressed public key.
const COMPRESS_MAGIC: u8 = 0x01;

/// A secp256k1 private key.
///
/// The raw scalar is zeroized on drop. Signing goes through an
/// [`EcAdapter`](crate::EcAdapter) backend rather than through this type.
#[derive(Clone, Debug)]
pub struct PrivateKey {
    inner: SigningKey,
    compressed: bool,
}

impl PrivateKey {
    /// Generate a random compressed private key using the OS RNG.
    pub fn new() -> Self {
        PrivateKey {
            inner: SigningKey::random(&mut OsRng),
            compressed: true,
        }
    }

    /// Create a compressed private key from 32 raw big-endian bytes.
    ///
    /// # Returns
    /// An error if the length is wrong or the scalar is zero or not below
    /// the curve order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        if bytes.len() != PRIVATE_KEY_BYTES_LEN {
            return Err(PrimitivesError::InvalidPrivateKey(format!(
                "expected {} bytes, got {}",
                PRIVATE_KEY_BYTES_LEN,
                bytes.len()
            )));
        }
        let inner = SigningKey::from_slice(bytes)
            .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
        Ok(PrivateKey {
            inner,
            compressed: true,
        })
    }

    /// Create a compressed private key from a 64-character hex string.
    pub fn from_hex(hex_str: &str) -> Result<Self, PrimitivesError> {
        if hex_str.is_empty() {
            return Err(PrimitivesError::InvalidPrivateKey(
                "private key hex is empty".to_string(),
            ));
        }
        let bytes = hex::decode(hex_str)?;
        Self::from_bytes(&bytes)
    }

    /// Decode a WIF string (mainnet or testnet).
    ///
    /// The compression flag is taken from the encoding: 38 decoded bytes
    /// with a trailing `0x01` is compressed, 37 bytes is uncompressed.
    pub fn from_wif(wif: &str) -> Result<Self, PrimitivesError> {
        let decoded = bs58::decode(wif)
            .into_vec()
            .map_err(|e| PrimitivesError::InvalidWif(e.to_string()))?;

        let compressed = match decoded.len() {
            38 if decoded[33] == COMPRESS_MAGIC => true,
            38 => {
                return Err(PrimitivesError::InvalidWif(
                    "malformed private key: invalid compression flag".to_string(),
                ))
            }
            37 => false,
            n => {
                return Err(PrimitivesError::InvalidWif(format!(
                    "malformed private key: invalid length {}",
                    n
                )))
            }
        };

        let (payload, checksum) = decoded.split_at(decoded.len() - 4);
        if sha256d(payload)[..4] != *checksum {
            return Err(PrimitivesError::ChecksumMismatch);
        }
        if payload[0] != MAINNET_WIF_PREFIX && payload[0] != TESTNET_WIF_PREFIX {
            return Err(PrimitivesError::InvalidWif(format!(
                "unknown version byte 0x{:02x}",
                payload[0]
            )));
        }

        let mut key = Self::from_bytes(&payload[1..1 + PRIVATE_KEY_BYTES_LEN])?;
        key.compressed = compressed;
        Ok(key)
    }

    /// Encode as a mainnet WIF string.
    pub fn to_wif(&self) -> String {
        self.to_wif_prefix(MAINNET_WIF_PREFIX)
    }

    /// Encode as a WIF string with the given version byte.
    pub fn to_wif_prefix(&self, prefix: u8) -> String {
        let mut payload = Vec::with_capacity(1 + PRIVATE_KEY_BYTES_LEN + 1 + 4);
        payload.push(prefix);
        let mut key_bytes = self.to_bytes();
        payload.extend_from_slice(&key_bytes);
        key_bytes.zeroize();
        if self.compressed {
            payload.push(COMPRESS_MAGIC);
        }
        let checksum = sha256d(&payload);
        payload.extend_from_slice(&checksum[..4]);
        let wif = bs58::encode(&payload).into_string();
        payload.zeroize();
        wif
    }

    /// Return a copy of this key that produces uncompressed public keys.
    pub fn uncompressed(mut self) -> Self {
        self.compressed = false;
        self
    }

    /// Whether the public key for this private key serializes compressed.
    pub fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Serialize the private key scalar as 32 big-endian bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes().into()
    }

    /// Serialize the private key as a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Derive the corresponding public key, keeping the compression flag.
    pub fn pub_key(&self) -> PublicKey {
        PublicKey::from_k256_verifying_key(self.inner.verifying_key(), self.compressed)
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.inner
    }
}

impl Default for PrivateKey {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        let mut bytes = self.inner.to_bytes();
        bytes.zeroize();
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.to_bytes() == other.to_bytes() && self.compressed == other.compressed
    }
}

impl Eq for PrivateKey {}
