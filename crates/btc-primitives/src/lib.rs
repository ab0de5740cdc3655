/// Bitcoin SDK - Cryptographic primitives, hashing, and utilities.
///
/// This crate provides the foundational building blocks for the SDK:
/// - Hash functions (SHA-1, SHA-256, SHA-256d, RIPEMD-160, Hash160)
/// - secp256k1 private keys, public keys and ECDSA signatures
/// - The `EcAdapter` capability with a portable and a native backend
/// - Variable-length integer encoding and little-endian byte readers/writers

pub mod hash;
pub mod util;
pub mod ec;
pub mod adapter;

mod error;
pub use adapter::{EcAdapter, K256Adapter, Secp256k1Adapter};
pub use error::PrimitivesError;
