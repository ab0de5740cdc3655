/// Elliptic curve key and signature types on secp256k1.
///
/// Key types carry their SEC1 compression preference so that scripts
/// built from them serialize the same bytes they were parsed from.

pub mod private_key;
pub mod public_key;
pub mod signature;

pub use private_key::PrivateKey;
pub use public_key::PublicKey;
pub use signature::Signature;
