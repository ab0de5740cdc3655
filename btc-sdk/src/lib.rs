#![deny(missing_docs)]

//! Bitcoin SDK - script, signature hashing and signing.
//!
//! Re-exports all SDK components for convenient single-crate usage.

pub use btc_primitives as primitives;
pub use btc_script as script;
pub use btc_transaction as transaction;
