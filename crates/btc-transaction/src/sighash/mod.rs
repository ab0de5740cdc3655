//! Signature hash computation for transaction signing.
//!
//! Computes the digest that is signed by ECDSA to authorize spending a
//! transaction input. Two algorithms exist: the original (legacy) one used
//! by scriptSig and P2SH spends, and BIP143 used by witness v0 programs,
//! which commits to the spent amount.
//!
//! The engine borrows the transaction and caches the BIP143 midstate
//! hashes, so signing or verifying many inputs of one transaction hashes
//! the prevouts, sequences and outputs once.

mod legacy;
mod witness_v0;

use std::cell::OnceCell;
use std::fmt;
use std::ops::BitOr;

use btc_script::Script;

pub use btc_script::interpreter::SigVersion;
pub use legacy::{legacy_preimage, SIGHASH_SINGLE_BUG};
pub use witness_v0::witness_v0_preimage;

use crate::transaction::Transaction;
use crate::TransactionError;

/// Mask applied to extract the base sighash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// A sighash type: a base mode optionally combined with ANYONECANPAY.
///
/// Any 32-bit value is accepted for hashing (it is committed to verbatim);
/// [`SigHashType::is_defined`] tells whether it is one of the six standard
/// values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SigHashType(pub u32);

impl SigHashType {
    /// Sign all inputs and all outputs (the default).
    pub const ALL: SigHashType = SigHashType(0x01);
    /// Sign all inputs but no outputs, allowing outputs to be modified.
    pub const NONE: SigHashType = SigHashType(0x02);
    /// Sign all inputs and only the output with the same index as the input.
    pub const SINGLE: SigHashType = SigHashType(0x03);
    /// Combined with a base type: only sign the current input, allowing
    /// other inputs to be added later.
    pub const ANYONECANPAY: SigHashType = SigHashType(0x80);

    /// The base mode with ANYONECANPAY masked off.
    pub fn base_type(self) -> u32 {
        self.0 & SIGHASH_MASK
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & Self::ANYONECANPAY.0 != 0
    }

    pub fn is_none(self) -> bool {
        self.base_type() == Self::NONE.0
    }

    pub fn is_single(self) -> bool {
        self.base_type() == Self::SINGLE.0
    }

    /// One of ALL, NONE, SINGLE, each with or without ANYONECANPAY.
    pub fn is_defined(self) -> bool {
        let base = self.0 & !Self::ANYONECANPAY.0;
        (Self::ALL.0..=Self::SINGLE.0).contains(&base)
    }

    /// The single byte appended to a DER signature.
    pub fn to_byte(self) -> u8 {
        self.0 as u8
    }
}

impl Default for SigHashType {
    fn default() -> Self {
        SigHashType::ALL
    }
}

impl BitOr for SigHashType {
    type Output = SigHashType;

    fn bitor(self, rhs: SigHashType) -> SigHashType {
        SigHashType(self.0 | rhs.0)
    }
}

impl From<u8> for SigHashType {
    fn from(byte: u8) -> Self {
        SigHashType(byte as u32)
    }
}

impl fmt::Display for SigHashType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let base = match self.base_type() {
            0x01 => "ALL",
            0x02 => "NONE",
            0x03 => "SINGLE",
            _ => return write!(f, "0x{:08x}", self.0),
        };
        if self.anyone_can_pay() {
            write!(f, "{}|ANYONECANPAY", base)
        } else {
            f.write_str(base)
        }
    }
}

/// Computes signature hashes for the inputs of one transaction.
pub struct SigHashEngine<'a> {
    tx: &'a Transaction,
    hash_prevouts: OnceCell<[u8; 32]>,
    hash_sequence: OnceCell<[u8; 32]>,
    hash_outputs: OnceCell<[u8; 32]>,
}

impl<'a> SigHashEngine<'a> {
    pub fn new(tx: &'a Transaction) -> Self {
        SigHashEngine {
            tx,
            hash_prevouts: OnceCell::new(),
            hash_sequence: OnceCell::new(),
            hash_outputs: OnceCell::new(),
        }
    }

    /// The transaction being hashed.
    pub fn transaction(&self) -> &'a Transaction {
        self.tx
    }

    /// Compute the digest signed for input `input_index`.
    ///
    /// # Arguments
    /// * `script_code`  - The script being satisfied (after the last executed
    ///   OP_CODESEPARATOR; the synthesized P2PKH script for P2WPKH).
    /// * `input_index`  - Index of the input being signed.
    /// * `sighash_type` - The sighash flags committed to.
    /// * `amount`       - Value of the spent output; only witness v0 commits to it.
    /// * `sig_version`  - Selects the legacy or BIP143 algorithm.
    ///
    /// # Returns
    /// The 32-byte double-SHA256 digest, or `InputIndex` if the index is out
    /// of range.
    pub fn calculate(
        &self,
        script_code: &Script,
        input_index: usize,
        sighash_type: SigHashType,
        amount: i64,
        sig_version: SigVersion,
    ) -> Result<[u8; 32], TransactionError> {
        self.tx.input(input_index)?;
        tracing::trace!(input_index, %sighash_type, ?sig_version, "computing sighash");

        match sig_version {
            SigVersion::Base => legacy::signature_hash(self.tx, script_code, input_index, sighash_type),
            SigVersion::WitnessV0 => {
                witness_v0::signature_hash(self, script_code, input_index, sighash_type, amount)
            }
        }
    }

    pub(crate) fn hash_prevouts(&self) -> [u8; 32] {
        *self
            .hash_prevouts
            .get_or_init(|| witness_v0::prevouts_hash(self.tx))
    }

    pub(crate) fn hash_sequence(&self) -> [u8; 32] {
        *self
            .hash_sequence
            .get_or_init(|| witness_v0::sequence_hash(self.tx))
    }

    pub(crate) fn hash_outputs(&self) -> [u8; 32] {
        *self
            .hash_outputs
            .get_or_init(|| witness_v0::outputs_hash(&self.tx.outputs))
    }
}

impl fmt::Debug for SigHashEngine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigHashEngine")
            .field("txid", &self.tx.txid_hex())
            .finish_non_exhaustive()
    }
}

/// One-shot convenience over [`SigHashEngine::calculate`].
pub fn signature_hash(
    tx: &Transaction,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
    amount: i64,
    sig_version: SigVersion,
) -> Result<[u8; 32], TransactionError> {
    SigHashEngine::new(tx).calculate(script_code, input_index, sighash_type, amount, sig_version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sighash_type_parts() {
        let t = SigHashType::SINGLE | SigHashType::ANYONECANPAY;
        assert_eq!(t.0, 0x83);
        assert_eq!(t.base_type(), 0x03);
        assert!(t.anyone_can_pay());
        assert!(t.is_single());
        assert!(!t.is_none());
        assert_eq!(t.to_string(), "SINGLE|ANYONECANPAY");
        assert_eq!(SigHashType::default(), SigHashType::ALL);
    }

    #[test]
    fn test_sighash_type_defined() {
        for v in [0x01u32, 0x02, 0x03, 0x81, 0x82, 0x83] {
            assert!(SigHashType(v).is_defined(), "{:#x}", v);
        }
        for v in [0x00u32, 0x04, 0x41, 0x80, 0x84, 0x101] {
            assert!(!SigHashType(v).is_defined(), "{:#x}", v);
        }
        assert_eq!(SigHashType(0x41).to_string(), "ALL");
        assert_eq!(SigHashType(0x04).to_string(), "0x00000004");
    }
}
