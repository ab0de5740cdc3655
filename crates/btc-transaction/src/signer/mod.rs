//! Progressive transaction signing.
//!
//! A [`Signer`] wraps an unsigned or partially signed transaction. Each
//! input gets an [`InputSigner`] on first use, which picks up signatures
//! already on the input, so several parties can sign the same
//! transaction in turn: each builds a `Signer` over the previous result,
//! adds signatures and hands on [`Signer::get`].
//!
//! Signing is monotonic: existing signatures are never replaced, and
//! signing twice with the same key changes nothing.

mod input_signer;
mod sign_data;

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fmt;

use btc_primitives::ec::PrivateKey;
use btc_primitives::EcAdapter;

pub use input_signer::{InputSigner, SigValues};
pub use sign_data::SignData;

use crate::output::TransactionOutput;
use crate::sighash::SigHashType;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Signs the inputs of one transaction.
pub struct Signer<'a> {
    tx: Transaction,
    adapter: &'a dyn EcAdapter,
    inputs: BTreeMap<usize, InputSigner<'a>>,
    pad_unsigned_multisigs: bool,
    tolerate_invalid_public_key: bool,
}

impl<'a> Signer<'a> {
    pub fn new(tx: Transaction, adapter: &'a dyn EcAdapter) -> Self {
        Signer {
            tx,
            adapter,
            inputs: BTreeMap::new(),
            pad_unsigned_multisigs: false,
            tolerate_invalid_public_key: false,
        }
    }

    /// See [`InputSigner::pad_unsigned_multisigs`]. Applies to inputs
    /// opened after this call.
    pub fn pad_unsigned_multisigs(mut self, setting: bool) -> Self {
        self.pad_unsigned_multisigs = setting;
        self
    }

    /// See [`InputSigner::tolerate_invalid_public_key`]. Applies to inputs
    /// opened after this call.
    pub fn tolerate_invalid_public_key(mut self, setting: bool) -> Self {
        self.tolerate_invalid_public_key = setting;
        self
    }

    /// The signer for input `index`, created and loaded with the input's
    /// existing signatures on first access.
    ///
    /// Later calls for the same index return the existing signer and
    /// ignore `spent_output` and `sign_data`.
    pub fn input(
        &mut self,
        index: usize,
        spent_output: &TransactionOutput,
        sign_data: SignData,
    ) -> Result<&mut InputSigner<'a>, TransactionError> {
        match self.inputs.entry(index) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mut signer =
                    InputSigner::new(self.adapter, &self.tx, index, spent_output, &sign_data)?;
                signer
                    .pad_unsigned_multisigs(self.pad_unsigned_multisigs)
                    .tolerate_invalid_public_key(self.tolerate_invalid_public_key)
                    .extract()?;
                Ok(entry.insert(signer))
            }
        }
    }

    /// Sign input `index` with `key`.
    pub fn sign(
        &mut self,
        index: usize,
        key: &PrivateKey,
        spent_output: &TransactionOutput,
        sign_data: SignData,
        sighash_type: SigHashType,
    ) -> Result<&mut Self, TransactionError> {
        self.input(index, spent_output, sign_data)?
            .sign(key, sighash_type)?;
        Ok(self)
    }

    /// The transaction with every opened input's scriptSig and witness
    /// replaced by its current signatures.
    pub fn get(&self) -> Transaction {
        let mut tx = self.tx.clone();
        for (index, signer) in &self.inputs {
            let values = signer.serialize_signatures();
            let input = &mut tx.inputs[*index];
            input.script_sig = values.script_sig;
            input.witness = values.witness;
        }
        tx
    }
}

impl fmt::Debug for Signer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("txid", &self.tx.txid_hex())
            .field("adapter", &self.adapter.name())
            .field("inputs", &self.inputs)
            .finish()
    }
}
