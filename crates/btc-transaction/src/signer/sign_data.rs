//! Per-input data the signer cannot learn from the spent output alone.

use btc_script::interpreter::ScriptFlags;
use btc_script::Script;

use crate::TransactionError;

/// Redeem script, witness script and verification policy for one input.
///
/// ```
/// use btc_script::{builder, Script};
/// use btc_transaction::signer::SignData;
///
/// let witness_script = Script::from_bytes(&[0x51]);
/// let redeem_script = builder::p2wsh(&witness_script);
/// let data = SignData::new()
///     .p2sh(redeem_script)
///     .unwrap()
///     .p2wsh(witness_script)
///     .unwrap();
/// assert!(data.redeem_script().is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignData {
    redeem_script: Option<Script>,
    witness_script: Option<Script>,
    signature_policy: Option<ScriptFlags>,
}

impl SignData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the redeem script of a P2SH output.
    pub fn p2sh(mut self, redeem_script: Script) -> Result<Self, TransactionError> {
        if self.witness_script.as_ref() == Some(&redeem_script) {
            return Err(witness_as_redeem());
        }
        self.redeem_script = Some(redeem_script);
        Ok(self)
    }

    /// Set the witness script of a P2WSH program.
    pub fn p2wsh(mut self, witness_script: Script) -> Result<Self, TransactionError> {
        if self.redeem_script.as_ref() == Some(&witness_script) {
            return Err(witness_as_redeem());
        }
        self.witness_script = Some(witness_script);
        Ok(self)
    }

    /// Flags used when checking existing signatures and in
    /// [`InputSigner::verify`](super::InputSigner::verify).
    pub fn signature_policy(mut self, flags: ScriptFlags) -> Self {
        self.signature_policy = Some(flags);
        self
    }

    pub fn redeem_script(&self) -> Option<&Script> {
        self.redeem_script.as_ref()
    }

    pub fn witness_script(&self) -> Option<&Script> {
        self.witness_script.as_ref()
    }

    pub fn policy(&self) -> Option<ScriptFlags> {
        self.signature_policy
    }
}

fn witness_as_redeem() -> TransactionError {
    TransactionError::InvalidArgument("cannot pass witness script as redeem script".to_string())
}
