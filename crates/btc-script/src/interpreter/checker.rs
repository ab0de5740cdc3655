//! The seam between the interpreter and the transaction being verified.
//!
//! The interpreter does not depend on the transaction crate. Callers hand
//! it a [`SignatureChecker`] that computes signature hashes and checks
//! lock times against the spending transaction.

use crate::Script;

use super::scriptnum::ScriptNumber;

/// Which signature hash algorithm and script rules apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SigVersion {
    /// Legacy scripts: scriptSig/scriptPubKey and P2SH redeem scripts.
    #[default]
    Base,
    /// Witness v0 scripts (BIP143 signature hashing).
    WitnessV0,
}

/// Transaction-dependent checks used by the signature and lock time opcodes.
pub trait SignatureChecker {
    /// Verify `sig` (DER with trailing hashtype byte) by `pub_key` over the
    /// signature hash of `script_code`.
    ///
    /// Malformed signatures or keys yield `false`.
    fn check_sig(
        &self,
        sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        sig_version: SigVersion,
    ) -> bool;

    /// OP_CHECKLOCKTIMEVERIFY against the transaction lock time.
    fn check_lock_time(&self, lock_time: &ScriptNumber) -> bool;

    /// OP_CHECKSEQUENCEVERIFY against the input sequence.
    fn check_sequence(&self, sequence: &ScriptNumber) -> bool;
}

/// A checker with no transaction: every check fails.
///
/// Useful for evaluating scripts that do not touch signatures or lock times.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullChecker;

impl SignatureChecker for NullChecker {
    fn check_sig(&self, _: &[u8], _: &[u8], _: &Script, _: SigVersion) -> bool {
        false
    }

    fn check_lock_time(&self, _: &ScriptNumber) -> bool {
        false
    }

    fn check_sequence(&self, _: &ScriptNumber) -> bool {
        false
    }
}
