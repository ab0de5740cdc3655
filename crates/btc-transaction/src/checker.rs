//! Signature and lock time checks against a concrete transaction.
//!
//! [`TransactionChecker`] is the transaction-side implementation of the
//! interpreter's [`SignatureChecker`] seam. It borrows the spending
//! transaction, knows which input is being verified and the value of the
//! output it spends, and verifies signatures with an injected [`EcAdapter`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

use btc_primitives::EcAdapter;
use btc_script::interpreter::{ScriptNumber, SigVersion, SignatureChecker};
use btc_script::Script;

use crate::input::SEQUENCE_FINAL;
use crate::sighash::{SigHashEngine, SigHashType};
use crate::transaction::{Transaction, LOCKTIME_THRESHOLD};
use crate::TransactionError;

/// Setting this bit in an input sequence disables its relative lock-time.
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: u32 = 1 << 31;

/// Set: the relative lock-time is in units of 512 seconds. Unset: blocks.
pub const SEQUENCE_LOCKTIME_TYPE_FLAG: u32 = 1 << 22;

/// The bits of an input sequence holding the relative lock-time value.
pub const SEQUENCE_LOCKTIME_MASK: u32 = 0x0000_ffff;

type DigestKey = (Vec<u8>, u32, SigVersion);

/// Checks signatures and lock times for one input of a transaction.
pub struct TransactionChecker<'a> {
    tx: &'a Transaction,
    input_index: usize,
    amount: i64,
    adapter: &'a dyn EcAdapter,
    engine: SigHashEngine<'a>,
    digests: RefCell<HashMap<DigestKey, [u8; 32]>>,
}

impl<'a> TransactionChecker<'a> {
    /// Create a checker for input `input_index`, which spends an output
    /// worth `amount`.
    pub fn new(
        tx: &'a Transaction,
        input_index: usize,
        amount: i64,
        adapter: &'a dyn EcAdapter,
    ) -> Result<Self, TransactionError> {
        tx.input(input_index)?;
        Ok(TransactionChecker {
            tx,
            input_index,
            amount,
            adapter,
            engine: SigHashEngine::new(tx),
            digests: RefCell::new(HashMap::new()),
        })
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    /// The digest a signature of `sighash_type` over `script_code` commits
    /// to. Repeated requests within this checker are served from a cache.
    pub fn sighash(
        &self,
        script_code: &Script,
        sighash_type: SigHashType,
        sig_version: SigVersion,
    ) -> Result<[u8; 32], TransactionError> {
        let key = (script_code.to_bytes().to_vec(), sighash_type.0, sig_version);
        if let Some(digest) = self.digests.borrow().get(&key) {
            return Ok(*digest);
        }
        let digest = self.engine.calculate(
            script_code,
            self.input_index,
            sighash_type,
            self.amount,
            sig_version,
        )?;
        self.digests.borrow_mut().insert(key, digest);
        Ok(digest)
    }

    fn sequence(&self) -> u32 {
        self.tx.inputs[self.input_index].sequence
    }
}

impl SignatureChecker for TransactionChecker<'_> {
    fn check_sig(
        &self,
        sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        sig_version: SigVersion,
    ) -> bool {
        let Some((hash_type, der)) = sig.split_last() else {
            return false;
        };
        match self.sighash(script_code, SigHashType::from(*hash_type), sig_version) {
            Ok(digest) => self.adapter.verify(&digest, pub_key, der),
            Err(e) => {
                tracing::debug!(error = %e, "sighash failed during signature check");
                false
            }
        }
    }

    fn check_lock_time(&self, lock_time: &ScriptNumber) -> bool {
        let required = lock_time.to_i64();
        let tx_lock_time = self.tx.lock_time as i64;
        let threshold = LOCKTIME_THRESHOLD as i64;

        // Heights compare with heights, timestamps with timestamps.
        if (tx_lock_time < threshold) != (required < threshold) {
            return false;
        }
        if required > tx_lock_time {
            return false;
        }
        // A final input makes the transaction lock time meaningless.
        self.sequence() != SEQUENCE_FINAL
    }

    fn check_sequence(&self, sequence: &ScriptNumber) -> bool {
        let required = sequence.to_i64();
        let tx_sequence = self.sequence();

        if self.tx.version < 2 {
            return false;
        }
        if tx_sequence & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return false;
        }

        let mask = (SEQUENCE_LOCKTIME_TYPE_FLAG | SEQUENCE_LOCKTIME_MASK) as i64;
        let required_masked = required & mask;
        let tx_masked = (tx_sequence as i64) & mask;
        let type_flag = SEQUENCE_LOCKTIME_TYPE_FLAG as i64;

        if (required_masked < type_flag) != (tx_masked < type_flag) {
            return false;
        }
        required_masked <= tx_masked
    }
}

impl fmt::Debug for TransactionChecker<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionChecker")
            .field("input_index", &self.input_index)
            .field("amount", &self.amount)
            .field("adapter", &self.adapter.name())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{OutPoint, TransactionInput};
    use crate::output::TransactionOutput;
    use btc_primitives::ec::PrivateKey;
    use btc_primitives::K256Adapter;
    use btc_script::builder;

    fn tx(version: i32, lock_time: u32, sequence: u32) -> Transaction {
        let mut tx = Transaction::new();
        tx.version = version;
        tx.lock_time = lock_time;
        let mut input = TransactionInput::new(OutPoint::new([7; 32], 0));
        input.sequence = sequence;
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(5000, Script::new()));
        tx
    }

    #[test]
    fn test_check_sig_accepts_own_signature() {
        let adapter = K256Adapter::new();
        let key = PrivateKey::from_hex(
            "0000000000000000000000000000000000000000000000000000000000000001",
        )
        .unwrap();
        let pk = key.pub_key().to_bytes();
        let code = builder::p2pkh(&key.pub_key().hash160());
        let t = tx(1, 0, SEQUENCE_FINAL);
        let checker = TransactionChecker::new(&t, 0, 5000, &adapter).unwrap();

        let digest = checker.sighash(&code, SigHashType::ALL, SigVersion::Base).unwrap();
        let mut sig = adapter.sign(&digest, &key).unwrap().to_der();
        sig.push(0x01);

        assert!(checker.check_sig(&sig, &pk, &code, SigVersion::Base));
        // Different algorithm, different digest.
        assert!(!checker.check_sig(&sig, &pk, &code, SigVersion::WitnessV0));
        // Different hashtype byte, different digest.
        let mut none = sig.clone();
        *none.last_mut().unwrap() = 0x02;
        assert!(!checker.check_sig(&none, &pk, &code, SigVersion::Base));
        assert!(!checker.check_sig(&[], &pk, &code, SigVersion::Base));
        assert!(!checker.check_sig(&sig, &[0x02; 10], &code, SigVersion::Base));
    }

    #[test]
    fn test_sighash_is_cached() {
        let adapter = K256Adapter::new();
        let t = tx(1, 0, 0);
        let checker = TransactionChecker::new(&t, 0, 1, &adapter).unwrap();
        let code = Script::from_bytes(&[0xac]);
        let a = checker.sighash(&code, SigHashType::ALL, SigVersion::Base).unwrap();
        let b = checker.sighash(&code, SigHashType::ALL, SigVersion::Base).unwrap();
        assert_eq!(a, b);
        assert_eq!(checker.digests.borrow().len(), 1);
    }

    #[test]
    fn test_new_rejects_bad_index() {
        let adapter = K256Adapter::new();
        let t = tx(1, 0, 0);
        assert!(matches!(
            TransactionChecker::new(&t, 3, 0, &adapter),
            Err(TransactionError::InputIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn test_check_lock_time() {
        let adapter = K256Adapter::new();
        let cases: Vec<(u32, u32, i64, bool)> = vec![
            // (tx lock_time, sequence, required, ok)
            (100, 0, 100, true),
            (100, 0, 99, true),
            (100, 0, 101, false),
            (100, SEQUENCE_FINAL, 50, false),
            (100, 0xffff_fffe, 50, true),
            (600_000_000, 0, 100, false),
            (600_000_000, 0, 500_000_000, true),
            (100, 0, 500_000_000, false),
        ];
        for (lock_time, sequence, required, ok) in cases {
            let t = tx(1, lock_time, sequence);
            let checker = TransactionChecker::new(&t, 0, 0, &adapter).unwrap();
            assert_eq!(
                checker.check_lock_time(&ScriptNumber::new(required)),
                ok,
                "lock_time={} sequence={:#x} required={}",
                lock_time,
                sequence,
                required
            );
        }
    }

    #[test]
    fn test_check_sequence() {
        let adapter = K256Adapter::new();
        let time = SEQUENCE_LOCKTIME_TYPE_FLAG;
        let cases: Vec<(i32, u32, i64, bool)> = vec![
            // (version, tx sequence, required, ok)
            (2, 10, 10, true),
            (2, 10, 5, true),
            (2, 10, 11, false),
            (1, 10, 5, false),
            (2, SEQUENCE_LOCKTIME_DISABLE_FLAG | 10, 5, false),
            (2, time | 10, 5, false),
            (2, time | 10, (time | 5) as i64, true),
            (2, 10, (time | 5) as i64, false),
            // Bits outside the mask are ignored.
            (2, 0x0040_0000 - 1, 0xffff, true),
        ];
        for (version, sequence, required, ok) in cases {
            let t = tx(version, 0, sequence);
            let checker = TransactionChecker::new(&t, 0, 0, &adapter).unwrap();
            assert_eq!(
                checker.check_sequence(&ScriptNumber::new(required)),
                ok,
                "version={} sequence={:#x} required={:#x}",
                version,
                sequence,
                required
            );
        }
    }
}
