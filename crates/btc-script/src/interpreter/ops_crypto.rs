//! Hashing and signature operations for the script interpreter.

use btc_primitives::hash::{hash160, ripemd160, sha1, sha256, sha256d};

use crate::opcodes::Opcode;
use crate::Script;

use super::checker::SigVersion;
use super::encoding::{check_pub_key_encoding, check_signature_encoding};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::thread::Thread;

pub(crate) enum HashType {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, hash_type: HashType) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop()?;
        let result = match hash_type {
            HashType::Ripemd160 => ripemd160(&buf).to_vec(),
            HashType::Sha1 => sha1(&buf).to_vec(),
            HashType::Sha256 => sha256(&buf).to_vec(),
            HashType::Hash160 => hash160(&buf).to_vec(),
            HashType::Hash256 => sha256d(&buf).to_vec(),
        };
        self.dstack.push(result);
        Ok(())
    }

    /// The script code signed over: everything after the last executed
    /// OP_CODESEPARATOR.
    pub(crate) fn sub_script(&self) -> Script {
        Script::from_bytes(&self.script.to_bytes()[self.last_code_sep..])
    }

    /// Legacy signatures cannot sign themselves, so their pushes are
    /// removed from the script code before hashing.
    fn strip_signatures(&self, mut script_code: Script, sigs: &[Vec<u8>]) -> Script {
        if self.sig_version == SigVersion::Base {
            for sig in sigs {
                script_code = script_code.find_and_delete(sig).0;
            }
        }
        script_code
    }

    fn verify_sig(&self, sig: &[u8], pub_key: &[u8], script_code: &Script) -> bool {
        !sig.is_empty() && self.checker.check_sig(sig, pub_key, script_code, self.sig_version)
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop()?;
        let sig_bytes = self.dstack.pop()?;

        let script_code = self.strip_signatures(self.sub_script(), std::slice::from_ref(&sig_bytes));

        check_signature_encoding(&sig_bytes, self.flags)?;
        check_pub_key_encoding(&pk_bytes, self.flags, self.sig_version)?;

        let valid = self.verify_sig(&sig_bytes, &pk_bytes, &script_code);
        if !valid && self.has_flag(ScriptFlags::NULLFAIL) && !sig_bytes.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "signature not empty on failed checksig",
            ));
        }

        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(op, InterpreterErrorCode::CheckSigVerify)
    }

    /// `<dummy> <sig>... <m> <pubkey>... <n> OP_CHECKMULTISIG`
    ///
    /// Signatures must appear in the same order as their keys. Keys and
    /// signatures are matched from the top of the stack down, so each key is
    /// tried at most once.
    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.dstack.pop_int()?;
        let num_pub_keys = num_keys.to_i32();

        if num_pub_keys < 0 || num_pub_keys as usize > self.cfg.max_pub_keys_per_multisig() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "number of pubkeys {} is outside 0..={}",
                    num_pub_keys,
                    self.cfg.max_pub_keys_per_multisig()
                ),
            ));
        }

        self.num_ops += num_pub_keys as usize;
        if self.num_ops > self.cfg.max_ops() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", self.cfg.max_ops()),
            ));
        }

        // Top of stack first: pub_keys[0] is the last key in the script.
        let mut pub_keys = Vec::with_capacity(num_pub_keys as usize);
        for _ in 0..num_pub_keys {
            pub_keys.push(self.dstack.pop()?);
        }

        let num_sigs = self.dstack.pop_int()?;
        let num_signatures = num_sigs.to_i32();

        if num_signatures < 0 || num_signatures > num_pub_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!(
                    "number of signatures {} is outside 0..={}",
                    num_signatures, num_pub_keys
                ),
            ));
        }

        let mut signatures: Vec<Vec<u8>> = Vec::with_capacity(num_signatures as usize);
        for _ in 0..num_signatures {
            signatures.push(self.dstack.pop()?);
        }

        let script_code = self.strip_signatures(self.sub_script(), &signatures);

        let mut success = true;
        let mut remaining_sigs = signatures.len();
        let mut remaining_keys = pub_keys.len();
        let (mut sig_idx, mut key_idx) = (0usize, 0usize);

        while success && remaining_sigs > 0 {
            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[key_idx];

            check_signature_encoding(sig, self.flags)?;
            check_pub_key_encoding(pub_key, self.flags, self.sig_version)?;

            if self.verify_sig(sig, pub_key, &script_code) {
                sig_idx += 1;
                remaining_sigs -= 1;
            }
            key_idx += 1;
            remaining_keys -= 1;

            // Not enough keys left to satisfy the remaining signatures.
            if remaining_sigs > remaining_keys {
                success = false;
            }
        }

        if !success
            && self.has_flag(ScriptFlags::NULLFAIL)
            && signatures.iter().any(|s| !s.is_empty())
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NullFail,
                "not all signatures empty on failed checkmultisig",
            ));
        }

        // Extra element consumed by the historical CHECKMULTISIG off-by-one.
        let dummy = self.dstack.pop()?;
        if self.has_flag(ScriptFlags::NULLDUMMY) && !dummy.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNullDummy,
                format!("multisig dummy argument has length {} instead of 0", dummy.len()),
            ));
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(op, InterpreterErrorCode::CheckMultiSigVerify)
    }
}
