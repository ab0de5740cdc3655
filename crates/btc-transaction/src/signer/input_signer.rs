//! Signing state for a single transaction input.
//!
//! An [`InputSigner`] resolves the spent output down to the script that
//! actually checks signatures (following P2SH redeem scripts and witness
//! v0 programs), picks up any signatures already present on the input,
//! adds new ones keyed by public-key position and serializes the result
//! back into a scriptSig and witness.

use std::fmt;

use btc_primitives::ec::{PrivateKey, PublicKey};
use btc_primitives::hash::{hash160, sha256};
use btc_primitives::EcAdapter;
use btc_script::classify::{classify, OutputData, ScriptType, Solution};
use btc_script::interpreter::encoding::{check_pub_key_encoding, check_signature_encoding};
use btc_script::interpreter::{Interpreter, ScriptFlags, ScriptNumber, SigVersion, SignatureChecker};
use btc_script::{builder, Instruction, Script, ScriptBuilder};

use super::sign_data::SignData;
use crate::checker::TransactionChecker;
use crate::output::TransactionOutput;
use crate::sighash::SigHashType;
use crate::signature::TxSignature;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Output types that can be spent by signatures alone.
const SIGNABLE: &[ScriptType] = &[
    ScriptType::PayToPubKeyHash,
    ScriptType::PayToPubKey,
    ScriptType::Multisig,
];

/// Unlocking data for one input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SigValues {
    pub script_sig: Script,
    pub witness: Vec<Vec<u8>>,
}

/// Accumulates signatures for one input.
pub struct InputSigner<'a> {
    adapter: &'a dyn EcAdapter,
    tx: Transaction,
    input_index: usize,
    spent_output: TransactionOutput,
    flags: ScriptFlags,

    redeem_script: Option<Script>,
    witness_script: Option<Script>,
    sign_script: Script,
    sign_type: ScriptType,
    sig_version: SigVersion,

    key_hash: Option<[u8; 20]>,
    key_bytes: Vec<Vec<u8>>,
    public_keys: Vec<Option<PublicKey>>,
    signatures: Vec<Option<TxSignature>>,
    required: usize,

    pad_unsigned_multisigs: bool,
    tolerate_invalid_public_key: bool,
}

impl<'a> InputSigner<'a> {
    /// Resolve the script to sign for input `input_index` of `tx`.
    ///
    /// The redeem and witness scripts come from `sign_data`, or failing
    /// that from the input's existing scriptSig and witness. Either way
    /// they must hash to what the spent output commits to.
    ///
    /// Call [`extract`](Self::extract) afterwards to pick up existing
    /// signatures.
    pub fn new(
        adapter: &'a dyn EcAdapter,
        tx: &Transaction,
        input_index: usize,
        spent_output: &TransactionOutput,
        sign_data: &SignData,
    ) -> Result<Self, TransactionError> {
        let input = tx.input(input_index)?;
        let script_sig_stack = push_only_stack(&input.script_sig)?;

        let spk = classify(&spent_output.script_pubkey);
        ensure_type(
            &spk,
            &[
                ScriptType::PayToPubKeyHash,
                ScriptType::PayToPubKey,
                ScriptType::Multisig,
                ScriptType::PayToScriptHash,
                ScriptType::PayToWitnessPubKeyHash,
                ScriptType::PayToWitnessScriptHash,
            ],
            "spent output",
        )?;

        let mut solved = spk;
        let mut sign_script = spent_output.script_pubkey.clone();
        let mut sig_version = SigVersion::Base;

        let redeem_script = if let Solution::ScriptHash(hash) = solved.solution {
            let redeem = resolve_script(
                sign_data.redeem_script(),
                script_sig_stack.last(),
                "redeem script",
            )?;
            if hash160(redeem.to_bytes()) != hash {
                return Err(invalid("redeem script does not match the P2SH output"));
            }
            solved = classify(&redeem);
            ensure_type(
                &solved,
                &[
                    ScriptType::PayToPubKeyHash,
                    ScriptType::PayToPubKey,
                    ScriptType::Multisig,
                    ScriptType::PayToWitnessPubKeyHash,
                    ScriptType::PayToWitnessScriptHash,
                ],
                "redeem script",
            )?;
            sign_script = redeem.clone();
            Some(redeem)
        } else {
            if sign_data.redeem_script().is_some() {
                return Err(invalid("redeem script given for an output that is not P2SH"));
            }
            None
        };

        if solved.script_type.is_witness() && redeem_script.is_none() && !input.script_sig.is_empty() {
            return Err(invalid("scriptSig of a native witness spend must be empty"));
        }

        let witness_script = match solved.solution {
            Solution::WitnessPubKeyHash(hash) => {
                if sign_data.witness_script().is_some() {
                    return Err(invalid("witness script given for a P2WPKH program"));
                }
                sig_version = SigVersion::WitnessV0;
                sign_script = builder::p2pkh(&hash);
                solved = classify(&sign_script);
                None
            }
            Solution::WitnessScriptHash(hash) => {
                let witness_script = resolve_script(
                    sign_data.witness_script(),
                    input.witness.last(),
                    "witness script",
                )?;
                if sha256(witness_script.to_bytes()) != hash {
                    return Err(invalid("witness script does not match the P2WSH program"));
                }
                solved = classify(&witness_script);
                ensure_type(&solved, SIGNABLE, "witness script")?;
                sig_version = SigVersion::WitnessV0;
                sign_script = witness_script.clone();
                Some(witness_script)
            }
            _ => {
                if sign_data.witness_script().is_some() {
                    return Err(invalid("witness script given for an output that is not P2WSH"));
                }
                None
            }
        };

        let (key_hash, key_bytes, required) = match solved.solution {
            Solution::PubKeyHash(hash) => (Some(hash), Vec::new(), 1),
            Solution::PubKey(key) => (None, vec![key], 1),
            Solution::Multisig { required, keys } => (None, keys, required),
            _ => return Err(invalid("script cannot be signed")),
        };
        let slots = key_bytes.len().max(1);

        tracing::debug!(
            input_index,
            script_type = %solved.script_type,
            ?sig_version,
            p2sh = redeem_script.is_some(),
            "resolved input script"
        );

        Ok(InputSigner {
            adapter,
            tx: tx.clone(),
            input_index,
            spent_output: spent_output.clone(),
            flags: sign_data.policy().unwrap_or(ScriptFlags::SIGNER_DEFAULT),
            redeem_script,
            witness_script,
            sign_script,
            sign_type: solved.script_type,
            sig_version,
            key_hash,
            key_bytes,
            public_keys: vec![None; slots],
            signatures: vec![None; slots],
            required,
            pad_unsigned_multisigs: false,
            tolerate_invalid_public_key: false,
        })
    }

    /// Emit empty placeholders for missing multisig signatures so partial
    /// state survives a serialize/extract round trip.
    pub fn pad_unsigned_multisigs(&mut self, setting: bool) -> &mut Self {
        self.pad_unsigned_multisigs = setting;
        self
    }

    /// Leave unparseable public keys in a script as empty slots instead of
    /// failing.
    pub fn tolerate_invalid_public_key(&mut self, setting: bool) -> &mut Self {
        self.tolerate_invalid_public_key = setting;
        self
    }

    /// Load the public keys of the script and the signatures already
    /// present in the input.
    ///
    /// Signatures that do not verify against the script code digest are
    /// dropped, leaving their slot empty. Multisig signatures are sorted
    /// into key order.
    pub fn extract(&mut self) -> Result<&mut Self, TransactionError> {
        for i in 0..self.key_bytes.len() {
            self.public_keys[i] = self.parse_public_key(&self.key_bytes[i])?;
        }

        let mut stack = self.existing_stack()?;

        match self.sign_type {
            ScriptType::PayToPubKeyHash => {
                if stack.len() > 1 {
                    let (key, sig) = match (stack.pop(), stack.pop()) {
                        (Some(key), Some(sig)) => (key, sig),
                        _ => return Ok(self),
                    };
                    if Some(hash160(&key)) != self.key_hash {
                        tracing::debug!(
                            input_index = self.input_index,
                            "dropping signature from a key outside the script"
                        );
                    } else if let Some(sig) = self.accept_signature(&sig, &key, 0) {
                        self.signatures[0] = Some(sig);
                        self.public_keys[0] = self.parse_public_key(&key)?;
                    }
                }
            }
            ScriptType::PayToPubKey => {
                if let Some(sig) = stack.pop() {
                    self.signatures[0] = self.accept_signature(&sig, &self.key_bytes[0], 0);
                }
            }
            ScriptType::Multisig => self.extract_multisig(&stack)?,
            _ => return Err(invalid("script cannot be signed")),
        }

        tracing::debug!(
            input_index = self.input_index,
            found = self.signature_count(),
            required = self.required,
            "extracted existing signatures"
        );
        Ok(self)
    }

    fn extract_multisig(&mut self, stack: &[Vec<u8>]) -> Result<(), TransactionError> {
        let key_count = self.key_bytes.len();

        if self.pad_unsigned_multisigs && stack.len() == 1 + key_count {
            let present = stack[1..].iter().filter(|s| !s.is_empty()).count();
            if present == self.required {
                return Err(TransactionError::Signing(
                    "padding is forbidden for a fully signed multisig script".to_string(),
                ));
            }
            for (slot, sig) in stack[1..].iter().enumerate() {
                if !sig.is_empty() {
                    self.signatures[slot] = self.accept_signature(sig, &self.key_bytes[slot], slot);
                }
            }
            return Ok(());
        }

        let take = self.required.min(stack.len().saturating_sub(1));
        let mut matched: Vec<Option<TxSignature>> = vec![None; key_count];
        for sig in &stack[stack.len() - take..] {
            let slot = (0..key_count)
                .find(|&k| matched[k].is_none() && self.check_signature(sig, &self.key_bytes[k]));
            match slot {
                Some(slot) => matched[slot] = TxSignature::from_bytes(sig).ok(),
                None => tracing::debug!(
                    input_index = self.input_index,
                    sig = %hex::encode(sig),
                    "dropping signature that matches no public key"
                ),
            }
        }
        for (slot, sig) in matched.into_iter().enumerate() {
            if sig.is_some() {
                self.signatures[slot] = sig;
            }
        }
        Ok(())
    }

    /// The parsed signature if it verifies for `pub_key`.
    fn accept_signature(&self, sig: &[u8], pub_key: &[u8], slot: usize) -> Option<TxSignature> {
        let parsed = if self.check_signature(sig, pub_key) {
            TxSignature::from_bytes(sig).ok()
        } else {
            None
        };
        if parsed.is_none() {
            tracing::debug!(
                input_index = self.input_index,
                slot,
                sig = %hex::encode(sig),
                "dropping signature that does not verify"
            );
        }
        parsed
    }

    /// Sign with `key`, filling the slot of its public key.
    ///
    /// Signing a slot that already holds a signature, or an input that is
    /// fully signed, leaves the state unchanged. A key that matches no slot
    /// is an error.
    pub fn sign(
        &mut self,
        key: &PrivateKey,
        sighash_type: SigHashType,
    ) -> Result<&mut Self, TransactionError> {
        if !sighash_type.is_defined() {
            return Err(invalid(format!("undefined sighash type {:#x}", sighash_type.0)));
        }

        let pub_key = key.pub_key();
        if self.sig_version == SigVersion::WitnessV0 && !pub_key.is_compressed() {
            return Err(TransactionError::Signing(
                "uncompressed keys are disallowed in witness scripts".to_string(),
            ));
        }

        let pub_key_bytes = pub_key.to_bytes();
        let slot = match self.sign_type {
            ScriptType::PayToPubKeyHash if Some(hash160(&pub_key_bytes)) == self.key_hash => Some(0),
            ScriptType::PayToPubKeyHash => None,
            _ => self.key_bytes.iter().position(|k| *k == pub_key_bytes),
        }
        .ok_or_else(|| TransactionError::Signing("signing with the wrong private key".to_string()))?;

        if self.signatures[slot].is_some() || self.is_fully_signed() {
            tracing::debug!(input_index = self.input_index, slot, "slot already signed");
            return Ok(self);
        }

        let digest = self.checker()?.sighash(&self.sign_script, sighash_type, self.sig_version)?;
        let signature = self.adapter.sign(&digest, key)?;

        self.signatures[slot] = Some(TxSignature::new(signature, sighash_type));
        self.public_keys[slot] = Some(pub_key);
        tracing::debug!(
            input_index = self.input_index,
            slot,
            %sighash_type,
            "added signature"
        );
        Ok(self)
    }

    pub fn is_fully_signed(&self) -> bool {
        self.signature_count() >= self.required
    }

    pub fn required_sigs(&self) -> usize {
        self.required
    }

    /// Signatures by key position.
    pub fn signatures(&self) -> &[Option<TxSignature>] {
        &self.signatures
    }

    /// Public keys by position. A P2PKH key is known once it has signed.
    pub fn public_keys(&self) -> &[Option<PublicKey>] {
        &self.public_keys
    }

    /// The script signatures commit to.
    pub fn sign_script(&self) -> &Script {
        &self.sign_script
    }

    pub fn sig_version(&self) -> SigVersion {
        self.sig_version
    }

    pub fn redeem_script(&self) -> Option<&Script> {
        self.redeem_script.as_ref()
    }

    pub fn witness_script(&self) -> Option<&Script> {
        self.witness_script.as_ref()
    }

    /// The scriptSig and witness carrying the current signatures.
    pub fn serialize_signatures(&self) -> SigValues {
        let mut stack = self.solution_stack();

        match (&self.redeem_script, self.sig_version) {
            (None, SigVersion::Base) => SigValues {
                script_sig: push_all(&stack),
                witness: Vec::new(),
            },
            (Some(redeem), SigVersion::Base) => {
                stack.push(redeem.to_bytes().to_vec());
                SigValues {
                    script_sig: push_all(&stack),
                    witness: Vec::new(),
                }
            }
            (redeem, SigVersion::WitnessV0) => {
                if let Some(ws) = &self.witness_script {
                    stack.push(ws.to_bytes().to_vec());
                }
                let script_sig = match redeem {
                    Some(program) => push_all(&[program.to_bytes().to_vec()]),
                    None => Script::new(),
                };
                SigValues {
                    script_sig,
                    witness: stack,
                }
            }
        }
    }

    /// Run the interpreter over the serialized signatures. P2SH is always
    /// enforced, and WITNESS for witness spends.
    pub fn verify(&self, flags: Option<ScriptFlags>) -> bool {
        let mut flags = flags.unwrap_or(self.flags);
        flags |= ScriptFlags::P2SH;
        if self.sig_version == SigVersion::WitnessV0 {
            flags |= ScriptFlags::WITNESS;
        }

        let values = self.serialize_signatures();
        let checker = match self.checker() {
            Ok(checker) => checker,
            Err(_) => return false,
        };
        match Interpreter::new().verify(
            &values.script_sig,
            &self.spent_output.script_pubkey,
            &values.witness,
            flags,
            &checker,
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(input_index = self.input_index, error = %e, "input does not verify");
                false
            }
        }
    }

    /// The signature stack for the signing template, before redeem or
    /// witness scripts are appended.
    fn solution_stack(&self) -> Vec<Vec<u8>> {
        match self.sign_type {
            ScriptType::PayToPubKeyHash => match (&self.signatures[0], &self.public_keys[0]) {
                (Some(sig), Some(key)) => vec![sig.to_bytes(), key.to_bytes()],
                _ => Vec::new(),
            },
            ScriptType::PayToPubKey => match &self.signatures[0] {
                Some(sig) => vec![sig.to_bytes()],
                None => Vec::new(),
            },
            _ => {
                if self.signature_count() == 0 {
                    return Vec::new();
                }
                // OP_CHECKMULTISIG pops one element too many.
                let mut stack = vec![Vec::new()];
                if self.pad_unsigned_multisigs && !self.is_fully_signed() {
                    stack.extend(
                        self.signatures
                            .iter()
                            .map(|s| s.as_ref().map(TxSignature::to_bytes).unwrap_or_default()),
                    );
                } else {
                    stack.extend(
                        self.signatures
                            .iter()
                            .flatten()
                            .take(self.required)
                            .map(TxSignature::to_bytes),
                    );
                }
                stack
            }
        }
    }

    /// The signature stack currently on the input, with the redeem or
    /// witness script removed.
    fn existing_stack(&self) -> Result<Vec<Vec<u8>>, TransactionError> {
        let input = &self.tx.inputs[self.input_index];
        let mut stack = match self.sig_version {
            SigVersion::Base => push_only_stack(&input.script_sig)?,
            SigVersion::WitnessV0 => input.witness.clone(),
        };
        let appended = match self.sig_version {
            SigVersion::Base => self.redeem_script.is_some(),
            SigVersion::WitnessV0 => self.witness_script.is_some(),
        };
        if appended {
            stack.pop();
        }
        Ok(stack)
    }

    fn checker(&self) -> Result<TransactionChecker<'_>, TransactionError> {
        TransactionChecker::new(&self.tx, self.input_index, self.spent_output.value, self.adapter)
    }

    fn check_signature(&self, sig: &[u8], pub_key: &[u8]) -> bool {
        if check_signature_encoding(sig, self.flags).is_err()
            || check_pub_key_encoding(pub_key, self.flags, self.sig_version).is_err()
        {
            return false;
        }
        match self.checker() {
            Ok(checker) => checker.check_sig(sig, pub_key, &self.sign_script, self.sig_version),
            Err(_) => false,
        }
    }

    fn parse_public_key(&self, bytes: &[u8]) -> Result<Option<PublicKey>, TransactionError> {
        match PublicKey::from_bytes(bytes) {
            Ok(key) => Ok(Some(key)),
            Err(_) if self.tolerate_invalid_public_key => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn signature_count(&self) -> usize {
        self.signatures.iter().flatten().count()
    }
}

impl fmt::Debug for InputSigner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputSigner")
            .field("input_index", &self.input_index)
            .field("sign_type", &self.sign_type)
            .field("sig_version", &self.sig_version)
            .field("required", &self.required)
            .field("signatures", &self.signature_count())
            .finish_non_exhaustive()
    }
}

/// The stack produced by a push-only script.
fn push_only_stack(script: &Script) -> Result<Vec<Vec<u8>>, TransactionError> {
    let mut stack = Vec::new();
    for instruction in script.instructions()? {
        match instruction {
            Instruction::Push { data, .. } => stack.push(data),
            Instruction::Op(op) => match op.small_int() {
                Some(n) => stack.push(ScriptNumber::new(n).to_bytes()),
                None => return Err(invalid("scriptSig is not push-only")),
            },
        }
    }
    Ok(stack)
}

fn push_all(stack: &[Vec<u8>]) -> Script {
    stack
        .iter()
        .fold(ScriptBuilder::new(), |b, item| b.push_data(item))
        .into_script()
}

/// Pick the caller's script, else the one found on the input; both must
/// agree when present.
fn resolve_script(
    given: Option<&Script>,
    found: Option<&Vec<u8>>,
    what: &str,
) -> Result<Script, TransactionError> {
    match (given, found) {
        (Some(given), Some(found)) if given.to_bytes() != found.as_slice() => Err(invalid(format!(
            "{} on the input does not match the one provided",
            what
        ))),
        (Some(given), _) => Ok(given.clone()),
        (None, Some(found)) => Ok(Script::from(found.clone())),
        (None, None) => Err(invalid(format!("{} is required", what))),
    }
}

fn ensure_type(out: &OutputData, allowed: &[ScriptType], what: &str) -> Result<(), TransactionError> {
    if allowed.contains(&out.script_type) {
        Ok(())
    } else {
        Err(invalid(format!(
            "unsupported {} type: {}",
            what, out.script_type
        )))
    }
}

fn invalid(msg: impl Into<String>) -> TransactionError {
    TransactionError::InvalidArgument(msg.into())
}
