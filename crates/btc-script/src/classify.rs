//! Output script classification.
//!
//! Pattern-matches a script against the standard spending templates and
//! extracts the data each template commits to (key hash, public keys,
//! script hash, ...). The signer uses the result to decide how many
//! signatures an input needs and in which key order.

use std::fmt;

use crate::instruction::Instruction;
use crate::opcodes::Opcode;
use crate::Script;

/// Maximum number of public keys in a standard multisig script.
pub const MAX_MULTISIG_KEYS: usize = 20;

/// Standard spending templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptType {
    /// `OP_DUP OP_HASH160 <20> OP_EQUALVERIFY OP_CHECKSIG`
    PayToPubKeyHash,
    /// `<pubkey> OP_CHECKSIG`
    PayToPubKey,
    /// `OP_m <pubkey>... OP_n OP_CHECKMULTISIG`
    Multisig,
    /// `OP_HASH160 <20> OP_EQUAL`
    PayToScriptHash,
    /// `OP_0 <20>`
    PayToWitnessPubKeyHash,
    /// `OP_0 <32>`
    PayToWitnessScriptHash,
    /// `OP_RETURN ...`
    NullData,
    /// Anything else.
    NonStandard,
}

impl ScriptType {
    /// The conventional lowercase name of the template.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptType::PayToPubKeyHash => "pubkeyhash",
            ScriptType::PayToPubKey => "pubkey",
            ScriptType::Multisig => "multisig",
            ScriptType::PayToScriptHash => "scripthash",
            ScriptType::PayToWitnessPubKeyHash => "witness_v0_keyhash",
            ScriptType::PayToWitnessScriptHash => "witness_v0_scripthash",
            ScriptType::NullData => "nulldata",
            ScriptType::NonStandard => "nonstandard",
        }
    }

    /// True for the templates whose spend is carried in the witness.
    pub fn is_witness(self) -> bool {
        matches!(
            self,
            ScriptType::PayToWitnessPubKeyHash | ScriptType::PayToWitnessScriptHash
        )
    }
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The data a template commits to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// HASH160 of a public key.
    PubKeyHash([u8; 20]),
    /// A serialized public key.
    PubKey(Vec<u8>),
    /// `required` signatures over `keys`, in script order.
    Multisig {
        /// Number of signatures required (m).
        required: usize,
        /// The public keys (n), in the order they appear in the script.
        keys: Vec<Vec<u8>>,
    },
    /// HASH160 of a redeem script.
    ScriptHash([u8; 20]),
    /// HASH160 of a public key, spent through the witness.
    WitnessPubKeyHash([u8; 20]),
    /// SHA256 of a witness script.
    WitnessScriptHash([u8; 32]),
    /// Everything after `OP_RETURN`.
    NullData(Vec<u8>),
    /// Nothing was extracted.
    None,
}

/// The result of [`classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputData {
    /// The matched template.
    pub script_type: ScriptType,
    /// What the template commits to.
    pub solution: Solution,
}

impl OutputData {
    /// Signatures needed to spend this output, or `None` if the template
    /// cannot be signed directly (P2SH, P2WSH, null data, nonstandard).
    pub fn required_sigs(&self) -> Option<usize> {
        match &self.solution {
            Solution::PubKeyHash(_) | Solution::PubKey(_) | Solution::WitnessPubKeyHash(_) => {
                Some(1)
            }
            Solution::Multisig { required, .. } => Some(*required),
            _ => None,
        }
    }

    /// True when an output of this kind can be signed without a redeem or
    /// witness script.
    pub fn can_sign(&self) -> bool {
        self.required_sigs().is_some()
    }
}

/// Classify a script into its spending template.
pub fn classify(script: &Script) -> OutputData {
    let bytes = script.to_bytes();

    if script.is_p2pkh() {
        return output(ScriptType::PayToPubKeyHash, Solution::PubKeyHash(array(&bytes[3..23])));
    }
    if script.is_p2sh() {
        return output(ScriptType::PayToScriptHash, Solution::ScriptHash(array(&bytes[2..22])));
    }
    if script.is_p2wpkh() {
        return output(
            ScriptType::PayToWitnessPubKeyHash,
            Solution::WitnessPubKeyHash(array(&bytes[2..22])),
        );
    }
    if script.is_p2wsh() {
        return output(
            ScriptType::PayToWitnessScriptHash,
            Solution::WitnessScriptHash(array(&bytes[2..34])),
        );
    }
    if script.is_null_data() {
        return output(ScriptType::NullData, Solution::NullData(bytes[1..].to_vec()));
    }

    let instructions = match script.instructions() {
        Ok(ins) => ins,
        Err(_) => return output(ScriptType::NonStandard, Solution::None),
    };

    if let Some(key) = decode_p2pk(&instructions) {
        return output(ScriptType::PayToPubKey, Solution::PubKey(key));
    }
    if let Some((required, keys)) = decode_multisig(&instructions) {
        return output(ScriptType::Multisig, Solution::Multisig { required, keys });
    }

    output(ScriptType::NonStandard, Solution::None)
}

fn output(script_type: ScriptType, solution: Solution) -> OutputData {
    tracing::trace!(%script_type, "classified script");
    OutputData {
        script_type,
        solution,
    }
}

fn array<const N: usize>(b: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(b);
    out
}

/// Accepts 33-byte keys with a 0x02/0x03 prefix and 65-byte keys with 0x04.
pub fn is_public_key_shaped(key: &[u8]) -> bool {
    match key.len() {
        33 => key[0] == 0x02 || key[0] == 0x03,
        65 => key[0] == 0x04,
        _ => false,
    }
}

fn decode_p2pk(ins: &[Instruction]) -> Option<Vec<u8>> {
    match ins {
        [Instruction::Push { data, .. }, Instruction::Op(Opcode::OP_CHECKSIG)]
            if data.len() == 33 || data.len() == 65 =>
        {
            Some(data.clone())
        }
        _ => None,
    }
}

fn decode_multisig(ins: &[Instruction]) -> Option<(usize, Vec<Vec<u8>>)> {
    if ins.len() < 4 {
        return None;
    }
    let last = ins.len() - 1;
    if ins[last] != Instruction::Op(Opcode::OP_CHECKMULTISIG) {
        return None;
    }
    let m = small_positive(&ins[0])?;
    let n = small_positive(&ins[last - 1])?;

    let mut keys = Vec::with_capacity(n);
    for key in &ins[1..last - 1] {
        match key.push_bytes() {
            Some(data) if is_public_key_shaped(data) => keys.push(data.to_vec()),
            _ => return None,
        }
    }

    if m > n || n != keys.len() || n > MAX_MULTISIG_KEYS {
        return None;
    }
    Some((m, keys))
}

fn small_positive(ins: &Instruction) -> Option<usize> {
    match ins {
        Instruction::Op(op) => match op.small_int() {
            Some(n) if n >= 1 => Some(n as usize),
            _ => None,
        },
        _ => None,
    }
}
