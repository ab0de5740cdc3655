//! Script builders and standard output templates.

use btc_primitives::hash::{hash160, sha256};

use crate::classify::{is_public_key_shaped, MAX_MULTISIG_KEYS};
use crate::instruction::Instruction;
use crate::interpreter::scriptnum::ScriptNumber;
use crate::opcodes::*;
use crate::{Script, ScriptError};

/// Incremental script builder choosing minimal encodings.
#[derive(Debug, Clone, Default)]
pub struct ScriptBuilder {
    bytes: Vec<u8>,
}

impl ScriptBuilder {
    /// Start an empty script.
    pub fn new() -> Self {
        ScriptBuilder { bytes: Vec::new() }
    }

    /// Append a bare opcode.
    pub fn push_opcode(mut self, op: Opcode) -> Self {
        self.bytes.push(op.to_u8());
        self
    }

    /// Append a data push using the smallest push opcode.
    pub fn push_data(mut self, data: &[u8]) -> Self {
        Instruction::push(data).encode_into(&mut self.bytes);
        self
    }

    /// Append a number: `OP_0`, `OP_1NEGATE` and `OP_1`..`OP_16` for small
    /// values, otherwise a minimal ScriptNum push.
    pub fn push_int(mut self, n: i64) -> Self {
        match n {
            0 => self.bytes.push(OP_0),
            -1 => self.bytes.push(OP_1NEGATE),
            1..=16 => self.bytes.push(OP_1 + n as u8 - 1),
            _ => {
                let encoded = ScriptNumber::new(n).to_bytes();
                Instruction::push(&encoded).encode_into(&mut self.bytes);
            }
        }
        self
    }

    /// Finish and return the script.
    pub fn into_script(self) -> Script {
        Script::from(self.bytes)
    }
}

/// `OP_DUP OP_HASH160 <hash> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh(pub_key_hash: &[u8; 20]) -> Script {
    ScriptBuilder::new()
        .push_opcode(Opcode::OP_DUP)
        .push_opcode(Opcode::OP_HASH160)
        .push_data(pub_key_hash)
        .push_opcode(Opcode::OP_EQUALVERIFY)
        .push_opcode(Opcode::OP_CHECKSIG)
        .into_script()
}

/// `<pubkey> OP_CHECKSIG`
pub fn p2pk(pub_key: &[u8]) -> Result<Script, ScriptError> {
    if !is_public_key_shaped(pub_key) {
        return Err(ScriptError::InvalidScript(format!(
            "not a public key: {}",
            hex::encode(pub_key)
        )));
    }
    Ok(ScriptBuilder::new()
        .push_data(pub_key)
        .push_opcode(Opcode::OP_CHECKSIG)
        .into_script())
}

/// `OP_m <key>... OP_n OP_CHECKMULTISIG`.
///
/// When `sort` is set the keys are ordered lexicographically (BIP67).
pub fn multisig(required: usize, keys: &[Vec<u8>], sort: bool) -> Result<Script, ScriptError> {
    let total = keys.len();
    if required == 0 || required > total || total > MAX_MULTISIG_KEYS {
        return Err(ScriptError::InvalidMultisig { required, total });
    }
    if let Some(bad) = keys.iter().find(|k| !is_public_key_shaped(k)) {
        return Err(ScriptError::InvalidScript(format!(
            "not a public key: {}",
            hex::encode(bad)
        )));
    }
    let mut keys = keys.to_vec();
    if sort {
        keys.sort();
    }

    let mut builder = ScriptBuilder::new().push_int(required as i64);
    for key in &keys {
        builder = builder.push_data(key);
    }
    Ok(builder
        .push_int(total as i64)
        .push_opcode(Opcode::OP_CHECKMULTISIG)
        .into_script())
}

/// `OP_HASH160 <hash160(redeem)> OP_EQUAL`
pub fn p2sh(redeem_script: &Script) -> Script {
    p2sh_from_hash(&hash160(redeem_script.to_bytes()))
}

/// `OP_HASH160 <hash> OP_EQUAL`
pub fn p2sh_from_hash(script_hash: &[u8; 20]) -> Script {
    ScriptBuilder::new()
        .push_opcode(Opcode::OP_HASH160)
        .push_data(script_hash)
        .push_opcode(Opcode::OP_EQUAL)
        .into_script()
}

/// `OP_0 <hash>`
pub fn p2wpkh(pub_key_hash: &[u8; 20]) -> Script {
    witness_program(0, pub_key_hash)
}

/// `OP_0 <sha256(witness_script)>`
pub fn p2wsh(witness_script: &Script) -> Script {
    witness_program(0, &sha256(witness_script.to_bytes()))
}

/// `OP_n <program>` for witness version `n`.
pub fn witness_program(version: u8, program: &[u8]) -> Script {
    ScriptBuilder::new()
        .push_int(version as i64)
        .push_data(program)
        .into_script()
}

/// `OP_RETURN <data>`
pub fn null_data(data: &[u8]) -> Result<Script, ScriptError> {
    if data.len() > crate::interpreter::config::MAX_SCRIPT_ELEMENT_SIZE {
        return Err(ScriptError::DataTooBig(data.len()));
    }
    Ok(ScriptBuilder::new()
        .push_opcode(Opcode::OP_RETURN)
        .push_data(data)
        .into_script())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_int_encodings() {
        let script = ScriptBuilder::new()
            .push_int(0)
            .push_int(-1)
            .push_int(16)
            .push_int(17)
            .push_int(-2)
            .push_int(500)
            .into_script();
        assert_eq!(
            script.to_bytes(),
            &[OP_0, OP_1NEGATE, OP_16, 0x01, 0x11, 0x01, 0x82, 0x02, 0xf4, 0x01]
        );
    }

    #[test]
    fn test_p2pkh_template() {
        let hash = hex::decode("e2a623699e81b291c0327f408fea765d534baa2a").unwrap();
        let mut h = [0u8; 20];
        h.copy_from_slice(&hash);
        assert_eq!(
            p2pkh(&h).to_hex(),
            "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac"
        );
    }

    #[test]
    fn test_multisig_sorted() {
        let mut a = vec![0x03; 33];
        a[1] = 0x01;
        let mut b = vec![0x02; 33];
        b[1] = 0xff;
        let unsorted = multisig(1, &[a.clone(), b.clone()], false).unwrap();
        let sorted = multisig(1, &[a.clone(), b.clone()], true).unwrap();
        assert_eq!(&unsorted.to_bytes()[2..35], &a[..]);
        assert_eq!(&sorted.to_bytes()[2..35], &b[..]);
        assert_eq!(sorted.to_bytes()[0], OP_1);
        assert_eq!(sorted.to_bytes()[sorted.len() - 2], OP_2);
    }

    #[test]
    fn test_multisig_rejects_bad_params() {
        let k = vec![0x02; 33];
        assert!(matches!(
            multisig(0, &[k.clone()], false),
            Err(ScriptError::InvalidMultisig { required: 0, total: 1 })
        ));
        assert!(multisig(2, &[k.clone()], false).is_err());
        assert!(multisig(1, &vec![k.clone(); 21], false).is_err());
        assert!(multisig(1, &[vec![0x05; 33]], false).is_err());
    }

    #[test]
    fn test_segwit_templates() {
        let p = p2wpkh(&[0x11; 20]);
        assert!(p.is_p2wpkh());
        let ws = Script::from_bytes(&[OP_1]);
        let w = p2wsh(&ws);
        assert!(w.is_p2wsh());
        assert_eq!(&w.to_bytes()[2..], &sha256(&[OP_1])[..]);
        let v1 = witness_program(1, &[0x22; 32]);
        assert_eq!(v1.witness_program().map(|(v, _)| v), Some(1));
    }

    #[test]
    fn test_null_data_limit() {
        assert!(null_data(&[0u8; 80]).is_ok());
        assert!(null_data(&[0u8; 521]).is_err());
    }
}
