/// Bitcoin Script type - a sequence of opcodes and data pushes.
///
/// Scripts are used in transaction inputs (scriptSig) and outputs
/// (scriptPubKey) to define spending conditions. The Script wraps a
/// `Vec<u8>` and provides methods for construction, parsing, template
/// detection, serialization, and ASM output.

use std::fmt;

use crate::instruction::{parse_script, push_data_prefix, Instruction};
use crate::opcodes::*;
use crate::ScriptError;

/// A Bitcoin script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        Ok(Script(hex::decode(hex_str)?))
    }

    /// Create a script from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from its instructions.
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let mut bytes = Vec::new();
        for ins in instructions {
            ins.encode_into(&mut bytes);
        }
        Script(bytes)
    }

    /// Create a script from a Bitcoin ASM string.
    ///
    /// Parses space-separated tokens where known opcodes (e.g. "OP_DUP") are
    /// emitted directly, `0` is an empty push, and hex strings are treated
    /// as minimal data pushes.
    ///
    /// # Arguments
    /// * `asm` - A space-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or an error if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        for token in asm.split_whitespace() {
            if token == "0" {
                script.0.push(OP_0);
            } else if let Some(op) = Opcode::from_name(token) {
                script.0.push(op.to_u8());
            } else {
                let data = hex::decode(token)
                    .map_err(|_| ScriptError::InvalidOpcodeData(token.to_string()))?;
                script.append_push_data(&data)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------------

    /// Encode the script as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Data pushes appear as their hex encoding; opcodes appear by name.
    ///
    /// # Returns
    /// A space-separated ASM string, or `[error]` if the script does not parse.
    pub fn to_asm(&self) -> String {
        match self.instructions() {
            Ok(ins) => ins
                .iter()
                .map(Instruction::to_asm_string)
                .collect::<Vec<_>>()
                .join(" "),
            Err(_) => "[error]".to_string(),
        }
    }

    /// Return a reference to the underlying bytes.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume the script and return the owned bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Return the length of the script in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the script into instructions.
    ///
    /// # Returns
    /// The decoded instructions, or `MalformedPush` if a push is truncated.
    pub fn instructions(&self) -> Result<Vec<Instruction>, ScriptError> {
        parse_script(&self.0)
    }

    // -----------------------------------------------------------------------
    // Template detection
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check if this is a P2WPKH output script: OP_0 <20 bytes>.
    pub fn is_p2wpkh(&self) -> bool {
        let b = &self.0;
        b.len() == 22 && b[0] == OP_0 && b[1] == OP_DATA_20
    }

    /// Check if this is a P2WSH output script: OP_0 <32 bytes>.
    pub fn is_p2wsh(&self) -> bool {
        let b = &self.0;
        b.len() == 34 && b[0] == OP_0 && b[1] == OP_DATA_32
    }

    /// Check if this is a null-data output script (begins with OP_RETURN).
    pub fn is_null_data(&self) -> bool {
        self.0.first() == Some(&OP_RETURN)
    }

    /// Decode a witness program.
    ///
    /// A witness program is a version opcode (`OP_0` or `OP_1`..`OP_16`)
    /// followed by a single direct push of 2 to 40 bytes, with nothing else.
    ///
    /// # Returns
    /// The witness version (0-16) and program bytes, or `None`.
    pub fn witness_program(&self) -> Option<(u8, &[u8])> {
        let b = &self.0;
        if b.len() < 4 || b.len() > 42 {
            return None;
        }
        let version = match b[0] {
            OP_0 => 0,
            v @ OP_1..=OP_16 => v - OP_1 + 1,
            _ => return None,
        };
        if b[1] as usize + 2 != b.len() {
            return None;
        }
        Some((version, &b[2..]))
    }

    /// Check that the script contains only push operations
    /// (every opcode is at most `OP_16`). Malformed scripts are not push-only.
    pub fn is_push_only(&self) -> bool {
        match self.instructions() {
            Ok(ins) => ins.iter().all(|i| i.opcode().is_push_only()),
            Err(_) => false,
        }
    }

    // -----------------------------------------------------------------------
    // Mutation / building
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the minimal push prefix.
    ///
    /// Chooses the minimal encoding: direct push for 0-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (OP_DATA_1..OP_PUSHDATA4). Use
    /// `append_push_data` for those.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if (OP_DATA_1..=OP_PUSHDATA4).contains(&op) {
                return Err(ScriptError::InvalidOpcodeType(
                    Opcode::from_u8(op).to_string(),
                ));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Remove every push of exactly `data` (in its minimal encoding) that
    /// starts on an instruction boundary.
    ///
    /// This is the legacy signature-hash `FindAndDelete` applied to a
    /// signature before hashing the script code.
    ///
    /// # Returns
    /// The rewritten script and the number of matches removed.
    pub fn find_and_delete(&self, data: &[u8]) -> (Script, usize) {
        let needle = Instruction::push(data);
        let (instructions, tail) = self.parseable_prefix();
        let mut out = Vec::with_capacity(self.0.len());
        let mut removed = 0;
        for ins in &instructions {
            if *ins == needle {
                removed += 1;
            } else {
                ins.encode_into(&mut out);
            }
        }
        out.extend_from_slice(tail);
        (Script(out), removed)
    }

    /// Return a copy of the script with every OP_CODESEPARATOR removed.
    ///
    /// Bytes from a malformed push onwards are kept verbatim.
    pub fn without_code_separators(&self) -> Script {
        let (instructions, tail) = self.parseable_prefix();
        let mut out = Vec::with_capacity(self.0.len());
        for ins in instructions
            .iter()
            .filter(|i| i.opcode() != Opcode::OP_CODESEPARATOR)
        {
            ins.encode_into(&mut out);
        }
        out.extend_from_slice(tail);
        Script(out)
    }

    /// Split the script into the instructions that parse and the raw bytes
    /// from the first malformed push onwards.
    fn parseable_prefix(&self) -> (Vec<Instruction>, &[u8]) {
        match parse_script(&self.0) {
            Ok(ins) => (ins, &[]),
            Err(ScriptError::MalformedPush { offset, .. }) => {
                let head = parse_script(&self.0[..offset]).unwrap_or_default();
                (head, &self.0[offset..])
            }
            Err(_) => (Vec::new(), &self.0[..]),
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<u8>> for Script {
    fn from(bytes: Vec<u8>) -> Self {
        Script(bytes)
    }
}

impl AsRef<[u8]> for Script {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    //! Tests for the Script type.
    //!
    //! Covers hex/ASM construction, template detection, witness program
    //! decoding, push-only checks and the legacy sighash script rewrites.

    use super::*;

    const P2PKH_HEX: &str = "76a914e2a623699e81b291c0327f408fea765d534baa2a88ac";

    #[test]
    fn test_from_hex_roundtrip() {
        let script = Script::from_hex(P2PKH_HEX).expect("valid hex should parse");
        assert_eq!(script.to_hex(), P2PKH_HEX);
        assert!(Script::from_hex("ZZZZ").is_err());
        assert!(Script::from_hex("").unwrap().is_empty());
    }

    #[test]
    fn test_to_asm_p2pkh() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        assert_eq!(
            script.to_asm(),
            "OP_DUP OP_HASH160 e2a623699e81b291c0327f408fea765d534baa2a OP_EQUALVERIFY OP_CHECKSIG"
        );
        let back = Script::from_asm(&script.to_asm()).unwrap();
        assert_eq!(back, script);
    }

    #[test]
    fn test_asm_zero_and_errors() {
        let script = Script::from_asm("0 OP_IF OP_ENDIF").unwrap();
        assert_eq!(script.to_bytes(), &[OP_0, OP_IF, OP_ENDIF]);
        assert_eq!(script.to_asm(), "0 OP_IF OP_ENDIF");
        assert!(Script::from_asm("OP_DUP xyz").is_err());
        assert_eq!(Script::from_bytes(&[0x05, 0x01]).to_asm(), "[error]");
    }

    #[test]
    fn test_template_detection() {
        let p2pkh = Script::from_hex(P2PKH_HEX).unwrap();
        assert!(p2pkh.is_p2pkh());
        assert!(!p2pkh.is_p2sh());

        let p2sh = Script::from_hex("a914e2a623699e81b291c0327f408fea765d534baa2a87").unwrap();
        assert!(p2sh.is_p2sh());
        assert!(!p2sh.is_p2pkh());

        let p2wpkh = Script::from_hex("0014e2a623699e81b291c0327f408fea765d534baa2a").unwrap();
        assert!(p2wpkh.is_p2wpkh());
        assert_eq!(p2wpkh.witness_program().map(|(v, p)| (v, p.len())), Some((0, 20)));

        let mut wsh = vec![OP_0, OP_DATA_32];
        wsh.extend_from_slice(&[0xab; 32]);
        let p2wsh = Script::from(wsh);
        assert!(p2wsh.is_p2wsh());
        assert_eq!(p2wsh.witness_program().map(|(v, p)| (v, p.len())), Some((0, 32)));

        assert!(Script::from_bytes(&[OP_RETURN, 0x01, 0x00]).is_null_data());
    }

    #[test]
    fn test_witness_program_bounds() {
        // v1 program of 32 bytes
        let mut v1 = vec![OP_1, 0x20];
        v1.extend_from_slice(&[0x11; 32]);
        assert_eq!(Script::from(v1).witness_program().map(|(v, _)| v), Some(1));

        // program too short (1 byte)
        assert!(Script::from_bytes(&[OP_0, 0x01, 0xaa]).witness_program().is_none());

        // program too long (41 bytes)
        let mut long = vec![OP_0, 41];
        long.extend_from_slice(&[0u8; 41]);
        assert!(Script::from(long).witness_program().is_none());

        // non-direct push
        let mut pd1 = vec![OP_0, OP_PUSHDATA1, 20];
        pd1.extend_from_slice(&[0u8; 20]);
        assert!(Script::from(pd1).witness_program().is_none());

        // bad version opcode
        let mut bad = vec![OP_1NEGATE, 20];
        bad.extend_from_slice(&[0u8; 20]);
        assert!(Script::from(bad).witness_program().is_none());
    }

    #[test]
    fn test_push_only() {
        assert!(Script::from_bytes(&[OP_0, OP_1, 0x01, 0xff, OP_16, OP_1NEGATE]).is_push_only());
        assert!(!Script::from_bytes(&[OP_1, OP_DUP]).is_push_only());
        assert!(!Script::from_bytes(&[0x02, 0x01]).is_push_only());
        assert!(Script::new().is_push_only());
    }

    #[test]
    fn test_append_opcodes_rejects_push() {
        let mut script = Script::new();
        assert!(script.append_opcodes(&[OP_DUP, OP_HASH160]).is_ok());
        assert!(script.append_opcodes(&[OP_DATA_20]).is_err());
        assert!(script.append_opcodes(&[OP_PUSHDATA1]).is_err());
    }

    #[test]
    fn test_find_and_delete() {
        let sig = vec![0x30, 0x01, 0x02];
        let mut script = Script::new();
        script.append_push_data(&sig).unwrap();
        script.append_opcodes(&[OP_DUP]).unwrap();
        script.append_push_data(&sig).unwrap();
        script.append_push_data(&[0x30, 0x01]).unwrap();

        let (out, removed) = script.find_and_delete(&sig);
        assert_eq!(removed, 2);
        assert_eq!(out.to_bytes(), &[OP_DUP, 0x02, 0x30, 0x01]);

        let (same, none) = script.find_and_delete(&[0xde, 0xad]);
        assert_eq!(none, 0);
        assert_eq!(same, script);
    }

    #[test]
    fn test_without_code_separators() {
        let script = Script::from_bytes(&[OP_1, OP_CODESEPARATOR, 0x01, OP_CODESEPARATOR, OP_CODESEPARATOR]);
        // the byte after the 0x01 push opcode is data, not a separator
        assert_eq!(script.without_code_separators().to_bytes(), &[OP_1, 0x01, OP_CODESEPARATOR]);

        let truncated = Script::from_bytes(&[OP_CODESEPARATOR, 0x05, 0x01]);
        assert_eq!(truncated.without_code_separators().to_bytes(), &[0x05, 0x01]);
    }

    #[test]
    fn test_serde_hex() {
        let script = Script::from_hex(P2PKH_HEX).unwrap();
        let json = serde_json::to_string(&script).unwrap();
        assert_eq!(json, format!("\"{}\"", P2PKH_HEX));
        let back: Script = serde_json::from_str(&json).unwrap();
        assert_eq!(back, script);
    }
}
