//! Script instruction parsing and encoding.
//!
//! A script decodes into a sequence of [`Instruction`]s: either a bare
//! opcode or a data push that remembers which push opcode carried it, so
//! minimal-push rules can be checked after parsing.

use btc_primitives::util::ByteReader;

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a Bitcoin script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// A non-push opcode (including `OP_1NEGATE` and `OP_1`..`OP_16`).
    Op(Opcode),
    /// A data push and the opcode that encoded it.
    Push {
        /// `OP_0`, `OP_PUSHBYTES(n)` or `OP_PUSHDATA1/2/4`.
        opcode: Opcode,
        /// The pushed bytes.
        data: Vec<u8>,
    },
}

impl Instruction {
    /// Build a push instruction using the smallest push opcode for `data`.
    ///
    /// Note that this never selects `OP_1`..`OP_16`; use
    /// [`crate::ScriptBuilder::push_int`] for small numbers.
    pub fn push(data: &[u8]) -> Instruction {
        let opcode = match data.len() {
            0 => Opcode::OP_0,
            n @ 1..=75 => Opcode::OP_PUSHBYTES(n as u8),
            76..=0xff => Opcode::OP_PUSHDATA1,
            0x100..=0xffff => Opcode::OP_PUSHDATA2,
            _ => Opcode::OP_PUSHDATA4,
        };
        Instruction::Push {
            opcode,
            data: data.to_vec(),
        }
    }

    /// The opcode of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Op(op) => *op,
            Instruction::Push { opcode, .. } => *opcode,
        }
    }

    /// The pushed bytes, if this is a push.
    pub fn push_bytes(&self) -> Option<&[u8]> {
        match self {
            Instruction::Push { data, .. } => Some(data),
            Instruction::Op(_) => None,
        }
    }

    /// Check that a push uses the smallest possible encoding.
    ///
    /// Mirrors the consensus `CheckMinimalPush` rule: empty data must use
    /// `OP_0`, single bytes 1..16 and 0x81 must use the small-int opcodes,
    /// and longer payloads must use the shortest length prefix.
    pub fn is_minimal_push(&self) -> bool {
        let (opcode, data) = match self {
            Instruction::Push { opcode, data } => (opcode.to_u8(), data),
            Instruction::Op(_) => return true,
        };
        let len = data.len();
        if len == 0 {
            return opcode == OP_0;
        }
        if len == 1 && (1..=16).contains(&data[0]) {
            return false;
        }
        if len == 1 && data[0] == 0x81 {
            return false;
        }
        if len <= 75 {
            return opcode as usize == len;
        }
        if len <= 0xff {
            return opcode == OP_PUSHDATA1;
        }
        if len <= 0xffff {
            return opcode == OP_PUSHDATA2;
        }
        true
    }

    /// Number of bytes this instruction occupies in serialized form.
    pub fn encoded_len(&self) -> usize {
        match self {
            Instruction::Op(_) => 1,
            Instruction::Push { opcode, data } => {
                let prefix = match opcode {
                    Opcode::OP_PUSHDATA1 => 2,
                    Opcode::OP_PUSHDATA2 => 3,
                    Opcode::OP_PUSHDATA4 => 5,
                    _ => 1,
                };
                prefix + data.len()
            }
        }
    }

    /// Append the serialized instruction to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Instruction::Op(op) => out.push(op.to_u8()),
            Instruction::Push { opcode, data } => {
                out.push(opcode.to_u8());
                match opcode {
                    Opcode::OP_PUSHDATA1 => out.push(data.len() as u8),
                    Opcode::OP_PUSHDATA2 => {
                        out.extend_from_slice(&(data.len() as u16).to_le_bytes())
                    }
                    Opcode::OP_PUSHDATA4 => {
                        out.extend_from_slice(&(data.len() as u32).to_le_bytes())
                    }
                    _ => {}
                }
                out.extend_from_slice(data);
            }
        }
    }

    /// Serialize the instruction into a new byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.encode_into(&mut out);
        out
    }

    /// Render the instruction as an ASM token. Pushes are hex, opcodes
    /// use their canonical names; an empty push renders as `0`.
    pub fn to_asm_string(&self) -> String {
        match self {
            Instruction::Push { data, .. } if data.is_empty() => "0".to_string(),
            Instruction::Push { data, .. } => hex::encode(data),
            Instruction::Op(op) => op.to_string(),
        }
    }
}

/// Decode raw script bytes into instructions.
///
/// Fails with [`ScriptError::MalformedPush`] when a push declares more
/// bytes than remain.
pub fn parse_script(bytes: &[u8]) -> Result<Vec<Instruction>, ScriptError> {
    let mut instructions = Vec::new();
    let mut reader = ByteReader::new(bytes);

    while reader.remaining() > 0 {
        let offset = bytes.len() - reader.remaining();
        let opcode = Opcode::from_u8(read_or_malformed(&mut reader, offset, 1)?[0]);
        let len = match opcode {
            Opcode::OP_0 => Some(0),
            Opcode::OP_PUSHBYTES(n) => Some(n as usize),
            Opcode::OP_PUSHDATA1 => Some(read_or_malformed(&mut reader, offset, 1)?[0] as usize),
            Opcode::OP_PUSHDATA2 => {
                let b = read_or_malformed(&mut reader, offset, 2)?;
                Some(u16::from_le_bytes([b[0], b[1]]) as usize)
            }
            Opcode::OP_PUSHDATA4 => {
                let b = read_or_malformed(&mut reader, offset, 4)?;
                Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize)
            }
            _ => None,
        };
        match len {
            Some(len) => {
                let data = read_or_malformed(&mut reader, offset, len)?.to_vec();
                instructions.push(Instruction::Push { opcode, data });
            }
            None => instructions.push(Instruction::Op(opcode)),
        }
    }

    Ok(instructions)
}

fn read_or_malformed<'a>(
    reader: &mut ByteReader<'a>,
    offset: usize,
    needed: usize,
) -> Result<&'a [u8], ScriptError> {
    let remaining = reader.remaining();
    reader.read_bytes(needed).map_err(|_| ScriptError::MalformedPush {
        offset,
        needed,
        remaining,
    })
}

/// Compute the push prefix bytes for a payload of the given length.
pub fn push_data_prefix(data_len: usize) -> Result<Vec<u8>, ScriptError> {
    if data_len <= 75 {
        Ok(vec![data_len as u8])
    } else if data_len <= 0xff {
        Ok(vec![OP_PUSHDATA1, data_len as u8])
    } else if data_len <= 0xffff {
        let mut buf = vec![OP_PUSHDATA2];
        buf.extend_from_slice(&(data_len as u16).to_le_bytes());
        Ok(buf)
    } else if data_len <= 0xffff_ffff {
        let mut buf = vec![OP_PUSHDATA4];
        buf.extend_from_slice(&(data_len as u32).to_le_bytes());
        Ok(buf)
    } else {
        Err(ScriptError::DataTooBig(data_len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_p2pkh() {
        let bytes = hex::decode("76a914e2a623699e81b291c0327f408fea765d534baa2a88ac").unwrap();
        let ins = parse_script(&bytes).unwrap();
        assert_eq!(ins.len(), 5);
        assert_eq!(ins[0], Instruction::Op(Opcode::OP_DUP));
        assert_eq!(ins[1], Instruction::Op(Opcode::OP_HASH160));
        assert_eq!(ins[2].opcode(), Opcode::OP_PUSHBYTES(20));
        assert_eq!(ins[2].push_bytes().unwrap().len(), 20);
        assert_eq!(ins[4], Instruction::Op(Opcode::OP_CHECKSIG));
    }

    #[test]
    fn test_parse_pushdata_forms() {
        let mut bytes = vec![OP_PUSHDATA1, 0x03, 1, 2, 3];
        bytes.extend_from_slice(&[OP_PUSHDATA2, 0x02, 0x00, 9, 9]);
        bytes.extend_from_slice(&[OP_PUSHDATA4, 0x01, 0x00, 0x00, 0x00, 7]);
        bytes.push(OP_0);
        let ins = parse_script(&bytes).unwrap();
        assert_eq!(
            ins,
            vec![
                Instruction::Push { opcode: Opcode::OP_PUSHDATA1, data: vec![1, 2, 3] },
                Instruction::Push { opcode: Opcode::OP_PUSHDATA2, data: vec![9, 9] },
                Instruction::Push { opcode: Opcode::OP_PUSHDATA4, data: vec![7] },
                Instruction::Push { opcode: Opcode::OP_0, data: vec![] },
            ]
        );
        let mut out = Vec::new();
        for i in &ins {
            assert_eq!(i.encoded_len(), i.to_bytes().len());
            i.encode_into(&mut out);
        }
        assert_eq!(out, bytes);
    }

    #[test]
    fn test_parse_truncated() {
        let cases: Vec<Vec<u8>> = vec![
            vec![0x05, 1, 2],
            vec![OP_PUSHDATA1],
            vec![OP_PUSHDATA1, 0x02, 1],
            vec![OP_PUSHDATA2, 0x01],
            vec![OP_PUSHDATA4, 0x01, 0x00, 0x00],
            vec![OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff, 0x00],
        ];
        for bytes in cases {
            let err = parse_script(&bytes).unwrap_err();
            assert!(
                matches!(err, ScriptError::MalformedPush { offset: 0, .. }),
                "{:02x?}: {:?}",
                bytes,
                err
            );
        }
    }

    #[test]
    fn test_unknown_bytes_parse() {
        let ins = parse_script(&[0xba, 0xff]).unwrap();
        assert_eq!(ins[0], Instruction::Op(Opcode::OP_UNKNOWN(0xba)));
        assert_eq!(ins[1], Instruction::Op(Opcode::OP_INVALIDOPCODE));
    }

    #[test]
    fn test_minimal_push() {
        assert!(Instruction::push(&[]).is_minimal_push());
        assert!(Instruction::push(&[0x42]).is_minimal_push());
        assert!(Instruction::push(&[0u8; 76]).is_minimal_push());
        assert!(Instruction::push(&[0u8; 300]).is_minimal_push());

        // small ints must use OP_1..OP_16 and OP_1NEGATE
        assert!(!Instruction::push(&[0x05]).is_minimal_push());
        assert!(!Instruction::push(&[0x81]).is_minimal_push());

        let padded = Instruction::Push { opcode: Opcode::OP_PUSHDATA1, data: vec![0xaa; 10] };
        assert!(!padded.is_minimal_push());
        let padded2 = Instruction::Push { opcode: Opcode::OP_PUSHDATA2, data: vec![0xaa; 200] };
        assert!(!padded2.is_minimal_push());
        let empty1 = Instruction::Push { opcode: Opcode::OP_PUSHDATA1, data: vec![] };
        assert!(!empty1.is_minimal_push());
    }

    #[test]
    fn test_push_data_prefix() {
        assert_eq!(push_data_prefix(0).unwrap(), vec![0x00]);
        assert_eq!(push_data_prefix(75).unwrap(), vec![75]);
        assert_eq!(push_data_prefix(76).unwrap(), vec![OP_PUSHDATA1, 76]);
        assert_eq!(push_data_prefix(256).unwrap(), vec![OP_PUSHDATA2, 0x00, 0x01]);
        assert_eq!(
            push_data_prefix(65536).unwrap(),
            vec![OP_PUSHDATA4, 0x00, 0x00, 0x01, 0x00]
        );
    }
}
