//! Transaction input referencing a previous output.
//!
//! Contains the outpoint being spent, the unlocking script, the sequence
//! number and the input's witness stack. Provides binary
//! serialization/deserialization following the Bitcoin wire format; the
//! witness is written separately by the transaction (BIP144).

use std::fmt;

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::Script;
use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// Sequence number of a final input (no relative lock-time, and
/// CHECKLOCKTIMEVERIFY cannot be satisfied).
pub const SEQUENCE_FINAL: u32 = 0xFFFF_FFFF;

/// A reference to an output of a previous transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct OutPoint {
    /// The previous transaction ID in internal (little-endian) byte order.
    pub txid: [u8; 32],
    /// Index of the output within the previous transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }

    /// Build an outpoint from a display-order (byte-reversed) txid hex string.
    pub fn from_txid_hex(txid_hex: &str, vout: u32) -> Result<Self, TransactionError> {
        let bytes = hex::decode(txid_hex)
            .map_err(|e| TransactionError::Serialization(format!("invalid txid hex: {}", e)))?;
        if bytes.len() != 32 {
            return Err(TransactionError::Serialization(format!(
                "txid must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut txid = [0u8; 32];
        txid.copy_from_slice(&bytes);
        txid.reverse();
        Ok(OutPoint { txid, vout })
    }

    /// The all-zero hash with index 0xFFFFFFFF used by coinbase inputs.
    pub fn null() -> Self {
        OutPoint {
            txid: [0u8; 32],
            vout: u32::MAX,
        }
    }

    pub fn is_null(&self) -> bool {
        self.txid == [0u8; 32] && self.vout == u32::MAX
    }

    pub(crate) fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.txid);
        writer.write_u32_le(self.vout);
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut id = self.txid;
        id.reverse();
        write!(f, "{}:{}", hex::encode(id), self.vout)
    }
}

/// A single input in a Bitcoin transaction.
///
/// # Wire format (without witness)
///
/// | Field              | Size             |
/// |--------------------|------------------|
/// | txid               | 32 bytes (LE)    |
/// | vout               | 4 bytes (LE)     |
/// | script length      | VarInt           |
/// | script_sig         | variable         |
/// | sequence           | 4 bytes (LE)     |
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionInput {
    /// The output being spent.
    pub previous_output: OutPoint,

    /// The unlocking script. Empty for unsigned and native witness inputs.
    pub script_sig: Script,

    /// Sequence number. Defaults to `0xFFFFFFFF` (final).
    pub sequence: u32,

    /// Witness stack, bottom first. Empty for legacy inputs.
    pub witness: Vec<Vec<u8>>,
}

impl TransactionInput {
    /// Create an unsigned input spending `previous_output` with a final
    /// sequence number.
    pub fn new(previous_output: OutPoint) -> Self {
        TransactionInput {
            previous_output,
            script_sig: Script::new(),
            sequence: SEQUENCE_FINAL,
            witness: Vec::new(),
        }
    }

    /// Deserialize a `TransactionInput` (without witness) from a `ByteReader`.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid = reader.read_array::<32>().map_err(|e| {
            TransactionError::Serialization(format!("reading previous txid: {}", e))
        })?;

        let vout = reader.read_u32_le().map_err(|e| {
            TransactionError::Serialization(format!("reading output index: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::Serialization(format!("reading unlocking script: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::Serialization(format!("reading sequence number: {}", e))
        })?;

        Ok(TransactionInput {
            previous_output: OutPoint { txid, vout },
            script_sig: Script::from_bytes(script_bytes),
            sequence,
            witness: Vec::new(),
        })
    }

    /// Serialize this input (without witness) into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        self.previous_output.write_to(writer);
        let script_bytes = self.script_sig.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_u32_le(self.sequence);
    }

    /// Read this input's witness stack.
    pub(crate) fn read_witness(&mut self, reader: &mut ByteReader) -> Result<(), TransactionError> {
        let count = reader.read_varint().map_err(|e| {
            TransactionError::Serialization(format!("reading witness item count: {}", e))
        })?;
        // Each item takes at least one byte.
        if count.value() > reader.remaining() as u64 {
            return Err(TransactionError::Serialization(format!(
                "witness item count {} exceeds remaining data",
                count.value()
            )));
        }
        let mut witness = Vec::with_capacity(count.value() as usize);
        for _ in 0..count.value() {
            let item = reader.read_var_bytes().map_err(|e| {
                TransactionError::Serialization(format!("reading witness item: {}", e))
            })?;
            witness.push(item.to_vec());
        }
        self.witness = witness;
        Ok(())
    }

    pub(crate) fn write_witness(&self, writer: &mut ByteWriter) {
        writer.write_varint(VarInt::from(self.witness.len()));
        for item in &self.witness {
            writer.write_var_bytes(item);
        }
    }

    pub fn has_witness(&self) -> bool {
        !self.witness.is_empty()
    }

    /// Serialize this input to a byte vector (without witness).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outpoint_display_order() {
        let hex_id = "e2fa2ae1e9a45b72ff180c2a41a06eea293e1a046426bbc363b0ff141cc6c738";
        let op = OutPoint::from_txid_hex(hex_id, 3).unwrap();
        assert_eq!(op.txid[0], 0x38);
        assert_eq!(op.to_string(), format!("{}:3", hex_id));
        assert!(OutPoint::from_txid_hex("abcd", 0).is_err());
        assert!(OutPoint::null().is_null());
        assert!(!op.is_null());
    }

    #[test]
    fn test_input_roundtrip() {
        let mut input = TransactionInput::new(OutPoint::new([0x11; 32], 7));
        input.script_sig = Script::from_bytes(&[0x00, 0x51]);
        input.sequence = 0xfffffffe;
        let bytes = input.to_bytes();
        assert_eq!(bytes.len(), 32 + 4 + 1 + 2 + 4);

        let mut reader = ByteReader::new(&bytes);
        let parsed = TransactionInput::read_from(&mut reader).unwrap();
        assert_eq!(parsed, input);
    }

    #[test]
    fn test_witness_roundtrip() {
        let mut input = TransactionInput::new(OutPoint::default());
        input.witness = vec![vec![], vec![0xab; 72], vec![0x02; 33]];
        let mut writer = ByteWriter::new();
        input.write_witness(&mut writer);
        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], 3);

        let mut parsed = TransactionInput::new(OutPoint::default());
        parsed.read_witness(&mut ByteReader::new(&bytes)).unwrap();
        assert_eq!(parsed.witness, input.witness);
    }

    #[test]
    fn test_witness_count_too_large() {
        let mut input = TransactionInput::default();
        let data = [0xfe, 0xff, 0xff, 0xff, 0x00];
        assert!(input.read_witness(&mut ByteReader::new(&data)).is_err());
    }
}
