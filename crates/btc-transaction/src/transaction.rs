//! Core transaction type.
//!
//! Represents a transaction with version, inputs (each carrying its witness
//! stack), outputs and lock time. Serializes in the legacy layout, or in
//! the BIP144 extended layout when any input has a witness, and computes
//! both the txid (witness stripped) and the wtxid.

use std::fmt;

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// Lock times below this value are block heights, at or above it Unix
/// timestamps.
pub const LOCKTIME_THRESHOLD: u32 = 500_000_000;

/// BIP144 flag byte announcing witness data.
const WITNESS_FLAG: u8 = 0x01;

/// A Bitcoin transaction.
///
/// # Wire format
///
/// | Field        | Size                                   |
/// |--------------|----------------------------------------|
/// | version      | 4 bytes (LE)                           |
/// | marker, flag | `0x00 0x01`, only when witnesses exist |
/// | input count  | VarInt                                 |
/// | inputs       | variable (per input)                   |
/// | output count | VarInt                                 |
/// | outputs      | variable (per output)                  |
/// | witnesses    | one stack per input, only with flag    |
/// | lock_time    | 4 bytes (LE)                           |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version. Relative lock-times need 2 or above.
    pub version: i32,

    /// Ordered list of transaction inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of transaction outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time: a block height below [`LOCKTIME_THRESHOLD`], otherwise a
    /// Unix timestamp.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::Serialization(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes with no trailing data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::Serialization(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`, accepting both the
    /// legacy and the BIP144 layout.
    ///
    /// An empty input list is read as the BIP144 marker; a zero flag byte
    /// then means a transaction with no inputs and no outputs.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_i32_le().map_err(|e| {
            TransactionError::Serialization(format!("reading version: {}", e))
        })?;

        let mut inputs = read_inputs(reader)?;
        let mut outputs = Vec::new();
        let mut flag = 0u8;

        if inputs.is_empty() {
            flag = reader.read_u8().map_err(|e| {
                TransactionError::Serialization(format!("reading witness flag: {}", e))
            })?;
            if flag != 0 {
                inputs = read_inputs(reader)?;
                outputs = read_outputs(reader)?;
            }
        } else {
            outputs = read_outputs(reader)?;
        }

        if flag & WITNESS_FLAG != 0 {
            flag ^= WITNESS_FLAG;
            for input in inputs.iter_mut() {
                input.read_witness(reader)?;
            }
            if !inputs.iter().any(TransactionInput::has_witness) {
                return Err(TransactionError::Serialization(
                    "superfluous witness record".to_string(),
                ));
            }
        }
        if flag != 0 {
            return Err(TransactionError::Serialization(format!(
                "unknown transaction optional data flag 0x{:02x}",
                flag
            )));
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::Serialization(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction, including witnesses when any input has one.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.serialize(self.has_witness())
    }

    /// Serialize this transaction in the legacy layout, dropping witnesses.
    pub fn to_bytes_no_witness(&self) -> Vec<u8> {
        self.serialize(false)
    }

    fn serialize(&self, with_witness: bool) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        self.write_to(&mut writer, with_witness);
        writer.into_bytes()
    }

    pub(crate) fn write_to(&self, writer: &mut ByteWriter, with_witness: bool) {
        writer.write_i32_le(self.version);
        if with_witness {
            writer.write_u8(0x00);
            writer.write_u8(WITNESS_FLAG);
        }

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(writer);
        }

        if with_witness {
            for input in &self.inputs {
                input.write_witness(writer);
            }
        }

        writer.write_u32_le(self.lock_time);
    }

    /// Serialize this transaction to a hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Identifiers
    // -----------------------------------------------------------------

    /// The transaction ID: double SHA-256 of the witness-stripped
    /// serialization, in internal byte order.
    pub fn txid(&self) -> [u8; 32] {
        sha256d(&self.to_bytes_no_witness())
    }

    /// The witness transaction ID (equal to the txid without witnesses).
    pub fn wtxid(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// The txid in display (byte-reversed) hex.
    pub fn txid_hex(&self) -> String {
        let mut id = self.txid();
        id.reverse();
        hex::encode(id)
    }

    // -----------------------------------------------------------------
    // Inputs and outputs
    // -----------------------------------------------------------------

    pub fn add_input(&mut self, input: TransactionInput) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: TransactionOutput) {
        self.outputs.push(output);
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    /// Borrow input `index`, failing with [`TransactionError::InputIndex`].
    pub fn input(&self, index: usize) -> Result<&TransactionInput, TransactionError> {
        self.inputs.get(index).ok_or(TransactionError::InputIndex {
            index,
            count: self.inputs.len(),
        })
    }

    /// Whether any input carries witness data.
    pub fn has_witness(&self) -> bool {
        self.inputs.iter().any(TransactionInput::has_witness)
    }

    /// A coinbase transaction has exactly one input spending the null outpoint.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].previous_output.is_null()
    }

    /// Serialized size in bytes, witnesses included.
    pub fn size(&self) -> usize {
        self.to_bytes().len()
    }

    /// BIP141 weight: three times the stripped size plus the total size.
    pub fn weight(&self) -> usize {
        self.to_bytes_no_witness().len() * 3 + self.size()
    }
}

fn read_inputs(reader: &mut ByteReader) -> Result<Vec<TransactionInput>, TransactionError> {
    let count = reader.read_varint().map_err(|e| {
        TransactionError::Serialization(format!("reading input count: {}", e))
    })?;
    // An input is at least 41 bytes.
    let mut inputs = Vec::with_capacity((count.value() as usize).min(reader.remaining() / 41));
    for _ in 0..count.value() {
        inputs.push(TransactionInput::read_from(reader)?);
    }
    Ok(inputs)
}

fn read_outputs(reader: &mut ByteReader) -> Result<Vec<TransactionOutput>, TransactionError> {
    let count = reader.read_varint().map_err(|e| {
        TransactionError::Serialization(format!("reading output count: {}", e))
    })?;
    // An output is at least 9 bytes.
    let mut outputs = Vec::with_capacity((count.value() as usize).min(reader.remaining() / 9));
    for _ in 0..count.value() {
        outputs.push(TransactionOutput::read_from(reader)?);
    }
    Ok(outputs)
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl serde::Serialize for Transaction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Transaction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Transaction::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
