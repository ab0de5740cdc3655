//! Transaction output with a value and locking script.
//!
//! Defines the spending conditions for the output's value. Provides
//! binary serialization/deserialization following the Bitcoin wire format.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::Script;
use serde::{Deserialize, Serialize};

use crate::TransactionError;

/// A single output in a Bitcoin transaction.
///
/// # Wire format
///
/// | Field            | Size           |
/// |------------------|----------------|
/// | value            | 8 bytes (LE)   |
/// | script length    | VarInt         |
/// | script_pubkey    | variable       |
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    /// Value in satoshis. Signed on the wire; the legacy SIGHASH_SINGLE
    /// digest blanks outputs with a value of -1.
    pub value: i64,

    /// The locking script (scriptPubKey) that defines spending conditions.
    pub script_pubkey: Script,
}

impl TransactionOutput {
    /// Create an output paying `value` to `script_pubkey`.
    pub fn new(value: i64, script_pubkey: Script) -> Self {
        TransactionOutput {
            value,
            script_pubkey,
        }
    }

    /// The output blanked by legacy SIGHASH_SINGLE: value -1, empty script.
    pub(crate) fn null() -> Self {
        TransactionOutput::new(-1, Script::new())
    }

    /// Deserialize a `TransactionOutput` from a `ByteReader`.
    ///
    /// Reads 8-byte LE value, a varint script length, and the script bytes.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader.read_i64_le().map_err(|e| {
            TransactionError::Serialization(format!("reading value: {}", e))
        })?;

        let script_bytes = reader.read_var_bytes().map_err(|e| {
            TransactionError::Serialization(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            value,
            script_pubkey: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this `TransactionOutput` into a `ByteWriter`.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_i64_le(self.value);
        let script_bytes = self.script_pubkey.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }

    /// Serialize this output to a byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.write_to(&mut writer);
        writer.into_bytes()
    }
}

impl Default for TransactionOutput {
    fn default() -> Self {
        TransactionOutput::new(0, Script::new())
    }
}
