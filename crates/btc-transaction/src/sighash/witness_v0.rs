//! BIP143 signature hash for witness v0 programs.
//!
//! The preimage consists of:
//! 1. nVersion (4 bytes LE)
//! 2. hashPrevouts (32 bytes) - sha256d of all outpoints unless ANYONECANPAY
//! 3. hashSequence (32 bytes) - sha256d of all sequences, only for ALL without ANYONECANPAY
//! 4. outpoint (32+4 bytes) - txid + vout of the input being signed
//! 5. scriptCode (varint + script)
//! 6. amount (8 bytes LE) - value of the output being spent
//! 7. nSequence (4 bytes LE) - sequence of the input being signed
//! 8. hashOutputs (32 bytes) - sha256d of all outputs, or of the matching output for SINGLE
//! 9. nLocktime (4 bytes LE)
//! 10. sighashType (4 bytes LE)
//!
//! Absent hashes are 32 zero bytes.
//!
//! See <https://github.com/bitcoin/bips/blob/master/bip-0143.mediawiki>

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteWriter, VarInt};
use btc_script::Script;

use super::{SigHashEngine, SigHashType};
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

pub(super) fn signature_hash(
    engine: &SigHashEngine<'_>,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
    amount: i64,
) -> Result<[u8; 32], TransactionError> {
    let preimage = build_preimage(engine, script_code, input_index, sighash_type, amount)?;
    Ok(sha256d(&preimage))
}

/// Build the BIP143 preimage for input `input_index` (not yet hashed).
pub fn witness_v0_preimage(
    tx: &Transaction,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
    amount: i64,
) -> Result<Vec<u8>, TransactionError> {
    build_preimage(&SigHashEngine::new(tx), script_code, input_index, sighash_type, amount)
}

fn build_preimage(
    engine: &SigHashEngine<'_>,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
    amount: i64,
) -> Result<Vec<u8>, TransactionError> {
    let tx = engine.transaction();
    let input = tx.input(input_index)?;

    let hash_prevouts = if !sighash_type.anyone_can_pay() {
        engine.hash_prevouts()
    } else {
        [0u8; 32]
    };

    let hash_sequence = if !sighash_type.anyone_can_pay()
        && !sighash_type.is_single()
        && !sighash_type.is_none()
    {
        engine.hash_sequence()
    } else {
        [0u8; 32]
    };

    let hash_outputs = if !sighash_type.is_single() && !sighash_type.is_none() {
        engine.hash_outputs()
    } else if sighash_type.is_single() && input_index < tx.outputs.len() {
        outputs_hash(&tx.outputs[input_index..=input_index])
    } else {
        [0u8; 32]
    };

    let code = script_code.to_bytes();
    let mut writer = ByteWriter::with_capacity(156 + code.len());

    writer.write_i32_le(tx.version);
    writer.write_bytes(&hash_prevouts);
    writer.write_bytes(&hash_sequence);
    input.previous_output.write_to(&mut writer);
    writer.write_varint(VarInt::from(code.len()));
    writer.write_bytes(code);
    writer.write_i64_le(amount);
    writer.write_u32_le(input.sequence);
    writer.write_bytes(&hash_outputs);
    writer.write_u32_le(tx.lock_time);
    writer.write_u32_le(sighash_type.0);

    Ok(writer.into_bytes())
}

/// sha256d of every outpoint (txid + vout LE) concatenated.
pub(super) fn prevouts_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 36);
    for input in &tx.inputs {
        input.previous_output.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}

/// sha256d of every input sequence (4 bytes LE) concatenated.
pub(super) fn sequence_hash(tx: &Transaction) -> [u8; 32] {
    let mut writer = ByteWriter::with_capacity(tx.inputs.len() * 4);
    for input in &tx.inputs {
        writer.write_u32_le(input.sequence);
    }
    sha256d(writer.as_bytes())
}

/// sha256d of the serialized outputs.
pub(super) fn outputs_hash(outputs: &[TransactionOutput]) -> [u8; 32] {
    let mut writer = ByteWriter::new();
    for output in outputs {
        output.write_to(&mut writer);
    }
    sha256d(writer.as_bytes())
}
