//! The original signature hash algorithm.
//!
//! A modified copy of the transaction is serialized: every scriptSig is
//! emptied except the signed input's, which becomes the script code, and
//! the NONE/SINGLE/ANYONECANPAY modes trim inputs and outputs. The
//! sighash type is appended as 4 LE bytes and the result double-hashed.

use btc_primitives::hash::sha256d;
use btc_primitives::util::ByteWriter;
use btc_script::Script;

use super::SigHashType;
use crate::output::TransactionOutput;
use crate::transaction::Transaction;
use crate::TransactionError;

/// Digest returned for SIGHASH_SINGLE when the input has no matching
/// output: the number one as a little-endian 256-bit integer.
pub const SIGHASH_SINGLE_BUG: [u8; 32] = {
    let mut one = [0u8; 32];
    one[0] = 1;
    one
};

pub(super) fn signature_hash(
    tx: &Transaction,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
) -> Result<[u8; 32], TransactionError> {
    match legacy_preimage(tx, script_code, input_index, sighash_type)? {
        Some(preimage) => Ok(sha256d(&preimage)),
        None => {
            tracing::debug!(input_index, "SIGHASH_SINGLE without matching output");
            Ok(SIGHASH_SINGLE_BUG)
        }
    }
}

/// Build the legacy preimage for input `input_index`.
///
/// Returns `None` for SIGHASH_SINGLE when `input_index` has no output at
/// the same index; the digest is then [`SIGHASH_SINGLE_BUG`] rather than
/// a hash of anything.
pub fn legacy_preimage(
    tx: &Transaction,
    script_code: &Script,
    input_index: usize,
    sighash_type: SigHashType,
) -> Result<Option<Vec<u8>>, TransactionError> {
    tx.input(input_index)?;

    if sighash_type.is_single() && input_index >= tx.outputs.len() {
        return Ok(None);
    }

    let mut copy = tx.clone();
    let script_code = script_code.without_code_separators();

    for (i, input) in copy.inputs.iter_mut().enumerate() {
        input.script_sig = if i == input_index {
            script_code.clone()
        } else {
            Script::new()
        };
        input.witness.clear();
    }

    if sighash_type.is_none() {
        copy.outputs.clear();
        zero_other_sequences(&mut copy, input_index);
    } else if sighash_type.is_single() {
        copy.outputs.truncate(input_index + 1);
        for output in copy.outputs.iter_mut().take(input_index) {
            *output = TransactionOutput::null();
        }
        zero_other_sequences(&mut copy, input_index);
    }

    if sighash_type.anyone_can_pay() {
        let signed = copy.inputs.swap_remove(input_index);
        copy.inputs = vec![signed];
    }

    let mut writer = ByteWriter::with_capacity(256);
    copy.write_to(&mut writer, false);
    writer.write_u32_le(sighash_type.0);
    Ok(Some(writer.into_bytes()))
}

fn zero_other_sequences(tx: &mut Transaction, input_index: usize) {
    for (i, input) in tx.inputs.iter_mut().enumerate() {
        if i != input_index {
            input.sequence = 0;
        }
    }
}
