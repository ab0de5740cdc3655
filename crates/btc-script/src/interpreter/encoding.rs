//! Signature and public key encoding rules.
//!
//! These checks run before any signature verification. DER and low-S rules
//! operate on the signature with its trailing hashtype byte removed; the
//! `check_*` entry points take the full stack element.

use btc_primitives::ec::signature::HALF_ORDER;

use super::checker::SigVersion;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;

const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Validate strict DER (BIP66) over a signature without its hashtype byte.
///
/// Returns the specific `Sig*` error code for the first rule violated.
pub fn check_der_signature(sig: &[u8]) -> Result<(), InterpreterError> {
    let sig_len = sig.len();
    if sig_len < 8 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigTooShort,
            format!("malformed signature: too short: {} < 8", sig_len),
        ));
    }
    if sig_len > 72 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigTooLong,
            format!("malformed signature: too long: {} > 72", sig_len),
        ));
    }
    if sig[0] != 0x30 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigInvalidSeqID,
            format!("malformed signature: format has wrong type: {:#x}", sig[0]),
        ));
    }
    if sig[1] as usize != sig_len - 2 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigInvalidDataLen,
            format!("malformed signature: bad length: {} != {}", sig[1], sig_len - 2),
        ));
    }

    let r_len = sig[3] as usize;
    let s_type_offset = 4 + r_len;
    let s_len_offset = s_type_offset + 1;

    if s_type_offset >= sig_len {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigMissingSTypeID,
            "malformed signature: S type indicator missing",
        ));
    }
    if s_len_offset >= sig_len {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigMissingSLen,
            "malformed signature: S length missing",
        ));
    }

    let s_offset = s_len_offset + 1;
    let s_len = sig[s_len_offset] as usize;
    if s_offset + s_len != sig_len {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigInvalidSLen,
            "malformed signature: invalid S length",
        ));
    }

    if sig[2] != 0x02 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigInvalidRIntID,
            format!("malformed signature: R integer marker: {:#x} != 0x02", sig[2]),
        ));
    }
    if r_len == 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigZeroRLen,
            "malformed signature: R length is zero",
        ));
    }
    if sig[4] & 0x80 != 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigNegativeR,
            "malformed signature: R is negative",
        ));
    }
    if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigTooMuchRPadding,
            "malformed signature: R value has too much padding",
        ));
    }

    if sig[s_type_offset] != 0x02 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigInvalidSIntID,
            format!(
                "malformed signature: S integer marker: {:#x} != 0x02",
                sig[s_type_offset]
            ),
        ));
    }
    if s_len == 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigZeroSLen,
            "malformed signature: S length is zero",
        ));
    }
    if sig[s_offset] & 0x80 != 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigNegativeS,
            "malformed signature: S is negative",
        ));
    }
    if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigTooMuchSPadding,
            "malformed signature: S value has too much padding",
        ));
    }

    Ok(())
}

/// The big-endian S bytes of a strictly encoded DER signature.
fn der_s_value(sig: &[u8]) -> &[u8] {
    let r_len = sig[3] as usize;
    let s_len_offset = 5 + r_len;
    let s_len = sig[s_len_offset] as usize;
    &sig[s_len_offset + 1..s_len_offset + 1 + s_len]
}

/// True when S of a strict DER signature is at most N/2.
fn s_is_low(sig: &[u8]) -> bool {
    let s = der_s_value(sig);
    let first = s.iter().position(|&b| b != 0).unwrap_or(s.len());
    let s = &s[first..];
    if s.len() > 32 {
        return false;
    }
    let mut padded = [0u8; 32];
    padded[32 - s.len()..].copy_from_slice(s);
    padded <= HALF_ORDER
}

/// Strict DER check, optionally also requiring low S.
pub fn is_valid_der_signature(sig: &[u8], require_low_s: bool) -> bool {
    check_der_signature(sig).is_ok() && (!require_low_s || s_is_low(sig))
}

/// Strict DER with S at most N/2.
pub fn is_low_der_signature(sig: &[u8]) -> bool {
    is_valid_der_signature(sig, true)
}

/// True for hashtypes ALL, NONE and SINGLE with or without ANYONECANPAY.
pub fn is_defined_hashtype(hash_type: u8) -> bool {
    let base = hash_type & !SIGHASH_ANYONECANPAY;
    (1..=3).contains(&base)
}

/// Validate a full signature element (DER plus hashtype byte) under `flags`.
///
/// The empty signature always passes; it is the canonical way to make
/// CHECKSIG return false.
pub fn check_signature_encoding(sig: &[u8], flags: ScriptFlags) -> Result<(), InterpreterError> {
    if sig.is_empty() {
        return Ok(());
    }
    let (hash_type, der) = match sig.split_last() {
        Some((h, d)) => (*h, d),
        None => return Ok(()),
    };

    if flags.has_any(&[ScriptFlags::DERSIG, ScriptFlags::LOW_S, ScriptFlags::STRICTENC]) {
        check_der_signature(der)?;
    }
    if flags.has_flag(ScriptFlags::LOW_S) && !s_is_low(der) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::SigHighS,
            "signature is not canonical due to unnecessarily high S value",
        ));
    }
    if flags.has_flag(ScriptFlags::STRICTENC) && !is_defined_hashtype(hash_type) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::InvalidSigHashType,
            format!("invalid hash type 0x{:x}", hash_type),
        ));
    }
    Ok(())
}

/// Validate a public key element under `flags`.
pub fn check_pub_key_encoding(
    pub_key: &[u8],
    flags: ScriptFlags,
    sig_version: SigVersion,
) -> Result<(), InterpreterError> {
    if flags.has_flag(ScriptFlags::STRICTENC) && !is_compressed_or_uncompressed(pub_key) {
        return Err(InterpreterError::new(
            InterpreterErrorCode::PubKeyType,
            "unsupported public key type",
        ));
    }
    if flags.has_flag(ScriptFlags::WITNESS_PUBKEYTYPE)
        && sig_version == SigVersion::WitnessV0
        && !is_compressed(pub_key)
    {
        return Err(InterpreterError::new(
            InterpreterErrorCode::WitnessPubKeyType,
            "witness scripts require compressed public keys",
        ));
    }
    Ok(())
}

fn is_compressed(pub_key: &[u8]) -> bool {
    pub_key.len() == 33 && (pub_key[0] == 0x02 || pub_key[0] == 0x03)
}

fn is_compressed_or_uncompressed(pub_key: &[u8]) -> bool {
    is_compressed(pub_key) || (pub_key.len() == 65 && pub_key[0] == 0x04)
}

#[cfg(test)]
mod tests {
    use super::*;

    // r = 1, s = 1
    fn minimal_der() -> Vec<u8> {
        vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01]
    }

    fn der_with_s(s: &[u8]) -> Vec<u8> {
        let mut out = vec![0x30, (5 + s.len()) as u8, 0x02, 0x01, 0x01, 0x02, s.len() as u8];
        out.extend_from_slice(s);
        out
    }

    #[test]
    fn test_der_grammar_errors() {
        let cases: Vec<(Vec<u8>, InterpreterErrorCode)> = vec![
            (vec![0x30, 0x05, 0x02, 0x01, 0x01, 0x02, 0x01], InterpreterErrorCode::SigTooShort),
            (vec![0u8; 73], InterpreterErrorCode::SigTooLong),
            ({ let mut s = minimal_der(); s[0] = 0x31; s }, InterpreterErrorCode::SigInvalidSeqID),
            ({ let mut s = minimal_der(); s[1] = 0x07; s }, InterpreterErrorCode::SigInvalidDataLen),
            ({ let mut s = minimal_der(); s[3] = 0x04; s }, InterpreterErrorCode::SigMissingSTypeID),
            ({ let mut s = minimal_der(); s[3] = 0x03; s }, InterpreterErrorCode::SigMissingSLen),
            ({ let mut s = minimal_der(); s[6] = 0x02; s }, InterpreterErrorCode::SigInvalidSLen),
            ({ let mut s = minimal_der(); s[2] = 0x03; s }, InterpreterErrorCode::SigInvalidRIntID),
            ({ let mut s = minimal_der(); s[4] = 0x81; s }, InterpreterErrorCode::SigNegativeR),
            ({ let mut s = minimal_der(); s[5] = 0x03; s }, InterpreterErrorCode::SigInvalidSIntID),
            ({ let mut s = minimal_der(); s[7] = 0x81; s }, InterpreterErrorCode::SigNegativeS),
            (vec![0x30, 0x07, 0x02, 0x02, 0x00, 0x01, 0x02, 0x01, 0x01], InterpreterErrorCode::SigTooMuchRPadding),
            (der_with_s(&[0x00, 0x01]), InterpreterErrorCode::SigTooMuchSPadding),
        ];
        for (sig, code) in cases {
            let err = check_der_signature(&sig).unwrap_err();
            assert_eq!(err.code, code, "{}", hex::encode(&sig));
        }
        assert!(check_der_signature(&minimal_der()).is_ok());
        // padding is allowed when the next byte has its top bit set
        assert!(check_der_signature(&der_with_s(&[0x00, 0x80])).is_ok());
    }

    #[test]
    fn test_low_s() {
        assert!(is_low_der_signature(&minimal_der()));

        let mut high = vec![0x00];
        high.extend_from_slice(&HALF_ORDER);
        high[1] = 0xff;
        let sig = der_with_s(&high);
        assert!(is_valid_der_signature(&sig, false));
        assert!(!is_low_der_signature(&sig));

        let half = der_with_s(&HALF_ORDER);
        assert!(is_low_der_signature(&half));
    }

    #[test]
    fn test_defined_hashtype() {
        for h in [0x01, 0x02, 0x03, 0x81, 0x82, 0x83] {
            assert!(is_defined_hashtype(h), "{:#x}", h);
        }
        for h in [0x00, 0x04, 0x41, 0x80, 0x84, 0xff] {
            assert!(!is_defined_hashtype(h), "{:#x}", h);
        }
    }

    #[test]
    fn test_check_signature_encoding_flags() {
        let mut sig = minimal_der();
        sig.push(0x05);
        assert!(check_signature_encoding(&sig, ScriptFlags::NONE).is_ok());
        assert!(check_signature_encoding(&sig, ScriptFlags::DERSIG).is_ok());
        assert_eq!(
            check_signature_encoding(&sig, ScriptFlags::STRICTENC).unwrap_err().code,
            InterpreterErrorCode::InvalidSigHashType
        );
        assert!(check_signature_encoding(&[], ScriptFlags::STANDARD).is_ok());

        let garbage = vec![0x01, 0x02, 0x01];
        assert!(check_signature_encoding(&garbage, ScriptFlags::NONE).is_ok());
        assert_eq!(
            check_signature_encoding(&garbage, ScriptFlags::DERSIG).unwrap_err().code,
            InterpreterErrorCode::SigTooShort
        );
    }

    #[test]
    fn test_check_pub_key_encoding() {
        let compressed = [vec![0x02], vec![0x11; 32]].concat();
        let uncompressed = [vec![0x04], vec![0x11; 64]].concat();
        let hybrid = [vec![0x06], vec![0x11; 64]].concat();

        assert!(check_pub_key_encoding(&hybrid, ScriptFlags::NONE, SigVersion::Base).is_ok());
        assert_eq!(
            check_pub_key_encoding(&hybrid, ScriptFlags::STRICTENC, SigVersion::Base)
                .unwrap_err()
                .code,
            InterpreterErrorCode::PubKeyType
        );
        assert!(check_pub_key_encoding(&uncompressed, ScriptFlags::STANDARD, SigVersion::Base).is_ok());
        assert_eq!(
            check_pub_key_encoding(&uncompressed, ScriptFlags::WITNESS_PUBKEYTYPE, SigVersion::WitnessV0)
                .unwrap_err()
                .code,
            InterpreterErrorCode::WitnessPubKeyType
        );
        assert!(check_pub_key_encoding(&compressed, ScriptFlags::STANDARD, SigVersion::WitnessV0).is_ok());
    }
}
