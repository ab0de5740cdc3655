//! ECDSA signature with DER and compact serialization.
//!
//! Parsing comes in two strengths: [`Signature::from_der`] accepts only
//! strict DER, while [`Signature::from_der_lax`] accepts the loose BER-ish
//! encodings that appear in historical transactions and that consensus
//! still has to verify when strict encoding is not enforced.

use crate::PrimitivesError;

/// The secp256k1 curve order N.
pub const CURVE_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFE, 0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36,
    0x41, 0x41,
];

/// Half of the secp256k1 curve order (N/2), the low-S boundary.
pub const HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B,
    0x20, 0xA0,
];

/// An ECDSA signature with R and S components as 32-byte big-endian
/// integers.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    r: [u8; 32],
    s: [u8; 32],
}

impl Signature {
    /// Create a signature from raw R and S values.
    pub fn new(r: [u8; 32], s: [u8; 32]) -> Self {
        Signature { r, s }
    }

    /// The R component.
    pub fn r(&self) -> &[u8; 32] {
        &self.r
    }

    /// The S component.
    pub fn s(&self) -> &[u8; 32] {
        &self.s
    }

    /// Whether S is at most N/2.
    pub fn is_low_s(&self) -> bool {
        self.s <= HALF_ORDER
    }

    /// Return the signature with S replaced by N - S when S is high.
    ///
    /// Both forms verify; only the low form is standard.
    pub fn normalize_s(&self) -> Self {
        if self.is_low_s() {
            self.clone()
        } else {
            Signature {
                r: self.r,
                s: subtract_from_order(&self.s),
            }
        }
    }

    /// Parse a strictly DER-encoded signature (no sighash byte).
    ///
    /// Expected format: `0x30 <len> 0x02 <r_len> <r> 0x02 <s_len> <s>` with
    /// exact lengths and minimally encoded, non-negative integers.
    pub fn from_der(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let malformed = |what: &str| {
            PrimitivesError::InvalidSignature(format!("malformed signature: {}", what))
        };

        if bytes.len() < 8 || bytes.len() > 72 {
            return Err(malformed("bad length"));
        }
        if bytes[0] != 0x30 {
            return Err(malformed("no header magic"));
        }
        if bytes[1] as usize != bytes.len() - 2 {
            return Err(malformed("sequence length mismatch"));
        }

        let (r_bytes, rest) = read_der_integer(&bytes[2..]).ok_or_else(|| malformed("bad R"))?;
        let (s_bytes, rest) = read_der_integer(rest).ok_or_else(|| malformed("bad S"))?;
        if !rest.is_empty() {
            return Err(malformed("trailing bytes"));
        }

        let r = to_32_bytes(r_bytes)?;
        let s = to_32_bytes(s_bytes)?;
        check_scalar_range(&r, "R")?;
        check_scalar_range(&s, "S")?;
        Ok(Signature { r, s })
    }

    /// Parse a DER-like signature leniently.
    ///
    /// Accepts long-form lengths, excess zero padding, trailing garbage
    /// after the sequence and a mismatching sequence length, as long as two
    /// INTEGER elements can be located. Values wider than 32 bytes after
    /// stripping leading zeros are rejected.
    pub fn from_der_lax(bytes: &[u8]) -> Result<Self, PrimitivesError> {
        let fail = || PrimitivesError::InvalidSignature("unparseable signature".to_string());

        let mut pos = 0usize;
        if bytes.get(pos) != Some(&0x30) {
            return Err(fail());
        }
        pos += 1;

        let seq_len_byte = *bytes.get(pos).ok_or_else(fail)?;
        pos += 1;
        if seq_len_byte & 0x80 != 0 {
            let skip = (seq_len_byte - 0x80) as usize;
            if skip > bytes.len() - pos {
                return Err(fail());
            }
            pos += skip;
        }

        let (r_start, r_len) = lax_integer(bytes, &mut pos).ok_or_else(fail)?;
        let (s_start, s_len) = lax_integer(bytes, &mut pos).ok_or_else(fail)?;

        let r = to_32_bytes(&bytes[r_start..r_start + r_len])?;
        let s = to_32_bytes(&bytes[s_start..s_start + s_len])?;
        Ok(Signature { r, s })
    }

    /// Serialize in strict DER format. S is encoded as stored; call
    /// [`normalize_s`](Self::normalize_s) first for standard signatures.
    pub fn to_der(&self) -> Vec<u8> {
        let rb = canonicalize_int(&self.r);
        let sb = canonicalize_int(&self.s);

        let total_len = 6 + rb.len() + sb.len();
        let mut out = Vec::with_capacity(total_len);
        out.push(0x30);
        out.push((total_len - 2) as u8);
        out.push(0x02);
        out.push(rb.len() as u8);
        out.extend_from_slice(&rb);
        out.push(0x02);
        out.push(sb.len() as u8);
        out.extend_from_slice(&sb);
        out
    }

    /// Build a 65-byte compact signature: header byte, R, S.
    ///
    /// The header is `27 + recovery_id + (4 if compressed)`.
    pub fn to_compact(&self, recovery_id: u8, compressed: bool) -> [u8; 65] {
        let mut out = [0u8; 65];
        out[0] = 27 + recovery_id + if compressed { 4 } else { 0 };
        out[1..33].copy_from_slice(&self.r);
        out[33..65].copy_from_slice(&self.s);
        out
    }

    /// Split a 65-byte compact signature into the signature, recovery id
    /// and compression flag.
    pub fn from_compact(bytes: &[u8]) -> Result<(Self, u8, bool), PrimitivesError> {
        if bytes.len() != 65 {
            return Err(PrimitivesError::InvalidSignature(
                "invalid compact signature size".to_string(),
            ));
        }
        let header = bytes[0];
        if !(27..=34).contains(&header) {
            return Err(PrimitivesError::InvalidSignature(format!(
                "invalid compact signature header {}",
                header
            )));
        }
        let compressed = header >= 31;
        let recovery_id = (header - 27) & 0x03;
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[1..33]);
        s.copy_from_slice(&bytes[33..65]);
        Ok((Signature { r, s }, recovery_id, compressed))
    }
}

/// Read one strict DER INTEGER from the front of `data`.
fn read_der_integer(data: &[u8]) -> Option<(&[u8], &[u8])> {
    if data.len() < 2 || data[0] != 0x02 {
        return None;
    }
    let len = data[1] as usize;
    if len == 0 || len > data.len() - 2 {
        return None;
    }
    let value = &data[2..2 + len];
    // negative
    if value[0] & 0x80 != 0 {
        return None;
    }
    // needless zero padding
    if len > 1 && value[0] == 0 && value[1] & 0x80 == 0 {
        return None;
    }
    Some((value, &data[2 + len..]))
}

/// Locate one INTEGER at `*pos` under lax rules, returning the value's
/// offset and length with leading zeros skipped.
fn lax_integer(bytes: &[u8], pos: &mut usize) -> Option<(usize, usize)> {
    if bytes.get(*pos) != Some(&0x02) {
        return None;
    }
    *pos += 1;

    let len_byte = *bytes.get(*pos)?;
    *pos += 1;
    let len = if len_byte & 0x80 != 0 {
        let mut n = (len_byte - 0x80) as usize;
        if n > bytes.len() - *pos {
            return None;
        }
        while n > 0 && bytes[*pos] == 0 {
            *pos += 1;
            n -= 1;
        }
        if n >= std::mem::size_of::<usize>() {
            return None;
        }
        let mut len = 0usize;
        while n > 0 {
            len = (len << 8) + bytes[*pos] as usize;
            *pos += 1;
            n -= 1;
        }
        len
    } else {
        len_byte as usize
    };
    if len > bytes.len() - *pos {
        return None;
    }

    let mut start = *pos;
    let mut value_len = len;
    *pos += len;
    while value_len > 0 && bytes[start] == 0 {
        start += 1;
        value_len -= 1;
    }
    Some((start, value_len))
}

/// Strip leading zeros from a 32-byte integer and re-add a single zero if
/// the high bit would otherwise make it negative.
fn canonicalize_int(val: &[u8; 32]) -> Vec<u8> {
    let start = val.iter().position(|&b| b != 0).unwrap_or(31);
    let trimmed = &val[start..];
    let mut out = Vec::with_capacity(trimmed.len() + 1);
    if trimmed[0] & 0x80 != 0 {
        out.push(0x00);
    }
    out.extend_from_slice(trimmed);
    out
}

/// Left-pad a big-endian integer of up to 32 significant bytes.
fn to_32_bytes(bytes: &[u8]) -> Result<[u8; 32], PrimitivesError> {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let trimmed = &bytes[start..];
    if trimmed.len() > 32 {
        return Err(PrimitivesError::InvalidSignature(
            "integer value too large for 32 bytes".to_string(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}

fn check_scalar_range(val: &[u8; 32], name: &str) -> Result<(), PrimitivesError> {
    if val.iter().all(|&b| b == 0) {
        return Err(PrimitivesError::InvalidSignature(format!(
            "signature {} is zero",
            name
        )));
    }
    if *val >= CURVE_ORDER {
        return Err(PrimitivesError::InvalidSignature(format!(
            "signature {} is >= curve.N",
            name
        )));
    }
    Ok(())
}

/// Compute N - val where N is the secp256k1 curve order.
pub(crate) fn subtract_from_order(val: &[u8; 32]) -> [u8; 32] {
    let mut result = [0u8; 32];
    let mut borrow = 0i16;
    for i in (0..32).rev() {
        let mut diff = CURVE_ORDER[i] as i16 - val[i] as i16 - borrow;
        borrow = 0;
        if diff < 0 {
            diff += 256;
            borrow = 1;
        }
        result[i] = diff as u8;
    }
    result
}
