//! A transaction signature: DER-encoded ECDSA signature plus sighash type.

use std::fmt;

use btc_primitives::ec::Signature;

use crate::sighash::SigHashType;
use crate::TransactionError;

/// The signature as it appears on the stack: DER followed by one sighash byte.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxSignature {
    pub signature: Signature,
    pub sighash_type: SigHashType,
}

impl TxSignature {
    pub fn new(signature: Signature, sighash_type: SigHashType) -> Self {
        TxSignature {
            signature,
            sighash_type,
        }
    }

    /// Parse a stack signature. The DER part is parsed leniently; the
    /// interpreter's encoding checks decide whether it is acceptable.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (sighash_byte, der) = bytes.split_last().ok_or_else(|| {
            TransactionError::InvalidArgument("empty transaction signature".to_string())
        })?;
        let signature = Signature::from_der_lax(der)?;
        Ok(TxSignature {
            signature,
            sighash_type: SigHashType::from(*sighash_byte),
        })
    }

    /// DER encoding with the sighash byte appended.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.signature.to_der();
        out.push(self.sighash_type.to_byte());
        out
    }
}

impl fmt::Display for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DER: &str = "3044022029e7f4c1c9a8d2b9bd63c7d6b0c56bb5a8d8c2c2f3ebbe49b62a4dc4d7f6e7c802207f9c7a7dc2ffb2ce0a3b4f4c0a4e5aa07c5d1c8fb10b7d8c76a3d4e7a7b0d3e1";

    #[test]
    fn test_roundtrip_with_sighash_byte() {
        let bytes = hex::decode(format!("{}83", DER)).unwrap();
        let sig = TxSignature::from_bytes(&bytes).unwrap();
        assert_eq!(sig.sighash_type, SigHashType::SINGLE | SigHashType::ANYONECANPAY);
        assert_eq!(sig.to_bytes(), bytes);
        assert_eq!(sig.to_string(), format!("{}83", DER));
    }

    #[test]
    fn test_rejects_empty_and_garbage() {
        assert!(matches!(
            TxSignature::from_bytes(&[]),
            Err(TransactionError::InvalidArgument(_))
        ));
        assert!(matches!(
            TxSignature::from_bytes(&[0x30, 0x01, 0x01]),
            Err(TransactionError::Primitives(_))
        ));
    }
}
