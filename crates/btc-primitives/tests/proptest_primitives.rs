use proptest::prelude::*;

use btc_primitives::ec::{PrivateKey, Signature};
use btc_primitives::hash::sha256;
use btc_primitives::util::{ByteReader, VarInt};
use btc_primitives::{EcAdapter, K256Adapter, Secp256k1Adapter};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn wif_roundtrip(seed in prop::array::uniform32(any::<u8>()), compressed in any::<bool>()) {
        // Zero and values above the curve order are not valid keys.
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let pk = if compressed { pk } else { pk.uncompressed() };
            let back = PrivateKey::from_wif(&pk.to_wif()).unwrap();
            prop_assert_eq!(pk.to_hex(), back.to_hex());
            prop_assert_eq!(pk.is_compressed(), back.is_compressed());
        }
    }

    #[test]
    fn backends_verify_each_other(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..256)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256(&msg);
            let portable = K256Adapter::new();
            let native = Secp256k1Adapter::new();
            let pub_key = pk.pub_key().to_bytes();

            let a = portable.sign(&digest, &pk).unwrap();
            let b = native.sign(&digest, &pk).unwrap();
            prop_assert_eq!(a.to_der(), b.to_der());
            prop_assert!(a.is_low_s());
            prop_assert!(native.verify(&digest, &pub_key, &a.to_der()));
            prop_assert!(portable.verify(&digest, &pub_key, &b.to_der()));

            let mut other = digest;
            other[0] ^= 0x01;
            prop_assert!(!native.verify(&other, &pub_key, &a.to_der()));
        }
    }

    #[test]
    fn compact_signature_recovers_key(
        seed in prop::array::uniform32(any::<u8>()),
        msg in prop::collection::vec(any::<u8>(), 0..64)
    ) {
        if let Ok(pk) = PrivateKey::from_bytes(&seed) {
            let digest = sha256(&msg);
            for backend in [&K256Adapter::new() as &dyn EcAdapter, &Secp256k1Adapter::new()] {
                let compact = backend.sign_compact(&digest, &pk).unwrap();
                let recovered = backend.recover_pub_key(&digest, &compact).unwrap();
                prop_assert_eq!(recovered.to_bytes(), pk.pub_key().to_bytes());
            }
        }
    }

    #[test]
    fn der_roundtrip(r in prop::array::uniform32(1u8..), s in prop::array::uniform32(1u8..)) {
        let sig = Signature::new(r, s);
        let parsed = Signature::from_der(&sig.to_der()).unwrap();
        prop_assert_eq!(parsed.r(), sig.r());
        prop_assert_eq!(parsed.s(), sig.s());
    }

    #[test]
    fn varint_roundtrip(value in any::<u64>()) {
        let bytes = VarInt(value).to_bytes();
        prop_assert_eq!(bytes.len(), VarInt(value).length());
        let mut reader = ByteReader::new(&bytes);
        prop_assert_eq!(reader.read_varint().unwrap().value(), value);
        prop_assert_eq!(reader.remaining(), 0);
    }
}
