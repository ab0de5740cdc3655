use proptest::prelude::*;

use btc_script::interpreter::{
    decode_script_num, encode_script_num, Interpreter, NullChecker, ScriptFlags, ScriptNumber,
    SigVersion,
};
use btc_script::{Instruction, Script};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn script_number_encode_decode_roundtrip(val in -0x7FFFFFFFi64..=0x7FFFFFFFi64) {
        let sn = ScriptNumber::new(val);
        let bytes = sn.to_bytes();
        prop_assert!(bytes.len() <= 4);
        let sn2 = ScriptNumber::from_bytes(&bytes, 4, true).unwrap();
        prop_assert_eq!(sn.val, sn2.val);
    }

    #[test]
    fn script_num_free_functions_roundtrip(val in -0x7FFFFFFFFFi64..=0x7FFFFFFFFFi64) {
        let bytes = encode_script_num(val);
        prop_assert_eq!(decode_script_num(&bytes, 8, true).unwrap(), val);
    }

    #[test]
    fn script_hex_roundtrip(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        let script2 = Script::from_hex(&script.to_hex()).unwrap();
        prop_assert_eq!(script.to_bytes(), script2.to_bytes());
    }

    #[test]
    fn parsed_scripts_reencode_exactly(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let script = Script::from_bytes(&data);
        if let Ok(instructions) = script.instructions() {
            let reencoded = Script::from_instructions(&instructions);
            prop_assert_eq!(reencoded.to_bytes(), &data[..]);
        }
    }

    #[test]
    fn find_and_delete_removes_every_push(
        sig in prop::collection::vec(any::<u8>(), 1..80),
        copies in 0usize..4,
    ) {
        let mut instructions = vec![Instruction::push(b"keep")];
        for _ in 0..copies {
            instructions.push(Instruction::push(&sig));
        }
        let script = Script::from_instructions(&instructions);
        let (stripped, removed) = script.find_and_delete(&sig);
        if sig.as_slice() != b"keep" {
            prop_assert_eq!(removed, copies);
            prop_assert_eq!(stripped, Script::from_instructions(&[Instruction::push(b"keep")]));
        }
    }

    #[test]
    fn interpreter_never_panics(
        data in prop::collection::vec(any::<u8>(), 0..128),
        flags in any::<u16>(),
    ) {
        let script = Script::from_bytes(&data);
        let mut stack = Vec::new();
        let _ = Interpreter::new().evaluate(
            &script,
            &mut stack,
            SigVersion::Base,
            ScriptFlags(flags as u32),
            &NullChecker,
        );
    }
}
