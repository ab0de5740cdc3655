//! Bitcoin script opcodes.
//!
//! Every byte value maps to exactly one [`Opcode`] variant, so decoding a
//! script never fails on an unknown opcode byte: direct pushes become
//! [`Opcode::OP_PUSHBYTES`] and unassigned bytes become [`Opcode::OP_UNKNOWN`].
//! The raw byte constants (`OP_DUP`, `OP_CHECKSIG`, ...) are kept alongside
//! the enum for building scripts from byte literals.

macro_rules! define_opcodes {
    ($($(#[$doc:meta])* $name:ident = $val:literal),* $(,)?) => {
        $(
            $(#[$doc])*
            pub const $name: u8 = $val;
        )*

        /// A script opcode. Closed over all 256 byte values.
        #[allow(non_camel_case_types)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Opcode {
            /// Direct push of 1 to 75 bytes; the payload is the length.
            OP_PUSHBYTES(u8),
            /// A byte with no assigned meaning (0xba to 0xfe).
            OP_UNKNOWN(u8),
            $($name,)*
        }

        impl Opcode {
            /// Decode an opcode byte.
            pub fn from_u8(b: u8) -> Opcode {
                match b {
                    $($val => Opcode::$name,)*
                    0x01..=0x4b => Opcode::OP_PUSHBYTES(b),
                    _ => Opcode::OP_UNKNOWN(b),
                }
            }

            /// The byte encoding of this opcode.
            pub fn to_u8(self) -> u8 {
                match self {
                    $(Opcode::$name => $val,)*
                    Opcode::OP_PUSHBYTES(n) | Opcode::OP_UNKNOWN(n) => n,
                }
            }

            /// The canonical name, e.g. `"OP_CHECKSIG"`.
            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name),)*
                    Opcode::OP_PUSHBYTES(_) => "OP_PUSHBYTES",
                    Opcode::OP_UNKNOWN(_) => "OP_UNKNOWN",
                }
            }

            /// Look up an opcode by its canonical name.
            pub fn from_name(name: &str) -> Option<Opcode> {
                $(
                    if name == stringify!($name) {
                        return Some(Opcode::$name);
                    }
                )*
                match name {
                    "OP_FALSE" => Some(Opcode::OP_0),
                    "OP_TRUE" => Some(Opcode::OP_1),
                    "OP_NOP2" => Some(Opcode::OP_CHECKLOCKTIMEVERIFY),
                    "OP_NOP3" => Some(Opcode::OP_CHECKSEQUENCEVERIFY),
                    _ => None,
                }
            }
        }
    };
}

define_opcodes! {
    /// Push an empty byte vector.
    OP_0 = 0x00,
    /// Next byte is the push length.
    OP_PUSHDATA1 = 0x4c,
    /// Next two bytes (LE) are the push length.
    OP_PUSHDATA2 = 0x4d,
    /// Next four bytes (LE) are the push length.
    OP_PUSHDATA4 = 0x4e,
    OP_1NEGATE = 0x4f,
    OP_RESERVED = 0x50,
    OP_1 = 0x51,
    OP_2 = 0x52,
    OP_3 = 0x53,
    OP_4 = 0x54,
    OP_5 = 0x55,
    OP_6 = 0x56,
    OP_7 = 0x57,
    OP_8 = 0x58,
    OP_9 = 0x59,
    OP_10 = 0x5a,
    OP_11 = 0x5b,
    OP_12 = 0x5c,
    OP_13 = 0x5d,
    OP_14 = 0x5e,
    OP_15 = 0x5f,
    OP_16 = 0x60,

    // control
    OP_NOP = 0x61,
    OP_VER = 0x62,
    OP_IF = 0x63,
    OP_NOTIF = 0x64,
    OP_VERIF = 0x65,
    OP_VERNOTIF = 0x66,
    OP_ELSE = 0x67,
    OP_ENDIF = 0x68,
    OP_VERIFY = 0x69,
    OP_RETURN = 0x6a,

    // stack
    OP_TOALTSTACK = 0x6b,
    OP_FROMALTSTACK = 0x6c,
    OP_2DROP = 0x6d,
    OP_2DUP = 0x6e,
    OP_3DUP = 0x6f,
    OP_2OVER = 0x70,
    OP_2ROT = 0x71,
    OP_2SWAP = 0x72,
    OP_IFDUP = 0x73,
    OP_DEPTH = 0x74,
    OP_DROP = 0x75,
    OP_DUP = 0x76,
    OP_NIP = 0x77,
    OP_OVER = 0x78,
    OP_PICK = 0x79,
    OP_ROLL = 0x7a,
    OP_ROT = 0x7b,
    OP_SWAP = 0x7c,
    OP_TUCK = 0x7d,

    // splice
    OP_CAT = 0x7e,
    OP_SUBSTR = 0x7f,
    OP_LEFT = 0x80,
    OP_RIGHT = 0x81,
    OP_SIZE = 0x82,

    // bitwise logic
    OP_INVERT = 0x83,
    OP_AND = 0x84,
    OP_OR = 0x85,
    OP_XOR = 0x86,
    OP_EQUAL = 0x87,
    OP_EQUALVERIFY = 0x88,
    OP_RESERVED1 = 0x89,
    OP_RESERVED2 = 0x8a,

    // numeric
    OP_1ADD = 0x8b,
    OP_1SUB = 0x8c,
    OP_2MUL = 0x8d,
    OP_2DIV = 0x8e,
    OP_NEGATE = 0x8f,
    OP_ABS = 0x90,
    OP_NOT = 0x91,
    OP_0NOTEQUAL = 0x92,
    OP_ADD = 0x93,
    OP_SUB = 0x94,
    OP_MUL = 0x95,
    OP_DIV = 0x96,
    OP_MOD = 0x97,
    OP_LSHIFT = 0x98,
    OP_RSHIFT = 0x99,
    OP_BOOLAND = 0x9a,
    OP_BOOLOR = 0x9b,
    OP_NUMEQUAL = 0x9c,
    OP_NUMEQUALVERIFY = 0x9d,
    OP_NUMNOTEQUAL = 0x9e,
    OP_LESSTHAN = 0x9f,
    OP_GREATERTHAN = 0xa0,
    OP_LESSTHANOREQUAL = 0xa1,
    OP_GREATERTHANOREQUAL = 0xa2,
    OP_MIN = 0xa3,
    OP_MAX = 0xa4,
    OP_WITHIN = 0xa5,

    // crypto
    OP_RIPEMD160 = 0xa6,
    OP_SHA1 = 0xa7,
    OP_SHA256 = 0xa8,
    OP_HASH160 = 0xa9,
    OP_HASH256 = 0xaa,
    OP_CODESEPARATOR = 0xab,
    OP_CHECKSIG = 0xac,
    OP_CHECKSIGVERIFY = 0xad,
    OP_CHECKMULTISIG = 0xae,
    OP_CHECKMULTISIGVERIFY = 0xaf,

    // expansion
    OP_NOP1 = 0xb0,
    OP_CHECKLOCKTIMEVERIFY = 0xb1,
    OP_CHECKSEQUENCEVERIFY = 0xb2,
    OP_NOP4 = 0xb3,
    OP_NOP5 = 0xb4,
    OP_NOP6 = 0xb5,
    OP_NOP7 = 0xb6,
    OP_NOP8 = 0xb7,
    OP_NOP9 = 0xb8,
    OP_NOP10 = 0xb9,

    OP_INVALIDOPCODE = 0xff,
}

pub const OP_FALSE: u8 = OP_0;
pub const OP_TRUE: u8 = OP_1;
pub const OP_NOP2: u8 = OP_CHECKLOCKTIMEVERIFY;
pub const OP_NOP3: u8 = OP_CHECKSEQUENCEVERIFY;

pub const OP_DATA_1: u8 = 0x01;
pub const OP_DATA_20: u8 = 0x14;
pub const OP_DATA_32: u8 = 0x20;
pub const OP_DATA_33: u8 = 0x21;
pub const OP_DATA_65: u8 = 0x41;
pub const OP_DATA_75: u8 = 0x4b;

impl Opcode {
    /// True for the opcodes that only push data: `OP_0`, direct pushes and
    /// `OP_PUSHDATA1/2/4`.
    pub fn is_push_data(self) -> bool {
        matches!(
            self,
            Opcode::OP_0
                | Opcode::OP_PUSHBYTES(_)
                | Opcode::OP_PUSHDATA1
                | Opcode::OP_PUSHDATA2
                | Opcode::OP_PUSHDATA4
        )
    }

    /// True for opcodes that count as pushes for push-only checks
    /// (everything up to and including `OP_16`).
    pub fn is_push_only(self) -> bool {
        self.to_u8() <= OP_16
    }

    /// The value pushed by `OP_1NEGATE` and `OP_1`..`OP_16`.
    pub fn small_int(self) -> Option<i64> {
        match self.to_u8() {
            OP_0 => Some(0),
            OP_1NEGATE => Some(-1),
            b @ OP_1..=OP_16 => Some((b - OP_1 + 1) as i64),
            _ => None,
        }
    }

    /// The opcode pushing the small integer `n` (0 to 16).
    pub fn from_small_int(n: u8) -> Option<Opcode> {
        match n {
            0 => Some(Opcode::OP_0),
            1..=16 => Some(Opcode::from_u8(OP_1 + n - 1)),
            _ => None,
        }
    }

    /// Opcodes that fail the script whenever they appear, executed or not.
    pub fn is_disabled(self) -> bool {
        matches!(
            self,
            Opcode::OP_CAT
                | Opcode::OP_SUBSTR
                | Opcode::OP_LEFT
                | Opcode::OP_RIGHT
                | Opcode::OP_INVERT
                | Opcode::OP_AND
                | Opcode::OP_OR
                | Opcode::OP_XOR
                | Opcode::OP_2MUL
                | Opcode::OP_2DIV
                | Opcode::OP_MUL
                | Opcode::OP_DIV
                | Opcode::OP_MOD
                | Opcode::OP_LSHIFT
                | Opcode::OP_RSHIFT
        )
    }

    /// Flow control opcodes, which are dispatched even inside an
    /// unexecuted branch.
    pub fn is_conditional(self) -> bool {
        (OP_IF..=OP_ENDIF).contains(&self.to_u8())
    }
}

impl From<u8> for Opcode {
    fn from(b: u8) -> Self {
        Opcode::from_u8(b)
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op.to_u8()
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Opcode::OP_PUSHBYTES(n) => write!(f, "OP_PUSHBYTES_{}", n),
            Opcode::OP_UNKNOWN(n) => write!(f, "OP_UNKNOWN_{:#04x}", n),
            op => f.write_str(op.name()),
        }
    }
}
