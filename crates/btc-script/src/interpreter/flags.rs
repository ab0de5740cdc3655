//! Script verification flags (bitmask).

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate P2SH (BIP16) redeem scripts.
    pub const P2SH: ScriptFlags = ScriptFlags(1 << 0);
    /// Require defined hashtypes and well-formed public keys.
    pub const STRICTENC: ScriptFlags = ScriptFlags(1 << 1);
    /// Require strict DER signatures (BIP66).
    pub const DERSIG: ScriptFlags = ScriptFlags(1 << 2);
    /// Require S <= order/2 (BIP62 rule 5).
    pub const LOW_S: ScriptFlags = ScriptFlags(1 << 3);
    /// Require the CHECKMULTISIG dummy element to be empty (BIP147).
    pub const NULLDUMMY: ScriptFlags = ScriptFlags(1 << 4);
    /// Require scriptSig to be push-only.
    pub const SIGPUSHONLY: ScriptFlags = ScriptFlags(1 << 5);
    /// Require minimal pushes and minimally encoded numbers.
    pub const MINIMALDATA: ScriptFlags = ScriptFlags(1 << 6);
    /// Fail on OP_NOP1, OP_NOP4..OP_NOP10.
    pub const DISCOURAGE_UPGRADABLE_NOPS: ScriptFlags = ScriptFlags(1 << 7);
    /// Require exactly one stack element after evaluation.
    pub const CLEANSTACK: ScriptFlags = ScriptFlags(1 << 8);
    /// Enable OP_CHECKLOCKTIMEVERIFY (BIP65).
    pub const CHECKLOCKTIMEVERIFY: ScriptFlags = ScriptFlags(1 << 9);
    /// Enable OP_CHECKSEQUENCEVERIFY (BIP112).
    pub const CHECKSEQUENCEVERIFY: ScriptFlags = ScriptFlags(1 << 10);
    /// Evaluate witness programs (BIP141).
    pub const WITNESS: ScriptFlags = ScriptFlags(1 << 11);
    /// Fail on witness programs of unknown versions.
    pub const DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM: ScriptFlags = ScriptFlags(1 << 12);
    /// Require OP_IF arguments in witness scripts to be empty or 0x01.
    pub const MINIMALIF: ScriptFlags = ScriptFlags(1 << 13);
    /// Require failed signature checks to use empty signatures.
    pub const NULLFAIL: ScriptFlags = ScriptFlags(1 << 14);
    /// Require compressed public keys in witness v0 scripts.
    pub const WITNESS_PUBKEYTYPE: ScriptFlags = ScriptFlags(1 << 15);

    /// Flags every block must satisfy: P2SH only.
    pub const MANDATORY: ScriptFlags = Self::P2SH;

    /// Consensus plus relay-policy flags.
    pub const STANDARD: ScriptFlags = ScriptFlags(
        Self::P2SH.0
            | Self::STRICTENC.0
            | Self::DERSIG.0
            | Self::LOW_S.0
            | Self::NULLDUMMY.0
            | Self::MINIMALDATA.0
            | Self::DISCOURAGE_UPGRADABLE_NOPS.0
            | Self::CLEANSTACK.0
            | Self::CHECKLOCKTIMEVERIFY.0
            | Self::CHECKSEQUENCEVERIFY.0
            | Self::WITNESS.0
            | Self::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM.0
            | Self::MINIMALIF.0
            | Self::NULLFAIL.0
            | Self::WITNESS_PUBKEYTYPE.0,
    );

    /// Default flags used when the signer re-verifies its own output.
    pub const SIGNER_DEFAULT: ScriptFlags = ScriptFlags(
        Self::DERSIG.0
            | Self::P2SH.0
            | Self::CHECKLOCKTIMEVERIFY.0
            | Self::CHECKSEQUENCEVERIFY.0
            | Self::WITNESS.0,
    );

    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}
