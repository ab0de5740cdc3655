//! Flow control and lock time operations for the script interpreter.

use crate::opcodes::Opcode;

use super::checker::SigVersion;
use super::config::LOCKTIME_SCRIPT_NUM_LEN;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::stack::as_bool;
use super::thread::{Thread, OP_COND_FALSE, OP_COND_SKIP, OP_COND_TRUE};

/// Sequence lock time disabled bit (BIP68).
pub const SEQUENCE_LOCKTIME_DISABLE_FLAG: i64 = 1 << 31;

impl<'a> Thread<'a> {
    /// Pop the IF/NOTIF argument, enforcing MINIMALIF in witness scripts.
    pub(crate) fn pop_if_bool(&mut self) -> Result<bool, InterpreterError> {
        if self.sig_version == SigVersion::WitnessV0 && self.has_flag(ScriptFlags::MINIMALIF) {
            let b = self.dstack.pop()?;
            if b.len() > 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    format!("conditional has data of length {}", b.len()),
                ));
            }
            if b.len() == 1 && b[0] != 1 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalIf,
                    format!("conditional has non-minimal value 0x{:02x}", b[0]),
                ));
            }
            return Ok(as_bool(&b));
        }
        self.dstack.pop_bool()
    }

    /// OP_IF, or OP_NOTIF when `negate` is set.
    pub(crate) fn op_if(&mut self, negate: bool) -> Result<(), InterpreterError> {
        let mut cond_val = OP_COND_FALSE;
        if self.is_branch_executing() {
            if self.dstack.is_empty() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::UnbalancedConditional,
                    "conditional requires a stack argument",
                ));
            }
            if self.pop_if_bool()? != negate {
                cond_val = OP_COND_TRUE;
            }
        } else {
            cond_val = OP_COND_SKIP;
        }
        self.cond_stack.push(cond_val);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        let top = match self.cond_stack.last_mut() {
            Some(top) => top,
            None => {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::UnbalancedConditional,
                    format!(
                        "encountered opcode {} with no matching opcode to begin conditional execution",
                        op
                    ),
                ))
            }
        };

        match *top {
            OP_COND_TRUE => *top = OP_COND_FALSE,
            OP_COND_FALSE => *top = OP_COND_TRUE,
            _ => {} // OP_COND_SKIP stays
        }
        Ok(())
    }

    pub(crate) fn op_endif(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        if self.cond_stack.pop().is_none() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!(
                    "encountered opcode {} with no matching opcode to begin conditional execution",
                    op
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_verify(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        self.abstract_verify(op, InterpreterErrorCode::Verify)
    }

    /// Pop the top item and fail with `code` unless it is true.
    pub(crate) fn abstract_verify(
        &mut self,
        op: Opcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(InterpreterError::new(code, format!("{} failed", op)));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early",
        ))
    }

    pub(crate) fn op_upgradable_nop(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        if self.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_NOPS) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DiscourageUpgradableNOPs,
                format!("{} reserved for soft-fork upgrades", op),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKLOCKTIMEVERIFY) {
            return self.op_upgradable_nop(Opcode::OP_CHECKLOCKTIMEVERIFY);
        }

        // Lock times may need 5 bytes; the operand stays on the stack.
        let lock_time = self.dstack.top_int(LOCKTIME_SCRIPT_NUM_LEN)?;

        if lock_time.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", lock_time.to_i64()),
            ));
        }

        if !self.checker.check_lock_time(&lock_time) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("locktime requirement {} not satisfied", lock_time.to_i64()),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_check_sequence_verify(&mut self) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::CHECKSEQUENCEVERIFY) {
            return self.op_upgradable_nop(Opcode::OP_CHECKSEQUENCEVERIFY);
        }

        let sequence = self.dstack.top_int(LOCKTIME_SCRIPT_NUM_LEN)?;

        if sequence.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative sequence: {}", sequence.to_i64()),
            ));
        }

        // With the disable flag set the opcode behaves as a NOP.
        if sequence.to_i64() & SEQUENCE_LOCKTIME_DISABLE_FLAG != 0 {
            return Ok(());
        }

        if !self.checker.check_sequence(&sequence) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                format!("sequence requirement 0x{:x} not satisfied", sequence.to_i64()),
            ));
        }
        Ok(())
    }
}
