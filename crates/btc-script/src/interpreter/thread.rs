//! Script execution thread: evaluates a single script against a stack.

use crate::instruction::Instruction;
use crate::opcodes::*;
use crate::Script;

use super::checker::{SigVersion, SignatureChecker};
use super::config::Config;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::HashType;
use super::scriptnum::ScriptNumber;
use super::stack::Stack;

/// Conditional execution states.
pub(crate) const OP_COND_FALSE: i32 = 0;
pub(crate) const OP_COND_TRUE: i32 = 1;
/// An IF nested inside an unexecuted branch; ELSE never flips it.
pub(crate) const OP_COND_SKIP: i32 = 2;

/// The execution thread for one script.
pub struct Thread<'a> {
    /// The main data stack used during script execution.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// Interpreter limits.
    pub cfg: Config,
    /// Stack of conditional execution flags for nested IF/ELSE blocks.
    pub cond_stack: Vec<i32>,
    /// Byte offset of the currently executing instruction.
    pub script_off: usize,
    /// Byte offset just past the most recent OP_CODESEPARATOR.
    pub last_code_sep: usize,
    /// Running count of non-push opcodes executed (checked against max_ops).
    pub num_ops: usize,
    /// Active script verification flags.
    pub flags: ScriptFlags,
    /// Signature hashing and script rule version.
    pub sig_version: SigVersion,
    pub(crate) script: &'a Script,
    pub(crate) checker: &'a dyn SignatureChecker,
    ops: Vec<Instruction>,
}

impl<'a> Thread<'a> {
    /// Create a thread for `script` with an empty stack.
    ///
    /// Fails before any execution when the script is oversized or contains
    /// a malformed push.
    pub fn new(
        script: &'a Script,
        sig_version: SigVersion,
        flags: ScriptFlags,
        checker: &'a dyn SignatureChecker,
    ) -> Result<Self, InterpreterError> {
        let cfg = Config::new();

        if script.len() > cfg.max_script_size() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "script size {} is larger than the max allowed size {}",
                    script.len(),
                    cfg.max_script_size()
                ),
            ));
        }

        let ops = script.instructions().map_err(|e| {
            InterpreterError::new(InterpreterErrorCode::MalformedPush, e.to_string())
        })?;

        let verify_minimal_data = flags.has_flag(ScriptFlags::MINIMALDATA);
        let max_num_len = cfg.max_script_number_length();

        Ok(Thread {
            dstack: Stack::new(max_num_len, verify_minimal_data),
            astack: Stack::new(max_num_len, verify_minimal_data),
            cfg,
            cond_stack: Vec::new(),
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            sig_version,
            script,
            checker,
            ops,
        })
    }

    /// Check if a specific script verification flag is set.
    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Check if any of the given script verification flags are set.
    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&c| c == OP_COND_TRUE)
    }

    /// Run every instruction of the script.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        let ops = std::mem::take(&mut self.ops);
        let result = self.run(&ops);
        self.ops = ops;
        result
    }

    /// Replace the data stack (last = top).
    pub fn set_stack(&mut self, items: Vec<Vec<u8>>) {
        self.dstack.set_items(items);
    }

    /// Consume the thread, returning the data stack (last = top).
    pub fn into_stack(mut self) -> Vec<Vec<u8>> {
        self.dstack.take_items()
    }

    fn run(&mut self, ops: &[Instruction]) -> Result<(), InterpreterError> {
        for ins in ops {
            if let Err(e) = self.step(ins) {
                tracing::debug!(
                    code = %e.code,
                    opcode = %ins.opcode(),
                    offset = self.script_off,
                    "script evaluation failed: {}",
                    e.description
                );
                return Err(e);
            }
            self.script_off += ins.encoded_len();
        }

        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution",
            ));
        }
        Ok(())
    }

    fn step(&mut self, ins: &Instruction) -> Result<(), InterpreterError> {
        self.execute_opcode(ins)?;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > self.cfg.max_stack_size() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined,
                    self.cfg.max_stack_size()
                ),
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, ins: &Instruction) -> Result<(), InterpreterError> {
        let opcode = ins.opcode();

        if let Some(data) = ins.push_bytes() {
            if data.len() > self.cfg.max_script_element_size() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::ElementTooBig,
                    format!(
                        "element size {} exceeds max allowed size {}",
                        data.len(),
                        self.cfg.max_script_element_size()
                    ),
                ));
            }
        }

        // Count non-push operations
        if opcode.to_u8() > OP_16 {
            self.num_ops += 1;
            if self.num_ops > self.cfg.max_ops() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", self.cfg.max_ops()),
                ));
            }
        }

        // Disabled opcodes fail even in unexecuted branches
        if opcode.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", opcode),
            ));
        }

        let exec = self.is_branch_executing();

        if let Instruction::Push { data, .. } = ins {
            if !exec {
                return Ok(());
            }
            if self.has_flag(ScriptFlags::MINIMALDATA) && !ins.is_minimal_push() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::MinimalData,
                    format!(
                        "data push of {} bytes with opcode {} is not minimally encoded",
                        data.len(),
                        opcode
                    ),
                ));
            }
            self.dstack.push(data.clone());
            return Ok(());
        }

        if !exec && !opcode.is_conditional() {
            return Ok(());
        }

        self.dispatch_opcode(opcode)
    }

    fn dispatch_opcode(&mut self, opcode: Opcode) -> Result<(), InterpreterError> {
        match opcode {
            Opcode::OP_1NEGATE
            | Opcode::OP_1
            | Opcode::OP_2
            | Opcode::OP_3
            | Opcode::OP_4
            | Opcode::OP_5
            | Opcode::OP_6
            | Opcode::OP_7
            | Opcode::OP_8
            | Opcode::OP_9
            | Opcode::OP_10
            | Opcode::OP_11
            | Opcode::OP_12
            | Opcode::OP_13
            | Opcode::OP_14
            | Opcode::OP_15
            | Opcode::OP_16 => {
                let n = opcode.small_int().unwrap_or_default();
                self.dstack.push_int(&ScriptNumber::new(n));
                Ok(())
            }

            Opcode::OP_NOP => Ok(()),
            Opcode::OP_IF => self.op_if(false),
            Opcode::OP_NOTIF => self.op_if(true),
            Opcode::OP_ELSE => self.op_else(opcode),
            Opcode::OP_ENDIF => self.op_endif(opcode),
            Opcode::OP_VERIFY => self.op_verify(opcode),
            Opcode::OP_RETURN => self.op_return(),

            // Locktime
            Opcode::OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),
            Opcode::OP_CHECKSEQUENCEVERIFY => self.op_check_sequence_verify(),

            // Stack ops
            Opcode::OP_TOALTSTACK => self.op_to_alt_stack(),
            Opcode::OP_FROMALTSTACK => self.op_from_alt_stack(),
            Opcode::OP_2DROP => self.dstack.drop(2),
            Opcode::OP_2DUP => self.dstack.dup(2),
            Opcode::OP_3DUP => self.dstack.dup(3),
            Opcode::OP_2OVER => self.dstack.over(2),
            Opcode::OP_2ROT => self.dstack.rot(2),
            Opcode::OP_2SWAP => self.dstack.swap(2),
            Opcode::OP_IFDUP => self.op_ifdup(),
            Opcode::OP_DEPTH => {
                let d = self.dstack.depth();
                self.dstack.push_int(&ScriptNumber::new(d as i64));
                Ok(())
            }
            Opcode::OP_DROP => self.dstack.drop(1),
            Opcode::OP_DUP => self.dstack.dup(1),
            Opcode::OP_NIP => self.dstack.nip(),
            Opcode::OP_OVER => self.dstack.over(1),
            Opcode::OP_PICK => self.op_pick(),
            Opcode::OP_ROLL => self.op_roll(),
            Opcode::OP_ROT => self.dstack.rot(1),
            Opcode::OP_SWAP => self.dstack.swap(1),
            Opcode::OP_TUCK => self.dstack.tuck(),

            // Splice and bitwise logic
            Opcode::OP_SIZE => self.op_size(),
            Opcode::OP_EQUAL => self.op_equal(),
            Opcode::OP_EQUALVERIFY => self.op_equalverify(opcode),

            // Arithmetic
            Opcode::OP_1ADD => self.op_unary_int(|m| {
                m.incr();
            }),
            Opcode::OP_1SUB => self.op_unary_int(|m| {
                m.decr();
            }),
            Opcode::OP_NEGATE => self.op_unary_int(|m| {
                m.neg();
            }),
            Opcode::OP_ABS => self.op_unary_int(|m| {
                m.abs();
            }),
            Opcode::OP_NOT => self.op_not(),
            Opcode::OP_0NOTEQUAL => self.op_0notequal(),
            Opcode::OP_ADD => self.op_add(),
            Opcode::OP_SUB => self.op_sub(),
            Opcode::OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            Opcode::OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            Opcode::OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            Opcode::OP_NUMEQUALVERIFY => self.op_numequalverify(opcode),
            Opcode::OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            Opcode::OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            Opcode::OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            Opcode::OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            Opcode::OP_GREATERTHANOREQUAL => {
                self.op_bool_binop(|a, b| a.greater_than_or_equal(b))
            }
            Opcode::OP_MIN => self.op_min(),
            Opcode::OP_MAX => self.op_max(),
            Opcode::OP_WITHIN => self.op_within(),

            // Crypto
            Opcode::OP_RIPEMD160 => self.op_hash(HashType::Ripemd160),
            Opcode::OP_SHA1 => self.op_hash(HashType::Sha1),
            Opcode::OP_SHA256 => self.op_hash(HashType::Sha256),
            Opcode::OP_HASH160 => self.op_hash(HashType::Hash160),
            Opcode::OP_HASH256 => self.op_hash(HashType::Hash256),
            Opcode::OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off + 1;
                Ok(())
            }
            Opcode::OP_CHECKSIG => self.op_checksig(),
            Opcode::OP_CHECKSIGVERIFY => self.op_checksigverify(opcode),
            Opcode::OP_CHECKMULTISIG => self.op_checkmultisig(),
            Opcode::OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(opcode),

            // Upgradable NOPs
            Opcode::OP_NOP1
            | Opcode::OP_NOP4
            | Opcode::OP_NOP5
            | Opcode::OP_NOP6
            | Opcode::OP_NOP7
            | Opcode::OP_NOP8
            | Opcode::OP_NOP9
            | Opcode::OP_NOP10 => self.op_upgradable_nop(opcode),

            // OP_RESERVED, OP_VER, OP_VERIF, OP_VERNOTIF, OP_RESERVED1/2
            Opcode::OP_RESERVED
            | Opcode::OP_VER
            | Opcode::OP_VERIF
            | Opcode::OP_VERNOTIF
            | Opcode::OP_RESERVED1
            | Opcode::OP_RESERVED2 => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", opcode),
            )),

            // Pushes are handled before dispatch and disabled opcodes are
            // rejected before reaching here.
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::BadOpcode,
                format!("attempt to execute invalid opcode {}", opcode),
            )),
        }
    }
}
