//! Bitcoin script interpreter.
//!
//! Evaluates scriptSig, scriptPubKey, P2SH redeem scripts and witness v0
//! programs under a set of [`ScriptFlags`].
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers
//! provide a [`SignatureChecker`] implementation that computes signature
//! hashes and checks lock times; [`NullChecker`] fails every such check.
//!
//! # Example
//!
//! ```
//! use btc_script::Script;
//! use btc_script::opcodes::*;
//! use btc_script::interpreter::{Interpreter, NullChecker, ScriptFlags};
//!
//! let script_sig = Script::from_bytes(&[OP_2, OP_3]);
//! let script_pub_key = Script::from_bytes(&[OP_ADD, OP_5, OP_EQUAL]);
//! let result = Interpreter::new().verify(
//!     &script_sig,
//!     &script_pub_key,
//!     &[],
//!     ScriptFlags::MANDATORY,
//!     &NullChecker,
//! );
//! assert!(result.is_ok());
//! ```

pub mod checker;
pub mod config;
pub mod encoding;
pub mod error;
pub mod flags;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use checker::{NullChecker, SigVersion, SignatureChecker};
pub use config::Config;
pub use error::{is_error_code, InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use scriptnum::{decode_script_num, encode_script_num, ScriptNumber};
pub use stack::Stack;

use btc_primitives::hash::sha256;

use crate::builder;
use crate::instruction::Instruction;
use crate::Script;
use stack::as_bool;
use thread::Thread;

/// The script verification engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Interpreter {
    pub fn new() -> Self {
        Interpreter
    }

    /// Evaluate a single script on `stack` (last = top).
    ///
    /// The stack is updated in place, also on failure up to the failing
    /// instruction.
    pub fn evaluate(
        &self,
        script: &Script,
        stack: &mut Vec<Vec<u8>>,
        sig_version: SigVersion,
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(script, sig_version, flags, checker)?;
        thread.set_stack(std::mem::take(stack));
        let result = thread.execute();
        *stack = thread.into_stack();
        result
    }

    /// [`evaluate`](Self::evaluate) reporting only success.
    pub fn eval_script(
        &self,
        script: &Script,
        stack: &mut Vec<Vec<u8>>,
        sig_version: SigVersion,
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> bool {
        self.evaluate(script, stack, sig_version, flags, checker).is_ok()
    }

    /// Verify that `script_sig` and `witness` satisfy `script_pub_key`.
    ///
    /// # Arguments
    /// * `script_sig` - The input's unlocking script.
    /// * `script_pub_key` - The spent output's locking script.
    /// * `witness` - The input's witness stack (empty for legacy inputs).
    /// * `flags` - Verification flags.
    /// * `checker` - Signature and lock time checks for the input.
    pub fn verify(
        &self,
        script_sig: &Script,
        script_pub_key: &Script,
        witness: &[Vec<u8>],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> Result<(), InterpreterError> {
        // Clean stack requires P2SH
        if flags.has_flag(ScriptFlags::CLEANSTACK) && !flags.has_flag(ScriptFlags::P2SH) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidFlags,
                "invalid scriptflag combination: CLEANSTACK without P2SH",
            ));
        }

        if flags.has_flag(ScriptFlags::SIGPUSHONLY) && !script_sig.is_push_only() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "signature script is not push only",
            ));
        }

        let mut stack = Vec::new();
        self.evaluate(script_sig, &mut stack, SigVersion::Base, flags, checker)?;
        let stack_copy = if flags.has_flag(ScriptFlags::P2SH) {
            stack.clone()
        } else {
            Vec::new()
        };
        self.evaluate(script_pub_key, &mut stack, SigVersion::Base, flags, checker)?;
        check_true(&stack)?;

        let mut had_witness = false;

        if flags.has_flag(ScriptFlags::WITNESS) {
            if let Some((version, program)) = script_pub_key.witness_program() {
                had_witness = true;
                if !script_sig.is_empty() {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessMalleated,
                        "native witness program spent with a non-empty scriptSig",
                    ));
                }
                self.verify_witness_program(witness, version, program, flags, checker)?;
                // Leave one element so CLEANSTACK passes.
                stack.truncate(1);
            }
        }

        if flags.has_flag(ScriptFlags::P2SH) && script_pub_key.is_p2sh() {
            if !script_sig.is_push_only() {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::NotPushOnly,
                    "pay to script hash is not push only",
                ));
            }

            stack = stack_copy;
            let redeem_bytes = stack.pop().ok_or_else(|| {
                InterpreterError::new(
                    InterpreterErrorCode::InvalidStackOperation,
                    "no redeem script on the stack",
                )
            })?;
            let redeem_script = Script::from(redeem_bytes);

            self.evaluate(&redeem_script, &mut stack, SigVersion::Base, flags, checker)?;
            check_true(&stack)?;

            if flags.has_flag(ScriptFlags::WITNESS) {
                if let Some((version, program)) = redeem_script.witness_program() {
                    had_witness = true;
                    let expected = Instruction::push(redeem_script.to_bytes()).to_bytes();
                    if script_sig.to_bytes() != expected.as_slice() {
                        return Err(InterpreterError::new(
                            InterpreterErrorCode::WitnessMalleatedP2SH,
                            "P2SH witness program must be the only scriptSig push",
                        ));
                    }
                    self.verify_witness_program(witness, version, program, flags, checker)?;
                    stack.truncate(1);
                }
            }
        }

        if flags.has_flag(ScriptFlags::CLEANSTACK) && stack.len() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::CleanStack,
                format!("stack contains {} unexpected items", stack.len().saturating_sub(1)),
            ));
        }

        if flags.has_flag(ScriptFlags::WITNESS) && !had_witness && !witness.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::WitnessUnexpected,
                "witness provided for a non-witness script",
            ));
        }

        Ok(())
    }

    /// [`verify`](Self::verify) reporting only success.
    pub fn verify_script(
        &self,
        script_sig: &Script,
        script_pub_key: &Script,
        witness: &[Vec<u8>],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> bool {
        self.verify(script_sig, script_pub_key, witness, flags, checker)
            .is_ok()
    }

    fn verify_witness_program(
        &self,
        witness: &[Vec<u8>],
        version: u8,
        program: &[u8],
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> Result<(), InterpreterError> {
        tracing::trace!(version, program_len = program.len(), "verifying witness program");

        if version != 0 {
            if flags.has_flag(ScriptFlags::DISCOURAGE_UPGRADABLE_WITNESS_PROGRAM) {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::DiscourageUpgradableWitnessProgram,
                    format!("witness version {} reserved for soft-fork upgrades", version),
                ));
            }
            return Ok(());
        }

        let (stack, witness_script) = match program.len() {
            32 => {
                let (script_bytes, rest) = witness.split_last().ok_or_else(|| {
                    InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramWitnessEmpty,
                        "witness is empty for a P2WSH program",
                    )
                })?;
                if sha256(script_bytes)[..] != *program {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramMismatch,
                        "witness script does not match the program hash",
                    ));
                }
                (rest.to_vec(), Script::from_bytes(script_bytes))
            }
            20 => {
                if witness.len() != 2 {
                    return Err(InterpreterError::new(
                        InterpreterErrorCode::WitnessProgramMismatch,
                        format!("P2WPKH witness has {} items instead of 2", witness.len()),
                    ));
                }
                let mut hash = [0u8; 20];
                hash.copy_from_slice(program);
                (witness.to_vec(), builder::p2pkh(&hash))
            }
            n => {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::WitnessProgramWrongLength,
                    format!("witness v0 program of {} bytes", n),
                ))
            }
        };

        self.execute_witness_script(stack, &witness_script, flags, checker)
    }

    fn execute_witness_script(
        &self,
        mut stack: Vec<Vec<u8>>,
        script: &Script,
        flags: ScriptFlags,
        checker: &dyn SignatureChecker,
    ) -> Result<(), InterpreterError> {
        let limit = Config::new().max_script_element_size();
        if let Some(big) = stack.iter().find(|item| item.len() > limit) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!("witness element size {} exceeds max allowed size {}", big.len(), limit),
            ));
        }

        self.evaluate(script, &mut stack, SigVersion::WitnessV0, flags, checker)?;

        // Witness scripts implicitly require a clean stack.
        if stack.len() != 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                format!("witness script left {} stack items instead of 1", stack.len()),
            ));
        }
        check_true(&stack)
    }
}

fn check_true(stack: &[Vec<u8>]) -> Result<(), InterpreterError> {
    match stack.last() {
        Some(top) if as_bool(top) => Ok(()),
        Some(_) => Err(InterpreterError::new(
            InterpreterErrorCode::EvalFalse,
            "false stack entry at end of script execution",
        )),
        None => Err(InterpreterError::new(
            InterpreterErrorCode::EvalFalse,
            "stack empty at end of script execution",
        )),
    }
}
