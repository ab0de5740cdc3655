//! Data operations for the script interpreter.

use crate::opcodes::Opcode;

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let len = self.dstack.peek(0)?.len();
        self.dstack.push_int(&ScriptNumber::new(len as i64));
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop()?;
        let b = self.dstack.pop()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self, op: Opcode) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(op, InterpreterErrorCode::EqualVerify)
    }
}
