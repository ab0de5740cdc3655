//! Stack manipulation operations for the script interpreter.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::stack::as_bool;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_to_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.dstack.pop()?;
        self.astack.push(data);
        Ok(())
    }

    pub(crate) fn op_from_alt_stack(&mut self) -> Result<(), InterpreterError> {
        let data = self.astack.pop().map_err(|_| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidAltStackOperation,
                "alt stack is empty",
            )
        })?;
        self.dstack.push(data);
        Ok(())
    }

    pub(crate) fn op_ifdup(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek(0)?;
        if as_bool(top) {
            let copy = top.to_vec();
            self.dstack.push(copy);
        }
        Ok(())
    }

    pub(crate) fn op_pick(&mut self) -> Result<(), InterpreterError> {
        let val = self.dstack.pop_int()?;
        self.dstack.pick(val.to_i32())
    }

    pub(crate) fn op_roll(&mut self) -> Result<(), InterpreterError> {
        let val = self.dstack.pop_int()?;
        self.dstack.roll(val.to_i32())
    }
}
