//! Data and alt stacks.
//!
//! Items are stored bottom first. Indexes taken by the accessors count
//! down from the top, so `peek(0)` is the top item.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::scriptnum::ScriptNumber;

/// Consensus truthiness: any non-zero byte, except a lone sign bit in the
/// last byte (negative zero).
pub fn as_bool(bytes: &[u8]) -> bool {
    match bytes.split_last() {
        Some((&last, rest)) => last & 0x7f != 0 || rest.iter().any(|&b| b != 0),
        None => false,
    }
}

fn stack_error(msg: String) -> InterpreterError {
    InterpreterError::new(InterpreterErrorCode::InvalidStackOperation, msg)
}

/// A script stack with the numeric decoding policy of its thread.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    items: Vec<Vec<u8>>,
    num_len: usize,
    require_minimal: bool,
}

impl Stack {
    /// `num_len` bounds numbers read by [`pop_int`](Self::pop_int);
    /// `require_minimal` rejects non-minimal number encodings.
    pub fn new(num_len: usize, require_minimal: bool) -> Self {
        Stack {
            items: Vec::new(),
            num_len,
            require_minimal,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Start of the top `n` items.
    fn tail(&self, n: usize) -> Result<usize, InterpreterError> {
        self.items.len().checked_sub(n).ok_or_else(|| {
            stack_error(format!(
                "operation needs {} items, stack has {}",
                n,
                self.items.len()
            ))
        })
    }

    /// Absolute position of the item `from_top` below the top.
    fn position(&self, from_top: i32) -> Result<usize, InterpreterError> {
        usize::try_from(from_top)
            .ok()
            .filter(|&n| n < self.items.len())
            .map(|n| self.items.len() - 1 - n)
            .ok_or_else(|| {
                stack_error(format!(
                    "index {} is invalid for stack size {}",
                    from_top,
                    self.items.len()
                ))
            })
    }

    pub fn push(&mut self, item: Vec<u8>) {
        self.items.push(item);
    }

    pub fn push_int(&mut self, n: &ScriptNumber) {
        self.items.push(n.to_bytes());
    }

    /// Push `[0x01]` for true and the empty vector for false.
    pub fn push_bool(&mut self, v: bool) {
        self.items.push(if v { vec![1] } else { Vec::new() });
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, InterpreterError> {
        self.items
            .pop()
            .ok_or_else(|| stack_error("pop from an empty stack".to_string()))
    }

    pub fn pop_int(&mut self) -> Result<ScriptNumber, InterpreterError> {
        let item = self.pop()?;
        ScriptNumber::from_bytes(&item, self.num_len, self.require_minimal)
    }

    pub fn pop_bool(&mut self) -> Result<bool, InterpreterError> {
        Ok(as_bool(&self.pop()?))
    }

    pub fn peek(&self, from_top: i32) -> Result<&[u8], InterpreterError> {
        Ok(&self.items[self.position(from_top)?])
    }

    /// Read the top item as a number of at most `num_len` bytes without
    /// removing it.
    pub fn top_int(&self, num_len: usize) -> Result<ScriptNumber, InterpreterError> {
        ScriptNumber::from_bytes(self.peek(0)?, num_len, self.require_minimal)
    }

    /// Remove the top `n` items.
    pub fn drop(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.tail(n)?;
        self.items.truncate(start);
        Ok(())
    }

    /// Copy the top `n` items.
    pub fn dup(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.tail(n)?;
        self.items.extend_from_within(start..);
        Ok(())
    }

    /// Copy the `n` items below the top `n` onto the top.
    pub fn over(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.tail(2 * n)?;
        self.items.extend_from_within(start..start + n);
        Ok(())
    }

    /// Move the `n` items at depth `2n` to the top.
    pub fn rot(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.tail(3 * n)?;
        self.items[start..].rotate_left(n);
        Ok(())
    }

    /// Exchange the top `n` items with the `n` below them.
    pub fn swap(&mut self, n: usize) -> Result<(), InterpreterError> {
        let start = self.tail(2 * n)?;
        self.items[start..].rotate_left(n);
        Ok(())
    }

    /// `x1 x2 -> x2`
    pub fn nip(&mut self) -> Result<(), InterpreterError> {
        let start = self.tail(2)?;
        self.items.remove(start);
        Ok(())
    }

    /// `x1 x2 -> x2 x1 x2`
    pub fn tuck(&mut self) -> Result<(), InterpreterError> {
        let start = self.tail(2)?;
        let top = self.items[start + 1].clone();
        self.items.insert(start, top);
        Ok(())
    }

    /// Copy the item `from_top` below the top onto the top.
    pub fn pick(&mut self, from_top: i32) -> Result<(), InterpreterError> {
        let item = self.items[self.position(from_top)?].clone();
        self.items.push(item);
        Ok(())
    }

    /// Move the item `from_top` below the top onto the top.
    pub fn roll(&mut self, from_top: i32) -> Result<(), InterpreterError> {
        let item = self.items.remove(self.position(from_top)?);
        self.items.push(item);
        Ok(())
    }

    /// Replace the contents (last = top).
    pub fn set_items(&mut self, items: Vec<Vec<u8>>) {
        self.items = items;
    }

    /// Take the contents (last = top), leaving the stack empty.
    pub fn take_items(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(items: &[u8]) -> Stack {
        let mut s = Stack::new(4, false);
        s.set_items(items.iter().map(|&b| vec![b]).collect());
        s
    }

    fn flat(s: &Stack) -> Vec<u8> {
        s.items.iter().map(|i| i[0]).collect()
    }

    #[test]
    fn test_as_bool() {
        let cases: &[(&[u8], bool)] = &[
            (&[], false),
            (&[0x00], false),
            (&[0x80], false),
            (&[0x00, 0x00], false),
            (&[0x00, 0x80], false),
            (&[0x01], true),
            (&[0x00, 0x01], true),
            (&[0x80, 0x00], true),
            (&[0x00, 0x81], true),
        ];
        for (bytes, want) in cases {
            assert_eq!(as_bool(bytes), *want, "{}", hex::encode(bytes));
        }
    }

    #[test]
    fn test_push_pop_peek() {
        let mut s = Stack::new(4, false);
        s.push(vec![1, 2, 3]);
        s.push_bool(true);
        s.push_bool(false);
        assert_eq!(s.depth(), 3);
        assert_eq!(s.peek(1).unwrap(), &[1]);
        assert_eq!(s.peek(2).unwrap(), &[1, 2, 3]);
        assert!(!s.pop_bool().unwrap());
        assert!(s.pop_bool().unwrap());
        assert_eq!(s.pop().unwrap(), vec![1, 2, 3]);
        assert!(s.is_empty());
    }

    #[test]
    fn test_underflow_is_invalid_stack_operation() {
        let mut s = stack_of(&[1, 2]);
        for result in [s.peek(2).map(|_| ()), s.peek(-1).map(|_| ())] {
            assert_eq!(result.unwrap_err().code, InterpreterErrorCode::InvalidStackOperation);
        }
        assert!(s.rot(1).is_err());
        assert!(s.over(2).is_err());
        assert!(s.drop(3).is_err());
        assert!(s.pick(-1).is_err());
        assert!(s.roll(2).is_err());
        assert_eq!(flat(&s), vec![1, 2], "failed operations leave the stack unchanged");
        s.drop(2).unwrap();
        assert_eq!(s.pop().unwrap_err().code, InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_multi_item_ops() {
        let mut s = stack_of(&[1, 2, 3, 4, 5, 6]);
        s.rot(2).unwrap();
        assert_eq!(flat(&s), vec![3, 4, 5, 6, 1, 2]);
        s.swap(2).unwrap();
        assert_eq!(flat(&s), vec![3, 4, 1, 2, 5, 6]);
        s.over(2).unwrap();
        assert_eq!(flat(&s), vec![3, 4, 1, 2, 5, 6, 1, 2]);
        s.dup(3).unwrap();
        assert_eq!(flat(&s), vec![3, 4, 1, 2, 5, 6, 1, 2, 6, 1, 2]);
        s.drop(2).unwrap();
        assert_eq!(flat(&s), vec![3, 4, 1, 2, 5, 6, 1, 2, 6]);
    }

    #[test]
    fn test_single_item_ops() {
        let mut s = stack_of(&[1, 2, 3]);
        s.rot(1).unwrap();
        assert_eq!(flat(&s), vec![2, 3, 1]);
        s.swap(1).unwrap();
        assert_eq!(flat(&s), vec![2, 1, 3]);
        s.tuck().unwrap();
        assert_eq!(flat(&s), vec![2, 3, 1, 3]);
        s.nip().unwrap();
        assert_eq!(flat(&s), vec![2, 3, 3]);
        s.pick(2).unwrap();
        assert_eq!(flat(&s), vec![2, 3, 3, 2]);
        s.roll(2).unwrap();
        assert_eq!(flat(&s), vec![2, 3, 2, 3]);
    }

    #[test]
    fn test_numbers_follow_stack_policy() {
        let mut s = Stack::new(4, true);
        s.push(vec![0x01, 0x00]);
        assert_eq!(s.top_int(5).unwrap_err().code, InterpreterErrorCode::MinimalData);
        assert_eq!(s.pop_int().unwrap_err().code, InterpreterErrorCode::MinimalData);

        let mut s = Stack::new(4, false);
        s.push(vec![0x01, 0x00]);
        assert_eq!(s.pop_int().unwrap().to_i64(), 1);

        s.push(vec![0xff, 0xff, 0xff, 0xff, 0x00]);
        assert_eq!(s.top_int(5).unwrap().to_i64(), 0xffff_ffff);
        assert_eq!(s.pop_int().unwrap_err().code, InterpreterErrorCode::NumberTooBig);
    }
}
