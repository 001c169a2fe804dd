//! Byte-string stack shared by the main and alternate stacks.

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

use crate::{error::ScriptError, num::cast_to_bool};

/// Maximum combined depth of the main and alternate stacks.
pub const MAX_STACK_SIZE: usize = 1000;
/// Maximum size of a single pushed element.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Stack of byte strings. Index 0 is the bottom.
///
/// Accessors that can underflow report
/// [`ScriptError::InvalidStackOperation`]; callers working on the
/// alternate stack remap that error.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScriptStack {
    items: Vec<Vec<u8>>,
}

impl ScriptStack {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn from_items(items: Vec<Vec<u8>>) -> Self {
        Self { items }
    }

    pub fn push(&mut self, data: Vec<u8>) {
        self.items.push(data);
    }

    pub fn push_bool(&mut self, value: bool) {
        if value {
            self.push(vec![1]);
        } else {
            self.push(Vec::new());
        }
    }

    pub fn pop(&mut self) -> Result<Vec<u8>, ScriptError> {
        self.items.pop().ok_or(ScriptError::InvalidStackOperation)
    }

    /// Drops the top element.
    pub fn drop_top(&mut self) -> Result<(), ScriptError> {
        self.pop().map(drop)
    }

    /// Fails unless at least `n` elements are present.
    pub fn require(&self, n: usize) -> Result<(), ScriptError> {
        if self.items.len() < n {
            Err(ScriptError::InvalidStackOperation)
        } else {
            Ok(())
        }
    }

    /// Element `depth` positions from the top; `top(0)` is the top.
    pub fn top(&self, depth: usize) -> Result<&Vec<u8>, ScriptError> {
        self.index_from_top(depth).map(|idx| &self.items[idx])
    }

    /// Removes and returns the element `depth` positions from the top.
    pub fn remove(&mut self, depth: usize) -> Result<Vec<u8>, ScriptError> {
        let idx = self.index_from_top(depth)?;
        Ok(self.items.remove(idx))
    }

    /// Inserts `data` so that it ends up `depth` positions from the top.
    pub fn insert(&mut self, depth: usize, data: Vec<u8>) -> Result<(), ScriptError> {
        if depth > self.items.len() {
            return Err(ScriptError::InvalidStackOperation);
        }
        let idx = self.items.len() - depth;
        self.items.insert(idx, data);
        Ok(())
    }

    /// Swaps the elements at two depths.
    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ScriptError> {
        let a = self.index_from_top(a)?;
        let b = self.index_from_top(b)?;
        self.items.swap(a, b);
        Ok(())
    }

    /// Truthiness of the top element; `None` when empty.
    pub fn top_is_true(&self) -> Option<bool> {
        self.items.last().map(|item| cast_to_bool(item))
    }

    pub fn last(&self) -> Option<&Vec<u8>> {
        self.items.last()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Vec<u8>] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Vec<u8>> {
        self.items
    }

    fn index_from_top(&self, depth: usize) -> Result<usize, ScriptError> {
        self.items
            .len()
            .checked_sub(depth + 1)
            .ok_or(ScriptError::InvalidStackOperation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[u8]) -> ScriptStack {
        ScriptStack::from_items(values.iter().map(|v| vec![*v]).collect())
    }

    #[test]
    fn top_indexes_from_the_end() {
        let stack = stack_of(&[1, 2, 3]);
        assert_eq!(stack.top(0).unwrap(), &vec![3]);
        assert_eq!(stack.top(2).unwrap(), &vec![1]);
        assert_eq!(
            stack.top(3).unwrap_err(),
            ScriptError::InvalidStackOperation
        );
    }

    #[test]
    fn remove_insert_and_swap() {
        let mut stack = stack_of(&[1, 2, 3, 4]);
        assert_eq!(stack.remove(2).unwrap(), vec![2]);
        stack.insert(1, vec![9]).unwrap();
        assert_eq!(stack, stack_of(&[1, 3, 9, 4]));
        stack.swap(0, 3).unwrap();
        assert_eq!(stack, stack_of(&[4, 3, 9, 1]));
        assert!(stack.insert(5, vec![0]).is_err());
    }

    #[test]
    fn underflow_is_invalid_stack_operation() {
        let mut stack = ScriptStack::new();
        assert_eq!(stack.pop().unwrap_err(), ScriptError::InvalidStackOperation);
        assert_eq!(
            stack.require(1).unwrap_err(),
            ScriptError::InvalidStackOperation
        );
        assert_eq!(stack.top_is_true(), None);
        stack.push_bool(false);
        assert_eq!(stack.top_is_true(), Some(false));
    }
}
