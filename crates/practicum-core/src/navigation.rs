//! Free navigation over a fixed question list.

use crate::error::SessionError;

/// Tracks the current position and how far the candidate has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Navigator {
    current: usize,
    furthest: usize,
    len: usize,
}

impl Navigator {
    pub fn new(len: usize) -> Self {
        Self {
            current: 0,
            furthest: 0,
            len,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_last(&self) -> bool {
        self.len == 0 || self.current + 1 == self.len
    }

    /// The initial forward pass is complete once the last question was reached.
    pub fn initial_pass_complete(&self) -> bool {
        self.len == 0 || self.furthest + 1 >= self.len
    }

    pub fn has_next(&self) -> bool {
        self.current + 1 < self.len
    }

    pub fn has_previous(&self) -> bool {
        self.current > 0
    }

    /// Move forward one question. Returns the new index.
    pub fn next(&mut self) -> Result<usize, SessionError> {
        self.jump(self.current + 1)
    }

    /// Move back one question. Returns the new index.
    pub fn previous(&mut self) -> Result<usize, SessionError> {
        let target = self
            .current
            .checked_sub(1)
            .ok_or(SessionError::IndexOutOfRange {
                index: 0,
                len: self.len,
            })?;
        self.jump(target)
    }

    /// Go straight to `index`.
    pub fn jump(&mut self, index: usize) -> Result<usize, SessionError> {
        if index >= self.len {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        self.current = index;
        self.furthest = self.furthest.max(index);
        Ok(index)
    }
}
