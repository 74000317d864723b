// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope-relative virtual register allocation.
//!
//! Registers are handed out bump-style from a cursor. Entering a
//! [`RegScope`] remembers the cursor; leaving it releases every register
//! allocated since, so temporaries are reused across sibling expressions
//! while the allocator keeps the high-water mark as the frame size.

use crate::compiler::bytecode::VReg;
use crate::error::{Error, Result};

/// Token returned by [`RegAllocator::enter`]. Must be handed back to
/// [`RegAllocator::leave`] in LIFO order.
#[derive(Debug)]
#[must_use = "a register scope has to be left"]
pub struct RegScope {
    base: u32,
}

/// Per-function register allocator.
#[derive(Debug, Clone)]
pub struct RegAllocator {
    cursor: u32,
    total: u32,
    capacity: u32,
}

impl RegAllocator {
    /// Creates an allocator able to hand out `capacity` registers.
    pub fn new(capacity: u32) -> Self {
        Self {
            cursor: 0,
            total: 0,
            capacity: capacity.min(u16::MAX as u32 + 1),
        }
    }

    /// Allocates the next register.
    pub fn alloc(&mut self) -> Result<VReg> {
        if self.cursor >= self.capacity {
            return Err(Error::internal(format!(
                "register window exhausted ({} registers)",
                self.capacity
            )));
        }
        let reg = VReg(self.cursor as u16);
        self.cursor += 1;
        self.total = self.total.max(self.cursor);
        Ok(reg)
    }

    /// Allocates `count` consecutive registers and returns the first one.
    ///
    /// With `count == 0` no register is consumed and the returned register
    /// must not be read.
    pub fn alloc_n(&mut self, count: u32) -> Result<VReg> {
        let start = VReg(self.cursor.min(u16::MAX as u32) as u16);
        for _ in 0..count {
            self.alloc()?;
        }
        Ok(start)
    }

    /// Opens a register scope at the current cursor.
    pub fn enter(&mut self) -> RegScope {
        RegScope { base: self.cursor }
    }

    /// Closes `scope`, releasing everything allocated inside it.
    pub fn leave(&mut self, scope: RegScope) {
        debug_assert!(scope.base <= self.cursor, "register scopes left out of order");
        self.cursor = scope.base;
    }

    /// Next register to be allocated.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Peak number of live registers, i.e. the frame size.
    pub fn total(&self) -> u32 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_is_monotonic() {
        let mut regs = RegAllocator::new(16);
        assert_eq!(regs.alloc().unwrap(), VReg(0));
        assert_eq!(regs.alloc().unwrap(), VReg(1));
        assert_eq!(regs.cursor(), 2);
    }

    #[test]
    fn test_leave_restores_cursor_and_keeps_peak() {
        let mut regs = RegAllocator::new(16);
        regs.alloc().unwrap();

        let outer = regs.enter();
        regs.alloc().unwrap();
        let inner = regs.enter();
        regs.alloc_n(3).unwrap();
        assert_eq!(regs.cursor(), 5);
        regs.leave(inner);
        assert_eq!(regs.cursor(), 2);
        regs.leave(outer);

        assert_eq!(regs.cursor(), 1);
        assert_eq!(regs.total(), 5);

        // Sibling scopes reuse the same registers
        let sibling = regs.enter();
        assert_eq!(regs.alloc().unwrap(), VReg(1));
        regs.leave(sibling);
        assert_eq!(regs.total(), 5);
    }

    #[test]
    fn test_overflow_is_internal_error() {
        let mut regs = RegAllocator::new(2);
        regs.alloc_n(2).unwrap();
        let err = regs.alloc().unwrap_err();
        assert!(err.is_internal());
        assert!(err.message.contains("exhausted"));
    }

    #[test]
    fn test_alloc_n_returns_first() {
        let mut regs = RegAllocator::new(8);
        regs.alloc().unwrap();
        assert_eq!(regs.alloc_n(3).unwrap(), VReg(1));
        assert_eq!(regs.alloc().unwrap(), VReg(4));
    }
}
