// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Per-function label arena.

use crate::compiler::bytecode::Label;
use crate::error::{Error, Result};

/// Labels of one function and the instruction offsets they are bound to.
#[derive(Debug, Clone, Default)]
pub struct LabelArena {
    offsets: Vec<Option<u32>>,
}

impl LabelArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh, unbound label.
    pub fn alloc(&mut self) -> Label {
        let label = Label(self.offsets.len() as u32);
        self.offsets.push(None);
        label
    }

    /// Binds `label` to `offset`. Each label is bound exactly once.
    pub fn bind(&mut self, label: Label, offset: u32) -> Result<()> {
        let slot = self
            .offsets
            .get_mut(label.0 as usize)
            .ok_or_else(|| Error::internal(format!("label {} does not exist", label)))?;
        if let Some(previous) = slot {
            return Err(Error::internal(format!(
                "label {} bound twice (at {} and {})",
                label, previous, offset
            )));
        }
        *slot = Some(offset);
        Ok(())
    }

    /// Offset of a bound label.
    pub fn offset(&self, label: Label) -> Option<u32> {
        self.offsets.get(label.0 as usize).copied().flatten()
    }

    /// Number of labels allocated.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Whether no label was allocated.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Checks that every label is bound and returns the offset table,
    /// indexed by label.
    pub fn resolve(&self) -> Result<Vec<u32>> {
        self.offsets
            .iter()
            .enumerate()
            .map(|(index, offset)| {
                offset.ok_or_else(|| Error::internal(format!("label L{} was never bound", index)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_and_resolve() {
        let mut labels = LabelArena::new();
        let a = labels.alloc();
        let b = labels.alloc();
        labels.bind(b, 4).unwrap();
        labels.bind(a, 1).unwrap();
        assert_eq!(labels.resolve().unwrap(), vec![1, 4]);
        assert_eq!(labels.offset(b), Some(4));
    }

    #[test]
    fn test_double_bind_rejected() {
        let mut labels = LabelArena::new();
        let a = labels.alloc();
        labels.bind(a, 0).unwrap();
        let err = labels.bind(a, 3).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn test_unbound_label_fails_resolution() {
        let mut labels = LabelArena::new();
        let a = labels.alloc();
        labels.alloc();
        labels.bind(a, 0).unwrap();
        let err = labels.resolve().unwrap_err();
        assert!(err.message.contains("L1"));
    }
}
