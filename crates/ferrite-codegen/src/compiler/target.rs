// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Break/continue targets and the dynamic-context stack.
//!
//! While a function body is generated, every construct that has to be
//! undone when control leaves it abruptly (lexical environments, `finally`
//! blocks, open for-of iterators) is pushed as a [`DynamicContext`]. Jump
//! targets live on the same stack, so resolving a `break` yields both the
//! destination label and the list of contexts the jump crosses.

use crate::ast::{BlockStatement, Identifier, Position};
use crate::compiler::bytecode::{Label, VReg};
use crate::error::{Error, Result};

/// Index of a protected region in the function's region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionId(pub usize);

/// What kind of statement a target belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Iteration statement; accepts `continue`
    Loop,
    /// Switch statement; accepts unlabeled `break`
    Switch,
    /// Any other labeled statement; only labeled `break`
    Block,
}

/// Destination of `break` and `continue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTarget {
    /// Kind of the owning statement
    pub kind: TargetKind,
    /// Bound after the statement
    pub break_label: Label,
    /// Bound at the next-iteration point of loops
    pub continue_label: Option<Label>,
    /// User labels attached to the statement
    pub names: Vec<String>,
}

impl LabelTarget {
    /// Target of an iteration statement.
    pub fn for_loop(break_label: Label, continue_label: Label, names: Vec<String>) -> Self {
        Self {
            kind: TargetKind::Loop,
            break_label,
            continue_label: Some(continue_label),
            names,
        }
    }

    /// Target of a switch statement.
    pub fn for_switch(break_label: Label, names: Vec<String>) -> Self {
        Self {
            kind: TargetKind::Switch,
            break_label,
            continue_label: None,
            names,
        }
    }

    /// Break-only target of a labeled non-loop statement.
    pub fn for_block(break_label: Label, names: Vec<String>) -> Self {
        Self {
            kind: TargetKind::Block,
            break_label,
            continue_label: None,
            names,
        }
    }

    fn has_name(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

/// An entry of the dynamic-context stack.
#[derive(Debug, Clone)]
pub enum DynamicContext<'a> {
    /// A lexical environment pushed by a block-level scope
    LexEnv,
    /// A jump target; for-of loops also own an iterator and its close region
    Target {
        /// The target
        target: LabelTarget,
        /// Iterator register and the region guarding the loop body
        iterator: Option<(VReg, RegionId)>,
    },
    /// A try statement with its protected regions
    Try {
        /// Regions to split around inlined exits
        regions: Vec<RegionId>,
        /// Inlined on every exit
        finalizer: Option<&'a BlockStatement>,
    },
}

/// Resolved `break`/`continue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpTarget {
    /// Index of the target context in the stack
    pub depth: usize,
    /// Label to jump to
    pub label: Label,
}

/// Finds the destination of a `break` (`is_continue == false`) or a
/// `continue`, searching from the innermost context outward.
pub fn find_jump_target(
    contexts: &[DynamicContext<'_>],
    label: Option<&Identifier>,
    is_continue: bool,
) -> Result<JumpTarget> {
    for (depth, context) in contexts.iter().enumerate().rev() {
        let DynamicContext::Target { target, .. } = context else {
            continue;
        };

        match label {
            Some(ident) if target.has_name(&ident.name) => {
                if !is_continue {
                    return Ok(JumpTarget {
                        depth,
                        label: target.break_label,
                    });
                }
                return match target.continue_label {
                    Some(label) => Ok(JumpTarget { depth, label }),
                    None => Err(Error::semantic(
                        format!(
                            "Illegal continue statement: '{}' does not denote an iteration statement",
                            ident.name
                        ),
                        ident.pos,
                    )),
                };
            }
            Some(_) => {}
            None if is_continue => {
                if let Some(label) = target.continue_label {
                    return Ok(JumpTarget { depth, label });
                }
            }
            None => {
                if target.kind != TargetKind::Block {
                    return Ok(JumpTarget {
                        depth,
                        label: target.break_label,
                    });
                }
            }
        }
    }

    Err(match (label, is_continue) {
        (Some(ident), _) => Error::semantic(format!("Undefined label '{}'", ident.name), ident.pos),
        (None, false) => Error::semantic("Illegal break statement", Position::default()),
        (None, true) => Error::semantic(
            "Illegal continue statement: no surrounding iteration statement",
            Position::default(),
        ),
    })
}
