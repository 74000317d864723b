// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Branching on conditions.
//!
//! Tests of `if`, loops and `?:` are compiled straight into jumps instead
//! of first materializing a boolean: comparisons branch on their result,
//! `&&`/`||`/`!` are threaded through labels.

use crate::ast::{Expression, LogicalOperator, UnaryOperator};
use crate::compiler::bytecode::{Label, OpCode};
use crate::compiler::codegen::CodeGen;
use crate::error::Result;

impl<'a> CodeGen<'a> {
    /// Compiles `expr` so that control falls through when it is truthy and
    /// jumps to `false_label` otherwise.
    pub(crate) fn compile_condition(&mut self, expr: &'a Expression, false_label: Label) -> Result<()> {
        match expr {
            Expression::Binary(binary) if binary.operator.is_comparison() => self.reg_scope(|cg| {
                let lhs = cg.alloc_reg()?;
                cg.compile_expression(&binary.left)?;
                cg.emit(OpCode::Sta(lhs));
                cg.compile_expression(&binary.right)?;
                cg.emit(OpCode::Binary {
                    op: binary.operator,
                    lhs,
                });
                cg.emit(OpCode::Jfalse(false_label));
                Ok(())
            }),
            Expression::Logical(logical) if logical.operator == LogicalOperator::And => {
                self.compile_condition(&logical.left, false_label)?;
                self.compile_condition(&logical.right, false_label)
            }
            Expression::Logical(logical) if logical.operator == LogicalOperator::Or => {
                let next = self.new_label();
                let end = self.new_label();
                self.compile_condition(&logical.left, next)?;
                self.emit(OpCode::Jmp(end));
                self.set_label(next)?;
                self.compile_condition(&logical.right, false_label)?;
                self.set_label(end)
            }
            Expression::Unary(unary) if unary.operator == UnaryOperator::LogicalNot => {
                let end = self.new_label();
                self.compile_condition(&unary.argument, end)?;
                self.emit(OpCode::Jmp(false_label));
                self.set_label(end)
            }
            _ => {
                self.compile_expression(expr)?;
                self.emit(OpCode::Jfalse(false_label));
                Ok(())
            }
        }
    }
}
