// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Switch compilation.
//!
//! ```text
//! switch (d) { case a: A; default: D; case b: B }
//!
//! Bytecode:
//!   [d bytecode]
//!   Sta tag
//!   [a bytecode]
//!   Binary StrictEqual tag
//!   Jtrue -> case_a
//!   [b bytecode]
//!   Binary StrictEqual tag
//!   Jtrue -> case_b
//!   Jmp -> default               ; or end without a default clause
//! case_a:
//!   [A bytecode]
//! default:
//!   [D bytecode]
//! case_b:
//!   [B bytecode]
//! end:
//! ```
//!
//! Tests run in source order and the first match wins; bodies are laid
//! out in source order so fallthrough needs no jumps.

use crate::ast::{BinaryOperator, Statement, SwitchStatement};
use crate::compiler::bytecode::{Label, OpCode};
use crate::compiler::codegen::CodeGen;
use crate::compiler::target::{DynamicContext, LabelTarget};
use crate::error::Result;

impl<'a> CodeGen<'a> {
    pub(crate) fn compile_switch(&mut self, stmt: &'a SwitchStatement) -> Result<()> {
        let names = self.take_labels();

        self.reg_scope(|cg| {
            let tag = cg.alloc_reg()?;
            cg.compile_expression(&stmt.discriminant)?;
            cg.emit(OpCode::Sta(tag));

            let bodies: Vec<&'a [Statement]> = stmt.cases.iter().map(|case| case.consequent.as_slice()).collect();
            cg.with_scope(stmt.scope, &bodies, |cg| {
                let labels: Vec<Label> = stmt.cases.iter().map(|_| cg.new_label()).collect();
                let end = cg.new_label();

                let mut default = None;
                for (case, &label) in stmt.cases.iter().zip(&labels) {
                    match &case.test {
                        Some(test) => {
                            cg.compile_expression(test)?;
                            cg.emit(OpCode::Binary {
                                op: BinaryOperator::StrictEqual,
                                lhs: tag,
                            });
                            cg.emit(OpCode::Jtrue(label));
                        }
                        None => default = Some(label),
                    }
                }
                cg.emit(OpCode::Jmp(default.unwrap_or(end)));

                let context = DynamicContext::Target {
                    target: LabelTarget::for_switch(end, names),
                    iterator: None,
                };
                cg.with_context(context, |cg| {
                    for (case, &label) in stmt.cases.iter().zip(&labels) {
                        cg.set_label(label)?;
                        for statement in &case.consequent {
                            cg.compile_statement(statement)?;
                        }
                    }
                    Ok(())
                })?;
                cg.set_label(end)
            })
        })
    }
}
