// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loop compilation.
//!
//! ### For Loop
//!
//! ```text
//! for (let i = 0; i < n; i++) { body }
//!
//! Bytecode:
//!   NewLexEnv                    ; only when a binding is captured
//!   [init bytecode]
//! start:
//!   [test bytecode]
//!   Jfalse -> end
//!   [body bytecode]
//! continue:
//!   [copy environment]           ; fresh bindings for the next iteration
//!   [update bytecode]
//!   Jmp -> start
//! end:
//!   PopLexEnv
//! ```
//!
//! ### For-Of Loop
//!
//! ```text
//! for (const x of iterable) { body }
//!
//! Bytecode:
//!   [iterable bytecode]
//!   GetIterator
//!   Sta iter
//! start:
//!   IteratorNext iter
//!   Sta result
//!   IteratorComplete result
//!   Jtrue -> end
//!   IteratorValue result
//!   Sta value
//!   [bind x, body bytecode]      ; covered by the close region
//!   Jmp -> start
//! close:
//!   Sta exc
//!   CloseIterator iter
//!   Lda exc
//!   Throw
//! end:
//! ```

use crate::ast::*;
use crate::compiler::bytecode::{OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::lreference::LReference;
use crate::compiler::target::{DynamicContext, LabelTarget};
use crate::error::{Error, Result};

impl<'a> CodeGen<'a> {
    pub(crate) fn compile_while(&mut self, stmt: &'a WhileStatement) -> Result<()> {
        let names = self.take_labels();
        let start = self.new_label();
        let end = self.new_label();

        self.set_label(start)?;
        self.compile_condition(&stmt.test, end)?;
        let context = DynamicContext::Target {
            target: LabelTarget::for_loop(end, start, names),
            iterator: None,
        };
        self.with_context(context, |cg| cg.compile_statement(&stmt.body))?;
        self.emit(OpCode::Jmp(start));
        self.set_label(end)
    }

    pub(crate) fn compile_do_while(&mut self, stmt: &'a DoWhileStatement) -> Result<()> {
        let names = self.take_labels();
        let start = self.new_label();
        let cont = self.new_label();
        let end = self.new_label();

        self.set_label(start)?;
        let context = DynamicContext::Target {
            target: LabelTarget::for_loop(end, cont, names),
            iterator: None,
        };
        self.with_context(context, |cg| cg.compile_statement(&stmt.body))?;
        self.set_label(cont)?;
        self.compile_condition(&stmt.test, end)?;
        self.emit(OpCode::Jmp(start));
        self.set_label(end)
    }

    pub(crate) fn compile_for(&mut self, stmt: &'a ForStatement) -> Result<()> {
        let names = self.take_labels();
        let per_iteration = self.tree.scope(stmt.scope).needs_environment;

        self.with_scope(stmt.scope, &[], |cg| {
            match &stmt.init {
                Some(ForInit::Declaration(decl)) => cg.compile_variable_declaration(decl)?,
                Some(ForInit::Expression(expr)) => cg.compile_expression(expr)?,
                None => {}
            }

            let start = cg.new_label();
            let cont = cg.new_label();
            let end = cg.new_label();

            cg.set_label(start)?;
            if let Some(test) = &stmt.test {
                cg.compile_condition(test, end)?;
            }
            let context = DynamicContext::Target {
                target: LabelTarget::for_loop(end, cont, names),
                iterator: None,
            };
            cg.with_context(context, |cg| cg.compile_statement(&stmt.body))?;

            cg.set_label(cont)?;
            if per_iteration {
                cg.copy_per_iteration_env(stmt.scope)?;
            }
            if let Some(update) = &stmt.update {
                cg.compile_expression(update)?;
            }
            cg.emit(OpCode::Jmp(start));
            cg.set_label(end)
        })
    }

    pub(crate) fn compile_for_in(&mut self, stmt: &'a ForInStatement) -> Result<()> {
        let names = self.take_labels();

        self.reg_scope(|cg| {
            let iter = cg.alloc_reg()?;
            let key = cg.alloc_reg()?;
            cg.compile_expression(&stmt.right)?;
            cg.emit(OpCode::GetPropIterator);
            cg.emit(OpCode::Sta(iter));

            let start = cg.new_label();
            let end = cg.new_label();
            cg.set_label(start)?;
            cg.emit(OpCode::GetNextPropName { iter });
            cg.emit(OpCode::Jundefined(end));
            cg.emit(OpCode::Sta(key));

            let context = DynamicContext::Target {
                target: LabelTarget::for_loop(end, start, names),
                iterator: None,
            };
            cg.with_context(context, |cg| {
                cg.with_scope(stmt.scope, &[], |cg| {
                    cg.assign_loop_variable(&stmt.left, key)?;
                    cg.compile_statement(&stmt.body)
                })
            })?;
            cg.emit(OpCode::Jmp(start));
            cg.set_label(end)
        })
    }

    pub(crate) fn compile_for_of(&mut self, stmt: &'a ForOfStatement) -> Result<()> {
        let names = self.take_labels();

        self.reg_scope(|cg| {
            let iter = cg.alloc_reg()?;
            let result = cg.alloc_reg()?;
            let value = cg.alloc_reg()?;
            cg.compile_expression(&stmt.right)?;
            cg.emit(OpCode::GetIterator);
            cg.emit(OpCode::Sta(iter));

            let start = cg.new_label();
            let end = cg.new_label();
            let close = cg.new_label();
            cg.set_label(start)?;
            cg.emit(OpCode::IteratorNext { iter });
            cg.emit(OpCode::Sta(result));
            cg.emit(OpCode::IteratorComplete { result });
            cg.emit(OpCode::Jtrue(end));
            cg.emit(OpCode::IteratorValue { result });
            cg.emit(OpCode::Sta(value));

            let region = cg.open_region(close)?;
            let context = DynamicContext::Target {
                target: LabelTarget::for_loop(end, start, names),
                iterator: Some((iter, region)),
            };
            cg.with_context(context, |cg| {
                cg.with_scope(stmt.scope, &[], |cg| {
                    cg.assign_loop_variable(&stmt.left, value)?;
                    cg.compile_statement(&stmt.body)
                })
            })?;
            cg.close_region(region)?;
            cg.emit(OpCode::Jmp(start));

            cg.set_label(close)?;
            cg.reg_scope(|cg| {
                let exception = cg.alloc_reg()?;
                cg.emit(OpCode::Sta(exception));
                cg.emit(OpCode::CloseIterator { iter });
                cg.emit(OpCode::Lda(exception));
                cg.emit(OpCode::Throw);
                Ok(())
            })?;
            cg.set_label(end)
        })
    }

    /// Binds the head of a for-in/for-of loop to the value in `value`.
    fn assign_loop_variable(&mut self, left: &'a ForInLeft, value: VReg) -> Result<()> {
        let (pattern, is_declaration) = match left {
            ForInLeft::Declaration(decl) => match decl.declarations.first() {
                Some(declarator) => (&declarator.id, true),
                None => return Err(Error::internal("loop declaration without a binding").at(decl.pos)),
            },
            ForInLeft::Pattern(pattern) => (pattern, false),
        };
        self.reg_scope(|cg| {
            let reference = LReference::create(cg, pattern, is_declaration)?;
            cg.emit(OpCode::Lda(value));
            reference.set_value(cg)
        })
    }
}
