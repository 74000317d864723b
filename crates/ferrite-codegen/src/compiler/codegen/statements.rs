// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation.
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `var/let/const` | `Sta`, `StLexVar`, `StLetToGlobalRecord` | Storage decided by the binder |
//! | `class` | `DefineClassWithBuffer` | Lowered in `class.rs` |
//! | `if/else` | `Jfalse`, `Jmp` | Conditions branch directly |
//! | `try/catch/finally` | protected regions | Finalizers are inlined on every exit |
//! | `return` | `Return` | Goes through the function builder |
//! | `break/continue` | `Jmp` | Unwinds the dynamic-context stack first |
//! | labeled | `Jmp` | Labels attach to the next loop or switch |
//!
//! Loops live in `loops.rs`, `switch` in `switch.rs`.
//!
//! ## Try Statement
//!
//! ```text
//! try { block } catch (e) { handler } finally { finalizer }
//!
//! Bytecode:
//!   [block bytecode]             ; covered by the catch and finally regions
//!   [finalizer bytecode]
//!   Jmp -> after
//! catch_handler:
//!   Sta exc
//!   [handler bytecode]           ; covered by the finally region
//!   [finalizer bytecode]
//!   Jmp -> after
//! finally_handler:
//!   Sta exc
//!   [finalizer bytecode]
//!   Lda exc
//!   Throw
//! after:
//! ```
//!
//! A `break`, `continue` or `return` leaving the try statement closes the
//! regions, inlines the finalizer, jumps, and reopens the regions after the
//! jump, so the inlined finalizer is never covered by its own handlers.

use crate::ast::*;
use crate::compiler::bytecode::{Label, OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::lreference::LReference;
use crate::compiler::target::{DynamicContext, LabelTarget, RegionId, find_jump_target};
use crate::error::Result;

impl<'a> CodeGen<'a> {
    /// Compiles one statement.
    pub(crate) fn compile_statement(&mut self, stmt: &'a Statement) -> Result<()> {
        let pos = stmt.position();
        if pos != Position::default() {
            self.pos = pos;
        }

        match stmt {
            Statement::VariableDeclaration(decl) => self.compile_variable_declaration(decl),
            // Instantiated when the enclosing scope is entered
            Statement::FunctionDeclaration(_) => Ok(()),
            Statement::ClassDeclaration(class) => self.compile_class_declaration(class),
            Statement::Expression(stmt) => self.compile_expression(&stmt.expression),
            Statement::Block(block) => self.compile_block(block),
            Statement::If(stmt) => self.compile_if(stmt),
            Statement::Switch(stmt) => self.compile_switch(stmt),
            Statement::While(stmt) => self.compile_while(stmt),
            Statement::DoWhile(stmt) => self.compile_do_while(stmt),
            Statement::For(stmt) => self.compile_for(stmt),
            Statement::ForIn(stmt) => self.compile_for_in(stmt),
            Statement::ForOf(stmt) => self.compile_for_of(stmt),
            Statement::Return(stmt) => self.compile_return(stmt),
            Statement::Break(stmt) => self.compile_jump(stmt, false),
            Statement::Continue(stmt) => self.compile_jump(stmt, true),
            Statement::Throw(stmt) => {
                self.compile_expression(&stmt.argument)?;
                self.emit(OpCode::Throw);
                Ok(())
            }
            Statement::Try(stmt) => self.compile_try(stmt),
            Statement::Labeled(stmt) => self.compile_labeled(stmt),
            Statement::Debugger(_) => {
                self.emit(OpCode::Debugger);
                Ok(())
            }
            Statement::Empty => Ok(()),
        }
    }

    /// Compiles a block in its own scope.
    pub(crate) fn compile_block(&mut self, block: &'a BlockStatement) -> Result<()> {
        self.with_scope(block.scope, &[block.body.as_slice()], |cg| {
            for stmt in &block.body {
                cg.compile_statement(stmt)?;
            }
            Ok(())
        })
    }

    pub(crate) fn compile_variable_declaration(&mut self, decl: &'a VariableDeclaration) -> Result<()> {
        self.pos = decl.pos;
        for declarator in &decl.declarations {
            match &declarator.init {
                // Already initialized to undefined on scope entry
                None if decl.kind == VariableKind::Var => {}
                None => self.reg_scope(|cg| {
                    let reference = LReference::create(cg, &declarator.id, true)?;
                    cg.emit(OpCode::LdaUndefined);
                    reference.set_value(cg)
                })?,
                Some(init) => self.reg_scope(|cg| {
                    let reference = LReference::create(cg, &declarator.id, true)?;
                    cg.compile_expression(init)?;
                    reference.set_value(cg)
                })?,
            }
        }
        Ok(())
    }

    fn compile_if(&mut self, stmt: &'a IfStatement) -> Result<()> {
        let else_label = self.new_label();
        self.compile_condition(&stmt.test, else_label)?;
        self.compile_statement(&stmt.consequent)?;

        match &stmt.alternate {
            Some(alternate) => {
                let end = self.new_label();
                self.emit(OpCode::Jmp(end));
                self.set_label(else_label)?;
                self.compile_statement(alternate)?;
                self.set_label(end)
            }
            None => self.set_label(else_label),
        }
    }

    fn compile_return(&mut self, stmt: &'a ReturnStatement) -> Result<()> {
        match &stmt.argument {
            Some(argument) => self.compile_expression(argument)?,
            None => self.emit(OpCode::LdaUndefined),
        }
        self.emit_return()
    }

    /// `break` and `continue`, labeled or not.
    fn compile_jump(&mut self, stmt: &'a JumpStatement, is_continue: bool) -> Result<()> {
        let target = find_jump_target(&self.contexts, stmt.label.as_ref(), is_continue).map_err(|err| err.at(stmt.pos))?;
        let mut split = self.unwind(target.depth + 1)?;

        // Leaving a for-of loop closes its iterator; continuing does not
        if !is_continue {
            if let DynamicContext::Target {
                iterator: Some((iter, region)),
                ..
            } = self.contexts[target.depth]
            {
                self.close_iterator(iter, region, &mut split)?;
            }
        }

        self.emit(OpCode::Jmp(target.label));
        self.reopen_regions(split)
    }

    /// Takes the labels collected for the statement being compiled.
    pub(crate) fn take_labels(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending_labels)
    }

    fn compile_labeled(&mut self, stmt: &'a LabeledStatement) -> Result<()> {
        self.pending_labels.push(stmt.label.name.clone());
        match &*stmt.body {
            Statement::While(_)
            | Statement::DoWhile(_)
            | Statement::For(_)
            | Statement::ForIn(_)
            | Statement::ForOf(_)
            | Statement::Switch(_)
            | Statement::Labeled(_) => self.compile_statement(&stmt.body),
            body => {
                let names = self.take_labels();
                let end = self.new_label();
                let context = DynamicContext::Target {
                    target: LabelTarget::for_block(end, names),
                    iterator: None,
                };
                self.with_context(context, |cg| cg.compile_statement(body))?;
                self.set_label(end)
            }
        }
    }

    fn compile_try(&mut self, stmt: &'a TryStatement) -> Result<()> {
        let after = self.new_label();
        let finally_handler = stmt.finalizer.as_ref().map(|_| self.new_label());
        let catch_handler = stmt.handler.as_ref().map(|_| self.new_label());

        let finally_region = finally_handler.map(|handler| self.open_region(handler)).transpose()?;
        let catch_region = catch_handler.map(|handler| self.open_region(handler)).transpose()?;

        let regions: Vec<RegionId> = catch_region.into_iter().chain(finally_region).collect();
        self.with_try_context(regions, stmt.finalizer.as_ref(), |cg| cg.compile_block(&stmt.block))?;

        if let Some(region) = catch_region {
            self.close_region(region)?;
        }
        if let Some(region) = finally_region {
            self.close_region(region)?;
        }
        self.complete_normally(stmt.finalizer.as_ref(), after)?;

        if let (Some(clause), Some(handler)) = (&stmt.handler, catch_handler) {
            self.set_label(handler)?;
            if let Some(region) = finally_region {
                self.reopen_region(region)?;
            }
            self.reg_scope(|cg| {
                let exception = cg.alloc_reg()?;
                cg.emit(OpCode::Sta(exception));
                let regions: Vec<RegionId> = finally_region.into_iter().collect();
                cg.with_try_context(regions, stmt.finalizer.as_ref(), |cg| cg.compile_catch_clause(clause, exception))
            })?;
            if let Some(region) = finally_region {
                self.close_region(region)?;
            }
            self.complete_normally(stmt.finalizer.as_ref(), after)?;
        }

        if let (Some(finalizer), Some(handler)) = (&stmt.finalizer, finally_handler) {
            self.set_label(handler)?;
            self.reg_scope(|cg| {
                let exception = cg.alloc_reg()?;
                cg.emit(OpCode::Sta(exception));
                cg.compile_block(finalizer)?;
                cg.emit(OpCode::Lda(exception));
                cg.emit(OpCode::Throw);
                Ok(())
            })?;
        }

        self.set_label(after)
    }

    /// Runs `f` with a try context pushed. Abrupt exits split `regions`
    /// around the code they inline, finalizer or not, so an iterator
    /// closed on the way out is not covered by a surrounding `catch`.
    fn with_try_context(
        &mut self,
        regions: Vec<RegionId>,
        finalizer: Option<&'a BlockStatement>,
        f: impl FnOnce(&mut Self) -> Result<()>,
    ) -> Result<()> {
        self.with_context(DynamicContext::Try { regions, finalizer }, f)
    }

    /// Falls out of a try block or catch clause: runs the finalizer and
    /// jumps past the handlers.
    fn complete_normally(&mut self, finalizer: Option<&'a BlockStatement>, after: Label) -> Result<()> {
        if !self.is_reachable() {
            return Ok(());
        }
        if let Some(finalizer) = finalizer {
            self.compile_block(finalizer)?;
        }
        self.emit(OpCode::Jmp(after));
        Ok(())
    }

    fn compile_catch_clause(&mut self, clause: &'a CatchClause, exception: VReg) -> Result<()> {
        self.with_scope(clause.scope, &[clause.body.as_slice()], |cg| {
            if let Some(param) = &clause.param {
                cg.reg_scope(|cg| {
                    let reference = LReference::create(cg, param, true)?;
                    cg.emit(OpCode::Lda(exception));
                    reference.set_value(cg)
                })?;
            }
            for stmt in &clause.body {
                cg.compile_statement(stmt)?;
            }
            Ok(())
        })
    }
}
