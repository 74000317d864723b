// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! A [`CodeGen`] lowers exactly one function (or the top level of a unit)
//! and is owned by a single compile job. Nested functions are only
//! referenced through `DefineFunction`; each of them is compiled by its own
//! generator.

mod class;
mod destructuring;
mod expressions;
mod loops;
mod statements;
mod switch;

#[cfg(test)]
mod tests;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::ast::*;
use crate::binder::{
    DeclKind, FUNC_VAR, FunctionId, NEW_TARGET_VAR, ScopeId, ScopeTree, Storage, THIS_VAR, VarId,
};
use crate::compiler::bytecode::{Bytecode, CatchEntry, Label, OpCode, VReg};
use crate::compiler::context::CompilerContext;
use crate::compiler::emitter::FunctionCode;
use crate::compiler::function::FunctionBuilder;
use crate::compiler::label::LabelArena;
use crate::compiler::lreference::LReference;
use crate::compiler::regalloc::RegAllocator;
use crate::compiler::target::{DynamicContext, RegionId};
use crate::error::{Error, Result};

/// Registers reserved ahead of the formal parameters: callee,
/// `new.target` and `this`.
pub const MANDATORY_PARAMS: u32 = 3;

/// A protected instruction range and its handler.
///
/// A region may be split into several ranges when abrupt exits inline
/// cleanup code that must not be covered by the region's own handler.
#[derive(Debug)]
pub(crate) struct CatchRegion {
    handler: Label,
    open: Option<Label>,
    ranges: Vec<(Label, Label)>,
    depth: u32,
}

/// State of the optional chain being compiled.
#[derive(Debug, Default)]
pub(crate) struct ChainState {
    /// Short-circuit target, allocated by the first `?.` hop
    pub(crate) nullish: Option<Label>,
}

/// Per-function code generator.
pub struct CodeGen<'a> {
    pub(crate) ctx: &'a CompilerContext,
    pub(crate) tree: &'a ScopeTree,
    pub(crate) code: Bytecode,
    pub(crate) labels: LabelArena,
    pub(crate) regs: RegAllocator,
    pub(crate) regions: Vec<CatchRegion>,
    pub(crate) contexts: Vec<DynamicContext<'a>>,
    pub(crate) scope: ScopeId,
    pub(crate) var_regs: FxHashMap<VarId, VReg>,
    pub(crate) builder: FunctionBuilder,
    pub(crate) pos: Position,
    /// User labels waiting for the loop or switch they are attached to
    pub(crate) pending_labels: Vec<String>,
    pub(crate) chain: Option<ChainState>,
    last_label_at: Option<u32>,
}

/// Compiles one function of `program` (or its top level when `func` is
/// `None`) and appends the result to the context's emitter.
pub fn compile_function<'a>(
    ctx: &'a CompilerContext,
    tree: &'a ScopeTree,
    unit: u32,
    program: &'a Program,
    func: Option<&'a Function>,
) -> Result<()> {
    let mut cg = CodeGen::new(ctx, tree, program.scope);
    cg.generate(program, func)?;

    let (id, name, kind) = match func {
        Some(func) => (
            func.id,
            match &func.name {
                Some(name) => name.name.clone(),
                None => format!("<anonymous#{}>", func.id.0),
            },
            func.kind(),
        ),
        None => (FunctionId::TOP_LEVEL, "<main>".to_string(), FunctionKind::Ordinary),
    };
    let param_count = MANDATORY_PARAMS + func.map_or(0, |func| func.params.len() as u32);
    let code = cg.finish(unit, id, name, kind, param_count)?;
    trace!(
        function = %code.name,
        instructions = code.instructions.len(),
        registers = code.register_count,
        "function compiled"
    );
    ctx.add_function(code);
    Ok(())
}

impl<'a> CodeGen<'a> {
    /// Creates a generator positioned in `scope`.
    pub fn new(ctx: &'a CompilerContext, tree: &'a ScopeTree, scope: ScopeId) -> Self {
        Self {
            ctx,
            tree,
            code: Bytecode::new(),
            labels: LabelArena::new(),
            regs: RegAllocator::new(ctx.options().max_registers),
            regions: Vec::new(),
            contexts: Vec::new(),
            scope,
            var_regs: FxHashMap::default(),
            builder: FunctionBuilder::Ordinary,
            pos: Position::default(),
            pending_labels: Vec::new(),
            chain: None,
            last_label_at: None,
        }
    }

    // ========================================================================
    // Emission primitives
    // ========================================================================

    /// Appends an instruction at the current source position.
    pub(crate) fn emit(&mut self, opcode: OpCode) {
        self.code.emit(opcode, self.pos);
    }

    /// Allocates a fresh label.
    pub(crate) fn new_label(&mut self) -> Label {
        self.labels.alloc()
    }

    /// Binds `label` to the next instruction.
    pub(crate) fn set_label(&mut self, label: Label) -> Result<()> {
        self.bind_boundary(label)?;
        self.last_label_at = Some(self.code.cursor());
        Ok(())
    }

    /// Binds a label that only delimits a region. Unlike branch targets it
    /// does not make the next instruction reachable.
    fn bind_boundary(&mut self, label: Label) -> Result<()> {
        let offset = self.code.cursor();
        self.labels.bind(label, offset).map_err(|err| err.at(self.pos))
    }

    /// Allocates a register in the current register scope.
    pub(crate) fn alloc_reg(&mut self) -> Result<VReg> {
        self.regs.alloc().map_err(|err| err.at(self.pos))
    }

    /// Runs `f` inside a register scope.
    pub(crate) fn reg_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let scope = self.regs.enter();
        let result = f(self);
        self.regs.leave(scope);
        result
    }

    /// Whether control can reach the next instruction.
    pub(crate) fn is_reachable(&self) -> bool {
        match self.code.last() {
            None => true,
            Some(op) => !op.is_terminator() || self.last_label_at == Some(self.code.cursor()),
        }
    }

    /// Loads an integer into the accumulator.
    pub(crate) fn load_int(&mut self, value: i32) {
        self.emit(OpCode::LdaInt(value));
    }

    // ========================================================================
    // Protected regions
    // ========================================================================

    /// Reserves a region for `handler` without opening it.
    pub(crate) fn alloc_region(&mut self, handler: Label) -> RegionId {
        let depth = self.regions.iter().filter(|region| region.open.is_some()).count() as u32;
        self.regions.push(CatchRegion {
            handler,
            open: None,
            ranges: Vec::new(),
            depth,
        });
        RegionId(self.regions.len() - 1)
    }

    /// Starts a new range of `region` at the current position.
    pub(crate) fn reopen_region(&mut self, region: RegionId) -> Result<()> {
        let begin = self.new_label();
        self.bind_boundary(begin)?;
        self.regions[region.0].open = Some(begin);
        Ok(())
    }

    /// Allocates and opens a region.
    pub(crate) fn open_region(&mut self, handler: Label) -> Result<RegionId> {
        let region = self.alloc_region(handler);
        self.reopen_region(region)?;
        Ok(region)
    }

    /// Ends the open range of `region` at the current position.
    pub(crate) fn close_region(&mut self, region: RegionId) -> Result<()> {
        let Some(begin) = self.regions[region.0].open.take() else {
            return Ok(());
        };
        let end = self.new_label();
        self.bind_boundary(end)?;
        self.regions[region.0].ranges.push((begin, end));
        Ok(())
    }

    // ========================================================================
    // Dynamic contexts
    // ========================================================================

    /// Runs `f` with `context` pushed.
    pub(crate) fn with_context<T>(
        &mut self,
        context: DynamicContext<'a>,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.contexts.push(context);
        let result = f(self);
        self.contexts.pop();
        result
    }

    /// Aborts every context above `depth`, innermost first: environments are
    /// popped, finalizers inlined and for-of iterators closed. Returns the
    /// regions that were split and must be reopened once the exit
    /// instruction is emitted.
    pub(crate) fn unwind(&mut self, depth: usize) -> Result<Vec<RegionId>> {
        let crossed: Vec<DynamicContext<'a>> = self.contexts[depth..].to_vec();
        let mut split = Vec::new();

        let mut result = Ok(());
        for context in crossed.iter().rev() {
            self.contexts.pop();
            result = self.abort_context(context, &mut split);
            if result.is_err() {
                break;
            }
        }

        self.contexts.truncate(depth);
        self.contexts.extend(crossed);
        result.map(|()| split)
    }

    fn abort_context(&mut self, context: &DynamicContext<'a>, split: &mut Vec<RegionId>) -> Result<()> {
        match context {
            DynamicContext::LexEnv => self.emit(OpCode::PopLexEnv),
            DynamicContext::Target { iterator, .. } => {
                if let Some((iter, region)) = *iterator {
                    self.close_iterator(iter, region, split)?;
                }
            }
            DynamicContext::Try { regions, finalizer } => {
                for &region in regions {
                    if self.regions[region.0].open.is_some() {
                        self.close_region(region)?;
                        split.push(region);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.compile_block(finalizer)?;
                }
            }
        }
        Ok(())
    }

    /// Closes a for-of iterator outside of its close handler's region.
    pub(crate) fn close_iterator(&mut self, iter: VReg, region: RegionId, split: &mut Vec<RegionId>) -> Result<()> {
        if self.regions[region.0].open.is_some() {
            self.close_region(region)?;
            split.push(region);
        }
        self.emit(OpCode::CloseIterator { iter });
        Ok(())
    }

    /// Reopens regions split by [`CodeGen::unwind`].
    pub(crate) fn reopen_regions(&mut self, split: Vec<RegionId>) -> Result<()> {
        for region in split.into_iter().rev() {
            self.reopen_region(region)?;
        }
        Ok(())
    }

    /// Returns the accumulator from the function, running every pending
    /// finalizer and iterator close on the way out.
    pub(crate) fn emit_return(&mut self) -> Result<()> {
        let builder = self.builder;
        if self.contexts.is_empty() {
            return builder.explicit_return(self);
        }
        self.reg_scope(|cg| {
            let value = cg.alloc_reg()?;
            cg.emit(OpCode::Sta(value));
            let split = cg.unwind(0)?;
            cg.emit(OpCode::Lda(value));
            builder.explicit_return(cg)?;
            cg.reopen_regions(split)
        })
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    /// Runs `f` inside a block-level scope: the environment is created if
    /// the scope needs one, registers are assigned to its register-stored
    /// bindings and its declarations are hoisted from `body`.
    pub(crate) fn with_scope<T>(
        &mut self,
        scope: ScopeId,
        body: &[&'a [Statement]],
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.scope, scope);
        let reg_scope = self.regs.enter();
        let needs_env = self.tree.scope(scope).needs_environment;

        let result = (|| {
            if needs_env {
                self.emit_new_env(scope);
                self.contexts.push(DynamicContext::LexEnv);
            }
            let result = self
                .alloc_scope_registers(scope)
                .and_then(|()| self.init_bindings(scope, None))
                .and_then(|()| {
                    body.iter()
                        .try_for_each(|stmts| self.hoist_functions(stmts))
                })
                .and_then(|()| f(self));
            if needs_env {
                self.contexts.pop();
                self.emit(OpCode::PopLexEnv);
            }
            result
        })();

        self.regs.leave(reg_scope);
        self.scope = saved;
        result
    }

    /// Assigns a register to every register-stored binding of `scope`
    /// that does not have one yet.
    fn alloc_scope_registers(&mut self, scope: ScopeId) -> Result<()> {
        for (id, var) in self.tree.declared(scope) {
            if var.storage == Storage::Register && !self.var_regs.contains_key(&id) {
                let reg = self.alloc_reg()?;
                self.var_regs.insert(id, reg);
            }
        }
        Ok(())
    }

    /// Makes the value of `reg` the initial value of `var`.
    fn bind_register_value(&mut self, var: VarId, reg: VReg) -> Result<()> {
        match self.tree.variable(var).storage {
            Storage::Register => {
                self.var_regs.insert(var, reg);
            }
            Storage::Lexical { slot } => {
                self.emit(OpCode::Lda(reg));
                self.emit(OpCode::StLexVar { level: 0, slot });
            }
            Storage::Global => {
                return Err(Error::internal(format!(
                    "'{}' cannot live in a global binding",
                    self.tree.variable(var).name
                )));
            }
        }
        Ok(())
    }

    /// Stores the accumulator into a binding of the current scope.
    fn init_binding(&mut self, var: VarId) -> Result<()> {
        let variable = self.tree.variable(var);
        match variable.storage {
            Storage::Register => {
                let reg = self.var_register(var)?;
                self.emit(OpCode::Sta(reg));
            }
            Storage::Lexical { slot } => self.emit(OpCode::StLexVar { level: 0, slot }),
            Storage::Global => self.emit(OpCode::StGlobalVar(variable.name.clone())),
        }
        Ok(())
    }

    /// Register assigned to a register-stored binding.
    pub(crate) fn var_register(&self, var: VarId) -> Result<VReg> {
        self.var_regs.get(&var).copied().ok_or_else(|| {
            Error::internal(format!(
                "no register assigned to '{}'",
                self.tree.variable(var).name
            ))
            .at(self.pos)
        })
    }

    // ========================================================================
    // Hoisting
    // ========================================================================

    /// Gives every binding of `scope` its initial value: `undefined` for
    /// `var`, the hole for environment-stored lexical bindings, the arguments
    /// object for `arguments` and the callee for a function's own name.
    fn init_bindings(&mut self, scope: ScopeId, own_name: Option<&str>) -> Result<()> {
        let declared: Vec<VarId> = self.tree.scope(scope).declared.clone();
        for var in declared {
            let variable = self.tree.variable(var);
            match (variable.kind, variable.storage) {
                (DeclKind::Mandatory, _) if variable.name == "arguments" => {
                    self.emit(OpCode::GetUnmappedArgs);
                    self.init_binding(var)?;
                }
                (DeclKind::Function, _) if own_name == Some(variable.name.as_str()) => {
                    self.emit(OpCode::Lda(VReg(0)));
                    self.init_binding(var)?;
                }
                (DeclKind::Var, Storage::Register | Storage::Lexical { .. }) => {
                    self.emit(OpCode::LdaUndefined);
                    self.init_binding(var)?;
                }
                (DeclKind::Let | DeclKind::Const | DeclKind::Class, Storage::Lexical { .. }) => {
                    self.emit(OpCode::LdaHole);
                    self.init_binding(var)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Instantiates the function declarations of a statement list.
    fn hoist_functions(&mut self, stmts: &'a [Statement]) -> Result<()> {
        for stmt in stmts {
            if let Statement::FunctionDeclaration(func) = stmt {
                let Some(name) = &func.name else {
                    continue;
                };
                self.pos = func.pos;
                self.define_function(func);
                let found = self.tree.find(self.scope, &name.name);
                self.store_resolved(&name.name, found, true)?;
            }
        }
        Ok(())
    }

    /// Emits the closure creation for `func`.
    pub(crate) fn define_function(&mut self, func: &Function) {
        self.emit(OpCode::DefineFunction {
            function: func.id,
            name: func.display_name().to_string(),
            length: func.formal_length() as u32,
        });
    }

    // ========================================================================
    // Function body
    // ========================================================================

    fn generate(&mut self, program: &'a Program, func: Option<&'a Function>) -> Result<()> {
        self.regs.alloc_n(MANDATORY_PARAMS)?;
        let params: &'a [PatternElement] = func.map_or(&[], |func| func.params.as_slice());
        let first_param = self.regs.alloc_n(params.len() as u32)?;

        let scope = func.map_or(program.scope, |func| func.scope);
        self.scope = scope;
        if let Some(func) = func {
            self.pos = func.pos;
        }
        self.builder = FunctionBuilder::create(self, func)?;

        if self.tree.scope(scope).needs_environment {
            self.emit_new_env(scope);
        }

        for (index, name) in [FUNC_VAR, NEW_TARGET_VAR, THIS_VAR].into_iter().enumerate() {
            if let Some(&var) = self.tree.scope(scope).bindings.get(name) {
                self.bind_register_value(var, VReg(index as u16))?;
            }
        }

        for (index, param) in params.iter().enumerate() {
            if let (Some(ident), None) = (param.target.as_identifier(), &param.default) {
                if let Some(&var) = self.tree.scope(scope).bindings.get(&ident.name) {
                    self.bind_register_value(var, VReg(first_param.0 + index as u16))?;
                }
            }
        }

        self.alloc_scope_registers(scope)?;

        let body: &'a [Statement] = match func.map(|func| &func.body) {
            None => &program.body,
            Some(FunctionBody::Block(body)) => body,
            Some(FunctionBody::Expression(_)) => &[],
        };
        let own_name = func
            .and_then(|func| func.name.as_ref())
            .map(|name| name.name.as_str())
            .filter(|name| !declares_function(body, name));
        self.init_bindings(scope, own_name)?;

        for (index, param) in params.iter().enumerate() {
            if matches!((&param.target, &param.default), (Pattern::Identifier(_), None)) {
                continue;
            }
            let reg = VReg(first_param.0 + index as u16);
            self.reg_scope(|cg| {
                let reference = LReference::create(cg, &param.target, true)?;
                cg.emit(OpCode::Lda(reg));
                cg.apply_default(param.default.as_ref())?;
                reference.set_value(cg)
            })?;
        }
        if let Some(rest) = func.and_then(|func| func.rest.as_ref()) {
            self.reg_scope(|cg| {
                let reference = LReference::create(cg, rest, true)?;
                cg.emit(OpCode::CopyRestArgs(params.len() as u32));
                reference.set_value(cg)
            })?;
        }

        let builder = self.builder;
        builder.prepare(self)?;
        self.hoist_functions(body)?;

        match func.map(|func| &func.body) {
            Some(FunctionBody::Expression(expr)) => {
                self.compile_expression(expr)?;
                self.emit_return()?;
            }
            _ => {
                for stmt in body {
                    self.compile_statement(stmt)?;
                }
            }
        }

        if self.is_reachable() {
            builder.implicit_return(self)?;
        }
        builder.clean_up(self)
    }

    /// Resolves labels and regions and packages the function.
    fn finish(
        self,
        unit: u32,
        id: FunctionId,
        name: String,
        kind: FunctionKind,
        param_count: u32,
    ) -> Result<FunctionCode> {
        let label_offsets = self.labels.resolve()?;

        if let Some(region) = self.regions.iter().find(|region| region.open.is_some()) {
            return Err(Error::internal(format!(
                "protected region for handler {} left open in '{}'",
                region.handler, name
            )));
        }

        let mut catch_table: Vec<CatchEntry> = self
            .regions
            .iter()
            .flat_map(|region| {
                region.ranges.iter().map(|&(try_begin, try_end)| CatchEntry {
                    try_begin,
                    try_end,
                    handler: region.handler,
                    depth: region.depth,
                })
            })
            .collect();
        catch_table.sort_by(|a, b| b.depth.cmp(&a.depth));

        Ok(FunctionCode {
            unit,
            id,
            name,
            kind,
            instructions: self.code.instructions,
            label_offsets,
            catch_table,
            register_count: self.regs.total(),
            param_count,
        })
    }
}

fn declares_function(body: &[Statement], name: &str) -> bool {
    body.iter().any(|stmt| {
        matches!(stmt, Statement::FunctionDeclaration(func)
            if func.name.as_ref().is_some_and(|id| id.name == name))
    })
}
