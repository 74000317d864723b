// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compilation entry point.
//!
//! The driver carves bound source units into compile jobs, runs them on a
//! [`CompileQueue`] and links the result:
//!
//! - per-function mode: one job for the top level of each unit and one
//!   job for every nested function;
//! - merge mode: one job per unit, compiling its functions in order.
//!
//! Jobs share nothing mutable except the [`CompilerContext`], so a failing
//! job does not keep the others from running. Linking is all-or-nothing:
//! when any job failed, no [`CompiledProgram`] is produced.

use tracing::{debug, instrument};

use crate::ast::visit::collect_functions;
use crate::ast::{Function, Program};
use crate::binder::{self, ScopeTree};
use crate::compiler::codegen::compile_function;
use crate::compiler::context::CompilerContext;
use crate::compiler::emitter::CompiledProgram;
use crate::compiler::scheduler::CompileQueue;
use crate::error::{Error, Result};
use crate::options::CompilerOptions;

/// A bound program ready for compilation.
#[derive(Debug)]
pub struct SourceUnit {
    /// Name used in job names and diagnostics
    pub name: String,
    /// The program, annotated by the binder
    pub program: Program,
    /// Scopes of the program
    pub scopes: ScopeTree,
}

impl SourceUnit {
    /// Binds `program` and wraps it as a unit.
    pub fn new(name: impl Into<String>, mut program: Program) -> Result<Self> {
        let scopes = binder::bind(&mut program)?;
        Ok(Self {
            name: name.into(),
            program,
            scopes,
        })
    }
}

/// The compiler front door.
///
/// # Examples
///
/// ```rust,ignore
/// let unit = SourceUnit::new("main.js", program)?;
/// let compiled = Compiler::new(CompilerOptions::default()).compile_units(&[unit])?;
/// println!("{}", compiled);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Creates a compiler with the given options.
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    /// The options every job is compiled with.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Binds and compiles a single program.
    pub fn compile(&self, program: Program) -> Result<CompiledProgram> {
        let unit = SourceUnit::new("<main>", program)?;
        self.compile_units(std::slice::from_ref(&unit))
    }

    /// Compiles every unit and links the result.
    #[instrument(skip_all, fields(units = units.len()))]
    pub fn compile_units(&self, units: &[SourceUnit]) -> Result<CompiledProgram> {
        let ctx = CompilerContext::new(self.options.clone());
        self.compile_into(&ctx, units)?;
        ctx.finalize()
    }

    /// Runs the compile jobs of `units` against an existing context.
    ///
    /// Functions of successful jobs stay in the context even when another
    /// job fails, so partial output can be inspected through
    /// [`CompilerContext::drain_functions`].
    #[instrument(skip_all, fields(units = units.len()))]
    pub fn compile_into(&self, ctx: &CompilerContext, units: &[SourceUnit]) -> Result<()> {
        let queue = CompileQueue::new();
        let mut jobs = 0usize;

        for (index, unit) in units.iter().enumerate() {
            let unit_index =
                u32::try_from(index).map_err(|_| Error::internal("too many source units"))?;
            let functions: Vec<&Function> = collect_functions(&unit.program, unit.scopes.function_count())
                .into_iter()
                .flatten()
                .collect();

            if self.options.is_merge() {
                let name = unit.name.clone();
                queue.schedule(name, move || {
                    compile_function(ctx, &unit.scopes, unit_index, &unit.program, None)?;
                    for func in functions {
                        compile_function(ctx, &unit.scopes, unit_index, &unit.program, Some(func))?;
                    }
                    Ok(())
                });
                jobs += 1;
            } else {
                queue.schedule(format!("{}:<main>", unit.name), move || {
                    compile_function(ctx, &unit.scopes, unit_index, &unit.program, None)
                });
                jobs += 1;
                for func in functions {
                    let name = format!("{}:{}#{}", unit.name, func.display_name(), func.id.0);
                    queue.schedule(name, move || {
                        compile_function(ctx, &unit.scopes, unit_index, &unit.program, Some(func))
                    });
                    jobs += 1;
                }
            }
        }

        debug!(jobs, threads = self.options.threads, merge = self.options.is_merge(), "scheduled");
        queue.run(self.options.threads)
    }
}
