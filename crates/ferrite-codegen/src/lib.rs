// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # ferrite-codegen
//!
//! Register bytecode compiler backend for a JavaScript-like language.
//!
//! ## Overview
//!
//! This crate lowers an already parsed and validated syntax tree into an
//! accumulator-plus-register bytecode:
//! - Scope analysis deciding register or environment storage
//! - Per-function code generation with scoped register allocation
//! - Structured control flow over labels, including `try`/`finally` and
//!   iterator closing on abrupt exits
//! - Generator and async function bodies as suspend/resume patterns
//! - Parallel compilation, one job per function or per source unit
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrite_codegen::{ast::build::*, Compiler, CompilerOptions};
//!
//! let program = script(vec![let_decl("x", Some(num(1.0)))]);
//! let compiled = Compiler::new(CompilerOptions::default()).compile(program)?;
//! println!("{}", compiled);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod binder;
pub mod compiler;
pub mod error;
pub mod options;

// Re-exports for convenience
pub use compiler::{CompiledFunction, CompiledProgram, Compiler, CompilerContext, SourceUnit};
pub use error::{Error, ErrorKind, Result};
pub use options::{CompileMode, CompilerOptions};
