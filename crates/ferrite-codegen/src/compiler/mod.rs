// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler backend.
//!
//! Lowers a bound AST into register bytecode, one function at a time, on a
//! pool of worker threads.
//!
//! # Module Structure
//!
//! - `bytecode`: Instruction set, virtual registers and labels
//! - `regalloc`: Scoped virtual register allocation
//! - `label`: Label arena and branch resolution
//! - `target`: Dynamic contexts and break/continue targets
//! - `lexenv`: Variable loads and stores through lexical environments
//! - `lreference`: Assignment targets
//! - `condition`: Conditions that branch directly
//! - `function`: Ordinary, generator and async function bodies
//! - `codegen`: Code generation from AST
//!   - `codegen::statements`: Statements and try/finally
//!   - `codegen::loops`: Loops
//!   - `codegen::switch`: Switch
//!   - `codegen::expressions`: Expressions, calls and optional chains
//!   - `codegen::destructuring`: Destructuring patterns
//! - `context`: State shared by every compile job
//! - `emitter`: Output sink and linking
//! - `scheduler`: Parallel job queue
//! - `driver`: Job carving and the public entry point
//! - `disasm`: Textual listings

pub mod bytecode;
pub mod codegen;
mod condition;
pub mod context;
pub mod disasm;
pub mod driver;
pub mod emitter;
mod function;
pub mod label;
mod lexenv;
mod lreference;
pub mod regalloc;
pub mod scheduler;
pub mod target;

pub use bytecode::{CatchEntry, Instruction, Label, OpCode, VReg};
pub use codegen::compile_function;
pub use context::CompilerContext;
pub use driver::{Compiler, SourceUnit};
pub use emitter::{CompiledFunction, CompiledProgram, LiteralBuffer, LiteralValue};
pub use scheduler::{CompileQueue, JobHandle, JobState};
