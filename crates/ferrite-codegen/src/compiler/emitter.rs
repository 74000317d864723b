// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Output sink and final linking.
//!
//! Jobs push finished functions into lock-free queues in whatever order they
//! complete. [`Emitter::finalize`] drains the queues, restores a
//! deterministic order and links every function: catch regions are
//! resolved to instruction offsets and every branch is checked against the
//! label table.

use crossbeam::queue::SegQueue;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::FunctionKind;
use crate::binder::FunctionId;
use crate::compiler::bytecode::{CatchEntry, Instruction, Label};
use crate::error::{Error, Result};

/// A value stored in a literal buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    /// Small integer
    Integer(u32),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Boolean
    Boolean(bool),
    /// null
    Null,
    /// undefined
    Undefined,
}

/// A literal buffer referenced by index from instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiteralBuffer {
    /// Compilation-wide index
    pub index: u32,
    /// Values
    pub values: Vec<LiteralValue>,
}

/// Output of one function's code generation, before linking.
#[derive(Debug, Clone)]
pub struct FunctionCode {
    /// Index of the source unit
    pub unit: u32,
    /// Function index within the unit
    pub id: FunctionId,
    /// Display name
    pub name: String,
    /// Function flavour
    pub kind: FunctionKind,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
    /// Label to instruction offset table
    pub label_offsets: Vec<u32>,
    /// Protected regions, innermost first
    pub catch_table: Vec<CatchEntry>,
    /// Frame size
    pub register_count: u32,
    /// Mandatory plus formal parameters
    pub param_count: u32,
}

/// A linked function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledFunction {
    /// Index of the source unit
    pub unit: u32,
    /// Function index within the unit
    pub id: FunctionId,
    /// Display name
    pub name: String,
    /// Function flavour
    pub kind: FunctionKind,
    /// Instruction stream
    pub instructions: Vec<Instruction>,
    /// Label to instruction offset table
    pub label_offsets: Vec<u32>,
    /// Protected regions as instruction offsets, innermost first
    pub catch_table: Vec<CatchEntry<u32>>,
    /// Frame size
    pub register_count: u32,
    /// Mandatory plus formal parameters
    pub param_count: u32,
}

impl CompiledFunction {
    /// Instruction offset of a label.
    pub fn label_offset(&self, label: Label) -> Option<u32> {
        self.label_offsets.get(label.0 as usize).copied()
    }
}

/// The result of a successful compilation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompiledProgram {
    /// Functions ordered by unit, then by function index
    pub functions: Vec<CompiledFunction>,
    /// Literal buffers ordered by index
    pub literal_buffers: Vec<LiteralBuffer>,
}

impl CompiledProgram {
    /// Looks a function up by display name.
    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|func| func.name == name)
    }

    /// Looks a literal buffer up by index.
    pub fn literal_buffer(&self, index: u32) -> Option<&LiteralBuffer> {
        self.literal_buffers
            .binary_search_by_key(&index, |buffer| buffer.index)
            .ok()
            .map(|pos| &self.literal_buffers[pos])
    }
}

/// Concurrent output sink.
#[derive(Debug, Default)]
pub struct Emitter {
    functions: SegQueue<FunctionCode>,
    literals: SegQueue<LiteralBuffer>,
}

impl Emitter {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finished function.
    pub fn add_function(&self, code: FunctionCode) {
        self.functions.push(code);
    }

    /// Appends a literal buffer.
    pub fn add_literal_buffer(&self, buffer: LiteralBuffer) {
        self.literals.push(buffer);
    }

    /// Number of functions appended and not yet drained.
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether no function is pending.
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Removes every pending function, in completion order.
    pub fn drain_functions(&self) -> Vec<FunctionCode> {
        std::iter::from_fn(|| self.functions.pop()).collect()
    }

    /// Drains the sink and links the result.
    pub fn finalize(&self) -> Result<CompiledProgram> {
        let mut functions = self.drain_functions();
        functions.sort_by_key(|func| (func.unit, func.id));

        let mut literal_buffers: Vec<LiteralBuffer> = std::iter::from_fn(|| self.literals.pop()).collect();
        literal_buffers.sort_by_key(|buffer| buffer.index);

        #[cfg(feature = "parallel")]
        let functions: Result<Vec<CompiledFunction>> = {
            use rayon::prelude::*;
            functions.into_par_iter().map(link).collect()
        };
        #[cfg(not(feature = "parallel"))]
        let functions: Result<Vec<CompiledFunction>> = functions.into_iter().map(link).collect();
        let functions = functions?;

        debug!(
            functions = functions.len(),
            literal_buffers = literal_buffers.len(),
            "linked program"
        );
        Ok(CompiledProgram {
            functions,
            literal_buffers,
        })
    }
}

fn link(code: FunctionCode) -> Result<CompiledFunction> {
    let end = code.instructions.len() as u32;
    let offset = |label: Label| -> Result<u32> {
        match code.label_offsets.get(label.0 as usize) {
            Some(&offset) if offset <= end => Ok(offset),
            _ => Err(Error::internal(format!(
                "function '{}' branches to unresolved label {}",
                code.name, label
            ))),
        }
    };

    for insn in &code.instructions {
        if let Some(label) = insn.opcode.branch_target() {
            offset(label).map_err(|err| err.at(insn.pos))?;
        }
    }

    let mut catch_table = Vec::with_capacity(code.catch_table.len());
    for entry in &code.catch_table {
        let try_begin = offset(entry.try_begin)?;
        let try_end = offset(entry.try_end)?;
        if try_begin == try_end {
            continue;
        }
        catch_table.push(CatchEntry {
            try_begin,
            try_end,
            handler: offset(entry.handler)?,
            depth: entry.depth,
        });
    }

    Ok(CompiledFunction {
        unit: code.unit,
        id: code.id,
        name: code.name,
        kind: code.kind,
        instructions: code.instructions,
        label_offsets: code.label_offsets,
        catch_table,
        register_count: code.register_count,
        param_count: code.param_count,
    })
}
