// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! State shared by all compile jobs of one compilation.

use parking_lot::Mutex;
use tracing::trace;

use crate::compiler::emitter::{CompiledProgram, Emitter, FunctionCode, LiteralBuffer, LiteralValue};
use crate::error::Result;
use crate::options::CompilerOptions;

/// Compilation-wide context.
///
/// Passed by shared reference into every job. The literal counter is the
/// only mutable state besides the emitter sink.
#[derive(Debug)]
pub struct CompilerContext {
    options: CompilerOptions,
    literal_index: Mutex<u32>,
    emitter: Emitter,
}

impl CompilerContext {
    /// Creates a context with the given options.
    pub fn new(options: CompilerOptions) -> Self {
        Self {
            options,
            literal_index: Mutex::new(0),
            emitter: Emitter::new(),
        }
    }

    /// The immutable compiler options.
    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Reserves a unique literal buffer index.
    pub fn new_literal_index(&self) -> u32 {
        let mut next = self.literal_index.lock();
        let index = *next;
        *next += 1;
        index
    }

    /// Stores a literal buffer under a fresh index and returns it.
    pub fn add_literal_buffer(&self, values: Vec<LiteralValue>) -> u32 {
        let index = self.new_literal_index();
        trace!(index, len = values.len(), "literal buffer");
        self.emitter.add_literal_buffer(LiteralBuffer { index, values });
        index
    }

    /// Appends the output of a finished function.
    pub fn add_function(&self, code: FunctionCode) {
        self.emitter.add_function(code);
    }

    /// The output sink.
    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    /// Links everything emitted so far into a program.
    pub fn finalize(self) -> Result<CompiledProgram> {
        self.emitter.finalize()
    }

    /// Functions emitted so far, unlinked. Used to inspect partial output
    /// after a failed compilation.
    pub fn drain_functions(&self) -> Vec<FunctionCode> {
        self.emitter.drain_functions()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_literal_indices_unique_across_threads() {
        let ctx = Arc::new(CompilerContext::new(CompilerOptions::default()));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let ctx = Arc::clone(&ctx);
                std::thread::spawn(move || (0..100).map(|_| ctx.new_literal_index()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u32> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_literal_buffers_survive_finalize() {
        let ctx = CompilerContext::new(CompilerOptions::default());
        let a = ctx.add_literal_buffer(vec![LiteralValue::Integer(1)]);
        let b = ctx.add_literal_buffer(vec![LiteralValue::String("x".into())]);
        let program = ctx.finalize().unwrap();
        assert_eq!(program.literal_buffers.len(), 2);
        assert_eq!(program.literal_buffers[0].index, a.min(b));
    }
}
