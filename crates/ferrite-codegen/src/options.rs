// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiler configuration.

use serde::{Deserialize, Serialize};

/// Default size of a function's register window.
pub const DEFAULT_MAX_REGISTERS: u32 = 65_535;

/// How compile jobs are carved out of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompileMode {
    /// One job per function
    #[default]
    PerFunction,
    /// One job per source file, compiling all of its functions in order
    Merge,
}

/// Options shared read-only by every compile job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Emit scope-info literal buffers with every environment
    pub debug_info: bool,

    /// Job granularity
    pub mode: CompileMode,

    /// Worker threads, the calling thread included
    pub threads: usize,

    /// Register window of a single function
    pub max_registers: u32,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            debug_info: false,
            mode: CompileMode::PerFunction,
            threads: num_cpus::get(),
            max_registers: DEFAULT_MAX_REGISTERS,
        }
    }
}

impl CompilerOptions {
    /// Options with debug info enabled.
    pub fn debug() -> Self {
        Self {
            debug_info: true,
            ..Self::default()
        }
    }

    /// Whether jobs are per file.
    pub fn is_merge(&self) -> bool {
        self.mode == CompileMode::Merge
    }
}
