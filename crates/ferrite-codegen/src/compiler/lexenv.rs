// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Variable access.
//!
//! A resolved name is read and written according to its storage class:
//! registers directly, captured bindings through the environment chain
//! (`level` environments up, at `slot`), script globals through the global
//! object or the global lexical record. Names the binder could not resolve
//! fall back to the by-name global accessors.
//!
//! `let`/`const` and class bindings stored in an environment start out as
//! the hole; reads check for it to implement the temporal dead zone.

use crate::binder::{DeclKind, ScopeFindResult, ScopeId, Storage};
use crate::compiler::bytecode::{OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::emitter::LiteralValue;
use crate::error::Result;

impl<'a> CodeGen<'a> {
    /// Creates the environment of `scope`, with a scope-info literal
    /// buffer when debug info is on.
    pub(crate) fn emit_new_env(&mut self, scope: ScopeId) {
        let slots = self.tree.scope(scope).lexical_slots;
        if !self.ctx.options().debug_info {
            self.emit(OpCode::NewLexEnv { slots });
            return;
        }

        let mut values = vec![LiteralValue::Integer(slots)];
        for (_, var) in self.tree.declared(scope) {
            if let Storage::Lexical { slot } = var.storage {
                values.push(LiteralValue::String(var.name.clone()));
                values.push(LiteralValue::Integer(slot));
            }
        }
        let literal = self.ctx.add_literal_buffer(values);
        self.emit(OpCode::NewLexEnvWithScopeInfo { slots, literal });
    }

    /// Loads `name` into the accumulator.
    pub(crate) fn load_var(&mut self, name: &str) -> Result<()> {
        let found = self.tree.find(self.scope, name);
        self.load_resolved(name, found, false)
    }

    /// Loads `name` for `typeof`, which must not throw on unresolvable
    /// globals.
    pub(crate) fn load_var_for_typeof(&mut self, name: &str) -> Result<()> {
        let found = self.tree.find(self.scope, name);
        self.load_resolved(name, found, true)
    }

    /// Loads a resolved name into the accumulator.
    pub(crate) fn load_resolved(&mut self, name: &str, found: ScopeFindResult, for_typeof: bool) -> Result<()> {
        let Some(var) = found.variable else {
            if name == "undefined" {
                self.emit(OpCode::LdaUndefined);
            } else if for_typeof {
                self.emit(OpCode::LdGlobalVar(name.to_string()));
            } else {
                self.emit(OpCode::TryLdGlobalByName(name.to_string()));
            }
            return Ok(());
        };

        let variable = self.tree.variable(var);
        match variable.storage {
            Storage::Register => {
                let reg = self.var_register(var)?;
                self.emit(OpCode::Lda(reg));
            }
            Storage::Lexical { slot } => {
                self.emit(OpCode::LdLexVar {
                    level: found.level,
                    slot,
                });
                if variable.kind.is_lexical() {
                    self.emit(OpCode::ThrowUndefinedIfHole(name.to_string()));
                }
            }
            Storage::Global if variable.kind.is_lexical() => {
                self.emit(OpCode::TryLdGlobalByName(name.to_string()));
            }
            Storage::Global => self.emit(OpCode::LdGlobalVar(name.to_string())),
        }
        Ok(())
    }

    /// Stores the accumulator into a resolved name.
    ///
    /// Declarations initialize the binding; plain assignments check the
    /// temporal dead zone of environment-stored `let`/`const` and reject
    /// writes to constants.
    pub(crate) fn store_resolved(&mut self, name: &str, found: ScopeFindResult, is_declaration: bool) -> Result<()> {
        let Some(var) = found.variable else {
            self.emit(OpCode::TryStGlobalByName(name.to_string()));
            return Ok(());
        };

        let variable = self.tree.variable(var);
        let kind = variable.kind;
        match variable.storage {
            Storage::Register => {
                if kind == DeclKind::Const && !is_declaration {
                    self.emit(OpCode::ThrowConstAssignment(name.to_string()));
                    return Ok(());
                }
                let reg = self.var_register(var)?;
                self.emit(OpCode::Sta(reg));
            }
            Storage::Lexical { slot } => {
                if kind.is_lexical() && !is_declaration {
                    self.reg_scope(|cg| {
                        let value = cg.alloc_reg()?;
                        cg.emit(OpCode::Sta(value));
                        cg.emit(OpCode::LdLexVar {
                            level: found.level,
                            slot,
                        });
                        cg.emit(OpCode::ThrowUndefinedIfHole(name.to_string()));
                        cg.emit(OpCode::Lda(value));
                        Ok(())
                    })?;
                    if kind == DeclKind::Const {
                        self.emit(OpCode::ThrowConstAssignment(name.to_string()));
                        return Ok(());
                    }
                }
                self.emit(OpCode::StLexVar {
                    level: found.level,
                    slot,
                });
            }
            Storage::Global => match (kind, is_declaration) {
                (DeclKind::Let | DeclKind::Class, true) => self.emit(OpCode::StLetToGlobalRecord(name.to_string())),
                (DeclKind::Const, true) => self.emit(OpCode::StConstToGlobalRecord(name.to_string())),
                (DeclKind::Const, false) => self.emit(OpCode::ThrowConstAssignment(name.to_string())),
                (DeclKind::Let | DeclKind::Class, false) => self.emit(OpCode::TryStGlobalByName(name.to_string())),
                _ => self.emit(OpCode::StGlobalVar(name.to_string())),
            },
        }
        Ok(())
    }

    /// Replaces the innermost environment with a fresh copy of itself so
    /// closures created in one loop iteration keep that iteration's
    /// bindings.
    pub(crate) fn copy_per_iteration_env(&mut self, scope: ScopeId) -> Result<()> {
        let slots = self.tree.scope(scope).lexical_slots;
        self.reg_scope(|cg| {
            let mut temps: Vec<VReg> = Vec::with_capacity(slots as usize);
            for slot in 0..slots {
                let temp = cg.alloc_reg()?;
                cg.emit(OpCode::LdLexVar { level: 0, slot });
                cg.emit(OpCode::Sta(temp));
                temps.push(temp);
            }
            cg.emit(OpCode::PopLexEnv);
            cg.emit_new_env(scope);
            for (slot, temp) in temps.into_iter().enumerate() {
                cg.emit(OpCode::Lda(temp));
                cg.emit(OpCode::StLexVar {
                    level: 0,
                    slot: slot as u32,
                });
            }
            Ok(())
        })
    }
}
