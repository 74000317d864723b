// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Assignable references.
//!
//! An [`LReference`] evaluates the "where" part of an assignment target
//! once (the object and key of a member expression) so the target can be
//! read and then written without evaluating its subexpressions twice.
//! Registers holding the object and key belong to the caller's register
//! scope, which must stay open until [`LReference::set_value`].

use crate::ast::{Expression, MemberExpression, MemberProperty, Pattern};
use crate::binder::{ScopeFindResult, THIS_VAR};
use crate::compiler::bytecode::{OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::error::{Error, Result};

/// Property part of a member reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKey<'a> {
    /// `obj.name`
    Name(&'a str),
    /// `obj[key]`, key evaluated into a register
    Value(VReg),
}

/// An assignment target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LReference<'a> {
    /// A resolved or global name
    Variable {
        /// Name as written
        name: &'a str,
        /// Resolution from the scope the reference was created in
        found: ScopeFindResult,
        /// Writes initialize the binding
        is_declaration: bool,
    },
    /// A property of an object, or of `super` with `obj` holding `this`
    Member {
        /// Object register
        obj: VReg,
        /// Property
        key: MemberKey<'a>,
        /// `super.x` rather than `obj.x`
        is_super: bool,
    },
    /// An array or object pattern
    Destructuring {
        /// The pattern
        pattern: &'a Pattern,
        /// Bindings are declared by the pattern
        is_declaration: bool,
    },
}

impl<'a> LReference<'a> {
    /// Prepares a reference to `pattern`. Member targets evaluate their
    /// object and computed key here.
    pub fn create(cg: &mut CodeGen<'a>, pattern: &'a Pattern, is_declaration: bool) -> Result<Self> {
        match pattern {
            Pattern::Identifier(ident) => Ok(LReference::Variable {
                name: &ident.name,
                found: cg.tree.find(cg.scope, &ident.name),
                is_declaration,
            }),
            Pattern::Member(member) => Self::create_member(cg, member),
            Pattern::Array(_) | Pattern::Object(_) => Ok(LReference::Destructuring {
                pattern,
                is_declaration,
            }),
        }
    }

    /// Prepares a reference to an expression used as an assignment
    /// target, as in `x++`.
    pub fn create_from_expression(cg: &mut CodeGen<'a>, expr: &'a Expression) -> Result<Self> {
        match expr {
            Expression::Identifier(ident) => Ok(LReference::Variable {
                name: &ident.name,
                found: cg.tree.find(cg.scope, &ident.name),
                is_declaration: false,
            }),
            Expression::Member(member) if !member.optional => Self::create_member(cg, member),
            _ => Err(Error::semantic("Invalid left-hand side in assignment", cg.pos)),
        }
    }

    fn create_member(cg: &mut CodeGen<'a>, member: &'a MemberExpression) -> Result<Self> {
        let obj = cg.alloc_reg()?;
        let is_super = matches!(*member.object, Expression::Super(_));
        if is_super {
            cg.load_var(THIS_VAR)?;
        } else {
            cg.compile_expression(&member.object)?;
        }
        cg.emit(OpCode::Sta(obj));

        let key = match &member.property {
            MemberProperty::Identifier(ident) => MemberKey::Name(&ident.name),
            MemberProperty::Expression(expr) => {
                let key = cg.alloc_reg()?;
                cg.compile_expression(expr)?;
                cg.emit(OpCode::Sta(key));
                MemberKey::Value(key)
            }
        };
        Ok(LReference::Member { obj, key, is_super })
    }

    /// Loads the current value of the target into the accumulator.
    pub fn get_value(&self, cg: &mut CodeGen<'a>) -> Result<()> {
        match *self {
            LReference::Variable { name, found, .. } => cg.load_resolved(name, found, false),
            LReference::Member { obj, key, is_super } => {
                cg.emit(match (key, is_super) {
                    (MemberKey::Name(name), false) => OpCode::LdObjByName {
                        obj,
                        name: name.to_string(),
                    },
                    (MemberKey::Value(key), false) => OpCode::LdObjByValue { obj, key },
                    (MemberKey::Name(name), true) => OpCode::LdSuperByName {
                        this: obj,
                        name: name.to_string(),
                    },
                    (MemberKey::Value(key), true) => OpCode::LdSuperByValue { this: obj, key },
                });
                Ok(())
            }
            LReference::Destructuring { .. } => Err(Error::internal("cannot read the value of a destructuring pattern")),
        }
    }

    /// Stores the accumulator into the target. The accumulator still holds
    /// the stored value afterwards.
    pub fn set_value(&self, cg: &mut CodeGen<'a>) -> Result<()> {
        match *self {
            LReference::Variable {
                name,
                found,
                is_declaration,
            } => cg.store_resolved(name, found, is_declaration),
            LReference::Member { obj, key, is_super } => {
                cg.emit(match (key, is_super) {
                    (MemberKey::Name(name), false) => OpCode::StObjByName {
                        obj,
                        name: name.to_string(),
                    },
                    (MemberKey::Value(key), false) => OpCode::StObjByValue { obj, key },
                    (MemberKey::Name(name), true) => OpCode::StSuperByName {
                        this: obj,
                        name: name.to_string(),
                    },
                    (MemberKey::Value(key), true) => OpCode::StSuperByValue { this: obj, key },
                });
                Ok(())
            }
            LReference::Destructuring {
                pattern,
                is_declaration,
            } => cg.compile_destructuring(pattern, is_declaration),
        }
    }

    /// Whether this is a pattern rather than a single target.
    pub fn is_destructuring(&self) -> bool {
        matches!(self, LReference::Destructuring { .. })
    }
}

