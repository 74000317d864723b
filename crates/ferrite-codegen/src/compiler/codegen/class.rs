// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Class declarations.
//!
//! ```text
//! class C extends B { m() {} get [k]() {} }
//!
//! Bytecode:
//!   [B bytecode]                 ; LdaHole without extends
//!   Sta base
//!   DefineClassWithBuffer default, "C", 0, #lit, base
//!   Sta ctor                     ; lit = ["m", fn, 0, false]
//!   LdObjByName ctor, prototype
//!   Sta proto
//!   [k bytecode]
//!   Sta key
//!   DefineFunction #getter
//!   Sta getter
//!   LdaUndefined
//!   Sta setter
//!   LdaTrue                      ; computed keys name the accessors
//!   DefineGetterSetterByValue proto, key, getter, setter
//!   Lda ctor
//!   [initialize C]
//! ```
//!
//! Methods with a plain name travel in the literal buffer. Computed and
//! numeric keys, and every accessor, are defined one by one in source
//! order once the constructor exists.

use crate::ast::*;
use crate::compiler::bytecode::{OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::emitter::LiteralValue;
use crate::error::Result;

impl<'a> CodeGen<'a> {
    /// Defines the class and initializes its binding, ending its dead zone.
    pub(crate) fn compile_class_declaration(&mut self, class: &'a Class) -> Result<()> {
        self.reg_scope(|cg| {
            let base = cg.alloc_reg()?;
            match &class.super_class {
                Some(super_class) => cg.compile_expression(super_class)?,
                None => cg.emit(OpCode::LdaHole),
            }
            cg.emit(OpCode::Sta(base));

            let mut values = Vec::new();
            for member in class.members.iter().filter(|member| in_literal_buffer(member)) {
                if let PropertyKey::Named(name) = &member.key {
                    values.push(LiteralValue::String(name.clone()));
                    values.push(LiteralValue::Integer(member.value.id.0));
                    values.push(LiteralValue::Integer(member.value.formal_length() as u32));
                    values.push(LiteralValue::Boolean(member.is_static));
                }
            }
            let literal = cg.ctx.add_literal_buffer(values);
            let constructor = class.constructor.as_deref();
            cg.emit(OpCode::DefineClassWithBuffer {
                constructor: constructor.map(|ctor| ctor.id),
                name: class.id.name.clone(),
                length: constructor.map_or(0, |ctor| ctor.formal_length() as u32),
                literal,
                base,
            });

            let ctor = cg.alloc_reg()?;
            cg.emit(OpCode::Sta(ctor));
            let proto = cg.alloc_reg()?;
            cg.emit(OpCode::LdObjByName {
                obj: ctor,
                name: "prototype".to_string(),
            });
            cg.emit(OpCode::Sta(proto));

            let mut defined = vec![false; class.members.len()];
            for (index, member) in class.members.iter().enumerate() {
                if in_literal_buffer(member) || defined[index] {
                    continue;
                }
                let target = if member.is_static { ctor } else { proto };
                match member.kind {
                    MethodKind::Method => cg.reg_scope(|cg| {
                        let key = cg.compile_property_key(&member.key)?;
                        cg.define_function(&member.value);
                        cg.emit(OpCode::StOwnByValue { obj: target, key });
                        Ok(())
                    })?,
                    MethodKind::Get | MethodKind::Set => {
                        let partner = accessor_partner(&class.members, index);
                        if let Some(partner) = partner {
                            defined[partner] = true;
                        }
                        let partner = partner.map(|partner| &class.members[partner]);
                        cg.define_accessor(target, member, partner)?;
                    }
                }
            }

            cg.emit(OpCode::Lda(ctor));
            let found = cg.tree.find(cg.scope, &class.id.name);
            cg.store_resolved(&class.id.name, found, true)
        })
    }

    /// Defines `member`, and its other half when the pair shares a
    /// statically known key.
    fn define_accessor(&mut self, target: VReg, member: &'a ClassMember, partner: Option<&'a ClassMember>) -> Result<()> {
        self.reg_scope(|cg| {
            let key = cg.compile_property_key(&member.key)?;
            let getter = cg.alloc_reg()?;
            let setter = cg.alloc_reg()?;
            for (reg, kind) in [(getter, MethodKind::Get), (setter, MethodKind::Set)] {
                match [Some(member), partner].into_iter().flatten().find(|m| m.kind == kind) {
                    Some(half) => cg.define_function(&half.value),
                    None => cg.emit(OpCode::LdaUndefined),
                }
                cg.emit(OpCode::Sta(reg));
            }
            let is_computed = matches!(member.key, PropertyKey::Computed(_));
            cg.emit(if is_computed { OpCode::LdaTrue } else { OpCode::LdaFalse });
            cg.emit(OpCode::DefineGetterSetterByValue {
                obj: target,
                key,
                getter,
                setter,
            });
            Ok(())
        })
    }
}

fn in_literal_buffer(member: &ClassMember) -> bool {
    member.kind == MethodKind::Method && matches!(member.key, PropertyKey::Named(_))
}

/// Later accessor of the other kind with the same static key and placement.
fn accessor_partner(members: &[ClassMember], index: usize) -> Option<usize> {
    let member = &members[index];
    if matches!(member.key, PropertyKey::Computed(_)) {
        return None;
    }
    let wanted = match member.kind {
        MethodKind::Get => MethodKind::Set,
        MethodKind::Set => MethodKind::Get,
        MethodKind::Method => return None,
    };
    members
        .iter()
        .enumerate()
        .skip(index + 1)
        .find(|(_, other)| other.kind == wanted && other.is_static == member.is_static && other.key == member.key)
        .map(|(index, _)| index)
}
