// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Destructuring patterns.
//!
//! The value being destructured arrives in the accumulator and is left
//! there afterwards, so `a = [b, c] = rhs` and declarations can chain on
//! it.
//!
//! ### Array Pattern
//!
//! ```text
//! [a = 1, b] = rhs
//!
//! Bytecode:
//!   Sta rhs
//!   GetIterator
//!   Sta iter
//!   LdaFalse
//!   Sta done
//!   ; region covering the elements, handled by `close`
//!   ; per element
//!   Lda done
//!   Jtrue -> skip
//!   LdaTrue
//!   Sta done                     ; a throwing next() is not closed
//!   IteratorNext iter
//!   Sta result
//!   IteratorComplete result
//!   Jtrue -> skip
//!   IteratorValue result
//!   Sta result
//!   LdaFalse
//!   Sta done
//!   Lda result
//!   Jmp -> have
//! skip:
//!   LdaUndefined
//! have:
//!   Jnotundefined -> bind        ; default value
//!   LdaInt 1
//! bind:
//!   [store a]
//!   ...
//!   ; end of region
//!   Lda done
//!   Jtrue -> closed
//!   CloseIterator iter
//! closed:
//!   Jmp -> after
//! close:
//!   Sta exc
//!   Lda done
//!   Jtrue -> rethrow
//!   CloseIterator iter
//! rethrow:
//!   Lda exc
//!   Throw
//! after:
//!   Lda rhs
//! ```

use crate::ast::*;
use crate::compiler::bytecode::{OpCode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::lreference::LReference;
use crate::error::{Error, Result};

impl<'a> CodeGen<'a> {
    /// Destructures the accumulator into `pattern`.
    pub(crate) fn compile_destructuring(&mut self, pattern: &'a Pattern, is_declaration: bool) -> Result<()> {
        self.reg_scope(|cg| {
            let rhs = cg.alloc_reg()?;
            cg.emit(OpCode::Sta(rhs));
            match pattern {
                Pattern::Array(array) => cg.compile_array_pattern(array, rhs, is_declaration)?,
                Pattern::Object(object) => cg.compile_object_pattern(object, rhs, is_declaration)?,
                Pattern::Identifier(_) | Pattern::Member(_) => {
                    return Err(Error::internal("destructuring a non-pattern target").at(cg.pos));
                }
            }
            cg.emit(OpCode::Lda(rhs));
            Ok(())
        })
    }

    /// Replaces an undefined accumulator with the value of `default`.
    pub(crate) fn apply_default(&mut self, default: Option<&'a Expression>) -> Result<()> {
        let Some(default) = default else {
            return Ok(());
        };
        let done = self.new_label();
        self.emit(OpCode::Jnotundefined(done));
        self.compile_expression(default)?;
        self.set_label(done)
    }

    fn compile_array_pattern(&mut self, array: &'a ArrayPattern, rhs: VReg, is_declaration: bool) -> Result<()> {
        let iter = self.alloc_reg()?;
        let done = self.alloc_reg()?;
        let result = self.alloc_reg()?;

        self.emit(OpCode::Lda(rhs));
        self.emit(OpCode::GetIterator);
        self.emit(OpCode::Sta(iter));
        self.emit(OpCode::LdaFalse);
        self.emit(OpCode::Sta(done));

        // `done` is set while the iterator itself runs, so only a throw from
        // a default or a store closes it
        let close = self.new_label();
        let region = self.open_region(close)?;

        for element in &array.elements {
            self.reg_scope(|cg| {
                // The target is evaluated before the iterator is stepped
                let reference = match element {
                    Some(element) => Some(LReference::create(cg, &element.target, is_declaration)?),
                    None => None,
                };

                let skip = cg.new_label();
                let have = cg.new_label();
                cg.emit(OpCode::Lda(done));
                cg.emit(OpCode::Jtrue(skip));
                cg.emit(OpCode::LdaTrue);
                cg.emit(OpCode::Sta(done));
                cg.emit(OpCode::IteratorNext { iter });
                cg.emit(OpCode::Sta(result));
                cg.emit(OpCode::IteratorComplete { result });
                cg.emit(OpCode::Jtrue(skip));
                cg.emit(OpCode::IteratorValue { result });
                cg.emit(OpCode::Sta(result));
                cg.emit(OpCode::LdaFalse);
                cg.emit(OpCode::Sta(done));
                cg.emit(OpCode::Lda(result));
                cg.emit(OpCode::Jmp(have));
                cg.set_label(skip)?;
                cg.emit(OpCode::LdaUndefined);
                cg.set_label(have)?;

                if let (Some(element), Some(reference)) = (element, reference) {
                    cg.apply_default(element.default.as_ref())?;
                    reference.set_value(cg)?;
                }
                Ok(())
            })?;
        }

        match &array.rest {
            Some(rest) => self.reg_scope(|cg| {
                let reference = LReference::create(cg, rest, is_declaration)?;
                let collected = cg.alloc_reg()?;
                let index = cg.alloc_reg()?;
                cg.emit(OpCode::CreateEmptyArray);
                cg.emit(OpCode::Sta(collected));
                cg.load_int(0);
                cg.emit(OpCode::Sta(index));

                let next = cg.new_label();
                let end = cg.new_label();
                cg.emit(OpCode::Lda(done));
                cg.emit(OpCode::Jtrue(end));
                cg.emit(OpCode::LdaTrue);
                cg.emit(OpCode::Sta(done));
                cg.set_label(next)?;
                cg.emit(OpCode::IteratorNext { iter });
                cg.emit(OpCode::Sta(result));
                cg.emit(OpCode::IteratorComplete { result });
                cg.emit(OpCode::Jtrue(end));
                cg.emit(OpCode::IteratorValue { result });
                cg.emit(OpCode::StOwnByValue {
                    obj: collected,
                    key: index,
                });
                cg.emit(OpCode::Lda(index));
                cg.emit(OpCode::Inc);
                cg.emit(OpCode::Sta(index));
                cg.emit(OpCode::Jmp(next));
                cg.set_label(end)?;

                cg.emit(OpCode::Lda(collected));
                reference.set_value(cg)
            })?,
            // An iterator that was not exhausted is closed
            None => {
                self.close_region(region)?;
                let closed = self.new_label();
                self.emit(OpCode::Lda(done));
                self.emit(OpCode::Jtrue(closed));
                self.emit(OpCode::CloseIterator { iter });
                self.set_label(closed)?;
            }
        }
        self.close_region(region)?;

        let after = self.new_label();
        self.emit(OpCode::Jmp(after));
        self.set_label(close)?;
        self.reg_scope(|cg| {
            let exception = cg.alloc_reg()?;
            let rethrow = cg.new_label();
            cg.emit(OpCode::Sta(exception));
            cg.emit(OpCode::Lda(done));
            cg.emit(OpCode::Jtrue(rethrow));
            cg.emit(OpCode::CloseIterator { iter });
            cg.set_label(rethrow)?;
            cg.emit(OpCode::Lda(exception));
            cg.emit(OpCode::Throw);
            Ok(())
        })?;
        self.set_label(after)
    }

    fn compile_object_pattern(&mut self, object: &'a ObjectPattern, rhs: VReg, is_declaration: bool) -> Result<()> {
        self.emit(OpCode::Lda(rhs));
        self.emit(OpCode::ThrowPatternNonCoercible);

        // Keys stay live until the rest object is built
        let excluded = match &object.rest {
            Some(_) => {
                let count = u32::try_from(object.properties.len())
                    .map_err(|_| Error::internal("too many properties in object pattern"))?;
                Some(self.regs.alloc_n(count).map_err(|err| err.at(self.pos))?)
            }
            None => None,
        };

        for (index, property) in object.properties.iter().enumerate() {
            let key_reg = excluded.map(|start| VReg(start.0 + index as u16));
            self.reg_scope(|cg| {
                let load = match (&property.key, key_reg) {
                    (PropertyKey::Named(name), None) => OpCode::LdObjByName {
                        obj: rhs,
                        name: name.clone(),
                    },
                    (key, excluded) => {
                        let mut key = cg.compile_property_key(key)?;
                        if let Some(reg) = excluded {
                            cg.emit(OpCode::Mov { dst: reg, src: key });
                            key = reg;
                        }
                        OpCode::LdObjByValue { obj: rhs, key }
                    }
                };

                let reference = LReference::create(cg, &property.value.target, is_declaration)?;
                cg.emit(load);
                cg.apply_default(property.value.default.as_ref())?;
                reference.set_value(cg)
            })?;
        }

        if let Some(rest) = &object.rest {
            self.reg_scope(|cg| {
                let reference = LReference::create(cg, rest, is_declaration)?;
                let count = u16::try_from(object.properties.len())
                    .map_err(|_| Error::internal("too many properties in object pattern"))?;
                cg.emit(OpCode::CreateObjectWithExcludedKeys {
                    obj: rhs,
                    start: excluded.unwrap_or(rhs),
                    count,
                });
                reference.set_value(cg)
            })?;
        }
        Ok(())
    }
}
