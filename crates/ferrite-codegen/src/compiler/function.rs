// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Function-kind specific prologue, epilogue and suspension code.
//!
//! Ordinary functions return the accumulator directly. Generators wrap
//! every return value in an iterator result and complete the generator
//! object; async functions resolve their promise; async generators resolve
//! the pending request of their queue. All three guard the whole body with
//! a region whose handler completes the object and rethrows (generators),
//! rejects the promise (async functions) or rejects the pending request
//! (async generators).

use crate::ast::{BinaryOperator, Function, Position};
use crate::compiler::bytecode::{GeneratorState, Label, OpCode, ResumeMode, VReg};
use crate::compiler::codegen::CodeGen;
use crate::compiler::target::RegionId;
use crate::error::{Error, Result};

/// Code shape of the function being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionBuilder {
    /// Plain function, arrow or top level
    Ordinary,
    /// `function*`
    Generator {
        /// Register holding the generator object
        gen_obj: VReg,
        /// Region guarding the body
        region: RegionId,
        /// Completes the generator and rethrows
        handler: Label,
    },
    /// `async function` or async arrow
    Async {
        /// Register holding the async function object
        func_obj: VReg,
        /// Region guarding the body
        region: RegionId,
        /// Rejects the promise
        handler: Label,
    },
    /// `async function*`
    AsyncGenerator {
        /// Register holding the async generator object
        gen_obj: VReg,
        /// Region guarding the body
        region: RegionId,
        /// Completes the generator and rejects the pending request
        handler: Label,
    },
}

impl FunctionBuilder {
    /// Picks the builder for `func` (`None` is the top level) and reserves
    /// its registers.
    pub(crate) fn create(cg: &mut CodeGen<'_>, func: Option<&Function>) -> Result<Self> {
        let Some(func) = func else {
            return Ok(FunctionBuilder::Ordinary);
        };
        if !func.is_async && !func.is_generator {
            return Ok(FunctionBuilder::Ordinary);
        }

        let obj = cg.alloc_reg()?;
        let handler = cg.new_label();
        let region = cg.alloc_region(handler);
        Ok(match (func.is_async, func.is_generator) {
            (true, true) => FunctionBuilder::AsyncGenerator {
                gen_obj: obj,
                region,
                handler,
            },
            (false, _) => FunctionBuilder::Generator {
                gen_obj: obj,
                region,
                handler,
            },
            (true, false) => FunctionBuilder::Async {
                func_obj: obj,
                region,
                handler,
            },
        })
    }

    /// Emitted after parameter initialization, before the body.
    pub(crate) fn prepare(self, cg: &mut CodeGen<'_>) -> Result<()> {
        match self {
            FunctionBuilder::Ordinary => Ok(()),
            FunctionBuilder::Generator { gen_obj, region, .. }
            | FunctionBuilder::AsyncGenerator { gen_obj, region, .. } => {
                cg.emit(if matches!(self, FunctionBuilder::Generator { .. }) {
                    OpCode::CreateGeneratorObj { func: VReg(0) }
                } else {
                    OpCode::CreateAsyncGeneratorObj { func: VReg(0) }
                });
                cg.emit(OpCode::Sta(gen_obj));
                cg.reopen_region(region)?;
                cg.emit(OpCode::SetGeneratorState {
                    gen_obj,
                    state: GeneratorState::SuspendedStart,
                });
                cg.emit(OpCode::Lda(gen_obj));
                cg.emit(OpCode::SuspendGenerator { gen_obj });
                cg.reg_scope(|cg| resume(cg, gen_obj, true))
            }
            FunctionBuilder::Async { func_obj, region, .. } => {
                cg.emit(OpCode::AsyncFunctionEnter);
                cg.emit(OpCode::Sta(func_obj));
                cg.reopen_region(region)
            }
        }
    }

    /// Suspends with the accumulator as the yielded value; afterwards the
    /// accumulator holds the value sent by `next()`.
    pub(crate) fn yield_value(self, cg: &mut CodeGen<'_>, pos: Position) -> Result<()> {
        match self {
            FunctionBuilder::Generator { gen_obj, .. } => cg.reg_scope(|cg| {
                let value = cg.alloc_reg()?;
                cg.emit(OpCode::Sta(value));
                cg.emit(OpCode::SetGeneratorState {
                    gen_obj,
                    state: GeneratorState::SuspendedYield,
                });
                cg.emit(OpCode::CreateIterResultObj { value, done: false });
                cg.emit(OpCode::SuspendGenerator { gen_obj });
                cg.emit(OpCode::SetGeneratorState {
                    gen_obj,
                    state: GeneratorState::Executing,
                });
                resume(cg, gen_obj, true)
            }),
            // The operand is awaited before the request is resolved with it
            FunctionBuilder::AsyncGenerator { gen_obj, .. } => cg.reg_scope(|cg| {
                await_on(cg, gen_obj)?;
                let value = cg.alloc_reg()?;
                cg.emit(OpCode::Sta(value));
                cg.emit(OpCode::SetGeneratorState {
                    gen_obj,
                    state: GeneratorState::SuspendedYield,
                });
                cg.emit(OpCode::AsyncGeneratorResolve {
                    gen_obj,
                    value,
                    done: false,
                });
                cg.emit(OpCode::SuspendGenerator { gen_obj });
                cg.emit(OpCode::SetGeneratorState {
                    gen_obj,
                    state: GeneratorState::Executing,
                });
                resume(cg, gen_obj, true)
            }),
            _ => Err(Error::internal("yield outside of a generator").at(pos)),
        }
    }

    /// Awaits the accumulator; afterwards the accumulator holds the settled
    /// value, or the rejection reason has been thrown.
    pub(crate) fn await_value(self, cg: &mut CodeGen<'_>, pos: Position) -> Result<()> {
        match self {
            FunctionBuilder::Async { func_obj: obj, .. } | FunctionBuilder::AsyncGenerator { gen_obj: obj, .. } => {
                cg.reg_scope(|cg| await_on(cg, obj))
            }
            _ => Err(Error::internal("await outside of an async function").at(pos)),
        }
    }

    /// `return` statement. The value is in the accumulator and every
    /// enclosing context has been unwound.
    pub(crate) fn explicit_return(self, cg: &mut CodeGen<'_>) -> Result<()> {
        // `return x` in an async generator settles on the awaited value
        if let FunctionBuilder::AsyncGenerator { gen_obj, .. } = self {
            cg.reg_scope(|cg| await_on(cg, gen_obj))?;
        }
        self.direct_return(cg)
    }

    /// Completes the function with the accumulator as its result.
    pub(crate) fn direct_return(self, cg: &mut CodeGen<'_>) -> Result<()> {
        match self {
            FunctionBuilder::Ordinary => cg.emit(OpCode::Return),
            FunctionBuilder::Generator { gen_obj, .. } => {
                cg.reg_scope(|cg| {
                    let value = cg.alloc_reg()?;
                    cg.emit(OpCode::Sta(value));
                    cg.emit(OpCode::SetGeneratorState {
                        gen_obj,
                        state: GeneratorState::Completed,
                    });
                    cg.emit(OpCode::CreateIterResultObj { value, done: true });
                    cg.emit(OpCode::Return);
                    Ok(())
                })?;
            }
            FunctionBuilder::Async { func_obj, .. } => {
                cg.emit(OpCode::AsyncFunctionResolve { func_obj });
                cg.emit(OpCode::Return);
            }
            FunctionBuilder::AsyncGenerator { gen_obj, .. } => {
                cg.reg_scope(|cg| {
                    let value = cg.alloc_reg()?;
                    cg.emit(OpCode::Sta(value));
                    cg.emit(OpCode::SetGeneratorState {
                        gen_obj,
                        state: GeneratorState::Completed,
                    });
                    cg.emit(OpCode::AsyncGeneratorResolve {
                        gen_obj,
                        value,
                        done: true,
                    });
                    cg.emit(OpCode::Return);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }

    /// Return emitted when control falls off the end of the body.
    pub(crate) fn implicit_return(self, cg: &mut CodeGen<'_>) -> Result<()> {
        match self {
            FunctionBuilder::Ordinary => {
                cg.emit(OpCode::ReturnUndefined);
                Ok(())
            }
            _ => {
                cg.emit(OpCode::LdaUndefined);
                self.direct_return(cg)
            }
        }
    }

    /// Closes the body region and emits its handler.
    pub(crate) fn clean_up(self, cg: &mut CodeGen<'_>) -> Result<()> {
        match self {
            FunctionBuilder::Ordinary => Ok(()),
            FunctionBuilder::Generator {
                gen_obj,
                region,
                handler,
            }
            | FunctionBuilder::AsyncGenerator {
                gen_obj,
                region,
                handler,
            } => {
                cg.close_region(region)?;
                cg.set_label(handler)?;
                cg.reg_scope(|cg| {
                    let exception = cg.alloc_reg()?;
                    cg.emit(OpCode::Sta(exception));
                    cg.emit(OpCode::SetGeneratorState {
                        gen_obj,
                        state: GeneratorState::Completed,
                    });
                    cg.emit(OpCode::Lda(exception));
                    if matches!(self, FunctionBuilder::Generator { .. }) {
                        cg.emit(OpCode::Throw);
                    } else {
                        cg.emit(OpCode::AsyncGeneratorReject { gen_obj });
                        cg.emit(OpCode::Return);
                    }
                    Ok(())
                })
            }
            FunctionBuilder::Async {
                func_obj,
                region,
                handler,
            } => {
                cg.close_region(region)?;
                cg.set_label(handler)?;
                cg.emit(OpCode::AsyncFunctionReject { func_obj });
                cg.emit(OpCode::Return);
                Ok(())
            }
        }
    }
}

/// Awaits the accumulator on behalf of `obj`, an async function or async
/// generator object.
fn await_on(cg: &mut CodeGen<'_>, obj: VReg) -> Result<()> {
    cg.emit(OpCode::AsyncFunctionAwait { func_obj: obj });
    cg.emit(OpCode::SuspendGenerator { gen_obj: obj });
    resume(cg, obj, false)
}

/// Dispatches on the resume mode after a suspension: `return()` returns
/// through every pending finalizer, `throw()` throws at the suspension
/// point and `next()` leaves the sent value in the accumulator. Awaits
/// are never resumed with `return()`, so `accepts_return` is only set
/// after yields and the initial suspension.
fn resume(cg: &mut CodeGen<'_>, gen_obj: VReg, accepts_return: bool) -> Result<()> {
    let value = cg.alloc_reg()?;
    let mode = cg.alloc_reg()?;
    cg.emit(OpCode::ResumeGenerator { gen_obj });
    cg.emit(OpCode::Sta(value));
    cg.emit(OpCode::GetResumeMode { gen_obj });
    cg.emit(OpCode::Sta(mode));

    if accepts_return {
        let not_return = cg.new_label();
        cg.load_int(ResumeMode::Return as i32);
        cg.emit(OpCode::Binary {
            op: BinaryOperator::StrictEqual,
            lhs: mode,
        });
        cg.emit(OpCode::Jfalse(not_return));
        cg.emit(OpCode::Lda(value));
        cg.emit_return()?;
        cg.set_label(not_return)?;
    }

    let not_throw = cg.new_label();
    cg.load_int(ResumeMode::Throw as i32);
    cg.emit(OpCode::Binary {
        op: BinaryOperator::StrictEqual,
        lhs: mode,
    });
    cg.emit(OpCode::Jfalse(not_throw));
    cg.emit(OpCode::Lda(value));
    cg.emit(OpCode::Throw);
    cg.set_label(not_throw)?;
    cg.emit(OpCode::Lda(value));
    Ok(())
}
