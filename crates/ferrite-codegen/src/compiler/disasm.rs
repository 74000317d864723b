// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Textual listings of compiled code.
//!
//! ```text
//! function add (unit 0, #1, ordinary) registers=5 params=5
//!     0  Lda v3
//!     1  Binary Add v4
//!   L0:
//!     2  Return
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::compiler::bytecode::{Label, OpCode};
use crate::compiler::emitter::{CompiledFunction, CompiledProgram, LiteralValue};

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpCode::LdaUndefined => write!(f, "LdaUndefined"),
            OpCode::LdaNull => write!(f, "LdaNull"),
            OpCode::LdaTrue => write!(f, "LdaTrue"),
            OpCode::LdaFalse => write!(f, "LdaFalse"),
            OpCode::LdaHole => write!(f, "LdaHole"),
            OpCode::LdaInt(value) => write!(f, "LdaInt {}", value),
            OpCode::LdaNumber(value) => write!(f, "LdaNumber {}", value),
            OpCode::LdaStr(value) => write!(f, "LdaStr {:?}", value),
            OpCode::LdaBigInt(value) => write!(f, "LdaBigInt {}n", value),
            OpCode::Lda(reg) => write!(f, "Lda {}", reg),
            OpCode::Sta(reg) => write!(f, "Sta {}", reg),
            OpCode::Mov { dst, src } => write!(f, "Mov {}, {}", dst, src),

            OpCode::LdGlobalVar(name) => write!(f, "LdGlobalVar {}", name),
            OpCode::StGlobalVar(name) => write!(f, "StGlobalVar {}", name),
            OpCode::TryLdGlobalByName(name) => write!(f, "TryLdGlobalByName {}", name),
            OpCode::TryStGlobalByName(name) => write!(f, "TryStGlobalByName {}", name),
            OpCode::StLetToGlobalRecord(name) => write!(f, "StLetToGlobalRecord {}", name),
            OpCode::StConstToGlobalRecord(name) => write!(f, "StConstToGlobalRecord {}", name),

            OpCode::LdLexVar { level, slot } => write!(f, "LdLexVar {}, {}", level, slot),
            OpCode::StLexVar { level, slot } => write!(f, "StLexVar {}, {}", level, slot),
            OpCode::NewLexEnv { slots } => write!(f, "NewLexEnv {}", slots),
            OpCode::NewLexEnvWithScopeInfo { slots, literal } => {
                write!(f, "NewLexEnvWithScopeInfo {}, #{}", slots, literal)
            }
            OpCode::PopLexEnv => write!(f, "PopLexEnv"),

            OpCode::ThrowUndefinedIfHole(name) => write!(f, "ThrowUndefinedIfHole {}", name),
            OpCode::ThrowConstAssignment(name) => write!(f, "ThrowConstAssignment {}", name),
            OpCode::ThrowPatternNonCoercible => write!(f, "ThrowPatternNonCoercible"),

            OpCode::Binary { op, lhs } => write!(f, "Binary {:?} {}", op, lhs),
            OpCode::Unary(op) => write!(f, "Unary {:?}", op),
            OpCode::Inc => write!(f, "Inc"),
            OpCode::Dec => write!(f, "Dec"),
            OpCode::ToNumeric => write!(f, "ToNumeric"),

            OpCode::Jmp(label) => write!(f, "Jmp {}", label),
            OpCode::Jfalse(label) => write!(f, "Jfalse {}", label),
            OpCode::Jtrue(label) => write!(f, "Jtrue {}", label),
            OpCode::Jnullish(label) => write!(f, "Jnullish {}", label),
            OpCode::Jundefined(label) => write!(f, "Jundefined {}", label),
            OpCode::Jnotundefined(label) => write!(f, "Jnotundefined {}", label),

            OpCode::CreateEmptyObject => write!(f, "CreateEmptyObject"),
            OpCode::CreateEmptyArray => write!(f, "CreateEmptyArray"),
            OpCode::CreateArrayWithBuffer(literal) => write!(f, "CreateArrayWithBuffer #{}", literal),
            OpCode::StOwnByName { obj, name } => write!(f, "StOwnByName {}, {}", obj, name),
            OpCode::StOwnByValue { obj, key } => write!(f, "StOwnByValue {}, {}", obj, key),
            OpCode::StOwnByIndex { obj, index } => write!(f, "StOwnByIndex {}, {}", obj, index),
            OpCode::StArraySpread { array, index } => write!(f, "StArraySpread {}, {}", array, index),
            OpCode::LdObjByName { obj, name } => write!(f, "LdObjByName {}, {}", obj, name),
            OpCode::LdObjByValue { obj, key } => write!(f, "LdObjByValue {}, {}", obj, key),
            OpCode::StObjByName { obj, name } => write!(f, "StObjByName {}, {}", obj, name),
            OpCode::StObjByValue { obj, key } => write!(f, "StObjByValue {}, {}", obj, key),
            OpCode::LdSuperByName { this, name } => write!(f, "LdSuperByName {}, {}", this, name),
            OpCode::LdSuperByValue { this, key } => write!(f, "LdSuperByValue {}, {}", this, key),
            OpCode::StSuperByName { this, name } => write!(f, "StSuperByName {}, {}", this, name),
            OpCode::StSuperByValue { this, key } => write!(f, "StSuperByValue {}, {}", this, key),
            OpCode::DelObjProp { obj } => write!(f, "DelObjProp {}", obj),
            OpCode::CopyDataProperties { dst } => write!(f, "CopyDataProperties {}", dst),
            OpCode::CreateObjectWithExcludedKeys { obj, start, count } => {
                write!(f, "CreateObjectWithExcludedKeys {}, {}, {}", obj, start, count)
            }

            OpCode::Call { start, argc } => write!(f, "Call {}, {}", start, argc),
            OpCode::CallThis { start, argc } => write!(f, "CallThis {}, {}", start, argc),
            OpCode::NewObj { start, argc } => write!(f, "NewObj {}, {}", start, argc),
            OpCode::CallSpread { callee, this, args } => {
                write!(f, "CallSpread {}, {}, {}", callee, this, args)
            }
            OpCode::NewObjSpread { ctor, args } => write!(f, "NewObjSpread {}, {}", ctor, args),

            OpCode::DefineFunction { function, name, length } => {
                write!(f, "DefineFunction #{}, {:?}, {}", function.0, name, length)
            }
            OpCode::GetUnmappedArgs => write!(f, "GetUnmappedArgs"),
            OpCode::CopyRestArgs(index) => write!(f, "CopyRestArgs {}", index),
            OpCode::DefineClassWithBuffer {
                constructor,
                name,
                length,
                literal,
                base,
            } => {
                match constructor {
                    Some(function) => write!(f, "DefineClassWithBuffer #{}", function.0)?,
                    None => write!(f, "DefineClassWithBuffer default")?,
                }
                write!(f, ", {:?}, {}, #{}, {}", name, length, literal, base)
            }
            OpCode::DefineGetterSetterByValue {
                obj,
                key,
                getter,
                setter,
            } => write!(f, "DefineGetterSetterByValue {}, {}, {}, {}", obj, key, getter, setter),
            OpCode::GetTemplateObject(literal) => write!(f, "GetTemplateObject #{}", literal),

            OpCode::GetIterator => write!(f, "GetIterator"),
            OpCode::GetPropIterator => write!(f, "GetPropIterator"),
            OpCode::GetNextPropName { iter } => write!(f, "GetNextPropName {}", iter),
            OpCode::IteratorNext { iter } => write!(f, "IteratorNext {}", iter),
            OpCode::IteratorComplete { result } => write!(f, "IteratorComplete {}", result),
            OpCode::IteratorValue { result } => write!(f, "IteratorValue {}", result),
            OpCode::CloseIterator { iter } => write!(f, "CloseIterator {}", iter),

            OpCode::CreateGeneratorObj { func } => write!(f, "CreateGeneratorObj {}", func),
            OpCode::CreateIterResultObj { value, done } => {
                write!(f, "CreateIterResultObj {}, {}", value, done)
            }
            OpCode::SuspendGenerator { gen_obj } => write!(f, "SuspendGenerator {}", gen_obj),
            OpCode::ResumeGenerator { gen_obj } => write!(f, "ResumeGenerator {}", gen_obj),
            OpCode::GetResumeMode { gen_obj } => write!(f, "GetResumeMode {}", gen_obj),
            OpCode::SetGeneratorState { gen_obj, state } => {
                write!(f, "SetGeneratorState {}, {:?}", gen_obj, state)
            }
            OpCode::CreateAsyncGeneratorObj { func } => write!(f, "CreateAsyncGeneratorObj {}", func),
            OpCode::AsyncGeneratorResolve { gen_obj, value, done } => {
                write!(f, "AsyncGeneratorResolve {}, {}, {}", gen_obj, value, done)
            }
            OpCode::AsyncGeneratorReject { gen_obj } => write!(f, "AsyncGeneratorReject {}", gen_obj),
            OpCode::AsyncFunctionEnter => write!(f, "AsyncFunctionEnter"),
            OpCode::AsyncFunctionAwait { func_obj } => write!(f, "AsyncFunctionAwait {}", func_obj),
            OpCode::AsyncFunctionResolve { func_obj } => write!(f, "AsyncFunctionResolve {}", func_obj),
            OpCode::AsyncFunctionReject { func_obj } => write!(f, "AsyncFunctionReject {}", func_obj),

            OpCode::Return => write!(f, "Return"),
            OpCode::ReturnUndefined => write!(f, "ReturnUndefined"),
            OpCode::Throw => write!(f, "Throw"),
            OpCode::Debugger => write!(f, "Debugger"),
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Integer(value) => write!(f, "{}", value),
            LiteralValue::Number(value) => write!(f, "{}", value),
            LiteralValue::String(value) => write!(f, "{:?}", value),
            LiteralValue::Boolean(value) => write!(f, "{}", value),
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::Undefined => write!(f, "undefined"),
        }
    }
}

impl fmt::Display for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function {} (unit {}, #{}, {:?}) registers={} params={}",
            self.name, self.unit, self.id.0, self.kind, self.register_count, self.param_count
        )?;

        // Several labels may share an offset
        let mut labels: BTreeMap<u32, Vec<Label>> = BTreeMap::new();
        for (index, &offset) in self.label_offsets.iter().enumerate() {
            labels.entry(offset).or_default().push(Label(index as u32));
        }

        for (offset, insn) in self.instructions.iter().enumerate() {
            write_labels(f, labels.get(&(offset as u32)))?;
            writeln!(f, "  {:>4}  {}", offset, insn.opcode)?;
        }
        write_labels(f, labels.get(&(self.instructions.len() as u32)))?;

        for entry in &self.catch_table {
            writeln!(
                f,
                "  catch [{}, {}) -> {} depth={}",
                entry.try_begin, entry.try_end, entry.handler, entry.depth
            )?;
        }
        Ok(())
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, labels: Option<&Vec<Label>>) -> fmt::Result {
    for label in labels.into_iter().flatten() {
        writeln!(f, "  {}:", label)?;
    }
    Ok(())
}

impl fmt::Display for CompiledProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, func) in self.functions.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", func)?;
        }
        for buffer in &self.literal_buffers {
            let values: Vec<String> = buffer.values.iter().map(ToString::to_string).collect();
            writeln!(f, "literal #{} [{}]", buffer.index, values.join(", "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{FunctionKind, Position};
    use crate::binder::FunctionId;
    use crate::compiler::bytecode::{CatchEntry, Instruction, VReg};

    fn function(opcodes: Vec<OpCode>, label_offsets: Vec<u32>) -> CompiledFunction {
        CompiledFunction {
            unit: 0,
            id: FunctionId(1),
            name: "f".to_string(),
            kind: FunctionKind::Ordinary,
            instructions: opcodes
                .into_iter()
                .map(|opcode| Instruction {
                    opcode,
                    pos: Position::default(),
                })
                .collect(),
            label_offsets,
            catch_table: Vec::new(),
            register_count: 4,
            param_count: 3,
        }
    }

    #[test]
    fn test_opcode_operands() {
        assert_eq!(OpCode::Mov { dst: VReg(1), src: VReg(2) }.to_string(), "Mov v1, v2");
        assert_eq!(OpCode::Jfalse(Label(7)).to_string(), "Jfalse L7");
        assert_eq!(OpCode::LdaStr("a\"b".into()).to_string(), r#"LdaStr "a\"b""#);
        let class = OpCode::DefineClassWithBuffer {
            constructor: None,
            name: "C".into(),
            length: 0,
            literal: 2,
            base: VReg(4),
        };
        assert_eq!(class.to_string(), r#"DefineClassWithBuffer default, "C", 0, #2, v4"#);
    }

    #[test]
    fn test_labels_precede_their_instruction() {
        let func = function(vec![OpCode::Jmp(Label(0)), OpCode::ReturnUndefined], vec![1, 1]);
        let listing = func.to_string();
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines[1].trim(), "0  Jmp L0");
        assert_eq!(lines[2].trim(), "L0:");
        assert_eq!(lines[3].trim(), "L1:");
        assert_eq!(lines[4].trim(), "1  ReturnUndefined");
    }

    #[test]
    fn test_label_at_end_and_catch_table() {
        let mut func = function(vec![OpCode::Throw], vec![0, 1]);
        func.catch_table.push(CatchEntry {
            try_begin: 0,
            try_end: 1,
            handler: 1,
            depth: 0,
        });
        let listing = func.to_string();
        assert!(listing.contains("  L1:\n"));
        assert!(listing.ends_with("catch [0, 1) -> 1 depth=0\n"));
    }
}
