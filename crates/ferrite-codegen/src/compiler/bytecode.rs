// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! The instruction set is accumulator based: most instructions read an
//! implicit operand from the accumulator and leave their result there, with
//! explicit virtual register operands for everything else. Only the logical
//! shape of each instruction is defined here; the binary encoding belongs to
//! the serializer.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOperator, Position, UnaryOperator};
use crate::binder::FunctionId;

/// A virtual register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VReg(pub u16);

impl fmt::Display for VReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A branch target, resolved to an instruction offset when the function
/// is finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// How a suspended generator was resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(i32)]
pub enum ResumeMode {
    /// `next(value)`
    Next = 0,
    /// `return(value)`
    Return = 1,
    /// `throw(value)`
    Throw = 2,
}

/// State recorded on a generator object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneratorState {
    /// Created, not started
    SuspendedStart,
    /// Suspended at a yield
    SuspendedYield,
    /// Running
    Executing,
    /// Finished
    Completed,
}

/// A single bytecode instruction with its source position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The operation
    pub opcode: OpCode,
    /// Source position for debug info
    pub pos: Position,
}

/// Operations understood by the VM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OpCode {
    // Accumulator loads
    /// acc = undefined
    LdaUndefined,
    /// acc = null
    LdaNull,
    /// acc = true
    LdaTrue,
    /// acc = false
    LdaFalse,
    /// acc = the hole marking an uninitialized binding
    LdaHole,
    /// acc = small integer
    LdaInt(i32),
    /// acc = number
    LdaNumber(f64),
    /// acc = string
    LdaStr(String),
    /// acc = bigint parsed from its decimal digits
    LdaBigInt(String),
    /// acc = reg
    Lda(VReg),
    /// reg = acc
    Sta(VReg),
    /// dst = src
    Mov {
        /// Destination
        dst: VReg,
        /// Source
        src: VReg,
    },

    // Globals
    /// acc = declared global var
    LdGlobalVar(String),
    /// declared global var = acc
    StGlobalVar(String),
    /// acc = global by name, ReferenceError if missing
    TryLdGlobalByName(String),
    /// global by name = acc, ReferenceError if missing in strict code
    TryStGlobalByName(String),
    /// Initialize a global `let` binding
    StLetToGlobalRecord(String),
    /// Initialize a global `const` binding
    StConstToGlobalRecord(String),

    // Lexical environments
    /// acc = env[level].slot
    LdLexVar {
        /// Environments to walk outward
        level: u32,
        /// Slot index
        slot: u32,
    },
    /// env[level].slot = acc
    StLexVar {
        /// Environments to walk outward
        level: u32,
        /// Slot index
        slot: u32,
    },
    /// Push a new environment with `slots` slots
    NewLexEnv {
        /// Slot count
        slots: u32,
    },
    /// Same as `NewLexEnv`, with a literal buffer naming the slots
    NewLexEnvWithScopeInfo {
        /// Slot count
        slots: u32,
        /// Literal buffer index
        literal: u32,
    },
    /// Pop the current environment
    PopLexEnv,

    // Checks
    /// Throw ReferenceError if acc is the hole
    ThrowUndefinedIfHole(String),
    /// Throw TypeError for assignment to a constant
    ThrowConstAssignment(String),
    /// Throw TypeError if acc is null or undefined
    ThrowPatternNonCoercible,

    // Operators
    /// acc = lhs op acc
    Binary {
        /// Operator
        op: BinaryOperator,
        /// Left operand
        lhs: VReg,
    },
    /// acc = op acc
    Unary(UnaryOperator),
    /// acc = acc + 1
    Inc,
    /// acc = acc - 1
    Dec,
    /// acc = ToNumeric(acc)
    ToNumeric,

    // Branches
    /// Unconditional jump
    Jmp(Label),
    /// Jump if acc is falsy
    Jfalse(Label),
    /// Jump if acc is truthy
    Jtrue(Label),
    /// Jump if acc is null or undefined
    Jnullish(Label),
    /// Jump if acc is undefined
    Jundefined(Label),
    /// Jump if acc is not undefined
    Jnotundefined(Label),

    // Objects and arrays
    /// acc = {}
    CreateEmptyObject,
    /// acc = []
    CreateEmptyArray,
    /// acc = array copied from a literal buffer
    CreateArrayWithBuffer(u32),
    /// Define own property `obj.name = acc`
    StOwnByName {
        /// Target object
        obj: VReg,
        /// Property name
        name: String,
    },
    /// Define own property `obj[key] = acc`
    StOwnByValue {
        /// Target object
        obj: VReg,
        /// Key register
        key: VReg,
    },
    /// Define own element `obj[index] = acc`
    StOwnByIndex {
        /// Target object
        obj: VReg,
        /// Element index
        index: u32,
    },
    /// Append the elements of iterable acc to `array` at `index`; `index`
    /// is advanced past the appended elements
    StArraySpread {
        /// Target array
        array: VReg,
        /// Next free index, updated in place
        index: VReg,
    },
    /// acc = obj.name
    LdObjByName {
        /// Object
        obj: VReg,
        /// Property name
        name: String,
    },
    /// acc = obj[key]
    LdObjByValue {
        /// Object
        obj: VReg,
        /// Key register
        key: VReg,
    },
    /// obj.name = acc
    StObjByName {
        /// Object
        obj: VReg,
        /// Property name
        name: String,
    },
    /// obj[key] = acc
    StObjByValue {
        /// Object
        obj: VReg,
        /// Key register
        key: VReg,
    },
    /// acc = super.name with receiver `this`
    LdSuperByName {
        /// Receiver
        this: VReg,
        /// Property name
        name: String,
    },
    /// acc = super[key] with receiver `this`
    LdSuperByValue {
        /// Receiver
        this: VReg,
        /// Key register
        key: VReg,
    },
    /// super.name = acc with receiver `this`
    StSuperByName {
        /// Receiver
        this: VReg,
        /// Property name
        name: String,
    },
    /// super[key] = acc with receiver `this`
    StSuperByValue {
        /// Receiver
        this: VReg,
        /// Key register
        key: VReg,
    },
    /// acc = delete obj[acc]
    DelObjProp {
        /// Object
        obj: VReg,
    },
    /// Copy own enumerable properties of acc into `dst`
    CopyDataProperties {
        /// Target object
        dst: VReg,
    },
    /// acc = copy of `obj` without the keys in `start..start + count`
    CreateObjectWithExcludedKeys {
        /// Source object
        obj: VReg,
        /// First excluded key register
        start: VReg,
        /// Number of excluded keys
        count: u16,
    },

    // Calls
    /// acc = start(start+1 .. start+1+argc), receiver undefined
    Call {
        /// Callee register, arguments follow
        start: VReg,
        /// Argument count
        argc: u16,
    },
    /// acc = start(start+2 .. start+2+argc) with receiver start+1
    CallThis {
        /// Callee register, receiver and arguments follow
        start: VReg,
        /// Argument count
        argc: u16,
    },
    /// acc = new start(start+2 ..) with new.target start+1
    NewObj {
        /// Constructor register, new.target and arguments follow
        start: VReg,
        /// Argument count
        argc: u16,
    },
    /// acc = callee.apply(this, args)
    CallSpread {
        /// Callee
        callee: VReg,
        /// Receiver
        this: VReg,
        /// Array of arguments
        args: VReg,
    },
    /// acc = new ctor(...args)
    NewObjSpread {
        /// Constructor
        ctor: VReg,
        /// Array of arguments
        args: VReg,
    },

    // Functions
    /// acc = closure over the current environment
    DefineFunction {
        /// Function index in the unit
        function: FunctionId,
        /// Function name
        name: String,
        /// Formal parameter count
        length: u32,
    },
    /// acc = unmapped arguments object
    GetUnmappedArgs,
    /// acc = array of the actual arguments from `index` on
    CopyRestArgs(u32),
    /// acc = class constructor. The literal buffer holds the named methods
    /// as `name, function index, length, is_static` quadruples
    DefineClassWithBuffer {
        /// Constructor function; `None` makes the runtime supply a default
        constructor: Option<FunctionId>,
        /// Class name
        name: String,
        /// Formal parameter count of the constructor
        length: u32,
        /// Literal buffer index
        literal: u32,
        /// Parent class, the hole when there is no `extends`
        base: VReg,
    },
    /// Define accessor `obj[key]` from `getter` and `setter`, either of
    /// which may be undefined; acc says whether to name the functions
    DefineGetterSetterByValue {
        /// Target object
        obj: VReg,
        /// Key register
        key: VReg,
        /// Getter function or undefined
        getter: VReg,
        /// Setter function or undefined
        setter: VReg,
    },
    /// acc = cached template object of a literal buffer holding the chunk
    /// count, the raw chunks and the cooked chunks
    GetTemplateObject(u32),

    // Iteration
    /// acc = acc[Symbol.iterator]()
    GetIterator,
    /// acc = for-in key iterator over acc
    GetPropIterator,
    /// acc = next key of `iter`, undefined when exhausted
    GetNextPropName {
        /// Key iterator
        iter: VReg,
    },
    /// acc = iter.next()
    IteratorNext {
        /// Iterator
        iter: VReg,
    },
    /// acc = result.done
    IteratorComplete {
        /// Iterator result
        result: VReg,
    },
    /// acc = result.value
    IteratorValue {
        /// Iterator result
        result: VReg,
    },
    /// Call iter.return() if present
    CloseIterator {
        /// Iterator
        iter: VReg,
    },

    // Generators and async functions
    /// acc = new generator object for `func`
    CreateGeneratorObj {
        /// Function object
        func: VReg,
    },
    /// acc = { value, done }
    CreateIterResultObj {
        /// Value register
        value: VReg,
        /// Done flag
        done: bool,
    },
    /// Suspend with acc as the produced value
    SuspendGenerator {
        /// Generator or async function object
        gen_obj: VReg,
    },
    /// acc = value the generator was resumed with
    ResumeGenerator {
        /// Generator or async function object
        gen_obj: VReg,
    },
    /// acc = [`ResumeMode`] of the last resumption
    GetResumeMode {
        /// Generator or async function object
        gen_obj: VReg,
    },
    /// Record a generator state
    SetGeneratorState {
        /// Generator object
        gen_obj: VReg,
        /// New state
        state: GeneratorState,
    },
    /// acc = new async generator object for `func`
    CreateAsyncGeneratorObj {
        /// Function object
        func: VReg,
    },
    /// Settle the oldest pending request of the queue with `{ value, done }`
    AsyncGeneratorResolve {
        /// Async generator object
        gen_obj: VReg,
        /// Value register
        value: VReg,
        /// Done flag
        done: bool,
    },
    /// Reject the oldest pending request of the queue with acc
    AsyncGeneratorReject {
        /// Async generator object
        gen_obj: VReg,
    },
    /// acc = async function object
    AsyncFunctionEnter,
    /// acc = promise awaiting acc
    AsyncFunctionAwait {
        /// Async function object
        func_obj: VReg,
    },
    /// Resolve the function's promise with acc; acc = the promise
    AsyncFunctionResolve {
        /// Async function object
        func_obj: VReg,
    },
    /// Reject the function's promise with acc; acc = the promise
    AsyncFunctionReject {
        /// Async function object
        func_obj: VReg,
    },

    // Control
    /// Return acc
    Return,
    /// Return undefined
    ReturnUndefined,
    /// Throw acc
    Throw,
    /// Debugger statement
    Debugger,
}

impl OpCode {
    /// The label a branch instruction jumps to.
    pub fn branch_target(&self) -> Option<Label> {
        match self {
            OpCode::Jmp(label)
            | OpCode::Jfalse(label)
            | OpCode::Jtrue(label)
            | OpCode::Jnullish(label)
            | OpCode::Jundefined(label)
            | OpCode::Jnotundefined(label) => Some(*label),
            _ => None,
        }
    }

    /// Control never falls through to the next instruction.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            OpCode::Jmp(_) | OpCode::Return | OpCode::ReturnUndefined | OpCode::Throw
        )
    }
}

/// A protected region and its handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchEntry<L = Label> {
    /// First instruction of the region
    pub try_begin: L,
    /// One past the last instruction of the region
    pub try_end: L,
    /// Handler entry
    pub handler: L,
    /// Nesting depth of the region, outermost 0
    pub depth: u32,
}

/// Instruction buffer of one function.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
}

impl Bytecode {
    /// Creates a new empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, opcode: OpCode, pos: Position) -> usize {
        let index = self.instructions.len();
        self.instructions.push(Instruction { opcode, pos });
        index
    }

    /// Index the next instruction will get.
    pub fn cursor(&self) -> u32 {
        self.instructions.len() as u32
    }

    /// The most recently emitted instruction.
    pub fn last(&self) -> Option<&OpCode> {
        self.instructions.last().map(|insn| &insn.opcode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_returns_index() {
        let mut code = Bytecode::new();
        assert_eq!(code.emit(OpCode::LdaUndefined, Position::default()), 0);
        assert_eq!(code.emit(OpCode::Return, Position::default()), 1);
        assert_eq!(code.cursor(), 2);
        assert!(code.last().is_some_and(OpCode::is_terminator));
    }

    #[test]
    fn test_branch_target() {
        assert_eq!(OpCode::Jfalse(Label(3)).branch_target(), Some(Label(3)));
        assert_eq!(OpCode::Lda(VReg(0)).branch_target(), None);
    }
}
