// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation.
//!
//! Every expression leaves its value in the accumulator. Intermediate
//! values live in registers of a register scope opened per expression, so
//! compiling an expression never changes the register cursor.
//!
//! | Expression | Key Operations | Notes |
//! |------------|----------------|-------|
//! | Literal | `LdaInt`, `LdaNumber`, `LdaStr` | Integral numbers use `LdaInt` |
//! | Identifier | `Lda`, `LdLexVar`, `TryLdGlobalByName` | By storage class |
//! | Binary | `Sta lhs`, `Binary` | acc = lhs op acc |
//! | Call | `Call`, `CallThis`, `CallSpread` | Callee and arguments in consecutive registers |
//! | Tagged template | `GetTemplateObject`, `Call` | Template object is the first argument |
//! | Array | `CreateArrayWithBuffer`, `StOwnByIndex` | Literal buffer when every element is a literal |
//! | Optional chain | `Jnullish` | All `?.` hops share one short-circuit label |
//!
//! ## Binary Operators
//!
//! ```text
//! Expression: a + b
//!
//! Bytecode:
//!   [a bytecode]
//!   Sta v3
//!   [b bytecode]
//!   Binary Add v3      ; acc = v3 + acc
//! ```
//!
//! ## Calls
//!
//! ```text
//! Expression: obj.m(x)
//!
//! Bytecode:
//!   [obj bytecode]
//!   Sta v4                       ; this
//!   LdObjByName v4, "m"
//!   Sta v3                       ; callee
//!   [x bytecode]
//!   Sta v5
//!   CallThis v3, 1
//! ```

use crate::ast::*;
use crate::binder::THIS_VAR;
use crate::compiler::bytecode::{Label, OpCode, VReg};
use crate::compiler::codegen::{ChainState, CodeGen};
use crate::compiler::emitter::LiteralValue;
use crate::compiler::lreference::LReference;
use crate::error::{Error, Result};

impl<'a> CodeGen<'a> {
    /// Compiles `expr` into the accumulator.
    pub(crate) fn compile_expression(&mut self, expr: &'a Expression) -> Result<()> {
        self.reg_scope(|cg| cg.compile_expression_value(expr))
    }

    fn compile_expression_value(&mut self, expr: &'a Expression) -> Result<()> {
        match expr {
            Expression::Literal(literal) => {
                self.compile_literal(literal);
                Ok(())
            }
            Expression::Identifier(ident) => {
                self.pos_or(ident.pos);
                self.load_var(&ident.name)
            }
            Expression::This(_) => self.load_var(THIS_VAR),
            Expression::Super(pos) => Err(Error::semantic("'super' keyword unexpected here", *pos)),
            Expression::Array(array) => {
                let elements = array.elements.iter().map(Option::as_ref);
                self.compile_array(elements, array.elements.len())
            }
            Expression::Object(object) => self.compile_object(object),
            Expression::Binary(binary) => {
                let lhs = self.alloc_reg()?;
                self.compile_expression(&binary.left)?;
                self.emit(OpCode::Sta(lhs));
                self.compile_expression(&binary.right)?;
                self.emit(OpCode::Binary {
                    op: binary.operator,
                    lhs,
                });
                Ok(())
            }
            Expression::Logical(logical) => self.compile_logical(logical),
            Expression::Unary(unary) => self.compile_unary(unary),
            Expression::Assignment(assignment) => self.compile_assignment(assignment),
            Expression::Call(call) => self.compile_call(call),
            Expression::Member(member) => self.compile_member(member),
            Expression::Chain(inner) => self.compile_chain(inner),
            Expression::Conditional(conditional) => {
                let alternate = self.new_label();
                let end = self.new_label();
                self.compile_condition(&conditional.test, alternate)?;
                self.compile_expression(&conditional.consequent)?;
                self.emit(OpCode::Jmp(end));
                self.set_label(alternate)?;
                self.compile_expression(&conditional.alternate)?;
                self.set_label(end)
            }
            Expression::Function(func) => {
                self.define_function(func);
                Ok(())
            }
            Expression::New(new) => self.compile_new(new),
            Expression::Update(update) => self.compile_update(update),
            Expression::Sequence(sequence) => {
                for expr in &sequence.expressions {
                    self.compile_expression(expr)?;
                }
                Ok(())
            }
            Expression::Template(template) => self.compile_template(template),
            Expression::TaggedTemplate(tagged) => self.compile_tagged_template(tagged),
            Expression::Yield(expr) => {
                match &expr.argument {
                    Some(argument) => self.compile_expression(argument)?,
                    None => self.emit(OpCode::LdaUndefined),
                }
                let builder = self.builder;
                builder.yield_value(self, expr.pos)
            }
            Expression::Await(expr) => {
                self.compile_expression(&expr.argument)?;
                let builder = self.builder;
                builder.await_value(self, expr.pos)
            }
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    fn compile_literal(&mut self, literal: &Literal) {
        let opcode = match literal {
            Literal::Number(value) => match small_integer(*value) {
                Some(value) => OpCode::LdaInt(value),
                None => OpCode::LdaNumber(*value),
            },
            Literal::String(value) => OpCode::LdaStr(value.clone()),
            Literal::Boolean(true) => OpCode::LdaTrue,
            Literal::Boolean(false) => OpCode::LdaFalse,
            Literal::Null => OpCode::LdaNull,
            Literal::Undefined => OpCode::LdaUndefined,
            Literal::BigInt(digits) => OpCode::LdaBigInt(digits.clone()),
        };
        self.emit(opcode);
    }

    /// Builds an array from `elements`, `None` being a hole.
    fn compile_array<I>(&mut self, elements: I, len: usize) -> Result<()>
    where
        I: Iterator<Item = Option<&'a ArrayElement>> + Clone,
    {
        if len > 0 {
            let buffer: Option<Vec<LiteralValue>> = elements
                .clone()
                .map(|element| match element {
                    Some(ArrayElement::Expression(Expression::Literal(literal))) => literal_value(literal),
                    _ => None,
                })
                .collect();
            if let Some(values) = buffer {
                let index = self.ctx.add_literal_buffer(values);
                self.emit(OpCode::CreateArrayWithBuffer(index));
                return Ok(());
            }
        }

        let array = self.alloc_reg()?;
        self.emit(OpCode::CreateEmptyArray);
        self.emit(OpCode::Sta(array));

        // After the first spread the position is only known at run time
        let mut index: Option<VReg> = None;
        let mut trailing_hole = false;
        for (position, element) in elements.enumerate() {
            trailing_hole = element.is_none();
            match element {
                None => {
                    if let Some(index) = index {
                        self.emit(OpCode::Lda(index));
                        self.emit(OpCode::Inc);
                        self.emit(OpCode::Sta(index));
                    }
                }
                Some(ArrayElement::Expression(expr)) => {
                    self.compile_expression(expr)?;
                    match index {
                        Some(index) => {
                            self.emit(OpCode::StOwnByValue { obj: array, key: index });
                            self.emit(OpCode::Lda(index));
                            self.emit(OpCode::Inc);
                            self.emit(OpCode::Sta(index));
                        }
                        None => self.emit(OpCode::StOwnByIndex {
                            obj: array,
                            index: position as u32,
                        }),
                    }
                }
                Some(ArrayElement::Spread(expr)) => {
                    let index = match index {
                        Some(index) => index,
                        None => {
                            let reg = self.alloc_reg()?;
                            self.load_int(position as i32);
                            self.emit(OpCode::Sta(reg));
                            index = Some(reg);
                            reg
                        }
                    };
                    self.compile_expression(expr)?;
                    self.emit(OpCode::StArraySpread { array, index });
                }
            }
        }

        // Holes at the end still count towards the length
        if trailing_hole {
            match index {
                Some(index) => self.emit(OpCode::Lda(index)),
                None => self.load_int(len as i32),
            }
            self.emit(OpCode::StObjByName {
                obj: array,
                name: "length".to_string(),
            });
        }
        self.emit(OpCode::Lda(array));
        Ok(())
    }

    fn compile_object(&mut self, object: &'a ObjectExpression) -> Result<()> {
        let obj = self.alloc_reg()?;
        self.emit(OpCode::CreateEmptyObject);
        self.emit(OpCode::Sta(obj));

        for property in &object.properties {
            match property {
                Property::Init {
                    key: PropertyKey::Named(name),
                    value,
                } => {
                    self.compile_expression(value)?;
                    self.emit(OpCode::StOwnByName {
                        obj,
                        name: name.clone(),
                    });
                }
                Property::Init { key, value } => self.reg_scope(|cg| {
                    let key = cg.compile_property_key(key)?;
                    cg.compile_expression(value)?;
                    cg.emit(OpCode::StOwnByValue { obj, key });
                    Ok(())
                })?,
                Property::Spread(expr) => {
                    self.compile_expression(expr)?;
                    self.emit(OpCode::CopyDataProperties { dst: obj });
                }
            }
        }

        self.emit(OpCode::Lda(obj));
        Ok(())
    }

    /// Evaluates a property key into a fresh register.
    pub(crate) fn compile_property_key(&mut self, key: &'a PropertyKey) -> Result<VReg> {
        let reg = self.alloc_reg()?;
        match key {
            PropertyKey::Named(name) => self.emit(OpCode::LdaStr(name.clone())),
            PropertyKey::Index(index) => match i32::try_from(*index) {
                Ok(index) => self.load_int(index),
                Err(_) => self.emit(OpCode::LdaNumber(f64::from(*index))),
            },
            PropertyKey::Computed(expr) => self.compile_expression(expr)?,
        }
        self.emit(OpCode::Sta(reg));
        Ok(reg)
    }

    fn compile_template(&mut self, template: &'a TemplateLiteral) -> Result<()> {
        let head = template.quasis.first().map_or("", String::as_str);
        self.emit(OpCode::LdaStr(head.to_string()));
        if template.expressions.is_empty() {
            return Ok(());
        }

        let lhs = self.alloc_reg()?;
        for (index, expr) in template.expressions.iter().enumerate() {
            self.emit(OpCode::Sta(lhs));
            self.compile_expression(expr)?;
            self.emit(OpCode::Binary {
                op: BinaryOperator::Add,
                lhs,
            });
            match template.quasis.get(index + 1) {
                Some(quasi) if !quasi.is_empty() => {
                    self.emit(OpCode::Sta(lhs));
                    self.emit(OpCode::LdaStr(quasi.clone()));
                    self.emit(OpCode::Binary {
                        op: BinaryOperator::Add,
                        lhs,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Calls the tag with the template object followed by the
    /// substitutions. A member tag is called as a method.
    fn compile_tagged_template(&mut self, tagged: &'a TaggedTemplateExpression) -> Result<()> {
        let pos = tagged.pos;
        let is_method = matches!(*tagged.tag, Expression::Member(_));
        let argc = argument_count(tagged.expressions.len() + 1)?;
        let receiver = u16::from(is_method);

        // [tag, this?, template, substitutions...]
        let start = self
            .regs
            .alloc_n(1 + u32::from(receiver) + u32::from(argc))
            .map_err(|err| err.at(pos))?;
        match &*tagged.tag {
            Expression::Member(member) => {
                let this = VReg(start.0 + 1);
                let is_super = self.compile_member_object(member, this)?;
                self.load_property(member, this, is_super)?;
            }
            tag => self.compile_expression(tag)?,
        }
        self.emit(OpCode::Sta(start));

        let mut values = Vec::with_capacity(1 + tagged.raw.len() * 2);
        values.push(LiteralValue::Integer(tagged.raw.len() as u32));
        values.extend(tagged.raw.iter().cloned().map(LiteralValue::String));
        values.extend(tagged.cooked.iter().map(|chunk| match chunk {
            Some(chunk) => LiteralValue::String(chunk.clone()),
            None => LiteralValue::Undefined,
        }));
        let literal = self.ctx.add_literal_buffer(values);
        let first = start.0 + 1 + receiver;
        self.emit(OpCode::GetTemplateObject(literal));
        self.emit(OpCode::Sta(VReg(first)));

        for (index, expr) in tagged.expressions.iter().enumerate() {
            self.compile_expression(expr)?;
            self.emit(OpCode::Sta(VReg(first + 1 + index as u16)));
        }

        self.pos_or(pos);
        self.emit(if is_method {
            OpCode::CallThis { start, argc }
        } else {
            OpCode::Call { start, argc }
        });
        Ok(())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn compile_logical(&mut self, logical: &'a LogicalExpression) -> Result<()> {
        let end = self.new_label();
        self.compile_expression(&logical.left)?;
        self.short_circuit(logical.operator, end)?;
        self.compile_expression(&logical.right)?;
        self.set_label(end)
    }

    /// Jumps to `end` when the accumulator already decides `operator`;
    /// falls through when the right operand has to be evaluated.
    fn short_circuit(&mut self, operator: LogicalOperator, end: Label) -> Result<()> {
        match operator {
            LogicalOperator::And => self.emit(OpCode::Jfalse(end)),
            LogicalOperator::Or => self.emit(OpCode::Jtrue(end)),
            LogicalOperator::NullishCoalescing => {
                let rhs = self.new_label();
                self.emit(OpCode::Jnullish(rhs));
                self.emit(OpCode::Jmp(end));
                self.set_label(rhs)?;
            }
        }
        Ok(())
    }

    fn compile_unary(&mut self, unary: &'a UnaryExpression) -> Result<()> {
        match unary.operator {
            UnaryOperator::Delete => self.compile_delete(&unary.argument),
            UnaryOperator::Void => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::LdaUndefined);
                Ok(())
            }
            UnaryOperator::Typeof => {
                match &*unary.argument {
                    Expression::Identifier(ident) => self.load_var_for_typeof(&ident.name)?,
                    argument => self.compile_expression(argument)?,
                }
                self.emit(OpCode::Unary(UnaryOperator::Typeof));
                Ok(())
            }
            operator => {
                self.compile_expression(&unary.argument)?;
                self.emit(OpCode::Unary(operator));
                Ok(())
            }
        }
    }

    fn compile_delete(&mut self, argument: &'a Expression) -> Result<()> {
        match argument {
            Expression::Member(member) if !matches!(*member.object, Expression::Super(_)) => {
                let obj = self.alloc_reg()?;
                self.compile_expression(&member.object)?;
                self.emit(OpCode::Sta(obj));
                match &member.property {
                    MemberProperty::Identifier(ident) => self.emit(OpCode::LdaStr(ident.name.clone())),
                    MemberProperty::Expression(expr) => self.compile_expression(expr)?,
                }
                self.emit(OpCode::DelObjProp { obj });
            }
            Expression::Identifier(ident) => {
                // Declared bindings cannot be deleted
                let found = self.tree.find(self.scope, &ident.name);
                self.emit(if found.variable.is_some() {
                    OpCode::LdaFalse
                } else {
                    OpCode::LdaTrue
                });
            }
            argument => {
                self.compile_expression(argument)?;
                self.emit(OpCode::LdaTrue);
            }
        }
        Ok(())
    }

    fn compile_assignment(&mut self, assignment: &'a AssignmentExpression) -> Result<()> {
        let operator = assignment.operator;
        if operator == AssignmentOperator::Assign {
            let reference = LReference::create(self, &assignment.left, false)?;
            self.compile_expression(&assignment.right)?;
            return reference.set_value(self);
        }

        let reference = LReference::create(self, &assignment.left, false)?;
        if reference.is_destructuring() {
            return Err(Error::semantic("Invalid left-hand side in assignment", self.pos));
        }
        reference.get_value(self)?;

        if let Some(logical) = operator.logical_operator() {
            let end = self.new_label();
            self.short_circuit(logical, end)?;
            self.compile_expression(&assignment.right)?;
            reference.set_value(self)?;
            return self.set_label(end);
        }

        let op = operator
            .binary_operator()
            .ok_or_else(|| Error::internal(format!("unexpected assignment operator {:?}", operator)))?;
        let lhs = self.alloc_reg()?;
        self.emit(OpCode::Sta(lhs));
        self.compile_expression(&assignment.right)?;
        self.emit(OpCode::Binary { op, lhs });
        reference.set_value(self)
    }

    fn compile_update(&mut self, update: &'a UpdateExpression) -> Result<()> {
        let reference = LReference::create_from_expression(self, &update.argument)?;
        reference.get_value(self)?;
        self.emit(OpCode::ToNumeric);

        let step = match update.operator {
            UpdateOperator::Increment => OpCode::Inc,
            UpdateOperator::Decrement => OpCode::Dec,
        };
        if update.prefix {
            self.emit(step);
            return reference.set_value(self);
        }

        let old = self.alloc_reg()?;
        self.emit(OpCode::Sta(old));
        self.emit(step);
        reference.set_value(self)?;
        self.emit(OpCode::Lda(old));
        Ok(())
    }

    // ========================================================================
    // Property access and calls
    // ========================================================================

    /// Short-circuit label of the innermost optional chain.
    fn optional_chain_label(&mut self) -> Result<Label> {
        let Some(chain) = self.chain.as_mut() else {
            return Err(Error::internal("optional access outside of an optional chain").at(self.pos));
        };
        if let Some(label) = chain.nullish {
            return Ok(label);
        }
        let label = self.labels.alloc();
        chain.nullish = Some(label);
        Ok(label)
    }

    fn compile_chain(&mut self, inner: &'a Expression) -> Result<()> {
        let saved = self.chain.replace(ChainState::default());
        let result = self.compile_expression(inner);
        let chain = std::mem::replace(&mut self.chain, saved);
        result?;

        if let Some(nullish) = chain.and_then(|chain| chain.nullish) {
            let done = self.new_label();
            self.emit(OpCode::Jmp(done));
            self.set_label(nullish)?;
            self.emit(OpCode::LdaUndefined);
            self.set_label(done)?;
        }
        Ok(())
    }

    /// Evaluates the object of a member expression into `obj`, checking
    /// the `?.` short circuit. `super` evaluates to `this`.
    fn compile_member_object(&mut self, member: &'a MemberExpression, obj: VReg) -> Result<bool> {
        let is_super = matches!(*member.object, Expression::Super(_));
        if is_super {
            self.load_var(THIS_VAR)?;
        } else {
            self.compile_expression(&member.object)?;
        }
        if member.optional {
            let label = self.optional_chain_label()?;
            self.emit(OpCode::Jnullish(label));
        }
        self.emit(OpCode::Sta(obj));
        Ok(is_super)
    }

    /// Loads `obj.property` (or the super property) into the accumulator.
    fn load_property(&mut self, member: &'a MemberExpression, obj: VReg, is_super: bool) -> Result<()> {
        if member.pos != Position::default() {
            self.pos = member.pos;
        }
        match &member.property {
            MemberProperty::Identifier(ident) => {
                let name = ident.name.clone();
                self.emit(if is_super {
                    OpCode::LdSuperByName { this: obj, name }
                } else {
                    OpCode::LdObjByName { obj, name }
                });
            }
            MemberProperty::Expression(expr) => {
                let key = self.alloc_reg()?;
                self.compile_expression(expr)?;
                self.emit(OpCode::Sta(key));
                self.emit(if is_super {
                    OpCode::LdSuperByValue { this: obj, key }
                } else {
                    OpCode::LdObjByValue { obj, key }
                });
            }
        }
        Ok(())
    }

    fn compile_member(&mut self, member: &'a MemberExpression) -> Result<()> {
        let obj = self.alloc_reg()?;
        let is_super = self.compile_member_object(member, obj)?;
        self.load_property(member, obj, is_super)
    }

    fn compile_call(&mut self, call: &'a CallExpression) -> Result<()> {
        if matches!(*call.callee, Expression::Super(_)) {
            return Err(Error::semantic("'super' call is not supported", call.pos));
        }
        let pos = call.pos;
        let is_method = matches!(*call.callee, Expression::Member(_));

        if call.arguments.iter().any(|arg| matches!(arg, ArrayElement::Spread(_))) {
            let callee = self.alloc_reg()?;
            let this = self.alloc_reg()?;
            self.load_callee(call, Some(this))?;
            self.emit(OpCode::Sta(callee));
            if !is_method {
                self.emit(OpCode::LdaUndefined);
                self.emit(OpCode::Sta(this));
            }
            let args = self.alloc_reg()?;
            self.compile_array(call.arguments.iter().map(Some), call.arguments.len())?;
            self.emit(OpCode::Sta(args));
            self.pos_or(pos);
            self.emit(OpCode::CallSpread { callee, this, args });
            return Ok(());
        }

        // [callee, this?, args...]
        let argc = argument_count(call.arguments.len())?;
        let receiver = u16::from(is_method);
        let start = self
            .regs
            .alloc_n(1 + u32::from(receiver) + u32::from(argc))
            .map_err(|err| err.at(pos))?;
        let this = is_method.then_some(VReg(start.0 + 1));
        self.load_callee(call, this)?;
        self.emit(OpCode::Sta(start));
        self.store_arguments(&call.arguments, start.0 + 1 + receiver)?;

        self.pos_or(pos);
        self.emit(if is_method {
            OpCode::CallThis { start, argc }
        } else {
            OpCode::Call { start, argc }
        });
        Ok(())
    }

    /// Loads the callee into the accumulator; method callees also store
    /// their receiver into `this`. An optional call short-circuits on a
    /// nullish callee.
    fn load_callee(&mut self, call: &'a CallExpression, this: Option<VReg>) -> Result<()> {
        match (&*call.callee, this) {
            (Expression::Member(member), Some(this)) => {
                let is_super = self.compile_member_object(member, this)?;
                self.load_property(member, this, is_super)?;
            }
            (callee, _) => self.compile_expression(callee)?,
        }
        if call.optional {
            let label = self.optional_chain_label()?;
            self.emit(OpCode::Jnullish(label));
        }
        Ok(())
    }

    /// Evaluates spread-free arguments into consecutive registers starting
    /// at `first`.
    fn store_arguments(&mut self, arguments: &'a [ArrayElement], first: u16) -> Result<()> {
        for (index, arg) in arguments.iter().enumerate() {
            if let ArrayElement::Expression(expr) = arg {
                self.compile_expression(expr)?;
                self.emit(OpCode::Sta(VReg(first + index as u16)));
            }
        }
        Ok(())
    }

    fn compile_new(&mut self, new: &'a NewExpression) -> Result<()> {
        let pos = new.pos;
        if new.arguments.iter().any(|arg| matches!(arg, ArrayElement::Spread(_))) {
            let ctor = self.alloc_reg()?;
            self.compile_expression(&new.callee)?;
            self.emit(OpCode::Sta(ctor));
            let args = self.alloc_reg()?;
            self.compile_array(new.arguments.iter().map(Some), new.arguments.len())?;
            self.emit(OpCode::Sta(args));
            self.pos_or(pos);
            self.emit(OpCode::NewObjSpread { ctor, args });
            return Ok(());
        }

        let argc = argument_count(new.arguments.len())?;
        let start = self.regs.alloc_n(u32::from(argc) + 2).map_err(|err| err.at(pos))?;
        self.compile_expression(&new.callee)?;
        self.emit(OpCode::Sta(start));
        // new.target is the constructor itself
        self.emit(OpCode::Sta(VReg(start.0 + 1)));
        self.store_arguments(&new.arguments, start.0 + 2)?;
        self.pos_or(pos);
        self.emit(OpCode::NewObj { start, argc });
        Ok(())
    }

    fn pos_or(&mut self, pos: Position) {
        if pos != Position::default() {
            self.pos = pos;
        }
    }
}

fn argument_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| Error::internal(format!("too many arguments: {}", len)))
}

/// Integral numbers that fit an `LdaInt` operand. `-0` does not.
fn small_integer(value: f64) -> Option<i32> {
    if value.fract() != 0.0 || (value == 0.0 && value.is_sign_negative()) {
        return None;
    }
    if value < f64::from(i32::MIN) || value > f64::from(i32::MAX) {
        return None;
    }
    Some(value as i32)
}

fn literal_value(literal: &Literal) -> Option<LiteralValue> {
    Some(match literal {
        Literal::Number(value) => match small_integer(*value) {
            Some(value) if value >= 0 => LiteralValue::Integer(value as u32),
            _ => LiteralValue::Number(*value),
        },
        Literal::String(value) => LiteralValue::String(value.clone()),
        Literal::Boolean(value) => LiteralValue::Boolean(*value),
        Literal::Null => LiteralValue::Null,
        Literal::Undefined => LiteralValue::Undefined,
        Literal::BigInt(_) => return None,
    })
}
