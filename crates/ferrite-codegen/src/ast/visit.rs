// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Read-only AST traversal.
//!
//! Implementors override the hooks they care about and call the matching
//! `walk_*` function to keep descending. Scope-introducing nodes report the
//! scope ids written by the binder through `enter_scope`/`leave_scope`, in
//! the same evaluation order the code generator uses.

use super::*;

/// AST visitor with default pre-order traversal.
pub trait Visitor<'ast>: Sized {
    /// Called for every statement.
    fn visit_statement(&mut self, stmt: &'ast Statement) {
        walk_statement(self, stmt);
    }

    /// Called for every expression.
    fn visit_expression(&mut self, expr: &'ast Expression) {
        walk_expression(self, expr);
    }

    /// Called for every binding or assignment pattern.
    fn visit_pattern(&mut self, pattern: &'ast Pattern) {
        walk_pattern(self, pattern);
    }

    /// Called for function declarations and expressions.
    fn visit_function(&mut self, func: &'ast Function) {
        walk_function(self, func);
    }

    /// Called for identifiers in reference or binding position.
    fn visit_identifier(&mut self, _ident: &'ast Identifier) {}

    /// A scope-introducing node is entered.
    fn enter_scope(&mut self, _scope: ScopeId) {}

    /// The most recently entered scope is left.
    fn leave_scope(&mut self) {}
}

/// Visits every statement of a program inside its top-level scope.
pub fn walk_program<'ast, V: Visitor<'ast>>(visitor: &mut V, program: &'ast Program) {
    visitor.enter_scope(program.scope);
    for stmt in &program.body {
        visitor.visit_statement(stmt);
    }
    visitor.leave_scope();
}

fn walk_declaration<'ast, V: Visitor<'ast>>(visitor: &mut V, decl: &'ast VariableDeclaration) {
    for declarator in &decl.declarations {
        visitor.visit_pattern(&declarator.id);
        if let Some(init) = &declarator.init {
            visitor.visit_expression(init);
        }
    }
}

fn walk_block<'ast, V: Visitor<'ast>>(visitor: &mut V, block: &'ast BlockStatement) {
    visitor.enter_scope(block.scope);
    for stmt in &block.body {
        visitor.visit_statement(stmt);
    }
    visitor.leave_scope();
}

fn walk_for_in_left<'ast, V: Visitor<'ast>>(visitor: &mut V, left: &'ast ForInLeft) {
    match left {
        ForInLeft::Declaration(decl) => walk_declaration(visitor, decl),
        ForInLeft::Pattern(pattern) => visitor.visit_pattern(pattern),
    }
}

/// Descends into the children of a statement.
pub fn walk_statement<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: &'ast Statement) {
    match stmt {
        Statement::VariableDeclaration(decl) => walk_declaration(visitor, decl),
        Statement::FunctionDeclaration(func) => visitor.visit_function(func),
        Statement::ClassDeclaration(class) => walk_class(visitor, class),
        Statement::Expression(expr) => visitor.visit_expression(&expr.expression),
        Statement::Block(block) => walk_block(visitor, block),
        Statement::If(if_stmt) => {
            visitor.visit_expression(&if_stmt.test);
            visitor.visit_statement(&if_stmt.consequent);
            if let Some(alt) = &if_stmt.alternate {
                visitor.visit_statement(alt);
            }
        }
        Statement::Switch(switch) => {
            visitor.visit_expression(&switch.discriminant);
            visitor.enter_scope(switch.scope);
            for case in &switch.cases {
                if let Some(test) = &case.test {
                    visitor.visit_expression(test);
                }
                for stmt in &case.consequent {
                    visitor.visit_statement(stmt);
                }
            }
            visitor.leave_scope();
        }
        Statement::While(while_stmt) => {
            visitor.visit_expression(&while_stmt.test);
            visitor.visit_statement(&while_stmt.body);
        }
        Statement::DoWhile(do_while) => {
            visitor.visit_statement(&do_while.body);
            visitor.visit_expression(&do_while.test);
        }
        Statement::For(for_stmt) => {
            visitor.enter_scope(for_stmt.scope);
            match &for_stmt.init {
                Some(ForInit::Declaration(decl)) => walk_declaration(visitor, decl),
                Some(ForInit::Expression(expr)) => visitor.visit_expression(expr),
                None => {}
            }
            if let Some(test) = &for_stmt.test {
                visitor.visit_expression(test);
            }
            if let Some(update) = &for_stmt.update {
                visitor.visit_expression(update);
            }
            visitor.visit_statement(&for_stmt.body);
            visitor.leave_scope();
        }
        Statement::ForIn(for_in) => {
            visitor.visit_expression(&for_in.right);
            visitor.enter_scope(for_in.scope);
            walk_for_in_left(visitor, &for_in.left);
            visitor.visit_statement(&for_in.body);
            visitor.leave_scope();
        }
        Statement::ForOf(for_of) => {
            visitor.visit_expression(&for_of.right);
            visitor.enter_scope(for_of.scope);
            walk_for_in_left(visitor, &for_of.left);
            visitor.visit_statement(&for_of.body);
            visitor.leave_scope();
        }
        Statement::Return(ret) => {
            if let Some(arg) = &ret.argument {
                visitor.visit_expression(arg);
            }
        }
        Statement::Throw(throw) => visitor.visit_expression(&throw.argument),
        Statement::Try(try_stmt) => {
            walk_block(visitor, &try_stmt.block);
            if let Some(handler) = &try_stmt.handler {
                visitor.enter_scope(handler.scope);
                if let Some(param) = &handler.param {
                    visitor.visit_pattern(param);
                }
                for stmt in &handler.body {
                    visitor.visit_statement(stmt);
                }
                visitor.leave_scope();
            }
            if let Some(finalizer) = &try_stmt.finalizer {
                walk_block(visitor, finalizer);
            }
        }
        Statement::Labeled(labeled) => visitor.visit_statement(&labeled.body),
        Statement::Break(_) | Statement::Continue(_) | Statement::Debugger(_) | Statement::Empty => {}
    }
}

/// Heritage first, then the constructor, then members in source order with
/// each computed key ahead of its function.
pub fn walk_class<'ast, V: Visitor<'ast>>(visitor: &mut V, class: &'ast Class) {
    if let Some(super_class) = &class.super_class {
        visitor.visit_expression(super_class);
    }
    if let Some(constructor) = &class.constructor {
        visitor.visit_function(constructor);
    }
    for member in &class.members {
        walk_key(visitor, &member.key);
        visitor.visit_function(&member.value);
    }
}

fn walk_elements<'ast, V: Visitor<'ast>>(visitor: &mut V, elements: &'ast [ArrayElement]) {
    for element in elements {
        match element {
            ArrayElement::Expression(expr) | ArrayElement::Spread(expr) => visitor.visit_expression(expr),
        }
    }
}

fn walk_key<'ast, V: Visitor<'ast>>(visitor: &mut V, key: &'ast PropertyKey) {
    if let PropertyKey::Computed(expr) = key {
        visitor.visit_expression(expr);
    }
}

fn walk_member<'ast, V: Visitor<'ast>>(visitor: &mut V, member: &'ast MemberExpression) {
    visitor.visit_expression(&member.object);
    if let MemberProperty::Expression(prop) = &member.property {
        visitor.visit_expression(prop);
    }
}

/// Descends into the children of an expression.
pub fn walk_expression<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: &'ast Expression) {
    match expr {
        Expression::Identifier(ident) => visitor.visit_identifier(ident),
        Expression::Literal(_) | Expression::This(_) | Expression::Super(_) => {}
        Expression::Array(array) => {
            for element in array.elements.iter().flatten() {
                match element {
                    ArrayElement::Expression(expr) | ArrayElement::Spread(expr) => {
                        visitor.visit_expression(expr)
                    }
                }
            }
        }
        Expression::Object(object) => {
            for prop in &object.properties {
                match prop {
                    Property::Init { key, value } => {
                        walk_key(visitor, key);
                        visitor.visit_expression(value);
                    }
                    Property::Spread(expr) => visitor.visit_expression(expr),
                }
            }
        }
        Expression::Binary(binary) => {
            visitor.visit_expression(&binary.left);
            visitor.visit_expression(&binary.right);
        }
        Expression::Logical(logical) => {
            visitor.visit_expression(&logical.left);
            visitor.visit_expression(&logical.right);
        }
        Expression::Unary(unary) => visitor.visit_expression(&unary.argument),
        Expression::Update(update) => visitor.visit_expression(&update.argument),
        Expression::Assignment(assign) => {
            visitor.visit_pattern(&assign.left);
            visitor.visit_expression(&assign.right);
        }
        Expression::Call(call) => {
            visitor.visit_expression(&call.callee);
            walk_elements(visitor, &call.arguments);
        }
        Expression::New(new) => {
            visitor.visit_expression(&new.callee);
            walk_elements(visitor, &new.arguments);
        }
        Expression::Member(member) => walk_member(visitor, member),
        Expression::Chain(inner) => visitor.visit_expression(inner),
        Expression::Conditional(cond) => {
            visitor.visit_expression(&cond.test);
            visitor.visit_expression(&cond.consequent);
            visitor.visit_expression(&cond.alternate);
        }
        Expression::Function(func) => visitor.visit_function(func),
        Expression::Sequence(seq) => {
            for expr in &seq.expressions {
                visitor.visit_expression(expr);
            }
        }
        Expression::Template(template) => {
            for expr in &template.expressions {
                visitor.visit_expression(expr);
            }
        }
        Expression::TaggedTemplate(tagged) => {
            visitor.visit_expression(&tagged.tag);
            for expr in &tagged.expressions {
                visitor.visit_expression(expr);
            }
        }
        Expression::Yield(yield_expr) => {
            if let Some(arg) = &yield_expr.argument {
                visitor.visit_expression(arg);
            }
        }
        Expression::Await(await_expr) => visitor.visit_expression(&await_expr.argument),
    }
}

fn walk_pattern_element<'ast, V: Visitor<'ast>>(visitor: &mut V, element: &'ast PatternElement) {
    visitor.visit_pattern(&element.target);
    if let Some(default) = &element.default {
        visitor.visit_expression(default);
    }
}

/// Descends into the children of a pattern.
pub fn walk_pattern<'ast, V: Visitor<'ast>>(visitor: &mut V, pattern: &'ast Pattern) {
    match pattern {
        Pattern::Identifier(ident) => visitor.visit_identifier(ident),
        Pattern::Member(member) => walk_member(visitor, member),
        Pattern::Array(array) => {
            for element in array.elements.iter().flatten() {
                walk_pattern_element(visitor, element);
            }
            if let Some(rest) = &array.rest {
                visitor.visit_pattern(rest);
            }
        }
        Pattern::Object(object) => {
            for prop in &object.properties {
                walk_key(visitor, &prop.key);
                walk_pattern_element(visitor, &prop.value);
            }
            if let Some(rest) = &object.rest {
                visitor.visit_pattern(rest);
            }
        }
    }
}

/// Descends into parameters and body of a function, inside its scope.
pub fn walk_function<'ast, V: Visitor<'ast>>(visitor: &mut V, func: &'ast Function) {
    visitor.enter_scope(func.scope);
    for param in &func.params {
        walk_pattern_element(visitor, param);
    }
    if let Some(rest) = &func.rest {
        visitor.visit_pattern(rest);
    }
    match &func.body {
        FunctionBody::Block(body) => {
            for stmt in body {
                visitor.visit_statement(stmt);
            }
        }
        FunctionBody::Expression(expr) => visitor.visit_expression(expr),
    }
    visitor.leave_scope();
}

/// Collects every function of a program, indexed by [`FunctionId`].
///
/// Slot 0 (the top level) is always `None`.
pub fn collect_functions(program: &Program, count: usize) -> Vec<Option<&Function>> {
    struct Collector<'ast> {
        functions: Vec<Option<&'ast Function>>,
    }

    impl<'ast> Visitor<'ast> for Collector<'ast> {
        fn visit_function(&mut self, func: &'ast Function) {
            let index = func.id.0 as usize;
            if index >= self.functions.len() {
                self.functions.resize(index + 1, None);
            }
            self.functions[index] = Some(func);
            walk_function(self, func);
        }
    }

    let mut collector = Collector {
        functions: vec![None; count],
    };
    walk_program(&mut collector, program);
    collector.functions
}
