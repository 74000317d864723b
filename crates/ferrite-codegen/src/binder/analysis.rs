// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope analysis: declaration, capture detection and slot assignment.

use rustc_hash::FxHashSet;
use tracing::debug;

use super::*;
use crate::ast::visit::{self, Visitor};
use crate::ast::*;

/// Builds the scope tree of `program`.
///
/// Writes the scope and function ids into the AST, resolves every
/// identifier reference to mark captured bindings, then assigns each
/// binding a register, an environment slot or global storage.
pub fn bind(program: &mut Program) -> Result<ScopeTree> {
    let mut declarer = Declarer {
        tree: ScopeTree::new(),
        scope: ScopeId(0),
        hoisted: FxHashSet::default(),
    };
    declarer.program(program)?;
    let mut tree = declarer.tree;

    let mut resolver = Resolver {
        tree: &mut tree,
        scopes: Vec::new(),
        error: None,
    };
    visit::walk_program(&mut resolver, program);
    if let Some(err) = resolver.error {
        return Err(err);
    }

    assign_storage(&mut tree);
    debug!(
        scopes = tree.len(),
        functions = tree.function_count(),
        "scope analysis complete"
    );
    Ok(tree)
}

// ============================================================================
// Pass 1: declarations
// ============================================================================

struct Declarer {
    tree: ScopeTree,
    scope: ScopeId,
    /// `(scope, name)` pairs a `var` was hoisted through
    hoisted: FxHashSet<(ScopeId, String)>,
}

impl Declarer {
    fn program(&mut self, program: &mut Program) -> Result<()> {
        let kind = match program.kind {
            ProgramKind::Script => ScopeKind::Global,
            ProgramKind::Module => ScopeKind::Module,
        };
        let root = self.tree.add_scope(kind, None, FunctionId::TOP_LEVEL);
        program.scope = root;
        self.scope = root;
        self.declare_mandatory(root)?;
        self.statements(&mut program.body)
    }

    fn declare_mandatory(&mut self, scope: ScopeId) -> Result<()> {
        for name in [FUNC_VAR, NEW_TARGET_VAR, THIS_VAR] {
            self.tree.declare(scope, name, DeclKind::Mandatory, Position::default())?;
        }
        Ok(())
    }

    fn enter(&mut self, kind: ScopeKind) -> (ScopeId, ScopeId) {
        let function = self.tree.scope(self.scope).function;
        let scope = self.tree.add_scope(kind, Some(self.scope), function);
        let saved = std::mem::replace(&mut self.scope, scope);
        (scope, saved)
    }

    fn declare_names(&mut self, pattern: &Pattern, kind: DeclKind) -> Result<()> {
        let mut names = Vec::new();
        pattern.bound_names(&mut names);
        for ident in names {
            match kind {
                DeclKind::Var => self.declare_var(&ident.name, ident.pos)?,
                _ => {
                    if self.hoisted.contains(&(self.scope, ident.name.clone())) {
                        return Err(Error::semantic(
                            format!("Identifier '{}' has already been declared", ident.name),
                            ident.pos,
                        ));
                    }
                    self.tree.declare(self.scope, &ident.name, kind, ident.pos)?;
                }
            }
        }
        Ok(())
    }

    fn declare_var(&mut self, name: &str, pos: Position) -> Result<()> {
        let target = self.tree.function_scope(self.scope);
        let mut current = self.scope;
        while current != target {
            if let Some(&existing) = self.tree.scope(current).bindings.get(name) {
                if self.tree.variable(existing).kind != DeclKind::Catch {
                    return Err(Error::semantic(
                        format!("Identifier '{}' has already been declared", name),
                        pos,
                    ));
                }
            }
            self.hoisted.insert((current, name.to_string()));
            match self.tree.scope(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        self.tree.declare(target, name, DeclKind::Var, pos)?;
        Ok(())
    }

    fn declaration(&mut self, decl: &mut VariableDeclaration) -> Result<()> {
        let kind = match decl.kind {
            VariableKind::Var => DeclKind::Var,
            VariableKind::Let => DeclKind::Let,
            VariableKind::Const => DeclKind::Const,
        };
        for declarator in &mut decl.declarations {
            self.declare_names(&declarator.id, kind)?;
            self.pattern(&mut declarator.id)?;
            if let Some(init) = &mut declarator.init {
                self.expression(init)?;
            }
        }
        Ok(())
    }

    fn statements(&mut self, stmts: &mut [Statement]) -> Result<()> {
        for stmt in stmts {
            self.statement(stmt)?;
        }
        Ok(())
    }

    fn block(&mut self, block: &mut BlockStatement) -> Result<()> {
        let (scope, saved) = self.enter(ScopeKind::Block);
        block.scope = scope;
        let result = self.statements(&mut block.body);
        self.scope = saved;
        result
    }

    fn for_in_left(&mut self, left: &mut ForInLeft) -> Result<()> {
        match left {
            ForInLeft::Declaration(decl) => self.declaration(decl),
            ForInLeft::Pattern(pattern) => self.pattern(pattern),
        }
    }

    fn statement(&mut self, stmt: &mut Statement) -> Result<()> {
        match stmt {
            Statement::VariableDeclaration(decl) => self.declaration(decl),
            Statement::FunctionDeclaration(func) => {
                if let Some(name) = &func.name {
                    if self.hoisted.contains(&(self.scope, name.name.clone())) {
                        return Err(Error::semantic(
                            format!("Identifier '{}' has already been declared", name.name),
                            name.pos,
                        ));
                    }
                    self.tree.declare(self.scope, &name.name, DeclKind::Function, name.pos)?;
                }
                self.function(func, false)
            }
            Statement::ClassDeclaration(class) => {
                self.declare_names(&Pattern::Identifier(class.id.clone()), DeclKind::Class)?;
                self.class(class)
            }
            Statement::Expression(expr) => self.expression(&mut expr.expression),
            Statement::Block(block) => self.block(block),
            Statement::If(if_stmt) => {
                self.expression(&mut if_stmt.test)?;
                self.statement(&mut if_stmt.consequent)?;
                if let Some(alt) = &mut if_stmt.alternate {
                    self.statement(alt)?;
                }
                Ok(())
            }
            Statement::Switch(switch) => {
                self.expression(&mut switch.discriminant)?;
                let (scope, saved) = self.enter(ScopeKind::Switch);
                switch.scope = scope;
                let result = switch.cases.iter_mut().try_for_each(|case| {
                    if let Some(test) = &mut case.test {
                        self.expression(test)?;
                    }
                    self.statements(&mut case.consequent)
                });
                self.scope = saved;
                result
            }
            Statement::While(while_stmt) => {
                self.expression(&mut while_stmt.test)?;
                self.statement(&mut while_stmt.body)
            }
            Statement::DoWhile(do_while) => {
                self.statement(&mut do_while.body)?;
                self.expression(&mut do_while.test)
            }
            Statement::For(for_stmt) => {
                let (scope, saved) = self.enter(ScopeKind::Loop);
                for_stmt.scope = scope;
                let result = (|| {
                    match &mut for_stmt.init {
                        Some(ForInit::Declaration(decl)) => self.declaration(decl)?,
                        Some(ForInit::Expression(expr)) => self.expression(expr)?,
                        None => {}
                    }
                    if let Some(test) = &mut for_stmt.test {
                        self.expression(test)?;
                    }
                    if let Some(update) = &mut for_stmt.update {
                        self.expression(update)?;
                    }
                    self.statement(&mut for_stmt.body)
                })();
                self.scope = saved;
                result
            }
            Statement::ForIn(ForInStatement {
                left,
                right,
                body,
                scope,
                ..
            })
            | Statement::ForOf(ForOfStatement {
                left,
                right,
                body,
                scope,
                ..
            }) => {
                self.expression(right)?;
                let (loop_scope, saved) = self.enter(ScopeKind::Loop);
                *scope = loop_scope;
                let result = self
                    .for_in_left(left)
                    .and_then(|()| self.statement(body));
                self.scope = saved;
                result
            }
            Statement::Return(ret) => match &mut ret.argument {
                Some(arg) => self.expression(arg),
                None => Ok(()),
            },
            Statement::Throw(throw) => self.expression(&mut throw.argument),
            Statement::Try(try_stmt) => {
                self.block(&mut try_stmt.block)?;
                if let Some(handler) = &mut try_stmt.handler {
                    let (scope, saved) = self.enter(ScopeKind::Catch);
                    handler.scope = scope;
                    let result = (|| {
                        if let Some(param) = &mut handler.param {
                            self.declare_names(param, DeclKind::Catch)?;
                            self.pattern(param)?;
                        }
                        self.statements(&mut handler.body)
                    })();
                    self.scope = saved;
                    result?;
                }
                if let Some(finalizer) = &mut try_stmt.finalizer {
                    self.block(finalizer)?;
                }
                Ok(())
            }
            Statement::Labeled(labeled) => self.statement(&mut labeled.body),
            Statement::Break(_) | Statement::Continue(_) | Statement::Debugger(_) | Statement::Empty => Ok(()),
        }
    }

    fn function(&mut self, func: &mut Function, is_expression: bool) -> Result<()> {
        let id = self.tree.add_function();
        func.id = id;
        let scope = self.tree.add_scope(ScopeKind::Function, Some(self.scope), id);
        func.scope = scope;
        self.tree.scope_mut(scope).is_arrow = func.is_arrow;
        let saved = std::mem::replace(&mut self.scope, scope);

        let result = (|| {
            if !func.is_arrow {
                self.declare_mandatory(scope)?;
            }
            for param in &mut func.params {
                self.declare_names(&param.target, DeclKind::Param)?;
                self.pattern_element(param)?;
            }
            if let Some(rest) = &mut func.rest {
                self.declare_names(rest, DeclKind::Param)?;
                self.pattern(rest)?;
            }
            match &mut func.body {
                FunctionBody::Block(body) => self.statements(body)?,
                FunctionBody::Expression(expr) => self.expression(expr)?,
            }
            if is_expression {
                if let Some(name) = &func.name {
                    if !self.tree.scope(scope).bindings.contains_key(&name.name) {
                        self.tree.declare(scope, &name.name, DeclKind::Function, name.pos)?;
                    }
                }
            }
            Ok(())
        })();

        self.scope = saved;
        result
    }

    fn class(&mut self, class: &mut Class) -> Result<()> {
        if let Some(super_class) = &mut class.super_class {
            self.expression(super_class)?;
        }
        if let Some(constructor) = &mut class.constructor {
            self.function(constructor, false)?;
        }
        for member in &mut class.members {
            if let PropertyKey::Computed(key) = &mut member.key {
                self.expression(key)?;
            }
            self.function(&mut member.value, false)?;
        }
        Ok(())
    }

    fn pattern_element(&mut self, element: &mut PatternElement) -> Result<()> {
        self.pattern(&mut element.target)?;
        if let Some(default) = &mut element.default {
            self.expression(default)?;
        }
        Ok(())
    }

    /// Walks the expressions nested in a pattern (defaults, computed keys).
    fn pattern(&mut self, pattern: &mut Pattern) -> Result<()> {
        match pattern {
            Pattern::Identifier(_) => Ok(()),
            Pattern::Member(member) => self.member(member),
            Pattern::Array(array) => {
                for element in array.elements.iter_mut().flatten() {
                    self.pattern_element(element)?;
                }
                match &mut array.rest {
                    Some(rest) => self.pattern(rest),
                    None => Ok(()),
                }
            }
            Pattern::Object(object) => {
                for prop in &mut object.properties {
                    if let PropertyKey::Computed(key) = &mut prop.key {
                        self.expression(key)?;
                    }
                    self.pattern_element(&mut prop.value)?;
                }
                match &mut object.rest {
                    Some(rest) => self.pattern(rest),
                    None => Ok(()),
                }
            }
        }
    }

    fn member(&mut self, member: &mut MemberExpression) -> Result<()> {
        self.expression(&mut member.object)?;
        if let MemberProperty::Expression(prop) = &mut member.property {
            self.expression(prop)?;
        }
        Ok(())
    }

    fn elements(&mut self, elements: &mut [ArrayElement]) -> Result<()> {
        for element in elements {
            match element {
                ArrayElement::Expression(expr) | ArrayElement::Spread(expr) => self.expression(expr)?,
            }
        }
        Ok(())
    }

    fn expression(&mut self, expr: &mut Expression) -> Result<()> {
        match expr {
            Expression::Literal(_)
            | Expression::Identifier(_)
            | Expression::This(_)
            | Expression::Super(_) => Ok(()),
            Expression::Array(array) => {
                for element in array.elements.iter_mut().flatten() {
                    match element {
                        ArrayElement::Expression(expr) | ArrayElement::Spread(expr) => {
                            self.expression(expr)?
                        }
                    }
                }
                Ok(())
            }
            Expression::Object(object) => {
                for prop in &mut object.properties {
                    match prop {
                        Property::Init { key, value } => {
                            if let PropertyKey::Computed(key) = key {
                                self.expression(key)?;
                            }
                            self.expression(value)?;
                        }
                        Property::Spread(expr) => self.expression(expr)?,
                    }
                }
                Ok(())
            }
            Expression::Binary(binary) => {
                self.expression(&mut binary.left)?;
                self.expression(&mut binary.right)
            }
            Expression::Logical(logical) => {
                self.expression(&mut logical.left)?;
                self.expression(&mut logical.right)
            }
            Expression::Unary(unary) => self.expression(&mut unary.argument),
            Expression::Update(update) => self.expression(&mut update.argument),
            Expression::Assignment(assign) => {
                self.pattern(&mut assign.left)?;
                self.expression(&mut assign.right)
            }
            Expression::Call(call) => {
                self.expression(&mut call.callee)?;
                self.elements(&mut call.arguments)
            }
            Expression::New(new) => {
                self.expression(&mut new.callee)?;
                self.elements(&mut new.arguments)
            }
            Expression::Member(member) => self.member(member),
            Expression::Chain(inner) => self.expression(inner),
            Expression::Conditional(cond) => {
                self.expression(&mut cond.test)?;
                self.expression(&mut cond.consequent)?;
                self.expression(&mut cond.alternate)
            }
            Expression::Function(func) => self.function(func, true),
            Expression::Sequence(seq) => seq
                .expressions
                .iter_mut()
                .try_for_each(|expr| self.expression(expr)),
            Expression::Template(template) => template
                .expressions
                .iter_mut()
                .try_for_each(|expr| self.expression(expr)),
            Expression::TaggedTemplate(tagged) => {
                self.expression(&mut tagged.tag)?;
                tagged
                    .expressions
                    .iter_mut()
                    .try_for_each(|expr| self.expression(expr))
            }
            Expression::Yield(yield_expr) => match &mut yield_expr.argument {
                Some(arg) => self.expression(arg),
                None => Ok(()),
            },
            Expression::Await(await_expr) => self.expression(&mut await_expr.argument),
        }
    }
}

// ============================================================================
// Pass 2: reference resolution
// ============================================================================

struct Resolver<'t> {
    tree: &'t mut ScopeTree,
    scopes: Vec<ScopeId>,
    error: Option<Error>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str, pos: Position) {
        let Some(&scope) = self.scopes.last() else {
            return;
        };
        let found = self.tree.find(scope, name);
        if let Some(var) = found.variable {
            if found.crosses_function {
                self.tree.variable_mut(var).captured = true;
            }
            return;
        }

        if name != "arguments" {
            return;
        }
        let function_scope = self.tree.closest_function_scope(scope);
        if self.tree.scope(function_scope).kind != ScopeKind::Function {
            return;
        }
        match self
            .tree
            .declare(function_scope, name, DeclKind::Mandatory, pos)
        {
            Ok(var) => {
                self.tree.scope_mut(function_scope).uses_arguments = true;
                if self.tree.scope(function_scope).function != self.tree.scope(scope).function {
                    self.tree.variable_mut(var).captured = true;
                }
            }
            Err(err) => {
                self.error.get_or_insert(err);
            }
        }
    }
}

impl<'ast> Visitor<'ast> for Resolver<'_> {
    fn visit_expression(&mut self, expr: &'ast Expression) {
        match expr {
            Expression::This(pos) | Expression::Super(pos) => {
                self.resolve(THIS_VAR, *pos);
            }
            _ => visit::walk_expression(self, expr),
        }
    }

    fn visit_identifier(&mut self, ident: &'ast Identifier) {
        self.resolve(&ident.name, ident.pos);
    }

    fn enter_scope(&mut self, scope: ScopeId) {
        self.scopes.push(scope);
    }

    fn leave_scope(&mut self) {
        self.scopes.pop();
    }
}

// ============================================================================
// Pass 3: storage assignment
// ============================================================================

fn assign_storage(tree: &mut ScopeTree) {
    for index in 0..tree.len() {
        let scope = ScopeId(index as u32);
        let is_global = tree.scope(scope).kind == ScopeKind::Global;
        let declared = tree.scope(scope).declared.clone();

        let mut slots = 0;
        for var in declared {
            let variable = tree.variable_mut(var);
            variable.storage = if is_global && variable.kind != DeclKind::Mandatory {
                Storage::Global
            } else if variable.captured {
                slots += 1;
                Storage::Lexical { slot: slots - 1 }
            } else {
                Storage::Register
            };
        }

        let entry = tree.scope_mut(scope);
        entry.lexical_slots = slots;
        entry.needs_environment = slots > 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;

    fn var_named<'t>(tree: &'t ScopeTree, scope: ScopeId, name: &str) -> &'t Variable {
        let id = tree.scope(scope).bindings[name];
        tree.variable(id)
    }

    #[test]
    fn test_uncaptured_locals_live_in_registers() {
        let mut program = module(vec![let_decl("x", Some(num(1.0)))]);
        let tree = bind(&mut program).unwrap();
        let x = var_named(&tree, program.scope, "x");
        assert_eq!(x.storage, Storage::Register);
        assert!(!tree.scope(program.scope).needs_environment);
    }

    #[test]
    fn test_captured_binding_gets_slot() {
        // let x = 1; function f() { return x; }
        let mut program = module(vec![
            let_decl("x", Some(num(1.0))),
            function_decl("f", vec![], vec![ret(Some(ident("x")))]),
        ]);
        let tree = bind(&mut program).unwrap();
        let x = var_named(&tree, program.scope, "x");
        assert_eq!(x.storage, Storage::Lexical { slot: 0 });
        assert!(tree.scope(program.scope).needs_environment);
        assert_eq!(tree.scope(program.scope).lexical_slots, 1);
    }

    #[test]
    fn test_var_hoists_to_function_scope() {
        let mut program = module(vec![block(vec![var_decl("v", None)])]);
        let tree = bind(&mut program).unwrap();
        assert!(tree.scope(program.scope).bindings.contains_key("v"));
    }

    #[test]
    fn test_duplicate_lexical_declaration() {
        let mut program = module(vec![let_decl("x", None), let_decl("x", None)]);
        let err = bind(&mut program).unwrap_err();
        assert!(!err.is_internal());
        assert!(err.message.contains("'x'"));
    }

    #[test]
    fn test_var_hoisted_through_let_conflicts() {
        let mut program = module(vec![block(vec![let_decl("x", None), var_decl("x", None)])]);
        assert!(bind(&mut program).is_err());
    }

    #[test]
    fn test_script_globals() {
        let mut program = script(vec![var_decl("g", None)]);
        let tree = bind(&mut program).unwrap();
        assert_eq!(var_named(&tree, program.scope, "g").storage, Storage::Global);
        assert_eq!(
            var_named(&tree, program.scope, THIS_VAR).storage,
            Storage::Register
        );
    }

    #[test]
    fn test_arrow_captures_outer_this() {
        // function f() { return () => this; }
        let mut program = module(vec![function_decl(
            "f",
            vec![],
            vec![ret(Some(arrow(vec![], this())))],
        )]);
        let tree = bind(&mut program).unwrap();
        let functions = visit::collect_functions(&program, tree.function_count());
        let f = functions[1].unwrap();
        let this_var = var_named(&tree, f.scope, THIS_VAR);
        assert!(this_var.captured);
        assert!(matches!(this_var.storage, Storage::Lexical { .. }));
        assert!(tree.scope(functions[2].unwrap().scope).is_arrow);
    }

    #[test]
    fn test_arguments_declared_lazily() {
        let mut program = module(vec![function_decl(
            "f",
            vec![],
            vec![ret(Some(ident("arguments")))],
        )]);
        let tree = bind(&mut program).unwrap();
        let functions = visit::collect_functions(&program, tree.function_count());
        let scope = tree.scope(functions[1].unwrap().scope);
        assert!(scope.uses_arguments);
        assert!(scope.bindings.contains_key("arguments"));
    }

    #[test]
    fn test_class_binding_is_lexical() {
        let mut program = module(vec![
            class_decl("C", None, None, vec![method("m", vec![], vec![ret(Some(ident("C")))])]),
        ]);
        let tree = bind(&mut program).unwrap();
        let class = var_named(&tree, program.scope, "C");
        assert_eq!(class.kind, DeclKind::Class);
        assert!(class.kind.is_lexical());
        // The method reads the class binding from its own function
        assert!(class.captured);

        let mut program = module(vec![class_decl("C", None, None, vec![]), var_decl("C", None)]);
        assert!(bind(&mut program).is_err());
    }

    #[test]
    fn test_class_functions_numbered_like_collector() {
        // class C extends (function () {}) { constructor() {} [f()]() {} m() {} }
        let mut program = module(vec![class_decl(
            "C",
            Some(function_expr(None, vec![], vec![])),
            Some(function(Some("constructor"), vec![], vec![])),
            vec![
                computed_method(call(ident("f"), vec![]), vec![], vec![]),
                method("m", vec![], vec![]),
            ],
        )]);
        let tree = bind(&mut program).unwrap();
        let functions = visit::collect_functions(&program, tree.function_count());
        assert_eq!(functions.len(), 5);
        for (index, func) in functions.iter().enumerate().skip(1) {
            assert_eq!(func.unwrap().id, FunctionId(index as u32));
        }
        assert_eq!(functions[2].unwrap().display_name(), "constructor");
        assert_eq!(functions[4].unwrap().display_name(), "m");
    }

    #[test]
    fn test_function_ids_in_preorder() {
        let mut program = module(vec![
            function_decl("a", vec![], vec![expr_stmt(function_expr(None, vec![], vec![]))]),
            function_decl("b", vec![], vec![]),
        ]);
        let tree = bind(&mut program).unwrap();
        let functions = visit::collect_functions(&program, tree.function_count());
        assert_eq!(functions.len(), 4);
        assert!(functions[0].is_none());
        assert_eq!(functions[1].unwrap().display_name(), "a");
        assert_eq!(functions[2].unwrap().display_name(), "");
        assert_eq!(functions[3].unwrap().display_name(), "b");
    }
}
