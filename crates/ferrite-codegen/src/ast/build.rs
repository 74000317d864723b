// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Terse constructors for building trees by hand.
//!
//! Front ends that do not go through JSON, and the test suites, use these
//! to assemble programs. Positions default to `0:0` and scope ids are left
//! for the binder to fill in.

use super::*;

/// A module program.
pub fn module(body: Vec<Statement>) -> Program {
    Program {
        kind: ProgramKind::Module,
        body,
        scope: ScopeId::default(),
    }
}

/// A script program.
pub fn script(body: Vec<Statement>) -> Program {
    Program {
        kind: ProgramKind::Script,
        body,
        scope: ScopeId::default(),
    }
}

/// An identifier node.
pub fn id(name: &str) -> Identifier {
    Identifier {
        name: name.to_string(),
        pos: Position::default(),
    }
}

// ============================================================================
// Expressions
// ============================================================================

/// `name`
pub fn ident(name: &str) -> Expression {
    Expression::Identifier(id(name))
}

/// A number literal.
pub fn num(value: f64) -> Expression {
    Expression::Literal(Literal::Number(value))
}

/// A string literal.
pub fn string(value: &str) -> Expression {
    Expression::Literal(Literal::String(value.to_string()))
}

/// A boolean literal.
pub fn boolean(value: bool) -> Expression {
    Expression::Literal(Literal::Boolean(value))
}

/// `null`
pub fn null() -> Expression {
    Expression::Literal(Literal::Null)
}

/// `this`
pub fn this() -> Expression {
    Expression::This(Position::default())
}

/// `left op right`
pub fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `left && right`, `left || right` or `left ?? right`
pub fn logical(operator: LogicalOperator, left: Expression, right: Expression) -> Expression {
    Expression::Logical(LogicalExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

/// `op argument`
pub fn unary(operator: UnaryOperator, argument: Expression) -> Expression {
    Expression::Unary(UnaryExpression {
        operator,
        argument: Box::new(argument),
    })
}

/// `target = value`
pub fn assign(target: Pattern, value: Expression) -> Expression {
    assign_op(AssignmentOperator::Assign, target, value)
}

/// `target op= value`
pub fn assign_op(operator: AssignmentOperator, target: Pattern, value: Expression) -> Expression {
    Expression::Assignment(AssignmentExpression {
        operator,
        left: Box::new(target),
        right: Box::new(value),
    })
}

/// `++argument` / `argument++` and friends
pub fn update(operator: UpdateOperator, argument: Expression, prefix: bool) -> Expression {
    Expression::Update(UpdateExpression {
        operator,
        argument: Box::new(argument),
        prefix,
    })
}

/// `callee(args)`
pub fn call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        arguments: arguments.into_iter().map(ArrayElement::Expression).collect(),
        optional: false,
        pos: Position::default(),
    })
}

/// `callee?.(args)`
pub fn optional_call(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::Call(CallExpression {
        callee: Box::new(callee),
        arguments: arguments.into_iter().map(ArrayElement::Expression).collect(),
        optional: true,
        pos: Position::default(),
    })
}

/// `new callee(args)`
pub fn new(callee: Expression, arguments: Vec<Expression>) -> Expression {
    Expression::New(NewExpression {
        callee: Box::new(callee),
        arguments: arguments.into_iter().map(ArrayElement::Expression).collect(),
        pos: Position::default(),
    })
}

fn member_node(object: Expression, property: &str, optional: bool) -> MemberExpression {
    MemberExpression {
        object: Box::new(object),
        property: MemberProperty::Identifier(id(property)),
        optional,
        pos: Position::default(),
    }
}

/// `object.property`
pub fn member(object: Expression, property: &str) -> Expression {
    Expression::Member(member_node(object, property, false))
}

/// `object?.property`
pub fn optional_member(object: Expression, property: &str) -> Expression {
    Expression::Member(member_node(object, property, true))
}

/// `object[property]`
pub fn index(object: Expression, property: Expression) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: MemberProperty::Expression(Box::new(property)),
        optional: false,
        pos: Position::default(),
    })
}

/// Wraps an optional chain.
pub fn chain(expr: Expression) -> Expression {
    Expression::Chain(Box::new(expr))
}

/// `test ? consequent : alternate`
pub fn conditional(test: Expression, consequent: Expression, alternate: Expression) -> Expression {
    Expression::Conditional(ConditionalExpression {
        test: Box::new(test),
        consequent: Box::new(consequent),
        alternate: Box::new(alternate),
    })
}

/// `[a, b, c]`
pub fn array(elements: Vec<Expression>) -> Expression {
    Expression::Array(ArrayExpression {
        elements: elements
            .into_iter()
            .map(|expr| Some(ArrayElement::Expression(expr)))
            .collect(),
    })
}

/// `{ key: value, ... }`
pub fn object(properties: Vec<(&str, Expression)>) -> Expression {
    Expression::Object(ObjectExpression {
        properties: properties
            .into_iter()
            .map(|(key, value)| Property::Init {
                key: PropertyKey::Named(key.to_string()),
                value,
            })
            .collect(),
    })
}

/// `` tag`chunks` `` with cooked and raw chunks equal
pub fn tagged_template(tag: Expression, chunks: Vec<&str>, expressions: Vec<Expression>) -> Expression {
    Expression::TaggedTemplate(TaggedTemplateExpression {
        tag: Box::new(tag),
        cooked: chunks.iter().map(|chunk| Some(chunk.to_string())).collect(),
        raw: chunks.iter().map(|chunk| chunk.to_string()).collect(),
        expressions,
        pos: Position::default(),
    })
}

/// `yield argument`
pub fn yield_expr(argument: Option<Expression>) -> Expression {
    Expression::Yield(YieldExpression {
        argument: argument.map(Box::new),
        pos: Position::default(),
    })
}

/// `await argument`
pub fn await_expr(argument: Expression) -> Expression {
    Expression::Await(AwaitExpression {
        argument: Box::new(argument),
        pos: Position::default(),
    })
}

// ============================================================================
// Patterns
// ============================================================================

/// An identifier pattern.
pub fn pat(name: &str) -> Pattern {
    Pattern::Identifier(id(name))
}

/// A member assignment target.
pub fn member_pat(object: Expression, property: &str) -> Pattern {
    Pattern::Member(Box::new(member_node(object, property, false)))
}

/// A pattern element without default.
pub fn element(target: Pattern) -> PatternElement {
    PatternElement {
        target,
        default: None,
    }
}

/// A pattern element with a default value.
pub fn element_with_default(target: Pattern, default: Expression) -> PatternElement {
    PatternElement {
        target,
        default: Some(default),
    }
}

/// `[a, , b, ...rest]`
pub fn array_pat(elements: Vec<Option<PatternElement>>, rest: Option<Pattern>) -> Pattern {
    Pattern::Array(ArrayPattern {
        elements,
        rest: rest.map(Box::new),
    })
}

/// `{ key: target, ...rest }`
pub fn object_pat(properties: Vec<(&str, PatternElement)>, rest: Option<Pattern>) -> Pattern {
    Pattern::Object(ObjectPattern {
        properties: properties
            .into_iter()
            .map(|(key, value)| PatternProperty {
                key: PropertyKey::Named(key.to_string()),
                value,
            })
            .collect(),
        rest: rest.map(Box::new),
    })
}

// ============================================================================
// Functions
// ============================================================================

fn function_node(name: Option<&str>, params: Vec<&str>, body: FunctionBody) -> Function {
    Function {
        name: name.map(id),
        params: params.into_iter().map(|name| element(pat(name))).collect(),
        rest: None,
        body,
        is_async: false,
        is_generator: false,
        is_arrow: false,
        id: FunctionId::default(),
        scope: ScopeId::default(),
        pos: Position::default(),
    }
}

/// A plain function with identifier parameters.
pub fn function(name: Option<&str>, params: Vec<&str>, body: Vec<Statement>) -> Function {
    function_node(name, params, FunctionBody::Block(body))
}

/// `function name(params) { body }`
pub fn function_decl(name: &str, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    Statement::FunctionDeclaration(Box::new(function(Some(name), params, body)))
}

/// `function* name(params) { body }`
pub fn generator_decl(name: &str, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    let mut func = function(Some(name), params, body);
    func.is_generator = true;
    Statement::FunctionDeclaration(Box::new(func))
}

/// `async function name(params) { body }`
pub fn async_decl(name: &str, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    let mut func = function(Some(name), params, body);
    func.is_async = true;
    Statement::FunctionDeclaration(Box::new(func))
}

/// `async function* name(params) { body }`
pub fn async_generator_decl(name: &str, params: Vec<&str>, body: Vec<Statement>) -> Statement {
    let mut func = function(Some(name), params, body);
    func.is_async = true;
    func.is_generator = true;
    Statement::FunctionDeclaration(Box::new(func))
}

/// `function name(params) { body }` in expression position
pub fn function_expr(name: Option<&str>, params: Vec<&str>, body: Vec<Statement>) -> Expression {
    Expression::Function(Box::new(function(name, params, body)))
}

/// `(params) => expr`
pub fn arrow(params: Vec<&str>, body: Expression) -> Expression {
    let mut func = function_node(None, params, FunctionBody::Expression(Box::new(body)));
    func.is_arrow = true;
    Expression::Function(Box::new(func))
}

// ============================================================================
// Classes
// ============================================================================

/// `class name extends super_class { constructor; members }`
pub fn class_decl(
    name: &str,
    super_class: Option<Expression>,
    constructor: Option<Function>,
    members: Vec<ClassMember>,
) -> Statement {
    Statement::ClassDeclaration(Box::new(Class {
        id: id(name),
        super_class,
        constructor: constructor.map(Box::new),
        members,
        pos: Position::default(),
    }))
}

fn class_member(key: PropertyKey, kind: MethodKind, is_static: bool, params: Vec<&str>, body: Vec<Statement>) -> ClassMember {
    let name = match &key {
        PropertyKey::Named(name) => Some(name.as_str()),
        _ => None,
    };
    let value = Box::new(function(name, params, body));
    ClassMember {
        key,
        kind,
        is_static,
        value,
    }
}

/// `name(params) { body }`
pub fn method(name: &str, params: Vec<&str>, body: Vec<Statement>) -> ClassMember {
    class_member(PropertyKey::Named(name.to_string()), MethodKind::Method, false, params, body)
}

/// `static name(params) { body }`
pub fn static_method(name: &str, params: Vec<&str>, body: Vec<Statement>) -> ClassMember {
    class_member(PropertyKey::Named(name.to_string()), MethodKind::Method, true, params, body)
}

/// `[key](params) { body }`
pub fn computed_method(key: Expression, params: Vec<&str>, body: Vec<Statement>) -> ClassMember {
    class_member(PropertyKey::Computed(Box::new(key)), MethodKind::Method, false, params, body)
}

/// `get name() { body }` or `set name(param) { body }`
pub fn accessor(kind: MethodKind, name: &str, params: Vec<&str>, body: Vec<Statement>) -> ClassMember {
    class_member(PropertyKey::Named(name.to_string()), kind, false, params, body)
}

// ============================================================================
// Statements
// ============================================================================

/// An expression statement.
pub fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expression(ExpressionStatement {
        expression,
        pos: Position::default(),
    })
}

fn declaration(kind: VariableKind, name: &str, init: Option<Expression>) -> VariableDeclaration {
    VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator { id: pat(name), init }],
        pos: Position::default(),
    }
}

/// `var name = init`
pub fn var_decl(name: &str, init: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Var, name, init))
}

/// `let name = init`
pub fn let_decl(name: &str, init: Option<Expression>) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Let, name, init))
}

/// `const name = init`
pub fn const_decl(name: &str, init: Expression) -> Statement {
    Statement::VariableDeclaration(declaration(VariableKind::Const, name, Some(init)))
}

/// `kind pattern = init`
pub fn pattern_decl(kind: VariableKind, target: Pattern, init: Expression) -> Statement {
    Statement::VariableDeclaration(VariableDeclaration {
        kind,
        declarations: vec![VariableDeclarator {
            id: target,
            init: Some(init),
        }],
        pos: Position::default(),
    })
}

fn block_node(body: Vec<Statement>) -> BlockStatement {
    BlockStatement {
        body,
        scope: ScopeId::default(),
        pos: Position::default(),
    }
}

/// `{ body }`
pub fn block(body: Vec<Statement>) -> Statement {
    Statement::Block(block_node(body))
}

/// `if (test) consequent else alternate`
pub fn if_stmt(test: Expression, consequent: Statement, alternate: Option<Statement>) -> Statement {
    Statement::If(IfStatement {
        test,
        consequent: Box::new(consequent),
        alternate: alternate.map(Box::new),
        pos: Position::default(),
    })
}

/// `while (test) body`
pub fn while_loop(test: Expression, body: Statement) -> Statement {
    Statement::While(WhileStatement {
        test,
        body: Box::new(body),
        pos: Position::default(),
    })
}

/// `do body while (test)`
pub fn do_while(body: Statement, test: Expression) -> Statement {
    Statement::DoWhile(DoWhileStatement {
        body: Box::new(body),
        test,
        pos: Position::default(),
    })
}

/// `for (init; test; update) body`
pub fn for_loop(
    init: Option<Statement>,
    test: Option<Expression>,
    update: Option<Expression>,
    body: Statement,
) -> Statement {
    let init = init.and_then(|stmt| match stmt {
        Statement::VariableDeclaration(decl) => Some(ForInit::Declaration(decl)),
        Statement::Expression(expr) => Some(ForInit::Expression(expr.expression)),
        _ => None,
    });
    Statement::For(ForStatement {
        init,
        test,
        update,
        body: Box::new(body),
        scope: ScopeId::default(),
        pos: Position::default(),
    })
}

/// `for (kind name of right) body`
pub fn for_of(kind: VariableKind, name: &str, right: Expression, body: Statement) -> Statement {
    Statement::ForOf(ForOfStatement {
        left: ForInLeft::Declaration(declaration(kind, name, None)),
        right,
        body: Box::new(body),
        scope: ScopeId::default(),
        pos: Position::default(),
    })
}

/// `for (kind name in right) body`
pub fn for_in(kind: VariableKind, name: &str, right: Expression, body: Statement) -> Statement {
    Statement::ForIn(ForInStatement {
        left: ForInLeft::Declaration(declaration(kind, name, None)),
        right,
        body: Box::new(body),
        scope: ScopeId::default(),
        pos: Position::default(),
    })
}

/// `switch (discriminant) { cases }`
pub fn switch(discriminant: Expression, cases: Vec<SwitchCase>) -> Statement {
    Statement::Switch(SwitchStatement {
        discriminant,
        cases,
        scope: ScopeId::default(),
        pos: Position::default(),
    })
}

/// `case test: consequent` or `default: consequent`
pub fn case(test: Option<Expression>, consequent: Vec<Statement>) -> SwitchCase {
    SwitchCase { test, consequent }
}

/// `return argument`
pub fn ret(argument: Option<Expression>) -> Statement {
    Statement::Return(ReturnStatement {
        argument,
        pos: Position::default(),
    })
}

/// `break label`
pub fn brk(label: Option<&str>) -> Statement {
    Statement::Break(JumpStatement {
        label: label.map(id),
        pos: Position::default(),
    })
}

/// `continue label`
pub fn cont(label: Option<&str>) -> Statement {
    Statement::Continue(JumpStatement {
        label: label.map(id),
        pos: Position::default(),
    })
}

/// `label: body`
pub fn labeled(label: &str, body: Statement) -> Statement {
    Statement::Labeled(LabeledStatement {
        label: id(label),
        body: Box::new(body),
    })
}

/// `throw argument`
pub fn throw(argument: Expression) -> Statement {
    Statement::Throw(ThrowStatement {
        argument,
        pos: Position::default(),
    })
}

/// `try { block } catch (param) { handler } finally { finalizer }`
pub fn try_stmt(
    block: Vec<Statement>,
    handler: Option<(Option<&str>, Vec<Statement>)>,
    finalizer: Option<Vec<Statement>>,
) -> Statement {
    Statement::Try(TryStatement {
        block: block_node(block),
        handler: handler.map(|(param, body)| CatchClause {
            param: param.map(pat),
            body,
            scope: ScopeId::default(),
        }),
        finalizer: finalizer.map(block_node),
        pos: Position::default(),
    })
}
