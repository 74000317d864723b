// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions consumed by the backend.
//!
//! These structures are designed to be ESTree-compatible where possible.
//! The front end hands over a tree that is already parsed and validated;
//! the `scope` and `id` fields are filled in by [`crate::binder::bind`].

pub mod build;
pub mod visit;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::binder::{FunctionId, ScopeId};

/// A 1-based source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl Position {
    /// Creates a new position.
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Whether the compilation unit is a classic script or a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProgramKind {
    /// Top-level `var`/function bindings live on the global object
    #[default]
    Script,
    /// Top-level bindings are module locals
    Module,
}

/// A complete compilation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// Script or module
    #[serde(default)]
    pub kind: ProgramKind,
    /// The statements in the program
    pub body: Vec<Statement>,
    /// Top-level scope
    #[serde(default)]
    pub scope: ScopeId,
}

/// An identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// The name of the identifier
    pub name: String,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A JavaScript statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    /// Variable declaration (var, let, const)
    VariableDeclaration(VariableDeclaration),
    /// Function declaration
    FunctionDeclaration(Box<Function>),
    /// Class declaration
    ClassDeclaration(Box<Class>),
    /// Expression statement
    Expression(ExpressionStatement),
    /// Block statement { ... }
    Block(BlockStatement),
    /// If statement
    If(IfStatement),
    /// Switch statement
    Switch(SwitchStatement),
    /// While statement
    While(WhileStatement),
    /// Do-while statement
    DoWhile(DoWhileStatement),
    /// For statement
    For(ForStatement),
    /// For-in statement
    ForIn(ForInStatement),
    /// For-of statement
    ForOf(ForOfStatement),
    /// Return statement
    Return(ReturnStatement),
    /// Break statement (with optional label)
    Break(JumpStatement),
    /// Continue statement (with optional label)
    Continue(JumpStatement),
    /// Throw statement
    Throw(ThrowStatement),
    /// Try statement
    Try(TryStatement),
    /// Labeled statement
    Labeled(LabeledStatement),
    /// Debugger statement
    Debugger(Position),
    /// Empty statement (;)
    Empty,
}

impl Statement {
    /// Source position of the statement, if known.
    pub fn position(&self) -> Position {
        match self {
            Statement::VariableDeclaration(decl) => decl.pos,
            Statement::FunctionDeclaration(func) => func.pos,
            Statement::ClassDeclaration(class) => class.pos,
            Statement::Expression(expr) => expr.pos,
            Statement::Block(block) => block.pos,
            Statement::If(stmt) => stmt.pos,
            Statement::Switch(stmt) => stmt.pos,
            Statement::While(stmt) => stmt.pos,
            Statement::DoWhile(stmt) => stmt.pos,
            Statement::For(stmt) => stmt.pos,
            Statement::ForIn(stmt) => stmt.pos,
            Statement::ForOf(stmt) => stmt.pos,
            Statement::Return(stmt) => stmt.pos,
            Statement::Break(stmt) | Statement::Continue(stmt) => stmt.pos,
            Statement::Throw(stmt) => stmt.pos,
            Statement::Try(stmt) => stmt.pos,
            Statement::Labeled(stmt) => stmt.label.pos,
            Statement::Debugger(pos) => *pos,
            Statement::Empty => Position::default(),
        }
    }

    /// Whether control never falls through the end of this statement.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Statement::Return(_) | Statement::Throw(_) | Statement::Break(_) | Statement::Continue(_)
        )
    }
}

/// Variable declaration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableKind {
    /// var declaration
    Var,
    /// let declaration
    Let,
    /// const declaration
    Const,
}

/// A variable declaration statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclaration {
    /// The kind of declaration
    pub kind: VariableKind,
    /// The declarators
    pub declarations: Vec<VariableDeclarator>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A single variable declarator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDeclarator {
    /// The binding target
    pub id: Pattern,
    /// Optional initializer expression
    pub init: Option<Expression>,
}

/// A binding or assignment target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Pattern {
    /// Plain identifier
    Identifier(Identifier),
    /// Member target, only valid in assignment position
    Member(Box<MemberExpression>),
    /// `[a, , b = 1, ...rest]`
    Array(ArrayPattern),
    /// `{ a, b: c = 1, ...rest }`
    Object(ObjectPattern),
}

impl Pattern {
    /// Returns the identifier if this is a plain identifier pattern.
    pub fn as_identifier(&self) -> Option<&Identifier> {
        match self {
            Pattern::Identifier(id) => Some(id),
            _ => None,
        }
    }

    /// Collects every identifier bound by the pattern, in source order.
    pub fn bound_names<'a>(&'a self, out: &mut Vec<&'a Identifier>) {
        match self {
            Pattern::Identifier(id) => out.push(id),
            Pattern::Member(_) => {}
            Pattern::Array(array) => {
                for element in array.elements.iter().flatten() {
                    element.target.bound_names(out);
                }
                if let Some(rest) = &array.rest {
                    rest.bound_names(out);
                }
            }
            Pattern::Object(object) => {
                for prop in &object.properties {
                    prop.value.target.bound_names(out);
                }
                if let Some(rest) = &object.rest {
                    rest.bound_names(out);
                }
            }
        }
    }
}

/// An array destructuring pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayPattern {
    /// Elements; `None` is an elision
    pub elements: Vec<Option<PatternElement>>,
    /// Rest element
    pub rest: Option<Box<Pattern>>,
}

/// An object destructuring pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPattern {
    /// Properties in source order
    pub properties: Vec<PatternProperty>,
    /// Rest element
    pub rest: Option<Box<Pattern>>,
}

/// `key: target = default` inside an object pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternProperty {
    /// The property key
    pub key: PropertyKey,
    /// Target and default
    pub value: PatternElement,
}

/// A pattern target with an optional default value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternElement {
    /// The target
    pub target: Pattern,
    /// Default used when the incoming value is `undefined`
    pub default: Option<Expression>,
}

/// Function flavours, used to pick the function builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKind {
    /// Plain function or arrow
    Ordinary,
    /// `async function`
    Async,
    /// `function*`
    Generator,
    /// `async function*`
    AsyncGenerator,
}

/// A function declaration, function expression or arrow function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// The function name
    pub name: Option<Identifier>,
    /// The parameters
    pub params: Vec<PatternElement>,
    /// Rest parameter
    pub rest: Option<Pattern>,
    /// The function body
    pub body: FunctionBody,
    /// Whether this is an async function
    pub is_async: bool,
    /// Whether this is a generator function
    pub is_generator: bool,
    /// Whether this is an arrow function
    pub is_arrow: bool,
    /// Index of this function inside its compilation unit
    #[serde(default)]
    pub id: FunctionId,
    /// Function scope
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

impl Function {
    /// The builder flavour required by this function.
    pub fn kind(&self) -> FunctionKind {
        if self.is_async && self.is_generator {
            FunctionKind::AsyncGenerator
        } else if self.is_async {
            FunctionKind::Async
        } else if self.is_generator {
            FunctionKind::Generator
        } else {
            FunctionKind::Ordinary
        }
    }

    /// Number of formal parameters before the first default or rest.
    pub fn formal_length(&self) -> usize {
        self.params
            .iter()
            .take_while(|param| param.default.is_none())
            .count()
    }

    /// The function name, or an empty string.
    pub fn display_name(&self) -> &str {
        self.name.as_ref().map_or("", |id| id.name.as_str())
    }
}

/// A class declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    /// The class name
    pub id: Identifier,
    /// `extends` clause
    pub super_class: Option<Expression>,
    /// Explicit constructor; the runtime supplies a default one otherwise
    pub constructor: Option<Box<Function>>,
    /// Methods and accessors in source order
    pub members: Vec<ClassMember>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A method or accessor of a class body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMember {
    /// Property key
    pub key: PropertyKey,
    /// Method, getter or setter
    pub kind: MethodKind,
    /// Defined on the constructor instead of the prototype
    #[serde(default)]
    pub is_static: bool,
    /// The function
    pub value: Box<Function>,
}

/// Kind of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodKind {
    /// Plain method
    Method,
    /// `get key()`
    Get,
    /// `set key(v)`
    Set,
}

/// Body of a function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FunctionBody {
    /// Statement list
    Block(Vec<Statement>),
    /// Concise arrow body
    Expression(Box<Expression>),
}

/// An expression statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionStatement {
    /// The expression
    pub expression: Expression,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A block statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockStatement {
    /// The statements in the block
    pub body: Vec<Statement>,
    /// Block scope
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// An if statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IfStatement {
    /// The condition
    pub test: Expression,
    /// The then branch
    pub consequent: Box<Statement>,
    /// The optional else branch
    pub alternate: Option<Box<Statement>>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhileStatement {
    /// The condition
    pub test: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A for statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForStatement {
    /// The initializer
    pub init: Option<ForInit>,
    /// The condition
    pub test: Option<Expression>,
    /// The update expression
    pub update: Option<Expression>,
    /// The loop body
    pub body: Box<Statement>,
    /// Loop scope holding per-iteration bindings
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// For loop initializer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInit {
    /// Variable declaration
    Declaration(VariableDeclaration),
    /// Expression
    Expression(Expression),
}

/// A switch statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchStatement {
    /// The discriminant expression
    pub discriminant: Expression,
    /// The case clauses
    pub cases: Vec<SwitchCase>,
    /// Scope of the case block
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A switch case clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchCase {
    /// The test expression (None for default)
    pub test: Option<Expression>,
    /// The consequent statements
    pub consequent: Vec<Statement>,
}

/// A do-while statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStatement {
    /// The loop body
    pub body: Box<Statement>,
    /// The condition
    pub test: Expression,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A for-in statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForInStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The object to iterate over
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Per-iteration scope of the left-hand side
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A for-of statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForOfStatement {
    /// The left-hand side
    pub left: ForInLeft,
    /// The iterable
    pub right: Expression,
    /// The loop body
    pub body: Box<Statement>,
    /// Per-iteration scope of the left-hand side
    #[serde(default)]
    pub scope: ScopeId,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// Left-hand side of for-in/for-of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ForInLeft {
    /// Variable declaration with a single declarator and no initializer
    Declaration(VariableDeclaration),
    /// Assignment target
    Pattern(Pattern),
}

/// A return statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatement {
    /// The return value
    pub argument: Option<Expression>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A break or continue statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpStatement {
    /// Optional target label
    pub label: Option<Identifier>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A throw statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrowStatement {
    /// The thrown expression
    pub argument: Expression,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A try statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TryStatement {
    /// The try block
    pub block: BlockStatement,
    /// The catch clause
    pub handler: Option<CatchClause>,
    /// The finally block
    pub finalizer: Option<BlockStatement>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A catch clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// The error parameter
    pub param: Option<Pattern>,
    /// The catch body, evaluated directly in the catch scope
    pub body: Vec<Statement>,
    /// Catch scope (parameter and body bindings)
    #[serde(default)]
    pub scope: ScopeId,
}

/// A labeled statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledStatement {
    /// The label identifier
    pub label: Identifier,
    /// The labeled body
    pub body: Box<Statement>,
}

/// A JavaScript expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Identifier reference
    Identifier(Identifier),
    /// this keyword
    This(Position),
    /// `super`, only valid as the object of a member expression
    Super(Position),
    /// Array literal
    Array(ArrayExpression),
    /// Object literal
    Object(ObjectExpression),
    /// Binary expression
    Binary(BinaryExpression),
    /// Logical expression (&&, ||, ??)
    Logical(LogicalExpression),
    /// Unary expression
    Unary(UnaryExpression),
    /// Assignment expression
    Assignment(AssignmentExpression),
    /// Call expression
    Call(CallExpression),
    /// Member access expression
    Member(MemberExpression),
    /// Top-level optional chain (`a?.b.c`)
    Chain(Box<Expression>),
    /// Conditional (ternary) expression
    Conditional(ConditionalExpression),
    /// Function or arrow function expression
    Function(Box<Function>),
    /// new expression
    New(NewExpression),
    /// Update expression (++/--)
    Update(UpdateExpression),
    /// Sequence expression (comma operator)
    Sequence(SequenceExpression),
    /// Template literal without tag
    Template(TemplateLiteral),
    /// Tagged template literal
    TaggedTemplate(TaggedTemplateExpression),
    /// `yield` inside a generator
    Yield(YieldExpression),
    /// `await` inside an async function
    Await(AwaitExpression),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// Boolean literal
    Boolean(bool),
    /// null literal
    Null,
    /// undefined literal
    Undefined,
    /// BigInt literal
    BigInt(String),
}

/// An array expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayExpression {
    /// The elements (None represents a hole)
    pub elements: Vec<Option<ArrayElement>>,
}

/// An element of an array literal or argument list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArrayElement {
    /// Plain element
    Expression(Expression),
    /// `...iterable`
    Spread(Expression),
}

/// An object expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectExpression {
    /// The properties
    pub properties: Vec<Property>,
}

/// An object property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    /// `key: value` (shorthand included)
    Init {
        /// The property key
        key: PropertyKey,
        /// The property value
        value: Expression,
    },
    /// `...source`
    Spread(Expression),
}

/// A property key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyKey {
    /// Identifier or string key
    Named(String),
    /// Numeric key
    Index(u32),
    /// Computed key
    Computed(Box<Expression>),
}

/// A binary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOperator {
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
    /// **
    Exponent,
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// ===
    StrictEqual,
    /// !==
    StrictNotEqual,
    /// <
    LessThan,
    /// <=
    LessThanEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanEqual,
    /// &
    BitwiseAnd,
    /// |
    BitwiseOr,
    /// ^
    BitwiseXor,
    /// <<
    LeftShift,
    /// >>
    RightShift,
    /// >>>
    UnsignedRightShift,
    /// in
    In,
    /// instanceof
    InstanceOf,
}

impl BinaryOperator {
    /// Relational and equality operators, which lower to compare-and-branch.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::StrictEqual
                | BinaryOperator::StrictNotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanEqual
        )
    }
}

/// A logical expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// The left operand
    pub left: Box<Expression>,
    /// The right operand
    pub right: Box<Expression>,
}

/// Short-circuiting operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOperator {
    /// &&
    And,
    /// ||
    Or,
    /// ??
    NullishCoalescing,
}

/// A unary expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// -
    Minus,
    /// +
    Plus,
    /// !
    LogicalNot,
    /// ~
    BitwiseNot,
    /// typeof
    Typeof,
    /// void
    Void,
    /// delete
    Delete,
}

/// An assignment expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentExpression {
    /// The operator
    pub operator: AssignmentOperator,
    /// The left-hand side
    pub left: Box<Pattern>,
    /// The right-hand side
    pub right: Box<Expression>,
}

/// Assignment operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignmentOperator {
    /// =
    Assign,
    /// +=
    AddAssign,
    /// -=
    SubtractAssign,
    /// *=
    MultiplyAssign,
    /// /=
    DivideAssign,
    /// %=
    ModuloAssign,
    /// **=
    ExponentAssign,
    /// <<=
    LeftShiftAssign,
    /// >>=
    RightShiftAssign,
    /// >>>=
    UnsignedRightShiftAssign,
    /// &=
    BitwiseAndAssign,
    /// |=
    BitwiseOrAssign,
    /// ^=
    BitwiseXorAssign,
    /// &&=
    LogicalAndAssign,
    /// ||=
    LogicalOrAssign,
    /// ??=
    NullishCoalescingAssign,
}

impl AssignmentOperator {
    /// The binary operator applied by a compound assignment.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        Some(match self {
            AssignmentOperator::AddAssign => BinaryOperator::Add,
            AssignmentOperator::SubtractAssign => BinaryOperator::Subtract,
            AssignmentOperator::MultiplyAssign => BinaryOperator::Multiply,
            AssignmentOperator::DivideAssign => BinaryOperator::Divide,
            AssignmentOperator::ModuloAssign => BinaryOperator::Modulo,
            AssignmentOperator::ExponentAssign => BinaryOperator::Exponent,
            AssignmentOperator::LeftShiftAssign => BinaryOperator::LeftShift,
            AssignmentOperator::RightShiftAssign => BinaryOperator::RightShift,
            AssignmentOperator::UnsignedRightShiftAssign => BinaryOperator::UnsignedRightShift,
            AssignmentOperator::BitwiseAndAssign => BinaryOperator::BitwiseAnd,
            AssignmentOperator::BitwiseOrAssign => BinaryOperator::BitwiseOr,
            AssignmentOperator::BitwiseXorAssign => BinaryOperator::BitwiseXor,
            _ => return None,
        })
    }

    /// The short-circuit operator of a logical assignment.
    pub fn logical_operator(self) -> Option<LogicalOperator> {
        match self {
            AssignmentOperator::LogicalAndAssign => Some(LogicalOperator::And),
            AssignmentOperator::LogicalOrAssign => Some(LogicalOperator::Or),
            AssignmentOperator::NullishCoalescingAssign => Some(LogicalOperator::NullishCoalescing),
            _ => None,
        }
    }
}

/// A function call expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpression {
    /// The function being called
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<ArrayElement>,
    /// `callee?.(...)`
    #[serde(default)]
    pub optional: bool,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A member access expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberExpression {
    /// The object
    pub object: Box<Expression>,
    /// The property
    pub property: MemberProperty,
    /// `object?.property`
    #[serde(default)]
    pub optional: bool,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// Member property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberProperty {
    /// Identifier property
    Identifier(Identifier),
    /// Computed property expression
    Expression(Box<Expression>),
}

/// A conditional (ternary) expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalExpression {
    /// The condition
    pub test: Box<Expression>,
    /// The consequent (if true)
    pub consequent: Box<Expression>,
    /// The alternate (if false)
    pub alternate: Box<Expression>,
}

/// A new expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpression {
    /// The constructor
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<ArrayElement>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// An update expression (++/--)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateExpression {
    /// The operator
    pub operator: UpdateOperator,
    /// The operand
    pub argument: Box<Expression>,
    /// Whether prefix (++x) or postfix (x++)
    pub prefix: bool,
}

/// Update operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOperator {
    /// ++
    Increment,
    /// --
    Decrement,
}

/// A sequence expression (comma operator).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceExpression {
    /// The expressions
    pub expressions: Vec<Expression>,
}

/// An untagged template literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateLiteral {
    /// Cooked string chunks; always one more than `expressions`
    pub quasis: Vec<String>,
    /// Substitutions
    pub expressions: Vec<Expression>,
}

/// `` tag`chunk${expr}chunk` ``
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedTemplateExpression {
    /// The tag function
    pub tag: Box<Expression>,
    /// Cooked chunks; `None` where an escape sequence is invalid
    pub cooked: Vec<Option<String>>,
    /// Raw chunks, as written
    pub raw: Vec<String>,
    /// Substitutions
    pub expressions: Vec<Expression>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// A yield expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YieldExpression {
    /// Yielded value
    pub argument: Option<Box<Expression>>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}

/// An await expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwaitExpression {
    /// Awaited value
    pub argument: Box<Expression>,
    /// Source position
    #[serde(default)]
    pub pos: Position,
}
