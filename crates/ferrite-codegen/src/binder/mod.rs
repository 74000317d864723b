// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Scope arena shared by every compile job of a unit.
//!
//! Scopes are stored in a flat arena and point at their parent by index, so
//! the tree is walked upward only. Once [`bind`] returns, the tree is never
//! mutated again and is shared by `&` reference across worker threads.

mod analysis;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::ast::Position;
use crate::error::{Error, Result};

pub use analysis::bind;

/// Name of the pseudo-variable holding the callee.
pub const FUNC_VAR: &str = "=func";
/// Name of the pseudo-variable holding `new.target`.
pub const NEW_TARGET_VAR: &str = "=newTarget";
/// Name of the pseudo-variable holding `this`.
pub const THIS_VAR: &str = "=this";

/// Index of a scope in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

/// Index of a variable in a [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

/// Index of a function inside its compilation unit. `0` is the top level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    /// The unit's top-level code.
    pub const TOP_LEVEL: FunctionId = FunctionId(0);
}

/// Kind of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Script top level
    Global,
    /// Module top level
    Module,
    /// Function body and parameters
    Function,
    /// Block statement
    Block,
    /// Head of a for/for-in/for-of loop
    Loop,
    /// Catch clause
    Catch,
    /// Case block of a switch
    Switch,
}

/// How a declaration was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    /// `var`
    Var,
    /// `let`
    Let,
    /// `const`
    Const,
    /// Class declaration, a `let` binding initialized by the definition
    Class,
    /// Formal parameter
    Param,
    /// Function declaration, or the own name of a function expression
    Function,
    /// Catch clause parameter
    Catch,
    /// Compiler-introduced (`this`, `new.target`, callee, `arguments`)
    Mandatory,
}

impl DeclKind {
    /// Declarations with a temporal dead zone.
    pub fn is_lexical(self) -> bool {
        matches!(self, DeclKind::Let | DeclKind::Const | DeclKind::Class)
    }
}

/// Where a variable lives at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// Virtual register, assigned per compile job
    Register,
    /// Slot in the lexical environment of the declaring scope
    Lexical {
        /// Slot index
        slot: u32,
    },
    /// Property of the global object or global lexical record
    Global,
}

/// A declared binding.
#[derive(Debug, Clone)]
pub struct Variable {
    /// Binding name
    pub name: String,
    /// Declaration kind
    pub kind: DeclKind,
    /// Storage class, decided after capture analysis
    pub storage: Storage,
    /// Declaring scope
    pub scope: ScopeId,
    /// Referenced from a nested function
    pub captured: bool,
}

/// A node of the scope tree.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Kind of scope
    pub kind: ScopeKind,
    /// Enclosing scope
    pub parent: Option<ScopeId>,
    /// Function whose code owns this scope
    pub function: FunctionId,
    /// Name lookup table
    pub bindings: FxHashMap<String, VarId>,
    /// Bindings in declaration order
    pub declared: Vec<VarId>,
    /// Whether entering the scope creates a lexical environment
    pub needs_environment: bool,
    /// Number of slots in that environment
    pub lexical_slots: u32,
    /// Function scopes only: body reads `arguments`
    pub uses_arguments: bool,
    /// Function scopes only: the function is an arrow
    pub is_arrow: bool,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>, function: FunctionId) -> Self {
        Self {
            kind,
            parent,
            function,
            bindings: FxHashMap::default(),
            declared: Vec::new(),
            needs_environment: false,
            lexical_slots: 0,
            uses_arguments: false,
            is_arrow: false,
        }
    }

    /// Whether this scope is the body scope of a function or unit.
    pub fn is_function_scope(&self) -> bool {
        matches!(self.kind, ScopeKind::Function | ScopeKind::Global | ScopeKind::Module)
    }
}

/// Result of resolving a name from some scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeFindResult {
    /// The resolved variable, `None` for an unresolvable (global) name
    pub variable: Option<VarId>,
    /// Scope the variable was found in
    pub scope: Option<ScopeId>,
    /// Number of environments between the lookup scope and the declaring one
    pub level: u32,
    /// The declaring scope belongs to another function than the lookup scope
    pub crosses_function: bool,
}

/// Arena of scopes and variables of one compilation unit.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    variables: Vec<Variable>,
    function_count: u32,
}

impl ScopeTree {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scope and returns its id.
    pub fn add_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>, function: FunctionId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, parent, function));
        id
    }

    /// Registers a new function and returns its id.
    pub fn add_function(&mut self) -> FunctionId {
        self.function_count += 1;
        FunctionId(self.function_count)
    }

    /// Number of functions in the unit, the top level included.
    pub fn function_count(&self) -> usize {
        self.function_count as usize + 1
    }

    /// Returns a scope by id.
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub(crate) fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Returns a variable by id.
    pub fn variable(&self, id: VarId) -> &Variable {
        &self.variables[id.0 as usize]
    }

    pub(crate) fn variable_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.0 as usize]
    }

    /// Number of scopes.
    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    /// Whether the tree has no scopes.
    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Declares `name` in `scope`.
    ///
    /// Re-declaring a `var`, parameter or function binding returns the
    /// existing variable. Any redeclaration involving `let`/`const` is a
    /// semantic error.
    pub fn declare(&mut self, scope: ScopeId, name: &str, kind: DeclKind, pos: Position) -> Result<VarId> {
        if let Some(&existing) = self.scope(scope).bindings.get(name) {
            let previous = self.variable(existing).kind;
            if kind.is_lexical() || previous.is_lexical() {
                return Err(Error::semantic(
                    format!("Identifier '{}' has already been declared", name),
                    pos,
                ));
            }
            // A function declaration wins over a var of the same name
            if kind == DeclKind::Function {
                self.variable_mut(existing).kind = DeclKind::Function;
            }
            return Ok(existing);
        }

        let id = VarId(self.variables.len() as u32);
        self.variables.push(Variable {
            name: name.to_string(),
            kind,
            storage: Storage::Register,
            scope,
            captured: false,
        });
        let entry = self.scope_mut(scope);
        entry.bindings.insert(name.to_string(), id);
        entry.declared.push(id);
        Ok(id)
    }

    /// Resolves `name` starting at `scope`, walking parents.
    pub fn find(&self, scope: ScopeId, name: &str) -> ScopeFindResult {
        let origin = self.scope(scope).function;
        let mut level = 0;
        let mut current = Some(scope);

        while let Some(id) = current {
            let entry = self.scope(id);
            if let Some(&var) = entry.bindings.get(name) {
                return ScopeFindResult {
                    variable: Some(var),
                    scope: Some(id),
                    level,
                    crosses_function: entry.function != origin,
                };
            }
            if entry.needs_environment {
                level += 1;
            }
            current = entry.parent;
        }

        ScopeFindResult {
            variable: None,
            scope: None,
            level,
            crosses_function: false,
        }
    }

    /// Innermost non-arrow function (or unit) scope enclosing `scope`.
    pub fn closest_function_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        loop {
            let entry = self.scope(current);
            if entry.is_function_scope() && !entry.is_arrow {
                return current;
            }
            match entry.parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Innermost scope of `scope`'s chain that is the body of a function.
    pub fn function_scope(&self, scope: ScopeId) -> ScopeId {
        let mut current = scope;
        while !self.scope(current).is_function_scope() {
            match self.scope(current).parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Iterates over the variables declared in `scope`, in order.
    pub fn declared(&self, scope: ScopeId) -> impl Iterator<Item = (VarId, &Variable)> + '_ {
        self.scope(scope)
            .declared
            .iter()
            .map(move |&id| (id, self.variable(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declare_var_twice_returns_same_binding() {
        let mut tree = ScopeTree::new();
        let root = tree.add_scope(ScopeKind::Function, None, FunctionId::TOP_LEVEL);
        let a = tree.declare(root, "x", DeclKind::Var, Position::default()).unwrap();
        let b = tree.declare(root, "x", DeclKind::Var, Position::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(tree.scope(root).declared.len(), 1);
    }

    #[test]
    fn test_declare_let_conflict() {
        let mut tree = ScopeTree::new();
        let root = tree.add_scope(ScopeKind::Module, None, FunctionId::TOP_LEVEL);
        tree.declare(root, "x", DeclKind::Var, Position::default()).unwrap();
        let err = tree
            .declare(root, "x", DeclKind::Let, Position::new(2, 5))
            .unwrap_err();
        assert!(err.message.contains("already been declared"));
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_find_counts_environment_levels() {
        let mut tree = ScopeTree::new();
        let root = tree.add_scope(ScopeKind::Module, None, FunctionId::TOP_LEVEL);
        let x = tree.declare(root, "x", DeclKind::Let, Position::default()).unwrap();
        tree.scope_mut(root).needs_environment = true;

        let block = tree.add_scope(ScopeKind::Block, Some(root), FunctionId::TOP_LEVEL);
        tree.scope_mut(block).needs_environment = true;
        let inner = tree.add_scope(ScopeKind::Block, Some(block), FunctionId::TOP_LEVEL);

        let found = tree.find(inner, "x");
        assert_eq!(found.variable, Some(x));
        assert_eq!(found.level, 1);
        assert!(!found.crosses_function);

        let missing = tree.find(inner, "y");
        assert_eq!(missing.variable, None);
    }

    #[test]
    fn test_closest_function_scope_skips_arrows() {
        let mut tree = ScopeTree::new();
        let root = tree.add_scope(ScopeKind::Global, None, FunctionId::TOP_LEVEL);
        let f = tree.add_function();
        let func = tree.add_scope(ScopeKind::Function, Some(root), f);
        let g = tree.add_function();
        let arrow = tree.add_scope(ScopeKind::Function, Some(func), g);
        tree.scope_mut(arrow).is_arrow = true;

        assert_eq!(tree.closest_function_scope(arrow), func);
        assert_eq!(tree.function_scope(arrow), arrow);
        assert_eq!(tree.function_count(), 3);
    }
}
