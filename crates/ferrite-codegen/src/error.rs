// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the compiler backend

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Position;

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A user-facing semantic error (undefined label, duplicate declaration, ...)
    Semantic,
    /// An invariant inside the compiler itself was violated
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Semantic => write!(f, "SyntaxError"),
            ErrorKind::Internal => write!(f, "InternalError"),
        }
    }
}

/// A structured compile error tied to a source position.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message} [{line}:{column}]")]
pub struct Error {
    /// Error classification
    pub kind: ErrorKind,
    /// Human readable description
    pub message: String,
    /// 1-based source line, 0 when unknown
    pub line: u32,
    /// 1-based source column, 0 when unknown
    pub column: u32,
}

impl Error {
    /// Creates a semantic error at `pos`.
    pub fn semantic(message: impl Into<String>, pos: Position) -> Self {
        Self {
            kind: ErrorKind::Semantic,
            message: message.into(),
            line: pos.line,
            column: pos.column,
        }
    }

    /// Creates an internal error with no position.
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            message: message.into(),
            line: 0,
            column: 0,
        }
    }

    /// Attaches a position if the error does not carry one yet.
    pub fn at(mut self, pos: Position) -> Self {
        if self.line == 0 && self.column == 0 {
            self.line = pos.line;
            self.column = pos.column;
        }
        self
    }

    /// Returns true for compiler invariant violations.
    pub fn is_internal(&self) -> bool {
        self.kind == ErrorKind::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position() {
        let err = Error::semantic("Undefined label 'outer'", Position::new(3, 7));
        assert_eq!(err.to_string(), "SyntaxError: Undefined label 'outer' [3:7]");
    }

    #[test]
    fn test_at_keeps_existing_position() {
        let err = Error::semantic("x", Position::new(1, 2)).at(Position::new(9, 9));
        assert_eq!((err.line, err.column), (1, 2));

        let err = Error::internal("register window exhausted").at(Position::new(4, 1));
        assert_eq!((err.line, err.column), (4, 1));
        assert!(err.is_internal());
    }
}
