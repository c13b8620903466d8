//=====================================================
// File: interpreter/errors.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Runtime error vocabulary for GatoScript
// Objective: Name every failure the evaluator and builtins can raise and keep the
//            user-visible message text in one place
//=====================================================

use std::fmt;

use thiserror::Error;

use crate::ast::{InfixOperator, PrefixOperator};

use super::object::{Object, ObjectKind};

/// Accepted argument counts for a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "{}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("identifier not found: {0}")]
    IdentifierNotFound(String),
    #[error("not a function: {0}")]
    NotAFunction(ObjectKind),
    #[error("wrong number of arguments. got={got}, want={want}")]
    WrongArgumentCount { got: usize, want: Arity },
    #[error("argument to `{builtin}` not supported, got {got}")]
    UnsupportedArgument {
        builtin: &'static str,
        got: ObjectKind,
    },
    #[error("argument {position} to `{builtin}` must be {want}, got {got}")]
    ArgumentKind {
        builtin: &'static str,
        position: usize,
        want: ObjectKind,
        got: ObjectKind,
    },
    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: ObjectKind,
        operator: InfixOperator,
        right: ObjectKind,
    },
    #[error("unknown operator: {operator}{right}")]
    UnknownPrefixOperator {
        operator: PrefixOperator,
        right: ObjectKind,
    },
    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: ObjectKind,
        operator: InfixOperator,
        right: ObjectKind,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("unusable as hash key: {0}")]
    UnusableHashKey(ObjectKind),
    #[error("index operator not supported: {0}")]
    IndexNotSupported(ObjectKind),
    #[error("stack overflow: call depth exceeded {0}")]
    StackOverflow(usize),
    #[error("failed to start task: {0}")]
    Spawn(String),
    #[error("server error: {0}")]
    Server(String),
    /// An Error value handed back by a native function, passed on verbatim.
    #[error("{0}")]
    Raised(String),
}

impl From<RuntimeError> for Object {
    fn from(error: RuntimeError) -> Self {
        Object::error(error)
    }
}

/// Non-local exits while walking the tree. `Return` unwinds to the nearest
/// function call; `Error` unwinds to whoever converts it into a value.
#[derive(Debug, Clone)]
pub(crate) enum Flow {
    Return(Object),
    Error(RuntimeError),
}

impl From<RuntimeError> for Flow {
    fn from(error: RuntimeError) -> Self {
        Flow::Error(error)
    }
}
