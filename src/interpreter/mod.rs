//=====================================================
// File: interpreter/mod.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: GatoScript interpreter entry points
// Objective: Evaluate programs against an environment and apply callables with a
//            bounded call depth
//=====================================================

pub mod builtins;
pub mod environment;
pub mod errors;
mod eval;
pub mod object;

use std::cell::Cell;

use thiserror::Error;
use tracing::trace;

use crate::ast::Program;
use crate::parser::{ParseError, Parser};
use crate::runtime;
use crate::tokenizer::{TokenizeError, Tokenizer};

pub use builtins::Builtin;
pub use environment::Environment;
pub use errors::{Arity, RuntimeError};
pub use object::{Function, HashKey, HashPair, Object, ObjectKind};

use errors::Flow;

/// Failures that stop a source text before it runs.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("tokenizer error: {0}")]
    Tokenize(#[from] TokenizeError),
    #[error("syntax error: {0}")]
    Parse(#[from] ParseError),
}

pub fn parse_source(source: &str) -> Result<Program, ScriptError> {
    let tokens = Tokenizer::new(source).tokenize()?;
    Ok(Parser::new(tokens).parse()?)
}

/// Parses and evaluates `source` in `env`. Runtime failures come back as an
/// [`Object::Error`], not as `Err`.
pub fn run_source(source: &str, env: &Environment) -> Result<Object, ScriptError> {
    let program = parse_source(source)?;
    Ok(evaluate(&program, env))
}

/// Value of the last statement, the value of a top-level `return`, or the
/// first error raised.
pub fn evaluate(program: &Program, env: &Environment) -> Object {
    match eval::eval_statements(&program.statements, env) {
        Ok(value) | Err(Flow::Return(value)) => value,
        Err(Flow::Error(error)) => Object::from(error),
    }
}

/// Function Application.
///
/// Closures run their body in a fresh scope enclosing the captured one, with
/// parameters bound positionally. Missing arguments stay unbound and extra ones
/// are ignored. Builtins receive the arguments as given.
pub fn apply_function(callee: &Object, arguments: Vec<Object>) -> Object {
    call(callee, arguments).unwrap_or_else(Object::from)
}

pub(crate) fn call(callee: &Object, arguments: Vec<Object>) -> Result<Object, RuntimeError> {
    let _depth = CallDepth::enter()?;
    trace!(callee = %callee.kind(), arguments = arguments.len(), "apply");
    match callee {
        Object::Function(function) => {
            let scope = Environment::enclosed(&function.env);
            for (parameter, argument) in function.parameters.iter().zip(arguments) {
                scope.set(parameter.as_str(), argument);
            }
            match eval::eval_block(&function.body, &scope) {
                Ok(value) | Err(Flow::Return(value)) => Ok(value),
                Err(Flow::Error(error)) => Err(error),
            }
        }
        Object::Builtin(builtin) => {
            let value = builtin.invoke(&arguments)?;
            if let Object::Error(message) = &value {
                return Err(RuntimeError::Raised(message.to_string()));
            }
            Ok(value)
        }
        other => Err(RuntimeError::NotAFunction(other.kind())),
    }
}

thread_local! {
    static CALL_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Per-thread nesting guard. Spawned tasks and request handlers start at zero
/// on their own threads.
struct CallDepth;

impl CallDepth {
    fn enter() -> Result<Self, RuntimeError> {
        let limit = runtime::max_call_depth();
        CALL_DEPTH.with(|depth| {
            let current = depth.get();
            if current >= limit {
                return Err(RuntimeError::StackOverflow(limit));
            }
            depth.set(current + 1);
            Ok(CallDepth)
        })
    }
}

impl Drop for CallDepth {
    fn drop(&mut self) {
        CALL_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_binds_parameters_positionally() {
        let env = Environment::new();
        let sub = run_source("fn(a, b) { a - b }", &env).unwrap();
        assert_eq!(
            apply_function(&sub, vec![Object::Integer(10), Object::Integer(4)]),
            Object::Integer(6)
        );
    }

    #[test]
    fn apply_ignores_extra_and_leaves_missing_unbound() {
        let env = Environment::new();
        let first = run_source("fn(a) { a }", &env).unwrap();
        assert_eq!(
            apply_function(&first, vec![Object::Integer(1), Object::Integer(2)]),
            Object::Integer(1)
        );
        let second = run_source("fn(a, b) { b }", &env).unwrap();
        assert_eq!(
            apply_function(&second, vec![Object::Integer(1)]),
            Object::error("identifier not found: b")
        );
    }

    #[test]
    fn apply_does_not_leak_parameters_into_captured_scope() {
        let env = Environment::new();
        let f = run_source("fn(secret) { secret }", &env).unwrap();
        apply_function(&f, vec![Object::Integer(1)]);
        assert_eq!(env.get("secret"), None);
    }

    #[test]
    fn apply_unwraps_return() {
        let env = Environment::new();
        let f = run_source("fn() { return 1; 2 }", &env).unwrap();
        assert_eq!(apply_function(&f, vec![]), Object::Integer(1));
    }

    #[test]
    fn apply_builtin_passes_error_through() {
        let len = Object::Builtin(builtins::lookup("len").unwrap());
        assert_eq!(apply_function(&len, vec![Object::from("abc")]), Object::Integer(3));
        assert_eq!(
            apply_function(&len, vec![]),
            Object::error("wrong number of arguments. got=0, want=1")
        );
    }

    #[test]
    fn apply_non_callable() {
        assert_eq!(
            apply_function(&Object::from("f"), vec![]),
            Object::error("not a function: STRING")
        );
    }

    #[test]
    fn runaway_recursion_is_an_error_value() {
        let result = std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(|| {
                let env = Environment::new();
                let value = run_source("let f = fn(n) { f(n + 1) }; f(0)", &env).unwrap();
                (value, CALL_DEPTH.with(Cell::get))
            })
            .unwrap()
            .join()
            .unwrap();
        let expected = format!(
            "stack overflow: call depth exceeded {}",
            runtime::max_call_depth()
        );
        assert_eq!(result, (Object::error(expected), 0));
    }

    #[test]
    fn syntax_errors_surface_as_script_errors() {
        let err = run_source("let = 1", &Environment::new()).unwrap_err();
        assert!(matches!(err, ScriptError::Parse(_)));
        let err = run_source("\"open", &Environment::new()).unwrap_err();
        assert!(matches!(err, ScriptError::Tokenize(_)));
    }
}
