//! GatoScript: a small dynamically typed scripting language with closures,
//! detached tasks (`spawn`) and a blocking HTTP bridge (`listen`).
//!
//! ```
//! use gatoscript::{Environment, Object, run_source};
//!
//! let env = Environment::new();
//! let value = run_source("let add = fn(a, b) { a + b }; add(2, 3)", &env).unwrap();
//! assert_eq!(value, Object::Integer(5));
//! ```

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod tokenizer;

pub use interpreter::{
    Environment, Object, ObjectKind, RuntimeError, ScriptError, apply_function, evaluate,
    parse_source, run_source,
};
