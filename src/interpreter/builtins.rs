//==============================================
// File: interpreter/builtins.rs
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Native function table for GatoScript
// Objective: Resolve builtin names to native functions that validate their own
//            arguments and expose collections, I/O, timing and concurrency
//==============================================

//==============================================
// Import & Modules
//==============================================

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;

use once_cell::sync::Lazy;
use tracing::{error, warn};

use crate::runtime::{http, tasks};

use super::errors::{Arity, RuntimeError};
use super::object::{Object, ObjectKind};

//==============================================
// Section 1.0 - Table
//==============================================

/// Native function signature. Arguments are already evaluated.
pub type BuiltinFn = fn(&[Object]) -> Result<Object, RuntimeError>;

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    func: BuiltinFn,
}

impl Builtin {
    /// Runs the native function, folding any failure into an Error value.
    pub fn call(&self, arguments: &[Object]) -> Object {
        self.invoke(arguments).unwrap_or_else(Object::from)
    }

    pub(crate) fn invoke(&self, arguments: &[Object]) -> Result<Object, RuntimeError> {
        (self.func)(arguments)
    }
}

static BUILTINS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    let entries: [(&'static str, BuiltinFn); 9] = [
        ("len", builtin_len),
        ("first", builtin_first),
        ("push", builtin_push),
        ("print", builtin_print),
        ("readFile", builtin_read_file),
        ("writeFile", builtin_write_file),
        ("sleep", builtin_sleep),
        ("spawn", builtin_spawn),
        ("listen", builtin_listen),
    ];
    entries
        .into_iter()
        .map(|(name, func)| (name, Builtin { name, func }))
        .collect()
});

/// Builtin registered under `name`, if any. Consulted only after the
/// environment, so scripts may shadow these names.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.get(name)
}

pub fn names() -> impl Iterator<Item = &'static str> {
    BUILTINS.keys().copied()
}

//==============================================
// Section 2.0 - Argument helpers
//==============================================

fn check_count(args: &[Object], want: Arity) -> Result<(), RuntimeError> {
    if want.accepts(args.len()) {
        Ok(())
    } else {
        Err(RuntimeError::WrongArgumentCount {
            got: args.len(),
            want,
        })
    }
}

fn fixed<const N: usize>(args: &[Object]) -> Result<&[Object; N], RuntimeError> {
    check_count(args, Arity::Exactly(N))?;
    <&[Object; N]>::try_from(args).map_err(|_| RuntimeError::WrongArgumentCount {
        got: args.len(),
        want: Arity::Exactly(N),
    })
}

fn kind_error(builtin: &'static str, position: usize, want: ObjectKind, got: &Object) -> RuntimeError {
    RuntimeError::ArgumentKind {
        builtin,
        position,
        want,
        got: got.kind(),
    }
}

fn string_arg<'a>(builtin: &'static str, position: usize, value: &'a Object) -> Result<&'a str, RuntimeError> {
    match value {
        Object::String(text) => Ok(text.as_ref()),
        other => Err(kind_error(builtin, position, ObjectKind::String, other)),
    }
}

fn length(len: usize) -> Object {
    Object::Integer(i64::try_from(len).unwrap_or(i64::MAX))
}

//==============================================
// Section 3.0 - Collections
//==============================================

fn builtin_len(args: &[Object]) -> Result<Object, RuntimeError> {
    let [value] = fixed::<1>(args)?;
    match value {
        Object::String(text) => Ok(length(text.len())),
        Object::Array(elements) => Ok(length(elements.len())),
        other => Err(RuntimeError::UnsupportedArgument {
            builtin: "len",
            got: other.kind(),
        }),
    }
}

fn builtin_first(args: &[Object]) -> Result<Object, RuntimeError> {
    let [value] = fixed::<1>(args)?;
    match value {
        Object::Array(elements) => Ok(elements.first().cloned().unwrap_or(Object::Null)),
        other => Err(kind_error("first", 1, ObjectKind::Array, other)),
    }
}

// Arrays are immutable values; push always builds a new one.
fn builtin_push(args: &[Object]) -> Result<Object, RuntimeError> {
    let [array, value] = fixed::<2>(args)?;
    match array {
        Object::Array(elements) => {
            let mut extended = Vec::with_capacity(elements.len() + 1);
            extended.extend(elements.iter().cloned());
            extended.push(value.clone());
            Ok(Object::array(extended))
        }
        other => Err(kind_error("push", 1, ObjectKind::Array, other)),
    }
}

//==============================================
// Section 4.0 - I/O
//==============================================

fn builtin_print(args: &[Object]) -> Result<Object, RuntimeError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for arg in args {
        // A closed stdout is not a script error.
        let _ = writeln!(out, "{}", arg);
    }
    let _ = out.flush();
    Ok(Object::Null)
}

fn builtin_read_file(args: &[Object]) -> Result<Object, RuntimeError> {
    let [path] = fixed::<1>(args)?;
    let path = string_arg("readFile", 1, path)?;
    match std::fs::read(path) {
        Ok(bytes) => Ok(Object::from(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) => {
            error!(path, error = %err, "readFile failed");
            Ok(Object::Null)
        }
    }
}

fn builtin_write_file(args: &[Object]) -> Result<Object, RuntimeError> {
    let [path, content] = fixed::<2>(args)?;
    let path = string_arg("writeFile", 1, path)?;
    let content = string_arg("writeFile", 2, content)?;
    match write_file(Path::new(path), content) {
        Ok(()) => Ok(Object::Boolean(true)),
        Err(err) => {
            error!(path, error = %err, "writeFile failed");
            Ok(Object::Boolean(false))
        }
    }
}

fn write_file(path: &Path, content: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())
}

//==============================================
// Section 5.0 - Timing & concurrency
//==============================================

fn builtin_sleep(args: &[Object]) -> Result<Object, RuntimeError> {
    let [millis] = fixed::<1>(args)?;
    match millis {
        Object::Integer(ms) => {
            thread::sleep(Duration::from_millis(u64::try_from(*ms).unwrap_or(0)));
            Ok(Object::Null)
        }
        other => Err(kind_error("sleep", 1, ObjectKind::Integer, other)),
    }
}

/// `spawn(f, args...)`: runs `f(args...)` on the task pool and returns at once.
/// The callee is not checked here; a failing task only logs.
fn builtin_spawn(args: &[Object]) -> Result<Object, RuntimeError> {
    check_count(args, Arity::AtLeast(1))?;
    let callee = args[0].clone();
    let arguments = args[1..].to_vec();
    tasks::spawn_detached(move || {
        if let Object::Error(message) = &super::apply_function(&callee, arguments) {
            warn!(%message, "spawned task failed");
        }
    })?;
    Ok(Object::Null)
}

fn builtin_listen(args: &[Object]) -> Result<Object, RuntimeError> {
    let [port, handler] = fixed::<2>(args)?;
    let port = string_arg("listen", 1, port)?;
    match handler {
        Object::Function(_) => http::serve(port, handler.clone()),
        other => Err(kind_error("listen", 2, ObjectKind::Function, other)),
    }
}

//==============================================
// Section 6.0 - Tests
//==============================================


//==============================================
// End of file
//==============================================
