//=====================================================
// File: interpreter/object.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: GatoScript runtime object model
// Objective: Define the closed set of value kinds with their equality, truthiness,
//            hashing, and display rules
//=====================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::ast::BlockStatement;

use super::builtins::Builtin;
use super::environment::Environment;
use super::errors::RuntimeError;

// Arrays and hashes can nest arbitrarily deep, so equality and display grow
// the stack the same way evaluation does.
const RED_ZONE: usize = 64 * 1024;
const STACK_GROWTH: usize = 1024 * 1024;

/// Discriminant of an [`Object`], used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Integer,
    String,
    Boolean,
    Null,
    Array,
    Hash,
    Function,
    Builtin,
    Error,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Integer => "INTEGER",
            ObjectKind::String => "STRING",
            ObjectKind::Boolean => "BOOLEAN",
            ObjectKind::Null => "NULL",
            ObjectKind::Array => "ARRAY",
            ObjectKind::Hash => "HASH",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Builtin => "BUILTIN",
            ObjectKind::Error => "ERROR",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys a hash can be indexed by. Equality is by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    String(Arc<str>),
    Boolean(bool),
}

/// The key object is kept next to the value so hashes can be displayed.
#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

/// A closure: parameters, a shared body, and the environment it was defined in.
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Arc<BlockStatement>,
    pub env: Environment,
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// GatoScript runtime value types
#[derive(Debug, Clone)]
pub enum Object {
    Integer(i64),
    String(Arc<str>),
    Boolean(bool),
    Null,
    Array(Arc<Vec<Object>>),
    Hash(Arc<HashMap<HashKey, HashPair>>),
    Function(Arc<Function>),
    Builtin(&'static Builtin),
    Error(Arc<str>),
}

impl Object {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Integer(_) => ObjectKind::Integer,
            Object::String(_) => ObjectKind::String,
            Object::Boolean(_) => ObjectKind::Boolean,
            Object::Null => ObjectKind::Null,
            Object::Array(_) => ObjectKind::Array,
            Object::Hash(_) => ObjectKind::Hash,
            Object::Function(_) => ObjectKind::Function,
            Object::Builtin(_) => ObjectKind::Builtin,
            Object::Error(_) => ObjectKind::Error,
        }
    }

    pub fn array(elements: Vec<Object>) -> Self {
        Object::Array(Arc::new(elements))
    }

    /// Builds a hash, rejecting keys that are not Integer, String or Boolean.
    pub fn hash(pairs: impl IntoIterator<Item = (Object, Object)>) -> Result<Self, RuntimeError> {
        let mut entries = HashMap::new();
        for (key, value) in pairs {
            let hash_key = key
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableHashKey(key.kind()))?;
            entries.insert(hash_key, HashPair { key, value });
        }
        Ok(Object::Hash(Arc::new(entries)))
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Object::Error(message.to_string().into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Object::Error(_))
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Object::Integer(value) => Some(HashKey::Integer(*value)),
            Object::String(value) => Some(HashKey::String(Arc::clone(value))),
            Object::Boolean(value) => Some(HashKey::Boolean(*value)),
            _ => None,
        }
    }
}

/// Nested collections are torn down with a worklist instead of recursion.
/// Only payloads this object owns outright are drained; shared ones are left
/// to their last holder.
impl Drop for Object {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        detach_children(self, &mut pending);
        while let Some(mut child) = pending.pop() {
            detach_children(&mut child, &mut pending);
        }
    }
}

fn detach_children(object: &mut Object, pending: &mut Vec<Object>) {
    match object {
        Object::Array(elements) => {
            if let Some(elements) = Arc::get_mut(elements) {
                pending.extend(elements.drain(..));
            }
        }
        Object::Hash(entries) => {
            if let Some(entries) = Arc::get_mut(entries) {
                pending.extend(entries.drain().map(|(_, pair)| pair.value));
            }
        }
        _ => {}
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.eq_inner(other))
    }
}

impl Object {
    fn eq_inner(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::String(a), Object::String(b)) => a == b,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Null, Object::Null) => true,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Hash(a), Object::Hash(b)) => a == b,
            (Object::Function(a), Object::Function(b)) => Arc::ptr_eq(a, b),
            (Object::Builtin(a), Object::Builtin(b)) => a.name == b.name,
            (Object::Error(a), Object::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Object::Integer(value)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Object::Boolean(value)
    }
}

impl From<&str> for Object {
    fn from(value: &str) -> Self {
        Object::String(value.into())
    }
}

impl From<String> for Object {
    fn from(value: String) -> Self {
        Object::String(value.into())
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        stacker::maybe_grow(RED_ZONE, STACK_GROWTH, || self.fmt_inner(f))
    }
}

impl Object {
    fn fmt_inner(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{}", value),
            Object::String(value) => f.write_str(value),
            Object::Boolean(value) => write!(f, "{}", value),
            Object::Null => f.write_str("null"),
            Object::Array(elements) => {
                f.write_str("[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                f.write_str("]")
            }
            Object::Hash(pairs) => {
                f.write_str("{")?;
                for (i, pair) in pairs.values().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", pair.key, pair.value)?;
                }
                f.write_str("}")
            }
            Object::Function(function) => {
                write!(f, "fn({}) {}", function.parameters.join(", "), function.body)
            }
            Object::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Object::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::builtins;

    #[test]
    fn display_forms() {
        assert_eq!(Object::Integer(-42).to_string(), "-42");
        assert_eq!(Object::from("hello").to_string(), "hello");
        assert_eq!(Object::Boolean(true).to_string(), "true");
        assert_eq!(Object::Null.to_string(), "null");
        assert_eq!(
            Object::array(vec![Object::Integer(1), Object::from("two")]).to_string(),
            "[1, two]"
        );
        assert_eq!(Object::error("boom").to_string(), "ERROR: boom");
        let len = builtins::lookup("len").map(Object::Builtin).unwrap();
        assert_eq!(len.to_string(), "builtin function len");
    }

    #[test]
    fn single_entry_hash_display() {
        let hash = Object::hash([(Object::from("path"), Object::from("/"))]).unwrap();
        assert_eq!(hash.to_string(), "{path: /}");
    }

    #[test]
    fn truthiness() {
        assert!(Object::Integer(0).is_truthy());
        assert!(Object::from("").is_truthy());
        assert!(Object::Boolean(true).is_truthy());
        assert!(!Object::Boolean(false).is_truthy());
        assert!(!Object::Null.is_truthy());
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(Object::from("a"), Object::from(String::from("a")));
        assert_eq!(
            Object::array(vec![Object::Integer(1), Object::Null]),
            Object::array(vec![Object::Integer(1), Object::Null])
        );
        assert_ne!(Object::Integer(1), Object::Boolean(true));
        assert_ne!(Object::Null, Object::Boolean(false));
    }

    #[test]
    fn functions_compare_by_identity() {
        let function = Arc::new(Function {
            parameters: vec!["x".into()],
            body: Arc::new(BlockStatement::default()),
            env: Environment::new(),
        });
        let twin = Arc::new(Function {
            parameters: vec!["x".into()],
            body: Arc::new(BlockStatement::default()),
            env: Environment::new(),
        });
        let a = Object::Function(Arc::clone(&function));
        assert_eq!(a, Object::Function(function));
        assert_ne!(a, Object::Function(twin));
        assert_eq!(a.to_string(), "fn(x) {}");
    }

    #[test]
    fn hash_keys_compare_by_value() {
        let hash = Object::hash([
            (Object::from("name"), Object::from("gato")),
            (Object::Integer(1), Object::Boolean(true)),
        ])
        .unwrap();
        let Object::Hash(entries) = &hash else {
            panic!("expected hash");
        };
        let key = Object::from(String::from("name")).hash_key().unwrap();
        assert_eq!(entries[&key].value, Object::from("gato"));
        assert_eq!(
            entries[&HashKey::Integer(1)].value,
            Object::Boolean(true)
        );
    }

    fn nested(depth: usize) -> Object {
        let mut value = Object::array(vec![]);
        for _ in 0..depth {
            value = Object::array(vec![value]);
        }
        value
    }

    #[test]
    fn deeply_nested_arrays_display_compare_and_drop() {
        let deep = nested(300_000);
        let text = deep.to_string();
        assert_eq!(text.len(), 600_002);
        assert!(text.starts_with("[[[") && text.ends_with("]]]"));
        assert_eq!(deep, nested(300_000));
        assert_ne!(deep, nested(299_999));
        drop(deep);
    }

    #[test]
    fn deeply_nested_hash_values_drop() {
        let mut value = Object::Null;
        for i in 0..300_000 {
            value = Object::hash([(Object::Integer(i), value)]).unwrap();
        }
        drop(value);
    }

    #[test]
    fn shared_nested_payload_survives_drop() {
        let inner = nested(10);
        let outer = Object::array(vec![inner.clone(), inner.clone()]);
        drop(outer);
        assert_eq!(inner, nested(10));
        assert_eq!(inner.to_string(), "[[[[[[[[[[[]]]]]]]]]]]");
    }

    #[test]
    fn unusable_hash_key() {
        let err = Object::hash([(Object::array(vec![]), Object::Null)]).unwrap_err();
        assert_eq!(err.to_string(), "unusable as hash key: ARRAY");
        assert!(Object::Null.hash_key().is_none());
    }
}
