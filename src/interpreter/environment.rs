//=====================================================
// File: interpreter/environment.rs
//=====================================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Lexical scope chain for GatoScript
// Objective: Provide shareable scopes with define, lookup and rebind semantics that
//            stay consistent when closures run on several threads at once
//=====================================================

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::object::Object;

/// A handle to one scope in the chain. Clones share the same scope.
///
/// Each scope guards its own bindings. A lock is only held while touching that
/// one scope's map, never while another scope is locked, so lookups that walk
/// the chain cannot deadlock against each other.
#[derive(Clone, Default)]
pub struct Environment {
    scope: Arc<Scope>,
}

#[derive(Default)]
struct Scope {
    store: Mutex<HashMap<String, Object>>,
    outer: Option<Environment>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// New child scope whose lookups fall through to `outer`.
    pub fn enclosed(outer: &Environment) -> Self {
        Self {
            scope: Arc::new(Scope {
                store: Mutex::default(),
                outer: Some(outer.clone()),
            }),
        }
    }

    pub fn outer(&self) -> Option<&Environment> {
        self.scope.outer.as_ref()
    }

    /// Nearest binding of `name`, searching outward.
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut current = self;
        loop {
            if let Some(value) = current.scope.store.lock().get(name) {
                return Some(value.clone());
            }
            current = current.outer()?;
        }
    }

    /// Defines or overwrites `name` in this scope only. Returns the stored value.
    pub fn set(&self, name: impl Into<String>, value: Object) -> Object {
        self.scope.store.lock().insert(name.into(), value.clone());
        value
    }

    /// Rebinds the nearest existing `name`. `None` when no scope defines it;
    /// nothing is created in that case.
    pub fn update(&self, name: &str, value: Object) -> Option<Object> {
        match self.update_with(name, |_| Ok::<_, Infallible>(value)) {
            Ok(updated) => updated,
            Err(never) => match never {},
        }
    }

    /// Read-modify-write of the nearest `name` under its scope's lock.
    ///
    /// Two threads running `x += 1` against the same scope serialize here, so
    /// neither increment is lost. `f` runs at most once.
    pub fn update_with<E>(
        &self,
        name: &str,
        f: impl FnOnce(&Object) -> Result<Object, E>,
    ) -> Result<Option<Object>, E> {
        let mut current = self;
        loop {
            {
                let mut store = current.scope.store.lock();
                if let Some(slot) = store.get_mut(name) {
                    let updated = f(slot)?;
                    *slot = updated.clone();
                    return Ok(Some(updated));
                }
            }
            match current.outer() {
                Some(outer) => current = outer,
                None => return Ok(None),
            }
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.scope.store.lock().contains_key(name)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.scope.store.lock().keys().cloned().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("enclosed", &self.scope.outer.is_some())
            .finish()
    }
}
