// monkey-core - Environment for lexical scoping
// Copyright (c) 2025 The Monkey Authors. MIT licensed.

//! Environment for variable bindings with lexical scoping.
//!
//! Used by the tree-walking evaluator. Environments form a chain through
//! outer references; each function value keeps a handle on the
//! environment it was created in.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

/// A lexical environment for variable bindings.
///
/// # Examples
///
/// ```
/// use monkey_core::{Environment, Object};
///
/// let env = Environment::new();
/// env.set("x", Object::Integer(42));
/// assert_eq!(env.get("x"), Some(Object::Integer(42)));
///
/// // An enclosed environment sees outer bindings and can shadow them.
/// let inner = env.enclosed();
/// assert_eq!(inner.get("x"), Some(Object::Integer(42)));
/// inner.set("x", Object::Integer(100));
/// assert_eq!(inner.get("x"), Some(Object::Integer(100)));
/// assert_eq!(env.get("x"), Some(Object::Integer(42)));
/// ```
#[derive(Debug, Clone)]
pub struct Environment {
    inner: Rc<RefCell<EnvInner>>,
}

#[derive(Debug)]
struct EnvInner {
    store: HashMap<String, Object>,
    outer: Option<Environment>,
}

impl Environment {
    /// Create a new root environment with no outer scope.
    pub fn new() -> Self {
        Environment {
            inner: Rc::new(RefCell::new(EnvInner {
                store: HashMap::new(),
                outer: None,
            })),
        }
    }

    /// Create an enclosed environment with this one as its outer scope.
    #[must_use]
    pub fn enclosed(&self) -> Self {
        Environment {
            inner: Rc::new(RefCell::new(EnvInner {
                store: HashMap::new(),
                outer: Some(self.clone()),
            })),
        }
    }

    /// Bind a name in this environment (never the outer one).
    pub fn set(&self, name: impl Into<String>, value: Object) {
        self.inner.borrow_mut().store.insert(name.into(), value);
    }

    /// Look up a name here or in the outer chain. Iterative traversal so
    /// deeply nested scopes cannot overflow the host stack.
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut current = self.clone();
        loop {
            let inner = current.inner.borrow();
            if let Some(value) = inner.store.get(name) {
                return Some(value.clone());
            }
            let outer = inner.outer.clone();
            drop(inner);
            match outer {
                Some(env) => current = env,
                None => return None,
            }
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Environment {
    /// Environments compare by identity: two function values are only
    /// equal if they captured the very same scope.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
