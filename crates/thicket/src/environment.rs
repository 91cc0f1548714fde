//! Runtime environment: lexical scope chains, globals and dynamic bindings

pub mod dynamic;
mod globals;
pub(crate) mod prelude;

pub use dynamic::DynamicGuard;
pub use globals::{Globals, Var, CORE_NS, USER_NS};

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::value::Value;

struct Scope {
    bindings: RwLock<HashMap<String, Value>>,
    parent: Option<Env>,
}

/// A lexical environment: one scope of bindings plus its parent chain.
///
/// Environments are shared, reference-counted nodes. A closure holds the
/// environment it was created in, and that environment may in turn hold the
/// closure; the cycle is left to live as long as either side is reachable.
///
/// # Example
///
/// ```
/// use thicket::{Env, Value};
///
/// let outer = Env::new();
/// outer.define("x", Value::Integer(1));
///
/// let inner = outer.child();
/// inner.define("x", Value::Integer(10)); // Shadows outer x
/// inner.define("y", Value::Integer(2));
///
/// assert_eq!(inner.get("x"), Some(Value::Integer(10)));
/// assert_eq!(outer.get("x"), Some(Value::Integer(1)));
/// assert_eq!(outer.get("y"), None);
/// ```
#[derive(Clone)]
pub struct Env(Arc<Scope>);

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    /// Create an empty root environment.
    pub fn new() -> Self {
        Env(Arc::new(Scope {
            bindings: RwLock::new(HashMap::new()),
            parent: None,
        }))
    }

    /// Create a new scope whose parent is `self`.
    pub fn child(&self) -> Env {
        Env(Arc::new(Scope {
            bindings: RwLock::new(HashMap::new()),
            parent: Some(self.clone()),
        }))
    }

    /// Bind `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.0
            .bindings
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.into(), value);
    }

    /// Look up `name`, walking outward through parent scopes.
    pub fn get(&self, name: &str) -> Option<Value> {
        let mut scope = Some(self);
        while let Some(env) = scope {
            let found = env
                .0
                .bindings
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .get(name)
                .cloned();
            if found.is_some() {
                return found;
            }
            scope = env.0.parent.as_ref();
        }
        None
    }

    /// Check whether `name` is bound anywhere in the chain.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Number of scopes in the chain, including this one.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut scope = self.0.parent.as_ref();
        while let Some(env) = scope {
            depth += 1;
            scope = env.0.parent.as_ref();
        }
        depth
    }

    /// Whether two handles refer to the same scope.
    pub fn ptr_eq(&self, other: &Env) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for Env {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Env(depth={})", self.depth())
    }
}
