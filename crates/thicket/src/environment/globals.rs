//! Global variables, namespaces and the shared process-wide registry

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use dashmap::{DashMap, DashSet};
use log::debug;

use super::dynamic;
use crate::context::Interceptor;
use crate::registry::Registry;
use crate::runtime::Monitors;
use crate::value::{Symbol, Value};
use crate::EvalError;

/// Namespace holding primitives and bootstrap macros.
pub const CORE_NS: &str = "core";

/// Default namespace for user code.
pub const USER_NS: &str = "user";

/// A global variable.
///
/// Dynamic vars consult the calling thread's binding frames before their
/// root value.
pub struct Var {
    id: u64,
    ns: String,
    name: String,
    root: RwLock<Option<Value>>,
    dynamic: AtomicBool,
}

impl Var {
    /// Unique id, used to key dynamic frames.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Namespace the var lives in.
    pub fn namespace(&self) -> &str {
        &self.ns
    }

    /// Unqualified name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `ns/name`.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.ns, self.name)
    }

    /// Whether the var was declared with `def-dynamic`.
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.load(Ordering::Acquire)
    }

    /// Whether any `def` variant has given the var a root value.
    pub fn is_bound(&self) -> bool {
        self.root.read().unwrap_or_else(|e| e.into_inner()).is_some()
    }

    /// Current value: innermost thread frame for dynamic vars, else the root.
    pub fn get(&self) -> Option<Value> {
        if self.is_dynamic() {
            if let Some(value) = dynamic::current(self.id) {
                return Some(value);
            }
        }
        self.root.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replace the root value.
    pub fn set_root(&self, value: Value) {
        *self.root.write().unwrap_or_else(|e| e.into_inner()) = Some(value);
    }

    /// Mark the var dynamic.
    pub fn mark_dynamic(&self) {
        self.dynamic.store(true, Ordering::Release);
    }

    /// `set!` semantics: the nearest thread frame if dynamic and bound on
    /// this thread, otherwise the root.
    pub fn assign(&self, value: Value) {
        if self.is_dynamic() && dynamic::set_top(self.id, value.clone()) {
            return;
        }
        self.set_root(value);
    }
}

impl std::fmt::Debug for Var {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#'{}", self.qualified_name())
    }
}

/// Process-wide interpreter state shared by every evaluation.
///
/// Holds the namespace tables, the dispatch registry, the gensym counter,
/// the monitor table and the optional sandbox interceptor. It is created
/// once per [`Interpreter`](crate::Interpreter) and passed down explicitly.
pub struct Globals {
    vars: DashMap<String, Arc<Var>>,
    namespaces: DashSet<String>,
    current_ns: RwLock<String>,
    registry: Registry,
    monitors: Monitors,
    interceptor: RwLock<Option<Arc<dyn Interceptor>>>,
    next_var_id: AtomicU64,
    gensym_counter: AtomicU64,
}

impl Default for Globals {
    fn default() -> Self {
        Self::new()
    }
}

impl Globals {
    /// Create tables with the `core` and `user` namespaces; `user` is current.
    pub fn new() -> Self {
        let namespaces = DashSet::new();
        namespaces.insert(CORE_NS.to_string());
        namespaces.insert(USER_NS.to_string());
        Self {
            vars: DashMap::new(),
            namespaces,
            current_ns: RwLock::new(USER_NS.to_string()),
            registry: Registry::new(),
            monitors: Monitors::new(),
            interceptor: RwLock::new(None),
            next_var_id: AtomicU64::new(1),
            gensym_counter: AtomicU64::new(0),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Namespaces
    // ═══════════════════════════════════════════════════════════════════

    /// The namespace new definitions go into.
    pub fn current_ns(&self) -> String {
        self.current_ns
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Switch the current namespace, creating it if needed.
    pub fn set_current_ns(&self, ns: impl Into<String>) {
        let ns = ns.into();
        self.namespaces.insert(ns.clone());
        *self.current_ns.write().unwrap_or_else(|e| e.into_inner()) = ns;
    }

    /// Whether a namespace exists.
    pub fn has_namespace(&self, ns: &str) -> bool {
        self.namespaces.contains(ns)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Vars
    // ═══════════════════════════════════════════════════════════════════

    /// Find an existing var.
    pub fn find_var(&self, ns: &str, name: &str) -> Option<Arc<Var>> {
        self.vars
            .get(&format!("{}/{}", ns, name))
            .map(|v| Arc::clone(v.value()))
    }

    /// Find or create an (unbound) var.
    pub fn intern(&self, ns: &str, name: &str) -> Arc<Var> {
        self.namespaces.insert(ns.to_string());
        let entry = self
            .vars
            .entry(format!("{}/{}", ns, name))
            .or_insert_with(|| {
                Arc::new(Var {
                    id: self.next_var_id.fetch_add(1, Ordering::Relaxed),
                    ns: ns.to_string(),
                    name: name.to_string(),
                    root: RwLock::new(None),
                    dynamic: AtomicBool::new(false),
                })
            });
        Arc::clone(entry.value())
    }

    /// Define (or redefine) `ns/name` with a root value.
    pub fn define(&self, ns: &str, name: &str, value: Value) -> Arc<Var> {
        let var = self.intern(ns, name);
        var.set_root(value);
        debug!("defined {}", var.qualified_name());
        var
    }

    /// Define a dynamic var with `value` as its root.
    pub fn define_dynamic(&self, ns: &str, name: &str, value: Value) -> Arc<Var> {
        let var = self.intern(ns, name);
        var.mark_dynamic();
        var.set_root(value);
        debug!("defined dynamic {}", var.qualified_name());
        var
    }

    /// Define only if no `def` variant has bound the var yet.
    pub fn define_once(&self, ns: &str, name: &str, value: Value) -> Result<Arc<Var>, EvalError> {
        let var = self.intern(ns, name);
        if var.is_bound() {
            return Err(EvalError::AlreadyDefined {
                name: var.qualified_name(),
            });
        }
        var.set_root(value);
        debug!("defined once {}", var.qualified_name());
        Ok(var)
    }

    /// Find the var a global symbol refers to.
    ///
    /// Qualified symbols name their table directly. Unqualified symbols try
    /// the current namespace, then `core`.
    pub fn resolve_var(&self, symbol: &Symbol) -> Option<Arc<Var>> {
        match symbol.namespace() {
            Some(ns) => self.find_var(ns, symbol.name()),
            None => self
                .find_var(&self.current_ns(), symbol.name())
                .filter(|v| v.is_bound())
                .or_else(|| self.find_var(CORE_NS, symbol.name())),
        }
    }

    /// Value of a global symbol, with distinct errors for qualified misses.
    pub fn lookup(&self, symbol: &Symbol) -> Result<Value, EvalError> {
        if let Some(ns) = symbol.namespace() {
            if !self.has_namespace(ns) {
                return Err(EvalError::QualifiedNotFound {
                    name: symbol.to_string(),
                    reason: format!("namespace '{}' does not exist", ns),
                });
            }
            return self
                .find_var(ns, symbol.name())
                .and_then(|v| v.get())
                .ok_or_else(|| EvalError::QualifiedNotFound {
                    name: symbol.to_string(),
                    reason: format!("no var '{}' in namespace '{}'", symbol.name(), ns),
                });
        }
        self.resolve_var(symbol)
            .and_then(|v| v.get())
            .ok_or_else(|| EvalError::SymbolNotFound {
                name: symbol.to_string(),
            })
    }

    // ═══════════════════════════════════════════════════════════════════
    // Shared services
    // ═══════════════════════════════════════════════════════════════════

    /// The dispatch registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The monitor table used by `locking`.
    pub fn monitors(&self) -> &Monitors {
        &self.monitors
    }

    /// Install (or clear) the sandbox interceptor.
    pub fn set_interceptor(&self, interceptor: Option<Arc<dyn Interceptor>>) {
        *self.interceptor.write().unwrap_or_else(|e| e.into_inner()) = interceptor;
    }

    /// The installed sandbox interceptor.
    pub fn interceptor(&self) -> Option<Arc<dyn Interceptor>> {
        self.interceptor
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Next value of the gensym counter.
    pub fn next_gensym_id(&self) -> u64 {
        self.gensym_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A fresh symbol `prefix<n>`.
    pub fn gensym(&self, prefix: &str) -> Symbol {
        Symbol::new(format!("{}{}", prefix, self.next_gensym_id()))
    }
}
