//! Callable value types: natives, closures and dispatching functions

use std::fmt;
use std::sync::Arc;

use super::{Meta, Value};
use crate::environment::Env;
use crate::registry::{MultiFn, ProtocolMethod};
use crate::{EvalError, Interpreter};

/// Type alias for native function pointers to reduce complexity
pub type NativeFnPtr = Arc<dyn Fn(&Interpreter, &[Value]) -> Result<Value, EvalError> + Send + Sync>;

/// A host-provided function.
///
/// Natives receive the calling interpreter so they can apply language
/// functions (`map`, `swap!`) and reach the global registry.
#[derive(Clone)]
pub struct NativeFn {
    /// Function name (for display and arity errors)
    pub name: String,

    /// Minimum argument count
    pub min: usize,

    /// Maximum argument count, `None` for variadic
    pub max: Option<usize>,

    /// Whether calls pass through the sandbox interceptor first
    pub sensitive: bool,

    /// The actual function pointer
    pub func: NativeFnPtr,
}

impl NativeFn {
    /// Create a native accepting between `min` and `max` arguments.
    pub fn new<F>(name: impl Into<String>, min: usize, max: Option<usize>, func: F) -> Self
    where
        F: Fn(&Interpreter, &[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            min,
            max,
            sensitive: false,
            func: Arc::new(func),
        }
    }

    /// Flag this native as sensitive (I/O and the like).
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Check an argument count against the declared bounds.
    pub fn check_arity(&self, got: usize) -> Result<(), EvalError> {
        let fits = got >= self.min && self.max.map_or(true, |max| got <= max);
        if fits {
            return Ok(());
        }
        let accepted = match self.max {
            None => format!("{}+", self.min),
            Some(max) if max == self.min => max.to_string(),
            Some(max) => (self.min..=max)
                .map(|n| n.to_string())
                .collect::<Vec<_>>()
                .join(", "),
        };
        Err(EvalError::Arity {
            name: self.name.clone(),
            accepted,
            got,
        })
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

/// One arity clause of a closure.
#[derive(Debug, Clone)]
pub struct FnArity {
    /// Fixed parameter patterns, in order
    pub params: Vec<Value>,

    /// Pattern bound to the remaining arguments after `&`
    pub rest: Option<Value>,

    /// Precondition forms from `{:pre [...]}`
    pub pre: Vec<Value>,

    /// Body forms; the last one is in tail position
    pub body: Vec<Value>,
}

impl FnArity {
    /// Number of fixed parameters.
    pub fn fixed(&self) -> usize {
        self.params.len()
    }

    /// Whether this arity takes a `& rest` parameter.
    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }
}

/// A language-defined function with its captured environment.
///
/// The environment may itself hold this closure (recursive `defn`), which is
/// the one reference cycle the runtime tolerates.
#[derive(Clone)]
pub struct Closure {
    /// Function name, if any
    pub name: Option<Arc<str>>,

    /// Arity clauses in declaration order
    pub arities: Vec<FnArity>,

    /// Defining environment
    pub env: Env,

    /// Namespace the function was defined in
    pub ns: Arc<str>,

    /// Attached metadata
    pub meta: Meta,
}

impl Closure {
    /// Display name for errors.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("fn")
    }

    /// Select the arity clause for `argc` arguments.
    ///
    /// An exact fixed-count match wins over a variadic clause; among
    /// variadic clauses the one with the most fixed parameters is taken.
    pub fn select_arity(&self, argc: usize) -> Result<&FnArity, EvalError> {
        self.select_arity_index(argc).map(|i| &self.arities[i])
    }

    /// Index of the arity clause [`select_arity`](Self::select_arity) picks.
    pub fn select_arity_index(&self, argc: usize) -> Result<usize, EvalError> {
        if let Some(exact) = self
            .arities
            .iter()
            .position(|a| !a.is_variadic() && a.fixed() == argc)
        {
            return Ok(exact);
        }
        self.arities
            .iter()
            .enumerate()
            .filter(|(_, a)| a.is_variadic() && a.fixed() <= argc)
            .max_by_key(|(_, a)| a.fixed())
            .map(|(i, _)| i)
            .ok_or_else(|| EvalError::Arity {
                name: self.display_name().to_string(),
                accepted: self.accepted_arities(),
                got: argc,
            })
    }

    /// Human-readable list of accepted arities, e.g. `0, 1, 2` or `1, 3+`.
    pub fn accepted_arities(&self) -> String {
        let mut fixed: Vec<usize> = self
            .arities
            .iter()
            .filter(|a| !a.is_variadic())
            .map(FnArity::fixed)
            .collect();
        fixed.sort_unstable();
        let mut parts: Vec<String> = fixed.iter().map(|n| n.to_string()).collect();
        if let Some(min) = self
            .arities
            .iter()
            .filter(|a| a.is_variadic())
            .map(FnArity::fixed)
            .min()
        {
            parts.push(format!("{}+", min));
        }
        parts.join(", ")
    }
}

impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Closure({})", self.display_name())
    }
}

/// Any value that can be applied to arguments.
#[derive(Clone)]
pub enum Function {
    /// Host-provided function
    Native(Arc<NativeFn>),
    /// Language-defined function
    Closure(Arc<Closure>),
    /// Multimethod dispatching on a computed value
    Multi(Arc<MultiFn>),
    /// Protocol method dispatching on the first argument's type
    Protocol(Arc<ProtocolMethod>),
}

impl Function {
    /// The function's name.
    pub fn name(&self) -> String {
        match self {
            Function::Native(n) => n.name.clone(),
            Function::Closure(c) => c.display_name().to_string(),
            Function::Multi(m) => m.name.to_string(),
            Function::Protocol(p) => p.method.to_string(),
        }
    }

    /// Attached metadata (closures only).
    pub fn meta(&self) -> &Meta {
        const NONE: &Meta = &None;
        match self {
            Function::Closure(c) => &c.meta,
            _ => NONE,
        }
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Function) -> bool {
        match (self, other) {
            (Function::Native(a), Function::Native(b)) => Arc::ptr_eq(a, b),
            (Function::Closure(a), Function::Closure(b)) => Arc::ptr_eq(a, b),
            (Function::Multi(a), Function::Multi(b)) => Arc::ptr_eq(a, b),
            (Function::Protocol(a), Function::Protocol(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Address used for identity hashing.
    pub fn addr(&self) -> usize {
        match self {
            Function::Native(a) => Arc::as_ptr(a) as *const u8 as usize,
            Function::Closure(a) => Arc::as_ptr(a) as *const u8 as usize,
            Function::Multi(a) => Arc::as_ptr(a) as *const u8 as usize,
            Function::Protocol(a) => Arc::as_ptr(a) as *const u8 as usize,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Native(n) => write!(f, "{:?}", n),
            Function::Closure(c) => write!(f, "{:?}", c),
            Function::Multi(m) => write!(f, "MultiFn({})", m.name),
            Function::Protocol(p) => write!(f, "ProtocolMethod({})", p.method),
        }
    }
}
