//! The interpreter facade
//!
//! An [`Interpreter`] owns the process-wide [`Globals`] (namespaces,
//! registry, monitors, interceptor) and an [`EvalContext`]. Cloning it is
//! cheap and shares the globals, which is how futures and natives reach the
//! same runtime.

use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use log::warn;

use crate::context::{EvalConfig, EvalContext, Interceptor};
use crate::environment::{prelude, Env, Globals, CORE_NS};
use crate::eval::Frame;
use crate::reader;
use crate::value::{CustomInstance, CustomPrinter, NativeFn, Printer, Value};
use crate::EvalError;

/// An embeddable interpreter instance.
///
/// # Example
///
/// ```
/// use thicket::{Interpreter, Value};
///
/// let interp = Interpreter::new();
/// let result = interp.eval_str("(defn square [x] (* x x)) (square 7)").unwrap();
/// assert_eq!(result, Value::Integer(49));
/// ```
#[derive(Clone)]
pub struct Interpreter {
    pub(crate) globals: Arc<Globals>,
    pub(crate) ctx: EvalContext,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Create an interpreter with the default context and the core prelude.
    pub fn new() -> Self {
        Self::with_context(EvalContext::default())
    }

    /// Create an interpreter with a custom context.
    pub fn with_context(ctx: EvalContext) -> Self {
        Self::try_with_context(ctx).expect("core prelude is well-formed")
    }

    /// Create an interpreter from host configuration.
    pub fn from_config(config: &EvalConfig) -> Self {
        Self::with_context(EvalContext::from_config(config))
    }

    /// Create an interpreter, reporting prelude failures instead of panicking.
    pub fn try_with_context(ctx: EvalContext) -> Result<Self, EvalError> {
        let interp = Self {
            globals: Arc::new(Globals::new()),
            ctx,
        };
        prelude::install(&interp)?;
        Ok(interp)
    }

    /// The shared global tables.
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// The evaluation context.
    pub fn context(&self) -> &EvalContext {
        &self.ctx
    }

    // ═══════════════════════════════════════════════════════════════════
    // Reading and Evaluation
    // ═══════════════════════════════════════════════════════════════════

    /// Read every form in `text`.
    pub fn read_str(&self, text: &str) -> Result<Vec<Value>, EvalError> {
        Ok(reader::read_str(text, &self.ctx.source_name)?)
    }

    /// Read and evaluate every form in `text`, returning the last value.
    pub fn eval_str(&self, text: &str) -> Result<Value, EvalError> {
        self.eval_source(text, &self.ctx.source_name)
    }

    fn eval_source(&self, text: &str, source: &str) -> Result<Value, EvalError> {
        let forms = reader::read_str(text, source)?;
        let env = Env::new();
        let mut result = Value::Nil;
        for form in &forms {
            result = self.eval(form, &env)?;
        }
        Ok(result)
    }

    /// Evaluate one form at top level.
    pub fn eval_form(&self, form: &Value) -> Result<Value, EvalError> {
        self.eval(form, &Env::new())
    }

    /// Evaluate `form` in `env`.
    pub fn eval(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        self.eval_frame(Frame::nested(form.clone(), env.clone()))
    }

    /// Read and evaluate a source file.
    pub fn eval_file(&self, path: impl AsRef<Path>) -> anyhow::Result<Value> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.eval_source(&text, &path.display().to_string())
            .with_context(|| format!("failed to evaluate {}", path.display()))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Host Integration
    // ═══════════════════════════════════════════════════════════════════

    /// Register a native function in the `core` namespace.
    pub fn define_native(&self, native: NativeFn) {
        let name = native.name.clone();
        self.globals.define(CORE_NS, &name, Value::native(native));
    }

    /// Define a global in the current namespace.
    pub fn define_global(&self, name: &str, value: Value) {
        self.globals
            .define(&self.globals.current_ns(), name, value);
    }

    /// Install the sandbox interceptor consulted before sensitive natives.
    pub fn set_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.globals.set_interceptor(Some(Arc::new(interceptor)));
    }

    /// Remove the sandbox interceptor.
    pub fn clear_interceptor(&self) {
        self.globals.set_interceptor(None);
    }

    /// Ask running evaluations to stop at their next step.
    pub fn interrupt(&self) {
        self.ctx.interrupt();
    }

    // ═══════════════════════════════════════════════════════════════════
    // Printing, Equality and Ordering
    // ═══════════════════════════════════════════════════════════════════

    /// `str` form of a value, honoring `toString` overrides.
    pub fn print_str(&self, value: &Value) -> String {
        Printer::plain().with_hook(self).print(value)
    }

    /// Readable form of a value, honoring `toString` overrides.
    pub fn pr_str(&self, value: &Value) -> String {
        Printer::readable().with_hook(self).print(value)
    }

    /// The `=` relation, honoring `equals` overrides on custom types.
    pub fn values_equal(&self, a: &Value, b: &Value) -> Result<bool, EvalError> {
        if let (Value::Custom(x), Value::Custom(y)) = (a, b) {
            if x.tag() == y.tag() {
                if let Some(equals) = x.descriptor.override_fn("equals") {
                    return Ok(self.apply(equals, &[a.clone(), b.clone()])?.is_truthy());
                }
            }
        }
        Ok(a.loose_eq(b))
    }

    /// Total order used by `compare` and `sort`, honoring `compareTo`
    /// overrides on custom types.
    pub fn compare(&self, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
        if let Value::Custom(x) = a {
            if let Some(compare_to) = x.descriptor.override_fn("compareTo") {
                let result = self.apply(compare_to, &[a.clone(), b.clone()])?;
                return match result.as_i64() {
                    Some(n) => Ok(n.cmp(&0)),
                    None => Err(EvalError::type_error("long from compareTo", &result)),
                };
            }
        }
        a.default_cmp(b)
    }
}

impl CustomPrinter for Interpreter {
    fn print_custom(&self, instance: &CustomInstance) -> Option<String> {
        let to_string = instance.descriptor.override_fn("toString")?;
        let this = Value::Custom(Arc::new(instance.clone()));
        match self.apply(to_string, &[this]) {
            Ok(text) => Some(text.to_string()),
            Err(err) => {
                warn!("toString override for {} failed: {}", instance.tag(), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_eval_str_returns_last_value() {
        let interp = Interpreter::new();
        assert_eq!(interp.eval_str("1 2 3").unwrap(), Value::Integer(3));
        assert_eq!(interp.eval_str("").unwrap(), Value::Nil);
    }

    #[test]
    fn test_define_native_is_callable() {
        let interp = Interpreter::new();
        interp.define_native(NativeFn::new("triple", 1, Some(1), |_, args| {
            Ok(Value::Integer(args[0].as_i64().unwrap_or(0) * 3))
        }));
        assert_eq!(interp.eval_str("(triple 5)").unwrap(), Value::Integer(15));
    }

    #[test]
    fn test_clones_share_globals() {
        let interp = Interpreter::new();
        let other = interp.clone();
        interp.eval_str("(def shared 1)").unwrap();
        assert_eq!(other.eval_str("shared").unwrap(), Value::Integer(1));
    }

    #[test]
    fn test_eval_file_missing() {
        let interp = Interpreter::new();
        let err = interp.eval_file("/definitely/not/here.thk").unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
