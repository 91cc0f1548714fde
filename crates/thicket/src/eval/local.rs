//! Local and dynamic bindings: `let`, `loop`, `binding`, `set!`

use std::sync::Arc;

use super::{function, Frame, RecurTarget, Step};
use crate::environment::{dynamic, Env};
use crate::value::Value;
use crate::{EvalError, Interpreter};

/// Split a binding vector into `(pattern, init)` pairs.
fn binding_pairs<'a>(form_name: &str, bindings: Option<&'a Value>) -> Result<Vec<(&'a Value, &'a Value)>, EvalError> {
    let items = bindings
        .and_then(Value::as_vector)
        .ok_or_else(|| EvalError::invalid_form(form_name, "expects a binding vector"))?;
    if items.len() % 2 != 0 {
        return Err(EvalError::invalid_form(
            form_name,
            "binding vector requires an even number of forms",
        ));
    }
    Ok(items.chunks(2).map(|pair| (&pair[0], &pair[1])).collect())
}

impl Interpreter {
    /// Bind pairs sequentially into a child of `env`; each init sees the
    /// bindings before it.
    fn bind_sequentially(&self, env: &Env, pairs: &[(&Value, &Value)]) -> Result<Env, EvalError> {
        let scope = env.child();
        let ns = self.globals.current_ns();
        for (pattern, init) in pairs {
            let value = self.eval_nested(init, &scope)?;
            self.bind_pattern(&scope, pattern, value, &ns)?;
        }
        Ok(scope)
    }

    /// `(let [pattern init ...] body*)`
    pub(crate) fn eval_let(&self, frame: &Frame, args: &[Value]) -> Result<Step, EvalError> {
        let pairs = binding_pairs("let", args.first())?;
        let scope = self.bind_sequentially(&frame.env, &pairs)?;
        self.step_body(frame, &args[1..], scope)
    }

    /// `(loop [pattern init ...] body*)`
    ///
    /// Establishes a fresh recur target; the last body form is in tail
    /// position regardless of the loop's own position.
    pub(crate) fn eval_loop(&self, frame: &Frame, args: &[Value]) -> Result<Step, EvalError> {
        let pairs = binding_pairs("loop", args.first())?;
        let scope = self.bind_sequentially(&frame.env, &pairs)?;
        let body = args[1..].to_vec();
        let target = Arc::new(RecurTarget::Loop {
            patterns: pairs.iter().map(|(p, _)| (*p).clone()).collect(),
            body: body.clone(),
            env: frame.env.clone(),
        });
        Ok(Step::Continue(Frame {
            form: function::body_form(&body),
            env: scope,
            tail: true,
            target: Some(target),
        }))
    }

    /// `(binding [var value ...] body*)`
    ///
    /// All values are evaluated before any frame is pushed. The frame is
    /// popped when the body finishes, normally or not.
    pub(crate) fn eval_binding(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let pairs = binding_pairs("binding", args.first())?;
        let mut frame = Vec::with_capacity(pairs.len());
        for (name, init) in &pairs {
            let Value::Symbol(sym) = name else {
                return Err(EvalError::invalid_form("binding", "binding names must be symbols"));
            };
            let var = self
                .globals
                .resolve_var(sym)
                .filter(|v| v.is_bound())
                .ok_or_else(|| EvalError::SymbolNotFound {
                    name: sym.to_string(),
                })?;
            if !var.is_dynamic() {
                return Err(EvalError::runtime(format!(
                    "Can't dynamically bind non-dynamic var {}",
                    var.qualified_name()
                )));
            }
            frame.push((var.id(), self.eval_nested(init, env)?));
        }
        let _guard = dynamic::push(&frame);
        self.eval_body_nested(&args[1..], env)
    }

    /// `(set! var value)`
    pub(crate) fn eval_set(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [Value::Symbol(sym), form] = args else {
            return Err(EvalError::invalid_form("set!", "expects a var name and a value"));
        };
        if self.is_local(sym, env) {
            return Err(EvalError::invalid_form(
                "set!",
                format!("can't assign to local binding {}", sym),
            ));
        }
        let var = self
            .globals
            .resolve_var(sym)
            .filter(|v| v.is_bound())
            .ok_or_else(|| EvalError::SymbolNotFound {
                name: sym.to_string(),
            })?;
        let value = self.eval_nested(form, env)?;
        var.assign(value.clone());
        Ok(value)
    }
}
