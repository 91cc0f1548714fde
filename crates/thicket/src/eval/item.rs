//! Global definitions: `def` and its variants, namespaces and multimethods

use std::sync::Arc;

use log::debug;

use super::function;
use crate::environment::Env;
use crate::registry::MultiFn;
use crate::value::{Function, Symbol, Value};
use crate::{EvalError, Interpreter};

/// Extract `name`, an optional docstring and the init form.
fn parse_def<'a>(form_name: &str, args: &'a [Value]) -> Result<(&'a Symbol, Option<&'a Value>), EvalError> {
    match args {
        [Value::Symbol(name)] => Ok((name, None)),
        [Value::Symbol(name), init] => Ok((name, Some(init))),
        [Value::Symbol(name), Value::String(_), init] => Ok((name, Some(init))),
        _ => Err(EvalError::invalid_form(
            form_name,
            "expects a name, an optional docstring and a value",
        )),
    }
}

fn check_unqualified(form_name: &str, name: &Symbol) -> Result<(), EvalError> {
    if name.is_qualified() {
        return Err(EvalError::invalid_form(
            form_name,
            format!("can't define qualified name {}", name),
        ));
    }
    Ok(())
}

impl Interpreter {
    /// `(def name doc? init?)`
    ///
    /// `^:dynamic` on the name makes the var dynamic. Without an init the
    /// var is interned but left unbound.
    pub(crate) fn eval_def(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (name, init) = parse_def("def", args)?;
        check_unqualified("def", name)?;
        let ns = self.globals.current_ns();
        let dynamic = name
            .meta()
            .as_ref()
            .and_then(|m| m.get(&Value::keyword("dynamic")))
            .is_some_and(Value::is_truthy);
        match init {
            Some(form) => {
                let value = self.eval_nested(form, env)?;
                if dynamic {
                    self.globals.define_dynamic(&ns, name.name(), value);
                } else {
                    self.globals.define(&ns, name.name(), value);
                }
            }
            None => {
                let var = self.globals.intern(&ns, name.name());
                if dynamic {
                    var.mark_dynamic();
                }
            }
        }
        Ok(Value::Symbol(Symbol::qualified(&ns, name.name())))
    }

    /// `(defonce name init)`: fails if the var already has a value.
    pub(crate) fn eval_defonce(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (name, Some(init)) = parse_def("defonce", args)? else {
            return Err(EvalError::invalid_form("defonce", "expects a value"));
        };
        check_unqualified("defonce", name)?;
        let ns = self.globals.current_ns();
        if let Some(var) = self.globals.find_var(&ns, name.name()).filter(|v| v.is_bound()) {
            return Err(EvalError::AlreadyDefined {
                name: var.qualified_name(),
            });
        }
        let value = self.eval_nested(init, env)?;
        self.globals.define_once(&ns, name.name(), value)?;
        Ok(Value::Symbol(Symbol::qualified(&ns, name.name())))
    }

    /// `(def-dynamic name init)`
    pub(crate) fn eval_def_dynamic(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (name, Some(init)) = parse_def("def-dynamic", args)? else {
            return Err(EvalError::invalid_form("def-dynamic", "expects a value"));
        };
        check_unqualified("def-dynamic", name)?;
        let ns = self.globals.current_ns();
        let value = self.eval_nested(init, env)?;
        self.globals.define_dynamic(&ns, name.name(), value);
        Ok(Value::Symbol(Symbol::qualified(&ns, name.name())))
    }

    /// `(ns name)`: switch the current namespace.
    pub(crate) fn eval_ns(&self, args: &[Value]) -> Result<Value, EvalError> {
        match args {
            [Value::Symbol(name)] if !name.is_qualified() => {
                debug!("switching to namespace {}", name.name());
                self.globals.set_current_ns(name.name());
                Ok(Value::Nil)
            }
            _ => Err(EvalError::invalid_form("ns", "expects a namespace symbol")),
        }
    }

    /// `(defmulti name dispatch-fn)`
    ///
    /// Redefinition replaces the multimethod, discarding its methods.
    pub(crate) fn eval_defmulti(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [Value::Symbol(name), dispatch] = args else {
            return Err(EvalError::invalid_form(
                "defmulti",
                "expects a name and a dispatch function",
            ));
        };
        check_unqualified("defmulti", name)?;
        let dispatch = self.eval_nested(dispatch, env)?;
        if !dispatch.is_callable() {
            return Err(EvalError::type_error("function", &dispatch));
        }
        let multi = Arc::new(MultiFn::new(name.name(), dispatch));
        let ns = self.globals.current_ns();
        self.globals
            .define(&ns, name.name(), Value::Function(Function::Multi(multi)));
        Ok(Value::Symbol(Symbol::qualified(&ns, name.name())))
    }

    /// `(defmethod name dispatch-value [params] body*)`
    pub(crate) fn eval_defmethod(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [Value::Symbol(name), dispatch_value, tail @ ..] = args else {
            return Err(EvalError::invalid_form(
                "defmethod",
                "expects a multimethod name, a dispatch value and a body",
            ));
        };
        let multi = match self.resolve_symbol(name, env)? {
            Value::Function(Function::Multi(multi)) => multi,
            other => return Err(EvalError::type_error("multimethod", &other)),
        };
        let dispatch_value = self.eval_nested(dispatch_value, env)?;
        let arities = function::parse_arities("defmethod", tail)?;
        let method = self.make_closure(Some(name), arities, env, None, false);
        multi.add_method(dispatch_value, Value::Function(Function::Closure(method)));
        Ok(Value::Function(Function::Multi(multi)))
    }
}
