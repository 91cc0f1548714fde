//! Function forms: `fn`, `defn`, `defmacro`, and parameter binding

use std::sync::Arc;

use crate::environment::Env;
use crate::value::{Closure, FnArity, Function, Meta, Symbol, Value, ValueMap};
use crate::{EvalError, Interpreter};

/// A body as a single form: the form itself, `(do ...)`, or nil.
pub fn body_form(body: &[Value]) -> Value {
    match body {
        [] => Value::Nil,
        [single] => single.clone(),
        many => {
            let mut items = Vec::with_capacity(many.len() + 1);
            items.push(Value::symbol("do"));
            items.extend_from_slice(many);
            Value::list(items)
        }
    }
}

/// Parse one `[params] body*` clause.
fn parse_arity(form_name: &str, params: &Value, body: &[Value]) -> Result<FnArity, EvalError> {
    let Some(params) = params.as_vector() else {
        return Err(EvalError::invalid_form(form_name, "parameter list must be a vector"));
    };
    let (fixed, rest) = match params.iter().position(|p| p.is_symbol_named("&")) {
        None => (params.to_vec(), None),
        Some(i) => match &params[i + 1..] {
            [rest] => (params[..i].to_vec(), Some(rest.clone())),
            _ => {
                return Err(EvalError::invalid_form(
                    form_name,
                    "'&' must be followed by exactly one parameter",
                ))
            }
        },
    };

    // {:pre [...]} only counts as a condition map when more body follows
    let (pre, body) = match body {
        [Value::Map(conditions, _), rest @ ..] if !rest.is_empty() => {
            let pre = match conditions.get(&Value::keyword("pre")) {
                Some(Value::Vector(forms, _)) => forms.to_vec(),
                Some(_) => {
                    return Err(EvalError::invalid_form(form_name, ":pre must be a vector"))
                }
                None => Vec::new(),
            };
            (pre, rest.to_vec())
        }
        _ => (Vec::new(), body.to_vec()),
    };

    Ok(FnArity {
        params: fixed,
        rest,
        pre,
        body,
    })
}

/// Parse either a single `[params] body*` tail or a sequence of
/// `([params] body*)` clauses.
pub fn parse_arities(form_name: &str, forms: &[Value]) -> Result<Vec<FnArity>, EvalError> {
    match forms.first() {
        None => Err(EvalError::invalid_form(form_name, "missing parameter list")),
        Some(Value::Vector(..)) => Ok(vec![parse_arity(form_name, &forms[0], &forms[1..])?]),
        Some(_) => {
            let mut arities = Vec::with_capacity(forms.len());
            for clause in forms {
                match clause.as_list() {
                    Some([params, body @ ..]) => arities.push(parse_arity(form_name, params, body)?),
                    _ => {
                        return Err(EvalError::invalid_form(
                            form_name,
                            "expected ([params] body*) clauses",
                        ))
                    }
                }
            }
            let mut seen = Vec::new();
            for arity in arities.iter().filter(|a| !a.is_variadic()) {
                if seen.contains(&arity.fixed()) {
                    return Err(EvalError::invalid_form(
                        form_name,
                        format!("duplicate arity {}", arity.fixed()),
                    ));
                }
                seen.push(arity.fixed());
            }
            if arities.iter().filter(|a| a.is_variadic()).count() > 1 {
                return Err(EvalError::invalid_form(
                    form_name,
                    "at most one variadic arity is allowed",
                ));
            }
            Ok(arities)
        }
    }
}

impl Interpreter {
    /// Build a closure capturing `env`.
    ///
    /// A named closure sees itself under its name, so anonymous recursion
    /// through `(fn fact [n] ...)` works without a global.
    pub(crate) fn make_closure(
        &self,
        name: Option<&Symbol>,
        arities: Vec<FnArity>,
        env: &Env,
        meta: Meta,
        self_binding: bool,
    ) -> Arc<Closure> {
        let captured = if self_binding && name.is_some() {
            env.child()
        } else {
            env.clone()
        };
        let closure = Arc::new(Closure {
            name: name.map(|s| Arc::from(s.name())),
            arities,
            env: captured.clone(),
            ns: Arc::from(self.globals.current_ns().as_str()),
            meta,
        });
        if let (true, Some(name)) = (self_binding, name) {
            captured.define(name.name(), Value::Function(Function::Closure(Arc::clone(&closure))));
        }
        closure
    }

    /// `(fn name? [params] body*)` or `(fn name? ([params] body*)+)`
    pub(crate) fn eval_fn(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (name, tail) = match args.split_first() {
            Some((Value::Symbol(name), tail)) => (Some(name), tail),
            _ => (None, args),
        };
        let arities = parse_arities("fn", tail)?;
        let closure = self.make_closure(name, arities, env, None, true);
        Ok(Value::Function(Function::Closure(closure)))
    }

    /// `(defn name doc? attrs? ...)` and `(defmacro name doc? attrs? ...)`
    pub(crate) fn eval_defn(&self, args: &[Value], env: &Env, is_macro: bool) -> Result<Value, EvalError> {
        let form_name = if is_macro { "defmacro" } else { "defn" };
        let Some((Value::Symbol(name), mut tail)) = args.split_first() else {
            return Err(EvalError::invalid_form(form_name, "expects a name symbol"));
        };

        let mut meta = ValueMap::new();
        if let [Value::String(doc), rest @ ..] = tail {
            if !rest.is_empty() {
                meta.insert(Value::keyword("doc"), Value::String(doc.clone()));
                tail = rest;
            }
        }
        if let [Value::Map(attrs, _), rest @ ..] = tail {
            if !rest.is_empty() {
                meta.extend(attrs.iter().map(|(k, v)| (k.clone(), v.clone())));
                tail = rest;
            }
        }
        if let Some(private) = name.meta().as_ref().and_then(|m| m.get(&Value::keyword("private"))) {
            meta.insert(Value::keyword("private"), private.clone());
        }

        let arities = parse_arities(form_name, tail)?;
        let meta = (!meta.is_empty()).then(|| Arc::new(meta));
        let closure = self.make_closure(Some(name), arities, env, meta, false);
        let value = if is_macro {
            Value::Macro(closure)
        } else {
            Value::Function(Function::Closure(closure))
        };
        let ns = self.globals.current_ns();
        self.globals.define(&ns, name.name(), value);
        Ok(Value::Symbol(Symbol::qualified(&ns, name.name())))
    }

    /// Bind `args` to arity clause `index` of `closure` in a fresh child of
    /// its captured environment, then check preconditions.
    ///
    /// Normal calls collect surplus arguments into a list (nil when empty);
    /// `recur` passes the rest value as one final argument.
    pub(crate) fn bind_arity(
        &self,
        closure: &Arc<Closure>,
        index: usize,
        mut args: Vec<Value>,
        from_recur: bool,
    ) -> Result<Env, EvalError> {
        let arity = &closure.arities[index];
        let env = closure.env.child();
        let surplus = if arity.is_variadic() {
            args.split_off(arity.fixed().min(args.len()))
        } else {
            Vec::new()
        };

        for (pattern, value) in arity.params.iter().zip(args) {
            self.bind_pattern(&env, pattern, value, &closure.ns)?;
        }
        if let Some(rest) = &arity.rest {
            let rest_value = if from_recur {
                surplus.into_iter().next().unwrap_or(Value::Nil)
            } else if surplus.is_empty() {
                Value::Nil
            } else {
                Value::list(surplus)
            };
            self.bind_pattern(&env, rest, rest_value, &closure.ns)?;
        }

        for condition in &arity.pre {
            if !self.eval_nested(condition, &env)?.is_truthy() {
                return Err(EvalError::assertion(format!(
                    "Precondition failed in {}: {}",
                    closure.display_name(),
                    condition
                )));
            }
        }
        Ok(env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_str;

    fn forms(src: &str) -> Vec<Value> {
        read_str(src, "<test>").unwrap()
    }

    #[test]
    fn test_parse_single_arity_with_rest() {
        let arities = parse_arities("fn", &forms("[a b & more] (list a b more)")).unwrap();
        assert_eq!(arities.len(), 1);
        assert_eq!(arities[0].fixed(), 2);
        assert!(arities[0].is_variadic());
    }

    #[test]
    fn test_pre_map_needs_following_body() {
        let with_body = parse_arities("fn", &forms("[x] {:pre [(pos? x)]} x")).unwrap();
        assert_eq!(with_body[0].pre.len(), 1);
        let map_only = parse_arities("fn", &forms("[x] {:pre [(pos? x)]}")).unwrap();
        assert!(map_only[0].pre.is_empty());
        assert_eq!(map_only[0].body.len(), 1);
    }

    #[test]
    fn test_duplicate_arity_rejected() {
        assert!(parse_arities("fn", &forms("([x] 1) ([y] 2)")).is_err());
    }

    #[test]
    fn test_dangling_ampersand_rejected() {
        assert!(parse_arities("fn", &forms("[x &] x")).is_err());
    }

    #[test]
    fn test_body_form() {
        assert_eq!(body_form(&[]), Value::Nil);
        assert_eq!(body_form(&[Value::Integer(1)]), Value::Integer(1));
        assert_eq!(
            body_form(&[Value::Integer(1), Value::Integer(2)]).to_string(),
            "(do 1 2)"
        );
    }
}
