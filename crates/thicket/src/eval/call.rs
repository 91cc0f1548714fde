//! Function application
//!
//! Closures are entered as a new trampoline frame so calls in tail
//! position do not grow the native stack. Natives run directly, after the
//! sandbox interceptor has seen sensitive calls. Multimethods and protocol
//! methods resolve to an implementation first and then apply it.

use std::sync::Arc;

use log::trace;

use super::Step;
use crate::registry::ProtocolMethod;
use crate::value::{Function, NativeFn, Value};
use crate::{EvalError, Interpreter};

/// Look up `key` in an associative or indexed value.
///
/// Maps use the key, custom instances their fields, vectors and strings
/// an integer index, and sets membership. Anything else yields `None`.
pub fn lookup_key(coll: &Value, key: &Value) -> Option<Value> {
    match coll {
        Value::Map(map, _) => map.get(key).cloned(),
        Value::Custom(instance) => instance.fields.get(key).cloned(),
        Value::Set(set, _) => set.get(key).cloned(),
        Value::Vector(items, _) => key
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| items.get(i).cloned()),
        Value::String(s) => key
            .as_i64()
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| s.chars().nth(i))
            .map(|c| Value::string(c.to_string())),
        _ => None,
    }
}

impl Interpreter {
    /// Apply `func` to already evaluated `args`.
    ///
    /// This is the entry point natives and host code use to call back into
    /// the language.
    pub fn apply(&self, func: &Value, args: &[Value]) -> Result<Value, EvalError> {
        match self.step_apply(func, args.to_vec())? {
            Step::Done(value) => Ok(value),
            Step::Continue(frame) => self.eval_frame(frame),
        }
    }

    /// Apply `callee`, handing closures back to the trampoline.
    pub(crate) fn step_apply(&self, callee: &Value, args: Vec<Value>) -> Result<Step, EvalError> {
        match callee {
            Value::Function(Function::Closure(closure)) => {
                if self.ctx.trace {
                    trace!("call {} with {} args", closure.display_name(), args.len());
                }
                Ok(Step::Continue(self.enter_closure(closure, args)?))
            }
            Value::Function(Function::Native(native)) => {
                self.call_native(native, &args).map(Step::Done)
            }
            Value::Function(Function::Multi(multi)) => {
                let dispatch_value = self.apply(&multi.dispatch, &args)?;
                let method = multi.resolve(&dispatch_value)?;
                self.step_apply(&method, args)
            }
            Value::Function(Function::Protocol(method)) => {
                let implementation = self.resolve_protocol_call(method, &args)?;
                self.step_apply(&implementation, args)
            }
            Value::Keyword(_) | Value::Map(..) | Value::Set(..) => {
                self.apply_as_lookup(callee, &args).map(Step::Done)
            }
            Value::Macro(closure) => Err(EvalError::runtime(format!(
                "Can't take value of macro {}",
                closure.display_name()
            ))),
            other => Err(EvalError::TypeError {
                expected: "function".to_string(),
                got: format!("{} ({})", other.type_tag(), other.pr_str()),
            }),
        }
    }

    fn call_native(&self, native: &Arc<NativeFn>, args: &[Value]) -> Result<Value, EvalError> {
        native.check_arity(args.len())?;
        if native.sensitive {
            if let Some(interceptor) = self.globals.interceptor() {
                interceptor.check(&native.name, args)?;
            }
        }
        (native.func)(self, args)
    }

    fn resolve_protocol_call(&self, method: &ProtocolMethod, args: &[Value]) -> Result<Value, EvalError> {
        let sig = method.protocol.methods.get(method.method.as_ref());
        let accepted = sig.map(|s| s.arities.as_slice()).unwrap_or_default();
        if args.is_empty() || !accepted.contains(&args.len()) {
            return Err(EvalError::Arity {
                name: method.method.to_string(),
                accepted: accepted
                    .iter()
                    .map(usize::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
                got: args.len(),
            });
        }
        method
            .protocol
            .resolve(self.globals.registry(), &method.method, &args[0].type_tag())
    }

    /// Keywords, maps and sets called as functions.
    fn apply_as_lookup(&self, callee: &Value, args: &[Value]) -> Result<Value, EvalError> {
        let (coll, key, default) = match (callee, args) {
            (Value::Keyword(_), [coll]) => (coll, callee, None),
            (Value::Keyword(_), [coll, default]) => (coll, callee, Some(default)),
            (_, [key]) => (callee, key, None),
            (_, [key, default]) if !matches!(callee, Value::Set(..)) => (callee, key, Some(default)),
            _ => {
                return Err(EvalError::Arity {
                    name: callee.pr_str(),
                    accepted: "1, 2".to_string(),
                    got: args.len(),
                })
            }
        };
        Ok(lookup_key(coll, key)
            .or_else(|| default.cloned())
            .unwrap_or(Value::Nil))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_key_variants() {
        let map = Value::map_from([(Value::keyword("a"), Value::Integer(1))]);
        assert_eq!(lookup_key(&map, &Value::keyword("a")), Some(Value::Integer(1)));
        let vector = Value::vector(vec![Value::Integer(5), Value::Integer(6)]);
        assert_eq!(lookup_key(&vector, &Value::Integer(1)), Some(Value::Integer(6)));
        assert_eq!(lookup_key(&vector, &Value::Integer(-1)), None);
        assert_eq!(lookup_key(&Value::Integer(3), &Value::Integer(0)), None);
    }

    #[test]
    fn test_keyword_and_map_as_functions() {
        let interp = Interpreter::new();
        assert_eq!(interp.eval_str("(:a {:a 1})").unwrap(), Value::Integer(1));
        assert_eq!(interp.eval_str("(:b {:a 1} 9)").unwrap(), Value::Integer(9));
        assert_eq!(interp.eval_str("({:a 1} :a)").unwrap(), Value::Integer(1));
        assert_eq!(interp.eval_str("(#{1 2} 2)").unwrap(), Value::Integer(2));
        assert_eq!(interp.eval_str("(#{1 2} 3)").unwrap(), Value::Nil);
    }

    #[test]
    fn test_non_function_call() {
        let interp = Interpreter::new();
        assert!(matches!(
            interp.eval_str("(1 2)"),
            Err(EvalError::TypeError { .. })
        ));
    }

    #[test]
    fn test_apply_from_host() {
        let interp = Interpreter::new();
        let inc = interp.eval_str("(fn [x] (+ x 1))").unwrap();
        assert_eq!(interp.apply(&inc, &[Value::Integer(41)]).unwrap(), Value::Integer(42));
    }
}
