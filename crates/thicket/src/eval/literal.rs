//! Self-evaluating forms and collection literals

use std::sync::Arc;

use crate::environment::Env;
use crate::value::{Value, ValueMap, ValueSet};
use crate::{EvalError, Interpreter};

/// `(quote x)` yields `x` unevaluated.
pub fn eval_quote(args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [form] => Ok(form.clone()),
        _ => Err(EvalError::invalid_form("quote", "expects exactly one form")),
    }
}

impl Interpreter {
    /// Evaluate a vector, map or set literal element-wise.
    ///
    /// Metadata on the literal is carried to the result minus reader
    /// positions.
    pub(crate) fn eval_collection(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        match form {
            Value::Vector(items, meta) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(self.eval_nested(item, env)?);
                }
                Ok(Value::Vector(Arc::new(out), user_meta(meta)))
            }
            Value::Map(entries, meta) => {
                let mut out = ValueMap::with_capacity(entries.len());
                for (k, v) in entries.iter() {
                    let key = self.eval_nested(k, env)?;
                    let value = self.eval_nested(v, env)?;
                    out.insert(key, value);
                }
                Ok(Value::Map(Arc::new(out), user_meta(meta)))
            }
            Value::Set(items, meta) => {
                let mut out = ValueSet::with_capacity(items.len());
                for item in items.iter() {
                    out.insert(self.eval_nested(item, env)?);
                }
                Ok(Value::Set(Arc::new(out), user_meta(meta)))
            }
            other => Ok(other.clone()),
        }
    }
}

/// Drop the reader's position keys from a metadata map.
pub(crate) fn user_meta(meta: &crate::value::Meta) -> crate::value::Meta {
    let map = meta.as_ref()?;
    let kept: ValueMap = map
        .iter()
        .filter(|(k, _)| {
            !matches!(k, Value::Keyword(kw) if kw.namespace().is_none()
                && matches!(kw.name(), "file" | "line" | "column"))
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    (!kept.is_empty()).then(|| Arc::new(kept))
}
