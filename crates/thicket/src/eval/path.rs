//! Symbol resolution
//!
//! Unqualified symbols resolve lexically first, then through the current
//! namespace and `core`. Qualified symbols go straight to the global table.

use crate::environment::Env;
use crate::value::{Symbol, Value};
use crate::{EvalError, Interpreter};

impl Interpreter {
    /// Value of `sym` in `env`.
    pub(crate) fn resolve_symbol(&self, sym: &Symbol, env: &Env) -> Result<Value, EvalError> {
        if !sym.is_qualified() {
            if let Some(value) = env.get(sym.name()) {
                return Ok(value);
            }
        }
        self.globals.lookup(sym)
    }

    /// Whether `sym` names a lexical binding in `env`.
    pub(crate) fn is_local(&self, sym: &Symbol, env: &Env) -> bool {
        !sym.is_qualified() && env.contains(sym.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_shadows_global() {
        let interp = Interpreter::new();
        interp.eval_str("(def x 1)").unwrap();
        let env = Env::new();
        env.define("x", Value::Integer(2));
        assert_eq!(
            interp.resolve_symbol(&Symbol::new("x"), &env).unwrap(),
            Value::Integer(2)
        );
        assert_eq!(
            interp
                .resolve_symbol(&Symbol::qualified("user", "x"), &env)
                .unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn test_unbound_symbol() {
        let interp = Interpreter::new();
        assert!(matches!(
            interp.resolve_symbol(&Symbol::new("nope"), &Env::new()),
            Err(EvalError::SymbolNotFound { .. })
        ));
    }
}
