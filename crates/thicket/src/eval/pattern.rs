//! Destructuring binding patterns
//!
//! Patterns are symbols, vectors (sequential destructuring with `& rest`
//! and `:as`) or maps (associative destructuring with `:keys`, `:syms`,
//! `:strs`, `:or` and `:as`). Symbols may carry a type hint in their
//! metadata, e.g. `^:long n` or `^{:tag :string?} s`, checked on binding.

use crate::environment::Env;
use crate::registry::TypeHint;
use crate::value::{Symbol, Value, ValueMap};
use crate::{EvalError, Interpreter};

impl Interpreter {
    /// Bind `pattern` to `value` in `env`.
    ///
    /// `ns` is the namespace used to resolve unqualified custom type hints.
    pub(crate) fn bind_pattern(&self, env: &Env, pattern: &Value, value: Value, ns: &str) -> Result<(), EvalError> {
        match pattern {
            Value::Symbol(sym) => self.bind_symbol(env, sym, value, ns),
            Value::Vector(items, _) => self.bind_sequential(env, items, value, ns),
            Value::Map(entries, _) => self.bind_associative(env, entries, value, ns),
            other => Err(EvalError::invalid_form(
                "binding",
                format!("unsupported binding pattern {}", other.pr_str()),
            )),
        }
    }

    /// Type hint carried by a binding symbol, if any.
    pub(crate) fn hint_of(&self, sym: &Symbol, ns: &str) -> Option<TypeHint> {
        let registry = self.globals.registry();
        sym.meta().as_ref()?.iter().find_map(|(key, value)| match (key, value) {
            (Value::Keyword(k), Value::Bool(true)) => registry.resolve_hint(k, ns),
            (Value::Keyword(k), Value::Keyword(tag)) if k.name() == "tag" => {
                registry.resolve_hint(tag, ns)
            }
            _ => None,
        })
    }

    fn bind_symbol(&self, env: &Env, sym: &Symbol, value: Value, ns: &str) -> Result<(), EvalError> {
        if sym.is_qualified() {
            return Err(EvalError::invalid_form(
                "binding",
                format!("can't bind qualified name {}", sym),
            ));
        }
        if let Some(hint) = self.hint_of(sym, ns) {
            if !self.globals.registry().accepts(&hint, &value) {
                return Err(EvalError::assertion(format!(
                    "'{}' must be of type {}, got {}",
                    sym.name(),
                    hint,
                    value.type_tag()
                )));
            }
        }
        env.define(sym.name(), value);
        Ok(())
    }

    fn bind_sequential(&self, env: &Env, items: &[Value], value: Value, ns: &str) -> Result<(), EvalError> {
        let seq = value.to_seq()?;
        let mut pos = 0;
        let mut i = 0;
        while i < items.len() {
            let item = &items[i];
            if item.is_symbol_named("&") {
                let rest_pattern = items.get(i + 1).ok_or_else(|| {
                    EvalError::invalid_form("binding", "'&' must be followed by a pattern")
                })?;
                let rest = seq.get(pos..).map(<[Value]>::to_vec).unwrap_or_default();
                let rest_value = if rest.is_empty() {
                    Value::Nil
                } else {
                    Value::same_seq(&value, rest)
                };
                self.bind_pattern(env, rest_pattern, rest_value, ns)?;
                pos = seq.len();
                i += 2;
            } else if matches!(item, Value::Keyword(k) if k.name() == "as" && k.namespace().is_none()) {
                let name = items.get(i + 1).ok_or_else(|| {
                    EvalError::invalid_form("binding", ":as must be followed by a symbol")
                })?;
                self.bind_pattern(env, name, value.clone(), ns)?;
                i += 2;
            } else {
                let element = seq.get(pos).cloned().unwrap_or(Value::Nil);
                self.bind_pattern(env, item, element, ns)?;
                pos += 1;
                i += 1;
            }
        }
        Ok(())
    }

    fn bind_associative(&self, env: &Env, entries: &ValueMap, value: Value, ns: &str) -> Result<(), EvalError> {
        let lookup = |key: &Value| -> Result<Option<Value>, EvalError> {
            match &value {
                Value::Nil => Ok(None),
                Value::Map(map, _) => Ok(map.get(key).cloned()),
                Value::Custom(instance) => Ok(instance.fields.get(key).cloned()),
                other => Err(EvalError::type_error("map", other)),
            }
        };
        let defaults = entries
            .get(&Value::keyword("or"))
            .and_then(Value::as_map)
            .cloned()
            .unwrap_or_default();

        let bind_named = |sym: &Symbol, key: Value| -> Result<(), EvalError> {
            let found = match lookup(&key)? {
                Some(found) => found,
                None => match defaults.get(&Value::Symbol(Symbol::new(sym.name()))) {
                    Some(default) => self.eval_nested(default, env)?,
                    None => Value::Nil,
                },
            };
            self.bind_symbol(env, sym, found, ns)
        };

        for (key, target) in entries {
            let directive = match key {
                Value::Keyword(k) if k.namespace().is_none() => Some(k.name()),
                _ => None,
            };
            match directive {
                Some("or") => {}
                Some("as") => self.bind_pattern(env, target, value.clone(), ns)?,
                Some(kind @ ("keys" | "syms" | "strs")) => {
                    let names = target.as_vector().ok_or_else(|| {
                        EvalError::invalid_form("binding", format!(":{} expects a vector", kind))
                    })?;
                    for name in names {
                        let Value::Symbol(sym) = name else {
                            return Err(EvalError::invalid_form(
                                "binding",
                                format!(":{} entries must be symbols", kind),
                            ));
                        };
                        let local = Symbol::new(sym.name()).with_meta(sym.meta().clone());
                        let lookup_key = match kind {
                            "keys" => match sym.namespace() {
                                Some(kns) => Value::Keyword(crate::value::Keyword::qualified(kns, sym.name())),
                                None => Value::keyword(sym.name()),
                            },
                            "syms" => Value::Symbol(Symbol::parse(&sym.to_string())),
                            _ => Value::string(sym.name()),
                        };
                        bind_named(&local, lookup_key)?;
                    }
                }
                _ => match key {
                    Value::Symbol(sym) => bind_named(sym, target.clone())?,
                    nested => {
                        let found = lookup(target)?.unwrap_or(Value::Nil);
                        self.bind_pattern(env, nested, found, ns)?;
                    }
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_one;

    fn bind(src_pattern: &str, value: &str) -> Result<Env, EvalError> {
        let interp = Interpreter::new();
        let env = Env::new();
        let pattern = read_one(src_pattern, "<test>").unwrap();
        let value = interp.eval_str(value).unwrap();
        interp.bind_pattern(&env, &pattern, value, "user")?;
        Ok(env)
    }

    #[test]
    fn test_sequential_with_rest_and_as() {
        let env = bind("[a b & r :as all]", "[1 2 3 4]").unwrap();
        assert_eq!(env.get("a"), Some(Value::Integer(1)));
        assert_eq!(env.get("r").unwrap().to_string(), "[3 4]");
        assert_eq!(env.get("all").unwrap().to_string(), "[1 2 3 4]");
    }

    #[test]
    fn test_empty_rest_is_nil() {
        let env = bind("[a & r]", "'(1)").unwrap();
        assert_eq!(env.get("r"), Some(Value::Nil));
    }

    #[test]
    fn test_missing_positions_bind_nil() {
        let env = bind("[a b c]", "[1]").unwrap();
        assert_eq!(env.get("c"), Some(Value::Nil));
    }

    #[test]
    fn test_keys_with_defaults() {
        let env = bind("{:keys [a b] :or {b 10}}", "{:a 1}").unwrap();
        assert_eq!(env.get("a"), Some(Value::Integer(1)));
        assert_eq!(env.get("b"), Some(Value::Integer(10)));
    }

    #[test]
    fn test_strs_and_explicit_keys() {
        let env = bind("{:strs [name] n :count}", "{\"name\" \"x\" :count 3}").unwrap();
        assert_eq!(env.get("name"), Some(Value::string("x")));
        assert_eq!(env.get("n"), Some(Value::Integer(3)));
    }

    #[test]
    fn test_hint_mismatch_is_assertion() {
        let err = bind("^:long n", "\"x\"").unwrap_err();
        assert!(matches!(err, EvalError::Assertion { .. }));
        assert!(bind("^:number? n", "nil").is_ok());
    }
}
