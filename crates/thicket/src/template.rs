//! Syntax-quote templates
//!
//! `(syntax-quote form)` desugars into ordinary code that rebuilds `form`:
//!
//! ```text
//! `(a ~b ~@c)  =>  (core/apply core/list
//!                    (core/concat (core/list (quote a)) (core/list b) c))
//! ```
//!
//! Symbols ending in `#` become generated symbols `name__N__auto`. One
//! mapping is kept per syntax-quote, so every `x#` inside the same template
//! names the same symbol while nested templates mint their own.

use std::collections::HashMap;

use crate::environment::{Globals, CORE_NS};
use crate::value::{Symbol, Value};
use crate::EvalError;

/// Desugars one syntax-quoted form.
pub struct SyntaxQuote<'a> {
    globals: &'a Globals,
    gensyms: HashMap<String, Symbol>,
}

fn core(name: &str) -> Value {
    Value::Symbol(Symbol::qualified(CORE_NS, name))
}

fn call(name: &str, args: impl IntoIterator<Item = Value>) -> Value {
    let mut items = vec![core(name)];
    items.extend(args);
    Value::list(items)
}

fn quote(form: Value) -> Value {
    Value::list(vec![Value::symbol("quote"), form])
}

/// If `form` is `(op x)`, return `x`.
fn unary_form<'v>(form: &'v Value, op: &str) -> Option<&'v Value> {
    match form.as_list() {
        Some([head, arg]) if head.is_symbol_named(op) => Some(arg),
        _ => None,
    }
}

impl<'a> SyntaxQuote<'a> {
    /// A template expander with a fresh gensym table.
    pub fn new(globals: &'a Globals) -> Self {
        Self {
            globals,
            gensyms: HashMap::new(),
        }
    }

    /// Desugar `form` into code that constructs it.
    pub fn expand(&mut self, form: &Value) -> Result<Value, EvalError> {
        if let Some(inner) = unary_form(form, "unquote") {
            return Ok(inner.clone());
        }
        if unary_form(form, "unquote-splicing").is_some() {
            return Err(EvalError::invalid_form(
                "unquote-splicing",
                "must appear inside a list, vector, map or set",
            ));
        }
        if let Some(inner) = unary_form(form, "syntax-quote") {
            // Inner template first; its code is then quoted at this level
            let desugared = SyntaxQuote::new(self.globals).expand(inner)?;
            return self.expand(&desugared);
        }

        match form {
            Value::Symbol(sym) => Ok(quote(Value::Symbol(self.symbol(sym)))),
            Value::List(items, _) if items.is_empty() => Ok(call("list", [])),
            Value::List(items, _) => Ok(call(
                "apply",
                [core("list"), self.concat(items.iter())?],
            )),
            Value::Vector(items, _) => Ok(call(
                "apply",
                [core("vector"), self.concat(items.iter())?],
            )),
            Value::Map(entries, _) => {
                let flat: Vec<Value> = entries
                    .iter()
                    .flat_map(|(k, v)| [k.clone(), v.clone()])
                    .collect();
                Ok(call("apply", [core("hash-map"), self.concat(flat.iter())?]))
            }
            Value::Set(items, _) => Ok(call(
                "apply",
                [core("hash-set"), self.concat(items.iter())?],
            )),
            other => Ok(other.clone()),
        }
    }

    fn concat<'v>(&mut self, items: impl Iterator<Item = &'v Value>) -> Result<Value, EvalError> {
        let mut parts = Vec::new();
        for item in items {
            match unary_form(item, "unquote-splicing") {
                Some(spliced) => parts.push(spliced.clone()),
                None => parts.push(call("list", [self.expand(item)?])),
            }
        }
        Ok(call("concat", parts))
    }

    fn symbol(&mut self, sym: &Symbol) -> Symbol {
        match sym.name().strip_suffix('#') {
            Some(base) if !sym.is_qualified() && !base.is_empty() => {
                let globals = self.globals;
                self.gensyms
                    .entry(base.to_string())
                    .or_insert_with(|| {
                        Symbol::new(format!("{}__{}__auto", base, globals.next_gensym_id()))
                    })
                    .clone()
            }
            _ => sym.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_one;

    fn desugar(src: &str) -> String {
        let globals = Globals::new();
        let form = read_one(src, "<test>").unwrap();
        SyntaxQuote::new(&globals).expand(&form).unwrap().to_string()
    }

    #[test]
    fn test_scalars_are_self_quoting() {
        assert_eq!(desugar(":k"), ":k");
        assert_eq!(desugar("42"), "42");
    }

    #[test]
    fn test_unquote_and_splice() {
        assert_eq!(
            desugar("(a ~b ~@c)"),
            "(core/apply core/list (core/concat (core/list (quote a)) (core/list b) c))"
        );
    }

    #[test]
    fn test_gensym_is_stable_within_template() {
        let out = desugar("(let [x# 1] x#)");
        assert_eq!(out.matches("x__1__auto").count(), 2);
    }

    #[test]
    fn test_top_level_splice_rejected() {
        let globals = Globals::new();
        let form = read_one("~@xs", "<test>").unwrap();
        assert!(SyntaxQuote::new(&globals).expand(&form).is_err());
    }
}
