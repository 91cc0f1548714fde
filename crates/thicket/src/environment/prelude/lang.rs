//! Strings, types, metadata, reference cells and reflection

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::{define, define_sensitive, expect_fn, expect_int, expect_keyword};
use crate::environment::Env;
use crate::eval::literal::user_meta;
use crate::reader;
use crate::runtime::{AtomCell, FutureCell};
use crate::value::{Keyword, Symbol, Value};
use crate::{EvalError, Interpreter};

pub(super) fn install(interp: &Interpreter) {
    install_strings(interp);
    install_types(interp);
    install_refs(interp);
    install_reflection(interp);
}

// ═══════════════════════════════════════════════════════════════════════
// Strings and Names
// ═══════════════════════════════════════════════════════════════════════

fn install_strings(interp: &Interpreter) {
    define(interp, "str", 0, None, |interp, args| {
        let mut out = String::new();
        for arg in args.iter().filter(|a| !a.is_nil()) {
            out.push_str(&interp.print_str(arg));
        }
        Ok(Value::string(out))
    });
    define(interp, "pr-str", 0, None, |interp, args| {
        Ok(Value::string(join(args, |v| interp.pr_str(v))))
    });
    define_sensitive(interp, "println", 0, None, |interp, args| {
        println!("{}", join(args, |v| interp.print_str(v)));
        Ok(Value::Nil)
    });
    define_sensitive(interp, "print", 0, None, |interp, args| {
        print!("{}", join(args, |v| interp.print_str(v)));
        Ok(Value::Nil)
    });
    define(interp, "name", 1, Some(1), builtin_name);
    define(interp, "keyword", 1, Some(2), builtin_keyword);
    define(interp, "symbol", 1, Some(2), builtin_symbol);
    define(interp, "gensym", 0, Some(1), |interp, args| {
        let prefix = match args.first() {
            Some(value) => name_of(value)?,
            None => "G__".to_string(),
        };
        Ok(Value::Symbol(interp.globals().gensym(&prefix)))
    });
}

fn join(args: &[Value], render: impl Fn(&Value) -> String) -> String {
    args.iter().map(render).collect::<Vec<_>>().join(" ")
}

fn name_of(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::String(s) => Ok(s.to_string()),
        Value::Keyword(k) => Ok(k.name().to_string()),
        Value::Symbol(s) => Ok(s.name().to_string()),
        other => Err(EvalError::type_error("string, keyword or symbol", other)),
    }
}

fn builtin_name(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    name_of(&args[0]).map(Value::string)
}

fn builtin_keyword(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Keyword(k)] => Ok(Value::Keyword(k.clone())),
        [Value::String(s)] => Ok(Value::keyword(s.as_ref())),
        [Value::Symbol(s)] => Ok(Value::keyword(s.to_string())),
        [ns, name] => Ok(Value::Keyword(Keyword::qualified(name_of(ns)?, name_of(name)?))),
        [other] => Err(EvalError::type_error("string, keyword or symbol", other)),
        _ => unreachable!("arity checked by NativeFn"),
    }
}

fn builtin_symbol(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Symbol(s)] => Ok(Value::Symbol(s.clone())),
        [Value::String(s)] => Ok(Value::symbol(s.as_ref())),
        [ns, name] => Ok(Value::Symbol(Symbol::qualified(name_of(ns)?, name_of(name)?))),
        [other] => Err(EvalError::type_error("string or symbol", other)),
        _ => unreachable!("arity checked by NativeFn"),
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Types and Metadata
// ═══════════════════════════════════════════════════════════════════════

fn install_types(interp: &Interpreter) {
    define(interp, "type", 1, Some(1), |_, args| {
        Ok(Value::Keyword(args[0].type_tag().to_keyword()))
    });
    define(interp, "supertype", 1, Some(1), |interp, args| {
        let registry = interp.globals().registry();
        Ok(registry
            .supertype(&args[0].type_tag())
            .map_or(Value::Nil, |tag| Value::Keyword(tag.to_keyword())))
    });
    define(interp, "instance-of?", 2, Some(2), builtin_instance_of);
    define(interp, "satisfies?", 2, Some(2), builtin_satisfies);
    define(interp, "meta", 1, Some(1), |_, args| {
        Ok(user_meta(&args[0].meta()).map_or(Value::Nil, |m| Value::Map(m, None)))
    });
    define(interp, "with-meta", 2, Some(2), |_, args| match &args[1] {
        Value::Nil => Ok(args[0].with_meta(None)),
        Value::Map(map, _) => Ok(args[0].with_meta(Some(Arc::clone(map)))),
        other => Err(EvalError::type_error("map", other)),
    });

    define(interp, "nil?", 1, Some(1), |_, args| Ok(Value::Bool(args[0].is_nil())));
    define(interp, "some?", 1, Some(1), |_, args| Ok(Value::Bool(!args[0].is_nil())));
    define(interp, "true?", 1, Some(1), |_, args| Ok(Value::Bool(args[0] == Value::Bool(true))));
    define(interp, "false?", 1, Some(1), |_, args| Ok(Value::Bool(args[0] == Value::Bool(false))));
    define(interp, "string?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::String(_)))));
    define(interp, "keyword?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Keyword(_)))));
    define(interp, "symbol?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Symbol(_)))));
    define(interp, "fn?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Function(_)))));
}

/// `(instance-of? :tag x)`: whether `x`'s tag is `:tag` or a subtype.
fn builtin_instance_of(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let keyword = expect_keyword(&args[0])?;
    let globals = interp.globals();
    let tag = globals
        .registry()
        .resolve_tag(keyword, &globals.current_ns())
        .ok_or_else(|| EvalError::runtime(format!("Unknown type {}", keyword)))?;
    Ok(Value::Bool(globals.registry().is_instance(&args[1], &tag)))
}

fn builtin_satisfies(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let name = expect_keyword(&args[0])?;
    let globals = interp.globals();
    let protocol = globals
        .registry()
        .find_protocol(&name.qualify_with(&globals.current_ns()))
        .ok_or_else(|| EvalError::Dispatch {
            message: format!("No protocol named {}", name),
        })?;
    Ok(Value::Bool(globals.registry().satisfies(&protocol, &args[1])))
}

// ═══════════════════════════════════════════════════════════════════════
// Atoms and Futures
// ═══════════════════════════════════════════════════════════════════════

fn install_refs(interp: &Interpreter) {
    define(interp, "atom", 1, Some(1), |_, args| {
        Ok(Value::Atom(Arc::new(AtomCell::new(args[0].clone()))))
    });
    define(interp, "deref", 1, Some(3), builtin_deref);
    define(interp, "reset!", 2, Some(2), |interp, args| {
        let atom = expect_atom(&args[0])?;
        atom.reset(interp, &args[0], args[1].clone())
    });
    define(interp, "swap!", 2, None, builtin_swap);
    define(interp, "compare-and-set!", 3, Some(3), |interp, args| {
        let atom = expect_atom(&args[0])?;
        atom.compare_and_set(interp, &args[0], &args[1], args[2].clone())
            .map(Value::Bool)
    });
    define(interp, "add-watch", 3, Some(3), |_, args| {
        let atom = expect_atom(&args[0])?;
        atom.add_watch(args[1].clone(), expect_fn(&args[2])?.clone());
        Ok(args[0].clone())
    });
    define(interp, "remove-watch", 2, Some(2), |_, args| {
        expect_atom(&args[0])?.remove_watch(&args[1]);
        Ok(args[0].clone())
    });

    define(interp, "future-call", 1, Some(1), |interp, args| {
        let func = expect_fn(&args[0])?;
        Ok(Value::Future(FutureCell::spawn(interp, func.clone())))
    });
    define(interp, "realized?", 1, Some(1), |_, args| match &args[0] {
        Value::Future(future) => Ok(Value::Bool(future.is_realized())),
        other => Err(EvalError::type_error("future", other)),
    });
}

fn expect_atom(value: &Value) -> Result<&Arc<AtomCell>, EvalError> {
    match value {
        Value::Atom(atom) => Ok(atom),
        other => Err(EvalError::type_error("atom", other)),
    }
}

/// `(deref ref)`, `(deref future ms)` or `(deref future ms default)`.
///
/// A timed wait without a default raises a timeout error; the future keeps
/// running either way.
fn builtin_deref(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1..]) {
        (Value::Atom(atom), []) => Ok(atom.get()),
        (Value::Future(future), []) => future
            .wait(None)
            .unwrap_or_else(|| Err(EvalError::runtime("future abandoned"))),
        (Value::Future(future), [millis, default @ ..]) => {
            let millis = u64::try_from(expect_int(millis)?)
                .map_err(|_| EvalError::runtime("deref timeout must not be negative"))?;
            match future.wait(Some(Duration::from_millis(millis))) {
                Some(result) => result,
                None => match default {
                    [value] => Ok(value.clone()),
                    _ => Err(EvalError::Timeout { millis }),
                },
            }
        }
        (Value::Atom(_), _) => Err(EvalError::runtime("deref with a timeout expects a future")),
        (other, _) => Err(EvalError::type_error("atom or future", other)),
    }
}

/// `(swap! atom f & args)` applies `(f current args...)`.
fn builtin_swap(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let atom = expect_atom(&args[0])?;
    let func = expect_fn(&args[1])?;
    let extra = &args[2..];
    atom.swap(interp, &args[0], |current| {
        let mut call_args = Vec::with_capacity(extra.len() + 1);
        call_args.push(current);
        call_args.extend_from_slice(extra);
        interp.apply(func, &call_args)
    })
}

// ═══════════════════════════════════════════════════════════════════════
// Ordering and Reflection
// ═══════════════════════════════════════════════════════════════════════

fn install_reflection(interp: &Interpreter) {
    define(interp, "compare", 2, Some(2), |interp, args| {
        let ordering = interp.compare(&args[0], &args[1])?;
        Ok(Value::Integer(ordering as i64))
    });
    define(interp, "sort", 1, Some(2), builtin_sort);
    define(interp, "identity", 1, Some(1), |_, args| Ok(args[0].clone()));
    define(interp, "not", 1, Some(1), |_, args| Ok(Value::Bool(!args[0].is_truthy())));
    define(interp, "assert", 1, Some(2), builtin_assert);
    define(interp, "ex-message", 1, Some(1), builtin_ex_message);

    define(interp, "eval", 1, Some(1), |interp, args| interp.eval_form(&args[0]));
    define(interp, "read-string", 1, Some(1), |_, args| match &args[0] {
        Value::String(s) => Ok(reader::read_one(s, "<string>")?),
        other => Err(EvalError::type_error("string", other)),
    });
    define(interp, "macroexpand-1", 1, Some(1), |interp, args| {
        interp.macroexpand_1(&args[0], &Env::new())
    });
    define(interp, "macroexpand", 1, Some(1), |interp, args| {
        interp.macroexpand(&args[0], &Env::new())
    });
    define(interp, "macroexpand-all", 1, Some(1), |interp, args| {
        interp.macroexpand_all(&args[0], &Env::new())
    });
}

/// `(sort coll)` or `(sort comparator coll)`; returns a list.
///
/// The comparator returns a negative, zero or positive long.
fn builtin_sort(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (comparator, coll) = match args {
        [coll] => (None, coll),
        [comparator, coll] => (Some(expect_fn(comparator)?), coll),
        _ => unreachable!("arity checked by NativeFn"),
    };
    let mut items = coll.to_seq()?;
    let mut failure = None;
    items.sort_by(|a, b| {
        if failure.is_some() {
            return Ordering::Equal;
        }
        let ordering = match comparator {
            None => interp.compare(a, b),
            Some(func) => interp
                .apply(func, &[a.clone(), b.clone()])
                .and_then(|result| match result.as_i64() {
                    Some(n) => Ok(n.cmp(&0)),
                    None => Err(EvalError::type_error("long from comparator", &result)),
                }),
        };
        ordering.unwrap_or_else(|err| {
            failure = Some(err);
            Ordering::Equal
        })
    });
    match failure {
        Some(err) => Err(err),
        None => Ok(Value::list(items)),
    }
}

fn builtin_assert(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args[0].is_truthy() {
        return Ok(Value::Nil);
    }
    let message = match args.get(1) {
        Some(message) => interp.print_str(message),
        None => format!("{} is not truthy", args[0].pr_str()),
    };
    Err(EvalError::assertion(message))
}

/// Message of a caught error value: the `:message` of an error map, a
/// string as is, otherwise `nil`.
fn builtin_ex_message(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Map(map, _) => map
            .get(&Value::keyword("message"))
            .cloned()
            .unwrap_or(Value::Nil),
        Value::Custom(instance) => instance.get("message").cloned().unwrap_or(Value::Nil),
        Value::String(_) => args[0].clone(),
        _ => Value::Nil,
    })
}
