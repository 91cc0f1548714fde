//! Collection constructors, accessors and sequence functions
//!
//! Sequence functions accept anything seqable (`nil`, lists, vectors, maps,
//! sets, strings) and return lists. Collections are persistent: every
//! "update" returns a new value.

use std::sync::Arc;

use super::{define, expect_fn, expect_int};
use crate::eval::call::lookup_key;
use crate::registry::assoc_fields;
use crate::value::{Value, ValueMap};
use crate::{EvalError, Interpreter};

pub(super) fn install(interp: &Interpreter) {
    define(interp, "list", 0, None, |_, args| Ok(Value::list(args.to_vec())));
    define(interp, "vector", 0, None, |_, args| Ok(Value::vector(args.to_vec())));
    define(interp, "hash-map", 0, None, builtin_hash_map);
    define(interp, "hash-set", 0, None, |_, args| {
        Ok(Value::set(args.iter().cloned().collect()))
    });
    define(interp, "vec", 1, Some(1), |_, args| Ok(Value::vector(args[0].to_seq()?)));

    define(interp, "first", 1, Some(1), |_, args| {
        Ok(args[0].to_seq()?.into_iter().next().unwrap_or(Value::Nil))
    });
    define(interp, "second", 1, Some(1), |_, args| {
        Ok(args[0].to_seq()?.into_iter().nth(1).unwrap_or(Value::Nil))
    });
    define(interp, "rest", 1, Some(1), builtin_rest);
    define(interp, "next", 1, Some(1), builtin_next);
    define(interp, "seq", 1, Some(1), builtin_seq);
    define(interp, "cons", 2, Some(2), builtin_cons);
    define(interp, "conj", 1, None, builtin_conj);
    define(interp, "concat", 0, None, builtin_concat);
    define(interp, "count", 1, Some(1), builtin_count);
    define(interp, "nth", 2, Some(3), builtin_nth);
    define(interp, "get", 2, Some(3), builtin_get);
    define(interp, "assoc", 3, None, builtin_assoc);
    define(interp, "dissoc", 1, None, builtin_dissoc);
    define(interp, "contains?", 2, Some(2), builtin_contains);
    define(interp, "keys", 1, Some(1), |_, args| map_part(&args[0], true));
    define(interp, "vals", 1, Some(1), |_, args| map_part(&args[0], false));
    define(interp, "empty?", 1, Some(1), |_, args| {
        Ok(Value::Bool(args[0].to_seq()?.is_empty()))
    });

    define(interp, "apply", 2, None, builtin_apply);
    define(interp, "map", 2, None, builtin_map);
    define(interp, "filter", 2, Some(2), builtin_filter);
    define(interp, "reduce", 2, Some(3), builtin_reduce);
    define(interp, "range", 1, Some(3), builtin_range);

    define(interp, "list?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::List(..)))));
    define(interp, "vector?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Vector(..)))));
    define(interp, "map?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Map(..)))));
    define(interp, "set?", 1, Some(1), |_, args| Ok(Value::Bool(matches!(args[0], Value::Set(..)))));
    define(interp, "coll?", 1, Some(1), |_, args| Ok(Value::Bool(args[0].is_collection())));
}

// ═══════════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════════

fn builtin_hash_map(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() % 2 != 0 {
        return Err(EvalError::runtime("hash-map expects an even number of arguments"));
    }
    Ok(Value::map(
        args.chunks(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect(),
    ))
}

// ═══════════════════════════════════════════════════════════════════════
// Sequences
// ═══════════════════════════════════════════════════════════════════════

fn builtin_rest(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let items = args[0].to_seq()?;
    Ok(Value::list(items.into_iter().skip(1).collect()))
}

fn builtin_next(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let items = args[0].to_seq()?;
    if items.len() <= 1 {
        return Ok(Value::Nil);
    }
    Ok(Value::list(items.into_iter().skip(1).collect()))
}

fn builtin_seq(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let items = args[0].to_seq()?;
    if items.is_empty() {
        Ok(Value::Nil)
    } else {
        Ok(Value::list(items))
    }
}

fn builtin_cons(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let mut items = Vec::with_capacity(1);
    items.push(args[0].clone());
    items.extend(args[1].to_seq()?);
    Ok(Value::list(items))
}

/// Add items the way each collection grows: lists at the front, vectors at
/// the end, sets by membership and maps from `[k v]` entries.
fn builtin_conj(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (coll, items) = (&args[0], &args[1..]);
    match coll {
        Value::Nil => Ok(Value::list(items.iter().rev().cloned().collect())),
        Value::List(existing, meta) => {
            let mut out: Vec<Value> = items.iter().rev().cloned().collect();
            out.extend(existing.iter().cloned());
            Ok(Value::List(Arc::new(out), meta.clone()))
        }
        Value::Vector(existing, meta) => {
            let mut out = existing.as_ref().clone();
            out.extend(items.iter().cloned());
            Ok(Value::Vector(Arc::new(out), meta.clone()))
        }
        Value::Set(existing, meta) => {
            let mut out = existing.as_ref().clone();
            out.extend(items.iter().cloned());
            Ok(Value::Set(Arc::new(out), meta.clone()))
        }
        Value::Map(existing, meta) => {
            let mut out = existing.as_ref().clone();
            for item in items {
                match item {
                    Value::Vector(pair, _) if pair.len() == 2 => {
                        out.insert(pair[0].clone(), pair[1].clone());
                    }
                    Value::Map(entries, _) => {
                        out.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                    Value::Nil => {}
                    other => return Err(EvalError::type_error("map entry", other)),
                }
            }
            Ok(Value::Map(Arc::new(out), meta.clone()))
        }
        other => Err(EvalError::type_error("collection", other)),
    }
}

fn builtin_concat(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let mut out = Vec::new();
    for arg in args {
        out.extend(arg.to_seq()?);
    }
    Ok(Value::list(out))
}

fn builtin_count(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let n = match &args[0] {
        Value::Nil => 0,
        Value::List(items, _) | Value::Vector(items, _) => items.len(),
        Value::Map(map, _) => map.len(),
        Value::Set(set, _) => set.len(),
        Value::String(s) => s.chars().count(),
        Value::Custom(instance) => instance.fields.len(),
        other => return Err(EvalError::type_error("countable", other)),
    };
    Ok(Value::Integer(n as i64))
}

fn builtin_nth(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let index = expect_int(&args[1])?;
    let items = args[0].to_seq()?;
    let found = usize::try_from(index).ok().and_then(|i| items.get(i).cloned());
    match (found, args.get(2)) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default.clone()),
        (None, None) => Err(EvalError::runtime(format!(
            "Index {} out of bounds for length {}",
            index,
            items.len()
        ))),
    }
}

fn builtin_get(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let default = args.get(2).cloned().unwrap_or(Value::Nil);
    Ok(lookup_key(&args[0], &args[1]).unwrap_or(default))
}

fn builtin_assoc(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (coll, kvs) = (&args[0], &args[1..]);
    if kvs.len() % 2 != 0 {
        return Err(EvalError::runtime("assoc expects key/value pairs"));
    }
    let pairs: Vec<(Value, Value)> = kvs
        .chunks(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    match coll {
        Value::Nil => Ok(Value::map(pairs.into_iter().collect())),
        Value::Map(map, meta) => {
            let mut out = map.as_ref().clone();
            out.extend(pairs);
            Ok(Value::Map(Arc::new(out), meta.clone()))
        }
        Value::Vector(items, meta) => {
            let mut out = items.as_ref().clone();
            for (key, value) in pairs {
                let index = expect_int(&key)?;
                match usize::try_from(index) {
                    Ok(i) if i < out.len() => out[i] = value,
                    Ok(i) if i == out.len() => out.push(value),
                    _ => {
                        return Err(EvalError::runtime(format!(
                            "Index {} out of bounds for length {}",
                            index,
                            out.len()
                        )))
                    }
                }
            }
            Ok(Value::Vector(Arc::new(out), meta.clone()))
        }
        Value::Custom(instance) => assoc_fields(interp, instance, &pairs),
        other => Err(EvalError::type_error("associative collection", other)),
    }
}

fn builtin_dissoc(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Nil => Ok(Value::Nil),
        Value::Map(map, meta) => {
            let mut out: ValueMap = map.as_ref().clone();
            for key in &args[1..] {
                out.shift_remove(key);
            }
            Ok(Value::Map(Arc::new(out), meta.clone()))
        }
        Value::Custom(instance) => Err(EvalError::runtime(format!(
            "Cannot remove fields from custom type {}",
            instance.tag()
        ))),
        other => Err(EvalError::type_error("map", other)),
    }
}

fn builtin_contains(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let (coll, key) = (&args[0], &args[1]);
    let found = match coll {
        Value::Nil => false,
        Value::Map(map, _) => map.contains_key(key),
        Value::Set(set, _) => set.contains(key),
        Value::Custom(instance) => instance.fields.contains_key(key),
        Value::Vector(..) | Value::String(_) => lookup_key(coll, key).is_some(),
        other => return Err(EvalError::type_error("associative collection", other)),
    };
    Ok(Value::Bool(found))
}

fn map_part(value: &Value, keys: bool) -> Result<Value, EvalError> {
    let entries: Vec<(Value, Value)> = match value {
        Value::Nil => return Ok(Value::Nil),
        Value::Map(map, _) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        Value::Custom(instance) => instance
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        other => return Err(EvalError::type_error("map", other)),
    };
    if entries.is_empty() {
        return Ok(Value::Nil);
    }
    Ok(Value::list(
        entries
            .into_iter()
            .map(|(k, v)| if keys { k } else { v })
            .collect(),
    ))
}

// ═══════════════════════════════════════════════════════════════════════
// Higher-order Functions
// ═══════════════════════════════════════════════════════════════════════

/// `(apply f a b [c d])` calls `(f a b c d)`.
fn builtin_apply(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let func = expect_fn(&args[0])?;
    let (spread, leading) = args[1..]
        .split_last()
        .ok_or_else(|| EvalError::runtime("apply expects a final sequence"))?;
    let mut call_args = leading.to_vec();
    call_args.extend(spread.to_seq()?);
    interp.apply(func, &call_args)
}

/// Map over one or more collections, stopping at the shortest.
fn builtin_map(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let func = expect_fn(&args[0])?;
    let colls = args[1..]
        .iter()
        .map(Value::to_seq)
        .collect::<Result<Vec<_>, _>>()?;
    let len = colls.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(len);
    for i in 0..len {
        let call_args: Vec<Value> = colls.iter().map(|c| c[i].clone()).collect();
        out.push(interp.apply(func, &call_args)?);
    }
    Ok(Value::list(out))
}

fn builtin_filter(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let pred = expect_fn(&args[0])?;
    let mut out = Vec::new();
    for item in args[1].to_seq()? {
        if interp.apply(pred, std::slice::from_ref(&item))?.is_truthy() {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

/// `(reduce f coll)` or `(reduce f init coll)`.
///
/// Without an init, an empty collection yields `(f)` and a single item is
/// returned as is.
fn builtin_reduce(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let func = expect_fn(&args[0])?;
    let (init, items) = match args {
        [_, coll] => {
            let mut items = coll.to_seq()?.into_iter();
            match items.next() {
                Some(first) => (first, items.collect::<Vec<_>>()),
                None => return interp.apply(func, &[]),
            }
        }
        [_, init, coll] => (init.clone(), coll.to_seq()?),
        _ => unreachable!("arity checked by NativeFn"),
    };
    items
        .into_iter()
        .try_fold(init, |acc, item| interp.apply(func, &[acc, item]))
}

fn builtin_range(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let bounds = args
        .iter()
        .map(expect_int)
        .collect::<Result<Vec<_>, _>>()?;
    let (start, end, step) = match bounds.as_slice() {
        [end] => (0, *end, 1),
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, *step),
        _ => unreachable!("arity checked by NativeFn"),
    };
    if step == 0 {
        return Err(EvalError::runtime("range step must not be zero"));
    }
    let mut out = Vec::new();
    let mut current = start;
    while (step > 0 && current < end) || (step < 0 && current > end) {
        out.push(Value::Integer(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::list(out))
}
