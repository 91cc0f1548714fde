//! Strict equality and hashing so values can key maps and sets
//!
//! This is the `==` relation: same variant, same contents. Floats compare
//! by bit pattern so that `Eq` holds; reference types compare by identity.
//! Metadata never participates.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Value;

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a, _), Value::List(b, _)) => a == b,
            (Value::Vector(a, _), Value::Vector(b, _)) => a == b,
            (Value::Map(a, _), Value::Map(b, _)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            (Value::Set(a, _), Value::Set(b, _)) => {
                a.len() == b.len() && a.iter().all(|k| b.contains(k))
            }
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Macro(a), Value::Macro(b)) => Arc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => Arc::ptr_eq(a, b),
            (Value::Future(a), Value::Future(b)) => Arc::ptr_eq(a, b),
            (Value::Custom(a), Value::Custom(b)) => {
                a.tag() == b.tag()
                    && a.fields.len() == b.fields.len()
                    && a.fields.iter().all(|(k, v)| b.fields.get(k) == Some(v))
            }
            (Value::Handle(a), Value::Handle(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash the discriminant first
        std::mem::discriminant(self).hash(state);

        match self {
            Value::Nil => {}
            Value::Bool(b) => b.hash(state),
            Value::Integer(n) => n.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Decimal(d) => d.hash(state),
            Value::String(s) => s.hash(state),
            Value::Keyword(k) => k.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::List(items, _) | Value::Vector(items, _) => items.hash(state),
            // Order-independent so that equal maps and sets hash alike
            Value::Map(map, _) => {
                let mut acc: u64 = 0;
                for (k, v) in map.iter() {
                    acc = acc.wrapping_add(entry_hash(k, Some(v)));
                }
                acc.hash(state);
            }
            Value::Set(set, _) => {
                let mut acc: u64 = 0;
                for k in set.iter() {
                    acc = acc.wrapping_add(entry_hash(k, None));
                }
                acc.hash(state);
            }
            Value::Function(f) => f.addr().hash(state),
            Value::Macro(m) => (Arc::as_ptr(m) as *const u8 as usize).hash(state),
            Value::Atom(a) => (Arc::as_ptr(a) as *const u8 as usize).hash(state),
            Value::Future(p) => (Arc::as_ptr(p) as *const u8 as usize).hash(state),
            Value::Custom(c) => {
                c.tag().hash(state);
                for (k, v) in c.fields.iter() {
                    k.hash(state);
                    v.hash(state);
                }
            }
            Value::Handle(h) => h.addr().hash(state),
        }
    }
}

fn entry_hash(key: &Value, value: Option<&Value>) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    if let Some(v) = value {
        v.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Decimal, ValueMap};

    fn hash_of(v: &Value) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_strict_equality_separates_numeric_types() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_ne!(Value::list(vec![]), Value::vector(vec![]));
    }

    #[test]
    fn test_decimal_hash_ignores_scale() {
        let a = Value::Decimal(Decimal::parse("1.0").unwrap());
        let b = Value::Decimal(Decimal::parse("1.00").unwrap());
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_map_hash_is_order_independent() {
        let mut m1 = ValueMap::new();
        m1.insert(Value::keyword("a"), Value::Integer(1));
        m1.insert(Value::keyword("b"), Value::Integer(2));
        let mut m2 = ValueMap::new();
        m2.insert(Value::keyword("b"), Value::Integer(2));
        m2.insert(Value::keyword("a"), Value::Integer(1));
        let (a, b) = (Value::map(m1), Value::map(m2));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_metadata_is_ignored() {
        let plain = Value::vector(vec![Value::Integer(1)]);
        let mut meta = ValueMap::new();
        meta.insert(Value::keyword("line"), Value::Integer(3));
        let annotated = plain.with_meta(Some(Arc::new(meta)));
        assert_eq!(plain, annotated);
    }
}
