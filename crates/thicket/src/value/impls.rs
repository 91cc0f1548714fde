//! Value trait implementations: constructors, predicates, extractors, From traits, loose equality

use std::cmp::Ordering;
use std::sync::Arc;

use super::*;
use crate::registry::TypeTag;
use crate::EvalError;

// ═══════════════════════════════════════════════════════════════════
// Convenience Constructors
// ═══════════════════════════════════════════════════════════════════

impl Value {
    /// Create a string value
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Arc::from(s.as_ref()))
    }

    /// Create an unqualified keyword, or a qualified one from `ns/name`
    pub fn keyword(name: impl AsRef<str>) -> Self {
        Value::Keyword(Keyword::parse(name.as_ref()))
    }

    /// Create a symbol, qualified when written `ns/name`
    pub fn symbol(name: impl AsRef<str>) -> Self {
        Value::Symbol(Symbol::parse(name.as_ref()))
    }

    /// Create a list value
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items), None)
    }

    /// Create a vector value
    pub fn vector(items: Vec<Value>) -> Self {
        Value::Vector(Arc::new(items), None)
    }

    /// Create a map value
    pub fn map(map: ValueMap) -> Self {
        Value::Map(Arc::new(map), None)
    }

    /// Create a set value
    pub fn set(set: ValueSet) -> Self {
        Value::Set(Arc::new(set), None)
    }

    /// Create a map from key/value pairs
    pub fn map_from(pairs: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Value::map(pairs.into_iter().collect())
    }

    /// Wrap a native function
    pub fn native(native: NativeFn) -> Self {
        Value::Function(Function::Native(Arc::new(native)))
    }

    /// Wrap a host object
    pub fn handle<T: std::any::Any + Send + Sync>(value: T) -> Self {
        Value::Handle(Handle::new(value))
    }

    /// A sequence of the same kind as `like` (list or vector) holding `items`
    pub fn same_seq(like: &Value, items: Vec<Value>) -> Self {
        match like {
            Value::Vector(..) => Value::vector(items),
            _ => Value::list(items),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Type Predicates
    // ═══════════════════════════════════════════════════════════════════

    /// Check if value is nil
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `nil` and `false` is truthy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    /// Check if value is a long, double or decimal
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Integer(_) | Value::Float(_) | Value::Decimal(_)
        )
    }

    /// Check if value is any collection
    pub fn is_collection(&self) -> bool {
        matches!(
            self,
            Value::List(..) | Value::Vector(..) | Value::Map(..) | Value::Set(..)
        )
    }

    /// Check if value can be applied to arguments
    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_) | Value::Keyword(_) | Value::Map(..) | Value::Set(..)
        )
    }

    /// Whether this is the symbol with the given unqualified name
    pub fn is_symbol_named(&self, name: &str) -> bool {
        matches!(self, Value::Symbol(s) if !s.is_qualified() && s.name() == name)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Extractors
    // ═══════════════════════════════════════════════════════════════════

    /// Get as i64 if this is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Decimal(d) => Some(d.to_f64()),
            _ => None,
        }
    }

    /// Get as &str if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as symbol
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// Get as keyword
    pub fn as_keyword(&self) -> Option<&Keyword> {
        match self {
            Value::Keyword(k) => Some(k),
            _ => None,
        }
    }

    /// Items of a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items, _) => Some(items),
            _ => None,
        }
    }

    /// Items of a vector
    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Value::Vector(items, _) => Some(items),
            _ => None,
        }
    }

    /// Entries of a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map, _) => Some(map),
            _ => None,
        }
    }

    /// View any seqable value as a vector of items.
    ///
    /// `nil` is empty, maps yield `[k v]` entry vectors and strings yield
    /// one-character strings.
    pub fn to_seq(&self) -> Result<Vec<Value>, EvalError> {
        match self {
            Value::Nil => Ok(Vec::new()),
            Value::List(items, _) | Value::Vector(items, _) => Ok(items.as_ref().clone()),
            Value::Map(map, _) => Ok(map
                .iter()
                .map(|(k, v)| Value::vector(vec![k.clone(), v.clone()]))
                .collect()),
            Value::Set(set, _) => Ok(set.iter().cloned().collect()),
            Value::String(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
            Value::Custom(c) => Ok(c
                .fields
                .iter()
                .map(|(k, v)| Value::vector(vec![k.clone(), v.clone()]))
                .collect()),
            other => Err(EvalError::type_error("seqable collection", other)),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Types and Metadata
    // ═══════════════════════════════════════════════════════════════════

    /// The runtime type tag used for hints and protocol dispatch
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Nil => TypeTag::Nil,
            Value::Bool(_) => TypeTag::Boolean,
            Value::Integer(_) => TypeTag::Long,
            Value::Float(_) => TypeTag::Double,
            Value::Decimal(_) => TypeTag::Decimal,
            Value::String(_) => TypeTag::String,
            Value::Keyword(_) => TypeTag::Keyword,
            Value::Symbol(_) => TypeTag::Symbol,
            Value::List(..) => TypeTag::List,
            Value::Vector(..) => TypeTag::Vector,
            Value::Map(..) => TypeTag::Map,
            Value::Set(..) => TypeTag::Set,
            Value::Function(_) => TypeTag::Function,
            Value::Macro(_) => TypeTag::Macro,
            Value::Atom(_) => TypeTag::Atom,
            Value::Future(_) => TypeTag::Future,
            Value::Custom(c) => TypeTag::Custom(c.tag().clone()),
            Value::Handle(_) => TypeTag::Handle,
        }
    }

    /// Attached metadata, if the value kind carries any
    pub fn meta(&self) -> Meta {
        match self {
            Value::List(_, m) | Value::Vector(_, m) | Value::Map(_, m) | Value::Set(_, m) => {
                m.clone()
            }
            Value::Symbol(s) => s.meta().clone(),
            Value::Function(f) => f.meta().clone(),
            Value::Macro(c) => c.meta.clone(),
            _ => None,
        }
    }

    /// Look up one metadata entry by keyword name
    pub fn meta_get(&self, key: &str) -> Option<Value> {
        self.meta()
            .and_then(|m| m.get(&Value::keyword(key)).cloned())
    }

    /// Return a copy with replaced metadata.
    ///
    /// Values that cannot carry metadata are returned unchanged.
    pub fn with_meta(&self, meta: Meta) -> Value {
        match self {
            Value::List(items, _) => Value::List(items.clone(), meta),
            Value::Vector(items, _) => Value::Vector(items.clone(), meta),
            Value::Map(map, _) => Value::Map(map.clone(), meta),
            Value::Set(set, _) => Value::Set(set.clone(), meta),
            Value::Symbol(s) => Value::Symbol(s.with_meta(meta)),
            Value::Function(Function::Closure(c)) => {
                let mut copy = c.as_ref().clone();
                copy.meta = meta;
                Value::Function(Function::Closure(Arc::new(copy)))
            }
            Value::Macro(c) => {
                let mut copy = c.as_ref().clone();
                copy.meta = meta;
                Value::Macro(Arc::new(copy))
            }
            other => other.clone(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════
    // Loose Equality and Ordering
    // ═══════════════════════════════════════════════════════════════════

    /// The `=` relation.
    ///
    /// Numbers compare by value across long/double/decimal, lists equal
    /// vectors with equal items, and custom instances of the same tag
    /// compare field by field. Everything else falls back to `==`.
    pub fn loose_eq(&self, other: &Value) -> bool {
        if self.is_number() && other.is_number() {
            return numeric_cmp(self, other) == Some(Ordering::Equal);
        }
        match (self, other) {
            (Value::List(a, _) | Value::Vector(a, _), Value::List(b, _) | Value::Vector(b, _)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a, _), Value::Map(b, _)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).map_or(false, |w| v.loose_eq(w)))
            }
            (Value::Custom(a), Value::Custom(b)) => {
                a.tag() == b.tag()
                    && a.fields.len() == b.fields.len()
                    && a
                        .fields
                        .iter()
                        .all(|(k, v)| b.fields.get(k).map_or(false, |w| v.loose_eq(w)))
            }
            _ => self == other,
        }
    }

    /// Default ordering used by `compare` and `sort`.
    ///
    /// `nil` sorts first; numbers, strings, keywords, symbols and booleans
    /// compare within their kind; sequentials compare element-wise.
    pub fn default_cmp(&self, other: &Value) -> Result<Ordering, EvalError> {
        if self.is_number() && other.is_number() {
            return numeric_cmp(self, other).ok_or_else(|| {
                EvalError::runtime(format!("Cannot compare {} with {}", self, other))
            });
        }
        match (self, other) {
            (Value::Nil, Value::Nil) => Ok(Ordering::Equal),
            (Value::Nil, _) => Ok(Ordering::Less),
            (_, Value::Nil) => Ok(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
            (Value::Keyword(a), Value::Keyword(b)) => Ok(a.cmp(b)),
            (Value::Symbol(a), Value::Symbol(b)) => Ok(a.to_string().cmp(&b.to_string())),
            (Value::List(a, _) | Value::Vector(a, _), Value::List(b, _) | Value::Vector(b, _)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.default_cmp(y)? {
                        Ordering::Equal => continue,
                        unequal => return Ok(unequal),
                    }
                }
                Ok(a.len().cmp(&b.len()))
            }
            _ => Err(EvalError::runtime(format!(
                "Cannot compare {} with {}",
                self.type_tag(),
                other.type_tag()
            ))),
        }
    }
}

/// Numeric comparison with contagion: long < decimal < double.
pub(crate) fn numeric_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => Some(x.cmp(y)),
        (Value::Float(_), _) | (_, Value::Float(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Decimal(x), Value::Decimal(y)) => Some(x.cmp(y)),
        (Value::Decimal(x), Value::Integer(y)) => Some(x.cmp(&Decimal::from_i64(*y))),
        (Value::Integer(x), Value::Decimal(y)) => Some(Decimal::from_i64(*x).cmp(y)),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════
// From Conversions
// ═══════════════════════════════════════════════════════════════════

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::vector(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Nil, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(Value::Integer(0).is_truthy());
        assert!(Value::string("").is_truthy());
    }

    #[test]
    fn test_loose_equality_across_numeric_types() {
        assert!(Value::Integer(1).loose_eq(&Value::Float(1.0)));
        assert!(Value::Integer(2).loose_eq(&Value::Decimal(Decimal::parse("2.00").unwrap())));
        assert!(!Value::Integer(1).loose_eq(&Value::string("1")));
    }

    #[test]
    fn test_loose_equality_list_and_vector() {
        let list = Value::list(vec![Value::Integer(1), Value::Integer(2)]);
        let vector = Value::vector(vec![Value::Integer(1), Value::Float(2.0)]);
        assert!(list.loose_eq(&vector));
        assert_ne!(list, vector);
    }

    #[test]
    fn test_default_ordering() {
        assert_eq!(
            Value::Nil.default_cmp(&Value::Integer(1)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Value::Float(2.5).default_cmp(&Value::Integer(2)).unwrap(),
            Ordering::Greater
        );
        assert!(Value::Integer(1).default_cmp(&Value::string("a")).is_err());
    }

    #[test]
    fn test_map_seq_yields_entries() {
        let m = Value::map_from([(Value::keyword("a"), Value::Integer(1))]);
        let seq = m.to_seq().unwrap();
        assert_eq!(
            seq,
            vec![Value::vector(vec![Value::keyword("a"), Value::Integer(1)])]
        );
    }
}
