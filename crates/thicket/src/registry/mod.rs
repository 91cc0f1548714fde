//! Dispatch registry: type tags, custom types, protocols and multimethods
//!
//! Built-in values have a fixed tag hierarchy, e.g.
//! `:long -> :number -> :any` and `:vector -> :sequential -> :collection -> :any`.
//! Custom types carry their own qualified tag whose supertype is `:any`
//! (or the base tag for `deftype-of` wrappers). `:nil` has no supertype.

mod custom;
mod multi;
mod protocol;

pub use custom::{assoc_fields, construct, FieldSpec, TypeDescriptor};
pub use multi::MultiFn;
pub use protocol::{Protocol, ProtocolMethod, ProtocolSig};

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::value::{Keyword, Value};

/// Runtime type tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTag {
    /// `:nil`
    Nil,
    /// `:boolean`
    Boolean,
    /// `:long`
    Long,
    /// `:double`
    Double,
    /// `:decimal`
    Decimal,
    /// `:number`
    Number,
    /// `:string`
    String,
    /// `:keyword`
    Keyword,
    /// `:symbol`
    Symbol,
    /// `:list`
    List,
    /// `:vector`
    Vector,
    /// `:sequential`
    Sequential,
    /// `:map`
    Map,
    /// `:set`
    Set,
    /// `:collection`
    Collection,
    /// `:function`
    Function,
    /// `:macro`
    Macro,
    /// `:atom`
    Atom,
    /// `:future`
    Future,
    /// `:handle`
    Handle,
    /// `:any`
    Any,
    /// A user-defined type, e.g. `:user/point`
    Custom(Keyword),
}

impl TypeTag {
    /// Built-in tag for an unqualified name, e.g. `"long"`.
    pub fn builtin(name: &str) -> Option<TypeTag> {
        Some(match name {
            "nil" => TypeTag::Nil,
            "boolean" => TypeTag::Boolean,
            "long" => TypeTag::Long,
            "double" => TypeTag::Double,
            "decimal" => TypeTag::Decimal,
            "number" => TypeTag::Number,
            "string" => TypeTag::String,
            "keyword" => TypeTag::Keyword,
            "symbol" => TypeTag::Symbol,
            "list" => TypeTag::List,
            "vector" => TypeTag::Vector,
            "sequential" => TypeTag::Sequential,
            "map" => TypeTag::Map,
            "set" => TypeTag::Set,
            "collection" => TypeTag::Collection,
            "function" => TypeTag::Function,
            "macro" => TypeTag::Macro,
            "atom" => TypeTag::Atom,
            "future" => TypeTag::Future,
            "handle" => TypeTag::Handle,
            "any" => TypeTag::Any,
            _ => return None,
        })
    }

    /// Supertype of a built-in tag. Custom tags are resolved by [`Registry`].
    pub fn builtin_supertype(&self) -> Option<TypeTag> {
        match self {
            TypeTag::Nil | TypeTag::Any | TypeTag::Custom(_) => None,
            TypeTag::Long | TypeTag::Double | TypeTag::Decimal => Some(TypeTag::Number),
            TypeTag::List | TypeTag::Vector => Some(TypeTag::Sequential),
            TypeTag::Sequential | TypeTag::Map | TypeTag::Set => Some(TypeTag::Collection),
            _ => Some(TypeTag::Any),
        }
    }

    /// The tag as a keyword value.
    pub fn to_keyword(&self) -> Keyword {
        match self {
            TypeTag::Custom(k) => k.clone(),
            other => Keyword::new(other.name()),
        }
    }

    fn name(&self) -> &str {
        match self {
            TypeTag::Nil => "nil",
            TypeTag::Boolean => "boolean",
            TypeTag::Long => "long",
            TypeTag::Double => "double",
            TypeTag::Decimal => "decimal",
            TypeTag::Number => "number",
            TypeTag::String => "string",
            TypeTag::Keyword => "keyword",
            TypeTag::Symbol => "symbol",
            TypeTag::List => "list",
            TypeTag::Vector => "vector",
            TypeTag::Sequential => "sequential",
            TypeTag::Map => "map",
            TypeTag::Set => "set",
            TypeTag::Collection => "collection",
            TypeTag::Function => "function",
            TypeTag::Macro => "macro",
            TypeTag::Atom => "atom",
            TypeTag::Future => "future",
            TypeTag::Handle => "handle",
            TypeTag::Any => "any",
            TypeTag::Custom(k) => k.name(),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_keyword())
    }
}

/// A parameter or field type annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHint {
    /// Required tag (or a supertype of the value's tag)
    pub tag: TypeTag,
    /// Whether `nil` is accepted
    pub nilable: bool,
}

impl fmt::Display for TypeHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.tag, if self.nilable { "?" } else { "" })
    }
}

/// Process-wide tables of custom types and protocols.
#[derive(Default)]
pub struct Registry {
    types: DashMap<Keyword, Arc<TypeDescriptor>>,
    protocols: DashMap<Keyword, Arc<Protocol>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    // ═══════════════════════════════════════════════════════════════════
    // Types
    // ═══════════════════════════════════════════════════════════════════

    /// Register (or replace) a custom type.
    pub fn define_type(&self, descriptor: Arc<TypeDescriptor>) {
        self.types.insert(descriptor.tag.clone(), descriptor);
    }

    /// Find a custom type by qualified tag.
    pub fn find_type(&self, tag: &Keyword) -> Option<Arc<TypeDescriptor>> {
        self.types.get(tag).map(|d| Arc::clone(d.value()))
    }

    /// Resolve a tag keyword: built-in names, then custom types qualified
    /// as written, then custom types in `ns`.
    pub fn resolve_tag(&self, keyword: &Keyword, ns: &str) -> Option<TypeTag> {
        if keyword.namespace().is_none() {
            if let Some(tag) = TypeTag::builtin(keyword.name()) {
                return Some(tag);
            }
        }
        let qualified = keyword.qualify_with(ns);
        if self.types.contains_key(&qualified) {
            return Some(TypeTag::Custom(qualified));
        }
        keyword
            .namespace()
            .map(|_| TypeTag::Custom(keyword.clone()))
    }

    /// Parse a hint keyword such as `:long` or `:number?`.
    pub fn resolve_hint(&self, keyword: &Keyword, ns: &str) -> Option<TypeHint> {
        if let Some(tag) = self.resolve_tag(keyword, ns) {
            return Some(TypeHint {
                tag,
                nilable: false,
            });
        }
        let base = keyword.name().strip_suffix('?')?;
        let stripped = match keyword.namespace() {
            Some(kns) => Keyword::qualified(kns, base),
            None => Keyword::new(base),
        };
        self.resolve_tag(&stripped, ns).map(|tag| TypeHint {
            tag,
            nilable: true,
        })
    }

    /// The direct supertype of `tag`.
    pub fn supertype(&self, tag: &TypeTag) -> Option<TypeTag> {
        match tag {
            TypeTag::Custom(k) => Some(
                self.find_type(k)
                    .and_then(|d| d.parent.clone())
                    .unwrap_or(TypeTag::Any),
            ),
            builtin => builtin.builtin_supertype(),
        }
    }

    /// `tag` followed by all of its supertypes.
    pub fn chain(&self, tag: &TypeTag) -> Vec<TypeTag> {
        let mut chain = vec![tag.clone()];
        let mut current = tag.clone();
        while let Some(next) = self.supertype(&current) {
            if chain.contains(&next) {
                break;
            }
            chain.push(next.clone());
            current = next;
        }
        chain
    }

    /// Whether `value`'s tag is `tag` or one of its subtypes.
    pub fn is_instance(&self, value: &Value, tag: &TypeTag) -> bool {
        self.chain(&value.type_tag()).contains(tag)
    }

    /// Whether `value` satisfies `hint`.
    pub fn accepts(&self, hint: &TypeHint, value: &Value) -> bool {
        if value.is_nil() {
            return hint.nilable || hint.tag == TypeTag::Nil;
        }
        self.is_instance(value, &hint.tag)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Protocols
    // ═══════════════════════════════════════════════════════════════════

    /// Register (or replace) a protocol.
    pub fn define_protocol(&self, protocol: Arc<Protocol>) {
        self.protocols.insert(protocol.name.clone(), protocol);
    }

    /// Find a protocol by qualified name.
    pub fn find_protocol(&self, name: &Keyword) -> Option<Arc<Protocol>> {
        self.protocols.get(name).map(|p| Arc::clone(p.value()))
    }

    /// Whether `value`'s type, or a supertype, extends `protocol`.
    pub fn satisfies(&self, protocol: &Protocol, value: &Value) -> bool {
        self.chain(&value.type_tag())
            .iter()
            .any(|tag| protocol.is_extended_by(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_chain() {
        let registry = Registry::new();
        assert_eq!(
            registry.chain(&TypeTag::Long),
            vec![TypeTag::Long, TypeTag::Number, TypeTag::Any]
        );
    }

    #[test]
    fn test_vector_chain() {
        let registry = Registry::new();
        assert_eq!(
            registry.chain(&TypeTag::Vector),
            vec![
                TypeTag::Vector,
                TypeTag::Sequential,
                TypeTag::Collection,
                TypeTag::Any
            ]
        );
    }

    #[test]
    fn test_nil_is_not_any() {
        let registry = Registry::new();
        let any = TypeHint {
            tag: TypeTag::Any,
            nilable: false,
        };
        assert!(!registry.accepts(&any, &Value::Nil));
        assert!(registry.accepts(&any, &Value::Integer(1)));
    }

    #[test]
    fn test_nilable_hint() {
        let registry = Registry::new();
        let hint = registry
            .resolve_hint(&Keyword::new("number?"), "user")
            .unwrap();
        assert!(hint.nilable);
        assert_eq!(hint.tag, TypeTag::Number);
        assert!(registry.accepts(&hint, &Value::Nil));
        assert!(registry.accepts(&hint, &Value::Float(1.5)));
        assert!(!registry.accepts(&hint, &Value::string("x")));
    }

    #[test]
    fn test_unknown_hint_is_ignored() {
        let registry = Registry::new();
        assert!(registry
            .resolve_hint(&Keyword::new("private"), "user")
            .is_none());
    }
}
