//! Protocols: named method sets with defaults and per-type extensions

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use super::{Registry, TypeTag};
use crate::value::{Keyword, Value};
use crate::EvalError;

/// Declared shape of one protocol method.
#[derive(Debug, Clone)]
pub struct ProtocolSig {
    /// Accepted parameter counts
    pub arities: Vec<usize>,
    /// Default implementation, used when no extension matches
    pub default: Option<Value>,
}

/// A protocol and its extension table.
pub struct Protocol {
    /// Qualified name, e.g. `:user/Shape`
    pub name: Keyword,
    /// Method signatures in declaration order
    pub methods: IndexMap<String, ProtocolSig>,
    extensions: RwLock<HashMap<TypeTag, HashMap<String, Value>>>,
}

impl Protocol {
    /// Create a protocol with no extensions.
    pub fn new(name: Keyword, methods: IndexMap<String, ProtocolSig>) -> Self {
        Self {
            name,
            methods,
            extensions: RwLock::new(HashMap::new()),
        }
    }

    /// Register `method` implementations for `tag`.
    pub fn extend(&self, tag: TypeTag, impls: Vec<(String, Value)>) -> Result<(), EvalError> {
        for (method, _) in &impls {
            if !self.methods.contains_key(method) {
                return Err(EvalError::Dispatch {
                    message: format!("Protocol {} has no method '{}'", self.name, method),
                });
            }
        }
        let mut extensions = self.extensions.write().unwrap_or_else(|e| e.into_inner());
        extensions.entry(tag).or_default().extend(impls);
        Ok(())
    }

    /// Whether any extension is registered for exactly `tag`.
    pub fn is_extended_by(&self, tag: &TypeTag) -> bool {
        self.extensions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(tag)
    }

    /// Implementation of `method` for a receiver of type `tag`.
    ///
    /// Walks the tag and its supertypes for an extension, then falls back
    /// to the method's default body.
    pub fn resolve(&self, registry: &Registry, method: &str, tag: &TypeTag) -> Result<Value, EvalError> {
        {
            let extensions = self.extensions.read().unwrap_or_else(|e| e.into_inner());
            for candidate in registry.chain(tag) {
                if let Some(found) = extensions.get(&candidate).and_then(|m| m.get(method)) {
                    return Ok(found.clone());
                }
            }
        }
        self.methods
            .get(method)
            .and_then(|sig| sig.default.clone())
            .ok_or_else(|| EvalError::Dispatch {
                message: format!(
                    "No implementation of {}/{} for type {}",
                    self.name, method, tag
                ),
            })
    }
}

/// A protocol method as a callable value.
pub struct ProtocolMethod {
    /// Owning protocol
    pub protocol: Arc<Protocol>,
    /// Method name
    pub method: Arc<str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape_protocol(with_default: bool) -> Protocol {
        let mut methods = IndexMap::new();
        methods.insert(
            "area".to_string(),
            ProtocolSig {
                arities: vec![1],
                default: with_default.then(|| Value::Integer(0)),
            },
        );
        Protocol::new(Keyword::qualified("user", "Shape"), methods)
    }

    #[test]
    fn test_default_used_without_extension() {
        let registry = Registry::new();
        let p = shape_protocol(true);
        assert_eq!(
            p.resolve(&registry, "area", &TypeTag::Long).unwrap(),
            Value::Integer(0)
        );
    }

    #[test]
    fn test_supertype_extension_applies() {
        let registry = Registry::new();
        let p = shape_protocol(false);
        p.extend(TypeTag::Number, vec![("area".into(), Value::Integer(7))])
            .unwrap();
        assert_eq!(
            p.resolve(&registry, "area", &TypeTag::Double).unwrap(),
            Value::Integer(7)
        );
        assert!(p.resolve(&registry, "area", &TypeTag::String).is_err());
    }

    #[test]
    fn test_unknown_method_rejected() {
        let p = shape_protocol(true);
        assert!(p
            .extend(TypeTag::Long, vec![("perimeter".into(), Value::Nil)])
            .is_err());
    }
}
