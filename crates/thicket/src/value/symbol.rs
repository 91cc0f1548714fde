//! Symbols and keywords

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::Meta;

/// Split `ns/name` into its parts. A lone `/` is a name, not a separator.
fn split_qualified(text: &str) -> (Option<&str>, &str) {
    if text.len() > 1 {
        if let Some(idx) = text.find('/') {
            if idx > 0 && idx + 1 < text.len() {
                return (Some(&text[..idx]), &text[idx + 1..]);
            }
        }
    }
    (None, text)
}

/// A possibly namespace-qualified symbol.
///
/// Symbols carry optional metadata (source position, type hints); equality
/// and hashing look only at the namespace and name.
#[derive(Clone)]
pub struct Symbol {
    ns: Option<Arc<str>>,
    name: Arc<str>,
    meta: Meta,
}

impl Symbol {
    /// Create an unqualified symbol.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            ns: None,
            name: Arc::from(name.as_ref()),
            meta: None,
        }
    }

    /// Create a qualified symbol.
    pub fn qualified(ns: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            ns: Some(Arc::from(ns.as_ref())),
            name: Arc::from(name.as_ref()),
            meta: None,
        }
    }

    /// Parse `name` or `ns/name`.
    pub fn parse(text: &str) -> Self {
        match split_qualified(text) {
            (Some(ns), name) => Self::qualified(ns, name),
            (None, name) => Self::new(name),
        }
    }

    /// The namespace part, if qualified.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// The name part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the symbol has a namespace part.
    pub fn is_qualified(&self) -> bool {
        self.ns.is_some()
    }

    /// Attached metadata.
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Return a copy with the given metadata.
    pub fn with_meta(&self, meta: Meta) -> Self {
        Self {
            ns: self.ns.clone(),
            name: self.name.clone(),
            meta,
        }
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ns == other.ns && self.name == other.name
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ns.hash(state);
        self.name.hash(state);
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A possibly namespace-qualified keyword, written `:name` or `:ns/name`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Keyword {
    ns: Option<Arc<str>>,
    name: Arc<str>,
}

impl Keyword {
    /// Create an unqualified keyword (without the leading colon).
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            ns: None,
            name: Arc::from(name.as_ref()),
        }
    }

    /// Create a qualified keyword.
    pub fn qualified(ns: impl AsRef<str>, name: impl AsRef<str>) -> Self {
        Self {
            ns: Some(Arc::from(ns.as_ref())),
            name: Arc::from(name.as_ref()),
        }
    }

    /// Parse `name` or `ns/name` (without the leading colon).
    pub fn parse(text: &str) -> Self {
        match split_qualified(text) {
            (Some(ns), name) => Self::qualified(ns, name),
            (None, name) => Self::new(name),
        }
    }

    /// The namespace part, if qualified.
    pub fn namespace(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    /// The name part.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualify with `ns` unless already qualified.
    pub fn qualify_with(&self, ns: &str) -> Self {
        if self.ns.is_some() {
            self.clone()
        } else {
            Self::qualified(ns, self.name.as_ref())
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ns {
            Some(ns) => write!(f, ":{}/{}", ns, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

impl fmt::Debug for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_symbol() {
        let sym = Symbol::parse("core/concat");
        assert_eq!(sym.namespace(), Some("core"));
        assert_eq!(sym.name(), "concat");
    }

    #[test]
    fn test_lone_slash_is_a_name() {
        let sym = Symbol::parse("/");
        assert_eq!(sym.namespace(), None);
        assert_eq!(sym.name(), "/");
    }

    #[test]
    fn test_symbol_equality_ignores_meta() {
        let plain = Symbol::new("x");
        let mut meta = super::super::ValueMap::new();
        meta.insert(
            super::super::Value::keyword("long"),
            super::super::Value::Bool(true),
        );
        let hinted = plain.with_meta(Some(Arc::new(meta)));
        assert_eq!(plain, hinted);
    }

    #[test]
    fn test_keyword_qualify() {
        let kw = Keyword::new("point");
        assert_eq!(kw.qualify_with("user").to_string(), ":user/point");
        let already = Keyword::parse("geo/point");
        assert_eq!(already.qualify_with("user").to_string(), ":geo/point");
    }
}
