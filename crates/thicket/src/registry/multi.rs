//! Multimethods

use std::sync::{Arc, RwLock};

use indexmap::IndexMap;

use crate::value::Value;
use crate::EvalError;

/// A function whose implementation is chosen by a computed dispatch value.
pub struct MultiFn {
    /// Multimethod name
    pub name: Arc<str>,
    /// Function applied to the arguments to compute the dispatch value
    pub dispatch: Value,
    methods: RwLock<IndexMap<Value, Value>>,
}

impl MultiFn {
    /// Create a multimethod with no methods.
    pub fn new(name: impl AsRef<str>, dispatch: Value) -> Self {
        Self {
            name: Arc::from(name.as_ref()),
            dispatch,
            methods: RwLock::new(IndexMap::new()),
        }
    }

    /// Register (or replace) the method for `dispatch_value`.
    pub fn add_method(&self, dispatch_value: Value, method: Value) {
        self.methods
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(dispatch_value, method);
    }

    /// Method for `dispatch_value`, falling back to `:default`.
    pub fn resolve(&self, dispatch_value: &Value) -> Result<Value, EvalError> {
        let methods = self.methods.read().unwrap_or_else(|e| e.into_inner());
        methods
            .get(dispatch_value)
            .or_else(|| methods.get(&Value::keyword("default")))
            .cloned()
            .ok_or_else(|| EvalError::Dispatch {
                message: format!(
                    "No method in multimethod '{}' for dispatch value: {}",
                    self.name,
                    dispatch_value.pr_str()
                ),
            })
    }
}
