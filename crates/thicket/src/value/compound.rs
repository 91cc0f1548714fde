//! Compound value types: custom type instances and host handles

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Keyword, Value, ValueMap};
use crate::registry::TypeDescriptor;

/// An instance of a user-defined nominal type.
///
/// Structurally a tagged map: the descriptor supplies the tag and field
/// order, `fields` holds one value per declared field, keyed by keyword.
#[derive(Debug, Clone)]
pub struct CustomInstance {
    /// The instance's type
    pub descriptor: Arc<TypeDescriptor>,

    /// Field values in declaration order
    pub fields: ValueMap,
}

impl CustomInstance {
    /// The instance's qualified type tag, e.g. `:user/point`.
    pub fn tag(&self) -> &Keyword {
        &self.descriptor.tag
    }

    /// Get a field by keyword name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(&Value::keyword(field))
    }
}

/// An opaque host object.
///
/// The interpreter never looks inside; it only carries the handle and
/// remembers the host type name for printing.
#[derive(Clone)]
pub struct Handle {
    type_name: &'static str,
    inner: Arc<dyn Any + Send + Sync>,
}

impl Handle {
    /// Wrap a host value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            inner: Arc::new(value),
        }
    }

    /// The host type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the host value as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Identity comparison.
    pub fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Address used for identity hashing.
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const u8 as usize
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({})", self.type_name)
    }
}
