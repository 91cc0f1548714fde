//! Custom nominal types: descriptors, construction and validated update

use std::sync::Arc;

use indexmap::IndexMap;

use super::{TypeHint, TypeTag};
use crate::value::{CustomInstance, Keyword, Value, ValueMap};
use crate::{EvalError, ErrorKind, Interpreter};

/// One declared field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name as a keyword (`:x`)
    pub name: Keyword,
    /// Declared type, if any
    pub hint: Option<TypeHint>,
}

/// Layout and behavior of a custom type.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    /// Qualified tag, e.g. `:user/point`
    pub tag: Keyword,
    /// Fields in declaration order
    pub fields: Vec<FieldSpec>,
    /// Whole-instance validator
    pub validator: Option<Value>,
    /// Supertype; `None` means `:any`
    pub parent: Option<TypeTag>,
    /// `Object` overrides by method name: `toString`, `compareTo`, `equals`
    pub overrides: IndexMap<String, Value>,
}

impl TypeDescriptor {
    /// Look up an `Object` override.
    pub fn override_fn(&self, method: &str) -> Option<&Value> {
        self.overrides.get(method)
    }

    fn check_field(
        &self,
        interp: &Interpreter,
        field: &FieldSpec,
        value: &Value,
    ) -> Result<(), EvalError> {
        match &field.hint {
            Some(hint) if !interp.globals().registry().accepts(hint, value) => {
                Err(EvalError::assertion(format!(
                    "Invalid value for field {} of {}: expected {}, got {}",
                    field.name,
                    self.tag,
                    hint,
                    value.type_tag()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Run the whole-instance validator, if any.
    ///
    /// The instance is rejected when the validator raises or returns
    /// exactly `false`.
    fn validate(&self, interp: &Interpreter, instance: &Value) -> Result<(), EvalError> {
        let Some(validator) = &self.validator else {
            return Ok(());
        };
        match interp.apply(validator, std::slice::from_ref(instance)) {
            Ok(Value::Bool(false)) => Err(EvalError::assertion(format!(
                "Invalid value for custom type {}",
                self.tag
            ))),
            Ok(_) => Ok(()),
            Err(err) if err.kind() == ErrorKind::Assertion => Err(err),
            Err(EvalError::Interrupted) => Err(EvalError::Interrupted),
            Err(err) => Err(EvalError::assertion(format!(
                "Invalid value for custom type {}: {}",
                self.tag, err
            ))),
        }
    }
}

/// Construct an instance from positional field values.
pub fn construct(
    interp: &Interpreter,
    descriptor: &Arc<TypeDescriptor>,
    values: &[Value],
) -> Result<Value, EvalError> {
    if values.len() != descriptor.fields.len() {
        return Err(EvalError::Arity {
            name: format!("{}.", descriptor.tag.name()),
            accepted: descriptor.fields.len().to_string(),
            got: values.len(),
        });
    }
    let mut fields = ValueMap::new();
    for (spec, value) in descriptor.fields.iter().zip(values) {
        descriptor.check_field(interp, spec, value)?;
        fields.insert(Value::Keyword(spec.name.clone()), value.clone());
    }
    let instance = Value::Custom(Arc::new(CustomInstance {
        descriptor: Arc::clone(descriptor),
        fields,
    }));
    descriptor.validate(interp, &instance)?;
    Ok(instance)
}

/// Return a copy of `instance` with `changes` applied.
///
/// Only the changed fields are type-checked again; the validator always
/// reruns on the result.
pub fn assoc_fields(
    interp: &Interpreter,
    instance: &CustomInstance,
    changes: &[(Value, Value)],
) -> Result<Value, EvalError> {
    let descriptor = &instance.descriptor;
    let mut fields = instance.fields.clone();
    for (key, value) in changes {
        let spec = descriptor
            .fields
            .iter()
            .find(|f| matches!(key, Value::Keyword(k) if *k == f.name))
            .ok_or_else(|| {
                EvalError::runtime(format!(
                    "{} has no field {}",
                    descriptor.tag,
                    key.pr_str()
                ))
            })?;
        descriptor.check_field(interp, spec, value)?;
        fields.insert(key.clone(), value.clone());
    }
    let updated = Value::Custom(Arc::new(CustomInstance {
        descriptor: Arc::clone(descriptor),
        fields,
    }));
    descriptor.validate(interp, &updated)?;
    Ok(updated)
}
