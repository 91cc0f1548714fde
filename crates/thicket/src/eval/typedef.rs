//! Type and protocol definitions: `deftype`, `deftype-of`, `defprotocol`,
//! `extend`

use std::sync::Arc;

use indexmap::IndexMap;
use log::debug;

use super::function;
use crate::environment::Env;
use crate::registry::{
    self, FieldSpec, Protocol, ProtocolMethod, ProtocolSig, TypeDescriptor, TypeHint, TypeTag,
};
use crate::value::{Function, Keyword, NativeFn, Value};
use crate::{EvalError, Interpreter};

/// `Object` methods a custom type may override.
const OVERRIDABLE: &[&str] = &["toString", "equals", "compareTo"];

impl Interpreter {
    /// Qualify a new type tag with the current namespace.
    fn new_type_tag(&self, form_name: &str, tag: &Value) -> Result<Keyword, EvalError> {
        let Value::Keyword(kw) = tag else {
            return Err(EvalError::invalid_form(form_name, "type name must be a keyword"));
        };
        if kw.namespace().is_none() && TypeTag::builtin(kw.name()).is_some() {
            return Err(EvalError::invalid_form(
                form_name,
                format!("{} is a built-in type", kw),
            ));
        }
        Ok(kw.qualify_with(&self.globals.current_ns()))
    }

    fn resolve_type_hint(&self, form_name: &str, kw: &Keyword) -> Result<TypeHint, EvalError> {
        self.globals
            .registry()
            .resolve_hint(kw, &self.globals.current_ns())
            .ok_or_else(|| EvalError::invalid_form(form_name, format!("unknown type {}", kw)))
    }

    /// Register a descriptor and define its `name.` constructor and `name?`
    /// predicate in the current namespace.
    fn install_type(&self, descriptor: TypeDescriptor) -> Value {
        let descriptor = Arc::new(descriptor);
        let tag = descriptor.tag.clone();
        let arity = descriptor.fields.len();
        self.globals.registry().define_type(Arc::clone(&descriptor));

        let ns = self.globals.current_ns();
        let ctor_name = format!("{}.", tag.name());
        let ctor = NativeFn::new(ctor_name.clone(), arity, Some(arity), move |interp, args| {
            registry::construct(interp, &descriptor, args)
        });
        self.globals.define(&ns, &ctor_name, Value::native(ctor));

        let pred_tag = tag.clone();
        let pred = NativeFn::new(format!("{}?", tag.name()), 1, Some(1), move |_, args| {
            Ok(Value::Bool(
                matches!(&args[0], Value::Custom(c) if *c.tag() == pred_tag),
            ))
        });
        self.globals
            .define(&ns, &format!("{}?", tag.name()), Value::native(pred));

        debug!("defined type {}", tag);
        Value::Keyword(tag)
    }

    /// Parse `(Object (method [params] body*) ...)` into overrides.
    fn parse_overrides(&self, clause: &[Value], env: &Env) -> Result<IndexMap<String, Value>, EvalError> {
        let mut overrides = IndexMap::new();
        for method in &clause[1..] {
            let Some([Value::Symbol(name), tail @ ..]) = method.as_list() else {
                return Err(EvalError::invalid_form(
                    "deftype",
                    "Object clause expects (method [params] body*) forms",
                ));
            };
            if !OVERRIDABLE.contains(&name.name()) {
                return Err(EvalError::invalid_form(
                    "deftype",
                    format!("can't override Object method {}", name),
                ));
            }
            let arities = function::parse_arities("deftype", tail)?;
            let closure = self.make_closure(Some(name), arities, env, None, false);
            overrides.insert(
                name.name().to_string(),
                Value::Function(Function::Closure(closure)),
            );
        }
        Ok(overrides)
    }

    /// `(deftype :name [field :type? ...] validator? (Object ...)?)`
    pub(crate) fn eval_deftype(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [tag, fields, extras @ ..] = args else {
            return Err(EvalError::invalid_form(
                "deftype",
                "expects a type keyword and a field vector",
            ));
        };
        let tag = self.new_type_tag("deftype", tag)?;
        let Some(field_forms) = fields.as_vector() else {
            return Err(EvalError::invalid_form("deftype", "fields must be a vector"));
        };

        let ns = self.globals.current_ns();
        let mut specs: Vec<FieldSpec> = Vec::new();
        let mut i = 0;
        while i < field_forms.len() {
            let Value::Symbol(name) = &field_forms[i] else {
                return Err(EvalError::invalid_form("deftype", "field names must be symbols"));
            };
            let hint = match field_forms.get(i + 1) {
                Some(Value::Keyword(kw)) => {
                    i += 1;
                    Some(self.resolve_type_hint("deftype", kw)?)
                }
                _ => self.hint_of(name, &ns),
            };
            let field = Keyword::new(name.name());
            if specs.iter().any(|s| s.name == field) {
                return Err(EvalError::invalid_form(
                    "deftype",
                    format!("duplicate field {}", name),
                ));
            }
            specs.push(FieldSpec { name: field, hint });
            i += 1;
        }

        let mut validator = None;
        let mut overrides = IndexMap::new();
        for extra in extras {
            match extra.as_list() {
                Some(clause @ [head, ..]) if head.is_symbol_named("Object") => {
                    overrides.extend(self.parse_overrides(clause, env)?);
                }
                _ if validator.is_none() => {
                    let func = self.eval_nested(extra, env)?;
                    if !func.is_callable() {
                        return Err(EvalError::type_error("validator function", &func));
                    }
                    validator = Some(func);
                }
                _ => {
                    return Err(EvalError::invalid_form(
                        "deftype",
                        "at most one validator is allowed",
                    ))
                }
            }
        }

        Ok(self.install_type(TypeDescriptor {
            tag,
            fields: specs,
            validator,
            parent: None,
            overrides,
        }))
    }

    /// `(deftype-of :name :base-type validator?)`
    ///
    /// Wraps a single `:value` field of the base type; the base type is the
    /// new type's supertype.
    pub(crate) fn eval_deftype_of(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (tag, base, validator) = match args {
            [tag, Value::Keyword(base)] => (tag, base, None),
            [tag, Value::Keyword(base), validator] => (tag, base, Some(validator)),
            _ => {
                return Err(EvalError::invalid_form(
                    "deftype-of",
                    "expects a type keyword, a base type and an optional validator",
                ))
            }
        };
        let tag = self.new_type_tag("deftype-of", tag)?;
        let base = self.resolve_type_hint("deftype-of", base)?;
        let validator = match validator {
            Some(form) => {
                let func = self.eval_nested(form, env)?;
                if !func.is_callable() {
                    return Err(EvalError::type_error("validator function", &func));
                }
                Some(func)
            }
            None => None,
        };
        Ok(self.install_type(TypeDescriptor {
            tag,
            fields: vec![FieldSpec {
                name: Keyword::new("value"),
                hint: Some(base.clone()),
            }],
            validator,
            parent: Some(base.tag),
            overrides: IndexMap::new(),
        }))
    }

    /// `(defprotocol Name (method [params]+ default-body*) ...)`
    pub(crate) fn eval_defprotocol(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [Value::Symbol(name), method_forms @ ..] = args else {
            return Err(EvalError::invalid_form("defprotocol", "expects a protocol name"));
        };
        let ns = self.globals.current_ns();
        let protocol_name = Keyword::qualified(&ns, name.name());

        let mut methods = IndexMap::new();
        for form in method_forms {
            let Some([Value::Symbol(method), tail @ ..]) = form.as_list() else {
                return Err(EvalError::invalid_form(
                    "defprotocol",
                    "expects (method [params]+ default-body*) forms",
                ));
            };
            let split = tail
                .iter()
                .position(|f| !matches!(f, Value::Vector(..)))
                .unwrap_or(tail.len());
            let (param_lists, default_body) = tail.split_at(split);
            if param_lists.is_empty() {
                return Err(EvalError::invalid_form(
                    "defprotocol",
                    format!("method {} needs at least one parameter vector", method),
                ));
            }
            let mut arities = Vec::with_capacity(param_lists.len());
            for params in param_lists {
                let count = params.as_vector().map_or(0, <[Value]>::len);
                if count == 0 || params.as_vector().is_some_and(|p| p.iter().any(|s| s.is_symbol_named("&"))) {
                    return Err(EvalError::invalid_form(
                        "defprotocol",
                        format!("method {} needs fixed parameters including the receiver", method),
                    ));
                }
                arities.push(count);
            }
            let default = if default_body.is_empty() {
                None
            } else {
                let clauses = param_lists
                    .iter()
                    .map(|params| {
                        let mut clause = vec![params.clone()];
                        clause.extend_from_slice(default_body);
                        Value::list(clause)
                    })
                    .collect::<Vec<_>>();
                let arities = function::parse_arities("defprotocol", &clauses)?;
                let closure = self.make_closure(Some(method), arities, env, None, false);
                Some(Value::Function(Function::Closure(closure)))
            };
            methods.insert(method.name().to_string(), ProtocolSig { arities, default });
        }

        let protocol = Arc::new(Protocol::new(protocol_name.clone(), methods));
        self.globals.registry().define_protocol(Arc::clone(&protocol));
        self.globals
            .define(&ns, name.name(), Value::Keyword(protocol_name.clone()));
        for method in protocol.methods.keys() {
            let callable = ProtocolMethod {
                protocol: Arc::clone(&protocol),
                method: Arc::from(method.as_str()),
            };
            self.globals.define(
                &ns,
                method,
                Value::Function(Function::Protocol(Arc::new(callable))),
            );
        }
        debug!("defined protocol {}", protocol_name);
        Ok(Value::Keyword(protocol_name))
    }

    /// `(extend :type Protocol (method [params] body*)+ ...)`
    pub(crate) fn eval_extend(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let [Value::Keyword(tag), groups @ ..] = args else {
            return Err(EvalError::invalid_form("extend", "expects a type keyword"));
        };
        let ns = self.globals.current_ns();
        let registry = self.globals.registry();
        let tag = registry
            .resolve_tag(tag, &ns)
            .ok_or_else(|| EvalError::invalid_form("extend", format!("unknown type {}", tag)))?;

        let mut current: Option<(Arc<Protocol>, Vec<(String, Value)>)> = None;
        for form in groups {
            match form {
                Value::Symbol(_) | Value::Keyword(_) => {
                    if let Some((protocol, impls)) = current.take() {
                        protocol.extend(tag.clone(), impls)?;
                    }
                    let protocol = match self.eval_nested(form, env)? {
                        Value::Keyword(kw) => registry.find_protocol(&kw),
                        _ => None,
                    }
                    .ok_or_else(|| {
                        EvalError::invalid_form("extend", format!("{} is not a protocol", form))
                    })?;
                    current = Some((protocol, Vec::new()));
                }
                Value::List(..) => {
                    let Some((_, impls)) = current.as_mut() else {
                        return Err(EvalError::invalid_form(
                            "extend",
                            "method implementations must follow a protocol name",
                        ));
                    };
                    let Some([Value::Symbol(method), tail @ ..]) = form.as_list() else {
                        return Err(EvalError::invalid_form(
                            "extend",
                            "expects (method [params] body*) forms",
                        ));
                    };
                    let arities = function::parse_arities("extend", tail)?;
                    let closure = self.make_closure(Some(method), arities, env, None, false);
                    impls.push((
                        method.name().to_string(),
                        Value::Function(Function::Closure(closure)),
                    ));
                }
                other => {
                    return Err(EvalError::invalid_form(
                        "extend",
                        format!("unexpected form {}", other.pr_str()),
                    ))
                }
            }
        }
        if let Some((protocol, impls)) = current {
            protocol.extend(tag.clone(), impls)?;
        }
        debug!("extended {}", tag);
        Ok(Value::Nil)
    }
}
