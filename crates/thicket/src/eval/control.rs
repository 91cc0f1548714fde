//! Control flow: conditionals, recur, exceptions and monitors

use std::sync::Arc;

use super::{function, Frame, Step};
use crate::environment::Env;
use crate::runtime::monitor_key;
use crate::value::{Closure, Value};
use crate::{EvalError, Interpreter};

/// Where a `recur` jumps back to.
pub enum RecurTarget {
    /// A `loop` form: rebind its patterns and rerun its body
    Loop {
        /// Binding patterns, one per recur argument
        patterns: Vec<Value>,
        /// Loop body
        body: Vec<Value>,
        /// Environment the loop form was evaluated in
        env: Env,
    },
    /// A closure arity: rebind its parameters and rerun its body
    Fn {
        /// The closure being executed
        closure: Arc<Closure>,
        /// Index of the active arity clause
        arity: usize,
    },
}

/// The value a `catch` clause binds for `err`.
///
/// Thrown values are bound as-is. Built-in errors become a map
/// `{:type ExceptionName :message "..."}` whose message is the error's full
/// display text, so it matches what the host sees.
pub fn error_value(err: &EvalError) -> Value {
    match err {
        EvalError::Thrown(value) => value.clone(),
        other => Value::map_from([
            (
                Value::keyword("type"),
                Value::symbol(other.kind().exception_name()),
            ),
            (Value::keyword("message"), Value::string(other.to_string())),
        ]),
    }
}

struct CatchClause<'a> {
    selector: &'a Value,
    binding: &'a Value,
    body: &'a [Value],
}

/// Split a `try` form into body, catch clauses and finally body.
fn parse_try(args: &[Value]) -> Result<(&[Value], Vec<CatchClause<'_>>, Option<&[Value]>), EvalError> {
    let clause_head = |form: &Value| match form.as_list() {
        Some([head, ..]) if head.is_symbol_named("catch") => Some("catch"),
        Some([head, ..]) if head.is_symbol_named("finally") => Some("finally"),
        _ => None,
    };
    let split = args
        .iter()
        .position(|f| clause_head(f).is_some())
        .unwrap_or(args.len());
    let (body, clauses) = args.split_at(split);

    let mut catches = Vec::new();
    let mut finally = None;
    for (i, clause) in clauses.iter().enumerate() {
        let items = clause.as_list().unwrap_or_default();
        match clause_head(clause) {
            Some("catch") => {
                if finally.is_some() {
                    return Err(EvalError::invalid_form("try", "finally must be the last clause"));
                }
                let [_, selector, binding, body @ ..] = items else {
                    return Err(EvalError::invalid_form(
                        "try",
                        "catch expects a type, a binding and a body",
                    ));
                };
                catches.push(CatchClause {
                    selector,
                    binding,
                    body,
                });
            }
            Some(_) if i + 1 == clauses.len() => finally = Some(&items[1..]),
            Some(_) => {
                return Err(EvalError::invalid_form("try", "finally must be the last clause"))
            }
            None => {
                return Err(EvalError::invalid_form(
                    "try",
                    "body forms must precede catch and finally",
                ))
            }
        }
    }
    Ok((body, catches, finally))
}

impl Interpreter {
    /// `(if test then else?)` and `(if-not test then else?)`
    pub(crate) fn eval_if(&self, frame: &Frame, args: &[Value], negate: bool) -> Result<Step, EvalError> {
        let name = if negate { "if-not" } else { "if" };
        let (test, then, otherwise) = match args {
            [test, then] => (test, then, None),
            [test, then, otherwise] => (test, then, Some(otherwise)),
            _ => {
                return Err(EvalError::invalid_form(
                    name,
                    "expects a test, a then branch and an optional else branch",
                ))
            }
        };
        let truthy = self.eval_nested(test, &frame.env)?.is_truthy() != negate;
        let branch = if truthy { Some(then) } else { otherwise };
        Ok(match branch {
            Some(form) => Step::Continue(frame.same_tail(form.clone(), frame.env.clone())),
            None => Step::Done(Value::Nil),
        })
    }

    /// `(recur args*)`
    pub(crate) fn eval_recur(&self, frame: &Frame, args: &[Value]) -> Result<Step, EvalError> {
        let target = match (&frame.target, frame.tail) {
            (Some(target), true) => Arc::clone(target),
            _ => {
                return Err(EvalError::NotInTailPosition {
                    message: "recur can only be used in tail position of a loop or fn".to_string(),
                })
            }
        };
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_nested(arg, &frame.env)?);
        }

        let (env, body) = match target.as_ref() {
            RecurTarget::Loop {
                patterns,
                body,
                env,
            } => {
                if values.len() != patterns.len() {
                    return Err(EvalError::Arity {
                        name: "recur".to_string(),
                        accepted: patterns.len().to_string(),
                        got: values.len(),
                    });
                }
                let ns = self.globals.current_ns();
                let loop_env = env.child();
                for (pattern, value) in patterns.iter().zip(values) {
                    self.bind_pattern(&loop_env, pattern, value, &ns)?;
                }
                (loop_env, function::body_form(body))
            }
            RecurTarget::Fn { closure, arity } => {
                let clause = &closure.arities[*arity];
                let expected = clause.fixed() + usize::from(clause.is_variadic());
                if values.len() != expected {
                    return Err(EvalError::Arity {
                        name: "recur".to_string(),
                        accepted: expected.to_string(),
                        got: values.len(),
                    });
                }
                let env = self.bind_arity(closure, *arity, values, true)?;
                (env, function::body_form(&clause.body))
            }
        };
        Ok(Step::Continue(Frame {
            form: body,
            env,
            tail: true,
            target: Some(target),
        }))
    }

    /// `(throw value)`
    pub(crate) fn eval_throw(&self, args: &[Value], env: &Env) -> Result<Step, EvalError> {
        match args {
            [form] => Err(EvalError::Thrown(self.eval_nested(form, env)?)),
            _ => Err(EvalError::invalid_form("throw", "expects exactly one value")),
        }
    }

    /// `(try body* (catch Type e handler*)* (finally cleanup*)?)`
    ///
    /// The body is never in tail position. The finally body always runs;
    /// an error it raises replaces the pending outcome.
    pub(crate) fn eval_try(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let (body, catches, finally) = parse_try(args)?;

        let outcome = match self.eval_body_nested(body, env) {
            Err(err) if !matches!(err, EvalError::Interrupted) => {
                match catches.iter().find(|c| self.catches(c.selector, &err)) {
                    Some(clause) => {
                        let handler_env = env.child();
                        let ns = self.globals.current_ns();
                        self.bind_pattern(&handler_env, clause.binding, error_value(&err), &ns)
                            .and_then(|_| self.eval_body_nested(clause.body, &handler_env))
                    }
                    None => Err(err),
                }
            }
            other => other,
        };

        if let Some(cleanup) = finally {
            self.eval_body_nested(cleanup, env)?;
        }
        outcome
    }

    /// Whether a catch selector matches `err`.
    ///
    /// Symbols name exception types. Keywords name value type tags and
    /// only match thrown values.
    fn catches(&self, selector: &Value, err: &EvalError) -> bool {
        match selector {
            Value::Symbol(sym) => err.kind().is_a(sym.name()),
            Value::Keyword(kw) => match err {
                EvalError::Thrown(value) => {
                    let registry = self.globals.registry();
                    registry
                        .resolve_tag(kw, &self.globals.current_ns())
                        .is_some_and(|tag| registry.is_instance(value, &tag))
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// `(locking x body*)`
    pub(crate) fn eval_locking(&self, args: &[Value], env: &Env) -> Result<Value, EvalError> {
        let Some((target, body)) = args.split_first() else {
            return Err(EvalError::invalid_form("locking", "expects a value to lock on"));
        };
        // Keep the monitor value alive so its address is not reused while held
        let monitor = self.eval_nested(target, env)?;
        let _guard = self.globals.monitors().enter(monitor_key(&monitor));
        self.eval_body_nested(body, env)
    }
}
