//! Form evaluation
//!
//! The evaluator is a trampoline: [`Interpreter::eval_frame`] loops over
//! [`Frame`]s, and every special form or call whose result *is* the result
//! of the current frame (if branches, the last form of a body, closure
//! application, `recur`) hands back a replacement frame instead of
//! recursing. Only sub-evaluations whose value is consumed further (call
//! arguments, `let` inits, `try` bodies) nest a new `eval_frame`, and only
//! those count towards [`EvalContext::max_call_depth`](crate::EvalContext).

pub mod call;
pub mod control;
pub mod function;
pub mod item;
pub mod literal;
pub mod local;
pub mod path;
pub mod pattern;
pub mod typedef;

use std::cell::Cell;
use std::sync::Arc;

use log::trace;

use crate::environment::Env;
use crate::value::{Closure, Value};
use crate::{EvalError, Interpreter};

pub use control::RecurTarget;

// ═══════════════════════════════════════════════════════════════════════
// Trampoline State
// ═══════════════════════════════════════════════════════════════════════

/// One trampoline state: a form, its environment and its tail context.
#[derive(Clone)]
pub struct Frame {
    /// Form to evaluate
    pub form: Value,
    /// Lexical environment
    pub env: Env,
    /// Whether `form` is in tail position of the enclosing loop or fn body
    pub tail: bool,
    /// Re-entry point for `recur`, if any
    pub target: Option<Arc<RecurTarget>>,
}

impl Frame {
    /// A non-tail frame with no recur target.
    pub fn nested(form: Value, env: Env) -> Self {
        Self {
            form,
            env,
            tail: false,
            target: None,
        }
    }

    /// A frame that keeps this frame's tail context.
    pub fn same_tail(&self, form: Value, env: Env) -> Self {
        Self {
            form,
            env,
            tail: self.tail,
            target: self.target.clone(),
        }
    }
}

/// Outcome of one trampoline step.
pub enum Step {
    /// The frame produced its value
    Done(Value),
    /// Replace the current frame and keep looping
    Continue(Frame),
}

/// Remaining native stack below which a nested trampoline grows the stack
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
/// Size of each additional stack segment
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts nested `eval_frame` calls on this thread.
struct DepthGuard;

impl DepthGuard {
    fn enter(max: usize) -> Result<Self, EvalError> {
        let depth = DEPTH.with(|d| d.get()) + 1;
        if depth > max {
            return Err(EvalError::StackOverflow { depth, max });
        }
        DEPTH.with(|d| d.set(depth));
        Ok(DepthGuard)
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Special Forms
// ═══════════════════════════════════════════════════════════════════════

/// Forms the evaluator handles itself rather than by function application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialForm {
    /// `quote`
    Quote,
    /// `syntax-quote`
    SyntaxQuote,
    /// `unquote` (only legal inside a syntax-quote)
    Unquote,
    /// `unquote-splicing` (only legal inside a syntax-quote)
    UnquoteSplicing,
    /// `do`
    Do,
    /// `if`
    If,
    /// `if-not`
    IfNot,
    /// `let`, `let*`
    Let,
    /// `fn`, `fn*`
    Fn,
    /// `defn`
    Defn,
    /// `defmacro`
    Defmacro,
    /// `loop`
    Loop,
    /// `recur`
    Recur,
    /// `try`
    Try,
    /// `throw`
    Throw,
    /// `def`
    Def,
    /// `defonce`
    Defonce,
    /// `def-dynamic`
    DefDynamic,
    /// `binding`
    Binding,
    /// `set!`
    Set,
    /// `deftype`
    Deftype,
    /// `deftype-of`
    DeftypeOf,
    /// `defprotocol`
    Defprotocol,
    /// `extend`
    Extend,
    /// `defmulti`
    Defmulti,
    /// `defmethod`
    Defmethod,
    /// `locking`
    Locking,
    /// `ns`
    Ns,
}

impl SpecialForm {
    /// Look up a special form by its (unqualified) symbol name.
    pub fn from_name(name: &str) -> Option<SpecialForm> {
        Some(match name {
            "quote" => SpecialForm::Quote,
            "syntax-quote" => SpecialForm::SyntaxQuote,
            "unquote" => SpecialForm::Unquote,
            "unquote-splicing" => SpecialForm::UnquoteSplicing,
            "do" => SpecialForm::Do,
            "if" => SpecialForm::If,
            "if-not" => SpecialForm::IfNot,
            "let" | "let*" => SpecialForm::Let,
            "fn" | "fn*" => SpecialForm::Fn,
            "defn" => SpecialForm::Defn,
            "defmacro" => SpecialForm::Defmacro,
            "loop" => SpecialForm::Loop,
            "recur" => SpecialForm::Recur,
            "try" => SpecialForm::Try,
            "throw" => SpecialForm::Throw,
            "def" => SpecialForm::Def,
            "defonce" => SpecialForm::Defonce,
            "def-dynamic" => SpecialForm::DefDynamic,
            "binding" => SpecialForm::Binding,
            "set!" => SpecialForm::Set,
            "deftype" => SpecialForm::Deftype,
            "deftype-of" => SpecialForm::DeftypeOf,
            "defprotocol" => SpecialForm::Defprotocol,
            "extend" => SpecialForm::Extend,
            "defmulti" => SpecialForm::Defmulti,
            "defmethod" => SpecialForm::Defmethod,
            "locking" => SpecialForm::Locking,
            "ns" => SpecialForm::Ns,
            _ => return None,
        })
    }

    /// Special form named by the head of a list form, if any.
    pub fn of(head: &Value) -> Option<SpecialForm> {
        match head {
            Value::Symbol(s) if !s.is_qualified() => SpecialForm::from_name(s.name()),
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Main Dispatcher
// ═══════════════════════════════════════════════════════════════════════

impl Interpreter {
    /// Run the trampoline until `frame` produces a value.
    ///
    /// Each nested trampoline grows the native stack on demand, so the
    /// depth limit rather than the host thread's stack size bounds recursion.
    pub(crate) fn eval_frame(&self, frame: Frame) -> Result<Value, EvalError> {
        let _depth = DepthGuard::enter(self.ctx.max_call_depth)?;
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.run_trampoline(frame))
    }

    fn run_trampoline(&self, mut frame: Frame) -> Result<Value, EvalError> {
        loop {
            // Check for interruption before each step
            if self.ctx.is_interrupted() {
                return Err(EvalError::Interrupted);
            }
            match self.step(frame)? {
                Step::Done(value) => return Ok(value),
                Step::Continue(next) => frame = next,
            }
        }
    }

    /// Evaluate `form` in a nested, non-tail context.
    pub(crate) fn eval_nested(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        match form {
            // Fast paths that cannot recurse
            Value::Symbol(sym) => self.resolve_symbol(sym, env),
            Value::List(..) | Value::Vector(..) | Value::Map(..) | Value::Set(..) => {
                self.eval_frame(Frame::nested(form.clone(), env.clone()))
            }
            other => Ok(other.clone()),
        }
    }

    /// Evaluate `forms` in order, non-tail; returns the last value or nil.
    pub(crate) fn eval_body_nested(&self, forms: &[Value], env: &Env) -> Result<Value, EvalError> {
        let mut result = Value::Nil;
        for form in forms {
            result = self.eval_nested(form, env)?;
        }
        Ok(result)
    }

    /// Evaluate all but the last form; continue with the last in tail context.
    pub(crate) fn step_body(&self, frame: &Frame, forms: &[Value], env: Env) -> Result<Step, EvalError> {
        match forms.split_last() {
            None => Ok(Step::Done(Value::Nil)),
            Some((last, init)) => {
                for form in init {
                    self.eval_nested(form, &env)?;
                }
                Ok(Step::Continue(frame.same_tail(last.clone(), env)))
            }
        }
    }

    fn step(&self, frame: Frame) -> Result<Step, EvalError> {
        let items = match &frame.form {
            Value::Symbol(sym) => return self.resolve_symbol(sym, &frame.env).map(Step::Done),
            Value::List(items, _) => Arc::clone(items),
            Value::Vector(..) | Value::Map(..) | Value::Set(..) => {
                return self.eval_collection(&frame.form, &frame.env).map(Step::Done)
            }
            other => return Ok(Step::Done(other.clone())),
        };

        let Some(head) = items.first() else {
            return Ok(Step::Done(frame.form.clone()));
        };
        let args = &items[1..];

        if let Some(special) = SpecialForm::of(head) {
            if self.ctx.trace {
                trace!("{:?} {}", special, frame.form);
            }
            return self.eval_special(special, &frame, args);
        }

        if let Some(expansion) = self.try_expand_call(head, args, &frame.env)? {
            return Ok(Step::Continue(frame.same_tail(expansion, frame.env.clone())));
        }

        let callee = self.eval_nested(head, &frame.env)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_nested(arg, &frame.env)?);
        }
        self.step_apply(&callee, values)
    }

    fn eval_special(&self, special: SpecialForm, frame: &Frame, args: &[Value]) -> Result<Step, EvalError> {
        let env = &frame.env;
        match special {
            SpecialForm::Quote => literal::eval_quote(args).map(Step::Done),
            SpecialForm::SyntaxQuote => {
                let expanded = self.syntax_quote_form(args)?;
                Ok(Step::Continue(frame.same_tail(expanded, env.clone())))
            }
            SpecialForm::Unquote | SpecialForm::UnquoteSplicing => Err(EvalError::invalid_form(
                if special == SpecialForm::Unquote {
                    "unquote"
                } else {
                    "unquote-splicing"
                },
                "not inside a syntax-quote",
            )),
            SpecialForm::Do => self.step_body(frame, args, env.clone()),
            SpecialForm::If => self.eval_if(frame, args, false),
            SpecialForm::IfNot => self.eval_if(frame, args, true),
            SpecialForm::Let => self.eval_let(frame, args),
            SpecialForm::Fn => self.eval_fn(args, env).map(Step::Done),
            SpecialForm::Defn => self.eval_defn(args, env, false).map(Step::Done),
            SpecialForm::Defmacro => self.eval_defn(args, env, true).map(Step::Done),
            SpecialForm::Loop => self.eval_loop(frame, args),
            SpecialForm::Recur => self.eval_recur(frame, args),
            SpecialForm::Try => self.eval_try(args, env).map(Step::Done),
            SpecialForm::Throw => self.eval_throw(args, env),
            SpecialForm::Def => self.eval_def(args, env).map(Step::Done),
            SpecialForm::Defonce => self.eval_defonce(args, env).map(Step::Done),
            SpecialForm::DefDynamic => self.eval_def_dynamic(args, env).map(Step::Done),
            SpecialForm::Binding => self.eval_binding(args, env).map(Step::Done),
            SpecialForm::Set => self.eval_set(args, env).map(Step::Done),
            SpecialForm::Deftype => self.eval_deftype(args, env).map(Step::Done),
            SpecialForm::DeftypeOf => self.eval_deftype_of(args, env).map(Step::Done),
            SpecialForm::Defprotocol => self.eval_defprotocol(args, env).map(Step::Done),
            SpecialForm::Extend => self.eval_extend(args, env).map(Step::Done),
            SpecialForm::Defmulti => self.eval_defmulti(args, env).map(Step::Done),
            SpecialForm::Defmethod => self.eval_defmethod(args, env).map(Step::Done),
            SpecialForm::Locking => self.eval_locking(args, env).map(Step::Done),
            SpecialForm::Ns => self.eval_ns(args).map(Step::Done),
        }
    }

    /// Start evaluating a closure body for `args` as a fresh trampoline frame.
    pub(crate) fn enter_closure(&self, closure: &Arc<Closure>, args: Vec<Value>) -> Result<Frame, EvalError> {
        let index = closure.select_arity_index(args.len())?;
        let target = Arc::new(RecurTarget::Fn {
            closure: Arc::clone(closure),
            arity: index,
        });
        let env = self.bind_arity(closure, index, args, false)?;
        let body = function::body_form(&closure.arities[index].body);
        Ok(Frame {
            form: body,
            env,
            tail: true,
            target: Some(target),
        })
    }
}
