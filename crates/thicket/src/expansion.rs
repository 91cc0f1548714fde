//! Macro expansion
//!
//! Macros are closures applied to unevaluated argument forms; the form they
//! return replaces the call. The evaluator expands call sites as it meets
//! them, so lexical bindings shadow macros of the same name. The
//! `macroexpand` family exposes the same steps to programs.
//!
//! ```text
//! Source → Read → Value tree → [Expansion at each call] → Eval
//! ```

use std::sync::Arc;

use log::debug;

use crate::environment::Env;
use crate::template::SyntaxQuote;
use crate::value::{Closure, Value};
use crate::{EvalError, Interpreter};

/// Tracks nested expansion depth.
#[derive(Debug, Clone, Copy)]
pub struct ExpansionContext {
    depth: usize,
    max_depth: usize,
}

impl ExpansionContext {
    /// Start at depth zero.
    pub fn new(max_depth: usize) -> Self {
        Self {
            depth: 0,
            max_depth,
        }
    }

    /// Context for one more expansion step.
    pub fn nested(&self) -> Result<Self, EvalError> {
        let depth = self.depth + 1;
        if depth > self.max_depth {
            return Err(EvalError::ExpansionLimit {
                depth,
                max: self.max_depth,
            });
        }
        Ok(Self {
            depth,
            max_depth: self.max_depth,
        })
    }

    /// Current depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Interpreter {
    /// The macro a list form invokes, unless its head is shadowed lexically.
    fn macro_of(&self, head: &Value, env: &Env) -> Option<Arc<Closure>> {
        let Value::Symbol(sym) = head else {
            return None;
        };
        if self.is_local(sym, env) {
            return None;
        }
        match self.globals.resolve_var(sym)?.get()? {
            Value::Macro(closure) => Some(closure),
            _ => None,
        }
    }

    fn apply_macro(&self, closure: &Arc<Closure>, args: &[Value]) -> Result<Value, EvalError> {
        debug!("expanding macro {}", closure.display_name());
        let frame = self.enter_closure(closure, args.to_vec())?;
        self.eval_frame(frame)
    }

    fn expand_once(&self, form: &Value, env: &Env) -> Result<Option<Value>, EvalError> {
        match form.as_list() {
            Some([head, args @ ..]) => match self.macro_of(head, env) {
                Some(closure) => self.apply_macro(&closure, args).map(Some),
                None => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn expand_fully(&self, mut form: Value, env: &Env, mut ctx: ExpansionContext) -> Result<(Value, ExpansionContext), EvalError> {
        while let Some(next) = self.expand_once(&form, env)? {
            ctx = ctx.nested()?;
            form = next;
        }
        Ok((form, ctx))
    }

    /// Expand `form` once if it is a macro call; otherwise return it as is.
    pub fn macroexpand_1(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        Ok(self.expand_once(form, env)?.unwrap_or_else(|| form.clone()))
    }

    /// Expand `form` until its head is no longer a macro.
    pub fn macroexpand(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        let ctx = ExpansionContext::new(self.ctx.max_expansion_depth);
        self.expand_fully(form.clone(), env, ctx).map(|(form, _)| form)
    }

    /// Expand every macro call in `form`, including nested ones.
    ///
    /// Quoted forms are left alone; syntax-quotes are desugared first.
    pub fn macroexpand_all(&self, form: &Value, env: &Env) -> Result<Value, EvalError> {
        self.expand_tree(form, env, ExpansionContext::new(self.ctx.max_expansion_depth))
    }

    fn expand_tree(&self, form: &Value, env: &Env, ctx: ExpansionContext) -> Result<Value, EvalError> {
        let (form, ctx) = self.expand_fully(form.clone(), env, ctx)?;
        match &form {
            Value::List(items, meta) => match items.first() {
                Some(head) if head.is_symbol_named("quote") => Ok(form.clone()),
                Some(head) if head.is_symbol_named("syntax-quote") => {
                    let desugared = self.syntax_quote_form(&items[1..])?;
                    self.expand_tree(&desugared, env, ctx)
                }
                _ => {
                    let expanded = items
                        .iter()
                        .map(|item| self.expand_tree(item, env, ctx))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(Value::List(Arc::new(expanded), meta.clone()))
                }
            },
            Value::Vector(items, meta) => {
                let expanded = items
                    .iter()
                    .map(|item| self.expand_tree(item, env, ctx))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Vector(Arc::new(expanded), meta.clone()))
            }
            Value::Map(entries, meta) => {
                let mut expanded = crate::value::ValueMap::with_capacity(entries.len());
                for (k, v) in entries.iter() {
                    expanded.insert(self.expand_tree(k, env, ctx)?, self.expand_tree(v, env, ctx)?);
                }
                Ok(Value::Map(Arc::new(expanded), meta.clone()))
            }
            _ => Ok(form),
        }
    }

    /// Desugar the argument of a `syntax-quote` form.
    pub(crate) fn syntax_quote_form(&self, args: &[Value]) -> Result<Value, EvalError> {
        match args {
            [form] => SyntaxQuote::new(&self.globals).expand(form),
            _ => Err(EvalError::invalid_form("syntax-quote", "expects exactly one form")),
        }
    }

    /// Expand a call site whose head names a macro.
    pub(crate) fn try_expand_call(&self, head: &Value, args: &[Value], env: &Env) -> Result<Option<Value>, EvalError> {
        let Some(closure) = self.macro_of(head, env) else {
            return Ok(None);
        };
        let ctx = ExpansionContext::new(self.ctx.max_expansion_depth).nested()?;
        let expanded = self.apply_macro(&closure, args)?;
        self.expand_fully(expanded, env, ctx).map(|(form, _)| Some(form))
    }
}
