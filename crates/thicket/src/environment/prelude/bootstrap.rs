//! Macros written in the language itself
//!
//! Evaluated into `core` once the natives are in place; syntax-quote
//! expansion refers to `core/apply`, `core/concat` and friends, so those
//! must already exist.

use log::debug;

use crate::environment::{CORE_NS, USER_NS};
use crate::reader;
use crate::{EvalError, Interpreter};

const BOOTSTRAP_SOURCE: &str = r#"
(defmacro when
  "Evaluates body when test is truthy."
  [test & body]
  `(if ~test (do ~@body)))

(defmacro when-not
  "Evaluates body when test is falsy."
  [test & body]
  `(if ~test nil (do ~@body)))

(defmacro cond
  "Takes test/expression pairs and evaluates the expression of the first
  truthy test."
  [& clauses]
  (when clauses
    (if (next clauses)
      `(if ~(first clauses)
         ~(second clauses)
         (cond ~@(rest (rest clauses))))
      (throw "cond requires an even number of forms"))))

(defmacro and
  ([] true)
  ([x] x)
  ([x & more]
   `(let [and# ~x]
      (if and# (and ~@more) and#))))

(defmacro or
  ([] nil)
  ([x] x)
  ([x & more]
   `(let [or# ~x]
      (if or# or# (or ~@more)))))

(defmacro ->
  "Threads x through forms as the first argument."
  [x & forms]
  (if forms
    (let [form (first forms)
          threaded (if (list? form)
                     `(~(first form) ~x ~@(rest form))
                     (list form x))]
      `(-> ~threaded ~@(rest forms)))
    x))

(defmacro ->>
  "Threads x through forms as the last argument."
  [x & forms]
  (if forms
    (let [form (first forms)
          threaded (if (list? form)
                     `(~@form ~x)
                     (list form x))]
      `(->> ~threaded ~@(rest forms)))
    x))

(defmacro future
  "Evaluates body on another thread and returns a future."
  [& body]
  `(future-call (fn [] ~@body)))

(defmacro comment [& body] nil)
"#;

/// Evaluate the bootstrap macros into `core`.
///
/// The current namespace is restored to `user` whether or not evaluation
/// succeeds.
pub(super) fn install(interp: &Interpreter) -> Result<(), EvalError> {
    let globals = interp.globals();
    globals.set_current_ns(CORE_NS);
    let result = eval_bootstrap(interp);
    globals.set_current_ns(USER_NS);
    result
}

fn eval_bootstrap(interp: &Interpreter) -> Result<(), EvalError> {
    let forms = reader::read_str(BOOTSTRAP_SOURCE, "core.thk")?;
    debug!("evaluating {} bootstrap forms", forms.len());
    for form in &forms {
        interp.eval_form(form)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{Interpreter, Value};
    use pretty_assertions::assert_eq;

    fn eval(src: &str) -> Value {
        Interpreter::new().eval_str(src).unwrap()
    }

    #[test]
    fn test_bootstrap_leaves_user_namespace_current() {
        let interp = Interpreter::new();
        assert_eq!(interp.globals().current_ns(), "user");
    }

    #[test]
    fn test_cond() {
        assert_eq!(eval("(cond false 1 nil 2 :else 3)"), Value::Integer(3));
        assert_eq!(eval("(cond false 1)"), Value::Nil);
        assert!(Interpreter::new().eval_str("(cond true)").is_err());
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eq!(eval("(and 1 nil (throw :unreached))"), Value::Nil);
        assert_eq!(eval("(or nil false 7)"), Value::Integer(7));
        assert_eq!(eval("(and)"), Value::Bool(true));
        assert_eq!(eval("(or)"), Value::Nil);
    }

    #[test]
    fn test_threading() {
        assert_eq!(eval("(-> 5 (- 2) inc)"), Value::Integer(4));
        assert_eq!(eval("(->> 5 (- 2) inc)"), Value::Integer(-2));
    }

    #[test]
    fn test_when_and_comment() {
        assert_eq!(eval("(when true 1 2)"), Value::Integer(2));
        assert_eq!(eval("(when-not true 1)"), Value::Nil);
        assert_eq!(eval("(comment (undefined-fn))"), Value::Nil);
    }
}
