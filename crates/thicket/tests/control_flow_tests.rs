//! Exceptions (`throw`, `try`/`catch`/`finally`) and `locking`

use pretty_assertions::assert_eq;
use thicket::*;

fn eval(src: &str) -> std::result::Result<Value, EvalError> {
    Interpreter::new().eval_str(src)
}

// ═══════════════════════════════════════════════════════════════════════
// throw / catch
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_uncaught_throw_surfaces_value() {
    let err = eval("(throw {:code 7})").unwrap_err();
    match err {
        EvalError::Thrown(value) => assert_eq!(value.pr_str(), "{:code 7}"),
        other => panic!("expected thrown value, got {:?}", other),
    }
}

#[test]
fn test_catch_by_exception_name() {
    let result = eval(
        "(try
           ((fn [a] a))
           (catch ArityException e :arity)
           (catch RuntimeException e :other))",
    );
    assert_eq!(result.unwrap(), Value::keyword("arity"));
}

#[test]
fn test_catch_by_supertype_name() {
    assert_eq!(
        eval("(try (undefined-thing) (catch RuntimeException e :caught))").unwrap(),
        Value::keyword("caught")
    );
    assert_eq!(
        eval("(try (throw 1) (catch Throwable e e))").unwrap(),
        Value::Integer(1)
    );
}

#[test]
fn test_unmatched_catch_propagates() {
    let err = eval("(try (/ 1 0) (catch ArityException e :nope))").unwrap_err();
    assert_ne!(err.kind(), ErrorKind::Arity);
}

#[test]
fn test_builtin_error_binds_type_and_message() {
    let result = eval(
        "(try
           (assert false \"broken\")
           (catch AssertionException e [(:type e) (:message e)]))",
    )
    .unwrap();
    let items = result.as_vector().unwrap();
    assert_eq!(items[0], Value::symbol("AssertionException"));
    assert!(items[1].as_str().unwrap().contains("broken"));
}

#[test]
fn test_catch_thrown_value_by_type_tag() {
    assert_eq!(
        eval("(try (throw \"oops\") (catch :number e :num) (catch :string e (str e \"!\")))").unwrap(),
        Value::string("oops!")
    );
    assert_eq!(
        eval("(try (throw 2.5) (catch :number e :num))").unwrap(),
        Value::keyword("num")
    );
}

#[test]
fn test_catch_custom_type() {
    let interp = Interpreter::new();
    interp
        .eval_str("(deftype :app-error [code :long])")
        .unwrap();
    let result = interp
        .eval_str("(try (throw (app-error. 42)) (catch :app-error e (:code e)))")
        .unwrap();
    assert_eq!(result, Value::Integer(42));
}

#[test]
fn test_type_tag_selector_ignores_builtin_errors() {
    let err = eval("(try (/ 1 0) (catch :any e :caught))").unwrap_err();
    assert_ne!(err.kind(), ErrorKind::Value);
}

#[test]
fn test_ex_message() {
    let message = eval("(try (assert false \"m\") (catch Exception e (ex-message e)))").unwrap();
    assert_eq!(message, Value::string("Assertion failed: m"));
    assert_eq!(
        eval("(try (throw \"plain\") (catch Exception e (ex-message e)))").unwrap(),
        Value::string("plain")
    );
}

#[test]
fn test_catch_binding_can_destructure() {
    assert_eq!(
        eval("(try (throw {:code 3}) (catch :map {:keys [code]} code))").unwrap(),
        Value::Integer(3)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// finally
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_finally_runs_on_success_and_keeps_value() {
    let interp = Interpreter::new();
    interp.eval_str("(def log (atom []))").unwrap();
    let result = interp
        .eval_str("(try :body (finally (swap! log conj :finally)))")
        .unwrap();
    assert_eq!(result, Value::keyword("body"));
    assert_eq!(interp.eval_str("@log").unwrap().pr_str(), "[:finally]");
}

#[test]
fn test_finally_runs_after_catch() {
    let interp = Interpreter::new();
    interp.eval_str("(def log (atom []))").unwrap();
    let result = interp
        .eval_str(
            "(try
               (throw :x)
               (catch :keyword e (swap! log conj :caught) :handled)
               (finally (swap! log conj :finally)))",
        )
        .unwrap();
    assert_eq!(result, Value::keyword("handled"));
    assert_eq!(interp.eval_str("@log").unwrap().pr_str(), "[:caught :finally]");
}

#[test]
fn test_finally_runs_when_error_propagates() {
    let interp = Interpreter::new();
    interp.eval_str("(def cleaned (atom false))").unwrap();
    assert!(interp
        .eval_str("(try (throw :x) (finally (reset! cleaned true)))")
        .is_err());
    assert_eq!(interp.eval_str("@cleaned").unwrap(), Value::Bool(true));
}

#[test]
fn test_error_in_finally_replaces_outcome() {
    let err = eval("(try (throw :first) (finally (throw :second)))").unwrap_err();
    assert!(matches!(err, EvalError::Thrown(ref v) if *v == Value::keyword("second")));
}

#[test]
fn test_try_body_is_not_tail_position() {
    let err = eval("(loop [n 1] (try (recur 2)))").unwrap_err();
    assert!(matches!(err, EvalError::NotInTailPosition { .. }));
}

#[test]
fn test_malformed_try() {
    let err = eval("(try 1 (finally 2) (catch Exception e 3))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

// ═══════════════════════════════════════════════════════════════════════
// locking
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_locking_returns_body_value() {
    assert_eq!(
        eval("(let [m (atom 0)] (locking m (+ 1 2)))").unwrap(),
        Value::Integer(3)
    );
}

#[test]
fn test_locking_is_reentrant() {
    assert_eq!(
        eval("(let [m (atom 0)] (locking m (locking m :inner)))").unwrap(),
        Value::keyword("inner")
    );
}

#[test]
fn test_equal_values_are_separate_monitors() {
    let result = eval(
        "(let [a [1] b [1]]
           (locking a (deref (future (locking b :inner)) 2000 :blocked)))",
    );
    assert_eq!(result.unwrap(), Value::keyword("inner"));
}

#[test]
fn test_lock_released_after_error() {
    let interp = Interpreter::new();
    interp.eval_str("(def m (atom 0))").unwrap();
    assert!(interp.eval_str("(locking m (throw :x))").is_err());
    let result = interp
        .eval_str("@(future (locking m :acquired))")
        .unwrap();
    assert_eq!(result, Value::keyword("acquired"));
}
