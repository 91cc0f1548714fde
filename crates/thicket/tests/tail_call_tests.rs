//! Tail calls, `loop`/`recur` and the nesting limit

use thicket::*;

fn eval(src: &str) -> std::result::Result<Value, EvalError> {
    Interpreter::new().eval_str(src)
}

// ═══════════════════════════════════════════════════════════════════════
// loop / recur
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_recur_runs_in_constant_stack() {
    let result = eval(
        "(loop [i 0 acc 0]
           (if (> i 100000)
             acc
             (recur (inc i) (+ acc i))))",
    );
    assert_eq!(result.unwrap(), Value::Integer(5000050000));
}

#[test]
fn test_fn_recur() {
    let interp = Interpreter::new();
    interp
        .eval_str("(defn count-down [n] (if (zero? n) :done (recur (dec n))))")
        .unwrap();
    assert_eq!(
        interp.eval_str("(count-down 200000)").unwrap(),
        Value::keyword("done")
    );
}

#[test]
fn test_recur_through_let_and_do() {
    let result = eval(
        "(loop [n 5 acc []]
           (let [next (dec n)]
             (do
               (if (zero? n)
                 acc
                 (recur next (conj acc n))))))",
    );
    assert_eq!(result.unwrap().pr_str(), "[5 4 3 2 1]");
}

#[test]
fn test_recur_through_macro_expansion() {
    let result = eval(
        "(loop [n 10]
           (cond
             (zero? n) :finished
             :else (recur (dec n))))",
    );
    assert_eq!(result.unwrap(), Value::keyword("finished"));
}

#[test]
fn test_recur_with_rest_args() {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(defn total [acc & xs]
               (if xs
                 (recur (+ acc (first xs)) (next xs))
                 acc))",
        )
        .unwrap();
    assert_eq!(interp.eval_str("(total 0 1 2 3 4)").unwrap(), Value::Integer(10));
}

#[test]
fn test_recur_arity_mismatch() {
    let err = eval("(loop [a 1 b 2] (recur 1))").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
}

// ═══════════════════════════════════════════════════════════════════════
// Tail Position Checks
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_recur_in_argument_position_fails() {
    let err = eval("(loop [n 3] (+ 1 (recur (dec n))))").unwrap_err();
    assert!(matches!(err, EvalError::NotInTailPosition { .. }));
}

#[test]
fn test_recur_in_if_test_fails() {
    let err = eval("(loop [n 3] (if (recur 1) 1 2))").unwrap_err();
    assert!(matches!(err, EvalError::NotInTailPosition { .. }));
}

#[test]
fn test_recur_outside_loop_fails() {
    let err = eval("(recur 1)").unwrap_err();
    assert!(matches!(err, EvalError::NotInTailPosition { .. }));
}

#[test]
fn test_recur_before_last_body_form_fails() {
    for src in [
        "(loop [n 3] (when (pos? n) (recur (dec n)) :after))",
        "(loop [n 3] (let [m n] (recur (dec m)) m))",
        "(loop [n 3] (do (recur (dec n)) n))",
    ] {
        let err = eval(src).unwrap_err();
        assert!(matches!(err, EvalError::NotInTailPosition { .. }), "{}", src);
    }
}

#[test]
fn test_recur_as_last_body_form_succeeds() {
    for src in [
        "(loop [n 3] (when (pos? n) :step (recur (dec n))))",
        "(loop [n 3] (let [m n] (if (zero? m) :done (recur (dec m)))))",
        "(loop [n 3] (do :step (if (zero? n) :done (recur (dec n)))))",
    ] {
        assert!(eval(src).is_ok(), "{}", src);
    }
}

#[test]
fn test_recur_in_let_init_fails() {
    let err = eval("(loop [n 1] (let [x (recur 2)] x))").unwrap_err();
    assert!(matches!(err, EvalError::NotInTailPosition { .. }));
}

// ═══════════════════════════════════════════════════════════════════════
// Tail Calls Between Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_mutual_tail_calls_do_not_grow_depth() {
    let interp = Interpreter::with_context(EvalContext::with_max_call_depth(50));
    interp
        .eval_str(
            "(defn my-even? [n] (if (zero? n) true (my-odd? (dec n))))
             (defn my-odd? [n] (if (zero? n) false (my-even? (dec n))))",
        )
        .unwrap();
    assert_eq!(interp.eval_str("(my-even? 10001)").unwrap(), Value::Bool(false));
}

#[test]
fn test_non_tail_recursion_hits_depth_limit() {
    let interp = Interpreter::with_context(EvalContext::with_max_call_depth(40));
    interp
        .eval_str("(defn sum-to [n] (if (zero? n) 0 (+ n (sum-to (dec n)))))")
        .unwrap();
    assert_eq!(interp.eval_str("(sum-to 10)").unwrap(), Value::Integer(55));

    let err = interp.eval_str("(sum-to 1000)").unwrap_err();
    assert!(matches!(err, EvalError::StackOverflow { max: 40, .. }));
    assert!(err.kind().is_a("StackOverflowException"));
}

#[test]
fn test_depth_resets_after_overflow() {
    let interp = Interpreter::with_context(EvalContext::with_max_call_depth(40));
    interp
        .eval_str("(defn deep [n] (if (zero? n) 0 (inc (deep (dec n)))))")
        .unwrap();
    assert!(interp.eval_str("(deep 500)").is_err());
    assert_eq!(interp.eval_str("(deep 5)").unwrap(), Value::Integer(5));
}

// ═══════════════════════════════════════════════════════════════════════
// Native Stack
// ═══════════════════════════════════════════════════════════════════════

/// Run `f` on a thread with a small native stack.
fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 * 1024 * 1024)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_deep_recursion_within_limit_fits_small_stack() {
    let result = on_small_stack(|| {
        let interp = Interpreter::new();
        interp
            .eval_str("(defn deep [n] (if (= n 0) 0 (+ 1 (deep (- n 1)))))")
            .unwrap();
        interp.eval_str("(deep 990)").map_err(|e| e.to_string())
    });
    assert_eq!(result, Ok(Value::Integer(990)));
}

#[test]
fn test_deep_recursion_through_macros_fits_small_stack() {
    let result = on_small_stack(|| {
        let interp = Interpreter::new();
        interp
            .eval_str(
                "(defn deep [n]
                   (when (pos? n)
                     (let [r (deep (dec n))]
                       (inc (or r 0)))))",
            )
            .unwrap();
        interp.eval_str("(deep 900)").map_err(|e| e.to_string())
    });
    assert_eq!(result, Ok(Value::Integer(900)));
}

#[test]
fn test_runaway_recursion_reports_overflow_on_small_stack() {
    let kind = on_small_stack(|| {
        let interp = Interpreter::new();
        interp
            .eval_str("(defn forever [n] (+ 1 (forever n)))")
            .unwrap();
        interp.eval_str("(forever 0)").map_err(|e| e.kind())
    });
    assert_eq!(kind, Err(ErrorKind::StackOverflow));
}
