//! Evaluation tests: literals, special forms, functions and namespaces

use pretty_assertions::assert_eq;
use thicket::*;

fn eval(src: &str) -> std::result::Result<Value, EvalError> {
    Interpreter::new().eval_str(src)
}

fn printed(src: &str) -> String {
    eval(src).expect("eval failed").pr_str()
}

// ═══════════════════════════════════════════════════════════════════════
// Literal Evaluation
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_scalars_self_evaluate() {
    assert_eq!(eval("42").unwrap(), Value::Integer(42));
    assert_eq!(eval("\"hi\"").unwrap(), Value::string("hi"));
    assert_eq!(eval(":k").unwrap(), Value::keyword("k"));
    assert_eq!(eval("nil").unwrap(), Value::Nil);
    assert_eq!(eval("()").unwrap(), Value::list(vec![]));
}

#[test]
fn test_collections_evaluate_elements() {
    assert_eq!(printed("[1 (+ 1 1) [3]]"), "[1 2 [3]]");
    assert_eq!(printed("{:a (+ 1 2)}"), "{:a 3}");
    assert_eq!(printed("#{(inc 0)}"), "#{1}");
}

#[test]
fn test_quote_returns_form_unevaluated() {
    assert_eq!(printed("'(+ 1 2)"), "(+ 1 2)");
    assert_eq!(eval("(quote x)").unwrap(), Value::symbol("x"));
}

#[test]
fn test_unknown_symbol() {
    let err = eval("nope").unwrap_err();
    assert!(matches!(err, EvalError::SymbolNotFound { ref name } if name == "nope"));
}

// ═══════════════════════════════════════════════════════════════════════
// Conditionals and Sequencing
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_if_truthiness() {
    assert_eq!(eval("(if 0 :yes :no)").unwrap(), Value::keyword("yes"));
    assert_eq!(eval("(if nil :yes :no)").unwrap(), Value::keyword("no"));
    assert_eq!(eval("(if false :yes)").unwrap(), Value::Nil);
    assert_eq!(eval("(if-not false :yes :no)").unwrap(), Value::keyword("yes"));
}

#[test]
fn test_do_returns_last() {
    assert_eq!(eval("(do 1 2 3)").unwrap(), Value::Integer(3));
    assert_eq!(eval("(do)").unwrap(), Value::Nil);
}

#[test]
fn test_let_is_sequential() {
    assert_eq!(eval("(let [a 1 b (+ a 1)] (* a b))").unwrap(), Value::Integer(2));
    assert_eq!(eval("(let* [x 5] x)").unwrap(), Value::Integer(5));
}

#[test]
fn test_let_shadowing_is_lexical() {
    assert_eq!(
        eval("(let [x 1] (let [x 2] x))").unwrap(),
        Value::Integer(2)
    );
    assert_eq!(
        eval("(let [x 1] (let [y 2] x))").unwrap(),
        Value::Integer(1)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Functions
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_fn_and_closure_capture() {
    assert_eq!(
        eval("(let [n 10 add (fn [x] (+ x n))] (add 5))").unwrap(),
        Value::Integer(15)
    );
}

#[test]
fn test_named_fn_can_recurse() {
    assert_eq!(
        eval("((fn fact [n] (if (<= n 1) 1 (* n (fact (dec n))))) 5)").unwrap(),
        Value::Integer(120)
    );
}

#[test]
fn test_defn_and_call() {
    let interp = Interpreter::new();
    let name = interp.eval_str("(defn square \"Squares.\" [x] (* x x))").unwrap();
    assert_eq!(name, Value::symbol("user/square"));
    assert_eq!(interp.eval_str("(square 9)").unwrap(), Value::Integer(81));
}

#[test]
fn test_multi_arity_dispatch() {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(defn arity
               ([] 0)
               ([a] 1)
               ([a b] 2)
               ([a b c] 3))",
        )
        .unwrap();
    for (call, expected) in [("(arity)", 0), ("(arity 1)", 1), ("(arity 1 2)", 2), ("(arity 1 2 3)", 3)] {
        assert_eq!(interp.eval_str(call).unwrap(), Value::Integer(expected));
    }
    let err = interp.eval_str("(arity 1 2 3 4)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
}

#[test]
fn test_fixed_arity_preferred_over_variadic() {
    let interp = Interpreter::new();
    interp
        .eval_str("(defn pick ([a] :one) ([a & more] :many))")
        .unwrap();
    assert_eq!(interp.eval_str("(pick 1)").unwrap(), Value::keyword("one"));
    assert_eq!(interp.eval_str("(pick 1 2)").unwrap(), Value::keyword("many"));
}

#[test]
fn test_rest_args_collect_into_list_or_nil() {
    assert_eq!(printed("((fn [a & more] more) 1 2 3)"), "(2 3)");
    assert_eq!(eval("((fn [a & more] more) 1)").unwrap(), Value::Nil);
}

#[test]
fn test_precondition() {
    let interp = Interpreter::new();
    interp
        .eval_str("(defn positive [x] {:pre [(pos? x)]} x)")
        .unwrap();
    assert_eq!(interp.eval_str("(positive 3)").unwrap(), Value::Integer(3));
    let err = interp.eval_str("(positive -3)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
    assert!(err.to_string().contains("Precondition failed"));
}

#[test]
fn test_type_hinted_parameter() {
    let interp = Interpreter::new();
    interp.eval_str("(defn twice [^:long n] (* 2 n))").unwrap();
    assert_eq!(interp.eval_str("(twice 4)").unwrap(), Value::Integer(8));

    let err = interp.eval_str("(twice \"4\")").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
    assert!(interp.eval_str("(twice nil)").is_err());
}

#[test]
fn test_nilable_hint_accepts_nil() {
    let interp = Interpreter::new();
    interp
        .eval_str("(defn describe [^:number? n] (if n :number :none))")
        .unwrap();
    assert_eq!(interp.eval_str("(describe nil)").unwrap(), Value::keyword("none"));
    assert_eq!(interp.eval_str("(describe 1.5)").unwrap(), Value::keyword("number"));
    assert!(interp.eval_str("(describe :x)").is_err());
}

#[test]
fn test_higher_order_builtins() {
    assert_eq!(printed("(map inc [1 2 3])"), "(2 3 4)");
    assert_eq!(printed("(filter even? (range 7))"), "(0 2 4 6)");
    assert_eq!(eval("(apply + 1 2 [3 4])").unwrap(), Value::Integer(10));
    assert_eq!(eval("(reduce (fn [acc x] (+ acc x)) 0 [1 2 3])").unwrap(), Value::Integer(6));
}

#[test]
fn test_keywords_and_maps_as_functions() {
    assert_eq!(eval("(:a {:a 1})").unwrap(), Value::Integer(1));
    assert_eq!(eval("({:a 1} :b :missing)").unwrap(), Value::keyword("missing"));
    assert_eq!(printed("(map :x [{:x 1} {:x 2}])"), "(1 2)");
}

// ═══════════════════════════════════════════════════════════════════════
// Globals and Namespaces
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_def_redefines() {
    let interp = Interpreter::new();
    interp.eval_str("(def x 1) (def x 2)").unwrap();
    assert_eq!(interp.eval_str("x").unwrap(), Value::Integer(2));
}

#[test]
fn test_core_is_reachable_qualified() {
    assert_eq!(eval("(core/+ 1 2)").unwrap(), Value::Integer(3));
}

#[test]
fn test_qualified_lookup_failure_is_distinct() {
    let err = eval("nowhere/thing").unwrap_err();
    assert!(matches!(err, EvalError::QualifiedNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn test_user_definition_shadows_core() {
    let interp = Interpreter::new();
    interp.eval_str("(defn inc [x] (+ x 100))").unwrap();
    assert_eq!(interp.eval_str("(inc 1)").unwrap(), Value::Integer(101));
    assert_eq!(interp.eval_str("(core/inc 1)").unwrap(), Value::Integer(2));
}

#[test]
fn test_equality() {
    assert_eq!(eval("(= [1 2] '(1 2))").unwrap(), Value::Bool(true));
    assert_eq!(eval("(= {:a 1} {:a 1.0})").unwrap(), Value::Bool(true));
    assert_eq!(eval("(== [1 2] '(1 2))").unwrap(), Value::Bool(false));
    assert_eq!(eval("(not= 1 2)").unwrap(), Value::Bool(true));
}

#[test]
fn test_numeric_contagion() {
    assert_eq!(eval("(+ 1 2.5)").unwrap(), Value::Float(3.5));
    assert_eq!(printed("(+ 1 1.50M)"), "2.50M");
    assert_eq!(eval("(/ 7 2)").unwrap(), Value::Integer(3));
    assert!(eval("(/ 1 0)").is_err());
}

#[test]
fn test_host_config_from_json() {
    let config: EvalConfig =
        serde_json::from_str(r#"{"max_call_depth": 64, "trace": false}"#).unwrap();
    assert_eq!(config.max_call_depth, 64);
    assert_eq!(config.max_expansion_depth, EvalConfig::default().max_expansion_depth);
    let interp = Interpreter::from_config(&config);
    assert_eq!(interp.context().max_call_depth, 64);
    assert_eq!(interp.eval_str("(+ 1 1)").unwrap(), Value::Integer(2));
}
