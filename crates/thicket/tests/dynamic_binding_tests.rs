//! Dynamic vars: `def-dynamic`, `binding` and `set!`

use pretty_assertions::assert_eq;
use thicket::*;

fn with_dynamic_x() -> Interpreter {
    let interp = Interpreter::new();
    interp
        .eval_str("(def-dynamic x 100) (defn get-x [] x)")
        .unwrap();
    interp
}

#[test]
fn test_binding_is_visible_to_called_functions() {
    let interp = with_dynamic_x();
    let result = interp
        .eval_str("[(get-x) (binding [x 200] (get-x)) (get-x)]")
        .unwrap();
    assert_eq!(result.pr_str(), "[100 200 100]");
}

#[test]
fn test_nested_bindings_restore_in_order() {
    let interp = with_dynamic_x();
    let result = interp
        .eval_str(
            "(binding [x 200]
               [(binding [x 300] (get-x)) (get-x)])",
        )
        .unwrap();
    assert_eq!(result.pr_str(), "[300 200]");
}

#[test]
fn test_binding_saves_and_restores_across_nested_frames() {
    let interp = with_dynamic_x();
    interp
        .eval_str(
            "(def seen (atom []))
             (defn record [] (swap! seen conj (get-x)))
             (record)
             (binding [x 200]
               (record)
               (binding [x 300] (record))
               (record))
             (record)",
        )
        .unwrap();
    assert_eq!(interp.eval_str("@seen").unwrap().pr_str(), "[100 200 300 200 100]");
}

#[test]
fn test_frame_popped_when_body_fails() {
    let interp = with_dynamic_x();
    let err = interp.eval_str("(binding [x 200] (throw :boom))");
    assert!(err.is_err());
    assert_eq!(interp.eval_str("x").unwrap(), Value::Integer(100));
}

#[test]
fn test_binding_values_evaluated_before_push() {
    let interp = with_dynamic_x();
    interp.eval_str("(def-dynamic y 1)").unwrap();
    // `y` sees the outer `x`, not the one being bound alongside it
    let result = interp.eval_str("(binding [x 5 y x] [x y])").unwrap();
    assert_eq!(result.pr_str(), "[5 100]");
}

#[test]
fn test_set_inside_binding_changes_only_the_frame() {
    let interp = with_dynamic_x();
    let inner = interp
        .eval_str("(binding [x 200] (set! x 250) (get-x))")
        .unwrap();
    assert_eq!(inner, Value::Integer(250));
    assert_eq!(interp.eval_str("x").unwrap(), Value::Integer(100));
}

#[test]
fn test_set_outside_binding_changes_root() {
    let interp = with_dynamic_x();
    interp.eval_str("(set! x 7)").unwrap();
    assert_eq!(interp.eval_str("(get-x)").unwrap(), Value::Integer(7));
}

#[test]
fn test_set_on_plain_var_writes_global_slot() {
    let interp = Interpreter::new();
    interp.eval_str("(def plain 1) (defn read-plain [] plain)").unwrap();
    assert_eq!(interp.eval_str("(set! plain 2)").unwrap(), Value::Integer(2));
    assert_eq!(interp.eval_str("(read-plain)").unwrap(), Value::Integer(2));
}

#[test]
fn test_dynamic_metadata_on_def() {
    let interp = Interpreter::new();
    interp.eval_str("(def ^:dynamic *depth* 0)").unwrap();
    assert_eq!(
        interp.eval_str("(binding [*depth* 1] *depth*)").unwrap(),
        Value::Integer(1)
    );
}

#[test]
fn test_binding_plain_var_fails() {
    let interp = Interpreter::new();
    interp.eval_str("(def plain 1)").unwrap();
    let err = interp.eval_str("(binding [plain 2] plain)").unwrap_err();
    assert!(err.to_string().contains("non-dynamic"));
}

#[test]
fn test_binding_unknown_var_fails() {
    let err = Interpreter::new()
        .eval_str("(binding [missing 2] 1)")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SymbolNotFound);
}

#[test]
fn test_rebinding_in_future_stays_on_its_thread() {
    let interp = with_dynamic_x();
    let result = interp
        .eval_str(
            "(binding [x 200]
               (let [f (future (binding [x 300] (get-x)))]
                 [@f (get-x)]))",
        )
        .unwrap();
    assert_eq!(result.pr_str(), "[300 200]");
}

#[test]
fn test_future_sees_bindings_at_creation() {
    let interp = with_dynamic_x();
    let result = interp
        .eval_str(
            "(let [f (binding [x 200] (future (get-x)))]
               [@f (get-x)])",
        )
        .unwrap();
    assert_eq!(result.pr_str(), "[200 100]");
}
