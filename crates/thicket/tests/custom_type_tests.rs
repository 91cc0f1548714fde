//! Custom types: `deftype`, `deftype-of`, validators and `Object` overrides

use pretty_assertions::assert_eq;
use thicket::*;

fn with_types() -> Interpreter {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(deftype :point [x :long y :long])
             (deftype :interval [lo :long hi :long]
               (fn [i] (<= (:lo i) (:hi i))))
             (deftype-of :age :long (fn [a] (>= (:value a) 0)))",
        )
        .unwrap();
    interp
}

// ═══════════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_deftype_returns_qualified_tag() {
    let result = Interpreter::new().eval_str("(deftype :pair [a b])").unwrap();
    assert_eq!(result.pr_str(), ":user/pair");
}

#[test]
fn test_fields_are_read_like_map_keys() {
    let interp = with_types();
    assert_eq!(
        interp.eval_str("(let [p (point. 3 4)] (+ (:x p) (get p :y)))").unwrap(),
        Value::Integer(7)
    );
    assert_eq!(
        interp.eval_str("(let [{:keys [x y]} (point. 3 4)] (* x y))").unwrap(),
        Value::Integer(12)
    );
}

#[test]
fn test_constructor_checks_field_types() {
    let interp = with_types();
    let err = interp.eval_str("(point. \"3\" 4)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
    assert!(err.to_string().contains("field :x"));
}

#[test]
fn test_constructor_checks_arity() {
    let err = with_types().eval_str("(point. 1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);
}

#[test]
fn test_validator_rejects_false() {
    let interp = with_types();
    assert!(interp.eval_str("(interval. 1 5)").is_ok());
    let err = interp.eval_str("(interval. 5 1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
}

#[test]
fn test_validator_nil_result_is_accepted() {
    let interp = Interpreter::new();
    interp
        .eval_str("(deftype :loose [v] (fn [_] nil))")
        .unwrap();
    assert!(interp.eval_str("(loose. 1)").is_ok());
}

#[test]
fn test_validator_exception_becomes_assertion() {
    let interp = Interpreter::new();
    interp
        .eval_str("(deftype :strict [v] (fn [_] (throw :nope)))")
        .unwrap();
    let err = interp.eval_str("(strict. 1)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
}

#[test]
fn test_predicate() {
    let interp = with_types();
    assert_eq!(interp.eval_str("(point? (point. 1 2))").unwrap(), Value::Bool(true));
    assert_eq!(interp.eval_str("(point? {:x 1 :y 2})").unwrap(), Value::Bool(false));
}

// ═══════════════════════════════════════════════════════════════════════
// Update
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_assoc_returns_new_instance() {
    let interp = with_types();
    let result = interp
        .eval_str("(let [p (point. 1 2) q (assoc p :x 10)] [(:x p) (:x q) (point? q)])")
        .unwrap();
    assert_eq!(result.pr_str(), "[1 10 true]");
}

#[test]
fn test_assoc_revalidates() {
    let interp = with_types();
    let err = interp.eval_str("(assoc (interval. 1 5) :lo 9)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
    let err = interp.eval_str("(assoc (point. 1 2) :y :nope)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Assertion);
}

#[test]
fn test_assoc_unknown_field_fails() {
    assert!(with_types().eval_str("(assoc (point. 1 2) :z 3)").is_err());
}

// ═══════════════════════════════════════════════════════════════════════
// Wrapper Types
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_deftype_of_wraps_base_value() {
    let interp = with_types();
    assert_eq!(interp.eval_str("(:value (age. 30))").unwrap(), Value::Integer(30));
    assert_eq!(
        interp.eval_str("(age. -1)").unwrap_err().kind(),
        ErrorKind::Assertion
    );
    assert!(interp.eval_str("(age. \"30\")").is_err());
}

#[test]
fn test_wrapper_supertype_is_base() {
    let interp = with_types();
    assert_eq!(interp.eval_str("(supertype (age. 1))").unwrap(), Value::keyword("long"));
    assert_eq!(
        interp.eval_str("(instance-of? :number (age. 1))").unwrap(),
        Value::Bool(true)
    );
}

// ═══════════════════════════════════════════════════════════════════════
// Type Queries
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_type_and_supertype() {
    let interp = with_types();
    assert_eq!(interp.eval_str("(type (point. 1 2))").unwrap().pr_str(), ":user/point");
    assert_eq!(interp.eval_str("(supertype (point. 1 2))").unwrap(), Value::keyword("any"));
    assert_eq!(interp.eval_str("(type 1)").unwrap(), Value::keyword("long"));
    assert_eq!(interp.eval_str("(supertype 1)").unwrap(), Value::keyword("number"));
    assert_eq!(interp.eval_str("(supertype nil)").unwrap(), Value::Nil);
}

#[test]
fn test_instance_of() {
    let interp = with_types();
    for (src, expected) in [
        ("(instance-of? :point (point. 1 2))", true),
        ("(instance-of? :any (point. 1 2))", true),
        ("(instance-of? :collection [1])", true),
        ("(instance-of? :number \"1\")", false),
    ] {
        assert_eq!(interp.eval_str(src).unwrap(), Value::Bool(expected), "{}", src);
    }
}

#[test]
fn test_custom_type_as_parameter_hint() {
    let interp = with_types();
    interp.eval_str("(defn norm [^:point p] (+ (:x p) (:y p)))").unwrap();
    assert_eq!(interp.eval_str("(norm (point. 1 2))").unwrap(), Value::Integer(3));
    assert!(interp.eval_str("(norm {:x 1 :y 2})").is_err());
}

// ═══════════════════════════════════════════════════════════════════════
// Object Overrides
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_to_string_override() {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(deftype :money [cents :long]
               (Object (toString [this] (str \"$\" (:cents this)))))",
        )
        .unwrap();
    assert_eq!(interp.eval_str("(str (money. 5))").unwrap(), Value::string("$5"));
    assert_eq!(
        interp.eval_str("(str [(money. 5)])").unwrap(),
        Value::string("[$5]")
    );
}

#[test]
fn test_default_printing() {
    let interp = with_types();
    assert_eq!(
        interp.eval_str("(pr-str (point. 1 2))").unwrap(),
        Value::string("#:user/point{:x 1 :y 2}")
    );
}

#[test]
fn test_equals_override() {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(deftype :word [s :string]
               (Object (equals [a b] (= (count (:s a)) (count (:s b))))))",
        )
        .unwrap();
    assert_eq!(
        interp.eval_str("(= (word. \"abc\") (word. \"xyz\"))").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        interp.eval_str("(= (word. \"abc\") (word. \"xy\"))").unwrap(),
        Value::Bool(false)
    );
}

#[test]
fn test_compare_to_override_drives_sort() {
    let interp = Interpreter::new();
    interp
        .eval_str(
            "(deftype :version [n :long]
               (Object (compareTo [a b] (- (:n b) (:n a)))))",
        )
        .unwrap();
    let result = interp
        .eval_str("(map :n (sort [(version. 1) (version. 3) (version. 2)]))")
        .unwrap();
    assert_eq!(result.pr_str(), "(3 2 1)");
}

#[test]
fn test_structural_equality_without_override() {
    let interp = with_types();
    assert_eq!(
        interp.eval_str("(= (point. 1 2) (point. 1 2))").unwrap(),
        Value::Bool(true)
    );
    assert_eq!(
        interp.eval_str("(= (point. 1 2) {:x 1 :y 2})").unwrap(),
        Value::Bool(false)
    );
}
