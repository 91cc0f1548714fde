//! Reader tests: literals, prefixes, metadata and error positions

use pretty_assertions::assert_eq;
use thicket::reader::{read_one, read_str};
use thicket::*;

fn read(src: &str) -> Value {
    read_one(src, "test.thk").expect("read failed")
}

// ═══════════════════════════════════════════════════════════════════════
// Literals
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_read_scalars() {
    assert_eq!(read("nil"), Value::Nil);
    assert_eq!(read("true"), Value::Bool(true));
    assert_eq!(read("-42"), Value::Integer(-42));
    assert_eq!(read("2.5"), Value::Float(2.5));
    assert_eq!(read("1.50M"), Value::Decimal(Decimal::parse("1.50").unwrap()));
    assert_eq!(read(":k"), Value::keyword("k"));
    assert_eq!(read(":geo/point"), Value::keyword("geo/point"));
    assert_eq!(read("foo"), Value::symbol("foo"));
}

#[test]
fn test_read_string_escapes() {
    assert_eq!(read(r#""a\nb\t\"c\" A""#), Value::string("a\nb\t\"c\" A"));
}

#[test]
fn test_read_collections() {
    assert_eq!(read("(1 2)").pr_str(), "(1 2)");
    assert_eq!(read("[1 [2]]").pr_str(), "[1 [2]]");
    assert_eq!(read("{:a 1, :b 2}").pr_str(), "{:a 1 :b 2}");
    assert_eq!(read("#{1}").pr_str(), "#{1}");
}

#[test]
fn test_empty_input_reads_nil() {
    assert_eq!(read("   ; only a comment"), Value::Nil);
    assert!(read_str("", "test.thk").unwrap().is_empty());
}

// ═══════════════════════════════════════════════════════════════════════
// Prefix Characters
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_prefixes_desugar_to_lists() {
    assert_eq!(read("'x").pr_str(), "(quote x)");
    assert_eq!(read("`x").pr_str(), "(syntax-quote x)");
    assert_eq!(read("~x").pr_str(), "(unquote x)");
    assert_eq!(read("~@x").pr_str(), "(unquote-splicing x)");
    assert_eq!(read("@a").pr_str(), "(deref a)");
}

#[test]
fn test_prefix_form_carries_position() {
    let form = read("\n  'x");
    assert_eq!(form.meta_get("line"), Some(Value::Integer(2)));
    assert_eq!(form.meta_get("column"), Some(Value::Integer(3)));
}

// ═══════════════════════════════════════════════════════════════════════
// Metadata
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_forms_carry_position_metadata() {
    let forms = read_str("(a)\n[b]", "pos.thk").unwrap();
    assert_eq!(forms[0].meta_get("file"), Some(Value::string("pos.thk")));
    assert_eq!(forms[1].meta_get("line"), Some(Value::Integer(2)));
    assert_eq!(forms[1].meta_get("column"), Some(Value::Integer(1)));
}

#[test]
fn test_keyword_meta_on_symbol() {
    let form = read("^:long n");
    assert_eq!(form, Value::symbol("n"));
    assert_eq!(form.meta_get("long"), Some(Value::Bool(true)));
}

#[test]
fn test_map_meta_merges() {
    let form = read("^{:doc \"d\"} [1]");
    assert_eq!(form.meta_get("doc"), Some(Value::string("d")));
    assert!(form.meta_get("line").is_some());
}

#[test]
fn test_meta_on_scalar_is_error() {
    assert!(read_one("^:k 1", "test.thk").is_err());
}

// ═══════════════════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_unterminated_list_names_closer() {
    let err = read_one("(1 2", "bad.thk").unwrap_err();
    assert!(err.message.contains("expected ')'"));
    assert_eq!(err.location.line, 1);
    assert_eq!(err.location.column, 1);
}

#[test]
fn test_mismatched_delimiter() {
    let err = read_one("[1 2)", "bad.thk").unwrap_err();
    assert!(err.message.contains("Expected ']'"));
    assert_eq!(err.location.column, 5);
}

#[test]
fn test_unterminated_string() {
    assert!(read_one("\"abc", "bad.thk").is_err());
}

#[test]
fn test_odd_map_literal() {
    assert!(read_one("{:a}", "bad.thk").is_err());
}

#[test]
fn test_parse_error_surfaces_through_interpreter() {
    let interp = Interpreter::new();
    let err = interp.eval_str("(+ 1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
}

// ═══════════════════════════════════════════════════════════════════════
// Printing Round Trip
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_pr_str_reads_back() {
    for src in ["[1 2.5 \"s\\n\" :k sym nil]", "{:a (1 2) :b #{3}}", "1.25M"] {
        let value = read(src);
        assert_eq!(read(&value.pr_str()), value);
    }
}
