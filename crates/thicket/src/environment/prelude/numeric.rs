//! Arithmetic, comparison and numeric predicates
//!
//! Mixed operands follow the contagion order long < decimal < double.
//! Long arithmetic is checked: overflow raises instead of wrapping.
//! Long division truncates towards zero.

use std::cmp::Ordering;

use super::{define, expect_int};
use crate::value::{numeric_cmp, Decimal, Value};
use crate::{EvalError, Interpreter};

pub(super) fn install(interp: &Interpreter) {
    define(interp, "+", 0, None, builtin_add);
    define(interp, "-", 1, None, builtin_sub);
    define(interp, "*", 0, None, builtin_mul);
    define(interp, "/", 1, None, builtin_div);
    define(interp, "inc", 1, Some(1), builtin_inc);
    define(interp, "dec", 1, Some(1), builtin_dec);
    define(interp, "mod", 2, Some(2), builtin_mod);

    define(interp, "<", 1, None, builtin_lt);
    define(interp, ">", 1, None, builtin_gt);
    define(interp, "<=", 1, None, builtin_le);
    define(interp, ">=", 1, None, builtin_ge);
    define(interp, "=", 1, None, builtin_eq);
    define(interp, "==", 1, None, builtin_strict_eq);
    define(interp, "not=", 1, None, builtin_not_eq);

    define(interp, "number?", 1, Some(1), |_, args| Ok(Value::Bool(args[0].is_number())));
    define(interp, "zero?", 1, Some(1), |_, args| sign_test(&args[0], Ordering::is_eq));
    define(interp, "pos?", 1, Some(1), |_, args| sign_test(&args[0], Ordering::is_gt));
    define(interp, "neg?", 1, Some(1), |_, args| sign_test(&args[0], Ordering::is_lt));
    define(interp, "even?", 1, Some(1), |_, args| Ok(Value::Bool(expect_int(&args[0])? % 2 == 0)));
    define(interp, "odd?", 1, Some(1), |_, args| Ok(Value::Bool(expect_int(&args[0])? % 2 != 0)));
}

// ═══════════════════════════════════════════════════════════════════════
// Arithmetic
// ═══════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
    Div,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Div => "/",
        }
    }
}

fn to_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Integer(n) => Some(Decimal::from_i64(*n)),
        Value::Decimal(d) => Some(d.clone()),
        _ => None,
    }
}

fn overflow(op: Op) -> EvalError {
    EvalError::runtime(format!("Long overflow in '{}'", op.symbol()))
}

fn divide_by_zero() -> EvalError {
    EvalError::runtime("Divide by zero")
}

/// Apply `op` to two numbers.
fn arith(op: Op, a: &Value, b: &Value) -> Result<Value, EvalError> {
    for operand in [a, b] {
        if !operand.is_number() {
            return Err(EvalError::type_error("number", operand));
        }
    }
    match (a, b) {
        (Value::Integer(x), Value::Integer(y)) => {
            let result = match op {
                Op::Add => x.checked_add(*y).ok_or_else(|| overflow(op))?,
                Op::Sub => x.checked_sub(*y).ok_or_else(|| overflow(op))?,
                Op::Mul => x.checked_mul(*y).ok_or_else(|| overflow(op))?,
                Op::Div => {
                    if *y == 0 {
                        return Err(divide_by_zero());
                    }
                    x.checked_div(*y).ok_or_else(|| overflow(op))?
                }
            };
            Ok(Value::Integer(result))
        }
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            let (x, y) = match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(EvalError::type_error("number", a)),
            };
            Ok(Value::Float(match op {
                Op::Add => x + y,
                Op::Sub => x - y,
                Op::Mul => x * y,
                Op::Div => x / y,
            }))
        }
        _ => {
            let (x, y) = match (to_decimal(a), to_decimal(b)) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(EvalError::type_error("number", a)),
            };
            Ok(Value::Decimal(match op {
                Op::Add => x.add(&y),
                Op::Sub => x.sub(&y),
                Op::Mul => x.mul(&y),
                Op::Div => x.div(&y).ok_or_else(divide_by_zero)?,
            }))
        }
    }
}

fn fold(op: Op, init: Value, args: &[Value]) -> Result<Value, EvalError> {
    args.iter().try_fold(init, |acc, x| arith(op, &acc, x))
}

fn builtin_add(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args.split_first() {
        None => Ok(Value::Integer(0)),
        Some((first, rest)) => {
            if !first.is_number() {
                return Err(EvalError::type_error("number", first));
            }
            fold(Op::Add, first.clone(), rest)
        }
    }
}

fn builtin_sub(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [only] => arith(Op::Sub, &Value::Integer(0), only),
        [first, rest @ ..] => fold(Op::Sub, first.clone(), rest),
        [] => unreachable!("arity checked by NativeFn"),
    }
}

fn builtin_mul(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args.split_first() {
        None => Ok(Value::Integer(1)),
        Some((first, rest)) => {
            if !first.is_number() {
                return Err(EvalError::type_error("number", first));
            }
            fold(Op::Mul, first.clone(), rest)
        }
    }
}

fn builtin_div(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [only] => arith(Op::Div, &Value::Integer(1), only),
        [first, rest @ ..] => fold(Op::Div, first.clone(), rest),
        [] => unreachable!("arity checked by NativeFn"),
    }
}

fn builtin_inc(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    arith(Op::Add, &args[0], &Value::Integer(1))
}

fn builtin_dec(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    arith(Op::Sub, &args[0], &Value::Integer(1))
}

/// Floored modulus: the result takes the sign of the divisor.
fn builtin_mod(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Integer(_), Value::Integer(0)) => Err(divide_by_zero()),
        (Value::Integer(x), Value::Integer(y)) => {
            let r = x.checked_rem(*y).unwrap_or(0);
            Ok(Value::Integer(if r != 0 && (r < 0) != (*y < 0) { r + y } else { r }))
        }
        (a, b) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => Ok(Value::Float(x - y * (x / y).floor())),
            (None, _) => Err(EvalError::type_error("number", a)),
            (_, None) => Err(EvalError::type_error("number", b)),
        },
    }
}

// ═══════════════════════════════════════════════════════════════════════
// Comparison
// ═══════════════════════════════════════════════════════════════════════

fn compare_chain(args: &[Value], accept: fn(Ordering) -> bool) -> Result<Value, EvalError> {
    for pair in args.windows(2) {
        let ordering = numeric_cmp(&pair[0], &pair[1]).ok_or_else(|| {
            let culprit = if pair[0].is_number() { &pair[1] } else { &pair[0] };
            EvalError::type_error("number", culprit)
        })?;
        if !accept(ordering) {
            return Ok(Value::Bool(false));
        }
    }
    if let [only] = args {
        if !only.is_number() {
            return Err(EvalError::type_error("number", only));
        }
    }
    Ok(Value::Bool(true))
}

fn builtin_lt(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(args, Ordering::is_lt)
}

fn builtin_gt(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(args, Ordering::is_gt)
}

fn builtin_le(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(args, Ordering::is_le)
}

fn builtin_ge(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    compare_chain(args, Ordering::is_ge)
}

fn builtin_eq(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    for pair in args.windows(2) {
        if !interp.values_equal(&pair[0], &pair[1])? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn builtin_strict_eq(_: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
}

fn builtin_not_eq(interp: &Interpreter, args: &[Value]) -> Result<Value, EvalError> {
    let equal = builtin_eq(interp, args)?;
    Ok(Value::Bool(!equal.is_truthy()))
}

fn sign_test(value: &Value, accept: fn(Ordering) -> bool) -> Result<Value, EvalError> {
    numeric_cmp(value, &Value::Integer(0))
        .map(|ordering| Value::Bool(accept(ordering)))
        .ok_or_else(|| EvalError::type_error("number", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contagion() {
        assert_eq!(
            arith(Op::Add, &Value::Integer(1), &Value::Float(0.5)).unwrap(),
            Value::Float(1.5)
        );
        let dec = Value::Decimal(Decimal::parse("1.25").unwrap());
        assert!(matches!(
            arith(Op::Mul, &Value::Integer(2), &dec).unwrap(),
            Value::Decimal(_)
        ));
    }

    #[test]
    fn test_long_overflow_is_error() {
        assert!(arith(Op::Add, &Value::Integer(i64::MAX), &Value::Integer(1)).is_err());
    }

    #[test]
    fn test_truncating_division() {
        assert_eq!(
            arith(Op::Div, &Value::Integer(-7), &Value::Integer(2)).unwrap(),
            Value::Integer(-3)
        );
        assert!(arith(Op::Div, &Value::Integer(1), &Value::Integer(0)).is_err());
    }

    #[test]
    fn test_floored_mod() {
        let interp = Interpreter::new();
        assert_eq!(interp.eval_str("(mod -7 3)").unwrap(), Value::Integer(2));
        assert_eq!(interp.eval_str("(mod 7 -3)").unwrap(), Value::Integer(-2));
    }

    #[test]
    fn test_comparison_chains() {
        let interp = Interpreter::new();
        assert_eq!(interp.eval_str("(< 1 2 3)").unwrap(), Value::Bool(true));
        assert_eq!(interp.eval_str("(< 1 3 2)").unwrap(), Value::Bool(false));
        assert_eq!(interp.eval_str("(= 1 1.0)").unwrap(), Value::Bool(true));
        assert_eq!(interp.eval_str("(== 1 1.0)").unwrap(), Value::Bool(false));
        assert!(interp.eval_str("(< 1 \"a\")").is_err());
    }

    #[test]
    fn test_sign_predicates() {
        let interp = Interpreter::new();
        for (src, expected) in [
            ("(zero? 0)", true),
            ("(zero? 0.0)", true),
            ("(zero? 3)", false),
            ("(pos? 2.5)", true),
            ("(pos? -1)", false),
            ("(neg? -1)", true),
            ("(neg? 0)", false),
            ("(pos? 1.5M)", true),
        ] {
            assert_eq!(interp.eval_str(src).unwrap(), Value::Bool(expected), "{}", src);
        }
        assert_eq!(
            interp.eval_str("(zero? :a)").unwrap_err().kind(),
            crate::ErrorKind::Type
        );
    }
}
