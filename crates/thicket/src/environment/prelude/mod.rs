//! The `core` namespace: native functions and bootstrap macros

mod bootstrap;
mod collections;
mod lang;
mod numeric;

use super::CORE_NS;
use crate::value::{NativeFn, Value};
use crate::{EvalError, Interpreter};

/// Signature shared by every built-in.
type Builtin = fn(&Interpreter, &[Value]) -> Result<Value, EvalError>;

/// Install every native, then evaluate the bootstrap macros.
pub(crate) fn install(interp: &Interpreter) -> Result<(), EvalError> {
    numeric::install(interp);
    collections::install(interp);
    lang::install(interp);
    bootstrap::install(interp)
}

fn define(interp: &Interpreter, name: &str, min: usize, max: Option<usize>, func: Builtin) {
    let native = NativeFn::new(name, min, max, func);
    interp.globals().define(CORE_NS, name, Value::native(native));
}

/// Define a native that passes through the sandbox interceptor.
fn define_sensitive(interp: &Interpreter, name: &str, min: usize, max: Option<usize>, func: Builtin) {
    let native = NativeFn::new(name, min, max, func).sensitive();
    interp.globals().define(CORE_NS, name, Value::native(native));
}

// ═══════════════════════════════════════════════════════════════════════
// Argument Helpers
// ═══════════════════════════════════════════════════════════════════════

fn expect_int(value: &Value) -> Result<i64, EvalError> {
    value
        .as_i64()
        .ok_or_else(|| EvalError::type_error("long", value))
}

fn expect_fn(value: &Value) -> Result<&Value, EvalError> {
    if value.is_callable() {
        Ok(value)
    } else {
        Err(EvalError::type_error("function", value))
    }
}

fn expect_keyword(value: &Value) -> Result<&crate::value::Keyword, EvalError> {
    value
        .as_keyword()
        .ok_or_else(|| EvalError::type_error("keyword", value))
}
