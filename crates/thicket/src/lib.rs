//! # Thicket
//!
//! An embeddable, homoiconic Lisp interpreter.
//!
//! Programs are read into the same [`Value`] type they compute with, so
//! code is data: macros receive unevaluated forms and return new ones.
//! Evaluation is trampolined, which gives proper tail calls and `recur`
//! without growing the native stack.
//!
//! ## Architecture
//!
//! - **Reader**: source text to value trees with position metadata
//! - **Expansion**: macros and syntax-quote, expanded at each call site
//! - **Evaluator**: special forms, closures, destructuring, exceptions
//! - **Registry**: custom types, protocols and multimethods
//! - **Runtime**: atoms, futures, monitors and thread-local dynamic vars
//!
//! ## Example
//!
//! ```
//! use thicket::{Interpreter, Value};
//!
//! let interp = Interpreter::new();
//! let sum = interp
//!     .eval_str("(loop [i 0 acc 0] (if (> i 100) acc (recur (inc i) (+ acc i))))")
//!     .unwrap();
//! assert_eq!(sum, Value::Integer(5050));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod context;
pub mod environment;
pub mod error;
pub mod eval;
pub mod evaluator;
pub mod expansion;
pub mod reader;
pub mod registry;
pub mod runtime;
pub mod template;
pub mod value;

// Re-export main types
pub use context::{EvalConfig, EvalContext, Interceptor};
pub use environment::{Env, Globals, Var};
pub use error::{ErrorKind, EvalError, ParseError, Result, SourceLocation};
pub use evaluator::Interpreter;
pub use registry::{TypeHint, TypeTag};
pub use value::{Closure, Decimal, Function, Keyword, NativeFn, Symbol, Value};

/// Thicket version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
