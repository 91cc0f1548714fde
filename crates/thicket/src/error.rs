//! Error types for Thicket evaluation

use std::fmt;

use thiserror::Error;

use crate::value::Value;

/// Source code location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File name or identifier
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Error raised by the reader for malformed source text.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Parse error: {message} at {location}")]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,

    /// Where the problem was detected
    pub location: SourceLocation,
}

impl ParseError {
    /// Create a new parse error.
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Main error type for evaluation.
///
/// Every variant maps to a nominal exception type (see [`ErrorKind`]) so that
/// `catch` clauses and host code can match on the kind of failure.
#[derive(Error, Debug, Clone)]
pub enum EvalError {
    /// Malformed or unterminated syntax
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Unqualified symbol not bound anywhere in scope
    #[error("Symbol '{name}' not found")]
    SymbolNotFound {
        /// The symbol as written
        name: String,
    },

    /// Qualified symbol whose namespace table or entry is missing
    #[error("Symbol '{name}' not found: {reason}")]
    QualifiedNotFound {
        /// The qualified symbol as written
        name: String,
        /// Why the lookup failed
        reason: String,
    },

    /// No arity of the callable accepts the given argument count
    #[error("Wrong number of args ({got}) passed to {name}; accepts {accepted}")]
    Arity {
        /// Callable name
        name: String,
        /// Accepted arities, e.g. `0, 1, 2` or `2+`
        accepted: String,
        /// Actual argument count
        got: usize,
    },

    /// Failed precondition, type hint or validator
    #[error("Assertion failed: {message}")]
    Assertion {
        /// What failed
        message: String,
    },

    /// `recur` used outside the tail position of a loop or function body
    #[error("recur is not in tail position: {message}")]
    NotInTailPosition {
        /// Detail
        message: String,
    },

    /// An arbitrary language value raised with `throw`
    #[error("Thrown value: {0}")]
    Thrown(Value),

    /// Operation applied to a value of the wrong type
    #[error("Type error: expected {expected}, got {got}")]
    TypeError {
        /// Expected type
        expected: String,
        /// Actual type received
        got: String,
    },

    /// Special form with invalid shape
    #[error("Invalid {form} form: {message}")]
    InvalidForm {
        /// Special form name
        form: String,
        /// What is wrong with it
        message: String,
    },

    /// `defonce` on an already defined global
    #[error("'{name}' is already defined")]
    AlreadyDefined {
        /// Qualified global name
        name: String,
    },

    /// No multimethod or protocol implementation matched
    #[error("{message}")]
    Dispatch {
        /// Detail naming the unmatched dispatch value or type
        message: String,
    },

    /// The sandbox interceptor refused a sensitive call
    #[error("Call to '{name}' vetoed: {reason}")]
    Vetoed {
        /// Native function name
        name: String,
        /// Reason given by the interceptor
        reason: String,
    },

    /// Waiting on an asynchronous result timed out
    #[error("Timed out after {millis} ms")]
    Timeout {
        /// Timeout in milliseconds
        millis: u64,
    },

    /// Macro expansion did not reach a fixed point within the limit
    #[error("Macro expansion depth {depth} exceeds maximum {max}")]
    ExpansionLimit {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Nested evaluation exceeded the configured call depth
    #[error("Stack overflow: call depth {depth} exceeds maximum {max}")]
    StackOverflow {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max: usize,
    },

    /// Evaluation was interrupted by the host
    #[error("Evaluation interrupted")]
    Interrupted,

    /// Generic runtime failure raised by a primitive
    #[error("{message}")]
    Runtime {
        /// Detail
        message: String,
    },
}

impl EvalError {
    /// Create a runtime error.
    pub fn runtime(message: impl Into<String>) -> Self {
        EvalError::Runtime {
            message: message.into(),
        }
    }

    /// Create an assertion error.
    pub fn assertion(message: impl Into<String>) -> Self {
        EvalError::Assertion {
            message: message.into(),
        }
    }

    /// Create an invalid-form error for the given special form.
    pub fn invalid_form(form: &str, message: impl Into<String>) -> Self {
        EvalError::InvalidForm {
            form: form.to_string(),
            message: message.into(),
        }
    }

    /// Create a type error from an expected description and the offending value.
    pub fn type_error(expected: impl Into<String>, got: &Value) -> Self {
        EvalError::TypeError {
            expected: expected.into(),
            got: type_name(got).to_string(),
        }
    }

    /// The nominal kind of this error, used for `catch` matching.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvalError::Parse(_) => ErrorKind::Parse,
            EvalError::SymbolNotFound { .. } | EvalError::QualifiedNotFound { .. } => {
                ErrorKind::SymbolNotFound
            }
            EvalError::Arity { .. } => ErrorKind::Arity,
            EvalError::Assertion { .. } => ErrorKind::Assertion,
            EvalError::NotInTailPosition { .. } => ErrorKind::NotInTailPosition,
            EvalError::Thrown(_) => ErrorKind::Value,
            EvalError::TypeError { .. } => ErrorKind::Type,
            EvalError::InvalidForm { .. } | EvalError::AlreadyDefined { .. } => ErrorKind::Syntax,
            EvalError::Dispatch { .. } => ErrorKind::Dispatch,
            EvalError::Vetoed { .. } => ErrorKind::Security,
            EvalError::Timeout { .. } => ErrorKind::Timeout,
            EvalError::ExpansionLimit { .. } | EvalError::StackOverflow { .. } => {
                ErrorKind::StackOverflow
            }
            EvalError::Interrupted => ErrorKind::Interrupted,
            EvalError::Runtime { .. } => ErrorKind::Runtime,
        }
    }
}

/// Nominal exception types surfaced to `catch` clauses.
///
/// Every kind except [`ErrorKind::Interrupted`] is a subtype of
/// `RuntimeException`, which is a subtype of `Exception` and `Throwable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Reader failure
    Parse,
    /// Unknown symbol
    SymbolNotFound,
    /// Wrong argument count
    Arity,
    /// Failed precondition, hint or validator
    Assertion,
    /// Misplaced `recur`
    NotInTailPosition,
    /// User `throw` of an arbitrary value
    Value,
    /// Wrong operand type
    Type,
    /// Malformed special form
    Syntax,
    /// Missing multimethod/protocol implementation
    Dispatch,
    /// Interceptor veto
    Security,
    /// Deref timeout
    Timeout,
    /// Depth limits
    StackOverflow,
    /// Other runtime failure
    Runtime,
    /// Host interruption, never catchable
    Interrupted,
}

impl ErrorKind {
    /// The exception type name used in `catch` clauses.
    pub fn exception_name(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "ParseException",
            ErrorKind::SymbolNotFound => "SymbolNotFoundException",
            ErrorKind::Arity => "ArityException",
            ErrorKind::Assertion => "AssertionException",
            ErrorKind::NotInTailPosition => "NotInTailPositionException",
            ErrorKind::Value => "ValueException",
            ErrorKind::Type => "TypeException",
            ErrorKind::Syntax => "SyntaxException",
            ErrorKind::Dispatch => "DispatchException",
            ErrorKind::Security => "SecurityException",
            ErrorKind::Timeout => "TimeoutException",
            ErrorKind::StackOverflow => "StackOverflowException",
            ErrorKind::Runtime => "RuntimeException",
            ErrorKind::Interrupted => "InterruptedException",
        }
    }

    /// Whether a `catch` clause naming `exception` accepts this kind.
    pub fn is_a(&self, exception: &str) -> bool {
        if *self == ErrorKind::Interrupted {
            return false;
        }
        exception == self.exception_name()
            || matches!(exception, "RuntimeException" | "Exception" | "Throwable")
    }
}

/// Human-readable type name of a value, as used in error messages.
pub fn type_name(value: &Value) -> String {
    format!("{}", value.type_tag())
}

/// Result type alias for evaluation
pub type Result<T> = std::result::Result<T, EvalError>;
