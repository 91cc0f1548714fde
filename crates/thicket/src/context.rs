//! Evaluation context configuration

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{EvalError, Value};

/// Configuration and state for evaluation.
///
/// This is shared by every evaluation step of an [`Interpreter`](crate::Interpreter)
/// and controls behavior like recursion limits and interruption.
#[derive(Debug, Clone)]
pub struct EvalContext {
    /// Maximum nesting depth of non-tail evaluation (stack overflow protection)
    pub max_call_depth: usize,

    /// Maximum number of nested macro expansions for a single form
    pub max_expansion_depth: usize,

    /// Interrupt flag - set to true to abort evaluation
    pub interrupt: Arc<AtomicBool>,

    /// Whether to trace evaluation of special forms (logged at `trace` level)
    pub trace: bool,

    /// Source name attached to forms read by `eval_str`
    pub source_name: String,
}

impl Default for EvalContext {
    fn default() -> Self {
        Self {
            max_call_depth: 1000,
            max_expansion_depth: 100,
            interrupt: Arc::new(AtomicBool::new(false)),
            trace: false,
            source_name: "<input>".to_string(),
        }
    }
}

impl EvalContext {
    /// Create a new context with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from a deserialized configuration.
    pub fn from_config(config: &EvalConfig) -> Self {
        Self {
            max_call_depth: config.max_call_depth,
            max_expansion_depth: config.max_expansion_depth,
            trace: config.trace,
            source_name: config.source_name.clone(),
            ..Default::default()
        }
    }

    /// Create a context with a custom call depth limit.
    pub fn with_max_call_depth(max_depth: usize) -> Self {
        Self {
            max_call_depth: max_depth,
            ..Default::default()
        }
    }

    /// Set the macro expansion depth limit.
    pub fn with_max_expansion_depth(mut self, max_depth: usize) -> Self {
        self.max_expansion_depth = max_depth;
        self
    }

    /// Enable or disable tracing.
    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Check if evaluation has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupt.load(Ordering::Relaxed)
    }

    /// Request interruption of evaluation.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Relaxed);
    }

    /// Reset the interrupt flag.
    pub fn reset_interrupt(&self) {
        self.interrupt.store(false, Ordering::Relaxed);
    }
}

/// Host-facing, serializable evaluation settings.
///
/// Missing fields take their defaults, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// See [`EvalContext::max_call_depth`]
    pub max_call_depth: usize,
    /// See [`EvalContext::max_expansion_depth`]
    pub max_expansion_depth: usize,
    /// See [`EvalContext::trace`]
    pub trace: bool,
    /// See [`EvalContext::source_name`]
    pub source_name: String,
}

impl Default for EvalConfig {
    fn default() -> Self {
        let ctx = EvalContext::default();
        Self {
            max_call_depth: ctx.max_call_depth,
            max_expansion_depth: ctx.max_expansion_depth,
            trace: ctx.trace,
            source_name: ctx.source_name,
        }
    }
}

/// Sandbox hook consulted before any native function flagged as sensitive.
///
/// Returning an error vetoes the call; the error propagates to the caller.
pub trait Interceptor: Send + Sync {
    /// Inspect a pending call to the named native.
    fn check(&self, name: &str, args: &[Value]) -> Result<(), EvalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let ctx = EvalContext::default();
        assert_eq!(ctx.max_call_depth, 1000);
        assert_eq!(ctx.max_expansion_depth, 100);
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_interrupt_roundtrip() {
        let ctx = EvalContext::new();
        ctx.interrupt();
        assert!(ctx.is_interrupted());
        ctx.reset_interrupt();
        assert!(!ctx.is_interrupted());
    }

    #[test]
    fn test_clone_shares_interrupt_flag() {
        let ctx = EvalContext::new();
        let clone = ctx.clone();
        ctx.interrupt();
        assert!(clone.is_interrupted());
    }

    #[test]
    fn test_builders() {
        let ctx = EvalContext::with_max_call_depth(10)
            .with_max_expansion_depth(3)
            .with_trace(true);
        assert_eq!(ctx.max_call_depth, 10);
        assert_eq!(ctx.max_expansion_depth, 3);
        assert!(ctx.trace);
    }

    #[test]
    fn test_from_config() {
        let config = EvalConfig {
            max_call_depth: 64,
            trace: true,
            ..Default::default()
        };
        let ctx = EvalContext::from_config(&config);
        assert_eq!(ctx.max_call_depth, 64);
        assert!(ctx.trace);
        assert_eq!(ctx.max_expansion_depth, 100);
    }
}
