//! Futures: values computed on another thread

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::debug;

use crate::environment::dynamic;
use crate::value::Value;
use crate::{EvalError, Interpreter};

/// Initial worker stack size; deeper evaluation grows it on demand.
const FUTURE_STACK_SIZE: usize = 16 * 1024 * 1024;

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic occurred".to_string()
    }
}

/// A pending or completed asynchronous result.
pub struct FutureCell {
    result: Mutex<Option<Result<Value, EvalError>>>,
    ready: Condvar,
}

impl FutureCell {
    fn pending() -> Self {
        Self {
            result: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Run `func` with no arguments on a new thread.
    ///
    /// The thread starts with a copy of the caller's dynamic bindings; any
    /// rebinding it performs stays on that thread. A panic in the worker
    /// completes the future with a runtime error.
    pub fn spawn(interp: &Interpreter, func: Value) -> Arc<FutureCell> {
        let cell = Arc::new(FutureCell::pending());
        let snapshot = dynamic::snapshot();
        let worker_interp = interp.clone();
        let worker_cell = Arc::clone(&cell);
        debug!("spawning future");
        let spawned = thread::Builder::new()
            .name("thicket-future".to_string())
            .stack_size(FUTURE_STACK_SIZE)
            .spawn(move || {
                dynamic::install(snapshot);
                let run = || worker_interp.apply(&func, &[]);
                let result = panic::catch_unwind(AssertUnwindSafe(run)).unwrap_or_else(|payload| {
                    Err(EvalError::runtime(format!(
                        "future panicked: {}",
                        panic_message(payload)
                    )))
                });
                debug!("future completed (ok: {})", result.is_ok());
                worker_cell.complete(result);
            });
        if let Err(err) = spawned {
            cell.complete(Err(EvalError::runtime(format!(
                "failed to spawn future thread: {}",
                err
            ))));
        }
        cell
    }

    fn complete(&self, result: Result<Value, EvalError>) {
        let mut slot = self.result.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(result);
        self.ready.notify_all();
    }

    /// Whether the result is available.
    pub fn is_realized(&self) -> bool {
        self.result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Block until the result is available, or until `timeout` elapses.
    ///
    /// Returns `None` on timeout. The task keeps running either way.
    pub fn wait(&self, timeout: Option<Duration>) -> Option<Result<Value, EvalError>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut slot = self.result.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = slot.as_ref() {
                return Some(result.clone());
            }
            slot = match deadline {
                None => self.ready.wait(slot).unwrap_or_else(|e| e.into_inner()),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.ready
                        .wait_timeout(slot, deadline - now)
                        .unwrap_or_else(|e| e.into_inner())
                        .0
                }
            };
        }
    }
}

impl std::fmt::Debug for FutureCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Future(realized: {})", self.is_realized())
    }
}
