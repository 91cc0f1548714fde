//! Atoms: mutable reference cells with watches

use std::sync::Mutex;

use indexmap::IndexMap;
use log::warn;

use crate::value::Value;
use crate::{EvalError, Interpreter};

#[derive(Clone)]
struct Versioned {
    value: Value,
    version: u64,
}

/// A mutable cell holding one value.
///
/// Updates use a compare-and-swap loop over a version counter, so the
/// update function may run more than once under contention. Watches fire
/// synchronously, in registration order, on the mutating thread after the
/// new value is installed.
pub struct AtomCell {
    state: Mutex<Versioned>,
    watches: Mutex<IndexMap<Value, Value>>,
}

impl AtomCell {
    /// Create a cell holding `initial`.
    pub fn new(initial: Value) -> Self {
        Self {
            state: Mutex::new(Versioned {
                value: initial,
                version: 0,
            }),
            watches: Mutex::new(IndexMap::new()),
        }
    }

    fn snapshot(&self) -> Versioned {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn try_commit(&self, version: u64, value: Value) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.version != version {
            return false;
        }
        state.value = value;
        state.version += 1;
        true
    }

    /// Current value.
    pub fn get(&self) -> Value {
        self.snapshot().value
    }

    /// Install `value` unconditionally; returns the new value.
    pub fn reset(&self, interp: &Interpreter, this: &Value, value: Value) -> Result<Value, EvalError> {
        let old = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            state.version += 1;
            std::mem::replace(&mut state.value, value.clone())
        };
        self.fire_watches(interp, this, old, value.clone())?;
        Ok(value)
    }

    /// Apply `f` to the current value until the result commits.
    pub fn swap<F>(&self, interp: &Interpreter, this: &Value, mut f: F) -> Result<Value, EvalError>
    where
        F: FnMut(Value) -> Result<Value, EvalError>,
    {
        loop {
            let snapshot = self.snapshot();
            let new_value = f(snapshot.value.clone())?;
            if self.try_commit(snapshot.version, new_value.clone()) {
                self.fire_watches(interp, this, snapshot.value, new_value.clone())?;
                return Ok(new_value);
            }
        }
    }

    /// Install `new_value` only if the current value equals `expected`.
    pub fn compare_and_set(
        &self,
        interp: &Interpreter,
        this: &Value,
        expected: &Value,
        new_value: Value,
    ) -> Result<bool, EvalError> {
        loop {
            let snapshot = self.snapshot();
            if snapshot.value != *expected {
                return Ok(false);
            }
            if self.try_commit(snapshot.version, new_value.clone()) {
                self.fire_watches(interp, this, snapshot.value, new_value)?;
                return Ok(true);
            }
        }
    }

    /// Register `func` under `key`, replacing any watch with the same key.
    pub fn add_watch(&self, key: Value, func: Value) {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, func);
    }

    /// Remove the watch under `key`; returns whether one existed.
    pub fn remove_watch(&self, key: &Value) -> bool {
        self.watches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .shift_remove(key)
            .is_some()
    }

    /// Call every watch with `(key atom old new)`.
    ///
    /// All watches run even if one fails; the first failure is returned.
    fn fire_watches(
        &self,
        interp: &Interpreter,
        this: &Value,
        old: Value,
        new: Value,
    ) -> Result<(), EvalError> {
        let entries: Vec<(Value, Value)> = {
            let watches = self.watches.lock().unwrap_or_else(|e| e.into_inner());
            if watches.is_empty() {
                return Ok(());
            }
            watches.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };
        let mut first_error = None;
        for (key, func) in entries {
            let args = [key.clone(), this.clone(), old.clone(), new.clone()];
            if let Err(err) = interp.apply(&func, &args) {
                warn!("watch {} failed: {}", key.pr_str(), err);
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl std::fmt::Debug for AtomCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Atom({:?})", self.get())
    }
}
