//! Thread-local dynamic binding frames
//!
//! Each dynamic var owns a per-thread stack of values keyed by the var's id.
//! `binding` pushes through [`push`] and the returned [`DynamicGuard`] pops
//! on drop, so every exit path (normal, error, unwinding) restores the
//! previous frame.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::value::Value;

/// Copy of one thread's dynamic frames, handed to spawned tasks.
pub type DynamicSnapshot = HashMap<u64, Vec<Value>>;

thread_local! {
    static FRAMES: RefCell<DynamicSnapshot> = RefCell::new(HashMap::new());
}

/// RAII guard that pops the pushed frames when dropped.
///
/// # Example
///
/// ```
/// use thicket::environment::dynamic;
/// use thicket::Value;
///
/// {
///     let _guard = dynamic::push(&[(7, Value::Integer(200))]);
///     assert_eq!(dynamic::current(7), Some(Value::Integer(200)));
/// }
/// assert_eq!(dynamic::current(7), None);
/// ```
pub struct DynamicGuard {
    ids: Vec<u64>,
}

/// Push one frame per `(var id, value)` pair on this thread.
pub fn push(bindings: &[(u64, Value)]) -> DynamicGuard {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        for (id, value) in bindings {
            frames.entry(*id).or_default().push(value.clone());
        }
    });
    DynamicGuard {
        ids: bindings.iter().map(|(id, _)| *id).collect(),
    }
}

impl Drop for DynamicGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            let mut frames = frames.borrow_mut();
            for id in self.ids.iter().rev() {
                if let Some(stack) = frames.get_mut(id) {
                    stack.pop();
                    if stack.is_empty() {
                        frames.remove(id);
                    }
                }
            }
        });
    }
}

/// The innermost frame value for `id` on this thread.
pub fn current(id: u64) -> Option<Value> {
    FRAMES.with(|frames| frames.borrow().get(&id).and_then(|s| s.last().cloned()))
}

/// Overwrite the innermost frame for `id`; returns false if there is none.
pub fn set_top(id: u64, value: Value) -> bool {
    FRAMES.with(|frames| {
        match frames.borrow_mut().get_mut(&id).and_then(|s| s.last_mut()) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    })
}

/// Copy this thread's frames.
pub fn snapshot() -> DynamicSnapshot {
    FRAMES.with(|frames| frames.borrow().clone())
}

/// Replace this thread's frames with a snapshot taken elsewhere.
///
/// Used once at the start of a spawned task's thread.
pub fn install(snapshot: DynamicSnapshot) {
    FRAMES.with(|frames| *frames.borrow_mut() = snapshot);
}
