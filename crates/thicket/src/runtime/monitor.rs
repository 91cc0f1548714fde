//! Reentrant monitors for `locking`

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, ThreadId};

use crate::value::Value;

/// Key of a value used as a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorKey {
    /// Allocation address of a heap-backed value
    Identity(usize),
    /// Hash of an immediate value (nil, booleans, numbers, keywords, symbols)
    Scalar(u64),
}

/// The monitor `value` locks on.
///
/// Heap-backed values lock on their allocation, so two equal but distinct
/// collections are separate monitors. Immediate values have no identity and
/// lock on their hash.
pub fn monitor_key(value: &Value) -> MonitorKey {
    fn addr<T: ?Sized>(arc: &Arc<T>) -> MonitorKey {
        MonitorKey::Identity(Arc::as_ptr(arc) as *const u8 as usize)
    }
    match value {
        Value::String(s) => addr(s),
        Value::List(items, _) | Value::Vector(items, _) => addr(items),
        Value::Map(map, _) => addr(map),
        Value::Set(set, _) => addr(set),
        Value::Atom(a) => addr(a),
        Value::Future(f) => addr(f),
        Value::Custom(c) => addr(c),
        Value::Macro(m) => addr(m),
        Value::Handle(h) => MonitorKey::Identity(h.addr()),
        Value::Function(f) => MonitorKey::Identity(f.addr()),
        other => {
            let mut hasher = DefaultHasher::new();
            other.hash(&mut hasher);
            MonitorKey::Scalar(hasher.finish())
        }
    }
}

/// Table of held monitors: key to owning thread and hold count.
#[derive(Default)]
pub struct Monitors {
    held: Mutex<HashMap<MonitorKey, (ThreadId, usize)>>,
    released: Condvar,
}

/// Releases one hold on a monitor when dropped.
pub struct MonitorGuard<'a> {
    monitors: &'a Monitors,
    key: MonitorKey,
}

impl Monitors {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the monitor for `key`, blocking while another thread holds it.
    ///
    /// The owning thread may enter again; each entry needs its own release.
    pub fn enter(&self, key: MonitorKey) -> MonitorGuard<'_> {
        let me = thread::current().id();
        let mut held = self.held.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            match held.get_mut(&key) {
                None => {
                    held.insert(key, (me, 1));
                    break;
                }
                Some((owner, count)) if *owner == me => {
                    *count += 1;
                    break;
                }
                Some(_) => {
                    held = self
                        .released
                        .wait(held)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
        MonitorGuard {
            monitors: self,
            key,
        }
    }
}

impl Drop for MonitorGuard<'_> {
    fn drop(&mut self) {
        let mut held = self
            .monitors
            .held
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let release = match held.get_mut(&self.key) {
            Some((_, count)) => {
                *count -= 1;
                *count == 0
            }
            None => false,
        };
        if release {
            held.remove(&self.key);
            self.monitors.released.notify_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_reentrant_on_same_thread() {
        let monitors = Monitors::new();
        let _outer = monitors.enter(MonitorKey::Scalar(1));
        let _inner = monitors.enter(MonitorKey::Scalar(1));
    }

    #[test]
    fn test_mutual_exclusion_across_threads() {
        let monitors = Arc::new(Monitors::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let (m, inside, max_seen) = (monitors.clone(), inside.clone(), max_seen.clone());
                thread::spawn(move || {
                    for _ in 0..50 {
                        let _g = m.enter(MonitorKey::Scalar(9));
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        inside.fetch_sub(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_keywords_share_a_monitor() {
        assert_eq!(
            monitor_key(&Value::keyword("lock")),
            monitor_key(&Value::keyword("lock"))
        );
    }

    #[test]
    fn test_equal_collections_are_distinct_monitors() {
        let a = Value::vector(vec![Value::Integer(1)]);
        let b = Value::vector(vec![Value::Integer(1)]);
        assert_eq!(a, b);
        assert_ne!(monitor_key(&a), monitor_key(&b));
        assert_eq!(monitor_key(&a), monitor_key(&a.clone()));
        assert_ne!(monitor_key(&Value::string("m")), monitor_key(&Value::string("m")));
    }
}
