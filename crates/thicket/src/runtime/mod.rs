//! Concurrency primitives: atoms, futures and monitors

mod atom;
mod future;
mod monitor;

pub use atom::AtomCell;
pub use future::FutureCell;
pub use monitor::{monitor_key, MonitorGuard, MonitorKey, Monitors};
