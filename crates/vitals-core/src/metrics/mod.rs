//! Metric primitives.
//!
//! - [`Counter`]: monotonically increasing value with rate computation against the shared [`Clock`].
//! - [`Gauge`]: point-in-time float, NaN until first observed.
//! - [`BasicCounter`]: lock-free counter without rate bookkeeping.
//! - [`StatsTimer`]: ring buffer of durations with nearest-rank percentiles.
//!
//! Every primitive guards its own state; there is no cross-metric atomicity.

pub mod basic_counter;
pub mod clock;
pub mod counter;
pub mod gauge;
pub mod timer;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use basic_counter::BasicCounter;
pub use clock::{Clock, JIFFY};
pub use counter::Counter;
pub use gauge::Gauge;
pub use timer::{StatsTimer, TimerHandle, STANDARD_PERCENTILES};

/// Nanoseconds per second, as a float for rate math.
pub(crate) const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Lock a metric's state. A poisoned lock still holds a consistent value
/// (every critical section is a handful of plain stores), so recover it.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
