//! Process-wide low-resolution clock.
//!
//! A background thread stores the nanoseconds elapsed since the clock's epoch
//! once per jiffy. Readers do a single atomic load instead of asking the OS
//! for the time on every `Counter::add`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Default tick interval.
pub const JIFFY: Duration = Duration::from_millis(100);

static GLOBAL: OnceLock<Arc<Clock>> = OnceLock::new();

#[derive(Debug)]
pub struct Clock {
    epoch: Instant,
    nanos: AtomicU64,
    stopped: AtomicBool,
}

impl Clock {
    fn unticked() -> Self {
        Self {
            epoch: Instant::now(),
            nanos: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
        }
    }

    /// Create a clock and spawn its ticker thread.
    ///
    /// The ticker only holds a weak reference and exits once every `Arc` to
    /// the clock is dropped or [`Clock::stop`] is called.
    pub fn start(jiffy: Duration) -> Arc<Self> {
        let clock = Arc::new(Self::unticked());
        let weak = Arc::downgrade(&clock);
        let jiffy = jiffy.max(Duration::from_millis(1));

        let spawned = thread::Builder::new()
            .name("vitals-clock".into())
            .spawn(move || tick(weak, jiffy));
        if let Err(e) = spawned {
            tracing::warn!(error = %e, "clock ticker failed to start, readings stay frozen");
        }
        clock
    }

    /// The process-wide clock, started with the default [`JIFFY`] on first use.
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(|| Clock::start(JIFFY)))
    }

    /// Start the process-wide clock with an explicit jiffy.
    ///
    /// Meant for process startup. If the global clock is already running, it
    /// is returned unchanged and `jiffy` is ignored.
    pub fn init_global(jiffy: Duration) -> Arc<Self> {
        let mut started = false;
        let clock = GLOBAL.get_or_init(|| {
            started = true;
            Clock::start(jiffy)
        });
        if !started {
            tracing::debug!(?jiffy, "global clock already running, keeping its jiffy");
        }
        Arc::clone(clock)
    }

    /// Nanoseconds since the epoch, as of the last tick.
    pub fn nanos(&self) -> u64 {
        self.nanos.load(Ordering::Acquire)
    }

    /// Halt the ticker. The stored reading stays where it is.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// A clock with no ticker, driven only by [`Clock::advance`].
    #[cfg(any(test, feature = "test-util"))]
    pub fn manual() -> Arc<Self> {
        let clock = Self::unticked();
        clock.stopped.store(true, Ordering::Release);
        Arc::new(clock)
    }

    /// Move the stored reading forward.
    #[cfg(any(test, feature = "test-util"))]
    pub fn advance(&self, by: Duration) {
        let by = u64::try_from(by.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(by, Ordering::AcqRel);
    }
}

fn tick(clock: Weak<Clock>, jiffy: Duration) {
    loop {
        thread::sleep(jiffy);
        let Some(clock) = clock.upgrade() else { return };
        if clock.is_stopped() {
            return;
        }
        let elapsed = u64::try_from(clock.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX);
        // fetch_max keeps the reading non-decreasing
        clock.nanos.fetch_max(elapsed, Ordering::AcqRel);
    }
}
