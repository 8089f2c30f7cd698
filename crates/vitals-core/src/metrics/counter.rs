//! Monotonic counter with rate-of-change.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::{lock, Clock, NANOS_PER_SEC};

#[derive(Debug, Default)]
struct CounterState {
    value: u64,
    /// Clock reading at the last `set`/`add`.
    at: u64,
    /// (value, clock reading) the next rate is measured from. `None` until first observed.
    baseline: Option<(u64, u64)>,
    rate: f64,
}

impl CounterState {
    fn observe(&mut self, value: u64, now: u64) {
        self.value = value;
        self.at = now;
        match self.baseline {
            Some((base, _)) if value >= base => {}
            // Went backwards: the source was reset or wrapped.
            Some(_) => {
                self.baseline = Some((value, now));
                self.rate = 0.0;
            }
            None => self.baseline = Some((value, now)),
        }
    }

    fn compute_rate(&mut self) -> f64 {
        if let Some((base, base_at)) = self.baseline {
            if self.at > base_at && self.value >= base {
                let ticks = (self.at - base_at) as f64;
                self.rate = (self.value - base) as f64 / ticks * NANOS_PER_SEC;
                self.baseline = Some((self.value, self.at));
            }
        }
        self.rate
    }
}

/// Counter whose rate is measured between successive [`Counter::compute_rate`] calls.
pub struct Counter {
    clock: Arc<Clock>,
    state: Mutex<CounterState>,
}

impl Counter {
    /// New counter reading the process-wide clock.
    pub fn new() -> Self {
        Self::with_clock(Clock::global())
    }

    pub fn with_clock(clock: Arc<Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(CounterState::default()),
        }
    }

    pub fn reset(&self) {
        *lock(&self.state) = CounterState::default();
    }

    /// Store an absolute value, typically a cumulative OS counter.
    ///
    /// A value below the current baseline restarts rate tracking from `v`.
    pub fn set(&self, v: u64) {
        let now = self.clock.nanos();
        lock(&self.state).observe(v, now);
    }

    /// Add `delta`. Wrapping past `u64::MAX` is treated like a reset.
    pub fn add(&self, delta: u64) {
        let now = self.clock.nanos();
        let mut state = lock(&self.state);
        let value = state.value.wrapping_add(delta);
        state.observe(value, now);
    }

    pub fn get(&self) -> u64 {
        lock(&self.state).value
    }

    /// Per-second rate since the previous successful computation.
    ///
    /// Returns the cached rate (0.0 before any computation) when no clock
    /// time has passed since the baseline or the value went backwards.
    pub fn compute_rate(&self) -> f64 {
        lock(&self.state).compute_rate()
    }

    /// Current value and rate taken under one lock.
    pub fn snapshot(&self) -> (u64, f64) {
        let mut state = lock(&self.state);
        let rate = state.compute_rate();
        (state.value, rate)
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("Counter")
            .field("value", &state.value)
            .field("rate", &state.rate)
            .finish()
    }
}

impl Serialize for Counter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let (current, rate) = self.snapshot();
        let mut s = serializer.serialize_struct("Counter", 2)?;
        s.serialize_field("current", &current)?;
        s.serialize_field("rate", &rate)?;
        s.end()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn counter() -> (Arc<Clock>, Counter) {
        let clock = Clock::manual();
        (Arc::clone(&clock), Counter::with_clock(clock))
    }

    #[test]
    fn rate_is_zero_before_any_interval() {
        let (_clock, c) = counter();
        assert_eq!(c.compute_rate(), 0.0);
        c.add(10);
        assert_eq!(c.compute_rate(), 0.0);
    }

    #[test]
    fn rate_over_one_second() {
        let (clock, c) = counter();
        c.add(100);
        clock.advance(Duration::from_secs(1));
        c.add(100);
        assert_eq!(c.get(), 200);
        assert!((c.compute_rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn successive_rates_measure_successive_intervals() {
        let (clock, c) = counter();
        c.set(0);
        clock.advance(Duration::from_secs(2));
        c.set(1000);
        assert!((c.compute_rate() - 500.0).abs() < 1e-9);

        clock.advance(Duration::from_millis(500));
        c.set(1100);
        assert!((c.compute_rate() - 200.0).abs() < 1e-9);
    }

    #[test]
    fn zero_elapsed_returns_cached_rate() {
        let (clock, c) = counter();
        c.set(0);
        clock.advance(Duration::from_secs(1));
        c.set(50);
        assert!((c.compute_rate() - 50.0).abs() < 1e-9);
        // no new sample, no new clock time
        assert!((c.compute_rate() - 50.0).abs() < 1e-9);
        c.add(10);
        assert!((c.compute_rate() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn converges_to_total_over_elapsed() {
        let (clock, c) = counter();
        c.set(0);
        let deltas = [3u64, 0, 17, 250, 1, 9, 40];
        for d in deltas {
            clock.advance(Duration::from_millis(100));
            c.add(d);
        }
        let total: u64 = deltas.iter().sum();
        let expected = total as f64 / 0.7;
        let rate = c.compute_rate();
        assert!(rate >= 0.0);
        assert!((rate - expected).abs() < 1e-6, "rate={rate} expected={expected}");
    }

    #[test]
    fn reset_source_yields_zero_rate() {
        let (clock, c) = counter();
        c.set(1_000);
        clock.advance(Duration::from_secs(1));
        c.set(2_000);
        assert!((c.compute_rate() - 1000.0).abs() < 1e-9);

        clock.advance(Duration::from_secs(1));
        c.set(5);
        assert_eq!(c.compute_rate(), 0.0);

        clock.advance(Duration::from_secs(1));
        c.set(105);
        assert!((c.compute_rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn wrapping_add_is_treated_as_reset() {
        let (clock, c) = counter();
        c.set(u64::MAX - 1);
        clock.advance(Duration::from_secs(1));
        c.add(3);
        assert_eq!(c.get(), 1);
        assert_eq!(c.compute_rate(), 0.0);
    }

    #[test]
    fn reset_clears_everything() {
        let (clock, c) = counter();
        c.set(10);
        clock.advance(Duration::from_secs(1));
        c.set(20);
        c.compute_rate();
        c.reset();
        assert_eq!(c.get(), 0);
        assert_eq!(c.compute_rate(), 0.0);
    }

    #[test]
    fn json_shape() {
        let (clock, c) = counter();
        c.add(100);
        clock.advance(Duration::from_secs(1));
        c.add(100);
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["current"], 200);
        assert!((v["rate"].as_f64().unwrap() - 100.0).abs() < 1e-9);
    }
}
