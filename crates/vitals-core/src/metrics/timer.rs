//! Ring buffer of operation durations with nearest-rank percentiles.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};

use super::lock;
use crate::error::{Result, VitalsError};

/// Marks a slot that has never been written.
const UNINITIALIZED: i64 = -1;

/// Percentiles emitted by the JSON and text encoders.
pub const STANDARD_PERCENTILES: [f64; 7] = [50.0, 75.0, 95.0, 99.0, 99.9, 99.99, 99.999];

#[derive(Debug)]
struct History {
    samples: Vec<i64>,
    cursor: usize,
}

/// Handle returned by [`StatsTimer::start`].
#[derive(Debug, Clone, Copy)]
#[must_use = "pass the handle to StatsTimer::stop to record a sample"]
pub struct TimerHandle {
    started: Instant,
}

#[derive(Debug)]
pub struct StatsTimer {
    /// Reporting unit in nanoseconds.
    unit: i64,
    history: Mutex<History>,
}

impl StatsTimer {
    /// `unit` is the reporting unit (e.g. one millisecond); `capacity` is the
    /// number of most recent samples kept.
    pub fn new(unit: Duration, capacity: usize) -> Self {
        let unit = i64::try_from(unit.as_nanos()).unwrap_or(i64::MAX).max(1);
        Self {
            unit,
            history: Mutex::new(History {
                samples: vec![UNINITIALIZED; capacity.max(1)],
                cursor: 0,
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        lock(&self.history).samples.len()
    }

    /// Number of slots holding a sample.
    pub fn len(&self) -> usize {
        lock(&self.history)
            .samples
            .iter()
            .filter(|&&s| s != UNINITIALIZED)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start(&self) -> TimerHandle {
        TimerHandle {
            started: Instant::now(),
        }
    }

    /// Record the time since `handle` was started. Returns it in the timer's unit.
    pub fn stop(&self, handle: TimerHandle) -> f64 {
        self.record(handle.started.elapsed())
    }

    /// Record an externally measured duration. Returns it in the timer's unit.
    pub fn record(&self, elapsed: Duration) -> f64 {
        let nanos = i64::try_from(elapsed.as_nanos()).unwrap_or(i64::MAX);
        let mut history = lock(&self.history);
        let cursor = history.cursor;
        history.samples[cursor] = nanos;
        history.cursor = (cursor + 1) % history.samples.len();
        self.scale(nanos)
    }

    /// Nearest-rank percentile over the recorded samples, in the timer's unit.
    pub fn percentile(&self, p: f64) -> Result<f64> {
        check_percentile(p)?;
        let sorted = self.sorted_samples();
        if sorted.is_empty() {
            return Err(VitalsError::NoSamples);
        }
        Ok(self.scale(pick(&sorted, p)))
    }

    /// All of `ps` against one snapshot; invalid percentiles are skipped.
    /// Empty when no samples have been recorded.
    pub fn percentiles(&self, ps: &[f64]) -> Vec<(f64, f64)> {
        let sorted = self.sorted_samples();
        if sorted.is_empty() {
            return Vec::new();
        }
        ps.iter()
            .filter(|&&p| check_percentile(p).is_ok())
            .map(|&p| (p, self.scale(pick(&sorted, p))))
            .collect()
    }

    pub fn reset(&self) {
        let mut history = lock(&self.history);
        history.samples.fill(UNINITIALIZED);
        history.cursor = 0;
    }

    fn sorted_samples(&self) -> Vec<i64> {
        let mut out: Vec<i64> = {
            let history = lock(&self.history);
            history
                .samples
                .iter()
                .copied()
                .filter(|&s| s != UNINITIALIZED)
                .collect()
        };
        out.sort_unstable();
        out
    }

    fn scale(&self, nanos: i64) -> f64 {
        nanos as f64 / self.unit as f64
    }
}

fn check_percentile(p: f64) -> Result<()> {
    // also rejects NaN
    if !(0.0..=100.0).contains(&p) {
        return Err(VitalsError::InvalidPercentile(p));
    }
    Ok(())
}

/// `sorted` must be non-empty. Index is `floor(p/100 * n)`, clamped to the last sample.
fn pick(sorted: &[i64], p: f64) -> i64 {
    let n = sorted.len();
    let idx = ((p / 100.0) * n as f64).floor() as usize;
    sorted[idx.min(n - 1)]
}

#[derive(Serialize)]
struct PercentileEntry {
    percentile: String,
    value: f64,
}

#[derive(Serialize)]
struct TimerJson {
    #[serde(rename = "Percentiles")]
    percentiles: Vec<PercentileEntry>,
}

impl Serialize for StatsTimer {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let percentiles = self
            .percentiles(&STANDARD_PERCENTILES)
            .into_iter()
            .map(|(p, value)| PercentileEntry {
                percentile: p.to_string(),
                value,
            })
            .collect();
        TimerJson { percentiles }.serialize(serializer)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SAMPLES: [u64; 15] = [84, 42, 97, 34, 56, 85, 65, 74, 51, 78, 87, 85, 69, 94, 86];

    fn millis_timer(capacity: usize) -> StatsTimer {
        StatsTimer::new(Duration::from_millis(1), capacity)
    }

    #[test]
    fn percentile_90_of_reference_set() {
        let t = millis_timer(20);
        for s in SAMPLES {
            t.record(Duration::from_millis(s));
        }
        assert_eq!(t.percentile(90.0).unwrap(), 94.0);
        assert_eq!(t.percentile(0.0).unwrap(), 34.0);
        assert_eq!(t.percentile(100.0).unwrap(), 97.0);
    }

    #[test]
    fn out_of_range_and_empty_fail() {
        let t = millis_timer(4);
        assert_eq!(t.percentile(50.0).unwrap_err().code(), "NO_SAMPLES");
        t.record(Duration::from_millis(1));
        assert_eq!(t.percentile(101.0).unwrap_err().code(), "INVALID_PERCENTILE");
        assert!(t.percentile(f64::NAN).is_err());
    }

    #[test]
    fn ring_keeps_only_latest_capacity() {
        let t = millis_timer(3);
        for s in [1000, 2000, 3000, 4, 5, 6] {
            t.record(Duration::from_millis(s));
        }
        assert_eq!(t.len(), 3);
        assert_eq!(t.percentile(100.0).unwrap(), 6.0);
        assert_eq!(t.percentile(0.0).unwrap(), 4.0);
    }

    #[test]
    fn stop_records_one_sample_in_unit() {
        let t = StatsTimer::new(Duration::from_nanos(1), 8);
        let h = t.start();
        let elapsed = t.stop(h);
        assert!(elapsed >= 0.0);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn json_lists_standard_percentiles() {
        let t = millis_timer(16);
        assert_eq!(
            serde_json::to_string(&t).unwrap(),
            r#"{"Percentiles":[]}"#
        );
        for s in SAMPLES {
            t.record(Duration::from_millis(s));
        }
        let v = serde_json::to_value(&t).unwrap();
        let ps = v["Percentiles"].as_array().unwrap();
        assert_eq!(ps.len(), STANDARD_PERCENTILES.len());
        assert_eq!(ps[0]["percentile"], "50");
        assert_eq!(ps[4]["percentile"], "99.9");
        assert_eq!(ps[6]["percentile"], "99.999");
        assert_eq!(ps[6]["value"], 97.0);
    }

    #[test]
    fn concurrent_records_fill_whole_slots() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 250;
        let t = Arc::new(StatsTimer::new(Duration::from_nanos(1), 500));

        let workers: Vec<_> = (0..THREADS)
            .map(|n| {
                let t = Arc::clone(&t);
                std::thread::spawn(move || {
                    for i in 0..PER_THREAD {
                        t.record(Duration::from_nanos(n * 1_000_000 + i + 1));
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(t.len(), 500);
        let kept = t.sorted_samples();
        let mut distinct = kept.clone();
        distinct.dedup();
        // every recorded value is unique, so a lost or doubled write shows up here
        assert_eq!(distinct.len(), kept.len());
        for s in kept {
            let (n, i) = ((s as u64) / 1_000_000, (s as u64) % 1_000_000);
            assert!(n < THREADS && (1..=PER_THREAD).contains(&i), "foreign sample {s}");
        }
    }

    #[test]
    fn concurrent_start_stop_below_capacity() {
        let t = Arc::new(millis_timer(4096));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let t = Arc::clone(&t);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let h = t.start();
                        assert!(t.stop(h) >= 0.0);
                    }
                })
            })
            .collect();
        for w in workers {
            w.join().unwrap();
        }

        assert_eq!(t.len(), 1600);
        assert!(t.percentile(100.0).unwrap() >= t.percentile(0.0).unwrap());
    }

    #[test]
    fn reset_empties_history() {
        let t = millis_timer(2);
        t.record(Duration::from_millis(3));
        t.reset();
        assert!(t.is_empty());
        assert_eq!(t.capacity(), 2);
    }
}
