//! `MetricContext`: the name -> metric registry shared by collectors and reporters.
//!
//! Collectors register instances under unique names and mutate them directly;
//! the registry only owns the association. Reporting walks a snapshot of the
//! maps in a fixed kind order (Counter, BasicCounter, Gauge, StatsTimer) with
//! names sorted inside each kind, applying the output filter per entry.

mod metric;
mod set;

use std::io;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::{BufMut, Bytes, BytesMut};
use dashmap::DashMap;
use serde::{Serialize, Serializer};

use crate::error::Result;
use crate::metrics::{BasicCounter, Clock, Counter, Gauge, StatsTimer};

pub use metric::{Metric, MetricKind};
pub use set::MetricSet;

/// Decides whether `(name, metric)` is included in exported output.
pub type OutputFilter = Arc<dyn Fn(&str, &Metric) -> bool + Send + Sync>;

pub struct MetricContext {
    namespace: String,
    clock: Arc<Clock>,
    counters: DashMap<String, Arc<Counter>>,
    basic_counters: DashMap<String, Arc<BasicCounter>>,
    gauges: DashMap<String, Arc<Gauge>>,
    timers: DashMap<String, Arc<StatsTimer>>,
    filter: RwLock<OutputFilter>,
}

impl MetricContext {
    /// Registry whose metrics read the process-wide clock.
    pub fn new(namespace: impl Into<String>) -> Self {
        Self::with_clock(namespace, Clock::global())
    }

    pub fn with_clock(namespace: impl Into<String>, clock: Arc<Clock>) -> Self {
        let accept_all: OutputFilter = Arc::new(|_: &str, _: &Metric| true);
        Self {
            namespace: namespace.into(),
            clock,
            counters: DashMap::new(),
            basic_counters: DashMap::new(),
            gauges: DashMap::new(),
            timers: DashMap::new(),
            filter: RwLock::new(accept_all),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Clock that counters created for this registry should read.
    pub fn clock(&self) -> Arc<Clock> {
        Arc::clone(&self.clock)
    }

    /// Insert `metric` under `name`, replacing any same-kind entry with that name.
    pub fn register(&self, metric: impl Into<Metric>, name: impl Into<String>) {
        let name = name.into();
        match metric.into() {
            Metric::Counter(m) => {
                self.counters.insert(name, m);
            }
            Metric::BasicCounter(m) => {
                self.basic_counters.insert(name, m);
            }
            Metric::Gauge(m) => {
                self.gauges.insert(name, m);
            }
            Metric::StatsTimer(m) => {
                self.timers.insert(name, m);
            }
        }
    }

    /// Remove `name` from the map matching the metric's kind. Returns whether it was present.
    pub fn unregister(&self, metric: impl Into<Metric>, name: &str) -> bool {
        match metric.into().kind() {
            MetricKind::Counter => self.counters.remove(name).is_some(),
            MetricKind::BasicCounter => self.basic_counters.remove(name).is_some(),
            MetricKind::Gauge => self.gauges.remove(name).is_some(),
            MetricKind::StatsTimer => self.timers.remove(name).is_some(),
        }
    }

    pub fn counter(&self, name: &str) -> Option<Arc<Counter>> {
        self.counters.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn basic_counter(&self, name: &str) -> Option<Arc<BasicCounter>> {
        self.basic_counters.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn gauge(&self, name: &str) -> Option<Arc<Gauge>> {
        self.gauges.get(name).map(|r| Arc::clone(r.value()))
    }

    pub fn stats_timer(&self, name: &str) -> Option<Arc<StatsTimer>> {
        self.timers.get(name).map(|r| Arc::clone(r.value()))
    }

    /// Whether a metric of `kind` is registered under `name`.
    pub fn contains(&self, kind: MetricKind, name: &str) -> bool {
        match kind {
            MetricKind::Counter => self.counters.contains_key(name),
            MetricKind::BasicCounter => self.basic_counters.contains_key(name),
            MetricKind::Gauge => self.gauges.contains_key(name),
            MetricKind::StatsTimer => self.timers.contains_key(name),
        }
    }

    pub fn len(&self) -> usize {
        self.counters.len() + self.basic_counters.len() + self.gauges.len() + self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the output filter wholesale.
    pub fn set_output_filter<F>(&self, filter: F)
    where
        F: Fn(&str, &Metric) -> bool + Send + Sync + 'static,
    {
        *self.filter.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(filter);
    }

    /// Every registered entry in encoding order, ignoring the filter.
    pub fn entries(&self) -> Vec<(String, Metric)> {
        let mut out = Vec::with_capacity(self.len());
        for kind in MetricKind::ALL {
            let start = out.len();
            match kind {
                MetricKind::Counter => out.extend(snapshot(&self.counters)),
                MetricKind::BasicCounter => out.extend(snapshot(&self.basic_counters)),
                MetricKind::Gauge => out.extend(snapshot(&self.gauges)),
                MetricKind::StatsTimer => out.extend(snapshot(&self.timers)),
            }
            out[start..].sort_by(|a, b| a.0.cmp(&b.0));
        }
        out
    }

    /// Entries that pass the output filter, in encoding order.
    pub fn visible_entries(&self) -> Vec<(String, Metric)> {
        let filter = Arc::clone(&self.filter.read().unwrap_or_else(PoisonError::into_inner));
        self.entries()
            .into_iter()
            .filter(|(name, metric)| filter(name.as_str(), metric))
            .collect()
    }

    /// Stream the visible entries to `writer` as a JSON array of `{Type, Name, Value}`.
    pub fn encode_json<W: io::Write>(&self, writer: W) -> Result<()> {
        let entries = self.visible_entries();
        let mut ser = serde_json::Serializer::new(writer);
        (&mut ser).collect_seq(entries.iter().map(|(name, metric)| JsonEntry {
            kind: metric.kind().as_str(),
            name,
            value: metric,
        }))?;
        Ok(())
    }

    /// JSON encoding into a buffer, newline-terminated.
    pub fn to_json_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(4096).writer();
        self.encode_json(&mut buf)?;
        let mut buf = buf.into_inner();
        buf.put_u8(b'\n');
        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for MetricContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricContext")
            .field("namespace", &self.namespace)
            .field("metrics", &self.len())
            .finish()
    }
}

fn snapshot<T>(map: &DashMap<String, Arc<T>>) -> Vec<(String, Metric)>
where
    Arc<T>: Into<Metric>,
{
    map.iter()
        .map(|r| (r.key().clone(), Arc::clone(r.value()).into()))
        .collect()
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    #[serde(rename = "Type")]
    kind: &'static str,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Value")]
    value: &'a Metric,
}
