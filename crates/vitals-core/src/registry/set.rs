//! Explicit registration lists.
//!
//! A collector declares its metrics once, through a `MetricSet`, and the set
//! registers or unregisters all of them as `"{prefix}.{suffix}"`.

use std::sync::Arc;
use std::time::Duration;

use super::{Metric, MetricContext};
use crate::metrics::{BasicCounter, Clock, Counter, Gauge, StatsTimer};

#[derive(Debug)]
pub struct MetricSet {
    prefix: String,
    clock: Arc<Clock>,
    entries: Vec<(String, Metric)>,
}

impl MetricSet {
    pub fn new(prefix: impl Into<String>, clock: Arc<Clock>) -> Self {
        Self {
            prefix: prefix.into(),
            clock,
            entries: Vec::new(),
        }
    }

    /// Shorthand for a set whose counters read `ctx`'s clock.
    pub fn for_context(prefix: impl Into<String>, ctx: &MetricContext) -> Self {
        Self::new(prefix, ctx.clock())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn counter(&mut self, suffix: &str) -> Arc<Counter> {
        let m = Arc::new(Counter::with_clock(Arc::clone(&self.clock)));
        self.push(suffix, Arc::clone(&m));
        m
    }

    pub fn basic_counter(&mut self, suffix: &str) -> Arc<BasicCounter> {
        let m = Arc::new(BasicCounter::new());
        self.push(suffix, Arc::clone(&m));
        m
    }

    pub fn gauge(&mut self, suffix: &str) -> Arc<Gauge> {
        let m = Arc::new(Gauge::new());
        self.push(suffix, Arc::clone(&m));
        m
    }

    pub fn stats_timer(&mut self, suffix: &str, unit: Duration, capacity: usize) -> Arc<StatsTimer> {
        let m = Arc::new(StatsTimer::new(unit, capacity));
        self.push(suffix, Arc::clone(&m));
        m
    }

    /// Full names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn register(&self, ctx: &MetricContext) {
        for (name, metric) in &self.entries {
            ctx.register(metric.clone(), name.clone());
        }
    }

    /// First name in this set that `ctx` already holds for the same kind.
    pub fn clash(&self, ctx: &MetricContext) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, metric)| ctx.contains(metric.kind(), name))
            .map(|(name, _)| name.as_str())
    }

    pub fn unregister(&self, ctx: &MetricContext) {
        for (name, metric) in &self.entries {
            ctx.unregister(metric.clone(), name);
        }
    }

    fn push(&mut self, suffix: &str, metric: impl Into<Metric>) {
        let name = if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}.{}", self.prefix, suffix)
        };
        self.entries.push((name, metric.into()));
    }
}
