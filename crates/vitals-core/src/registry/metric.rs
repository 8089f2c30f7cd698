//! Closed set of registrable metric kinds.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::metrics::{BasicCounter, Counter, Gauge, StatsTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Counter,
    BasicCounter,
    Gauge,
    StatsTimer,
}

impl MetricKind {
    /// Encoding order used by every registry walk.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Counter,
        MetricKind::BasicCounter,
        MetricKind::Gauge,
        MetricKind::StatsTimer,
    ];

    /// Stable tag written as `Type` in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "Counter",
            MetricKind::BasicCounter => "BasicCounter",
            MetricKind::Gauge => "Gauge",
            MetricKind::StatsTimer => "StatsTimer",
        }
    }
}

/// A shared handle to one metric instance.
#[derive(Debug, Clone)]
pub enum Metric {
    Counter(Arc<Counter>),
    BasicCounter(Arc<BasicCounter>),
    Gauge(Arc<Gauge>),
    StatsTimer(Arc<StatsTimer>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::BasicCounter(_) => MetricKind::BasicCounter,
            Metric::Gauge(_) => MetricKind::Gauge,
            Metric::StatsTimer(_) => MetricKind::StatsTimer,
        }
    }
}

impl From<Arc<Counter>> for Metric {
    fn from(m: Arc<Counter>) -> Self {
        Metric::Counter(m)
    }
}

impl From<Arc<BasicCounter>> for Metric {
    fn from(m: Arc<BasicCounter>) -> Self {
        Metric::BasicCounter(m)
    }
}

impl From<Arc<Gauge>> for Metric {
    fn from(m: Arc<Gauge>) -> Self {
        Metric::Gauge(m)
    }
}

impl From<Arc<StatsTimer>> for Metric {
    fn from(m: Arc<StatsTimer>) -> Self {
        Metric::StatsTimer(m)
    }
}

/// Serializes as the metric's own value representation.
impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Counter(m) => m.serialize(serializer),
            Metric::BasicCounter(m) => m.serialize(serializer),
            Metric::Gauge(m) => m.serialize(serializer),
            Metric::StatsTimer(m) => m.serialize(serializer),
        }
    }
}
