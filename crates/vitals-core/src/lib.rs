//! vitals core: metric primitives, the shared low-resolution clock, and the
//! `MetricContext` registry with its JSON and line-text encoders.
//!
//! This crate carries no runtime or transport dependencies. Collectors and
//! reporting surfaces live in `vitals-agent`; everything here is plain
//! synchronous code guarded by per-metric locks or atomics.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Bad percentile requests and empty timers surface as `VitalsError`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod metrics;
pub mod registry;
pub mod text;

/// Shared result type.
pub use error::{Result, VitalsError};
pub use metrics::{BasicCounter, Clock, Counter, Gauge, StatsTimer, TimerHandle};
pub use registry::{Metric, MetricContext, MetricKind, MetricSet};
