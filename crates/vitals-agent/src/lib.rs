//! vitals agent library entry.
//!
//! Wires the config loader, host collectors, poll scheduler, and HTTP surface
//! around a `vitals_core::MetricContext`. Consumed by the binary (`main.rs`)
//! and by integration tests.

pub mod app_state;
pub mod collectors;
pub mod config;
pub mod ops;
pub mod router;
pub mod scheduler;
