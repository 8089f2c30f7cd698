//! Host collectors.
//!
//! Each [`Collector`] declares its metrics through a `MetricSet` when it is
//! built, registers them into the shared `MetricContext`, and then only
//! mutates those instances on every poll. Per-device metrics (mount points,
//! interfaces, cores) are tracked by [`Devices`] so vanished devices are
//! unregistered.

pub mod cpu;
pub mod disk;
pub mod load;
pub mod memory;
pub mod network;
pub mod process;

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use vitals_core::error::{Result, VitalsError};
use vitals_core::{MetricContext, MetricSet};

use crate::config::CollectorsSection;

pub use cpu::CpuCollector;
pub use disk::DiskCollector;
pub use load::LoadCollector;
pub use memory::MemoryCollector;
pub use network::NetworkCollector;
pub use process::ProcessCollector;

#[async_trait]
pub trait Collector: Send {
    /// Short name (`"cpu"`, `"disk"`), used for logging and bookkeeping metrics.
    fn name(&self) -> &'static str;

    /// Refresh the underlying source and update the registered metrics.
    async fn collect(&mut self) -> Result<()>;
}

/// Build every enabled collector with its poll interval.
pub fn build_enabled(
    cfg: &CollectorsSection,
    ctx: &Arc<MetricContext>,
) -> Vec<(Box<dyn Collector>, Duration)> {
    let mut out: Vec<(Box<dyn Collector>, Duration)> = Vec::new();
    for (name, toggle) in cfg.toggles() {
        if !toggle.enabled {
            tracing::info!(collector = name, "collector disabled");
            continue;
        }
        let ctx = Arc::clone(ctx);
        let collector: Box<dyn Collector> = match name {
            "cpu" => Box::new(CpuCollector::new(ctx)),
            "memory" => Box::new(MemoryCollector::new(ctx)),
            "disk" => Box::new(DiskCollector::new(ctx)),
            "network" => Box::new(NetworkCollector::new(ctx)),
            "load" => Box::new(LoadCollector::new(ctx)),
            "process" => Box::new(ProcessCollector::new(ctx)),
            other => {
                tracing::warn!(collector = other, "unknown collector");
                continue;
            }
        };
        out.push((collector, cfg.interval_for(toggle)));
    }
    out
}

struct Device<T> {
    set: MetricSet,
    metrics: T,
    seen: bool,
}

/// Metric sets for devices discovered at poll time, keyed by device name.
pub(crate) struct Devices<T> {
    prefix: &'static str,
    entries: HashMap<String, Device<T>>,
}

impl<T> Devices<T> {
    pub(crate) fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            entries: HashMap::new(),
        }
    }

    /// Metrics for `device`, declaring and registering them on first sight.
    ///
    /// If any declared name is already registered (by another device or
    /// another collector) the segment gets a `-<n>` suffix until it is free.
    pub(crate) fn observe(
        &mut self,
        ctx: &MetricContext,
        device: &str,
        declare: impl Fn(&mut MetricSet) -> T,
    ) -> &T {
        let prefix = self.prefix;
        let entry = match self.entries.entry(device.to_string()) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(v) => {
                let segment = metric_segment(device);
                let mut attempt = 1u32;
                let (set, metrics) = loop {
                    let name = if attempt == 1 {
                        format!("{prefix}.{segment}")
                    } else {
                        format!("{prefix}.{segment}-{attempt}")
                    };
                    let mut set = MetricSet::for_context(name, ctx);
                    let metrics = declare(&mut set);
                    match set.clash(ctx) {
                        None => break (set, metrics),
                        Some(taken) => {
                            tracing::warn!(prefix, device, taken, "metric name in use, suffixing device segment");
                            attempt += 1;
                        }
                    }
                };
                set.register(ctx);
                tracing::debug!(prefix, device, set = set.prefix(), metrics = set.len(), "registered device metrics");
                v.insert(Device {
                    set,
                    metrics,
                    seen: false,
                })
            }
        };
        entry.seen = true;
        &entry.metrics
    }

    /// Unregister devices not observed since the previous sweep.
    pub(crate) fn sweep(&mut self, ctx: &MetricContext) {
        let prefix = self.prefix;
        self.entries.retain(|device, entry| {
            if !entry.seen {
                entry.set.unregister(ctx);
                tracing::debug!(prefix, device = %device, "device gone, unregistered metrics");
                return false;
            }
            entry.seen = false;
            true
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Turn a device name into one dot-free metric name segment.
///
/// `/` becomes `_` and `-` escapes everything else that would be ambiguous
/// (`_` → `-_`, `-` → `--`, `.` → `-d`, space → `-w`), so distinct devices
/// never share a segment. The root mount is `_`.
pub(crate) fn metric_segment(device: &str) -> String {
    let mut out = String::with_capacity(device.len());
    for c in device.chars() {
        match c {
            '/' => out.push('_'),
            '_' => out.push_str("-_"),
            '-' => out.push_str("--"),
            '.' => out.push_str("-d"),
            ' ' => out.push_str("-w"),
            c => out.push(c),
        }
    }
    out
}

/// Run blocking source reads off the async workers.
pub(crate) async fn blocking<R, F>(name: &'static str, read: F) -> Result<R>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(read)
        .await
        .map_err(|e| VitalsError::Collector {
            name,
            msg: e.to_string(),
        })
}

/// [`blocking`] with exclusive access to a shared sysinfo handle.
pub(crate) async fn with_source<S, R, F>(name: &'static str, source: &Arc<Mutex<S>>, read: F) -> Result<R>
where
    S: Send + 'static,
    F: FnOnce(&mut S) -> R + Send + 'static,
    R: Send + 'static,
{
    let source = Arc::clone(source);
    blocking(name, move || {
        let mut guard = source.lock().unwrap_or_else(PoisonError::into_inner);
        read(&mut guard)
    })
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use vitals_core::{Clock, Gauge};

    #[test]
    fn segments() {
        assert_eq!(metric_segment("/"), "_");
        assert_eq!(metric_segment("/root"), "_root");
        assert_eq!(metric_segment("/var/lib"), "_var_lib");
        assert_eq!(metric_segment("/var.lib"), "_var-dlib");
        assert_eq!(metric_segment("/var_lib"), "_var-_lib");
        assert_eq!(metric_segment("eth0.100"), "eth0-d100");
        assert_eq!(metric_segment("eth0_100"), "eth0-_100");
        assert_eq!(metric_segment("br-lan"), "br--lan");
        assert_eq!(metric_segment("core0"), "core0");
    }

    #[test]
    fn segments_do_not_collide() {
        let devices = [
            "/", "/root", "/_root", "/var/lib", "/var.lib", "/var_lib", "/var-lib", "/var lib",
            "eth0.100", "eth0_100", "eth0-100", "_/", "/_", "-_", "_-",
        ];
        let mut seen = std::collections::HashSet::new();
        for d in devices {
            assert!(seen.insert(metric_segment(d)), "{d} collided");
        }
    }

    #[test]
    fn devices_register_and_sweep() {
        let ctx = MetricContext::with_clock("t", Clock::manual());
        let mut devices: Devices<Arc<Gauge>> = Devices::new("disk");

        devices.observe(&ctx, "/", |set| set.gauge("total")).set(1.0);
        devices.observe(&ctx, "/home", |set| set.gauge("total")).set(2.0);
        devices.sweep(&ctx);
        assert_eq!(ctx.gauge("disk._.total").unwrap().get(), 1.0);
        assert_eq!(ctx.gauge("disk._home.total").unwrap().get(), 2.0);

        // only "/" seen this round
        devices.observe(&ctx, "/", |set| set.gauge("total"));
        devices.sweep(&ctx);
        assert_eq!(devices.len(), 1);
        assert!(ctx.gauge("disk._home.total").is_none());
        assert!(ctx.gauge("disk._.total").is_some());
    }

    #[test]
    fn root_survives_when_root_home_vanishes() {
        let ctx = MetricContext::with_clock("t", Clock::manual());
        let mut devices: Devices<Arc<Gauge>> = Devices::new("disk");

        devices.observe(&ctx, "/", |set| set.gauge("total")).set(100.0);
        devices.observe(&ctx, "/root", |set| set.gauge("total")).set(5.0);
        devices.sweep(&ctx);
        assert_eq!(devices.len(), 2);
        assert_eq!(ctx.gauge("disk._.total").unwrap().get(), 100.0);
        assert_eq!(ctx.gauge("disk._root.total").unwrap().get(), 5.0);

        devices.observe(&ctx, "/", |set| set.gauge("total"));
        devices.sweep(&ctx);
        assert_eq!(devices.len(), 1);
        assert_eq!(ctx.gauge("disk._.total").unwrap().get(), 100.0);
        assert!(ctx.gauge("disk._root.total").is_none());
    }

    #[test]
    fn taken_name_gets_suffixed() {
        let ctx = MetricContext::with_clock("t", Clock::manual());
        let squatter = Arc::new(Gauge::new());
        squatter.set(7.0);
        ctx.register(Arc::clone(&squatter), "net.eth0.rx");

        let mut devices: Devices<Arc<Gauge>> = Devices::new("net");
        devices.observe(&ctx, "eth0", |set| set.gauge("rx")).set(1.0);
        devices.sweep(&ctx);
        assert_eq!(ctx.gauge("net.eth0.rx").unwrap().get(), 7.0);
        assert_eq!(ctx.gauge("net.eth0-2.rx").unwrap().get(), 1.0);

        // gone again: the squatter is left alone
        devices.sweep(&ctx);
        assert!(ctx.gauge("net.eth0-2.rx").is_none());
        assert_eq!(ctx.gauge("net.eth0.rx").unwrap().get(), 7.0);
    }

    #[tokio::test]
    async fn blocking_reports_panics_as_collector_errors() {
        let err = blocking("disk", || -> u64 { panic!("boom") }).await.unwrap_err();
        assert_eq!(err.code(), "COLLECTOR");

        let source = Arc::new(Mutex::new(41u64));
        let v = with_source("disk", &source, |n| {
            *n += 1;
            *n
        })
        .await
        .unwrap();
        assert_eq!(v, 42);
    }
}
