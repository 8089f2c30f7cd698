use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use sysinfo::{System, MINIMUM_CPU_UPDATE_INTERVAL};
use vitals_core::error::Result;
use vitals_core::{Gauge, MetricContext, MetricSet};

use super::{with_source, Collector, Devices};

struct CpuSource {
    system: System,
    refreshed: Instant,
}

struct CpuReading {
    usage: f32,
    cores: Vec<f32>,
}

/// Global and per-core utilisation.
///
/// sysinfo derives usage from the delta between two refreshes, so a poll that
/// lands inside `MINIMUM_CPU_UPDATE_INTERVAL` of the previous refresh is
/// skipped and the gauges keep their last value (NaN before the first one).
pub struct CpuCollector {
    ctx: Arc<MetricContext>,
    source: Arc<Mutex<CpuSource>>,
    usage: Arc<Gauge>,
    count: Arc<Gauge>,
    cores: Devices<Arc<Gauge>>,
}

impl CpuCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();

        let mut set = MetricSet::for_context("cpu", &ctx);
        let usage = set.gauge("usage");
        let count = set.gauge("count");
        set.register(&ctx);
        count.set(system.cpus().len() as f64);

        Self {
            ctx,
            source: Arc::new(Mutex::new(CpuSource {
                system,
                refreshed: Instant::now(),
            })),
            usage,
            count,
            cores: Devices::new("cpu"),
        }
    }
}

#[async_trait]
impl Collector for CpuCollector {
    fn name(&self) -> &'static str {
        "cpu"
    }

    async fn collect(&mut self) -> Result<()> {
        let reading = with_source("cpu", &self.source, |src| {
            if src.refreshed.elapsed() < MINIMUM_CPU_UPDATE_INTERVAL {
                return None;
            }
            src.system.refresh_cpu_all();
            src.refreshed = Instant::now();
            Some(CpuReading {
                usage: src.system.global_cpu_usage(),
                cores: src.system.cpus().iter().map(|c| c.cpu_usage()).collect(),
            })
        })
        .await?;

        let Some(reading) = reading else {
            tracing::trace!("cpu poll inside minimum update interval, skipped");
            return Ok(());
        };

        self.usage.set(f64::from(reading.usage));
        self.count.set(reading.cores.len() as f64);
        for (i, usage) in reading.cores.iter().enumerate() {
            let gauge = self
                .cores
                .observe(&self.ctx, &format!("core{i}"), |set| set.gauge("usage"));
            gauge.set(f64::from(*usage));
        }
        self.cores.sweep(&self.ctx);
        Ok(())
    }
}
