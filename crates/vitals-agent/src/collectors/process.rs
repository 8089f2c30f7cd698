use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::{Pid, ProcessesToUpdate, System};
use vitals_core::error::{Result, VitalsError};
use vitals_core::{Gauge, MetricContext, MetricSet};

use super::{with_source, Collector};

struct ProcessReading {
    count: usize,
    rss: Option<u64>,
    cpu: Option<f32>,
}

/// Process table size plus the agent's own footprint.
pub struct ProcessCollector {
    source: Arc<Mutex<System>>,
    pid: std::result::Result<Pid, &'static str>,
    count: Arc<Gauge>,
    self_rss: Arc<Gauge>,
    self_cpu: Arc<Gauge>,
}

impl ProcessCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        let mut set = MetricSet::for_context("process", &ctx);
        let collector = Self {
            source: Arc::new(Mutex::new(System::new())),
            pid: sysinfo::get_current_pid(),
            count: set.gauge("count"),
            self_rss: set.gauge("self.rss"),
            self_cpu: set.gauge("self.cpu"),
        };
        set.register(&ctx);
        collector
    }
}

#[async_trait]
impl Collector for ProcessCollector {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn collect(&mut self) -> Result<()> {
        let pid = self.pid.map_err(|msg| VitalsError::Collector {
            name: "process",
            msg: msg.to_string(),
        })?;

        let reading = with_source("process", &self.source, move |system| {
            // process table only; memory and cpu totals belong to other collectors
            system.refresh_processes(ProcessesToUpdate::All, true);
            let me = system.process(pid);
            ProcessReading {
                count: system.processes().len(),
                rss: me.map(|p| p.memory()),
                cpu: me.map(|p| p.cpu_usage()),
            }
        })
        .await?;

        self.count.set(reading.count as f64);
        if let Some(rss) = reading.rss {
            self.self_rss.set(rss as f64);
        }
        if let Some(cpu) = reading.cpu {
            self.self_cpu.set(f64::from(cpu));
        }
        Ok(())
    }
}
