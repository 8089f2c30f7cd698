use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::System;
use vitals_core::error::Result;
use vitals_core::{Gauge, MetricContext, MetricSet};

use super::{with_source, Collector};

struct MemoryReading {
    total: u64,
    used: u64,
    available: u64,
    swap_total: u64,
    swap_used: u64,
}

pub struct MemoryCollector {
    source: Arc<Mutex<System>>,
    total: Arc<Gauge>,
    used: Arc<Gauge>,
    available: Arc<Gauge>,
    used_percent: Arc<Gauge>,
    swap_total: Arc<Gauge>,
    swap_used: Arc<Gauge>,
}

impl MemoryCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        let mut set = MetricSet::for_context("memory", &ctx);
        let collector = Self {
            source: Arc::new(Mutex::new(System::new())),
            total: set.gauge("total"),
            used: set.gauge("used"),
            available: set.gauge("available"),
            used_percent: set.gauge("used_percent"),
            swap_total: set.gauge("swap_total"),
            swap_used: set.gauge("swap_used"),
        };
        set.register(&ctx);
        collector
    }
}

#[async_trait]
impl Collector for MemoryCollector {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn collect(&mut self) -> Result<()> {
        let r = with_source("memory", &self.source, |system| {
            system.refresh_memory();
            MemoryReading {
                total: system.total_memory(),
                used: system.used_memory(),
                available: system.available_memory(),
                swap_total: system.total_swap(),
                swap_used: system.used_swap(),
            }
        })
        .await?;

        self.total.set(r.total as f64);
        self.used.set(r.used as f64);
        self.available.set(r.available as f64);
        if r.total > 0 {
            self.used_percent.set(r.used as f64 / r.total as f64 * 100.0);
        }

        // left NaN on hosts without swap
        if r.swap_total > 0 {
            self.swap_total.set(r.swap_total as f64);
            self.swap_used.set(r.swap_used as f64);
        }
        Ok(())
    }
}
