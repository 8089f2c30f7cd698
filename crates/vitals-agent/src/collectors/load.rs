use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::System;
use vitals_core::error::Result;
use vitals_core::{BasicCounter, Gauge, MetricContext, MetricSet};

use super::{blocking, Collector};

pub struct LoadCollector {
    one: Arc<Gauge>,
    five: Arc<Gauge>,
    fifteen: Arc<Gauge>,
    uptime: Arc<BasicCounter>,
}

impl LoadCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        let mut set = MetricSet::for_context("load", &ctx);
        let one = set.gauge("1");
        let five = set.gauge("5");
        let fifteen = set.gauge("15");
        set.register(&ctx);

        let mut bare = MetricSet::for_context("", &ctx);
        let uptime = bare.basic_counter("uptime");
        bare.register(&ctx);

        Self {
            one,
            five,
            fifteen,
            uptime,
        }
    }
}

#[async_trait]
impl Collector for LoadCollector {
    fn name(&self) -> &'static str {
        "load"
    }

    async fn collect(&mut self) -> Result<()> {
        let (avg, uptime) = blocking("load", || (System::load_average(), System::uptime())).await?;
        self.one.set(avg.one);
        self.five.set(avg.five);
        self.fifteen.set(avg.fifteen);
        self.uptime.set(uptime);
        Ok(())
    }
}
