//! Shared application state for the vitals agent.

use std::sync::Arc;

use vitals_core::error::Result;
use vitals_core::{BasicCounter, Clock, Metric, MetricContext, MetricSet};

use crate::config::AgentConfig;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: AgentConfig,
    metrics: Arc<MetricContext>,
    http_requests: Arc<BasicCounter>,
}

impl AppState {
    /// Start the global clock with the configured jiffy and build the registry.
    pub fn new(cfg: AgentConfig) -> Result<Self> {
        let clock = Clock::init_global(cfg.agent.jiffy());
        let metrics = Arc::new(MetricContext::with_clock(cfg.agent.namespace.clone(), clock));
        Self::with_context(cfg, metrics)
    }

    /// State around an existing registry (tests drive it with a manual clock).
    pub fn with_context(cfg: AgentConfig, metrics: Arc<MetricContext>) -> Result<Self> {
        cfg.validate()?;

        if cfg.output.hide_nan_gauges {
            metrics.set_output_filter(|_, m| match m {
                Metric::Gauge(g) => !g.is_nan(),
                _ => true,
            });
        }

        let mut set = MetricSet::for_context("agent", &metrics);
        let http_requests = set.basic_counter("http_requests");
        set.register(&metrics);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                metrics,
                http_requests,
            }),
        })
    }

    pub fn cfg(&self) -> &AgentConfig {
        &self.inner.cfg
    }

    pub fn metrics(&self) -> Arc<MetricContext> {
        Arc::clone(&self.inner.metrics)
    }

    pub fn count_request(&self) {
        self.inner.http_requests.add(1);
    }
}
