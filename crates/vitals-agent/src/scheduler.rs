//! Collector poll loops.
//!
//! One tokio task per collector, each on its own interval. All loops listen
//! on a shared `watch` channel and exit when shutdown is signalled.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use vitals_core::{text, BasicCounter, MetricContext, MetricSet, StatsTimer};

use crate::collectors::Collector;

/// Capacity of each collector's poll-duration history.
const POLL_HISTORY: usize = 100;

pub struct Scheduler {
    ctx: Arc<MetricContext>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

struct PollStats {
    poll: Arc<StatsTimer>,
    errors: Arc<BasicCounter>,
}

impl Scheduler {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            ctx,
            shutdown,
            tasks: Vec::new(),
        }
    }

    /// Start polling `collector` every `every`. Its poll duration (ms) and
    /// error count are registered as `collector.<name>.poll|errors`.
    pub fn spawn(&mut self, collector: Box<dyn Collector>, every: Duration) {
        let mut set = MetricSet::for_context(format!("collector.{}", collector.name()), &self.ctx);
        let stats = PollStats {
            poll: set.stats_timer("poll", Duration::from_millis(1), POLL_HISTORY),
            errors: set.basic_counter("errors"),
        };
        set.register(&self.ctx);

        tracing::info!(collector = collector.name(), ?every, "collector started");
        let rx = self.shutdown.subscribe();
        self.tasks.push(tokio::spawn(run_collector(collector, every, stats, rx)));
    }

    /// Log the registry in line-text form every `every`.
    pub fn spawn_text_dump(&mut self, every: Duration) {
        self.spawn_text_dump_to(every, |dump| tracing::info!(target: "vitals::dump", "\n{dump}"));
    }

    /// Hand the line-text rendering of the registry to `sink` every `every`.
    /// The first dump happens immediately.
    pub fn spawn_text_dump_to<F>(&mut self, every: Duration, mut sink: F)
    where
        F: FnMut(String) + Send + 'static,
    {
        let ctx = Arc::clone(&self.ctx);
        let mut rx = self.shutdown.subscribe();
        self.tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = rx.changed() => break,
                }
                match text::to_text(&ctx) {
                    Ok(dump) => sink(dump),
                    Err(e) => tracing::warn!(error = %e, "text dump failed"),
                }
            }
        }));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Signal every loop to stop and wait for them.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for res in join_all(self.tasks).await {
            if let Err(e) = res {
                tracing::warn!(error = %e, "collector task ended abnormally");
            }
        }
    }
}

async fn run_collector(
    mut collector: Box<dyn Collector>,
    every: Duration,
    stats: PollStats,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = collector.name();
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let handle = stats.poll.start();
        if let Err(e) = collector.collect().await {
            stats.errors.add(1);
            tracing::warn!(collector = name, code = e.code(), error = %e, "collect failed");
        }
        stats.poll.stop(handle);
    }
    tracing::debug!(collector = name, "collector stopped");
}
