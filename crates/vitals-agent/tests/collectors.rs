#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use vitals_agent::collectors::{
    self, Collector, CpuCollector, LoadCollector, MemoryCollector, NetworkCollector,
    ProcessCollector,
};
use vitals_agent::config;
use vitals_agent::scheduler::Scheduler;
use vitals_core::{Clock, MetricContext};

fn ctx() -> Arc<MetricContext> {
    Arc::new(MetricContext::with_clock("test", Clock::manual()))
}

#[tokio::test]
async fn memory_and_load_populate_gauges() {
    let ctx = ctx();
    let mut memory = MemoryCollector::new(Arc::clone(&ctx));
    let mut load = LoadCollector::new(Arc::clone(&ctx));

    // declared up front, NaN until the first poll
    assert!(ctx.gauge("memory.total").unwrap().is_nan());

    memory.collect().await.unwrap();
    load.collect().await.unwrap();

    assert!(ctx.gauge("memory.total").unwrap().get() > 0.0);
    let used_percent = ctx.gauge("memory.used_percent").unwrap().get();
    assert!((0.0..=100.0).contains(&used_percent), "{used_percent}");
    assert!(ctx.gauge("load.1").unwrap().get() >= 0.0);
    assert!(ctx.basic_counter("uptime").is_some());
}

#[tokio::test]
async fn cpu_usage_waits_for_second_refresh() {
    let ctx = ctx();
    let mut cpu = CpuCollector::new(Arc::clone(&ctx));
    assert!(ctx.gauge("cpu.count").unwrap().get() >= 1.0);

    // first tick lands right after construction: no usable delta yet
    cpu.collect().await.unwrap();
    assert!(ctx.gauge("cpu.usage").unwrap().is_nan());
    assert!(ctx.gauge("cpu.core0.usage").is_none());

    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL + Duration::from_millis(20)).await;
    cpu.collect().await.unwrap();
    let usage = ctx.gauge("cpu.usage").unwrap().get();
    assert!((0.0..=100.0).contains(&usage), "{usage}");
    assert!(ctx.gauge("cpu.core0.usage").is_some());
}

#[tokio::test]
async fn process_counts_table_and_self() {
    let ctx = ctx();
    let mut process = ProcessCollector::new(Arc::clone(&ctx));
    process.collect().await.unwrap();

    assert!(ctx.gauge("process.count").unwrap().get() >= 1.0);
    assert!(ctx.gauge("process.self.rss").unwrap().get() > 0.0);
}

#[tokio::test]
async fn network_interfaces_are_counters() {
    let ctx = ctx();
    let mut net = NetworkCollector::new(Arc::clone(&ctx));
    net.collect().await.unwrap();

    for (name, metric) in ctx.entries() {
        if name.starts_with("net.") {
            assert_eq!(metric.kind().as_str(), "Counter", "{name}");
        }
    }
}

#[tokio::test]
async fn build_enabled_respects_toggles() {
    let cfg = config::load_from_str(
        "version: 1\ncollectors:\n  disk: { enabled: false }\n  process: { enabled: false }\n  network: { enabled: false }\n",
    )
    .unwrap();
    let built = collectors::build_enabled(&cfg.collectors, &ctx());
    let names: Vec<&str> = built.iter().map(|(c, _)| c.name()).collect();
    assert_eq!(names, vec!["cpu", "memory", "load"]);
}

#[tokio::test]
async fn scheduler_polls_and_stops() {
    let ctx = ctx();
    let mut scheduler = Scheduler::new(Arc::clone(&ctx));
    scheduler.spawn(
        Box::new(MemoryCollector::new(Arc::clone(&ctx))),
        Duration::from_millis(100),
    );
    assert_eq!(scheduler.len(), 1);

    // interval fires immediately, then every 100ms
    let timer = ctx.stats_timer("collector.memory.poll").unwrap();
    for _ in 0..50 {
        if !timer.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(!timer.is_empty());
    assert_eq!(ctx.basic_counter("collector.memory.errors").unwrap().get(), 0);

    scheduler.shutdown().await;
}

#[tokio::test]
async fn text_dump_renders_registry_until_shutdown() {
    let ctx = ctx();
    let load = Arc::new(vitals_core::Gauge::new());
    load.set(1.5);
    ctx.register(Arc::clone(&load), "load.1");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut scheduler = Scheduler::new(Arc::clone(&ctx));
    scheduler.spawn_text_dump_to(Duration::from_millis(50), move |dump| {
        let _ = tx.send(dump);
    });

    let first = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(first.contains("test.load.1 1.5"), "{first}");

    load.set(2.5);
    let mut later = String::new();
    while !later.contains("test.load.1 2.5") {
        later = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
    }

    scheduler.shutdown().await;
    // the task owned the only sender
    assert!(rx.recv().await.is_none());
}

#[tokio::test]
async fn text_dump_to_log_runs_and_stops() {
    let ctx = ctx();
    let mut scheduler = Scheduler::new(Arc::clone(&ctx));
    scheduler.spawn_text_dump(Duration::from_millis(10));
    assert_eq!(scheduler.len(), 1);
    tokio::time::sleep(Duration::from_millis(30)).await;
    scheduler.shutdown().await;
}
