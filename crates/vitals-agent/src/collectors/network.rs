use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::Networks;
use vitals_core::error::Result;
use vitals_core::{Counter, MetricContext};

use super::{with_source, Collector, Devices};

struct InterfaceMetrics {
    rx_bytes: Arc<Counter>,
    tx_bytes: Arc<Counter>,
    rx_packets: Arc<Counter>,
    tx_packets: Arc<Counter>,
    rx_errors: Arc<Counter>,
    tx_errors: Arc<Counter>,
}

/// Cumulative OS totals for one interface, in `InterfaceMetrics` field order.
type Totals = [u64; 6];

/// Cumulative interface totals. Rates come from `Counter::compute_rate` at report time.
pub struct NetworkCollector {
    ctx: Arc<MetricContext>,
    networks: Arc<Mutex<Networks>>,
    interfaces: Devices<InterfaceMetrics>,
}

impl NetworkCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        Self {
            ctx,
            networks: Arc::new(Mutex::new(Networks::new_with_refreshed_list())),
            interfaces: Devices::new("net"),
        }
    }
}

#[async_trait]
impl Collector for NetworkCollector {
    fn name(&self) -> &'static str {
        "network"
    }

    async fn collect(&mut self) -> Result<()> {
        let readings: Vec<(String, Totals)> = with_source("network", &self.networks, |networks| {
            networks.refresh_list();
            networks
                .iter()
                .map(|(name, data)| {
                    (
                        name.clone(),
                        [
                            data.total_received(),
                            data.total_transmitted(),
                            data.total_packets_received(),
                            data.total_packets_transmitted(),
                            data.total_errors_on_received(),
                            data.total_errors_on_transmitted(),
                        ],
                    )
                })
                .collect()
        })
        .await?;

        for (name, [rx_bytes, tx_bytes, rx_packets, tx_packets, rx_errors, tx_errors]) in readings {
            let m = self.interfaces.observe(&self.ctx, &name, |set| InterfaceMetrics {
                rx_bytes: set.counter("rx_bytes"),
                tx_bytes: set.counter("tx_bytes"),
                rx_packets: set.counter("rx_packets"),
                tx_packets: set.counter("tx_packets"),
                rx_errors: set.counter("rx_errors"),
                tx_errors: set.counter("tx_errors"),
            });
            m.rx_bytes.set(rx_bytes);
            m.tx_bytes.set(tx_bytes);
            m.rx_packets.set(rx_packets);
            m.tx_packets.set(tx_packets);
            m.rx_errors.set(rx_errors);
            m.tx_errors.set(tx_errors);
        }
        self.interfaces.sweep(&self.ctx);
        Ok(())
    }
}
