use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sysinfo::Disks;
use vitals_core::error::Result;
use vitals_core::{Gauge, MetricContext};

use super::{with_source, Collector, Devices};

struct MountMetrics {
    total: Arc<Gauge>,
    available: Arc<Gauge>,
    used_percent: Arc<Gauge>,
}

/// Space usage per mount point.
pub struct DiskCollector {
    ctx: Arc<MetricContext>,
    disks: Arc<Mutex<Disks>>,
    mounts: Devices<MountMetrics>,
}

impl DiskCollector {
    pub fn new(ctx: Arc<MetricContext>) -> Self {
        Self {
            ctx,
            disks: Arc::new(Mutex::new(Disks::new_with_refreshed_list())),
            mounts: Devices::new("disk"),
        }
    }
}

#[async_trait]
impl Collector for DiskCollector {
    fn name(&self) -> &'static str {
        "disk"
    }

    async fn collect(&mut self) -> Result<()> {
        let readings = with_source("disk", &self.disks, |disks| {
            // picks up mounts that appeared since the last poll
            disks.refresh_list();
            disks
                .iter()
                .map(|d| {
                    (
                        d.mount_point().to_string_lossy().into_owned(),
                        d.total_space(),
                        d.available_space(),
                    )
                })
                .collect::<Vec<_>>()
        })
        .await?;

        for (mount, total, available) in readings {
            let m = self.mounts.observe(&self.ctx, &mount, |set| MountMetrics {
                total: set.gauge("total"),
                available: set.gauge("available"),
                used_percent: set.gauge("used_percent"),
            });
            m.total.set(total as f64);
            m.available.set(available as f64);
            if total > 0 {
                let used = total.saturating_sub(available);
                m.used_percent.set(used as f64 / total as f64 * 100.0);
            }
        }
        self.mounts.sweep(&self.ctx);
        tracing::trace!(mounts = self.mounts.len(), "disk poll done");
        Ok(())
    }
}
