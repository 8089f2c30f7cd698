//! Line-oriented `name value` output.
//!
//! Same entries and order as the JSON encoder, names qualified with the
//! registry namespace. Gauges that were never set are always left out.

use std::io::Write;

use crate::error::Result;
use crate::metrics::STANDARD_PERCENTILES;
use crate::registry::{Metric, MetricContext};

pub fn encode_text<W: Write>(ctx: &MetricContext, mut w: W) -> Result<()> {
    let ns = ctx.namespace();
    for (name, metric) in ctx.visible_entries() {
        let full = if ns.is_empty() {
            name
        } else {
            format!("{ns}.{name}")
        };
        match metric {
            Metric::Counter(c) => {
                let (current, rate) = c.snapshot();
                writeln!(w, "{full}.current {current}")?;
                writeln!(w, "{full}.rate {rate:.2}")?;
            }
            Metric::BasicCounter(c) => writeln!(w, "{full} {}", c.get())?,
            Metric::Gauge(g) => {
                let v = g.get();
                if !v.is_nan() {
                    writeln!(w, "{full} {v}")?;
                }
            }
            Metric::StatsTimer(t) => {
                for (p, v) in t.percentiles(&STANDARD_PERCENTILES) {
                    writeln!(w, "{full}.p{p} {v}")?;
                }
            }
        }
    }
    Ok(())
}

/// [`encode_text`] into a `String`.
pub fn to_text(ctx: &MetricContext) -> Result<String> {
    let mut out = Vec::new();
    encode_text(ctx, &mut out)?;
    String::from_utf8(out).map_err(|e| crate::VitalsError::Internal(e.to_string()))
}
