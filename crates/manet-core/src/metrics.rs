use std::collections::HashMap;

use manet_abstract::{FlowId, RawFlowStats};
use serde::Serialize;
use tracing::warn;

/// Derived figures for one flow. Fields that are mathematically undefined
/// for the flow (zero-length receive window, single received packet, zero
/// transmitted bytes) are `None`, never a division artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlowMetrics {
    pub flow: FlowId,
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub lost_packets: u64,
    pub loss_percent: f64,
    pub throughput_kbps: Option<f64>,
    pub avg_delay_ms: Option<f64>,
    pub avg_jitter_ms: Option<f64>,
    pub efficiency_percent: Option<f64>,
}

impl FlowMetrics {
    /// True when the flow received at least one packet and therefore
    /// contributes to the aggregate and to the tabular export.
    pub fn is_reporting(&self) -> bool {
        self.rx_packets > 0
    }
}

/// Arithmetic means over all flows with at least one received packet. Each
/// mean is taken over the flows where that figure is defined, so a
/// single-packet flow does not drag the jitter mean toward zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateMetrics {
    pub flow_count: usize,
    pub mean_throughput_kbps: Option<f64>,
    pub mean_loss_percent: f64,
    pub mean_delay_ms: Option<f64>,
    pub mean_jitter_ms: Option<f64>,
}

/// Aggregation output: per-flow metrics in flow-id order, the aggregate
/// block (absent when no flow received anything), and the flows dropped for
/// inconsistent counters.
#[derive(Debug, Clone, Serialize)]
pub struct FlowSummary {
    pub flows: Vec<FlowMetrics>,
    pub aggregate: Option<AggregateMetrics>,
    pub excluded: Vec<FlowId>,
}

/// Reject counters the engine should be structurally unable to produce.
/// Returns the reason the flow is unusable, if any.
fn integrity_error(stats: &RawFlowStats) -> Option<String> {
    if stats.rx_packets > stats.tx_packets {
        return Some(format!(
            "received {} packets but only {} were transmitted",
            stats.rx_packets, stats.tx_packets
        ));
    }
    if stats.rx_bytes > 0 && stats.rx_packets == 0 {
        return Some(format!("{} bytes received across zero packets", stats.rx_bytes));
    }
    for (name, value) in [
        ("delay sum", stats.delay_sum),
        ("jitter sum", stats.jitter_sum),
        ("first tx time", stats.first_tx_time),
        ("last rx time", stats.last_rx_time),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Some(format!("{name} is {value}"));
        }
    }
    if stats.rx_packets > 0 && stats.last_rx_time < stats.first_tx_time {
        return Some(format!(
            "last rx at {}s precedes first tx at {}s",
            stats.last_rx_time, stats.first_tx_time
        ));
    }
    None
}

/// Derive the metrics for one well-formed flow.
fn derive(flow: FlowId, stats: &RawFlowStats) -> FlowMetrics {
    let lost_packets = stats.tx_packets - stats.rx_packets;
    let loss_percent = if stats.tx_packets > 0 {
        lost_packets as f64 * 100.0 / stats.tx_packets as f64
    } else {
        0.0
    };

    let mut metrics = FlowMetrics {
        flow,
        tx_packets: stats.tx_packets,
        rx_packets: stats.rx_packets,
        lost_packets,
        loss_percent,
        throughput_kbps: None,
        avg_delay_ms: None,
        avg_jitter_ms: None,
        efficiency_percent: None,
    };
    if stats.rx_packets == 0 {
        return metrics;
    }

    let window = stats.last_rx_time - stats.first_tx_time;
    // A single packet can leave a zero-length window; undefined, not infinite.
    if window > 0.0 {
        metrics.throughput_kbps = Some(stats.rx_bytes as f64 * 8.0 / window / 1024.0);
    }
    metrics.avg_delay_ms = Some(stats.delay_sum / stats.rx_packets as f64 * 1000.0);
    if stats.rx_packets > 1 {
        metrics.avg_jitter_ms = Some(stats.jitter_sum / (stats.rx_packets - 1) as f64 * 1000.0);
    }
    if stats.tx_bytes > 0 {
        metrics.efficiency_percent = Some(stats.rx_bytes as f64 * 100.0 / stats.tx_bytes as f64);
    }
    metrics
}

fn mean_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for v in values {
        sum += v;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

/// Turn the engine's raw counters into per-flow metrics plus the aggregate
/// block. Flows with inconsistent counters are dropped with a warning; the
/// rest of the aggregation continues.
pub fn summarize(raw: &HashMap<FlowId, RawFlowStats>) -> FlowSummary {
    let mut entries: Vec<_> = raw.iter().collect();
    entries.sort_by_key(|(flow, _)| **flow);

    let mut flows = Vec::with_capacity(entries.len());
    let mut excluded = Vec::new();
    for (flow, stats) in entries {
        if let Some(reason) = integrity_error(stats) {
            warn!(flow = %flow, %reason, "dropping flow with inconsistent counters");
            excluded.push(*flow);
            continue;
        }
        flows.push(derive(*flow, stats));
    }

    let reporting: Vec<&FlowMetrics> = flows.iter().filter(|m| m.is_reporting()).collect();
    let aggregate = if reporting.is_empty() {
        None
    } else {
        Some(AggregateMetrics {
            flow_count: reporting.len(),
            mean_throughput_kbps: mean_of(
                reporting.iter().filter_map(|m| m.throughput_kbps),
            ),
            // Loss is a plain field, defined for every reporting flow. The
            // optional figures all go through mean_of so the divisor always
            // matches the set that was summed.
            mean_loss_percent: reporting.iter().map(|m| m.loss_percent).sum::<f64>()
                / reporting.len() as f64,
            mean_delay_ms: mean_of(reporting.iter().filter_map(|m| m.avg_delay_ms)),
            mean_jitter_ms: mean_of(reporting.iter().filter_map(|m| m.avg_jitter_ms)),
        })
    };

    FlowSummary {
        flows,
        aggregate,
        excluded,
    }
}
