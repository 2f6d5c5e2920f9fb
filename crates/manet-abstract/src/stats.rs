use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Opaque per-flow key assigned by the engine at application install time.
/// Not necessarily contiguous and not the planner's flow index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FlowId(pub u32);

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw counters the engine reports for one flow after the run completes.
/// Timestamps and sums are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawFlowStats {
    pub tx_packets: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub first_tx_time: f64,
    pub last_rx_time: f64,
    pub delay_sum: f64,
    pub jitter_sum: f64,
}

/// Source/destination address pair the engine associates with a flow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowEndpoints {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
}

impl fmt::Display for FlowEndpoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}
