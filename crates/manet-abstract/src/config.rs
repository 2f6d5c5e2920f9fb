use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Routing protocols the engine knows how to install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingProtocol {
    Aodv,
    Olsr,
}

impl FromStr for RoutingProtocol {
    type Err = ConfigError;

    /// Case-insensitive: the name is canonicalized to uppercase before matching.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AODV" => Ok(RoutingProtocol::Aodv),
            "OLSR" => Ok(RoutingProtocol::Olsr),
            _ => Err(ConfigError::UnknownProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for RoutingProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoutingProtocol::Aodv => write!(f, "AODV"),
            RoutingProtocol::Olsr => write!(f, "OLSR"),
        }
    }
}

/// Immutable experiment parameters. Built once from defaults plus CLI
/// overrides, validated before any simulated resource is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Routing protocol name; recognized case-insensitively by the validator.
    pub protocol: String,
    pub node_count: u32,
    /// Simulation duration in seconds.
    pub sim_time: f64,
    /// Number of client/server video flows.
    pub flow_count: u32,
    /// Channel error probability in [0, 1].
    pub error_rate: f64,
    /// Transmit power in dBm.
    pub tx_power: f64,
    /// Maximum node speed in m/s.
    pub max_speed: f64,
    /// Traffic intensity in packets per second per flow.
    pub pkt_per_sec: f64,
    /// Time at which the faulty node's radio goes down, in seconds.
    pub fail_time: f64,
    /// Index of the node whose radio is suspended.
    pub fail_node: u32,
    /// Whether to export per-flow metrics as CSV.
    pub enable_csv: bool,
    /// Seed for the engine's random streams.
    pub seed: u64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            protocol: "AODV".to_string(),
            node_count: 10,
            sim_time: 240.0,
            flow_count: 1,
            error_rate: 0.01,
            tx_power: 20.0,
            max_speed: 5.0,
            pkt_per_sec: 20.0,
            fail_time: 25.0,
            fail_node: 1,
            enable_csv: true,
            seed: 0,
        }
    }
}

/// Shape of one variable-bit-rate video stream: exponential on/off periods
/// around a constant data rate while on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrafficProfile {
    pub data_rate_bps: f64,
    pub packet_size: u32,
    /// Mean duration of a burst, in seconds.
    pub mean_on: f64,
    /// Mean duration of an idle gap, in seconds.
    pub mean_off: f64,
}

impl Default for TrafficProfile {
    fn default() -> Self {
        Self {
            data_rate_bps: 20.0 * 1024.0 * 8.0,
            packet_size: 1024,
            mean_on: 1.0,
            mean_off: 0.5,
        }
    }
}

impl TrafficProfile {
    /// Derive a profile from a traffic intensity in packets per second.
    pub fn from_intensity(pkt_per_sec: f64) -> Self {
        let packet_size = 1024;
        Self {
            data_rate_bps: pkt_per_sec * f64::from(packet_size) * 8.0,
            packet_size,
            ..Default::default()
        }
    }

    /// Inter-packet gap while a burst is active, in seconds.
    pub fn packet_interval(&self) -> f64 {
        f64::from(self.packet_size) * 8.0 / self.data_rate_bps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_parse_is_case_insensitive() {
        assert_eq!("aodv".parse::<RoutingProtocol>().unwrap(), RoutingProtocol::Aodv);
        assert_eq!("Olsr".parse::<RoutingProtocol>().unwrap(), RoutingProtocol::Olsr);
        assert_eq!("AODV".parse::<RoutingProtocol>().unwrap(), RoutingProtocol::Aodv);
    }

    #[test]
    fn protocol_parse_rejects_unknown() {
        let err = "DSDV".parse::<RoutingProtocol>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProtocol(ref name) if name == "DSDV"));
    }

    #[test]
    fn intensity_maps_to_data_rate() {
        let profile = TrafficProfile::from_intensity(20.0);
        assert_eq!(profile.data_rate_bps, 20.0 * 1024.0 * 8.0);
        // 20 packets per second means a 50 ms gap inside a burst.
        assert!((profile.packet_interval() - 0.05).abs() < 1e-12);
    }
}
