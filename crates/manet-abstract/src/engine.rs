use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{RoutingProtocol, TrafficProfile};
use crate::error::EngineError;
use crate::stats::{FlowEndpoints, FlowId, RawFlowStats};

/// Physical-layer parameters of the node population. How these shape radio
/// behavior is entirely the engine's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySpec {
    pub node_count: u32,
    pub tx_power_dbm: f64,
    /// Per-packet channel error probability in [0, 1].
    pub error_rate: f64,
    /// Maximum mobility speed in m/s.
    pub max_speed: f64,
}

/// A UDP sink bound to a port on one node for a time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiverApp {
    pub node: u32,
    pub port: u16,
    pub start: f64,
    pub stop: f64,
}

/// A VBR source on one node targeting another node's address and port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderApp {
    pub node: u32,
    pub target_node: u32,
    pub port: u16,
    pub start: f64,
    pub stop: f64,
    pub traffic: TrafficProfile,
}

/// An action the engine executes at an absolute simulation time. Radio
/// toggles are reversible capability switches, not device teardown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScheduledAction {
    RadioDown { node: u32 },
    RadioUp { node: u32 },
}

/// Everything the orchestrator needs from a network simulation engine.
///
/// The engine owns propagation, MAC behavior, routing internals, mobility
/// and addressing; the orchestrator only installs a scenario, runs it and
/// reads the counters back. Kept object-safe so tests can substitute a mock.
pub trait NetworkEngine {
    /// Create the node population with its mobility and link layer.
    fn install_topology(&mut self, topology: &TopologySpec) -> Result<(), EngineError>;

    /// Install the routing protocol on every node.
    fn install_routing(&mut self, protocol: RoutingProtocol) -> Result<(), EngineError>;

    /// Assign network addresses to all installed interfaces.
    fn assign_addresses(&mut self) -> Result<(), EngineError>;

    /// Install a receiving application.
    fn install_receiver(&mut self, app: &ReceiverApp) -> Result<(), EngineError>;

    /// Install a sending application; returns the engine's key for the flow.
    fn install_sender(&mut self, app: &SenderApp) -> Result<FlowId, EngineError>;

    /// Schedule an action at an absolute simulation time. Target resolution
    /// happens at execution time, not here.
    fn schedule(&mut self, time: f64, action: ScheduledAction) -> Result<(), EngineError>;

    /// Run the whole timeline up to `stop_time`. Blocks until done.
    fn run_to_completion(&mut self, stop_time: f64) -> Result<(), EngineError>;

    /// Raw per-flow counters after the run.
    fn flow_stats(&self) -> HashMap<FlowId, RawFlowStats>;

    /// Source/destination addresses for a flow id, if the engine knows it.
    fn flow_endpoints(&self, flow: FlowId) -> Option<FlowEndpoints>;
}
