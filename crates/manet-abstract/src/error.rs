use thiserror::Error;

use crate::stats::FlowId;

/// An invariant violation in the experiment configuration or the plan
/// derived from it. Always fatal, always raised before engine handoff.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("node count {nodes} must be at least twice the flow count {flows}")]
    NotEnoughNodes { nodes: u32, flows: u32 },

    #[error("channel error rate {0} is outside [0, 1]")]
    ErrorRateOutOfRange(f64),

    #[error("fault node {node} does not exist (node count is {nodes})")]
    FaultNodeOutOfRange { node: u32, nodes: u32 },

    #[error("unknown routing protocol {0:?}, expected AODV or OLSR")]
    UnknownProtocol(String),

    #[error("flow {flow} endpoint node {node} exceeds node count {nodes}")]
    FlowEndpointOutOfRange { flow: u32, node: u32, nodes: u32 },

    #[error("flow {flow} needs port {port}, beyond the UDP port range")]
    PortOutOfRange { flow: u32, port: u32 },
}

/// Failure reported by the network engine. Installation errors abort the
/// run before it starts; runtime errors abort it mid-timeline.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{stage} installation failed: {reason}")]
    Install { stage: &'static str, reason: String },

    #[error("scheduled radio toggle targets unknown node {0}")]
    UnknownNode(u32),

    #[error("engine reported no endpoints for flow {0}")]
    UnknownFlow(FlowId),
}
