pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod stats;

pub use config::{ExperimentConfig, RoutingProtocol, TrafficProfile};
pub use engine::{NetworkEngine, ReceiverApp, ScheduledAction, SenderApp, TopologySpec};
pub use error::{ConfigError, EngineError};
pub use plan::{FaultEvent, FlowPlanEntry, RadioAction, BASE_PORT, RECOVERY_OFFSET};
pub use stats::{FlowEndpoints, FlowId, RawFlowStats};
