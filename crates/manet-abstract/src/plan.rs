use serde::{Deserialize, Serialize};

/// UDP port of flow 0; flow `i` uses `BASE_PORT + i`.
pub const BASE_PORT: u16 = 9000;

/// Seconds between a radio going down and coming back up.
pub const RECOVERY_OFFSET: f64 = 5.0;

/// One planned client/server flow. Receivers start one time unit before
/// their clients so the server socket is always bound first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPlanEntry {
    pub index: u32,
    pub sender: u32,
    pub receiver: u32,
    pub port: u16,
    pub server_start: f64,
    pub server_stop: f64,
    pub client_start: f64,
    pub client_stop: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RadioAction {
    Down,
    Up,
}

/// A scheduled, reversible radio toggle against one node. The two events of
/// a fault window are plain values rather than closures so each can be
/// inspected and tested on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaultEvent {
    pub time: f64,
    pub node: u32,
    pub action: RadioAction,
}
