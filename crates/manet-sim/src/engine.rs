use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::net::Ipv4Addr;

use manet_abstract::{
    EngineError, FlowEndpoints, FlowId, NetworkEngine, RawFlowStats, ReceiverApp,
    RoutingProtocol, ScheduledAction, SenderApp, TopologySpec,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

#[derive(Debug)]
enum EventKind {
    /// A packet leaves its sender.
    Departure { flow: usize },
    /// A packet reaches its receiver after `delay` seconds in the channel.
    Arrival { flow: usize, delay: f64 },
    /// A scheduled radio toggle.
    Action(ScheduledAction),
}

#[derive(Debug)]
struct Event {
    time: f64,
    kind: EventKind,
    id: u64,
}

// Min-heap ordering on time, id as tiebreak for same-time events.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

struct NodeState {
    radio_enabled: bool,
    address: Option<Ipv4Addr>,
}

struct FlowState {
    id: FlowId,
    app: SenderApp,
    receiver_window: Option<(f64, f64)>,
    stats: RawFlowStats,
    first_tx_seen: bool,
    /// Channel delay of the previously received packet, for jitter.
    last_delay: Option<f64>,
}

/// Deterministic in-memory network engine.
///
/// This is not a radio model: loss is the configured channel error rate
/// plus hard loss while an endpoint's radio is suspended, and delay is a
/// bounded random draw shaped by the routing protocol. It exists so the
/// orchestrator has a self-contained, seeded engine to run and test
/// against; every random stream derives from the constructor seed, so equal
/// seeds produce identical counters.
pub struct SimEngine {
    time: f64,
    events: BinaryHeap<Event>,
    event_id_counter: u64,
    rng: StdRng,

    topology: Option<TopologySpec>,
    protocol: Option<RoutingProtocol>,
    addressed: bool,

    nodes: Vec<NodeState>,
    receivers: Vec<ReceiverApp>,
    flows: Vec<FlowState>,
    next_flow_id: u32,
    traffic_generated: bool,
}

impl SimEngine {
    pub fn new(seed: u64) -> Self {
        Self {
            time: 0.0,
            events: BinaryHeap::new(),
            event_id_counter: 0,
            rng: StdRng::seed_from_u64(seed),
            topology: None,
            protocol: None,
            addressed: false,
            nodes: Vec::new(),
            receivers: Vec::new(),
            flows: Vec::new(),
            next_flow_id: 1,
            traffic_generated: false,
        }
    }

    /// Radio capability state of a node, if it exists.
    pub fn radio_enabled(&self, node: u32) -> Option<bool> {
        self.nodes.get(node as usize).map(|n| n.radio_enabled)
    }

    pub fn current_time(&self) -> f64 {
        self.time
    }

    fn push_event(&mut self, time: f64, kind: EventKind) {
        self.events.push(Event {
            time,
            kind,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    fn install_error(stage: &'static str, reason: impl Into<String>) -> EngineError {
        EngineError::Install {
            stage,
            reason: reason.into(),
        }
    }

    fn node_bound_check(&self, stage: &'static str, node: u32) -> Result<(), EngineError> {
        if (node as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(Self::install_error(
                stage,
                format!("node {node} exceeds topology of {} nodes", self.nodes.len()),
            ))
        }
    }

    fn exp_sample(rng: &mut StdRng, mean: f64) -> f64 {
        let u: f64 = rng.random();
        -mean * (1.0 - u).ln()
    }

    /// Lay out every flow's packet departures over its on/off bursts. Done
    /// once, when the timeline starts running.
    fn generate_traffic(&mut self) {
        if self.traffic_generated {
            return;
        }
        self.traffic_generated = true;

        for index in 0..self.flows.len() {
            let (start, stop, mean_on, mean_off, interval) = {
                let app = &self.flows[index].app;
                (
                    app.start,
                    app.stop,
                    app.traffic.mean_on,
                    app.traffic.mean_off,
                    app.traffic.packet_interval(),
                )
            };
            let mut departures = Vec::new();
            let mut t = start;
            while t < stop {
                let burst_end = (t + Self::exp_sample(&mut self.rng, mean_on)).min(stop);
                while t < burst_end {
                    departures.push(t);
                    t += interval;
                }
                t = burst_end + Self::exp_sample(&mut self.rng, mean_off);
            }
            debug!(flow = index, packets = departures.len(), "traffic generated");
            for time in departures {
                self.push_event(time, EventKind::Departure { flow: index });
            }
        }
    }

    /// Process all events up to and including `until`. Later events stay
    /// queued, which lets tests observe capability state mid-window.
    pub fn advance_to(&mut self, until: f64) -> Result<(), EngineError> {
        while let Some(event) = self.events.peek() {
            if event.time > until {
                break;
            }
            let event = match self.events.pop() {
                Some(e) => e,
                None => break,
            };
            self.time = event.time;
            match event.kind {
                EventKind::Action(action) => self.apply_action(action)?,
                EventKind::Departure { flow } => self.handle_departure(flow),
                EventKind::Arrival { flow, delay } => self.handle_arrival(flow, delay),
            }
        }
        self.time = self.time.max(until);
        Ok(())
    }

    fn apply_action(&mut self, action: ScheduledAction) -> Result<(), EngineError> {
        let (node, enabled) = match action {
            ScheduledAction::RadioDown { node } => (node, false),
            ScheduledAction::RadioUp { node } => (node, true),
        };
        // Resolution happens here, at execution time. An unknown target is a
        // configuration inconsistency and aborts the run.
        let state = self
            .nodes
            .get_mut(node as usize)
            .ok_or(EngineError::UnknownNode(node))?;
        state.radio_enabled = enabled;
        info!(
            time = self.time,
            node,
            enabled,
            "radio capability toggled"
        );
        Ok(())
    }

    fn handle_departure(&mut self, flow: usize) {
        let now = self.time;
        let protocol = self.protocol;
        let (error_rate, delay_scale) = match (&self.topology, protocol) {
            (Some(t), Some(p)) => {
                // Proactive OLSR keeps routes warm; reactive AODV pays a
                // discovery premium on the delay draw.
                let scale = match p {
                    RoutingProtocol::Aodv => 1.0,
                    RoutingProtocol::Olsr => 0.85,
                };
                (t.error_rate, scale)
            }
            _ => (0.0, 1.0),
        };

        let (sender_up, receiver_up) = {
            let state = &self.flows[flow];
            (
                self.nodes[state.app.node as usize].radio_enabled,
                self.nodes[state.app.target_node as usize].radio_enabled,
            )
        };

        {
            let state = &mut self.flows[flow];
            state.stats.tx_packets += 1;
            state.stats.tx_bytes += u64::from(state.app.traffic.packet_size);
            if !state.first_tx_seen {
                state.stats.first_tx_time = now;
                state.first_tx_seen = true;
            }
        }

        if !sender_up || !receiver_up {
            debug!(flow, time = now, "packet lost: endpoint radio suspended");
            return;
        }
        if self.rng.random::<f64>() < error_rate {
            debug!(flow, time = now, "packet lost: channel error");
            return;
        }

        let delay = self.rng.random_range(0.01..0.05) * delay_scale;
        self.push_event(now + delay, EventKind::Arrival { flow, delay });
    }

    fn handle_arrival(&mut self, flow: usize, delay: f64) {
        let now = self.time;
        let receiver_up = {
            let state = &self.flows[flow];
            self.nodes[state.app.target_node as usize].radio_enabled
        };
        let state = &mut self.flows[flow];
        let in_window = match state.receiver_window {
            Some((start, stop)) => now >= start && now <= stop,
            None => false,
        };
        if !receiver_up || !in_window {
            debug!(flow, time = now, "packet dropped at receiver");
            return;
        }
        state.stats.rx_packets += 1;
        state.stats.rx_bytes += u64::from(state.app.traffic.packet_size);
        state.stats.last_rx_time = now;
        state.stats.delay_sum += delay;
        if let Some(previous) = state.last_delay {
            state.stats.jitter_sum += (delay - previous).abs();
        }
        state.last_delay = Some(delay);
    }
}

impl NetworkEngine for SimEngine {
    fn install_topology(&mut self, topology: &TopologySpec) -> Result<(), EngineError> {
        if topology.node_count == 0 {
            return Err(Self::install_error("topology", "node count is zero"));
        }
        self.nodes = (0..topology.node_count)
            .map(|_| NodeState {
                radio_enabled: true,
                address: None,
            })
            .collect();
        info!(
            nodes = topology.node_count,
            tx_power = topology.tx_power_dbm,
            error_rate = topology.error_rate,
            "topology installed"
        );
        self.topology = Some(topology.clone());
        Ok(())
    }

    fn install_routing(&mut self, protocol: RoutingProtocol) -> Result<(), EngineError> {
        if self.topology.is_none() {
            return Err(Self::install_error("routing", "no topology installed"));
        }
        info!(%protocol, "routing installed on all nodes");
        self.protocol = Some(protocol);
        Ok(())
    }

    fn assign_addresses(&mut self) -> Result<(), EngineError> {
        if self.topology.is_none() {
            return Err(Self::install_error("addressing", "no topology installed"));
        }
        if self.nodes.len() > 254 {
            return Err(Self::install_error(
                "addressing",
                format!("10.0.0.0/24 pool exhausted by {} nodes", self.nodes.len()),
            ));
        }
        for (i, node) in self.nodes.iter_mut().enumerate() {
            node.address = Some(Ipv4Addr::new(10, 0, 0, (i + 1) as u8));
        }
        self.addressed = true;
        Ok(())
    }

    fn install_receiver(&mut self, app: &ReceiverApp) -> Result<(), EngineError> {
        self.node_bound_check("receiver application", app.node)?;
        self.receivers.push(app.clone());
        Ok(())
    }

    fn install_sender(&mut self, app: &SenderApp) -> Result<FlowId, EngineError> {
        self.node_bound_check("sender application", app.node)?;
        self.node_bound_check("sender application", app.target_node)?;
        if !self.addressed {
            return Err(Self::install_error(
                "sender application",
                "addresses not assigned",
            ));
        }
        let receiver_window = self
            .receivers
            .iter()
            .find(|r| r.node == app.target_node && r.port == app.port)
            .map(|r| (r.start, r.stop));
        let id = FlowId(self.next_flow_id);
        self.next_flow_id += 1;
        self.flows.push(FlowState {
            id,
            app: app.clone(),
            receiver_window,
            stats: RawFlowStats::default(),
            first_tx_seen: false,
            last_delay: None,
        });
        Ok(id)
    }

    fn schedule(&mut self, time: f64, action: ScheduledAction) -> Result<(), EngineError> {
        self.push_event(time, EventKind::Action(action));
        Ok(())
    }

    fn run_to_completion(&mut self, stop_time: f64) -> Result<(), EngineError> {
        self.generate_traffic();
        self.advance_to(stop_time)?;
        // Whatever is still queued is beyond the stop time and never runs.
        self.events.clear();
        info!(time = self.time, "timeline complete");
        Ok(())
    }

    fn flow_stats(&self) -> HashMap<FlowId, RawFlowStats> {
        self.flows
            .iter()
            .map(|f| (f.id, f.stats.clone()))
            .collect()
    }

    fn flow_endpoints(&self, flow: FlowId) -> Option<FlowEndpoints> {
        let state = self.flows.iter().find(|f| f.id == flow)?;
        let source = self.nodes.get(state.app.node as usize)?.address?;
        let destination = self.nodes.get(state.app.target_node as usize)?.address?;
        Some(FlowEndpoints {
            source,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use manet_abstract::TrafficProfile;

    fn topology(nodes: u32) -> TopologySpec {
        TopologySpec {
            node_count: nodes,
            tx_power_dbm: 20.0,
            error_rate: 0.01,
            max_speed: 5.0,
        }
    }

    fn install_flow(engine: &mut SimEngine, sender: u32, receiver: u32, port: u16) -> FlowId {
        engine
            .install_receiver(&ReceiverApp {
                node: receiver,
                port,
                start: 1.0,
                stop: 30.0,
            })
            .unwrap();
        engine
            .install_sender(&SenderApp {
                node: sender,
                target_node: receiver,
                port,
                start: 2.0,
                stop: 30.0,
                traffic: TrafficProfile::from_intensity(20.0),
            })
            .unwrap()
    }

    fn ready_engine(seed: u64, nodes: u32) -> SimEngine {
        let mut engine = SimEngine::new(seed);
        engine.install_topology(&topology(nodes)).unwrap();
        engine.install_routing(RoutingProtocol::Aodv).unwrap();
        engine.assign_addresses().unwrap();
        engine
    }

    #[test]
    fn routing_before_topology_is_an_installation_error() {
        let mut engine = SimEngine::new(0);
        let err = engine.install_routing(RoutingProtocol::Aodv).unwrap_err();
        match err {
            EngineError::Install { stage, reason } => {
                assert_eq!(stage, "routing");
                assert!(reason.contains("no topology"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fault_window_toggles_capability_state() {
        let mut engine = ready_engine(0, 4);
        engine
            .schedule(60.0, ScheduledAction::RadioDown { node: 3 })
            .unwrap();
        engine
            .schedule(65.0, ScheduledAction::RadioUp { node: 3 })
            .unwrap();

        engine.advance_to(59.0).unwrap();
        assert_eq!(engine.radio_enabled(3), Some(true));
        assert_eq!(engine.current_time(), 59.0);

        engine.advance_to(62.0).unwrap();
        assert_eq!(engine.radio_enabled(3), Some(false));
        assert_eq!(engine.current_time(), 62.0);
        // Other nodes are untouched.
        assert_eq!(engine.radio_enabled(0), Some(true));

        engine.advance_to(70.0).unwrap();
        assert_eq!(engine.radio_enabled(3), Some(true));
        assert_eq!(engine.current_time(), 70.0);
    }

    #[test]
    fn toggle_against_unknown_node_aborts_the_run() {
        let mut engine = ready_engine(0, 4);
        engine
            .schedule(5.0, ScheduledAction::RadioDown { node: 17 })
            .unwrap();
        let err = engine.run_to_completion(10.0).unwrap_err();
        assert!(matches!(err, EngineError::UnknownNode(17)));
    }

    #[test]
    fn traffic_produces_consistent_counters() {
        let mut engine = ready_engine(42, 4);
        let id = install_flow(&mut engine, 0, 1, 9000);
        engine.run_to_completion(30.0).unwrap();

        let stats = engine.flow_stats().remove(&id).unwrap();
        assert!(stats.tx_packets > 0);
        assert!(stats.rx_packets > 0);
        assert!(stats.rx_packets <= stats.tx_packets);
        assert_eq!(stats.tx_bytes, stats.tx_packets * 1024);
        assert!(stats.first_tx_time >= 2.0);
        assert!(stats.last_rx_time <= 30.0);
        assert!(stats.delay_sum > 0.0);
    }

    #[test]
    fn same_seed_means_identical_counters() {
        let mut runs = Vec::new();
        for _ in 0..2 {
            let mut engine = ready_engine(7, 6);
            install_flow(&mut engine, 0, 1, 9000);
            install_flow(&mut engine, 2, 3, 9001);
            engine.run_to_completion(30.0).unwrap();
            runs.push(engine.flow_stats());
        }
        assert_eq!(runs[0], runs[1]);
    }

    #[test]
    fn suspended_receiver_loses_traffic_in_the_window() {
        let mut faulty = ready_engine(11, 2);
        let id = install_flow(&mut faulty, 0, 1, 9000);
        faulty
            .schedule(5.0, ScheduledAction::RadioDown { node: 1 })
            .unwrap();
        faulty
            .schedule(10.0, ScheduledAction::RadioUp { node: 1 })
            .unwrap();
        faulty.run_to_completion(30.0).unwrap();
        let with_fault = faulty.flow_stats()[&id].clone();

        let mut clean = ready_engine(11, 2);
        let id = install_flow(&mut clean, 0, 1, 9000);
        clean.run_to_completion(30.0).unwrap();
        let without_fault = clean.flow_stats()[&id].clone();

        assert!(with_fault.rx_packets < without_fault.rx_packets);
    }

    #[test]
    fn endpoints_follow_address_assignment() {
        let mut engine = ready_engine(0, 4);
        let id = install_flow(&mut engine, 2, 3, 9001);
        let endpoints = engine.flow_endpoints(id).unwrap();
        assert_eq!(endpoints.source, Ipv4Addr::new(10, 0, 0, 3));
        assert_eq!(endpoints.destination, Ipv4Addr::new(10, 0, 0, 4));
        assert!(engine.flow_endpoints(FlowId(99)).is_none());
    }
}
