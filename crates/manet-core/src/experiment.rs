use manet_abstract::{
    ExperimentConfig, FlowEndpoints, NetworkEngine, RadioAction, ReceiverApp, RoutingProtocol,
    ScheduledAction, SenderApp, TopologySpec, TrafficProfile,
};
use serde::Serialize;
use tracing::info;

use crate::error::ExperimentError;
use crate::faults::fault_timeline;
use crate::metrics::{summarize, AggregateMetrics, FlowMetrics};
use crate::plan::plan_flows;
use crate::validate::validate;

/// One flow's derived metrics together with the address pair the engine
/// resolved for it.
#[derive(Debug, Clone, Serialize)]
pub struct FlowReport {
    pub endpoints: Option<FlowEndpoints>,
    pub metrics: FlowMetrics,
}

/// Everything a finished run produced, ready for rendering and export.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentReport {
    pub protocol: RoutingProtocol,
    pub config: ExperimentConfig,
    pub flows: Vec<FlowReport>,
    pub aggregate: Option<AggregateMetrics>,
}

/// Run the whole experiment against an engine: validate, plan, install the
/// scenario, schedule the fault window, run the timeline to completion and
/// aggregate the counters. Strictly sequential; the only blocking step is
/// `run_to_completion`.
pub fn run_experiment(
    engine: &mut dyn NetworkEngine,
    config: &ExperimentConfig,
) -> Result<ExperimentReport, ExperimentError> {
    let protocol = validate(config)?;
    let flows = plan_flows(config)?;
    info!(%protocol, nodes = config.node_count, flows = flows.len(), "experiment plan ready");

    engine.install_topology(&TopologySpec {
        node_count: config.node_count,
        tx_power_dbm: config.tx_power,
        error_rate: config.error_rate,
        max_speed: config.max_speed,
    })?;
    engine.install_routing(protocol)?;
    engine.assign_addresses()?;

    let traffic = TrafficProfile::from_intensity(config.pkt_per_sec);
    for entry in &flows {
        engine.install_receiver(&ReceiverApp {
            node: entry.receiver,
            port: entry.port,
            start: entry.server_start,
            stop: entry.server_stop,
        })?;
        engine.install_sender(&SenderApp {
            node: entry.sender,
            target_node: entry.receiver,
            port: entry.port,
            start: entry.client_start,
            stop: entry.client_stop,
            traffic: traffic.clone(),
        })?;
    }

    for event in fault_timeline(config.fail_time, config.fail_node) {
        let action = match event.action {
            RadioAction::Down => ScheduledAction::RadioDown { node: event.node },
            RadioAction::Up => ScheduledAction::RadioUp { node: event.node },
        };
        engine.schedule(event.time, action)?;
    }

    info!(sim_time = config.sim_time, "handing timeline to the engine");
    engine.run_to_completion(config.sim_time)?;

    let raw = engine.flow_stats();
    info!(flows = raw.len(), "run complete, aggregating counters");
    let summary = summarize(&raw);

    let flows = summary
        .flows
        .into_iter()
        .map(|metrics| FlowReport {
            endpoints: engine.flow_endpoints(metrics.flow),
            metrics,
        })
        .collect();

    Ok(ExperimentReport {
        protocol,
        config: config.clone(),
        flows,
        aggregate: summary.aggregate,
    })
}
