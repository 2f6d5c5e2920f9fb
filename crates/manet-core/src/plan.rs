use manet_abstract::{ConfigError, ExperimentConfig, FlowPlanEntry, BASE_PORT};

/// Server applications come up at t=1, clients one time unit later so the
/// receiving socket is always bound before the first packet leaves.
const SERVER_START: f64 = 1.0;
const CLIENT_START: f64 = 2.0;

/// Derive the concrete flow plan from a validated configuration: one entry
/// per flow index, sender `2i`, receiver `2i+1`, port `BASE_PORT + i`.
/// The pairing never shares an endpoint between flows.
///
/// Endpoint bounds are re-checked here even though validation already
/// guarantees them; a future change to the pairing scheme must not be able
/// to slip an out-of-range node through silently.
pub fn plan_flows(config: &ExperimentConfig) -> Result<Vec<FlowPlanEntry>, ConfigError> {
    let mut flows = Vec::with_capacity(config.flow_count as usize);
    for i in 0..config.flow_count {
        let sender = 2 * i;
        let receiver = 2 * i + 1;
        for node in [sender, receiver] {
            if node >= config.node_count {
                return Err(ConfigError::FlowEndpointOutOfRange {
                    flow: i,
                    node,
                    nodes: config.node_count,
                });
            }
        }
        // Validation bounds the flow count only against the node count, so
        // the port arithmetic must not be allowed to wrap.
        let wanted = u32::from(BASE_PORT) + i;
        let port = u16::try_from(wanted)
            .map_err(|_| ConfigError::PortOutOfRange { flow: i, port: wanted })?;
        flows.push(FlowPlanEntry {
            index: i,
            sender,
            receiver,
            port,
            server_start: SERVER_START,
            server_stop: config.sim_time,
            client_start: CLIENT_START,
            client_stop: config.sim_time,
        });
    }
    Ok(flows)
}
