use manet_abstract::{ConfigError, ExperimentConfig, RoutingProtocol};

/// Check an [`ExperimentConfig`] for internal consistency and return the
/// parsed routing protocol. Runs before any simulated resource is created.
///
/// The checks run in a fixed order and report the first violation:
/// node count vs flow count, error-rate range, fault-node bound, protocol
/// name.
pub fn validate(config: &ExperimentConfig) -> Result<RoutingProtocol, ConfigError> {
    if config.node_count < 2 * config.flow_count {
        return Err(ConfigError::NotEnoughNodes {
            nodes: config.node_count,
            flows: config.flow_count,
        });
    }
    if !(0.0..=1.0).contains(&config.error_rate) {
        return Err(ConfigError::ErrorRateOutOfRange(config.error_rate));
    }
    if config.fail_node >= config.node_count {
        return Err(ConfigError::FaultNodeOutOfRange {
            node: config.fail_node,
            nodes: config.node_count,
        });
    }
    config.protocol.parse()
}
