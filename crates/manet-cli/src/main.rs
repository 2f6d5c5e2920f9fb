use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use manet_abstract::ExperimentConfig;
use manet_core::experiment::{run_experiment, ExperimentReport};
use manet_core::report::{export_csv, write_console_report};
use manet_sim::SimEngine;
use tracing::{error, info};

/// Compare AODV and OLSR under VBR video traffic with an injected node
/// failure, and report per-flow and aggregate metrics.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Routing protocol: AODV or OLSR (case-insensitive).
    #[arg(long, default_value = "AODV")]
    protocol: String,

    /// Number of nodes.
    #[arg(long, default_value_t = 10)]
    nodes: u32,

    /// Simulation duration in seconds.
    #[arg(long, default_value_t = 240.0)]
    sim_time: f64,

    /// Number of video flows (client/server pairs).
    #[arg(long, default_value_t = 1)]
    flows: u32,

    /// Channel error rate in [0, 1].
    #[arg(long, default_value_t = 0.01)]
    error_rate: f64,

    /// WiFi transmit power in dBm.
    #[arg(long, default_value_t = 20.0)]
    tx_power: f64,

    /// Maximum mobility speed in m/s.
    #[arg(long, default_value_t = 5.0)]
    max_speed: f64,

    /// Traffic intensity in packets per second.
    #[arg(long, default_value_t = 20.0)]
    pkt_per_sec: f64,

    /// Time of the injected node failure, in seconds.
    #[arg(long, default_value_t = 25.0)]
    fail_time: f64,

    /// Node whose radio is suspended at the failure time.
    #[arg(long, default_value_t = 1)]
    fail_node: u32,

    /// Export per-flow metrics as CSV.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    csv: bool,

    /// Directory the CSV export is written into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Seed for the engine's random streams.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Write a JSON trace of the finished experiment.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

impl Args {
    fn to_config(&self) -> ExperimentConfig {
        ExperimentConfig {
            protocol: self.protocol.clone(),
            node_count: self.nodes,
            sim_time: self.sim_time,
            flow_count: self.flows,
            error_rate: self.error_rate,
            tx_power: self.tx_power,
            max_speed: self.max_speed,
            pkt_per_sec: self.pkt_per_sec,
            fail_time: self.fail_time,
            fail_node: self.fail_node,
            enable_csv: self.csv,
            seed: self.seed,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt::init();
    info!("manet-compare starting");

    let config = args.to_config();
    let mut engine = SimEngine::new(config.seed);
    let report = run_experiment(&mut engine, &config)?;

    let stdout = io::stdout();
    write_console_report(&mut stdout.lock(), &report).context("failed to render the summary")?;

    // Export failures degrade gracefully: the console summary above stands.
    if config.enable_csv {
        match export_csv(&args.out_dir, &report) {
            Ok(path) => println!("\nMetrics exported to: {}", path.display()),
            Err(e) => error!("CSV export failed: {e}"),
        }
    }

    if let Some(path) = &args.trace_out {
        write_trace(path, &report)?;
    }

    Ok(())
}

fn write_trace(path: &Path, report: &ExperimentReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("failed to serialize experiment trace")?;
    fs::write(path, &data)
        .with_context(|| format!("failed to write trace file {}", path.display()))?;
    Ok(())
}
