use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use manet_abstract::RoutingProtocol;
use tracing::info;

use crate::error::ExportError;
use crate::experiment::ExperimentReport;

/// Sentinel for a metric that is undefined for a flow. The tabular export
/// always emits every column, so downstream parsers never have to guess
/// what a missing field means.
pub const NA: &str = "NA";

/// Name of the tabular export for a protocol, e.g. `AODV_metrics.csv`.
pub fn csv_file_name(protocol: RoutingProtocol) -> String {
    format!("{protocol}_metrics.csv")
}

fn fixed(value: f64) -> String {
    format!("{value:.6}")
}

fn fixed_or_na(value: Option<f64>) -> String {
    value.map(fixed).unwrap_or_else(|| NA.to_string())
}

/// Render the human-readable summary. Every flow appears, including those
/// that received nothing; the aggregate block follows.
pub fn write_console_report<W: Write>(out: &mut W, report: &ExperimentReport) -> io::Result<()> {
    writeln!(out, "\n========== COLLECTED METRICS ({}) ==========", report.protocol)?;
    for flow in &report.flows {
        let m = &flow.metrics;
        match &flow.endpoints {
            Some(endpoints) => writeln!(out, "Flow {} ({endpoints})", m.flow)?,
            None => writeln!(out, "Flow {} (unknown endpoints)", m.flow)?,
        }
        writeln!(out, "  Packets transmitted: {}", m.tx_packets)?;
        writeln!(out, "  Packets received:    {}", m.rx_packets)?;
        writeln!(
            out,
            "  Packets lost:        {} ({:.2}%)",
            m.lost_packets, m.loss_percent
        )?;
        if m.rx_packets > 0 {
            match m.throughput_kbps {
                Some(kbps) => writeln!(out, "  Throughput:          {kbps:.2} kbps")?,
                None => writeln!(out, "  Throughput:          n/a (zero-length receive window)")?,
            }
            if let Some(delay) = m.avg_delay_ms {
                writeln!(out, "  Mean delay:          {delay:.2} ms")?;
            }
            // Jitter needs two received packets; the line is simply omitted
            // below that, matching the CSV's explicit NA.
            if let Some(jitter) = m.avg_jitter_ms {
                writeln!(out, "  Mean jitter:         {jitter:.2} ms")?;
            }
            if let Some(eff) = m.efficiency_percent {
                writeln!(out, "  Efficiency:          {eff:.2}%")?;
            }
        }
        writeln!(out)?;
    }

    writeln!(out, "========== AGGREGATE STATISTICS ==========")?;
    match &report.aggregate {
        Some(agg) => {
            writeln!(out, "Reporting flows:  {}", agg.flow_count)?;
            match agg.mean_throughput_kbps {
                Some(kbps) => writeln!(out, "Mean throughput:  {kbps:.2} kbps")?,
                None => writeln!(out, "Mean throughput:  n/a")?,
            }
            writeln!(out, "Mean packet loss: {:.2}%", agg.mean_loss_percent)?;
            match agg.mean_delay_ms {
                Some(delay) => writeln!(out, "Mean delay:       {delay:.2} ms")?,
                None => writeln!(out, "Mean delay:       n/a")?,
            }
            match agg.mean_jitter_ms {
                Some(jitter) => writeln!(out, "Mean jitter:      {jitter:.2} ms")?,
                None => writeln!(out, "Mean jitter:      n/a")?,
            }
        }
        None => writeln!(
            out,
            "No flow received any packets; aggregate statistics are not applicable."
        )?,
    }
    Ok(())
}

/// Write the tabular export into `dir`, one row per flow that received at
/// least one packet, and return the file path. The handle is flushed and
/// closed on every exit path.
pub fn export_csv(dir: &Path, report: &ExperimentReport) -> Result<PathBuf, ExportError> {
    let path = dir.join(csv_file_name(report.protocol));
    let io_err = |source| ExportError::Io {
        path: path.clone(),
        source,
    };

    let file = File::create(&path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    write_csv(&mut out, report).map_err(io_err)?;
    out.flush().map_err(io_err)?;

    info!(path = %path.display(), "metrics exported");
    Ok(path)
}

fn write_csv<W: Write>(out: &mut W, report: &ExperimentReport) -> io::Result<()> {
    writeln!(
        out,
        "FlowID,Source,Destination,Throughput(Kbps),PacketLoss(%),Delay(ms),Jitter(ms),Efficiency(%)"
    )?;
    for flow in report.flows.iter().filter(|f| f.metrics.is_reporting()) {
        let m = &flow.metrics;
        let (source, destination) = match &flow.endpoints {
            Some(e) => (e.source.to_string(), e.destination.to_string()),
            None => ("unknown".to_string(), "unknown".to_string()),
        };
        writeln!(
            out,
            "{},{},{},{},{},{},{},{}",
            m.flow,
            source,
            destination,
            fixed_or_na(m.throughput_kbps),
            fixed(m.loss_percent),
            fixed_or_na(m.avg_delay_ms),
            fixed_or_na(m.avg_jitter_ms),
            fixed_or_na(m.efficiency_percent),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::FlowReport;
    use crate::metrics::{AggregateMetrics, FlowMetrics};
    use manet_abstract::{FlowEndpoints, FlowId};
    use std::net::Ipv4Addr;

    fn endpoints(a: u8, b: u8) -> FlowEndpoints {
        FlowEndpoints {
            source: Ipv4Addr::new(10, 0, 0, a),
            destination: Ipv4Addr::new(10, 0, 0, b),
        }
    }

    fn report() -> ExperimentReport {
        let healthy = FlowMetrics {
            flow: FlowId(1),
            tx_packets: 100,
            rx_packets: 90,
            lost_packets: 10,
            loss_percent: 10.0,
            throughput_kbps: Some(412.5),
            avg_delay_ms: Some(20.25),
            avg_jitter_ms: Some(4.125),
            efficiency_percent: Some(90.0),
        };
        let single = FlowMetrics {
            flow: FlowId(2),
            tx_packets: 5,
            rx_packets: 1,
            lost_packets: 4,
            loss_percent: 80.0,
            throughput_kbps: Some(8.0),
            avg_delay_ms: Some(30.0),
            avg_jitter_ms: None,
            efficiency_percent: Some(20.0),
        };
        let dead = FlowMetrics {
            flow: FlowId(3),
            tx_packets: 50,
            rx_packets: 0,
            lost_packets: 50,
            loss_percent: 100.0,
            throughput_kbps: None,
            avg_delay_ms: None,
            avg_jitter_ms: None,
            efficiency_percent: None,
        };
        ExperimentReport {
            protocol: RoutingProtocol::Aodv,
            config: Default::default(),
            flows: vec![
                FlowReport {
                    endpoints: Some(endpoints(1, 2)),
                    metrics: healthy,
                },
                FlowReport {
                    endpoints: Some(endpoints(3, 4)),
                    metrics: single,
                },
                FlowReport {
                    endpoints: Some(endpoints(5, 6)),
                    metrics: dead,
                },
            ],
            aggregate: Some(AggregateMetrics {
                flow_count: 2,
                mean_throughput_kbps: Some(210.25),
                mean_loss_percent: 45.0,
                mean_delay_ms: Some(25.125),
                mean_jitter_ms: Some(4.125),
            }),
        }
    }

    #[test]
    fn console_lists_dead_flows_with_loss_only() {
        let mut buf = Vec::new();
        write_console_report(&mut buf, &report()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("Flow 3 (10.0.0.5 -> 10.0.0.6)"));
        assert!(text.contains("50 (100.00%)"));
        // No derived figures for a flow that received nothing.
        let dead_block = text.split("Flow 3").nth(1).unwrap();
        assert!(!dead_block.contains("Throughput"));
        assert!(text.contains("Mean throughput:  210.25 kbps"));
    }

    #[test]
    fn console_reports_missing_aggregate_explicitly() {
        let mut r = report();
        r.aggregate = None;
        let mut buf = Vec::new();
        write_console_report(&mut buf, &r).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("not applicable"));
        assert!(!text.contains("Mean throughput:  0"));
    }

    #[test]
    fn csv_omits_dead_flows_and_uses_na_sentinel() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &report()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3); // header + two reporting flows
        assert_eq!(
            lines[0],
            "FlowID,Source,Destination,Throughput(Kbps),PacketLoss(%),Delay(ms),Jitter(ms),Efficiency(%)"
        );
        // Flow 2 received a single packet: jitter column carries the sentinel.
        let row: Vec<&str> = lines[2].split(',').collect();
        assert_eq!(row[0], "2");
        assert_eq!(row[6], NA);
        assert!(!lines.iter().any(|l| l.starts_with("3,")));
    }

    #[test]
    fn csv_round_trips_numeric_fields() {
        let r = report();
        let mut buf = Vec::new();
        write_csv(&mut buf, &r).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let row: Vec<&str> = text.lines().nth(1).unwrap().split(',').collect();
        let m = &r.flows[0].metrics;
        assert_eq!(row[1], "10.0.0.1");
        assert_eq!(row[2], "10.0.0.2");
        let parsed: f64 = row[3].parse().unwrap();
        assert!((parsed - m.throughput_kbps.unwrap()).abs() < 1e-6);
        let parsed: f64 = row[4].parse().unwrap();
        assert!((parsed - m.loss_percent).abs() < 1e-6);
        let parsed: f64 = row[5].parse().unwrap();
        assert!((parsed - m.avg_delay_ms.unwrap()).abs() < 1e-6);
        let parsed: f64 = row[6].parse().unwrap();
        assert!((parsed - m.avg_jitter_ms.unwrap()).abs() < 1e-6);
        let parsed: f64 = row[7].parse().unwrap();
        assert!((parsed - m.efficiency_percent.unwrap()).abs() < 1e-6);
    }

    #[test]
    fn export_writes_protocol_named_file() {
        let dir = std::env::temp_dir().join(format!("manet-report-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = export_csv(&dir, &report()).unwrap();
        assert!(path.ends_with("AODV_metrics.csv"));
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("FlowID,"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn export_into_missing_directory_is_an_export_error() {
        let dir = Path::new("/nonexistent/manet-report-test");
        let err = export_csv(dir, &report()).unwrap_err();
        let ExportError::Io { path, .. } = err;
        assert!(path.starts_with(dir));
    }
}
