//! Plain-text console tables.

use std::fmt::Write;
use wormhole_simulation::scenarios::{DphiScenarioReport, GpsScenarioReport, LeashScenarioReport};
use wormhole_simulation::{AnomalyKind, DetectionSummary, RateInterval, RateStatistics, TrialRecord};

const ANOMALY_KINDS: [AnomalyKind; 4] = [
    AnomalyKind::GeographicWormhole,
    AnomalyKind::TemporalLeash,
    AnomalyKind::GeographicLeash,
    AnomalyKind::HopDelay,
];

fn interval(interval: &RateInterval) -> String {
    format!(
        "[{:.2}%, {:.2}%] @ {:.0}%",
        interval.lower,
        interval.upper,
        interval.confidence * 100.0
    )
}

fn spread(stats: &RateStatistics) -> String {
    format!(
        "mean {:.2}%, std {:.2}, min {:.2}%, max {:.2}%, p95 {:.2}%",
        stats.mean, stats.std_dev, stats.min, stats.max, stats.p95
    )
}

/// One row per metric, the five headline fields first
pub fn summary_table(summary: &DetectionSummary) -> String {
    let stats = &summary.statistics;
    let mut rows: Vec<(String, String)> = vec![
        ("Total Attacks".into(), summary.total_attacks.to_string()),
        (
            "Detected Without Karen Defense".into(),
            summary.detected_without_ensemble.to_string(),
        ),
        (
            "Detection Percentage Without Karen Defense".into(),
            format!("{:.2}%", summary.detection_rate_without_ensemble),
        ),
        (
            "Detected With Karen Defense".into(),
            summary.detected_with_ensemble.to_string(),
        ),
        (
            "Detection Percentage With Karen Defense".into(),
            format!("{:.2}%", summary.detection_rate_with_ensemble),
        ),
        ("Interval Without Karen Defense".into(), interval(&stats.baseline_interval)),
        ("Interval With Karen Defense".into(), interval(&stats.ensemble_interval)),
        ("Per-Trial Rate Without".into(), spread(&stats.baseline_per_trial)),
        ("Per-Trial Rate With".into(), spread(&stats.ensemble_per_trial)),
    ];
    for kind in ANOMALY_KINDS {
        rows.push((
            format!("Anomalies ({})", kind),
            summary.ensemble_anomalies.get(kind).to_string(),
        ));
    }

    let width = rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
    let mut out = String::from("Results Summary:\n");
    for (label, value) in rows {
        let _ = writeln!(out, "  {:<width$}  {}", label, value, width = width);
    }
    out
}

/// Fixed-width table of result records
pub fn records_table(title: &str, records: &[TrialRecord]) -> String {
    let mut out = format!("{} ({} records):\n", title, records.len());
    let _ = writeln!(
        out,
        "  {:>5}  {:>9}  {:>7}  {:>5}  {:<8}  {}",
        "Trial", "Attack", "Range", "Nodes", "Status", "Result"
    );
    for record in records {
        let (a, b) = record.attack.normalized();
        let _ = writeln!(
            out,
            "  {:>5}  {:>9}  {:>7.1}  {:>5}  {:<8}  {}",
            record.trial,
            format!("{}-{}", a, b),
            record.communication_range,
            record.num_nodes,
            record.status.to_string(),
            record.detail
        );
    }
    out
}

pub fn gps_report(report: &GpsScenarioReport) -> String {
    let mut out = String::from("Generated Nodes:\n");
    for node in &report.nodes {
        let _ = writeln!(out, "{}", node);
    }
    let _ = writeln!(
        out,
        "\nSelected Nodes for Wormhole Attack: Node {} and Node {}",
        report.attack.source, report.attack.target
    );
    let _ = writeln!(out, "{}", report.message);
    out
}

pub fn leash_report(report: &LeashScenarioReport) -> String {
    let mut out = String::from("VANET network nodes and edges:\n");
    for (label, node) in &report.nodes {
        let _ = writeln!(out, "  {} at {}", label, node.location());
    }
    for (a, b, link) in &report.edges {
        let marker = if link.is_wormhole { " (wormhole)" } else { "" };
        let _ = writeln!(out, "  {} - {}{}", a, b, marker);
    }

    for transmission in &report.transmissions {
        let trace = &transmission.trace;
        let _ = writeln!(
            out,
            "\nVerifying packet from {} to {}:",
            transmission.source, transmission.destination
        );
        let _ = writeln!(out, " - Current time: {}", trace.current_time);
        let _ = writeln!(out, " - Packet timestamp: {}", trace.packet_timestamp);
        let _ = writeln!(out, " - Travel time: {} seconds", trace.travel_time);
        let _ = writeln!(out, " - Travel distance: {} meters", trace.travel_distance);
        if let (Some(claimed), Some(distance)) = (trace.claimed_location, trace.calculated_distance) {
            let _ = writeln!(out, " - Packet location: {}", claimed);
            let _ = writeln!(out, " - Current node location: {}", trace.verifier_location);
            let _ = writeln!(out, " - Calculated distance: {} meters", distance);
        }
        if trace.violations.is_empty() {
            let _ = writeln!(out, " - Success");
        }
        for violation in &trace.violations {
            let _ = writeln!(out, " - Failed: {}", violation);
        }
        let _ = writeln!(out, "{}", transmission.message());
    }
    out
}

pub fn dphi_report(report: &DphiScenarioReport) -> String {
    let mut out = String::from("Using DPHI for communication:\n");
    for check in &report.with_dphi {
        let _ = writeln!(out, "Using DPHI: {}", check.outcome().detail);
    }
    out.push_str("\nWithout DPHI for communication:\n");
    for hop in &report.without_dphi {
        let _ = writeln!(out, "Without DPHI: Communication normal. Delay: {}", hop.hop_delay);
    }
    out
}
