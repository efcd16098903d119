//! JSON and CSV export of experiment outcomes.

use crate::error::ReportResult;
use crate::render;
use crate::settings::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use wormhole_simulation::{DetectionSummary, ExperimentConfig, ExperimentOutcome, TrialRecord};

/// Provenance attached to every JSON export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    pub generated_at: String,
    pub tool_version: String,
    pub config: ExperimentConfig,
}

impl ExportMetadata {
    pub fn new(config: &ExperimentConfig) -> Self {
        Self {
            generated_at: chrono::Utc::now().to_rfc3339(),
            tool_version: crate::VERSION.to_string(),
            config: config.clone(),
        }
    }
}

/// Summary (and optionally both record tables) as a JSON document
pub fn summary_json(
    outcome: &ExperimentOutcome,
    config: &ExperimentConfig,
    include_records: bool,
) -> ReportResult<Value> {
    let mut document = json!({
        "metadata": serde_json::to_value(ExportMetadata::new(config))?,
        "summary": serde_json::to_value(&outcome.summary)?,
    });
    if include_records {
        document["baseline_records"] = serde_json::to_value(&outcome.baseline_records)?;
        document["ensemble_records"] = serde_json::to_value(&outcome.ensemble_records)?;
    }
    Ok(document)
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Result records as CSV; the free-text detail column is always quoted
pub fn records_csv(records: &[TrialRecord]) -> String {
    let mut csv = String::from("trial,source,target,heuristic,communication_range,num_nodes,status,anomaly,detail\n");
    for record in records {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            record.trial,
            record.attack.source,
            record.attack.target,
            record.heuristic,
            record.communication_range,
            record.num_nodes,
            record.status,
            record.anomaly.map(|kind| kind.to_string()).unwrap_or_default(),
            quote(&record.detail)
        ));
    }
    csv
}

/// The headline summary as a two-column CSV
pub fn summary_csv(summary: &DetectionSummary) -> String {
    let anomalies = &summary.ensemble_anomalies;
    let rows: [(&str, String); 9] = [
        ("total_attacks", summary.total_attacks.to_string()),
        ("detected_without_ensemble", summary.detected_without_ensemble.to_string()),
        ("detection_rate_without_ensemble", summary.detection_rate_without_ensemble.to_string()),
        ("detected_with_ensemble", summary.detected_with_ensemble.to_string()),
        ("detection_rate_with_ensemble", summary.detection_rate_with_ensemble.to_string()),
        ("geographic_wormhole", anomalies.geographic_wormhole.to_string()),
        ("temporal_leash", anomalies.temporal_leash.to_string()),
        ("geographic_leash", anomalies.geographic_leash.to_string()),
        ("hop_delay", anomalies.hop_delay.to_string()),
    ];
    let mut csv = String::from("metric,value\n");
    for (metric, value) in rows {
        csv.push_str(&format!("{},{}\n", metric, value));
    }
    csv
}

/// Summary CSV followed by the baseline and ensemble record CSVs, blank-line separated
pub fn outcome_csv(outcome: &ExperimentOutcome, include_records: bool) -> String {
    let mut csv = summary_csv(&outcome.summary);
    if include_records {
        for records in [&outcome.baseline_records, &outcome.ensemble_records] {
            csv.push('\n');
            csv.push_str(&records_csv(records));
        }
    }
    csv
}

/// Write the outcome into `directory` in `format`; returns the files written
pub fn write_outcome(
    outcome: &ExperimentOutcome,
    config: &ExperimentConfig,
    directory: &Path,
    format: OutputFormat,
    include_records: bool,
) -> ReportResult<Vec<PathBuf>> {
    fs::create_dir_all(directory)?;
    let mut written = Vec::new();

    match format {
        OutputFormat::Json => {
            let document = summary_json(outcome, config, include_records)?;
            let path = directory.join("experiment.json");
            fs::write(&path, serde_json::to_string_pretty(&document)?)?;
            written.push(path);
        }
        OutputFormat::Csv => {
            let path = directory.join("summary.csv");
            fs::write(&path, summary_csv(&outcome.summary))?;
            written.push(path);
            if include_records {
                let path = directory.join("baseline_records.csv");
                fs::write(&path, records_csv(&outcome.baseline_records))?;
                written.push(path);
                let path = directory.join("ensemble_records.csv");
                fs::write(&path, records_csv(&outcome.ensemble_records))?;
                written.push(path);
            }
        }
        OutputFormat::Table => {
            let mut text = render::summary_table(&outcome.summary);
            if include_records {
                text.push('\n');
                text.push_str(&render::records_table("Without Karen Defense", &outcome.baseline_records));
                text.push('\n');
                text.push_str(&render::records_table("With Karen Defense", &outcome.ensemble_records));
            }
            let path = directory.join("summary.txt");
            fs::write(&path, text)?;
            written.push(path);
        }
    }

    info!(files = written.len(), directory = %directory.display(), "exported results");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wormhole_simulation::create_harness;

    fn config() -> ExperimentConfig {
        ExperimentConfig::new().with_trials(2).with_nodes(5).with_attacks_per_trial(2).with_seed(13)
    }

    fn outcome() -> ExperimentOutcome {
        create_harness(config()).unwrap().run().unwrap()
    }

    #[test]
    fn test_summary_json_shape() {
        let outcome = outcome();
        let document = summary_json(&outcome, &config(), false).unwrap();
        assert_eq!(document["summary"]["total_attacks"], 4);
        assert_eq!(document["metadata"]["config"]["seed"], 13);
        assert!(document["metadata"]["generated_at"].as_str().unwrap().contains('T'));
        assert!(document.get("baseline_records").is_none());

        let document = summary_json(&outcome, &config(), true).unwrap();
        assert_eq!(document["ensemble_records"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn test_records_csv_quotes_detail() {
        let outcome = outcome();
        let csv = records_csv(&outcome.ensemble_records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 1 + 12);
        assert!(lines[0].starts_with("trial,source,target"));
        assert!(lines[1].ends_with('"'));
        assert!(lines[1].contains(",GPS,"));
    }

    #[test]
    fn test_quote_escapes_embedded_quotes() {
        assert_eq!(quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_summary_csv_rows() {
        let csv = summary_csv(&outcome().summary);
        assert!(csv.starts_with("metric,value\ntotal_attacks,4\n"));
        assert_eq!(csv.lines().count(), 10);
    }

    #[test]
    fn test_outcome_csv_carries_both_record_tables() {
        let outcome = outcome();
        let csv = outcome_csv(&outcome, true);
        let sections: Vec<&str> = csv.split("\n\n").collect();
        assert_eq!(sections.len(), 3);
        assert_eq!(format!("{}\n", sections[1]), records_csv(&outcome.baseline_records));
        assert_eq!(sections[2], records_csv(&outcome.ensemble_records));
        assert_eq!(outcome_csv(&outcome, false), summary_csv(&outcome.summary));
    }

    #[test]
    fn test_write_outcome_in_each_format() {
        let dir = TempDir::new().unwrap();
        let outcome = outcome();

        let files = write_outcome(&outcome, &config(), dir.path(), OutputFormat::Csv, true).unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|path| path.exists()));

        let files = write_outcome(&outcome, &config(), dir.path(), OutputFormat::Json, false).unwrap();
        let text = fs::read_to_string(&files[0]).unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["summary"], serde_json::to_value(&outcome.summary).unwrap());

        let nested = dir.path().join("nested/out");
        let files = write_outcome(&outcome, &config(), &nested, OutputFormat::Table, true).unwrap();
        let text = fs::read_to_string(&files[0]).unwrap();
        assert!(text.contains("With Karen Defense (12 records):"));
    }
}
