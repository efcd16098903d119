//! Layered settings: defaults, then an optional TOML file, then `WORMHOLE__*` variables.
//!
//! Nested keys use a double underscore, e.g. `WORMHOLE__EXPERIMENT__NUM_TRIALS=10` or
//! `WORMHOLE__OUTPUT__FORMAT=json`.

use crate::error::{ReportError, ReportResult};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};
use wormhole_simulation::scenarios::{DphiScenario, GpsScenario, LeashScenario};
use wormhole_simulation::ExperimentConfig;

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "WORMHOLE";

/// How results are written
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(ReportError::Settings(format!(
                "unknown output format '{}', expected table, json or csv",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Table => "table",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    pub format: OutputFormat,
    /// Write files here instead of printing to stdout
    pub directory: Option<PathBuf>,
    /// Include the per-attack result tables
    pub include_records: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    pub color: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: "info".to_string(), color: true }
    }
}

/// Parameters of the standalone heuristic demonstrations
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScenarioSettings {
    pub gps: GpsScenario,
    pub leash: LeashScenario,
    pub dphi: DphiScenario,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub experiment: ExperimentConfig,
    pub scenarios: ScenarioSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    /// Load defaults, then `path` if given, then environment overrides
    pub fn load(path: Option<&Path>) -> ReportResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            if !path.exists() {
                return Err(ReportError::Settings(format!(
                    "settings file {} does not exist",
                    path.display()
                )));
            }
            debug!(path = %path.display(), "loading settings file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the experiment and scenario parameters
    pub fn validate(&self) -> ReportResult<()> {
        if let Err(err) = self.experiment.validate() {
            warn!(error = %err, "experiment settings rejected");
            return Err(err.into());
        }
        self.validate_scenarios()
    }

    /// Check only the standalone scenario parameters
    pub fn validate_scenarios(&self) -> ReportResult<()> {
        if self.scenarios.gps.num_nodes < 2 {
            return Err(ReportError::Settings(format!(
                "gps scenario needs at least 2 nodes, got {}",
                self.scenarios.gps.num_nodes
            )));
        }
        if self.scenarios.dphi.num_vehicles < 2 {
            return Err(ReportError::Settings(format!(
                "dphi scenario needs at least 2 vehicles, got {}",
                self.scenarios.dphi.num_vehicles
            )));
        }
        self.scenarios.dphi.vehicle_speeds.validate()?;
        Ok(())
    }

    /// Render the effective settings as TOML
    pub fn to_toml(&self) -> ReportResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file() -> NamedTempFile {
        tempfile::Builder::new().suffix(".toml").tempfile().unwrap()
    }

    fn clear_env() {
        for key in [
            "WORMHOLE__EXPERIMENT__NUM_TRIALS",
            "WORMHOLE__EXPERIMENT__SEED",
            "WORMHOLE__OUTPUT__FORMAT",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Csv.to_string(), "csv");
    }

    #[test]
    #[serial]
    fn test_load_defaults_without_file() {
        clear_env();
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.experiment.num_trials, 100);
        assert_eq!(settings.scenarios.dphi.num_vehicles, 50);
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        clear_env();
        let mut file = toml_file();
        writeln!(
            file,
            r#"
[experiment]
num_trials = 7
num_nodes = 12
communication_range = 150.0
seed = 42

[scenarios.gps]
num_nodes = 4

[output]
format = "csv"
include_records = true
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.experiment.num_trials, 7);
        assert_eq!(settings.experiment.num_nodes, 12);
        assert_eq!(settings.experiment.communication_range, 150.0);
        assert_eq!(settings.experiment.seed, Some(42));
        assert_eq!(settings.experiment.attacks_per_trial, 50);
        assert_eq!(settings.scenarios.gps.num_nodes, 4);
        assert_eq!(settings.output.format, OutputFormat::Csv);
        assert!(settings.output.include_records);
    }

    #[test]
    #[serial]
    fn test_environment_overrides_file() {
        clear_env();
        let mut file = toml_file();
        writeln!(file, "[experiment]\nnum_trials = 7\n").unwrap();

        std::env::set_var("WORMHOLE__EXPERIMENT__NUM_TRIALS", "3");
        std::env::set_var("WORMHOLE__OUTPUT__FORMAT", "json");
        let loaded = Settings::load(Some(file.path()));
        clear_env();

        let settings = loaded.unwrap();
        assert_eq!(settings.experiment.num_trials, 3);
        assert_eq!(settings.output.format, OutputFormat::Json);
    }

    #[test]
    #[serial]
    fn test_invalid_file_values_rejected() {
        clear_env();
        let mut file = toml_file();
        writeln!(file, "[experiment]\nnum_nodes = 3\nattacks_per_trial = 4\n").unwrap();
        let err = Settings::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ReportError::Simulation(_)));
    }

    #[test]
    fn test_scenario_validation_ignores_experiment() {
        let mut settings = Settings::default();
        settings.experiment.num_nodes = 4;
        settings.scenarios.gps.num_nodes = 4;
        assert!(settings.validate().is_err());
        assert!(settings.validate_scenarios().is_ok());

        settings.scenarios.dphi.num_vehicles = 1;
        assert!(matches!(settings.validate_scenarios(), Err(ReportError::Settings(_))));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = Settings::load(Some(Path::new("/nonexistent/wormhole.toml"))).unwrap_err();
        assert!(matches!(err, ReportError::Settings(_)));
    }

    #[test]
    fn test_toml_round_trip_preserves_settings() {
        let mut settings = Settings::default();
        settings.experiment = settings.experiment.with_seed(5).with_trials(9);
        settings.output.format = OutputFormat::Json;

        let text = settings.to_toml().unwrap();
        assert!(text.contains("num_trials = 9"));
        let parsed: Settings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, settings);
    }
}
