//! VANET Wormhole Detection - Reporting and CLI Support
//!
//! This crate is the reporting sink for `wormhole-simulation`. It loads layered
//! settings, renders results as console tables, and exports them as JSON or CSV.
//!
//! ## Usage
//!
//! ```rust
//! use wormhole_reporting::{render, run_experiment, Settings};
//!
//! let mut settings = Settings::default();
//! settings.experiment = settings
//!     .experiment
//!     .with_trials(2)
//!     .with_nodes(6)
//!     .with_attacks_per_trial(3)
//!     .with_seed(11);
//!
//! let outcome = run_experiment(&settings).unwrap();
//! let table = render::summary_table(&outcome.summary);
//! assert!(table.contains("Total Attacks"));
//! ```

#![warn(clippy::all)]

pub mod export;
pub mod render;
pub mod settings;

pub use export::{records_csv, summary_json, write_outcome, ExportMetadata};
pub use settings::{LoggingSettings, OutputFormat, OutputSettings, ScenarioSettings, Settings};

use tracing::info;
use wormhole_simulation::{create_harness, Clock, ExperimentOutcome};

// Error types and result aliases
pub mod error {
    //! Error types for settings, rendering and export

    pub use wormhole_simulation::{SimulationError, SimulationResult};

    /// Combined error type for reporting operations
    #[derive(Debug, thiserror::Error)]
    pub enum ReportError {
        /// Simulation rejected its input or failed mid-run
        #[error("Simulation error: {0}")]
        Simulation(#[from] SimulationError),

        /// Layered configuration could not be loaded
        #[error("Configuration error: {0}")]
        Config(#[from] config::ConfigError),

        /// Settings loaded but inconsistent
        #[error("Settings error: {0}")]
        Settings(String),

        /// I/O error
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        /// JSON serialization error
        #[error("Serialization error: {0}")]
        Serialization(#[from] serde_json::Error),

        /// TOML rendering of settings failed
        #[error("TOML error: {0}")]
        Toml(#[from] toml::ser::Error),

        /// Logging subscriber could not be installed
        #[error("Logging error: {0}")]
        Logging(String),
    }

    /// Result type for reporting operations
    pub type ReportResult<T> = Result<T, ReportError>;
}

pub use error::{ReportError, ReportResult};

/// Validate the experiment settings and run it with the default frozen clock
pub fn run_experiment(settings: &Settings) -> ReportResult<ExperimentOutcome> {
    let harness = create_harness(settings.experiment.clone())?;
    Ok(harness.run()?)
}

/// Run the experiment against an explicit clock, e.g. [`wormhole_simulation::SystemClock`]
pub fn run_experiment_with_clock(settings: &Settings, clock: &dyn Clock) -> ReportResult<ExperimentOutcome> {
    let harness = create_harness(settings.experiment.clone())?;
    let mut master = match settings.experiment.seed {
        Some(seed) => wormhole_simulation::random::seeded(seed),
        None => wormhole_simulation::random::from_entropy(),
    };
    Ok(harness.run_with(&mut master, clock)?)
}

/// Run the experiment's trials on the rayon pool
#[cfg(feature = "large-scale")]
pub fn run_experiment_parallel(settings: &Settings, clock: &dyn Clock) -> ReportResult<ExperimentOutcome> {
    let harness = create_harness(settings.experiment.clone())?;
    let mut master = match settings.experiment.seed {
        Some(seed) => wormhole_simulation::random::seeded(seed),
        None => wormhole_simulation::random::from_entropy(),
    };
    Ok(harness.run_parallel(&mut master, clock)?)
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over the configured level; `verbose` forces `debug`.
pub fn init_logging(logging: &LoggingSettings, verbose: bool) -> ReportResult<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(logging.color).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ReportError::Logging(format!("Failed to init logging: {}", e)))?;

    info!(level, "logging initialized");
    Ok(())
}

// Prelude module for convenient imports
pub mod prelude {
    //! Commonly used types and functions

    pub use crate::error::{ReportError, ReportResult};
    pub use crate::export::{records_csv, summary_json, write_outcome};
    pub use crate::render::{records_table, summary_table};
    pub use crate::settings::{OutputFormat, Settings};
    pub use crate::{init_logging, run_experiment, run_experiment_with_clock};

    pub use wormhole_simulation::{DetectionSummary, ExperimentConfig, ExperimentOutcome};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get version information
pub fn version_info() -> String {
    format!("wormhole-reporting {}", VERSION)
}
