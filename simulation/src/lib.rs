//! # VANET Wormhole Detection - Monte-Carlo Simulation
//!
//! This library evaluates how well independent heuristics detect wormhole links in a
//! vehicular ad-hoc network (VANET). A wormhole tunnels packets between two distant nodes
//! through an out-of-band link so that they appear to be direct neighbours.
//!
//! ## Architecture
//!
//! - **Model**: planar [`Node`]s, one-dimensional [`Vehicle`]s and [`Packet`]s
//! - **Topology**: chain-connected random node sets with injectable wormhole edges
//! - **GPS**: flags links longer than the communication range
//! - **Packet leash**: bounds the travel distance implied by time and claimed location
//! - **DPHI**: delay-per-hop indicator over independently moving vehicles
//! - **Ensemble**: runs all three heuristics against one attack ("Karen defense")
//! - **Harness**: repeated randomized trials aggregated into detection-rate statistics
//!
//! ## Usage
//!
//! ```rust
//! use wormhole_simulation::{create_harness, ExperimentConfig, ManualClock};
//! use wormhole_simulation::random::seeded;
//!
//! let config = ExperimentConfig::new()
//!     .with_trials(2)
//!     .with_nodes(5)
//!     .with_attacks_per_trial(2)
//!     .with_communication_range(100.0);
//!
//! let harness = create_harness(config).unwrap();
//! let outcome = harness.run_with(&mut seeded(7), &ManualClock::default()).unwrap();
//!
//! assert_eq!(outcome.summary.total_attacks, 4);
//! assert!(outcome.summary.detected_with_ensemble >= outcome.summary.detected_without_ensemble);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub mod clock;
pub mod dphi;
pub mod ensemble;
pub mod gps;
pub mod harness;
pub mod leash;
pub mod model;
pub mod random;
pub mod scenarios;
pub mod statistics;
pub mod topology;
pub mod verdict;

// Re-export main components
pub use clock::{Clock, ManualClock, SystemClock};
pub use dphi::{DelayPerHop, HopCheck, HopObservation};
pub use ensemble::{EnsembleDefense, EnsembleReport, EnsembleVerdicts};
pub use gps::{GpsCheck, GpsHeuristic};
pub use harness::{AnomalyBreakdown, DetectionSummary, ExperimentOutcome, TrialHarness, TrialRecord};
pub use leash::{LeashTrace, LeashViolation, PacketLeash, SPEED_OF_LIGHT};
pub use model::{Location, Node, Packet, Vehicle};
pub use statistics::{DetectionStatistics, RateInterval, RateStatistics};
pub use topology::{Link, Topology, WormholeLink};
pub use verdict::{AnomalyKind, HeuristicKind, HeuristicOutcome, Verdict};

/// Node identifier inside a topology
pub type NodeId = u32;

/// Vehicle identifier inside a DPHI fleet
pub type VehicleId = u32;

/// Planar or linear distance in meters
pub type Meters = f64;

/// Time value in seconds
pub type Seconds = f64;

/// Signal propagation speed in meters per second
pub type MetersPerSecond = f64;

/// Error types for the wormhole simulation
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    /// Experiment parameters rejected before any trial runs
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A population too small to draw distinct members from
    #[error("population of {population} cannot supply {required} distinct members")]
    DegeneratePopulation { population: usize, required: usize },

    /// More attacks requested than distinct node pairs exist
    #[error("cannot sample {requested} distinct attacks from {available} node pairs")]
    AttackSampling { requested: usize, available: usize },

    /// Node id not present in the topology
    #[error("node {0} is not part of the topology")]
    UnknownNode(NodeId),

    /// Statistical computation failed
    #[error("statistics error: {0}")]
    Statistics(String),
}

/// Result type for simulation operations
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Inclusive range vehicle speeds are drawn from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpeedRange {
    pub min: f64,
    pub max: f64,
}

impl SpeedRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn validate(&self) -> SimulationResult<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(SimulationError::InvalidConfig(
                "Vehicle speed bounds must be finite".to_string(),
            ));
        }
        if self.min <= 0.0 {
            return Err(SimulationError::InvalidConfig(
                "Vehicle speeds must be positive".to_string(),
            ));
        }
        if self.min > self.max {
            return Err(SimulationError::InvalidConfig(format!(
                "Vehicle speed range is empty: {} > {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for SpeedRange {
    fn default() -> Self {
        Self::new(10.0, 25.0)
    }
}

/// Parameters of one Monte-Carlo experiment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Number of independent trials
    pub num_trials: usize,

    /// Nodes per randomized topology (also the DPHI fleet size)
    pub num_nodes: usize,

    /// Distinct wormhole pairs injected per trial
    pub attacks_per_trial: usize,

    /// Maximum legitimate single-hop distance
    pub communication_range: Meters,

    /// Side length of the square deployment area
    pub area_size: Meters,

    /// Packet leash bound on travel distance
    pub max_travel_distance: Meters,

    /// Propagation speed used by the temporal leash
    pub propagation_speed: MetersPerSecond,

    /// DPHI hop-delay threshold
    pub hop_delay_threshold: f64,

    /// Range vehicle speeds are drawn from
    pub vehicle_speeds: SpeedRange,

    /// Master seed; `None` draws from OS entropy
    pub seed: Option<u64>,
}

impl ExperimentConfig {
    /// Create a configuration with the reference experiment values
    pub fn new() -> Self {
        Self {
            num_trials: 100,
            num_nodes: 20,
            attacks_per_trial: 50,
            communication_range: 100.0,
            area_size: 500.0,
            max_travel_distance: 500.0,
            propagation_speed: SPEED_OF_LIGHT,
            hop_delay_threshold: dphi::DEFAULT_HOP_DELAY_THRESHOLD,
            vehicle_speeds: SpeedRange::default(),
            seed: None,
        }
    }

    pub fn with_trials(mut self, num_trials: usize) -> Self {
        self.num_trials = num_trials;
        self
    }

    pub fn with_nodes(mut self, num_nodes: usize) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn with_attacks_per_trial(mut self, attacks_per_trial: usize) -> Self {
        self.attacks_per_trial = attacks_per_trial;
        self
    }

    pub fn with_communication_range(mut self, communication_range: Meters) -> Self {
        self.communication_range = communication_range;
        self
    }

    pub fn with_area_size(mut self, area_size: Meters) -> Self {
        self.area_size = area_size;
        self
    }

    /// Set the packet leash bounds
    pub fn with_leash(mut self, max_travel_distance: Meters, propagation_speed: MetersPerSecond) -> Self {
        self.max_travel_distance = max_travel_distance;
        self.propagation_speed = propagation_speed;
        self
    }

    pub fn with_hop_delay_threshold(mut self, threshold: f64) -> Self {
        self.hop_delay_threshold = threshold;
        self
    }

    pub fn with_vehicle_speeds(mut self, speeds: SpeedRange) -> Self {
        self.vehicle_speeds = speeds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of distinct unordered node pairs a topology offers
    pub fn available_pairs(&self) -> usize {
        topology::pair_count(self.num_nodes)
    }

    /// Attacks simulated over the whole run
    pub fn total_attacks(&self) -> usize {
        self.num_trials * self.attacks_per_trial
    }

    /// Validate the configuration
    pub fn validate(&self) -> SimulationResult<()> {
        if self.num_trials == 0 {
            return Err(SimulationError::InvalidConfig(
                "Trial count must be positive".to_string(),
            ));
        }

        if self.num_nodes < 2 {
            return Err(SimulationError::InvalidConfig(format!(
                "At least 2 nodes are required, got {}",
                self.num_nodes
            )));
        }

        if self.attacks_per_trial == 0 {
            return Err(SimulationError::InvalidConfig(
                "Attacks per trial must be positive".to_string(),
            ));
        }

        if self.attacks_per_trial > self.available_pairs() {
            return Err(SimulationError::AttackSampling {
                requested: self.attacks_per_trial,
                available: self.available_pairs(),
            });
        }

        for (name, value) in [
            ("communication_range", self.communication_range),
            ("area_size", self.area_size),
            ("max_travel_distance", self.max_travel_distance),
            ("hop_delay_threshold", self.hop_delay_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SimulationError::InvalidConfig(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        if !self.propagation_speed.is_finite() || self.propagation_speed <= 0.0 {
            return Err(SimulationError::InvalidConfig(format!(
                "propagation_speed must be positive, got {}",
                self.propagation_speed
            )));
        }

        self.vehicle_speeds.validate()
    }
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Main entry point for creating a validated trial harness
pub fn create_harness(config: ExperimentConfig) -> SimulationResult<TrialHarness> {
    if let Err(err) = config.validate() {
        warn!(error = %err, "rejected experiment configuration");
        return Err(err);
    }
    Ok(TrialHarness::new(config))
}

/// Run an unseeded experiment with the reference leash and DPHI parameters
pub fn run(
    num_trials: usize,
    num_nodes: usize,
    attacks_per_trial: usize,
    communication_range: Meters,
) -> SimulationResult<DetectionSummary> {
    let config = ExperimentConfig::new()
        .with_trials(num_trials)
        .with_nodes(num_nodes)
        .with_attacks_per_trial(attacks_per_trial)
        .with_communication_range(communication_range);
    Ok(create_harness(config)?.run()?.summary)
}

/// Property checkers over finished experiments
pub mod properties {
    use super::*;

    /// The ensemble is an OR over a superset of the baseline checks
    pub fn ensemble_dominates_baseline(summary: &DetectionSummary) -> bool {
        summary.detected_with_ensemble >= summary.detected_without_ensemble
    }

    /// Both detection rates are percentages of the recorded counts
    pub fn detection_rates_bounded(summary: &DetectionSummary) -> bool {
        let consistent = |detected: usize, rate: f64| {
            rate == statistics::detection_rate(detected, summary.total_attacks)
                && (0.0..=100.0).contains(&rate)
        };
        consistent(summary.detected_without_ensemble, summary.detection_rate_without_ensemble)
            && consistent(summary.detected_with_ensemble, summary.detection_rate_with_ensemble)
    }

    /// Every ensemble record carries an anomaly exactly when it is abnormal
    pub fn anomalies_match_verdicts(outcome: &ExperimentOutcome) -> bool {
        outcome
            .ensemble_records
            .iter()
            .chain(outcome.baseline_records.iter())
            .all(|record| record.anomaly.is_some() == record.status.is_abnormal())
    }

    /// Each attack yields one baseline record and three ensemble records
    pub fn record_counts_consistent(outcome: &ExperimentOutcome) -> bool {
        let attacks = outcome.summary.total_attacks;
        outcome.baseline_records.len() == attacks
            && outcome.ensemble_records.len() == attacks * HeuristicKind::ENSEMBLE.len()
    }
}

/// Utilities for tests and demonstrations
pub mod utils {
    use super::*;

    /// Configurations exercising small, reference and dense topologies
    pub fn test_configs() -> Vec<ExperimentConfig> {
        vec![
            ExperimentConfig::new().with_trials(3).with_nodes(5).with_attacks_per_trial(2),
            ExperimentConfig::new().with_trials(5).with_nodes(20).with_attacks_per_trial(50),
            ExperimentConfig::new()
                .with_trials(2)
                .with_nodes(40)
                .with_attacks_per_trial(100)
                .with_area_size(150.0),
        ]
    }

    /// Configuration whose GPS check can never fire
    pub fn unbounded_range_config() -> ExperimentConfig {
        ExperimentConfig::new()
            .with_trials(4)
            .with_nodes(8)
            .with_attacks_per_trial(6)
            .with_communication_range(1.0e9)
    }
}
