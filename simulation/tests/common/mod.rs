//! Shared helpers for the simulation integration suites.

#![allow(dead_code)]

use wormhole_simulation::random::seeded;
use wormhole_simulation::{ExperimentConfig, ExperimentOutcome, ManualClock, TrialHarness};

/// Smallest experiment worth asserting on: one trial, five nodes, two attacks
pub fn minimal_config() -> ExperimentConfig {
    ExperimentConfig::new()
        .with_trials(1)
        .with_nodes(5)
        .with_attacks_per_trial(2)
        .with_communication_range(100.0)
}

/// Run `config` from a fixed master seed with a frozen clock
pub fn run_seeded(config: ExperimentConfig, seed: u64) -> ExperimentOutcome {
    TrialHarness::new(config)
        .run_with(&mut seeded(seed), &ManualClock::default())
        .expect("experiment should run")
}
