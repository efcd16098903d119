//! # End-to-end Experiment Tests
//!
//! Runs the full harness and checks the summary against the result tables, the
//! determinism guarantees of seeded runs, and configuration rejection.

mod common;
use common::*;

use std::sync::atomic::{AtomicU64, Ordering};
use wormhole_simulation::random::seeded;
use wormhole_simulation::{
    create_harness, properties, utils, AnomalyKind, Clock, ExperimentConfig, HeuristicKind,
    Seconds, SimulationError, SystemClock, TrialHarness,
};

/// Clock that moves 10 microseconds every time it is read
#[derive(Default)]
struct TickingClock {
    reads: AtomicU64,
}

impl Clock for TickingClock {
    fn now(&self) -> Seconds {
        self.reads.fetch_add(1, Ordering::SeqCst) as f64 * 1.0e-5
    }
}

#[test]
fn test_minimal_experiment_is_reproducible() {
    let first = run_seeded(minimal_config(), 1);
    let second = run_seeded(minimal_config(), 1);

    assert_eq!(first.summary.total_attacks, 2);
    assert_eq!(first.baseline_records.len(), 2);
    assert_eq!(first.ensemble_records.len(), 6);
    assert_eq!(first, second);
}

#[test]
fn test_different_seeds_diverge() {
    let config = minimal_config().with_trials(5).with_nodes(10).with_attacks_per_trial(5);
    let a = run_seeded(config.clone(), 1);
    let b = run_seeded(config, 2);
    assert_ne!(a.baseline_records, b.baseline_records);
}

#[test]
fn test_properties_hold_across_test_configs() {
    for (i, config) in utils::test_configs().into_iter().enumerate() {
        let outcome = run_seeded(config, 100 + i as u64);
        assert!(properties::ensemble_dominates_baseline(&outcome.summary));
        assert!(properties::detection_rates_bounded(&outcome.summary));
        assert!(properties::anomalies_match_verdicts(&outcome));
        assert!(properties::record_counts_consistent(&outcome));
    }
}

#[test]
fn test_ensemble_records_follow_heuristic_order() {
    let outcome = run_seeded(minimal_config().with_attacks_per_trial(3), 8);
    for chunk in outcome.ensemble_records.chunks(3) {
        let kinds: Vec<HeuristicKind> = chunk.iter().map(|record| record.heuristic).collect();
        assert_eq!(kinds, HeuristicKind::ENSEMBLE.to_vec());
        assert!(chunk.iter().all(|record| record.attack == chunk[0].attack));
    }
    assert!(outcome.ensemble_records[0].detail.starts_with("[GPS] "));
    assert!(outcome.ensemble_records[1].detail.starts_with("[Packet] "));
    assert!(outcome.ensemble_records[2].detail.starts_with("[DPHI] "));
}

#[test]
fn test_baseline_matches_gps_column_of_ensemble() {
    let outcome = run_seeded(utils::test_configs().remove(1), 55);
    let gps_statuses: Vec<_> = outcome
        .ensemble_records
        .iter()
        .filter(|record| record.heuristic == HeuristicKind::GpsDistance)
        .map(|record| record.status)
        .collect();
    let baseline_statuses: Vec<_> = outcome.baseline_records.iter().map(|record| record.status).collect();
    assert_eq!(gps_statuses, baseline_statuses);
}

#[test]
fn test_moving_clock_trips_temporal_leash_on_every_attack() {
    let config = minimal_config().with_trials(3).with_attacks_per_trial(4);
    let outcome = TrialHarness::new(config)
        .run_with(&mut seeded(4), &TickingClock::default())
        .unwrap();

    assert_eq!(outcome.summary.detected_with_ensemble, 12);
    assert_eq!(outcome.summary.detection_rate_with_ensemble, 100.0);
    assert_eq!(outcome.summary.ensemble_anomalies.temporal_leash, 12);
    assert!(outcome
        .ensemble_records
        .iter()
        .filter(|record| record.heuristic == HeuristicKind::PacketLeash)
        .all(|record| record.anomaly == Some(AnomalyKind::TemporalLeash)));
}

#[test]
fn test_wall_clock_run_keeps_invariants() {
    let outcome = TrialHarness::new(minimal_config().with_trials(4))
        .run_with(&mut seeded(12), &SystemClock)
        .unwrap();
    assert!(properties::ensemble_dominates_baseline(&outcome.summary));
    assert!(properties::record_counts_consistent(&outcome));
}

#[test]
fn test_unbounded_range_baseline_detects_nothing() {
    let outcome = run_seeded(utils::unbounded_range_config(), 77);
    assert_eq!(outcome.summary.detected_without_ensemble, 0);
    assert_eq!(outcome.summary.statistics.baseline_per_trial.max, 0.0);
}

#[test]
fn test_invalid_configs_fail_before_running() {
    assert_eq!(
        create_harness(ExperimentConfig::new().with_nodes(4).with_attacks_per_trial(7)).unwrap_err(),
        SimulationError::AttackSampling { requested: 7, available: 6 }
    );
    assert!(matches!(
        create_harness(ExperimentConfig::new().with_nodes(1)),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn test_run_entry_point() {
    let summary = wormhole_simulation::run(2, 6, 3, 100.0).unwrap();
    assert_eq!(summary.total_attacks, 6);
    assert!(summary.detected_with_ensemble >= summary.detected_without_ensemble);
    assert!(wormhole_simulation::run(1, 1, 1, 100.0).is_err());
}

#[test]
fn test_outcome_serializes_to_json() {
    let outcome = run_seeded(minimal_config(), 3);
    let json = serde_json::to_value(&outcome.summary).unwrap();
    assert_eq!(json["total_attacks"], 2);
    assert!(json["statistics"]["ensemble_interval"]["upper"].is_number());
    assert!(json["ensemble_anomalies"]["hop_delay"].is_number());
}

#[cfg(feature = "large-scale")]
#[test]
fn test_parallel_matches_sequential() {
    use wormhole_simulation::ManualClock;

    let harness = TrialHarness::new(ExperimentConfig::new().with_trials(8).with_nodes(12).with_attacks_per_trial(10));
    let sequential = harness.run_with(&mut seeded(31), &ManualClock::default()).unwrap();
    let parallel = harness.run_parallel(&mut seeded(31), &ManualClock::default()).unwrap();
    assert_eq!(sequential, parallel);
}
