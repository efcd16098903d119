//! Monte-Carlo trial harness.
//!
//! Every trial builds a fresh random chain topology, samples distinct wormhole pairs,
//! and runs both the GPS-only baseline and the ensemble against each pair. Each trial
//! draws from its own ChaCha8 stream, seeded from the master source before any trial
//! starts, so the sequential and parallel runners produce the same records.

use crate::clock::{Clock, ManualClock};
use crate::ensemble::EnsembleDefense;
use crate::gps::GpsHeuristic;
use crate::random::{from_entropy, seeded, trial_seeds};
use crate::statistics::{detection_rate, DetectionStatistics};
use crate::topology::{Topology, WormholeLink};
use crate::verdict::{AnomalyKind, HeuristicKind, HeuristicOutcome, Verdict};
use crate::{ExperimentConfig, Meters, SimulationResult};
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One row of the result table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    pub trial: usize,
    pub attack: WormholeLink,
    pub heuristic: HeuristicKind,
    pub communication_range: Meters,
    pub num_nodes: usize,
    pub detail: String,
    pub anomaly: Option<AnomalyKind>,
    pub status: Verdict,
}

impl TrialRecord {
    fn from_outcome(trial: usize, attack: WormholeLink, config: &ExperimentConfig, outcome: HeuristicOutcome) -> Self {
        Self {
            trial,
            attack,
            heuristic: outcome.heuristic,
            communication_range: config.communication_range,
            num_nodes: config.num_nodes,
            detail: outcome.to_string(),
            anomaly: outcome.anomaly,
            status: outcome.verdict,
        }
    }
}

/// Abnormal outcomes per failure category
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnomalyBreakdown {
    pub geographic_wormhole: usize,
    pub temporal_leash: usize,
    pub geographic_leash: usize,
    pub hop_delay: usize,
}

impl AnomalyBreakdown {
    pub fn record(&mut self, kind: AnomalyKind) {
        match kind {
            AnomalyKind::GeographicWormhole => self.geographic_wormhole += 1,
            AnomalyKind::TemporalLeash => self.temporal_leash += 1,
            AnomalyKind::GeographicLeash => self.geographic_leash += 1,
            AnomalyKind::HopDelay => self.hop_delay += 1,
        }
    }

    pub fn get(&self, kind: AnomalyKind) -> usize {
        match kind {
            AnomalyKind::GeographicWormhole => self.geographic_wormhole,
            AnomalyKind::TemporalLeash => self.temporal_leash,
            AnomalyKind::GeographicLeash => self.geographic_leash,
            AnomalyKind::HopDelay => self.hop_delay,
        }
    }

    pub fn total(&self) -> usize {
        self.geographic_wormhole + self.temporal_leash + self.geographic_leash + self.hop_delay
    }

    fn merge(&mut self, other: &AnomalyBreakdown) {
        self.geographic_wormhole += other.geographic_wormhole;
        self.temporal_leash += other.temporal_leash;
        self.geographic_leash += other.geographic_leash;
        self.hop_delay += other.hop_delay;
    }
}

/// Aggregate detection counts and rates over a whole run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionSummary {
    pub total_attacks: usize,
    pub detected_without_ensemble: usize,
    pub detection_rate_without_ensemble: f64,
    pub detected_with_ensemble: usize,
    pub detection_rate_with_ensemble: f64,
    /// Abnormal ensemble outcomes by category; one attack may contribute several
    pub ensemble_anomalies: AnomalyBreakdown,
    pub statistics: DetectionStatistics,
}

/// Summary plus the full result tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExperimentOutcome {
    pub summary: DetectionSummary,
    pub baseline_records: Vec<TrialRecord>,
    pub ensemble_records: Vec<TrialRecord>,
}

/// Per-trial partial result, reduced in trial order
struct TrialTally {
    baseline_detected: usize,
    ensemble_detected: usize,
    anomalies: AnomalyBreakdown,
    baseline_records: Vec<TrialRecord>,
    ensemble_records: Vec<TrialRecord>,
}

#[derive(Debug, Clone)]
pub struct TrialHarness {
    config: ExperimentConfig,
    baseline: GpsHeuristic,
    ensemble: EnsembleDefense,
}

impl TrialHarness {
    /// Build a harness; use [`crate::create_harness`] to validate the config first
    pub fn new(config: ExperimentConfig) -> Self {
        Self {
            baseline: GpsHeuristic::new(config.communication_range),
            ensemble: EnsembleDefense::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    /// Run with the configured seed (or OS entropy) and a frozen simulated clock
    pub fn run(&self) -> SimulationResult<ExperimentOutcome> {
        let mut master = match self.config.seed {
            Some(seed) => seeded(seed),
            None => from_entropy(),
        };
        self.run_with(&mut master, &ManualClock::default())
    }

    /// Run every trial sequentially with injected randomness and time
    pub fn run_with<R: RngCore + ?Sized>(
        &self,
        master: &mut R,
        clock: &dyn Clock,
    ) -> SimulationResult<ExperimentOutcome> {
        let seeds = trial_seeds(master, self.config.num_trials);
        info!(
            trials = self.config.num_trials,
            nodes = self.config.num_nodes,
            attacks_per_trial = self.config.attacks_per_trial,
            "starting experiment"
        );
        let tallies = seeds
            .iter()
            .enumerate()
            .map(|(trial, &seed)| self.run_trial(trial, seed, clock))
            .collect::<SimulationResult<Vec<_>>>()?;
        self.finish(tallies)
    }

    /// Run trials on the rayon pool; results match [`run_with`](Self::run_with)
    #[cfg(feature = "large-scale")]
    pub fn run_parallel<R: RngCore + ?Sized>(
        &self,
        master: &mut R,
        clock: &dyn Clock,
    ) -> SimulationResult<ExperimentOutcome> {
        use rayon::prelude::*;

        let seeds = trial_seeds(master, self.config.num_trials);
        info!(
            trials = self.config.num_trials,
            threads = rayon::current_num_threads(),
            "starting parallel experiment"
        );
        let tallies = seeds
            .par_iter()
            .enumerate()
            .map(|(trial, &seed)| self.run_trial(trial, seed, clock))
            .collect::<SimulationResult<Vec<_>>>()?;
        self.finish(tallies)
    }

    fn run_trial(&self, trial: usize, seed: u64, clock: &dyn Clock) -> SimulationResult<TrialTally> {
        let mut rng = seeded(seed);
        let mut topology = Topology::random_chain(self.config.num_nodes, self.config.area_size, &mut rng)?;
        let attacks = topology.sample_attacks(self.config.attacks_per_trial, &mut rng)?;

        let mut tally = TrialTally {
            baseline_detected: 0,
            ensemble_detected: 0,
            anomalies: AnomalyBreakdown::default(),
            baseline_records: Vec::with_capacity(attacks.len()),
            ensemble_records: Vec::with_capacity(attacks.len() * HeuristicKind::ENSEMBLE.len()),
        };

        for attack in attacks {
            topology.add_wormhole(&attack)?;

            let baseline = self
                .baseline
                .evaluate(topology.node(attack.source)?, topology.node(attack.target)?);
            if baseline.verdict.is_abnormal() {
                tally.baseline_detected += 1;
            }
            tally
                .baseline_records
                .push(TrialRecord::from_outcome(trial, attack, &self.config, baseline));

            let report = self.ensemble.evaluate(&topology, &attack, clock, &mut rng)?;
            if report.any_abnormal() {
                tally.ensemble_detected += 1;
            }
            for outcome in report.outcomes {
                if let Some(kind) = outcome.anomaly {
                    tally.anomalies.record(kind);
                }
                tally
                    .ensemble_records
                    .push(TrialRecord::from_outcome(trial, attack, &self.config, outcome));
            }
        }

        debug!(
            trial,
            wormhole_edges = topology.wormhole_links().len(),
            "trial topology complete"
        );
        info!(
            trial,
            baseline = tally.baseline_detected,
            ensemble = tally.ensemble_detected,
            "trial finished"
        );
        Ok(tally)
    }

    fn finish(&self, tallies: Vec<TrialTally>) -> SimulationResult<ExperimentOutcome> {
        let total_attacks = self.config.total_attacks();
        let per_trial: Vec<(usize, usize)> = tallies
            .iter()
            .map(|tally| (tally.baseline_detected, tally.ensemble_detected))
            .collect();
        let statistics = DetectionStatistics::compute(&per_trial, self.config.attacks_per_trial)?;

        let mut anomalies = AnomalyBreakdown::default();
        let mut baseline_records = Vec::with_capacity(total_attacks);
        let mut ensemble_records = Vec::with_capacity(total_attacks * HeuristicKind::ENSEMBLE.len());
        for tally in tallies {
            anomalies.merge(&tally.anomalies);
            baseline_records.extend(tally.baseline_records);
            ensemble_records.extend(tally.ensemble_records);
        }

        let detected_without_ensemble: usize = per_trial.iter().map(|(b, _)| b).sum();
        let detected_with_ensemble: usize = per_trial.iter().map(|(_, e)| e).sum();
        let summary = DetectionSummary {
            total_attacks,
            detected_without_ensemble,
            detection_rate_without_ensemble: detection_rate(detected_without_ensemble, total_attacks),
            detected_with_ensemble,
            detection_rate_with_ensemble: detection_rate(detected_with_ensemble, total_attacks),
            ensemble_anomalies: anomalies,
            statistics,
        };

        info!(
            total_attacks,
            baseline_rate = summary.detection_rate_without_ensemble,
            ensemble_rate = summary.detection_rate_with_ensemble,
            "experiment complete"
        );
        Ok(ExperimentOutcome { summary, baseline_records, ensemble_records })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::unbounded_range_config;

    fn small_config() -> ExperimentConfig {
        ExperimentConfig::new()
            .with_trials(3)
            .with_nodes(6)
            .with_attacks_per_trial(4)
            .with_seed(2024)
    }

    #[test]
    fn test_record_and_attack_counts() {
        let outcome = TrialHarness::new(small_config()).run().unwrap();
        assert_eq!(outcome.summary.total_attacks, 12);
        assert_eq!(outcome.baseline_records.len(), 12);
        assert_eq!(outcome.ensemble_records.len(), 36);
        assert!(outcome.summary.detected_with_ensemble >= outcome.summary.detected_without_ensemble);
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let harness = TrialHarness::new(small_config());
        assert_eq!(harness.run().unwrap(), harness.run().unwrap());
    }

    #[test]
    fn test_attacks_within_trial_are_distinct() {
        let outcome = TrialHarness::new(small_config()).run().unwrap();
        for trial in 0..3 {
            let mut pairs: Vec<(u32, u32)> = outcome
                .baseline_records
                .iter()
                .filter(|record| record.trial == trial)
                .map(|record| record.attack.normalized())
                .collect();
            pairs.sort_unstable();
            pairs.dedup();
            assert_eq!(pairs.len(), 4);
        }
    }

    #[test]
    fn test_unbounded_range_disables_baseline() {
        let outcome = TrialHarness::new(unbounded_range_config().with_seed(3)).run().unwrap();
        assert_eq!(outcome.summary.detected_without_ensemble, 0);
        assert_eq!(outcome.summary.ensemble_anomalies.geographic_wormhole, 0);
        assert_eq!(outcome.summary.detection_rate_without_ensemble, 0.0);
    }

    #[test]
    fn test_frozen_clock_never_trips_temporal_leash() {
        let outcome = TrialHarness::new(small_config()).run().unwrap();
        assert_eq!(outcome.summary.ensemble_anomalies.temporal_leash, 0);
    }

    #[test]
    fn test_anomaly_breakdown_counts_abnormal_records() {
        let outcome = TrialHarness::new(small_config()).run().unwrap();
        let abnormal = outcome
            .ensemble_records
            .iter()
            .filter(|record| record.status.is_abnormal())
            .count();
        assert_eq!(outcome.summary.ensemble_anomalies.total(), abnormal);
    }
}
