//! Ensemble aggregator ("Karen defense").
//!
//! Runs GPS, packet leash and DPHI against one wormhole edge and returns all three
//! outcomes. [`EnsembleReport::combined_verdict`] collapses them with the OR-rule the
//! harness counts through [`EnsembleReport::any_abnormal`].

use crate::clock::Clock;
use crate::dphi::DelayPerHop;
use crate::gps::GpsHeuristic;
use crate::leash::PacketLeash;
use crate::model::spawn_fleet;
use crate::topology::{Topology, WormholeLink};
use crate::verdict::{HeuristicKind, HeuristicOutcome, Verdict};
use crate::{ExperimentConfig, SimulationResult, SpeedRange};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Outcomes in [`HeuristicKind::ENSEMBLE`] order
pub type EnsembleVerdicts = SmallVec<[HeuristicOutcome; 3]>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnsembleReport {
    pub attack: WormholeLink,
    pub outcomes: EnsembleVerdicts,
}

impl EnsembleReport {
    pub fn any_abnormal(&self) -> bool {
        self.combined_verdict().is_abnormal()
    }

    /// OR over every constituent verdict
    pub fn combined_verdict(&self) -> Verdict {
        self.outcomes
            .iter()
            .fold(Verdict::Normal, |acc, outcome| acc.or(outcome.verdict))
    }

    pub fn outcome(&self, kind: HeuristicKind) -> Option<&HeuristicOutcome> {
        self.outcomes.iter().find(|outcome| outcome.heuristic == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnsembleDefense {
    gps: GpsHeuristic,
    leash: PacketLeash,
    dphi: DelayPerHop,
    vehicle_speeds: SpeedRange,
}

impl EnsembleDefense {
    pub fn new(gps: GpsHeuristic, leash: PacketLeash, dphi: DelayPerHop, vehicle_speeds: SpeedRange) -> Self {
        Self { gps, leash, dphi, vehicle_speeds }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        Self::new(
            GpsHeuristic::new(config.communication_range),
            PacketLeash::new(config.max_travel_distance, config.propagation_speed),
            DelayPerHop::new(config.hop_delay_threshold),
            config.vehicle_speeds,
        )
    }

    pub fn gps(&self) -> &GpsHeuristic {
        &self.gps
    }

    pub fn leash(&self) -> &PacketLeash {
        &self.leash
    }

    pub fn dphi(&self) -> &DelayPerHop {
        &self.dphi
    }

    /// Evaluate all three heuristics against one attack edge.
    ///
    /// The packet is stamped and verified against the same clock, so with a frozen clock
    /// the temporal leash sees zero travel time. DPHI runs on a fresh fleet sized to the
    /// topology's node count and never looks at the attacked nodes.
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        topology: &Topology,
        attack: &WormholeLink,
        clock: &dyn Clock,
        rng: &mut R,
    ) -> SimulationResult<EnsembleReport> {
        let source = topology.node(attack.source)?;
        let target = topology.node(attack.target)?;
        let mut outcomes = EnsembleVerdicts::new();

        outcomes.push(self.gps.evaluate(source, target));

        let packet = topology.create_packet(source.id, target.id, clock.now())?;
        let trace = self.leash.verify(&packet, target.location(), clock);
        outcomes.push(PacketLeash::outcome(&trace));

        let mut fleet = spawn_fleet(topology.node_count(), &self.vehicle_speeds, rng)?;
        outcomes.push(self.dphi.evaluate(&mut fleet, rng)?);

        Ok(EnsembleReport { attack: *attack, outcomes })
    }
}
