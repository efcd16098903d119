//! Delay-per-hop indicator (DPHI).
//!
//! Works on the one-dimensional [`Vehicle`] model, not on topology nodes. Each hop picks a
//! distinct sender and receiver, advances both by one tick and measures
//! `|receiver.position - sender.position| / sender.speed`. The indicator is a mobility
//! proxy: it flags fast divergent pairs and misses slow relays regardless of any attack.

use crate::model::Vehicle;
use crate::random::SamplingSource;
use crate::verdict::{AnomalyKind, HeuristicKind, HeuristicOutcome, Verdict};
use crate::{Meters, SimulationError, SimulationResult, VehicleId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hop delay above which a hop is considered suspicious
pub const DEFAULT_HOP_DELAY_THRESHOLD: f64 = 2.0;

/// Measurement of one hop, before any threshold is applied
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HopObservation {
    pub sender: VehicleId,
    pub receiver: VehicleId,
    pub sender_position: Meters,
    pub receiver_position: Meters,
    pub hop_delay: f64,
}

/// Observation classified against a threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HopCheck {
    pub observation: HopObservation,
    pub threshold: f64,
    pub verdict: Verdict,
}

/// Pick two distinct vehicles, advance both one tick and measure the hop delay.
///
/// Positions are mutated in place, so repeated calls on one fleet see accumulated motion.
pub fn observe_hop<R: Rng + ?Sized>(
    vehicles: &mut [Vehicle],
    rng: &mut R,
) -> SimulationResult<HopObservation> {
    let population = vehicles.len();
    let degenerate = move || SimulationError::DegeneratePopulation { population, required: 2 };
    if population < 2 {
        return Err(degenerate());
    }

    // Receiver drawn from everyone but the sender: a uniform ordered pair with no retries
    let indices: Vec<usize> = (0..population).collect();
    let sender_idx = *rng.choose_one(&indices).ok_or_else(degenerate)?;
    let others: Vec<usize> = indices.iter().copied().filter(|&idx| idx != sender_idx).collect();
    let receiver_idx = *rng.choose_one(&others).ok_or_else(degenerate)?;

    let sender = &vehicles[sender_idx];
    if sender.speed() <= 0.0 {
        return Err(SimulationError::InvalidConfig(format!(
            "vehicle {} has non-positive speed {}",
            sender.id(),
            sender.speed()
        )));
    }

    vehicles[sender_idx].advance();
    vehicles[receiver_idx].advance();

    let sender = &vehicles[sender_idx];
    let receiver = &vehicles[receiver_idx];

    Ok(HopObservation {
        sender: sender.id(),
        receiver: receiver.id(),
        sender_position: sender.position(),
        receiver_position: receiver.position(),
        hop_delay: (receiver.position() - sender.position()).abs() / sender.speed(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DelayPerHop {
    hop_delay_threshold: f64,
}

impl DelayPerHop {
    pub fn new(hop_delay_threshold: f64) -> Self {
        Self { hop_delay_threshold }
    }

    pub fn hop_delay_threshold(&self) -> f64 {
        self.hop_delay_threshold
    }

    /// Classify an observation; the threshold itself is `Normal`
    pub fn classify(&self, observation: HopObservation) -> HopCheck {
        HopCheck {
            observation,
            threshold: self.hop_delay_threshold,
            verdict: Verdict::from_violation(observation.hop_delay > self.hop_delay_threshold),
        }
    }

    pub fn simulate_hop<R: Rng + ?Sized>(
        &self,
        vehicles: &mut [Vehicle],
        rng: &mut R,
    ) -> SimulationResult<HopCheck> {
        Ok(self.classify(observe_hop(vehicles, rng)?))
    }

    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        vehicles: &mut [Vehicle],
        rng: &mut R,
    ) -> SimulationResult<HeuristicOutcome> {
        let check = self.simulate_hop(vehicles, rng)?;
        Ok(check.outcome())
    }
}

impl Default for DelayPerHop {
    fn default() -> Self {
        Self::new(DEFAULT_HOP_DELAY_THRESHOLD)
    }
}

impl HopCheck {
    pub fn outcome(&self) -> HeuristicOutcome {
        let delay = self.observation.hop_delay;
        debug!(
            sender = self.observation.sender,
            receiver = self.observation.receiver,
            hop_delay = delay,
            verdict = %self.verdict,
            "dphi check"
        );
        match self.verdict {
            Verdict::Abnormal => HeuristicOutcome::abnormal(
                HeuristicKind::DelayPerHop,
                AnomalyKind::HopDelay,
                format!("Possible wormhole attack! Delay too large: {}", delay),
            ),
            Verdict::Normal => HeuristicOutcome::normal(
                HeuristicKind::DelayPerHop,
                format!("Communication normal. Delay: {}", delay),
            ),
        }
    }
}

/// Run one hop over `vehicles` and classify it against `hop_delay_threshold`
pub fn simulate_hop<R: Rng + ?Sized>(
    vehicles: &mut [Vehicle],
    hop_delay_threshold: f64,
    rng: &mut R,
) -> SimulationResult<Verdict> {
    Ok(DelayPerHop::new(hop_delay_threshold).simulate_hop(vehicles, rng)?.verdict)
}
