//! Packet leash verification.
//!
//! Two independent bounds on how far a packet can have travelled:
//!
//! 1. **Temporal leash**: `(now - timestamp) * propagation_speed` must not exceed the
//!    maximum travel distance.
//! 2. **Geographic leash**: the distance between the sender's claimed location and the
//!    verifier must not exceed the maximum travel distance. Skipped when the packet makes
//!    no location claim.
//!
//! Both are evaluated and every failing check is reported.

use crate::clock::Clock;
use crate::model::{Location, Packet};
use crate::verdict::{AnomalyKind, HeuristicKind, HeuristicOutcome, Verdict};
use crate::{Meters, MetersPerSecond, NodeId, Seconds};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Propagation speed of radio signals
pub const SPEED_OF_LIGHT: MetersPerSecond = 3.0e8;

/// One failed leash check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum LeashViolation {
    TravelDistance { travel_distance: Meters, limit: Meters },
    ClaimedLocation { distance: Meters, limit: Meters },
}

impl LeashViolation {
    pub fn anomaly(&self) -> AnomalyKind {
        match self {
            LeashViolation::TravelDistance { .. } => AnomalyKind::TemporalLeash,
            LeashViolation::ClaimedLocation { .. } => AnomalyKind::GeographicLeash,
        }
    }
}

impl fmt::Display for LeashViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeashViolation::TravelDistance { limit, .. } => write!(
                f,
                "Travel distance exceeds the maximum travel distance of {} meters",
                limit
            ),
            LeashViolation::ClaimedLocation { limit, .. } => write!(
                f,
                "Calculated distance exceeds the maximum travel distance of {} meters",
                limit
            ),
        }
    }
}

/// Intermediate values of one verification, for reporting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeashTrace {
    pub source: NodeId,
    pub destination: NodeId,
    pub current_time: Seconds,
    pub packet_timestamp: Seconds,
    pub travel_time: Seconds,
    pub travel_distance: Meters,
    pub claimed_location: Option<Location>,
    pub verifier_location: Location,
    pub calculated_distance: Option<Meters>,
    pub violations: SmallVec<[LeashViolation; 2]>,
}

impl LeashTrace {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_violation(!self.violations.is_empty())
    }

    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PacketLeash {
    max_travel_distance: Meters,
    propagation_speed: MetersPerSecond,
}

impl PacketLeash {
    pub fn new(max_travel_distance: Meters, propagation_speed: MetersPerSecond) -> Self {
        Self { max_travel_distance, propagation_speed }
    }

    pub fn with_speed_of_light(max_travel_distance: Meters) -> Self {
        Self::new(max_travel_distance, SPEED_OF_LIGHT)
    }

    pub fn max_travel_distance(&self) -> Meters {
        self.max_travel_distance
    }

    pub fn propagation_speed(&self) -> MetersPerSecond {
        self.propagation_speed
    }

    /// Verify against the clock's current instant
    pub fn verify(&self, packet: &Packet, verifier_location: Location, clock: &dyn Clock) -> LeashTrace {
        self.verify_at(packet, verifier_location, clock.now())
    }

    /// Verify as if received at `now`
    pub fn verify_at(&self, packet: &Packet, verifier_location: Location, now: Seconds) -> LeashTrace {
        let limit = self.max_travel_distance;
        let travel_time = now - packet.timestamp;
        let travel_distance = travel_time * self.propagation_speed;
        let mut violations = SmallVec::new();

        if travel_distance > limit {
            violations.push(LeashViolation::TravelDistance { travel_distance, limit });
        }

        let calculated_distance = packet
            .claimed_location
            .map(|claimed| claimed.distance_to(&verifier_location));
        if let Some(distance) = calculated_distance {
            if distance > limit {
                violations.push(LeashViolation::ClaimedLocation { distance, limit });
            }
        }

        LeashTrace {
            source: packet.source,
            destination: packet.destination,
            current_time: now,
            packet_timestamp: packet.timestamp,
            travel_time,
            travel_distance,
            claimed_location: packet.claimed_location,
            verifier_location,
            calculated_distance,
            violations,
        }
    }

    /// Fold a trace into a heuristic outcome; the first violation names the anomaly
    pub fn outcome(trace: &LeashTrace) -> HeuristicOutcome {
        debug!(
            source = trace.source,
            destination = trace.destination,
            travel_distance = trace.travel_distance,
            calculated_distance = ?trace.calculated_distance,
            violations = trace.violations.len(),
            "packet leash check"
        );
        match trace.violations.first() {
            Some(first) => {
                let detail = trace
                    .violations
                    .iter()
                    .map(|violation| violation.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                HeuristicOutcome::abnormal(HeuristicKind::PacketLeash, first.anomaly(), detail)
            }
            None => HeuristicOutcome::normal(
                HeuristicKind::PacketLeash,
                format!(
                    "Packet from {} to {} successfully transmitted.",
                    trace.source, trace.destination
                ),
            ),
        }
    }
}

/// Classify a packet received at `now`
pub fn verify(
    packet: &Packet,
    verifier_location: Location,
    max_travel_distance: Meters,
    propagation_speed: MetersPerSecond,
    now: Seconds,
) -> Verdict {
    PacketLeash::new(max_travel_distance, propagation_speed)
        .verify_at(packet, verifier_location, now)
        .verdict()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn here() -> Location {
        Location::new(0.0, 0.0)
    }

    #[test]
    fn test_one_microsecond_at_light_speed_is_within_500m() {
        let packet = Packet::new(0, 1, 0.0, Some(here()));
        let trace = PacketLeash::with_speed_of_light(500.0).verify_at(&packet, here(), 1.0e-6);
        assert!((trace.travel_distance - 300.0).abs() < 1.0e-6);
        assert_eq!(trace.verdict(), Verdict::Normal);
    }

    #[test]
    fn test_temporal_boundary_is_inclusive() {
        let packet = Packet::new(0, 1, 1.0, None);
        let leash = PacketLeash::new(300.0, 600.0);
        let trace = leash.verify_at(&packet, here(), 1.5);
        assert_eq!(trace.travel_distance, 300.0);
        assert_eq!(trace.verdict(), Verdict::Normal);

        let leash = PacketLeash::new(300.0, 600.0001);
        let trace = leash.verify_at(&packet, here(), 1.5);
        assert_eq!(trace.verdict(), Verdict::Abnormal);
        assert_eq!(trace.violations[0].anomaly(), AnomalyKind::TemporalLeash);
    }

    #[test]
    fn test_geographic_leash_with_negligible_propagation() {
        let packet = Packet::new(0, 3, 0.0, Some(Location::new(0.0, 0.0)));
        let leash = PacketLeash::new(500.0, 1.0e-12);
        let far = Location::new(600.0, 0.0);
        let trace = leash.verify_at(&packet, far, 5.0);
        assert_eq!(trace.calculated_distance, Some(600.0));
        assert_eq!(trace.violations.len(), 1);
        assert_eq!(
            PacketLeash::outcome(&trace).detail,
            "Calculated distance exceeds the maximum travel distance of 500 meters"
        );
    }

    #[test]
    fn test_missing_location_skips_geographic_check() {
        let packet = Packet::new(0, 3, 2.0, None);
        let trace = PacketLeash::new(500.0, 1.0).verify_at(&packet, Location::new(1.0e6, 0.0), 2.0);
        assert!(trace.calculated_distance.is_none());
        assert!(trace.passed());
    }

    #[test]
    fn test_both_checks_reported() {
        let packet = Packet::new(4, 2, 0.0, Some(Location::new(0.0, 0.0)));
        let clock = ManualClock::new(1.0);
        let trace = PacketLeash::with_speed_of_light(500.0).verify(&packet, Location::new(900.0, 0.0), &clock);
        assert_eq!(trace.violations.len(), 2);

        let outcome = PacketLeash::outcome(&trace);
        assert_eq!(outcome.anomaly, Some(AnomalyKind::TemporalLeash));
        assert!(outcome.detail.starts_with("Travel distance exceeds"));
        assert!(outcome.detail.contains("Calculated distance exceeds"));
    }

    #[test]
    fn test_normal_outcome_detail() {
        let packet = Packet::new(0, 1, 3.0, Some(Location::new(1.0, 1.0)));
        let trace = PacketLeash::with_speed_of_light(500.0).verify_at(&packet, here(), 3.0);
        let outcome = PacketLeash::outcome(&trace);
        assert_eq!(outcome.verdict, Verdict::Normal);
        assert_eq!(outcome.detail, "Packet from 0 to 1 successfully transmitted.");
        assert_eq!(verify(&packet, here(), 500.0, SPEED_OF_LIGHT, 3.0), Verdict::Normal);
    }
}
