//! GPS distance heuristic.
//!
//! A wormhole tunnel spans more ground than one legitimate radio hop can cover, so a
//! link whose endpoints are further apart than the communication range is suspicious.
//! This is the cheapest and weakest check: it misses wormholes whose endpoints happen to
//! be close together.

use crate::model::Node;
use crate::verdict::{AnomalyKind, HeuristicKind, HeuristicOutcome, Verdict};
use crate::{Meters, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Classify a direct link by endpoint distance; the boundary is `Normal`
pub fn detect(node_a: &Node, node_b: &Node, communication_range: Meters) -> Verdict {
    Verdict::from_violation(node_a.distance_to(node_b) > communication_range)
}

/// Result of one GPS check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsCheck {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub distance: Meters,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GpsHeuristic {
    communication_range: Meters,
}

impl GpsHeuristic {
    pub fn new(communication_range: Meters) -> Self {
        Self { communication_range }
    }

    pub fn communication_range(&self) -> Meters {
        self.communication_range
    }

    pub fn check(&self, node_a: &Node, node_b: &Node) -> GpsCheck {
        let distance = node_a.distance_to(node_b);
        GpsCheck {
            node_a: node_a.id,
            node_b: node_b.id,
            distance,
            verdict: detect(node_a, node_b, self.communication_range),
        }
    }

    pub fn evaluate(&self, node_a: &Node, node_b: &Node) -> HeuristicOutcome {
        let check = self.check(node_a, node_b);
        debug!(
            node_a = check.node_a,
            node_b = check.node_b,
            distance = check.distance,
            verdict = %check.verdict,
            "gps check"
        );
        match check.verdict {
            Verdict::Abnormal => HeuristicOutcome::abnormal(
                HeuristicKind::GpsDistance,
                AnomalyKind::GeographicWormhole,
                format!(
                    "Wormhole attack detected between Node {} and Node {} with distance {:.2}!",
                    check.node_a, check.node_b, check.distance
                ),
            ),
            Verdict::Normal => HeuristicOutcome::normal(
                HeuristicKind::GpsDistance,
                format!(
                    "Direct communication between Node {} and Node {} is normal.",
                    check.node_a, check.node_b
                ),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_beyond_range_is_abnormal() {
        let n1 = Node::new(1, 0.0, 0.0);
        let n2 = Node::new(2, 150.0, 0.0);
        let gps = GpsHeuristic::new(100.0);

        let check = gps.check(&n1, &n2);
        assert_eq!(check.verdict, Verdict::Abnormal);
        assert_eq!(format!("{:.2}", check.distance), "150.00");

        let outcome = gps.evaluate(&n1, &n2);
        assert_eq!(outcome.anomaly, Some(AnomalyKind::GeographicWormhole));
        assert!(outcome.detail.contains("distance 150.00"));
    }

    #[test]
    fn test_boundary_is_normal() {
        let n1 = Node::new(1, 0.0, 0.0);
        let n2 = Node::new(2, 0.0, 100.0);
        assert_eq!(detect(&n1, &n2, 100.0), Verdict::Normal);
        assert_eq!(detect(&n1, &n2, 99.999), Verdict::Abnormal);
    }

    #[test]
    fn test_coincident_wormhole_endpoints_go_unnoticed() {
        let n1 = Node::new(1, 10.0, 10.0);
        let n2 = Node::new(2, 10.0, 10.0);
        let outcome = GpsHeuristic::new(100.0).evaluate(&n1, &n2);
        assert_eq!(outcome.verdict, Verdict::Normal);
        assert_eq!(outcome.detail, "Direct communication between Node 1 and Node 2 is normal.");
    }
}
