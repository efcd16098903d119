//! Structured heuristic verdicts.
//!
//! Control flow only ever looks at [`Verdict`] and [`AnomalyKind`]; the `detail` text of a
//! [`HeuristicOutcome`] is diagnostic output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary classification of a link, packet or hop
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Verdict {
    Normal,
    Abnormal,
}

impl Verdict {
    /// `Abnormal` when `violated` holds
    pub fn from_violation(violated: bool) -> Self {
        if violated {
            Verdict::Abnormal
        } else {
            Verdict::Normal
        }
    }

    pub fn is_abnormal(self) -> bool {
        self == Verdict::Abnormal
    }

    /// Logical OR of two verdicts
    pub fn or(self, other: Verdict) -> Verdict {
        Verdict::from_violation(self.is_abnormal() || other.is_abnormal())
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Normal => write!(f, "Normal"),
            Verdict::Abnormal => write!(f, "Abnormal"),
        }
    }
}

/// Which heuristic produced an outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HeuristicKind {
    GpsDistance,
    PacketLeash,
    DelayPerHop,
}

impl HeuristicKind {
    /// Constituents of the ensemble, in evaluation order
    pub const ENSEMBLE: [HeuristicKind; 3] = [
        HeuristicKind::GpsDistance,
        HeuristicKind::PacketLeash,
        HeuristicKind::DelayPerHop,
    ];

    pub fn label(self) -> &'static str {
        match self {
            HeuristicKind::GpsDistance => "GPS",
            HeuristicKind::PacketLeash => "Packet",
            HeuristicKind::DelayPerHop => "DPHI",
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Failure category behind an abnormal verdict
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AnomalyKind {
    /// Link endpoints further apart than the communication range
    GeographicWormhole,
    /// Elapsed time implies a longer path than the leash allows
    TemporalLeash,
    /// Claimed sender position too far from the verifier
    GeographicLeash,
    /// Per-hop delay above the DPHI threshold
    HopDelay,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AnomalyKind::GeographicWormhole => "geographic-wormhole",
            AnomalyKind::TemporalLeash => "temporal-leash",
            AnomalyKind::GeographicLeash => "geographic-leash",
            AnomalyKind::HopDelay => "hop-delay",
        };
        f.write_str(name)
    }
}

/// One heuristic's verdict with its diagnostic text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HeuristicOutcome {
    pub heuristic: HeuristicKind,
    pub verdict: Verdict,
    pub anomaly: Option<AnomalyKind>,
    pub detail: String,
}

impl HeuristicOutcome {
    pub fn normal(heuristic: HeuristicKind, detail: impl Into<String>) -> Self {
        Self {
            heuristic,
            verdict: Verdict::Normal,
            anomaly: None,
            detail: detail.into(),
        }
    }

    pub fn abnormal(heuristic: HeuristicKind, anomaly: AnomalyKind, detail: impl Into<String>) -> Self {
        Self {
            heuristic,
            verdict: Verdict::Abnormal,
            anomaly: Some(anomaly),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for HeuristicOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.heuristic, self.detail)
    }
}
