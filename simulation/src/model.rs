//! Spatial and kinematic entities shared by the heuristics.
//!
//! Two coordinate systems coexist here. [`Node`] lives on the plane used by the topology,
//! GPS and packet-leash checks. [`Vehicle`] moves along a single road axis and is consumed
//! only by the delay-per-hop indicator; its position has no relation to any node's `(x, y)`.

use crate::random::SamplingSource;
use crate::{Meters, NodeId, Seconds, SimulationError, SimulationResult, SpeedRange, VehicleId};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Point on the deployment plane
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub x: Meters,
    pub y: Meters,
}

impl Location {
    pub const fn new(x: Meters, y: Meters) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another location
    pub fn distance_to(&self, other: &Location) -> Meters {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f64, f64)> for Location {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Network node; identity is the id, so two nodes may share coordinates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub x: Meters,
    pub y: Meters,
}

impl Node {
    pub fn new(id: NodeId, x: Meters, y: Meters) -> Self {
        Self { id, x, y }
    }

    pub fn location(&self) -> Location {
        Location::new(self.x, self.y)
    }

    pub fn distance_to(&self, other: &Node) -> Meters {
        self.location().distance_to(&other.location())
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}, x={:.2}, y={:.2})", self.id, self.x, self.y)
    }
}

/// Vehicle on a one-dimensional road.
///
/// Speed is fixed at creation. Position starts at zero and only grows, one `speed` per
/// [`advance`](Vehicle::advance).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vehicle {
    id: VehicleId,
    position: Meters,
    speed: f64,
}

impl Vehicle {
    /// Create a vehicle at the road origin.
    ///
    /// A vehicle with non-positive `speed` cannot send: [`observe_hop`](crate::dphi::observe_hop)
    /// rejects it before moving anything.
    pub fn new(id: VehicleId, speed: f64) -> Self {
        Self { id, position: 0.0, speed }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn position(&self) -> Meters {
        self.position
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Move one discrete tick
    pub fn advance(&mut self) {
        self.position += self.speed;
    }
}

/// Spawn `size` vehicles with speeds drawn uniformly from `speeds`
pub fn spawn_fleet<R: Rng + ?Sized>(
    size: usize,
    speeds: &SpeedRange,
    rng: &mut R,
) -> SimulationResult<Vec<Vehicle>> {
    speeds.validate()?;
    (0..size)
        .map(|id| Ok(Vehicle::new(id as VehicleId, rng.uniform_real(speeds.min, speeds.max)?)))
        .collect()
}

/// Packet as seen by a verifier: claimed origin, send time and claimed position
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    pub source: NodeId,
    pub destination: NodeId,
    pub timestamp: Seconds,
    pub claimed_location: Option<Location>,
}

impl Packet {
    pub fn new(
        source: NodeId,
        destination: NodeId,
        timestamp: Seconds,
        claimed_location: Option<Location>,
    ) -> Self {
        Self { source, destination, timestamp, claimed_location }
    }

    /// Reject packets whose timestamp is not a finite instant
    pub fn validate(&self) -> SimulationResult<()> {
        if !self.timestamp.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "packet {} -> {} carries a non-finite timestamp",
                self.source, self.destination
            )));
        }
        Ok(())
    }
}
