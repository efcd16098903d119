//! Standalone demonstrations of each heuristic.
//!
//! Runners return plain values; printing them is up to the caller.

use crate::clock::Clock;
use crate::dphi::{observe_hop, DelayPerHop, HopCheck, HopObservation, DEFAULT_HOP_DELAY_THRESHOLD};
use crate::gps::{GpsCheck, GpsHeuristic};
use crate::leash::{LeashTrace, PacketLeash, SPEED_OF_LIGHT};
use crate::model::{spawn_fleet, Node};
use crate::random::SamplingSource;
use crate::topology::{generate_random_nodes, Link, Topology, WormholeLink};
use crate::{Meters, MetersPerSecond, NodeId, SimulationError, SimulationResult, SpeedRange};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Vehicle labels of the fixed leash topology, indexed by node id
pub const VEHICLE_LABELS: [&str; 5] = ["A", "B", "C", "D", "E"];

fn label(id: NodeId) -> String {
    VEHICLE_LABELS
        .get(id as usize)
        .map(|label| label.to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Random nodes with one randomly chosen wormhole pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GpsScenario {
    pub num_nodes: usize,
    pub area_size: Meters,
    pub communication_range: Meters,
}

impl Default for GpsScenario {
    fn default() -> Self {
        Self { num_nodes: 10, area_size: 500.0, communication_range: 100.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpsScenarioReport {
    pub nodes: Vec<Node>,
    pub attack: WormholeLink,
    pub check: GpsCheck,
    pub message: String,
}

impl GpsScenario {
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<GpsScenarioReport> {
        let nodes = generate_random_nodes(self.num_nodes, self.area_size, rng)?;
        let picks = rng.choose_distinct(nodes.len(), 2)?;
        let (a, b) = (&nodes[picks[0]], &nodes[picks[1]]);

        let gps = GpsHeuristic::new(self.communication_range);
        let check = gps.check(a, b);
        let message = gps.evaluate(a, b).detail;
        info!(node_a = a.id, node_b = b.id, verdict = %check.verdict, "gps scenario");

        Ok(GpsScenarioReport {
            attack: WormholeLink::new(a.id, b.id),
            check,
            message,
            nodes,
        })
    }
}

/// Fixed five-vehicle ring with a wormhole between A and D
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LeashScenario {
    pub max_travel_distance: Meters,
    pub propagation_speed: MetersPerSecond,
}

impl Default for LeashScenario {
    fn default() -> Self {
        Self { max_travel_distance: 500.0, propagation_speed: SPEED_OF_LIGHT }
    }
}

/// One verified transmission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transmission {
    pub source: String,
    pub destination: String,
    pub trace: LeashTrace,
    pub delivered: bool,
}

impl Transmission {
    pub fn message(&self) -> String {
        if self.delivered {
            format!("Packet from {} to {} successfully transmitted.", self.source, self.destination)
        } else {
            format!(
                "Packet from {} to {} was intercepted, suspected wormhole attack.",
                self.source, self.destination
            )
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LeashScenarioReport {
    pub nodes: Vec<(String, Node)>,
    pub edges: Vec<(String, String, Link)>,
    pub transmissions: Vec<Transmission>,
}

impl LeashScenario {
    /// The five-vehicle ring with the A-D wormhole already injected
    pub fn topology() -> SimulationResult<Topology> {
        let nodes = (0..VEHICLE_LABELS.len() as NodeId)
            .map(|id| Node::new(id, id as f64, id as f64))
            .collect();
        let mut topology = Topology::with_edges(nodes, &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 4)])?;
        topology.add_wormhole(&WormholeLink::new(0, 3))?;
        Ok(topology)
    }

    /// Transmit A -> D over the wormhole, then A -> B over a normal edge
    pub fn run(&self, clock: &dyn Clock) -> SimulationResult<LeashScenarioReport> {
        let topology = Self::topology()?;
        let leash = PacketLeash::new(self.max_travel_distance, self.propagation_speed);

        let transmissions = [(0, 3), (0, 1)]
            .iter()
            .map(|&(source, destination)| -> SimulationResult<Transmission> {
                let packet = topology.create_packet(source, destination, clock.now())?;
                let trace = leash.verify(&packet, topology.location(destination)?, clock);
                let transmission = Transmission {
                    source: label(source),
                    destination: label(destination),
                    delivered: trace.passed(),
                    trace,
                };
                info!(
                    source = %transmission.source,
                    destination = %transmission.destination,
                    delivered = transmission.delivered,
                    "leash scenario transmission"
                );
                Ok(transmission)
            })
            .collect::<SimulationResult<Vec<_>>>()?;

        Ok(LeashScenarioReport {
            nodes: topology.nodes().map(|node| (label(node.id), node.clone())).collect(),
            edges: topology
                .edges()
                .into_iter()
                .map(|(a, b, link)| (label(a), label(b), link))
                .collect(),
            transmissions,
        })
    }
}

/// DPHI-checked hops followed by unchecked hops on the same fleet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DphiScenario {
    pub num_vehicles: usize,
    pub communications: usize,
    pub hop_delay_threshold: f64,
    pub vehicle_speeds: SpeedRange,
}

impl Default for DphiScenario {
    fn default() -> Self {
        Self {
            num_vehicles: 50,
            communications: 10,
            hop_delay_threshold: DEFAULT_HOP_DELAY_THRESHOLD,
            vehicle_speeds: SpeedRange::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DphiScenarioReport {
    pub with_dphi: Vec<HopCheck>,
    pub without_dphi: Vec<HopObservation>,
}

impl DphiScenarioReport {
    pub fn flagged(&self) -> usize {
        self.with_dphi.iter().filter(|check| check.verdict.is_abnormal()).count()
    }
}

impl DphiScenario {
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R) -> SimulationResult<DphiScenarioReport> {
        if self.num_vehicles < 2 {
            return Err(SimulationError::DegeneratePopulation {
                population: self.num_vehicles,
                required: 2,
            });
        }
        let mut fleet = spawn_fleet(self.num_vehicles, &self.vehicle_speeds, rng)?;
        let dphi = DelayPerHop::new(self.hop_delay_threshold);

        let with_dphi = (0..self.communications)
            .map(|_| dphi.simulate_hop(&mut fleet, rng))
            .collect::<SimulationResult<Vec<_>>>()?;
        let without_dphi = (0..self.communications)
            .map(|_| observe_hop(&mut fleet, rng))
            .collect::<SimulationResult<Vec<_>>>()?;

        let report = DphiScenarioReport { with_dphi, without_dphi };
        info!(
            communications = self.communications,
            flagged = report.flagged(),
            "dphi scenario"
        );
        Ok(report)
    }
}
