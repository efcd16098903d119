//! Randomized VANET topologies and wormhole injection.
//!
//! Nodes are connected in a simple chain (each node to its successor). The chain supplies
//! locations and a consistent structure for edge insertion; it is not meant to be a
//! realistic ad-hoc topology.

use crate::model::{Location, Node, Packet};
use crate::random::SamplingSource;
use crate::{Meters, NodeId, Seconds, SimulationError, SimulationResult};
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Edge attribute
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub is_wormhole: bool,
}

impl Link {
    pub const fn normal() -> Self {
        Self { is_wormhole: false }
    }

    pub const fn wormhole() -> Self {
        Self { is_wormhole: true }
    }
}

/// Unordered pair of colluding nodes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WormholeLink {
    pub source: NodeId,
    pub target: NodeId,
}

impl WormholeLink {
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self { source, target }
    }

    /// Endpoints with the smaller id first
    pub fn normalized(&self) -> (NodeId, NodeId) {
        (self.source.min(self.target), self.source.max(self.target))
    }
}

impl fmt::Display for WormholeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <-> {}", self.source, self.target)
    }
}

/// Number of distinct unordered pairs among `n` nodes
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Map a rank in `0..pair_count(n)` onto the pair `(i, j)` with `i < j`
fn unrank_pair(mut rank: usize, n: usize) -> (usize, usize) {
    for i in 0..n {
        let row = n - 1 - i;
        if rank < row {
            return (i, i + 1 + rank);
        }
        rank -= row;
    }
    (n.saturating_sub(2), n.saturating_sub(1))
}

/// Generate `num_nodes` nodes uniformly distributed over `[0, area_size]^2`
pub fn generate_random_nodes<R: Rng + ?Sized>(
    num_nodes: usize,
    area_size: Meters,
    rng: &mut R,
) -> SimulationResult<Vec<Node>> {
    if !area_size.is_finite() || area_size < 0.0 {
        return Err(SimulationError::InvalidConfig(format!(
            "area size must be finite and non-negative, got {}",
            area_size
        )));
    }
    (0..num_nodes)
        .map(|id| {
            let x = rng.uniform_real(0.0, area_size)?;
            let y = rng.uniform_real(0.0, area_size)?;
            Ok(Node::new(id as NodeId, x, y))
        })
        .collect()
}

/// Connectivity graph plus node locations
#[derive(Debug, Clone)]
pub struct Topology {
    graph: UnGraph<Node, Link>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Topology {
    /// Graph over `nodes` without edges
    pub fn isolated(nodes: Vec<Node>) -> SimulationResult<Self> {
        let mut graph = UnGraph::with_capacity(nodes.len(), nodes.len());
        let mut index = HashMap::with_capacity(nodes.len());
        for node in nodes {
            let id = node.id;
            if index.contains_key(&id) {
                return Err(SimulationError::InvalidConfig(format!(
                    "duplicate node id {} in topology",
                    id
                )));
            }
            index.insert(id, graph.add_node(node));
        }
        Ok(Self { graph, index })
    }

    /// Link every node to its successor, in the order given
    pub fn chain(nodes: Vec<Node>) -> SimulationResult<Self> {
        let ids: Vec<NodeId> = nodes.iter().map(|node| node.id).collect();
        let mut topology = Self::isolated(nodes)?;
        for pair in ids.windows(2) {
            topology.connect(pair[0], pair[1], Link::normal())?;
        }
        Ok(topology)
    }

    /// Graph over `nodes` with the given normal edges
    pub fn with_edges(nodes: Vec<Node>, edges: &[(NodeId, NodeId)]) -> SimulationResult<Self> {
        let mut topology = Self::isolated(nodes)?;
        for &(a, b) in edges {
            topology.connect(a, b, Link::normal())?;
        }
        Ok(topology)
    }

    /// Fresh random chain topology
    pub fn random_chain<R: Rng + ?Sized>(
        num_nodes: usize,
        area_size: Meters,
        rng: &mut R,
    ) -> SimulationResult<Self> {
        Self::chain(generate_random_nodes(num_nodes, area_size, rng)?)
    }

    fn index_of(&self, id: NodeId) -> SimulationResult<NodeIndex> {
        self.index.get(&id).copied().ok_or(SimulationError::UnknownNode(id))
    }

    /// Insert an edge, or overwrite the attribute of an existing one
    fn connect(&mut self, a: NodeId, b: NodeId, link: Link) -> SimulationResult<()> {
        let (ia, ib) = (self.index_of(a)?, self.index_of(b)?);
        self.graph.update_edge(ia, ib, link);
        Ok(())
    }

    /// Tag the pair as a wormhole edge
    pub fn add_wormhole(&mut self, link: &WormholeLink) -> SimulationResult<()> {
        if link.source == link.target {
            return Err(SimulationError::InvalidConfig(format!(
                "wormhole endpoints must differ, got {} twice",
                link.source
            )));
        }
        self.connect(link.source, link.target, Link::wormhole())
    }

    pub fn node(&self, id: NodeId) -> SimulationResult<&Node> {
        Ok(&self.graph[self.index_of(id)?])
    }

    pub fn location(&self, id: NodeId) -> SimulationResult<Location> {
        Ok(self.node(id)?.location())
    }

    /// Nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All edges as `(a, b, attribute)`
    pub fn edges(&self) -> Vec<(NodeId, NodeId, Link)> {
        self.graph
            .edge_references()
            .map(|edge| {
                (
                    self.graph[edge.source()].id,
                    self.graph[edge.target()].id,
                    *edge.weight(),
                )
            })
            .collect()
    }

    pub fn wormhole_links(&self) -> Vec<WormholeLink> {
        self.edges()
            .into_iter()
            .filter(|(_, _, link)| link.is_wormhole)
            .map(|(a, b, _)| WormholeLink::new(a, b))
            .collect()
    }

    pub fn link(&self, a: NodeId, b: NodeId) -> SimulationResult<Option<Link>> {
        let (ia, ib) = (self.index_of(a)?, self.index_of(b)?);
        Ok(self.graph.find_edge(ia, ib).map(|edge| self.graph[edge]))
    }

    pub fn neighbors(&self, id: NodeId) -> SimulationResult<Vec<NodeId>> {
        let idx = self.index_of(id)?;
        let mut ids: Vec<NodeId> = self.graph.neighbors(idx).map(|n| self.graph[n].id).collect();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Packet claiming the source's recorded location
    pub fn create_packet(
        &self,
        source: NodeId,
        destination: NodeId,
        timestamp: Seconds,
    ) -> SimulationResult<Packet> {
        self.index_of(destination)?;
        Ok(Packet::new(source, destination, timestamp, Some(self.location(source)?)))
    }

    /// Sample `amount` distinct unordered node pairs without replacement
    pub fn sample_attacks<R: Rng + ?Sized>(
        &self,
        amount: usize,
        rng: &mut R,
    ) -> SimulationResult<Vec<WormholeLink>> {
        let ids: Vec<NodeId> = self.nodes().map(|node| node.id).collect();
        let available = pair_count(ids.len());
        if amount > available {
            return Err(SimulationError::AttackSampling { requested: amount, available });
        }
        Ok(rng
            .choose_distinct(available, amount)?
            .into_iter()
            .map(|rank| {
                let (i, j) = unrank_pair(rank, ids.len());
                WormholeLink::new(ids[i], ids[j])
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::seeded;
    use std::collections::HashSet;

    #[test]
    fn test_unrank_covers_all_pairs() {
        for n in 2..8 {
            let pairs: HashSet<(usize, usize)> =
                (0..pair_count(n)).map(|rank| unrank_pair(rank, n)).collect();
            assert_eq!(pairs.len(), pair_count(n));
            assert!(pairs.iter().all(|&(i, j)| i < j && j < n));
        }
    }

    #[test]
    fn test_generate_random_nodes_within_area() {
        let mut rng = seeded(11);
        let nodes = generate_random_nodes(30, 500.0, &mut rng).unwrap();
        assert_eq!(nodes.len(), 30);
        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(node.id, i as NodeId);
            assert!((0.0..=500.0).contains(&node.x));
            assert!((0.0..=500.0).contains(&node.y));
        }
        assert!(generate_random_nodes(3, -1.0, &mut rng).is_err());
    }

    #[test]
    fn test_coordinates_come_from_sampling_source() {
        let nodes = generate_random_nodes(3, 250.0, &mut seeded(17)).unwrap();
        let mut rng = seeded(17);
        for node in &nodes {
            assert_eq!(node.x, rng.uniform_real(0.0, 250.0).unwrap());
            assert_eq!(node.y, rng.uniform_real(0.0, 250.0).unwrap());
        }
    }

    #[test]
    fn test_chain_topology() {
        let mut rng = seeded(5);
        let topology = Topology::random_chain(6, 500.0, &mut rng).unwrap();
        assert_eq!(topology.node_count(), 6);
        assert_eq!(topology.edge_count(), 5);
        assert_eq!(topology.neighbors(0).unwrap(), vec![1]);
        assert_eq!(topology.neighbors(3).unwrap(), vec![2, 4]);
        assert!(topology.wormhole_links().is_empty());
    }

    #[test]
    fn test_add_wormhole_tags_new_and_existing_edges() {
        let nodes = (0..4).map(|i| Node::new(i, i as f64, 0.0)).collect();
        let mut topology = Topology::chain(nodes).unwrap();

        topology.add_wormhole(&WormholeLink::new(0, 3)).unwrap();
        assert_eq!(topology.edge_count(), 4);
        assert_eq!(topology.link(3, 0).unwrap(), Some(Link::wormhole()));

        topology.add_wormhole(&WormholeLink::new(1, 2)).unwrap();
        assert_eq!(topology.edge_count(), 4);
        assert_eq!(topology.link(1, 2).unwrap(), Some(Link::wormhole()));
        assert_eq!(topology.wormhole_links().len(), 2);

        assert!(topology.add_wormhole(&WormholeLink::new(2, 2)).is_err());
        assert_eq!(
            topology.add_wormhole(&WormholeLink::new(0, 9)),
            Err(SimulationError::UnknownNode(9))
        );
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let nodes = vec![Node::new(1, 0.0, 0.0), Node::new(1, 5.0, 5.0)];
        assert!(Topology::isolated(nodes).is_err());
    }

    #[test]
    fn test_create_packet_claims_source_location() {
        let nodes = vec![Node::new(0, 1.0, 2.0), Node::new(1, 3.0, 4.0)];
        let topology = Topology::chain(nodes).unwrap();
        let packet = topology.create_packet(0, 1, 12.5).unwrap();
        assert_eq!(packet.claimed_location, Some(Location::new(1.0, 2.0)));
        assert_eq!(packet.timestamp, 12.5);
        assert!(topology.create_packet(0, 7, 0.0).is_err());
    }

    #[test]
    fn test_sample_attacks_distinct_unordered_pairs() {
        let mut rng = seeded(21);
        let topology = Topology::random_chain(5, 500.0, &mut rng).unwrap();

        let attacks = topology.sample_attacks(10, &mut rng).unwrap();
        let unique: HashSet<_> = attacks.iter().map(|a| a.normalized()).collect();
        assert_eq!(unique.len(), 10);
        assert!(attacks.iter().all(|a| a.source != a.target));

        assert_eq!(
            topology.sample_attacks(11, &mut rng),
            Err(SimulationError::AttackSampling { requested: 11, available: 10 })
        );
    }
}
