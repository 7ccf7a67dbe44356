//! SPTA: shortest-path topology broadcast
//!
//! From "Broadcasting Topology Information in Computer Networks": a link
//! state protocol without sequence numbers or timestamps. Each node keeps
//! the full topology as last told by every outgoing neighbor, trusts, for
//! each remote node, the view of whichever neighbor sits closest to it, and
//! floods only the resulting edge deltas upstream. A peer never hears about
//! edges it originates itself (split horizon by edge origin).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::distance::{self, Distance};
use super::link::LinkTable;
use super::message::Message;
use super::node::{ConvergenceViolation, ProtocolNode};
use super::{LinkFlags, NodeId};

/// A directed edge set keyed by origin: `topology[from][to]` is the cost of
/// the link `from -> to`. Inner maps hold finite costs only.
pub type Topology = BTreeMap<NodeId, BTreeMap<NodeId, Distance>>;

/// Cost of the edge `from -> to` in a topology table, `INF` when absent.
pub fn topology_cost(topology: &Topology, from: &NodeId, to: &NodeId) -> Distance {
    match topology.get(from) {
        Some(edges) => distance::lookup(edges, to),
        None => Distance::INF,
    }
}

/// Records the edge `from -> to` in a topology table. `INF` removes the
/// edge, and origins left without edges are pruned entirely.
pub fn record_edge(topology: &mut Topology, from: &NodeId, to: &NodeId, cost: Distance) {
    if cost.is_finite() {
        topology
            .entry(from.clone())
            .or_default()
            .insert(to.clone(), cost);
    } else if let Some(edges) = topology.get_mut(from) {
        edges.remove(to);
        if edges.is_empty() {
            topology.remove(from);
        }
    }
}

/// One edge change carried by an SPTA update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeUpdate {
    /// Origin of the edge.
    pub from: NodeId,
    /// Target of the edge.
    pub to: NodeId,
    /// New cost; `INF` means the edge is gone.
    pub cost: Distance,
}

impl fmt::Display for EdgeUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} d={}", self.from, self.to, self.cost)
    }
}

/// SPTA message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SptaPayload {
    /// Full topology copy, sent once when a link comes up.
    Snapshot {
        /// The sender's merged topology table.
        topology: Topology,
    },
    /// Edge deltas against what the link previously carried.
    Update {
        /// The changed edges.
        edges: Vec<EdgeUpdate>,
    },
}

impl fmt::Display for SptaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SptaPayload::Snapshot { topology } => {
                write!(f, "SNAPSHOT {}", format_topology(topology))
            }
            SptaPayload::Update { edges } => {
                let entries: Vec<String> = edges.iter().map(ToString::to_string).collect();
                write!(f, "UPDATE [{}]", entries.join(", "))
            }
        }
    }
}

/// One node running the shortest-path topology algorithm.
#[derive(Debug, Clone)]
pub struct SptaNode {
    id: NodeId,
    links: LinkTable,
    /// Topology as last told by each outgoing neighbor; the own entry
    /// mirrors the live link table.
    peer_views: BTreeMap<NodeId, Topology>,
    /// Merged working topology.
    topology: Topology,
    /// Topology as of the last advertisement, for delta computation.
    advertised_topology: Topology,
    /// Settled distance to the destination.
    distance: Distance,
    /// Outgoing peers on a shortest path.
    successors: BTreeSet<NodeId>,
}

impl SptaNode {
    /// Rebuilds the merged topology, the distance, and the successor set,
    /// and returns the edge deltas each incoming peer needs to hear.
    fn recompute(&mut self) -> Vec<Message<SptaPayload>> {
        self.peer_views.insert(
            self.id.clone(),
            BTreeMap::from([(self.id.clone(), self.links.outgoing().clone())]),
        );
        self.topology.clear();

        // Merge pass: closest-first expansion from here. Each discovered
        // node contributes the edge map of its governing neighbor's view:
        // direct neighbors govern themselves, farther nodes inherit the
        // governing neighbor of whoever discovered them.
        let mut queue: BTreeSet<NodeId> = BTreeSet::new();
        let mut dist: BTreeMap<NodeId, Distance> = BTreeMap::new();
        let mut governing: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        queue.insert(self.id.clone());
        dist.insert(self.id.clone(), Distance::ZERO);
        governing.insert(self.id.clone(), self.id.clone());
        while let Some(current) = distance::pop_closest(&mut queue, &dist) {
            let base = distance::lookup(&dist, &current);
            let Some(source) = governing.get(&current).cloned() else {
                continue;
            };
            let Some(view) = self.peer_views.get(&source) else {
                continue;
            };
            let Some(edges) = view.get(&current) else {
                continue;
            };
            for (next, cost) in edges {
                let reached = base.saturating_add(*cost);
                if reached < distance::lookup(&dist, next) {
                    queue.insert(next.clone());
                    dist.insert(next.clone(), reached);
                    let governs = if current == self.id {
                        next.clone()
                    } else {
                        source.clone()
                    };
                    governing.insert(next.clone(), governs);
                }
                record_edge(&mut self.topology, &current, next, *cost);
            }
        }

        // Route pass: the same expansion from the destination over the
        // merged table, relaxing edges in reverse.
        dist.clear();
        dist.insert(NodeId::dest(), Distance::ZERO);
        queue.insert(NodeId::dest());
        while let Some(current) = distance::pop_closest(&mut queue, &dist) {
            let base = distance::lookup(&dist, &current);
            for (origin, edges) in &self.topology {
                let cost = distance::lookup(edges, &current);
                if cost.is_finite() {
                    let reached = base.saturating_add(cost);
                    if reached < distance::lookup(&dist, origin) {
                        queue.insert(origin.clone());
                        distance::record(&mut dist, origin, reached);
                    }
                }
            }
        }
        self.distance = distance::lookup(&dist, &self.id);
        self.successors.clear();
        if self.distance.is_finite() {
            for (peer, cost) in self.links.outgoing() {
                if let Some(remainder) = self.distance.checked_sub(*cost) {
                    if distance::lookup(&dist, peer) == remainder {
                        self.successors.insert(peer.clone());
                    }
                }
            }
        }

        // Delta pass: what changed against the last advertisement.
        let mut changes: Vec<EdgeUpdate> = Vec::new();
        for (from, edges) in &self.advertised_topology {
            for (to, old) in edges {
                let new = topology_cost(&self.topology, from, to);
                if new != *old {
                    changes.push(EdgeUpdate {
                        from: from.clone(),
                        to: to.clone(),
                        cost: new,
                    });
                }
            }
        }
        for (from, edges) in &self.topology {
            for (to, new) in edges {
                if topology_cost(&self.advertised_topology, from, to).is_infinite() {
                    changes.push(EdgeUpdate {
                        from: from.clone(),
                        to: to.clone(),
                        cost: *new,
                    });
                }
            }
        }
        self.advertised_topology = self.topology.clone();

        let mut send = Vec::new();
        for peer in self.links.incoming() {
            let edges: Vec<EdgeUpdate> = changes
                .iter()
                .filter(|edge| edge.from != *peer)
                .cloned()
                .collect();
            if !edges.is_empty() {
                send.push(Message::new(
                    self.id.clone(),
                    peer.clone(),
                    SptaPayload::Update { edges },
                ));
            }
        }
        send
    }
}

fn format_topology(topology: &Topology) -> String {
    let entries: Vec<String> = topology
        .iter()
        .map(|(from, edges)| format!("{from}: {}", distance::format_distances(edges)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

impl ProtocolNode for SptaNode {
    type Payload = SptaPayload;

    fn new(id: NodeId) -> Self {
        let distance = if id.is_dest() {
            Distance::ZERO
        } else {
            Distance::INF
        };
        Self {
            id,
            links: LinkTable::default(),
            peer_views: BTreeMap::new(),
            topology: Topology::new(),
            advertised_topology: Topology::new(),
            distance,
            successors: BTreeSet::new(),
        }
    }

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn links(&self) -> &LinkTable {
        &self.links
    }

    /// # Panics
    ///
    /// When an update arrives on a link that never delivered a snapshot;
    /// per-link FIFO and removal purging make that a contract breach.
    fn process(&mut self, message: Message<SptaPayload>) -> Vec<Message<SptaPayload>> {
        debug_assert_eq!(message.to, self.id);
        match message.payload {
            SptaPayload::Snapshot { topology } => {
                self.peer_views.insert(message.from.clone(), topology);
            }
            SptaPayload::Update { edges } => {
                let view = self
                    .peer_views
                    .get_mut(&message.from)
                    .expect("topology update arrived before any snapshot over the link");
                for edge in &edges {
                    record_edge(view, &edge.from, &edge.to, edge.cost);
                }
            }
        }
        self.recompute()
    }

    fn update_outgoing_link(&mut self, peer: &NodeId, cost: Distance) -> Vec<Message<SptaPayload>> {
        self.links.set_outgoing(peer, cost);
        self.recompute()
    }

    fn update_incoming_link(&mut self, peer: &NodeId) -> Vec<Message<SptaPayload>> {
        if self.links.add_incoming(peer) {
            return vec![Message::new(
                self.id.clone(),
                peer.clone(),
                SptaPayload::Snapshot {
                    topology: self.topology.clone(),
                },
            )];
        }
        Vec::new()
    }

    fn remove_link(&mut self, peer: &NodeId) -> Vec<Message<SptaPayload>> {
        self.links.remove(peer);
        self.peer_views.remove(peer);
        self.recompute()
    }

    fn link_flags(&self, peer: &NodeId) -> LinkFlags {
        if self.successors.contains(peer) {
            LinkFlags::ROUTE | LinkFlags::BOLD
        } else {
            LinkFlags::NONE
        }
    }

    fn render_lines(&self, lines: &mut Vec<String>) {
        lines.push(self.id.to_string());
        lines.push(format!("d={}", self.distance));
        lines.push(format!("t={}", format_topology(&self.topology)));
    }

    fn verify_quiescent_distance(&self, expected: Distance) -> Result<(), ConvergenceViolation> {
        if self.distance != expected {
            return Err(ConvergenceViolation::DistanceMismatch {
                node: self.id.clone(),
                reported: self.distance,
                expected,
            });
        }
        Ok(())
    }
}

impl fmt::Display for SptaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: d={} t={}",
            self.id,
            self.distance,
            format_topology(&self.topology)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(from: &str, to: &str, cost: Distance) -> EdgeUpdate {
        EdgeUpdate {
            from: NodeId::new(from),
            to: NodeId::new(to),
            cost,
        }
    }

    #[test]
    fn test_direct_link_to_destination() {
        let mut node = SptaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::dest(), Distance::new(10));
        assert!(node.verify_quiescent_distance(Distance::new(10)).is_ok());
        assert_eq!(
            node.link_flags(&NodeId::dest()),
            LinkFlags::BOLD | LinkFlags::ROUTE
        );
    }

    #[test]
    fn test_new_incoming_link_gets_a_snapshot() {
        let mut node = SptaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::dest(), Distance::new(10));

        let out = node.update_incoming_link(&NodeId::new("2"));
        assert_eq!(out.len(), 1);
        match &out[0].payload {
            SptaPayload::Snapshot { topology } => {
                assert_eq!(
                    topology_cost(topology, &NodeId::new("1"), &NodeId::dest()),
                    Distance::new(10)
                );
            }
            other => panic!("expected snapshot, got {other}"),
        }
        // A second registration is not news.
        assert!(node.update_incoming_link(&NodeId::new("2")).is_empty());
    }

    #[test]
    fn test_merges_neighbor_view_and_routes_through_it() {
        let mut node = SptaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(1));
        node.update_incoming_link(&NodeId::new("2"));

        let mut reported = Topology::new();
        record_edge(&mut reported, &NodeId::new("2"), &NodeId::dest(), Distance::new(4));
        let out = node.process(Message::new(
            NodeId::new("2"),
            NodeId::new("1"),
            SptaPayload::Snapshot { topology: reported },
        ));

        assert!(node.verify_quiescent_distance(Distance::new(5)).is_ok());
        assert!(node.link_flags(&NodeId::new("2")).contains(LinkFlags::ROUTE));

        // Split horizon: the only delta is the edge 2->0, which originates
        // at the sole listener, so nothing goes out.
        assert!(out.is_empty());

        // A change to our own edge does reach the peer.
        let out = node.update_outgoing_link(&NodeId::new("2"), Distance::new(2));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, NodeId::new("2"));
        assert_eq!(
            out[0].payload,
            SptaPayload::Update {
                edges: vec![edge("1", "2", Distance::new(2))],
            }
        );
        assert!(node.verify_quiescent_distance(Distance::new(6)).is_ok());
    }

    #[test]
    fn test_delta_reports_removed_edges_as_infinite() {
        let mut node = SptaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::dest(), Distance::new(10));
        node.update_incoming_link(&NodeId::new("2"));

        let out = node.update_outgoing_link(&NodeId::dest(), Distance::new(7));
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].payload,
            SptaPayload::Update {
                edges: vec![edge("1", "0", Distance::new(7))],
            }
        );

        let out = node.remove_link(&NodeId::dest());
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].payload,
            SptaPayload::Update {
                edges: vec![edge("1", "0", Distance::INF)],
            }
        );
        assert!(node.verify_quiescent_distance(Distance::INF).is_ok());
    }

    #[test]
    fn test_closer_neighbor_view_wins() {
        // Node 1 reaches 3 directly (cost 1) and via 2 (cost 5 total).
        // Node 3's own account of its links must win over 2's stale one.
        let mut node = SptaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("3"), Distance::new(1));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(2));

        let mut from_three = Topology::new();
        record_edge(&mut from_three, &NodeId::new("3"), &NodeId::dest(), Distance::new(1));
        node.process(Message::new(
            NodeId::new("3"),
            NodeId::new("1"),
            SptaPayload::Snapshot { topology: from_three },
        ));

        let mut from_two = Topology::new();
        // 2 still believes 3 reaches the destination at cost 9.
        record_edge(&mut from_two, &NodeId::new("2"), &NodeId::new("3"), Distance::new(3));
        record_edge(&mut from_two, &NodeId::new("3"), &NodeId::dest(), Distance::new(9));
        node.process(Message::new(
            NodeId::new("2"),
            NodeId::new("1"),
            SptaPayload::Snapshot { topology: from_two },
        ));

        // 3 is closer than 2, so its view of edge 3->0 is authoritative.
        assert!(node.verify_quiescent_distance(Distance::new(2)).is_ok());
    }

    #[test]
    #[should_panic(expected = "before any snapshot")]
    fn test_update_before_snapshot_panics() {
        let mut node = SptaNode::new(NodeId::new("1"));
        node.process(Message::new(
            NodeId::new("2"),
            NodeId::new("1"),
            SptaPayload::Update {
                edges: vec![edge("2", "0", Distance::new(1))],
            },
        ));
    }
}
