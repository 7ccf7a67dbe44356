//! Algorithm registry and the type-erased simulation facade
//!
//! The four protocols form a closed set. [`Algorithm`] names them,
//! [`build_simulator`] turns a name into a running network behind the
//! object-safe [`Simulator`] facade, and [`switch_algorithm`] rebuilds the
//! current topology under a different protocol. Drivers that know their
//! protocol at compile time can use [`NetworkModel`] directly instead.

use std::fmt;

use crate::model::NetworkModel;
use crate::routing::dfb::{self, DfbNode};
use crate::routing::dpva::DpvaNode;
use crate::routing::mdva::MdvaNode;
use crate::routing::node::{ConvergenceViolation, ProtocolNode};
use crate::routing::spta::SptaNode;
use crate::routing::{Distance, LinkFlags, NodeId};
use crate::TributaryError;

/// The routing protocols this crate can simulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Algorithm {
    /// Distributed Ford-Bellman distance vector.
    Dfb,
    /// Distance plus path vector.
    Dpva,
    /// Diffusing-computation multi-path distance vector.
    Mdva,
    /// Shortest-path topology broadcast.
    Spta,
}

impl Algorithm {
    /// Every known algorithm, in registry order.
    pub const ALL: [Algorithm; 4] = [
        Algorithm::Dfb,
        Algorithm::Dpva,
        Algorithm::Mdva,
        Algorithm::Spta,
    ];

    /// Looks an algorithm up by name, case-insensitively.
    ///
    /// # Errors
    ///
    /// - `TributaryError::UnknownAlgorithm` - If the name matches no
    ///   registered protocol
    pub fn from_name(name: &str) -> crate::Result<Algorithm> {
        Algorithm::ALL
            .into_iter()
            .find(|algorithm| algorithm.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| TributaryError::UnknownAlgorithm {
                name: name.to_string(),
            })
    }

    /// Short registry name.
    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Dfb => "DFB",
            Algorithm::Dpva => "DPVA",
            Algorithm::Mdva => "MDVA",
            Algorithm::Spta => "SPTA",
        }
    }

    /// Human-readable description, one line per entry.
    pub fn description_lines(self) -> Vec<String> {
        match self {
            Algorithm::Dfb => vec![
                "Distributed Ford-Bellman Algorithm".to_string(),
                format!(
                    "Count-to-infinity is avoided by limiting distance to {}",
                    dfb::MAX_DIST
                ),
            ],
            Algorithm::Dpva => vec![
                "Distance + Path Vector Algorithm".to_string(),
                "DFB distance + set of intermediate nodes".to_string(),
            ],
            Algorithm::Mdva => vec![
                "MDVA: A Distance-Vector Multi-path Routing Protocol".to_string(),
                "Algorithm from the paper is adapted to support one-way links".to_string(),
            ],
            Algorithm::Spta => vec![
                "SPTA: Shortest Path Topology Algorithm".to_string(),
                "from \"Broadcasting Topology Information in Computer Networks\"".to_string(),
            ],
        }
    }

    /// Legend entries explaining the link flags a diagram may show.
    ///
    /// MDVA distinguishes DAG membership from actual route use, so it gets
    /// its own legend; the other protocols mark route links with both flags
    /// at once.
    pub fn link_legend(self) -> Vec<(LinkFlags, &'static str)> {
        match self {
            Algorithm::Mdva => vec![
                (LinkFlags::NONE, "Normal link"),
                (LinkFlags::BOLD, "Link in MDVA DAG"),
                (LinkFlags::ROUTE, "Routing uses link"),
            ],
            _ => vec![
                (LinkFlags::NONE, "Normal link"),
                (LinkFlags::BOLD | LinkFlags::ROUTE, "Route link"),
            ],
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A pending message as shown to observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMessage {
    /// Sending node.
    pub from: NodeId,
    /// Receiving node.
    pub to: NodeId,
    /// Payload rendered as text.
    pub description: String,
    /// Whether this message is deliverable right now.
    pub first_over_link: bool,
}

/// A running simulation with the protocol chosen at runtime.
///
/// Mirrors [`NetworkModel`] with the node type erased, plus the read
/// accessors a rendering collaborator needs. Panicking contracts are the
/// model's own.
pub trait Simulator {
    /// Which protocol this simulation runs.
    fn algorithm(&self) -> Algorithm;

    /// Ensures a node exists.
    fn create_node(&mut self, id: &NodeId);

    /// Creates a node under the next unused numbered identity. Numbers
    /// taken by hand-created nodes are skipped, never collided with.
    fn new_node(&mut self) -> NodeId;

    /// Sets a directed link cost; infinite cost removes the link.
    fn update_link(&mut self, from: &NodeId, to: &NodeId, cost: Distance);

    /// Removes a link in both directions.
    fn remove_link(&mut self, from: &NodeId, to: &NodeId);

    /// Removes every link incident to a node.
    fn remove_node_links(&mut self, id: &NodeId);

    /// Removes a node and every link incident to it.
    fn remove_node(&mut self, id: &NodeId);

    /// Delivers the pending message at `index`.
    fn process_message(&mut self, index: usize);

    /// Whether no messages are in flight.
    fn is_quiescent(&self) -> bool;

    /// The pending messages, oldest first, rendered for display.
    fn pending_messages(&self) -> Vec<PendingMessage>;

    /// All node identities, in order.
    fn node_ids(&self) -> Vec<NodeId>;

    /// Render lines for one node, empty if the node does not exist.
    fn node_lines(&self, id: &NodeId) -> Vec<String>;

    /// One-line state summary per node, in identity order.
    fn node_summaries(&self) -> Vec<String>;

    /// Cost of the directed link `from -> to`, `INF` when absent.
    fn link_cost(&self, from: &NodeId, to: &NodeId) -> Distance;

    /// Outgoing links of a node as `(peer, cost)` pairs, in peer order.
    fn outgoing_links(&self, id: &NodeId) -> Vec<(NodeId, Distance)>;

    /// Diagram flags for the directed link `from -> to`.
    fn link_flags(&self, from: &NodeId, to: &NodeId) -> LinkFlags;

    /// Checks every node against true shortest paths; requires quiescence.
    fn verify_quiescent_state(&self) -> std::result::Result<(), ConvergenceViolation>;

    /// Forgets all nodes and drops all in-flight messages.
    fn clear(&mut self);
}

struct AlgorithmSimulator<N: ProtocolNode> {
    algorithm: Algorithm,
    model: NetworkModel<N>,
    next_node: u32,
}

impl<N: ProtocolNode> AlgorithmSimulator<N> {
    fn new(algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            model: NetworkModel::new(),
            next_node: 0,
        }
    }
}

impl<N: ProtocolNode> Simulator for AlgorithmSimulator<N> {
    fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    fn create_node(&mut self, id: &NodeId) {
        self.model.create_node(id);
    }

    fn new_node(&mut self) -> NodeId {
        loop {
            let id = NodeId::numbered(self.next_node);
            self.next_node += 1;
            if self.model.node(&id).is_none() {
                self.model.create_node(&id);
                return id;
            }
        }
    }

    fn update_link(&mut self, from: &NodeId, to: &NodeId, cost: Distance) {
        self.model.update_link(from, to, cost);
    }

    fn remove_link(&mut self, from: &NodeId, to: &NodeId) {
        self.model.remove_link(from, to);
    }

    fn remove_node_links(&mut self, id: &NodeId) {
        self.model.remove_node_links(id);
    }

    fn remove_node(&mut self, id: &NodeId) {
        self.model.remove_node(id);
    }

    fn process_message(&mut self, index: usize) {
        self.model.process_message(index);
    }

    fn is_quiescent(&self) -> bool {
        self.model.is_quiescent()
    }

    fn pending_messages(&self) -> Vec<PendingMessage> {
        self.model
            .pending()
            .iter()
            .map(|message| PendingMessage {
                from: message.from.clone(),
                to: message.to.clone(),
                description: message.payload.to_string(),
                first_over_link: message.first_over_link,
            })
            .collect()
    }

    fn node_ids(&self) -> Vec<NodeId> {
        self.model.node_ids().cloned().collect()
    }

    fn node_lines(&self, id: &NodeId) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(node) = self.model.node(id) {
            node.render_lines(&mut lines);
        }
        lines
    }

    fn node_summaries(&self) -> Vec<String> {
        self.model.nodes().map(ToString::to_string).collect()
    }

    fn link_cost(&self, from: &NodeId, to: &NodeId) -> Distance {
        self.model.link_cost(from, to)
    }

    fn outgoing_links(&self, id: &NodeId) -> Vec<(NodeId, Distance)> {
        self.model.node(id).map_or_else(Vec::new, |node| {
            node.links()
                .outgoing()
                .iter()
                .map(|(peer, cost)| (peer.clone(), *cost))
                .collect()
        })
    }

    fn link_flags(&self, from: &NodeId, to: &NodeId) -> LinkFlags {
        self.model
            .node(from)
            .map_or(LinkFlags::NONE, |node| node.link_flags(to))
    }

    fn verify_quiescent_state(&self) -> std::result::Result<(), ConvergenceViolation> {
        self.model.verify_quiescent_state()
    }

    fn clear(&mut self) {
        self.model.clear();
        self.next_node = 0;
    }
}

/// Builds a fresh, empty simulation running the given algorithm.
pub fn build_simulator(algorithm: Algorithm) -> Box<dyn Simulator> {
    match algorithm {
        Algorithm::Dfb => Box::new(AlgorithmSimulator::<DfbNode>::new(algorithm)),
        Algorithm::Dpva => Box::new(AlgorithmSimulator::<DpvaNode>::new(algorithm)),
        Algorithm::Mdva => Box::new(AlgorithmSimulator::<MdvaNode>::new(algorithm)),
        Algorithm::Spta => Box::new(AlgorithmSimulator::<SptaNode>::new(algorithm)),
    }
}

/// Rebuilds the current topology under a different algorithm.
///
/// Every node and every directed link cost carries over; in-flight
/// messages do not. The returned simulation has the replayed link updates'
/// protocol traffic pending, exactly as if the topology had been entered
/// by hand.
pub fn switch_algorithm(current: &dyn Simulator, algorithm: Algorithm) -> Box<dyn Simulator> {
    let mut next = build_simulator(algorithm);
    for id in current.node_ids() {
        next.create_node(&id);
        for (peer, cost) in current.outgoing_links(&id) {
            next.update_link(&id, &peer, cost);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> NodeId {
        NodeId::new(name)
    }

    fn drain(sim: &mut Box<dyn Simulator>) {
        while !sim.is_quiescent() {
            sim.process_message(0);
        }
    }

    #[test]
    fn test_lookup_by_name_is_case_insensitive() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::from_name(algorithm.name()).unwrap(), algorithm);
            assert_eq!(
                Algorithm::from_name(&algorithm.name().to_lowercase()).unwrap(),
                algorithm
            );
        }
        let err = Algorithm::from_name("ospf").unwrap_err();
        assert!(err.is_user_error());
        assert_eq!(err.to_string(), "Unknown algorithm: ospf");
    }

    #[test]
    fn test_every_algorithm_describes_itself() {
        for algorithm in Algorithm::ALL {
            assert!(!algorithm.description_lines().is_empty());
            assert!(!algorithm.link_legend().is_empty());
        }
        // MDVA tells DAG membership and route use apart.
        assert_eq!(Algorithm::Mdva.link_legend().len(), 3);
    }

    #[test]
    fn test_every_algorithm_converges_on_a_two_node_network() {
        for algorithm in Algorithm::ALL {
            let mut sim = build_simulator(algorithm);
            sim.update_link(&id("1"), &id("0"), Distance::new(5));
            sim.update_link(&id("0"), &id("1"), Distance::new(5));
            drain(&mut sim);
            assert!(
                sim.verify_quiescent_state().is_ok(),
                "{algorithm} failed to converge"
            );
            assert_eq!(sim.link_cost(&id("1"), &id("0")), Distance::new(5));
            assert!(
                sim.link_flags(&id("1"), &id("0")).contains(LinkFlags::ROUTE),
                "{algorithm} does not route over the only link"
            );
            assert!(!sim.node_lines(&id("1")).is_empty());
            assert_eq!(sim.node_summaries().len(), 2);
        }
    }

    #[test]
    fn test_pending_messages_render_for_display() {
        let mut sim = build_simulator(Algorithm::Dfb);
        sim.update_link(&id("1"), &id("0"), Distance::new(5));
        let pending = sim.pending_messages();
        // The destination greets its new upstream peer.
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].from, id("0"));
        assert_eq!(pending[0].to, id("1"));
        assert_eq!(pending[0].description, "UPDATE d=0");
        assert!(pending[0].first_over_link);
    }

    #[test]
    fn test_new_node_skips_taken_numbers() {
        let mut sim = build_simulator(Algorithm::Dfb);
        assert_eq!(sim.new_node(), id("0"));
        sim.create_node(&id("2"));
        assert_eq!(sim.new_node(), id("1"));
        assert_eq!(sim.new_node(), id("3"));
    }

    #[test]
    fn test_switching_algorithms_replays_the_topology() {
        let mut sim = build_simulator(Algorithm::Dfb);
        sim.update_link(&id("1"), &id("0"), Distance::new(5));
        sim.update_link(&id("2"), &id("1"), Distance::new(3));
        drain(&mut sim);

        let mut switched = switch_algorithm(sim.as_ref(), Algorithm::Spta);
        assert_eq!(switched.algorithm(), Algorithm::Spta);
        assert_eq!(switched.link_cost(&id("1"), &id("0")), Distance::new(5));
        assert_eq!(switched.link_cost(&id("2"), &id("1")), Distance::new(3));
        drain(&mut switched);
        assert!(switched.verify_quiescent_state().is_ok());
    }
}
