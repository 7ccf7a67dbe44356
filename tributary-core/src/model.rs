//! The simulated network: nodes, links, and in-flight messages
//!
//! A single-threaded event model. Topology mutations and message deliveries
//! are explicit calls; nothing happens between them. Messages sit in one
//! pending queue in send order, and each directed link is FIFO: only the
//! oldest pending message over a link carries the first-over-link marker,
//! and only a marked message may be delivered.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::routing::distance::{self, Distance};
use crate::routing::message::Message;
use crate::routing::node::{ConvergenceViolation, ProtocolNode};
use crate::routing::NodeId;

/// A network of protocol nodes exchanging messages over directed links.
///
/// Nodes are created lazily the first time an operation references them.
/// All maps are ordered, so iteration and rendering are deterministic.
#[derive(Debug)]
pub struct NetworkModel<N: ProtocolNode> {
    nodes: BTreeMap<NodeId, N>,
    pending: Vec<Message<N::Payload>>,
}

impl<N: ProtocolNode> NetworkModel<N> {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            pending: Vec::new(),
        }
    }

    fn node_entry(&mut self, id: &NodeId) -> &mut N {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| N::new(id.clone()))
    }

    /// Ensures a node exists, creating it with initial state if needed.
    pub fn create_node(&mut self, id: &NodeId) {
        self.node_entry(id);
    }

    /// All node identities, in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    /// All nodes, in identity order.
    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    /// Looks up a node without creating it.
    pub fn node(&self, id: &NodeId) -> Option<&N> {
        self.nodes.get(id)
    }

    /// Cost of the directed link `from -> to`, `INF` when absent.
    pub fn link_cost(&self, from: &NodeId, to: &NodeId) -> Distance {
        self.nodes
            .get(from)
            .map_or(Distance::INF, |node| node.links().outgoing_cost(to))
    }

    /// The in-flight messages, oldest first.
    pub fn pending(&self) -> &[Message<N::Payload>] {
        &self.pending
    }

    /// Whether no messages are in flight.
    pub fn is_quiescent(&self) -> bool {
        self.pending.is_empty()
    }

    /// Sets the cost of the directed link `from -> to`, telling `from`
    /// about the new outgoing cost and `to` about the incoming peer. An
    /// infinite cost removes the link instead.
    ///
    /// # Panics
    ///
    /// When `cost` is zero; zero means removal only at the command surface.
    pub fn update_link(&mut self, from: &NodeId, to: &NodeId, cost: Distance) {
        assert!(cost != Distance::ZERO, "link cost must be positive");
        if cost.is_infinite() {
            self.remove_link(from, to);
            return;
        }
        debug!("Updating link {from}->{to} d={cost}");
        let out = self.node_entry(from).update_outgoing_link(to, cost);
        self.send(out);
        let out = self.node_entry(to).update_incoming_link(from);
        self.send(out);
    }

    /// Removes the link between `from` and `to` in both directions at once
    /// (the protocols cannot cope with half-removed links). Both endpoints
    /// emit their reactions first; then every pending message over either
    /// direction is dropped, and the first-over-link markers for both
    /// directions are recomputed.
    pub fn remove_link(&mut self, from: &NodeId, to: &NodeId) {
        debug!("Removing link {from}<->{to}");
        let out = self.node_entry(from).remove_link(to);
        self.send(out);
        let out = self.node_entry(to).remove_link(from);
        self.send(out);
        self.pending
            .retain(|message| !message.is_over_link(from, to) && !message.is_over_link(to, from));
        self.recompute_first_over_link(from, to);
        self.recompute_first_over_link(to, from);
    }

    fn recompute_first_over_link(&mut self, from: &NodeId, to: &NodeId) {
        let mut first = true;
        for message in &mut self.pending {
            if message.is_over_link(from, to) {
                message.first_over_link = first;
                first = false;
            }
        }
    }

    /// Removes every link incident to `id`, leaving the node isolated.
    pub fn remove_node_links(&mut self, id: &NodeId) {
        let peers: BTreeSet<NodeId> = self.node_entry(id).links().incident();
        for peer in &peers {
            self.remove_link(id, peer);
        }
    }

    /// Removes a node: first every incident link, then the node itself.
    pub fn remove_node(&mut self, id: &NodeId) {
        self.remove_node_links(id);
        self.nodes.remove(id);
    }

    /// Delivers the pending message at `index` to its destination node and
    /// queues whatever the node sends in response. Before delivery, the
    /// next pending message over the same link inherits the first-over-link
    /// marker.
    ///
    /// # Panics
    ///
    /// When `index` is out of bounds or the message there is not first over
    /// its link.
    pub fn process_message(&mut self, index: usize) {
        let message = self.pending.remove(index);
        assert!(
            message.first_over_link,
            "cannot process a message that is not first over its link: {message}"
        );
        for queued in &mut self.pending {
            if message.same_link(queued) {
                queued.first_over_link = true;
                break;
            }
        }
        debug!("Processing message {message}");
        let to = message.to.clone();
        let out = self.node_entry(&to).process(message);
        self.send(out);
    }

    fn send(&mut self, outgoing: Vec<Message<N::Payload>>) {
        for mut message in outgoing {
            message.first_over_link = !self
                .pending
                .iter()
                .any(|queued| message.same_link(queued));
            debug!("Sending message {message}");
            self.pending.push(message);
        }
    }

    /// Forgets all nodes and drops all in-flight messages.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.pending.clear();
    }

    /// Checks every node's settled distance against true shortest paths.
    ///
    /// Runs a closest-first expansion from the destination over the actual
    /// link costs (relaxing incoming links with the owning peer's outgoing
    /// cost), then asks each node, in identity order, to verify itself
    /// against the true distance. The first violation is returned.
    ///
    /// # Panics
    ///
    /// When messages are still in flight; distances only have to agree
    /// once the network is quiescent.
    pub fn verify_quiescent_state(&self) -> Result<(), ConvergenceViolation> {
        assert!(
            self.pending.is_empty(),
            "verification requires a quiescent network"
        );
        let mut dist: BTreeMap<NodeId, Distance> = BTreeMap::new();
        let mut queue: BTreeSet<NodeId> = BTreeSet::new();
        dist.insert(NodeId::dest(), Distance::ZERO);
        queue.insert(NodeId::dest());
        while let Some(current) = distance::pop_closest(&mut queue, &dist) {
            let base = distance::lookup(&dist, &current);
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for peer in node.links().incoming() {
                let Some(owner) = self.nodes.get(peer) else {
                    continue;
                };
                let reached = base.saturating_add(owner.links().outgoing_cost(&current));
                if reached < distance::lookup(&dist, peer) {
                    dist.insert(peer.clone(), reached);
                    queue.insert(peer.clone());
                }
            }
        }
        for node in self.nodes.values() {
            node.verify_quiescent_distance(distance::lookup(&dist, node.id()))?;
        }
        Ok(())
    }
}

impl<N: ProtocolNode> Default for NetworkModel<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::dfb::DfbNode;

    fn id(name: &str) -> NodeId {
        NodeId::new(name)
    }

    fn drain(model: &mut NetworkModel<DfbNode>) {
        while !model.is_quiescent() {
            model.process_message(0);
        }
    }

    #[test]
    fn test_nodes_appear_lazily_and_converge() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        assert_eq!(model.node_ids().count(), 2);
        // The destination greets its new upstream peer.
        assert_eq!(model.pending().len(), 1);

        drain(&mut model);
        assert!(model.verify_quiescent_state().is_ok());
        assert_eq!(model.link_cost(&id("1"), &id("0")), Distance::new(5));
        assert_eq!(model.link_cost(&id("0"), &id("1")), Distance::INF);
    }

    #[test]
    fn test_only_the_oldest_message_per_link_is_first() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        model.update_link(&id("2"), &id("1"), Distance::new(1));
        drain(&mut model);

        // Two successive cost changes make node 1 broadcast twice to the
        // same peer before anything is delivered.
        model.update_link(&id("1"), &id("0"), Distance::new(2));
        model.update_link(&id("1"), &id("0"), Distance::new(3));
        let pending = model.pending();
        assert_eq!(pending.len(), 2);
        assert!(pending[0].first_over_link);
        assert!(!pending[1].first_over_link);

        // Delivering the first promotes the second.
        model.process_message(0);
        assert!(model.pending()[0].first_over_link);
        drain(&mut model);
        assert!(model.verify_quiescent_state().is_ok());
    }

    #[test]
    #[should_panic(expected = "not first over its link")]
    fn test_delivering_a_non_first_message_panics() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        model.update_link(&id("2"), &id("1"), Distance::new(1));
        drain(&mut model);

        model.update_link(&id("1"), &id("0"), Distance::new(2));
        model.update_link(&id("1"), &id("0"), Distance::new(3));
        model.process_message(1);
    }

    #[test]
    fn test_removing_a_link_drops_in_flight_traffic() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        // The destination's greeting is still in flight.
        assert_eq!(model.pending().len(), 1);

        model.remove_link(&id("0"), &id("1"));
        assert!(model.is_quiescent());
        assert_eq!(model.link_cost(&id("1"), &id("0")), Distance::INF);
        assert!(model.verify_quiescent_state().is_ok());
    }

    #[test]
    fn test_removing_a_node_removes_its_links_first() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(1));
        model.update_link(&id("2"), &id("1"), Distance::new(1));
        model.update_link(&id("2"), &id("0"), Distance::new(9));
        drain(&mut model);

        model.remove_node(&id("1"));
        assert!(model.node(&id("1")).is_none());
        assert_eq!(model.link_cost(&id("2"), &id("1")), Distance::INF);
        drain(&mut model);
        // Node 2 falls back to its direct link.
        assert!(model.verify_quiescent_state().is_ok());
        let two = model.node(&id("2")).unwrap();
        assert!(two.verify_quiescent_distance(Distance::new(9)).is_ok());
    }

    #[test]
    fn test_update_link_with_infinite_cost_removes() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        drain(&mut model);
        model.update_link(&id("1"), &id("0"), Distance::INF);
        drain(&mut model);
        assert_eq!(model.link_cost(&id("1"), &id("0")), Distance::INF);
        assert!(model.verify_quiescent_state().is_ok());
    }

    #[test]
    #[should_panic(expected = "quiescent")]
    fn test_verification_refuses_in_flight_messages() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        let _ = model.verify_quiescent_state();
    }

    #[test]
    fn test_verification_reports_the_truncation_gap() {
        // A single link longer than the broadcast ceiling: the node says
        // INF, true shortest paths say 2500.
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(2500));
        drain(&mut model);

        let violation = model.verify_quiescent_state().unwrap_err();
        match violation {
            ConvergenceViolation::DistanceMismatch {
                node,
                reported,
                expected,
            } => {
                assert_eq!(node, id("1"));
                assert_eq!(reported, Distance::INF);
                assert_eq!(expected, Distance::new(2500));
            }
            other => panic!("unexpected violation: {other}"),
        }
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut model: NetworkModel<DfbNode> = NetworkModel::new();
        model.update_link(&id("1"), &id("0"), Distance::new(5));
        model.clear();
        assert_eq!(model.node_ids().count(), 0);
        assert!(model.is_quiescent());
    }
}
