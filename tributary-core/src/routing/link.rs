//! Per-node adjacency state

use std::collections::{BTreeMap, BTreeSet};

use super::distance::{self, Distance};
use super::NodeId;

/// The links a node knows about itself.
///
/// `outgoing` maps each peer reachable over an outgoing link to that link's
/// cost (finite by construction). `incoming` is the set of peers holding a
/// link toward this node; the node fans its advertisements out to them. Both
/// collections iterate in identity order.
#[derive(Debug, Clone, Default)]
pub struct LinkTable {
    outgoing: BTreeMap<NodeId, Distance>,
    incoming: BTreeSet<NodeId>,
}

impl LinkTable {
    /// Returns the cost of the outgoing link to `peer`, or `INF` when there
    /// is none.
    pub fn outgoing_cost(&self, peer: &NodeId) -> Distance {
        distance::lookup(&self.outgoing, peer)
    }

    /// Sets the cost of the outgoing link to `peer`. `INF` removes the link.
    pub fn set_outgoing(&mut self, peer: &NodeId, cost: Distance) {
        distance::record(&mut self.outgoing, peer, cost);
    }

    /// Registers an incoming link from `peer`. Returns false when the link
    /// was already known.
    pub fn add_incoming(&mut self, peer: &NodeId) -> bool {
        self.incoming.insert(peer.clone())
    }

    /// Forgets the incoming link from `peer`. Returns false when there was
    /// none.
    pub fn remove_incoming(&mut self, peer: &NodeId) -> bool {
        self.incoming.remove(peer)
    }

    /// Forgets the outgoing link to `peer`.
    pub fn remove_outgoing(&mut self, peer: &NodeId) {
        self.outgoing.remove(peer);
    }

    /// Forgets `peer` in both directions.
    pub fn remove(&mut self, peer: &NodeId) {
        self.remove_outgoing(peer);
        self.remove_incoming(peer);
    }

    /// Peers reachable over outgoing links, with costs, in identity order.
    pub fn outgoing(&self) -> &BTreeMap<NodeId, Distance> {
        &self.outgoing
    }

    /// Peers with a link toward this node, in identity order.
    pub fn incoming(&self) -> &BTreeSet<NodeId> {
        &self.incoming
    }

    /// Every peer linked to this node in either direction.
    pub fn incident(&self) -> BTreeSet<NodeId> {
        let mut peers: BTreeSet<NodeId> = self.incoming.clone();
        peers.extend(self.outgoing.keys().cloned());
        peers
    }
}
