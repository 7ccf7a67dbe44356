//! DFB: distributed Bellman-Ford
//!
//! The baseline distance-vector protocol. Each node remembers the distance
//! every outgoing peer last reported, takes the best peer-distance plus link
//! cost as its own distance, and broadcasts that to its incoming peers
//! whenever it changes. Counting-to-infinity is cut off by truncating any
//! distance beyond [`MAX_DIST`] to `INF`.

use std::collections::BTreeMap;
use std::fmt;

use super::distance::{self, Distance};
use super::link::LinkTable;
use super::message::Message;
use super::node::{ConvergenceViolation, ProtocolNode};
use super::{LinkFlags, NodeId};

/// Distance ceiling: anything beyond this is treated as unreachable, which
/// bounds how long a count-to-infinity episode can run.
pub const MAX_DIST: Distance = Distance::new(2000);

/// DFB message content: the sender's current distance to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DfbPayload {
    /// Distance the sender advertises.
    pub distance: Distance,
}

impl fmt::Display for DfbPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE d={}", self.distance)
    }
}

/// One node running distributed Bellman-Ford.
#[derive(Debug, Clone)]
pub struct DfbNode {
    id: NodeId,
    links: LinkTable,
    /// Distance each outgoing peer last reported.
    reported: BTreeMap<NodeId, Distance>,
    /// Distance last broadcast to the incoming peers.
    advertised: Distance,
}

impl DfbNode {
    fn best_distance(&self) -> Distance {
        let best = distance::best_distance_over(
            &self.id,
            self.links.outgoing().keys(),
            &self.reported,
            &self.links,
        );
        if best > MAX_DIST { Distance::INF } else { best }
    }

    /// Broadcasts the current best distance to every incoming peer, but only
    /// when it differs from what they last heard.
    fn refresh(&mut self) -> Vec<Message<DfbPayload>> {
        let best = self.best_distance();
        if best == self.advertised {
            return Vec::new();
        }
        let send = self
            .links
            .incoming()
            .iter()
            .map(|peer| {
                Message::new(
                    self.id.clone(),
                    peer.clone(),
                    DfbPayload { distance: best },
                )
            })
            .collect();
        self.advertised = best;
        send
    }
}

impl ProtocolNode for DfbNode {
    type Payload = DfbPayload;

    fn new(id: NodeId) -> Self {
        let advertised = if id.is_dest() {
            Distance::ZERO
        } else {
            Distance::INF
        };
        Self {
            id,
            links: LinkTable::default(),
            reported: BTreeMap::new(),
            advertised,
        }
    }

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn links(&self) -> &LinkTable {
        &self.links
    }

    fn process(&mut self, message: Message<DfbPayload>) -> Vec<Message<DfbPayload>> {
        distance::record(&mut self.reported, &message.from, message.payload.distance);
        self.refresh()
    }

    fn update_outgoing_link(&mut self, peer: &NodeId, cost: Distance) -> Vec<Message<DfbPayload>> {
        self.links.set_outgoing(peer, cost);
        self.refresh()
    }

    fn update_incoming_link(&mut self, peer: &NodeId) -> Vec<Message<DfbPayload>> {
        if self.links.add_incoming(peer) && self.advertised.is_finite() {
            return vec![Message::new(
                self.id.clone(),
                peer.clone(),
                DfbPayload {
                    distance: self.advertised,
                },
            )];
        }
        Vec::new()
    }

    fn remove_link(&mut self, peer: &NodeId) -> Vec<Message<DfbPayload>> {
        self.links.remove(peer);
        self.reported.remove(peer);
        self.refresh()
    }

    fn link_flags(&self, peer: &NodeId) -> LinkFlags {
        let best = self.best_distance();
        if best.is_finite() && best == distance::distance_via(peer, &self.reported, &self.links) {
            LinkFlags::ROUTE | LinkFlags::BOLD
        } else {
            LinkFlags::NONE
        }
    }

    fn render_lines(&self, lines: &mut Vec<String>) {
        lines.push(self.id.to_string());
        lines.push(format!("d={}", self.best_distance()));
        lines.push(format!("reported={}", distance::format_distances(&self.reported)));
    }

    fn verify_quiescent_distance(&self, expected: Distance) -> Result<(), ConvergenceViolation> {
        let best = self.best_distance();
        if best != expected {
            return Err(ConvergenceViolation::DistanceMismatch {
                node: self.id.clone(),
                reported: best,
                expected,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DfbNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "node {}: d={} reported={} out={}",
            self.id,
            self.best_distance(),
            distance::format_distances(&self.reported),
            distance::format_distances(self.links.outgoing()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(from: &str, to: &str, d: Distance) -> Message<DfbPayload> {
        Message::new(NodeId::new(from), NodeId::new(to), DfbPayload { distance: d })
    }

    #[test]
    fn test_destination_greets_new_incoming_peer() {
        let mut dest = DfbNode::new(NodeId::dest());
        let out = dest.update_incoming_link(&NodeId::new("1"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, NodeId::new("1"));
        assert_eq!(out[0].payload.distance, Distance::ZERO);

        // Same peer again: nothing new to say.
        assert!(dest.update_incoming_link(&NodeId::new("1")).is_empty());
    }

    #[test]
    fn test_unreachable_node_greets_silently() {
        let mut node = DfbNode::new(NodeId::new("3"));
        assert!(node.update_incoming_link(&NodeId::new("1")).is_empty());
    }

    #[test]
    fn test_broadcasts_only_on_change() {
        let mut node = DfbNode::new(NodeId::new("1"));
        assert!(node.update_outgoing_link(&NodeId::new("0"), Distance::new(10)).is_empty());
        assert!(node.update_incoming_link(&NodeId::new("2")).is_empty());

        let out = node.process(update("0", "1", Distance::ZERO));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, NodeId::new("2"));
        assert_eq!(out[0].payload.distance, Distance::new(10));

        // Re-reporting the same distance changes nothing.
        assert!(node.process(update("0", "1", Distance::ZERO)).is_empty());
    }

    #[test]
    fn test_distances_truncate_beyond_ceiling() {
        let mut node = DfbNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(1500));
        node.update_incoming_link(&NodeId::new("2"));

        // 1500 + 501 exceeds the ceiling: still unreachable, so silent.
        assert!(node.process(update("0", "1", Distance::new(501))).is_empty());

        // 1500 + 500 is exactly the ceiling and goes out.
        let out = node.process(update("0", "1", Distance::new(500)));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.distance, MAX_DIST);
    }

    #[test]
    fn test_losing_the_only_route_withdraws() {
        let mut node = DfbNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(5));
        node.update_incoming_link(&NodeId::new("2"));
        node.process(update("0", "1", Distance::ZERO));

        let out = node.remove_link(&NodeId::new("0"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.distance, Distance::INF);
        assert!(node.verify_quiescent_distance(Distance::INF).is_ok());
    }

    #[test]
    fn test_link_flags_mark_the_best_route() {
        let mut node = DfbNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(5));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(1));
        node.process(update("0", "1", Distance::ZERO));
        node.process(update("2", "1", Distance::new(9)));

        assert_eq!(node.link_flags(&NodeId::new("0")), LinkFlags::BOLD | LinkFlags::ROUTE);
        assert_eq!(node.link_flags(&NodeId::new("2")), LinkFlags::NONE);
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let node = DfbNode::new(NodeId::new("1"));
        let err = node.verify_quiescent_distance(Distance::new(3));
        assert_eq!(
            err,
            Err(ConvergenceViolation::DistanceMismatch {
                node: NodeId::new("1"),
                reported: Distance::INF,
                expected: Distance::new(3),
            })
        );
    }
}
