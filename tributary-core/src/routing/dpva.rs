//! DPVA: distance plus path vector
//!
//! Bellman-Ford distances augmented with route sets. Every advertisement
//! carries the set of intermediate nodes its path crosses; a node never
//! advertises a route back to a peer that is already on it, and withdraws
//! (distance `INF`, empty set) from peers it previously gave a live route.
//! That suppresses the transient routing loops plain DFB suffers from.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::dfb::MAX_DIST;
use super::distance::{self, Distance};
use super::link::LinkTable;
use super::message::Message;
use super::node::{ConvergenceViolation, ProtocolNode};
use super::{LinkFlags, NodeId};

/// DPVA message content: a distance and the intermediate nodes on its path.
///
/// A withdrawal is `INF` with an empty route set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DpvaPayload {
    /// Distance the sender advertises.
    pub distance: Distance,
    /// Intermediate nodes on the advertised path (destination excluded).
    pub route: BTreeSet<NodeId>,
}

impl fmt::Display for DpvaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UPDATE d={} route={}",
            self.distance,
            distance::format_ids(&self.route)
        )
    }
}

/// One node running the distance-plus-path-vector protocol.
#[derive(Debug, Clone)]
pub struct DpvaNode {
    id: NodeId,
    links: LinkTable,
    /// Distance each outgoing peer last reported.
    reported: BTreeMap<NodeId, Distance>,
    /// Route set each outgoing peer last reported (empty sets removed).
    routes: BTreeMap<NodeId, BTreeSet<NodeId>>,
    /// Incoming peers currently holding a live (non-`INF`) advertisement
    /// from us; only they receive withdrawals.
    advertised_to: BTreeSet<NodeId>,
    /// Distance last advertised.
    advertised: Distance,
    /// Route set last advertised.
    advertised_route: BTreeSet<NodeId>,
}

impl DpvaNode {
    fn best_distance(&self) -> Distance {
        let best = distance::best_distance_over(
            &self.id,
            self.links.outgoing().keys(),
            &self.reported,
            &self.links,
        );
        if best > MAX_DIST { Distance::INF } else { best }
    }

    /// Union of every best-realizing peer and the routes they reported.
    fn best_route(&self, best: Distance) -> BTreeSet<NodeId> {
        let mut route = BTreeSet::new();
        if best.is_infinite() {
            return route;
        }
        for peer in self.links.outgoing().keys() {
            if distance::distance_via(peer, &self.reported, &self.links) <= best {
                // The final destination never needs to appear on a path set.
                if !peer.is_dest() {
                    route.insert(peer.clone());
                }
                if let Some(onward) = self.routes.get(peer) {
                    route.extend(onward.iter().cloned());
                }
            }
        }
        route
    }

    fn refresh(&mut self) -> Vec<Message<DpvaPayload>> {
        let best = self.best_distance();
        let route = self.best_route(best);
        if best == self.advertised && route == self.advertised_route {
            return Vec::new();
        }
        let mut send = Vec::new();
        for peer in self.links.incoming() {
            if peer.is_dest() {
                continue; // the destination never needs our updates
            }
            if route.contains(peer) || best.is_infinite() {
                // The peer is on our path (or we lost ours): withdraw, but
                // only if it currently holds a live advertisement from us.
                if self.advertised_to.remove(peer) {
                    send.push(Message::new(
                        self.id.clone(),
                        peer.clone(),
                        DpvaPayload {
                            distance: Distance::INF,
                            route: BTreeSet::new(),
                        },
                    ));
                }
            } else {
                self.advertised_to.insert(peer.clone());
                send.push(Message::new(
                    self.id.clone(),
                    peer.clone(),
                    DpvaPayload {
                        distance: best,
                        route: route.clone(),
                    },
                ));
            }
        }
        self.advertised = best;
        self.advertised_route = route;
        send
    }
}

impl ProtocolNode for DpvaNode {
    type Payload = DpvaPayload;

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
            routes: BTreeMap::new(),
            advertised_to: BTreeSet::new(),
            advertised,
            advertised_route: BTreeSet::new(),
        }
    }

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn links(&self) -> &LinkTable {
        &self.links
    }

    fn process(&mut self, message: Message<DpvaPayload>) -> Vec<Message<DpvaPayload>> {
        distance::record(&mut self.reported, &message.from, message.payload.distance);
        if message.payload.route.is_empty() {
            self.routes.remove(&message.from);
        } else {
            self.routes.insert(message.from.clone(), message.payload.route);
        }
        self.refresh()
    }

    fn update_outgoing_link(&mut self, peer: &NodeId, cost: Distance) -> Vec<Message<DpvaPayload>> {
        self.links.set_outgoing(peer, cost);
        self.refresh()
    }

    fn update_incoming_link(&mut self, peer: &NodeId) -> Vec<Message<DpvaPayload>> {
        if self.links.add_incoming(peer) && self.advertised.is_finite() {
            self.advertised_to.insert(peer.clone());
            return vec![Message::new(
                self.id.clone(),
                peer.clone(),
                DpvaPayload {
                    distance: self.advertised,
                    route: self.advertised_route.clone(),
                },
            )];
        }
        Vec::new()
    }

    fn remove_link(&mut self, peer: &NodeId) -> Vec<Message<DpvaPayload>> {
        self.links.remove(peer);
        self.reported.remove(peer);
        self.routes.remove(peer);
        self.advertised_to.remove(peer);
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
        let best = self.best_distance();
        lines.push(self.id.to_string());
        lines.push(format!(
            "d={} route={}",
            best,
            distance::format_ids(&self.best_route(best))
        ));
        lines.push(format!(
            "reported={} routes={}",
            distance::format_distances(&self.reported),
            format_routes(&self.routes)
        ));
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

impl fmt::Display for DpvaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let best = self.best_distance();
        write!(
            f,
            "node {}: d={} route={} reported={} routes={} out={}",
            self.id,
            best,
            distance::format_ids(&self.best_route(best)),
            distance::format_distances(&self.reported),
            format_routes(&self.routes),
            distance::format_distances(self.links.outgoing()),
        )
    }
}

fn format_routes(routes: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> String {
    let entries: Vec<String> = routes
        .iter()
        .map(|(peer, route)| format!("{peer}: {}", distance::format_ids(route)))
        .collect();
    format!("{{{}}}", entries.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(from: &str, to: &str, d: Distance, route: &[&str]) -> Message<DpvaPayload> {
        Message::new(
            NodeId::new(from),
            NodeId::new(to),
            DpvaPayload {
                distance: d,
                route: route.iter().map(|n| NodeId::new(*n)).collect(),
            },
        )
    }

    #[test]
    fn test_advertisement_carries_the_route_set() {
        let mut node = DpvaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(3));
        node.update_incoming_link(&NodeId::new("3"));

        let out = node.process(update("2", "1", Distance::new(4), &["5"]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, NodeId::new("3"));
        assert_eq!(out[0].payload.distance, Distance::new(7));
        // Route = the peer plus everything it reported.
        let route: Vec<&str> = out[0].payload.route.iter().map(NodeId::as_str).collect();
        assert_eq!(route, vec!["2", "5"]);
    }

    #[test]
    fn test_never_updates_the_destination() {
        let mut node = DpvaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(5));
        node.update_incoming_link(&NodeId::dest());
        assert!(node.process(update("0", "1", Distance::ZERO, &[])).is_empty());
    }

    #[test]
    fn test_withdraws_from_peers_on_the_route() {
        let mut node = DpvaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(5));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(1));
        node.update_incoming_link(&NodeId::new("2"));

        let out = node.process(update("0", "1", Distance::ZERO, &[]));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.distance, Distance::new(5));

        // Peer 2 claims a path through us; its route set names us.
        assert!(node.process(update("2", "1", Distance::new(6), &["1"])).is_empty());

        // Losing the direct link leaves only the loop through 2, so the
        // previously live advertisement to 2 is withdrawn.
        let out = node.remove_link(&NodeId::new("0"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].to, NodeId::new("2"));
        assert_eq!(out[0].payload.distance, Distance::INF);
        assert!(out[0].payload.route.is_empty());
    }

    #[test]
    fn test_withdrawal_is_sent_only_once() {
        let mut node = DpvaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("0"), Distance::new(5));
        node.update_incoming_link(&NodeId::new("2"));
        node.process(update("0", "1", Distance::ZERO, &[]));

        let out = node.remove_link(&NodeId::new("0"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.distance, Distance::INF);

        // Without a live advertisement outstanding there is nothing to
        // withdraw, even when the distance changes again.
        let out = node.update_outgoing_link(&NodeId::new("3"), Distance::new(9));
        assert!(out.is_empty());
    }

    #[test]
    fn test_incoming_link_greeting_includes_route() {
        let mut node = DpvaNode::new(NodeId::new("1"));
        node.update_outgoing_link(&NodeId::new("2"), Distance::new(2));
        node.process(update("2", "1", Distance::new(3), &["4"]));

        let out = node.update_incoming_link(&NodeId::new("9"));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].payload.distance, Distance::new(5));
        assert!(out[0].payload.route.contains(&NodeId::new("2")));
        assert!(out[0].payload.route.contains(&NodeId::new("4")));
    }
}
