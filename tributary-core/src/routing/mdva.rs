//! MDVA: diffusing distance-vector routing
//!
//! After "MDVA: A Distance-Vector Multi-path Routing Protocol" by Vutukury
//! and Garcia-Luna-Aceves, adapted to a directed graph: links re-weight per
//! direction but disappear in both directions at once, UPDATE/QUERY travel
//! upstream over incoming links while REPLY travels downstream over outgoing
//! links.
//!
//! A node keeps a feasible distance `fd` and only ever routes via successors
//! reporting strictly less than `fd`, which keeps the successor DAG loop-free.
//! When its distance worsens, a node goes ACTIVE: it freezes `fd`, queries
//! every upstream neighbor, and only commits the new distance when the last
//! REPLY (or link loss, which counts as a REPLY of `INF`) arrives.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::distance::{self, Distance};
use super::link::LinkTable;
use super::message::Message;
use super::node::{ConvergenceViolation, ProtocolNode};
use super::{LinkFlags, NodeId};

/// Kind of an MDVA control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MdvaKind {
    /// Unsolicited distance change.
    Update,
    /// Start (or propagation) of a diffusing computation; demands a reply.
    Query,
    /// Answer ending a neighbor's wait.
    Reply,
}

impl fmt::Display for MdvaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MdvaKind::Update => "UPDATE",
            MdvaKind::Query => "QUERY",
            MdvaKind::Reply => "REPLY",
        };
        f.write_str(name)
    }
}

/// MDVA message content: the kind and the sender's distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdvaPayload {
    /// Message kind.
    pub kind: MdvaKind,
    /// Distance the sender advertises (or queries with).
    pub distance: Distance,
}

impl fmt::Display for MdvaPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} d={}", self.kind, self.distance)
    }
}

/// One node running MDVA.
///
/// Paper correspondence: `feasible` is FD, `advertised` is RD, `reported`
/// holds the per-neighbor distances D, `owed_replies` is WN, and
/// `awaited_replies` is the reply-wait set whose non-emptiness defines the
/// ACTIVE state.
#[derive(Debug, Clone)]
pub struct MdvaNode {
    id: NodeId,
    links: LinkTable,
    /// Feasible distance: successors must report strictly less than this.
    feasible: Distance,
    /// Distance last reported to the neighbors.
    advertised: Distance,
    /// Upstream neighbors whose QUERY still awaits our REPLY.
    owed_replies: BTreeSet<NodeId>,
    /// Distance each outgoing peer last reported.
    reported: BTreeMap<NodeId, Distance>,
    /// Downstream neighbors we await a REPLY from; ACTIVE iff non-empty.
    awaited_replies: BTreeSet<NodeId>,
}

impl MdvaNode {
    /// Checks whether a diffusing computation is in progress. A passive node
    /// always satisfies `feasible == advertised == best over successors`.
    pub fn is_active(&self) -> bool {
        let active = !self.awaited_replies.is_empty();
        debug_assert!(
            active
                || (self.feasible == self.advertised
                    && self.feasible == self.successor_distance(&self.successor_set())),
            "passive node out of sync"
        );
        active
    }

    /// Outgoing peers reporting strictly less than the feasible distance.
    /// These form the loop-free routing DAG.
    pub fn successor_set(&self) -> BTreeSet<NodeId> {
        self.links
            .outgoing()
            .keys()
            .filter(|k| distance::lookup(&self.reported, k) < self.feasible)
            .cloned()
            .collect()
    }

    fn current_distance(&self) -> Distance {
        distance::best_distance_over(
            &self.id,
            self.links.outgoing().keys(),
            &self.reported,
            &self.links,
        )
    }

    fn successor_distance(&self, successors: &BTreeSet<NodeId>) -> Distance {
        distance::best_distance_over(&self.id, successors, &self.reported, &self.links)
    }

    fn message(&self, kind: MdvaKind, to: &NodeId, distance: Distance) -> Message<MdvaPayload> {
        Message::new(self.id.clone(), to.clone(), MdvaPayload { kind, distance })
    }

    /// The MDVA state transition, shared by message delivery and link events.
    ///
    /// # Panics
    ///
    /// When a QUERY arrives over a non-outgoing link or a REPLY was never
    /// solicited; both mean the network model broke its delivery contract.
    fn handle(
        &mut self,
        kind: MdvaKind,
        from: &NodeId,
        distance: Distance,
    ) -> Vec<Message<MdvaPayload>> {
        let mut send = Vec::new();
        // The successor set from before this input; `sd` is evaluated
        // against it, not against the refreshed distances.
        let successors = self.successor_set();
        if self.links.outgoing().contains_key(from) {
            distance::record(&mut self.reported, from, distance);
        }
        let cd = self.current_distance();
        let sd = self.successor_distance(&successors);
        debug_assert!(cd <= sd, "minimum over a superset cannot be larger");

        match kind {
            MdvaKind::Query => {
                assert!(
                    self.links.outgoing().contains_key(from),
                    "query from {from} arrived over a non-outgoing link"
                );
                self.owed_replies.insert(from.clone());
            }
            MdvaKind::Reply => {
                let solicited = self.awaited_replies.remove(from);
                assert!(solicited, "reply from {from} was never solicited");
            }
            MdvaKind::Update => {}
        }

        if self.awaited_replies.is_empty() {
            if cd > self.advertised {
                // Distance worsened: start a diffusing computation. The old
                // advertised distance stays feasible until every upstream
                // neighbor has replied.
                self.feasible = self.advertised;
                self.advertised = sd;
                debug_assert!(self.feasible <= cd && cd <= self.advertised);
                for peer in self.links.incoming() {
                    send.push(self.message(MdvaKind::Query, peer, self.advertised));
                }
                self.awaited_replies
                    .extend(self.links.incoming().iter().cloned());
            }
            if self.awaited_replies.is_empty() {
                // Passive (still, or again with no upstream to query):
                // commit the computed distance, answer owed queries, tell
                // everyone else about the change.
                self.feasible = cd;
                for peer in &self.owed_replies {
                    send.push(self.message(MdvaKind::Reply, peer, cd));
                }
                for peer in self.links.incoming() {
                    // Deviation from the paper, which advertises the stale
                    // reported distance here: the update must carry the
                    // freshly computed distance.
                    if !self.owed_replies.contains(peer) && cd != self.advertised {
                        send.push(self.message(MdvaKind::Update, peer, cd));
                    }
                }
                self.advertised = cd;
                self.owed_replies.clear();
            }
        } else if kind == MdvaKind::Query {
            // ACTIVE: a query from off the prior successor set, or one the
            // successor distance cannot improve on, is answered right away;
            // all others wait for the computation to finish.
            if !successors.contains(from) || sd <= self.advertised {
                self.owed_replies.remove(from);
                send.push(self.message(MdvaKind::Reply, from, self.advertised));
            }
        }
        send
    }
}

impl ProtocolNode for MdvaNode {
    type Payload = MdvaPayload;

    fn new(id: NodeId) -> Self {
        let d0 = if id.is_dest() {
            Distance::ZERO
        } else {
            Distance::INF
        };
        Self {
            id,
            links: LinkTable::default(),
            feasible: d0,
            advertised: d0,
            owed_replies: BTreeSet::new(),
            reported: BTreeMap::new(),
            awaited_replies: BTreeSet::new(),
        }
    }

    fn id(&self) -> &NodeId {
        &self.id
    }

    fn links(&self) -> &LinkTable {
        &self.links
    }

    fn process(&mut self, message: Message<MdvaPayload>) -> Vec<Message<MdvaPayload>> {
        debug_assert_eq!(message.to, self.id);
        self.handle(message.payload.kind, &message.from, message.payload.distance)
    }

    fn update_outgoing_link(&mut self, peer: &NodeId, cost: Distance) -> Vec<Message<MdvaPayload>> {
        debug_assert!(cost.is_finite());
        self.links.set_outgoing(peer, cost);
        // Re-run the transition with the peer's last reported distance so the
        // new cost takes effect.
        let last = distance::lookup(&self.reported, peer);
        self.handle(MdvaKind::Update, peer, last)
    }

    fn update_incoming_link(&mut self, peer: &NodeId) -> Vec<Message<MdvaPayload>> {
        if self.links.add_incoming(peer) && self.advertised.is_finite() {
            return vec![self.message(MdvaKind::Update, peer, self.advertised)];
        }
        Vec::new()
    }

    fn remove_link(&mut self, peer: &NodeId) -> Vec<Message<MdvaPayload>> {
        // Drop the incoming side first so no query goes out to the peer.
        self.links.remove_incoming(peer);
        // Link loss is an implicit REPLY(INF) when one was outstanding,
        // otherwise an implicit UPDATE(INF). A stray REPLY addressed to the
        // peer may still be emitted here; the network model purges it along
        // with the rest of the link's traffic.
        let send = if self.awaited_replies.contains(peer) {
            self.handle(MdvaKind::Reply, peer, Distance::INF)
        } else {
            self.handle(MdvaKind::Update, peer, Distance::INF)
        };
        self.links.remove_outgoing(peer);
        self.owed_replies.remove(peer);
        send
    }

    fn link_flags(&self, peer: &NodeId) -> LinkFlags {
        let successors = self.successor_set();
        let best = self.successor_distance(&successors);
        let mut flags = LinkFlags::NONE;
        if successors.contains(peer) {
            flags = flags | LinkFlags::BOLD;
            if best.is_finite()
                && distance::distance_via(peer, &self.reported, &self.links) == best
            {
                flags = flags | LinkFlags::ROUTE;
            }
        }
        flags
    }

    fn render_lines(&self, lines: &mut Vec<String>) {
        let successors = self.successor_set();
        let cd = self.current_distance();
        let sd = self.successor_distance(&successors);
        let active = if self.awaited_replies.is_empty() {
            ""
        } else {
            " ACTIVE"
        };
        lines.push(format!("{}{active}", self.id));
        lines.push(format!(
            "cd={cd} sd={sd} s={}",
            distance::format_ids(&successors)
        ));
        lines.push(format!("fd={} rd={}", self.feasible, self.advertised));
        lines.push(format!("dn={}", distance::format_distances(&self.reported)));
        if !self.awaited_replies.is_empty() {
            lines.push(format!("r={}", distance::format_ids(&self.awaited_replies)));
        }
        if !self.owed_replies.is_empty() {
            lines.push(format!("wn={}", distance::format_ids(&self.owed_replies)));
        }
    }

    fn verify_quiescent_distance(&self, expected: Distance) -> Result<(), ConvergenceViolation> {
        if self.is_active() {
            return Err(ConvergenceViolation::StillActive {
                node: self.id.clone(),
            });
        }
        let cd = self.current_distance();
        if cd != expected {
            return Err(ConvergenceViolation::DistanceMismatch {
                node: self.id.clone(),
                reported: cd,
                expected,
            });
        }
        Ok(())
    }
}

impl fmt::Display for MdvaNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let successors = self.successor_set();
        write!(
            f,
            "node {}: cd={} sd={} s={} fd={} rd={} dn={} ln={}",
            self.id,
            self.current_distance(),
            self.successor_distance(&successors),
            distance::format_ids(&successors),
            self.feasible,
            self.advertised,
            distance::format_distances(&self.reported),
            distance::format_distances(self.links.outgoing()),
        )?;
        if !self.awaited_replies.is_empty() {
            write!(f, " r={}", distance::format_ids(&self.awaited_replies))?;
        }
        if !self.owed_replies.is_empty() {
            write!(f, " wn={}", distance::format_ids(&self.owed_replies))?;
        }
        Ok(())
    }
}
