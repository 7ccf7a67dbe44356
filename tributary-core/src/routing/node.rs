//! The contract every protocol state machine implements

use std::fmt;

use super::distance::Distance;
use super::link::LinkTable;
use super::message::{Message, Payload};
use super::{LinkFlags, NodeId};

/// A quiescent network whose answers disagree with the shortest-path oracle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvergenceViolation {
    /// The node settled on a distance the topology does not support.
    #[error("node {node} reports distance {reported}, shortest paths give {expected}")]
    DistanceMismatch {
        node: NodeId,
        reported: Distance,
        expected: Distance,
    },

    /// The node still considers a diffusing computation unfinished even
    /// though no messages are in flight.
    #[error("node {node} is still active with no messages in flight")]
    StillActive { node: NodeId },
}

/// One node of the simulated network, running a routing protocol.
///
/// The network model owns nodes and drives them exclusively through this
/// contract. Every mutating operation returns the messages the node wants
/// sent; implementations never touch the network directly, which is what
/// keeps delivery order under the caller's control.
///
/// Handlers are synchronous and deterministic: the same inputs in the same
/// order produce the same state and the same messages, with all internal
/// iteration in identity order.
pub trait ProtocolNode: fmt::Display {
    /// Protocol-specific message content.
    type Payload: Payload;

    /// Creates a fresh node. The destination identity (`"0"`) initializes
    /// with distance zero to itself; everyone else starts unreachable.
    fn new(id: NodeId) -> Self;

    /// This node's identity.
    fn id(&self) -> &NodeId;

    /// This node's view of its own links.
    fn links(&self) -> &LinkTable;

    /// Delivers one message and returns whatever the node sends in response.
    fn process(&mut self, message: Message<Self::Payload>) -> Vec<Message<Self::Payload>>;

    /// Installs or re-weights the outgoing link to `peer`. `cost` is finite
    /// and positive.
    fn update_outgoing_link(&mut self, peer: &NodeId, cost: Distance)
    -> Vec<Message<Self::Payload>>;

    /// Registers an incoming link from `peer`, so advertisements reach it
    /// from now on.
    fn update_incoming_link(&mut self, peer: &NodeId) -> Vec<Message<Self::Payload>>;

    /// Removes the link to/from `peer` and purges the peer from all local
    /// state.
    fn remove_link(&mut self, peer: &NodeId) -> Vec<Message<Self::Payload>>;

    /// Rendering hints for the outgoing link to `peer`. Read-only.
    fn link_flags(&self, peer: &NodeId) -> LinkFlags;

    /// Appends this node's short display lines (identity line first).
    fn render_lines(&self, lines: &mut Vec<String>);

    /// Compares the node's settled distance against the oracle's answer.
    ///
    /// Only meaningful in a quiescent network. `expected` is `INF` when the
    /// oracle finds no path.
    ///
    /// # Errors
    ///
    /// - `ConvergenceViolation::DistanceMismatch` - settled on a wrong distance
    /// - `ConvergenceViolation::StillActive` - unfinished diffusing computation
    fn verify_quiescent_distance(&self, expected: Distance) -> Result<(), ConvergenceViolation>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages_name_the_node() {
        let mismatch = ConvergenceViolation::DistanceMismatch {
            node: NodeId::new("4"),
            reported: Distance::new(12),
            expected: Distance::INF,
        };
        assert_eq!(
            mismatch.to_string(),
            "node 4 reports distance 12, shortest paths give INF"
        );

        let active = ConvergenceViolation::StillActive {
            node: NodeId::new("2"),
        };
        assert!(active.to_string().contains("node 2"));
    }
}
