//! In-flight protocol messages

use std::fmt;

use super::NodeId;

/// Bounds every protocol payload satisfies.
///
/// Payloads are plain data: the engine only moves them around and renders
/// them, all interpretation happens inside the receiving node.
pub trait Payload: fmt::Debug + fmt::Display + Clone + PartialEq {}

impl<T: fmt::Debug + fmt::Display + Clone + PartialEq> Payload for T {}

/// One message in flight over a directed link.
///
/// `first_over_link` marks the oldest pending message of its `(from, to)`
/// direction; only the network model's send/deliver paths maintain it. The
/// flag is what enforces per-link FIFO delivery while everything else about
/// delivery order stays up to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Message<P> {
    /// Sending node.
    pub from: NodeId,
    /// Receiving node.
    pub to: NodeId,
    /// Whether this is the oldest pending message over `(from, to)`.
    pub first_over_link: bool,
    /// Protocol-specific content.
    pub payload: P,
}

impl<P: Payload> Message<P> {
    /// Creates a message. The first-over-link flag starts false and is
    /// assigned when the network model enqueues the message.
    pub fn new(from: NodeId, to: NodeId, payload: P) -> Self {
        Self {
            from,
            to,
            first_over_link: false,
            payload,
        }
    }

    /// Checks whether this message travels over the directed link
    /// `from -> to`.
    pub fn is_over_link(&self, from: &NodeId, to: &NodeId) -> bool {
        self.from == *from && self.to == *to
    }

    /// Checks whether both messages travel over the same directed link.
    pub fn same_link(&self, other: &Message<P>) -> bool {
        self.is_over_link(&other.from, &other.to)
    }
}

impl<P: Payload> fmt::Display for Message<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{} {}", self.from, self.to, self.payload)?;
        if !self.first_over_link {
            f.write_str(" !FIRST")?;
        }
        Ok(())
    }
}
