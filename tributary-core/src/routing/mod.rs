//! Routing protocol state machines and their shared building blocks

pub mod dfb;
pub mod distance;
pub mod dpva;
pub mod link;
pub mod mdva;
pub mod message;
pub mod node;
pub mod spta;

use std::fmt;
use std::ops::BitOr;

pub use dfb::{DfbNode, DfbPayload};
pub use distance::Distance;
pub use dpva::{DpvaNode, DpvaPayload};
pub use link::LinkTable;
pub use mdva::{MdvaKind, MdvaNode, MdvaPayload};
pub use message::{Message, Payload};
pub use node::{ConvergenceViolation, ProtocolNode};
pub use spta::{EdgeUpdate, SptaNode, SptaPayload, Topology};

/// Name of the fixed destination node every protocol routes toward.
pub const DEST_NAME: &str = "0";

/// Identity of a simulated node.
///
/// Node identities are plain string names ordered lexicographically
/// (`"10" < "2"`). All node collections in the engine iterate in this
/// order, which is what makes simulation runs reproducible.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node identity from a string name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Creates a node identity from a numeric index.
    pub fn numbered(index: u32) -> Self {
        Self(index.to_string())
    }

    /// Returns the identity of the destination node (name `"0"`).
    pub fn dest() -> Self {
        Self(DEST_NAME.to_string())
    }

    /// Checks whether this identity names the destination node.
    pub fn is_dest(&self) -> bool {
        self.0 == DEST_NAME
    }

    /// Returns the underlying name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Rendering hints for one directed link, as seen by its source node.
///
/// Purely presentational: the console and any future UI use these to
/// highlight links, the protocols never read them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkFlags(u8);

impl LinkFlags {
    /// No highlighting.
    pub const NONE: LinkFlags = LinkFlags(0);
    /// Link is drawn emphasized (e.g. part of the routing DAG).
    pub const BOLD: LinkFlags = LinkFlags(1);
    /// Link carries the node's traffic toward the destination.
    pub const ROUTE: LinkFlags = LinkFlags(2);

    /// Checks whether every flag in `other` is set in `self`.
    pub fn contains(self, other: LinkFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Checks whether no flag is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw bitmask.
    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for LinkFlags {
    type Output = LinkFlags;

    fn bitor(self, rhs: LinkFlags) -> LinkFlags {
        LinkFlags(self.0 | rhs.0)
    }
}
