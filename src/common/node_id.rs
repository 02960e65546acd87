//! Node identifier type.

use std::fmt;

/// Identifies a B-tree node, and with it the page that stores the node.
///
/// Node `n` lives at byte offset `n × PAGE_SIZE` in the index file. Ids are
/// handed out monotonically by the tree controller and never reused, so an
/// id also serves as a stable handle for ancestor/child links on disk.
///
/// # Example
/// ```
/// use pagetree::NodeId;
///
/// let id = NodeId::new(42);
/// assert!(id.is_valid());
/// assert_eq!(id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Invalid/sentinel node ID.
    ///
    /// Stored in a page's ancestor field to mean "no ancestor" (the root).
    pub const INVALID: NodeId = NodeId(u32::MAX);

    /// Create a new NodeId.
    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Check if this node ID is valid (not the sentinel value).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Node(INVALID)")
        } else {
            write!(f, "Node({})", self.0)
        }
    }
}
