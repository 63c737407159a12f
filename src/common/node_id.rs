//! Node identifier type.

use std::fmt;

/// Identifies a node in the tree's node arena.
///
/// Using `usize` because nodes are stored in a `Vec<Node>` and the id is
/// used directly as an index: `nodes[node_id.0]`. Ids are stable for the
/// lifetime of a tree; nodes are never freed.
///
/// # Example
/// ```
/// use bplusidx::NodeId;
///
/// let id = NodeId::new(3);
/// assert_eq!(id.0, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Create a new NodeId.
    #[inline]
    pub fn new(id: usize) -> Self {
        NodeId(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}
