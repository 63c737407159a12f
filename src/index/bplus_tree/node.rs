//! Tree nodes and the arena that owns them.
//!
//! Nodes live in a [`NodeArena`] and refer to each other by [`NodeId`].
//! Parent → child edges are ownership edges; the leaf chain
//! (`next_leaf`) is a same-level traversal link only.
//!
//! The recursive algorithms (insertion with preemptive split, descent,
//! counting) run on the arena rather than on a single node because a
//! node cannot reach its children without it.

use tracing::trace;

use crate::common::config::MAX_KEYS;
use crate::common::NodeId;

use super::stats::TreeStats;
use super::{Key, RecordLocator};

/// Leaf or internal payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeBody {
    /// `records[i]` holds the locators of `keys[i]`, in arrival order.
    Leaf {
        records: Vec<Vec<RecordLocator>>,
        next_leaf: Option<NodeId>,
    },
    /// `children.len() == keys.len() + 1` once a split completes.
    Internal { children: Vec<NodeId> },
}

/// A node of the B+ tree.
///
/// # Invariants
/// - `keys` strictly ascending, at most [`MAX_KEYS`] after any completed operation
/// - leaf: one record list per key, never empty
/// - internal: `children[i]` holds keys `< keys[i]`; the last child holds
///   keys `>= keys[last]`
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    keys: Vec<Key>,
    body: NodeBody,
}

impl Node {
    /// Create an empty leaf.
    pub(crate) fn new_leaf() -> Self {
        Self::leaf(Vec::new(), Vec::new())
    }

    pub(crate) fn leaf(keys: Vec<Key>, records: Vec<Vec<RecordLocator>>) -> Self {
        debug_assert_eq!(keys.len(), records.len());
        Self {
            keys,
            body: NodeBody::Leaf {
                records,
                next_leaf: None,
            },
        }
    }

    pub(crate) fn internal(keys: Vec<Key>, children: Vec<NodeId>) -> Self {
        Self {
            keys,
            body: NodeBody::Internal { children },
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.body, NodeBody::Leaf { .. })
    }

    /// Keys held by this node (separators for an internal node).
    #[inline]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Child ids; empty for a leaf.
    pub fn children(&self) -> &[NodeId] {
        match &self.body {
            NodeBody::Internal { children } => children,
            NodeBody::Leaf { .. } => &[],
        }
    }

    /// Record lists index-aligned with [`keys`](Self::keys); empty for an internal node.
    pub fn records(&self) -> &[Vec<RecordLocator>] {
        match &self.body {
            NodeBody::Leaf { records, .. } => records,
            NodeBody::Internal { .. } => &[],
        }
    }

    /// The following leaf in ascending key order.
    pub fn next_leaf(&self) -> Option<NodeId> {
        match &self.body {
            NodeBody::Leaf { next_leaf, .. } => *next_leaf,
            NodeBody::Internal { .. } => None,
        }
    }

    /// Whether the node holds [`MAX_KEYS`] keys and must be split before
    /// an insert can descend into it.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.keys.len() >= MAX_KEYS
    }

    /// Locators stored under `key` in this leaf.
    pub fn records_for(&self, key: Key) -> Option<&[RecordLocator]> {
        let NodeBody::Leaf { records, .. } = &self.body else {
            return None;
        };
        let pos = self.keys.partition_point(|&k| k < key);
        if self.keys.get(pos) == Some(&key) {
            Some(&records[pos])
        } else {
            None
        }
    }

    /// Index of the child whose subtree covers `key`.
    ///
    /// Counts the separators `<= key`, so an exact match goes right.
    #[inline]
    fn child_index(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k <= key)
    }
}

/// What an insert did at leaf level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InsertOutcome {
    /// The key was new and got its own entry.
    NewKey,
    /// The key existed; the locator was appended to its list.
    Appended,
}

/// Owner of every node of one tree.
///
/// Nodes are never freed, so a [`NodeId`] stays valid for the arena's
/// lifetime.
#[derive(Debug, Clone, Default)]
pub(crate) struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub(crate) fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    #[inline]
    pub(crate) fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    pub(crate) fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Replace the children of internal node `id`. Does nothing on a leaf.
    pub(crate) fn set_children(&mut self, id: NodeId, new_children: Vec<NodeId>) {
        let NodeBody::Internal { children } = &mut self.nodes[id.0].body else {
            debug_assert!(false, "{} is a leaf", id);
            return;
        };
        *children = new_children;
    }

    /// Point leaf `id` at `next`. Does nothing on an internal node.
    pub(crate) fn set_next_leaf(&mut self, id: NodeId, next: Option<NodeId>) {
        let NodeBody::Leaf { next_leaf, .. } = &mut self.nodes[id.0].body else {
            debug_assert!(false, "{} is not a leaf", id);
            return;
        };
        *next_leaf = next;
    }

    /// Insert `(key, locator)` into the subtree rooted at `id`.
    ///
    /// The caller guarantees `id` is not full. Every full child met on
    /// the way down is split before the descent enters it, so no node
    /// ever has to split twice and nothing propagates upward.
    pub(crate) fn insert_non_full(
        &mut self,
        mut id: NodeId,
        key: Key,
        locator: RecordLocator,
        stats: &TreeStats,
    ) -> InsertOutcome {
        loop {
            let node = &mut self.nodes[id.0];
            debug_assert!(!node.is_full(), "{} is full", id);

            let mut i = match &mut node.body {
                NodeBody::Leaf { records, .. } => {
                    let pos = node.keys.partition_point(|&k| k < key);
                    if node.keys.get(pos) == Some(&key) {
                        records[pos].push(locator);
                        return InsertOutcome::Appended;
                    }
                    node.keys.insert(pos, key);
                    records.insert(pos, vec![locator]);
                    return InsertOutcome::NewKey;
                }
                NodeBody::Internal { .. } => node.keys.partition_point(|&k| k <= key),
            };

            let child = self.nodes[id.0].children()[i];
            if self.nodes[child.0].is_full() {
                self.split_child(id, i, stats);
                // Keys equal to the promoted separator belong to the right sibling.
                if key >= self.nodes[id.0].keys[i] {
                    i += 1;
                }
            }
            id = self.nodes[id.0].children()[i];
        }
    }

    /// Split the full child at `children[i]` of `parent`.
    ///
    /// The new right sibling is placed at `children[i + 1]` and the
    /// separator at `keys[i]`. A leaf split copies the right sibling's
    /// first key upward; an internal split moves its middle key up.
    pub(crate) fn split_child(&mut self, parent: NodeId, i: usize, stats: &TreeStats) -> NodeId {
        let child_id = self.nodes[parent.0].children()[i];
        let right_id = NodeId::new(self.nodes.len());

        let child = &mut self.nodes[child_id.0];
        debug_assert_eq!(child.keys.len(), MAX_KEYS);
        let mid = child.keys.len() / 2;

        let (separator, right) = match &mut child.body {
            NodeBody::Leaf { records, next_leaf } => {
                let right_keys = child.keys.split_off(mid);
                let right_records = records.split_off(mid);
                let separator = right_keys[0];
                let right = Node {
                    keys: right_keys,
                    body: NodeBody::Leaf {
                        records: right_records,
                        next_leaf: next_leaf.replace(right_id),
                    },
                };
                stats.record_leaf_split();
                (separator, right)
            }
            NodeBody::Internal { children } => {
                let right_keys = child.keys.split_off(mid + 1);
                let separator = child.keys.remove(mid);
                let right_children = children.split_off(mid + 1);
                stats.record_internal_split();
                (separator, Node::internal(right_keys, right_children))
            }
        };

        let allocated = self.alloc(right);
        debug_assert_eq!(allocated, right_id);

        let parent_node = &mut self.nodes[parent.0];
        parent_node.keys.insert(i, separator);
        match &mut parent_node.body {
            NodeBody::Internal { children } => children.insert(i + 1, right_id),
            NodeBody::Leaf { .. } => debug_assert!(false, "{} is a leaf", parent),
        }

        trace!(%parent, %child_id, %right_id, separator, "split child");
        right_id
    }

    /// Descend to the leaf where a scan for `key` must start.
    pub(crate) fn find_leaf(&self, mut id: NodeId, key: Key) -> NodeId {
        loop {
            let node = self.get(id);
            match &node.body {
                NodeBody::Leaf { .. } => return id,
                NodeBody::Internal { children } => id = children[node.child_index(key)],
            }
        }
    }

    /// Leftmost leaf that can hold a key `>= key`.
    ///
    /// Unlike [`find_leaf`](Self::find_leaf), an exact separator match
    /// descends left, so a scan from here also sees a copy of the
    /// separator at the upper edge of the left subtree.
    pub(crate) fn lower_bound_leaf(&self, mut id: NodeId, key: Key) -> NodeId {
        loop {
            let node = self.get(id);
            match &node.body {
                NodeBody::Leaf { .. } => return id,
                NodeBody::Internal { children } => {
                    id = children[node.keys.partition_point(|&k| k < key)]
                }
            }
        }
    }

    pub(crate) fn leftmost_leaf(&self, mut id: NodeId) -> NodeId {
        while let NodeBody::Internal { children } = &self.get(id).body {
            id = children[0];
        }
        id
    }

    /// Return the first node on the search path holding `key`, at any level.
    ///
    /// An internal hit carries no locators.
    pub(crate) fn search_node(&self, mut id: NodeId, key: Key) -> Option<NodeId> {
        loop {
            let node = self.get(id);
            let i = node.keys.partition_point(|&k| k < key);
            if node.keys.get(i) == Some(&key) {
                return Some(id);
            }
            match &node.body {
                NodeBody::Leaf { .. } => return None,
                NodeBody::Internal { children } => id = children[i],
            }
        }
    }

    pub(crate) fn count_nodes(&self, id: NodeId) -> usize {
        1 + self
            .get(id)
            .children()
            .iter()
            .map(|&child| self.count_nodes(child))
            .sum::<usize>()
    }

    /// Levels from `id` down to its leaves. All leaves share one depth.
    pub(crate) fn height(&self, id: NodeId) -> usize {
        let mut height = 1;
        let mut id = id;
        while let NodeBody::Internal { children } = &self.get(id).body {
            id = children[0];
            height += 1;
        }
        height
    }

    /// Append keys in order, separators between their child subtrees.
    pub(crate) fn traverse(&self, id: NodeId, out: &mut Vec<Key>) {
        let node = self.get(id);
        match &node.body {
            NodeBody::Leaf { .. } => out.extend_from_slice(&node.keys),
            NodeBody::Internal { children } => {
                for (child, key) in children.iter().zip(&node.keys) {
                    self.traverse(*child, out);
                    out.push(*key);
                }
                if let Some(&last) = children.last() {
                    self.traverse(last, out);
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
