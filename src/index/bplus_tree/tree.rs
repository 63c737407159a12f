//! The B+ tree: root management, lookups, scans and persistence.

use std::path::Path;

use tracing::{debug, trace, warn};

use crate::common::{Error, NodeId, Result};
use crate::storage::image_file;

use super::codec;
use super::iter::RangeIter;
use super::node::{InsertOutcome, Node, NodeArena};
use super::stats::{StatsSnapshot, TreeStats};
use super::{Key, RecordLocator};

/// An insert-only B+ tree of order 5 mapping `f32` keys to lists of
/// `u32` record locators.
///
/// # Structure
/// ```text
///                  ┌─────────┐
///                  │  [10]   │            internal: separators only
///                  └────┬────┘
///             ┌─────────┴─────────┐
///        ┌────┴────┐         ┌────┴─────┐
///        │ [5, 7]  │ ──────▶ │ [10, 15] │  leaves: keys + locators,
///        └─────────┘  next   └──────────┘  linked left to right
/// ```
///
/// Each leaf key maps to its locators in insertion order. Leaf splits
/// copy a separator upward, internal splits move one, so every key
/// stays reachable along the leaf chain.
///
/// # Thread Safety
/// `BPlusTree` is single-threaded: `insert` mutates ancestors in place.
/// Use [`SharedTree`](super::SharedTree) for concurrent access.
///
/// # Example
/// ```
/// use bplusidx::BPlusTree;
///
/// let mut tree = BPlusTree::new();
/// tree.insert(0.5, 100).unwrap();
/// tree.insert(0.5, 200).unwrap();
/// tree.insert(0.7, 300).unwrap();
///
/// assert_eq!(tree.search(0.5), Some(&[100, 200][..]));
/// assert_eq!(tree.range_query(0.6, 1.0), vec![300]);
/// ```
#[derive(Debug)]
pub struct BPlusTree {
    arena: NodeArena,
    root: NodeId,
    stats: TreeStats,
}

impl BPlusTree {
    /// Create an empty tree: a single leaf with no keys.
    pub fn new() -> Self {
        let mut arena = NodeArena::new();
        let root = arena.alloc(Node::new_leaf());
        Self {
            arena,
            root,
            stats: TreeStats::new(),
        }
    }

    /// Insert `locator` under `key`.
    ///
    /// An existing key gets `locator` appended to its list; locators are
    /// kept in insertion order and duplicates are preserved.
    ///
    /// # Errors
    /// Returns `Error::NanKey` if `key` is NaN.
    pub fn insert(&mut self, key: Key, locator: RecordLocator) -> Result<()> {
        if key.is_nan() {
            return Err(Error::NanKey);
        }
        self.stats.record_insert();

        if self.arena.get(self.root).is_full() {
            let old_root = self.root;
            let new_root = self.arena.alloc(Node::internal(Vec::new(), vec![old_root]));
            self.arena.split_child(new_root, 0, &self.stats);
            self.root = new_root;
            self.stats.record_root_split();
            trace!(%old_root, %new_root, height = self.height(), "grew root");
        }

        let outcome = self
            .arena
            .insert_non_full(self.root, key, locator, &self.stats);
        if outcome == InsertOutcome::Appended {
            self.stats.record_append();
        }
        Ok(())
    }

    /// Locators stored under `key`, resolved at leaf level.
    ///
    /// Returns `None` for an absent key (and for NaN).
    pub fn search(&self, key: Key) -> Option<&[RecordLocator]> {
        self.stats.record_point_lookup();
        let leaf = self.arena.find_leaf(self.root, key);
        self.arena.get(leaf).records_for(key)
    }

    /// The first node on the descent path holding `key`, at any level.
    ///
    /// A separator copy in an internal node can match before the leaf
    /// entry does, in which case the node carries no locators. Use
    /// [`search`](Self::search) to get locators.
    pub fn search_node(&self, key: Key) -> Option<NodeId> {
        self.arena.search_node(self.root, key)
    }

    /// The leaf where a scan starting at `key` begins.
    pub fn find_leaf_node(&self, key: Key) -> NodeId {
        self.arena.find_leaf(self.root, key)
    }

    /// All locators of keys in `[lo, hi]`, ascending by key, insertion
    /// order within a key.
    ///
    /// Empty when nothing is in range, when `lo > hi`, or when a bound
    /// is NaN.
    pub fn range_query(&self, lo: Key, hi: Key) -> Vec<RecordLocator> {
        self.range(lo, hi)
            .flat_map(|(_, locators)| locators.iter().copied())
            .collect()
    }

    /// Lazily iterate `(key, locators)` entries with `lo <= key <= hi`.
    pub fn range(&self, lo: Key, hi: Key) -> RangeIter<'_> {
        self.stats.record_range_scan();
        // NaN bounds fail this comparison too.
        let start = if lo <= hi {
            Some(self.arena.lower_bound_leaf(self.root, lo))
        } else {
            None
        };
        RangeIter::new(&self.arena, start, lo, hi, &self.stats)
    }

    /// Iterate every entry in ascending key order.
    pub fn iter(&self) -> RangeIter<'_> {
        self.stats.record_range_scan();
        let start = self.arena.leftmost_leaf(self.root);
        RangeIter::new(
            &self.arena,
            Some(start),
            Key::NEG_INFINITY,
            Key::INFINITY,
            &self.stats,
        )
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.leaves().map(|id| self.arena.get(id).keys().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.get(self.root).keys().is_empty()
    }

    /// Total number of nodes reachable from the root, saturating at
    /// `u32::MAX`.
    pub fn node_count(&self) -> u32 {
        saturating_u32(self.arena.count_nodes(self.root))
    }

    /// Number of levels; 1 for a tree that is a single leaf.
    pub fn height(&self) -> u32 {
        saturating_u32(self.arena.height(self.root))
    }

    /// Keys held by the root node.
    pub fn root_keys(&self) -> &[Key] {
        self.arena.get(self.root).keys()
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Read-only access to a node, for diagnostics.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.contains(id).then(|| self.arena.get(id))
    }

    /// Leaf ids following the leaf chain from the leftmost leaf.
    pub fn leaves(&self) -> impl Iterator<Item = NodeId> + '_ {
        let first = self.arena.leftmost_leaf(self.root);
        std::iter::successors(Some(first), |&id| self.arena.get(id).next_leaf())
    }

    /// Keys of every leaf, in leaf chain order.
    pub fn leaf_keys(&self) -> Vec<Key> {
        self.leaves()
            .flat_map(|id| self.arena.get(id).keys().iter().copied())
            .collect()
    }

    /// In-order keys of the whole tree, separators included between
    /// their child subtrees.
    pub fn traverse(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        self.arena.traverse(self.root, &mut keys);
        keys
    }

    /// Get a snapshot of operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Live counters, e.g. for [`TreeStats::emit_tracing`].
    pub fn stats_tracker(&self) -> &TreeStats {
        &self.stats
    }

    /// Encode the whole tree as one depth-first image.
    pub fn serialize(&self) -> Vec<u8> {
        codec::encode(&self.arena, self.root)
    }

    /// Size in bytes of [`serialize`](Self::serialize)'s output.
    pub fn serialized_len(&self) -> usize {
        codec::encoded_len(&self.arena, self.root)
    }

    /// Rebuild a tree from an image, relinking the leaf chain.
    ///
    /// # Errors
    /// Returns `Error::Corrupt` if the image is malformed.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let codec::Decoded {
            mut arena,
            root,
            leaves,
        } = codec::decode(bytes)?;

        for pair in leaves.windows(2) {
            arena.set_next_leaf(pair[0], Some(pair[1]));
        }
        if let Some(&last) = leaves.last() {
            arena.set_next_leaf(last, None);
        }

        Ok(Self {
            arena,
            root,
            stats: TreeStats::new(),
        })
    }

    /// Write the tree image to `path`, replacing any existing file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be written.
    pub fn serialize_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let image = self.serialize();
        image_file::write_image(path, &image)?;
        debug!(
            path = %path.display(),
            bytes = image.len(),
            nodes = self.node_count(),
            "saved tree image"
        );
        Ok(())
    }

    /// Load a tree from an image file.
    ///
    /// # Errors
    /// Returns `Error::Io` if the file cannot be read and
    /// `Error::Corrupt` if its contents are malformed.
    pub fn deserialize_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let image = image_file::read_image(path)?;
        match Self::deserialize(&image) {
            Ok(tree) => {
                debug!(
                    path = %path.display(),
                    bytes = image.len(),
                    nodes = tree.node_count(),
                    height = tree.height(),
                    "loaded tree image"
                );
                Ok(tree)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "rejected tree image");
                Err(e)
            }
        }
    }

    /// Replace this tree's contents with the image at `path`.
    ///
    /// The image is decoded into a separate tree first; on any error
    /// `self` is left exactly as it was. Statistics carry over.
    pub fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let loaded = Self::deserialize_from_file(path)?;
        self.adopt(loaded);
        Ok(())
    }

    /// Take over the nodes of `loaded`, keeping this tree's statistics.
    pub(crate) fn adopt(&mut self, loaded: BPlusTree) {
        self.arena = loaded.arena;
        self.root = loaded.root;
    }
}

impl Default for BPlusTree {
    fn default() -> Self {
        Self::new()
    }
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ============================================================================
// TESTS
// ============================================================================
