//! Thread-safe handle around a [`BPlusTree`].

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::common::Result;

use super::stats::StatsSnapshot;
use super::tree::BPlusTree;
use super::{Key, RecordLocator};

/// A cloneable, reader-writer locked [`BPlusTree`].
///
/// # Thread Safety
/// - `insert`: write lock for the whole call (splits mutate ancestors)
/// - lookups, scans, counts, `save_to_file`: read lock, results copied out
/// - `load_from_file`: decodes with no lock held, then swaps under the
///   write lock, so readers never see a half-loaded tree
///
/// # Example
/// ```
/// use bplusidx::SharedTree;
/// use std::thread;
///
/// let tree = SharedTree::new();
/// let writer = tree.clone();
/// thread::spawn(move || writer.insert(1.5, 7).unwrap())
///     .join()
///     .unwrap();
/// assert_eq!(tree.search(1.5), Some(vec![7]));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SharedTree {
    inner: Arc<RwLock<BPlusTree>>,
}

impl SharedTree {
    pub fn new() -> Self {
        Self::from_tree(BPlusTree::new())
    }

    pub fn from_tree(tree: BPlusTree) -> Self {
        Self {
            inner: Arc::new(RwLock::new(tree)),
        }
    }

    /// See [`BPlusTree::insert`].
    pub fn insert(&self, key: Key, locator: RecordLocator) -> Result<()> {
        self.inner.write().insert(key, locator)
    }

    /// See [`BPlusTree::search`].
    pub fn search(&self, key: Key) -> Option<Vec<RecordLocator>> {
        self.inner.read().search(key).map(<[RecordLocator]>::to_vec)
    }

    /// See [`BPlusTree::range_query`].
    pub fn range_query(&self, lo: Key, hi: Key) -> Vec<RecordLocator> {
        self.inner.read().range_query(lo, hi)
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    pub fn node_count(&self) -> u32 {
        self.inner.read().node_count()
    }

    pub fn height(&self) -> u32 {
        self.inner.read().height()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.inner.read().stats()
    }

    /// Run `f` with shared access to the tree.
    pub fn with_read<R>(&self, f: impl FnOnce(&BPlusTree) -> R) -> R {
        f(&self.inner.read())
    }

    /// See [`BPlusTree::serialize_to_file`].
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.inner.read().serialize_to_file(path)
    }

    /// Replace the tree with the image at `path`.
    ///
    /// On error the current tree stays in place. Statistics carry over.
    pub fn load_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let loaded = BPlusTree::deserialize_from_file(path)?;
        let mut guard = self.inner.write();
        let replaced_nodes = guard.node_count();
        guard.adopt(loaded);
        debug!(replaced_nodes, nodes = guard.node_count(), "swapped in loaded tree");
        Ok(())
    }
}
