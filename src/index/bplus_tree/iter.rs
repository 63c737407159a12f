//! Ordered iteration along the leaf chain.

use crate::common::NodeId;

use super::node::NodeArena;
use super::stats::TreeStats;
use super::{Key, RecordLocator};

/// Iterator over `(key, locators)` entries with `lo <= key <= hi`.
///
/// Created by [`BPlusTree::range`](super::BPlusTree::range) and
/// [`BPlusTree::iter`](super::BPlusTree::iter). It starts at the leaf a
/// single descent found, then follows `next_leaf` links; it never
/// re-descends the tree.
pub struct RangeIter<'a> {
    arena: &'a NodeArena,
    leaf: Option<NodeId>,
    pos: usize,
    lo: Key,
    hi: Key,
    stats: &'a TreeStats,
}

impl<'a> RangeIter<'a> {
    pub(crate) fn new(
        arena: &'a NodeArena,
        start: Option<NodeId>,
        lo: Key,
        hi: Key,
        stats: &'a TreeStats,
    ) -> Self {
        if start.is_some() {
            stats.record_leaf_scanned();
        }
        Self {
            arena,
            leaf: start,
            pos: 0,
            lo,
            hi,
            stats,
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = (Key, &'a [RecordLocator]);

    fn next(&mut self) -> Option<Self::Item> {
        let arena = self.arena;
        loop {
            let node = arena.get(self.leaf?);
            let Some(&key) = node.keys().get(self.pos) else {
                self.leaf = node.next_leaf();
                self.pos = 0;
                if self.leaf.is_some() {
                    self.stats.record_leaf_scanned();
                }
                continue;
            };

            let records = &node.records()[self.pos];
            self.pos += 1;
            if key < self.lo {
                continue;
            }
            if key > self.hi {
                // Keys never descend along the chain; nothing further can match.
                self.leaf = None;
                return None;
            }
            return Some((key, records.as_slice()));
        }
    }
}
