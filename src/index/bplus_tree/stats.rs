//! Tree operation statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters tracked by a [`BPlusTree`](super::BPlusTree).
///
/// All fields are atomic so read-only operations (lookups, scans) can
/// count through a shared reference, including from several threads
/// holding a [`SharedTree`](super::SharedTree) read lock.
///
/// # Memory Ordering
/// `Ordering::Relaxed` everywhere: counters are independent and only
/// need atomicity.
#[derive(Debug, Default)]
pub struct TreeStats {
    /// Calls to `insert` that passed validation.
    pub inserts: AtomicU64,

    /// Inserts whose key already existed; the locator was appended.
    pub appends: AtomicU64,

    pub leaf_splits: AtomicU64,

    pub internal_splits: AtomicU64,

    /// Times the tree grew a level.
    pub root_splits: AtomicU64,

    pub point_lookups: AtomicU64,

    pub range_scans: AtomicU64,

    /// Leaves visited by range scans, including the starting leaf.
    pub leaves_scanned: AtomicU64,
}

impl TreeStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_append(&self) {
        self.appends.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_leaf_split(&self) {
        self.leaf_splits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_internal_split(&self) {
        self.internal_splits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_root_split(&self) {
        self.root_splits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_point_lookup(&self) {
        self.point_lookups.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_range_scan(&self) {
        self.range_scans.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_leaf_scanned(&self) {
        self.leaves_scanned.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            inserts: self.inserts.load(Ordering::Relaxed),
            appends: self.appends.load(Ordering::Relaxed),
            leaf_splits: self.leaf_splits.load(Ordering::Relaxed),
            internal_splits: self.internal_splits.load(Ordering::Relaxed),
            root_splits: self.root_splits.load(Ordering::Relaxed),
            point_lookups: self.point_lookups.load(Ordering::Relaxed),
            range_scans: self.range_scans.load(Ordering::Relaxed),
            leaves_scanned: self.leaves_scanned.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.inserts.store(0, Ordering::Relaxed);
        self.appends.store(0, Ordering::Relaxed);
        self.leaf_splits.store(0, Ordering::Relaxed);
        self.internal_splits.store(0, Ordering::Relaxed);
        self.root_splits.store(0, Ordering::Relaxed);
        self.point_lookups.store(0, Ordering::Relaxed);
        self.range_scans.store(0, Ordering::Relaxed);
        self.leaves_scanned.store(0, Ordering::Relaxed);
    }

    /// Emit current statistics as a tracing event.
    pub fn emit_tracing(&self) {
        let snapshot = self.snapshot();
        tracing::info!(
            target: "bplusidx::stats",
            inserts = snapshot.inserts,
            appends = snapshot.appends,
            leaf_splits = snapshot.leaf_splits,
            internal_splits = snapshot.internal_splits,
            root_splits = snapshot.root_splits,
            point_lookups = snapshot.point_lookups,
            range_scans = snapshot.range_scans,
            leaves_scanned = snapshot.leaves_scanned,
            "tree stats snapshot"
        );
    }
}

/// A point-in-time snapshot of tree statistics.
///
/// Unlike `TreeStats`, this is not atomic and can be safely
/// printed, compared, etc.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub inserts: u64,
    pub appends: u64,
    pub leaf_splits: u64,
    pub internal_splits: u64,
    pub root_splits: u64,
    pub point_lookups: u64,
    pub range_scans: u64,
    pub leaves_scanned: u64,
}

impl StatsSnapshot {
    /// Average number of leaves a range scan touched (0.0 with no scans).
    pub fn leaves_per_scan(&self) -> f64 {
        if self.range_scans == 0 {
            0.0
        } else {
            self.leaves_scanned as f64 / self.range_scans as f64
        }
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tree Statistics:")?;
        writeln!(
            f,
            "  Inserts:       {} ({} appended to existing keys)",
            self.inserts, self.appends
        )?;
        writeln!(
            f,
            "  Splits:        {} leaf, {} internal, {} root",
            self.leaf_splits, self.internal_splits, self.root_splits
        )?;
        writeln!(f, "  Point lookups: {}", self.point_lookups)?;
        write!(
            f,
            "  Range scans:   {} ({:.2} leaves/scan)",
            self.range_scans,
            self.leaves_per_scan()
        )
    }
}
