//! B+ tree index over `f32` keys.
//!
//! # Components
//! - [`BPlusTree`] - Root management, lookups, range scans, persistence
//! - [`Node`] - Read-only view of a leaf or internal node
//! - [`RangeIter`] - Ordered walk along the leaf chain
//! - [`SharedTree`] - Reader-writer locked handle for concurrent callers
//! - [`TreeStats`] / [`StatsSnapshot`] - Operation counters

mod codec;
mod iter;
mod node;
mod shared;
mod stats;
mod tree;

pub use iter::RangeIter;
pub use node::Node;
pub use shared::SharedTree;
pub use stats::{StatsSnapshot, TreeStats};
pub use tree::BPlusTree;

/// Index key. Compared with exact floating-point equality; NaN is rejected.
pub type Key = f32;

/// Opaque identifier of a record in external storage.
pub type RecordLocator = u32;
