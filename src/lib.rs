//! bplusidx - an in-memory B+ tree index over float keys.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           bplusidx                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │         SharedTree  (RwLock: one writer / N readers)    │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │            BPlusTree (index/bplus_tree/)                 │   │
//! │  │   insert → preemptive split │ search │ range → leaf chain│   │
//! │  │         NodeArena + codec (depth-first image)            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │             whole-file image read/write                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeId, Error, config)
//! - [`index`] - The B+ tree and its supporting types
//! - [`storage`] - Image file I/O
//!
//! # Quick Start
//! ```no_run
//! use bplusidx::BPlusTree;
//!
//! let mut tree = BPlusTree::new();
//! tree.insert(0.61, 12).unwrap();
//! tree.insert(0.75, 40).unwrap();
//!
//! let hits = tree.range_query(0.6, 0.8);
//! assert_eq!(hits, vec![12, 40]);
//!
//! tree.serialize_to_file("index.bpt").unwrap();
//! let reloaded = BPlusTree::deserialize_from_file("index.bpt").unwrap();
//! assert_eq!(reloaded.range_query(0.6, 0.8), hits);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::{MAX_KEYS, ORDER};
pub use common::{CorruptKind, Error, NodeId, Result};

pub use index::bplus_tree::{
    BPlusTree, Key, Node, RangeIter, RecordLocator, SharedTree, StatsSnapshot, TreeStats,
};
