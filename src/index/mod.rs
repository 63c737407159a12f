//! Index structures.
//!
//! - [`bplus_tree`] - Insert-only B+ tree with a leaf chain for range scans

pub mod bplus_tree;

pub use bplus_tree::{BPlusTree, Key, RecordLocator};
