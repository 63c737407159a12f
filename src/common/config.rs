//! Configuration constants for bplusidx.

/// Maximum number of children of an internal node.
///
/// The tree is fixed at order 5, which bounds every node at
/// `ORDER - 1 = 4` keys once an operation completes.
pub const ORDER: usize = 5;

/// Maximum number of keys held by any node.
pub const MAX_KEYS: usize = ORDER - 1;

/// Maximum nesting accepted when decoding a tree image.
///
/// Every internal node has at least two children, so a balanced tree of
/// this height could address more leaves than any image can hold. Deeper
/// input can only come from a corrupt file.
pub const MAX_DEPTH: usize = 64;

/// Node flag byte marking a leaf in the binary image.
pub const LEAF_FLAG: u8 = 1;

/// Node flag byte marking an internal node in the binary image.
pub const INTERNAL_FLAG: u8 = 0;
