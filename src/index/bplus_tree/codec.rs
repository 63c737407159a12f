//! Binary image of a tree.
//!
//! # Layout
//! Little-endian, one node after another in depth-first pre-order:
//! ```text
//! Node         := flag(u8) num_keys(u32) key(f32){num_keys} body
//! body (leaf)  := record_list{num_keys}
//! record_list  := num_records(u32) locator(u32){num_records}
//! body (inner) := Node{num_keys + 1}
//! ```
//! Flag `1` marks a leaf, `0` an internal node. Leaf links are not stored;
//! decoding reports leaves in left-to-right order so the caller can relink
//! them.
//!
//! An empty tree is written as a root leaf with zero keys. That is the
//! only place a zero key count is accepted.

use crate::common::config::{INTERNAL_FLAG, LEAF_FLAG, MAX_DEPTH, MAX_KEYS};
use crate::common::{CorruptKind, Error, NodeId, Result};

use super::node::{Node, NodeArena};
use super::{Key, RecordLocator};

const FLAG_SIZE: usize = 1;
const COUNT_SIZE: usize = 4;
const KEY_SIZE: usize = 4;
const LOCATOR_SIZE: usize = 4;

/// Encode the subtree rooted at `root`.
pub(crate) fn encode(arena: &NodeArena, root: NodeId) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(arena, root));
    encode_node(arena, root, &mut out);
    out
}

/// Exact size in bytes of the image of the subtree rooted at `id`.
pub(crate) fn encoded_len(arena: &NodeArena, id: NodeId) -> usize {
    let node = arena.get(id);
    let header = FLAG_SIZE + COUNT_SIZE + node.keys().len() * KEY_SIZE;
    let body: usize = if node.is_leaf() {
        node.records()
            .iter()
            .map(|list| COUNT_SIZE + list.len() * LOCATOR_SIZE)
            .sum()
    } else {
        node.children()
            .iter()
            .map(|&child| encoded_len(arena, child))
            .sum()
    };
    header + body
}

fn encode_node(arena: &NodeArena, id: NodeId, out: &mut Vec<u8>) {
    let node = arena.get(id);
    out.push(if node.is_leaf() { LEAF_FLAG } else { INTERNAL_FLAG });
    out.extend_from_slice(&(node.keys().len() as u32).to_le_bytes());
    for key in node.keys() {
        out.extend_from_slice(&key.to_le_bytes());
    }

    if node.is_leaf() {
        for list in node.records() {
            out.extend_from_slice(&(list.len() as u32).to_le_bytes());
            for locator in list {
                out.extend_from_slice(&locator.to_le_bytes());
            }
        }
    } else {
        for &child in node.children() {
            encode_node(arena, child, out);
        }
    }
}

/// A fully decoded image.
#[derive(Debug)]
pub(crate) struct Decoded {
    pub arena: NodeArena,
    pub root: NodeId,
    /// Leaves in left-to-right order, not yet linked.
    pub leaves: Vec<NodeId>,
}

/// Decode a complete image.
///
/// Either the whole input decodes into a valid tree or an
/// [`Error::Corrupt`] is returned; nothing partial escapes.
pub(crate) fn decode(input: &[u8]) -> Result<Decoded> {
    let mut decoder = Decoder {
        input,
        pos: 0,
        arena: NodeArena::new(),
        leaves: Vec::new(),
        leaf_depth: None,
    };

    let root = decoder.read_node(0, None, None)?;
    let trailing = input.len() - decoder.pos;
    if trailing != 0 {
        return Err(Error::corrupt(
            decoder.pos,
            CorruptKind::TrailingBytes(trailing),
        ));
    }

    Ok(Decoded {
        arena: decoder.arena,
        root,
        leaves: decoder.leaves,
    })
}

struct Decoder<'a> {
    input: &'a [u8],
    pos: usize,
    arena: NodeArena,
    leaves: Vec<NodeId>,
    /// Depth of the first leaf seen; every other leaf must match it.
    leaf_depth: Option<usize>,
}

impl Decoder<'_> {
    fn take(&mut self, len: usize) -> Result<&[u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.input.len())
            .ok_or_else(|| Error::corrupt(self.pos, CorruptKind::UnexpectedEof))?;
        let bytes = &self.input[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(f32::from_le_bytes(buf))
    }

    /// Read one node and its subtree.
    ///
    /// Every key must fall in `[lower, upper]`, the range the parent's
    /// separators assign to this subtree. The upper bound is inclusive:
    /// images may hold a duplicate of a separator at the upper edge of
    /// the left subtree.
    fn read_node(&mut self, depth: usize, lower: Option<Key>, upper: Option<Key>) -> Result<NodeId> {
        if depth >= MAX_DEPTH {
            return Err(Error::corrupt(self.pos, CorruptKind::TooDeep(MAX_DEPTH)));
        }

        let flag_at = self.pos;
        let is_leaf = match self.read_u8()? {
            LEAF_FLAG => true,
            INTERNAL_FLAG => false,
            other => return Err(Error::corrupt(flag_at, CorruptKind::InvalidFlag(other))),
        };

        let count_at = self.pos;
        let count = self.read_u32()?;
        let empty_root = depth == 0 && is_leaf && count == 0;
        if (count == 0 && !empty_root) || count as usize > MAX_KEYS {
            return Err(Error::corrupt(count_at, CorruptKind::InvalidKeyCount(count)));
        }

        let keys = self.read_keys(count as usize, lower, upper)?;

        if is_leaf {
            self.read_leaf_body(depth, keys)
        } else {
            // Allocated before its children so ids follow image order.
            let separators = keys.clone();
            let id = self.arena.alloc(Node::internal(keys, Vec::new()));
            let mut children = Vec::with_capacity(separators.len() + 1);
            for i in 0..=separators.len() {
                let child_lower = if i == 0 { lower } else { Some(separators[i - 1]) };
                let child_upper = separators.get(i).copied().or(upper);
                children.push(self.read_node(depth + 1, child_lower, child_upper)?);
            }
            self.arena.set_children(id, children);
            Ok(id)
        }
    }

    fn read_keys(&mut self, count: usize, lower: Option<Key>, upper: Option<Key>) -> Result<Vec<Key>> {
        let mut keys: Vec<Key> = Vec::with_capacity(count);
        for _ in 0..count {
            let key_at = self.pos;
            let key = self.read_f32()?;
            if key.is_nan() {
                return Err(Error::corrupt(key_at, CorruptKind::NanKey));
            }
            if keys.last().is_some_and(|&prev| key <= prev) {
                return Err(Error::corrupt(key_at, CorruptKind::UnsortedKeys));
            }
            let below = lower.is_some_and(|lo| key < lo);
            let above = upper.is_some_and(|hi| key > hi);
            if below || above {
                return Err(Error::corrupt(key_at, CorruptKind::KeyOutOfRange));
            }
            keys.push(key);
        }
        Ok(keys)
    }

    fn read_leaf_body(&mut self, depth: usize, keys: Vec<Key>) -> Result<NodeId> {
        match self.leaf_depth {
            None => self.leaf_depth = Some(depth),
            Some(expected) if expected != depth => {
                return Err(Error::corrupt(
                    self.pos,
                    CorruptKind::UnbalancedLeaf {
                        expected,
                        found: depth,
                    },
                ));
            }
            Some(_) => {}
        }

        let mut records = Vec::with_capacity(keys.len());
        for _ in 0..keys.len() {
            let count_at = self.pos;
            let count = self.read_u32()? as usize;
            if count == 0 {
                return Err(Error::corrupt(count_at, CorruptKind::EmptyRecordList));
            }
            // Bounds the allocation below by the bytes actually present.
            let needed = count.checked_mul(LOCATOR_SIZE);
            if needed.map_or(true, |n| n > self.input.len() - self.pos) {
                return Err(Error::corrupt(self.pos, CorruptKind::UnexpectedEof));
            }
            let mut list: Vec<RecordLocator> = Vec::with_capacity(count);
            for _ in 0..count {
                list.push(self.read_u32()?);
            }
            records.push(list);
        }

        let id = self.arena.alloc(Node::leaf(keys, records));
        self.leaves.push(id);
        Ok(id)
    }
}
