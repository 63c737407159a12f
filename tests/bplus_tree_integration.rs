//! Integration tests for the B+ tree.
//!
//! These tests cover persistence through real files and whole-tree
//! structural checks that unit tests don't cover.

use bplusidx::{BPlusTree, CorruptKind, Error, NodeId, SharedTree, MAX_KEYS};
use std::fs;
use tempfile::tempdir;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Check every structural invariant reachable from the root.
///
/// Returns the depth of the leaves below `id`.
fn check_subtree(tree: &BPlusTree, id: NodeId, lower: Option<f32>, upper: Option<f32>) -> usize {
    let node = tree.node(id).unwrap();
    let keys = node.keys();

    assert!(keys.len() <= MAX_KEYS, "{id} holds {} keys", keys.len());
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "{id} keys unsorted");
    for &key in keys {
        assert!(lower.map_or(true, |lo| key >= lo), "{id} key {key} below range");
        assert!(upper.map_or(true, |hi| key < hi), "{id} key {key} above range");
    }

    if node.is_leaf() {
        assert_eq!(node.records().len(), keys.len());
        assert!(node.records().iter().all(|list| !list.is_empty()));
        return 1;
    }

    let children = node.children();
    assert_eq!(children.len(), keys.len() + 1, "{id} child count");
    let depths: Vec<usize> = children
        .iter()
        .enumerate()
        .map(|(i, &child)| {
            let lo = if i == 0 { lower } else { Some(keys[i - 1]) };
            let hi = keys.get(i).copied().or(upper);
            check_subtree(tree, child, lo, hi)
        })
        .collect();
    assert!(depths.windows(2).all(|w| w[0] == w[1]), "{id} unbalanced");
    depths[0] + 1
}

fn check_invariants(tree: &BPlusTree) {
    let depth = check_subtree(tree, tree.root_id(), None, None);
    assert_eq!(depth as u32, tree.height());

    let keys = tree.leaf_keys();
    assert!(keys.windows(2).all(|w| w[0] < w[1]), "leaf chain out of order");
}

/// Deterministic pseudo-random keys in [0, 1) with two decimals, so
/// duplicates occur.
fn sample_keys(n: usize) -> Vec<f32> {
    let mut state: u32 = 0x2545_F491;
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 100) as f32 / 100.0
        })
        .collect()
}

fn build(keys: &[f32]) -> BPlusTree {
    let mut tree = BPlusTree::new();
    for (i, &key) in keys.iter().enumerate() {
        tree.insert(key, i as u32).unwrap();
    }
    tree
}

#[test]
fn test_invariants_hold_after_many_inserts() {
    let keys = sample_keys(2_000);
    let tree = build(&keys);

    check_invariants(&tree);

    let mut distinct = keys.clone();
    distinct.sort_by(f32::total_cmp);
    distinct.dedup();
    assert_eq!(tree.leaf_keys(), distinct);
    assert_eq!(tree.len(), distinct.len());
}

#[test]
fn test_locators_keep_insertion_order() {
    let keys = sample_keys(500);
    let tree = build(&keys);

    for &key in &keys {
        let expected: Vec<u32> = keys
            .iter()
            .enumerate()
            .filter(|(_, &k)| k == key)
            .map(|(i, _)| i as u32)
            .collect();
        assert_eq!(tree.search(key).unwrap(), expected.as_slice());
    }
}

#[test]
fn test_file_round_trip() {
    init_tracing();
    let dir = tempdir().unwrap();
    let path = dir.path().join("tree.bpt");

    let tree = build(&sample_keys(1_000));
    tree.serialize_to_file(&path).unwrap();
    assert_eq!(fs::metadata(&path).unwrap().len() as usize, tree.serialized_len());

    let loaded = BPlusTree::deserialize_from_file(&path).unwrap();
    check_invariants(&loaded);
    assert_eq!(loaded.node_count(), tree.node_count());
    assert_eq!(loaded.height(), tree.height());

    let original: Vec<(f32, Vec<u32>)> = tree.iter().map(|(k, l)| (k, l.to_vec())).collect();
    let reloaded: Vec<(f32, Vec<u32>)> = loaded.iter().map(|(k, l)| (k, l.to_vec())).collect();
    assert_eq!(original, reloaded);

    let chain = |t: &BPlusTree| -> Vec<Vec<f32>> {
        t.leaves().map(|id| t.node(id).unwrap().keys().to_vec()).collect()
    };
    assert_eq!(chain(&loaded), chain(&tree));
}

#[test]
fn test_range_query_after_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tree.bpt");

    let keys = sample_keys(800);
    build(&keys).serialize_to_file(&path).unwrap();
    let loaded = BPlusTree::deserialize_from_file(&path).unwrap();

    let mut expected: Vec<(f32, u32)> = keys
        .iter()
        .enumerate()
        .filter(|(_, &k)| (0.6..=0.8).contains(&k))
        .map(|(i, &k)| (k, i as u32))
        .collect();
    expected.sort_by(|a, b| a.0.total_cmp(&b.0));
    let expected: Vec<u32> = expected.into_iter().map(|(_, loc)| loc).collect();

    assert_eq!(loaded.range_query(0.6, 0.8), expected);
}

#[test]
fn test_failed_load_leaves_tree_untouched() {
    init_tracing();
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.bpt");
    let bad = dir.path().join("bad.bpt");

    let mut tree = build(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let before = tree.serialize();

    let mut corrupt = build(&[10.0, 20.0, 30.0, 40.0, 50.0]).serialize();
    corrupt.truncate(corrupt.len() - 2);
    fs::write(&bad, &corrupt).unwrap();

    let err = tree.load_from_file(&bad).unwrap_err();
    assert_eq!(err.corrupt_kind(), Some(CorruptKind::UnexpectedEof));
    assert_eq!(tree.serialize(), before);

    let missing = dir.path().join("missing.bpt");
    assert!(matches!(tree.load_from_file(&missing), Err(Error::Io(_))));
    assert_eq!(tree.serialize(), before);

    build(&[7.0]).serialize_to_file(&good).unwrap();
    tree.load_from_file(&good).unwrap();
    assert_eq!(tree.leaf_keys(), vec![7.0]);
}

#[test]
fn test_zero_key_node_is_corrupt() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("zero.bpt");

    // Internal root over an empty leaf.
    let mut image = vec![0u8];
    image.extend_from_slice(&1u32.to_le_bytes());
    image.extend_from_slice(&5.0f32.to_le_bytes());
    image.push(1);
    image.extend_from_slice(&0u32.to_le_bytes());
    fs::write(&path, &image).unwrap();

    let err = BPlusTree::deserialize_from_file(&path).unwrap_err();
    assert_eq!(err.corrupt_kind(), Some(CorruptKind::InvalidKeyCount(0)));
}

#[test]
fn test_load_image_with_separator_duplicate_in_left_leaf() {
    // Internal[3.0] over Leaf[1.0, 2.0, 3.0] and Leaf[3.0, 4.0]: the second
    // insert of 3.0 landed left of the promoted separator.
    let mut image = vec![0u8];
    image.extend_from_slice(&1u32.to_le_bytes());
    image.extend_from_slice(&3.0f32.to_le_bytes());
    for (keys, lists) in [
        (&[1.0f32, 2.0, 3.0][..], &[1u32, 2, 5][..]),
        (&[3.0, 4.0][..], &[3, 4][..]),
    ] {
        image.push(1);
        image.extend_from_slice(&(keys.len() as u32).to_le_bytes());
        for key in keys {
            image.extend_from_slice(&key.to_le_bytes());
        }
        for loc in lists {
            image.extend_from_slice(&1u32.to_le_bytes());
            image.extend_from_slice(&loc.to_le_bytes());
        }
    }

    let mut tree = BPlusTree::deserialize(&image).unwrap();
    assert_eq!(tree.leaf_keys(), vec![1.0, 2.0, 3.0, 3.0, 4.0]);
    assert_eq!(tree.range_query(3.0, 3.0), vec![5, 3]);
    assert_eq!(tree.range_query(0.0, 10.0), vec![1, 2, 5, 3, 4]);
    assert_eq!(tree.search(3.0), Some(&[3][..]));
    assert_eq!(tree.serialize(), image);

    tree.insert(3.0, 6).unwrap();
    assert_eq!(tree.search(3.0), Some(&[3, 6][..]));
}

#[test]
fn test_shared_tree_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.bpt");

    let source = SharedTree::new();
    for i in 0..100u32 {
        source.insert(i as f32 / 10.0, i).unwrap();
    }
    source.save_to_file(&path).unwrap();

    let target = SharedTree::new();
    target.insert(99.0, 1).unwrap();
    target.load_from_file(&path).unwrap();

    assert_eq!(target.len(), 100);
    assert_eq!(target.search(99.0), None);
    assert_eq!(target.range_query(0.0, 0.35), vec![0, 1, 2, 3]);
    target.with_read(check_invariants);

    fs::write(&path, b"garbage").unwrap();
    assert!(target.load_from_file(&path).is_err());
    assert_eq!(target.len(), 100);
}

#[test]
fn test_stats_track_operations() {
    let mut tree = BPlusTree::new();
    for i in 0..10u32 {
        tree.insert(i as f32, i).unwrap();
    }
    tree.insert(3.0, 33).unwrap();
    tree.search(3.0);
    let _ = tree.range_query(0.0, 9.0);

    let stats = tree.stats();
    assert_eq!(stats.inserts, 11);
    assert_eq!(stats.appends, 1);
    assert_eq!(stats.point_lookups, 1);
    assert_eq!(stats.range_scans, 1);
    assert_eq!(stats.leaves_scanned as usize, tree.leaves().count());
    assert!(stats.leaf_splits >= 1);
    tree.stats_tracker().emit_tracing();
}
