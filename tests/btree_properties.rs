//! Property-based tests for the B-tree engine.

use std::collections::BTreeSet;

use pagetree::{BTree, DeleteOutcome, InsertOutcome, NodeId};
use proptest::prelude::*;
use tempfile::tempdir;

fn build_tree(order: usize, keys: &[i64]) -> (BTree, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let mut tree = BTree::create(
        dir.path().join("index.db"),
        dir.path().join("heap.db"),
        order,
    )
    .unwrap();
    for &key in keys {
        let outcome = tree.insert(key, &key.to_le_bytes()).unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted);
    }
    (tree, dir)
}

/// Structural walk: sorted keys, child-count arithmetic, ancestor links,
/// equal leaf depth. The occupancy floor is asserted only when
/// `check_floor` is set (it holds for insert-only workloads).
fn assert_well_formed(tree: &mut BTree, check_floor: bool) {
    let root_id = tree.root_id();
    let mut depths = Vec::new();
    walk(tree, root_id, 0, &mut depths, check_floor);
    assert!(depths.windows(2).all(|w| w[0] == w[1]));
}

fn walk(tree: &mut BTree, id: NodeId, depth: usize, depths: &mut Vec<usize>, check_floor: bool) {
    let node = tree.read_node(id).unwrap();
    assert!(node.keys.windows(2).all(|w| w[0] < w[1]));
    assert!(node.keys.len() <= tree.order());
    if node.is_leaf {
        assert!(node.children.is_empty());
        depths.push(depth);
    } else {
        assert_eq!(node.children.len(), node.keys.len() + 1);
    }
    if check_floor && id != tree.root_id() {
        assert!(node.keys.len() >= tree.order() / 2);
    }
    let children = node.children.clone();
    for child_id in children {
        let child = tree.read_node(child_id).unwrap();
        assert_eq!(child.ancestor, Some(id));
        walk(tree, child_id, depth + 1, depths, check_floor);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any sequence of unique-key inserts traverses in ascending order
    /// with no duplicates, and the tree stays balanced.
    #[test]
    fn prop_inserts_traverse_sorted(
        keys in proptest::collection::btree_set(-500i64..500, 0..120),
        order in 3usize..=6,
    ) {
        // Insert in a deterministic but non-sorted interleaving.
        let keys: Vec<i64> = keys.into_iter().collect();
        let mut shuffled = Vec::with_capacity(keys.len());
        let (mut lo, mut hi) = (0, keys.len());
        while lo < hi {
            hi -= 1;
            shuffled.push(keys[hi]);
            if lo < hi {
                shuffled.push(keys[lo]);
                lo += 1;
            }
        }

        let (mut tree, _dir) = build_tree(order, &shuffled);

        let mut expected = shuffled.clone();
        expected.sort_unstable();
        prop_assert_eq!(tree.traverse().unwrap(), expected);
        assert_well_formed(&mut tree, true);
    }

    /// Inserting a set then deleting every key empties the tree and
    /// restores the single-leaf root.
    #[test]
    fn prop_insert_delete_all_empties(
        keys in proptest::collection::btree_set(-300i64..300, 1..80),
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let (mut tree, _dir) = build_tree(4, &keys);

        for &key in &keys {
            prop_assert_eq!(tree.delete(key).unwrap(), DeleteOutcome::Deleted);
            assert_well_formed(&mut tree, false);
        }

        prop_assert_eq!(tree.traverse().unwrap(), Vec::<i64>::new());
        let root = tree.read_node(tree.root_id()).unwrap();
        prop_assert!(root.is_leaf);
        prop_assert!(root.keys.is_empty());
    }

    /// Deleting an absent key reports a miss and leaves the key sequence
    /// untouched.
    #[test]
    fn prop_delete_missing_is_noop(
        keys in proptest::collection::btree_set(0i64..200, 1..40),
        probe in 200i64..400,
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let (mut tree, _dir) = build_tree(3, &keys);

        let before = tree.traverse().unwrap();
        prop_assert_eq!(tree.delete(probe).unwrap(), DeleteOutcome::KeyNotFound);
        prop_assert_eq!(tree.traverse().unwrap(), before);
    }

    /// Every inserted payload reads back through the index.
    #[test]
    fn prop_lookup_roundtrips_payloads(
        keys in proptest::collection::btree_set(-100i64..100, 1..40),
    ) {
        let keys: Vec<i64> = keys.into_iter().collect();
        let (mut tree, _dir) = build_tree(4, &keys);

        for &key in &keys {
            let payload = tree.lookup(key).unwrap().unwrap();
            prop_assert_eq!(payload, key.to_le_bytes().to_vec());
        }
    }
}

/// The BTreeSet strategy yields sorted keys; make sure delete-all also
/// holds when the build order is adversarially unsorted.
#[test]
fn test_delete_all_after_interleaved_build() {
    let keys: Vec<i64> = (0..60).map(|i| (i * 23) % 60).collect();
    let unique: BTreeSet<i64> = keys.iter().copied().collect();
    assert_eq!(unique.len(), keys.len());

    let (mut tree, _dir) = build_tree(5, &keys);

    let mut ascending: Vec<i64> = unique.into_iter().collect();
    assert_eq!(tree.traverse().unwrap(), ascending.clone());

    for &key in &ascending {
        assert_eq!(tree.delete(key).unwrap(), DeleteOutcome::Deleted);
    }
    ascending.clear();
    assert_eq!(tree.traverse().unwrap(), ascending);
}
