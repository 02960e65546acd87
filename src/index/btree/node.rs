//! B-tree node representation.

use crate::common::{Key, NodeId, Offset};

/// One B-tree node, the in-memory image of one page.
///
/// `keys` and `offsets` are parallel: `offsets[i]` is the heap-file offset
/// of the record inserted under `keys[i]`. Internal nodes carry
/// `keys.len() + 1` children; leaves carry none. `ancestor` is an index
/// into the page store, never an owning reference, so the parent/child
/// cycle of the tree never exists in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// This node's id, which is also its page index.
    pub id: NodeId,
    /// Maximum key count before the node must be rebalanced.
    pub order: usize,
    /// Keys, strictly ascending.
    pub keys: Vec<Key>,
    /// Heap-file offsets, parallel to `keys`.
    pub offsets: Vec<Offset>,
    /// Child node ids; empty for leaves.
    pub children: Vec<NodeId>,
    pub is_leaf: bool,
    /// Id of the parent node, `None` for the root.
    pub ancestor: Option<NodeId>,
}

impl Node {
    /// Create an empty leaf.
    pub fn new_leaf(id: NodeId, order: usize, ancestor: Option<NodeId>) -> Self {
        Self {
            id,
            order,
            keys: Vec::new(),
            offsets: Vec::new(),
            children: Vec::new(),
            is_leaf: true,
            ancestor,
        }
    }

    /// True once the node holds more keys than its order allows.
    #[inline]
    pub fn is_overflowing(&self) -> bool {
        self.keys.len() > self.order
    }

    /// True at or below the occupancy floor (`order / 2`). The root is
    /// exempt; the controller never calls this on it.
    #[inline]
    pub fn is_underflowing(&self) -> bool {
        self.keys.len() <= self.order / 2
    }

    /// Position of `key` in this node, if present.
    pub fn key_position(&self, key: Key) -> Option<usize> {
        let pos = self.keys.partition_point(|&k| k < key);
        (pos < self.keys.len() && self.keys[pos] == key).then_some(pos)
    }

    /// Index of the child to descend into when searching for `key`:
    /// the first position whose key exceeds it, or the last child.
    #[inline]
    pub fn descent_position(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k < key)
    }

    /// Position of `child` in this node's child list, if present.
    pub fn child_position(&self, child: NodeId) -> Option<usize> {
        self.children.iter().position(|&c| c == child)
    }

    /// Insert `(key, offset)` at its sorted position.
    pub fn insert_entry(&mut self, key: Key, offset: Offset) {
        let pos = self.keys.partition_point(|&k| k < key);
        self.keys.insert(pos, key);
        self.offsets.insert(pos, offset);
    }

    /// Remove and return the entry at `index`.
    pub fn remove_entry(&mut self, index: usize) -> (Key, Offset) {
        (self.keys.remove(index), self.offsets.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf_with(keys: Vec<Key>) -> Node {
        let offsets = keys.iter().map(|&k| k as Offset).collect();
        Node {
            id: NodeId::new(1),
            order: 4,
            keys,
            offsets,
            children: vec![],
            is_leaf: true,
            ancestor: Some(NodeId::new(0)),
        }
    }

    #[test]
    fn test_overflow_underflow_thresholds() {
        let node = leaf_with(vec![1, 2, 3, 4, 5]);
        assert!(node.is_overflowing());

        let node = leaf_with(vec![1, 2, 3, 4]);
        assert!(!node.is_overflowing());
        assert!(!node.is_underflowing());

        let node = leaf_with(vec![1, 2]);
        assert!(node.is_underflowing());

        let node = leaf_with(vec![1, 2, 3]);
        assert!(!node.is_underflowing());
    }

    #[test]
    fn test_insert_entry_keeps_order() {
        let mut node = leaf_with(vec![10, 30]);
        node.insert_entry(20, 200);
        assert_eq!(node.keys, vec![10, 20, 30]);
        assert_eq!(node.offsets, vec![10, 200, 30]);

        node.insert_entry(5, 50);
        node.insert_entry(40, 400);
        assert_eq!(node.keys, vec![5, 10, 20, 30, 40]);
    }

    #[test]
    fn test_key_position() {
        let node = leaf_with(vec![-5, 3, 12]);
        assert_eq!(node.key_position(3), Some(1));
        assert_eq!(node.key_position(-5), Some(0));
        assert_eq!(node.key_position(4), None);
    }

    #[test]
    fn test_descent_position() {
        let node = leaf_with(vec![10, 20, 30]);
        assert_eq!(node.descent_position(5), 0);
        assert_eq!(node.descent_position(15), 1);
        assert_eq!(node.descent_position(25), 2);
        assert_eq!(node.descent_position(99), 3);
    }

    #[test]
    fn test_remove_entry() {
        let mut node = leaf_with(vec![1, 2, 3]);
        let (key, offset) = node.remove_entry(1);
        assert_eq!(key, 2);
        assert_eq!(offset, 2);
        assert_eq!(node.keys, vec![1, 3]);
        assert_eq!(node.offsets, vec![1, 3]);
    }
}
