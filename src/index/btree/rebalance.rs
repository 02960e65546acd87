//! Rebalancing algorithms: split, compensation, and merge.
//!
//! Overflow after an insert is resolved by compensation when a sibling has
//! spare capacity, and by splitting otherwise; underflow after a delete by
//! compensation when a sibling can spare a key, and by merging otherwise.
//! Compensation rebalances two siblings through their ancestor separator
//! without changing the shape of the tree, which is why it is attempted
//! before the structural operations.
//!
//! Both cascades terminate: a split stops at the first ancestor that
//! absorbs the promoted key or when a new root is created; a merge walk
//! stops at the root or at the first ancestor that does not underflow.

use crate::common::{Error, Key, NodeId, Offset, Result};

use super::{BTree, Node};

impl BTree {
    /// Insert `(key, offset)` into a leaf found by search, then resolve
    /// any overflow.
    pub(super) fn insert_into_leaf(
        &mut self,
        mut leaf: Node,
        key: Key,
        offset: Offset,
    ) -> Result<()> {
        leaf.insert_entry(key, offset);

        if !leaf.is_overflowing() {
            return self.pages.write_node(&leaf);
        }
        if self.try_compensate_overflow(&mut leaf)? {
            return Ok(());
        }
        self.split(leaf)
    }

    /// Try to resolve overflow by redistributing with a sibling.
    ///
    /// The right sibling is preferred, then the left; either qualifies
    /// when it has spare capacity. Returns false when the node is the root
    /// or no sibling qualifies.
    fn try_compensate_overflow(&mut self, node: &mut Node) -> Result<bool> {
        let Some(ancestor_id) = node.ancestor else {
            return Ok(false);
        };
        let mut ancestor = self.pages.read_node(ancestor_id)?;
        let pos = self.position_under(&ancestor, node.id)?;

        if pos + 1 < ancestor.children.len() {
            let mut right = self.pages.read_node(ancestor.children[pos + 1])?;
            if right.keys.len() < self.order {
                self.redistribute(node, &mut right, &mut ancestor, pos, self.order)?;
                return Ok(true);
            }
        }
        if pos > 0 {
            let mut left = self.pages.read_node(ancestor.children[pos - 1])?;
            if left.keys.len() < self.order {
                self.redistribute(&mut left, node, &mut ancestor, pos - 1, self.order)?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Redistribute the combined entries of two adjacent siblings and
    /// their ancestor separator.
    ///
    /// The combined ascending sequence (left entries, separator, right
    /// entries) is cut at `split_index`: the left node keeps `split_index`
    /// keys, the key at that index becomes the new separator, and the
    /// right node takes the remainder. Children are cut at
    /// `split_index + 1` and any child that changed sides is reparented.
    /// Persists both siblings and the ancestor.
    fn redistribute(
        &mut self,
        left: &mut Node,
        right: &mut Node,
        ancestor: &mut Node,
        separator: usize,
        split_index: usize,
    ) -> Result<()> {
        let mut keys = Vec::with_capacity(left.keys.len() + right.keys.len() + 1);
        let mut offsets = Vec::with_capacity(keys.capacity());
        let mut children = Vec::with_capacity(left.children.len() + right.children.len());

        keys.append(&mut left.keys);
        offsets.append(&mut left.offsets);
        children.append(&mut left.children);
        keys.push(ancestor.keys[separator]);
        offsets.push(ancestor.offsets[separator]);
        keys.append(&mut right.keys);
        offsets.append(&mut right.offsets);
        children.append(&mut right.children);

        right.keys = keys.split_off(split_index + 1);
        right.offsets = offsets.split_off(split_index + 1);
        ancestor.keys[separator] = keys[split_index];
        ancestor.offsets[separator] = offsets[split_index];
        keys.truncate(split_index);
        offsets.truncate(split_index);
        left.keys = keys;
        left.offsets = offsets;

        if !left.is_leaf {
            right.children = children.split_off(split_index + 1);
            left.children = children;
            self.reparent(&left.children, left.id)?;
            self.reparent(&right.children, right.id)?;
        }

        self.pages.write_node(left)?;
        self.pages.write_node(right)?;
        self.pages.write_node(ancestor)
    }

    /// Split an overflowing node at its middle key, promoting the middle
    /// entry into the ancestor; recurses while the promotion overflows the
    /// ancestor in turn. Writes the node once it no longer overflows.
    fn split(&mut self, mut node: Node) -> Result<()> {
        if !node.is_overflowing() {
            return self.pages.write_node(&node);
        }

        let middle = node.keys.len() / 2;
        let new_id = self.allocate_id();

        let upper_keys = node.keys.split_off(middle + 1);
        let upper_offsets = node.offsets.split_off(middle + 1);
        let middle_key = node.keys.remove(middle);
        let middle_offset = node.offsets.remove(middle);

        let mut new_node = Node {
            id: new_id,
            order: self.order,
            keys: upper_keys,
            offsets: upper_offsets,
            children: Vec::new(),
            is_leaf: node.is_leaf,
            ancestor: node.ancestor,
        };
        if !node.is_leaf {
            new_node.children = node.children.split_off(middle + 1);
            self.reparent(&new_node.children, new_id)?;
        }

        match node.ancestor {
            None => {
                // Root split: the tree grows one level.
                let root_id = self.allocate_id();
                node.ancestor = Some(root_id);
                new_node.ancestor = Some(root_id);
                let new_root = Node {
                    id: root_id,
                    order: self.order,
                    keys: vec![middle_key],
                    offsets: vec![middle_offset],
                    children: vec![node.id, new_node.id],
                    is_leaf: false,
                    ancestor: None,
                };
                self.root = root_id;
                self.pages.write_node(&node)?;
                self.pages.write_node(&new_node)?;
                self.pages.write_node(&new_root)
            }
            Some(ancestor_id) => {
                let mut ancestor = self.pages.read_node(ancestor_id)?;
                let pos = self.position_under(&ancestor, node.id)?;
                ancestor.keys.insert(pos, middle_key);
                ancestor.offsets.insert(pos, middle_offset);
                ancestor.children.insert(pos + 1, new_node.id);

                self.pages.write_node(&node)?;
                self.pages.write_node(&new_node)?;
                self.split(ancestor)
            }
        }
    }

    /// Resolve underflow at `id`, walking up the ancestor chain.
    ///
    /// Each level tries compensation first (a sibling donates through the
    /// separator), then merges with a neighbor small enough to absorb.
    /// Compensation ends the walk; a merge shrinks the ancestor, so the
    /// check recurses on it. The root is exempt from the occupancy floor.
    pub(super) fn compensate_and_merge(&mut self, id: NodeId) -> Result<()> {
        let node = self.pages.read_node(id)?;
        if node.id == self.root {
            return Ok(());
        }
        let Some(ancestor_id) = node.ancestor else {
            return Ok(());
        };
        if !node.is_underflowing() {
            return Ok(());
        }

        let mut node = node;
        let mut ancestor = self.pages.read_node(ancestor_id)?;
        let pos = self.position_under(&ancestor, node.id)?;

        // A donor sibling must stay above the floor itself: more than
        // order/2 keys, and a combined count that still exceeds the order.
        let floor = self.order / 2;
        if pos + 1 < ancestor.children.len() {
            let mut right = self.pages.read_node(ancestor.children[pos + 1])?;
            if right.keys.len() > floor && right.keys.len() + node.keys.len() > self.order {
                let split = delete_split_index(self.order);
                self.redistribute(&mut node, &mut right, &mut ancestor, pos, split)?;
                return Ok(());
            }
        }
        if pos > 0 {
            let mut left = self.pages.read_node(ancestor.children[pos - 1])?;
            if left.keys.len() > floor && left.keys.len() + node.keys.len() > self.order {
                let split = delete_split_index(self.order);
                self.redistribute(&mut left, &mut node, &mut ancestor, pos - 1, split)?;
                return Ok(());
            }
        }

        // No donor: merge with a neighbor whose combined count stays
        // below the order. Left neighbor preferred. With no qualifying
        // neighbor (or none at all, for a sole child) this level is left
        // as is and the walk continues upward.
        let mut merged_into_root = false;
        let left = if pos > 0 {
            Some(self.pages.read_node(ancestor.children[pos - 1])?)
        } else {
            None
        };
        if let Some(left) = left.filter(|l| l.keys.len() + node.keys.len() < self.order) {
            merged_into_root = self.merge(left, node, ancestor, pos - 1)?;
        } else if pos + 1 < ancestor.children.len() {
            let right = self.pages.read_node(ancestor.children[pos + 1])?;
            if right.keys.len() + node.keys.len() < self.order {
                merged_into_root = self.merge(node, right, ancestor, pos)?;
            }
        }

        if merged_into_root {
            return Ok(());
        }
        self.compensate_and_merge(ancestor_id)
    }

    /// Merge `right` into `left` through the separator at `separator` in
    /// their shared ancestor, retiring `right`'s page.
    ///
    /// When the ancestor is the root and ends up keyless, `left` is
    /// promoted to root and the old root's page is retired too. Returns
    /// true in that case, ending the merge walk.
    fn merge(
        &mut self,
        mut left: Node,
        mut right: Node,
        mut ancestor: Node,
        separator: usize,
    ) -> Result<bool> {
        left.keys.push(ancestor.keys[separator]);
        left.offsets.push(ancestor.offsets[separator]);
        left.keys.append(&mut right.keys);
        left.offsets.append(&mut right.offsets);

        let absorbed = std::mem::take(&mut right.children);
        self.reparent(&absorbed, left.id)?;
        left.children.extend(absorbed);

        ancestor.keys.remove(separator);
        ancestor.offsets.remove(separator);
        let right_pos = self.position_under(&ancestor, right.id)?;
        ancestor.children.remove(right_pos);
        self.pages.delete_node(right.id)?;

        if ancestor.id == self.root && ancestor.keys.is_empty() {
            // The root emptied: promote the merged node.
            left.ancestor = None;
            self.root = left.id;
            self.pages.write_node(&left)?;
            self.pages.delete_node(ancestor.id)?;
            return Ok(true);
        }

        self.pages.write_node(&left)?;
        self.pages.write_node(&ancestor)?;
        Ok(false)
    }

    /// Rewrite the ancestor link of each of `children` to `ancestor_id`,
    /// persisting the ones that actually changed.
    fn reparent(&mut self, children: &[NodeId], ancestor_id: NodeId) -> Result<()> {
        for &child_id in children {
            let mut child = self.pages.read_node(child_id)?;
            if child.ancestor != Some(ancestor_id) {
                child.ancestor = Some(ancestor_id);
                self.pages.write_node(&child)?;
            }
        }
        Ok(())
    }

    /// Position of `child` among `ancestor`'s children, as a structural
    /// check: a missing link means the page graph is inconsistent.
    fn position_under(&self, ancestor: &Node, child: NodeId) -> Result<usize> {
        ancestor.child_position(child).ok_or(Error::CorruptPage {
            id: ancestor.id.0,
            reason: format!("child {child} not linked under ancestor"),
        })
    }
}

/// Split index for delete-side compensation: `order / 2`, rounded up to
/// the next even index for parity between the two sides.
fn delete_split_index(order: usize) -> usize {
    let split = order / 2;
    if split % 2 == 1 {
        split + 1
    } else {
        split
    }
}
