//! B-tree controller.
//!
//! [`BTree`] owns the page store and the heap file, holds the root id and
//! the node-id allocator, and drives the rebalancing algorithms in
//! [`rebalance`]. Every operation resolves nodes through page-store reads
//! and persists every node it mutates before returning; no page is cached
//! across calls.
//!
//! # Ownership
//! One `BTree` owns its two files for its lifetime. The engine is
//! single-threaded and fully blocking; `&mut self` on every operation
//! enforces the one-active-caller model at compile time. Sharing the
//! underlying files between controllers is unsupported.

mod node;
mod rebalance;

pub use node::Node;

use std::fmt::Write as _;
use std::path::Path;

use crate::common::config::{MAX_ORDER, MIN_ORDER};
use crate::common::{Error, Key, NodeId, Offset, Result};
use crate::storage::{HeapFile, IoStats, PageStore};

/// Outcome of a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    Found,
    NotFound,
}

/// Outcome of an insert. A duplicate key is a reported no-op, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
}

/// Outcome of a delete. A miss is a reported outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    KeyNotFound,
}

/// A disk-backed B-tree index over an append-only heap file.
pub struct BTree {
    pages: PageStore,
    heap: HeapFile,
    root: NodeId,
    order: usize,
    next_id: u32,
}

impl BTree {
    /// Create a new empty tree: a fresh index file whose only page is an
    /// empty leaf root, and a fresh heap file.
    ///
    /// # Errors
    /// `InvalidOrder` unless `MIN_ORDER <= order <= MAX_ORDER`; I/O errors
    /// if either file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(index_path: P, heap_path: P, order: usize) -> Result<Self> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&order) {
            return Err(Error::InvalidOrder(order));
        }

        let pages = PageStore::create(index_path)?;
        let heap = HeapFile::create(heap_path)?;
        let mut tree = Self {
            pages,
            heap,
            root: NodeId::new(0),
            order,
            next_id: 0,
        };

        let root_id = tree.allocate_id();
        tree.root = root_id;
        let root = Node::new_leaf(root_id, order, None);
        tree.pages.write_node(&root)?;

        Ok(tree)
    }

    /// Rebuild an index over an existing heap file.
    ///
    /// Creates a fresh index file, scans the heap, and re-inserts every
    /// valid record's key at its already-known offset, skipping the heap
    /// writes an ordinary insert would perform. Tombstoned records are
    /// skipped.
    pub fn rebuild<P: AsRef<Path>>(index_path: P, heap_path: P, order: usize) -> Result<Self> {
        if !(MIN_ORDER..=MAX_ORDER).contains(&order) {
            return Err(Error::InvalidOrder(order));
        }

        let pages = PageStore::create(index_path)?;
        let mut heap = HeapFile::open(heap_path)?;
        let records = heap.scan()?;

        let mut tree = Self {
            pages,
            heap,
            root: NodeId::new(0),
            order,
            next_id: 0,
        };
        let root_id = tree.allocate_id();
        tree.root = root_id;
        tree.pages.write_node(&Node::new_leaf(root_id, order, None))?;

        for (offset, record) in records {
            if record.valid {
                tree.insert_at_offset(record.key, offset)?;
            }
        }

        Ok(tree)
    }

    /// Search for `key` from the root.
    ///
    /// Returns the node the search ended in: the node containing the key
    /// on `Found`, the leaf where the key would live on `NotFound`. Every
    /// node visited costs one page read.
    pub fn search(&mut self, key: Key) -> Result<(Node, SearchStatus)> {
        let mut node = self.pages.read_node(self.root)?;
        loop {
            if node.key_position(key).is_some() {
                return Ok((node, SearchStatus::Found));
            }
            if node.is_leaf {
                return Ok((node, SearchStatus::NotFound));
            }
            let child = node.children[node.descent_position(key)];
            node = self.pages.read_node(child)?;
        }
    }

    /// Insert `key` with `payload`.
    ///
    /// The payload is appended to the heap file and the leaf gains a
    /// `(key, offset)` entry; an overflowing leaf is rebalanced by
    /// compensation or split. Inserting an existing key changes nothing
    /// and reports [`InsertOutcome::Duplicate`].
    pub fn insert(&mut self, key: Key, payload: &[u8]) -> Result<InsertOutcome> {
        let (leaf, status) = self.search(key)?;
        if status == SearchStatus::Found {
            return Ok(InsertOutcome::Duplicate);
        }

        let offset = self.heap.append(key, payload)?;
        self.insert_into_leaf(leaf, key, offset)?;
        Ok(InsertOutcome::Inserted)
    }

    /// Insert a key whose record already exists in the heap at `offset`.
    ///
    /// The bulk-load path: index mutation only, no heap write. Used by
    /// [`rebuild`](Self::rebuild) and by callers loading a pre-existing
    /// heap file.
    pub fn insert_at_offset(&mut self, key: Key, offset: Offset) -> Result<InsertOutcome> {
        let (leaf, status) = self.search(key)?;
        if status == SearchStatus::Found {
            return Ok(InsertOutcome::Duplicate);
        }

        self.insert_into_leaf(leaf, key, offset)?;
        Ok(InsertOutcome::Inserted)
    }

    /// Delete `key`, tombstoning its heap record.
    ///
    /// A key in an internal node is first overwritten with its in-order
    /// predecessor (or successor), whose entry is then removed from its
    /// leaf; a leaf key is removed directly. The leaf that lost an entry
    /// is rebalanced by compensation or merge, cascading up the ancestor
    /// chain.
    pub fn delete(&mut self, key: Key) -> Result<DeleteOutcome> {
        let (mut node, status) = self.search(key)?;
        if status == SearchStatus::NotFound {
            return Ok(DeleteOutcome::KeyNotFound);
        }
        // Position is known to exist after a Found status.
        let key_index = match node.key_position(key) {
            Some(i) => i,
            None => return Ok(DeleteOutcome::KeyNotFound),
        };

        let (removed_offset, rebalance_from) = if node.is_leaf {
            let (_, offset) = node.remove_entry(key_index);
            self.pages.write_node(&node)?;
            (offset, node.id)
        } else {
            self.remove_from_internal(node, key_index)?
        };

        self.heap.tombstone(removed_offset)?;
        self.compensate_and_merge(rebalance_from)?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Replace the key at `key_index` of internal `node` with its in-order
    /// predecessor, or successor when the predecessor leaf is empty, and
    /// remove the neighbor's entry from its leaf.
    ///
    /// Returns the displaced key's heap offset and the leaf to rebalance.
    fn remove_from_internal(&mut self, mut node: Node, key_index: usize) -> Result<(Offset, NodeId)> {
        let mut leaf = self.rightmost_leaf(node.children[key_index])?;
        let neighbor_index = if leaf.keys.is_empty() {
            leaf = self.leftmost_leaf(node.children[key_index + 1])?;
            if leaf.keys.is_empty() {
                return Err(Error::CorruptPage {
                    id: node.id.0,
                    reason: "internal key has no in-order neighbor".into(),
                });
            }
            0
        } else {
            leaf.keys.len() - 1
        };

        let (neighbor_key, neighbor_offset) = leaf.remove_entry(neighbor_index);
        let removed_offset = node.offsets[key_index];
        node.keys[key_index] = neighbor_key;
        node.offsets[key_index] = neighbor_offset;

        self.pages.write_node(&node)?;
        self.pages.write_node(&leaf)?;
        Ok((removed_offset, leaf.id))
    }

    fn rightmost_leaf(&mut self, id: NodeId) -> Result<Node> {
        let mut node = self.pages.read_node(id)?;
        while !node.is_leaf {
            let last = *node.children.last().ok_or(Error::CorruptPage {
                id: node.id.0,
                reason: "internal node without children".into(),
            })?;
            node = self.pages.read_node(last)?;
        }
        Ok(node)
    }

    fn leftmost_leaf(&mut self, id: NodeId) -> Result<Node> {
        let mut node = self.pages.read_node(id)?;
        while !node.is_leaf {
            let first = *node.children.first().ok_or(Error::CorruptPage {
                id: node.id.0,
                reason: "internal node without children".into(),
            })?;
            node = self.pages.read_node(first)?;
        }
        Ok(node)
    }

    /// Look up the payload stored under `key`.
    pub fn lookup(&mut self, key: Key) -> Result<Option<Vec<u8>>> {
        let (node, status) = self.search(key)?;
        if status == SearchStatus::NotFound {
            return Ok(None);
        }
        let pos = match node.key_position(key) {
            Some(i) => i,
            None => return Ok(None),
        };
        let record = self.heap.read(node.offsets[pos])?;
        Ok(Some(record.payload))
    }

    /// Full in-order walk: the ascending, duplicate-free key sequence.
    pub fn traverse(&mut self) -> Result<Vec<Key>> {
        let mut keys = Vec::new();
        self.traverse_into(self.root, &mut keys)?;
        Ok(keys)
    }

    fn traverse_into(&mut self, id: NodeId, out: &mut Vec<Key>) -> Result<()> {
        let node = self.pages.read_node(id)?;
        for (i, &key) in node.keys.iter().enumerate() {
            if !node.is_leaf {
                self.traverse_into(node.children[i], out)?;
            }
            out.push(key);
        }
        if !node.is_leaf {
            if let Some(&last) = node.children.last() {
                self.traverse_into(last, out)?;
            }
        }
        Ok(())
    }

    /// Diagnostic dump: one line per node, indented by depth.
    pub fn display(&mut self) -> Result<String> {
        let mut out = String::new();
        self.display_into(self.root, 0, &mut out)?;
        Ok(out)
    }

    fn display_into(&mut self, id: NodeId, level: usize, out: &mut String) -> Result<()> {
        let node = self.pages.read_node(id)?;
        let _ = writeln!(
            out,
            "{}{} keys: {:?} offsets: {:?} children: {}",
            "-".repeat(level),
            node.id,
            node.keys,
            node.offsets,
            node.children.len()
        );
        for &child in &node.children {
            self.display_into(child, level + 1, out)?;
        }
        Ok(())
    }

    /// The tree's order (maximum keys per node).
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Current root node id.
    #[inline]
    pub fn root_id(&self) -> NodeId {
        self.root
    }

    /// Read one node by id, for diagnostics and structural inspection.
    pub fn read_node(&mut self, id: NodeId) -> Result<Node> {
        self.pages.read_node(id)
    }

    /// Snapshot of the page store's read/write counters.
    #[inline]
    pub fn io_stats(&self) -> IoStats {
        self.pages.io_stats()
    }

    pub(super) fn allocate_id(&mut self) -> NodeId {
        let id = NodeId::new(self.next_id);
        self.next_id += 1;
        id
    }
}
