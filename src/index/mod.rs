//! Index structures.
//!
//! Currently one index type: the disk-backed [`BTree`].

pub mod btree;

pub use btree::{BTree, DeleteOutcome, InsertOutcome, Node, SearchStatus};
