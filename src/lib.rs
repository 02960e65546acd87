//! pagetree - a disk-backed B-tree index with an append-only heap-file
//! record store.
//!
//! # Architecture
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                     BTree (index/)                    │
//! │   search / insert / delete / traverse / display       │
//! │   split · compensation · merge rebalancing            │
//! └───────────────┬───────────────────────┬───────────────┘
//!                 ↓                       ↓
//! ┌───────────────────────────┐ ┌─────────────────────────┐
//! │   PageStore (storage/)    │ │   HeapFile (storage/)   │
//! │   one 4KB page per node,  │ │   append-only records,  │
//! │   read/write accounting   │ │   tombstone deletion    │
//! └───────────────────────────┘ └─────────────────────────┘
//! ```
//!
//! Index management is decoupled from record storage: the tree's leaves
//! hold heap-file byte offsets, not payloads. Every node access is a page
//! read or write against durable storage; nothing is cached across calls.
//!
//! # Modules
//! - [`common`] - Shared primitives (NodeId, Key, Offset, Error, config)
//! - [`storage`] - Node page I/O and the heap file
//! - [`index`] - The B-tree controller and rebalancing algorithms
//!
//! # Concurrency
//! Single-threaded, synchronous, fully blocking: one `BTree` owns its two
//! files, every call completes its I/O before returning, and `&mut self`
//! on every operation enforces exactly one active caller. There is no
//! crash recovery; a crash during a cascading split or merge can leave the
//! index inconsistent (rebuild it from the heap file).
//!
//! # Quick Start
//! ```no_run
//! use pagetree::BTree;
//!
//! let mut tree = BTree::create("index.db", "heap.db", 4).unwrap();
//! tree.insert(42, b"payload").unwrap();
//! assert_eq!(tree.traverse().unwrap(), vec![42]);
//! ```

pub mod common;
pub mod index;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::PAGE_SIZE;
pub use common::{Error, Key, NodeId, Offset, Result};

pub use index::{BTree, DeleteOutcome, InsertOutcome, Node, SearchStatus};
pub use storage::{HeapFile, HeapRecord, IoStats, Page, PageStore};
