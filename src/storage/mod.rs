//! Storage layer - disk I/O, page formats, and the heap file.
//!
//! This module handles persistent storage:
//! - [`Page`] - The raw 4KB data container
//! - [`node_page`] - The versioned on-disk node encoding
//! - [`PageStore`] - Node page I/O with read/write accounting
//! - [`HeapFile`] - Append-only record storage with tombstone deletion

mod heap_file;
pub mod node_page;
mod page;
mod page_store;

pub use heap_file::{HeapFile, HeapRecord};
pub use node_page::PageType;
pub use page::Page;
pub use page_store::{IoStats, PageStore};
