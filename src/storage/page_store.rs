//! Page store - durable CRUD of B-tree nodes.
//!
//! The [`PageStore`] owns the index file and handles all direct file
//! operations on node pages: reading, writing, and retiring pages, plus
//! the read/write accounting the tree controller reports.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, NodeId, Result};
use crate::index::Node;
use crate::storage::node_page;
use crate::storage::Page;

/// Snapshot of a store's I/O counters.
///
/// Counters are per-store instance, so independent trees never share them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IoStats {
    /// Node pages read from disk.
    pub reads: u64,
    /// Node pages written to disk (retiring a page counts as a write).
    pub writes: u64,
}

/// Manages disk I/O for a single index file.
///
/// # File Layout
/// The index is stored as a single file with node pages laid out
/// sequentially; node `n` lives at byte offset `n × PAGE_SIZE`:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┐
/// │ Node 0  │ Node 1  │  ...    │ Node N  │
/// │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// # Thread Safety
/// `PageStore` is **single-threaded**; it is owned by one tree controller
/// for its lifetime and every access crosses `&mut self`.
///
/// # Durability
/// Every write is followed by `fsync()`. There is no transactional guarantee
/// across the multiple page writes of a cascading split or merge; a crash in
/// that window leaves the index inconsistent.
pub struct PageStore {
    file: File,
    /// Number of pages in the file.
    page_count: u32,
    reads: u64,
    writes: u64,
}

impl PageStore {
    /// Create a new index file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_count: 0,
            reads: 0,
            writes: 0,
        })
    }

    /// Open an existing index file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let metadata = file.metadata()?;
        let page_count = (metadata.len() / PAGE_SIZE as u64) as u32;

        Ok(Self {
            file,
            page_count,
            reads: 0,
            writes: 0,
        })
    }

    /// Open an existing index file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Read the node stored at `id`.
    ///
    /// # Errors
    /// - `PageNotFound` if the page was never written or has been retired.
    /// - `CorruptPage` if the page cannot be decoded into a well-formed node.
    pub fn read_node(&mut self, id: NodeId) -> Result<Node> {
        if !id.is_valid() || id.0 >= self.page_count {
            return Err(Error::PageNotFound(id.0));
        }

        let offset = (id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;

        let mut page = Page::new();
        self.file.read_exact(page.as_mut_slice())?;
        self.reads += 1;

        node_page::decode(id, &page)
    }

    /// Persist the full state of a node at `node.id`, overwriting any prior
    /// page there.
    ///
    /// The file is extended (zero-filling any gap) when `node.id` lies past
    /// the current end, so freshly allocated ids can be written in any
    /// order.
    ///
    /// # Durability
    /// Calls `fsync()` after writing.
    pub fn write_node(&mut self, node: &Node) -> Result<()> {
        let page = node_page::encode(node);
        self.write_page(node.id, &page)
    }

    /// Permanently retire the page at `id`.
    ///
    /// Used only when a merge absorbs a node; the id is never reused and
    /// subsequent reads fail with `PageNotFound`.
    pub fn delete_node(&mut self, id: NodeId) -> Result<()> {
        if !id.is_valid() || id.0 >= self.page_count {
            return Err(Error::PageNotFound(id.0));
        }
        self.write_page(id, &Page::new())
    }

    fn write_page(&mut self, id: NodeId, page: &Page) -> Result<()> {
        // Zero-fill up to the target page if it lies past the end.
        while self.page_count <= id.0 {
            let offset = (self.page_count as u64) * (PAGE_SIZE as u64);
            self.file.seek(SeekFrom::Start(offset))?;
            self.file.write_all(&[0u8; PAGE_SIZE])?;
            self.page_count += 1;
        }

        let offset = (id.0 as u64) * (PAGE_SIZE as u64);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_all()?;
        self.writes += 1;

        Ok(())
    }

    /// Snapshot of the I/O counters.
    #[inline]
    pub fn io_stats(&self) -> IoStats {
        IoStats {
            reads: self.reads,
            writes: self.writes,
        }
    }

    /// Number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }
}
