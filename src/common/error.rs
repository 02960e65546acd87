//! Error types for pagetree.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in pagetree.
///
/// A search miss, a delete of an absent key, and an insert of an existing
/// key are *not* errors; those are reported as statuses by the tree
/// controller. Everything here is fatal to the current operation and is
/// surfaced to the caller without any internal retry.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No page exists for the requested node id (never written, or retired
    /// by a merge).
    #[error("page for node {0} not found")]
    PageNotFound(u32),

    /// The page exists but cannot be decoded into a well-formed node.
    ///
    /// There is no repair path; the caller decides whether to abort or
    /// attempt manual recovery.
    #[error("page for node {id} is corrupt: {reason}")]
    CorruptPage { id: u32, reason: String },

    /// No heap record starts at the given byte offset.
    #[error("no heap record at offset {0}")]
    RecordNotFound(u64),

    /// The bytes at the given offset do not parse as a heap record.
    #[error("corrupt heap record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    /// Requested tree order outside `MIN_ORDER..=MAX_ORDER`.
    #[error("tree order {0} is out of range")]
    InvalidOrder(usize),
}
