//! Common types and utilities shared across pagetree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Identifiers and scalar aliases (NodeId, Key, Offset)

pub mod config;
pub mod error;
mod node_id;

pub use error::{Error, Result};
pub use node_id::NodeId;

/// Key type indexed by the tree. Signed, since workloads may carry
/// negative keys.
pub type Key = i64;

/// Byte offset of a record in the heap file.
pub type Offset = u64;
