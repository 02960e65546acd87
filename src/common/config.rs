//! Configuration constants for pagetree.

use crate::storage::node_page;

/// Size of a node page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a node write maps to a
/// single aligned block of file I/O.
pub const PAGE_SIZE: usize = 4096;

/// Version byte written into every node page header.
///
/// Bumped whenever the on-disk node layout changes; readers reject pages
/// carrying any other value.
pub const NODE_FORMAT_VERSION: u8 = 1;

/// Smallest supported tree order.
///
/// `order / 2` is the occupancy floor for non-root nodes, so an order below
/// 2 would allow empty non-root nodes.
pub const MIN_ORDER: usize = 2;

/// Largest order for which a full node still fits in one page.
///
/// A persisted node holds at most `order` keys (i64), `order` heap offsets
/// (u64), and `order + 1` child ids (u32) after its header.
pub const MAX_ORDER: usize = (PAGE_SIZE - node_page::HEADER_SIZE - 4) / (8 + 8 + 4);
