//! On-disk node page format.
//!
//! Every node page starts with a fixed header followed by three packed
//! little-endian arrays. The layout is versioned and self-checking:
//! a CRC32 over the whole page guards against torn or bit-rotted pages.
//!
//! # Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     page_type (0 = free, 1 = leaf, 2 = internal)
//! 1       4     checksum (CRC32, little-endian, computed with field zeroed)
//! 5       1     format version
//! 6       2     order (u16)
//! 8       4     ancestor node id (u32, u32::MAX = none)
//! 12      2     key count (u16)
//! 14      2     child count (u16)
//! 16      ...   keys (i64 × key count)
//!               offsets (u64 × key count)
//!               children (u32 × child count)
//! ```
//!
//! Decoding is strict: a page that fails any structural check (version,
//! type, counts, key order, checksum) is reported as [`Error::CorruptPage`]
//! rather than patched up.

use crate::common::config::{NODE_FORMAT_VERSION, PAGE_SIZE};
use crate::common::{Error, NodeId, Result};
use crate::index::Node;
use crate::storage::Page;

/// Size of the node page header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of each header field within the page.
pub const OFFSET_PAGE_TYPE: usize = 0;
pub const OFFSET_CHECKSUM: usize = 1;
pub const OFFSET_VERSION: usize = 5;
pub const OFFSET_ORDER: usize = 6;
pub const OFFSET_ANCESTOR: usize = 8;
pub const OFFSET_KEY_COUNT: usize = 12;
pub const OFFSET_CHILD_COUNT: usize = 14;

/// Type of node stored in a page.
///
/// Uses `#[repr(u8)]` to guarantee a 1-byte representation for serialization.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PageType {
    /// Unwritten or retired page. Reads of such a page fail with
    /// `PageNotFound`.
    #[default]
    Free = 0,
    /// B-tree leaf node.
    Leaf = 1,
    /// B-tree internal node.
    Internal = 2,
}

impl PageType {
    /// Convert from u8, `None` for unknown values.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PageType::Free),
            1 => Some(PageType::Leaf),
            2 => Some(PageType::Internal),
            _ => None,
        }
    }
}

/// Compute the CRC32 checksum of a page.
///
/// The checksum is computed with the checksum field (bytes 1-4) zeroed out,
/// so the checksum doesn't include itself.
pub fn compute_checksum(page_data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();

    hasher.update(&page_data[..OFFSET_CHECKSUM]);
    hasher.update(&[0u8; 4]);
    hasher.update(&page_data[OFFSET_CHECKSUM + 4..]);

    hasher.finalize()
}

/// Encode a node into a fresh page.
///
/// # Panics
/// Panics if the node's entries cannot fit in one page. The controller
/// rejects orders above `MAX_ORDER` at construction and never persists an
/// overflowing node, so this indicates a bug rather than bad input.
pub fn encode(node: &Node) -> Page {
    let body = node.keys.len() * 8 + node.offsets.len() * 8 + node.children.len() * 4;
    assert!(
        HEADER_SIZE + body <= PAGE_SIZE,
        "node {} exceeds page capacity",
        node.id
    );
    assert_eq!(node.keys.len(), node.offsets.len());

    let mut page = Page::new();
    let data = page.as_mut_slice();

    let page_type = if node.is_leaf {
        PageType::Leaf
    } else {
        PageType::Internal
    };
    data[OFFSET_PAGE_TYPE] = page_type as u8;
    data[OFFSET_VERSION] = NODE_FORMAT_VERSION;
    data[OFFSET_ORDER..OFFSET_ORDER + 2].copy_from_slice(&(node.order as u16).to_le_bytes());

    let ancestor = node.ancestor.unwrap_or(NodeId::INVALID);
    data[OFFSET_ANCESTOR..OFFSET_ANCESTOR + 4].copy_from_slice(&ancestor.0.to_le_bytes());

    data[OFFSET_KEY_COUNT..OFFSET_KEY_COUNT + 2]
        .copy_from_slice(&(node.keys.len() as u16).to_le_bytes());
    data[OFFSET_CHILD_COUNT..OFFSET_CHILD_COUNT + 2]
        .copy_from_slice(&(node.children.len() as u16).to_le_bytes());

    let mut pos = HEADER_SIZE;
    for key in &node.keys {
        data[pos..pos + 8].copy_from_slice(&key.to_le_bytes());
        pos += 8;
    }
    for offset in &node.offsets {
        data[pos..pos + 8].copy_from_slice(&offset.to_le_bytes());
        pos += 8;
    }
    for child in &node.children {
        data[pos..pos + 4].copy_from_slice(&child.0.to_le_bytes());
        pos += 4;
    }

    let checksum = compute_checksum(data);
    data[OFFSET_CHECKSUM..OFFSET_CHECKSUM + 4].copy_from_slice(&checksum.to_le_bytes());

    page
}

fn corrupt(id: NodeId, reason: impl Into<String>) -> Error {
    Error::CorruptPage {
        id: id.0,
        reason: reason.into(),
    }
}

/// Decode the node stored in a page.
///
/// `id` is the node id the page was read under; it becomes `node.id`.
///
/// # Errors
/// - `PageNotFound` if the page is free (unwritten or retired).
/// - `CorruptPage` if any structural check fails.
pub fn decode(id: NodeId, page: &Page) -> Result<Node> {
    let data = page.as_slice();

    let page_type = match PageType::from_u8(data[OFFSET_PAGE_TYPE]) {
        Some(PageType::Free) => return Err(Error::PageNotFound(id.0)),
        Some(t) => t,
        None => {
            return Err(corrupt(
                id,
                format!("unknown page type {}", data[OFFSET_PAGE_TYPE]),
            ))
        }
    };

    let version = data[OFFSET_VERSION];
    if version != NODE_FORMAT_VERSION {
        return Err(corrupt(id, format!("unsupported format version {version}")));
    }

    let stored = compute_checksum(data);
    let recorded = u32::from_le_bytes([
        data[OFFSET_CHECKSUM],
        data[OFFSET_CHECKSUM + 1],
        data[OFFSET_CHECKSUM + 2],
        data[OFFSET_CHECKSUM + 3],
    ]);
    if stored != recorded {
        return Err(corrupt(id, "checksum mismatch"));
    }

    let order = u16::from_le_bytes([data[OFFSET_ORDER], data[OFFSET_ORDER + 1]]) as usize;
    let key_count =
        u16::from_le_bytes([data[OFFSET_KEY_COUNT], data[OFFSET_KEY_COUNT + 1]]) as usize;
    let child_count =
        u16::from_le_bytes([data[OFFSET_CHILD_COUNT], data[OFFSET_CHILD_COUNT + 1]]) as usize;

    if HEADER_SIZE + key_count * 16 + child_count * 4 > PAGE_SIZE {
        return Err(corrupt(
            id,
            format!("counts overrun page: {key_count} keys, {child_count} children"),
        ));
    }

    let is_leaf = page_type == PageType::Leaf;
    if is_leaf && child_count != 0 {
        return Err(corrupt(id, "leaf page with children"));
    }
    if !is_leaf && child_count != key_count + 1 {
        return Err(corrupt(
            id,
            format!("internal page with {key_count} keys but {child_count} children"),
        ));
    }

    let raw = u32::from_le_bytes([
        data[OFFSET_ANCESTOR],
        data[OFFSET_ANCESTOR + 1],
        data[OFFSET_ANCESTOR + 2],
        data[OFFSET_ANCESTOR + 3],
    ]);
    let ancestor = NodeId::new(raw);
    let ancestor = ancestor.is_valid().then_some(ancestor);

    let mut pos = HEADER_SIZE;
    let mut keys = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data[pos..pos + 8]);
        keys.push(i64::from_le_bytes(buf));
        pos += 8;
    }
    let mut offsets = Vec::with_capacity(key_count);
    for _ in 0..key_count {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&data[pos..pos + 8]);
        offsets.push(u64::from_le_bytes(buf));
        pos += 8;
    }
    let mut children = Vec::with_capacity(child_count);
    for _ in 0..child_count {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(&data[pos..pos + 4]);
        children.push(NodeId::new(u32::from_le_bytes(buf)));
        pos += 4;
    }

    if keys.windows(2).any(|w| w[0] >= w[1]) {
        return Err(corrupt(id, "keys out of order"));
    }

    Ok(Node {
        id,
        order,
        keys,
        offsets,
        children,
        is_leaf,
        ancestor,
    })
}
