//! Heap file - append-only record storage.
//!
//! Records live in a separate file from the index and are addressed by the
//! byte offset at which they start. The file only ever grows: deletion
//! flips a record's validity flag in place (a tombstone), so every other
//! record's offset stays stable forever. No space is ever reclaimed.
//!
//! # Record Layout
//! ```text
//! Offset  Size  Field
//! ------  ----  -----
//! 0       1     flag (1 = valid, 0 = tombstone)
//! 1       8     key (i64, little-endian)
//! 9       4     payload length (u32, little-endian)
//! 13      ...   payload bytes
//! ```

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, Key, Offset, Result};

/// Size of the fixed record prefix in bytes.
const RECORD_HEADER_SIZE: u64 = 13;

const FLAG_TOMBSTONE: u8 = 0;
const FLAG_VALID: u8 = 1;

/// One record parsed out of the heap file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapRecord {
    /// False once the record has been tombstoned.
    pub valid: bool,
    /// Key the record was inserted under.
    pub key: Key,
    /// The stored payload.
    pub payload: Vec<u8>,
}

/// Append-only record store with tombstone deletion.
///
/// # Thread Safety
/// Single-threaded, like the page store: owned by one tree controller,
/// every access through `&mut self`.
pub struct HeapFile {
    file: File,
    /// Current end-of-file; the offset the next appended record receives.
    len: u64,
}

impl HeapFile {
    /// Create a new heap file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self { file, len: 0 })
    }

    /// Open an existing heap file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self { file, len })
    }

    /// Open an existing heap file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    /// Append a new valid record, returning the byte offset it starts at.
    ///
    /// # Durability
    /// Calls `fsync()` after writing.
    pub fn append(&mut self, key: Key, payload: &[u8]) -> Result<Offset> {
        let offset = self.len;

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&[FLAG_VALID])?;
        self.file.write_all(&key.to_le_bytes())?;
        self.file.write_all(&(payload.len() as u32).to_le_bytes())?;
        self.file.write_all(payload)?;
        self.file.sync_all()?;

        self.len = offset + RECORD_HEADER_SIZE + payload.len() as u64;
        Ok(offset)
    }

    /// Read the record starting at `offset`.
    ///
    /// Tombstoned records read back with `valid == false`; distinguishing
    /// them is up to the caller.
    ///
    /// # Errors
    /// - `RecordNotFound` if `offset` is at or past end-of-file.
    /// - `CorruptRecord` if the bytes there do not parse as a record.
    pub fn read(&mut self, offset: Offset) -> Result<HeapRecord> {
        if offset >= self.len {
            return Err(Error::RecordNotFound(offset));
        }
        if offset + RECORD_HEADER_SIZE > self.len {
            return Err(corrupt(offset, "truncated record header"));
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut header = [0u8; RECORD_HEADER_SIZE as usize];
        self.file.read_exact(&mut header)?;

        let valid = match header[0] {
            FLAG_TOMBSTONE => false,
            FLAG_VALID => true,
            flag => return Err(corrupt(offset, format!("invalid flag byte {flag}"))),
        };

        let mut key_buf = [0u8; 8];
        key_buf.copy_from_slice(&header[1..9]);
        let key = i64::from_le_bytes(key_buf);

        let mut len_buf = [0u8; 4];
        len_buf.copy_from_slice(&header[9..13]);
        let payload_len = u32::from_le_bytes(len_buf) as u64;

        if offset + RECORD_HEADER_SIZE + payload_len > self.len {
            return Err(corrupt(offset, "payload length overruns file"));
        }

        let mut payload = vec![0u8; payload_len as usize];
        self.file.read_exact(&mut payload)?;

        Ok(HeapRecord {
            valid,
            key,
            payload,
        })
    }

    /// Flip the validity flag of the record at `offset` in place.
    ///
    /// Record length and all other offsets are unaffected; no space is
    /// reclaimed. Tombstoning an already-tombstoned record is a no-op.
    ///
    /// # Errors
    /// Same as [`read`](Self::read): the record must exist and parse.
    pub fn tombstone(&mut self, offset: Offset) -> Result<()> {
        // Validates that a record actually starts here.
        self.read(offset)?;

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&[FLAG_TOMBSTONE])?;
        self.file.sync_all()?;

        Ok(())
    }

    /// Walk every record in the file in offset order, tombstoned ones
    /// included.
    ///
    /// Used when rebuilding an index over an existing heap file.
    pub fn scan(&mut self) -> Result<Vec<(Offset, HeapRecord)>> {
        let mut records = Vec::new();
        let mut offset = 0;

        while offset < self.len {
            let record = self.read(offset)?;
            let next = offset + RECORD_HEADER_SIZE + record.payload.len() as u64;
            records.push((offset, record));
            offset = next;
        }

        Ok(records)
    }

    /// Total file length in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// True if no record has ever been appended.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

fn corrupt(offset: Offset, reason: impl Into<String>) -> Error {
    Error::CorruptRecord {
        offset,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_and_read() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();

        let offset = heap.append(42, b"hello").unwrap();
        assert_eq!(offset, 0);

        let record = heap.read(offset).unwrap();
        assert!(record.valid);
        assert_eq!(record.key, 42);
        assert_eq!(record.payload, b"hello");
    }

    #[test]
    fn test_offsets_advance_by_record_length() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();

        let a = heap.append(1, b"abc").unwrap();
        let b = heap.append(2, b"").unwrap();
        let c = heap.append(3, b"xy").unwrap();

        assert_eq!(a, 0);
        assert_eq!(b, RECORD_HEADER_SIZE + 3);
        assert_eq!(c, b + RECORD_HEADER_SIZE);
        assert_eq!(heap.len(), c + RECORD_HEADER_SIZE + 2);
    }

    #[test]
    fn test_tombstone_flips_flag_only() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();

        let a = heap.append(1, b"first").unwrap();
        let b = heap.append(2, b"second").unwrap();
        let len_before = heap.len();

        heap.tombstone(a).unwrap();

        let dead = heap.read(a).unwrap();
        assert!(!dead.valid);
        assert_eq!(dead.key, 1);
        assert_eq!(dead.payload, b"first");

        // Neighbors and file length untouched.
        let alive = heap.read(b).unwrap();
        assert!(alive.valid);
        assert_eq!(alive.payload, b"second");
        assert_eq!(heap.len(), len_before);
    }

    #[test]
    fn test_tombstone_is_idempotent() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();

        let offset = heap.append(9, b"x").unwrap();
        heap.tombstone(offset).unwrap();
        heap.tombstone(offset).unwrap();
        assert!(!heap.read(offset).unwrap().valid);
    }

    #[test]
    fn test_read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();
        heap.append(1, b"abc").unwrap();

        assert!(matches!(
            heap.read(heap.len()),
            Err(Error::RecordNotFound(_))
        ));
        assert!(matches!(heap.read(9999), Err(Error::RecordNotFound(9999))));
    }

    #[test]
    fn test_read_misaligned_offset_fails() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();
        heap.append(1, b"abcdef").unwrap();

        // Offset 3 lands inside the key field; the flag byte there is not
        // 0 or 1 (key byte) or the length overruns.
        assert!(heap.read(3).is_err());
    }

    #[test]
    fn test_scan_returns_all_records() {
        let dir = tempdir().unwrap();
        let mut heap = HeapFile::create(dir.path().join("heap.db")).unwrap();

        let a = heap.append(1, b"one").unwrap();
        let b = heap.append(2, b"two").unwrap();
        let c = heap.append(3, b"three").unwrap();
        heap.tombstone(b).unwrap();

        let records = heap.scan().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].0, a);
        assert!(records[0].1.valid);
        assert_eq!(records[1].0, b);
        assert!(!records[1].1.valid);
        assert_eq!(records[2].0, c);
        assert_eq!(records[2].1.payload, b"three");
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("heap.db");

        let offset = {
            let mut heap = HeapFile::create(&path).unwrap();
            heap.append(5, b"persist me").unwrap()
        };
        {
            let mut heap = HeapFile::open(&path).unwrap();
            let record = heap.read(offset).unwrap();
            assert_eq!(record.key, 5);
            assert_eq!(record.payload, b"persist me");
        }
    }
}
