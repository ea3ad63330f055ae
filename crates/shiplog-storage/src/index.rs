//! Memory-mapped offset index.
//!
//! The index is the lookup half of a segment: a fixed-width table mapping a
//! record's offset relative to the segment base to the position of its frame
//! in the store file. Each entry is 12 bytes, big-endian:
//!
//! ```text
//! ┌────────────────────┬──────────────────────────┐
//! │ relative offset    │ store position           │
//! │ (4 bytes)          │ (8 bytes)                │
//! └────────────────────┴──────────────────────────┘
//! ```
//!
//! On open the file is grown to its configured maximum size and mapped
//! shared read-write; entries are written straight into the mapping. On
//! close the mapping is flushed and the file truncated back to the populated
//! prefix, which is how segment recovery later counts the entries.
//!
//! The index carries no lock of its own. Writes take `&mut self` and rely on
//! the log's writer lock for exclusion, which also keeps concurrent readers
//! away from a mapping that is being mutated.

use std::fs::File;

use memmap2::MmapMut;

use crate::error::{Error, Result};

/// Width of the relative-offset column.
const OFFSET_BYTES: usize = 4;
/// Width of the store-position column.
const POSITION_BYTES: usize = 8;
/// Width of one index entry.
pub const ENTRY_BYTES: u64 = (OFFSET_BYTES + POSITION_BYTES) as u64;

pub struct Index {
    file: File,
    mmap: MmapMut,
    size: u64,
}

impl Index {
    /// Opens an index over `file`, preallocating it to `max_bytes`.
    ///
    /// The file's length before preallocation becomes the populated size, so
    /// an index reopened over a previously closed (truncated) file picks up
    /// its existing entries.
    pub fn open(file: File, max_bytes: u64) -> Result<Self> {
        if max_bytes == 0 {
            return Err(Error::ZeroCapacity("index"));
        }
        let size = file.metadata()?.len();
        file.set_len(max_bytes)?;
        // SAFETY: the mapping is private to this Index; all access goes
        // through &self/&mut self and the file is not resized again until
        // close drops the mapping.
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { file, mmap, size })
    }

    /// Reads entry `at`, returning its relative offset and store position.
    ///
    /// `-1` addresses the last populated entry. Reading an entry at or past
    /// the populated size fails with [`Error::EndOfFile`].
    pub fn read(&self, at: i64) -> Result<(u32, u64)> {
        if self.size == 0 {
            return Err(Error::EndOfFile);
        }

        let entry = if at == -1 {
            (self.size / ENTRY_BYTES) - 1
        } else {
            at as u32 as u64
        };

        let position = entry * ENTRY_BYTES;
        if self.size < position + ENTRY_BYTES {
            return Err(Error::EndOfFile);
        }

        let start = position as usize;
        let mut offset_buf = [0u8; OFFSET_BYTES];
        offset_buf.copy_from_slice(&self.mmap[start..start + OFFSET_BYTES]);
        let mut position_buf = [0u8; POSITION_BYTES];
        position_buf.copy_from_slice(&self.mmap[start + OFFSET_BYTES..start + ENTRY_BYTES as usize]);

        Ok((
            u32::from_be_bytes(offset_buf),
            u64::from_be_bytes(position_buf),
        ))
    }

    /// Appends an entry pairing `relative_offset` with `store_position`.
    ///
    /// Fails with [`Error::FileFull`] once the mapping has no room for
    /// another entry.
    pub fn write(&mut self, relative_offset: u32, store_position: u64) -> Result<()> {
        if (self.mmap.len() as u64) < self.size + ENTRY_BYTES {
            return Err(Error::FileFull);
        }

        let start = self.size as usize;
        self.mmap[start..start + OFFSET_BYTES].copy_from_slice(&relative_offset.to_be_bytes());
        self.mmap[start + OFFSET_BYTES..start + ENTRY_BYTES as usize]
            .copy_from_slice(&store_position.to_be_bytes());

        self.size += ENTRY_BYTES;
        Ok(())
    }

    /// Number of populated entries.
    pub fn entries(&self) -> u64 {
        self.size / ENTRY_BYTES
    }

    /// Flushes the mapping, syncs the file, and truncates it to the
    /// populated prefix so the on-disk length is `entries × 12`.
    pub fn close(self) -> Result<()> {
        let Index { file, mmap, size } = self;
        mmap.flush()?;
        file.sync_all()?;
        // The mapping must be gone before the file shrinks under it.
        drop(mmap);
        file.set_len(size)?;
        Ok(())
    }
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("size", &self.size)
            .field("capacity", &self.mmap.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append_entries(index: &mut Index, n: u32) {
        for offset in 0..n {
            index.write(offset, u64::from(offset) * 10).unwrap();
        }
    }

    #[test]
    fn test_open_rejects_zero_capacity() {
        let file = tempfile::tempfile().unwrap();
        assert!(matches!(
            Index::open(file, 0),
            Err(Error::ZeroCapacity("index"))
        ));
    }

    #[test]
    fn test_read_empty_index_fails() {
        let file = tempfile::tempfile().unwrap();
        let index = Index::open(file, 1024).unwrap();
        assert!(matches!(index.read(4), Err(Error::EndOfFile)));
        assert!(matches!(index.read(-1), Err(Error::EndOfFile)));
    }

    #[test]
    fn test_write_then_read_entries() {
        let file = tempfile::tempfile().unwrap();
        let mut index = Index::open(file, 1024).unwrap();
        append_entries(&mut index, 4);

        for at in 0..4i64 {
            let (relative, position) = index.read(at).unwrap();
            assert_eq!(relative, at as u32);
            assert_eq!(position, at as u64 * 10);
        }
    }

    #[test]
    fn test_read_last_entry() {
        let file = tempfile::tempfile().unwrap();
        let mut index = Index::open(file, 1024).unwrap();
        append_entries(&mut index, 4);

        let (relative, position) = index.read(-1).unwrap();
        assert_eq!(relative, 3);
        assert_eq!(position, 30);
    }

    #[test]
    fn test_read_past_populated_fails() {
        let file = tempfile::tempfile().unwrap();
        let mut index = Index::open(file, 1024).unwrap();
        append_entries(&mut index, 2);
        assert!(matches!(index.read(2), Err(Error::EndOfFile)));
    }

    #[test]
    fn test_write_full_index_fails() {
        // Room for two entries; the third write exceeds 32 bytes.
        let file = tempfile::tempfile().unwrap();
        let mut index = Index::open(file, 32).unwrap();
        index.write(0, 0).unwrap();
        index.write(1, 18).unwrap();
        assert!(matches!(index.write(2, 36), Err(Error::FileFull)));
    }

    #[test]
    fn test_close_truncates_to_populated_prefix() {
        let named = tempfile::NamedTempFile::new().unwrap();
        let path = named.path().to_path_buf();
        let mut index = Index::open(named.reopen().unwrap(), 1024).unwrap();
        append_entries(&mut index, 3);
        index.close().unwrap();

        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 3 * ENTRY_BYTES);
    }

    #[test]
    fn test_reopen_from_existing_file() {
        let named = tempfile::NamedTempFile::new().unwrap();
        let path = named.path().to_path_buf();

        {
            let mut index = Index::open(named.reopen().unwrap(), 1024).unwrap();
            append_entries(&mut index, 4);
            index.close().unwrap();
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .unwrap();
        let index = Index::open(file, 1024).unwrap();
        assert_eq!(index.entries(), 4);

        let (relative, position) = index.read(-1).unwrap();
        assert_eq!(relative, 3);
        assert_eq!(position, 30);
    }
}
