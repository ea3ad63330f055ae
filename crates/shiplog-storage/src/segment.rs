//! Log segment.
//!
//! A segment binds one store file and one index file under a shared base
//! offset. The pair lives in the log directory as `<base_offset>.store` and
//! `<base_offset>.index`. Appends stamp the record with the next absolute
//! offset, frame the encoded record into the store, and index the record's
//! relative offset against its store position. A segment that has seen
//! `FileFull` from either file reports itself full and accepts no further
//! appends.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::debug;

use shiplog_proto::v1::Record;

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::index::Index;
use crate::store::Store;

#[derive(Debug)]
pub struct Segment {
    store: Store,
    index: Index,
    store_path: PathBuf,
    index_path: PathBuf,
    base_offset: u64,
    next_offset: u64,
    is_full: bool,
}

impl Segment {
    /// Opens the segment based at `base_offset` in `dir`, creating its files
    /// if they do not exist yet.
    ///
    /// `next_offset` is recovered from the index: one past the last indexed
    /// record, or the base offset for an empty segment. A store frame with
    /// no index entry (left behind by an index-full append) is ignored.
    pub fn open(dir: &Path, base_offset: u64, config: &LogConfig) -> Result<Self> {
        let store_path = dir.join(format!("{base_offset}.store"));
        let store_file = OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&store_path)?;
        let store = Store::open(store_file, config.max_store_bytes)?;

        let index_path = dir.join(format!("{base_offset}.index"));
        let index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&index_path)?;
        let index = Index::open(index_file, config.max_index_bytes)?;

        let next_offset = match index.read(-1) {
            Ok((last_relative, _)) => base_offset + u64::from(last_relative) + 1,
            Err(Error::EndOfFile) => base_offset,
            Err(err) => return Err(err),
        };

        debug!(base_offset, next_offset, "opened segment");

        Ok(Self {
            store,
            index,
            store_path,
            index_path,
            base_offset,
            next_offset,
            is_full: false,
        })
    }

    /// Appends `record`, stamping it with the offset it is assigned, and
    /// returns that offset.
    ///
    /// A `FileFull` from the store or the index marks the segment full and
    /// propagates. When the index fills after the store write succeeded, the
    /// orphaned store frame stays in place: it has no index entry, is
    /// unreachable through [`Segment::read`], and is skipped on reopen.
    pub fn append(&mut self, mut record: Record) -> Result<u64> {
        let offset = self.next_offset;
        record.offset = offset;
        let encoded = record.encode_to_vec();

        let (_, position) = match self.store.append(&encoded) {
            Ok(written) => written,
            Err(err) => return Err(self.tag_full(err)),
        };

        let relative = (offset - self.base_offset) as u32;
        if let Err(err) = self.index.write(relative, position) {
            return Err(self.tag_full(err));
        }

        self.next_offset += 1;
        Ok(offset)
    }

    /// Reads the record stored at the absolute `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let relative = offset.wrapping_sub(self.base_offset);
        let (_, position) = self.index.read(relative as i64)?;
        let encoded = self.store.read(position)?;
        let record = Record::decode(encoded.as_slice())?;
        Ok(record)
    }

    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Absolute offset the next append will be assigned.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// True once either the store or the index has refused a write.
    pub fn is_full(&self) -> bool {
        self.is_full
    }

    /// Whether `offset` falls in this segment's half-open offset range.
    pub fn contains(&self, offset: u64) -> bool {
        self.base_offset <= offset && offset < self.next_offset
    }

    /// Closes the index (flushing and truncating it) and then the store.
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Closes the segment and deletes both of its files.
    pub fn remove(self) -> Result<()> {
        let store_path = self.store_path.clone();
        let index_path = self.index_path.clone();
        self.close()?;
        fs::remove_file(index_path)?;
        fs::remove_file(store_path)?;
        Ok(())
    }

    fn tag_full(&mut self, err: Error) -> Error {
        if err.is_full() {
            self.is_full = true;
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::index::ENTRY_BYTES;

    const TEST_BASE_OFFSET: u64 = 24;

    fn test_record() -> Record {
        Record {
            value: b"test input".to_vec(),
            offset: 0,
        }
    }

    fn test_config() -> LogConfig {
        LogConfig {
            max_index_bytes: 8 * ENTRY_BYTES,
            max_store_bytes: 1024,
            initial_offset: 0,
        }
    }

    #[test]
    fn test_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &test_config()).unwrap();
        assert_eq!(segment.next_offset(), TEST_BASE_OFFSET);

        for i in 0..2 {
            let offset = segment.append(test_record()).unwrap();
            assert_eq!(offset, TEST_BASE_OFFSET + i);

            let record = segment.read(offset).unwrap();
            assert_eq!(record.value, b"test input");
            assert_eq!(record.offset, offset);
        }
    }

    #[test]
    fn test_append_exceeds_index_capacity() {
        // 32 bytes holds two index entries; the third append has nowhere to
        // index.
        let config = LogConfig {
            max_index_bytes: 32,
            max_store_bytes: 1024,
            initial_offset: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &config).unwrap();

        for _ in 0..2 {
            segment.append(test_record()).unwrap();
        }
        assert!(!segment.is_full());

        let err = segment.append(test_record()).unwrap_err();
        assert!(matches!(err, Error::FileFull));
        assert!(segment.is_full());
    }

    #[test]
    fn test_append_exceeds_store_capacity() {
        // A stamped test record encodes to 14 bytes, so the third append
        // pushes payload bytes past 50 while the index still has room.
        let config = LogConfig {
            max_index_bytes: 16 * ENTRY_BYTES,
            max_store_bytes: 50,
            initial_offset: 0,
        };
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &config).unwrap();

        for _ in 0..2 {
            segment.append(test_record()).unwrap();
        }

        let err = segment.append(test_record()).unwrap_err();
        assert!(matches!(err, Error::FileFull));
        assert!(segment.is_full());
    }

    #[test]
    fn test_reopen_recovers_next_offset() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &test_config()).unwrap();
            for _ in 0..3 {
                segment.append(test_record()).unwrap();
            }
            segment.close().unwrap();
        }

        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &test_config()).unwrap();
        assert_eq!(segment.next_offset(), TEST_BASE_OFFSET + 3);

        let offset = segment.append(test_record()).unwrap();
        assert_eq!(offset, TEST_BASE_OFFSET + 3);

        for i in 0..4 {
            let record = segment.read(TEST_BASE_OFFSET + i).unwrap();
            assert_eq!(record.offset, TEST_BASE_OFFSET + i);
        }
    }

    #[test]
    fn test_contains() {
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &test_config()).unwrap();
        segment.append(test_record()).unwrap();

        assert!(segment.contains(TEST_BASE_OFFSET));
        assert!(!segment.contains(TEST_BASE_OFFSET - 1));
        assert!(!segment.contains(TEST_BASE_OFFSET + 1));
    }

    #[test]
    fn test_remove_deletes_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut segment = Segment::open(dir.path(), TEST_BASE_OFFSET, &test_config()).unwrap();
        segment.append(test_record()).unwrap();

        let store_path = dir.path().join(format!("{TEST_BASE_OFFSET}.store"));
        let index_path = dir.path().join(format!("{TEST_BASE_OFFSET}.index"));
        assert!(store_path.exists());
        assert!(index_path.exists());

        segment.remove().unwrap();
        assert!(!store_path.exists());
        assert!(!index_path.exists());
    }
}
