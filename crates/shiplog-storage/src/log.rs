//! The commit log.
//!
//! A `Log` owns an ordered collection of segments in one directory. The last
//! segment is the active one: appends go to it, and when it fills the log
//! rolls a fresh segment whose base is the active segment's next offset.
//! Reads locate the owning segment by offset range and delegate to it.
//!
//! ## Recovery
//!
//! On open the log rebuilds its segment list from the directory. Each
//! segment leaves two files named after its base offset (`<base>.store`,
//! `<base>.index`); recovery parses the base offset out of each file stem,
//! deduplicates, and reopens one segment per base offset in ascending
//! order. Files with an unknown extension or a non-numeric stem are skipped.
//!
//! ## Concurrency
//!
//! One reader-writer lock protects the segment list. Appends, rollover, and
//! lifecycle operations hold it exclusively; reads hold it shared. The lock
//! is deliberately held across the underlying file I/O, trading latency
//! under contention for a simple consistency argument: a read observes every
//! append that completed before it.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{info, warn};

use shiplog_proto::v1::Record;

use crate::config::LogConfig;
use crate::error::{Error, Result};
use crate::segment::Segment;

#[derive(Debug)]
pub struct Log {
    dir: PathBuf,
    config: LogConfig,
    inner: RwLock<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Segments in ascending base-offset order; the last one is active.
    segments: Vec<Segment>,
}

impl Log {
    /// Opens the log in `dir`, creating the directory if needed.
    ///
    /// Existing segment files are recovered; an empty directory gets one
    /// fresh segment based at the configured initial offset.
    pub fn open(dir: impl AsRef<Path>, config: LogConfig) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let segments = recover_segments(&dir, &config)?;
        info!(
            dir = %dir.display(),
            segments = segments.len(),
            next_offset = segments.last().map(Segment::next_offset).unwrap_or_default(),
            "opened log"
        );
        Ok(Self {
            dir,
            config,
            inner: RwLock::new(Inner { segments }),
        })
    }

    /// Appends `record` to the active segment and returns its offset.
    ///
    /// When the active segment reports itself full, the log rolls a new
    /// active segment based at the full segment's next offset and surfaces
    /// the original `FileFull`; a retry lands in the fresh segment and
    /// offset assignment stays monotonic across the rollover.
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut inner = self.inner.write().unwrap();
        let active = inner.segments.last_mut().ok_or(Error::Closed)?;

        let result = active.append(record);
        let roll_base = match &result {
            Err(_) if active.is_full() => Some(active.next_offset()),
            _ => None,
        };

        if let Some(base_offset) = roll_base {
            let segment = Segment::open(&self.dir, base_offset, &self.config)?;
            inner.segments.push(segment);
            info!(base_offset, "rolled over to new active segment");
        }

        result
    }

    /// Reads the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let inner = self.inner.read().unwrap();
        let segment = inner
            .segments
            .iter()
            .find(|segment| segment.contains(offset))
            .ok_or(Error::OffsetOutOfRange { offset })?;
        segment.read(offset)
    }

    /// Number of segments currently held by the log.
    pub fn segment_count(&self) -> usize {
        self.inner.read().unwrap().segments.len()
    }

    /// Directory the log's segment files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Closes every segment in order, flushing stores and truncating
    /// indexes. The log accepts no further appends or reads afterwards.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        for segment in inner.segments.drain(..) {
            segment.close()?;
        }
        Ok(())
    }

    /// Closes the log and deletes its directory.
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    /// Removes the log and re-creates it empty, with one fresh segment at
    /// the configured initial offset.
    pub fn reset(&self) -> Result<()> {
        self.remove()?;
        fs::create_dir_all(&self.dir)?;
        let segments = recover_segments(&self.dir, &self.config)?;
        self.inner.write().unwrap().segments = segments;
        Ok(())
    }
}

/// Rebuilds the segment list from the files in `dir`.
fn recover_segments(dir: &Path, config: &LogConfig) -> Result<Vec<Segment>> {
    let mut base_offsets = BTreeSet::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let stem = path.file_stem().and_then(|s| s.to_str());
        let ext = path.extension().and_then(|s| s.to_str());
        let (Some(stem), Some(ext)) = (stem, ext) else {
            warn!(path = %path.display(), "skipping file without stem or extension");
            continue;
        };
        if ext != "store" && ext != "index" {
            warn!(path = %path.display(), "skipping file with unknown extension");
            continue;
        }
        match stem.parse::<u64>() {
            Ok(base_offset) => {
                base_offsets.insert(base_offset);
            }
            Err(_) => {
                warn!(path = %path.display(), "skipping file with non-numeric base offset");
            }
        }
    }

    let mut segments = Vec::with_capacity(base_offsets.len().max(1));
    for base_offset in base_offsets {
        segments.push(Segment::open(dir, base_offset, config)?);
    }
    if segments.is_empty() {
        segments.push(Segment::open(dir, config.initial_offset, config)?);
    }
    Ok(segments)
}
