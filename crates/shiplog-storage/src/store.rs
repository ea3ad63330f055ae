//! Append-only store file.
//!
//! The store is the byte-level half of a segment: a flat file holding record
//! payloads as tightly packed frames. Each frame is an 8-byte big-endian
//! length prefix followed by that many payload bytes; there is no header,
//! trailer, or checksum beyond the prefix.
//!
//! ```text
//! ┌──────────────┬────────────┬──────────────┬────────────┬───
//! │ len (8, BE)  │  payload   │ len (8, BE)  │  payload   │ ...
//! └──────────────┴────────────┴──────────────┴────────────┴───
//! ```
//!
//! Appends go through a buffered writer; reads flush the buffer first and
//! then use positioned reads, so a record is visible through the file the
//! moment its append returns. All operations are serialized on the store's
//! own lock.

use std::fs::File;
use std::io::{BufWriter, ErrorKind, Write};
use std::os::unix::fs::FileExt;
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Width of the length prefix written in front of every frame.
pub const LEN_PREFIX_BYTES: u64 = 8;

#[derive(Debug)]
pub struct Store {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    /// Handle used for positioned reads; shares the open file description
    /// with the buffered writer.
    file: File,
    writer: BufWriter<File>,
    size: u64,
    max_bytes: u64,
}

impl Store {
    /// Wraps an open file in a store bounded at `max_bytes` of payload.
    ///
    /// The file's current length becomes the store's starting size, so a
    /// store reopened over an existing file resumes appending at the end.
    /// The file must have been opened in append mode for that to hold.
    pub fn open(file: File, max_bytes: u64) -> Result<Self> {
        if max_bytes == 0 {
            return Err(Error::ZeroCapacity("store"));
        }
        let size = file.metadata()?.len();
        let reader = file.try_clone()?;
        Ok(Self {
            inner: Mutex::new(Inner {
                file: reader,
                writer: BufWriter::new(file),
                size,
                max_bytes,
            }),
        })
    }

    /// Appends `payload` as one frame.
    ///
    /// Returns the number of bytes written (payload plus length prefix) and
    /// the position the frame starts at. Fails with [`Error::FileFull`] once
    /// the payload would push the store past its maximum size; the length
    /// prefix is intentionally not counted against the limit, so the file on
    /// disk may run up to 8 bytes per frame past the configured maximum.
    pub fn append(&self, payload: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.inner.lock().unwrap();

        if inner.size + payload.len() as u64 > inner.max_bytes {
            return Err(Error::FileFull);
        }

        let position = inner.size;
        inner
            .writer
            .write_all(&(payload.len() as u64).to_be_bytes())?;
        inner.writer.write_all(payload)?;

        let written = LEN_PREFIX_BYTES + payload.len() as u64;
        inner.size += written;
        Ok((written, position))
    }

    /// Reads the payload of the frame starting at `position`.
    ///
    /// Pending buffered writes are flushed first. A position past the end of
    /// the stored data fails with [`Error::EndOfFile`].
    pub fn read(&self, position: u64) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        inner.writer.flush()?;

        let mut len_buf = [0u8; LEN_PREFIX_BYTES as usize];
        read_frame_at(&inner.file, &mut len_buf, position)?;

        let len = u64::from_be_bytes(len_buf);
        let mut payload = vec![0u8; len as usize];
        read_frame_at(&inner.file, &mut payload, position + LEN_PREFIX_BYTES)?;

        Ok(payload)
    }

    /// Fills `buf` from the store starting at `position`, flushing pending
    /// writes first. Returns the number of bytes read.
    pub fn read_at(&self, buf: &mut [u8], position: u64) -> Result<usize> {
        let mut inner = self.inner.lock().unwrap();
        inner.writer.flush()?;
        read_frame_at(&inner.file, buf, position)?;
        Ok(buf.len())
    }

    /// Bytes currently held by the store, including buffered writes.
    pub fn size(&self) -> u64 {
        self.inner.lock().unwrap().size
    }

    /// Flushes buffered writes and syncs the file. The descriptors are
    /// released when the store is dropped.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.writer.flush()?;
        inner.file.sync_all()?;
        Ok(())
    }
}

/// Positioned read mapping a short read past the end to [`Error::EndOfFile`].
/// Other I/O failures keep their identity.
fn read_frame_at(file: &File, buf: &mut [u8], position: u64) -> Result<()> {
    file.read_exact_at(buf, position).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            Error::EndOfFile
        } else {
            Error::Io(e)
        }
    })
}
