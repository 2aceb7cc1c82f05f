//! Positioned reads against a disk image or block device.
//!
//! The store wraps any seekable reader. Every read is an explicit
//! seek followed by a read of the requested length; nothing is cached.

use log::debug;
use std::io::{self, ErrorKind, Read, Seek, SeekFrom};
use thiserror::Error;

/// Errors raised at the block store boundary.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Open, seek or read failure reported by the underlying reader.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Fewer bytes than requested were available.
    #[error("Short read at offset {offset}: expected {expected} bytes, got {got}")]
    ShortRead {
        offset: u64,
        expected: usize,
        got: usize,
    },
}

/// A seekable, readable byte source exposing fixed-size positioned reads.
pub struct BlockStore<R: Read + Seek> {
    inner: R,
}

impl<R: Read + Seek> BlockStore<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads exactly `length` bytes starting at byte `offset`.
    ///
    /// # Errors
    /// - `StoreError::ShortRead` if the source ends before `length` bytes were read.
    /// - `StoreError::Io` on any seek or read fault.
    pub fn read_at(&mut self, offset: u64, length: usize) -> Result<Vec<u8>, StoreError> {
        let (buf, got) = self.fill_at(offset, length)?;
        if got != length {
            return Err(StoreError::ShortRead {
                offset,
                expected: length,
                got,
            });
        }

        Ok(buf)
    }

    /// Reads a block of `length` bytes at `offset`, treating a read that
    /// returns no bytes at all as an empty block.
    ///
    /// # Returns
    /// - `Ok(None)` if nothing is stored at `offset`.
    /// - `Ok(Some(buf))` with exactly `length` bytes otherwise.
    ///
    /// # Errors
    /// - `StoreError::ShortRead` if some, but not all, of the bytes were available.
    pub fn read_block_at(
        &mut self,
        offset: u64,
        length: usize,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let (buf, got) = self.fill_at(offset, length)?;
        match got {
            0 if length > 0 => {
                debug!("Empty block at offset {offset}");
                Ok(None)
            }
            n if n == length => Ok(Some(buf)),
            n => Err(StoreError::ShortRead {
                offset,
                expected: length,
                got: n,
            }),
        }
    }

    fn fill_at(&mut self, offset: u64, length: usize) -> Result<(Vec<u8>, usize), StoreError> {
        let mut buf = vec![0; length];
        self.inner.seek(SeekFrom::Start(offset))?;

        let mut got = 0;
        while got < length {
            match self.inner.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    return Err(StoreError::Io(io::Error::new(
                        err.kind(),
                        format!("Failed to read {length} bytes at offset {offset}: {err}"),
                    )));
                }
            }
        }

        Ok((buf, got))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn store() -> BlockStore<Cursor<Vec<u8>>> {
        BlockStore::new(Cursor::new((0u8..16).collect()))
    }

    #[test]
    fn test_read_at_exact() {
        assert_eq!(store().read_at(4, 3).unwrap(), vec![4, 5, 6]);
    }

    #[test]
    fn test_read_at_short() {
        match store().read_at(12, 8) {
            Err(StoreError::ShortRead {
                offset: 12,
                expected: 8,
                got: 4,
            }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_read_block_past_end_is_empty() {
        assert!(store().read_block_at(64, 8).unwrap().is_none());
    }

    #[test]
    fn test_read_block_partial_is_short_read() {
        assert!(matches!(
            store().read_block_at(10, 8),
            Err(StoreError::ShortRead { got: 6, .. })
        ));
    }
}
