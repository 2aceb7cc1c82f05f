//! EXT2 directory entries.
//!
//! Directory data blocks hold variable-length records. Each record's
//! `rec_len` gives the distance to the next record; a record with a zero
//! inode number or a zero `rec_len` ends the scan of the block.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use log::warn;
use std::fmt;
use std::io;

use super::ext2_error::Ext2Error;
use crate::tree::NodeKind;

/// Size of the fixed header preceding the name.
pub const DIR_ENTRY_HEADER_SIZE: usize = 8;

/// File type tags stored in directory entries.
pub const FT_REG_FILE: u8 = 1;
pub const FT_DIR: u8 = 2;
pub const FT_SYMLINK: u8 = 7;

/// One decoded directory record.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct DirEntry {
    /// Inode number, 0 for an unused record
    #[get = "pub"]
    inode: u32,
    /// Distance in bytes to the next record
    #[get = "pub"]
    rec_len: u16,
    name_len: u8,
    /// File type tag
    #[get = "pub"]
    file_type: u8,
    #[br(count = usize::from(name_len))]
    name: Vec<u8>,
}

impl DirEntry {
    /// Decodes the record at the start of `buf`.
    pub fn from_slice(buf: &[u8]) -> Result<Self, Ext2Error> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(Ext2Error::from)
    }

    /// Decodes every record of a directory data block, in on-disk order.
    ///
    /// The scan stops at the first record whose inode number or record
    /// length is zero, at a record length that runs past the block, or at
    /// a name that does not fit in its record.
    pub fn parse_block(block: &[u8]) -> Vec<DirEntry> {
        let mut entries = vec![];
        let mut pos = 0;

        while pos + DIR_ENTRY_HEADER_SIZE <= block.len() {
            let rest = &block[pos..];
            let (Some(inode), Some(rec_len)) =
                (crate::utils::u32_at(rest, 0), crate::utils::u16_at(rest, 4))
            else {
                break;
            };
            if inode == 0 || rec_len == 0 {
                break;
            }

            let rec_len = usize::from(rec_len);
            if rec_len > rest.len() {
                warn!("Directory record at {pos} overruns its block ({rec_len} bytes)");
                break;
            }

            match DirEntry::from_slice(&rest[..rec_len]) {
                Ok(entry) => entries.push(entry),
                Err(err) => {
                    warn!("Malformed directory record at {pos}: {err}");
                    break;
                }
            }
            pos += rec_len;
        }

        entries
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// Whether this is the `.` or `..` entry.
    pub fn is_dot(&self) -> bool {
        self.name == b"." || self.name == b".."
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FT_DIR
    }

    pub fn kind(&self) -> NodeKind {
        match self.file_type {
            FT_REG_FILE => NodeKind::File,
            FT_DIR => NodeKind::Directory,
            FT_SYMLINK => NodeKind::Symlink,
            _ => NodeKind::Other,
        }
    }
}

impl fmt::Display for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" inode {}", self.name(), self.inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(inode: u32, rec_len: u16, file_type: u8, name: &[u8]) -> Vec<u8> {
        let mut rec = vec![0u8; rec_len as usize];
        rec[0..4].copy_from_slice(&inode.to_le_bytes());
        rec[4..6].copy_from_slice(&rec_len.to_le_bytes());
        rec[6] = name.len() as u8;
        rec[7] = file_type;
        rec[8..8 + name.len()].copy_from_slice(name);
        rec
    }

    #[test]
    fn test_parse_uses_record_length() {
        let mut block = vec![];
        block.extend(record(2, 12, FT_DIR, b"."));
        block.extend(record(2, 12, FT_DIR, b".."));
        block.extend(record(12, 24, FT_REG_FILE, b"hello.txt"));
        block.extend(record(13, 1024 - 48, FT_DIR, b"src"));

        let entries = DirEntry::parse_block(&block);
        let names: Vec<String> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, vec![".", "..", "hello.txt", "src"]);
        assert!(entries[0].is_dot() && entries[1].is_dot());
        assert_eq!(entries[2].kind(), NodeKind::File);
        assert!(entries[3].is_dir());
    }

    #[test]
    fn test_parse_stops_at_zero_fill() {
        let mut block = vec![];
        block.extend(record(11, 12, FT_REG_FILE, b"a"));
        block.extend(record(12, 12, FT_REG_FILE, b"b"));
        block.resize(1024, 0);
        // Stale bytes after the zero-filled region must not be reached.
        block[512..524].copy_from_slice(&record(99, 12, FT_REG_FILE, b"z"));

        assert_eq!(DirEntry::parse_block(&block).len(), 2);
    }

    #[test]
    fn test_parse_stops_at_overrun() {
        let mut block = record(11, 12, FT_REG_FILE, b"a");
        block.extend(record(12, 12, FT_REG_FILE, b"b"));
        block[16..18].copy_from_slice(&500u16.to_le_bytes());

        assert_eq!(DirEntry::parse_block(&block).len(), 1);
    }
}
