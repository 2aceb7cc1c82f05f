//! FAT directory entry structure and parsing.
//!
//! This module implements the FAT directory entry structure which contains metadata
//! about files and directories stored in the filesystem. Each directory entry is 32 bytes
//! and contains information such as filename, attributes, timestamps, and cluster allocation.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;
use crate::tree::NodeKind;

/// First name byte marking the end of a directory.
pub const END_OF_DIR: u8 = 0x00;
/// First name byte marking a deleted entry.
pub const DELETED: u8 = 0xE5;
/// Attribute value of a long-filename continuation entry.
pub const ATTR_LONG_NAME: u8 = 0x0F;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;

/// FAT directory entry structure.
///
/// Each directory entry is exactly 32 bytes and contains metadata about a file or directory.
///
/// # Notes
/// - Timestamp fields are prefixed with underscore as they're not currently used
/// - The name field uses the legacy 8.3 format with space padding
/// - Only the low 16 bits of the first cluster are meaningful on FAT16
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct DirEntry {
    /// Filename in 8.3 format (8 characters name + 3 characters extension)
    #[get = "pub"]
    name: [u8; 11],
    /// File attributes byte
    #[get = "pub"]
    attr: u8,
    /// NT reserved (unused)
    _n_t_res: u8,
    /// Creation time in 10ms units
    _ctr_time_tenth: u8,
    /// Creation time
    _crt_time: u16,
    /// Creation date
    _crt_date: u16,
    /// Last access date
    _lst_acc_date: u16,
    /// High 16 bits of first cluster number
    _fst_clus_hi: u16,
    /// Last write time
    _wrt_time: u16,
    /// Last write date
    _wrt_date: u16,
    /// Low 16 bits of first cluster number
    fst_clus_lo: u16,
    /// File size in bytes (0 for directories)
    #[get = "pub"]
    file_size: u32,
}

impl DirEntry {
    /// Creates a directory entry from a byte slice.
    ///
    /// # Errors
    /// - `FATError::BinReadError` if the slice is shorter than 32 bytes
    pub fn from_slice(buf: &[u8]) -> Result<Self, FATError> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(FATError::from)
    }

    /// Decodes the entries of a directory region, in on-disk order.
    ///
    /// Scanning stops at the first entry whose name starts with 0x00.
    /// Deleted entries and long-filename continuation entries are skipped.
    ///
    /// # Returns
    /// The decoded entries, and whether the end-of-directory marker was met.
    pub fn parse_region(buf: &[u8]) -> Result<(Vec<DirEntry>, bool), FATError> {
        let mut entries = vec![];

        for raw in buf.chunks_exact(32) {
            match (raw[0], raw[11]) {
                (END_OF_DIR, _) => return Ok((entries, true)),
                (DELETED, _) => continue,
                (_, ATTR_LONG_NAME) => continue,
                _ => entries.push(DirEntry::from_slice(raw)?),
            }
        }

        Ok((entries, false))
    }

    /// Returns the first cluster number for this entry.
    pub fn cluster_number(&self) -> u16 {
        self.fst_clus_lo
    }

    /// Checks if the directory attribute bit (0x10) is set.
    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// Whether the walk should descend into this entry: a directory whose
    /// raw name does not start with `.`.
    pub fn is_regular_dir(&self) -> bool {
        self.is_dir() && self.name[0] != b'.'
    }

    /// Checks whether the raw 11-byte name equals `name11` byte for byte.
    pub fn same_short_name(&self, name11: &[u8; 11]) -> bool {
        &self.name == name11
    }

    pub fn kind(&self) -> NodeKind {
        if self.is_dir() {
            NodeKind::Directory
        } else if self.attr & ATTR_VOLUME_ID != 0 {
            NodeKind::VolumeLabel
        } else {
            NodeKind::File
        }
    }

    /// Renders the 8.3 name as `NAME.EXT`, or `NAME` without an extension.
    pub fn display_name(&self) -> String {
        let name = String::from_utf8_lossy(&self.name[0..8]);
        let ext = String::from_utf8_lossy(&self.name[8..11]);
        let name = name.trim_end();
        let ext = ext.trim_end();

        if ext.is_empty() {
            name.to_string()
        } else {
            format!("{name}.{ext}")
        }
    }
}

/// Converts a path component to its padded, upper-case 8.3 form.
///
/// The component is split on its last `.`; the name part, earlier dots
/// included, is truncated to 8 characters and the extension to 3. `.` and `..` map to the dot
/// entries found in every subdirectory.
pub fn format_name(input: &str) -> [u8; 11] {
    let mut out = [b' '; 11];

    if input == "." || input == ".." {
        out[..input.len()].copy_from_slice(input.as_bytes());
        return out;
    }

    let (name, ext) = match input.rfind('.') {
        Some(dot) => (&input[..dot], &input[dot + 1..]),
        None => (input, ""),
    };

    for (dst, src) in out[..8].iter_mut().zip(name.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    for (dst, src) in out[8..].iter_mut().zip(ext.bytes()) {
        *dst = src.to_ascii_uppercase();
    }

    out
}

impl fmt::Display for DirEntry {
    /// Formats the directory entry for display.
    ///
    /// # Returns
    /// - A string representation showing the filename and file size
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" {}B", self.display_name(), self.file_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(name: &[u8; 11], attr: u8, cluster: u16, size: u32) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[0..11].copy_from_slice(name);
        raw[11] = attr;
        raw[26..28].copy_from_slice(&cluster.to_le_bytes());
        raw[28..32].copy_from_slice(&size.to_le_bytes());
        raw
    }

    #[test]
    fn test_format_name() {
        assert_eq!(&format_name("readme.txt"), b"README  TXT");
        assert_eq!(&format_name("a"), b"A          ");
        assert_eq!(&format_name("longname12.abcd"), b"LONGNAMEABC");
        // Only the last dot splits; earlier dots stay in the name part.
        assert_eq!(&format_name("archive.tar.gz"), b"ARCHIVE.GZ ");
        assert_eq!(&format_name("a.b.c"), b"A.B     C  ");
        assert_eq!(&format_name(".."), b"..         ");
    }

    #[test]
    fn test_decode_entry() {
        let entry = DirEntry::from_slice(&raw_entry(b"NOTES   TXT", 0x20, 7, 1234)).unwrap();
        assert_eq!(entry.cluster_number(), 7);
        assert_eq!(*entry.file_size(), 1234);
        assert_eq!(entry.display_name(), "NOTES.TXT");
        assert_eq!(entry.kind(), NodeKind::File);
        assert!(entry.same_short_name(&format_name("notes.txt")));
    }

    #[test]
    fn test_dot_entries_not_descended() {
        let dot = DirEntry::from_slice(&raw_entry(b".          ", ATTR_DIRECTORY, 5, 0)).unwrap();
        let dir = DirEntry::from_slice(&raw_entry(b"SUB        ", ATTR_DIRECTORY, 6, 0)).unwrap();
        let file = DirEntry::from_slice(&raw_entry(b".PROFILE   ", 0x20, 8, 10)).unwrap();
        assert!(!dot.is_regular_dir());
        assert!(dir.is_regular_dir());
        assert!(!file.is_regular_dir());
        assert_eq!(dir.display_name(), "SUB");
    }

    #[test]
    fn test_parse_region_sentinels() {
        let mut region = vec![];
        region.extend(raw_entry(b"FIRST   TXT", 0x20, 3, 1));
        let mut deleted = raw_entry(b"GONE    TXT", 0x20, 4, 1);
        deleted[0] = DELETED;
        region.extend(deleted);
        region.extend(raw_entry(b"Ablong name", ATTR_LONG_NAME, 0, 0));
        region.extend(raw_entry(b"SECOND  TXT", 0x20, 5, 1));
        region.extend([0u8; 32]);
        region.extend(raw_entry(b"STALE   TXT", 0x20, 6, 1));

        let (entries, ended) = DirEntry::parse_region(&region).unwrap();
        let names: Vec<String> = entries.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, vec!["FIRST.TXT", "SECOND.TXT"]);
        assert!(ended);
    }
}
