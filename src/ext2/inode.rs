//! EXT2 inode structure.
//!
//! Only the leading 128 bytes of an inode record are decoded; larger
//! records carry trailing fields that are ignored.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::io;

use super::ext2_error::Ext2Error;

/// Number of block pointers in an inode.
pub const N_BLOCKS: usize = 15;
/// Number of direct block pointers.
pub const DIRECT_BLOCKS: usize = 12;
/// Index of the single-indirect pointer.
pub const INDIRECT_BLOCK: usize = 12;
/// Index of the double-indirect pointer.
pub const DOUBLE_INDIRECT_BLOCK: usize = 13;
/// Index of the triple-indirect pointer.
pub const TRIPLE_INDIRECT_BLOCK: usize = 14;

const S_IFMT: u16 = 0xF000;
const S_IFDIR: u16 = 0x4000;

/// On-disk inode.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct Inode {
    /// File type and permission bits
    #[get = "pub"]
    mode: u16,
    #[get = "pub"]
    uid: u16,
    /// Size in bytes (lower 32 bits)
    #[get = "pub"]
    size: u32,
    #[get = "pub"]
    atime: u32,
    #[get = "pub"]
    ctime: u32,
    #[get = "pub"]
    mtime: u32,
    #[get = "pub"]
    dtime: u32,
    #[get = "pub"]
    gid: u16,
    #[get = "pub"]
    links_count: u16,
    /// Allocated 512-byte sectors
    _sectors: u32,
    _flags: u32,
    _osd1: u32,
    /// Direct, single, double and triple indirect block pointers
    #[get = "pub"]
    block: [u32; N_BLOCKS],
    _generation: u32,
    _file_acl: u32,
    _dir_acl: u32,
    _faddr: u32,
    _osd2: [u32; 3],
}

impl Inode {
    /// Decodes an inode from the start of an inode record.
    ///
    /// # Errors
    /// - `Ext2Error::BinReadError` if the record is shorter than 128 bytes.
    pub fn from_slice(buf: &[u8]) -> Result<Self, Ext2Error> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(Ext2Error::from)
    }

    /// Checks the file type bits of `mode` for a directory.
    pub fn is_dir(&self) -> bool {
        self.mode & S_IFMT == S_IFDIR
    }

    /// Number of data blocks needed to hold `size` bytes.
    pub fn blocks_needed(&self, block_size: u32) -> u64 {
        u64::from(self.size).div_ceil(u64::from(block_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_block_pointers() {
        let mut buf = vec![0u8; 256];
        buf[0..2].copy_from_slice(&0x41EDu16.to_le_bytes());
        buf[4..8].copy_from_slice(&2048u32.to_le_bytes());
        buf[26..28].copy_from_slice(&3u16.to_le_bytes());
        for i in 0..N_BLOCKS {
            let off = 40 + i * 4;
            buf[off..off + 4].copy_from_slice(&(100 + i as u32).to_le_bytes());
        }
        // Trailing bytes past the fixed layout are ignored.
        buf[200] = 0xFF;

        let inode = Inode::from_slice(&buf).unwrap();
        assert!(inode.is_dir());
        assert_eq!(*inode.size(), 2048);
        assert_eq!(*inode.links_count(), 3);
        assert_eq!(inode.block()[0], 100);
        assert_eq!(inode.block()[TRIPLE_INDIRECT_BLOCK], 114);
    }

    #[test]
    fn test_blocks_needed() {
        let mut buf = vec![0u8; 128];
        buf[4..8].copy_from_slice(&1025u32.to_le_bytes());
        let inode = Inode::from_slice(&buf).unwrap();
        assert_eq!(inode.blocks_needed(1024), 2);
        assert_eq!(inode.blocks_needed(4096), 1);
    }
}
