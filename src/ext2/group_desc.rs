//! EXT2 block group descriptor.

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::io;

use super::ext2_error::Ext2Error;

/// Size in bytes of one group descriptor record.
pub const GROUP_DESC_SIZE: usize = 32;

/// Block group descriptor. Only the descriptor of group 0 is ever read.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct GroupDesc {
    /// Block number of the block bitmap
    #[get = "pub"]
    block_bitmap: u32,
    /// Block number of the inode bitmap
    #[get = "pub"]
    inode_bitmap: u32,
    /// First block of the inode table
    #[get = "pub"]
    inode_table: u32,
    /// Free blocks in the group
    #[get = "pub"]
    free_blocks_count: u16,
    /// Free inodes in the group
    #[get = "pub"]
    free_inodes_count: u16,
    /// Directories in the group
    #[get = "pub"]
    used_dirs_count: u16,
    _pad: u16,
    _reserved: [u8; 12],
}

impl GroupDesc {
    pub fn from_slice(buf: &[u8]) -> Result<Self, Ext2Error> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(Ext2Error::from)
    }
}
