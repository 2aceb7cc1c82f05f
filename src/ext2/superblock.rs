//! EXT2 superblock structure.
//!
//! This module implements:
//! - Superblock parsing from the fixed 1024-byte region at byte offset 1024
//! - Magic signature detection
//! - The geometry formulas derived from the superblock (block size,
//!   group descriptor and inode table addressing)

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::io;

use super::ext2_error::Ext2Error;

/// Byte offset of the superblock from the start of the volume.
pub const SUPERBLOCK_OFFSET: u64 = 1024;
/// Size in bytes of the superblock region.
pub const SUPERBLOCK_SIZE: usize = 1024;
/// The EXT2 magic signature, stored at offset 0x38 of the superblock.
pub const EXT2_MAGIC: u16 = 0xEF53;
/// Size of the fixed inode layout, and of every inode in revision 0.
pub const GOOD_OLD_INODE_SIZE: u16 = 128;

/// EXT2 superblock, decoded field by field up to the volume name.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct Superblock {
    /// 0x00: Total inodes count
    #[get = "pub"]
    inodes_count: u32,
    /// 0x04: Total blocks count
    #[get = "pub"]
    blocks_count: u32,
    /// 0x08: Reserved blocks count
    #[get = "pub"]
    r_blocks_count: u32,
    /// 0x0C: Free blocks count
    #[get = "pub"]
    free_blocks_count: u32,
    /// 0x10: Free inodes count
    #[get = "pub"]
    free_inodes_count: u32,
    /// 0x14: Index of the first data block
    #[get = "pub"]
    first_data_block: u32,
    /// 0x18: Block size is `1024 << log_block_size`
    #[get = "pub"]
    log_block_size: u32,
    /// 0x1C: Fragment size exponent
    _log_frag_size: u32,
    /// 0x20: Blocks per group
    #[get = "pub"]
    blocks_per_group: u32,
    /// 0x24: Fragments per group
    #[get = "pub"]
    frags_per_group: u32,
    /// 0x28: Inodes per group
    #[get = "pub"]
    inodes_per_group: u32,
    /// 0x2C: Last mount time
    #[get = "pub"]
    mtime: u32,
    /// 0x30: Last write time
    #[get = "pub"]
    wtime: u32,
    /// 0x34: Mount count since last check
    _mnt_count: u16,
    /// 0x36: Mounts allowed before a check
    _max_mnt_count: u16,
    /// 0x38: Magic signature
    #[get = "pub"]
    magic: u16,
    /// 0x3A: File system state
    _state: u16,
    /// 0x3C: Behaviour when detecting errors
    _errors: u16,
    /// 0x3E: Minor revision level
    _minor_rev_level: u16,
    /// 0x40: Time of last check
    #[get = "pub"]
    lastcheck: u32,
    /// 0x44: Max time between checks
    _checkinterval: u32,
    /// 0x48: OS that created the filesystem
    _creator_os: u32,
    /// 0x4C: Revision level
    #[get = "pub"]
    rev_level: u32,
    /// 0x50: Default uid for reserved blocks
    _def_resuid: u16,
    /// 0x52: Default gid for reserved blocks
    _def_resgid: u16,
    /// 0x54: First non-reserved inode
    #[get = "pub"]
    first_ino: u32,
    /// 0x58: Inode record size (revision 1 and later)
    s_inode_size: u16,
    /// 0x5A: Block group hosting this superblock
    _block_group_nr: u16,
    /// 0x5C: Compatible feature set
    _feature_compat: u32,
    /// 0x60: Incompatible feature set
    _feature_incompat: u32,
    /// 0x64: Read-only compatible feature set
    _feature_ro_compat: u32,
    /// 0x68: Volume UUID
    _uuid: [u8; 16],
    /// 0x78: Volume name
    volume_name: [u8; 16],
}

impl Superblock {
    /// Decodes a superblock from the 1024-byte superblock region.
    ///
    /// # Errors
    /// - `Ext2Error::BinReadError` if the buffer is too short.
    pub fn from_slice(buf: &[u8]) -> Result<Self, Ext2Error> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(Ext2Error::from)
    }

    /// Whether the magic signature identifies an EXT2-family volume.
    pub fn has_magic(&self) -> bool {
        self.magic == EXT2_MAGIC
    }

    /// Returns the block size in bytes, `1024 << log_block_size`.
    ///
    /// # Errors
    /// - `Ext2Error::InvalidBlockSize` if the exponent exceeds 64 KiB blocks.
    pub fn block_size(&self) -> Result<u32, Ext2Error> {
        match self.log_block_size {
            0..=6 => Ok(1024 << self.log_block_size),
            other => Err(Ext2Error::InvalidBlockSize(other)),
        }
    }

    /// Returns the size of one on-disk inode record.
    ///
    /// Revision 0 leaves the size field unset and always uses 128 bytes.
    pub fn inode_size(&self) -> Result<u16, Ext2Error> {
        let size = match self.rev_level {
            0 => GOOD_OLD_INODE_SIZE,
            _ => self.s_inode_size,
        };
        if size < GOOD_OLD_INODE_SIZE {
            return Err(Ext2Error::InvalidInodeSize(size));
        }
        Ok(size)
    }

    /// Returns the byte offset of the group descriptor table.
    ///
    /// With 1024-byte blocks the superblock fills block 1 and the table
    /// starts at byte 2048; otherwise it starts at block 1.
    pub fn group_desc_offset(&self) -> Result<u64, Ext2Error> {
        let block_size = self.block_size()?;
        Ok(match block_size {
            1024 => 2048,
            _ => block_size.into(),
        })
    }

    /// Returns the byte offset of a block.
    pub fn block_offset(&self, block: u32) -> Result<u64, Ext2Error> {
        Ok(u64::from(block) * u64::from(self.block_size()?))
    }

    /// Returns the byte offset of inode `inode_number` within the inode
    /// table starting at block `inode_table`.
    ///
    /// # Errors
    /// - `Ext2Error::InvalidInode` for inode 0, which does not exist.
    pub fn inode_offset(&self, inode_table: u32, inode_number: u32) -> Result<u64, Ext2Error> {
        let index = inode_number
            .checked_sub(1)
            .ok_or(Ext2Error::InvalidInode(inode_number))?;
        Ok(self.block_offset(inode_table)? + u64::from(index) * u64::from(self.inode_size()?))
    }

    /// Number of 4-byte block pointers in one indirect block.
    pub fn pointers_per_block(&self) -> Result<u64, Ext2Error> {
        Ok(u64::from(self.block_size()?) / 4)
    }

    /// Whether a block pointer can be followed: non-zero and below the
    /// total block count.
    pub fn is_valid_block(&self, block: u32) -> bool {
        block != 0 && block < self.blocks_count
    }

    /// Returns the volume name with its padding removed.
    pub fn volume_name(&self) -> String {
        crate::utils::padded_str(&self.volume_name)
    }
}
