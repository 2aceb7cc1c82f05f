//! EXT2 volume structure and operations.
//!
//! This module implements the core functions to read an EXT2 volume:
//! - Detecting the volume from its superblock
//! - Reading the group 0 descriptor and inodes
//! - Resolving an inode's data blocks through direct and indirect pointers
//! - Walking the directory hierarchy
//! - Displaying the superblock summary
//!
//! Only block group 0 is consulted. Inodes stored in later groups of a
//! multi-group volume are read from the wrong place.

use chrono::DateTime;
use log::{debug, error, info, warn};
use std::fmt::Write as FmtWrite;
use std::io::{Read, Seek, Write};

use super::dir_entry::DirEntry;
use super::ext2_error::Ext2Error;
use super::group_desc::{GROUP_DESC_SIZE, GroupDesc};
use super::inode::{
    DIRECT_BLOCKS, DOUBLE_INDIRECT_BLOCK, INDIRECT_BLOCK, Inode, TRIPLE_INDIRECT_BLOCK,
};
use super::superblock::{SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE, Superblock};
use crate::disk::block_store::{BlockStore, StoreError};
use crate::traits::{FileSystem, LayoutDisplay};
use crate::tree::{TreeNode, TreeWalk};
use crate::utils::u32_entries;

/// Inode number of the root directory.
pub const ROOT_INODE: u32 = 2;

/// Structure for an EXT2 volume.
///
/// Essentially, it is a wrapper around the superblock.
#[derive(Debug, Clone)]
pub struct Ext2Vol {
    sb: Superblock,
}

impl Ext2Vol {
    pub fn new(sb: Superblock) -> Self {
        Self { sb }
    }

    /// Reads the superblock and checks its magic signature.
    ///
    /// # Returns
    /// - `Ok(Some(Ext2Vol))` if the magic signature matches.
    /// - `Ok(None)` if it does not, or if the image is too small to hold
    ///   a superblock.
    pub fn detect<R: Read + Seek>(store: &mut BlockStore<R>) -> Result<Option<Self>, Ext2Error> {
        let buf = match store.read_at(SUPERBLOCK_OFFSET, SUPERBLOCK_SIZE) {
            Ok(buf) => buf,
            Err(StoreError::ShortRead { got, .. }) => {
                debug!("Image too small for an EXT2 superblock ({got} bytes available)");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let sb = Superblock::from_slice(&buf)?;
        if !sb.has_magic() {
            debug!("No EXT2 magic: found 0x{:04X}", sb.magic());
            return Ok(None);
        }

        // The block size exponent is checked when the geometry is used.
        info!(
            "EXT2 volume detected: {} blocks, block size exponent {}",
            sb.blocks_count(),
            sb.log_block_size()
        );
        Ok(Some(Self::new(sb)))
    }

    /// Reads the descriptor of block group 0.
    pub fn read_group_descriptor<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
    ) -> Result<GroupDesc, Ext2Error> {
        let buf = store.read_at(self.sb.group_desc_offset()?, GROUP_DESC_SIZE)?;
        let gd = GroupDesc::from_slice(&buf)?;

        debug!("Block bitmap block: {}", gd.block_bitmap());
        debug!("Inode bitmap block: {}", gd.inode_bitmap());
        debug!("Inode table block: {}", gd.inode_table());

        Ok(gd)
    }

    /// Reads inode `inode_number` from the inode table of group 0.
    ///
    /// # Errors
    /// - `Ext2Error::InvalidInode` for inode 0.
    /// - `Ext2Error::Store` if the inode record cannot be read.
    pub fn read_inode<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        gd: &GroupDesc,
        inode_number: u32,
    ) -> Result<Inode, Ext2Error> {
        let offset = self.sb.inode_offset(*gd.inode_table(), inode_number)?;
        let buf = store.read_at(offset, self.sb.inode_size()?.into())?;
        Inode::from_slice(&buf)
    }

    /// Lists the data blocks of `inode`, in file order.
    ///
    /// Direct pointers come first, followed by the blocks reached through
    /// the single, double and triple indirect pointers. An indirection tier
    /// is consulted only when the blocks needed for `size` exceed what the
    /// previous tiers address. Pointers that are zero or beyond the block
    /// count are holes and are skipped; pointers past the needed count are
    /// ignored.
    ///
    /// # Errors
    /// Returns an error if a pointer block cannot be read.
    pub fn resolve_blocks<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        inode: &Inode,
    ) -> Result<Vec<u32>, Ext2Error> {
        let needed = inode.blocks_needed(self.sb.block_size()?);
        let mut remaining = needed;
        let mut blocks = vec![];

        for tier in 0..=3 {
            if remaining == 0 {
                break;
            }
            blocks.extend(self.resolve_tier(store, inode, tier, &mut remaining)?);
        }

        debug!(
            "Inode of {} bytes resolves to {} of {} needed blocks",
            inode.size(),
            blocks.len(),
            needed
        );
        Ok(blocks)
    }

    /// Lists the data blocks addressed by one tier of `inode`: 0 for the
    /// direct pointers, 1 to 3 for the single, double and triple indirect
    /// pointer. `remaining` counts the blocks still needed for the file size
    /// and is decremented by every slot the tier covers.
    fn resolve_tier<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        inode: &Inode,
        tier: u32,
        remaining: &mut u64,
    ) -> Result<Vec<u32>, Ext2Error> {
        let mut blocks = vec![];

        let index = match tier {
            0 => {
                for &blk in inode.block().iter().take(DIRECT_BLOCKS) {
                    if *remaining == 0 {
                        break;
                    }
                    *remaining -= 1;
                    self.push_data_block(blk, &mut blocks);
                }
                return Ok(blocks);
            }
            1 => INDIRECT_BLOCK,
            2 => DOUBLE_INDIRECT_BLOCK,
            _ => TRIPLE_INDIRECT_BLOCK,
        };

        let ptr = inode.block()[index];
        if self.sb.is_valid_block(ptr) {
            self.collect_indirect(store, ptr, tier, remaining, &mut blocks)?;
        } else {
            if ptr != 0 {
                warn!("Skipping out-of-range indirect pointer {ptr} (level {tier})");
            }
            let capacity = self.sb.pointers_per_block()?.saturating_pow(tier);
            *remaining = remaining.saturating_sub(capacity);
        }
        Ok(blocks)
    }

    fn push_data_block(&self, blk: u32, blocks: &mut Vec<u32>) {
        if self.sb.is_valid_block(blk) {
            blocks.push(blk);
        } else if blk != 0 {
            warn!("Skipping out-of-range block pointer {blk}");
        }
    }

    /// Follows one pointer block of the given indirection `level`.
    ///
    /// Level 1 entries are data blocks; higher levels recurse one tier down.
    fn collect_indirect<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        ptr_block: u32,
        level: u32,
        remaining: &mut u64,
        blocks: &mut Vec<u32>,
    ) -> Result<(), Ext2Error> {
        let block_size = self.sb.block_size()?;
        let per_block = self.sb.pointers_per_block()?;
        let child_capacity = per_block.saturating_pow(level - 1);

        let buf = store
            .read_block_at(self.sb.block_offset(ptr_block)?, block_size as usize)?
            .unwrap_or_default();
        if buf.is_empty() {
            // Nothing stored there: every entry is a hole.
            *remaining = remaining.saturating_sub(per_block.saturating_mul(child_capacity));
            return Ok(());
        }

        for blk in u32_entries(&buf) {
            if *remaining == 0 {
                break;
            }
            if level == 1 {
                *remaining -= 1;
                self.push_data_block(blk, blocks);
            } else if self.sb.is_valid_block(blk) {
                self.collect_indirect(store, blk, level - 1, remaining, blocks)?;
            } else {
                if blk != 0 {
                    warn!("Skipping out-of-range pointer {blk} in block {ptr_block}");
                }
                *remaining = remaining.saturating_sub(child_capacity);
            }
        }

        Ok(())
    }

    /// Lists the directory `inode` at `depth`, recursing into
    /// subdirectories. `.` and `..` are not reported.
    ///
    /// Blocks are listed one addressing tier at a time. If a pointer block
    /// cannot be read, the entries of the earlier tiers are kept, the
    /// failure is counted in `walk` and the rest of the directory is
    /// skipped. A subdirectory that cannot be read is logged and counted
    /// the same way; its siblings are still listed.
    ///
    /// # Errors
    /// Returns an error only if the volume geometry is unusable.
    pub fn walk_directory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        gd: &GroupDesc,
        inode: &Inode,
        depth: usize,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), Ext2Error> {
        let mut remaining = inode.blocks_needed(self.sb.block_size()?);

        for tier in 0..=3 {
            if remaining == 0 {
                break;
            }
            let blocks = match self.resolve_tier(store, inode, tier, &mut remaining) {
                Ok(blocks) => blocks,
                Err(err) => {
                    error!("Directory blocks past tier {tier} are unreadable: {err}");
                    walk.record_failure();
                    break;
                }
            };
            for blk in blocks {
                self.walk_block(store, gd, blk, depth, walk)?;
            }
        }

        Ok(())
    }

    /// Lists the records of directory block `blk`.
    fn walk_block<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        gd: &GroupDesc,
        blk: u32,
        depth: usize,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), Ext2Error> {
        let block_size = self.sb.block_size()? as usize;
        let buf = match store.read_block_at(self.sb.block_offset(blk)?, block_size) {
            Ok(Some(buf)) => buf,
            Ok(None) => return Ok(()),
            Err(err) => {
                error!("Failed to read directory block {blk}: {err}");
                walk.record_failure();
                return Ok(());
            }
        };

        for entry in DirEntry::parse_block(&buf) {
            if entry.is_dot() {
                continue;
            }

            // Directory records carry no size; it stays 0 here.
            walk.emit(TreeNode {
                depth,
                name: entry.name(),
                kind: entry.kind(),
                size: 0,
            });

            if entry.is_dir() {
                if let Err(err) = self.walk_subdirectory(store, gd, &entry, depth + 1, walk) {
                    error!("Skipping directory {entry}: {err}");
                    walk.record_failure();
                }
            }
        }

        Ok(())
    }

    fn walk_subdirectory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        gd: &GroupDesc,
        entry: &DirEntry,
        depth: usize,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), Ext2Error> {
        walk.enter((*entry.inode()).into(), depth)?;
        let child = self.read_inode(store, gd, *entry.inode())?;
        if !child.is_dir() {
            return Err(Ext2Error::CorruptReference(format!(
                "inode {} is tagged as a directory but its mode is 0x{:04X}",
                entry.inode(),
                child.mode()
            )));
        }
        self.walk_directory(store, gd, &child, depth, walk)
    }
}

fn format_time(timestamp: u32) -> String {
    match timestamp {
        0 => String::from("never"),
        t => DateTime::from_timestamp(t.into(), 0)
            .map(|dt| dt.format("%a %b %d %H:%M:%S %Y").to_string())
            .unwrap_or_else(|| t.to_string()),
    }
}

/// Implements the LayoutDisplay trait for Ext2Vol
impl LayoutDisplay for Ext2Vol {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());
        let sb = &self.sb;
        let block_size = sb
            .block_size()
            .map(|size| size.to_string())
            .unwrap_or_else(|err| err.to_string());
        let inode_size = sb
            .inode_size()
            .map(|size| size.to_string())
            .unwrap_or_else(|err| err.to_string());

        writeln!(out, "{indent}--- Filesystem Information ---")?;
        writeln!(out, "{indent}Filesystem: EXT2")?;
        writeln!(out)?;

        writeln!(out, "{indent}INODE INFO")?;
        writeln!(out, "{indent}  Size: {inode_size}")?;
        writeln!(out, "{indent}  Num Inodes: {}", sb.inodes_count())?;
        writeln!(out, "{indent}  First Inode: {}", sb.first_ino())?;
        writeln!(out, "{indent}  Inodes Group: {}", sb.inodes_per_group())?;
        writeln!(out, "{indent}  Free Inodes: {}", sb.free_inodes_count())?;
        writeln!(out)?;

        writeln!(out, "{indent}INFO BLOCK")?;
        writeln!(out, "{indent}  Block size: {block_size}")?;
        writeln!(out, "{indent}  Reserved blocks: {}", sb.r_blocks_count())?;
        writeln!(out, "{indent}  Free blocks: {}", sb.free_blocks_count())?;
        writeln!(out, "{indent}  Total blocks: {}", sb.blocks_count())?;
        writeln!(out, "{indent}  First block: {}", sb.first_data_block())?;
        writeln!(out, "{indent}  Group blocks: {}", sb.blocks_per_group())?;
        writeln!(out, "{indent}  Group frags: {}", sb.frags_per_group())?;
        writeln!(out)?;

        writeln!(out, "{indent}INFO VOLUME")?;
        writeln!(out, "{indent}  Volume name: {}", sb.volume_name())?;
        writeln!(out, "{indent}  Last Checked: {}", format_time(*sb.lastcheck()))?;
        writeln!(out, "{indent}  Last Mounted: {}", format_time(*sb.mtime()))?;
        writeln!(out, "{indent}  Last Written: {}", format_time(*sb.wtime()))?;

        Ok(out)
    }
}

impl FileSystem for Ext2Vol {
    type Error = Ext2Error;

    fn detect<R: Read + Seek>(
        store: &mut BlockStore<R>,
        _validate: bool,
    ) -> Result<Option<Self>, Ext2Error> {
        Ext2Vol::detect(store)
    }

    fn walk_tree<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), Ext2Error> {
        let gd = self.read_group_descriptor(store)?;
        let root = self.read_inode(store, &gd, ROOT_INODE)?;

        walk.enter(ROOT_INODE.into(), 0)?;
        self.walk_directory(store, &gd, &root, 0, walk)?;

        match walk.failures() {
            0 => Ok(()),
            n => Err(Ext2Error::IncompleteTree(n)),
        }
    }

    fn cat<R: Read + Seek, W: Write>(
        &self,
        _store: &mut BlockStore<R>,
        path: &str,
        _out: &mut W,
    ) -> Result<u64, Ext2Error> {
        Err(Ext2Error::UnsupportedOperation(format!(
            "extracting `{path}` is only supported on FAT16 volumes"
        )))
    }
}
