//! In-memory EXT2 and FAT16 images for the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use fs_inspector::disk::block_store::BlockStore;

pub const EXT2_BLOCK_SIZE: usize = 1024;
pub const EXT2_BLOCKS: u32 = 512;
pub const EXT2_INODE_TABLE: u32 = 5;
pub const EXT2_INODE_SIZE: usize = 128;
pub const EXT2_FIRST_FREE_BLOCK: u32 = 20;

pub const MODE_DIR: u16 = 0x41ED;
pub const MODE_FILE: u16 = 0x81A4;

pub const FT_REG_FILE: u8 = 1;
pub const FT_DIR: u8 = 2;

/// Single-group EXT2 image: 512 blocks of 1024 bytes, revision 0, inode
/// table at block 5, data blocks handed out from block 20.
pub struct Ext2Builder {
    image: Vec<u8>,
    next_block: u32,
}

impl Ext2Builder {
    pub fn new() -> Self {
        let mut image = vec![0u8; EXT2_BLOCKS as usize * EXT2_BLOCK_SIZE];

        let sb = 1024;
        put_u32(&mut image, sb, 32); // inodes count
        put_u32(&mut image, sb + 0x04, EXT2_BLOCKS);
        put_u32(&mut image, sb + 0x08, 25); // reserved blocks
        put_u32(&mut image, sb + 0x0C, 400); // free blocks
        put_u32(&mut image, sb + 0x10, 20); // free inodes
        put_u32(&mut image, sb + 0x14, 1); // first data block
        put_u32(&mut image, sb + 0x20, 8192); // blocks per group
        put_u32(&mut image, sb + 0x24, 8192); // frags per group
        put_u32(&mut image, sb + 0x28, 32); // inodes per group
        put_u32(&mut image, sb + 0x30, 86_400); // last write
        put_u16(&mut image, sb + 0x38, 0xEF53);
        put_u32(&mut image, sb + 0x54, 11); // first inode
        image[sb + 0x78..sb + 0x78 + 7].copy_from_slice(b"testvol");

        let gd = 2048;
        put_u32(&mut image, gd, 3);
        put_u32(&mut image, gd + 4, 4);
        put_u32(&mut image, gd + 8, EXT2_INODE_TABLE);

        Self {
            image,
            next_block: EXT2_FIRST_FREE_BLOCK,
        }
    }

    pub fn alloc_block(&mut self) -> u32 {
        let blk = self.next_block;
        self.next_block += 1;
        blk
    }

    pub fn write_block(&mut self, block: u32, data: &[u8]) {
        let off = block as usize * EXT2_BLOCK_SIZE;
        self.image[off..off + data.len()].copy_from_slice(data);
    }

    /// Fills a pointer block with little-endian block numbers.
    pub fn write_pointers(&mut self, block: u32, pointers: &[u32]) {
        let raw: Vec<u8> = pointers.iter().flat_map(|p| p.to_le_bytes()).collect();
        self.write_block(block, &raw);
    }

    pub fn set_inode(&mut self, inode: u32, mode: u16, size: u32, blocks: &[u32]) {
        let off = self.inode_offset(inode);
        put_u16(&mut self.image, off, mode);
        put_u32(&mut self.image, off + 4, size);
        put_u16(&mut self.image, off + 26, 1);
        for (i, blk) in blocks.iter().enumerate() {
            put_u32(&mut self.image, off + 40 + 4 * i, *blk);
        }
    }

    /// Allocates one block holding `entries` and makes `inode` a directory over it.
    pub fn add_dir(&mut self, inode: u32, entries: &[(u32, u8, &str)]) -> u32 {
        let blk = self.alloc_block();
        self.write_block(blk, &dir_block(entries));
        self.set_inode(inode, MODE_DIR, EXT2_BLOCK_SIZE as u32, &[blk]);
        blk
    }

    pub fn inode_offset(&self, inode: u32) -> usize {
        EXT2_INODE_TABLE as usize * EXT2_BLOCK_SIZE + (inode as usize - 1) * EXT2_INODE_SIZE
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

/// One EXT2 directory record, padded to `rec_len`.
pub fn dir_record(inode: u32, rec_len: u16, file_type: u8, name: &str) -> Vec<u8> {
    let mut rec = vec![0u8; rec_len as usize];
    rec[0..4].copy_from_slice(&inode.to_le_bytes());
    rec[4..6].copy_from_slice(&rec_len.to_le_bytes());
    rec[6] = name.len() as u8;
    rec[7] = file_type;
    rec[8..8 + name.len()].copy_from_slice(name.as_bytes());
    rec
}

/// A directory block whose last record spans the rest of the block.
pub fn dir_block(entries: &[(u32, u8, &str)]) -> Vec<u8> {
    let mut block = vec![];
    for (i, (inode, file_type, name)) in entries.iter().enumerate() {
        let rec_len = if i + 1 == entries.len() {
            EXT2_BLOCK_SIZE - block.len()
        } else {
            (8 + name.len()).next_multiple_of(4)
        };
        block.extend(dir_record(*inode, rec_len as u16, *file_type, name));
    }
    block.resize(EXT2_BLOCK_SIZE, 0);
    block
}

pub const FAT_SECTOR_SIZE: usize = 512;
pub const FAT_CLUSTER_SIZE: usize = 512;
pub const FAT_RESERVED_SECTORS: usize = 1;
pub const FAT_SECTORS_PER_FAT: usize = 32;
pub const FAT_ROOT_SECTOR: usize = 65;
pub const FAT_DATA_SECTOR: usize = 97;
pub const FAT_TOTAL_SECTORS: u16 = 97 + 4085;

pub const ATTR_ARCHIVE: u8 = 0x20;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_LONG_NAME: u8 = 0x0F;

/// FAT16 image with 512-byte sectors and clusters, one reserved sector,
/// two FATs of 32 sectors, 512 root entries and exactly 4085 clusters.
pub struct Fat16Builder {
    image: Vec<u8>,
}

impl Fat16Builder {
    pub fn new() -> Self {
        let mut image = vec![0u8; FAT_TOTAL_SECTORS as usize * FAT_SECTOR_SIZE];

        image[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        image[3..11].copy_from_slice(b"MSWIN4.1");
        put_u16(&mut image, 11, FAT_SECTOR_SIZE as u16);
        image[13] = 1;
        put_u16(&mut image, 14, FAT_RESERVED_SECTORS as u16);
        image[16] = 2;
        put_u16(&mut image, 17, 512);
        put_u16(&mut image, 19, FAT_TOTAL_SECTORS);
        image[21] = 0xF8;
        put_u16(&mut image, 22, FAT_SECTORS_PER_FAT as u16);
        image[38] = 0x29;
        put_u32(&mut image, 39, 0x1234_5678);
        image[43..54].copy_from_slice(b"TESTVOL    ");
        image[54..62].copy_from_slice(b"FAT16   ");
        image[510..512].copy_from_slice(&[0x55, 0xAA]);

        let mut builder = Self { image };
        builder.set_fat(0, 0xFFF8);
        builder.set_fat(1, 0xFFFF);
        builder
    }

    /// Writes `value` as the entry of `cluster` in both FAT copies.
    pub fn set_fat(&mut self, cluster: u16, value: u16) {
        for copy in 0..2 {
            let off = (FAT_RESERVED_SECTORS + copy * FAT_SECTORS_PER_FAT) * FAT_SECTOR_SIZE
                + cluster as usize * 2;
            put_u16(&mut self.image, off, value);
        }
    }

    /// Links `clusters` in order and terminates the chain.
    pub fn chain(&mut self, clusters: &[u16]) {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(last) = clusters.last() {
            self.set_fat(*last, 0xFFFF);
        }
    }

    pub fn cluster_offset(cluster: u16) -> usize {
        (FAT_DATA_SECTOR + cluster as usize - 2) * FAT_SECTOR_SIZE
    }

    pub fn write_cluster(&mut self, cluster: u16, data: &[u8]) {
        let off = Self::cluster_offset(cluster);
        self.image[off..off + data.len()].copy_from_slice(data);
    }

    pub fn set_root_entries(&mut self, entries: &[[u8; 32]]) {
        let off = FAT_ROOT_SECTOR * FAT_SECTOR_SIZE;
        for (i, entry) in entries.iter().enumerate() {
            self.image[off + i * 32..off + (i + 1) * 32].copy_from_slice(entry);
        }
    }

    /// Writes a one-cluster directory and ends its chain.
    pub fn add_dir(&mut self, cluster: u16, entries: &[[u8; 32]]) {
        let raw: Vec<u8> = entries.iter().flatten().copied().collect();
        self.write_cluster(cluster, &raw);
        self.chain(&[cluster]);
    }

    pub fn image_mut(&mut self) -> &mut Vec<u8> {
        &mut self.image
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

/// One 32-byte FAT directory entry.
pub fn fat_entry(name: &[u8; 11], attr: u8, cluster: u16, size: u32) -> [u8; 32] {
    let mut raw = [0u8; 32];
    raw[0..11].copy_from_slice(name);
    raw[11] = attr;
    raw[26..28].copy_from_slice(&cluster.to_le_bytes());
    raw[28..32].copy_from_slice(&size.to_le_bytes());
    raw
}

/// A reader over an in-memory image that records the target of every seek.
pub struct RecordingCursor {
    inner: Cursor<Vec<u8>>,
    seeks: Rc<RefCell<Vec<u64>>>,
}

impl RecordingCursor {
    pub fn new(image: Vec<u8>) -> (Self, Rc<RefCell<Vec<u64>>>) {
        let seeks = Rc::new(RefCell::new(vec![]));
        let cursor = Self {
            inner: Cursor::new(image),
            seeks: Rc::clone(&seeks),
        };
        (cursor, seeks)
    }
}

impl Read for RecordingCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for RecordingCursor {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let offset = self.inner.seek(pos)?;
        self.seeks.borrow_mut().push(offset);
        Ok(offset)
    }
}

pub fn store(image: Vec<u8>) -> BlockStore<Cursor<Vec<u8>>> {
    BlockStore::new(Cursor::new(image))
}

fn put_u16(buf: &mut [u8], off: usize, value: u16) {
    buf[off..off + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, value: u32) {
    buf[off..off + 4].copy_from_slice(&value.to_le_bytes());
}
