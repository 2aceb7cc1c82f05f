//! Error types for EXT2 parsing and traversal.

use thiserror::Error;

use crate::disk::block_store::StoreError;
use crate::tree::WalkError;

/// Errors that can occur while reading an EXT2 volume.
#[derive(Error, Debug)]
pub enum Ext2Error {
    /// Failure at the block store boundary (I/O or short read).
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(#[from] binread::Error),

    /// The block size exponent does not produce a usable block size.
    #[error("Invalid block size exponent: `{0}`")]
    InvalidBlockSize(u32),

    /// The inode record is smaller than the fixed inode layout.
    #[error("Invalid inode record size: `{0}`. It must be at least 128 bytes.")]
    InvalidInodeSize(u16),

    /// Inode numbers start at 1.
    #[error("Invalid inode number: `{0}`")]
    InvalidInode(u32),

    /// A block pointer forms a cycle or the directory tree is nested too deeply.
    #[error("Corrupt reference: {0}")]
    CorruptReference(String),

    /// Some subtrees of the directory hierarchy could not be listed.
    #[error("Directory listing incomplete: {0} subtree(s) could not be read")]
    IncompleteTree(usize),

    /// The operation is not provided for EXT2 volumes.
    #[error("Unsupported operation on EXT2: {0}")]
    UnsupportedOperation(String),
}

impl From<WalkError> for Ext2Error {
    fn from(err: WalkError) -> Self {
        Ext2Error::CorruptReference(err.to_string())
    }
}
