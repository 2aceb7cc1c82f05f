//! Error types for FAT16 boot sector parsing, path resolution and traversal.
//!
//! The BPB is a data structure that describes the physical layout and properties of a FAT file system.
//! This module defines errors that can occur while parsing and validating BPB fields and while
//! following directory entries and cluster chains.

use thiserror::Error;

use crate::disk::block_store::StoreError;
use crate::tree::WalkError;

/// Errors that can occur while reading a FAT16 volume.
#[derive(Error, Debug)]
pub enum FATError {
    /// Failure at the block store boundary (I/O or short read).
    #[error("{0}")]
    Store(#[from] StoreError),

    /// Parsing error occured during structure initialization
    #[error("BinRead Error: `{0}`")]
    BinReadError(#[from] binread::Error),

    /// The first three bytes of a FAT volume must contain a valid x86 jump instruction.
    #[error("Invalid jump instruction `{0}`")]
    InvalidJmp(String),

    /// Bytes per sector must be 512, 1024, 2048 or 4096.
    #[error("Invalid count of bytes per sector: `{0}`. Legal values: 512, 1024, 2048 or 4096")]
    InvalidBytesPerSec(u16),

    /// Sectors per cluster must be a power of 2: 1, 2, 4, 8, 16, 32, 64, or 128.
    #[error(
        "Invalid number of sector per cluster: `{0}`. Legal values: 1, 2, 4, 8, 16, 32, 64, 128"
    )]
    InvalidSecPerClus(u8),

    /// Total cluster size (bytes per sector × sectors per cluster) must not exceed 32 KiB.
    #[error("Invalid cluster size: `{0}`. Any value greater than 32K is invalid.")]
    InvalidClusSz(u32),

    /// The boot sector signature must be 0x55AA.
    #[error("Invalid BPB signature: `{0}`. Expected signature: 0x55AA")]
    InvalidSignature(String),

    /// The BPB fields do not describe a usable layout.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A path component has no matching directory entry.
    #[error("File not found: `{0}`")]
    NotFound(String),

    /// A cluster chain loops back on itself or the directory tree is nested too deeply.
    #[error("Corrupt reference: {0}")]
    CorruptReference(String),

    /// Some subtrees of the directory hierarchy could not be listed.
    #[error("Directory listing incomplete: {0} subtree(s) could not be read")]
    IncompleteTree(usize),
}

impl From<WalkError> for FATError {
    fn from(err: WalkError) -> Self {
        FATError::CorruptReference(err.to_string())
    }
}
