//! Error types for opening an image and dispatching to a filesystem engine.
//!
//! This module wraps the errors of each engine so that the binary deals with
//! a single type, and adds the outcomes that only make sense at the dispatch
//! level: no engine recognising the image, or an operation the detected
//! format does not offer.

use std::io;
use thiserror;

use crate::ext2::Ext2Error;
use crate::fat16::FATError;

/// Represents errors that can occur while inspecting a disk image.
#[derive(thiserror::Error, Debug)]
pub enum DiskError {
    /// Wraps an I/O error that occurred while opening the image.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Neither the EXT2 nor the FAT16 detector recognised the image.
    #[error("Unsupported filesystem: the image is neither EXT2 nor FAT16")]
    UnsupportedFileSystem,
    #[error("EXT2 error: {0}")]
    Ext2(#[from] Ext2Error),
    #[error("FAT16 error: {0}")]
    FAT(#[from] FATError),
    /// File extraction was requested on a volume that is not FAT16.
    #[error("Extracting files requires a FAT16 volume, found {0}")]
    CatRequiresFat16(String),
    /// Formatting of a metadata report failed.
    #[error("Formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),
}
