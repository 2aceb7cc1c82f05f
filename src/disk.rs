//! Disk image opening and format dispatch.
//!
//! This module provides functionality for:
//! - Opening a disk image or block device as a [`BlockStore`]
//! - Trying each supported filesystem detector in a fixed order (EXT2, then FAT16)
//! - Forwarding `info`, `tree` and `cat` requests to the detected engine

pub mod block_store;
pub mod disk_error;

use log::info;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use crate::ext2::Ext2Vol;
use crate::fat16::Fat16Vol;
use crate::traits::{FileSystem, LayoutDisplay};
use crate::tree::{TreeNode, TreeWalk};
use block_store::BlockStore;
use disk_error::DiskError;

/// The filesystem found on an image.
#[derive(Debug, Clone)]
pub enum Volume {
    Ext2(Ext2Vol),
    Fat16(Fat16Vol),
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Volume::Ext2(_) => "EXT2",
            Volume::Fat16(_) => "FAT16",
        };
        write!(f, "{}", s)
    }
}

/// An opened image bound to the engine that recognised it.
///
/// The store is owned here and lent to the engine for each request.
pub struct Disk<R: Read + Seek = File> {
    store: BlockStore<R>,
    volume: Volume,
}

impl Disk<File> {
    /// Opens a disk image file and detects its filesystem.
    ///
    /// # Parameters
    /// - `path`: Path to the image file or block device
    /// - `validate`: Whether to validate the FAT16 boot sector beyond its cluster count
    ///
    /// # Errors
    /// - Returns `DiskError::Io` if the file cannot be opened
    /// - See [`Disk::from_reader`] for the detection errors
    pub fn from_file(path: &Path, validate: bool) -> Result<Self, DiskError> {
        let file = File::open(path)?;
        Self::from_reader(file, validate)
    }
}

impl<R: Read + Seek> Disk<R> {
    /// Detects the filesystem held by `reader`.
    ///
    /// # Errors
    /// - Returns `DiskError::UnsupportedFileSystem` if no detector matches
    /// - Returns `DiskError::Ext2` or `DiskError::FAT` if a detector fails to read the image
    pub fn from_reader(reader: R, validate: bool) -> Result<Self, DiskError> {
        let mut store = BlockStore::new(reader);

        let volume = if let Some(vol) = try_detect::<Ext2Vol, R>(&mut store, validate)? {
            Volume::Ext2(vol)
        } else if let Some(vol) = try_detect::<Fat16Vol, R>(&mut store, validate)? {
            Volume::Fat16(vol)
        } else {
            return Err(DiskError::UnsupportedFileSystem);
        };

        info!("Dispatching to the {volume} engine");
        Ok(Disk { store, volume })
    }

    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Renders the metadata report of the detected volume.
    pub fn info(&self, indent: u8) -> Result<String, DiskError> {
        let out = match &self.volume {
            Volume::Ext2(vol) => vol.display_layout(indent)?,
            Volume::Fat16(vol) => vol.display_layout(indent)?,
        };
        Ok(out)
    }

    /// Walks the directory hierarchy, passing every entry to `visit`.
    ///
    /// # Parameters
    /// - `max_depth`: Nesting bound; deeper directories are reported as corrupt
    /// - `visit`: Called once per listed entry, in traversal order
    ///
    /// # Errors
    /// An `IncompleteTree` error of the engine if some subtrees could not
    /// be listed; the entries that could be are still passed to `visit`.
    pub fn tree(
        &mut self,
        max_depth: usize,
        visit: &mut dyn FnMut(&TreeNode),
    ) -> Result<(), DiskError> {
        let mut walk = TreeWalk::new(max_depth, visit);
        match &self.volume {
            Volume::Ext2(vol) => vol.walk_tree(&mut self.store, &mut walk)?,
            Volume::Fat16(vol) => vol.walk_tree(&mut self.store, &mut walk)?,
        }
        Ok(())
    }

    /// Writes the contents of the file at `path` to `out`.
    ///
    /// # Returns
    /// The number of bytes written.
    ///
    /// # Errors
    /// - Returns `DiskError::CatRequiresFat16` on an EXT2 volume
    pub fn cat<W: Write>(&mut self, path: &str, out: &mut W) -> Result<u64, DiskError> {
        match &self.volume {
            Volume::Ext2(_) => Err(DiskError::CatRequiresFat16(self.volume.to_string())),
            Volume::Fat16(vol) => Ok(vol.cat(&mut self.store, path, out)?),
        }
    }
}

/// Runs the detector of `F` against `store`.
fn try_detect<F, R>(store: &mut BlockStore<R>, validate: bool) -> Result<Option<F>, DiskError>
where
    F: FileSystem,
    R: Read + Seek,
    DiskError: From<F::Error>,
{
    Ok(F::detect(store, validate)?)
}
