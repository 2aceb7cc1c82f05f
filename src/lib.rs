//!
//! fs_inspector: A library and CLI for inspecting EXT2 and FAT16 disk images.
//!
//! This crate provides tools for:
//! - Detecting which of the supported filesystems an image holds
//! - Printing the superblock or boot sector summary of a volume
//! - Walking the directory hierarchy of a volume
//! - Extracting the contents of a file from a FAT16 volume
//!
//! Every operation is read-only; the image is only ever seeked and read.
//!
//! # Re-exports
//! - [`Disk`]: Opened image bound to the engine that recognised it
//! - [`Volume`]: Enum for supported volume types
//! - [`Ext2Vol`]: EXT2 volume abstraction
//! - [`Fat16Vol`]: FAT16 volume abstraction

pub mod commands;
pub mod disk;
pub mod ext2;
pub mod fat16;
pub mod traits;
pub mod tree;
pub mod utils;

/// Opened image bound to the engine that recognised it (see [`disk::Disk`]).
pub use crate::disk::Disk;
/// Enum for supported volume types (see [`disk::Volume`]).
pub use crate::disk::Volume;
/// Errors of the dispatch layer (see [`disk::disk_error::DiskError`]).
pub use crate::disk::disk_error::DiskError;
/// EXT2 volume abstraction (see [`ext2::vol::Ext2Vol`]).
pub use crate::ext2::Ext2Vol;
/// FAT16 volume abstraction (see [`fat16::vol::Fat16Vol`]).
pub use crate::fat16::Fat16Vol;
