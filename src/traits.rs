//! Declaration of traits reused across the code.

use std::io::{Read, Seek, Write};

use crate::disk::block_store::BlockStore;
use crate::tree::TreeWalk;

/// Implementation of the LayoutDisplay trait.
/// It is used to display the metadata and layout of a detected filesystem.
pub trait LayoutDisplay {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error>;
}

/// Capabilities shared by every supported on-disk format.
///
/// An implementation holds only the immutable metadata captured at
/// detection time; the block store is lent to each call.
pub trait FileSystem: LayoutDisplay + Sized {
    type Error: std::error::Error;

    /// Tries to recognise the format on `store`.
    ///
    /// # Returns
    /// - `Ok(Some(fs))` if the format matches.
    /// - `Ok(None)` if the image holds some other format.
    fn detect<R: Read + Seek>(
        store: &mut BlockStore<R>,
        validate: bool,
    ) -> Result<Option<Self>, Self::Error>;

    /// Walks the whole directory hierarchy, reporting entries to `walk`.
    fn walk_tree<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), Self::Error>;

    /// Writes the contents of the file at `path` to `out`.
    ///
    /// # Returns
    /// The number of bytes written.
    fn cat<R: Read + Seek, W: Write>(
        &self,
        store: &mut BlockStore<R>,
        path: &str,
        out: &mut W,
    ) -> Result<u64, Self::Error>;
}
