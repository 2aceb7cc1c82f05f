//! EXT2 engine.
//!
//! Superblock detection, group 0 descriptor and inode reads, block
//! pointer resolution through up to three levels of indirection, and the
//! recursive directory walk.

pub mod dir_entry;
pub mod ext2_error;
pub mod group_desc;
pub mod inode;
pub mod superblock;
pub mod vol;

pub use ext2_error::Ext2Error;
pub use vol::Ext2Vol;
