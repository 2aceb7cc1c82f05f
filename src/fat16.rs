//! FAT16 engine.
//!
//! Boot sector decoding and cluster-count classification, FAT chain
//! walking, root and subdirectory listing, 8.3 path resolution and file
//! extraction.

pub mod bpb;
pub mod dir_entry;
pub mod fat_error;
pub mod vol;

pub use fat_error::FATError;
pub use vol::Fat16Vol;
