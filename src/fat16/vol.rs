//! FAT16 volume structure and operations.
//!
//! This module implements the core functions to read a FAT16 volume, including:
//! - Detecting the volume from its Bpb and cluster count
//! - Following cluster chains through the first FAT
//! - Listing the fixed root directory and chained subdirectories
//! - Resolving paths and extracting file contents
//! - Displaying the volume layout

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::fmt::Write as FmtWrite;
use std::io::{Read, Seek, Write};

use super::bpb::{BOOT_SECTOR_SIZE, Bpb};
use super::dir_entry::{DirEntry, format_name};
use super::fat_error::FATError;
use crate::disk::block_store::{BlockStore, StoreError};
use crate::traits::{FileSystem, LayoutDisplay};
use crate::tree::{TreeNode, TreeWalk};

/// FAT entries at or above this value end a cluster chain.
pub const END_OF_CHAIN: u16 = 0xFFF8;

/// Key under which the root directory is registered in a walk.
/// Data clusters are numbered from 2, so it cannot collide.
const ROOT_KEY: u64 = 0;

/// Structure for a FAT16 volume.
///
/// Essentially, it is a wrapper around the Bpb.
#[derive(Debug, Clone)]
pub struct Fat16Vol {
    bpb: Bpb,
}

impl Fat16Vol {
    pub fn new(bpb: Bpb) -> Self {
        Self { bpb }
    }

    pub fn bpb(&self) -> &Bpb {
        &self.bpb
    }

    /// Reads the boot sector and classifies the volume by cluster count.
    ///
    /// # Parameters
    /// - `store`: The image to examine
    /// - `validate`: Whether to also run the boot sector checks of [`Bpb::validate`]
    ///
    /// # Returns
    /// - `Ok(Some(Fat16Vol))` if the cluster count is in the FAT16 range.
    /// - `Ok(None)` if it is not, or if the image is smaller than a boot sector.
    ///
    /// # Errors
    /// - Various `FATError` variants if `validate` is true and a check fails
    pub fn detect<R: Read + Seek>(
        store: &mut BlockStore<R>,
        validate: bool,
    ) -> Result<Option<Self>, FATError> {
        let buf = match store.read_at(0, BOOT_SECTOR_SIZE) {
            Ok(buf) => buf,
            Err(StoreError::ShortRead { got, .. }) => {
                debug!("Image too small for a FAT boot sector ({got} bytes available)");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let bpb = Bpb::from_slice(&buf)?;
        if let Err(err) = bpb.check_geometry() {
            debug!("Not a FAT16 volume: {err}");
            return Ok(None);
        }

        let count = bpb.cluster_count();
        if !bpb.is_fat16() {
            debug!("Cluster count {count:?} is outside the FAT16 range");
            return Ok(None);
        }

        if validate {
            bpb.validate()?;
        }

        info!(
            "FAT16 volume detected: {} clusters of {} bytes",
            count.unwrap_or_default(),
            bpb.cluster_size()
        );
        Ok(Some(Self::new(bpb)))
    }

    /// Reads the FAT entry of `cluster`.
    pub fn next_cluster<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        cluster: u16,
    ) -> Result<u16, FATError> {
        let buf = store.read_at(self.bpb.fat_entry_offset(cluster), 2)?;
        Ok(u16::from_le_bytes([buf[0], buf[1]]))
    }

    /// Admits `cluster` as the next link of a chain.
    ///
    /// # Returns
    /// - `Ok(None)` if the cluster lies outside the data region; the chain
    ///   is cut there.
    ///
    /// # Errors
    /// - `FATError::CorruptReference` if the chain already went through `cluster`.
    fn admit(&self, cluster: u16, visited: &mut HashSet<u16>) -> Result<Option<u16>, FATError> {
        if !self.bpb.is_valid_cluster(cluster) {
            warn!("Cutting cluster chain at out-of-range link {cluster:#06X}");
            return Ok(None);
        }
        if !visited.insert(cluster) {
            return Err(FATError::CorruptReference(format!(
                "cluster {cluster} appears twice in one chain"
            )));
        }
        Ok(Some(cluster))
    }

    /// Follows the FAT from `cluster` to the next link of its chain.
    fn follow<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        cluster: u16,
        visited: &mut HashSet<u16>,
    ) -> Result<Option<u16>, FATError> {
        match self.next_cluster(store, cluster)? {
            next if next >= END_OF_CHAIN => Ok(None),
            next => self.admit(next, visited),
        }
    }

    fn read_cluster<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        cluster: u16,
    ) -> Result<Vec<u8>, FATError> {
        let buf = store.read_at(
            self.bpb.cluster_offset(cluster),
            self.bpb.cluster_size() as usize,
        )?;
        Ok(buf)
    }

    /// Reads the entries of the fixed root directory region.
    pub fn read_root_directory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
    ) -> Result<Vec<DirEntry>, FATError> {
        let buf = store.read_at(self.bpb.root_dir_offset(), self.bpb.root_dir_size())?;
        let (entries, _) = DirEntry::parse_region(&buf)?;
        Ok(entries)
    }

    /// Reads the entries of the directory whose chain starts at `start_cluster`.
    ///
    /// # Errors
    /// Fails on the first unreadable cluster or chain loop; see
    /// [`Fat16Vol::scan_subdirectory`] for a read that keeps partial results.
    pub fn read_subdirectory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        start_cluster: u16,
    ) -> Result<Vec<DirEntry>, FATError> {
        let mut entries = vec![];
        self.scan_subdirectory(store, start_cluster, &mut entries)?;
        Ok(entries)
    }

    /// Appends the entries of the directory at `start_cluster` to `entries`.
    ///
    /// The chain is followed one cluster at a time. The end-of-directory
    /// marker stops the scan before the next FAT link is read, so a broken
    /// chain past the marker goes unnoticed. On error, `entries` holds
    /// everything read before the failing cluster.
    pub fn scan_subdirectory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        start_cluster: u16,
        entries: &mut Vec<DirEntry>,
    ) -> Result<(), FATError> {
        let mut visited = HashSet::new();
        let mut current = match start_cluster {
            0 => None,
            cluster => self.admit(cluster, &mut visited)?,
        };

        while let Some(cluster) = current {
            let buf = self.read_cluster(store, cluster)?;
            let (found, ended) = DirEntry::parse_region(&buf)?;
            entries.extend(found);
            if ended {
                break;
            }
            current = self.follow(store, cluster, &mut visited)?;
        }

        debug!(
            "Directory at cluster {start_cluster} read over {} cluster(s)",
            visited.len()
        );
        Ok(())
    }

    /// Reads the directory at `cluster`; cluster 0 is the root directory.
    fn read_directory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        cluster: u16,
    ) -> Result<Vec<DirEntry>, FATError> {
        match cluster {
            0 => self.read_root_directory(store),
            _ => self.read_subdirectory(store, cluster),
        }
    }

    /// Lists a directory at `depth`, recursing into subdirectories.
    ///
    /// Every entry is reported, dot entries included. Recursion skips
    /// directories whose raw name starts with `.` and those without a
    /// first cluster.
    ///
    /// A subdirectory that cannot be read is logged and counted in `walk`;
    /// its siblings are still listed.
    ///
    /// # Errors
    /// Returns an error if the directory itself cannot be read completely.
    /// The entries read before the failure are listed first.
    pub fn walk_directory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        cluster: u16,
        depth: usize,
        is_root: bool,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), FATError> {
        let mut entries = vec![];
        let scanned = if is_root {
            self.read_root_directory(store).map(|found| entries = found)
        } else {
            self.scan_subdirectory(store, cluster, &mut entries)
        };

        for entry in entries {
            walk.emit(TreeNode {
                depth,
                name: entry.display_name(),
                kind: entry.kind(),
                size: (*entry.file_size()).into(),
            });

            if entry.is_regular_dir() && entry.cluster_number() != 0 {
                if let Err(err) = self.walk_subdirectory(store, &entry, depth + 1, walk) {
                    error!("Skipping directory {entry}: {err}");
                    walk.record_failure();
                }
            }
        }

        scanned
    }

    fn walk_subdirectory<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        entry: &DirEntry,
        depth: usize,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), FATError> {
        walk.enter(entry.cluster_number().into(), depth)?;
        self.walk_directory(store, entry.cluster_number(), depth, false, walk)
    }

    /// Looks up the entry named `name` (11-byte 8.3 form) in the directory
    /// at `dir_cluster`, 0 meaning the root directory.
    pub fn find_entry<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        dir_cluster: u16,
        name: &[u8; 11],
    ) -> Result<Option<DirEntry>, FATError> {
        let entries = self.read_directory(store, dir_cluster)?;
        Ok(entries.into_iter().find(|entry| entry.same_short_name(name)))
    }

    /// Resolves a `/`-separated path from the root directory.
    ///
    /// Empty components are ignored, so leading, trailing and doubled
    /// slashes are accepted. The last component may name a file or a
    /// directory.
    ///
    /// # Errors
    /// - `FATError::NotFound` naming the first component without a match,
    ///   or the whole path if it has no component.
    pub fn resolve_path<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        path: &str,
    ) -> Result<DirEntry, FATError> {
        let mut found: Option<DirEntry> = None;

        for component in path.split('/').filter(|c| !c.is_empty()) {
            let dir_cluster = match &found {
                None => 0,
                Some(parent) if parent.is_dir() => parent.cluster_number(),
                Some(_) => return Err(FATError::NotFound(component.to_string())),
            };

            match self.find_entry(store, dir_cluster, &format_name(component))? {
                Some(entry) => {
                    debug!("Matched `{component}` to {entry}");
                    found = Some(entry);
                }
                None => return Err(FATError::NotFound(component.to_string())),
            }
        }

        found.ok_or_else(|| FATError::NotFound(path.to_string()))
    }

    /// Copies the declared contents of `entry` to `out`.
    ///
    /// One cluster is read at a time and at most the remaining declared
    /// size is written from it. If the chain ends first, a warning is
    /// logged and the shorter count is returned.
    ///
    /// # Returns
    /// The number of bytes written.
    pub fn read_file<R: Read + Seek, W: Write>(
        &self,
        store: &mut BlockStore<R>,
        entry: &DirEntry,
        out: &mut W,
    ) -> Result<u64, FATError> {
        let size = u64::from(*entry.file_size());
        let cluster_size = u64::from(self.bpb.cluster_size());
        let mut remaining = size;
        let mut visited = HashSet::new();
        let mut current = match entry.cluster_number() {
            0 => None,
            cluster => self.admit(cluster, &mut visited)?,
        };

        while remaining > 0 {
            let Some(cluster) = current else {
                break;
            };

            let buf = self.read_cluster(store, cluster)?;
            let n = remaining.min(cluster_size);
            out.write_all(&buf[..n as usize]).map_err(StoreError::from)?;
            remaining -= n;

            if remaining > 0 {
                current = self.follow(store, cluster, &mut visited)?;
            }
        }

        if remaining > 0 {
            warn!(
                "{entry} declares {size} bytes but its cluster chain holds only {}",
                size - remaining
            );
        }

        Ok(size - remaining)
    }
}

/// Implements the LayoutDisplay trait for Fat16Vol
impl LayoutDisplay for Fat16Vol {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());
        let bpb = &self.bpb;
        let cluster_count = bpb.cluster_count().unwrap_or_default();
        let rsvd_end = u32::from(*bpb.rsvd_sec_cnt());
        let data_start = bpb.first_data_sector();
        let data_end = data_start + cluster_count * u32::from(*bpb.sec_per_clus());

        writeln!(out, "{indent}--- Filesystem Information ---")?;
        writeln!(out, "{indent}Filesystem: FAT16")?;
        for line in bpb.to_string().lines() {
            writeln!(out, "{indent}{line}")?;
        }
        writeln!(out, "{indent}Clusters: {cluster_count}")?;
        writeln!(out)?;

        writeln!(out, "{}┌{:─^55}┐", indent, " FAT16 Volume Layout ")?;
        writeln!(
            out,
            "{}├{:^12}┬{:^12}┬{:^12}┬{:^16}┤",
            indent, "Region", "Start", "End", "Description"
        )?;
        writeln!(
            out,
            "{}├{:─<12}┼{:─<12}┼{:─<12}┼{:─<16}┤",
            indent, "", "", "", ""
        )?;

        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent, "Reserved", 0, rsvd_end, "Boot + Reserved"
        )?;
        for i in 0..*bpb.num_fat() {
            let fat_i_start = rsvd_end + u32::from(i) * u32::from(*bpb.fat_sz_16());
            let fat_i_end = fat_i_start + u32::from(*bpb.fat_sz_16());
            writeln!(
                out,
                "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
                indent,
                format!("FAT #{}", i),
                fat_i_start,
                fat_i_end,
                "FAT Tables"
            )?;
        }
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent,
            "Root Dir",
            bpb.root_dir_sector(),
            data_start,
            "Root Directory"
        )?;
        writeln!(
            out,
            "{}│{:<12}│{:<12}│{:<12}│{:<16}│",
            indent, "Data", data_start, data_end, "Cluster Data"
        )?;
        writeln!(
            out,
            "{}└{:─<12}┴{:─<12}┴{:─<12}┴{:─<16}┘",
            indent, "", "", "", ""
        )?;

        Ok(out)
    }
}

impl FileSystem for Fat16Vol {
    type Error = FATError;

    fn detect<R: Read + Seek>(
        store: &mut BlockStore<R>,
        validate: bool,
    ) -> Result<Option<Self>, FATError> {
        Fat16Vol::detect(store, validate)
    }

    fn walk_tree<R: Read + Seek>(
        &self,
        store: &mut BlockStore<R>,
        walk: &mut TreeWalk<'_>,
    ) -> Result<(), FATError> {
        walk.enter(ROOT_KEY, 0)?;
        self.walk_directory(store, 0, 0, true, walk)?;

        match walk.failures() {
            0 => Ok(()),
            n => Err(FATError::IncompleteTree(n)),
        }
    }

    fn cat<R: Read + Seek, W: Write>(
        &self,
        store: &mut BlockStore<R>,
        path: &str,
        out: &mut W,
    ) -> Result<u64, FATError> {
        let entry = self.resolve_path(store, path)?;
        self.read_file(store, &entry, out)
    }
}
