//! FAT16 Bpb structure.
//!
//! This module implements:
//! - BIOS Parameter Block (Bpb) parsing and optional validation
//! - Cluster-count based FAT16 classification
//! - The volume geometry: region offsets, cluster addressing and FAT entry offsets

use binread::{BinRead, BinReaderExt};
use getset::Getters;
use std::fmt;
use std::io;

use super::fat_error::FATError;

/// Size in bytes of the boot sector holding the Bpb.
pub const BOOT_SECTOR_SIZE: usize = 512;
/// Size in bytes of a directory entry.
pub const DIR_ENTRY_SIZE: u32 = 32;
/// Smallest cluster count of a FAT16 volume.
pub const FAT16_MIN_CLUSTERS: u32 = 4085;
/// Cluster counts from here on belong to FAT32.
pub const FAT16_MAX_CLUSTERS: u32 = 65525;

/// BIOS Parameter Block structure for FAT16 filesystems.
///
/// The Bpb contains essential information about the filesystem layout and properties.
/// The layout after `tot_sec_32` is the FAT12/FAT16 extended boot record.
#[derive(BinRead, Debug, Clone, Getters)]
#[br(little)]
pub struct Bpb {
    /// Jump instruction to boot code (must be 0xEB ?? 0x90 or 0xE9 ?? ??)
    jmp: [u8; 3],
    /// OEM identifier (e.g., "MSWIN4.1")
    oem_name: [u8; 8],
    /// Number of bytes per sector (512, 1024, 2048, or 4096)
    #[get = "pub"]
    bytes_per_sec: u16,
    /// Number of sectors per cluster (power of 2: 1, 2, 4, 8, 16, 32, 64, or 128)
    #[get = "pub"]
    sec_per_clus: u8,
    /// Number of reserved sectors from start of volume
    #[get = "pub"]
    rsvd_sec_cnt: u16,
    /// Number of FAT copies (typically 2 for redundancy)
    #[get = "pub"]
    num_fat: u8,
    /// Maximum number of root directory entries
    #[get = "pub"]
    root_ent_cnt: u16,
    /// Total sectors for volumes < 32MB
    #[get = "pub"]
    tot_sec_16: u16,
    /// Media descriptor (0xF8 for fixed disk)
    media: u8,
    /// Sectors per FAT
    #[get = "pub"]
    fat_sz_16: u16,
    /// Sectors per track
    _sec_per_trk: u16,
    /// Number of heads
    _num_heads: u16,
    /// Number of hidden sectors preceding the partition
    _hidd_sec: u32,
    /// Total sectors for volumes >= 32MB
    #[get = "pub"]
    tot_sec_32: u32,
    /// Drive number (0x80 for hard disk)
    _drv_num: u8,
    /// Reserved (used by Windows NT)
    _reserved_1: u8,
    /// Extended boot signature (0x29)
    _boot_sig: u8,
    /// Volume serial number
    vol_id: u32,
    /// Volume label (11 bytes)
    vol_lab: [u8; 11],
    /// Filesystem type label ("FAT16   ")
    fil_sys_type: [u8; 8],

    /// Boot code (not part of the Bpb)
    #[br(count = 448)]
    _boot_code: Vec<u8>,
    /// Boot sector signature (0x55 0xAA)
    sig: [u8; 2],
}

impl Bpb {
    /// Decodes a Bpb from the 512-byte boot sector.
    ///
    /// # Errors
    /// - `FATError::BinReadError` if the buffer is shorter than a boot sector
    pub fn from_slice(buf: &[u8]) -> Result<Bpb, FATError> {
        let mut reader = io::Cursor::new(buf);
        reader.read_le().map_err(FATError::from)
    }

    /// Checks that the fields used as divisors are non-zero.
    pub fn check_geometry(&self) -> Result<(), FATError> {
        if self.bytes_per_sec == 0 {
            return Err(FATError::InvalidGeometry(String::from(
                "bytes per sector is 0",
            )));
        }
        if self.sec_per_clus == 0 {
            return Err(FATError::InvalidGeometry(String::from(
                "sectors per cluster is 0",
            )));
        }
        Ok(())
    }

    /// Returns the authoritative total sector count.
    pub fn tot_sec(&self) -> u32 {
        if self.tot_sec_16 != 0 {
            self.tot_sec_16.into()
        } else {
            self.tot_sec_32
        }
    }

    /// Number of sectors taken by the fixed root directory region.
    pub fn root_dir_sectors(&self) -> u32 {
        match self.bytes_per_sec {
            0 => 0,
            bps => (u32::from(self.root_ent_cnt) * DIR_ENTRY_SIZE).div_ceil(u32::from(bps)),
        }
    }

    /// First sector of the root directory region, right after the FAT copies.
    pub fn root_dir_sector(&self) -> u32 {
        u32::from(self.rsvd_sec_cnt) + u32::from(self.num_fat) * u32::from(self.fat_sz_16)
    }

    /// First sector of the data region.
    pub fn first_data_sector(&self) -> u32 {
        self.root_dir_sector() + self.root_dir_sectors()
    }

    /// Determines the number of clusters in the data region.
    ///
    /// # Returns
    /// - `None` if the metadata regions are larger than the volume.
    pub fn cluster_count(&self) -> Option<u32> {
        let data_sec = self.tot_sec().checked_sub(self.first_data_sector())?;
        data_sec.checked_div(u32::from(self.sec_per_clus))
    }

    /// Whether the cluster count falls in the FAT16 range `[4085, 65525)`.
    pub fn is_fat16(&self) -> bool {
        matches!(
            self.cluster_count(),
            Some(count) if (FAT16_MIN_CLUSTERS..FAT16_MAX_CLUSTERS).contains(&count)
        )
    }

    /// Size of a cluster in bytes.
    pub fn cluster_size(&self) -> u32 {
        u32::from(self.bytes_per_sec) * u32::from(self.sec_per_clus)
    }

    /// Byte offset of the root directory region.
    pub fn root_dir_offset(&self) -> u64 {
        u64::from(self.root_dir_sector()) * u64::from(self.bytes_per_sec)
    }

    /// Size in bytes of the root directory region.
    pub fn root_dir_size(&self) -> usize {
        self.root_dir_sectors() as usize * usize::from(self.bytes_per_sec)
    }

    /// Byte offset of the first byte of a data cluster.
    ///
    /// Clusters are numbered from 2; callers must not pass 0 or 1.
    pub fn cluster_offset(&self, cluster: u16) -> u64 {
        let sector = u64::from(self.first_data_sector())
            + u64::from(cluster.saturating_sub(2)) * u64::from(self.sec_per_clus);
        sector * u64::from(self.bytes_per_sec)
    }

    /// Byte offset of a cluster's 2-byte entry in the first FAT.
    pub fn fat_entry_offset(&self, cluster: u16) -> u64 {
        u64::from(self.rsvd_sec_cnt) * u64::from(self.bytes_per_sec) + u64::from(cluster) * 2
    }

    /// Whether `cluster` addresses the data region.
    pub fn is_valid_cluster(&self, cluster: u16) -> bool {
        match self.cluster_count() {
            Some(count) => cluster >= 2 && u32::from(cluster) < count + 2,
            None => false,
        }
    }

    pub fn oem_name(&self) -> String {
        crate::utils::padded_str(&self.oem_name)
    }

    pub fn volume_label(&self) -> String {
        crate::utils::padded_str(&self.vol_lab)
    }

    pub fn fs_type_label(&self) -> String {
        crate::utils::padded_str(&self.fil_sys_type)
    }

    /// Validates the boot sector fields beyond the cluster count.
    ///
    /// # Errors
    /// - `FATError::InvalidJmp`: If the jump instruction is invalid
    /// - `FATError::InvalidBytesPerSec`: If bytes per sector is not a valid value
    /// - `FATError::InvalidSecPerClus`: If sectors per cluster is not a valid value
    /// - `FATError::InvalidClusSz`: If cluster size exceeds 32 KiB
    /// - `FATError::InvalidSignature`: If boot sector signature is not 0x55AA
    pub fn validate(&self) -> Result<(), FATError> {
        if !((self.jmp[0] == 0xEB && self.jmp[2] == 0x90) || self.jmp[0] == 0xE9) {
            return Err(FATError::InvalidJmp(format!(
                "0x{:02X}{:02X}{:02X}",
                self.jmp[0], self.jmp[1], self.jmp[2],
            )));
        }

        const VALID_BYTES_PER_SEC: [u16; 4] = [512, 1024, 2048, 4096];
        if !VALID_BYTES_PER_SEC.contains(&self.bytes_per_sec) {
            return Err(FATError::InvalidBytesPerSec(self.bytes_per_sec));
        }

        const VALID_SEC_PER_CLUS: [u8; 8] = [1, 2, 4, 8, 16, 32, 64, 128];
        if !VALID_SEC_PER_CLUS.contains(&self.sec_per_clus) {
            return Err(FATError::InvalidSecPerClus(self.sec_per_clus));
        }

        if self.cluster_size() > 32 * 1024 {
            return Err(FATError::InvalidClusSz(self.cluster_size()));
        }

        const SIG: [u8; 2] = [0x55, 0xAA];
        if !self.sig.eq(&SIG) {
            return Err(FATError::InvalidSignature(format!(
                "0x{:02X}{:02X}",
                self.sig[0], self.sig[1]
            )));
        }

        Ok(())
    }
}

/// Implements the Display trait for Bpb
impl fmt::Display for Bpb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "System name: {}", self.oem_name())?;
        writeln!(f, "Sector size: {}", self.bytes_per_sec)?;
        writeln!(f, "Sectors per cluster: {}", self.sec_per_clus)?;
        writeln!(f, "Reserved sectors: {}", self.rsvd_sec_cnt)?;
        writeln!(f, "# of FATs: {}", self.num_fat)?;
        writeln!(f, "Max root entries: {}", self.root_ent_cnt)?;
        writeln!(f, "Sectors per FAT: {}", self.fat_sz_16)?;
        writeln!(f, "Media: 0x{:02X}", self.media)?;
        writeln!(f, "Volume ID: 0x{:08X}", self.vol_id)?;
        write!(f, "Label: {}", self.volume_label())
    }
}
