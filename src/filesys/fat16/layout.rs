//! Region layout derived from the boot sector

use super::constants::*;
use super::BootSector;

/// Sector ranges of a mounted volume. Immutable for the mount's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Starting sector of first FAT
    pub fat_start: u64,
    /// Size of one FAT copy in sectors
    pub sectors_per_fat: u64,
    /// Number of mirrored FAT copies
    pub fat_count: u8,
    /// Starting sector of root directory
    pub root_dir_start: u64,
    /// Root directory size in sectors
    pub root_dir_sectors: u64,
    /// Root directory capacity in entries
    pub root_dir_entries: u16,
    /// Starting sector of data area
    pub data_start: u64,
    pub sectors_per_cluster: u64,
    /// Clusters that fit in the data area
    pub data_clusters: u32,
}

impl Layout {
    pub fn from_boot_sector(boot: &BootSector) -> Self {
        let fat_start = boot.reserved_sectors as u64;
        let sectors_per_fat = boot.sectors_per_fat as u64;
        let root_dir_start = fat_start + sectors_per_fat * boot.fat_count as u64;
        let root_dir_sectors =
            (boot.root_dir_entries as usize * DIR_ENTRY_SIZE).div_ceil(SECTOR_SIZE) as u64;
        let data_start = root_dir_start + root_dir_sectors;
        let sectors_per_cluster = boot.sectors_per_cluster as u64;
        let data_clusters = (boot.total_sectors() as u64)
            .saturating_sub(data_start)
            .checked_div(sectors_per_cluster)
            .unwrap_or(0) as u32;

        Layout {
            fat_start,
            sectors_per_fat,
            fat_count: boot.fat_count,
            root_dir_start,
            root_dir_sectors,
            root_dir_entries: boot.root_dir_entries,
            data_start,
            sectors_per_cluster,
            data_clusters,
        }
    }

    /// Converts cluster number to absolute sector number
    pub fn cluster_to_sector(&self, cluster: u16) -> u64 {
        debug_assert!(cluster >= FIRST_DATA_CLUSTER);
        self.data_start + (cluster as u64 - FIRST_DATA_CLUSTER as u64) * self.sectors_per_cluster
    }

    /// Size of each cluster in bytes
    pub fn cluster_size(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }

    /// Starting sector of the FAT copy `copy`
    pub fn fat_copy_start(&self, copy: u8) -> u64 {
        self.fat_start + copy as u64 * self.sectors_per_fat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floppy() -> BootSector {
        BootSector {
            jump_boot: [0xEB, 0x3C, 0x90],
            oem_name: *b"MSWIN4.1",
            bytes_per_sector: 512,
            sectors_per_cluster: 1,
            reserved_sectors: 1,
            fat_count: 2,
            root_dir_entries: 224,
            total_sectors_16: 2880,
            media_type: 0xF0,
            sectors_per_fat: 9,
            sectors_per_track: 18,
            head_count: 2,
            hidden_sectors: 0,
            total_sectors_32: 0,
            drive_number: 0,
            reserved1: 0,
            boot_signature: 0x29,
            volume_id: 0,
            volume_label: *b"NO NAME    ",
            fs_type: *b"FAT16   ",
        }
    }

    #[test]
    fn floppy_regions_follow_the_bpb() {
        let layout = Layout::from_boot_sector(&floppy());
        assert_eq!(layout.fat_start, 1);
        assert_eq!(layout.root_dir_start, 19);
        assert_eq!(layout.root_dir_sectors, 14);
        assert_eq!(layout.data_start, 33);
        assert_eq!(layout.data_clusters, 2847);
        assert_eq!(layout.fat_copy_start(1), 10);
    }

    #[test]
    fn clusters_map_to_data_sectors() {
        let mut boot = floppy();
        boot.sectors_per_cluster = 4;
        let layout = Layout::from_boot_sector(&boot);
        assert_eq!(layout.cluster_to_sector(2), 33);
        assert_eq!(layout.cluster_to_sector(5), 33 + 12);
        assert_eq!(layout.cluster_size(), 2048);
    }

    #[test]
    fn partial_root_sector_rounds_up() {
        let mut boot = floppy();
        boot.root_dir_entries = 17;
        assert_eq!(Layout::from_boot_sector(&boot).root_dir_sectors, 2);
    }
}
