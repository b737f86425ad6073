//! FAT16 Boot Sector Structure

use super::constants::*;
use crate::filesys::FsError;
use bytes::{Buf, BufMut};

/// Represents the boot sector of a FAT16 filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSector {
    /// Jump instruction to boot code
    pub jump_boot: [u8; 3],

    /// Name of the system that formatted the volume
    pub oem_name: [u8; 8],

    /// Number of bytes per sector
    pub bytes_per_sector: u16,

    /// Number of sectors per cluster
    pub sectors_per_cluster: u8,

    /// Number of reserved sectors at start of volume
    /// Including the boot sector. Typically 1 for FAT16
    pub reserved_sectors: u16,

    /// Number of FAT copies
    pub fat_count: u8,

    /// Maximum number of root directory entries
    pub root_dir_entries: u16,

    /// Total number of sectors (16-bit)
    /// Used if volume is smaller than 32MB, otherwise use total_sectors_32
    pub total_sectors_16: u16,

    /// Media type descriptor
    pub media_type: u8,

    /// Sectors per FAT
    /// Size of each FAT copy in sectors
    pub sectors_per_fat: u16,

    /// Sectors per track for interrupt 0x13
    pub sectors_per_track: u16,

    /// Number of heads for interrupt 0x13
    pub head_count: u16,

    /// Number of hidden sectors preceding the partition
    pub hidden_sectors: u32,

    /// Total number of sectors (32-bit)
    /// Used if volume is larger than 32MB
    pub total_sectors_32: u32,

    /// INT 13h drive number
    pub drive_number: u8,

    /// Reserved byte
    pub reserved1: u8,

    /// Extended boot signature
    pub boot_signature: u8,

    /// Volume serial number
    pub volume_id: u32,

    /// Volume label
    pub volume_label: [u8; 11],

    /// Filesystem type string
    pub fs_type: [u8; 8],
}

impl BootSector {
    /// Decodes the BPB from the first sector of the volume.
    ///
    /// Only the layout is decoded here; geometry checks happen in `validate`.
    pub fn parse(sector: &[u8]) -> Result<Self, FsError> {
        if sector.len() < SECTOR_SIZE {
            return Err(FsError::UnsupportedVolume);
        }

        let mut buf = &sector[..62];
        let mut boot = BootSector {
            jump_boot: [0; 3],
            oem_name: [0; 8],
            bytes_per_sector: 0,
            sectors_per_cluster: 0,
            reserved_sectors: 0,
            fat_count: 0,
            root_dir_entries: 0,
            total_sectors_16: 0,
            media_type: 0,
            sectors_per_fat: 0,
            sectors_per_track: 0,
            head_count: 0,
            hidden_sectors: 0,
            total_sectors_32: 0,
            drive_number: 0,
            reserved1: 0,
            boot_signature: 0,
            volume_id: 0,
            volume_label: [0; 11],
            fs_type: [0; 8],
        };

        buf.copy_to_slice(&mut boot.jump_boot);
        buf.copy_to_slice(&mut boot.oem_name);
        boot.bytes_per_sector = buf.get_u16_le();
        boot.sectors_per_cluster = buf.get_u8();
        boot.reserved_sectors = buf.get_u16_le();
        boot.fat_count = buf.get_u8();
        boot.root_dir_entries = buf.get_u16_le();
        boot.total_sectors_16 = buf.get_u16_le();
        boot.media_type = buf.get_u8();
        boot.sectors_per_fat = buf.get_u16_le();
        boot.sectors_per_track = buf.get_u16_le();
        boot.head_count = buf.get_u16_le();
        boot.hidden_sectors = buf.get_u32_le();
        boot.total_sectors_32 = buf.get_u32_le();
        boot.drive_number = buf.get_u8();
        boot.reserved1 = buf.get_u8();
        boot.boot_signature = buf.get_u8();
        boot.volume_id = buf.get_u32_le();
        buf.copy_to_slice(&mut boot.volume_label);
        buf.copy_to_slice(&mut boot.fs_type);

        Ok(boot)
    }

    /// Encodes the BPB into a full boot sector, signature included
    pub fn write_to(&self, sector: &mut [u8]) {
        let mut buf = &mut sector[..62];
        buf.put_slice(&self.jump_boot);
        buf.put_slice(&self.oem_name);
        buf.put_u16_le(self.bytes_per_sector);
        buf.put_u8(self.sectors_per_cluster);
        buf.put_u16_le(self.reserved_sectors);
        buf.put_u8(self.fat_count);
        buf.put_u16_le(self.root_dir_entries);
        buf.put_u16_le(self.total_sectors_16);
        buf.put_u8(self.media_type);
        buf.put_u16_le(self.sectors_per_fat);
        buf.put_u16_le(self.sectors_per_track);
        buf.put_u16_le(self.head_count);
        buf.put_u32_le(self.hidden_sectors);
        buf.put_u32_le(self.total_sectors_32);
        buf.put_u8(self.drive_number);
        buf.put_u8(self.reserved1);
        buf.put_u8(self.boot_signature);
        buf.put_u32_le(self.volume_id);
        buf.put_slice(&self.volume_label);
        buf.put_slice(&self.fs_type);

        sector[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2].copy_from_slice(&BOOT_SIGNATURE);
    }

    /// Rejects geometry this driver cannot mount
    pub fn validate(&self) -> Result<(), FsError> {
        if self.bytes_per_sector as usize != SECTOR_SIZE {
            return Err(FsError::UnsupportedVolume);
        }
        // A zero root entry count means a cluster-based root (FAT32 style)
        if self.sectors_per_cluster == 0
            || self.fat_count == 0
            || self.sectors_per_fat == 0
            || self.root_dir_entries == 0
            || self.total_sectors() == 0
        {
            return Err(FsError::UnsupportedVolume);
        }
        Ok(())
    }

    /// Volume size in sectors, whichever total field is in use
    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floppy_sector() -> [u8; SECTOR_SIZE] {
        let mut sector = [0u8; SECTOR_SIZE];
        sector[11..13].copy_from_slice(&512u16.to_le_bytes());
        sector[13] = 1;
        sector[14..16].copy_from_slice(&1u16.to_le_bytes());
        sector[16] = 2;
        sector[17..19].copy_from_slice(&224u16.to_le_bytes());
        sector[19..21].copy_from_slice(&2880u16.to_le_bytes());
        sector[21] = 0xF0;
        sector[22..24].copy_from_slice(&9u16.to_le_bytes());
        sector[510] = 0x55;
        sector[511] = 0xAA;
        sector
    }

    #[test]
    fn parses_fields_at_standard_offsets() {
        let boot = BootSector::parse(&floppy_sector()).unwrap();
        assert_eq!(boot.bytes_per_sector, 512);
        assert_eq!(boot.sectors_per_cluster, 1);
        assert_eq!(boot.reserved_sectors, 1);
        assert_eq!(boot.fat_count, 2);
        assert_eq!(boot.root_dir_entries, 224);
        assert_eq!(boot.total_sectors(), 2880);
        assert_eq!(boot.media_type, 0xF0);
        assert_eq!(boot.sectors_per_fat, 9);
        assert!(boot.validate().is_ok());
    }

    #[test]
    fn written_sector_parses_to_the_same_bpb() {
        let mut boot = BootSector::parse(&floppy_sector()).unwrap();
        boot.oem_name = *b"UTTAOS.0";
        boot.volume_id = 0xCAFE_F00D;
        boot.volume_label = *b"TAOS BOOT  ";
        boot.fs_type = *b"FAT16   ";

        let mut sector = [0u8; SECTOR_SIZE];
        boot.write_to(&mut sector);
        assert_eq!(&sector[3..11], b"UTTAOS.0");
        assert_eq!(&sector[54..62], b"FAT16   ");
        assert_eq!(sector[510..512], BOOT_SIGNATURE);
        assert_eq!(BootSector::parse(&sector).unwrap(), boot);
    }

    #[test]
    fn sector_size_mismatch_is_unsupported() {
        let mut sector = floppy_sector();
        sector[11..13].copy_from_slice(&4096u16.to_le_bytes());
        let boot = BootSector::parse(&sector).unwrap();
        assert_eq!(boot.validate(), Err(FsError::UnsupportedVolume));
    }

    #[test]
    fn cluster_based_root_is_unsupported() {
        let mut sector = floppy_sector();
        sector[17..19].copy_from_slice(&0u16.to_le_bytes());
        let boot = BootSector::parse(&sector).unwrap();
        assert_eq!(boot.validate(), Err(FsError::UnsupportedVolume));
    }

    #[test]
    fn large_volumes_use_the_32_bit_total() {
        let mut sector = floppy_sector();
        sector[19..21].copy_from_slice(&0u16.to_le_bytes());
        sector[32..36].copy_from_slice(&131_072u32.to_le_bytes());
        let boot = BootSector::parse(&sector).unwrap();
        assert_eq!(boot.total_sectors(), 131_072);
    }
}
