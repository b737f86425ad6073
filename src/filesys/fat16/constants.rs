//! FAT16 filesystem constants

/// Size of a disk sector in bytes
pub const SECTOR_SIZE: usize = 512;

/// Size of FAT entry in bytes (16-bit)
pub const FAT_ENTRY_SIZE: usize = 2;

/// Size of one on-disk directory entry
pub const DIR_ENTRY_SIZE: usize = 32;

/// Directory entries held by one sector
pub const ENTRIES_PER_SECTOR: usize = SECTOR_SIZE / DIR_ENTRY_SIZE;

/// Maximum length of filename excluding extension
pub const MAX_FILENAME_LENGTH: usize = 8;

/// Maximum length of file extension
pub const MAX_EXTENSION_LENGTH: usize = 3;

/// Padded on-disk name length (8 + 3)
pub const SHORT_NAME_LENGTH: usize = MAX_FILENAME_LENGTH + MAX_EXTENSION_LENGTH;

/// Attribute value marking a long filename fragment
pub const ATTR_LONG_NAME: u8 = 0x0F;

/// Marker for deleted directory entries
pub const DELETED_ENTRY_MARKER: u8 = 0xE5;

/// Marker for the first unused slot of a directory
pub const END_OF_DIRECTORY_MARKER: u8 = 0x00;

/// FAT value of a free cluster
pub const FAT_FREE: u16 = 0x0000;

/// FAT value of the reserved cluster 1
pub const FAT_RESERVED: u16 = 0x0001;

/// Highest FAT value that still links to a next cluster
pub const FAT_MAX_LINK: u16 = 0xFFEF;

/// FAT value of a bad cluster
pub const FAT_BAD: u16 = 0xFFF7;

/// Lowest end-of-chain value
pub const FAT_EOC_MIN: u16 = 0xFFF8;

/// End-of-chain value written by this driver
pub const FAT_EOC: u16 = 0xFFFF;

/// First cluster of the data region
pub const FIRST_DATA_CLUSTER: u16 = 2;

/// Boot sector signature
pub const BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];

/// Offset of the boot sector signature
pub const BOOT_SIGNATURE_OFFSET: usize = 510;

// Default format geometry: a 1.44MB floppy image
pub const DEFAULT_TOTAL_SECTORS: u64 = 2880;
pub const DEFAULT_SECTORS_PER_CLUSTER: u8 = 1;
pub const DEFAULT_RESERVED_SECTORS: u16 = 1;
pub const DEFAULT_FAT_COUNT: u8 = 2;
pub const DEFAULT_ROOT_DIR_ENTRIES: u16 = 224;
pub const DEFAULT_MEDIA_TYPE: u8 = 0xF0;
