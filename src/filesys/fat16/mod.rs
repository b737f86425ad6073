//! FAT16 filesystem implementation

use super::*;
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use log::{info, warn};

mod boot_sector;
pub mod constants;
mod dir_entry;
mod directory;
mod fat_entry;
mod fat_table;
mod file;
mod layout;
pub mod name;
mod navigation;
#[cfg(test)]
pub(crate) mod test_support;

pub use boot_sector::BootSector;
use constants::*;
pub use dir_entry::{Attributes, DirEntry83, Permissions};
pub use directory::EntryLocation;
pub use fat_entry::FatEntry;
pub use fat_table::FatTable;
pub use layout::Layout;

/// Geometry used when formatting a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub sectors_per_cluster: u8,
    pub reserved_sectors: u16,
    pub fat_count: u8,
    pub root_dir_entries: u16,
    pub media_type: u8,
    pub oem_name: [u8; 8],
    pub volume_id: u32,
    pub volume_label: [u8; 11],
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            sectors_per_cluster: DEFAULT_SECTORS_PER_CLUSTER,
            reserved_sectors: DEFAULT_RESERVED_SECTORS,
            fat_count: DEFAULT_FAT_COUNT,
            root_dir_entries: DEFAULT_ROOT_DIR_ENTRIES,
            media_type: DEFAULT_MEDIA_TYPE,
            oem_name: *b"UTTAOS.0",
            volume_id: 0x12345678,
            volume_label: *b"NO NAME    ",
        }
    }
}

/// Space accounting for a mounted volume
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeStats {
    pub cluster_size: usize,
    pub total_clusters: usize,
    pub free_clusters: usize,
}

/// FAT16 filesystem driver.
///
/// One mounted volume and its session state: FAT cache and current directory.
pub struct Fat16<'a> {
    /// Underlying block device
    pub device: Box<dyn BlockDevice + 'a>,
    /// Boot sector containing filesystem parameters
    boot_sector: BootSector,
    /// Region layout derived from the boot sector
    layout: Layout,
    /// Cached allocation table
    fat: FatTable,
    /// Current directory cluster, 0 for root
    cwd: u16,
}

impl<'a> Fat16<'a> {
    pub fn format(
        mut device: Box<dyn BlockDevice + 'a>,
        options: FormatOptions,
    ) -> Result<Self, FsError> {
        let total_blocks = device.total_blocks();
        let block_size = device.block_size();

        if block_size != SECTOR_SIZE
            || !options.sectors_per_cluster.is_power_of_two()
            || options.fat_count == 0
            || options.reserved_sectors == 0
            || options.root_dir_entries == 0
            || total_blocks > u32::MAX as u64
        {
            return Err(FsError::UnsupportedVolume);
        }

        let reserved_sectors = options.reserved_sectors as u64;
        let root_dir_sectors =
            (options.root_dir_entries as usize * DIR_ENTRY_SIZE).div_ceil(block_size) as u64;

        // Calculate sectors per FAT
        let total_clusters = total_blocks
            .checked_sub(reserved_sectors + root_dir_sectors)
            .ok_or(FsError::UnsupportedVolume)?
            / options.sectors_per_cluster as u64;
        let sectors_per_fat = ((total_clusters as usize + 2) * FAT_ENTRY_SIZE).div_ceil(block_size);
        let sectors_per_fat = u16::try_from(sectors_per_fat).map_err(|_| FsError::UnsupportedVolume)?;

        let data_start =
            reserved_sectors + options.fat_count as u64 * sectors_per_fat as u64 + root_dir_sectors;
        if data_start >= total_blocks {
            return Err(FsError::UnsupportedVolume);
        }

        // Create boot sector
        let boot_sector = BootSector {
            jump_boot: [0xEB, 0x3C, 0x90], // Standard boot jump
            oem_name: options.oem_name,
            bytes_per_sector: block_size as u16,
            sectors_per_cluster: options.sectors_per_cluster,
            reserved_sectors: options.reserved_sectors,
            fat_count: options.fat_count,
            root_dir_entries: options.root_dir_entries,
            total_sectors_16: if total_blocks < 65536 {
                total_blocks as u16
            } else {
                0
            },
            media_type: options.media_type,
            sectors_per_fat,
            sectors_per_track: 63, // Apparently the standard?
            head_count: 255,
            hidden_sectors: 0,
            total_sectors_32: if total_blocks >= 65536 {
                total_blocks as u32
            } else {
                0
            },
            drive_number: if options.media_type == 0xF8 { 0x80 } else { 0x00 },
            reserved1: 0,
            boot_signature: 0x29,
            volume_id: options.volume_id,
            volume_label: options.volume_label,
            fs_type: *b"FAT16   ",
        };

        let mut block_buf = vec![0u8; block_size];
        boot_sector.write_to(&mut block_buf);
        device.write_block(0, &block_buf)?;

        let mut fat_block = vec![0u8; block_size];
        // First two FAT entries are reserved
        fat_block[..2].copy_from_slice(&(0xFF00 | options.media_type as u16).to_le_bytes());
        fat_block[2..4].copy_from_slice(&FAT_EOC.to_le_bytes());

        let zero_block = vec![0u8; block_size];
        for i in 0..options.fat_count as u64 {
            let fat_start = reserved_sectors + i * sectors_per_fat as u64;
            device.write_block(fat_start, &fat_block)?;
            for j in 1..sectors_per_fat as u64 {
                device.write_block(fat_start + j, &zero_block)?;
            }
        }

        // Initialize empty root directory
        let root_dir_start = reserved_sectors + options.fat_count as u64 * sectors_per_fat as u64;
        for i in 0..root_dir_sectors {
            device.write_block(root_dir_start + i, &zero_block)?;
        }

        info!(
            "fat16: formatted {} sectors ({} per FAT, root at {})",
            total_blocks, sectors_per_fat, root_dir_start
        );
        Fat16::mount(device)
    }

    pub fn mount(device: Box<dyn BlockDevice + 'a>) -> Result<Self, FsError> {
        if device.block_size() != SECTOR_SIZE {
            return Err(FsError::UnsupportedVolume);
        }

        let mut boot_sector_data = vec![0u8; SECTOR_SIZE];
        device.read_block(0, &mut boot_sector_data)?;
        if boot_sector_data[BOOT_SIGNATURE_OFFSET..BOOT_SIGNATURE_OFFSET + 2] != BOOT_SIGNATURE {
            warn!("fat16: boot sector signature missing");
        }

        let boot_sector = BootSector::parse(&boot_sector_data)?;
        boot_sector.validate()?;

        let mut layout = Layout::from_boot_sector(&boot_sector);
        let device_clusters =
            device.total_blocks().saturating_sub(layout.data_start) / layout.sectors_per_cluster;
        if device_clusters < layout.data_clusters as u64 {
            warn!(
                "fat16: volume claims {} clusters, device holds {}",
                layout.data_clusters, device_clusters
            );
            layout.data_clusters = device_clusters as u32;
        }

        let fat = FatTable::load(&*device, &layout)?;
        info!(
            "fat16: mounted {} clusters of {} bytes, {} free",
            fat.total_clusters(),
            layout.cluster_size(),
            fat.free_count()
        );

        Ok(Fat16 {
            device,
            boot_sector,
            layout,
            fat,
            cwd: 0,
        })
    }

    /// Flushes the FAT and hands the device back
    pub fn unmount(mut self) -> Result<Box<dyn BlockDevice + 'a>, FsError> {
        self.flush()?;
        Ok(self.device)
    }
}

impl Fat16<'_> {
    /// Writes the cached FAT to every on-disk copy
    pub fn flush(&mut self) -> Result<(), FsError> {
        self.fat.flush(&mut *self.device, &self.layout)
    }

    pub fn boot_sector(&self) -> &BootSector {
        &self.boot_sector
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fat(&self) -> &FatTable {
        &self.fat
    }

    /// Size of each cluster in bytes
    pub fn cluster_size(&self) -> usize {
        self.layout.cluster_size()
    }

    pub fn stats(&self) -> VolumeStats {
        VolumeStats {
            cluster_size: self.cluster_size(),
            total_clusters: self.fat.total_clusters(),
            free_clusters: self.fat.free_count(),
        }
    }

    /// Entries of the current directory, without "." / ".." and volume labels
    pub fn list_dir(&self) -> Result<Vec<DirEntry>, FsError> {
        Ok(self
            .load_with_locations(self.cwd)?
            .into_iter()
            .filter(|(entry, _)| !entry.is_dot() && !entry.is_volume_label())
            .map(|(entry, _)| DirEntry {
                name: String::from(entry.get_name().as_str()),
                metadata: entry.metadata(),
            })
            .collect())
    }
}

impl FileSystem for Fat16<'_> {
    fn list_dir(&self) -> Result<Vec<DirEntry>, FsError> {
        Fat16::list_dir(self)
    }

    fn create_file(&mut self, name: &str) -> Result<(), FsError> {
        Fat16::create_file(self, name)
    }

    fn create_dir(&mut self, name: &str) -> Result<(), FsError> {
        self.mkdir(name).map(|_| ())
    }

    fn remove_file(&mut self, name: &str) -> Result<(), FsError> {
        self.delete_file(name)
    }

    fn remove_dir(&mut self, name: &str) -> Result<(), FsError> {
        Fat16::remove_dir(self, name)
    }

    fn read_file(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        Fat16::read_file(self, name, buf)
    }

    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), FsError> {
        Fat16::write_file(self, name, data)
    }

    fn metadata(&self, name: &str) -> Result<FileMetadata, FsError> {
        Fat16::metadata(self, name)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        Fat16::rename(self, from, to)
    }

    fn change_dir(&mut self, path: &str) -> Result<(), FsError> {
        self.cd(path)
    }

    fn current_path(&self) -> Result<String, FsError> {
        Fat16::current_path(self)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{formatted_device, mounted, mounted_with};
    use super::*;
    use crate::filesys::block::memory::MemoryBlockDevice;

    #[test]
    fn format_produces_a_mountable_floppy() {
        let fs = mounted(DEFAULT_TOTAL_SECTORS);
        let boot = fs.boot_sector();
        assert_eq!(boot.bytes_per_sector, 512);
        assert_eq!(boot.root_dir_entries, 224);
        assert_eq!(boot.fat_count, 2);
        assert_eq!(fs.cluster_size(), 512);
        assert_eq!(fs.cwd(), 0);

        let stats = fs.stats();
        assert_eq!(stats.free_clusters, stats.total_clusters);
        assert!(stats.total_clusters > 2800);
        assert_eq!(fs.fat().get(0), 0xFFF0);
        assert_eq!(fs.fat().get(1), FAT_EOC);
        assert!(fs.list_dir().unwrap().is_empty());
    }

    #[test]
    fn mount_rejects_wrong_sector_size() {
        let device = MemoryBlockDevice::new(64, 1024);
        assert!(matches!(
            Fat16::mount(Box::new(device)),
            Err(FsError::UnsupportedVolume)
        ));

        let mut device = formatted_device(DEFAULT_TOTAL_SECTORS);
        let mut boot = vec![0u8; SECTOR_SIZE];
        device.read_block(0, &mut boot).unwrap();
        boot[11..13].copy_from_slice(&1024u16.to_le_bytes());
        device.write_block(0, &boot).unwrap();
        assert!(matches!(
            Fat16::mount(Box::new(device)),
            Err(FsError::UnsupportedVolume)
        ));
    }

    #[test]
    fn format_rejects_a_device_too_small_for_its_regions() {
        let device = MemoryBlockDevice::new(10, SECTOR_SIZE);
        assert!(matches!(
            Fat16::format(Box::new(device), FormatOptions::default()),
            Err(FsError::UnsupportedVolume)
        ));
    }

    #[test]
    fn multi_sector_clusters_are_honoured() {
        let options = FormatOptions {
            sectors_per_cluster: 4,
            ..FormatOptions::default()
        };
        let mut fs = mounted_with(DEFAULT_TOTAL_SECTORS, options);
        assert_eq!(fs.cluster_size(), 2048);

        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        fs.create_file("big.bin").unwrap();
        fs.write_file("big.bin", &data).unwrap();
        let (entry, _) = fs.find(0, "big.bin").unwrap();
        assert_eq!(fs.fat().chain(entry.start_cluster).len(), 3);
        assert_eq!(fs.read_to_vec("big.bin").unwrap(), data);
    }

    #[test]
    fn unmount_persists_files_across_mounts() {
        let mut device = formatted_device(DEFAULT_TOTAL_SECTORS);
        {
            let mut fs = Fat16::mount(Box::new(&mut device)).unwrap();
            fs.create_file("motd").unwrap();
            fs.write_file("motd", b"welcome to taos").unwrap();
            fs.mkdir("etc").unwrap();
            fs.unmount().unwrap();
        }

        let image = device.to_image();
        let fat_bytes = 12 * SECTOR_SIZE;
        let first = &image[SECTOR_SIZE..SECTOR_SIZE + fat_bytes];
        let second = &image[SECTOR_SIZE + fat_bytes..SECTOR_SIZE + 2 * fat_bytes];
        assert_eq!(first, second);

        let fs = Fat16::mount(Box::new(device)).unwrap();
        assert_eq!(fs.read_to_vec("MOTD").unwrap(), b"welcome to taos");
        assert!(fs.find(0, "etc").unwrap().0.is_directory());
        assert_eq!(fs.stats().free_clusters, fs.stats().total_clusters - 2);
    }

    #[test]
    fn file_system_trait_drives_the_volume() {
        let mut fs = mounted(DEFAULT_TOTAL_SECTORS);
        let shell: &mut dyn FileSystem = &mut fs;

        shell.create_dir("home").unwrap();
        shell.change_dir("home").unwrap();
        shell.create_file("todo.txt").unwrap();
        shell.write_file("todo.txt", b"ship it").unwrap();
        assert_eq!(shell.current_path().unwrap(), "/HOME");

        let mut buf = [0u8; 16];
        assert_eq!(shell.read_file("todo.txt", &mut buf).unwrap(), 7);
        assert_eq!(&buf[..7], b"ship it");
        assert_eq!(shell.metadata("todo.txt").unwrap().size, 7);

        let names: Vec<String> = shell.list_dir().unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["TODO.TXT"]);

        shell.remove_file("todo.txt").unwrap();
        shell.change_dir("..").unwrap();
        shell.remove_dir("home").unwrap();
        assert!(shell.list_dir().unwrap().is_empty());
    }
}
