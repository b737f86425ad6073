//! Freshly formatted volumes for unit tests

use super::constants::SECTOR_SIZE;
use super::{Fat16, FormatOptions};
use crate::filesys::block::memory::MemoryBlockDevice;

/// In-memory device holding an empty volume with the default geometry
pub fn formatted_device(total_sectors: u64) -> MemoryBlockDevice {
    let mut device = MemoryBlockDevice::new(total_sectors, SECTOR_SIZE);
    Fat16::format(Box::new(&mut device), FormatOptions::default())
        .and_then(Fat16::unmount)
        .unwrap();
    device
}

pub fn mounted(total_sectors: u64) -> Fat16<'static> {
    mounted_with(total_sectors, FormatOptions::default())
}

pub fn mounted_with(total_sectors: u64, options: FormatOptions) -> Fat16<'static> {
    let device = MemoryBlockDevice::new(total_sectors, SECTOR_SIZE);
    Fat16::format(Box::new(device), options).unwrap()
}
