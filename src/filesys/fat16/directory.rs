//! Directory slot scanning and allocation

use super::constants::*;
use super::name::{self, DisplayName, ShortName};
use super::{DirEntry83, Fat16};
use crate::filesys::FsError;
use alloc::vec;
use alloc::vec::Vec;
use log::debug;

/// On-disk position of one directory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryLocation {
    /// Sector holding the slot
    pub lba: u64,
    /// Slot index within the sector
    pub index: usize,
}

impl EntryLocation {
    fn offset(&self) -> usize {
        self.index * DIR_ENTRY_SIZE
    }
}

enum Visit<T> {
    Next,
    End,
    Found(T),
}

impl Fat16<'_> {
    /// Sectors backing a directory in scan order. Cluster 0 is the fixed root region.
    fn directory_sectors(&self, dir_cluster: u16) -> Vec<u64> {
        if dir_cluster == 0 {
            return (0..self.layout.root_dir_sectors)
                .map(|i| self.layout.root_dir_start + i)
                .collect();
        }

        let sectors_per_cluster = self.layout.sectors_per_cluster;
        self.fat
            .chain(dir_cluster)
            .into_iter()
            .flat_map(|cluster| {
                let first = self.layout.cluster_to_sector(cluster);
                (0..sectors_per_cluster).map(move |i| first + i)
            })
            .collect()
    }

    /// Walks every raw slot of a directory in order until `visit` stops it
    fn walk_slots<T>(
        &self,
        dir_cluster: u16,
        mut visit: impl FnMut(EntryLocation, &DirEntry83) -> Visit<T>,
    ) -> Result<Option<T>, FsError> {
        let slot_limit = if dir_cluster == 0 {
            self.layout.root_dir_entries as usize
        } else {
            usize::MAX
        };
        let mut sector_data = vec![0u8; SECTOR_SIZE];
        let mut slot = 0;

        for lba in self.directory_sectors(dir_cluster) {
            self.device.read_block(lba, &mut sector_data)?;
            for (index, record) in sector_data.chunks_exact(DIR_ENTRY_SIZE).enumerate() {
                if slot >= slot_limit {
                    return Ok(None);
                }
                slot += 1;

                match visit(EntryLocation { lba, index }, &DirEntry83::decode(record)) {
                    Visit::Next => {}
                    Visit::End => return Ok(None),
                    Visit::Found(value) => return Ok(Some(value)),
                }
            }
        }
        Ok(None)
    }

    /// Walks live entries, skipping deleted slots and long name fragments.
    /// The first never-used slot ends the directory.
    fn walk_entries<T>(
        &self,
        dir_cluster: u16,
        mut visit: impl FnMut(EntryLocation, &DirEntry83) -> Option<T>,
    ) -> Result<Option<T>, FsError> {
        self.walk_slots(dir_cluster, |location, entry| {
            if entry.is_free() {
                Visit::End
            } else if entry.is_deleted() || entry.is_long_name() {
                Visit::Next
            } else {
                visit(location, entry).map_or(Visit::Next, Visit::Found)
            }
        })
    }

    /// Loads up to `max` live entries of a directory, dot entries included
    pub fn load(&self, dir_cluster: u16, max: usize) -> Result<Vec<DirEntry83>, FsError> {
        let mut entries = Vec::new();
        if max == 0 {
            return Ok(entries);
        }
        self.walk_entries(dir_cluster, |_, entry| {
            entries.push(*entry);
            (entries.len() >= max).then_some(())
        })?;
        Ok(entries)
    }

    pub fn load_with_locations(
        &self,
        dir_cluster: u16,
    ) -> Result<Vec<(DirEntry83, EntryLocation)>, FsError> {
        let mut entries = Vec::new();
        self.walk_entries(dir_cluster, |location, entry| {
            entries.push((*entry, location));
            None::<()>
        })?;
        Ok(entries)
    }

    /// Looks up `name` in a directory, case-insensitively through its 8.3 form
    pub fn find(&self, dir_cluster: u16, name: &str) -> Result<(DirEntry83, EntryLocation), FsError> {
        self.find_raw(dir_cluster, &name::format_fixed(name))
    }

    pub(super) fn find_raw(
        &self,
        dir_cluster: u16,
        raw: &ShortName,
    ) -> Result<(DirEntry83, EntryLocation), FsError> {
        self.walk_entries(dir_cluster, |location, entry| {
            (!entry.is_volume_label() && entry.name == *raw).then_some((*entry, location))
        })?
        .ok_or(FsError::NotFound)
    }

    /// Fails with `AlreadyExists` if `raw` names a live entry
    pub(super) fn ensure_absent(&self, dir_cluster: u16, raw: &ShortName) -> Result<(), FsError> {
        match self.find_raw(dir_cluster, raw) {
            Ok(_) => Err(FsError::AlreadyExists),
            Err(FsError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// First deleted or never-used slot. A full subdirectory grows by one cluster;
    /// the root region is fixed and reports `DirectoryFull`.
    pub fn find_free_slot(&mut self, dir_cluster: u16) -> Result<EntryLocation, FsError> {
        let free = self.walk_slots(dir_cluster, |location, entry| {
            if entry.is_reusable() {
                Visit::Found(location)
            } else {
                Visit::Next
            }
        })?;

        match free {
            Some(location) => Ok(location),
            None if dir_cluster == 0 => Err(FsError::DirectoryFull),
            None => self.grow_directory(dir_cluster),
        }
    }

    fn grow_directory(&mut self, dir_cluster: u16) -> Result<EntryLocation, FsError> {
        let before = self.fat.chain(dir_cluster);
        let cluster = self.fat.extend_chain(dir_cluster)?;

        if let Err(err) = self.zero_cluster(cluster) {
            self.fat.set(cluster, FAT_FREE);
            self.fat.restore_chain(&before);
            return Err(err);
        }
        self.flush()?;

        debug!(
            "fat16: directory at cluster {} grew into cluster {}",
            dir_cluster, cluster
        );
        Ok(EntryLocation {
            lba: self.layout.cluster_to_sector(cluster),
            index: 0,
        })
    }

    pub(super) fn zero_cluster(&mut self, cluster: u16) -> Result<(), FsError> {
        let zero_block = vec![0u8; SECTOR_SIZE];
        let first = self.layout.cluster_to_sector(cluster);
        for i in 0..self.layout.sectors_per_cluster {
            self.device.write_block(first + i, &zero_block)?;
        }
        Ok(())
    }

    /// Places `entry` in the first free slot of a directory
    pub fn write_entry(
        &mut self,
        dir_cluster: u16,
        entry: &DirEntry83,
    ) -> Result<EntryLocation, FsError> {
        let location = self.find_free_slot(dir_cluster)?;
        self.set_entry(location, entry)?;
        Ok(location)
    }

    /// Overwrites the slot at `location`
    pub fn set_entry(&mut self, location: EntryLocation, entry: &DirEntry83) -> Result<(), FsError> {
        if location.index >= ENTRIES_PER_SECTOR {
            return Err(FsError::NotFound);
        }
        let mut sector_data = vec![0u8; SECTOR_SIZE];
        self.device.read_block(location.lba, &mut sector_data)?;
        entry.encode(&mut sector_data[location.offset()..location.offset() + DIR_ENTRY_SIZE]);
        self.device.write_block(location.lba, &sector_data)
    }

    /// Reads the slot at `location`, whatever it holds
    pub fn get_entry(&self, location: EntryLocation) -> Result<DirEntry83, FsError> {
        if location.index >= ENTRIES_PER_SECTOR {
            return Err(FsError::NotFound);
        }
        let mut sector_data = vec![0u8; SECTOR_SIZE];
        self.device.read_block(location.lba, &mut sector_data)?;
        Ok(DirEntry83::decode(&sector_data[location.offset()..]))
    }

    /// Location of the `slot`th slot of a directory
    pub fn entry_location(&self, dir_cluster: u16, slot: usize) -> Result<EntryLocation, FsError> {
        if dir_cluster == 0 && slot >= self.layout.root_dir_entries as usize {
            return Err(FsError::NotFound);
        }
        let sectors = self.directory_sectors(dir_cluster);
        let lba = sectors
            .get(slot / ENTRIES_PER_SECTOR)
            .copied()
            .ok_or(FsError::NotFound)?;
        Ok(EntryLocation {
            lba,
            index: slot % ENTRIES_PER_SECTOR,
        })
    }

    /// Name under which `parent` lists the subdirectory starting at `child`
    pub fn name_by_cluster(&self, parent: u16, child: u16) -> Result<Option<DisplayName>, FsError> {
        self.walk_entries(parent, |_, entry| {
            (entry.is_directory() && !entry.is_dot() && entry.start_cluster == child)
                .then(|| entry.get_name())
        })
    }

    /// True when a directory holds nothing but its dot entries
    pub(super) fn is_directory_empty(&self, dir_cluster: u16) -> Result<bool, FsError> {
        let occupant = self.walk_entries(dir_cluster, |_, entry| {
            (!entry.is_dot() && !entry.is_volume_label()).then_some(())
        })?;
        Ok(occupant.is_none())
    }
}
