//! In-memory copy of the file allocation table and the cluster chain operations built on it

use super::{constants::*, fat_entry::FatEntry, layout::Layout};
use crate::filesys::{BlockDevice, FsError};
use alloc::vec;
use alloc::vec::Vec;
use bytes::{Buf, BufMut};
use log::{debug, warn};

/// FAT16 allocation table cache.
///
/// Every chain mutation happens here; nothing reaches the disk until `flush`.
pub struct FatTable {
    /// One value per cluster, covering a whole FAT copy
    entries: Vec<u16>,
    /// First cluster number past the usable data region
    cluster_limit: u16,
    /// Set by every mutation, cleared by `flush`
    dirty: bool,
}

impl FatTable {
    /// Wraps raw FAT values; `data_clusters` bounds which clusters may be allocated
    pub fn new(entries: Vec<u16>, data_clusters: u32) -> Self {
        let limit = (data_clusters as usize + FIRST_DATA_CLUSTER as usize)
            .min(entries.len())
            .min(FAT_MAX_LINK as usize + 1);
        FatTable {
            entries,
            cluster_limit: limit as u16,
            dirty: false,
        }
    }

    /// Reads the first FAT copy from disk
    pub fn load(device: &dyn BlockDevice, layout: &Layout) -> Result<Self, FsError> {
        let per_sector = SECTOR_SIZE / FAT_ENTRY_SIZE;
        let mut entries = Vec::with_capacity(layout.sectors_per_fat as usize * per_sector);
        let mut sector_data = vec![0u8; SECTOR_SIZE];

        for i in 0..layout.sectors_per_fat {
            device.read_block(layout.fat_start + i, &mut sector_data)?;
            let mut buf = &sector_data[..];
            while buf.has_remaining() {
                entries.push(buf.get_u16_le());
            }
        }

        Ok(Self::new(entries, layout.data_clusters))
    }

    /// Writes the table back to every FAT copy, sector by sector
    pub fn flush(&mut self, device: &mut dyn BlockDevice, layout: &Layout) -> Result<(), FsError> {
        if !self.dirty {
            return Ok(());
        }

        let per_sector = SECTOR_SIZE / FAT_ENTRY_SIZE;
        let mut sector_data = vec![0u8; SECTOR_SIZE];

        for (i, chunk) in self.entries.chunks(per_sector).enumerate() {
            sector_data.fill(0);
            let mut buf = &mut sector_data[..];
            for &value in chunk {
                buf.put_u16_le(value);
            }
            for copy in 0..layout.fat_count {
                device.write_block(layout.fat_copy_start(copy) + i as u64, &sector_data)?;
            }
        }

        self.dirty = false;
        Ok(())
    }

    /// Raw FAT value of `cluster`. Out of range clusters read as end of chain.
    pub fn get(&self, cluster: u16) -> u16 {
        match self.entries.get(cluster as usize) {
            Some(&value) => value,
            None => {
                warn!("fat16: read of cluster {} beyond FAT", cluster);
                FAT_EOC
            }
        }
    }

    pub fn set(&mut self, cluster: u16, value: u16) {
        match self.entries.get_mut(cluster as usize) {
            Some(slot) => {
                *slot = value;
                self.dirty = true;
            }
            None => warn!("fat16: write of cluster {} beyond FAT ignored", cluster),
        }
    }

    pub fn entry(&self, cluster: u16) -> FatEntry {
        FatEntry {
            cluster: self.get(cluster),
        }
    }

    /// Cluster linked after `cluster`; `None` at the end of the chain or on a broken link
    pub fn next(&self, cluster: u16) -> Option<u16> {
        self.entry(cluster)
            .next()
            .filter(|&next| next < self.cluster_limit)
    }

    fn is_data_cluster(&self, cluster: u16) -> bool {
        (FIRST_DATA_CLUSTER..self.cluster_limit).contains(&cluster)
    }

    /// Finds and allocates a free cluster, marking it end of chain
    pub fn allocate_cluster(&mut self) -> Option<u16> {
        let cluster = (FIRST_DATA_CLUSTER..self.cluster_limit)
            .find(|&cluster| self.entries[cluster as usize] == FAT_FREE)?;
        self.set(cluster, FAT_EOC);
        Some(cluster)
    }

    /// Allocates `count` linked clusters and returns the head.
    ///
    /// Either the whole chain is allocated or nothing is: running out of clusters
    /// part way frees what was taken and reports `DiskFull`. An empty chain has head 0.
    pub fn allocate_chain(&mut self, count: usize) -> Result<u16, FsError> {
        if count == 0 {
            return Ok(0);
        }

        let head = self.allocate_cluster().ok_or(FsError::DiskFull)?;
        let mut tail = head;
        for allocated in 1..count {
            match self.allocate_cluster() {
                Some(cluster) => {
                    self.set(tail, cluster);
                    tail = cluster;
                }
                None => {
                    self.free_chain(head);
                    debug!(
                        "fat16: chain of {} clusters rolled back after {}",
                        count, allocated
                    );
                    return Err(FsError::DiskFull);
                }
            }
        }

        Ok(head)
    }

    /// Appends one cluster to the chain starting at `head`
    pub fn extend_chain(&mut self, head: u16) -> Result<u16, FsError> {
        let tail = self.chain(head).last().copied().ok_or(FsError::NotFound)?;
        let cluster = self.allocate_cluster().ok_or(FsError::DiskFull)?;
        self.set(tail, cluster);
        Ok(cluster)
    }

    /// Follows the chain from `head` and returns its clusters in order.
    /// Stops short of free or bad clusters; a looped chain is cut off once
    /// every usable cluster has been visited.
    pub fn chain(&self, head: u16) -> Vec<u16> {
        let mut out = Vec::new();
        if !self.is_data_cluster(head) {
            return out;
        }

        let mut cur = Some(head);
        while let Some(cluster) = cur {
            if out.len() >= self.total_clusters() {
                warn!("fat16: chain from cluster {} does not terminate", head);
                break;
            }
            let entry = self.entry(cluster);
            if entry.is_free() {
                warn!("fat16: chain from cluster {} runs into free cluster {}", head, cluster);
                break;
            }
            if entry.is_bad() {
                warn!("fat16: chain from cluster {} runs into bad cluster {}", head, cluster);
                break;
            }
            out.push(cluster);
            cur = self.next(cluster);
        }
        out
    }

    /// Frees the chain starting at `head` and returns how many clusters were released
    pub fn free_chain(&mut self, head: u16) -> usize {
        let clusters = self.chain(head);
        for &cluster in &clusters {
            self.set(cluster, FAT_FREE);
        }
        clusters.len()
    }

    /// Relinks `clusters` in order as one chain, undoing an earlier `free_chain`
    pub fn restore_chain(&mut self, clusters: &[u16]) {
        for pair in clusters.windows(2) {
            self.set(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set(last, FAT_EOC);
        }
    }

    /// Number of clusters available in the data region
    pub fn total_clusters(&self) -> usize {
        self.cluster_limit.saturating_sub(FIRST_DATA_CLUSTER) as usize
    }

    pub fn free_count(&self) -> usize {
        (FIRST_DATA_CLUSTER..self.cluster_limit)
            .filter(|&cluster| self.entries[cluster as usize] == FAT_FREE)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesys::block::memory::MemoryBlockDevice;

    fn table(clusters: u32) -> FatTable {
        let mut entries = vec![0u16; clusters as usize + 2];
        entries[0] = 0xFFF0;
        entries[1] = FAT_EOC;
        FatTable::new(entries, clusters)
    }

    #[test]
    fn allocation_scans_upward_from_cluster_two() {
        let mut fat = table(8);
        assert_eq!(fat.allocate_cluster(), Some(2));
        assert_eq!(fat.allocate_cluster(), Some(3));
        assert!(fat.entry(2).is_end_of_chain());

        fat.set(2, FAT_FREE);
        assert_eq!(fat.allocate_cluster(), Some(2));
    }

    #[test]
    fn allocate_chain_links_clusters_in_order() {
        let mut fat = table(8);
        let head = fat.allocate_chain(3).unwrap();
        assert_eq!(head, 2);
        assert_eq!(fat.chain(head), vec![2, 3, 4]);
        assert_eq!(fat.next(4), None);
        assert_eq!(fat.free_count(), 5);
    }

    #[test]
    fn allocate_chain_of_zero_is_the_empty_chain() {
        let mut fat = table(4);
        assert_eq!(fat.allocate_chain(0), Ok(0));
        assert_eq!(fat.free_count(), 4);
    }

    #[test]
    fn exhausted_allocation_rolls_back_every_cluster() {
        let mut fat = table(6);
        // Leave clusters 3, 5 and 7 free, occupy the rest.
        for cluster in [2u16, 4, 6] {
            fat.set(cluster, FAT_EOC);
        }
        let before = fat.free_count();
        assert_eq!(before, 3);

        assert_eq!(fat.allocate_chain(4), Err(FsError::DiskFull));
        assert_eq!(fat.free_count(), before);
        for cluster in [3u16, 5, 7] {
            assert!(fat.entry(cluster).is_free());
        }
    }

    #[test]
    fn free_chain_stops_at_a_free_link() {
        let mut fat = table(8);
        fat.set(2, 3);
        fat.set(3, FAT_FREE);
        fat.set(5, FAT_EOC);
        assert_eq!(fat.free_chain(2), 1);
        assert!(fat.entry(2).is_free());
        assert!(fat.entry(5).is_end_of_chain());
    }

    #[test]
    fn chain_stops_before_a_bad_cluster() {
        let mut fat = table(8);
        fat.set(2, 3);
        fat.set(3, 4);
        fat.set(4, FAT_BAD);
        assert_eq!(fat.chain(2), vec![2, 3]);
        assert_eq!(fat.free_chain(2), 2);
        assert!(fat.entry(4).is_bad());
    }

    #[test]
    fn looped_chain_is_bounded() {
        let mut fat = table(4);
        fat.set(2, 3);
        fat.set(3, 2);
        assert_eq!(fat.chain(2).len(), 4);
        assert!(fat.chain(2).starts_with(&[2, 3, 2]));
    }

    #[test]
    fn clusters_past_the_data_region_are_never_allocated() {
        // FAT sized for 256 entries but the data region only holds 3 clusters.
        let mut fat = FatTable::new(vec![0u16; 256], 3);
        assert_eq!(fat.allocate_chain(3), Ok(2));
        assert_eq!(fat.allocate_cluster(), None);
        assert_eq!(fat.total_clusters(), 3);
    }

    #[test]
    fn restore_chain_undoes_free_chain() {
        let mut fat = table(8);
        let head = fat.allocate_chain(3).unwrap();
        let clusters = fat.chain(head);
        fat.free_chain(head);
        assert_eq!(fat.free_count(), 8);

        fat.restore_chain(&clusters);
        assert_eq!(fat.chain(head), clusters);
        assert_eq!(fat.free_count(), 5);
    }

    #[test]
    fn extend_chain_appends_after_the_tail() {
        let mut fat = table(8);
        let head = fat.allocate_chain(2).unwrap();
        fat.set(4, FAT_EOC);
        let added = fat.extend_chain(head).unwrap();
        assert_eq!(added, 5);
        assert_eq!(fat.chain(head), vec![2, 3, 5]);
    }

    #[test]
    fn flush_mirrors_every_copy_and_load_reads_it_back() {
        let layout = Layout {
            fat_start: 1,
            sectors_per_fat: 2,
            fat_count: 2,
            root_dir_start: 5,
            root_dir_sectors: 1,
            root_dir_entries: 16,
            data_start: 6,
            sectors_per_cluster: 1,
            data_clusters: 100,
        };
        let mut device = MemoryBlockDevice::new(106, SECTOR_SIZE);
        let mut fat = FatTable::new(vec![0u16; 512], layout.data_clusters);
        fat.set(0, 0xFFF0);
        fat.set(1, FAT_EOC);
        fat.set(300, 301);
        fat.flush(&mut device, &layout).unwrap();

        let mut first = vec![0u8; SECTOR_SIZE];
        let mut second = vec![0u8; SECTOR_SIZE];
        device.read_block(2, &mut first).unwrap();
        device.read_block(4, &mut second).unwrap();
        assert_eq!(first, second);
        assert_eq!(u16::from_le_bytes([first[88], first[89]]), 301);

        let loaded = FatTable::load(&device, &layout).unwrap();
        assert_eq!(loaded.get(300), 301);
        assert_eq!(loaded.get(0), 0xFFF0);
        assert_eq!(loaded.total_clusters(), 100);
    }
}
