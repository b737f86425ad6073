//! FAT16 whole-file operations with cluster-chain based I/O

use super::{constants::*, name, Attributes, DirEntry83, Fat16, Permissions};
use crate::filesys::{FileMetadata, FsError};
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::min;
use log::{debug, warn};

impl Fat16<'_> {
    /// Creates an empty file in the current directory
    pub fn create_file(&mut self, name: &str) -> Result<(), FsError> {
        let raw = name::validate(name)?;
        self.ensure_absent(self.cwd, &raw)?;
        self.write_entry(self.cwd, &DirEntry83::new_file(raw))?;
        debug!("fat16: created {}", name::decode_fixed(&raw));
        Ok(())
    }

    /// Replaces the whole contents of a file.
    ///
    /// The new chain is allocated while the old one is still held, so a failed
    /// write leaves the old data intact. Only when that runs out of space are
    /// the old clusters recycled, and a failure then may leave them partly
    /// overwritten. On any failure the old chain is relinked and the directory
    /// entry is left untouched.
    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), FsError> {
        let (entry, location) = self.find(self.cwd, name)?;
        if entry.is_directory() {
            return Err(FsError::IsADirectory);
        }
        if entry.is_immutable() {
            return Err(FsError::PermissionDenied);
        }
        let size = u32::try_from(data.len()).map_err(|_| FsError::FileTooLarge)?;

        let old_chain = self.fat.chain(entry.start_cluster);
        let clusters = data.len().div_ceil(self.cluster_size());
        let head = match self.fat.allocate_chain(clusters) {
            Ok(head) => head,
            Err(FsError::DiskFull) if !old_chain.is_empty() => {
                self.fat.free_chain(entry.start_cluster);
                match self.fat.allocate_chain(clusters) {
                    Ok(head) => {
                        debug!("fat16: rewrite of {} recycles its own clusters", entry.get_name());
                        head
                    }
                    Err(err) => {
                        self.fat.restore_chain(&old_chain);
                        return Err(err);
                    }
                }
            }
            Err(err) => return Err(err),
        };

        if let Err(err) = self.write_chain(head, data) {
            self.abandon_write(head, &old_chain);
            return Err(err);
        }

        // Recycled clusters already belong to the new chain
        let new_chain = self.fat.chain(head);
        for &cluster in &old_chain {
            if !new_chain.contains(&cluster) {
                self.fat.set(cluster, FAT_FREE);
            }
        }

        let mut updated = entry;
        updated.start_cluster = head;
        updated.file_size = size;
        updated.attributes |= Attributes::ARCHIVE;
        if let Err(err) = self.flush().and_then(|()| self.set_entry(location, &updated)) {
            self.abandon_write(head, &old_chain);
            return Err(err);
        }

        debug!(
            "fat16: wrote {} bytes to {} across {} clusters",
            size,
            entry.get_name(),
            clusters
        );
        Ok(())
    }

    /// Drops a half-finished rewrite: frees the new chain, relinks the old one
    /// and tries to bring the on-disk FAT back in line
    fn abandon_write(&mut self, head: u16, old_chain: &[u16]) {
        self.fat.free_chain(head);
        self.fat.restore_chain(old_chain);
        if let Err(err) = self.flush() {
            warn!("fat16: FAT left out of sync after failed write: {}", err);
        }
    }

    /// Writes `data` sector by sector along the chain, zero-padding the tail
    fn write_chain(&mut self, head: u16, data: &[u8]) -> Result<(), FsError> {
        let mut sector_data = vec![0u8; SECTOR_SIZE];
        let mut chunks = data.chunks(SECTOR_SIZE);

        for cluster in self.fat.chain(head) {
            let first = self.layout.cluster_to_sector(cluster);
            for i in 0..self.layout.sectors_per_cluster {
                sector_data.fill(0);
                if let Some(chunk) = chunks.next() {
                    sector_data[..chunk.len()].copy_from_slice(chunk);
                }
                self.device.write_block(first + i, &sector_data)?;
            }
        }
        Ok(())
    }

    /// Reads up to `buf.len()` bytes from the start of a file
    pub fn read_file(&self, name: &str, buf: &mut [u8]) -> Result<usize, FsError> {
        let (entry, _) = self.find(self.cwd, name)?;
        if entry.is_directory() {
            return Err(FsError::IsADirectory);
        }

        let wanted = min(buf.len(), entry.file_size as usize);
        let mut bytes_read = 0;
        let mut sector_data = vec![0u8; SECTOR_SIZE];

        'chain: for cluster in self.fat.chain(entry.start_cluster) {
            let first = self.layout.cluster_to_sector(cluster);
            for i in 0..self.layout.sectors_per_cluster {
                if bytes_read >= wanted {
                    break 'chain;
                }
                self.device.read_block(first + i, &mut sector_data)?;
                let chunk_size = min(SECTOR_SIZE, wanted - bytes_read);
                buf[bytes_read..bytes_read + chunk_size].copy_from_slice(&sector_data[..chunk_size]);
                bytes_read += chunk_size;
            }
        }

        if bytes_read < wanted {
            debug!(
                "fat16: {} ends after {} of {} bytes",
                entry.get_name(),
                bytes_read,
                entry.file_size
            );
        }
        Ok(bytes_read)
    }

    /// Reads a whole file into a fresh buffer
    pub fn read_to_vec(&self, name: &str) -> Result<Vec<u8>, FsError> {
        let (entry, _) = self.find(self.cwd, name)?;
        let mut data = vec![0u8; entry.file_size as usize];
        let bytes_read = self.read_file(name, &mut data)?;
        data.truncate(bytes_read);
        Ok(data)
    }

    /// Frees a file's clusters and marks its slot deleted
    pub fn delete_file(&mut self, name: &str) -> Result<(), FsError> {
        let (mut entry, location) = self.find(self.cwd, name)?;
        if entry.is_directory() {
            return Err(FsError::IsADirectory);
        }
        if entry.is_immutable() || entry.permissions.contains(Permissions::SYSTEM) {
            return Err(FsError::PermissionDenied);
        }

        let clusters = self.fat.chain(entry.start_cluster);
        self.fat.free_chain(entry.start_cluster);
        entry.mark_deleted();
        if let Err(err) = self.set_entry(location, &entry) {
            self.fat.restore_chain(&clusters);
            return Err(err);
        }
        self.flush()?;

        debug!("fat16: deleted {}, freed {} clusters", name, clusters.len());
        Ok(())
    }

    /// Renames an entry of the current directory in place
    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        let raw = name::validate(to)?;
        let (mut entry, location) = self.find(self.cwd, from)?;
        if entry.is_dot() {
            return Err(FsError::InvalidName);
        }
        if entry.is_immutable() {
            return Err(FsError::PermissionDenied);
        }
        if entry.name == raw {
            return Ok(());
        }
        self.ensure_absent(self.cwd, &raw)?;

        entry.name = raw;
        self.set_entry(location, &entry)
    }

    /// Replaces the permission byte of an entry
    pub fn chmod(&mut self, name: &str, permissions: Permissions) -> Result<(), FsError> {
        let (mut entry, location) = self.find(self.cwd, name)?;
        if entry.is_immutable() {
            return Err(FsError::PermissionDenied);
        }
        entry.permissions = permissions;
        self.set_entry(location, &entry)
    }

    /// Marks an entry system and immutable, as done for the kernel image
    pub fn protect(&mut self, name: &str) -> Result<(), FsError> {
        let (mut entry, location) = self.find(self.cwd, name)?;
        entry.permissions |= Permissions::SYSTEM | Permissions::IMMUTABLE;
        self.set_entry(location, &entry)
    }

    pub fn metadata(&self, name: &str) -> Result<FileMetadata, FsError> {
        let (entry, _) = self.find(self.cwd, name)?;
        Ok(entry.metadata())
    }
}
