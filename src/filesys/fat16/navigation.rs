//! Subdirectories and the current directory cursor

use super::{constants::*, name, DirEntry83, Fat16, Permissions};
use crate::filesys::FsError;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, warn};

impl Fat16<'_> {
    /// Cluster of the current directory, 0 for root
    pub fn cwd(&self) -> u16 {
        self.cwd
    }

    /// Moves the cursor without checking that `cluster` is a directory
    pub fn set_cwd(&mut self, cluster: u16) {
        self.cwd = cluster;
    }

    /// Creates a subdirectory of the current directory and returns its cluster
    pub fn mkdir(&mut self, name: &str) -> Result<u16, FsError> {
        let raw = name::validate(name)?;
        let parent = self.cwd;
        self.ensure_absent(parent, &raw)?;

        let cluster = self.fat.allocate_cluster().ok_or(FsError::DiskFull)?;
        let entry = DirEntry83::new_directory(raw, cluster);
        let created = self
            .init_directory(cluster, parent)
            .and_then(|()| self.write_entry(parent, &entry));
        if let Err(err) = created {
            // Growing the parent may already have flushed the cluster as taken
            self.fat.set(cluster, FAT_FREE);
            if let Err(flush_err) = self.flush() {
                warn!("fat16: cluster {} may stay allocated on disk: {}", cluster, flush_err);
            }
            return Err(err);
        }
        self.flush()?;

        debug!("fat16: created directory {} at cluster {}", entry.get_name(), cluster);
        Ok(cluster)
    }

    /// Creates a subdirectory and makes it the current directory
    pub fn create_directory(&mut self, name: &str) -> Result<(), FsError> {
        self.cwd = self.mkdir(name)?;
        Ok(())
    }

    /// Zeroes a fresh directory cluster and writes its "." and ".." entries
    fn init_directory(&mut self, cluster: u16, parent: u16) -> Result<(), FsError> {
        self.zero_cluster(cluster)?;

        let mut sector_data = vec![0u8; SECTOR_SIZE];
        DirEntry83::new_directory(name::DOT, cluster).encode(&mut sector_data[..DIR_ENTRY_SIZE]);
        DirEntry83::new_directory(name::DOT_DOT, parent)
            .encode(&mut sector_data[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE]);
        self.device
            .write_block(self.layout.cluster_to_sector(cluster), &sector_data)
    }

    /// Removes an empty subdirectory of the current directory
    pub fn remove_dir(&mut self, name: &str) -> Result<(), FsError> {
        let (mut entry, location) = self.find(self.cwd, name)?;
        if entry.is_dot() {
            return Err(FsError::InvalidName);
        }
        if !entry.is_directory() {
            return Err(FsError::NotADirectory);
        }
        if entry.is_immutable() || entry.permissions.contains(Permissions::SYSTEM) {
            return Err(FsError::PermissionDenied);
        }
        if !self.is_directory_empty(entry.start_cluster)? {
            return Err(FsError::DirectoryNotEmpty);
        }

        let clusters = self.fat.chain(entry.start_cluster);
        self.fat.free_chain(entry.start_cluster);
        entry.mark_deleted();
        if let Err(err) = self.set_entry(location, &entry) {
            self.fat.restore_chain(&clusters);
            return Err(err);
        }
        self.flush()
    }

    /// Changes the current directory.
    ///
    /// A leading '/' starts from root, "." and ".." are honoured, and the cursor
    /// only moves once every segment has resolved to a directory.
    pub fn cd(&mut self, path: &str) -> Result<(), FsError> {
        let mut cursor = if path.starts_with('/') { 0 } else { self.cwd };

        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            cursor = match segment {
                "." => cursor,
                ".." => self.parent_of(cursor)?,
                _ => {
                    let (entry, _) = self.find(cursor, segment)?;
                    if !entry.is_directory() {
                        return Err(FsError::NotADirectory);
                    }
                    entry.start_cluster
                }
            };
        }

        self.cwd = cursor;
        Ok(())
    }

    /// Parent cluster of a directory, read from its ".." entry
    fn parent_of(&self, dir_cluster: u16) -> Result<u16, FsError> {
        if dir_cluster == 0 {
            return Ok(0);
        }
        let (entry, _) = self.find_raw(dir_cluster, &name::DOT_DOT)?;
        Ok(entry.start_cluster)
    }

    /// Absolute path of the current directory, rebuilt by walking ".." upward.
    /// A level its parent does not list shows as "?".
    pub fn current_path(&self) -> Result<String, FsError> {
        let mut segments: Vec<String> = Vec::new();
        let mut cursor = self.cwd;

        while cursor != 0 {
            if segments.len() > self.fat.total_clusters() {
                warn!("fat16: directory {} does not lead back to root", self.cwd);
                break;
            }
            let parent = self.parent_of(cursor)?;
            let segment = self
                .name_by_cluster(parent, cursor)?
                .map_or_else(|| String::from("?"), |name| String::from(name.as_str()));
            segments.push(segment);
            cursor = parent;
        }

        if segments.is_empty() {
            return Ok(String::from("/"));
        }
        let mut path = String::new();
        for segment in segments.iter().rev() {
            path.push('/');
            path.push_str(segment);
        }
        Ok(path)
    }
}
