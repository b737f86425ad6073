use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::result::Result;
use spin::Mutex;

pub mod block;
pub mod fat16;

use fat16::Fat16;

// Define error types for the filesystem operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    NotFound,
    AlreadyExists,
    InvalidName,
    IOError,
    /// No free cluster left in the data region
    DiskFull,
    /// No free slot in a directory that cannot grow
    DirectoryFull,
    NotADirectory,
    IsADirectory,
    DirectoryNotEmpty,
    PermissionDenied,
    /// Boot sector geometry this driver cannot mount
    UnsupportedVolume,
    FileTooLarge,
    NotMounted,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::NotFound => write!(f, "No such file or directory"),
            FsError::AlreadyExists => write!(f, "File exists"),
            FsError::InvalidName => write!(f, "Invalid file name"),
            FsError::IOError => write!(f, "Device I/O error"),
            FsError::DiskFull => write!(f, "No space left on device"),
            FsError::DirectoryFull => write!(f, "Directory is full"),
            FsError::NotADirectory => write!(f, "Not a directory"),
            FsError::IsADirectory => write!(f, "Is a directory"),
            FsError::DirectoryNotEmpty => write!(f, "Directory not empty"),
            FsError::PermissionDenied => write!(f, "Permission denied"),
            FsError::UnsupportedVolume => write!(f, "Unsupported volume"),
            FsError::FileTooLarge => write!(f, "File too large"),
            FsError::NotMounted => write!(f, "No volume mounted"),
        }
    }
}

// Core traits for filesystem abstraction

/// Represents a block device that can be read from and written to
pub trait BlockDevice: Send + Sync {
    fn read_block(&self, block_num: u64, buf: &mut [u8]) -> Result<(), FsError>;
    fn write_block(&mut self, block_num: u64, buf: &[u8]) -> Result<(), FsError>;
    fn block_size(&self) -> usize;
    fn total_blocks(&self) -> u64;
}

/// Represents a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub metadata: FileMetadata,
}

/// File metadata information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
    pub created: u64,
    pub modified: u64,
    pub permissions: FilePermissions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePermissions {
    pub readable: bool,
    pub writable: bool,
    pub executable: bool,
    pub hidden: bool,
    pub immutable: bool,
}

/// Operations the shell and program loader need from a mounted filesystem.
///
/// Every name is resolved relative to the filesystem's current directory.
pub trait FileSystem {
    fn list_dir(&self) -> Result<Vec<DirEntry>, FsError>;
    fn create_file(&mut self, name: &str) -> Result<(), FsError>;
    fn create_dir(&mut self, name: &str) -> Result<(), FsError>;
    fn remove_file(&mut self, name: &str) -> Result<(), FsError>;
    fn remove_dir(&mut self, name: &str) -> Result<(), FsError>;
    fn read_file(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, FsError>;
    fn write_file(&mut self, name: &str, data: &[u8]) -> Result<(), FsError>;
    fn metadata(&self, name: &str) -> Result<FileMetadata, FsError>;
    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError>;
    fn change_dir(&mut self, path: &str) -> Result<(), FsError>;
    fn current_path(&self) -> Result<String, FsError>;
}

/// Kernel-wide mounted volume.
/// Every access goes through the lock, which serializes FAT, directory and cursor updates.
pub static ROOT_FS: Mutex<Option<Fat16<'static>>> = Mutex::new(None);

/// Mounts `device` and installs it as the kernel-wide volume
pub fn init(device: Box<dyn BlockDevice + 'static>) -> Result<(), FsError> {
    let fs = Fat16::mount(device)?;
    *ROOT_FS.lock() = Some(fs);
    Ok(())
}

/// Runs `f` against the kernel-wide volume
pub fn with_root_fs<F, R>(f: F) -> Result<R, FsError>
where
    F: FnOnce(&mut Fat16<'static>) -> Result<R, FsError>,
{
    let mut guard = ROOT_FS.lock();
    let fs = guard.as_mut().ok_or(FsError::NotMounted)?;
    f(fs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesys::fat16::test_support::formatted_device;

    #[test]
    fn root_fs_requires_init_then_serves_operations() {
        // Only test in the crate that touches ROOT_FS.
        assert_eq!(with_root_fs(|_| Ok(())), Err(FsError::NotMounted));

        init(Box::new(formatted_device(2880))).unwrap();
        with_root_fs(|fs| fs.create_file("boot.cfg")).unwrap();
        let data = with_root_fs(|fs| {
            fs.write_file("boot.cfg", b"init=/bin/sh")?;
            fs.read_to_vec("BOOT.CFG")
        })
        .unwrap();
        assert_eq!(data, b"init=/bin/sh");
    }

    #[test]
    fn errors_render_messages() {
        assert_eq!(alloc::format!("{}", FsError::DiskFull), "No space left on device");
        assert_eq!(alloc::format!("{}", FsError::NotADirectory), "Not a directory");
    }
}
