//! FAT16 directory entry structure and operations

use super::constants::*;
use super::name::{self, DisplayName, ShortName};
use crate::filesys::{FileMetadata, FilePermissions};
use bitflags::bitflags;
use bytes::{Buf, BufMut};

bitflags! {
    /// Standard FAT attribute byte
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        const READ_ONLY = 0x01;
        const HIDDEN = 0x02;
        const SYSTEM = 0x04;
        const VOLUME_ID = 0x08;
        const DIRECTORY = 0x10;
        const ARCHIVE = 0x20;
        const _ = !0;
    }
}

bitflags! {
    /// Permission bits stored in the byte standard FAT reserves for NT.
    /// Other FAT16 implementations do not understand this field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Permissions: u8 {
        const READ = 0x01;
        const WRITE = 0x02;
        const EXECUTE = 0x04;
        const HIDDEN = 0x08;
        // Refuses deletion
        const SYSTEM = 0x10;
        // Refuses deletion, writes and permission changes
        const IMMUTABLE = 0x20;
        const _ = !0;
    }
}

/// 8.3 format directory entry (32 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry83 {
    /// 8 character filename followed by 3 character extension
    pub name: ShortName,

    /// File attributes (read-only, directory, etc)
    pub attributes: Attributes,

    /// Vendor permission extension
    pub permissions: Permissions,

    /// Owner id, stored where FAT keeps creation tenths
    pub owner: u8,

    pub create_time: u16,
    pub create_date: u16,
    pub access_date: u16,

    /// Upper cluster word, always 0 on FAT16
    pub cluster_high: u16,

    /// Modification time
    pub time: u16,

    /// Modification date
    pub date: u16,

    /// First cluster number
    pub start_cluster: u16,

    /// File size in bytes
    pub file_size: u32,
}

impl DirEntry83 {
    fn blank(name: ShortName, attributes: Attributes, start_cluster: u16) -> Self {
        Self {
            name,
            attributes,
            permissions: Permissions::READ | Permissions::WRITE,
            owner: 0,
            create_time: 0,
            create_date: 0,
            access_date: 0,
            cluster_high: 0,
            time: 0,
            date: 0,
            start_cluster,
            file_size: 0,
        }
    }

    /// Creates a new empty file entry with the given padded name
    pub fn new_file(name: ShortName) -> Self {
        Self::blank(name, Attributes::ARCHIVE, 0)
    }

    /// Creates a new directory entry with given name and starting cluster
    pub fn new_directory(name: ShortName, start_cluster: u16) -> Self {
        Self::blank(name, Attributes::DIRECTORY, start_cluster)
    }

    /// Decodes one 32-byte slot
    pub fn decode(record: &[u8]) -> Self {
        let mut buf = &record[..DIR_ENTRY_SIZE];
        let mut name = [0u8; SHORT_NAME_LENGTH];
        buf.copy_to_slice(&mut name);

        Self {
            name,
            attributes: Attributes::from_bits_retain(buf.get_u8()),
            permissions: Permissions::from_bits_retain(buf.get_u8()),
            owner: buf.get_u8(),
            create_time: buf.get_u16_le(),
            create_date: buf.get_u16_le(),
            access_date: buf.get_u16_le(),
            cluster_high: buf.get_u16_le(),
            time: buf.get_u16_le(),
            date: buf.get_u16_le(),
            start_cluster: buf.get_u16_le(),
            file_size: buf.get_u32_le(),
        }
    }

    /// Encodes the entry into a 32-byte slot
    pub fn encode(&self, record: &mut [u8]) {
        let mut buf = &mut record[..DIR_ENTRY_SIZE];
        buf.put_slice(&self.name);
        buf.put_u8(self.attributes.bits());
        buf.put_u8(self.permissions.bits());
        buf.put_u8(self.owner);
        buf.put_u16_le(self.create_time);
        buf.put_u16_le(self.create_date);
        buf.put_u16_le(self.access_date);
        buf.put_u16_le(self.cluster_high);
        buf.put_u16_le(self.time);
        buf.put_u16_le(self.date);
        buf.put_u16_le(self.start_cluster);
        buf.put_u32_le(self.file_size);
    }

    /// Returns true if entry is marked as deleted
    pub fn is_deleted(&self) -> bool {
        self.name[0] == DELETED_ENTRY_MARKER
    }

    /// Returns true if entry is empty/unused
    pub fn is_free(&self) -> bool {
        self.name[0] == END_OF_DIRECTORY_MARKER
    }

    /// Returns true if the slot can take a new entry
    pub fn is_reusable(&self) -> bool {
        self.is_free() || self.is_deleted()
    }

    /// Returns true if the slot is a long filename fragment
    pub fn is_long_name(&self) -> bool {
        self.attributes.bits() == ATTR_LONG_NAME
    }

    /// Returns true if entry is a directory
    pub fn is_directory(&self) -> bool {
        !self.is_long_name() && self.attributes.contains(Attributes::DIRECTORY)
    }

    pub fn is_volume_label(&self) -> bool {
        !self.is_long_name() && self.attributes.contains(Attributes::VOLUME_ID)
    }

    /// "." or ".."
    pub fn is_dot(&self) -> bool {
        self.name == name::DOT || self.name == name::DOT_DOT
    }

    pub fn is_immutable(&self) -> bool {
        self.permissions.contains(Permissions::IMMUTABLE)
    }

    /// Returns the filename as a string, including extension if present
    pub fn get_name(&self) -> DisplayName {
        name::decode_fixed(&self.name)
    }

    /// Marks the slot deleted and clears its chain and size
    pub fn mark_deleted(&mut self) {
        self.name[0] = DELETED_ENTRY_MARKER;
        self.start_cluster = 0;
        self.file_size = 0;
    }

    pub fn metadata(&self) -> FileMetadata {
        // Entries written by other FAT tools leave the permission byte at zero
        let unrestricted = self.permissions.is_empty();
        FileMetadata {
            size: self.file_size as u64,
            is_dir: self.is_directory(),
            created: ((self.create_date as u64) << 16) | (self.create_time as u64),
            modified: ((self.date as u64) << 16) | (self.time as u64),
            permissions: FilePermissions {
                readable: unrestricted || self.permissions.contains(Permissions::READ),
                writable: !self.attributes.contains(Attributes::READ_ONLY)
                    && !self.is_immutable()
                    && (unrestricted || self.permissions.contains(Permissions::WRITE)),
                executable: self.permissions.contains(Permissions::EXECUTE),
                hidden: self.attributes.contains(Attributes::HIDDEN)
                    || self.permissions.contains(Permissions::HIDDEN),
                immutable: self.is_immutable(),
            },
        }
    }
}
