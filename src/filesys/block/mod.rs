//! Block device implementations

use crate::filesys::{BlockDevice, FsError};

pub mod memory;

/// Lets a volume borrow a device the caller keeps ownership of
impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn read_block(&self, block_num: u64, buf: &mut [u8]) -> Result<(), FsError> {
        (**self).read_block(block_num, buf)
    }

    fn write_block(&mut self, block_num: u64, buf: &[u8]) -> Result<(), FsError> {
        (**self).write_block(block_num, buf)
    }

    fn block_size(&self) -> usize {
        (**self).block_size()
    }

    fn total_blocks(&self) -> u64 {
        (**self).total_blocks()
    }
}
