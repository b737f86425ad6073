//! In-memory block device implementation

use crate::filesys::{BlockDevice, FsError};
use alloc::vec;
use alloc::vec::Vec;
use core::result::Result;

/// Block device that stores data in memory
pub struct MemoryBlockDevice {
    /// Blocks of data, each block_size bytes
    blocks: Vec<Vec<u8>>,

    /// Size of each block in bytes
    block_size: usize,

    /// Remaining writes before the device starts failing, if limited
    write_budget: Option<usize>,

    /// Whether the device recovers after refusing one write
    transient_failure: bool,
}

impl MemoryBlockDevice {
    /// Creates a new memory block device with given size
    pub fn new(total_blocks: u64, block_size: usize) -> Self {
        let blocks = (0..total_blocks).map(|_| vec![0; block_size]).collect();
        Self {
            blocks,
            block_size,
            write_budget: None,
            transient_failure: false,
        }
    }

    /// Wraps a raw disk image; a trailing partial block is zero-filled
    pub fn from_image(image: &[u8], block_size: usize) -> Self {
        let blocks = image
            .chunks(block_size)
            .map(|chunk| {
                let mut block = vec![0; block_size];
                block[..chunk.len()].copy_from_slice(chunk);
                block
            })
            .collect();
        Self {
            blocks,
            block_size,
            write_budget: None,
            transient_failure: false,
        }
    }

    /// Flattens the device back into a raw disk image
    pub fn to_image(&self) -> Vec<u8> {
        self.blocks.concat()
    }

    /// Makes every write after the next `writes` fail with an I/O error.
    /// `None` removes the limit.
    pub fn fail_writes_after(&mut self, writes: Option<usize>) {
        self.write_budget = writes;
        self.transient_failure = false;
    }

    /// Refuses only the write following the next `writes`; later writes succeed
    pub fn fail_one_write_after(&mut self, writes: usize) {
        self.write_budget = Some(writes);
        self.transient_failure = true;
    }

    /// Validates block number is within bounds
    fn validate_block(&self, block_num: u64) -> Result<(), FsError> {
        if block_num as usize >= self.blocks.len() {
            return Err(FsError::IOError);
        }
        Ok(())
    }

    /// Validates buffer is correct block size
    fn validate_buffer(&self, buf: &[u8]) -> Result<(), FsError> {
        if buf.len() != self.block_size {
            return Err(FsError::IOError);
        }
        Ok(())
    }
}

impl BlockDevice for MemoryBlockDevice {
    /// Reads block into buffer
    fn read_block(&self, block_num: u64, buf: &mut [u8]) -> Result<(), FsError> {
        self.validate_block(block_num)?;
        self.validate_buffer(buf)?;
        buf.copy_from_slice(&self.blocks[block_num as usize]);
        Ok(())
    }

    /// Writes buffer to block
    fn write_block(&mut self, block_num: u64, buf: &[u8]) -> Result<(), FsError> {
        self.validate_block(block_num)?;
        self.validate_buffer(buf)?;
        if let Some(budget) = self.write_budget.as_mut() {
            if *budget == 0 {
                if self.transient_failure {
                    self.write_budget = None;
                }
                return Err(FsError::IOError);
            }
            *budget -= 1;
        }
        self.blocks[block_num as usize].copy_from_slice(buf);
        Ok(())
    }

    /// Returns size of each block
    fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns total number of blocks
    fn total_blocks(&self) -> u64 {
        self.blocks.len() as u64
    }
}
