#![cfg_attr(not(test), no_std)]
#![cfg_attr(feature = "strict", deny(warnings))]
extern crate alloc;

pub mod filesys;
pub mod logging;

pub use filesys::fat16::{Fat16, FormatOptions};
pub use filesys::{BlockDevice, FsError};
