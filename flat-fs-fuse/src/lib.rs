//! Host-side plumbing for flat-fs: a regular file acts as the block
//! device, so volumes can be built and inspected without real hardware.


use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::Mutex;

use block_dev::{BLOCK_SIZE, BlockDevice, DeviceError};

/// A disk image backed by a host file.
#[derive(Debug)]
pub struct BlockFile {
    file: Mutex<File>,
    blocks: usize,
}

impl BlockFile {
    /// Opens an existing image; the block count comes from the file length.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let blocks = file.metadata()?.len() as usize / BLOCK_SIZE;
        Ok(Self {
            file: Mutex::new(file),
            blocks,
        })
    }

    /// Creates a zero-filled image of `blocks` blocks, replacing any
    /// previous content.
    pub fn create(path: impl AsRef<Path>, blocks: usize) -> io::Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len((blocks * BLOCK_SIZE) as u64)?;
        Ok(Self {
            file: Mutex::new(file),
            blocks,
        })
    }
}

impl BlockDevice for BlockFile {
    fn block_count(&self) -> usize {
        self.blocks
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if block_id >= self.blocks {
            return Err(DeviceError::OutOfRange);
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(|_| DeviceError::Io)?;
        file.read_exact(buf).map_err(|_| DeviceError::Io)
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        if block_id >= self.blocks {
            return Err(DeviceError::OutOfRange);
        }
        let mut file = self.file.lock().unwrap();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .map_err(|_| DeviceError::Io)?;
        file.write_all(buf).map_err(|_| DeviceError::Io)
    }
}
