//! 测试共用设施：内存块设备与快速建卷。

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use block_dev::{BLOCK_SIZE, BlockDevice, DeviceError};
use flat_fs::FlatFileSystem;
use spin::Mutex;

/// 以`Vec`为后备存储的内存块设备，顺带统计读写块次数
#[derive(Debug)]
pub struct MemDisk {
    blocks: Mutex<Vec<u8>>,
    count: usize,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemDisk {
    pub fn new(count: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![0; count * BLOCK_SIZE]),
            count,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// 至今成功的（读块数，写块数）
    pub fn io_counts(&self) -> (usize, usize) {
        (
            self.reads.load(Ordering::Relaxed),
            self.writes.load(Ordering::Relaxed),
        )
    }
}

impl BlockDevice for MemDisk {
    fn block_count(&self) -> usize {
        self.count
    }

    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        if block_id >= self.count {
            return Err(DeviceError::OutOfRange);
        }
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&self.blocks.lock()[start..start + BLOCK_SIZE]);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        if block_id >= self.count {
            return Err(DeviceError::OutOfRange);
        }
        let start = block_id * BLOCK_SIZE;
        self.blocks.lock()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// 新格式化好的卷，设备共`total_blocks`块
pub fn fresh_fs(total_blocks: usize) -> (Arc<dyn BlockDevice>, Arc<Mutex<FlatFileSystem>>) {
    let dev: Arc<dyn BlockDevice> = Arc::new(MemDisk::new(total_blocks));
    let fs = FlatFileSystem::format(dev.clone()).unwrap();
    (dev, fs)
}

/// 周期图案的测试数据
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}
