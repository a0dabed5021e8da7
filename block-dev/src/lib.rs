//! # 块设备接口层
//!
//! 块设备以**块**为单位存储数据，可能是一张磁盘，也可能只是宿主机上的
//! 一个镜像文件。[`BlockDevice`] 是文件系统消费底层存储的唯一通道，
//! 实际的物理 I/O 由实现者提供。
//!
//! 每次调用恰好传输一个块；块号越界或底层存储出错时返回 [`DeviceError`]。

#![no_std]

use core::fmt;

/// 一个块的字节量
pub const BLOCK_SIZE: usize = 4096;

/// 块设备驱动特质
///
/// 缓冲区长度必须等于 [`BLOCK_SIZE`]。
pub trait BlockDevice: Send + Sync + fmt::Debug {
    /// 设备的总块数
    fn block_count(&self) -> usize;

    /// 读出`block_id`号块到`buf`
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 把`buf`写入`block_id`号块
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;
}

/// 块设备操作失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceError {
    /// 块号超出设备容量
    OutOfRange,
    /// 底层存储读写失败
    Io,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange => write!(f, "block id out of range"),
            Self::Io => write!(f, "backing store I/O failed"),
        }
    }
}
