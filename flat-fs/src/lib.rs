//! # flat-fs
//!
//! 单卷、扁平命名空间的小文件系统：没有目录层级，全部文件都挂在一张
//! 固定容量的根目录表下，文件数据由分配表（FAT）串成的块链描述。
//!
//! 磁盘布局，自左向右：
//!
//! 超级块 | 分配表 | 根目录 | 数据区
//!
//! 自下而上的分层：
//!
//! - 块设备接口层：[`BlockDevice`]，由使用者实现（例如磁盘镜像文件）
//! - 磁盘数据结构层：[`layout`]，三种元数据的编解码与内存镜像
//! - 文件描述符层：打开文件的会话状态，只存在于内存
//! - 控制层：[`FlatFileSystem`]，挂载生命周期与全部文件操作

#![no_std]

extern crate alloc;

mod block_idx;
mod error;
mod fd;
mod fs;
pub mod layout;

pub use block_dev::{BLOCK_SIZE, BlockDevice, DeviceError};

pub use self::{
    block_idx::BlockIdx,
    error::{FsError, FsResult},
    fd::Fd,
    fs::{FileInfo, FlatFileSystem, VolumeInfo},
};

/// 超级块开头的8字节魔数
pub const MAGIC: [u8; 8] = *b"ECS150FS";

/// 根目录的槽位总数，128个32字节槽位恰好填满一个块
pub const FILE_MAX_COUNT: usize = 128;

/// 文件名的最大字节数，不含结尾的`\0`
pub const NAME_MAX_LEN: usize = 15;

/// 同时打开的文件描述符上限
pub const OPEN_MAX_COUNT: usize = 32;

/// 一个分配表块能容纳的表项数，每项两字节
pub const FAT_ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / 2;
