//! # 文件描述符层
//!
//! 打开文件的会话状态。描述符表只存在于内存，挂载时从空表起步，
//! 卸载后全部作废，磁盘上没有对应物。

use crate::OPEN_MAX_COUNT;
use crate::error::{FsError, FsResult};

/// 打开文件的句柄，对应描述符表中的一个槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fd(usize);

/// 一次打开的会话：目录槽位 + 当前字节偏移
///
/// 同一文件可以同时打开多次，各会话的偏移互不相干。
#[derive(Debug, Clone, Copy)]
pub(crate) struct FileDesc {
    pub slot: usize,
    pub offset: usize,
}

/// 描述符表
#[derive(Debug)]
pub(crate) struct FdTable {
    descs: [Option<FileDesc>; OPEN_MAX_COUNT],
    open: usize,
}

impl FdTable {
    pub fn new() -> Self {
        Self {
            descs: [None; OPEN_MAX_COUNT],
            open: 0,
        }
    }

    /// 打开的描述符数
    #[inline]
    pub fn open_count(&self) -> usize {
        self.open
    }

    /// 占用编号最小的空槽，偏移置零
    pub fn alloc(&mut self, slot: usize) -> FsResult<Fd> {
        let fd = self
            .descs
            .iter()
            .position(Option::is_none)
            .ok_or(FsError::ResourceExhausted)?;
        self.descs[fd] = Some(FileDesc { slot, offset: 0 });
        self.open += 1;
        Ok(Fd(fd))
    }

    pub fn close(&mut self, fd: Fd) -> FsResult<()> {
        let desc = self.descs.get_mut(fd.0).ok_or(FsError::InvalidArgument)?;
        if desc.take().is_none() {
            return Err(FsError::InvalidArgument);
        }
        self.open -= 1;
        Ok(())
    }

    pub fn get(&self, fd: Fd) -> FsResult<FileDesc> {
        self.descs
            .get(fd.0)
            .copied()
            .flatten()
            .ok_or(FsError::InvalidArgument)
    }

    pub fn get_mut(&mut self, fd: Fd) -> FsResult<&mut FileDesc> {
        self.descs
            .get_mut(fd.0)
            .and_then(Option::as_mut)
            .ok_or(FsError::InvalidArgument)
    }

    /// 是否有描述符还指着这个目录槽位
    pub fn refers_to(&self, slot: usize) -> bool {
        self.descs.iter().flatten().any(|desc| desc.slot == slot)
    }
}
