use alloc::boxed::Box;
use alloc::vec;

use block_dev::{BLOCK_SIZE, BlockDevice};

use super::Superblock;
use crate::error::{FsError, FsResult};
use crate::{BlockIdx, FILE_MAX_COUNT, NAME_MAX_LEN};

const RAW_NO_BLOCK: u16 = 0xFFFF;

/// 文件名合法性：非空、不超过[`NAME_MAX_LEN`]字节、不含`\0`
pub(crate) fn valid_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    !bytes.is_empty() && bytes.len() <= NAME_MAX_LEN && !bytes.contains(&0)
}

/// 根目录的一个槽位
///
/// 磁盘上恒为32字节：文件名16字节（`\0`结尾）| 文件大小u32
/// | 首块编号u16 | 保留10字节。名字首字节为`\0`即空槽；
/// 首块编号0xFFFF表示文件还没有数据块。
#[derive(Debug, Clone)]
pub struct DirEntry {
    name: [u8; NAME_MAX_LEN + 1],
    size: u32,
    first_blk: Option<BlockIdx>,
}

impl DirEntry {
    /// 槽位的磁盘字节量
    pub const SIZE: usize = 32;

    const EMPTY: Self = Self {
        name: [0; NAME_MAX_LEN + 1],
        size: 0,
        first_blk: None,
    };

    /// 新建空文件的槽位；名字不合法时拒绝
    pub fn new(name: &str) -> FsResult<Self> {
        if !valid_name(name) {
            return Err(FsError::InvalidArgument);
        }

        let bytes = name.as_bytes();
        let mut buf = [0u8; NAME_MAX_LEN + 1];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            name: buf,
            size: 0,
            first_blk: None,
        })
    }

    fn decode(raw: &[u8]) -> FsResult<Self> {
        debug_assert_eq!(Self::SIZE, raw.len());

        let mut name = [0u8; NAME_MAX_LEN + 1];
        name.copy_from_slice(&raw[..NAME_MAX_LEN + 1]);

        // 占用槽的名字必须以\0结尾且是合法UTF-8
        if name[0] != 0 {
            let len = name
                .iter()
                .position(|&b| b == 0)
                .ok_or(FsError::InvalidFormat)?;
            core::str::from_utf8(&name[..len]).map_err(|_| FsError::InvalidFormat)?;
        }

        let first = u16::from_le_bytes([raw[20], raw[21]]);
        Ok(Self {
            name,
            size: u32::from_le_bytes([raw[16], raw[17], raw[18], raw[19]]),
            first_blk: (first != RAW_NO_BLOCK).then_some(BlockIdx::new(first)),
        })
    }

    fn encode(&self, raw: &mut [u8]) {
        debug_assert_eq!(Self::SIZE, raw.len());

        raw.fill(0);
        raw[..NAME_MAX_LEN + 1].copy_from_slice(&self.name);
        raw[16..20].copy_from_slice(&self.size.to_le_bytes());
        let first = self.first_blk.map_or(RAW_NO_BLOCK, u16::from);
        raw[20..22].copy_from_slice(&first.to_le_bytes());
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.name[0] == 0
    }

    pub fn name(&self) -> &str {
        let len = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..len]).unwrap_or_default()
    }

    #[inline]
    pub fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    pub fn first_blk(&self) -> Option<BlockIdx> {
        self.first_blk
    }

    pub fn resize(&mut self, size: u32) {
        self.size = size;
    }

    pub fn set_first_blk(&mut self, first: Option<BlockIdx>) {
        self.first_blk = first;
    }
}

/// 根目录的内存镜像：固定128个槽位，整体占据一个磁盘块
///
/// 结构性修改之后由控制层调用[`RootDir::flush`]整块写回。
#[derive(Debug)]
pub struct RootDir {
    entries: Box<[DirEntry]>,
    free: usize,
}

impl RootDir {
    /// 新格式化的根目录，所有槽位空闲
    pub fn formatted() -> Self {
        Self {
            entries: vec![DirEntry::EMPTY; FILE_MAX_COUNT].into_boxed_slice(),
            free: FILE_MAX_COUNT,
        }
    }

    /// 从磁盘装载根目录块
    pub fn load(dev: &dyn BlockDevice, sb: &Superblock) -> FsResult<Self> {
        let mut raw = [0u8; BLOCK_SIZE];
        dev.read_block(sb.rdir_blk as usize, &mut raw)?;

        let entries = raw
            .chunks_exact(DirEntry::SIZE)
            .map(DirEntry::decode)
            .collect::<FsResult<Box<[DirEntry]>>>()?;
        let free = entries.iter().filter(|e| e.is_free()).count();

        Ok(Self { entries, free })
    }

    /// 整块写回磁盘
    pub fn flush(&self, dev: &dyn BlockDevice, sb: &Superblock) -> FsResult<()> {
        let mut raw = [0u8; BLOCK_SIZE];
        for (chunk, entry) in raw.chunks_exact_mut(DirEntry::SIZE).zip(self.entries.iter()) {
            entry.encode(chunk);
        }
        dev.write_block(sb.rdir_blk as usize, &raw)?;
        Ok(())
    }

    /// 空闲槽位数
    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    /// 按名字查找占用槽位
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_free() && e.name() == name)
    }

    /// 编号最小的空闲槽位
    pub fn first_free(&self) -> Option<usize> {
        self.entries.iter().position(DirEntry::is_free)
    }

    pub fn occupy(&mut self, slot: usize, entry: DirEntry) {
        debug_assert!(self.entries[slot].is_free());
        self.entries[slot] = entry;
        self.free -= 1;
    }

    pub fn release(&mut self, slot: usize) {
        debug_assert!(!self.entries[slot].is_free());
        self.entries[slot] = DirEntry::EMPTY;
        self.free += 1;
    }

    #[inline]
    pub fn entry(&self, slot: usize) -> &DirEntry {
        &self.entries[slot]
    }

    #[inline]
    pub fn entry_mut(&mut self, slot: usize) -> &mut DirEntry {
        &mut self.entries[slot]
    }

    /// 按槽位顺序遍历占用槽
    pub fn occupied(&self) -> impl Iterator<Item = &DirEntry> {
        self.entries.iter().filter(|e| !e.is_free())
    }
}
