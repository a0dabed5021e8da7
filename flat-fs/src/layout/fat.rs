use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use block_dev::{BLOCK_SIZE, BlockDevice};

use super::Superblock;
use crate::BlockIdx;
use crate::error::{FsError, FsResult};

const RAW_FREE: u16 = 0;
const RAW_EOC: u16 = 0xFFFF;

/// 分配表的一条表项，按数据块编号索引
///
/// 磁盘上是一个u16：0表示空闲，0xFFFF表示链尾，
/// 其余值是同一条链上的下一块编号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatEntry {
    /// 空闲块
    Free,
    /// 链上的下一块
    Next(BlockIdx),
    /// 文件的最后一块
    EndOfChain,
}

impl FatEntry {
    fn from_raw(raw: u16) -> Self {
        match raw {
            RAW_FREE => Self::Free,
            RAW_EOC => Self::EndOfChain,
            next => Self::Next(next.into()),
        }
    }

    fn to_raw(self) -> u16 {
        match self {
            Self::Free => RAW_FREE,
            Self::EndOfChain => RAW_EOC,
            Self::Next(idx) => idx.into(),
        }
    }
}

/// 分配表的内存镜像
///
/// 空闲计数与表项同步维护；挂载时重新扫描得出，不信任磁盘上的任何缓存值。
#[derive(Debug)]
pub struct Fat {
    entries: Box<[FatEntry]>,
    free: usize,
}

impl Fat {
    /// 新格式化的表
    ///
    /// 0号表项保留为链尾哨兵：原始编码里0就是“空闲”，
    /// 没法被别的表项指向，所以0号块永不参与分配。
    pub fn formatted(len: usize) -> Self {
        let mut entries = vec![FatEntry::Free; len].into_boxed_slice();
        let mut free = len;
        if let Some(first) = entries.first_mut() {
            *first = FatEntry::EndOfChain;
            free -= 1;
        }
        Self { entries, free }
    }

    /// 从磁盘装载整张表
    ///
    /// 表项数由超级块给出，末块可能只有一段前缀有效，
    /// 经弹跳缓冲区读入后截取。
    pub fn load(dev: &dyn BlockDevice, sb: &Superblock) -> FsResult<Self> {
        let mut raw = vec![0u8; sb.data_blk_count as usize * 2];
        let mut bounce = [0u8; BLOCK_SIZE];

        for (i, block_id) in sb.fat_blocks().enumerate() {
            let start = i * BLOCK_SIZE;
            if start >= raw.len() {
                break;
            }
            let end = raw.len().min(start + BLOCK_SIZE);
            if end - start == BLOCK_SIZE {
                dev.read_block(block_id, &mut raw[start..end])?;
            } else {
                dev.read_block(block_id, &mut bounce)?;
                raw[start..end].copy_from_slice(&bounce[..end - start]);
            }
        }

        let entries: Box<[FatEntry]> = raw
            .chunks_exact(2)
            .map(|le| FatEntry::from_raw(u16::from_le_bytes([le[0], le[1]])))
            .collect();
        let free = entries.iter().filter(|e| **e == FatEntry::Free).count();

        Ok(Self { entries, free })
    }

    /// 把整张表编码写回磁盘，末块的无效尾部补零
    pub fn flush(&self, dev: &dyn BlockDevice, sb: &Superblock) -> FsResult<()> {
        let mut raw = vec![0u8; sb.fat_blocks().len() * BLOCK_SIZE];
        for (le, entry) in raw.chunks_exact_mut(2).zip(self.entries.iter()) {
            le.copy_from_slice(&entry.to_raw().to_le_bytes());
        }

        for (i, block_id) in sb.fat_blocks().enumerate() {
            dev.write_block(block_id, &raw[i * BLOCK_SIZE..(i + 1) * BLOCK_SIZE])?;
        }
        Ok(())
    }

    /// 空闲表项数
    #[inline]
    pub fn free(&self) -> usize {
        self.free
    }

    /// 首次适应：按编号升序收集`n`个空闲块
    ///
    /// 不足`n`个时整体失败，不做任何改动。
    pub fn find_free(&self, n: usize) -> FsResult<Vec<BlockIdx>> {
        let found: Vec<BlockIdx> = self
            .entries
            .iter()
            .enumerate()
            .skip(1) // 0号表项是保留的链尾哨兵
            .filter(|(_, e)| **e == FatEntry::Free)
            .map(|(i, _)| BlockIdx::new(i as u16))
            .take(n)
            .collect();

        if found.len() < n {
            return Err(FsError::ResourceExhausted);
        }
        Ok(found)
    }

    /// 把一批新块按序接到`tail`之后；`tail`为`None`表示链从头建起
    ///
    /// 新块依次相连，最后一块封为链尾。
    pub fn extend(&mut self, tail: Option<BlockIdx>, new_blocks: &[BlockIdx]) {
        let mut prev = tail;
        for &idx in new_blocks {
            if let Some(prev) = prev {
                self.set(prev, FatEntry::Next(idx));
            }
            self.set(idx, FatEntry::EndOfChain);
            prev = Some(idx);
        }
    }

    /// 归还一批块；调用方先经[`Fat::collect_chain`]校验过整条链
    pub fn release(&mut self, chain: &[BlockIdx]) {
        for &idx in chain {
            self.set(idx, FatEntry::Free);
        }
    }

    /// 自`first`起按顺序收集整条链的块编号
    ///
    /// 链中出现空闲表项、越界编号或环时，说明元数据已损坏。
    pub fn collect_chain(&self, first: BlockIdx) -> FsResult<Vec<BlockIdx>> {
        let mut chain = Vec::new();
        let mut cur = Some(first);

        while let Some(idx) = cur {
            if chain.len() >= self.entries.len() {
                log::error!("chain starting at {} never terminates", u16::from(first));
                return Err(FsError::InvalidFormat);
            }
            chain.push(idx);
            cur = self.next_of(idx)?;
        }
        Ok(chain)
    }

    /// 链上的下一块；`Ok(None)`表示`idx`就是链尾
    fn next_of(&self, idx: BlockIdx) -> FsResult<Option<BlockIdx>> {
        let entry = self
            .entries
            .get(usize::from(idx))
            .copied()
            .ok_or(FsError::InvalidFormat)?;
        match entry {
            FatEntry::Next(next) => Ok(Some(next)),
            FatEntry::EndOfChain => Ok(None),
            FatEntry::Free => {
                log::error!("free entry {} reached inside a chain", u16::from(idx));
                Err(FsError::InvalidFormat)
            }
        }
    }

    fn set(&mut self, idx: BlockIdx, entry: FatEntry) {
        let slot = &mut self.entries[usize::from(idx)];
        match (*slot == FatEntry::Free, entry == FatEntry::Free) {
            (true, false) => self.free -= 1,
            (false, true) => self.free += 1,
            _ => {}
        }
        *slot = entry;
    }
}
