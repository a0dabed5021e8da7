use core::ops::Range;

use block_dev::BLOCK_SIZE;

use crate::error::{FsError, FsResult};
use crate::{BlockIdx, FAT_ENTRIES_PER_BLOCK, MAGIC};

/// 超级块：
/// - 魔数提供文件系统的合法性校验；
/// - 其余字段描述各区域的几何布局。
///
/// 磁盘编码：魔数8字节 | 总块数u16 | 根目录块号u16 | 数据区起点u16
/// | 数据块数u16 | 分配表块数u8 | 填充到块尾。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// 卷占据的总块数
    pub total_blk_count: u16,
    /// 根目录所在的块号
    pub rdir_blk: u16,
    /// 数据区的起始块号
    pub data_blk: u16,
    /// 数据区的块数，即分配表的表项数
    pub data_blk_count: u16,
    /// 分配表占据的块数
    pub fat_blk_count: u8,
}

impl Superblock {
    /// 依据设备容量推导几何布局
    ///
    /// 分配表取能覆盖数据区的最小块数，
    /// 满足`总块数 = 1 + 分配表块数 + 1 + 数据块数`。
    pub fn derive(total_blocks: usize) -> FsResult<Self> {
        // 至少要放得下超级块、一个分配表块、根目录和一个数据块
        if total_blocks < 4 {
            return Err(FsError::InvalidArgument);
        }
        let total: u16 = total_blocks
            .try_into()
            .map_err(|_| FsError::InvalidArgument)?;

        // 每增加一个分配表块，能管理的数据块就多 FAT_ENTRIES_PER_BLOCK 个，
        // 但自身也占掉一块
        let fat_blk_count = (total_blocks - 2).div_ceil(FAT_ENTRIES_PER_BLOCK + 1) as u8;
        let rdir_blk = 1 + fat_blk_count as u16;

        Ok(Self {
            total_blk_count: total,
            rdir_blk,
            data_blk: rdir_blk + 1,
            data_blk_count: total - 2 - fat_blk_count as u16,
            fat_blk_count,
        })
    }

    /// 从0号块的内容解析并校验超级块
    pub fn decode(raw: &[u8; BLOCK_SIZE], device_blocks: usize) -> FsResult<Self> {
        if raw[..8] != MAGIC {
            return Err(FsError::InvalidFormat);
        }

        let sb = Self {
            total_blk_count: u16::from_le_bytes([raw[8], raw[9]]),
            rdir_blk: u16::from_le_bytes([raw[10], raw[11]]),
            data_blk: u16::from_le_bytes([raw[12], raw[13]]),
            data_blk_count: u16::from_le_bytes([raw[14], raw[15]]),
            fat_blk_count: raw[16],
        };
        sb.validate(device_blocks)?;
        Ok(sb)
    }

    /// 编码进一个块缓冲区，仅在格式化时使用
    pub fn encode(&self, raw: &mut [u8; BLOCK_SIZE]) {
        raw.fill(0);
        raw[..8].copy_from_slice(&MAGIC);
        raw[8..10].copy_from_slice(&self.total_blk_count.to_le_bytes());
        raw[10..12].copy_from_slice(&self.rdir_blk.to_le_bytes());
        raw[12..14].copy_from_slice(&self.data_blk.to_le_bytes());
        raw[14..16].copy_from_slice(&self.data_blk_count.to_le_bytes());
        raw[16] = self.fat_blk_count;
    }

    /// 分配表占据的设备块号区间
    #[inline]
    pub fn fat_blocks(&self) -> Range<usize> {
        1..self.rdir_blk as usize
    }

    /// 数据块编号对应的设备绝对块号
    #[inline]
    pub fn data_block(&self, idx: BlockIdx) -> usize {
        self.data_blk as usize + usize::from(idx)
    }

    fn validate(&self, device_blocks: usize) -> FsResult<()> {
        let total = self.total_blk_count as usize;
        let consistent = total == device_blocks
            && self.fat_blk_count >= 1
            && self.rdir_blk as usize == 1 + self.fat_blk_count as usize
            && self.data_blk as usize == self.rdir_blk as usize + 1
            && total == 2 + self.fat_blk_count as usize + self.data_blk_count as usize
            && self.fat_blk_count as usize * FAT_ENTRIES_PER_BLOCK >= self.data_blk_count as usize;

        if consistent {
            Ok(())
        } else {
            Err(FsError::InvalidFormat)
        }
    }
}
