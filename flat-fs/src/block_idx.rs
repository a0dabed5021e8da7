use derive_more::{From, Into};

/// 数据块编号
///
/// 从0数起，只覆盖数据区，同时也是分配表的下标；
/// 加上超级块给出的数据区起点才是设备上的绝对块号。
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, From, Into)]
pub struct BlockIdx(u16);

impl BlockIdx {
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }
}

impl From<BlockIdx> for usize {
    #[inline]
    fn from(idx: BlockIdx) -> Self {
        idx.0 as usize
    }
}
