use core::fmt;

use block_dev::DeviceError;

pub type FsResult<T> = Result<T, FsError>;

/// 文件系统操作的统一错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// 当前没有挂载的卷
    NotMounted,
    /// 底层块设备出错
    Device(DeviceError),
    /// 超级块校验失败，或磁盘元数据损坏
    InvalidFormat,
    /// 参数非法：空名、超长名、无效描述符、越界偏移
    InvalidArgument,
    /// 目录槽位、描述符槽位或空闲块耗尽
    ResourceExhausted,
    /// 同名文件已存在
    AlreadyExists,
    /// 没有这个文件
    NotFound,
    /// 操作被仍然打开的文件描述符阻塞
    Busy,
}

impl From<DeviceError> for FsError {
    fn from(err: DeviceError) -> Self {
        Self::Device(err)
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotMounted => write!(f, "no volume mounted"),
            Self::Device(err) => write!(f, "device error: {err}"),
            Self::InvalidFormat => write!(f, "invalid on-disk format"),
            Self::InvalidArgument => write!(f, "invalid argument"),
            Self::ResourceExhausted => write!(f, "out of resources"),
            Self::AlreadyExists => write!(f, "file already exists"),
            Self::NotFound => write!(f, "file not found"),
            Self::Busy => write!(f, "resource busy"),
        }
    }
}
