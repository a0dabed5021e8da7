//! # 磁盘数据结构层
//!
//! 卷上三种元数据的磁盘编码与内存镜像：
//!
//! - [`Superblock`]：0号块，描述整卷的几何布局，挂载后只读
//! - [`Fat`]：分配表，把数据块串成每文件一条的块链
//! - [`RootDir`]：根目录，单块128个定长槽位
//!
//! 分配表与根目录在挂载时整体读入内存，结构性修改后由控制层
//! 调用各自的`flush`写回。所有多字节字段一律小端编码。

mod dir;
mod fat;
mod superblock;

pub use self::{
    dir::{DirEntry, RootDir},
    fat::{Fat, FatEntry},
    superblock::Superblock,
};

pub(crate) use self::dir::valid_name;
