//! # 控制层
//!
//! 挂载生命周期与全部文件操作。

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use block_dev::{BLOCK_SIZE, BlockDevice};
use spin::Mutex;

use crate::error::{FsError, FsResult};
use crate::fd::{Fd, FdTable};
use crate::layout::{DirEntry, Fat, RootDir, Superblock, valid_name};
use crate::{BlockIdx, FILE_MAX_COUNT};

/// 扁平文件系统
///
/// 一个实例对应一次挂载。[`FlatFileSystem::mount`]和
/// [`FlatFileSystem::format`]返回`Arc<Mutex<_>>`，这把互斥锁是整卷唯一
/// 的串行化入口，分配表与目录的多步修改不会交错。卸载后实例成为空壳，
/// 后续操作一律返回[`FsError::NotMounted`]；再次挂载另起实例。
#[derive(Debug)]
pub struct FlatFileSystem {
    volume: Option<Volume>,
}

/// 已挂载卷的全部状态
#[derive(Debug)]
struct Volume {
    dev: Arc<dyn BlockDevice>,
    superblock: Superblock,
    fat: Fat,
    root: RootDir,
    fds: FdTable,
}

impl FlatFileSystem {
    /// 格式化设备并挂载
    ///
    /// 依据设备容量推导几何布局，写出超级块、空的分配表与根目录。
    /// 数据区不清零，文件大小保证了读不到陈旧字节。
    pub fn format(dev: Arc<dyn BlockDevice>) -> FsResult<Arc<Mutex<Self>>> {
        let sb = Superblock::derive(dev.block_count())?;

        let mut raw = [0u8; BLOCK_SIZE];
        sb.encode(&mut raw);
        dev.write_block(0, &raw)?;

        Fat::formatted(sb.data_blk_count as usize).flush(&*dev, &sb)?;
        RootDir::formatted().flush(&*dev, &sb)?;

        log::debug!(
            "formatted: total={} fat_blocks={} data_blocks={}",
            sb.total_blk_count,
            sb.fat_blk_count,
            sb.data_blk_count
        );
        Self::mount(dev)
    }

    /// 挂载设备上的卷
    ///
    /// 读入并校验超级块，随后把分配表与根目录整体装入内存，
    /// 两张表的空闲计数都在此时重新扫描得出。失败时不会留下任何
    /// 部分挂载的状态。
    pub fn mount(dev: Arc<dyn BlockDevice>) -> FsResult<Arc<Mutex<Self>>> {
        let mut raw = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut raw)?;
        let superblock = Superblock::decode(&raw, dev.block_count())?;

        let fat = Fat::load(&*dev, &superblock)?;
        let root = RootDir::load(&*dev, &superblock)?;

        log::debug!(
            "mounted: total={} fat_free={}/{} rdir_free={}/{}",
            superblock.total_blk_count,
            fat.free(),
            superblock.data_blk_count,
            root.free(),
            FILE_MAX_COUNT
        );

        Ok(Arc::new(Mutex::new(Self {
            volume: Some(Volume {
                dev,
                superblock,
                fat,
                root,
                fds: FdTable::new(),
            }),
        })))
    }

    /// 卸载当前卷，释放底层设备
    ///
    /// 还有描述符打开时拒绝卸载。元数据在每次修改后都已即时写回，
    /// 这里不再落盘。
    pub fn unmount(&mut self) -> FsResult<()> {
        let vol = self.volume.as_ref().ok_or(FsError::NotMounted)?;
        if vol.fds.open_count() != 0 {
            return Err(FsError::Busy);
        }

        self.volume = None;
        log::debug!("unmounted");
        Ok(())
    }

    /// 卷的几何参数与空闲率
    pub fn info(&self) -> FsResult<VolumeInfo> {
        let vol = self.volume()?;
        Ok(VolumeInfo {
            total_blk_count: vol.superblock.total_blk_count,
            fat_blk_count: vol.superblock.fat_blk_count,
            rdir_blk: vol.superblock.rdir_blk,
            data_blk: vol.superblock.data_blk,
            data_blk_count: vol.superblock.data_blk_count,
            fat_free: vol.fat.free(),
            rdir_free: vol.root.free(),
        })
    }

    /// 新建空文件
    pub fn create(&mut self, name: &str) -> FsResult<()> {
        let vol = self.volume_mut()?;
        let entry = DirEntry::new(name)?;
        if vol.root.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }

        let slot = vol.root.first_free().ok_or(FsError::ResourceExhausted)?;
        vol.root.occupy(slot, entry);
        vol.root.flush(&*vol.dev, &vol.superblock)
    }

    /// 删除文件并释放它占用的整条块链
    pub fn delete(&mut self, name: &str) -> FsResult<()> {
        let vol = self.volume_mut()?;
        if !valid_name(name) {
            return Err(FsError::InvalidArgument);
        }
        let slot = vol.root.find(name).ok_or(FsError::NotFound)?;
        if vol.fds.refers_to(slot) {
            return Err(FsError::Busy);
        }

        if let Some(first) = vol.root.entry(slot).first_blk() {
            let chain = vol.fat.collect_chain(first)?;
            vol.fat.release(&chain);
            vol.fat.flush(&*vol.dev, &vol.superblock)?;
        }
        vol.root.release(slot);
        vol.root.flush(&*vol.dev, &vol.superblock)
    }

    /// 列出全部文件，按目录槽位顺序
    pub fn ls(&self) -> FsResult<Vec<FileInfo>> {
        let vol = self.volume()?;
        Ok(vol
            .root
            .occupied()
            .map(|entry| FileInfo {
                name: String::from(entry.name()),
                size: entry.size(),
                first_blk: entry.first_blk(),
            })
            .collect())
    }

    /// 打开文件
    ///
    /// 同一文件可以同时打开多次，每个描述符的偏移独立，都从0起。
    pub fn open(&mut self, name: &str) -> FsResult<Fd> {
        let vol = self.volume_mut()?;
        if !valid_name(name) {
            return Err(FsError::InvalidArgument);
        }
        let slot = vol.root.find(name).ok_or(FsError::NotFound)?;
        vol.fds.alloc(slot)
    }

    /// 关闭描述符
    pub fn close(&mut self, fd: Fd) -> FsResult<()> {
        self.volume_mut()?.fds.close(fd)
    }

    /// 描述符指向文件的当前字节大小
    pub fn stat(&self, fd: Fd) -> FsResult<u32> {
        let vol = self.volume()?;
        let desc = vol.fds.get(fd)?;
        Ok(vol.root.entry(desc.slot).size())
    }

    /// 移动描述符的读写偏移
    ///
    /// 偏移不得超过文件大小；恰好移到文件末尾是合法的，
    /// 这也是随后追加写入的标准姿势。
    pub fn seek(&mut self, fd: Fd, offset: usize) -> FsResult<()> {
        let vol = self.volume_mut()?;
        let size = vol.root.entry(vol.fds.get(fd)?.slot).size() as usize;
        if offset > size {
            return Err(FsError::InvalidArgument);
        }
        vol.fds.get_mut(fd)?.offset = offset;
        Ok(())
    }

    /// 从当前偏移读入`buf`，返回实际读到的字节数
    ///
    /// 读取范围被文件大小截断；偏移在文件末尾时读到0字节。
    /// 读取不移动描述符的偏移。
    pub fn read(&self, fd: Fd, buf: &mut [u8]) -> FsResult<usize> {
        let vol = self.volume()?;
        let desc = vol.fds.get(fd)?;
        let entry = vol.root.entry(desc.slot);

        let start = desc.offset;
        let end = (start + buf.len()).min(entry.size() as usize);
        if start >= end {
            return Ok(0);
        }
        let Some(first) = entry.first_blk() else {
            return Ok(0);
        };

        let chain = vol.fat.collect_chain(first)?;
        let span = chain
            .get(start / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE))
            .ok_or(FsError::InvalidFormat)?;

        let mut bounce = [0u8; BLOCK_SIZE];
        let mut displacement = start % BLOCK_SIZE;
        let mut read_size = 0;

        for &idx in span {
            let block_id = vol.superblock.data_block(idx);
            let shift = (BLOCK_SIZE - displacement).min(end - start - read_size);

            if shift == BLOCK_SIZE {
                // 整块直达目的缓冲区
                vol.dev
                    .read_block(block_id, &mut buf[read_size..read_size + BLOCK_SIZE])?;
            } else {
                // 块内片段经弹跳缓冲区中转
                vol.dev.read_block(block_id, &mut bounce)?;
                buf[read_size..read_size + shift]
                    .copy_from_slice(&bounce[displacement..displacement + shift]);
            }

            read_size += shift;
            displacement = 0;
        }

        Ok(read_size)
    }

    /// 从当前偏移写入`buf`，返回写入的字节数
    ///
    /// 写越过已分配容量时先按需扩链，一次补齐所需块数；
    /// 空闲块不足则整个操作失败，不产生任何改动。
    /// 成功后描述符偏移随写入量前移。
    pub fn write(&mut self, fd: Fd, buf: &[u8]) -> FsResult<usize> {
        let vol = self.volume_mut()?;
        let desc = vol.fds.get(fd)?;

        // 零长度写不触及数据块，根目录照常落盘
        if buf.is_empty() {
            vol.root.flush(&*vol.dev, &vol.superblock)?;
            return Ok(0);
        }

        let entry = vol.root.entry(desc.slot);

        let start = desc.offset;
        let end = start + buf.len();
        let size = entry.size() as usize;
        let first = entry.first_blk();

        let mut chain = match first {
            Some(first) => vol.fat.collect_chain(first)?,
            None => Vec::new(),
        };

        // 已分配容量按整块计
        let allocated = size.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
        if end > allocated {
            let extra = (end - allocated).div_ceil(BLOCK_SIZE);
            let new_blocks = vol.fat.find_free(extra)?;

            vol.fat.extend(chain.last().copied(), &new_blocks);
            if chain.is_empty() {
                vol.root
                    .entry_mut(desc.slot)
                    .set_first_blk(Some(new_blocks[0]));
            }
            chain.extend_from_slice(&new_blocks);
            vol.fat.flush(&*vol.dev, &vol.superblock)?;
        }
        if end > size {
            vol.root.entry_mut(desc.slot).resize(end as u32);
        }

        let span = chain
            .get(start / BLOCK_SIZE..end.div_ceil(BLOCK_SIZE))
            .ok_or(FsError::InvalidFormat)?;

        let mut bounce = [0u8; BLOCK_SIZE];
        let mut displacement = start % BLOCK_SIZE;
        let mut write_size = 0;

        for &idx in span {
            let block_id = vol.superblock.data_block(idx);
            let shift = (BLOCK_SIZE - displacement).min(end - start - write_size);

            if shift == BLOCK_SIZE {
                // 整块覆盖，无需预读
                vol.dev
                    .write_block(block_id, &buf[write_size..write_size + BLOCK_SIZE])?;
            } else {
                // 读-改-写，保住块内其余字节
                vol.dev.read_block(block_id, &mut bounce)?;
                bounce[displacement..displacement + shift]
                    .copy_from_slice(&buf[write_size..write_size + shift]);
                vol.dev.write_block(block_id, &bounce)?;
            }

            write_size += shift;
            displacement = 0;
        }

        vol.fds.get_mut(fd)?.offset += write_size;
        vol.root.flush(&*vol.dev, &vol.superblock)?;

        Ok(write_size)
    }

    fn volume(&self) -> FsResult<&Volume> {
        self.volume.as_ref().ok_or(FsError::NotMounted)
    }

    fn volume_mut(&mut self) -> FsResult<&mut Volume> {
        self.volume.as_mut().ok_or(FsError::NotMounted)
    }
}

/// `info`的报告：几何参数与两张表的空闲率
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    pub total_blk_count: u16,
    pub fat_blk_count: u8,
    pub rdir_blk: u16,
    pub data_blk: u16,
    pub data_blk_count: u16,
    pub fat_free: usize,
    pub rdir_free: usize,
}

impl fmt::Display for VolumeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FS Info:")?;
        writeln!(f, "total_blk_count={}", self.total_blk_count)?;
        writeln!(f, "fat_blk_count={}", self.fat_blk_count)?;
        writeln!(f, "rdir_blk={}", self.rdir_blk)?;
        writeln!(f, "data_blk={}", self.data_blk)?;
        writeln!(f, "data_blk_count={}", self.data_blk_count)?;
        writeln!(f, "fat_free_ratio={}/{}", self.fat_free, self.data_blk_count)?;
        write!(f, "rdir_free_ratio={}/{}", self.rdir_free, FILE_MAX_COUNT)
    }
}

/// `ls`报告里的一项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u32,
    pub first_blk: Option<BlockIdx>,
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data_blk = self.first_blk.map_or(0xFFFF, u16::from);
        write!(
            f,
            "file: {}, size: {}, data_blk: {}",
            self.name, self.size, data_blk
        )
    }
}
