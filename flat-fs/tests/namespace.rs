//! 根目录命名空间：创建、删除、列表与打开。

mod common;

use block_dev::BLOCK_SIZE;
use flat_fs::{FILE_MAX_COUNT, FsError, OPEN_MAX_COUNT};

use common::{fresh_fs, pattern};

#[test]
fn create_then_list() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();
    fs.create("notes.txt").unwrap();

    let files = fs.ls().unwrap();
    assert_eq!(1, files.len());
    assert_eq!("notes.txt", files[0].name);
    assert_eq!(0, files[0].size);
    assert_eq!(None, files[0].first_blk);
    assert_eq!(
        "file: notes.txt, size: 0, data_blk: 65535",
        files[0].to_string()
    );

    let fd = fs.open("notes.txt").unwrap();
    assert_eq!(0, fs.stat(fd).unwrap());
    fs.close(fd).unwrap();
}

#[test]
fn duplicate_name_rejected() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();
    fs.create("twice").unwrap();

    assert_eq!(Err(FsError::AlreadyExists), fs.create("twice"));
    assert_eq!(1, fs.ls().unwrap().len());
}

#[test]
fn name_validation() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();

    assert_eq!(Err(FsError::InvalidArgument), fs.create(""));
    // 16字节，超出上限一字节
    assert_eq!(Err(FsError::InvalidArgument), fs.create("sixteen.chars.xx"));
    assert_eq!(Err(FsError::InvalidArgument), fs.open(""));
    assert_eq!(Err(FsError::InvalidArgument), fs.delete(""));

    // 恰好15字节
    fs.create("fifteen_chars_x").unwrap();
}

#[test]
fn directory_capacity() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();

    for i in 0..FILE_MAX_COUNT {
        fs.create(&format!("file-{i:03}")).unwrap();
    }
    assert_eq!(0, fs.info().unwrap().rdir_free);
    assert_eq!(Err(FsError::ResourceExhausted), fs.create("straw"));

    // 腾出一个槽位就又能创建
    fs.delete("file-000").unwrap();
    fs.create("straw").unwrap();
}

#[test]
fn slot_order_and_reuse() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();
    fs.create("c").unwrap();
    fs.create("a").unwrap();
    fs.create("b").unwrap();

    let listed: Vec<String> = fs.ls().unwrap().into_iter().map(|f| f.name).collect();
    assert_eq!(vec!["c", "a", "b"], listed);

    // 新文件顶替a腾出的槽位，列表顺序保持槽位序
    fs.delete("a").unwrap();
    fs.create("d").unwrap();

    let listed: Vec<String> = fs.ls().unwrap().into_iter().map(|f| f.name).collect();
    assert_eq!(vec!["c", "d", "b"], listed);
}

#[test]
fn delete_rules() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();

    assert_eq!(Err(FsError::NotFound), fs.delete("ghost"));

    fs.create("held").unwrap();
    let fd = fs.open("held").unwrap();
    assert_eq!(Err(FsError::Busy), fs.delete("held"));

    fs.close(fd).unwrap();
    fs.delete("held").unwrap();
    assert_eq!(Err(FsError::NotFound), fs.open("held"));
}

#[test]
fn delete_reclaims_blocks() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();
    let baseline = fs.info().unwrap().fat_free;

    fs.create("bulky").unwrap();
    let fd = fs.open("bulky").unwrap();
    fs.write(fd, &pattern(2 * BLOCK_SIZE + 808, 7)).unwrap();
    fs.close(fd).unwrap();
    assert_eq!(baseline - 3, fs.info().unwrap().fat_free);

    fs.delete("bulky").unwrap();
    assert_eq!(baseline, fs.info().unwrap().fat_free);
    assert!(fs.ls().unwrap().is_empty());
}

#[test]
fn descriptor_capacity() {
    let (_, fs) = fresh_fs(16);
    let mut fs = fs.lock();
    fs.create("popular").unwrap();

    let fds: Vec<_> = (0..OPEN_MAX_COUNT)
        .map(|_| fs.open("popular").unwrap())
        .collect();
    assert_eq!(Err(FsError::ResourceExhausted), fs.open("popular"));

    for fd in fds {
        fs.close(fd).unwrap();
    }
    fs.unmount().unwrap();
}
