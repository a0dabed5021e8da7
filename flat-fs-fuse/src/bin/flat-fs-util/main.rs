mod cli;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::{BLOCK_SIZE, BlockDevice};
use clap::Parser;
use flat_fs::{FlatFileSystem, FsError};
use flat_fs_fuse::BlockFile;
use spin::Mutex;

use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Mkfs { image, size } => {
            let blocks = size.0 as usize / BLOCK_SIZE;
            let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::create(&image, blocks)?);
            let fs = FlatFileSystem::format(dev).map_err(fs_err)?;
            println!("{}", fs.lock().info().map_err(fs_err)?);
        }
        Command::Info { image } => {
            let fs = mount_image(&image)?;
            println!("{}", fs.lock().info().map_err(fs_err)?);
        }
        Command::Ls { image } => {
            let fs = mount_image(&image)?;
            println!("FS Ls:");
            for file in fs.lock().ls().map_err(fs_err)? {
                println!("{file}");
            }
        }
        Command::Add { image, file } => {
            let name = file
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| io::Error::other("host file has no usable name"))?
                .to_owned();
            let mut data = Vec::new();
            File::open(&file)?.read_to_end(&mut data)?;

            let fs = mount_image(&image)?;
            let mut fs = fs.lock();
            fs.create(&name).map_err(fs_err)?;
            let fd = fs.open(&name).map_err(fs_err)?;
            let written = fs.write(fd, &data).map_err(fs_err)?;
            fs.close(fd).map_err(fs_err)?;
            log::info!("added {name:?} ({written} bytes)");
        }
        Command::Cat { image, name } => {
            let fs = mount_image(&image)?;
            let mut fs = fs.lock();
            let fd = fs.open(&name).map_err(fs_err)?;
            let size = fs.stat(fd).map_err(fs_err)? as usize;

            let mut data = vec![0u8; size];
            fs.read(fd, &mut data).map_err(fs_err)?;
            fs.close(fd).map_err(fs_err)?;
            io::stdout().write_all(&data)?;
        }
        Command::Rm { image, name } => {
            let fs = mount_image(&image)?;
            fs.lock().delete(&name).map_err(fs_err)?;
        }
    }

    Ok(())
}

fn mount_image(path: &Path) -> io::Result<Arc<Mutex<FlatFileSystem>>> {
    let dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(path)?);
    FlatFileSystem::mount(dev).map_err(fs_err)
}

fn fs_err(err: FsError) -> io::Error {
    io::Error::other(err.to_string())
}
