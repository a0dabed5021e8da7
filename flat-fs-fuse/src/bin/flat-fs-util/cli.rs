use std::path::PathBuf;

use clap::{Parser, Subcommand};
use typed_bytesize::ByteSizeIec;

/// Build and inspect flat-fs disk images.
#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a zero-filled image and format it
    Mkfs {
        /// Image path
        image: PathBuf,
        /// Image size, e.g. "16MiB"
        #[arg(short, long)]
        size: ByteSizeIec,
    },
    /// Print volume geometry and free ratios
    Info {
        /// Image path
        image: PathBuf,
    },
    /// List all files
    Ls {
        /// Image path
        image: PathBuf,
    },
    /// Copy a host file into the image
    Add {
        /// Image path
        image: PathBuf,
        /// Host file to copy in; its base name becomes the file name
        file: PathBuf,
    },
    /// Dump a file to stdout
    Cat {
        /// Image path
        image: PathBuf,
        /// File name inside the image
        name: String,
    },
    /// Delete a file
    Rm {
        /// Image path
        image: PathBuf,
        /// File name inside the image
        name: String,
    },
}
