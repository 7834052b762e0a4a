//! Client CLI implementation.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use files_core::constants::{DEFAULT_COMPRESSION_LEVEL, MAX_COMPRESSION_LEVEL};

/// files client - uploads a file to a files server.
#[derive(Debug, Parser)]
#[command(
    name = "files-client",
    version,
    about = "files client - uploads a file and prints the name it was stored under"
)]
pub struct Cli {
    /// Server address (HOST:PORT)
    #[arg(value_name = "ADDR")]
    pub server: String,

    /// File to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Request a different name than the local file name
    #[arg(short = 'n', long = "name", value_name = "NAME")]
    pub name: Option<String>,

    /// DEFLATE compression level (0-9)
    #[arg(
        short = 'l',
        long = "level",
        default_value_t = DEFAULT_COMPRESSION_LEVEL,
        value_parser = clap::value_parser!(u32).range(0..=MAX_COMPRESSION_LEVEL as i64)
    )]
    pub level: u32,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}
