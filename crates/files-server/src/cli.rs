//! Server CLI implementation.
//!
//! Provides command-line argument parsing for the files server.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};

use crate::listener::ServerConfig;

/// Log output format for CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CliLogFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// Structured JSON output.
    Json,
}

impl From<CliLogFormat> for files_core::LogFormat {
    fn from(fmt: CliLogFormat) -> Self {
        match fmt {
            CliLogFormat::Text => files_core::LogFormat::Text,
            CliLogFormat::Json => files_core::LogFormat::Json,
        }
    }
}

/// files server - receives DEFLATE-compressed uploads over TCP.
#[derive(Debug, Parser)]
#[command(
    name = "files-server",
    version,
    about = "files server - receives compressed uploads and stores them under collision-free names"
)]
pub struct Cli {
    /// TCP port to listen on
    #[arg(value_name = "PORT")]
    pub port: u16,

    /// Address to listen on
    #[arg(short = 'b', long = "bind", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,

    /// Directory to index at startup and store uploads in
    #[arg(short = 'd', long = "dir", default_value = ".", value_name = "DIR")]
    pub dir: PathBuf,

    /// Increase verbosity (can be repeated: -v, -vv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,

    /// Log to file instead of stderr
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log output format
    #[arg(long = "log-format", default_value = "text")]
    pub log_format: CliLogFormat,
}

impl Cli {
    /// Get the socket address to bind to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    /// Build the listener configuration.
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.socket_addr(),
            root: self.dir.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
